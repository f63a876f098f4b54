use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::stream::{self, Stream};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::{AppError, RegistryError};
use crate::models::{ExpirationUpdate, RepositoryDetail, RepositoryPage, TagMeta};

/// The registry calls the reconciler needs
#[async_trait]
pub trait Registry: Send + Sync {
    /// One page of public repositories; `next_page` is the cursor from the previous page
    async fn list_repositories(&self, next_page: Option<&str>)
        -> Result<RepositoryPage, RegistryError>;

    /// All tags of `repository` keyed by name
    async fn list_tags(&self, repository: &str) -> Result<BTreeMap<String, TagMeta>, RegistryError>;

    /// Set the tag expiration to `expiration` epoch seconds; 0 clears it
    async fn set_tag_expiration(
        &self,
        repository: &str,
        tag: &str,
        expiration: i64,
    ) -> Result<(), RegistryError>;
}

pub struct QuayClient {
    client: Client,
    base_url: String,
}

impl QuayClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Self::with_builder(config, Client::builder())
    }

    fn with_builder(config: &Config, builder: ClientBuilder) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| AppError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = builder
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Response, RegistryError> {
        tracing::debug!(url, "Request");
        let resp = request.send().await.map_err(|source| RegistryError::Network {
            url: url.to_string(),
            source,
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RegistryError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RegistryError> {
        let resp = self.send(url, self.client.get(url).query(query)).await?;
        resp.json().await.map_err(|source| RegistryError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl Registry for QuayClient {
    /// GET /api/v1/repository?public=true[&next_page=<cursor>]
    async fn list_repositories(
        &self,
        next_page: Option<&str>,
    ) -> Result<RepositoryPage, RegistryError> {
        let url = self.endpoint("/api/v1/repository");
        let mut query = vec![("public", "true")];
        if let Some(cursor) = next_page {
            query.push(("next_page", cursor));
        }
        self.get_json(&url, &query).await
    }

    /// GET /api/v1/repository/<repo>?includeTags=true
    async fn list_tags(&self, repository: &str) -> Result<BTreeMap<String, TagMeta>, RegistryError> {
        let url = self.endpoint(&format!("/api/v1/repository/{}", repository));
        let detail: RepositoryDetail = self.get_json(&url, &[("includeTags", "true")]).await?;
        Ok(detail.tags.unwrap_or_default())
    }

    /// PUT /api/v1/repository/<repo>/tag/<tag>
    async fn set_tag_expiration(
        &self,
        repository: &str,
        tag: &str,
        expiration: i64,
    ) -> Result<(), RegistryError> {
        let url = self.endpoint(&format!("/api/v1/repository/{}/tag/{}", repository, tag));
        let request = self.client.put(&url).json(&ExpirationUpdate { expiration });
        self.send(&url, request).await?;
        Ok(())
    }
}

struct Pager {
    cursor: Option<String>,
    fetched: usize,
    finished: bool,
}

/// Follow the `next_page` cursor and yield the image repositories of each page.
///
/// Stops after the page without a cursor. Fetching more than `max_pages`
/// pages yields [`RegistryError::PageLimitExceeded`] and ends the stream, as
/// does any failed page.
pub fn public_repositories<R>(
    registry: &R,
    max_pages: usize,
) -> impl Stream<Item = Result<Vec<String>, RegistryError>> + '_
where
    R: Registry + ?Sized,
{
    let start = Pager {
        cursor: None,
        fetched: 0,
        finished: false,
    };

    stream::try_unfold(start, move |pager| async move {
        if pager.finished {
            return Ok(None);
        }
        if pager.fetched >= max_pages {
            tracing::warn!(max_pages, "Repository listing hit the page bound");
            return Err(RegistryError::PageLimitExceeded(max_pages));
        }

        let page = registry.list_repositories(pager.cursor.as_deref()).await?;
        let images = page
            .repositories
            .iter()
            .filter(|r| r.is_image())
            .map(|r| r.full_name())
            .collect::<Vec<_>>();
        tracing::debug!(page = pager.fetched + 1, images = images.len(), "Fetched repository page");

        let next = Pager {
            finished: page.next_page.is_none(),
            cursor: page.next_page,
            fetched: pager.fetched + 1,
        };
        Ok(Some((images, next)))
    })
}
