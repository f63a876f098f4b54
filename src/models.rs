use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// GET /api/v1/repository?public=true response
#[derive(Debug, Deserialize)]
pub struct RepositoryPage {
    #[serde(default)]
    pub repositories: Vec<RepositoryEntry>,
    pub next_page: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryEntry {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl RepositoryEntry {
    pub fn is_image(&self) -> bool {
        self.kind == "image"
    }

    /// `namespace/name`, the form used in every other API path
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// GET /api/v1/repository/<repo>?includeTags=true response
#[derive(Debug, Deserialize)]
pub struct RepositoryDetail {
    #[serde(default)]
    pub tags: Option<BTreeMap<String, TagMeta>>,
}

/// Per-tag metadata; only the expiration matters here
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagMeta {
    pub expiration: Option<String>,
}

/// PUT /api/v1/repository/<repo>/tag/<tag> body
#[derive(Debug, Serialize)]
pub struct ExpirationUpdate {
    pub expiration: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Repository has no tags at all
    Blank,
    /// Repository is excluded
    Skip,
    /// Tag already carries an expiration on the server
    Exist,
    /// Matched a rule whose expiration is zero
    Keep,
    /// Matched a rule with a positive expiration
    Expire,
    /// No rule matched, default expiration applies
    ExpireDefault,
}

/// Outcome of classifying one tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub repository: String,
    pub tag: Option<String>,
    pub action: Action,
    /// Name of the matched rule for `Keep` and `Expire`
    pub rule: Option<String>,
    pub expiration_seconds: u64,
    pub expires_at: Option<DateTime<Local>>,
    /// Expiration already set server-side, verbatim
    pub existing_expiration: Option<String>,
    pub applied: bool,
}

impl Decision {
    pub fn blank(repository: &str) -> Self {
        Self {
            repository: repository.to_string(),
            tag: None,
            action: Action::Blank,
            rule: None,
            expiration_seconds: 0,
            expires_at: None,
            existing_expiration: None,
            applied: false,
        }
    }

    /// Whether this decision asks for an expiration write
    pub fn wants_change(&self) -> bool {
        self.expiration_seconds > 0
    }
}

/// Everything one run produced, in traversal order
#[derive(Debug, Default)]
pub struct Report {
    pub decisions: Vec<Decision>,
    pub repositories: usize,
    pub tags: usize,
    pub changed: usize,
    pub pending: usize,
    pub failed: usize,
}

impl Report {
    pub fn record(&mut self, decisions: Vec<Decision>, dry_run: bool) {
        self.repositories += 1;
        for decision in &decisions {
            if decision.tag.is_none() {
                continue;
            }
            self.tags += 1;
            if decision.applied {
                self.changed += 1;
            } else if decision.wants_change() {
                if dry_run {
                    self.pending += 1;
                } else {
                    self.failed += 1;
                }
            }
        }
        self.decisions.extend(decisions);
    }
}
