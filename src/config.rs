//! Configuration file schema, environment/command-line overlay and validation.
//!
//! Loading happens once at startup. The result is an immutable [`Config`] with
//! every regex compiled and every duration parsed, so nothing can fail on a
//! broken rule halfway through a run.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::cli::Cli;
use crate::duration::parse_duration;
use crate::error::AppError;

pub const DEFAULT_EXPIRATION: &str = "336h";
pub const DEFAULT_TIMEOUT: &str = "30s";
pub const DEFAULT_MAX_PAGES: usize = 1000;
/// Longest accepted expiration, 100 years
pub const MAX_EXPIRATION: u64 = 100 * 365 * 86_400;

/// Top level of `config.yml`
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub quay: QuaySection,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuaySection {
    pub url: Option<String>,
    pub token: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
    pub default_expiration: Option<DurationValue>,
    #[serde(default)]
    pub exclude_projects: Vec<String>,
    #[serde(default)]
    pub expiration: Vec<RuleSpec>,
    pub timeout: Option<DurationValue>,
    pub max_pages: Option<usize>,
    pub concurrency: Option<usize>,
}

/// A rule as written in the file
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub regex: String,
    pub expire: DurationValue,
}

/// A duration as YAML may spell it: `expire: 0` or `expire: "336h"`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Seconds(s) => Cow::Owned(s.to_string()),
            Self::Text(t) => Cow::Borrowed(t),
        }
    }
}

/// A validated expiration rule
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pattern: Regex,
    pub expire_seconds: u64,
}

impl Rule {
    pub fn new(name: &str, pattern: &str, expire: &str) -> Result<Self, AppError> {
        if name.is_empty() {
            return Err(AppError::UnnamedRule(0));
        }
        let pattern = Regex::new(pattern).map_err(|source| AppError::InvalidPattern {
            name: name.to_string(),
            source,
        })?;
        let expire_seconds = expiration_seconds(&format!("rule {}", name), expire)?;

        Ok(Self {
            name: name.to_string(),
            pattern,
            expire_seconds,
        })
    }

    /// Whether the pattern matches at the start of `tag`.
    ///
    /// Leftmost-first search finds a match at offset 0 whenever one exists.
    pub fn matches(&self, tag: &str) -> bool {
        self.pattern.find(tag).is_some_and(|m| m.start() == 0)
    }
}

/// Immutable run configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub url: String,
    pub token: String,
    pub dry_run: bool,
    pub default_expiration: u64,
    pub excludes: HashSet<String>,
    pub rules: Vec<Rule>,
    pub timeout: Duration,
    pub max_pages: usize,
    pub concurrency: usize,
}

impl Config {
    /// Read the config file (if present) and overlay command-line/env values.
    pub fn load(cli: &Cli) -> Result<Self, AppError> {
        let file = read_file(&cli.config)?;
        Self::from_sources(file, cli)
    }

    /// Merge file values with the overlay and validate the result.
    pub fn from_sources(file: FileConfig, cli: &Cli) -> Result<Self, AppError> {
        let quay = file.quay;

        let url = cli
            .url
            .clone()
            .or(quay.url)
            .filter(|u| !u.trim().is_empty())
            .ok_or(AppError::ConfigMissing("url", "URL"))?;
        let token = cli
            .token
            .clone()
            .or(quay.token)
            .filter(|t| !t.trim().is_empty())
            .ok_or(AppError::ConfigMissing("token", "TOKEN"))?;

        let default_expiration = cli
            .default_expiration
            .clone()
            .or_else(|| quay.default_expiration.map(|d| d.as_text().into_owned()))
            .unwrap_or_else(|| DEFAULT_EXPIRATION.to_string());
        let default_expiration = expiration_seconds("default_expiration", &default_expiration)?;

        let timeout = quay
            .timeout
            .map(|d| d.as_text().into_owned())
            .unwrap_or_else(|| DEFAULT_TIMEOUT.to_string());
        let timeout = parse_duration(&timeout).map_err(|source| AppError::InvalidDuration {
            name: "timeout".to_string(),
            source,
        })?;

        let rules = quay
            .expiration
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                Rule::new(&spec.name, &spec.regex, &spec.expire.as_text()).map_err(|e| match e {
                    AppError::UnnamedRule(_) => AppError::UnnamedRule(i + 1),
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            url,
            token,
            dry_run: cli.dry_run || quay.dry_run,
            default_expiration,
            excludes: quay.exclude_projects.into_iter().collect(),
            rules,
            timeout: Duration::from_secs(timeout),
            max_pages: cli.max_pages.or(quay.max_pages).unwrap_or(DEFAULT_MAX_PAGES),
            concurrency: cli.concurrency.or(quay.concurrency).unwrap_or(1).max(1),
        })
    }

    pub fn is_excluded(&self, repository: &str) -> bool {
        self.excludes.contains(repository)
    }
}

/// Parse an expiration and reject values whose date cannot be represented.
fn expiration_seconds(name: &str, value: &str) -> Result<u64, AppError> {
    let seconds = parse_duration(value).map_err(|source| AppError::InvalidDuration {
        name: name.to_string(),
        source,
    })?;
    if seconds > MAX_EXPIRATION {
        return Err(AppError::ExpirationTooLong {
            name: name.to_string(),
            seconds,
        });
    }
    Ok(seconds)
}

/// Load `KEY=value` pairs from `<dir>/.env` into the process environment.
///
/// Variables already set win over the file. Returns the file that was read.
pub fn load_dotenv(dir: &Path) -> Option<PathBuf> {
    let path = dir.join(".env");
    if !path.is_file() {
        return None;
    }
    match dotenvy::from_path(&path) {
        Ok(()) => Some(path),
        Err(e) => {
            eprintln!("[WARN] Ignoring {}: {}", path.display(), e);
            None
        }
    }
}

fn read_file(path: &Path) -> Result<FileConfig, AppError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file, using environment only");
        return Ok(FileConfig::default());
    }

    tracing::info!(path = %path.display(), "Read configuration");
    let content = std::fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    // An empty file deserializes to null
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }

    serde_yaml::from_str(&content).map_err(|source| AppError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}
