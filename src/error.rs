use std::path::PathBuf;

use thiserror::Error;

/// A duration string that is neither plain seconds nor `<integer><unit>`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid duration {0:?} (expected seconds or <integer><s|m|h|d|w>)")]
pub struct DurationError(pub String);

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Quay {0} not set. Use --{0}, QUAY_{1} or the config file")]
    ConfigMissing(&'static str, &'static str),

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid expiration for {name}: {source}")]
    InvalidDuration {
        name: String,
        #[source]
        source: DurationError,
    },

    #[error("Invalid regex pattern in rule {name}: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Expiration for {name} is too long: {seconds}s exceeds 100 years")]
    ExpirationTooLong { name: String, seconds: u64 },

    #[error("Quay token contains characters not allowed in an HTTP header")]
    InvalidToken,

    #[error("Expiration rule #{0} has an empty name")]
    UnnamedRule(usize),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures of a single registry call. The reconciler isolates these per call.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("registry returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("repository listing did not finish within {0} pages")]
    PageLimitExceeded(usize),
}
