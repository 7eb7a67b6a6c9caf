use sitewright_scanner::ScanError;
use std::path::PathBuf;
use thiserror::Error;

/// A scenario file that cannot be used. The whole file is rejected.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Could not read scenario file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scenario file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Scenario file is missing key '{0}'")]
    MissingKey(&'static str),

    #[error("Scenario field '{field}' must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Scenario action {index} is invalid: {reason}")]
    InvalidAction { index: usize, reason: String },
}

#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("No actions could be extracted from the recorded script")]
    NoActions,

    #[error("Could not read script {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures that end a crawl run
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Failed to initialize browser. Cannot continue crawling: {0}")]
    SessionInit(String),

    #[error("Invalid start URL: {0}")]
    InvalidStartUrl(String),

    #[error("Crawl failed: {0}")]
    Crawl(String),

    #[error("Crawl worker stopped unexpectedly: {0}")]
    WorkerDied(String),

    #[error("Link validation failed: {0}")]
    Validator(#[from] ScanError),
}

impl CrawlError {
    /// Classify an error raised inside the crawl worker
    pub fn from_worker(error: ScanError) -> Self {
        match error {
            ScanError::SessionInit(message) => CrawlError::SessionInit(message),
            ScanError::InvalidUrl(message) => CrawlError::InvalidStartUrl(message),
            other => CrawlError::Crawl(other.to_string()),
        }
    }
}
