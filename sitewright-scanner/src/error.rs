use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Could not resolve selector: {0}")]
    Resolution(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        url: String,
        message: String,
        status: Option<u16>,
    },

    #[error("Timeout after {secs} seconds. The website '{url}' is taking too long to respond.")]
    NavigationTimeout { url: String, secs: u64 },

    #[error("Failed to initialize browser session: {0}")]
    SessionInit(String),

    #[error("Browser error: {0}")]
    Backend(#[from] BackendError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("Other error: {0}")]
    Other(String),
}

/// Failures reported by an automation backend.
///
/// Backends flatten their own error types into messages at this boundary so
/// the engine never depends on a particular browser crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("{0}")]
    Fault(String),
}

/// Transport-level outcome of an external link probe that produced no status.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProbeError {
    #[error("Timeout")]
    Timeout,

    #[error("ConnectionFailed")]
    ConnectionFailed,

    #[error("TooManyRedirects")]
    TooManyRedirects,

    #[error("RequestFailed")]
    RequestFailed,
}

pub type Result<T> = std::result::Result<T, ScanError>;
