use serde::{Serialize, Serializer};
use std::fmt;

/// Status reported for a crawled page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Code(u16),
    /// Navigation produced no response (e.g. about:blank, cached history entry)
    NotAvailable,
    Timeout,
    Error,
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageStatus::Code(code) => write!(f, "{}", code),
            PageStatus::NotAvailable => f.write_str("N/A"),
            PageStatus::Timeout => f.write_str("Timeout"),
            PageStatus::Error => f.write_str("Error"),
        }
    }
}

impl Serialize for PageStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageStatus::Code(code) => serializer.serialize_u16(*code),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum CrawlStatus {
    Crawled,
    Error(String),
}

/// One visited page. Created once per canonical URL and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub status: CrawlStatus,
    pub depth: usize,
    pub parent_url: Option<String>,
    pub status_code: PageStatus,
    pub links_count: usize,
    pub external_links: Vec<String>,
}

impl PageRecord {
    pub fn crawled(
        url: String,
        depth: usize,
        parent_url: Option<String>,
        title: String,
        status_code: PageStatus,
        links_count: usize,
        external_links: Vec<String>,
    ) -> Self {
        Self {
            url,
            title,
            status: CrawlStatus::Crawled,
            depth,
            parent_url,
            status_code,
            links_count,
            external_links,
        }
    }

    pub fn with_error(
        url: String,
        depth: usize,
        parent_url: Option<String>,
        status_code: PageStatus,
        error: String,
    ) -> Self {
        Self {
            url,
            title: "Error".to_string(),
            status: CrawlStatus::Error(error),
            depth,
            parent_url,
            status_code,
            links_count: 0,
            external_links: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, CrawlStatus::Error(_))
    }
}
