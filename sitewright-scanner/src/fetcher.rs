use crate::automation::{AutomationSession, LoadState, PageScope, ScopedPage};
use crate::error::{BackendError, Result, ScanError};
use crate::links::classify_links;
use crate::result::PageStatus;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const PARTIAL_LOAD_SUFFIX: &str = " (Note: Page loaded partially)";

static STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"status=(\d{3})").expect("status pattern is valid"));

/// What one navigation produced
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot {
    pub title: String,
    pub final_url: String,
    pub status: PageStatus,
    pub internal_links: Vec<String>,
    pub external_links: Vec<String>,
}

/// HTTP status embedded in an automation-layer fault message (`... status=503 ...`)
pub fn embedded_status(message: &str) -> Option<u16> {
    STATUS_RE
        .captures(message)
        .and_then(|caps| caps[1].parse().ok())
}

/// Navigates to one URL on a fresh page and extracts title, status and links
#[derive(Debug, Clone)]
pub struct PageFetcher {
    root_host: String,
    navigation_timeout: Duration,
    network_idle_timeout: Duration,
}

impl PageFetcher {
    pub fn new(root_host: impl Into<String>) -> Self {
        Self {
            root_host: root_host.into(),
            navigation_timeout: Duration::from_secs(60),
            network_idle_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_network_idle_timeout(mut self, timeout: Duration) -> Self {
        self.network_idle_timeout = timeout;
        self
    }

    pub fn root_host(&self) -> &str {
        &self.root_host
    }

    pub fn fetch(&self, session: &dyn AutomationSession, url: &str) -> Result<PageSnapshot> {
        let scope = ScopedPage::open(session)?;
        let page = scope.page();

        match page.goto(url, LoadState::DomContentLoaded) {
            Ok(response) => {
                if let Err(e) = page.wait_for_load_state(LoadState::NetworkIdle, self.network_idle_timeout) {
                    debug!("Network did not settle for {}: {}", url, e);
                }
                let status = response
                    .status
                    .map(PageStatus::Code)
                    .unwrap_or(PageStatus::NotAvailable);
                self.extract(page, url, status, false)
            }
            Err(BackendError::Timeout(message)) => {
                warn!("Navigation to {} timed out ({}), extracting what loaded", url, message);
                self.extract(page, url, PageStatus::Timeout, true)
                    .map_err(|e| {
                        debug!("Partial extraction for {} failed: {}", url, e);
                        ScanError::NavigationTimeout {
                            url: url.to_string(),
                            secs: self.navigation_timeout.as_secs(),
                        }
                    })
            }
            Err(BackendError::Fault(message)) | Err(BackendError::ElementNotFound(message)) => {
                Err(ScanError::Navigation {
                    url: url.to_string(),
                    status: embedded_status(&message),
                    message,
                })
            }
        }
    }

    fn extract(
        &self,
        page: &dyn PageScope,
        requested: &str,
        status: PageStatus,
        partial: bool,
    ) -> Result<PageSnapshot> {
        let mut title = page.title()?;
        if partial {
            title.push_str(PARTIAL_LOAD_SUFFIX);
        }

        let final_url = page.current_url()?;
        let base = Url::parse(&final_url)
            .or_else(|_| Url::parse(requested))
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", final_url, e)))?;

        let hrefs = page.anchor_hrefs()?;
        let links = classify_links(&hrefs, &base, &self.root_host);
        debug!(
            "{}: {} anchors, {} internal, {} external",
            requested,
            hrefs.len(),
            links.internal.len(),
            links.external.len()
        );

        Ok(PageSnapshot {
            title,
            final_url,
            status,
            internal_links: links.internal,
            external_links: links.external,
        })
    }
}

/// Status recorded for a page whose fetch failed
pub fn failure_status(error: &ScanError) -> PageStatus {
    match error {
        ScanError::NavigationTimeout { .. } => PageStatus::Timeout,
        ScanError::Navigation {
            status: Some(code), ..
        } => PageStatus::Code(*code),
        ScanError::Backend(BackendError::Timeout(_)) => PageStatus::Timeout,
        _ => PageStatus::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_status() {
        assert_eq!(embedded_status("net::ERR_HTTP_RESPONSE_CODE_FAILURE status=503"), Some(503));
        assert_eq!(embedded_status("Navigate failed: net::ERR_NAME_NOT_RESOLVED"), None);
    }

    #[test]
    fn test_failure_status() {
        let timeout = ScanError::NavigationTimeout {
            url: "https://a.test/".into(),
            secs: 60,
        };
        assert_eq!(failure_status(&timeout), PageStatus::Timeout);

        let with_code = ScanError::Navigation {
            url: "https://a.test/".into(),
            message: "status=502".into(),
            status: Some(502),
        };
        assert_eq!(failure_status(&with_code), PageStatus::Code(502));

        let generic = ScanError::Navigation {
            url: "https://a.test/".into(),
            message: "boom".into(),
            status: None,
        };
        assert_eq!(failure_status(&generic), PageStatus::Error);
    }

    #[test]
    fn test_timeout_error_message() {
        let err = ScanError::NavigationTimeout {
            url: "https://slow.test/".into(),
            secs: 60,
        };
        assert_eq!(
            err.to_string(),
            "Timeout after 60 seconds. The website 'https://slow.test/' is taking too long to respond."
        );
    }
}
