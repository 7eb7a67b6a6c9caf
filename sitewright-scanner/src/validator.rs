use crate::error::{ProbeError, Result};
use crate::progress::{ProgressCallback, Reporter};
use futures::future::join_all;
use reqwest::Client;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

/// Outcome of probing one external URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkStatus {
    Code(u16),
    Error(ProbeError),
}

impl LinkStatus {
    /// 4xx/5xx codes and every transport error count as broken
    pub fn is_broken(&self) -> bool {
        match self {
            LinkStatus::Code(code) => (400..600).contains(code),
            LinkStatus::Error(_) => true,
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Code(code) => write!(f, "{}", code),
            LinkStatus::Error(kind) => write!(f, "Error: {}", kind),
        }
    }
}

impl Serialize for LinkStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            LinkStatus::Code(code) => serializer.serialize_u16(*code),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    pub timeout: Duration,
    pub concurrency: usize,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            concurrency: 16,
            max_redirects: 10,
            user_agent: crate::automation::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Probes external links concurrently, bounded by a semaphore
pub struct LinkValidator {
    client: Client,
    options: ValidatorOptions,
    reporter: Reporter,
}

impl LinkValidator {
    pub fn new(options: ValidatorOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(options.user_agent.clone())
            .timeout(options.timeout)
            .connect_timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::limited(options.max_redirects))
            .build()?;

        Ok(Self {
            client,
            options,
            reporter: Reporter::default(),
        })
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.reporter = Reporter::new(Some(callback));
        self
    }

    pub async fn probe(&self, url: &str) -> LinkStatus {
        probe(&self.client, url).await
    }

    /// Probe every unique http/https URL once and wait for all of them
    pub async fn validate<I, S>(&self, urls: I) -> Result<BTreeMap<String, LinkStatus>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique: BTreeSet<String> = urls
            .into_iter()
            .map(Into::into)
            .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
            .collect();

        let total = unique.len();
        if total == 0 {
            return Ok(BTreeMap::new());
        }
        self.reporter.info(format!(
            "Checking {} external links ({} at a time)",
            total, self.options.concurrency
        ));

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut tasks = Vec::with_capacity(total);

        for url in unique {
            let client = self.client.clone();
            let semaphore = semaphore.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (url, LinkStatus::Error(ProbeError::RequestFailed)),
                };
                let status = probe(&client, &url).await;
                (url, status)
            }));
        }

        let mut results = BTreeMap::new();
        for joined in join_all(tasks).await {
            let (url, status) = joined?;
            results.insert(url, status);
        }

        for (i, (url, status)) in results.iter().enumerate() {
            let line = format!("External link {}/{}: {} -> {}", i + 1, total, url, status);
            if status.is_broken() {
                self.reporter.warn(line);
            } else {
                self.reporter.info(line);
            }
        }

        Ok(results)
    }
}

async fn probe(client: &Client, url: &str) -> LinkStatus {
    match client.head(url).send().await {
        Ok(response) => LinkStatus::Code(response.status().as_u16()),
        Err(e) if e.is_timeout() => LinkStatus::Error(ProbeError::Timeout),
        Err(e) if e.is_connect() => LinkStatus::Error(ProbeError::ConnectionFailed),
        Err(e) if e.is_redirect() => LinkStatus::Error(ProbeError::TooManyRedirects),
        Err(e) => {
            debug!("HEAD {} failed ({}), retrying with GET", url, e);
            match client.get(url).send().await {
                Ok(response) => LinkStatus::Code(response.status().as_u16()),
                Err(e) => {
                    debug!("GET {} failed: {}", url, e);
                    LinkStatus::Error(ProbeError::RequestFailed)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broken_classification() {
        assert!(LinkStatus::Code(404).is_broken());
        assert!(LinkStatus::Code(500).is_broken());
        assert!(!LinkStatus::Code(301).is_broken());
        assert!(!LinkStatus::Code(200).is_broken());
        assert!(!LinkStatus::Code(600).is_broken());
        assert!(LinkStatus::Error(ProbeError::Timeout).is_broken());
    }

    #[test]
    fn test_link_status_display() {
        assert_eq!(LinkStatus::Code(404).to_string(), "404");
        assert_eq!(LinkStatus::Error(ProbeError::Timeout).to_string(), "Error: Timeout");
        assert_eq!(
            LinkStatus::Error(ProbeError::ConnectionFailed).to_string(),
            "Error: ConnectionFailed"
        );
    }

    #[test]
    fn test_link_status_serialize() {
        assert_eq!(serde_json::to_value(LinkStatus::Code(200)).unwrap(), serde_json::json!(200));
        assert_eq!(
            serde_json::to_value(LinkStatus::Error(ProbeError::TooManyRedirects)).unwrap(),
            serde_json::json!("Error: TooManyRedirects")
        );
    }
}
