use crate::action::ActionRecord;
use crate::automation::{AutomationSession, LoadState, ScopedPage};
use crate::error::{Result, ScanError};
use crate::fetcher::{failure_status, PageFetcher};
use crate::frontier::Frontier;
use crate::interpreter::{ActionFailure, ScenarioInterpreter, ScenarioSummary};
use crate::links::{host_of, normalize_url};
use crate::progress::{ProgressCallback, Reporter};
use crate::result::PageRecord;
use indexmap::IndexMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Crawl results keyed by canonical URL, in visit order
pub type PageMap = IndexMap<String, PageRecord>;

/// Breadth-first crawler over one automation session.
///
/// The session is passed to every call rather than owned, so the same session
/// serves the scenario replay and the traversal that follows it.
pub struct Crawler {
    max_depth: usize,
    navigation_timeout: Duration,
    network_idle_timeout: Duration,
    reporter: Reporter,
}

impl Default for Crawler {
    fn default() -> Self {
        Self::new()
    }
}

impl Crawler {
    pub fn new() -> Self {
        Self {
            max_depth: 1,
            navigation_timeout: Duration::from_secs(60),
            network_idle_timeout: Duration::from_secs(10),
            reporter: Reporter::default(),
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_network_idle_timeout(mut self, timeout: Duration) -> Self {
        self.network_idle_timeout = timeout;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.reporter = Reporter::new(Some(callback));
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Open the start page and replay scenario actions on it
    pub fn replay_scenario(
        &self,
        session: &dyn AutomationSession,
        start_url: &str,
        scenario_name: &str,
        actions: &[ActionRecord],
    ) -> std::result::Result<ScenarioSummary, ActionFailure> {
        self.reporter
            .info(format!("Running scenario '{}' on {}", scenario_name, start_url));

        let opened = ScopedPage::open(session).and_then(|scope| {
            scope.page().goto(start_url, LoadState::DomContentLoaded)?;
            Ok(scope)
        });
        let scope = match opened {
            Ok(scope) => scope,
            Err(e) => {
                self.reporter
                    .error(format!("Could not open {} for scenario: {}", start_url, e));
                return Err(ActionFailure {
                    index: 0,
                    kind: String::new(),
                    reason: e.to_string(),
                });
            }
        };

        let outcome = ScenarioInterpreter::with_reporter(self.reporter.clone()).run(scope.page(), actions);
        match &outcome {
            Ok(_) => self
                .reporter
                .info(format!("Scenario '{}' completed successfully", scenario_name)),
            Err(failure) => self
                .reporter
                .error(format!("Scenario '{}' failed: {}", scenario_name, failure)),
        }
        outcome
    }

    pub fn crawl(&self, session: &dyn AutomationSession, start_url: &str) -> Result<PageMap> {
        let start = normalize_url(start_url)
            .ok_or_else(|| ScanError::InvalidUrl(format!("cannot crawl '{}'", start_url)))?;
        let root_host = host_of(&start)
            .ok_or_else(|| ScanError::InvalidUrl(format!("'{}' has no host", start)))?;

        info!("Starting crawl of {} (max depth {})", start, self.max_depth);
        let started = Instant::now();

        let fetcher = PageFetcher::new(root_host)
            .with_navigation_timeout(self.navigation_timeout)
            .with_network_idle_timeout(self.network_idle_timeout);

        let mut frontier = Frontier::new(self.max_depth);
        frontier.enqueue(start, 0, None);
        let mut pages = PageMap::new();

        while let Some(entry) = frontier.dequeue() {
            self.reporter
                .info(format!("Crawling (depth {}): {}", entry.depth, entry.url));

            let record = match fetcher.fetch(session, &entry.url) {
                Ok(snapshot) => {
                    if entry.depth < self.max_depth {
                        for link in &snapshot.internal_links {
                            frontier.enqueue(link.clone(), entry.depth + 1, Some(entry.url.clone()));
                        }
                    }
                    PageRecord::crawled(
                        entry.url.clone(),
                        entry.depth,
                        entry.parent.clone(),
                        snapshot.title,
                        snapshot.status,
                        snapshot.internal_links.len() + snapshot.external_links.len(),
                        snapshot.external_links,
                    )
                }
                Err(e) => {
                    self.reporter.error(format!("Error crawling {}: {}", entry.url, e));
                    PageRecord::with_error(
                        entry.url.clone(),
                        entry.depth,
                        entry.parent.clone(),
                        failure_status(&e),
                        e.to_string(),
                    )
                }
            };

            debug!("Recorded {} with status {}", record.url, record.status_code);
            self.reporter.page_crawled(&record, pages.len() + 1);
            pages.insert(entry.url, record);
        }

        self.reporter.info(format!(
            "Crawl complete. Visited {} pages in {:.1}s",
            pages.len(),
            started.elapsed().as_secs_f64()
        ));
        Ok(pages)
    }
}
