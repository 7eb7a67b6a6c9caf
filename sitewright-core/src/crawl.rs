use crate::error::CrawlError;
use crate::report::{CrawlReport, build_link_tables};
use crate::scenario::Scenario;
use chrono::Utc;
use serde::Serialize;
use sitewright_scanner::links::normalize_url;
use sitewright_scanner::progress::Reporter;
use sitewright_scanner::{
    AutomationSession, Crawler, LinkValidator, LogLevel, PageMap, PageRecord, ProgressCallback, ProgressEvent,
    SessionLauncher, SessionOptions, ValidatorOptions,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender, error::TryRecvError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Options for configuring a crawl run
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub start_url: String,
    pub max_depth: usize,
    pub scenario: Option<Scenario>,
    pub session: SessionOptions,
    pub validator: ValidatorOptions,
    /// How often the caller drains the worker's message channel
    pub poll_interval: Duration,
}

impl CrawlOptions {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            max_depth: 1,
            scenario: None,
            session: SessionOptions::default(),
            validator: ValidatorOptions::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// What happened to the loaded scenario, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    NotLoaded,
    NotMatched {
        name: String,
        pattern: String,
    },
    Completed {
        name: String,
        executed: usize,
        skipped: usize,
    },
    Failed {
        name: String,
        index: usize,
        kind: String,
        reason: String,
    },
}

impl std::fmt::Display for ScenarioOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioOutcome::NotLoaded => f.write_str("none loaded"),
            ScenarioOutcome::NotMatched { name, pattern } => {
                write!(f, "'{}' not run (start URL does not match '{}')", name, pattern)
            }
            ScenarioOutcome::Completed { name, executed, skipped } => {
                write!(f, "'{}' completed ({} executed, {} skipped)", name, executed, skipped)
            }
            ScenarioOutcome::Failed { name, index, kind, reason } => {
                write!(f, "'{}' failed at action {} ({}): {}", name, index, kind, reason)
            }
        }
    }
}

/// Events sent from the crawl worker thread to the caller
#[derive(Debug)]
pub enum CrawlMessage {
    Log { level: LogLevel, message: String },
    PageCrawled { record: PageRecord, visited: usize },
    ScenarioFinished(ScenarioOutcome),
    Finished { pages: PageMap },
    Fatal(CrawlError),
}

impl From<ProgressEvent> for CrawlMessage {
    fn from(event: ProgressEvent) -> Self {
        match event {
            ProgressEvent::Log { level, message } => CrawlMessage::Log { level, message },
            ProgressEvent::PageCrawled { record, visited } => CrawlMessage::PageCrawled { record, visited },
        }
    }
}

/// Callback invoked on the caller's side for every drained message
pub type CrawlMessageCallback = Arc<dyn Fn(&CrawlMessage) + Send + Sync>;

/// The part of [`CrawlOptions`] the worker thread owns
struct CrawlJob {
    start_url: String,
    max_depth: usize,
    scenario: Option<Scenario>,
    session: SessionOptions,
}

fn send(tx: &UnboundedSender<CrawlMessage>, message: CrawlMessage) {
    if tx.send(message).is_err() {
        debug!("Crawl message receiver dropped");
    }
}

fn run_scenario(
    crawler: &Crawler,
    session: &dyn AutomationSession,
    start_url: &str,
    scenario: Option<&Scenario>,
    reporter: &Reporter,
) -> ScenarioOutcome {
    let Some(scenario) = scenario else {
        reporter.info(format!("No scenario loaded. Running a normal crawl of {}", start_url));
        return ScenarioOutcome::NotLoaded;
    };

    if !scenario.matches(start_url) {
        reporter.info(format!(
            "Scenario '{}' does not match start URL '{}' and will not run",
            scenario.name, start_url
        ));
        return ScenarioOutcome::NotMatched {
            name: scenario.name.clone(),
            pattern: scenario.target_url_pattern.clone(),
        };
    }

    reporter.info(format!("Scenario '{}' matches {}. Running it first", scenario.name, start_url));
    match crawler.replay_scenario(session, start_url, &scenario.name, &scenario.actions) {
        Ok(summary) => ScenarioOutcome::Completed {
            name: scenario.name.clone(),
            executed: summary.executed,
            skipped: summary.skipped,
        },
        Err(failure) => ScenarioOutcome::Failed {
            name: scenario.name.clone(),
            index: failure.index,
            kind: failure.kind,
            reason: failure.reason,
        },
    }
}

/// Body of the crawl worker thread. The session is created, used and closed
/// here and never leaves this thread.
fn run_worker<L: SessionLauncher>(job: CrawlJob, launcher: L, tx: UnboundedSender<CrawlMessage>) {
    let forward: ProgressCallback = {
        let tx = tx.clone();
        Arc::new(move |event: ProgressEvent| send(&tx, event.into()))
    };
    let reporter = Reporter::new(Some(forward.clone()));

    reporter.info(format!(
        "Starting crawl from {} with max depth {}",
        job.start_url, job.max_depth
    ));
    reporter.info("Initializing browser...");

    let session = match launcher.launch(&job.session) {
        Ok(session) => session,
        Err(e) => {
            send(&tx, CrawlMessage::Fatal(CrawlError::from_worker(e)));
            return;
        }
    };

    let crawler = Crawler::new()
        .with_max_depth(job.max_depth)
        .with_navigation_timeout(job.session.default_timeout)
        .with_progress_callback(forward);

    // Scenario failure is reported but does not stop the crawl
    let outcome = run_scenario(&crawler, &session, &job.start_url, job.scenario.as_ref(), &reporter);
    send(&tx, CrawlMessage::ScenarioFinished(outcome));

    let result = crawler.crawl(&session, &job.start_url);

    if let Err(e) = session.close() {
        warn!("Failed to close browser session: {}", e);
    }

    match result {
        Ok(pages) => send(&tx, CrawlMessage::Finished { pages }),
        Err(e) => {
            reporter.error(format!("Error during crawl: {}", e));
            send(&tx, CrawlMessage::Fatal(CrawlError::from_worker(e)));
        }
    }
}

/// Without a caller callback, worker log lines go to the tracing subscriber
fn trace_message(message: &CrawlMessage) {
    if let CrawlMessage::Log { level, message } = message {
        match level {
            LogLevel::Info => info!("{}", message),
            LogLevel::Warn => warn!("{}", message),
            LogLevel::Error => error!("{}", message),
        }
    }
}

fn bridge(callback: &Option<CrawlMessageCallback>) -> Option<ProgressCallback> {
    callback.clone().map(|cb| -> ProgressCallback {
        Arc::new(move |event: ProgressEvent| {
            let message = CrawlMessage::from(event);
            cb(&message);
        })
    })
}

/// Crawl `options.start_url` on a dedicated worker thread, then validate the
/// external links it found.
///
/// The worker talks to this task only through a message channel, which is
/// drained every `options.poll_interval`. Every drained message is passed to
/// `callback` before it is handled.
pub async fn execute_crawl<L: SessionLauncher>(
    options: CrawlOptions,
    launcher: L,
    callback: Option<CrawlMessageCallback>,
) -> Result<CrawlReport, CrawlError> {
    let CrawlOptions {
        start_url,
        max_depth,
        scenario,
        session,
        validator,
        poll_interval,
    } = options;

    let start_url = normalize_url(&start_url)
        .ok_or_else(|| CrawlError::InvalidStartUrl(format!("'{}' is not an http(s) URL", start_url)))?;
    let started_at = Utc::now();
    let run_id = Uuid::new_v4();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let job = CrawlJob {
        start_url: start_url.clone(),
        max_depth,
        scenario,
        session,
    };
    let handle = thread::Builder::new()
        .name("sitewright-crawl".to_string())
        .spawn(move || run_worker(job, launcher, tx))
        .map_err(|e| CrawlError::WorkerDied(e.to_string()))?;

    let mut ticker = tokio::time::interval(poll_interval);
    let mut scenario_outcome = ScenarioOutcome::NotLoaded;

    let finished = 'poll: loop {
        ticker.tick().await;
        loop {
            let message = match rx.try_recv() {
                Ok(message) => message,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    break 'poll Err(CrawlError::WorkerDied("worker exited without a result".to_string()));
                }
            };
            match callback {
                Some(ref cb) => cb(&message),
                None => trace_message(&message),
            }
            match message {
                CrawlMessage::ScenarioFinished(outcome) => scenario_outcome = outcome,
                CrawlMessage::Finished { pages } => break 'poll Ok(pages),
                CrawlMessage::Fatal(error) => break 'poll Err(error),
                CrawlMessage::Log { .. } | CrawlMessage::PageCrawled { .. } => {}
            }
        }
    };

    let joined = tokio::task::spawn_blocking(move || handle.join()).await;
    if !matches!(joined, Ok(Ok(()))) {
        return Err(CrawlError::WorkerDied("crawl worker panicked".to_string()));
    }
    let pages = finished?;

    let reporter = Reporter::new(bridge(&callback));
    let external: Vec<String> = pages
        .values()
        .flat_map(|page| page.external_links.iter().cloned())
        .collect();

    let mut link_validator = LinkValidator::new(validator)?;
    if let Some(progress) = bridge(&callback) {
        link_validator = link_validator.with_progress_callback(progress);
    }
    let statuses = link_validator.validate(external).await?;
    if statuses.is_empty() {
        reporter.info("No external links found to check.");
    } else {
        reporter.info("External link status checking complete.");
    }

    let tables = build_link_tables(&pages, &statuses);
    Ok(CrawlReport {
        run_id,
        start_url,
        max_depth,
        started_at,
        finished_at: Utc::now(),
        scenario: scenario_outcome,
        pages,
        external_links: tables.external,
        broken_links: tables.broken,
    })
}
