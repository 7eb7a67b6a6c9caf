pub mod action;
pub mod automation;
pub mod chrome;
pub mod crawler;
pub mod error;
pub mod fetcher;
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
pub mod frontier;
pub mod interpreter;
pub mod links;
pub mod progress;
pub mod result;
pub mod selector;
pub mod validator;

pub use action::{Action, ActionRecord};
pub use automation::{AutomationSession, LoadState, Locator, PageScope, SessionLauncher, SessionOptions};
pub use chrome::ChromeLauncher;
pub use crawler::{Crawler, PageMap};
pub use error::{BackendError, ProbeError, ScanError};
pub use interpreter::{ActionFailure, ScenarioInterpreter, ScenarioSummary};
pub use progress::{LogLevel, ProgressCallback, ProgressEvent};
pub use result::{CrawlStatus, PageRecord, PageStatus};
pub use validator::{LinkStatus, LinkValidator, ValidatorOptions};
