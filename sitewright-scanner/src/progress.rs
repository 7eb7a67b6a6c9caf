use crate::result::PageRecord;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => f.write_str("INFO"),
            LogLevel::Warn => f.write_str("WARN"),
            LogLevel::Error => f.write_str("ERROR"),
        }
    }
}

/// Human-facing events emitted while a crawl runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Log { level: LogLevel, message: String },
    PageCrawled { record: PageRecord, visited: usize },
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Sends progress lines to the callback when one is set, otherwise to the
/// tracing subscriber. A line never goes to both.
#[derive(Clone, Default)]
pub struct Reporter {
    callback: Option<ProgressCallback>,
}

impl Reporter {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self { callback }
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        if let Some(ref callback) = self.callback {
            callback(ProgressEvent::Log { level, message });
            return;
        }
        match level {
            LogLevel::Info => info!("{}", message),
            LogLevel::Warn => warn!("{}", message),
            LogLevel::Error => error!("{}", message),
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn page_crawled(&self, record: &PageRecord, visited: usize) {
        if let Some(ref callback) = self.callback {
            callback(ProgressEvent::PageCrawled {
                record: record.clone(),
                visited,
            });
        }
    }
}
