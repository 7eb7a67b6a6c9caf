//! Capability surface of the browser automation backend.
//!
//! The engine never talks to a browser crate directly. Everything it needs from
//! the browser (open a page, navigate, wait, read anchors, act on elements) is
//! expressed by the traits in this module and implemented by a backend such as
//! [`crate::chrome::ChromeSession`].
//!
//! A session is not safe for concurrent callers. The traits deliberately do not
//! require `Send`/`Sync`; a session is created and used on one worker thread.

use crate::error::{BackendError, Result, ScanError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Options used when creating the isolated browsing context
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
    /// Default timeout applied to navigation and element lookups
    pub default_timeout: Duration,
    pub sandbox: bool,
    pub chrome_path: Option<std::path::PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_timeout: Duration::from_secs(60),
            sandbox: false,
            chrome_path: None,
        }
    }
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}

/// Document load states a page can be waited on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Load,
    DomContentLoaded,
    NetworkIdle,
}

impl FromStr for LoadState {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "load" => Ok(LoadState::Load),
            "domcontentloaded" => Ok(LoadState::DomContentLoaded),
            "networkidle" => Ok(LoadState::NetworkIdle),
            other => Err(ScanError::Validation(format!("unknown load state '{}'", other))),
        }
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadState::Load => "load",
            LoadState::DomContentLoaded => "domcontentloaded",
            LoadState::NetworkIdle => "networkidle",
        };
        f.write_str(name)
    }
}

/// Value of a named option passed to a structured lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Str(String),
}

impl ArgValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            ArgValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            ArgValue::Bool(_) => None,
        }
    }
}

pub type LocatorOptions = BTreeMap<String, ArgValue>;

/// Accessibility-oriented lookups supported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredKind {
    Role,
    Text,
    Label,
    Placeholder,
    TestId,
    Title,
    AltText,
}

impl StructuredKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "role" => Some(StructuredKind::Role),
            "text" => Some(StructuredKind::Text),
            "label" => Some(StructuredKind::Label),
            "placeholder" => Some(StructuredKind::Placeholder),
            "test_id" => Some(StructuredKind::TestId),
            "title" => Some(StructuredKind::Title),
            "alt_text" => Some(StructuredKind::AltText),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StructuredKind::Role => "role",
            StructuredKind::Text => "text",
            StructuredKind::Label => "label",
            StructuredKind::Placeholder => "placeholder",
            StructuredKind::TestId => "test_id",
            StructuredKind::Title => "title",
            StructuredKind::AltText => "alt_text",
        }
    }
}

/// CSS matching elements that carry `role`, explicitly or implicitly
pub fn role_css(role: &str) -> String {
    let implicit = match role {
        "button" => "button, input[type=button], input[type=submit], input[type=reset], ",
        "link" => "a[href], ",
        "textbox" => "input:not([type]), input[type=text], input[type=email], input[type=password], \
                      input[type=search], input[type=tel], input[type=url], textarea, ",
        "checkbox" => "input[type=checkbox], ",
        "radio" => "input[type=radio], ",
        "heading" => "h1, h2, h3, h4, h5, h6, ",
        "combobox" => "select, ",
        "img" => "img[alt], ",
        _ => "",
    };
    format!("{}[role=\"{}\"]", implicit, role.replace('"', ""))
}

/// A concrete element lookup produced by the selector resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Locator {
    /// Raw selector handed to the backend unchanged (CSS)
    Raw { selector: String },
    XPath { expression: String },
    /// Explicit text match (`text=...` or a quoted selector)
    Text { text: String },
    Structured {
        kind: StructuredKind,
        value: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        options: LocatorOptions,
    },
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Raw { selector } => write!(f, "{}", selector),
            Locator::XPath { expression } => write!(f, "xpath={}", expression),
            Locator::Text { text } => write!(f, "text={}", text),
            Locator::Structured { kind, value, options } => {
                write!(f, "{}({:?}", kind.name(), value)?;
                for (key, val) in options {
                    match val {
                        ArgValue::Bool(b) => write!(f, ", {}={}", key, b)?,
                        ArgValue::Str(s) => write!(f, ", {}={:?}", key, s)?,
                    }
                }
                write!(f, ")")
            }
        }
    }
}

/// Result of a top-level navigation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationResponse {
    /// HTTP status of the main document, when the backend can report it
    pub status: Option<u16>,
}

/// One ephemeral page (tab) opened on a session
pub trait PageScope {
    /// Navigate and wait until `wait_until` is reached, bounded by the session timeout
    fn goto(&self, url: &str, wait_until: LoadState) -> std::result::Result<NavigationResponse, BackendError>;

    fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> std::result::Result<(), BackendError>;

    fn title(&self) -> std::result::Result<String, BackendError>;

    fn current_url(&self) -> std::result::Result<String, BackendError>;

    /// Raw `href` attribute of every anchor on the page, in document order
    fn anchor_hrefs(&self) -> std::result::Result<Vec<String>, BackendError>;

    fn fill(&self, locator: &Locator, text: &str) -> std::result::Result<(), BackendError>;

    fn click(&self, locator: &Locator) -> std::result::Result<(), BackendError>;

    fn check(&self, locator: &Locator) -> std::result::Result<(), BackendError>;

    fn close(&self) -> std::result::Result<(), BackendError>;
}

/// An isolated browsing context (shared cookies, fixed viewport and user agent)
pub trait AutomationSession {
    fn open_page(&self) -> std::result::Result<Box<dyn PageScope + '_>, BackendError>;

    fn close(&self) -> std::result::Result<(), BackendError>;
}

/// Creates a session. Called on the crawl worker thread so the session never
/// has to cross threads.
pub trait SessionLauncher: Send + 'static {
    type Session: AutomationSession;

    fn launch(&self, options: &SessionOptions) -> Result<Self::Session>;
}

/// Page scope guard: the page is closed when the guard is dropped
pub struct ScopedPage<'s> {
    page: Box<dyn PageScope + 's>,
}

impl<'s> ScopedPage<'s> {
    pub fn open(session: &'s dyn AutomationSession) -> Result<Self> {
        let page = session.open_page()?;
        Ok(Self { page })
    }

    pub fn page(&self) -> &dyn PageScope {
        self.page.as_ref()
    }
}

impl Drop for ScopedPage<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.page.close() {
            warn!("Failed to close page: {}", e);
        }
    }
}
