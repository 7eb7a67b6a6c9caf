//! In-memory automation backend serving static HTML.
//!
//! Pages are parsed with `scraper` and element lookups run against the parsed
//! document. Every call is appended to a shared journal so callers can assert
//! on what the engine did. XPath lookups are not supported.

use crate::automation::{
    role_css, ArgValue, AutomationSession, LoadState, Locator, LocatorOptions, NavigationResponse, PageScope,
    SessionLauncher, SessionOptions, StructuredKind,
};
use crate::error::{BackendError, Result, ScanError};
use scraper::{ElementRef, Html, Selector};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a URL answers a navigation
#[derive(Debug, Clone)]
pub enum FixtureResponse {
    Page {
        status: Option<u16>,
        html: String,
        settles: bool,
    },
    /// Navigation times out; `partial` is what had loaded by then
    Timeout { partial: Option<String> },
    Fault(String),
}

#[derive(Debug, Clone, Default)]
pub struct FixtureSite {
    responses: HashMap<String, FixtureResponse>,
    redirects: HashMap<String, String>,
}

impl FixtureSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, status: u16, html: &str) -> Self {
        self.responses.insert(
            url.to_string(),
            FixtureResponse::Page {
                status: Some(status),
                html: html.to_string(),
                settles: true,
            },
        );
        self
    }

    /// A page whose navigation reports no response status
    pub fn page_without_status(mut self, url: &str, html: &str) -> Self {
        self.responses.insert(
            url.to_string(),
            FixtureResponse::Page {
                status: None,
                html: html.to_string(),
                settles: true,
            },
        );
        self
    }

    /// A page that loads but never reaches network idle
    pub fn busy_page(mut self, url: &str, status: u16, html: &str) -> Self {
        self.responses.insert(
            url.to_string(),
            FixtureResponse::Page {
                status: Some(status),
                html: html.to_string(),
                settles: false,
            },
        );
        self
    }

    pub fn timeout(mut self, url: &str, partial: Option<&str>) -> Self {
        self.responses.insert(
            url.to_string(),
            FixtureResponse::Timeout {
                partial: partial.map(str::to_string),
            },
        );
        self
    }

    pub fn fault(mut self, url: &str, message: &str) -> Self {
        self.responses
            .insert(url.to_string(), FixtureResponse::Fault(message.to_string()));
        self
    }

    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }
}

pub type Journal = Arc<Mutex<Vec<String>>>;

fn record(journal: &Journal, entry: String) {
    if let Ok(mut entries) = journal.lock() {
        entries.push(entry);
    }
}

/// Creates [`FixtureSession`]s over a shared site
#[derive(Debug, Clone)]
pub struct FixtureLauncher {
    site: Arc<FixtureSite>,
    journal: Journal,
    launch_error: Option<String>,
}

impl FixtureLauncher {
    pub fn new(site: FixtureSite) -> Self {
        Self {
            site: Arc::new(site),
            journal: Journal::default(),
            launch_error: None,
        }
    }

    /// A launcher whose sessions never start
    pub fn failing(message: &str) -> Self {
        Self {
            site: Arc::new(FixtureSite::default()),
            journal: Journal::default(),
            launch_error: Some(message.to_string()),
        }
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

impl SessionLauncher for FixtureLauncher {
    type Session = FixtureSession;

    fn launch(&self, options: &SessionOptions) -> Result<FixtureSession> {
        if let Some(ref message) = self.launch_error {
            return Err(ScanError::SessionInit(message.clone()));
        }
        record(
            &self.journal,
            format!("launch {}x{}", options.viewport_width, options.viewport_height),
        );
        Ok(FixtureSession {
            site: self.site.clone(),
            journal: self.journal.clone(),
        })
    }
}

pub struct FixtureSession {
    site: Arc<FixtureSite>,
    journal: Journal,
}

impl FixtureSession {
    pub fn new(site: FixtureSite) -> Self {
        Self {
            site: Arc::new(site),
            journal: Journal::default(),
        }
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

impl AutomationSession for FixtureSession {
    fn open_page(&self) -> std::result::Result<Box<dyn PageScope + '_>, BackendError> {
        record(&self.journal, "open".to_string());
        Ok(Box::new(FixturePage {
            site: self.site.as_ref(),
            journal: &self.journal,
            current: RefCell::new(None),
        }))
    }

    fn close(&self) -> std::result::Result<(), BackendError> {
        record(&self.journal, "close session".to_string());
        Ok(())
    }
}

struct Loaded {
    url: String,
    html: String,
    settles: bool,
}

pub struct FixturePage<'s> {
    site: &'s FixtureSite,
    journal: &'s Journal,
    current: RefCell<Option<Loaded>>,
}

impl FixturePage<'_> {
    fn with_document<T>(
        &self,
        f: impl FnOnce(&Html) -> std::result::Result<T, BackendError>,
    ) -> std::result::Result<T, BackendError> {
        let current = self.current.borrow();
        let loaded = current
            .as_ref()
            .ok_or_else(|| BackendError::Fault("no document loaded".to_string()))?;
        let document = Html::parse_document(&loaded.html);
        f(&document)
    }

    fn act(&self, verb: &str, locator: &Locator, check: impl Fn(ElementRef<'_>) -> bool) -> std::result::Result<(), BackendError> {
        self.with_document(|document| {
            let element = find(document, locator)?
                .ok_or_else(|| BackendError::ElementNotFound(locator.to_string()))?;
            if !check(element) {
                return Err(BackendError::Fault(format!(
                    "cannot {} <{}> matched by {}",
                    verb,
                    element.value().name(),
                    locator
                )));
            }
            Ok(())
        })?;
        record(self.journal, format!("{} {}", verb, locator));
        Ok(())
    }
}

fn css(selector: &str) -> std::result::Result<Selector, BackendError> {
    Selector::parse(selector).map_err(|e| BackendError::Fault(format!("invalid selector '{}': {}", selector, e)))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn matches_text(candidate: Option<&str>, needle: &str, exact: bool) -> bool {
    let Some(candidate) = candidate else {
        return false;
    };
    if exact {
        candidate.trim() == needle
    } else {
        candidate.to_lowercase().contains(&needle.to_lowercase())
    }
}

fn exact(options: &LocatorOptions) -> bool {
    options.get("exact").and_then(ArgValue::as_bool).unwrap_or(false)
}

fn find<'a>(document: &'a Html, locator: &Locator) -> std::result::Result<Option<ElementRef<'a>>, BackendError> {
    let by_attribute = |attribute: &str, value: &str, exact: bool| -> std::result::Result<Option<ElementRef<'a>>, BackendError> {
        let selector = css(&format!("[{}]", attribute))?;
        Ok(document
            .select(&selector)
            .find(|el| matches_text(el.value().attr(attribute), value, exact)))
    };
    let deepest_text = |value: &str, exact: bool| -> std::result::Result<Option<ElementRef<'a>>, BackendError> {
        let all = css("body *")?;
        let hit = |el: ElementRef<'_>| matches_text(Some(text_of(el).as_str()), value, exact);
        Ok(document
            .select(&all)
            .find(|el| hit(*el) && !el.children().filter_map(ElementRef::wrap).any(|c| hit(c))))
    };

    match locator {
        Locator::Raw { selector } => Ok(document.select(&css(selector)?).next()),
        Locator::XPath { expression } => Err(BackendError::Fault(format!(
            "xpath lookups are not supported here: {}",
            expression
        ))),
        Locator::Text { text } => deepest_text(text, false),
        Locator::Structured { kind, value, options } => {
            let exact = exact(options);
            match kind {
                StructuredKind::Role => {
                    let candidates = css(&role_css(value))?;
                    let name = options.get("name").and_then(ArgValue::as_str);
                    Ok(document.select(&candidates).find(|el| match name {
                        Some(name) => {
                            matches_text(el.value().attr("aria-label"), name, exact)
                                || matches_text(Some(text_of(*el).as_str()), name, exact)
                                || matches_text(el.value().attr("value"), name, exact)
                                || matches_text(el.value().attr("placeholder"), name, exact)
                        }
                        None => true,
                    }))
                }
                StructuredKind::Text => deepest_text(value, exact),
                StructuredKind::Label => {
                    let labels = css("label")?;
                    let Some(label) = document
                        .select(&labels)
                        .find(|l| matches_text(Some(text_of(*l).as_str()), value, exact))
                    else {
                        return by_attribute("aria-label", value, exact);
                    };
                    match label.value().attr("for") {
                        Some(id) => Ok(document.select(&css(&format!("[id=\"{}\"]", id))?).next()),
                        None => Ok(label.select(&css("input, textarea, select")?).next()),
                    }
                }
                StructuredKind::Placeholder => by_attribute("placeholder", value, exact),
                StructuredKind::Title => by_attribute("title", value, exact),
                StructuredKind::AltText => by_attribute("alt", value, exact),
                StructuredKind::TestId => by_attribute("data-testid", value, true),
            }
        }
    }
}

fn is_fillable(element: ElementRef<'_>) -> bool {
    match element.value().name() {
        "textarea" => true,
        "input" => !matches!(
            element.value().attr("type"),
            Some("checkbox" | "radio" | "submit" | "button" | "hidden")
        ),
        _ => element.value().attr("contenteditable").is_some(),
    }
}

fn is_checkable(element: ElementRef<'_>) -> bool {
    element.value().name() == "input" && matches!(element.value().attr("type"), Some("checkbox" | "radio"))
}

impl PageScope for FixturePage<'_> {
    fn goto(&self, url: &str, wait_until: LoadState) -> std::result::Result<NavigationResponse, BackendError> {
        record(self.journal, format!("goto {} ({})", url, wait_until));
        let target = self.site.redirects.get(url).cloned().unwrap_or_else(|| url.to_string());

        match self.site.responses.get(&target) {
            Some(FixtureResponse::Page { status, html, settles }) => {
                *self.current.borrow_mut() = Some(Loaded {
                    url: target.clone(),
                    html: html.clone(),
                    settles: *settles,
                });
                Ok(NavigationResponse { status: *status })
            }
            Some(FixtureResponse::Timeout { partial }) => {
                *self.current.borrow_mut() = partial.as_ref().map(|html| Loaded {
                    url: target.clone(),
                    html: html.clone(),
                    settles: false,
                });
                Err(BackendError::Timeout(format!("navigating to {}", target)))
            }
            Some(FixtureResponse::Fault(message)) => Err(BackendError::Fault(message.clone())),
            None => {
                *self.current.borrow_mut() = Some(Loaded {
                    url: target,
                    html: "<html><head><title>Not Found</title></head><body></body></html>".to_string(),
                    settles: true,
                });
                Ok(NavigationResponse { status: Some(404) })
            }
        }
    }

    fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> std::result::Result<(), BackendError> {
        record(self.journal, format!("wait {} {}ms", state, timeout.as_millis()));
        let current = self.current.borrow();
        match current.as_ref() {
            Some(loaded) if loaded.settles || state != LoadState::NetworkIdle => Ok(()),
            Some(_) => Err(BackendError::Timeout(format!("{} not reached", state))),
            None => Err(BackendError::Fault("no document loaded".to_string())),
        }
    }

    fn title(&self) -> std::result::Result<String, BackendError> {
        self.with_document(|document| {
            let selector = css("title")?;
            Ok(document
                .select(&selector)
                .next()
                .map(|t| text_of(t).trim().to_string())
                .unwrap_or_default())
        })
    }

    fn current_url(&self) -> std::result::Result<String, BackendError> {
        self.current
            .borrow()
            .as_ref()
            .map(|loaded| loaded.url.clone())
            .ok_or_else(|| BackendError::Fault("no document loaded".to_string()))
    }

    fn anchor_hrefs(&self) -> std::result::Result<Vec<String>, BackendError> {
        self.with_document(|document| {
            let selector = css("a[href]")?;
            Ok(document
                .select(&selector)
                .filter_map(|a| a.value().attr("href").map(str::to_string))
                .collect())
        })
    }

    fn fill(&self, locator: &Locator, text: &str) -> std::result::Result<(), BackendError> {
        self.act("fill", locator, is_fillable)?;
        record(self.journal, format!("value {}", text));
        Ok(())
    }

    fn click(&self, locator: &Locator) -> std::result::Result<(), BackendError> {
        self.act("click", locator, |_| true)
    }

    fn check(&self, locator: &Locator) -> std::result::Result<(), BackendError> {
        self.act("check", locator, is_checkable)
    }

    fn close(&self) -> std::result::Result<(), BackendError> {
        record(self.journal, "close".to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::parse_descriptor;

    const FORM: &str = r#"<html><head><title>Login</title></head><body>
        <label for="email">Email address</label><input id="email" type="email">
        <input placeholder="Search docs" name="q">
        <label>Remember <input type="checkbox" name="remember"></label>
        <button aria-label="Sign in">Go</button>
        <a href="/help" title="Help center">Help</a>
        <img src="/logo.png" alt="Company logo">
        <div data-testid="banner"><span>Welcome back</span></div>
    </body></html>"#;

    fn page_with<'s>(session: &'s FixtureSession) -> Box<dyn PageScope + 's> {
        let page = session.open_page().unwrap();
        page.goto("https://app.test/login", LoadState::Load).unwrap();
        page
    }

    #[test]
    fn test_structured_lookups() {
        let session = FixtureSession::new(FixtureSite::new().page("https://app.test/login", 200, FORM));
        let page = page_with(&session);

        for descriptor in [
            r#"get_by_label("Email address")"#,
            r#"get_by_placeholder("Search docs")"#,
            r#"get_by_role("textbox", name="Search")"#,
        ] {
            let locator = parse_descriptor(descriptor).unwrap();
            page.fill(&locator, "x").unwrap_or_else(|e| panic!("{}: {}", descriptor, e));
        }

        for descriptor in [
            r#"get_by_role("button", name="Sign in", exact=True)"#,
            r#"get_by_title("Help center")"#,
            r#"get_by_alt_text("logo")"#,
            r#"get_by_test_id("banner")"#,
            r#"get_by_text("Welcome back")"#,
            "text=Help",
        ] {
            let locator = parse_descriptor(descriptor).unwrap();
            page.click(&locator).unwrap_or_else(|e| panic!("{}: {}", descriptor, e));
        }

        page.check(&parse_descriptor(r#"get_by_label("Remember")"#).unwrap()).unwrap();
    }

    #[test]
    fn test_missing_element_and_wrong_kind() {
        let session = FixtureSession::new(FixtureSite::new().page("https://app.test/login", 200, FORM));
        let page = page_with(&session);

        let missing = page.click(&parse_descriptor("#nope").unwrap()).unwrap_err();
        assert!(matches!(missing, BackendError::ElementNotFound(_)));

        let not_input = page.fill(&parse_descriptor("button").unwrap(), "x").unwrap_err();
        assert!(matches!(not_input, BackendError::Fault(_)));
    }

    #[test]
    fn test_redirect_and_unknown_page() {
        let site = FixtureSite::new()
            .redirect("https://app.test/old", "https://app.test/login")
            .page("https://app.test/login", 200, FORM);
        let session = FixtureSession::new(site);
        let page = session.open_page().unwrap();

        page.goto("https://app.test/old", LoadState::Load).unwrap();
        assert_eq!(page.current_url().unwrap(), "https://app.test/login");
        assert_eq!(page.title().unwrap(), "Login");

        let response = page.goto("https://app.test/missing", LoadState::Load).unwrap();
        assert_eq!(response.status, Some(404));
    }

    #[test]
    fn test_launcher_failure() {
        let err = FixtureLauncher::failing("no chrome").launch(&SessionOptions::default());
        assert!(matches!(err, Err(ScanError::SessionInit(_))));
    }
}
