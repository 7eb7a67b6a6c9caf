//! Headless Chrome backend built on the `headless_chrome` crate (DevTools protocol).

use crate::automation::{
    role_css, ArgValue, AutomationSession, LoadState, Locator, NavigationResponse, PageScope, SessionLauncher,
    SessionOptions, StructuredKind,
};
use crate::error::{BackendError, Result, ScanError};
use crate::selector::looks_like_xpath;
use headless_chrome::{Browser, Element, Tab};
use serde_json::Value;
use std::cell::Cell;
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const NETWORK_QUIET_WINDOW: Duration = Duration::from_millis(500);
const TARGET_ATTR: &str = "data-sitewright-target";

const NAVIGATION_STATUS_JS: &str = r#"(function() {
    const entry = performance.getEntriesByType('navigation')[0];
    return entry && entry.responseStatus ? entry.responseStatus : null;
})()"#;

const ANCHORS_JS: &str = r#"JSON.stringify(Array.from(document.querySelectorAll('a[href]')).map(a => a.getAttribute('href')))"#;

const FILL_JS: &str = r#"function(value) {
    this.focus();
    this.value = value;
    this.dispatchEvent(new Event('input', { bubbles: true }));
    this.dispatchEvent(new Event('change', { bubbles: true }));
    return true;
}"#;

const CHECK_JS: &str = r#"function() {
    if (!this.checked) { this.click(); }
    return this.checked === true;
}"#;

fn is_timeout_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("timeout") || lowered.contains("timed out") || lowered.contains("never came")
}

fn backend_error(e: impl Display) -> BackendError {
    let message = e.to_string();
    if is_timeout_message(&message) {
        BackendError::Timeout(message)
    } else {
        BackendError::Fault(message)
    }
}

/// Launches a local Chrome/Chromium process per session
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher;

impl SessionLauncher for ChromeLauncher {
    type Session = ChromeSession;

    fn launch(&self, options: &SessionOptions) -> Result<ChromeSession> {
        ChromeSession::launch(options)
    }
}

pub struct ChromeSession {
    browser: Browser,
    options: SessionOptions,
}

impl ChromeSession {
    pub fn launch(options: &SessionOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();
        launch_opts.headless = options.headless;
        launch_opts.sandbox = options.sandbox;
        launch_opts.window_size = Some((options.viewport_width, options.viewport_height));
        launch_opts.idle_browser_timeout = Duration::from_secs(60 * 10);
        if let Some(ref path) = options.chrome_path {
            launch_opts.path = Some(path.clone());
        }

        let browser = Browser::new(launch_opts).map_err(|e| ScanError::SessionInit(e.to_string()))?;
        info!(
            "Browser session started (headless: {}, viewport {}x{})",
            options.headless, options.viewport_width, options.viewport_height
        );

        Ok(Self {
            browser,
            options: options.clone(),
        })
    }
}

impl AutomationSession for ChromeSession {
    fn open_page(&self) -> std::result::Result<Box<dyn PageScope + '_>, BackendError> {
        let tab = self.browser.new_tab().map_err(backend_error)?;
        tab.set_default_timeout(self.options.default_timeout);
        tab.set_user_agent(&self.options.user_agent, None, None)
            .map_err(backend_error)?;
        Ok(Box::new(ChromePage {
            tab,
            default_timeout: self.options.default_timeout,
            marker: Cell::new(0),
        }))
    }

    fn close(&self) -> std::result::Result<(), BackendError> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| BackendError::Fault(format!("tab list poisoned: {}", e)))?
            .clone();
        for tab in tabs {
            if let Err(e) = tab.close(false) {
                debug!("Failed to close tab on shutdown: {}", e);
            }
        }
        Ok(())
    }
}

pub struct ChromePage {
    tab: Arc<Tab>,
    default_timeout: Duration,
    marker: Cell<u64>,
}

impl ChromePage {
    fn eval(&self, expression: &str) -> std::result::Result<Option<Value>, BackendError> {
        let remote = self.tab.evaluate(expression, false).map_err(backend_error)?;
        Ok(remote.value)
    }

    fn eval_bool(&self, expression: &str) -> std::result::Result<bool, BackendError> {
        Ok(self.eval(expression)?.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    fn resource_count(&self) -> std::result::Result<u64, BackendError> {
        Ok(self
            .eval("performance.getEntriesByType('resource').length")?
            .and_then(|v| v.as_u64())
            .unwrap_or(0))
    }

    fn state_reached(&self, state: LoadState) -> std::result::Result<bool, BackendError> {
        match state {
            LoadState::DomContentLoaded => self.eval_bool("document.readyState !== 'loading'"),
            LoadState::Load | LoadState::NetworkIdle => self.eval_bool("document.readyState === 'complete'"),
        }
    }

    fn wait_for_network_quiet(&self, deadline: Instant) -> std::result::Result<(), BackendError> {
        let mut last = self.resource_count()?;
        let mut quiet_since = Instant::now();
        while Instant::now() < deadline {
            std::thread::sleep(POLL_INTERVAL);
            let current = self.resource_count()?;
            if current != last {
                last = current;
                quiet_since = Instant::now();
            } else if quiet_since.elapsed() >= NETWORK_QUIET_WINDOW {
                return Ok(());
            }
        }
        Err(BackendError::Timeout("network did not become idle".to_string()))
    }

    /// Mark the first element matching a JS finder expression and return it
    fn find_marked(&self, finder: &str, locator: &Locator) -> std::result::Result<Element<'_>, BackendError> {
        let token = self.marker.get() + 1;
        self.marker.set(token);

        let script = format!(
            "(function() {{ const el = {}; if (!el) return false; el.setAttribute('{}', '{}'); return true; }})()",
            finder, TARGET_ATTR, token
        );

        let deadline = Instant::now() + self.default_timeout;
        loop {
            if self.eval_bool(&script)? {
                let css = format!("[{}=\"{}\"]", TARGET_ATTR, token);
                return self.tab.find_element(&css).map_err(backend_error);
            }
            if Instant::now() >= deadline {
                return Err(BackendError::ElementNotFound(locator.to_string()));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn resolve(&self, locator: &Locator) -> std::result::Result<Element<'_>, BackendError> {
        match locator {
            Locator::Raw { selector } if looks_like_xpath(selector) => self
                .tab
                .wait_for_xpath_with_custom_timeout(selector, self.default_timeout)
                .map_err(|e| not_found(locator, e)),
            Locator::Raw { selector } => self
                .tab
                .wait_for_element_with_custom_timeout(selector, self.default_timeout)
                .map_err(|e| not_found(locator, e)),
            Locator::XPath { expression } => self
                .tab
                .wait_for_xpath_with_custom_timeout(expression, self.default_timeout)
                .map_err(|e| not_found(locator, e)),
            _ => self.find_marked(&finder_script(locator), locator),
        }
    }
}

fn not_found(locator: &Locator, e: impl Display) -> BackendError {
    debug!("Lookup for {} failed: {}", locator, e);
    BackendError::ElementNotFound(locator.to_string())
}

fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn option_bool(options: &crate::automation::LocatorOptions, key: &str) -> bool {
    options.get(key).and_then(ArgValue::as_bool).unwrap_or(false)
}

/// JS expression evaluating to the first matching element or null
fn finder_script(locator: &Locator) -> String {
    let text_match = |needle: &str, exact: bool| {
        if exact {
            format!("(s => (s || '').trim() === {})", js_string(needle))
        } else {
            format!(
                "(s => (s || '').toLowerCase().includes({}))",
                js_string(&needle.to_lowercase())
            )
        }
    };

    match locator {
        Locator::Raw { selector } if looks_like_xpath(selector) => format!(
            "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
            js_string(selector)
        ),
        Locator::Raw { selector } => format!("document.querySelector({})", js_string(selector)),
        Locator::XPath { expression } => format!(
            "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
            js_string(expression)
        ),
        Locator::Text { text } => format!(
            "(function() {{ const m = {}; const all = Array.from(document.querySelectorAll('body *')).filter(el => m(el.textContent)); \
             return all.find(el => !Array.from(el.children).some(c => m(c.textContent))) || null; }})()",
            text_match(text, false)
        ),
        Locator::Structured { kind, value, options } => {
            let exact = option_bool(options, "exact");
            match kind {
                StructuredKind::Role => {
                    let name = options.get("name").and_then(ArgValue::as_str);
                    let filter = match name {
                        Some(name) => format!(
                            "const m = {}; return all.find(el => m(el.getAttribute('aria-label')) || m(el.textContent) || m(el.value) || m(el.getAttribute('placeholder'))) || null;",
                            text_match(name, exact)
                        ),
                        None => "return all[0] || null;".to_string(),
                    };
                    format!(
                        "(function() {{ const all = Array.from(document.querySelectorAll({})); {} }})()",
                        js_string(&role_css(value)),
                        filter
                    )
                }
                StructuredKind::Text => format!(
                    "(function() {{ const m = {}; const all = Array.from(document.querySelectorAll('body *')).filter(el => m(el.textContent)); \
                     return all.find(el => !Array.from(el.children).some(c => m(c.textContent))) || null; }})()",
                    text_match(value, exact)
                ),
                StructuredKind::Label => format!(
                    "(function() {{ const m = {}; const label = Array.from(document.querySelectorAll('label')).find(l => m(l.textContent)); \
                     if (label && label.htmlFor) return document.getElementById(label.htmlFor); \
                     if (label) return label.querySelector('input, textarea, select'); \
                     return Array.from(document.querySelectorAll('[aria-label]')).find(el => m(el.getAttribute('aria-label'))) || null; }})()",
                    text_match(value, exact)
                ),
                StructuredKind::Placeholder => attribute_finder("placeholder", &text_match(value, exact)),
                StructuredKind::Title => attribute_finder("title", &text_match(value, exact)),
                StructuredKind::AltText => attribute_finder("alt", &text_match(value, exact)),
                StructuredKind::TestId => format!(
                    "document.querySelector('[data-testid=' + JSON.stringify({}) + ']')",
                    js_string(value)
                ),
            }
        }
    }
}

fn attribute_finder(attribute: &str, matcher: &str) -> String {
    format!(
        "(function() {{ const m = {}; return Array.from(document.querySelectorAll('[{}]')).find(el => m(el.getAttribute('{}'))) || null; }})()",
        matcher, attribute, attribute
    )
}

impl PageScope for ChromePage {
    fn goto(&self, url: &str, wait_until: LoadState) -> std::result::Result<NavigationResponse, BackendError> {
        debug!("Navigating to {} (wait until {})", url, wait_until);
        self.tab.navigate_to(url).map_err(backend_error)?;
        self.tab.wait_until_navigated().map_err(backend_error)?;
        self.wait_for_load_state(wait_until, self.default_timeout)?;

        let status = self
            .eval(NAVIGATION_STATUS_JS)?
            .and_then(|v| v.as_u64())
            .and_then(|code| u16::try_from(code).ok());
        Ok(NavigationResponse { status })
    }

    fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> std::result::Result<(), BackendError> {
        let deadline = Instant::now() + timeout;
        while !self.state_reached(state)? {
            if Instant::now() >= deadline {
                return Err(BackendError::Timeout(format!(
                    "load state '{}' not reached within {}ms",
                    state,
                    timeout.as_millis()
                )));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        if state == LoadState::NetworkIdle {
            self.wait_for_network_quiet(deadline)?;
        }
        Ok(())
    }

    fn title(&self) -> std::result::Result<String, BackendError> {
        self.tab.get_title().map_err(backend_error)
    }

    fn current_url(&self) -> std::result::Result<String, BackendError> {
        Ok(self
            .eval("window.location.href")?
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default())
    }

    fn anchor_hrefs(&self) -> std::result::Result<Vec<String>, BackendError> {
        let Some(raw) = self.eval(ANCHORS_JS)? else {
            return Ok(Vec::new());
        };
        let json = raw.as_str().unwrap_or("[]");
        serde_json::from_str::<Vec<Option<String>>>(json)
            .map(|hrefs| hrefs.into_iter().flatten().collect())
            .map_err(|e| BackendError::Fault(format!("could not read anchors: {}", e)))
    }

    fn fill(&self, locator: &Locator, text: &str) -> std::result::Result<(), BackendError> {
        let element = self.resolve(locator)?;
        element
            .call_js_fn(FILL_JS, vec![Value::String(text.to_string())], false)
            .map_err(backend_error)?;
        Ok(())
    }

    fn click(&self, locator: &Locator) -> std::result::Result<(), BackendError> {
        let element = self.resolve(locator)?;
        element.click().map_err(backend_error)?;
        Ok(())
    }

    fn check(&self, locator: &Locator) -> std::result::Result<(), BackendError> {
        let element = self.resolve(locator)?;
        let checked = element
            .call_js_fn(CHECK_JS, vec![], false)
            .map_err(backend_error)?
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if checked {
            Ok(())
        } else {
            Err(BackendError::Fault(format!("{} could not be checked", locator)))
        }
    }

    fn close(&self) -> std::result::Result<(), BackendError> {
        self.tab.close(true).map_err(backend_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::LocatorOptions;

    #[test]
    fn test_timeout_classification() {
        assert!(matches!(
            backend_error("The event waited for never came"),
            BackendError::Timeout(_)
        ));
        assert!(matches!(
            backend_error("Navigate failed: net::ERR_NAME_NOT_RESOLVED"),
            BackendError::Fault(_)
        ));
    }

    #[test]
    fn test_finder_script_escapes_values() {
        let locator = Locator::Structured {
            kind: StructuredKind::Placeholder,
            value: r#"Say "hi""#.into(),
            options: LocatorOptions::new(),
        };
        let script = finder_script(&locator);
        assert!(script.contains(r#""say \"hi\"""#));
        assert!(script.contains("[placeholder]"));
    }

    #[test]
    fn test_role_finder_uses_name() {
        let mut options = LocatorOptions::new();
        options.insert("name".into(), ArgValue::Str("Save".into()));
        options.insert("exact".into(), ArgValue::Bool(true));
        let script = finder_script(&Locator::Structured {
            kind: StructuredKind::Role,
            value: "button".into(),
            options,
        });
        assert!(script.contains("aria-label"));
        assert!(script.contains(r#"=== "Save""#));
    }

    #[test]
    fn test_raw_path_expression_uses_xpath_lookup() {
        let xpath = finder_script(&Locator::Raw {
            selector: "(//a)[2]".into(),
        });
        assert!(xpath.starts_with("document.evaluate("));

        let css = finder_script(&Locator::Raw {
            selector: "#main a".into(),
        });
        assert!(css.starts_with("document.querySelector("));
    }

    #[test]
    #[ignore = "requires a local Chrome installation"]
    fn test_launch_and_read_title() {
        let session = ChromeSession::launch(&SessionOptions::default()).unwrap();
        let page = session.open_page().unwrap();
        page.goto("data:text/html,<title>hello</title>", LoadState::Load).unwrap();
        assert_eq!(page.title().unwrap(), "hello");
        page.close().unwrap();
    }
}
