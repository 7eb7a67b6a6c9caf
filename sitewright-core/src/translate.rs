//! Turns a recorded Playwright codegen script into scenario actions.
//!
//! The translator works line by line with a fixed set of rules; it is not a
//! parser. Lines it does not recognize are ignored.

use crate::error::TranslationError;
use crate::scenario::Scenario;
use regex::Regex;
use sitewright_scanner::action::{DEFAULT_WAIT_STATE, DEFAULT_WAIT_TIMEOUT_MS};
use sitewright_scanner::{Action, ActionRecord};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::info;

pub type Result<T> = std::result::Result<T, TranslationError>;

static GOTO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"page\.goto\(["']([^"']+)["']\s*(?:,\s*\{[^}]*\})?\)"#)
        .expect("goto pattern is valid")
});

static LOCATOR_CLICK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"page\.locator\(["']([^"']+)["'](?:\s*,\s*\{[^}]*\})?\)\.click\([^)]*\)"#)
        .expect("locator click pattern is valid")
});

static GETBY_CLICK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"page\.(get_by_\w+\([^)]*\))\.click\([^)]*\)"#)
        .expect("get_by click pattern is valid")
});

static LOCATOR_CHECK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"page\.locator\(["']([^"']+)["'](?:\s*,\s*\{[^}]*\})?\)\.check\([^)]*\)"#)
        .expect("locator check pattern is valid")
});

static GETBY_CHECK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"page\.(get_by_\w+\([^)]*\))\.check\([^)]*\)"#)
        .expect("get_by check pattern is valid")
});

// Target of a fill call, without its value. Used for click suppression.
static LOCATOR_FILL_TARGET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"page\.locator\(["']([^"']+)["'](?:\s*,\s*\{[^}]*\})?\)\.fill\("#)
        .expect("locator fill target pattern is valid")
});

static GETBY_FILL_TARGET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"page\.(get_by_\w+\([^)]*\))\.fill\("#)
        .expect("get_by fill target pattern is valid")
});

static LOCATOR_FILL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"page\.locator\(["']([^"']+)["']\)\.fill\(["']([^"']*)["'](?:\s*,\s*\{[^}]*\})?\)"#)
        .expect("locator fill pattern is valid")
});

static GETBY_FILL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"page\.(get_by_\w+\([^)]*\))\.fill\(["']([^"']*)["'](?:\s*,\s*\{[^}]*\})?\)"#)
        .expect("get_by fill pattern is valid")
});

static LOAD_STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"page\.wait_for_load_state\(\s*(?:state\s*=\s*)?["'](\w+)["']"#)
        .expect("load state pattern is valid")
});

// Accepts both `{"timeout": 5000}` and `timeout=5000`
static TIMEOUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\btimeout["']?\s*[:=]\s*(\d+)"#)
        .expect("timeout pattern is valid")
});

/// The line-matching rules, checked in this order. The first rule whose
/// trigger appears on a line decides how the line is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineRule {
    Click,
    Check,
    Fill,
    WaitForNavigation,
    WaitForLoadState,
}

impl LineRule {
    fn classify(line: &str) -> Option<Self> {
        if line.contains(".click()") {
            Some(LineRule::Click)
        } else if line.contains(".check()") {
            Some(LineRule::Check)
        } else if line.contains(".fill(") {
            Some(LineRule::Fill)
        } else if line.contains("page.wait_for_navigation") {
            Some(LineRule::WaitForNavigation)
        } else if line.contains("page.wait_for_load_state") {
            Some(LineRule::WaitForLoadState)
        } else {
            None
        }
    }
}

/// Result of translating one script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Argument of the first `page.goto(...)`, if any
    pub target_url: Option<String>,
    pub actions: Vec<ActionRecord>,
}

impl Translation {
    /// Number of extracted actions per action type
    pub fn counts(&self) -> BTreeMap<String, usize> {
        count_by_type(&self.actions)
    }

    /// Package as a scenario named after the script. Without a recorded
    /// navigation the script name stands in for the target.
    pub fn into_scenario(self, script_stem: &str) -> Scenario {
        let target = self.target_url.unwrap_or_else(|| script_stem.to_string());
        Scenario::new(format!("Scenario_{}", script_stem), target, self.actions)
    }
}

pub fn count_by_type(actions: &[ActionRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for action in actions {
        *counts.entry(action.type_name().to_string()).or_insert(0) += 1;
    }
    counts
}

fn record(action: Action) -> ActionRecord {
    ActionRecord::from(action)
}

fn selectors(line: &str, locator: &Regex, getby: &Regex) -> Vec<String> {
    let mut found = Vec::new();
    if let Some(caps) = locator.captures(line) {
        found.push(caps[1].to_string());
    }
    if let Some(caps) = getby.captures(line) {
        found.push(caps[1].to_string());
    }
    found
}

/// True when `next` fills the element that `selector` names
fn next_line_fills(next: Option<&str>, selector: &str) -> bool {
    let Some(next) = next else {
        return false;
    };
    if !next.contains(".fill(") {
        return false;
    }
    [&*LOCATOR_FILL_TARGET_RE, &*GETBY_FILL_TARGET_RE]
        .iter()
        .filter_map(|re| re.captures(next))
        .any(|caps| &caps[1] == selector)
}

fn timeout_of(line: &str) -> u64 {
    TIMEOUT_RE
        .captures(line)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(DEFAULT_WAIT_TIMEOUT_MS)
}

fn translate_line(line: &str, next: Option<&str>, actions: &mut Vec<ActionRecord>) {
    let Some(rule) = LineRule::classify(line) else {
        return;
    };

    match rule {
        LineRule::Click => {
            // Codegen records a click before typing into a field; the fill covers it.
            for selector in selectors(line, &LOCATOR_CLICK_RE, &GETBY_CLICK_RE) {
                if !next_line_fills(next, &selector) {
                    actions.push(record(Action::ClickElement { selector }));
                }
            }
        }
        LineRule::Check => {
            for selector in selectors(line, &LOCATOR_CHECK_RE, &GETBY_CHECK_RE) {
                actions.push(record(Action::CheckElement { selector }));
            }
        }
        LineRule::Fill => {
            for re in [&*LOCATOR_FILL_RE, &*GETBY_FILL_RE] {
                if let Some(caps) = re.captures(line) {
                    actions.push(record(Action::FillInput {
                        selector: caps[1].to_string(),
                        text: caps[2].to_string(),
                    }));
                }
            }
        }
        LineRule::WaitForNavigation => {
            actions.push(record(Action::WaitForNavigation {
                timeout: timeout_of(line),
                state: DEFAULT_WAIT_STATE.to_string(),
            }));
        }
        LineRule::WaitForLoadState => {
            let state = LOAD_STATE_RE
                .captures(line)
                .map(|caps| caps[1].to_string())
                .unwrap_or_else(|| DEFAULT_WAIT_STATE.to_string());
            actions.push(record(Action::WaitForNavigation {
                timeout: timeout_of(line),
                state,
            }));
        }
    }
}

/// Extract the target URL and actions from the text of a recorded script
pub fn translate_script(source: &str) -> Result<Translation> {
    let target_url = GOTO_RE.captures(source).map(|caps| caps[1].to_string());

    let lines: Vec<&str> = source.lines().map(str::trim).collect();
    let mut actions = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        translate_line(line, lines.get(i + 1).copied(), &mut actions);
    }

    if actions.is_empty() {
        return Err(TranslationError::NoActions);
    }

    let translation = Translation { target_url, actions };
    info!("Script parsed. Extracted {} actions", translation.actions.len());
    for (kind, count) in translation.counts() {
        info!("  • {}: {}", kind, count);
    }
    Ok(translation)
}

/// Translate a script file into a scenario named `Scenario_<file stem>`
pub fn translate_file(path: &Path) -> Result<Scenario> {
    let source = fs::read_to_string(path).map_err(|source| TranslationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "script".to_string());
    Ok(translate_script(&source)?.into_scenario(&stem))
}
