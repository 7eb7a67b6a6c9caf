//! Selector descriptors as written in scenario files.
//!
//! A descriptor is one of:
//! - a structured accessibility call, `role("button", name="Save")`, optionally
//!   with the recorder's `get_by_` prefix
//! - an explicit XPath, `xpath=//div` or anything starting with `//`
//! - an explicit text match, `text=Sign in` or a fully quoted string
//! - anything else, handed to the backend as a raw CSS selector

use crate::automation::{ArgValue, Locator, LocatorOptions, StructuredKind};
use crate::error::{Result, ScanError};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

const MAX_DESCRIPTION_LEN: usize = 30;

static CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(get_by_)?([A-Za-z_]\w*)\s*\((.*)\)$").expect("call pattern is valid")
});

/// Arguments of a call expression, values kept verbatim (quotes included)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallArgs {
    pub positional: Vec<String>,
    pub named: BTreeMap<String, String>,
}

/// Split a call's argument string on top-level commas.
///
/// A quote opens a quoted run only when not preceded by a backslash, and the
/// run is closed by the same quote character. A segment containing `=` that
/// does not start with a quote is a named argument split at its first `=`.
pub fn parse_call_args(args: &str) -> CallArgs {
    let mut result = CallArgs::default();
    if args.trim().is_empty() {
        return result;
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;

    for ch in args.chars() {
        match ch {
            '"' | '\'' if prev != Some('\\') => {
                match quote {
                    None => quote = Some(ch),
                    Some(open) if open == ch => quote = None,
                    Some(_) => {}
                }
                current.push(ch);
            }
            ',' if quote.is_none() => {
                segments.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
        prev = Some(ch);
    }
    if !current.trim().is_empty() {
        segments.push(current.trim().to_string());
    }

    for segment in segments {
        let quoted = segment.starts_with('"') || segment.starts_with('\'');
        match segment.split_once('=') {
            Some((key, value)) if !quoted => {
                result
                    .named
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => result.positional.push(segment),
        }
    }

    result
}

fn strip_quotes(value: &str) -> String {
    value.trim_matches(|c| c == '"' || c == '\'').to_string()
}

fn coerce_option(value: &str) -> ArgValue {
    if value.starts_with('"') || value.starts_with('\'') {
        return ArgValue::Str(strip_quotes(value));
    }
    match value.to_ascii_lowercase().as_str() {
        "true" => ArgValue::Bool(true),
        "false" => ArgValue::Bool(false),
        _ => ArgValue::Str(value.to_string()),
    }
}

fn fully_quoted(value: &str) -> Option<&str> {
    let first = value.chars().next()?;
    if value.len() < 2 || !(first == '"' || first == '\'') || !value.ends_with(first) {
        return None;
    }
    Some(&value[1..value.len() - 1])
}

fn structured(kind: StructuredKind, args: &str, descriptor: &str) -> Result<Locator> {
    let mut params = parse_call_args(args);
    if params.positional.is_empty() {
        return Err(ScanError::Resolution(format!(
            "missing {} value in {}",
            kind.name(),
            descriptor
        )));
    }
    let value = strip_quotes(&params.positional.remove(0));

    let options: LocatorOptions = match kind {
        StructuredKind::TestId => LocatorOptions::new(),
        _ => params
            .named
            .iter()
            .map(|(k, v)| (k.clone(), coerce_option(v)))
            .collect(),
    };

    Ok(Locator::Structured {
        kind,
        value,
        options,
    })
}

/// True for path expressions such as `//a`, `/html/body`, `./span` or
/// `(//a)[2]`. No CSS selector starts with these.
pub fn looks_like_xpath(selector: &str) -> bool {
    let selector = selector.trim_start();
    selector.starts_with('/') || selector.starts_with("./") || selector.starts_with("..") || selector.starts_with('(')
}

/// Resolve a descriptor into a backend locator
pub fn parse_descriptor(descriptor: &str) -> Result<Locator> {
    let descriptor = descriptor.trim();
    if descriptor.is_empty() {
        return Err(ScanError::Resolution("empty selector".to_string()));
    }

    if let Some(caps) = CALL_RE.captures(descriptor) {
        let prefixed = caps.get(1).is_some();
        let name = &caps[2];
        match StructuredKind::from_name(name) {
            Some(kind) => return structured(kind, &caps[3], descriptor),
            None if prefixed => {
                return Err(ScanError::Resolution(format!(
                    "unsupported lookup get_by_{} in {}",
                    name, descriptor
                )));
            }
            None => {}
        }
    }

    if let Some(expression) = descriptor.strip_prefix("xpath=") {
        return Ok(Locator::XPath {
            expression: expression.to_string(),
        });
    }
    if looks_like_xpath(descriptor) {
        return Ok(Locator::XPath {
            expression: descriptor.to_string(),
        });
    }

    if let Some(text) = descriptor.strip_prefix("text=") {
        return Ok(Locator::Text {
            text: text.to_string(),
        });
    }
    if let Some(text) = fully_quoted(descriptor) {
        return Ok(Locator::Text {
            text: text.to_string(),
        });
    }

    Ok(Locator::Raw {
        selector: descriptor.to_string(),
    })
}

fn truncate(value: &str) -> String {
    if value.chars().count() > MAX_DESCRIPTION_LEN {
        let head: String = value.chars().take(MAX_DESCRIPTION_LEN - 3).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}

/// Short human label for a descriptor, used in per-action log lines
pub fn describe_selector(descriptor: &str) -> String {
    if let Ok(Locator::Structured {
        kind,
        value,
        options,
    }) = parse_descriptor(descriptor)
    {
        match kind {
            StructuredKind::Role => {
                return match options.get("name").and_then(ArgValue::as_str) {
                    Some(name) => format!("{} '{}'", value, name),
                    None => value,
                };
            }
            StructuredKind::Text => return format!("text '{}'", truncate(&value)),
            StructuredKind::Label => return format!("label '{}'", truncate(&value)),
            StructuredKind::Placeholder => return format!("placeholder '{}'", truncate(&value)),
            StructuredKind::TestId => return format!("test-id '{}'", value),
            StructuredKind::Title | StructuredKind::AltText => {}
        }
    }
    truncate(descriptor)
}
