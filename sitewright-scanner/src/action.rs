use crate::automation::LoadState;
use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_WAIT_STATE: &str = "load";

/// An action as persisted in a scenario file.
///
/// Every field is optional so that a malformed action can still be loaded and
/// reported when the interpreter reaches it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// A validated, executable action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    FillInput {
        selector: String,
        text: String,
    },
    ClickElement {
        selector: String,
    },
    CheckElement {
        selector: String,
    },
    GotoUrl {
        url: String,
    },
    WaitForNavigation {
        #[serde(default = "default_timeout")]
        timeout: u64,
        #[serde(default = "default_state")]
        state: String,
    },
}

fn default_timeout() -> u64 {
    DEFAULT_WAIT_TIMEOUT_MS
}

fn default_state() -> String {
    DEFAULT_WAIT_STATE.to_string()
}

impl Action {
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::FillInput { .. } => "FILL_INPUT",
            Action::ClickElement { .. } => "CLICK_ELEMENT",
            Action::CheckElement { .. } => "CHECK_ELEMENT",
            Action::GotoUrl { .. } => "GOTO_URL",
            Action::WaitForNavigation { .. } => "WAIT_FOR_NAVIGATION",
        }
    }

    pub fn selector(&self) -> Option<&str> {
        match self {
            Action::FillInput { selector, .. }
            | Action::ClickElement { selector }
            | Action::CheckElement { selector } => Some(selector),
            _ => None,
        }
    }
}

fn required(value: &Option<String>, field: &str, kind: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v.clone()),
        None => Err(ScanError::Validation(format!(
            "{} action is missing required field '{}'",
            kind, field
        ))),
    }
}

impl ActionRecord {
    pub fn type_name(&self) -> &str {
        self.kind.as_deref().unwrap_or("<none>")
    }

    /// Check required fields for the record's type.
    ///
    /// `Ok(None)` means the type is not one this engine knows; callers skip it.
    pub fn validate(&self) -> Result<Option<Action>> {
        let Some(kind) = self.kind.as_deref() else {
            return Err(ScanError::Validation("action has no 'type'".to_string()));
        };

        let action = match kind {
            "FILL_INPUT" => Action::FillInput {
                selector: required(&self.selector, "selector", kind)?,
                text: required(&self.text, "text", kind)?,
            },
            "CLICK_ELEMENT" => Action::ClickElement {
                selector: required(&self.selector, "selector", kind)?,
            },
            "CHECK_ELEMENT" => Action::CheckElement {
                selector: required(&self.selector, "selector", kind)?,
            },
            "GOTO_URL" => Action::GotoUrl {
                url: required(&self.url, "url", kind)?,
            },
            "WAIT_FOR_NAVIGATION" => {
                let state = self.state.clone().unwrap_or_else(default_state);
                state.parse::<LoadState>()?;
                Action::WaitForNavigation {
                    timeout: self.timeout.unwrap_or(DEFAULT_WAIT_TIMEOUT_MS),
                    state,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(action))
    }
}

impl From<Action> for ActionRecord {
    fn from(action: Action) -> Self {
        let kind = Some(action.type_name().to_string());
        match action {
            Action::FillInput { selector, text } => ActionRecord {
                kind,
                selector: Some(selector),
                text: Some(text),
                ..Default::default()
            },
            Action::ClickElement { selector } | Action::CheckElement { selector } => ActionRecord {
                kind,
                selector: Some(selector),
                ..Default::default()
            },
            Action::GotoUrl { url } => ActionRecord {
                kind,
                url: Some(url),
                ..Default::default()
            },
            Action::WaitForNavigation { timeout, state } => ActionRecord {
                kind,
                timeout: Some(timeout),
                state: Some(state),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> ActionRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_validate_fill() {
        let action = record(r##"{"type":"FILL_INPUT","selector":"#q","text":"hi"}"##)
            .validate()
            .unwrap();
        assert_eq!(
            action,
            Some(Action::FillInput {
                selector: "#q".into(),
                text: "hi".into()
            })
        );
    }

    #[test]
    fn test_fill_requires_text() {
        let err = record(r##"{"type":"FILL_INPUT","selector":"#q"}"##)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("'text'"));
    }

    #[test]
    fn test_goto_requires_url() {
        assert!(record(r#"{"type":"GOTO_URL"}"#).validate().is_err());
    }

    #[test]
    fn test_wait_defaults() {
        let action = record(r#"{"type":"WAIT_FOR_NAVIGATION"}"#).validate().unwrap();
        assert_eq!(
            action,
            Some(Action::WaitForNavigation {
                timeout: 30_000,
                state: "load".into()
            })
        );
    }

    #[test]
    fn test_wait_rejects_unknown_state() {
        assert!(record(r#"{"type":"WAIT_FOR_NAVIGATION","state":"whenever"}"#)
            .validate()
            .is_err());
    }

    #[test]
    fn test_missing_type_is_error() {
        assert!(record(r##"{"selector":"#q"}"##).validate().is_err());
    }

    #[test]
    fn test_unknown_type_is_skippable() {
        assert_eq!(record(r#"{"type":"HOVER"}"#).validate().unwrap(), None);
    }

    #[test]
    fn test_typed_action_serialization() {
        let json = serde_json::to_value(Action::ClickElement {
            selector: "#go".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"type": "CLICK_ELEMENT", "selector": "#go"}));

        let wait: Action = serde_json::from_str(r#"{"type":"WAIT_FOR_NAVIGATION"}"#).unwrap();
        assert_eq!(
            wait,
            Action::WaitForNavigation {
                timeout: 30_000,
                state: "load".into()
            }
        );
    }

    #[test]
    fn test_record_from_action_skips_unused_fields() {
        let record: ActionRecord = Action::GotoUrl {
            url: "https://example.com/".into(),
        }
        .into();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "GOTO_URL", "url": "https://example.com/"})
        );
    }
}
