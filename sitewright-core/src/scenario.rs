//! Scenario files: a named list of recorded actions bound to a start URL pattern.
//!
//! ```json
//! {
//!   "name": "Login",
//!   "target_url_pattern": "https://shop.test/login",
//!   "actions": [
//!     {"type": "FILL_INPUT", "selector": "#user", "text": "alice"},
//!     {"type": "CLICK_ELEMENT", "selector": "get_by_role(\"button\", name=\"Sign in\")"}
//!   ]
//! }
//! ```
//!
//! Loading only checks the top-level shape. Fields inside each action are
//! checked when the interpreter reaches that action.

use crate::error::ScenarioError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sitewright_scanner::ActionRecord;
use std::fs;
use std::path::Path;

pub type Result<T> = std::result::Result<T, ScenarioError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub target_url_pattern: String,
    pub actions: Vec<ActionRecord>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, target_url_pattern: impl Into<String>, actions: Vec<ActionRecord>) -> Self {
        Self {
            name: name.into(),
            target_url_pattern: target_url_pattern.into(),
            actions,
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Validate presence and coarse type of every top-level key before
    /// accepting the document.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(ScenarioError::WrongType {
                field: "<root>",
                expected: "an object",
            });
        };

        for key in ["name", "target_url_pattern", "actions"] {
            if !map.contains_key(key) {
                return Err(ScenarioError::MissingKey(key));
            }
        }

        let name = take_string(&mut map, "name")?;
        let target_url_pattern = take_string(&mut map, "target_url_pattern")?;

        let Some(Value::Array(items)) = map.remove("actions") else {
            return Err(ScenarioError::WrongType {
                field: "actions",
                expected: "a list",
            });
        };

        let mut actions = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            if !item.is_object() {
                return Err(ScenarioError::InvalidAction {
                    index: i + 1,
                    reason: "expected an object".to_string(),
                });
            }
            let action: ActionRecord = serde_json::from_value(item).map_err(|e| ScenarioError::InvalidAction {
                index: i + 1,
                reason: e.to_string(),
            })?;
            actions.push(action);
        }

        Ok(Self {
            name,
            target_url_pattern,
            actions,
        })
    }

    /// A scenario runs when the start URL equals the pattern or contains it.
    /// An empty pattern matches nothing.
    pub fn matches(&self, url: &str) -> bool {
        let pattern = self.target_url_pattern.as_str();
        !pattern.is_empty() && (url == pattern || url.contains(pattern))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json + "\n").map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn take_string(map: &mut serde_json::Map<String, Value>, field: &'static str) -> Result<String> {
    match map.remove(field) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(ScenarioError::WrongType {
            field,
            expected: "a string",
        }),
    }
}

/// Read and validate a scenario file
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let text = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let scenario = Scenario::from_json_str(&text)?;
    tracing::debug!(
        "Loaded scenario '{}' with {} actions from {}",
        scenario.name,
        scenario.actions.len(),
        path.display()
    );
    Ok(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(pattern: &str) -> Scenario {
        Scenario::new("Test", pattern, Vec::new())
    }

    #[test]
    fn test_matches_exact_and_substring() {
        let s = scenario("shop.test/login");
        assert!(s.matches("https://shop.test/login"));
        assert!(s.matches("https://shop.test/login?next=/cart"));
        assert!(!s.matches("https://shop.test/"));
        assert!(scenario("https://shop.test/").matches("https://shop.test/"));
    }

    #[test]
    fn test_empty_pattern_matches_nothing() {
        assert!(!scenario("").matches("https://shop.test/"));
    }

    #[test]
    fn test_rejects_non_object_root() {
        let err = Scenario::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, ScenarioError::WrongType { field: "<root>", .. }));
    }

    #[test]
    fn test_rejects_wrong_types() {
        let err = Scenario::from_json_str(r#"{"name": 3, "target_url_pattern": "x", "actions": []}"#).unwrap_err();
        assert!(matches!(err, ScenarioError::WrongType { field: "name", .. }));

        let err =
            Scenario::from_json_str(r#"{"name": "n", "target_url_pattern": "x", "actions": {}}"#).unwrap_err();
        assert!(matches!(err, ScenarioError::WrongType { field: "actions", .. }));
    }

    #[test]
    fn test_action_fields_are_checked_later() {
        let s = Scenario::from_json_str(
            r#"{"name": "n", "target_url_pattern": "x", "actions": [{"type": "FILL_INPUT"}]}"#,
        )
        .unwrap();
        assert_eq!(s.actions.len(), 1);
        assert_eq!(s.actions[0].text, None);
    }
}
