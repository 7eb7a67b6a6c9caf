use crate::action::{Action, ActionRecord};
use crate::automation::{LoadState, PageScope};
use crate::error::Result;
use crate::progress::{ProgressCallback, Reporter};
use crate::selector::{describe_selector, parse_descriptor};
use std::time::Duration;
use thiserror::Error;

/// Counts for a scenario that ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScenarioSummary {
    pub executed: usize,
    pub skipped: usize,
    pub total: usize,
}

/// The action that aborted a scenario. `index` is 1-based, 0 when the list was empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("scenario action {index} ({kind}) failed: {reason}")]
pub struct ActionFailure {
    pub index: usize,
    pub kind: String,
    pub reason: String,
}

/// Replays scenario actions on one page, strictly in order, stopping at the first failure
#[derive(Clone, Default)]
pub struct ScenarioInterpreter {
    reporter: Reporter,
}

impl ScenarioInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.reporter = Reporter::new(Some(callback));
        self
    }

    pub(crate) fn with_reporter(reporter: Reporter) -> Self {
        Self { reporter }
    }

    pub fn run(
        &self,
        page: &dyn PageScope,
        actions: &[ActionRecord],
    ) -> std::result::Result<ScenarioSummary, ActionFailure> {
        if actions.is_empty() {
            self.reporter.error("Scenario action list is empty");
            return Err(ActionFailure {
                index: 0,
                kind: String::new(),
                reason: "no actions to replay".to_string(),
            });
        }

        let total = actions.len();
        let mut summary = ScenarioSummary {
            total,
            ..Default::default()
        };

        for (i, record) in actions.iter().enumerate() {
            let index = i + 1;
            let failure = |reason: String| ActionFailure {
                index,
                kind: record.type_name().to_string(),
                reason,
            };

            let action = match record.validate() {
                Ok(Some(action)) => action,
                Ok(None) => {
                    self.reporter.warn(format!(
                        "Scenario action {}/{}: type '{}' is not supported, skipping",
                        index,
                        total,
                        record.type_name()
                    ));
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    self.reporter
                        .error(format!("Scenario action {}/{}: {}", index, total, e));
                    return Err(failure(e.to_string()));
                }
            };

            let label = format!(
                "Scenario action {}/{}: {}{}",
                index,
                total,
                action.type_name(),
                detail(&action)
            );
            self.reporter.info(format!("{} - starting...", label));

            match execute(page, &action) {
                Ok(()) => {
                    self.reporter.info(format!("{} - success", label));
                    summary.executed += 1;
                }
                Err(e) => {
                    self.reporter.error(format!("{} - failed: {}", label, e));
                    return Err(failure(e.to_string()));
                }
            }
        }

        self.reporter.info(format!(
            "All {} scenario actions completed ({} skipped)",
            total, summary.skipped
        ));
        Ok(summary)
    }
}

fn detail(action: &Action) -> String {
    match action {
        Action::FillInput { selector, text } => {
            format!(" on {} with value {}", describe_selector(selector), text)
        }
        Action::ClickElement { selector } | Action::CheckElement { selector } => {
            format!(" on {}", describe_selector(selector))
        }
        Action::GotoUrl { url } => format!(" to {}", url),
        Action::WaitForNavigation { timeout, state } => {
            format!(" with timeout {}ms and state {}", timeout, state)
        }
    }
}

fn execute(page: &dyn PageScope, action: &Action) -> Result<()> {
    match action {
        Action::FillInput { selector, text } => {
            let locator = parse_descriptor(selector)?;
            page.fill(&locator, text)?;
        }
        Action::ClickElement { selector } => {
            let locator = parse_descriptor(selector)?;
            page.click(&locator)?;
        }
        Action::CheckElement { selector } => {
            let locator = parse_descriptor(selector)?;
            page.check(&locator)?;
        }
        Action::GotoUrl { url } => {
            page.goto(url, LoadState::Load)?;
        }
        Action::WaitForNavigation { timeout, state } => {
            let state: LoadState = state.parse()?;
            page.wait_for_load_state(state, Duration::from_millis(*timeout))?;
        }
    }
    Ok(())
}
