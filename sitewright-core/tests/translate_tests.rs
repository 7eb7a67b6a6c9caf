// Tests for translating recorded codegen scripts

use sitewright_core::translate::{translate_file, translate_script};
use sitewright_core::TranslationError;
use sitewright_scanner::action::{Action, ActionRecord};
use std::io::Write;

const RECORDED: &str = r##"import re
from playwright.sync_api import Playwright, sync_playwright, expect


def run(playwright: Playwright) -> None:
    browser = playwright.chromium.launch(headless=False)
    context = browser.new_context()
    page = context.new_page()
    page.goto("https://shop.test/login")
    page.locator("#user").click()
    page.locator("#user").fill("alice")
    page.get_by_placeholder("Password").click()
    page.get_by_placeholder("Password").fill("s3cret")
    page.get_by_label("Remember me").check()
    page.get_by_role("button", name="Sign in").click()
    page.wait_for_load_state("networkidle", timeout=15000)
    page.goto("https://shop.test/account")

    # ---------------------
    context.close()
    browser.close()


with sync_playwright() as playwright:
    run(playwright)
"##;

fn actions(script: &str) -> Vec<Action> {
    translate_script(script)
        .unwrap()
        .actions
        .iter()
        .map(|a| a.validate().unwrap().unwrap())
        .collect()
}

// ============================================================================
// Line rules
// ============================================================================

#[test]
fn test_translates_recorded_login() {
    let translation = translate_script(RECORDED).unwrap();
    assert_eq!(translation.target_url.as_deref(), Some("https://shop.test/login"));

    assert_eq!(
        actions(RECORDED),
        vec![
            Action::FillInput {
                selector: "#user".into(),
                text: "alice".into()
            },
            Action::FillInput {
                selector: r#"get_by_placeholder("Password")"#.into(),
                text: "s3cret".into()
            },
            Action::CheckElement {
                selector: r#"get_by_label("Remember me")"#.into()
            },
            Action::ClickElement {
                selector: r#"get_by_role("button", name="Sign in")"#.into()
            },
            Action::WaitForNavigation {
                timeout: 15_000,
                state: "networkidle".into()
            },
        ]
    );
}

#[test]
fn test_click_before_fill_on_same_selector_is_suppressed() {
    let script = "page.locator(\"#x\").click()\npage.locator(\"#x\").fill(\"a\")\n";
    let translation = translate_script(script).unwrap();
    assert_eq!(translation.actions.len(), 1);
    assert_eq!(translation.actions[0].kind.as_deref(), Some("FILL_INPUT"));
    assert!(!translation
        .actions
        .iter()
        .any(|a| a.kind.as_deref() == Some("CLICK_ELEMENT") && a.selector.as_deref() == Some("#x")));
}

#[test]
fn test_click_before_fill_on_other_selector_is_kept() {
    let script = "page.locator(\"#x\").click()\npage.locator(\"#y\").fill(\"a\")\n";
    let kinds: Vec<String> = translate_script(script)
        .unwrap()
        .actions
        .into_iter()
        .filter_map(|a| a.kind)
        .collect();
    assert_eq!(kinds, vec!["CLICK_ELEMENT", "FILL_INPUT"]);
}

#[test]
fn test_suppression_only_looks_one_line_ahead() {
    let script = "page.locator(\"#x\").click()\npage.locator(\"#z\").check()\npage.locator(\"#x\").fill(\"a\")\n";
    assert_eq!(translate_script(script).unwrap().actions.len(), 3);
}

#[test]
fn test_wait_defaults() {
    let script = "page.wait_for_navigation()\npage.wait_for_load_state()\n";
    assert_eq!(
        actions(script),
        vec![
            Action::WaitForNavigation {
                timeout: 30_000,
                state: "load".into()
            },
            Action::WaitForNavigation {
                timeout: 30_000,
                state: "load".into()
            },
        ]
    );
}

#[test]
fn test_wait_for_navigation_object_timeout() {
    let script = r#"page.wait_for_navigation({"timeout": 5000})"#;
    assert_eq!(
        actions(script),
        vec![Action::WaitForNavigation {
            timeout: 5_000,
            state: "load".into()
        }]
    );
}

#[test]
fn test_single_quotes_and_fill_options() {
    let script = "page.locator('input[name=q]').fill('boots', {\"timeout\": 1000})\n";
    assert_eq!(
        actions(script),
        vec![Action::FillInput {
            selector: "input[name=q]".into(),
            text: "boots".into()
        }]
    );
}

#[test]
fn test_unrecognized_lines_are_ignored() {
    let script = "page.locator(\"#a\").hover()\nprint('hi')\npage.locator(\"#b\").click()\n";
    let translation = translate_script(script).unwrap();
    assert_eq!(translation.actions.len(), 1);
    assert_eq!(translation.target_url, None);
}

#[test]
fn test_no_actions_is_an_error() {
    let script = "page.goto(\"https://shop.test/\")\nbrowser.close()\n";
    assert!(matches!(translate_script(script), Err(TranslationError::NoActions)));
}

#[test]
fn test_translation_is_idempotent() {
    let first = translate_script(RECORDED).unwrap();
    let second = translate_script(RECORDED).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_counts_per_type() {
    let counts = translate_script(RECORDED).unwrap().counts();
    assert_eq!(counts["FILL_INPUT"], 2);
    assert_eq!(counts["CHECK_ELEMENT"], 1);
    assert_eq!(counts["CLICK_ELEMENT"], 1);
    assert_eq!(counts["WAIT_FOR_NAVIGATION"], 1);
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_translate_file_names_scenario_after_stem() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("login_flow.py");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "{}", RECORDED).unwrap();

    let scenario = translate_file(&path).unwrap();
    assert_eq!(scenario.name, "Scenario_login_flow");
    assert_eq!(scenario.target_url_pattern, "https://shop.test/login");
    assert_eq!(scenario.actions.len(), 5);
}

#[test]
fn test_translate_file_without_goto_uses_stem() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkout.py");
    std::fs::write(&path, "page.get_by_text(\"Pay\").click()\n").unwrap();

    let scenario = translate_file(&path).unwrap();
    assert_eq!(scenario.target_url_pattern, "checkout");
    assert_eq!(
        scenario.actions,
        vec![ActionRecord::from(Action::ClickElement {
            selector: r#"get_by_text("Pay")"#.into()
        })]
    );
}

#[test]
fn test_translate_missing_file() {
    let err = translate_file(std::path::Path::new("/nonexistent/recording.py")).unwrap_err();
    assert!(matches!(err, TranslationError::Io { .. }));
}
