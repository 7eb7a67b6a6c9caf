// Tests for scenario replay against the in-memory backend

use sitewright_scanner::action::{Action, ActionRecord};
use sitewright_scanner::automation::{AutomationSession, LoadState};
use sitewright_scanner::fixture::{FixtureSession, FixtureSite};
use sitewright_scanner::interpreter::ScenarioInterpreter;
use sitewright_scanner::progress::ProgressEvent;
use std::sync::{Arc, Mutex};

const SEARCH_PAGE: &str = r#"<html><head><title>Search</title></head><body>
    <form>
        <input id="q" name="q" placeholder="Search">
        <input id="terms" type="checkbox">
        <button id="submit">Search</button>
    </form>
</body></html>"#;

fn session() -> FixtureSession {
    FixtureSession::new(
        FixtureSite::new()
            .page("https://shop.test/", 200, SEARCH_PAGE)
            .page("https://shop.test/cart", 200, "<title>Cart</title>"),
    )
}

fn actions(list: Vec<Action>) -> Vec<ActionRecord> {
    list.into_iter().map(ActionRecord::from).collect()
}

fn journal_entries(session: &FixtureSession) -> Vec<String> {
    session.journal().lock().unwrap().clone()
}

// ============================================================================
// Fail-fast ordering
// ============================================================================

#[test]
fn test_fill_succeeds_click_fails_third_never_runs() {
    let session = session();
    let page = session.open_page().unwrap();
    page.goto("https://shop.test/", LoadState::Load).unwrap();

    let list = actions(vec![
        Action::FillInput {
            selector: "#q".into(),
            text: "hi".into(),
        },
        Action::ClickElement {
            selector: "#go".into(),
        },
        Action::GotoUrl {
            url: "https://shop.test/cart".into(),
        },
    ]);

    let failure = ScenarioInterpreter::new().run(page.as_ref(), &list).unwrap_err();
    assert_eq!(failure.index, 2);
    assert_eq!(failure.kind, "CLICK_ELEMENT");

    let journal = journal_entries(&session);
    assert!(journal.contains(&"fill #q".to_string()));
    assert!(journal.contains(&"value hi".to_string()));
    assert!(!journal.iter().any(|e| e.starts_with("click")));
    assert!(!journal.iter().any(|e| e.contains("https://shop.test/cart")));
}

#[test]
fn test_all_actions_execute_in_order() {
    let session = session();
    let page = session.open_page().unwrap();
    page.goto("https://shop.test/", LoadState::Load).unwrap();

    let list = actions(vec![
        Action::FillInput {
            selector: r#"get_by_placeholder("Search")"#.into(),
            text: "boots".into(),
        },
        Action::CheckElement {
            selector: "#terms".into(),
        },
        Action::ClickElement {
            selector: r#"get_by_role("button", name="Search")"#.into(),
        },
        Action::WaitForNavigation {
            timeout: 5_000,
            state: "domcontentloaded".into(),
        },
        Action::GotoUrl {
            url: "https://shop.test/cart".into(),
        },
    ]);

    let summary = ScenarioInterpreter::new().run(page.as_ref(), &list).unwrap();
    assert_eq!(summary.executed, 5);
    assert_eq!(summary.skipped, 0);
    assert_eq!(page.title().unwrap(), "Cart");

    let journal = journal_entries(&session);
    let fill = journal.iter().position(|e| e.starts_with("fill")).unwrap();
    let check = journal.iter().position(|e| e == "check #terms").unwrap();
    let click = journal.iter().position(|e| e.starts_with("click role")).unwrap();
    let wait = journal.iter().position(|e| e == "wait domcontentloaded 5000ms").unwrap();
    assert!(fill < check && check < click && click < wait);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_empty_action_list_fails() {
    let session = session();
    let page = session.open_page().unwrap();
    let failure = ScenarioInterpreter::new().run(page.as_ref(), &[]).unwrap_err();
    assert_eq!(failure.index, 0);
}

#[test]
fn test_missing_required_field_aborts() {
    let session = session();
    let page = session.open_page().unwrap();
    page.goto("https://shop.test/", LoadState::Load).unwrap();

    let list: Vec<ActionRecord> = serde_json::from_str(
        r##"[
            {"type": "FILL_INPUT", "selector": "#q"},
            {"type": "CLICK_ELEMENT", "selector": "#submit"}
        ]"##,
    )
    .unwrap();

    let failure = ScenarioInterpreter::new().run(page.as_ref(), &list).unwrap_err();
    assert_eq!(failure.index, 1);
    assert!(failure.reason.contains("text"));
    assert!(!journal_entries(&session).iter().any(|e| e.starts_with("click")));
}

#[test]
fn test_action_without_type_aborts() {
    let session = session();
    let page = session.open_page().unwrap();
    let list = vec![ActionRecord {
        selector: Some("#q".into()),
        ..Default::default()
    }];
    assert!(ScenarioInterpreter::new().run(page.as_ref(), &list).is_err());
}

#[test]
fn test_unknown_action_type_is_skipped() {
    let session = session();
    let page = session.open_page().unwrap();
    page.goto("https://shop.test/", LoadState::Load).unwrap();

    let list: Vec<ActionRecord> = serde_json::from_str(
        r##"[
            {"type": "HOVER_ELEMENT", "selector": "#q"},
            {"type": "CLICK_ELEMENT", "selector": "#submit"}
        ]"##,
    )
    .unwrap();

    let summary = ScenarioInterpreter::new().run(page.as_ref(), &list).unwrap();
    assert_eq!(summary.executed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.total, 2);
}

#[test]
fn test_unresolvable_selector_aborts() {
    let session = session();
    let page = session.open_page().unwrap();
    page.goto("https://shop.test/", LoadState::Load).unwrap();

    let list = actions(vec![Action::ClickElement {
        selector: r#"get_by_magic("x")"#.into(),
    }]);
    let failure = ScenarioInterpreter::new().run(page.as_ref(), &list).unwrap_err();
    assert!(failure.reason.contains("get_by_magic"));
}

// ============================================================================
// Progress lines
// ============================================================================

#[test]
fn test_progress_lines_describe_selector() {
    let session = session();
    let page = session.open_page().unwrap();
    page.goto("https://shop.test/", LoadState::Load).unwrap();

    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    let interpreter = ScenarioInterpreter::new().with_progress_callback(Arc::new(move |event| {
        if let ProgressEvent::Log { message, .. } = event {
            sink.lock().unwrap().push(message);
        }
    }));

    let list = actions(vec![Action::ClickElement {
        selector: r#"get_by_role("button", name="Search")"#.into(),
    }]);
    interpreter.run(page.as_ref(), &list).unwrap();

    let lines = lines.lock().unwrap();
    assert!(lines
        .iter()
        .any(|l| l == "Scenario action 1/1: CLICK_ELEMENT on button 'Search' - starting..."));
    assert!(lines
        .iter()
        .any(|l| l == "Scenario action 1/1: CLICK_ELEMENT on button 'Search' - success"));
}
