//! Integration tests for session visibility changes.

mod helpers;

use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use helpers::{Calls, EventLog, ScriptedExtension, TestLauncher, ids};
use lumen_engine::closure::FnExtension;
use lumen_engine::item::StandardItem;
use lumen_engine::query::Match;

#[tokio::test]
async fn test_show_runs_setup_once_per_transition() {
    let launcher = TestLauncher::new();
    let apps = ScriptedExtension::global("apps");
    let files = ScriptedExtension::triggered("files", &["f"]);
    let apps_calls = apps.calls();
    let files_calls = files.calls();
    launcher.register(vec![apps.into_arc(), files.into_arc()]).await;

    let report = launcher.engine.on_session_visibility_changed(true).await;
    assert!(report.changed);
    assert_eq!(report.succeeded, 2);
    assert!(launcher.engine.is_active().await);

    let repeated = launcher.engine.on_session_visibility_changed(true).await;
    assert!(!repeated.changed);

    assert_eq!(Calls::get(&apps_calls.setup), 1);
    assert_eq!(Calls::get(&files_calls.setup), 1);
    assert_eq!(Calls::get(&apps_calls.teardown), 0);
}

#[tokio::test]
async fn test_hide_tears_down_and_clears_display() {
    let mut launcher = TestLauncher::new();
    let apps = ScriptedExtension::global("apps").with_match("firefox", 0, 0, 1.0);
    let calls = apps.calls();
    launcher.register(vec![apps.into_arc()]).await;

    launcher.engine.on_session_visibility_changed(true).await;
    launcher.query("fire").await;
    assert_eq!(ids(&launcher.next().await), vec!["firefox"]);

    let report = launcher.engine.on_session_visibility_changed(false).await;
    assert!(report.changed);
    assert!(report.failed.is_empty());
    assert_eq!(Calls::get(&calls.teardown), 1);

    let cleared = launcher.next().await;
    assert!(cleared.is_empty());
    assert!(cleared.term.is_none());
    assert!(launcher.engine.published().await.is_none());
}

#[tokio::test]
async fn test_hide_cancels_in_flight_query_before_teardown() {
    let mut launcher = TestLauncher::new();
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let entered = Arc::new(Notify::new());

    let query_log = log.clone();
    let query_entered = entered.clone();
    let teardown_log = log.clone();
    let slow = FnExtension::global("slow")
        .on_query(move |_| {
            let log = query_log.clone();
            let entered = query_entered.clone();
            async move {
                log.lock().unwrap().push("slow:query-start".to_string());
                entered.notify_one();
                std::future::pending::<()>().await;
                log.lock().unwrap().push("slow:query-end".to_string());
                Ok(vec![Match::from_item(StandardItem::new("stale"), 1.0)])
            }
        })
        .on_teardown(move || {
            let log = teardown_log.clone();
            async move {
                log.lock().unwrap().push("slow:teardown".to_string());
                Ok(())
            }
        })
        .into_arc();
    let other = ScriptedExtension::global("other").logging(log.clone());
    launcher.register(vec![slow, other.into_arc()]).await;

    launcher.engine.on_session_visibility_changed(true).await;
    let in_flight = launcher.engine.on_query_term_changed("anything");
    entered.notified().await;

    launcher.engine.on_session_visibility_changed(false).await;
    in_flight.await.unwrap();

    let cleared = launcher.next().await;
    assert!(cleared.is_empty());
    launcher.assert_quiet();

    let events = log.lock().unwrap().clone();
    assert!(!events.contains(&"slow:query-end".to_string()));
    let started = events.iter().position(|e| e == "slow:query-start").unwrap();
    let torn_down = events.iter().position(|e| e == "slow:teardown").unwrap();
    assert!(started < torn_down);
    assert!(events.contains(&"other:teardown".to_string()));
}

#[tokio::test]
async fn test_failing_hook_does_not_block_other_extensions() {
    let launcher = TestLauncher::new();
    let broken = ScriptedExtension::global("broken").failing();
    let healthy = ScriptedExtension::global("healthy");
    let healthy_calls = healthy.calls();
    launcher.register(vec![broken.into_arc(), healthy.into_arc()]).await;

    let report = launcher.engine.on_session_visibility_changed(true).await;
    assert_eq!(report.failed, vec!["broken".to_string()]);
    assert_eq!(report.succeeded, 1);
    assert_eq!(Calls::get(&healthy_calls.setup), 1);

    let report = launcher.engine.on_session_visibility_changed(false).await;
    assert_eq!(report.failed, vec!["broken".to_string()]);
    assert_eq!(Calls::get(&healthy_calls.teardown), 1);
    assert!(!launcher.engine.is_active().await);
}

#[tokio::test]
async fn test_each_session_gets_a_new_id() {
    let launcher = TestLauncher::new();

    let first = launcher.engine.on_session_visibility_changed(true).await;
    launcher.engine.on_session_visibility_changed(false).await;
    let second = launcher.engine.on_session_visibility_changed(true).await;

    assert!(first.session_id.is_some());
    assert_ne!(first.session_id, second.session_id);
}
