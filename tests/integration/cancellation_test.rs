//! Integration tests for superseded and cancelled queries.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use helpers::{ScriptedExtension, TestLauncher, ids};
use lumen_core::config::AppConfig;
use lumen_engine::closure::FnExtension;
use lumen_engine::extension::Extension;
use lumen_engine::item::StandardItem;
use lumen_engine::query::Match;

/// Global extension that echoes the term, blocking on `release` for `held`.
fn blocking_echo(held: &'static str, entered: Arc<Notify>, release: Arc<Notify>) -> Arc<dyn Extension> {
    FnExtension::global("echo")
        .on_query(move |ctx| {
            let entered = entered.clone();
            let release = release.clone();
            async move {
                if ctx.term() == held {
                    entered.notify_one();
                    release.notified().await;
                }
                Ok(vec![Match::from_item(StandardItem::new(ctx.term()), 1.0)])
            }
        })
        .into_arc()
}

#[tokio::test]
async fn test_stale_result_is_never_published_after_newer_one() {
    let mut launcher = TestLauncher::new();
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    launcher
        .register(vec![blocking_echo("first", entered.clone(), release.clone())])
        .await;

    let first = launcher.engine.on_query_term_changed("first");
    entered.notified().await;

    launcher.query("second").await;
    let published = launcher.next().await;
    assert_eq!(published.term.as_deref(), Some("second"));
    assert_eq!(ids(&published), vec!["second"]);

    release.notify_one();
    first.await.unwrap();

    launcher.assert_quiet();
    assert_eq!(
        launcher.engine.published().await.unwrap().term(),
        "second"
    );
}

#[tokio::test]
async fn test_rapid_keystrokes_publish_in_order() {
    let mut launcher = TestLauncher::new();
    let apps = ScriptedExtension::global("apps").with_match("firefox", 0, 0, 1.0);
    launcher.register(vec![apps.into_arc()]).await;

    let term = "firefox";
    let mut handles = Vec::new();
    for end in 1..=term.len() {
        handles.push(launcher.engine.on_query_term_changed(&term[..end]));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut last_id = 0;
    let mut last_term = None;
    while let Ok(set) = launcher.results.try_recv() {
        assert!(set.query_id > last_id, "publications went backwards");
        last_id = set.query_id;
        last_term = set.term;
    }
    assert_eq!(last_term.as_deref(), Some("firefox"));
}

#[tokio::test]
async fn test_cancelled_exclusive_extension_publishes_nothing() {
    let mut launcher = TestLauncher::new();
    let entered = Arc::new(Notify::new());
    let entered_in_handler = entered.clone();
    let exclusive = FnExtension::triggered("go", ["go"])
        .exclusive(true)
        .on_query(move |_| {
            let entered = entered_in_handler.clone();
            async move {
                entered.notify_one();
                std::future::pending::<()>().await;
                Ok(Vec::new())
            }
        })
        .into_arc();
    let apps = ScriptedExtension::global("apps").with_match("firefox", 0, 0, 1.0);
    launcher.register(vec![exclusive, apps.into_arc()]).await;

    let stale = launcher.engine.on_query_term_changed("go somewhere");
    entered.notified().await;

    launcher.query("fire").await;
    stale.await.unwrap();

    assert_eq!(ids(&launcher.next().await), vec!["firefox"]);
    launcher.assert_quiet();
}

#[tokio::test(start_paused = true)]
async fn test_slow_extension_times_out_without_stalling_others() {
    let mut config = AppConfig::default();
    config.dispatch.handler_timeout_ms = 100;
    let mut launcher = TestLauncher::with_config(config);

    let slow = FnExtension::global("slow")
        .on_query(|_| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![Match::from_item(StandardItem::new("late"), 9.0)])
        })
        .into_arc();
    let fast = ScriptedExtension::global("fast").with_match("quick", 0, 0, 1.0);
    launcher.register(vec![slow, fast.into_arc()]).await;

    launcher.query("anything").await;

    assert_eq!(ids(&launcher.next().await), vec!["quick"]);
}
