//! Integration tests for query routing and ranking.

mod helpers;

use helpers::{Calls, ScriptedExtension, TestLauncher, ids};
use lumen_core::config::AppConfig;

#[tokio::test]
async fn test_blank_terms_publish_empty_results() {
    let mut launcher = TestLauncher::new();
    let apps = ScriptedExtension::global("apps").with_match("firefox", 0, 0, 1.0);
    let calls = apps.calls();
    launcher.register(vec![apps.into_arc()]).await;

    for term in ["", "   ", "\t"] {
        launcher.query(term).await;
        let set = launcher.next().await;
        assert!(set.is_empty());
        assert!(set.term.is_none());
    }

    assert_eq!(Calls::get(&calls.query), 0);
    assert!(launcher.engine.published().await.is_none());
}

#[tokio::test]
async fn test_trigger_requires_exact_first_word() {
    let mut launcher = TestLauncher::new();
    let calc = ScriptedExtension::triggered("calc", &["calc"]).with_match("4", 0, 0, 1.0);
    let calls = calc.calls();
    launcher.register(vec![calc.into_arc()]).await;

    launcher.query("calc 2+2").await;
    assert_eq!(ids(&launcher.next().await), vec!["4"]);
    assert_eq!(Calls::get(&calls.query), 1);

    launcher.query("calculate 2+2").await;
    assert!(launcher.next().await.is_empty());
    assert_eq!(Calls::get(&calls.query), 1);

    launcher.query("calc").await;
    assert_eq!(ids(&launcher.next().await), vec!["4"]);
    assert_eq!(Calls::get(&calls.query), 2);
}

#[tokio::test]
async fn test_exclusive_trigger_short_circuits() {
    let mut launcher = TestLauncher::new();
    let go = ScriptedExtension::triggered("go", &["go"])
        .exclusive()
        .with_match("go-result", 0, 0, 1.0);
    let apps = ScriptedExtension::global("apps")
        .with_match("a1", 5, 5, 5.0)
        .with_match("a2", 5, 5, 5.0)
        .with_match("a3", 5, 5, 5.0);
    let apps_calls = apps.calls();
    launcher.register(vec![go.into_arc(), apps.into_arc()]).await;

    launcher.query("go x").await;

    assert_eq!(ids(&launcher.next().await), vec!["go-result"]);
    assert_eq!(Calls::get(&apps_calls.query), 0);
    assert_eq!(Calls::get(&apps_calls.fallback), 0);
}

#[tokio::test]
async fn test_exclusive_results_are_not_reordered() {
    let mut launcher = TestLauncher::new();
    let go = ScriptedExtension::triggered("go", &["go"])
        .exclusive()
        .with_match("low", 0, 0, 1.0)
        .with_match("high", 9, 9, 9.0);
    launcher.register(vec![go.into_arc()]).await;

    launcher.query("go").await;

    assert_eq!(ids(&launcher.next().await), vec!["low", "high"]);
}

#[tokio::test]
async fn test_trigger_and_global_results_merge_ranked() {
    let mut launcher = TestLauncher::new();
    let a = ScriptedExtension::triggered("a", &["go"]).with_match("A", 0, 0, 5.0);
    let b = ScriptedExtension::global("b").with_match("B", 0, 0, 9.0);
    launcher.register(vec![a.into_arc(), b.into_arc()]).await;

    launcher.query("go").await;

    assert_eq!(ids(&launcher.next().await), vec!["B", "A"]);
}

#[tokio::test]
async fn test_ranking_precedence() {
    let mut launcher = TestLauncher::new();
    let mixed = ScriptedExtension::global("mixed")
        .with_match("scored", 0, 0, 100.0)
        .with_match("used", 0, 10, 0.0)
        .with_match("important", 1, 0, 0.0);
    launcher.register(vec![mixed.into_arc()]).await;

    launcher.query("anything").await;

    assert_eq!(
        ids(&launcher.next().await),
        vec!["important", "used", "scored"]
    );
}

#[tokio::test]
async fn test_equal_matches_keep_registration_order() {
    let mut launcher = TestLauncher::new();
    let first = ScriptedExtension::global("first").with_match("one", 0, 0, 1.0);
    let second = ScriptedExtension::global("second").with_match("two", 0, 0, 1.0);
    let third = ScriptedExtension::global("third").with_match("three", 0, 0, 1.0);
    launcher
        .register(vec![first.into_arc(), second.into_arc(), third.into_arc()])
        .await;

    launcher.query("x").await;

    assert_eq!(ids(&launcher.next().await), vec!["one", "two", "three"]);
}

#[tokio::test]
async fn test_fallback_runs_once_when_nothing_matches() {
    let mut launcher = TestLauncher::new();
    let web = ScriptedExtension::global("web").with_fallback("search-web", 1.0);
    let calc = ScriptedExtension::triggered("calc", &["="]).with_fallback("calc-fallback", 2.0);
    let web_calls = web.calls();
    let calc_calls = calc.calls();
    launcher.register(vec![web.into_arc(), calc.into_arc()]).await;

    launcher.query("nothing here").await;

    // Fallback results keep dispatch order unless ranking is enabled.
    assert_eq!(
        ids(&launcher.next().await),
        vec!["search-web", "calc-fallback"]
    );
    assert_eq!(Calls::get(&web_calls.fallback), 1);
    assert_eq!(Calls::get(&calc_calls.fallback), 1);
    assert_eq!(Calls::get(&calc_calls.query), 0);
}

#[tokio::test]
async fn test_fallback_skipped_when_matches_exist() {
    let mut launcher = TestLauncher::new();
    let apps = ScriptedExtension::global("apps")
        .with_match("firefox", 0, 0, 1.0)
        .with_fallback("never", 1.0);
    let web = ScriptedExtension::global("web").with_fallback("search-web", 1.0);
    let apps_calls = apps.calls();
    let web_calls = web.calls();
    launcher.register(vec![apps.into_arc(), web.into_arc()]).await;

    launcher.query("fire").await;

    assert_eq!(ids(&launcher.next().await), vec!["firefox"]);
    assert_eq!(Calls::get(&apps_calls.fallback), 0);
    assert_eq!(Calls::get(&web_calls.fallback), 0);
}

#[tokio::test]
async fn test_fallback_ranking_can_be_enabled() {
    let mut config = AppConfig::default();
    config.dispatch.rank_fallback_results = true;
    let mut launcher = TestLauncher::with_config(config);
    let web = ScriptedExtension::global("web").with_fallback("low", 1.0);
    let files = ScriptedExtension::global("files").with_fallback("high", 2.0);
    launcher.register(vec![web.into_arc(), files.into_arc()]).await;

    launcher.query("nothing").await;

    assert_eq!(ids(&launcher.next().await), vec!["high", "low"]);
}

#[tokio::test]
async fn test_faulting_extension_is_isolated() {
    let mut launcher = TestLauncher::new();
    let broken = ScriptedExtension::global("broken")
        .with_match("never", 9, 9, 9.0)
        .failing();
    let apps = ScriptedExtension::global("apps").with_match("firefox", 0, 0, 1.0);
    launcher.register(vec![broken.into_arc(), apps.into_arc()]).await;

    launcher.query("fire").await;

    assert_eq!(ids(&launcher.next().await), vec!["firefox"]);
}

#[tokio::test]
async fn test_trigger_only_without_triggers_never_runs() {
    let mut launcher = TestLauncher::new();
    let orphan = ScriptedExtension::triggered("orphan", &[]).with_match("never", 0, 0, 1.0);
    let calls = orphan.calls();
    launcher.register(vec![orphan.into_arc()]).await;

    launcher.query("anything").await;
    launcher.query("").await;

    assert!(launcher.next().await.is_empty());
    assert!(launcher.next().await.is_empty());
    assert_eq!(Calls::get(&calls.query), 0);
    assert_eq!(Calls::get(&calls.fallback), 1);
}
