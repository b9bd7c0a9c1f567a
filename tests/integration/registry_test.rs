//! Integration tests for extension registration.

mod helpers;

use std::sync::Arc;

use tokio::sync::Notify;

use helpers::{ScriptedExtension, TestLauncher, ids};
use lumen_engine::closure::FnExtension;
use lumen_engine::error::RegistryError;
use lumen_engine::item::StandardItem;
use lumen_engine::query::Match;

#[tokio::test]
async fn test_duplicate_registration_is_reported() {
    let mut launcher = TestLauncher::new();
    launcher
        .register(vec![
            ScriptedExtension::global("apps")
                .with_match("first", 0, 0, 1.0)
                .into_arc(),
        ])
        .await;

    let err = launcher
        .engine
        .register_extension(
            ScriptedExtension::global("apps")
                .with_match("second", 0, 0, 1.0)
                .into_arc(),
        )
        .await
        .unwrap_err();
    assert_eq!(err, RegistryError::DuplicateRegistration("apps".to_string()));
    assert_eq!(launcher.engine.extensions().await.len(), 1);

    launcher.query("x").await;
    assert_eq!(ids(&launcher.next().await), vec!["first"]);
}

#[tokio::test]
async fn test_unknown_unregistration_is_reported() {
    let launcher = TestLauncher::new();
    launcher
        .register(vec![ScriptedExtension::global("apps").into_arc()])
        .await;

    let err = launcher
        .engine
        .unregister_extension("files")
        .await
        .unwrap_err();
    assert_eq!(err, RegistryError::UnknownExtension("files".to_string()));
    assert_eq!(launcher.engine.extensions().await.len(), 1);

    let removed = launcher.engine.unregister_extension("apps").await.unwrap();
    assert_eq!(removed.id(), "apps");
    assert!(launcher.engine.extensions().await.is_empty());
}

#[tokio::test]
async fn test_mutation_during_dispatch_uses_snapshot() {
    let mut launcher = TestLauncher::new();
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());

    let handler_entered = entered.clone();
    let handler_release = release.clone();
    let gated = FnExtension::global("gated")
        .on_query(move |ctx| {
            let entered = handler_entered.clone();
            let release = handler_release.clone();
            async move {
                if ctx.term() == "x" {
                    entered.notify_one();
                    release.notified().await;
                }
                Ok(vec![Match::from_item(StandardItem::new("gated-item"), 1.0)])
            }
        })
        .into_arc();
    let leaving = ScriptedExtension::global("leaving").with_match("leaving-item", 0, 0, 0.5);
    launcher.register(vec![gated, leaving.into_arc()]).await;

    let in_flight = launcher.engine.on_query_term_changed("x");
    entered.notified().await;

    launcher.engine.unregister_extension("leaving").await.unwrap();
    launcher
        .engine
        .register_extension(
            ScriptedExtension::global("late")
                .with_match("late-item", 0, 0, 9.0)
                .into_arc(),
        )
        .await
        .unwrap();

    release.notify_one();
    in_flight.await.unwrap();

    assert_eq!(
        ids(&launcher.next().await),
        vec!["gated-item", "leaving-item"]
    );

    launcher.query("y").await;
    let next = launcher.next().await;
    assert!(ids(&next).contains(&"late-item"));
    assert!(!ids(&next).contains(&"leaving-item"));
}
