use std::sync::Arc;

use serde_json::json;
use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio::sync::mpsc::Receiver;

use super::ExcludeList;
use super::PerAppSwitchReconciler;
use crate::engine::ResolveRequest;
use crate::engine::Resolver;
use crate::engine::ServiceContext;
use crate::model::Record;
use crate::subscription::Notification;
use crate::subscription::SubscriptionKind;
use crate::subscription::WaiterHandle;
use crate::test_utils::context::fixture_context;
use crate::test_utils::record;

fn setup(records: Vec<Record>) -> (Arc<ServiceContext>, Arc<Resolver>, PerAppSwitchReconciler) {
    let ctx = fixture_context(records);
    let resolver = Arc::new(Resolver::new(ctx.clone()));
    // Missing file, so nobody is excluded.
    let exclude = ExcludeList::new("does/not/exist.json");
    let reconciler = PerAppSwitchReconciler::new(ctx.clone(), resolver.clone(), exclude);
    (ctx, resolver, reconciler)
}

async fn subscribe(
    resolver: &Resolver,
    sender_name: &str,
    app_id: &str,
    keys: &[&str],
    kind: SubscriptionKind,
) -> Receiver<Notification> {
    let (tx, rx) = mpsc::channel(4);
    let mut request = ResolveRequest::read(
        "option",
        keys.iter().map(|k| k.to_string()).collect(),
        app_id,
    );
    request.subscribe = true;
    request.subscription_kind = kind;
    request.waiter = Some(WaiterHandle::new(sender_name, tx));
    resolver.resolve(request).await.unwrap();
    rx
}

/// Per-app records that make pictureMode resolve to a different value for
/// each app.
fn per_app_picture_records() -> Vec<Record> {
    vec![
        record::default_global("option", &[("pictureMode", json!("standard")), ("volume", json!(30))]),
        record::main_for_app("com.app.photo", "option", &[("pictureMode", json!("vivid"))]),
        record::main_for_app("com.app.video", "option", &[("pictureMode", json!("cinema"))]),
    ]
}

#[tokio::test]
async fn test_switch_notifies_keys_whose_value_differs() {
    let (_ctx, resolver, reconciler) = setup(per_app_picture_records());
    let mut rx = subscribe(
        &resolver,
        "com.app.photo",
        "com.app.photo",
        &["pictureMode", "volume"],
        SubscriptionKind::Value,
    )
    .await;

    let sent = reconciler.reconcile_switch("com.app.photo", "com.app.video").await.unwrap();
    assert_eq!(sent, 1);

    // volume resolves identically for both apps and is suppressed.
    let notification = rx.try_recv().unwrap();
    assert_eq!(notification.changed_keys(), vec!["pictureMode"]);
    assert_eq!(
        notification.changes[0].values.get("pictureMode"),
        Some(&json!("cinema"))
    );
}

#[tokio::test]
async fn test_switch_with_equal_merges_sends_nothing() {
    let (_ctx, resolver, reconciler) = setup(vec![record::default_global(
        "option",
        &[("volume", json!(30))],
    )]);
    let mut rx = subscribe(
        &resolver,
        "com.app.photo",
        "com.app.photo",
        &["volume"],
        SubscriptionKind::Value,
    )
    .await;

    let sent = reconciler.reconcile_switch("com.app.photo", "com.app.video").await.unwrap();
    assert_eq!(sent, 0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_switch_to_same_app_is_a_noop() {
    let (_ctx, _resolver, reconciler) = setup(per_app_picture_records());
    let sent = reconciler.reconcile_switch("com.app.photo", "com.app.photo").await.unwrap();
    assert_eq!(sent, 0);
}

#[tokio::test]
async fn test_description_diff_compares_only_core_fields() {
    // The fixture schema gives pictureMode an app-specific description for
    // com.app.photo, so switching away from it changes the description.
    let (_ctx, resolver, reconciler) = setup(vec![
        record::default_global("option", &[("pictureMode", json!("standard"))]),
    ]);
    let mut rx = subscribe(
        &resolver,
        "app.photo",
        "app.photo",
        &["pictureMode"],
        SubscriptionKind::Description,
    )
    .await;

    let sent = reconciler.reconcile_switch("app.photo", "com.app.video").await.unwrap();
    assert_eq!(sent, 1);
    let notification = rx.try_recv().unwrap();
    assert_eq!(notification.kind, SubscriptionKind::Description);
    assert_eq!(notification.changed_keys(), vec!["pictureMode"]);
}

#[tokio::test]
async fn test_excluded_sender_is_suppressed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("exclude.json");
    std::fs::write(&path, r#"["com.system.updater"]"#).unwrap();

    let ctx = fixture_context(per_app_picture_records());
    let resolver = Arc::new(Resolver::new(ctx.clone()));
    let reconciler = PerAppSwitchReconciler::new(ctx, resolver.clone(), ExcludeList::new(&path));

    let mut excluded_rx = subscribe(
        &resolver,
        "com.system.updater",
        "com.app.photo",
        &["pictureMode"],
        SubscriptionKind::Value,
    )
    .await;
    let mut normal_rx = subscribe(
        &resolver,
        "com.app.photo",
        "com.app.photo",
        &["pictureMode"],
        SubscriptionKind::Value,
    )
    .await;

    let sent = reconciler.reconcile_switch("com.app.photo", "com.app.video").await.unwrap();
    assert_eq!(sent, 1);
    assert!(excluded_rx.try_recv().is_err());
    assert!(normal_rx.try_recv().is_ok());
}

#[tokio::test]
async fn test_removal_purges_per_app_records_without_notifying() {
    let (ctx, resolver, reconciler) = setup(per_app_picture_records());
    let mut rx = subscribe(
        &resolver,
        "com.app.photo",
        "com.app.photo",
        &["pictureMode"],
        SubscriptionKind::Value,
    )
    .await;

    let sent = reconciler.reconcile_removal("com.app.photo").await.unwrap();
    assert_eq!(sent, 0);
    assert!(rx.try_recv().is_err());

    // The app's override is gone from subsequent resolutions.
    let response = resolver
        .resolve(ResolveRequest::read(
            "option",
            vec!["pictureMode".to_string()],
            "com.app.photo",
        ))
        .await
        .unwrap();
    assert_eq!(response.values.get("pictureMode"), Some(&json!("standard")));
    let _ = ctx;
}
