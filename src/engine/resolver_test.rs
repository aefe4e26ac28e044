use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;

use super::Resolver;
use super::ServiceContext;
use crate::config::Settings;
use crate::constants::GLOBAL_APP_ID;
use crate::engine::ResolveRequest;
use crate::merge::InMemoryVolatileStore;
use crate::merge::VolatileStore;
use crate::model::Condition;
use crate::model::ConditionMap;
use crate::model::DimensionSignature;
use crate::query::MockRenderedCache;
use crate::subscription::SubscriptionIndex;
use crate::subscription::SubscriptionKind;
use crate::subscription::WaiterHandle;
use crate::test_utils::context::fixture_context;
use crate::test_utils::context::InMemoryQueryEngine;
use crate::test_utils::record;
use crate::test_utils::schema;
use crate::Error;
use crate::ResolveError;

#[tokio::test]
async fn test_resolve_returns_partial_result_with_error_keys() {
    let ctx = fixture_context(vec![record::default_global(
        "option",
        &[("volume", json!(30))],
    )]);
    let resolver = Resolver::new(ctx);

    let request = ResolveRequest::read(
        "option",
        vec!["volume".to_string(), "brightness".to_string()],
        GLOBAL_APP_ID,
    );
    let response = resolver.resolve(request).await.unwrap();

    assert_eq!(response.values.get("volume"), Some(&json!(30)));
    assert_eq!(response.error_keys, vec!["brightness".to_string()]);
    assert!(!response.from_cache);
}

#[tokio::test]
async fn test_plain_key_falls_back_to_global_for_foreign_requester() {
    let ctx = fixture_context(vec![
        record::main_global("option", &[("volume", json!(50))]),
        record::main_for_app("app.x", "option", &[("volume", json!(70))]),
    ]);
    let resolver = Resolver::new(ctx);

    // app.y owns no volume record: the plain key resolves under the
    // GLOBAL context, and app.x's per-app record never leaks into it.
    let request = ResolveRequest::read("option", vec!["volume".to_string()], "app.y");
    let response = resolver.resolve(request).await.unwrap();

    assert_eq!(response.values.get("volume"), Some(&json!(50)));
    assert!(response.error_keys.is_empty());
}

#[tokio::test]
async fn test_per_app_key_resolves_under_requester_context() {
    let ctx = fixture_context(vec![
        record::main_global(
            "option",
            &[("volume", json!(50)), ("pictureMode", json!("standard"))],
        ),
        record::main_for_app("app.x", "option", &[("pictureMode", json!("vivid"))]),
    ]);
    let resolver = Resolver::new(ctx);

    // The owner gets its per-app value; the plain key rides the global
    // view alongside it.
    let request = ResolveRequest::read(
        "option",
        vec!["pictureMode".to_string(), "volume".to_string()],
        "app.x",
    );
    let response = resolver.resolve(request).await.unwrap();
    assert_eq!(response.values.get("pictureMode"), Some(&json!("vivid")));
    assert_eq!(response.values.get("volume"), Some(&json!(50)));

    // Any other app sees the mixed key's global fallback, not app.x's
    // per-app value.
    let request = ResolveRequest::read("option", vec!["pictureMode".to_string()], "app.y");
    let response = resolver.resolve(request).await.unwrap();
    assert_eq!(response.values.get("pictureMode"), Some(&json!("standard")));
}

#[tokio::test]
async fn test_resolve_fails_only_when_nothing_matches() {
    let ctx = fixture_context(vec![record::default_global(
        "option",
        &[("volume", json!(30))],
    )]);
    let resolver = Resolver::new(ctx);

    let request = ResolveRequest::read("option", vec!["brightness".to_string()], GLOBAL_APP_ID);
    let err = resolver.resolve(request).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Resolve(ResolveError::NoMatch { ref category }) if category == "option"
    ));
}

#[tokio::test]
async fn test_resolve_rejects_malformed_requests() {
    let resolver = Resolver::new(fixture_context(vec![]));

    let empty_category = ResolveRequest::read("", vec!["volume".to_string()], GLOBAL_APP_ID);
    assert!(matches!(
        resolver.resolve(empty_category).await.unwrap_err(),
        Error::Resolve(ResolveError::MalformedRequest(_))
    ));

    let no_keys = ResolveRequest::read("option", vec![], GLOBAL_APP_ID);
    assert!(matches!(
        resolver.resolve(no_keys).await.unwrap_err(),
        Error::Resolve(ResolveError::MalformedRequest(_))
    ));

    let mut subscribe_without_waiter =
        ResolveRequest::read("option", vec!["volume".to_string()], GLOBAL_APP_ID);
    subscribe_without_waiter.subscribe = true;
    assert!(matches!(
        resolver.resolve(subscribe_without_waiter).await.unwrap_err(),
        Error::Resolve(ResolveError::MalformedRequest(_))
    ));
}

#[tokio::test]
async fn test_read_only_request_served_from_rendered_cache() {
    let mut cache = MockRenderedCache::new();
    cache.expect_is_available().return_const(true);
    cache
        .expect_get()
        .returning(|_, _| Some(json!("cached-value")));

    // An empty store proves the reply came from the cache.
    let ctx = Arc::new(ServiceContext::new(
        Arc::new(Settings::default()),
        Arc::new(Condition::new(ConditionMap::new())),
        Arc::new(schema::fixture()),
        Arc::new(InMemoryQueryEngine::default()),
        Arc::new(InMemoryVolatileStore::new()),
        Arc::new(cache),
        Arc::new(SubscriptionIndex::new()),
    ));
    let resolver = Resolver::new(ctx);

    let mut request = ResolveRequest::read("option", vec!["volume".to_string()], GLOBAL_APP_ID);
    request.read_only = true;
    let response = resolver.resolve(request).await.unwrap();

    assert!(response.from_cache);
    assert_eq!(response.values.get("volume"), Some(&json!("cached-value")));
}

#[tokio::test]
async fn test_per_app_resolution_never_populates_rendered_cache() {
    let mut cache = MockRenderedCache::new();
    cache.expect_put().never();

    let ctx = Arc::new(ServiceContext::new(
        Arc::new(Settings::default()),
        Arc::new(Condition::new(ConditionMap::new())),
        Arc::new(schema::fixture()),
        Arc::new(InMemoryQueryEngine::with_records(vec![
            record::main_global("option", &[("pictureMode", json!("standard"))]),
            record::main_for_app("app.x", "option", &[("pictureMode", json!("vivid"))]),
        ])),
        Arc::new(InMemoryVolatileStore::new()),
        Arc::new(cache),
        Arc::new(SubscriptionIndex::new()),
    ));
    let resolver = Resolver::new(ctx);

    let request = ResolveRequest::read("option", vec!["pictureMode".to_string()], "app.x");
    let response = resolver.resolve(request).await.unwrap();
    assert_eq!(response.values.get("pictureMode"), Some(&json!("vivid")));
}

#[tokio::test]
async fn test_subscribe_registers_key_and_axis_tuples() {
    let ctx = fixture_context(vec![record::default_global(
        "option",
        &[("pictureMode", json!("standard"))],
    )]);
    let resolver = Resolver::new(ctx.clone());

    let (tx, _rx) = mpsc::channel(4);
    let waiter = WaiterHandle::new("com.app.viewer", tx);
    let waiter_id = waiter.id;

    let mut request = ResolveRequest::read("option", vec!["pictureMode".to_string()], "com.app.viewer");
    request.subscribe = true;
    request.waiter = Some(waiter);
    resolver.resolve(request).await.unwrap();

    let index = ctx.subscriptions();
    assert!(index.waiter_is_registered(waiter_id));
    assert!(index.has_axis_subscribers("input_source"));

    let groups = index.lookup(&DimensionSignature::none(), SubscriptionKind::Value);
    let keys = groups
        .get(&("option".to_string(), "com.app.viewer".to_string()))
        .cloned()
        .unwrap_or_default();
    assert!(keys.contains("pictureMode"));
}

#[tokio::test]
async fn test_volatile_overlay_wins_over_persisted_value() {
    let ctx = fixture_context(vec![record::default_global(
        "option",
        &[("backlight", json!(80))],
    )]);
    ctx.volatile().set(
        &DimensionSignature::none(),
        GLOBAL_APP_ID,
        "backlight",
        json!(95),
    );
    let resolver = Resolver::new(ctx);

    let request = ResolveRequest::read("option", vec!["backlight".to_string()], GLOBAL_APP_ID);
    let response = resolver.resolve(request).await.unwrap();
    assert_eq!(response.values.get("backlight"), Some(&json!(95)));
}
