//! Volatile overlay collaborator.
//!
//! Low-latency in-memory overrides per (dimension, app, key), consulted
//! after the merge to patch in ephemeral values. Volatile always wins over
//! persisted; the patch pass is idempotent.

use std::sync::Arc;

use dashmap::DashMap;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;

use crate::model::DimensionSignature;
use crate::model::ValueMap;
use crate::schema::KeySchema;

/// Volatile override store boundary.
#[cfg_attr(test, automock)]
pub trait VolatileStore: Send + Sync + 'static {
    fn get(
        &self,
        signature: &DimensionSignature,
        app_id: &str,
        key: &str,
    ) -> Option<Value>;

    fn set(
        &self,
        signature: &DimensionSignature,
        app_id: &str,
        key: &str,
        value: Value,
    );

    fn clear(
        &self,
        signature: &DimensionSignature,
        app_id: &str,
        key: &str,
    );
}

/// Process-local [`VolatileStore`] keyed by (signature, app, key).
#[derive(Default)]
pub struct InMemoryVolatileStore {
    entries: DashMap<(DimensionSignature, String, String), Value>,
}

impl InMemoryVolatileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VolatileStore for InMemoryVolatileStore {
    fn get(
        &self,
        signature: &DimensionSignature,
        app_id: &str,
        key: &str,
    ) -> Option<Value> {
        self.entries
            .get(&(signature.clone(), app_id.to_string(), key.to_string()))
            .map(|entry| entry.value().clone())
    }

    fn set(
        &self,
        signature: &DimensionSignature,
        app_id: &str,
        key: &str,
        value: Value,
    ) {
        self.entries
            .insert((signature.clone(), app_id.to_string(), key.to_string()), value);
    }

    fn clear(
        &self,
        signature: &DimensionSignature,
        app_id: &str,
        key: &str,
    ) {
        self.entries
            .remove(&(signature.clone(), app_id.to_string(), key.to_string()));
    }
}

/// Final patch pass after the merge: for every volatile-capable key in the
/// category's key list with a non-empty overlay value, that value
/// unconditionally replaces the merged one.
pub fn apply_volatile_overlay(
    merged: &mut ValueMap,
    category: &str,
    app_id: &str,
    signature: &DimensionSignature,
    schema: &dyn KeySchema,
    volatile: &dyn VolatileStore,
) {
    for key in schema.keys_in_category(category) {
        if !schema.is_volatile(&key) {
            continue;
        }
        if let Some(value) = volatile.get(signature, app_id, &key) {
            merged.insert(key, value);
        }
    }
}
