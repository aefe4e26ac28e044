//! Waiter handles: outstanding subscribed requests awaiting notifications.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::model::DimensionSignature;
use crate::model::ValueMap;

static NEXT_WAITER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique waiter identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaiterId(pub u64);

impl WaiterId {
    pub fn next() -> Self {
        WaiterId(NEXT_WAITER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for WaiterId {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "waiter-{}", self.0)
    }
}

/// What a subscription tuple watches: resolved values or description
/// metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubscriptionKind {
    Value,
    Description,
}

/// Changed keys for one (category, app) pair inside a notification.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryUpdate {
    pub category: String,
    pub app_id: String,
    pub values: ValueMap,
}

/// One change message pushed to a waiter. Carries only the keys that
/// waiter subscribed to, never the full merged map; matched keys across
/// categories are coalesced into a single message per event.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: SubscriptionKind,
    pub signature: DimensionSignature,
    pub changes: Vec<CategoryUpdate>,
}

impl Notification {
    /// Every changed key across all category updates, for assertions and
    /// logging.
    pub fn changed_keys(&self) -> Vec<&str> {
        self.changes
            .iter()
            .flat_map(|c| c.values.keys().map(|k| k.as_str()))
            .collect()
    }
}

/// Reply channel plus sender identity for one connected waiter.
#[derive(Debug, Clone)]
pub struct WaiterHandle {
    pub id: WaiterId,

    /// Transport-level sender identity, matched against the notification
    /// exclude list.
    pub sender_name: String,

    pub tx: mpsc::Sender<Notification>,
}

impl WaiterHandle {
    pub fn new(
        sender_name: impl Into<String>,
        tx: mpsc::Sender<Notification>,
    ) -> Self {
        WaiterHandle {
            id: WaiterId::next(),
            sender_name: sender_name.into(),
            tx,
        }
    }
}
