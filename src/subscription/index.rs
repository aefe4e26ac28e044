//! The subscription index: (category, key, app, dimension-signature, kind)
//! tuples mapped to interested waiter handles.
//!
//! Shared mutable state. Every mutation and lookup happens under one
//! exclusive lock, and notification delivery re-acquires that same lock
//! for its liveness check, so a removed waiter can never receive a
//! subsequent notification.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::Notification;
use super::SubscriptionKind;
use super::WaiterHandle;
use super::WaiterId;
use crate::constants::DIMENSION_AXIS_CATEGORY;
use crate::model::DimensionSignature;
use crate::DispatchError;

/// Interest registration for one (category, key, app) under a signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionTuple {
    pub category: String,
    pub key: String,
    pub app_id: String,
    pub kind: SubscriptionKind,
}

#[derive(Default)]
struct IndexInner {
    by_signature: HashMap<DimensionSignature, HashMap<SubscriptionTuple, BTreeSet<WaiterId>>>,
    waiters: HashMap<WaiterId, WaiterHandle>,
}

#[derive(Default)]
pub struct SubscriptionIndex {
    inner: Mutex<IndexInner>,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest. Idempotent per exact tuple: re-adding the same
    /// tuple for the same waiter is the same logical subscription.
    pub fn add(
        &self,
        signature: &DimensionSignature,
        tuple: SubscriptionTuple,
        waiter: &WaiterHandle,
    ) {
        let mut inner = self.inner.lock();
        inner.waiters.entry(waiter.id).or_insert_with(|| waiter.clone());
        let added = inner
            .by_signature
            .entry(signature.clone())
            .or_default()
            .entry(tuple)
            .or_default()
            .insert(waiter.id);
        if added {
            trace!(%signature, waiter = %waiter.id, "subscription added");
        }
    }

    /// Remove every tuple owned by `waiter` across all signatures,
    /// atomically. After this returns, no dispatch pass will deliver to
    /// the waiter.
    pub fn remove_all(
        &self,
        waiter: WaiterId,
    ) {
        let mut inner = self.inner.lock();
        inner.waiters.remove(&waiter);
        for tuples in inner.by_signature.values_mut() {
            tuples.retain(|_, ids| {
                ids.remove(&waiter);
                !ids.is_empty()
            });
        }
        inner.by_signature.retain(|_, tuples| !tuples.is_empty());
        debug!(%waiter, "removed all subscriptions for waiter");
    }

    /// Distinct signatures that currently have at least one real (non
    /// dimension-axis-bookkeeping) subscription of `kind`.
    pub fn signatures(
        &self,
        kind: SubscriptionKind,
    ) -> Vec<DimensionSignature> {
        let inner = self.inner.lock();
        let mut signatures: Vec<_> = inner
            .by_signature
            .iter()
            .filter(|(_, tuples)| {
                tuples
                    .keys()
                    .any(|t| t.kind == kind && t.category != DIMENSION_AXIS_CATEGORY)
            })
            .map(|(signature, _)| signature.clone())
            .collect();
        signatures.sort();
        signatures
    }

    /// What to re-merge under one signature: (category, app) -> keys.
    pub fn lookup(
        &self,
        signature: &DimensionSignature,
        kind: SubscriptionKind,
    ) -> BTreeMap<(String, String), BTreeSet<String>> {
        let inner = self.inner.lock();
        let mut out: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();
        if let Some(tuples) = inner.by_signature.get(signature) {
            for tuple in tuples.keys() {
                if tuple.kind != kind || tuple.category == DIMENSION_AXIS_CATEGORY {
                    continue;
                }
                out.entry((tuple.category.clone(), tuple.app_id.clone()))
                    .or_default()
                    .insert(tuple.key.clone());
            }
        }
        out
    }

    /// Waiters interested in any of `keys` under (signature, category,
    /// app, kind), with the per-waiter subset of matched keys.
    pub fn matched_waiters(
        &self,
        signature: &DimensionSignature,
        kind: SubscriptionKind,
        category: &str,
        app_id: &str,
        keys: &BTreeSet<String>,
    ) -> BTreeMap<WaiterId, BTreeSet<String>> {
        let inner = self.inner.lock();
        let mut out: BTreeMap<WaiterId, BTreeSet<String>> = BTreeMap::new();
        if let Some(tuples) = inner.by_signature.get(signature) {
            for (tuple, ids) in tuples {
                if tuple.kind != kind
                    || tuple.category != category
                    || tuple.app_id != app_id
                    || !keys.contains(&tuple.key)
                {
                    continue;
                }
                for id in ids {
                    out.entry(*id).or_default().insert(tuple.key.clone());
                }
            }
        }
        out
    }

    /// Whether any waiter registered dimension-axis bookkeeping for `axis`.
    pub fn has_axis_subscribers(
        &self,
        axis: &str,
    ) -> bool {
        let inner = self.inner.lock();
        inner.by_signature.values().any(|tuples| {
            tuples
                .iter()
                .any(|(t, ids)| t.category == DIMENSION_AXIS_CATEGORY && t.key == axis && !ids.is_empty())
        })
    }

    /// Total live subscribers under one signature and kind.
    pub fn subscriber_count(
        &self,
        signature: &DimensionSignature,
        kind: SubscriptionKind,
    ) -> usize {
        let inner = self.inner.lock();
        let mut ids = BTreeSet::new();
        if let Some(tuples) = inner.by_signature.get(signature) {
            for (tuple, waiters) in tuples {
                if tuple.kind == kind && tuple.category != DIMENSION_AXIS_CATEGORY {
                    ids.extend(waiters.iter().copied());
                }
            }
        }
        ids.len()
    }

    /// Deliver one notification, holding the index lock across the
    /// liveness check and the send. A waiter removed concurrently is
    /// skipped; a full or closed channel is logged and skipped (best
    /// effort, fan-out continues).
    pub fn notify(
        &self,
        waiter: WaiterId,
        notification: Notification,
    ) -> bool {
        let inner = self.inner.lock();
        let Some(handle) = inner.waiters.get(&waiter) else {
            trace!(%waiter, "skipping notification: waiter removed");
            return false;
        };
        match handle.tx.try_send(notification) {
            Ok(()) => true,
            Err(e) => {
                let failure = DispatchError::DeliveryFailed { waiter_id: waiter.0 };
                warn!("{failure}: {:?}", e);
                false
            }
        }
    }

    /// Sender identity of a live waiter, for exclude-list matching.
    pub fn sender_of(
        &self,
        waiter: WaiterId,
    ) -> Option<String> {
        self.inner.lock().waiters.get(&waiter).map(|h| h.sender_name.clone())
    }

    #[cfg(test)]
    pub(crate) fn waiter_is_registered(
        &self,
        waiter: WaiterId,
    ) -> bool {
        self.inner.lock().waiters.contains_key(&waiter)
    }
}
