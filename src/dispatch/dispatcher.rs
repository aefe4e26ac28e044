//! The notification dispatcher: collect, re-merge, diff/fan-out.
//!
//! One pass per change event. Per-waiter messages are coalesced and sent
//! at most once per pass; a send failure for one waiter never aborts the
//! remaining fan-out. Across passes no ordering is guaranteed beyond store
//! commit order; the dispatcher holds no internal event queue.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use nanoid::nanoid;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::constants::DISPATCH_PENDING_OVERHEAD;
use crate::engine::Resolver;
use crate::engine::ServiceContext;
use crate::model::canonical_dimension_bytes;
use crate::model::ValueMap;
use crate::subscription::CategoryUpdate;
use crate::subscription::Notification;
use crate::subscription::SubscriptionKind;
use crate::subscription::WaiterId;
use crate::Result;

/// One settings-change event driving a dispatch pass.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    /// A write committed new values for keys in one category
    Write {
        category: String,
        keys: BTreeSet<String>,
    },

    /// The active country code changed; every subscription is affected
    CountryChanged,

    /// Dimension axes may carry new values
    DimensionChanged { axes: Vec<String> },
}

/// Pending-count bookkeeping for one dispatch pass: one slot per waiter
/// the pass will notify, plus one overhead slot held by the pass itself.
/// The context only counts as released once every waiter slot has been
/// drained.
pub(super) struct DispatchContext {
    token: String,
    pending: usize,
}

impl DispatchContext {
    pub(super) fn new(waiter_count: usize) -> Self {
        DispatchContext {
            token: nanoid!(10),
            pending: waiter_count + DISPATCH_PENDING_OVERHEAD,
        }
    }

    pub(super) fn complete_one(&mut self) {
        self.pending = self.pending.saturating_sub(1);
    }

    /// Drain the overhead slot. Returns whether the count reached zero;
    /// a leftover count means a waiter slot went unaccounted, which is
    /// a bookkeeping anomaly worth a warning, not an abort.
    pub(super) fn release(mut self) -> bool {
        self.complete_one();
        if self.pending == 0 {
            trace!(token = %self.token, "dispatch context released");
            true
        } else {
            warn!(
                token = %self.token,
                remaining = self.pending,
                "dispatch context released with unaccounted waiter slots"
            );
            false
        }
    }
}

pub struct NotificationDispatcher {
    ctx: Arc<ServiceContext>,
    resolver: Arc<Resolver>,

    /// Last observed canonical bytes per dimension axis, for the
    /// dimension-change short-circuit
    dimension_snapshots: DashMap<String, String>,
}

impl NotificationDispatcher {
    pub fn new(
        ctx: Arc<ServiceContext>,
        resolver: Arc<Resolver>,
    ) -> Self {
        NotificationDispatcher {
            ctx,
            resolver,
            dimension_snapshots: DashMap::new(),
        }
    }

    /// Run one full dispatch pass for `event`. Returns the number of
    /// notifications actually delivered.
    pub async fn dispatch_change(
        &self,
        event: &ChangeEvent,
    ) -> Result<usize> {
        let changed_axes = match event {
            ChangeEvent::DimensionChanged { axes } => {
                let changed = self.changed_axes(axes);
                if changed.is_empty() {
                    trace!("dimension change pass skipped: no axis actually changed");
                    return Ok(0);
                }
                changed
            }
            _ => BTreeSet::new(),
        };

        let index = self.ctx.subscriptions();
        let mut sent = 0usize;

        // Collect phase: every distinct signature with a real subscriber.
        for signature in index.signatures(SubscriptionKind::Value) {
            let dimension = signature.to_map();

            // Re-merge phase, grouped by (category, app).
            let mut per_waiter: BTreeMap<WaiterId, Vec<CategoryUpdate>> = BTreeMap::new();
            for ((category, app_id), keys) in index.lookup(&signature, SubscriptionKind::Value) {
                let interesting: BTreeSet<String> = keys
                    .into_iter()
                    .filter(|key| self.key_affected(event, &changed_axes, &category, key))
                    .collect();
                if interesting.is_empty() {
                    continue;
                }

                let merged = match self
                    .resolver
                    .effective_map(&category, &app_id, dimension.as_ref(), false)
                    .await
                {
                    Ok(map) => map,
                    Err(e) => {
                        // Collaborator failure: skip this group, keep the
                        // pass alive for the others.
                        warn!(category, app_id, "re-merge failed during dispatch: {:?}", e);
                        continue;
                    }
                };

                for (waiter, subscribed) in
                    index.matched_waiters(&signature, SubscriptionKind::Value, &category, &app_id, &interesting)
                {
                    let values: ValueMap = subscribed
                        .iter()
                        .filter_map(|key| merged.get(key).map(|v| (key.clone(), v.clone())))
                        .collect();
                    per_waiter.entry(waiter).or_default().push(CategoryUpdate {
                        category: category.clone(),
                        app_id: app_id.clone(),
                        values,
                    });
                }
            }

            // Diff/fan-out phase: exactly one reply per matched waiter.
            // The pending count covers each of them plus the pass itself.
            let mut pass = DispatchContext::new(per_waiter.len());
            for (waiter, changes) in per_waiter {
                let delivered = index.notify(
                    waiter,
                    Notification {
                        kind: SubscriptionKind::Value,
                        signature: signature.clone(),
                        changes,
                    },
                );
                if delivered {
                    sent += 1;
                }
                pass.complete_one();
            }
            pass.release();
        }

        debug!(?event, sent, "dispatch pass complete");
        Ok(sent)
    }

    /// Mandatory re-fetch-and-compare before skipping: an axis counts as
    /// changed only when its freshly fetched value object differs bytewise
    /// from the recorded snapshot, and only when someone subscribed to it.
    fn changed_axes(
        &self,
        axes: &[String],
    ) -> BTreeSet<String> {
        let mut changed = BTreeSet::new();
        for axis in axes {
            if !self.ctx.subscriptions().has_axis_subscribers(axis) {
                continue;
            }
            let current = self
                .ctx
                .schema()
                .dimension_values(axis)
                .map(|values| canonical_dimension_bytes(&values))
                .unwrap_or_default();
            let previous = self
                .dimension_snapshots
                .insert(axis.clone(), current.clone());
            if previous.as_deref() != Some(current.as_str()) {
                changed.insert(axis.clone());
            }
        }
        changed
    }

    /// Key-level filtering: a waiter is only woken for keys the event can
    /// actually have touched.
    fn key_affected(
        &self,
        event: &ChangeEvent,
        changed_axes: &BTreeSet<String>,
        category: &str,
        key: &str,
    ) -> bool {
        match event {
            ChangeEvent::Write {
                category: written_category,
                keys,
            } => written_category == category && keys.contains(key),
            ChangeEvent::CountryChanged => true,
            ChangeEvent::DimensionChanged { .. } => self
                .ctx
                .schema()
                .dependent_dimensions(key)
                .iter()
                .any(|axis| changed_axes.contains(axis)),
        }
    }

    /// Seed the snapshot table, typically at startup so the first real
    /// change is not mistaken for a transition from "never seen".
    pub fn record_dimension_snapshot(
        &self,
        axis: &str,
    ) {
        if let Some(values) = self.ctx.schema().dimension_values(axis) {
            self.dimension_snapshots
                .insert(axis.to_string(), canonical_dimension_bytes(&values));
        }
    }
}
