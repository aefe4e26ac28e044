//! Foreground-app switch reconciliation.
//!
//! An app switch is not a write: no record changed, yet every per-app
//! subscriber may see a different effective value. The reconciler walks a
//! short linear state machine, re-merges each subscribed category against
//! the previous and the new app context, and notifies only the keys whose
//! resolution actually differs.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::ExcludeList;
use crate::constants::GLOBAL_APP_ID;
use crate::engine::Resolver;
use crate::engine::ServiceContext;
use crate::model::DimensionSignature;
use crate::model::ValueMap;
use crate::subscription::CategoryUpdate;
use crate::subscription::Notification;
use crate::subscription::SubscriptionKind;
use crate::subscription::WaiterId;
use crate::Result;

/// Reconciliation phases. App switch walks Idle -> ForValue -> ForDesc ->
/// FinishTask; app removal walks Idle -> RemovePerApp -> FinishTask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReconcilePhase {
    Idle,
    ForValue,
    ForDesc,
    RemovePerApp,
    FinishTask,
}

#[derive(Debug)]
enum ReconcileTask {
    Switch { previous: String, current: String },
    Remove { app_id: String },
}

pub struct PerAppSwitchReconciler {
    ctx: Arc<ServiceContext>,
    resolver: Arc<Resolver>,
    exclude: ExcludeList,
}

impl PerAppSwitchReconciler {
    pub fn new(
        ctx: Arc<ServiceContext>,
        resolver: Arc<Resolver>,
        exclude: ExcludeList,
    ) -> Self {
        PerAppSwitchReconciler { ctx, resolver, exclude }
    }

    /// Reconcile a foreground-app change. Returns the number of
    /// notifications delivered across both diff phases.
    pub async fn reconcile_switch(
        &self,
        previous: &str,
        current: &str,
    ) -> Result<usize> {
        if previous == current {
            return Ok(0);
        }
        self.run(ReconcileTask::Switch {
            previous: previous.to_string(),
            current: current.to_string(),
        })
        .await
    }

    /// Clean up after an app uninstall. Persisted per-app records are
    /// deleted; this path sends no notifications itself.
    pub async fn reconcile_removal(
        &self,
        app_id: &str,
    ) -> Result<usize> {
        self.run(ReconcileTask::Remove {
            app_id: app_id.to_string(),
        })
        .await
    }

    async fn run(
        &self,
        task: ReconcileTask,
    ) -> Result<usize> {
        let mut phase = ReconcilePhase::Idle;
        let mut sent = 0usize;

        loop {
            trace!(?phase, ?task, "reconcile step");
            phase = match (phase, &task) {
                (ReconcilePhase::Idle, ReconcileTask::Switch { .. }) => ReconcilePhase::ForValue,
                (ReconcilePhase::Idle, ReconcileTask::Remove { .. }) => ReconcilePhase::RemovePerApp,

                (ReconcilePhase::ForValue, ReconcileTask::Switch { previous, current }) => {
                    sent += self.diff_values(previous, current).await;
                    ReconcilePhase::ForDesc
                }
                (ReconcilePhase::ForDesc, ReconcileTask::Switch { previous, current }) => {
                    sent += self.diff_descriptions(previous, current);
                    ReconcilePhase::FinishTask
                }
                (ReconcilePhase::RemovePerApp, ReconcileTask::Remove { app_id }) => {
                    let removed = self.ctx.query().remove_app_records(app_id.clone()).await?;
                    debug!(app_id, removed, "removed per-app records for uninstalled app");
                    ReconcilePhase::FinishTask
                }

                (ReconcilePhase::FinishTask, _) => {
                    debug!(?task, sent, "reconcile task finished");
                    return Ok(sent);
                }
                (phase, task) => {
                    warn!(?phase, ?task, "reconciler reached an inconsistent phase, aborting");
                    return Ok(sent);
                }
            };
        }
    }

    /// ForValue: per subscribed group, merge once against the previous app
    /// and once against the current one, then notify only the keys whose
    /// effective value differs.
    async fn diff_values(
        &self,
        previous: &str,
        current: &str,
    ) -> usize {
        let index = self.ctx.subscriptions();
        let mut sent = 0usize;

        for signature in index.signatures(SubscriptionKind::Value) {
            let dimension = signature.to_map();
            let mut per_waiter: BTreeMap<WaiterId, Vec<CategoryUpdate>> = BTreeMap::new();

            for ((category, app_id), keys) in index.lookup(&signature, SubscriptionKind::Value) {
                if !self.group_tracks_switch(&app_id, previous, current) {
                    continue;
                }

                let before = match self
                    .resolver
                    .effective_map(&category, previous, dimension.as_ref(), false)
                    .await
                {
                    Ok(map) => map,
                    Err(e) => {
                        warn!(category, previous, "switch re-merge failed: {:?}", e);
                        continue;
                    }
                };
                let after = match self
                    .resolver
                    .effective_map(&category, current, dimension.as_ref(), false)
                    .await
                {
                    Ok(map) => map,
                    Err(e) => {
                        warn!(category, current, "switch re-merge failed: {:?}", e);
                        continue;
                    }
                };

                let changed: BTreeSet<String> = keys
                    .into_iter()
                    .filter(|key| before.get(key) != after.get(key))
                    .collect();
                if changed.is_empty() {
                    continue;
                }

                for (waiter, subscribed) in
                    index.matched_waiters(&signature, SubscriptionKind::Value, &category, &app_id, &changed)
                {
                    let values: ValueMap = subscribed
                        .iter()
                        .filter_map(|key| after.get(key).map(|v| (key.clone(), v.clone())))
                        .collect();
                    per_waiter.entry(waiter).or_default().push(CategoryUpdate {
                        category: category.clone(),
                        app_id: app_id.clone(),
                        values,
                    });
                }
            }

            sent += self.deliver(&signature, SubscriptionKind::Value, per_waiter);
        }
        sent
    }

    /// ForDesc: analogous diff over cached key descriptions, comparing
    /// only the ui/values sub-fields.
    fn diff_descriptions(
        &self,
        previous: &str,
        current: &str,
    ) -> usize {
        let index = self.ctx.subscriptions();
        let schema = self.ctx.schema();
        let mut sent = 0usize;

        for signature in index.signatures(SubscriptionKind::Description) {
            let mut per_waiter: BTreeMap<WaiterId, Vec<CategoryUpdate>> = BTreeMap::new();

            for ((category, app_id), keys) in index.lookup(&signature, SubscriptionKind::Description) {
                if !self.group_tracks_switch(&app_id, previous, current) {
                    continue;
                }

                let mut changed = BTreeSet::new();
                let mut values = ValueMap::new();
                for key in keys {
                    let before = schema.describe_key(&key, previous);
                    let after = schema.describe_key(&key, current);
                    let same = match (&before, &after) {
                        (Some(b), Some(a)) => b.core_eq(a),
                        (None, None) => true,
                        _ => false,
                    };
                    if same {
                        continue;
                    }
                    values.insert(
                        key.clone(),
                        after
                            .as_ref()
                            .and_then(|d| serde_json::to_value(d).ok())
                            .unwrap_or(Value::Null),
                    );
                    changed.insert(key);
                }
                if changed.is_empty() {
                    continue;
                }

                for (waiter, subscribed) in
                    index.matched_waiters(&signature, SubscriptionKind::Description, &category, &app_id, &changed)
                {
                    let waiter_values: ValueMap = subscribed
                        .iter()
                        .filter_map(|key| values.get(key).map(|v| (key.clone(), v.clone())))
                        .collect();
                    per_waiter.entry(waiter).or_default().push(CategoryUpdate {
                        category: category.clone(),
                        app_id: app_id.clone(),
                        values: waiter_values,
                    });
                }
            }

            sent += self.deliver(&signature, SubscriptionKind::Description, per_waiter);
        }
        sent
    }

    /// A subscription group is affected by a switch when it follows the
    /// foreground app (GLOBAL) or is pinned to either side of the switch.
    fn group_tracks_switch(
        &self,
        app_id: &str,
        previous: &str,
        current: &str,
    ) -> bool {
        app_id == GLOBAL_APP_ID || app_id == previous || app_id == current
    }

    fn deliver(
        &self,
        signature: &DimensionSignature,
        kind: SubscriptionKind,
        per_waiter: BTreeMap<WaiterId, Vec<CategoryUpdate>>,
    ) -> usize {
        let index = self.ctx.subscriptions();
        let mut sent = 0usize;
        for (waiter, changes) in per_waiter {
            if let Some(sender) = index.sender_of(waiter) {
                if self.exclude.contains(&sender) {
                    trace!(%waiter, sender, "suppressing switch notification for excluded sender");
                    continue;
                }
            }
            if index.notify(
                waiter,
                Notification {
                    kind,
                    signature: signature.clone(),
                    changes,
                },
            ) {
                sent += 1;
            }
        }
        sent
    }
}
