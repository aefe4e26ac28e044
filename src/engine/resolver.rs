//! The read pipeline: cache fast path, record query, merge, volatile
//! overlay, partial-result assembly and subscription registration.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use super::ResolveRequest;
use super::ResolveResponse;
use super::ServiceContext;
use crate::constants::DIMENSION_AXIS_CATEGORY;
use crate::constants::GLOBAL_APP_ID;
use crate::merge::apply_volatile_overlay;
use crate::merge::MergeContext;
use crate::merge::RecordMerger;
use crate::model::DimensionMap;
use crate::model::DimensionSignature;
use crate::model::Record;
use crate::model::RecordKind;
use crate::model::ValueMap;
use crate::query::QuerySpec;
use crate::subscription::SubscriptionTuple;
use crate::subscription::WaiterHandle;
use crate::ResolveError;
use crate::Result;

pub struct Resolver {
    ctx: Arc<ServiceContext>,
    merger: RecordMerger,
}

impl Resolver {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        let merger = RecordMerger::new(ctx.schema().clone());
        Resolver { ctx, merger }
    }

    /// Serve one read request end to end.
    pub async fn resolve(
        &self,
        request: ResolveRequest,
    ) -> Result<ResolveResponse> {
        if request.category.is_empty() {
            return Err(ResolveError::MalformedRequest("empty category".to_string()).into());
        }
        if request.keys.is_empty() {
            return Err(ResolveError::MalformedRequest("no keys requested".to_string()).into());
        }
        if request.subscribe && request.waiter.is_none() {
            return Err(
                ResolveError::MalformedRequest("subscribe without waiter handle".to_string()).into(),
            );
        }

        let signature = DimensionSignature::from_opt(request.dimension.as_ref());

        // Fast path: a read-only request fully covered by the rendered
        // cache never touches the store.
        if request.read_only
            && !request.subscribe
            && self.ctx.cache().is_available(&request.category, &request.keys)
        {
            let mut values = ValueMap::new();
            for key in &request.keys {
                if let Some(value) = self.ctx.cache().get(&request.category, key) {
                    values.insert(key.clone(), value);
                }
            }
            debug!(category = %request.category, "resolve served from rendered cache");
            return Ok(ResolveResponse {
                values,
                error_keys: Vec::new(),
                from_cache: true,
            });
        }

        let merged = self
            .effective_map(&request.category, &request.app_id, request.dimension.as_ref(), request.filter_complex_types)
            .await?;

        let mut values = ValueMap::new();
        let mut error_keys = Vec::new();
        for key in &request.keys {
            match merged.get(key) {
                Some(value) => {
                    values.insert(key.clone(), value.clone());
                }
                None => error_keys.push(key.clone()),
            }
        }

        // NoMatch is a partial result unless the entire request came back
        // empty.
        if values.is_empty() {
            return Err(ResolveError::NoMatch {
                category: request.category.clone(),
            }
            .into());
        }

        // The rendered cache holds dimensionless GLOBAL views keyed by
        // (category, key); a per-app or dimension-qualified view must
        // never land in it.
        if request.dimension.is_none() && request.app_id == GLOBAL_APP_ID {
            for (key, value) in &values {
                if let Err(e) = self.ctx.cache().put(&request.category, key, value) {
                    warn!(category = %request.category, key, "cache put failed: {:?}", e);
                }
            }
        }

        if request.subscribe {
            // Validated above.
            if let Some(waiter) = &request.waiter {
                self.register_subscriptions(&request, &signature, waiter);
            }
        }

        Ok(ResolveResponse {
            values,
            error_keys,
            from_cache: false,
        })
    }

    /// Re-derive the effective value map for one (category, app,
    /// dimension) context. Shared by the request path and every dispatch
    /// re-merge.
    ///
    /// For a per-app requester the requested keys split in two: per-app
    /// keys resolve under the requester's own context, everything else
    /// resolves under the GLOBAL context. Plain keys thereby keep their
    /// global fallback for any requester, while the merge-level anti-leak
    /// rule still governs the per-app subset.
    pub(crate) async fn effective_map(
        &self,
        category: &str,
        app_id: &str,
        dimension: Option<&DimensionMap>,
        filter_complex_types: bool,
    ) -> Result<ValueMap> {
        let records = self.fetch_records(category).await?;
        let global_view =
            self.merge_view(&records, category, GLOBAL_APP_ID, dimension, filter_complex_types);
        if app_id == GLOBAL_APP_ID {
            return Ok(global_view);
        }

        let app_view = self.merge_view(&records, category, app_id, dimension, filter_complex_types);
        let keys: BTreeSet<String> = global_view.keys().chain(app_view.keys()).cloned().collect();
        let (global_keys, per_app_keys) =
            self.ctx.schema().split_global_per_app(category, &keys, app_id);

        let mut merged = ValueMap::new();
        for key in global_keys {
            if let Some(value) = global_view.get(&key) {
                merged.insert(key, value.clone());
            }
        }
        for key in per_app_keys {
            if let Some(value) = app_view.get(&key) {
                merged.insert(key, value.clone());
            }
        }
        Ok(merged)
    }

    /// One merge under one requester context: score, apply, overlay.
    fn merge_view(
        &self,
        records: &[Record],
        category: &str,
        app_id: &str,
        dimension: Option<&DimensionMap>,
        filter_complex_types: bool,
    ) -> ValueMap {
        let country = self.ctx.active_country();
        let merge_ctx = MergeContext {
            requesting_app_id: app_id,
            active_country: &country,
            filter_complex_types,
            dimension,
        };
        let mut merged = self.merger.merge(records, self.ctx.condition(), &merge_ctx);

        let signature = DimensionSignature::from_opt(dimension);
        apply_volatile_overlay(
            &mut merged,
            category,
            app_id,
            &signature,
            self.ctx.schema().as_ref(),
            self.ctx.volatile().as_ref(),
        );
        merged
    }

    /// Candidate records for one category across every storage kind, in
    /// store commit order per kind.
    async fn fetch_records(
        &self,
        category: &str,
    ) -> Result<Vec<Record>> {
        let specs: Vec<QuerySpec> = RecordKind::ALL
            .iter()
            .map(|kind| QuerySpec::from_kind(*kind).where_eq("category", category))
            .collect();
        let results = self.ctx.query().fetch_batch(specs).await?;
        Ok(results.into_iter().flatten().collect())
    }

    fn register_subscriptions(
        &self,
        request: &ResolveRequest,
        signature: &DimensionSignature,
        waiter: &WaiterHandle,
    ) {
        let index = self.ctx.subscriptions();
        for key in &request.keys {
            index.add(
                signature,
                SubscriptionTuple {
                    category: request.category.clone(),
                    key: key.clone(),
                    app_id: request.app_id.clone(),
                    kind: request.subscription_kind,
                },
                waiter,
            );

            // Axis bookkeeping: dimension changes must be able to find
            // waiters whose keys depend on the changed axis.
            for axis in self.ctx.schema().dependent_dimensions(key) {
                index.add(
                    signature,
                    SubscriptionTuple {
                        category: DIMENSION_AXIS_CATEGORY.to_string(),
                        key: axis,
                        app_id: request.app_id.clone(),
                        kind: request.subscription_kind,
                    },
                    waiter,
                );
            }
        }
        debug!(
            category = %request.category,
            waiter = %waiter.id,
            keys = request.keys.len(),
            "registered subscriptions"
        );
    }
}
