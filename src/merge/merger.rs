//! The priority-scored merge algorithm.
//!
//! Takes a flat list of raw records plus the resolution context and
//! produces one effective value map. Per-record failures (foreign app,
//! unmatched condition, unmatched country) skip the record and continue;
//! only whole-request failures propagate to the request boundary.

use std::sync::Arc;

use tracing::trace;
use tracing::warn;

use super::score::OwnershipTier;
use super::score::PriorityScore;
use crate::constants::DEFAULT_APP_ID;
use crate::constants::GLOBAL_APP_ID;
use crate::constants::LEGACY_SEQUENCE_LIMIT;
use crate::constants::NOT_MATCH_SCORE;
use crate::model::Condition;
use crate::model::DimensionMap;
use crate::model::Record;
use crate::model::ValueMap;
use crate::schema::KeySchema;

/// Resolution context for one merge call.
#[derive(Debug, Clone, Copy)]
pub struct MergeContext<'a> {
    pub requesting_app_id: &'a str,
    pub active_country: &'a str,

    /// Drop mixed/exception keys from the final map of a global resolution
    pub filter_complex_types: bool,

    /// Dimension object supplied with the request, if any
    pub dimension: Option<&'a DimensionMap>,
}

pub struct RecordMerger {
    schema: Arc<dyn KeySchema>,
}

impl RecordMerger {
    pub fn new(schema: Arc<dyn KeySchema>) -> Self {
        RecordMerger { schema }
    }

    /// Merge `records` into one effective value map for `ctx`.
    ///
    /// Every accepted record gets a composite [`PriorityScore`]; records
    /// are applied in ascending score order so higher-scored records
    /// overwrite lower-scored ones per key. An empty map is a valid result
    /// when no record contributes.
    pub fn merge(
        &self,
        records: &[Record],
        condition: &Condition,
        ctx: &MergeContext<'_>,
    ) -> ValueMap {
        if records.len() > LEGACY_SEQUENCE_LIMIT {
            // Consistency anomaly: the legacy packed score would have
            // exhausted its sequence bits here. Ordering stays exact with
            // the explicit struct; log and continue.
            warn!(
                record_count = records.len(),
                "record count exceeds legacy sequence width"
            );
        }

        let mut scored: Vec<(PriorityScore, ValueMap)> = Vec::with_capacity(records.len());

        for (sequence, record) in records.iter().enumerate() {
            let ownership = if record.app_id == ctx.requesting_app_id {
                OwnershipTier::Requester
            } else if record.app_id == DEFAULT_APP_ID {
                OwnershipTier::DefaultApp
            } else if record.app_id == GLOBAL_APP_ID {
                OwnershipTier::Global
            } else {
                trace!(app_id = %record.app_id, "record rejected: foreign app id");
                continue;
            };

            let condition_score = condition.score(record);
            if condition_score == NOT_MATCH_SCORE {
                trace!(category = %record.category, "record rejected: condition mismatch");
                continue;
            }

            if !record.matches_country(ctx.active_country) {
                trace!(
                    category = %record.category,
                    country = ?record.country,
                    "record rejected: country mismatch"
                );
                continue;
            }

            let surviving = self.surviving_values(record, ctx);
            if surviving.is_empty() {
                continue;
            }

            let score = PriorityScore {
                app_scope: PriorityScore::app_scope_tier(record.kind.is_system(), ownership),
                ownership,
                condition: condition_score,
                kind: record.kind.tier(),
                country: record.country_tier(),
                sequence,
            };
            scored.push((score, surviving));
        }

        scored.sort_by(|a, b| a.0.cmp(&b.0));

        let mut merged = ValueMap::new();
        for (_, values) in scored {
            merged.extend(values);
        }

        // Second filtering stage, deliberately separate from the per-app
        // admission stage above: a bare global answer never carries
        // mixed/exception keys.
        if ctx.filter_complex_types && ctx.requesting_app_id == GLOBAL_APP_ID {
            merged.retain(|key, _| !self.schema.db_type(key).is_complex());
        }

        merged
    }

    /// Value-map subset of `record` admitted into the merge for `ctx`.
    fn surviving_values(
        &self,
        record: &Record,
        ctx: &MergeContext<'_>,
    ) -> ValueMap {
        let requester_is_global = ctx.requesting_app_id == GLOBAL_APP_ID;

        // Per-app requests must not leak pure-global values through the
        // global fallback path; only dual-scoped key types survive.
        if !requester_is_global && record.app_id == GLOBAL_APP_ID {
            return record
                .value
                .iter()
                .filter(|(key, _)| self.schema.db_type(key).is_complex())
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
        }

        // Cross-app records (the reserved default app) additionally pass
        // the per-app key filter.
        if !requester_is_global
            && record.app_id != GLOBAL_APP_ID
            && record.app_id != ctx.requesting_app_id
        {
            return record
                .value
                .iter()
                .filter(|(key, _)| self.per_app_key_passes(key, ctx.dimension))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
        }

        record.value.clone()
    }

    /// PerAppKeyFilter: a key whose declared dependent-dimension axis is
    /// not present as a field in the supplied dimension object is excluded.
    /// With no dimension object supplied, every key passes.
    fn per_app_key_passes(
        &self,
        key: &str,
        dimension: Option<&DimensionMap>,
    ) -> bool {
        let Some(dimension) = dimension else {
            return true;
        };
        self.schema
            .dependent_dimensions(key)
            .iter()
            .all(|axis| dimension.contains_key(axis))
    }
}
