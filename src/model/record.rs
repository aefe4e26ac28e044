//! Stored settings records and their source classification.
//!
//! A [`Record`] is one stored settings entry: a value map scoped by
//! category, app, country and hardware condition, tagged with the storage
//! [`RecordKind`] it came from. Records are immutable once merged; a write
//! produces a new record version layered on top of older ones.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::QueryError;

/// Resolved key/value view. BTreeMap keeps key order stable so repeated
/// merges of the same inputs serialize byte-identically.
pub type ValueMap = BTreeMap<String, Value>;

/// Condition predicate mapping (property -> expected value).
pub type ConditionMap = BTreeMap<String, Value>;

/// Storage class/source of a record, in ascending override strength for the
/// default tiers and descending for the main tiers. The numeric tier used
/// during merge lives in [`RecordKind::tier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Persisted system/main overrides
    Main,
    /// Runtime values persisted on the main path but owned by the volatile
    /// overlay collaborator
    MainVolatile,
    /// Shipped defaults
    Default,
    /// Country-variant defaults
    DefaultCountryVariant,
}

impl RecordKind {
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Main,
        RecordKind::MainVolatile,
        RecordKind::Default,
        RecordKind::DefaultCountryVariant,
    ];

    /// Source-kind tier for merge ordering: Main > MainVolatile > Default.
    /// Country-variant defaults share the default tier; the country tier of
    /// the composite score separates them.
    pub(crate) fn tier(&self) -> u8 {
        match self {
            RecordKind::Main => 3,
            RecordKind::MainVolatile => 2,
            RecordKind::Default => 1,
            RecordKind::DefaultCountryVariant => 1,
        }
    }

    /// Whether this kind belongs to the system/main storage class.
    pub(crate) fn is_system(&self) -> bool {
        matches!(self, RecordKind::Main | RecordKind::MainVolatile)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Main => "main",
            RecordKind::MainVolatile => "main_volatile",
            RecordKind::Default => "default",
            RecordKind::DefaultCountryVariant => "default_country_variant",
        }
    }
}

impl std::str::FromStr for RecordKind {
    type Err = QueryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "main" => Ok(RecordKind::Main),
            "main_volatile" => Ok(RecordKind::MainVolatile),
            "default" => Ok(RecordKind::Default),
            "default_country_variant" => Ok(RecordKind::DefaultCountryVariant),
            other => Err(QueryError::UnknownKind(other.to_string())),
        }
    }
}

/// One stored settings entry.
///
/// Invariant: `value` is never absent for a stored record, though it may be
/// empty. Merging never mutates records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub kind: RecordKind,

    /// Owning app id; [`crate::constants::GLOBAL_APP_ID`] means "applies to all apps"
    pub app_id: String,

    pub category: String,

    /// Optional country scoping. May encode multiple alternatives joined by
    /// [`crate::constants::COUNTRY_DELIMITER`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Optional hardware/environment predicate mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionMap>,

    /// Setting-key to value mapping; keys unique
    pub value: ValueMap,
}

impl Record {
    /// Whether the record's country scoping admits `active_country`.
    /// A record without a country field always matches (no variation).
    pub(crate) fn matches_country(
        &self,
        active_country: &str,
    ) -> bool {
        match &self.country {
            None => true,
            Some(spec) => spec
                .split(crate::constants::COUNTRY_DELIMITER)
                .any(|c| c.trim() == active_country),
        }
    }

    /// Country tier for merge ordering: a matching explicit country scope
    /// outranks no scope at all. Records that fail the country match are
    /// rejected before tiering.
    pub(crate) fn country_tier(&self) -> u8 {
        match &self.country {
            None => 1,
            Some(_) => 2,
        }
    }
}
