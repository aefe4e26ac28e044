//! Key-schema collaborator boundary.
//!
//! Stands in for the platform's key/dimension metadata store: key type
//! classification, category membership, dependent dimension axes and key
//! descriptions. The engine consumes this interface; the depth of the
//! metadata store itself is out of scope.

mod static_schema;

pub use static_schema::*;


use std::collections::BTreeSet;

#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::model::DimensionMap;

/// Storage-type classification of a setting key.
///
/// Mixed and Exception keys are dual-scoped: they may surface through the
/// global fallback into per-app resolutions, and are dropped from bare
/// global answers when complex-type filtering is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyDbType {
    #[default]
    Normal,
    Mixed,
    Exception,
}

impl KeyDbType {
    /// Whether the key type is only valid in a per-app resolution context.
    pub fn is_complex(&self) -> bool {
        matches!(self, KeyDbType::Mixed | KeyDbType::Exception)
    }
}

/// Cached description metadata for a key. Reconciliation compares only the
/// `ui` and `values` sub-fields, never the whole object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyDescription {
    #[serde(default)]
    pub ui: Value,
    #[serde(default)]
    pub values: Value,
    #[serde(default)]
    pub extra: Value,
}

impl KeyDescription {
    /// Equality over the sub-fields that matter for change notification.
    pub fn core_eq(
        &self,
        other: &KeyDescription,
    ) -> bool {
        self.ui == other.ui && self.values == other.values
    }
}

/// Key/dimension metadata collaborator.
#[cfg_attr(test, automock)]
pub trait KeySchema: Send + Sync + 'static {
    /// Storage-type classification for `key`.
    fn db_type(
        &self,
        key: &str,
    ) -> KeyDbType;

    /// Every key declared under `category`.
    fn keys_in_category(
        &self,
        category: &str,
    ) -> BTreeSet<String>;

    /// Dimension axes a key's value depends on.
    fn dependent_dimensions(
        &self,
        key: &str,
    ) -> BTreeSet<String>;

    /// Split `keys` into (global, per-app) visibility for `app_id`.
    fn split_global_per_app(
        &self,
        category: &str,
        keys: &BTreeSet<String>,
        app_id: &str,
    ) -> (BTreeSet<String>, BTreeSet<String>);

    /// Current value object for a dimension axis, if the axis is known.
    fn dimension_values(
        &self,
        axis: &str,
    ) -> Option<DimensionMap>;

    /// Replace the current value object for a dimension axis.
    fn update_dimension_values(
        &self,
        axis: &str,
        values: DimensionMap,
    );

    /// Whether the key accepts volatile overlay values.
    fn is_volatile(
        &self,
        key: &str,
    ) -> bool;

    /// Description metadata for a key as seen by `app_id`.
    fn describe_key(
        &self,
        key: &str,
        app_id: &str,
    ) -> Option<KeyDescription>;
}
