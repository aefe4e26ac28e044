//! Dimension axes and their canonical signatures.
//!
//! A dimension qualifies a category into sub-variants (e.g. input source,
//! resolution). Two conceptually-equal dimension mappings must canonicalize
//! to the same signature, so the mapping is kept in a BTreeMap and
//! stringified with stable key ordering.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::constants::EMPTY_DIMENSION_SIGNATURE;

/// A specific combination of dimension-axis values supplied with a request.
pub type DimensionMap = BTreeMap<String, Value>;

/// Canonical string form of a [`DimensionMap`], used as an index key.
/// The empty string is the sentinel for "no dimension specified".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DimensionSignature(String);

impl DimensionSignature {
    /// Signature for requests without a dimension object.
    pub fn none() -> Self {
        DimensionSignature(EMPTY_DIMENSION_SIGNATURE.to_string())
    }

    /// Canonicalize a dimension mapping. BTreeMap serialization is ordered
    /// by key, so equal mappings always produce equal signatures.
    pub fn from_map(map: &DimensionMap) -> Self {
        if map.is_empty() {
            return Self::none();
        }
        // Serializing a BTreeMap<String, Value> cannot fail.
        let canon = serde_json::to_string(map).unwrap_or_default();
        DimensionSignature(canon)
    }

    pub fn from_opt(map: Option<&DimensionMap>) -> Self {
        match map {
            Some(m) => Self::from_map(m),
            None => Self::none(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the dimension mapping this signature canonicalizes.
    /// Returns `None` for the empty sentinel.
    pub fn to_map(&self) -> Option<DimensionMap> {
        if self.is_none() {
            return None;
        }
        serde_json::from_str(&self.0).ok()
    }
}

impl fmt::Display for DimensionSignature {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.is_none() {
            write!(f, "<none>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Canonical byte form of a dimension value object, used by the
/// dimension-change short-circuit to decide whether anything changed.
pub(crate) fn canonical_dimension_bytes(map: &DimensionMap) -> String {
    serde_json::to_string(map).unwrap_or_default()
}
