//! Request and response payloads handled by the engine event loop.

use serde::Deserialize;
use serde::Serialize;

use crate::model::ConditionMap;
use crate::model::DimensionMap;
use crate::model::RecordKind;
use crate::model::ValueMap;
use crate::subscription::SubscriptionKind;
use crate::subscription::WaiterHandle;

/// One read request for a set of keys in a category.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub category: String,
    pub keys: Vec<String>,
    pub app_id: String,

    /// Dimension object qualifying the category, if any
    pub dimension: Option<DimensionMap>,

    /// Drop mixed/exception keys from a bare global answer
    pub filter_complex_types: bool,

    /// Read-only requests may be served entirely from the rendered cache
    pub read_only: bool,

    /// Register change subscriptions for the requested keys
    pub subscribe: bool,
    pub subscription_kind: SubscriptionKind,

    /// Reply channel registered when `subscribe` is set
    pub waiter: Option<WaiterHandle>,
}

impl ResolveRequest {
    pub fn read(
        category: impl Into<String>,
        keys: Vec<String>,
        app_id: impl Into<String>,
    ) -> Self {
        ResolveRequest {
            category: category.into(),
            keys,
            app_id: app_id.into(),
            dimension: None,
            filter_complex_types: false,
            read_only: false,
            subscribe: false,
            subscription_kind: SubscriptionKind::Value,
            waiter: None,
        }
    }
}

/// Partial-result reply: matched keys and the distinct list of keys no
/// record supplied. The whole operation fails only when nothing matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub values: ValueMap,

    /// Requested keys absent from every record
    pub error_keys: Vec<String>,

    /// True when the reply was served from the rendered cache
    #[serde(default)]
    pub from_cache: bool,
}

/// One write: a new record version layered on top of older ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteRequest {
    pub kind: RecordKind,
    pub app_id: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionMap>,
    pub values: ValueMap,
}
