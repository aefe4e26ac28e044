//! Events consumed by the engine event loop. Each request-shaped event
//! carries a oneshot reply sender; fire-and-forget events carry none.

use tokio::sync::oneshot;

use super::ResolveRequest;
use super::ResolveResponse;
use super::WriteRequest;
use crate::model::DimensionMap;
use crate::subscription::WaiterId;
use crate::Result;

#[derive(Debug)]
pub enum EngineEvent {
    Resolve(ResolveRequest, oneshot::Sender<Result<ResolveResponse>>),

    Write(WriteRequest, oneshot::Sender<Result<u64>>),

    /// Active application switched; reconcile per-app subscriptions
    AppSwitch {
        previous: String,
        current: String,
    },

    /// Application uninstalled; purge its persisted per-app records
    AppRemoved {
        app_id: String,
    },

    /// One or more dimension axes may have new values
    DimensionChanged {
        axes: Vec<String>,
        updates: Vec<(String, DimensionMap)>,
    },

    /// Active country code changed
    CountryChanged {
        country: String,
    },

    /// Waiter disconnected; drop all its subscriptions synchronously
    Disconnect {
        waiter: WaiterId,
        done: oneshot::Sender<()>,
    },
}
