//! Query collaborator contract.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::QuerySpec;
use crate::model::Record;
use crate::Result;

/// Request/response interface to the backing record store.
///
/// Every call is a suspension point: control returns to the event loop and
/// resumes via the future, never assuming synchronous completion. Failures
/// are never retried here; retry policy belongs to the transport
/// collaborator.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QueryEngine: Send + Sync + 'static {
    /// Fetch records matching one structured query, in store commit order.
    async fn fetch(
        &self,
        spec: QuerySpec,
    ) -> Result<Vec<Record>>;

    /// Batch form: one result set per query, preserving input order.
    async fn fetch_batch(
        &self,
        specs: Vec<QuerySpec>,
    ) -> Result<Vec<Vec<Record>>>;

    /// Persist a new record version layered on top of older ones.
    /// Returns the assigned commit sequence.
    async fn store(
        &self,
        record: Record,
    ) -> Result<u64>;

    /// Delete every persisted per-app record owned by `app_id`.
    /// Returns the number of removed records.
    async fn remove_app_records(
        &self,
        app_id: String,
    ) -> Result<u64>;
}
