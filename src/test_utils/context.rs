//! Full-context fixtures: an in-memory record store and a wired-up
//! [`ServiceContext`] for resolver/dispatch tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::config::Settings;
use crate::engine::ServiceContext;
use crate::merge::InMemoryVolatileStore;
use crate::model::Condition;
use crate::model::ConditionMap;
use crate::model::Record;
use crate::query::QueryEngine;
use crate::query::QuerySpec;
use crate::query::RenderedCache;
use crate::subscription::SubscriptionIndex;
use crate::Result;

/// Record store backed by a plain vector, preserving insertion order as
/// commit order.
#[derive(Default)]
pub struct InMemoryQueryEngine {
    records: RwLock<Vec<Record>>,
}

impl InMemoryQueryEngine {
    pub fn with_records(records: Vec<Record>) -> Self {
        InMemoryQueryEngine {
            records: RwLock::new(records),
        }
    }

    pub fn push(
        &self,
        record: Record,
    ) {
        self.records.write().push(record);
    }
}

#[async_trait]
impl QueryEngine for InMemoryQueryEngine {
    async fn fetch(
        &self,
        spec: QuerySpec,
    ) -> Result<Vec<Record>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.kind == spec.from && spec.matches(r))
            .cloned()
            .map(|r| spec.project(r))
            .collect())
    }

    async fn fetch_batch(
        &self,
        specs: Vec<QuerySpec>,
    ) -> Result<Vec<Vec<Record>>> {
        let mut out = Vec::with_capacity(specs.len());
        for spec in specs {
            out.push(self.fetch(spec).await?);
        }
        Ok(out)
    }

    async fn store(
        &self,
        record: Record,
    ) -> Result<u64> {
        let mut records = self.records.write();
        records.push(record);
        Ok(records.len() as u64)
    }

    async fn remove_app_records(
        &self,
        app_id: String,
    ) -> Result<u64> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.app_id != app_id);
        Ok((before - records.len()) as u64)
    }
}

/// Cache collaborator that never hits.
pub struct NullCache;

impl RenderedCache for NullCache {
    fn is_available(
        &self,
        _category: &str,
        _keys: &[String],
    ) -> bool {
        false
    }

    fn get(
        &self,
        _category: &str,
        _key: &str,
    ) -> Option<Value> {
        None
    }

    fn put(
        &self,
        _category: &str,
        _key: &str,
        _value: &Value,
    ) -> Result<()> {
        Ok(())
    }

    fn invalidate(
        &self,
        _category: &str,
    ) -> Result<()> {
        Ok(())
    }

    fn invalidate_all(&self) -> Result<()> {
        Ok(())
    }
}

/// A context over the fixture schema, an in-memory store seeded with
/// `records`, and an empty active condition.
pub fn fixture_context(records: Vec<Record>) -> Arc<ServiceContext> {
    fixture_context_with_condition(records, ConditionMap::new())
}

pub fn fixture_context_with_condition(
    records: Vec<Record>,
    condition: ConditionMap,
) -> Arc<ServiceContext> {
    Arc::new(ServiceContext::new(
        Arc::new(Settings::default()),
        Arc::new(Condition::new(condition)),
        Arc::new(super::schema::fixture()),
        Arc::new(InMemoryQueryEngine::with_records(records)),
        Arc::new(InMemoryVolatileStore::new()),
        Arc::new(NullCache),
        Arc::new(SubscriptionIndex::new()),
    ))
}
