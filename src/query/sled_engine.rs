//! Sled-backed reference implementation of the query collaborator.
//!
//! One tree per record kind; rows are JSON-encoded records keyed by a
//! monotonic commit sequence, so scans return records in commit order.

use std::path::Path;

use async_trait::async_trait;
use sled::Tree;
use tracing::debug;
use tracing::info;

use super::QueryEngine;
use super::QuerySpec;
use crate::constants::TREE_DEFAULT;
use crate::constants::TREE_DEFAULT_COUNTRY;
use crate::constants::TREE_MAIN;
use crate::constants::TREE_MAIN_VOLATILE;
use crate::model::Record;
use crate::model::RecordKind;
use crate::QueryError;
use crate::Result;
use crate::StorageError;

pub struct SledQueryEngine {
    db: sled::Db,
    main: Tree,
    main_volatile: Tree,
    default: Tree,
    default_country: Tree,
}

impl SledQueryEngine {
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path)?;
        let engine = SledQueryEngine {
            main: db.open_tree(TREE_MAIN)?,
            main_volatile: db.open_tree(TREE_MAIN_VOLATILE)?,
            default: db.open_tree(TREE_DEFAULT)?,
            default_country: db.open_tree(TREE_DEFAULT_COUNTRY)?,
            db,
        };
        info!("opened record store at {:?}", path);
        Ok(engine)
    }

    fn tree_for(
        &self,
        kind: RecordKind,
    ) -> &Tree {
        match kind {
            RecordKind::Main => &self.main,
            RecordKind::MainVolatile => &self.main_volatile,
            RecordKind::Default => &self.default,
            RecordKind::DefaultCountryVariant => &self.default_country,
        }
    }

    fn scan(
        &self,
        spec: &QuerySpec,
    ) -> Result<Vec<Record>> {
        let tree = self.tree_for(spec.from);
        let mut records = Vec::new();
        // Keys are big-endian sequence numbers; iteration order is commit
        // order.
        for row in tree.iter() {
            let (_, raw) = row?;
            let record: Record = serde_json::from_slice(&raw)
                .map_err(|e| QueryError::BadShape(format!("undecodable record row: {e}")))?;
            if spec.matches(&record) {
                records.push(spec.project(record));
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl QueryEngine for SledQueryEngine {
    async fn fetch(
        &self,
        spec: QuerySpec,
    ) -> Result<Vec<Record>> {
        self.scan(&spec)
    }

    async fn fetch_batch(
        &self,
        specs: Vec<QuerySpec>,
    ) -> Result<Vec<Vec<Record>>> {
        let mut results = Vec::with_capacity(specs.len());
        for spec in &specs {
            results.push(self.scan(spec)?);
        }
        Ok(results)
    }

    async fn store(
        &self,
        record: Record,
    ) -> Result<u64> {
        let sequence = self.db.generate_id()?;
        let raw = serde_json::to_vec(&record).map_err(StorageError::JsonError)?;
        self.tree_for(record.kind).insert(sequence.to_be_bytes(), raw)?;
        debug!(
            category = %record.category,
            app_id = %record.app_id,
            kind = record.kind.as_str(),
            sequence,
            "stored record version"
        );
        Ok(sequence)
    }

    async fn remove_app_records(
        &self,
        app_id: String,
    ) -> Result<u64> {
        let mut removed = 0u64;
        for kind in RecordKind::ALL {
            let tree = self.tree_for(kind);
            let mut doomed = Vec::new();
            for row in tree.iter() {
                let (key, raw) = row?;
                let record: Record = serde_json::from_slice(&raw)
                    .map_err(|e| QueryError::BadShape(format!("undecodable record row: {e}")))?;
                if record.app_id == app_id {
                    doomed.push(key);
                }
            }
            for key in doomed {
                tree.remove(key)?;
                removed += 1;
            }
        }
        info!(app_id = %app_id, removed, "removed per-app records");
        Ok(removed)
    }
}
