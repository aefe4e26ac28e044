//! Rendered-result file cache collaborator.
//!
//! A fast-path short-circuit for read-only requests: if a valid cache
//! entry exists for every requested key, the store is not queried at all.

use std::path::PathBuf;

#[cfg(test)]
use mockall::automock;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::constants::CACHE_FILE_SUFFIX;
use crate::model::ValueMap;
use crate::Result;
use crate::StorageError;

/// Get/put cache of resolved views keyed by (category, key).
#[cfg_attr(test, automock)]
pub trait RenderedCache: Send + Sync + 'static {
    /// Whether a valid entry exists for every one of `keys`.
    fn is_available(
        &self,
        category: &str,
        keys: &[String],
    ) -> bool;

    fn get(
        &self,
        category: &str,
        key: &str,
    ) -> Option<Value>;

    fn put(
        &self,
        category: &str,
        key: &str,
        value: &Value,
    ) -> Result<()>;

    /// Drop every entry of `category`, called after a write changed its
    /// records.
    fn invalidate(
        &self,
        category: &str,
    ) -> Result<()>;

    /// Drop every entry, called after a change that touches every
    /// category (a country change).
    fn invalidate_all(&self) -> Result<()>;
}

/// Directory-backed [`RenderedCache`]: one JSON file per category.
/// Writes are serialized by a lock; reads go to disk every time, keeping
/// the cache a dumb collaborator with no staleness logic of its own.
pub struct DirCache {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl DirCache {
    pub fn new(dir: PathBuf) -> Self {
        DirCache {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    fn category_path(
        &self,
        category: &str,
    ) -> PathBuf {
        self.dir.join(format!("{category}{CACHE_FILE_SUFFIX}"))
    }

    fn read_category(
        &self,
        category: &str,
    ) -> Option<ValueMap> {
        let path = self.category_path(category);
        if !path.exists() {
            return None;
        }
        match crate::utils::read_json_file::<ValueMap>(&path) {
            Ok(map) => Some(map),
            Err(e) => {
                warn!(category, "unreadable cache file, treating as miss: {:?}", e);
                None
            }
        }
    }
}

impl RenderedCache for DirCache {
    fn is_available(
        &self,
        category: &str,
        keys: &[String],
    ) -> bool {
        match self.read_category(category) {
            Some(map) => keys.iter().all(|key| map.contains_key(key)),
            None => false,
        }
    }

    fn get(
        &self,
        category: &str,
        key: &str,
    ) -> Option<Value> {
        self.read_category(category)?.remove(key)
    }

    fn put(
        &self,
        category: &str,
        key: &str,
        value: &Value,
    ) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut map = self.read_category(category).unwrap_or_default();
        map.insert(key.to_string(), value.clone());
        crate::utils::write_json_file(&self.category_path(category), &map)
            .map_err(|e| crate::Error::from(StorageError::Cache(format!("cache put failed: {e}"))))?;
        debug!(category, key, "cached rendered value");
        Ok(())
    }

    fn invalidate(
        &self,
        category: &str,
    ) -> Result<()> {
        let _guard = self.write_lock.lock();
        let path = self.category_path(category);
        if !path.exists() {
            return Ok(());
        }
        std::fs::remove_file(&path)
            .map_err(|e| crate::Error::from(StorageError::Cache(format!("cache invalidate failed: {e}"))))?;
        debug!(category, "invalidated rendered cache");
        Ok(())
    }

    fn invalidate_all(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        if !self.dir.exists() {
            return Ok(());
        }
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(CACHE_FILE_SUFFIX))
            {
                std::fs::remove_file(&path).map_err(|e| {
                    crate::Error::from(StorageError::Cache(format!("cache invalidate failed: {e}")))
                })?;
            }
        }
        debug!("invalidated all rendered cache entries");
        Ok(())
    }
}
