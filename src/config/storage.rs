use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// Record store and rendered-cache locations.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Embedded record database directory
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Rendered category cache directory
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/records")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/cache")
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            db_path: default_db_path(),
            cache_dir: default_cache_dir(),
        }
    }
}
