//! Configuration management for the settings service.
//!
//! Hierarchical loading with priority:
//! 1. Hardcoded defaults
//! 2. Main config file (optional)
//! 3. Explicit config path passed by the caller
//! 4. Environment variables (highest priority)

mod service;
mod storage;

pub use service::*;
pub use storage::*;


//---
use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Resolution and notification behavior
    #[serde(default)]
    pub service: ServiceConfig,

    /// Record store and rendered-cache locations
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Settings {
    /// Load configuration from multiple sources with priority:
    /// 1. Base config file (`config/settingsd`, optional)
    /// 2. Caller-provided config path
    /// 3. Environment variables (`SETTINGSD__` prefix, highest priority)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Config::builder();

        config = config.add_source(File::with_name("config/settingsd").required(false));

        if let Some(custom) = config_path {
            config = config.add_source(File::with_name(custom).required(true));
        }

        config = config.add_source(
            Environment::with_prefix("SETTINGSD")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings = config.build()?.try_deserialize()?;
        Ok(settings)
    }
}
