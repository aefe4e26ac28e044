use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// Resolution and notification parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Active country code used for record country-match
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Device condition file, read once at startup
    #[serde(default = "default_condition_path")]
    pub condition_path: PathBuf,

    /// Key schema definition file
    #[serde(default = "default_schema_path")]
    pub schema_path: PathBuf,

    /// Notification exclude list (sender identities), loaded lazily
    #[serde(default = "default_exclude_list_path")]
    pub exclude_list_path: PathBuf,

    /// Directory for rolling log files
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Engine event channel capacity
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,

    /// Per-waiter notification channel capacity
    #[serde(default = "default_waiter_queue_capacity")]
    pub waiter_queue_capacity: usize,
}

fn default_country_code() -> String {
    "US".to_string()
}

fn default_condition_path() -> PathBuf {
    PathBuf::from("config/condition.json")
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("config/schema.json")
}

fn default_exclude_list_path() -> PathBuf {
    PathBuf::from("config/notification_exclude.json")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_event_queue_capacity() -> usize {
    1024
}

fn default_waiter_queue_capacity() -> usize {
    64
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            country_code: default_country_code(),
            condition_path: default_condition_path(),
            schema_path: default_schema_path(),
            exclude_list_path: default_exclude_list_path(),
            log_dir: default_log_dir(),
            event_queue_capacity: default_event_queue_capacity(),
            waiter_queue_capacity: default_waiter_queue_capacity(),
        }
    }
}
