use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::debug;
use tracing::warn;

use crate::utils::read_json_file;

/// Sender names that app-switch reconciliation must not notify. Loaded
/// lazily from a JSON string array; a missing or unreadable file behaves
/// as an empty list and is warned about once.
pub struct ExcludeList {
    path: PathBuf,
    entries: ArcSwapOption<Vec<String>>,
}

impl ExcludeList {
    pub fn new(path: impl AsRef<Path>) -> Self {
        ExcludeList {
            path: path.as_ref().to_path_buf(),
            entries: ArcSwapOption::const_empty(),
        }
    }

    /// Exact match against the configured sender names.
    pub fn contains(
        &self,
        sender_name: &str,
    ) -> bool {
        if self.entries.load().is_none() {
            self.load();
        }
        self.entries
            .load()
            .as_ref()
            .map(|names| names.iter().any(|n| n == sender_name))
            .unwrap_or(false)
    }

    fn load(&self) {
        let entries = match read_json_file::<Vec<String>>(&self.path) {
            Ok(names) => {
                debug!(path = %self.path.display(), count = names.len(), "loaded notification exclude list");
                names
            }
            Err(e) => {
                warn!(path = %self.path.display(), "exclude list unavailable, treating as empty: {:?}", e);
                Vec::new()
            }
        };
        self.entries.store(Some(Arc::new(entries)));
    }
}
