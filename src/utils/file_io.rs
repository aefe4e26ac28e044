use std::fs::create_dir_all;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

use crate::Result;
use crate::StorageError;

pub(crate) fn create_parent_dir_if_not_exist(path: &Path) -> Result<()> {
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.exists() {
            if let Err(e) = create_dir_all(parent_dir) {
                error!("Failed to create directory {:?}: {:?}", parent_dir, e);
                return Err(StorageError::IoError(e).into());
            }
        }
    }
    Ok(())
}

/// Open a log file for appending, creating parent directories as needed.
pub fn open_file_for_append(path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    create_parent_dir_if_not_exist(path)?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| StorageError::PathError {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(file)
}

/// Read and deserialize a JSON file.
pub(crate) fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|source| StorageError::PathError {
        path: path.to_path_buf(),
        source,
    })?;
    let value = serde_json::from_reader(BufReader::new(file)).map_err(StorageError::JsonError)?;
    Ok(value)
}

/// Serialize and write a JSON file, creating parent directories as needed.
/// The write is not atomic; callers own any freshness checks.
pub(crate) fn write_json_file<T: Serialize>(
    path: &Path,
    value: &T,
) -> Result<()> {
    create_parent_dir_if_not_exist(path)?;
    let file = File::create(path).map_err(|source| StorageError::PathError {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer(BufWriter::new(file), value).map_err(StorageError::JsonError)?;
    Ok(())
}
