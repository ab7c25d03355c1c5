//! Persistence operations for the InMemory backend
//!
//! This module handles serialization and file I/O for saving/loading
//! the in-memory state to/from JSON files.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use super::{InMemory, storage};
use crate::{Error, Result, backend::errors::BackendError, model::Dataset};

/// The current persistence file format version.
/// v0 indicates this is an unstable format subject to breaking changes.
const PERSISTENCE_VERSION: u8 = 0;

/// Helper to check if version is default (0) for serde skip_serializing_if
fn is_v0(v: &u8) -> bool {
    *v == 0
}

/// Validates the persistence version during deserialization.
fn validate_persistence_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != PERSISTENCE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported persistence version {version}; only version {PERSISTENCE_VERSION} is supported"
        )));
    }
    Ok(version)
}

/// On-disk layout: a versioned [`Dataset`].
#[derive(Serialize, Deserialize)]
struct PersistedState {
    /// File format version for compatibility checking
    #[serde(
        rename = "_v",
        default,
        skip_serializing_if = "is_v0",
        deserialize_with = "validate_persistence_version"
    )]
    version: u8,
    #[serde(flatten)]
    dataset: Dataset,
}

/// Saves every record to a JSON file.
pub(crate) async fn save_to_file<P: AsRef<Path>>(backend: &InMemory, path: P) -> Result<()> {
    let dataset = storage::export(&*backend.tables.read().await);
    let state = PersistedState {
        version: PERSISTENCE_VERSION,
        dataset,
    };

    let json = serde_json::to_string_pretty(&state)
        .map_err(|e| -> Error { BackendError::SerializationFailed { source: e }.into() })?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| -> Error { BackendError::FileIo { source: e }.into() })
}

/// Loads records from a JSON file.
///
/// If the file does not exist, a new, empty `InMemory` backend is returned.
pub(crate) async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<InMemory> {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => {
            let state: PersistedState = serde_json::from_str(&json).map_err(|e| -> Error {
                BackendError::DeserializationFailed { source: e }.into()
            })?;
            InMemory::from_dataset(state.dataset).await
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(InMemory::new()),
        Err(e) => Err(BackendError::FileIo { source: e }.into()),
    }
}
