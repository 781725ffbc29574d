//! Persisted form of the task index.
//!
//! The snapshot is one JSON document: `{ "version", "lastUpdated", "tasks" }`.
//! A snapshot with any other version is treated as absent and the index is
//! rebuilt from the documents.

use crate::error::{IndexError, IndexResult};
use crate::store::{DocumentStore, parent_folder};
use crate::types::TaskRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot format version written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSnapshot {
    pub version: u32,
    pub last_updated: DateTime<Utc>,
    pub tasks: Vec<TaskRecord>,
}

impl IndexSnapshot {
    /// Snapshot of `tasks`, stamped now.
    pub fn new(tasks: Vec<TaskRecord>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            last_updated: Utc::now(),
            tasks,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn is_current(&self) -> bool {
        self.version == SNAPSHOT_VERSION
    }
}

/// Read and validate the snapshot at `path`.
pub async fn load(store: &dyn DocumentStore, path: &str) -> IndexResult<IndexSnapshot> {
    let json = store.read(path).await?;
    let snapshot = IndexSnapshot::from_json(&json).map_err(IndexError::snapshot)?;
    if !snapshot.is_current() {
        return Err(IndexError::Snapshot(format!(
            "unsupported snapshot version {} (expected {})",
            snapshot.version, SNAPSHOT_VERSION
        )));
    }
    Ok(snapshot)
}

/// Write `snapshot` to `path`, creating its folder first.
pub async fn save(store: &dyn DocumentStore, path: &str, snapshot: &IndexSnapshot) -> IndexResult<()> {
    let json = snapshot.to_json_pretty().map_err(IndexError::snapshot)?;
    if let Some(folder) = parent_folder(path) {
        store.create_folder(folder).await?;
    }
    store.write(path, &json).await?;
    Ok(())
}
