use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::store::write_atomic;

pub const HISTORY_CAP: usize = 500;

/// Immutable record of one mapping's outcome within one backup cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub mapping_id: String,
    pub mapping_name: String,
    pub commit_id: String,
    pub commit_message: String,
    pub files_changed: usize,
    #[serde(default)]
    pub commit_url: Option<String>,
}

/// Append-only, size-capped log of completed backup attempts, newest first.
pub struct HistoryStore {
    path: PathBuf,
    cap: usize,
}

impl HistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cap: HISTORY_CAP,
        }
    }

    #[cfg(test)]
    fn with_cap(path: PathBuf, cap: usize) -> Self {
        Self { path, cap }
    }

    pub fn append(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(0, entry);
        entries.truncate(self.cap);
        let data = serde_json::to_string_pretty(&entries)
            .map_err(|e| StoreError::Parse(e.to_string()))?;
        write_atomic(&self.path, data.as_bytes())
    }

    pub fn query(&self, mapping_id: Option<&str>, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        let entries = self.load()?;
        let filtered = entries
            .into_iter()
            .filter(|e| mapping_id.map_or(true, |id| e.mapping_id == id))
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        Ok(filtered)
    }

    pub fn latest_for(&self, mapping_id: &str) -> Result<Option<HistoryEntry>> {
        Ok(self
            .load()?
            .into_iter()
            .find(|e| e.mapping_id == mapping_id))
    }

    fn load(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)?;
        serde_json::from_str(&data)
            .map_err(|e| StoreError::Parse(e.to_string()).into())
    }
}
