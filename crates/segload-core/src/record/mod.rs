//! Task and unit records.
//!
//! Plain data describing one segmented download and its fetch units. Records
//! are owned by the record layer (`store`); the orchestrator only reads them
//! and never flips a unit's completion flag itself.

mod store;

pub use store::{JsonRecordStore, MemoryRecordStore, RecordStore};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unit identifier, unique within a task and stable across restarts.
pub type UnitId = u32;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("record serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unit {0} not found in task record")]
    UnknownUnit(UnitId),
    #[error("duplicate unit id {0}")]
    DuplicateUnit(UnitId),
    #[error("unit {id} has an invalid locator {locator:?}: {reason}")]
    InvalidLocator {
        id: UnitId,
        locator: String,
        reason: String,
    },
}

/// One independently fetchable segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub id: UnitId,
    /// Remote locator of the segment content.
    pub url: String,
    /// True once the unit has durably finished.
    #[serde(default)]
    pub complete: bool,
}

impl UnitRecord {
    pub fn new(id: UnitId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            complete: false,
        }
    }
}

/// One logical download: an ordered sequence of units plus output settings.
///
/// Unit order is merge order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Final output path.
    pub file_path: PathBuf,
    /// Expected length of the merged output in bytes.
    pub file_length: u64,
    /// Directory holding the per-unit segment files.
    pub cache_dir: PathBuf,
    /// Block mode: segments are merged into `file_path` once all complete.
    #[serde(default = "default_block")]
    pub is_block: bool,
    /// Passed through to fetch workers (file creation strategy).
    #[serde(default)]
    pub open_dynamic_file: bool,
    /// Optional lowercase hex SHA-256 of the merged output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub units: Vec<UnitRecord>,
}

fn default_block() -> bool {
    true
}

impl TaskRecord {
    /// Number of units not yet complete; this becomes `started` for a run.
    pub fn pending_count(&self) -> usize {
        self.units.iter().filter(|u| !u.complete).count()
    }

    pub fn all_complete(&self) -> bool {
        self.units.iter().all(|u| u.complete)
    }

    pub fn unit(&self, id: UnitId) -> Option<&UnitRecord> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Segment file for `id` inside the task cache directory.
    pub fn segment_path(&self, id: UnitId) -> PathBuf {
        segment_path(&self.cache_dir, id)
    }

    /// Segment files in unit (merge) order.
    pub fn segment_paths(&self) -> Vec<PathBuf> {
        self.units.iter().map(|u| self.segment_path(u.id)).collect()
    }

    /// Checks unit ids are unique and every locator is a URL.
    pub fn validate(&self) -> Result<(), RecordError> {
        let mut seen = HashSet::with_capacity(self.units.len());
        for unit in &self.units {
            if !seen.insert(unit.id) {
                return Err(RecordError::DuplicateUnit(unit.id));
            }
            url::Url::parse(&unit.url).map_err(|e| RecordError::InvalidLocator {
                id: unit.id,
                locator: unit.url.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// `<cache_dir>/<id>.ts`
pub fn segment_path(cache_dir: &Path, id: UnitId) -> PathBuf {
    cache_dir.join(format!("{}.ts", id))
}

#[cfg(test)]
pub(crate) fn sample_task(cache_dir: &Path, count: u32) -> TaskRecord {
    TaskRecord {
        file_path: cache_dir.join("out.ts"),
        file_length: 0,
        cache_dir: cache_dir.to_path_buf(),
        is_block: true,
        open_dynamic_file: false,
        sha256: None,
        units: (0..count)
            .map(|i| UnitRecord::new(i, format!("http://127.0.0.1/seg{}.ts", i)))
            .collect(),
    }
}
