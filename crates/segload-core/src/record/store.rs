//! Record persistence: JSON manifest on disk, or in memory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::{RecordError, TaskRecord, UnitId};

/// Read/write access to one task's records.
///
/// `load` returns a fresh snapshot each time so a resumed run sees completion
/// flags written by the previous one.
pub trait RecordStore: Send + Sync {
    fn load(&self) -> Result<TaskRecord, RecordError>;

    /// Persist the completion flag of one unit.
    fn mark_unit_complete(&self, unit_id: UnitId) -> Result<(), RecordError>;
}

/// Task manifest stored as pretty-printed JSON. Writes go to `<path>.part`
/// and are renamed over the manifest.
pub struct JsonRecordStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonRecordStore {
    /// Open an existing manifest.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RecordError> {
        let path = path.into();
        if !path.exists() {
            return Err(RecordError::Io {
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "manifest not found"),
                path,
            });
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Write `task` as a new manifest at `path` (overwrites).
    pub fn create(path: impl Into<PathBuf>, task: &TaskRecord) -> Result<Self, RecordError> {
        let path = path.into();
        task.validate()?;
        write_atomic(&path, task)?;
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<TaskRecord, RecordError> {
        let data = fs::read_to_string(&self.path).map_err(|source| RecordError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&data)?)
    }
}

impl RecordStore for JsonRecordStore {
    fn load(&self) -> Result<TaskRecord, RecordError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read()
    }

    fn mark_unit_complete(&self, unit_id: UnitId) -> Result<(), RecordError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut task = self.read()?;
        let unit = task
            .units
            .iter_mut()
            .find(|u| u.id == unit_id)
            .ok_or(RecordError::UnknownUnit(unit_id))?;
        if unit.complete {
            return Ok(());
        }
        unit.complete = true;
        write_atomic(&self.path, &task)?;
        tracing::debug!(unit_id, manifest = %self.path.display(), "unit marked complete");
        Ok(())
    }
}

fn write_atomic(path: &Path, task: &TaskRecord) -> Result<(), RecordError> {
    let io_err = |source| RecordError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".part");
    let tmp = PathBuf::from(tmp);
    let json = serde_json::to_string_pretty(task)?;
    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

/// In-process store, used for embedding and tests.
pub struct MemoryRecordStore {
    task: Mutex<TaskRecord>,
}

impl MemoryRecordStore {
    pub fn new(task: TaskRecord) -> Self {
        Self {
            task: Mutex::new(task),
        }
    }
}

impl RecordStore for MemoryRecordStore {
    fn load(&self) -> Result<TaskRecord, RecordError> {
        Ok(self.task.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn mark_unit_complete(&self, unit_id: UnitId) -> Result<(), RecordError> {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        let unit = task
            .units
            .iter_mut()
            .find(|u| u.id == unit_id)
            .ok_or(RecordError::UnknownUnit(unit_id))?;
        unit.complete = true;
        Ok(())
    }
}
