//! Merge step: concatenate segment files into the task output.
//!
//! Segments are appended in unit order. Once the copy succeeds the segment
//! files are removed, then the output is re-checked against the expected
//! length: a longer file means some unit over-read, and the merge fails even
//! though every copy succeeded. The oversized output is left on disk for
//! inspection.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::checksum;
use crate::record::TaskRecord;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("merge io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("merged file {path} is {actual} bytes, longer than the expected {expected}")]
    Oversize {
        path: PathBuf,
        actual: u64,
        expected: u64,
    },
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> MergeError + '_ {
    move |source| MergeError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Concatenate `parts` into `dest`, delete the parts, and check the size.
/// Returns the merged length.
pub fn merge_segments(parts: &[PathBuf], dest: &Path, expected_len: u64) -> Result<u64, MergeError> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_at(parent))?;
    }

    let out = File::create(dest).map_err(io_at(dest))?;
    let mut writer = BufWriter::new(out);
    for part in parts {
        let mut input = File::open(part).map_err(io_at(part))?;
        io::copy(&mut input, &mut writer).map_err(io_at(part))?;
    }
    let out = writer
        .into_inner()
        .map_err(|e| MergeError::Io {
            path: dest.to_path_buf(),
            source: e.into_error(),
        })?;
    out.sync_all().map_err(io_at(dest))?;
    drop(out);

    for part in parts {
        match fs::remove_file(part) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %part.display(), "could not remove segment file: {}", e),
        }
    }

    let actual = fs::metadata(dest).map_err(io_at(dest))?.len();
    if actual > expected_len {
        tracing::error!(
            path = %dest.display(),
            actual,
            expected = expected_len,
            "merged output longer than expected length"
        );
        return Err(MergeError::Oversize {
            path: dest.to_path_buf(),
            actual,
            expected: expected_len,
        });
    }
    tracing::debug!(path = %dest.display(), parts = parts.len(), bytes = actual, "segments merged");
    Ok(actual)
}

/// Merge a block-mode task: its segment files in unit order into `file_path`,
/// then check the optional SHA-256.
pub fn merge_task(task: &TaskRecord) -> Result<u64, MergeError> {
    let len = merge_segments(&task.segment_paths(), &task.file_path, task.file_length)?;
    check_sha256(task)?;
    Ok(len)
}

/// Re-validate an output merged by an earlier run: length bound, then the
/// optional SHA-256. A rejected output stays rejected on every later run.
pub fn verify_output(task: &TaskRecord) -> Result<u64, MergeError> {
    let dest = &task.file_path;
    let actual = fs::metadata(dest).map_err(io_at(dest))?.len();
    if actual > task.file_length {
        return Err(MergeError::Oversize {
            path: dest.clone(),
            actual,
            expected: task.file_length,
        });
    }
    check_sha256(task)?;
    Ok(actual)
}

fn check_sha256(task: &TaskRecord) -> Result<(), MergeError> {
    let Some(expected) = task.sha256.as_deref() else {
        return Ok(());
    };
    let actual = checksum::sha256_path(&task.file_path).map_err(io_at(&task.file_path))?;
    if !checksum::digest_matches(&actual, expected) {
        return Err(MergeError::ChecksumMismatch {
            path: task.file_path.clone(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// True when no segment file is left and the output exists: a previous run
/// already merged. Says nothing about whether that output is valid; see
/// [`verify_output`].
pub fn already_merged(task: &TaskRecord) -> bool {
    task.file_path.exists() && task.segment_paths().iter().all(|p| !p.exists())
}
