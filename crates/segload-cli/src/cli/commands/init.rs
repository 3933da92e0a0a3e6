//! `segload init` – write a new task manifest.

use anyhow::{Context, Result};
use segload_core::record::{JsonRecordStore, TaskRecord, UnitRecord};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub output: PathBuf,
    pub length: u64,
    pub cache_dir: PathBuf,
    pub block: bool,
    pub dynamic: bool,
    pub sha256: Option<String>,
}

/// Unit ids follow argument order, starting at 0.
pub fn build_task(opts: InitOptions, urls: &[String]) -> TaskRecord {
    TaskRecord {
        file_path: opts.output,
        file_length: opts.length,
        cache_dir: opts.cache_dir,
        is_block: opts.block,
        open_dynamic_file: opts.dynamic,
        sha256: opts.sha256.map(|s| s.trim().to_ascii_lowercase()),
        units: urls
            .iter()
            .zip(0u32..)
            .map(|(url, id)| UnitRecord::new(id, url.clone()))
            .collect(),
    }
}

pub async fn run_init(manifest: &Path, opts: InitOptions, urls: &[String]) -> Result<()> {
    let task = build_task(opts, urls);
    JsonRecordStore::create(manifest, &task)
        .with_context(|| format!("write manifest {}", manifest.display()))?;
    println!(
        "Wrote {} with {} segments -> {}",
        manifest.display(),
        task.units.len(),
        task.file_path.display()
    );
    Ok(())
}
