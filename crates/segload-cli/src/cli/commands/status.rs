//! `segload status` – show per-segment completion of a manifest.

use anyhow::Result;
use segload_core::record::{JsonRecordStore, RecordStore};
use std::path::Path;

pub async fn run_status(manifest: &Path) -> Result<()> {
    let task = JsonRecordStore::open(manifest)?.load()?;
    println!(
        "{} ({} bytes, {})",
        task.file_path.display(),
        task.file_length,
        if task.is_block { "block" } else { "non-block" }
    );
    println!("{:<6} {:<10} {}", "ID", "STATE", "URL");
    for u in &task.units {
        let state = if u.complete { "complete" } else { "pending" };
        println!("{:<6} {:<10} {}", u.id, state, u.url);
    }
    println!(
        "{}/{} segments complete",
        task.units.len() - task.pending_count(),
        task.units.len()
    );
    Ok(())
}
