//! `segload merge` – merge the segments of a fully downloaded manifest by hand.

use anyhow::{bail, Result};
use segload_core::merge;
use segload_core::record::{JsonRecordStore, RecordStore};
use std::path::Path;

pub async fn run_merge(manifest: &Path) -> Result<()> {
    let task = JsonRecordStore::open(manifest)?.load()?;
    if !task.all_complete() {
        bail!(
            "{} of {} segments still pending; run `segload run` first",
            task.pending_count(),
            task.units.len()
        );
    }
    if merge::already_merged(&task) {
        let len = merge::verify_output(&task)?;
        println!("{} is already merged ({} bytes)", task.file_path.display(), len);
        return Ok(());
    }
    let len = merge::merge_task(&task)?;
    println!("Merged {} bytes into {}", len, task.file_path.display());
    Ok(())
}
