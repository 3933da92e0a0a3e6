//! Checksum command: compute SHA-256 of a file.

use anyhow::{bail, Result};
use segload_core::checksum;
use std::path::Path;

/// Print SHA-256 of the given file; with `expect`, fail on mismatch.
pub async fn run_checksum(path: &Path, expect: Option<&str>) -> Result<()> {
    let digest = checksum::sha256_path(path)?;
    println!("{}  {}", digest, path.display());
    if let Some(expected) = expect {
        if !checksum::digest_matches(&digest, expected) {
            bail!("checksum mismatch: expected {}", expected.trim());
        }
    }
    Ok(())
}
