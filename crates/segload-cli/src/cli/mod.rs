//! CLI for the segload playlist downloader.

mod commands;
mod control_socket;

use anyhow::Result;
use clap::{Parser, Subcommand};
use segload_core::config;
use std::path::PathBuf;

use commands::{
    run_cancel, run_checksum, run_init, run_merge, run_status, run_stop, run_task, InitOptions,
};

/// Top-level CLI for the segload downloader.
#[derive(Debug, Parser)]
#[command(name = "segload")]
#[command(about = "segload: segmented playlist downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every pending segment of a task manifest, then merge.
    Run {
        /// Task manifest (JSON).
        manifest: PathBuf,
        /// Concurrent fetch workers (overrides config).
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
        /// Control socket path (default: XDG state dir).
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Write a new task manifest from a list of segment URLs.
    Init {
        /// Manifest file to create.
        manifest: PathBuf,
        /// Final output file.
        #[arg(long, value_name = "PATH")]
        output: PathBuf,
        /// Expected length of the merged output in bytes.
        #[arg(long, value_name = "BYTES")]
        length: u64,
        /// Directory for per-segment files.
        #[arg(long, value_name = "DIR")]
        cache_dir: PathBuf,
        /// Keep segments as separate files instead of merging.
        #[arg(long)]
        no_block: bool,
        /// Create segment files on the first received byte.
        #[arg(long)]
        dynamic: bool,
        /// Expected SHA-256 of the merged output (hex).
        #[arg(long, value_name = "HEX")]
        sha256: Option<String>,
        /// Segment URLs in merge order.
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Show per-segment completion of a manifest.
    Status {
        manifest: PathBuf,
    },

    /// Merge the segments of a fully downloaded manifest.
    Merge {
        manifest: PathBuf,
    },

    /// Ask a running `segload run` to stop; segments are kept for resume.
    Stop {
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Ask a running `segload run` to cancel.
    Cancel {
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Compute SHA-256 of a file (e.g. after a merge).
    Checksum {
        /// Path to the file.
        path: PathBuf,
        /// Fail unless the digest matches this hex value.
        #[arg(long, value_name = "HEX")]
        expect: Option<String>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run {
                manifest,
                workers,
                socket,
            } => run_task(&cfg, &manifest, workers, socket).await?,
            CliCommand::Init {
                manifest,
                output,
                length,
                cache_dir,
                no_block,
                dynamic,
                sha256,
                urls,
            } => {
                let opts = InitOptions {
                    output,
                    length,
                    cache_dir,
                    block: !no_block,
                    dynamic,
                    sha256,
                };
                run_init(&manifest, opts, &urls).await?
            }
            CliCommand::Status { manifest } => run_status(&manifest).await?,
            CliCommand::Merge { manifest } => run_merge(&manifest).await?,
            CliCommand::Stop { socket } => run_stop(socket).await?,
            CliCommand::Cancel { socket } => run_cancel(socket).await?,
            CliCommand::Checksum { path, expect } => run_checksum(&path, expect.as_deref()).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
