use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Default admission gate capacity (concurrent fetch workers per task).
pub const DEFAULT_MAX_CONCURRENT_WORKERS: usize = 4;

/// Transfer tuning for the curl fetch worker (optional section in config.toml).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Abort a transfer whose throughput stays below this many bytes/s ...
    pub low_speed_limit_bytes: u32,
    /// ... for this many seconds.
    pub low_speed_time_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_limit_bytes: 1024,
            low_speed_time_secs: 60,
        }
    }
}

/// Global configuration loaded from `~/.config/segload/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegloadConfig {
    /// Maximum number of fetch workers running at once for one task.
    #[serde(default = "default_max_concurrent_workers")]
    pub max_concurrent_workers: usize,
    /// How long the dispatch loop waits on a full gate before re-checking for stop/cancel.
    #[serde(default = "default_gate_poll_ms")]
    pub gate_poll_ms: u64,
    /// Interval between progress ticks delivered to the task listener.
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    /// Optional curl tuning; if missing, built-in defaults are used.
    #[serde(default)]
    pub fetch: Option<FetchConfig>,
}

fn default_max_concurrent_workers() -> usize {
    DEFAULT_MAX_CONCURRENT_WORKERS
}

fn default_gate_poll_ms() -> u64 {
    100
}

fn default_progress_interval_ms() -> u64 {
    2000
}

impl Default for SegloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_workers: default_max_concurrent_workers(),
            gate_poll_ms: default_gate_poll_ms(),
            progress_interval_ms: default_progress_interval_ms(),
            fetch: None,
        }
    }
}

impl SegloadConfig {
    /// Gate capacity, never below one.
    pub fn capacity(&self) -> usize {
        self.max_concurrent_workers.max(1)
    }

    pub fn gate_poll(&self) -> Duration {
        Duration::from_millis(self.gate_poll_ms.max(1))
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    pub fn fetch_or_default(&self) -> FetchConfig {
        self.fetch.unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("segload")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SegloadConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = SegloadConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: SegloadConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = SegloadConfig::default();
        assert_eq!(cfg.max_concurrent_workers, 4);
        assert_eq!(cfg.gate_poll_ms, 100);
        assert_eq!(cfg.progress_interval_ms, 2000);
        assert!(cfg.fetch.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = SegloadConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: SegloadConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.max_concurrent_workers, cfg.max_concurrent_workers);
        assert_eq!(parsed.gate_poll_ms, cfg.gate_poll_ms);
        assert_eq!(parsed.progress_interval_ms, cfg.progress_interval_ms);
    }

    #[test]
    fn config_toml_with_fetch_section() {
        let toml = r#"
            max_concurrent_workers = 8
            gate_poll_ms = 50
            progress_interval_ms = 500

            [fetch]
            connect_timeout_secs = 10
            low_speed_limit_bytes = 512
            low_speed_time_secs = 20
        "#;
        let cfg: SegloadConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_concurrent_workers, 8);
        let fetch = cfg.fetch_or_default();
        assert_eq!(fetch.connect_timeout_secs, 10);
        assert_eq!(fetch.low_speed_limit_bytes, 512);
        assert_eq!(fetch.low_speed_time_secs, 20);
    }

    #[test]
    fn partial_config_fills_missing_fields() {
        let cfg: SegloadConfig = toml::from_str("max_concurrent_workers = 2\n").unwrap();
        assert_eq!(cfg.max_concurrent_workers, 2);
        assert_eq!(cfg.gate_poll_ms, 100);
        assert_eq!(cfg.progress_interval_ms, 2000);
        assert!(cfg.fetch.is_none());

        let cfg: SegloadConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.max_concurrent_workers, DEFAULT_MAX_CONCURRENT_WORKERS);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let cfg = SegloadConfig {
            max_concurrent_workers: 0,
            ..SegloadConfig::default()
        };
        assert_eq!(cfg.capacity(), 1);
    }
}
