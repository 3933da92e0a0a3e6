#![allow(dead_code)]

pub mod scripted;
pub mod segment_server;

use std::path::Path;
use std::time::{Duration, Instant};

use segload_core::config::SegloadConfig;
use segload_core::record::{TaskRecord, UnitRecord};

/// Block task over `count` units with loopback locators, cache under `dir`.
pub fn task(dir: &Path, count: u32) -> TaskRecord {
    TaskRecord {
        file_path: dir.join("out/video.ts"),
        file_length: 0,
        cache_dir: dir.join("cache"),
        is_block: true,
        open_dynamic_file: false,
        sha256: None,
        units: (0..count)
            .map(|i| UnitRecord::new(i, format!("http://127.0.0.1/seg{}.ts", i)))
            .collect(),
    }
}

/// Config with a short gate poll so stop/cancel tests stay fast.
pub fn config(capacity: usize) -> SegloadConfig {
    SegloadConfig {
        max_concurrent_workers: capacity,
        gate_poll_ms: 5,
        progress_interval_ms: 1000,
        fetch: None,
    }
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}
