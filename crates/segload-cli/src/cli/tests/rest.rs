//! Tests for status, merge, stop, cancel and checksum.

use super::parse;
use crate::cli::CliCommand;
use std::path::Path;

#[test]
fn cli_parse_status() {
    match parse(&["segload", "status", "task.json"]) {
        CliCommand::Status { manifest } => assert_eq!(manifest, Path::new("task.json")),
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_merge() {
    match parse(&["segload", "merge", "task.json"]) {
        CliCommand::Merge { manifest } => assert_eq!(manifest, Path::new("task.json")),
        _ => panic!("expected Merge"),
    }
}

#[test]
fn cli_parse_stop_and_cancel() {
    assert!(matches!(
        parse(&["segload", "stop"]),
        CliCommand::Stop { socket: None }
    ));
    match parse(&["segload", "cancel", "--socket", "/run/x.sock"]) {
        CliCommand::Cancel { socket } => {
            assert_eq!(socket.as_deref(), Some(Path::new("/run/x.sock")))
        }
        _ => panic!("expected Cancel"),
    }
}

#[test]
fn cli_parse_checksum() {
    match parse(&["segload", "checksum", "/tmp/file.ts", "--expect", "ABCD"]) {
        CliCommand::Checksum { path, expect } => {
            assert_eq!(path, Path::new("/tmp/file.ts"));
            assert_eq!(expect.as_deref(), Some("ABCD"));
        }
        _ => panic!("expected Checksum"),
    }
}
