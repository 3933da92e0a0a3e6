//! Control socket round trip.

use crate::cli::control_socket::{send_command, ControlCommand, ControlSocket};
use segload_core::control::{Interrupt, TaskControl};
use std::time::Duration;

#[test]
fn control_command_lines() {
    assert_eq!(ControlCommand::parse(" stop \n"), Some(ControlCommand::Stop));
    assert_eq!(ControlCommand::parse("cancel"), Some(ControlCommand::Cancel));
    assert_eq!(ControlCommand::parse("pause 3"), None);
    assert_eq!(
        ControlCommand::parse(ControlCommand::Cancel.as_line()),
        Some(ControlCommand::Cancel)
    );
}

#[tokio::test]
async fn missing_socket_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let sent = send_command(&dir.path().join("none.sock"), ControlCommand::Stop)
        .await
        .unwrap();
    assert!(!sent);
}

#[tokio::test]
async fn socket_forwards_stop_then_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("control.sock");
    let control = TaskControl::new();
    let socket = ControlSocket::bind(control.clone(), &path).unwrap();

    assert!(send_command(&path, ControlCommand::Stop).await.unwrap());
    for _ in 0..200 {
        if control.is_interrupted() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(control.interrupt(), Some(Interrupt::Stop));

    assert!(send_command(&path, ControlCommand::Cancel).await.unwrap());
    for _ in 0..200 {
        if control.interrupt() == Some(Interrupt::Cancel) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(control.interrupt(), Some(Interrupt::Cancel));
    drop(socket);
}

#[tokio::test]
async fn dropping_the_socket_removes_its_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run/control.sock");
    let socket = ControlSocket::bind(TaskControl::new(), &path).unwrap();
    assert!(path.exists());
    drop(socket);
    assert!(!path.exists());
    assert!(!send_command(&path, ControlCommand::Stop).await.unwrap());
}
