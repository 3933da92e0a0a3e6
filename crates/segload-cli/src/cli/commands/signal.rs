//! `segload stop` / `segload cancel` – signal a running `segload run` over its control socket.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::cli::control_socket::{self, ControlCommand};

async fn send(socket: Option<PathBuf>, command: ControlCommand) -> Result<()> {
    let path = match socket {
        Some(p) => p,
        None => segload_core::control::default_control_socket_path()
            .context("resolve control socket path")?,
    };
    if control_socket::send_command(&path, command).await? {
        println!("Sent {} to {}", command.as_line().trim(), path.display());
    } else {
        println!("No running task (no socket at {})", path.display());
    }
    Ok(())
}

pub async fn run_stop(socket: Option<PathBuf>) -> Result<()> {
    send(socket, ControlCommand::Stop).await
}

pub async fn run_cancel(socket: Option<PathBuf>) -> Result<()> {
    send(socket, ControlCommand::Cancel).await
}
