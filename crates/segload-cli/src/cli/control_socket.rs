//! Control socket: server (during `segload run`) and client (`segload stop` / `segload cancel`).
//! Protocol: one command per line, "stop" or "cancel".

use anyhow::Result;
use segload_core::control::TaskControl;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Request sent over the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Stop,
    Cancel,
}

impl ControlCommand {
    pub fn as_line(self) -> &'static str {
        match self {
            ControlCommand::Stop => "stop\n",
            ControlCommand::Cancel => "cancel\n",
        }
    }

    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "stop" => Some(ControlCommand::Stop),
            "cancel" => Some(ControlCommand::Cancel),
            _ => None,
        }
    }
}

/// Bound control socket. Dropping it stops the listener and removes the socket file.
pub struct ControlSocket {
    path: PathBuf,
    task: tokio::task::JoinHandle<()>,
}

impl ControlSocket {
    /// Binds `path` and forwards commands to `control` until dropped.
    pub fn bind(control: TaskControl, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let task = spawn_control_listener(control, &path)?;
        Ok(Self { path, task })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ControlSocket {
    fn drop(&mut self) {
        self.task.abort();
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Binds `path` and forwards each command line to `control`. Ignores malformed lines.
fn spawn_control_listener(
    control: TaskControl,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)?;
    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let control = control.clone();
                    tokio::spawn(async move {
                        let mut reader = BufReader::new(stream).lines();
                        while let Ok(Some(line)) = reader.next_line().await {
                            match ControlCommand::parse(&line) {
                                Some(ControlCommand::Stop) => control.request_stop(),
                                Some(ControlCommand::Cancel) => control.request_cancel(),
                                None => tracing::debug!(line = %line, "ignoring control line"),
                            }
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

/// Sends `command` to the control socket. Returns false if no socket exists at `socket_path`.
pub async fn send_command(socket_path: &Path, command: ControlCommand) -> Result<bool> {
    if !socket_path.exists() {
        return Ok(false);
    }
    let mut stream = UnixStream::connect(socket_path).await?;
    stream.write_all(command.as_line().as_bytes()).await?;
    stream.shutdown().await?;
    Ok(true)
}
