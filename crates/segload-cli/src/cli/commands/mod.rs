//! CLI command handlers, one file per command.

mod checksum;
mod init;
mod merge;
mod run;
mod signal;
mod status;

pub use checksum::run_checksum;
pub use init::{run_init, InitOptions};
pub use merge::run_merge;
pub use run::run_task;
pub use signal::{run_cancel, run_stop};
pub use status::run_status;
