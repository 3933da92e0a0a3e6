pub mod config;
pub mod logging;

pub mod aggregate;
pub mod checksum;
pub mod control;
pub mod fetch;
pub mod gate;
pub mod listener;
pub mod merge;
pub mod orchestrator;
pub mod record;

pub use control::{Interrupt, TaskControl};
pub use listener::{TaskListener, TracingListener};
pub use orchestrator::{OrchestrationHandle, Orchestrator, TaskOutcome};
pub use record::{TaskRecord, UnitId, UnitRecord};
