//! # Task specifications and the status table.
//!
//! This module provides the task-related types:
//! - [`TaskSpec`] - command, arguments, options, timeout override, metadata
//! - [`ExecOptions`] / [`StreamMode`] - how the process is started
//! - [`TaskStatus`] - lifecycle status of one task index
//! - [`StatusSnapshot`] - owned view returned by `Scheduler::status`

mod options;
mod spec;
mod status;
mod table;

pub use options::{ExecOptions, StreamMode};
pub use spec::{TaskMeta, TaskSpec, TaskSpecBuilder};
pub use status::TaskStatus;
pub use table::StatusSnapshot;

pub(crate) use table::TaskTable;
