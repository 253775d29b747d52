//! # procvisor
//!
//! **Procvisor** schedules external processes: a bounded pool of worker
//! slots, per-task timeouts, retries under a global budget, pause/resume,
//! and sequential lanes for grouped work. Every lifecycle step is reported
//! as an [`Event`] to awaited subscribers and to a broadcast bus.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   Scheduler (handle, Clone) ── Command + oneshot reply ──┐
//!                                                          ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Runtime (one tokio task, owns every table)                       │
//! │  - TaskTable      specs + statuses, flat or grouped               │
//! │  - slots          `Config::threads` worker slots (flat mode)      │
//! │  - lanes          one cursor per group (lane mode)                │
//! │  - RetryState     per-task and global retry counters              │
//! │  - DelayQueue     one deadline per timed run                      │
//! │  - pending        failed tasks waiting for their retry delay      │
//! └──────┬──────────────────────▲───────────────────────┬─────────────┘
//!        │ launch()             │ Chunk / Closed        │ emit(event)
//!        ▼                      │                       ▼
//!  ┌──────────────┐   ┌─────────┴────────┐     ┌─────────────────┐
//!  │ child process├──►│ pumps + watcher  │     │  SubscriberSet  │
//!  │ (own group)  │   │ (per run)        │     │  (awaited hooks)│
//!  └──────────────┘   └──────────────────┘     └────────┬────────┘
//!                                                       ▼
//!                                              Bus (broadcast channel)
//! ```
//!
//! ### Lifecycle of one task
//! ```text
//! Waiting ──► Running ──► exit 0 ──────────────► Done
//!                │
//!                ├──► exit != 0 / spawn error ─► Failed ─┐
//!                ├──► deadline ─► kill ────────► Timeout ┤
//!                │                                       ▼
//!                │                retry left and budget left? ── yes ─► Waiting (after delay)
//!                │                        │ no                │ budget gone
//!                │                   stays failed        Halted (no dispatch)
//!                └──► stop_task ──────────────────────► Stopped
//! Waiting ──► cancel_task ─────────────────────────────► Cancelled
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                 |
//! |-------------------|----------------------------------------------------------|------------------------------------|
//! | **Scheduling**    | Flat slot pool or sequential lanes, control operations.  | [`Scheduler`], [`SchedulerBuilder`]|
//! | **Tasks**         | Command, args, exec options, timeout, metadata.          | [`TaskSpec`], [`ExecOptions`]      |
//! | **Policies**      | Retry limits, global budget, delay jitter.               | [`RetryPolicy`], [`JitterPolicy`]  |
//! | **Subscriber API**| Hook into lifecycle events, logging via `tracing`.       | [`Subscribe`], [`LogWriter`]       |
//! | **Errors**        | Typed errors for control calls and task runs.            | [`RuntimeError`], [`TaskError`]    |
//! | **Configuration** | Centralized runtime settings.                            | [`Config`]                         |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use procvisor::{Config, EventKind, LogWriter, Scheduler, TaskSpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.threads = 2;
//!     cfg.max_retries = 1;
//!     cfg.timeout = Duration::from_secs(5);
//!
//!     let sched = Scheduler::builder(cfg)
//!         .with_subscriber(Arc::new(LogWriter::default()))
//!         .build();
//!
//!     sched
//!         .set_tasks(vec![
//!             TaskSpec::new("echo", ["hello"]),
//!             TaskSpec::builder("sh").args(["-c", "exit 3"]).build(),
//!         ])
//!         .await?;
//!
//!     let end = sched.run().await?;
//!     assert_eq!(end.kind, EventKind::AllDone);
//!     println!("{:?}", sched.status().await?.statuses);
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod policies;
mod process;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use core::{Config, LogLevel, Scheduler, SchedulerBuilder};
pub use error::{RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use policies::{JitterPolicy, RetryDecision, RetryPolicy};
pub use process::{KillSignal, ParseSignalError};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{ExecOptions, StatusSnapshot, StreamMode, TaskMeta, TaskSpec, TaskSpecBuilder, TaskStatus};
