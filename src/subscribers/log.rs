//! # LogWriter — events as `tracing` records
//!
//! A subscriber that renders every [`Event`] as a structured `tracing` record
//! under the `procvisor` target. Install any `tracing` subscriber (for example
//! `tracing_subscriber::fmt` with an `EnvFilter`) to see them.
//!
//! ## Levels
//! - `Log` events keep their own level
//! - failures, timeouts, retries, halts, subscriber panics → `warn`/`error`
//! - lifecycle (start/stop/run/done) → `info`/`debug`
//! - live output chunks and running snapshots → `trace`

use async_trait::async_trait;
use tracing::{debug, error, info, trace, warn};

use crate::core::LogLevel;
use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let kind = e.kind.as_label();
        match e.kind {
            EventKind::Log => {
                let msg = e.reason.as_deref().unwrap_or("");
                match e.level.unwrap_or_default() {
                    LogLevel::Off => {}
                    LogLevel::Error => error!(target: "procvisor", "{msg}"),
                    LogLevel::Warn => warn!(target: "procvisor", "{msg}"),
                    LogLevel::Info => info!(target: "procvisor", "{msg}"),
                    LogLevel::Debug => debug!(target: "procvisor", "{msg}"),
                    LogLevel::Trace => trace!(target: "procvisor", "{msg}"),
                }
            }
            EventKind::Halted | EventKind::SubscriberPanicked => {
                error!(target: "procvisor", kind, task = ?e.task, reason = ?e.reason);
            }
            EventKind::TaskError => {
                warn!(
                    target: "procvisor",
                    kind,
                    task = ?e.task,
                    command = ?e.command,
                    code = ?e.exit_code,
                    signal = ?e.signal,
                    reason = ?e.reason
                );
            }
            EventKind::TaskTimeout => {
                warn!(target: "procvisor", kind, task = ?e.task, timeout_ms = ?e.timeout_ms);
            }
            EventKind::TaskRetry => {
                warn!(
                    target: "procvisor",
                    kind,
                    task = ?e.task,
                    attempt = ?e.attempt,
                    delay_ms = ?e.delay_ms
                );
            }
            EventKind::Stdout | EventKind::Stderr => {
                trace!(target: "procvisor", kind, task = ?e.task, chunk = ?e.chunk);
            }
            EventKind::TasksRunning => {
                let running = e.snapshot.as_ref().map(|s| s.running);
                trace!(target: "procvisor", kind, running = ?running);
            }
            EventKind::BeforeRunTask | EventKind::TaskDone | EventKind::TaskStopped => {
                info!(
                    target: "procvisor",
                    kind,
                    task = ?e.task,
                    group = ?e.group,
                    slot = ?e.slot,
                    command = ?e.command
                );
            }
            EventKind::AfterRunTask => {
                debug!(target: "procvisor", kind, task = ?e.task, code = ?e.exit_code, signal = ?e.signal);
            }
            EventKind::GroupDone | EventKind::AllDone | EventKind::AfterStart => {
                info!(target: "procvisor", kind, group = ?e.group, total = ?e.total);
            }
            EventKind::BeforeStart
            | EventKind::BeforeStop
            | EventKind::AfterStop
            | EventKind::BeforePause
            | EventKind::AfterPause
            | EventKind::BeforeResume
            | EventKind::AfterResume
            | EventKind::Destroyed
            | EventKind::BeforeStopTask
            | EventKind::AfterStopTask => {
                debug!(target: "procvisor", kind, task = ?e.task);
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
