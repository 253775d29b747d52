//! # Run outcomes: output chunks, deadlines and closes.
//!
//! ```text
//! Closed(exit) ─► run id tracked? ── no ──► ignore (stopped or stale run)
//!                      │ yes
//!                      ▼
//!   free slot, cancel deadline, mark completed, AfterRunTask
//!                      │
//!        success ──────┴────── failure / spawn error / timeout
//!           │                         │
//!     Done + TaskDone          Failed|Timeout + TaskError
//!                                      │
//!                               RetryState::on_failure
//!                 Retry ─► un-complete, TaskRetry, pending until delay
//!                 Exhausted ─► stays failed
//!                 BudgetExceeded ─► halt + Halted
//! ```

use std::sync::Arc;

use crate::core::config::LogLevel;
use crate::core::runtime::{PendingRetry, Runtime};
use crate::error::{RuntimeError, TaskError};
use crate::events::EventKind;
use crate::policies::RetryDecision;
use crate::process::{OutputStream, ProcessExit};
use crate::tasks::TaskStatus;

use tokio::time::Instant;

impl Runtime {
    fn is_current(&self, index: usize, run: u64) -> bool {
        matches!(self.in_flight.get(index), Some(Some(f)) if f.run == run)
    }

    pub(super) async fn on_chunk(&mut self, index: usize, run: u64, stream: OutputStream, text: String) {
        if !self.is_current(index, run) {
            return;
        }
        let kind = match stream {
            OutputStream::Stdout => EventKind::Stdout,
            OutputStream::Stderr => EventKind::Stderr,
        };
        self.emit(self.task_event(kind, index).with_chunk(text)).await;
    }

    /// Deadline fired: mark the run timed out and signal it. The close that
    /// follows carries the failure into the retry path.
    pub(super) async fn on_deadline(&mut self, index: usize, run: u64) {
        let Some(flight) = self
            .in_flight
            .get_mut(index)
            .and_then(Option::as_mut)
            .filter(|f| f.run == run)
        else {
            return;
        };
        flight.deadline = None;
        flight.timed_out = true;
        let timeout = flight.timeout.unwrap_or_default();
        flight.handle.kill(self.cfg.kill_signal);

        self.table.set_status(index, TaskStatus::Timeout);
        self.emit(self.task_event(EventKind::TaskTimeout, index).with_timeout(timeout))
            .await;
        self.log(
            LogLevel::Warn,
            format!(
                "task {index} exceeded {}ms; sent {}",
                timeout.as_millis(),
                self.cfg.kill_signal
            ),
        )
        .await;
    }

    pub(super) async fn on_close(&mut self, exit: ProcessExit) {
        let index = exit.task;
        let Some(flight) = self
            .in_flight
            .get_mut(index)
            .and_then(|slot| slot.take_if(|f| f.run == exit.run))
        else {
            self.log(
                LogLevel::Trace,
                format!("ignoring close of untracked run {} (task {index})", exit.run),
            )
            .await;
            return;
        };

        if let Some(key) = flight.deadline {
            self.deadlines.try_remove(&key);
        }
        if let Some(slot) = flight.slot {
            self.release_slot(slot, index);
        }
        self.completed[index] = true;

        let stdout: Arc<str> = exit.stdout.as_str().into();
        let stderr: Arc<str> = exit.stderr.as_str().into();
        self.emit(
            self.task_event(EventKind::AfterRunTask, index)
                .with_exit(exit.code, exit.signal)
                .with_output(stdout.clone(), stderr.clone()),
        )
        .await;

        if exit.success() && !flight.timed_out {
            self.table.set_status(index, TaskStatus::Done);
            self.emit(
                self.task_event(EventKind::TaskDone, index)
                    .with_exit(exit.code, exit.signal)
                    .with_output(stdout, stderr),
            )
            .await;
            return;
        }

        let error = match (exit.spawn_error, flight.timed_out) {
            (Some(error), _) => TaskError::Spawn { error },
            (None, true) => TaskError::Timeout {
                timeout: flight.timeout.unwrap_or_default(),
            },
            (None, false) => TaskError::Exit {
                code: exit.code,
                signal: exit.signal,
            },
        };
        let status = if flight.timed_out {
            TaskStatus::Timeout
        } else {
            TaskStatus::Failed
        };
        self.table.set_status(index, status);
        self.emit(
            self.task_event(EventKind::TaskError, index)
                .with_exit(exit.code, exit.signal)
                .with_output(stdout, stderr)
                .with_error(error.clone()),
        )
        .await;

        if error.is_retryable() {
            self.apply_retry(index).await;
        }
    }

    async fn apply_retry(&mut self, index: usize) {
        if self.halted || !self.processing {
            return;
        }
        match self.retry.on_failure(index, &self.policy) {
            RetryDecision::Retry { attempt, delay } => {
                self.completed[index] = false;
                self.pending.push(PendingRetry {
                    index,
                    due: Instant::now() + delay,
                });
                self.emit(
                    self.task_event(EventKind::TaskRetry, index)
                        .with_attempt(attempt)
                        .with_delay(delay),
                )
                .await;
            }
            RetryDecision::Exhausted => {
                let tries = self.retry.retries(index);
                self.log(
                    LogLevel::Debug,
                    format!("task {index} failed for good after {tries} retries"),
                )
                .await;
            }
            RetryDecision::BudgetExceeded { limit } => self.halt(index, limit).await,
        }
    }

    /// Global retry ceiling reached: stop dispatching, leave running processes alone.
    async fn halt(&mut self, index: usize, limit: usize) {
        self.halted = true;
        self.processing = false;
        self.paused = false;
        self.pending.clear();

        let err = RuntimeError::RetryBudgetExceeded { limit };
        self.log(LogLevel::Error, err.to_string()).await;
        self.emit(
            self.task_event(EventKind::Halted, index)
                .with_reason(err.to_string()),
        )
        .await;
    }
}
