//! Error types used by the procvisor runtime and its tasks.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`] — errors returned by scheduler operations themselves.
//! - [`TaskError`] — outcomes of individual process runs that did not succeed.
//!
//! Task errors never surface as `Err` from a [`Scheduler`](crate::Scheduler) call;
//! they travel through [`EventKind::TaskError`](crate::EventKind::TaskError) events
//! while the scheduler keeps advancing other tasks.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the scheduler runtime.
///
/// Only [`RuntimeError::AlreadyRunning`] and [`RuntimeError::RetryBudgetExceeded`]
/// are scheduler-fatal: the former is rejected at call time, the latter halts
/// future dispatch and is reported through an `EventKind::Halted` event.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// `start()` (or a task installation) was requested while the scheduler is processing.
    #[error("scheduler is already running")]
    AlreadyRunning,

    /// The operation requires an active run.
    #[error("scheduler is not running")]
    NotRunning,

    /// `resume()` was called while the scheduler is not paused.
    #[error("scheduler is not paused")]
    NotPaused,

    /// The task index does not exist in the installed task set.
    #[error("unknown task index {index}")]
    UnknownTask {
        /// Offending index.
        index: usize,
    },

    /// The global retry ceiling was reached; dispatch is halted.
    #[error("global retry budget of {limit} exhausted; dispatch halted")]
    RetryBudgetExceeded {
        /// Configured global retry ceiling.
        limit: usize,
    },

    /// The runtime task is gone (all handles dropped or it panicked).
    #[error("scheduler runtime closed")]
    Closed,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use procvisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::AlreadyRunning.as_label(), "runtime_already_running");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyRunning => "runtime_already_running",
            RuntimeError::NotRunning => "runtime_not_running",
            RuntimeError::NotPaused => "runtime_not_paused",
            RuntimeError::UnknownTask { .. } => "runtime_unknown_task",
            RuntimeError::RetryBudgetExceeded { .. } => "runtime_retry_budget_exceeded",
            RuntimeError::Closed => "runtime_closed",
        }
    }
}

/// # Errors produced by a single process run.
///
/// `Exit`, `Timeout` and `Spawn` feed the retry policy; `Cancelled` and
/// `Stopped` are caller decisions and are never retried.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The process could not be started.
    #[error("spawn failed: {error}")]
    Spawn {
        /// The underlying I/O error message.
        error: String,
    },

    /// The process exited unsuccessfully.
    #[error("exited with code {code:?} (signal {signal:?})")]
    Exit {
        /// Exit code, `None` when terminated by a signal.
        code: Option<i32>,
        /// Terminating signal number (unix only).
        signal: Option<i32>,
    },

    /// The process exceeded its deadline and was killed.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// The task was cancelled before it ran.
    #[error("cancelled")]
    Cancelled,

    /// The task was stopped by the caller while running.
    #[error("stopped")]
    Stopped,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use procvisor::TaskError;
    /// use std::time::Duration;
    ///
    /// let err = TaskError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Spawn { .. } => "task_spawn_failed",
            TaskError::Exit { .. } => "task_exit_failed",
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Cancelled => "task_cancelled",
            TaskError::Stopped => "task_stopped",
        }
    }

    /// Indicates whether the retry policy may requeue the task.
    ///
    /// # Example
    /// ```
    /// use procvisor::TaskError;
    ///
    /// assert!(TaskError::Exit { code: Some(1), signal: None }.is_retryable());
    /// assert!(!TaskError::Stopped.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TaskError::Spawn { .. } | TaskError::Exit { .. } | TaskError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(
            RuntimeError::RetryBudgetExceeded { limit: 3 }.as_label(),
            "runtime_retry_budget_exceeded"
        );
        assert_eq!(TaskError::Cancelled.as_label(), "task_cancelled");
    }

    #[test]
    fn caller_decisions_are_not_retryable() {
        assert!(!TaskError::Cancelled.is_retryable());
        assert!(!TaskError::Stopped.is_retryable());
        assert!(TaskError::Spawn { error: "nope".into() }.is_retryable());
    }

    #[test]
    fn display_includes_details() {
        let err = TaskError::Exit { code: Some(2), signal: None };
        assert_eq!(err.to_string(), "exited with code Some(2) (signal None)");
        let err = RuntimeError::UnknownTask { index: 7 };
        assert_eq!(err.to_string(), "unknown task index 7");
    }
}
