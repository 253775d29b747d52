//! # Lifecycle events emitted by the scheduler runtime.
//!
//! The [`EventKind`] enum has one variant per lifecycle hook, in five groups:
//! - **Scheduler control**: start, stop, pause, resume, destroy
//! - **Task run**: before/after run, done, error, timeout, retry
//! - **Task control**: stop-task, cancellation is visible through status only
//! - **Output**: live stdout/stderr chunks
//! - **Progress**: periodic running snapshot, group done, all done, halt, log
//!
//! The [`Event`] struct carries the metadata the kind needs; unrelated fields stay `None`.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Subscribers of one scheduler observe events in `seq` order.
//!
//! ## Example
//! ```rust
//! use procvisor::{Event, EventKind, TaskError};
//!
//! let ev = Event::new(EventKind::TaskError)
//!     .with_task(3)
//!     .with_command("make test")
//!     .with_error(TaskError::Exit { code: Some(2), signal: None })
//!     .with_output("", "boom");
//!
//! assert_eq!(ev.kind, EventKind::TaskError);
//! assert_eq!(ev.task, Some(3));
//! assert_eq!(ev.stderr.as_deref(), Some("boom"));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::LogLevel;
use crate::error::TaskError;
use crate::tasks::{StatusSnapshot, TaskMeta};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Scheduler control ===
    /// `start()` accepted, before the first dispatch.
    BeforeStart,
    /// Mode selected and processing flag set.
    ///
    /// Sets: `total` (tasks in flat mode, lanes in lane mode).
    AfterStart,
    /// `stop()` requested, before processes are signalled.
    BeforeStop,
    /// Tables cleared; signalled processes may still be closing.
    AfterStop,
    BeforePause,
    AfterPause,
    BeforeResume,
    AfterResume,
    /// `destroy()` finished; task storage is empty.
    Destroyed,

    // === Task run ===
    /// Task assigned and about to spawn.
    ///
    /// Sets: `task`, `command`, `slot` (flat mode), `group` (lane mode), `attempt`, `meta`.
    BeforeRunTask,
    /// Process closed.
    ///
    /// Sets: `task`, `command`, `exit_code`, `signal`, `stdout`, `stderr`, `meta`.
    AfterRunTask,
    /// Process exited with code 0.
    TaskDone,
    /// Process failed (nonzero exit, signal, spawn failure or timeout).
    ///
    /// Sets: `task`, `error`, `reason`, `stdout`, `stderr`, `exit_code`, `signal`.
    TaskError,
    /// Deadline expired; the kill signal is being sent.
    ///
    /// Sets: `task`, `timeout_ms`.
    TaskTimeout,
    /// Failed task requeued.
    ///
    /// Sets: `task`, `attempt` (retry number), `delay_ms`.
    TaskRetry,

    // === Task control ===
    BeforeStopTask,
    /// Task process signalled and task removed from tracking.
    TaskStopped,
    AfterStopTask,

    // === Output ===
    /// Live stdout chunk. Sets: `task`, `chunk`.
    Stdout,
    /// Live stderr chunk. Sets: `task`, `chunk`.
    Stderr,

    // === Progress ===
    /// Periodic snapshot while at least one task runs. Sets: `snapshot`.
    TasksRunning,
    /// A lane finished its last task. Sets: `group`.
    GroupDone,
    /// Every task (or lane) processed. Sets: `total`.
    AllDone,
    /// Global retry budget exhausted; dispatch halted. Sets: `reason`, `task`.
    Halted,
    /// Level-filtered log line. Sets: `level`, `reason`.
    Log,

    // === Subscriber events ===
    /// Subscriber panicked while handling an event.
    ///
    /// Sets: `reason` (subscriber name and panic message).
    SubscriberPanicked,
}

impl EventKind {
    /// Stable snake_case label.
    pub fn as_label(self) -> &'static str {
        match self {
            EventKind::BeforeStart => "before_start",
            EventKind::AfterStart => "after_start",
            EventKind::BeforeStop => "before_stop",
            EventKind::AfterStop => "after_stop",
            EventKind::BeforePause => "before_pause",
            EventKind::AfterPause => "after_pause",
            EventKind::BeforeResume => "before_resume",
            EventKind::AfterResume => "after_resume",
            EventKind::Destroyed => "destroyed",
            EventKind::BeforeRunTask => "before_run_task",
            EventKind::AfterRunTask => "after_run_task",
            EventKind::TaskDone => "task_done",
            EventKind::TaskError => "task_error",
            EventKind::TaskTimeout => "task_timeout",
            EventKind::TaskRetry => "task_retry",
            EventKind::BeforeStopTask => "before_stop_task",
            EventKind::TaskStopped => "task_stopped",
            EventKind::AfterStopTask => "after_stop_task",
            EventKind::Stdout => "stdout",
            EventKind::Stderr => "stderr",
            EventKind::TasksRunning => "tasks_running",
            EventKind::GroupDone => "group_done",
            EventKind::AllDone => "all_done",
            EventKind::Halted => "halted",
            EventKind::Log => "log",
            EventKind::SubscriberPanicked => "subscriber_panicked",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Task index.
    pub task: Option<usize>,
    /// Group (lane) index.
    pub group: Option<usize>,
    /// Worker slot (flat mode).
    pub slot: Option<usize>,
    /// Command line of the task.
    pub command: Option<Arc<str>>,
    /// Run number (1-based) or retry number, depending on the kind.
    pub attempt: Option<u32>,

    /// Exit code, `None` when the process was killed by a signal or never started.
    pub exit_code: Option<i32>,
    /// Terminating signal number.
    pub signal: Option<i32>,
    /// Full captured stdout.
    pub stdout: Option<Arc<str>>,
    /// Full captured stderr.
    pub stderr: Option<Arc<str>>,
    /// One live output chunk.
    pub chunk: Option<Arc<str>>,

    /// Typed task failure.
    pub error: Option<TaskError>,
    /// Human-readable reason or log message.
    pub reason: Option<Arc<str>>,
    /// Level of a `Log` event.
    pub level: Option<LogLevel>,

    /// Deadline in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Retry delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Task or lane count for `AfterStart` / `AllDone`.
    pub total: Option<usize>,
    /// Status snapshot for `TasksRunning`.
    pub snapshot: Option<Arc<StatusSnapshot>>,
    /// Caller metadata of the task, echoed untouched.
    pub meta: Option<TaskMeta>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            group: None,
            slot: None,
            command: None,
            attempt: None,
            exit_code: None,
            signal: None,
            stdout: None,
            stderr: None,
            chunk: None,
            error: None,
            reason: None,
            level: None,
            timeout_ms: None,
            delay_ms: None,
            total: None,
            snapshot: None,
            meta: None,
        }
    }

    #[inline]
    pub fn with_task(mut self, index: usize) -> Self {
        self.task = Some(index);
        self
    }

    #[inline]
    pub fn with_group(mut self, group: usize) -> Self {
        self.group = Some(group);
        self
    }

    #[inline]
    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }

    #[inline]
    pub fn with_command(mut self, command: impl Into<Arc<str>>) -> Self {
        self.command = Some(command.into());
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches exit metadata.
    #[inline]
    pub fn with_exit(mut self, code: Option<i32>, signal: Option<i32>) -> Self {
        self.exit_code = code;
        self.signal = signal;
        self
    }

    /// Attaches the full captured output.
    #[inline]
    pub fn with_output(mut self, stdout: impl Into<Arc<str>>, stderr: impl Into<Arc<str>>) -> Self {
        self.stdout = Some(stdout.into());
        self.stderr = Some(stderr.into());
        self
    }

    #[inline]
    pub fn with_chunk(mut self, chunk: impl Into<Arc<str>>) -> Self {
        self.chunk = Some(chunk.into());
        self
    }

    /// Attaches a typed failure; also fills `reason` from its display text.
    #[inline]
    pub fn with_error(mut self, error: TaskError) -> Self {
        self.reason = Some(error.to_string().into());
        self.error = Some(error);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Attaches a deadline (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    #[inline]
    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    #[inline]
    pub fn with_snapshot(mut self, snapshot: StatusSnapshot) -> Self {
        self.snapshot = Some(Arc::new(snapshot));
        self
    }

    #[inline]
    pub fn with_meta(mut self, meta: Option<TaskMeta>) -> Self {
        self.meta = meta;
        self
    }

    /// Creates a log event.
    #[inline]
    pub fn log(level: LogLevel, message: impl Into<Arc<str>>) -> Self {
        Event::new(EventKind::Log)
            .with_level(level)
            .with_reason(message)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }

    /// True for the kinds that end a run: `AllDone`, `Halted`, `AfterStop`, `Destroyed`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::AllDone | EventKind::Halted | EventKind::AfterStop | EventKind::Destroyed
        )
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("seq", &self.seq)
            .field("kind", &self.kind)
            .field("task", &self.task)
            .field("group", &self.group)
            .field("slot", &self.slot)
            .field("command", &self.command)
            .field("attempt", &self.attempt)
            .field("exit_code", &self.exit_code)
            .field("signal", &self.signal)
            .field("error", &self.error)
            .field("reason", &self.reason)
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::BeforeStart);
        let b = Event::new(EventKind::AfterStart);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn with_error_fills_reason() {
        let ev = Event::new(EventKind::TaskError).with_error(TaskError::Stopped);
        assert_eq!(ev.reason.as_deref(), Some("stopped"));
        assert_eq!(ev.error, Some(TaskError::Stopped));
    }

    #[test]
    fn durations_are_compacted_to_millis() {
        let ev = Event::new(EventKind::TaskRetry)
            .with_delay(Duration::from_millis(1500))
            .with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(1500));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }

    #[test]
    fn terminal_kinds() {
        assert!(Event::new(EventKind::AllDone).is_terminal());
        assert!(Event::new(EventKind::Halted).is_terminal());
        assert!(!Event::new(EventKind::TaskDone).is_terminal());
    }
}
