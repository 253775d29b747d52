//! # Per-task status.

use std::fmt;

/// Status of one task index. Exactly one status per task at any time.
///
/// ```text
/// Waiting ──► Running ──► Done
///                │  └───► Failed ──(retry)──► Running
///                ├──────► Timeout ─(retry)──► Running
///                └──────► Stopped
/// Waiting ──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Waiting,
    Running,
    Done,
    Failed,
    Timeout,
    Cancelled,
    Stopped,
}

impl TaskStatus {
    /// Stable snake_case label.
    pub fn as_label(self) -> &'static str {
        match self {
            TaskStatus::Waiting => "waiting",
            TaskStatus::Running => "running",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
            TaskStatus::Timeout => "timeout",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
