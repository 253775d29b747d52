//! # Execution options for one process.
//!
//! [`ExecOptions`] carries everything besides command and arguments that shapes
//! how the process is started: working directory, environment and the
//! configuration of its three standard streams.

use std::path::PathBuf;
use std::process::Stdio;

/// How one standard stream of the child is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Captured by the scheduler: chunks are streamed as events and the full
    /// text is reported when the process closes.
    Piped,
    /// Shared with the scheduler's own process.
    Inherit,
    /// Connected to the null device.
    Null,
}

impl StreamMode {
    pub(crate) fn stdio(self) -> Stdio {
        match self {
            StreamMode::Piped => Stdio::piped(),
            StreamMode::Inherit => Stdio::inherit(),
            StreamMode::Null => Stdio::null(),
        }
    }
}

/// Process execution options.
///
/// Defaults: inherit the scheduler's working directory and environment,
/// stdin from `/dev/null`, stdout and stderr piped.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Working directory (`None` = inherit).
    pub cwd: Option<PathBuf>,
    /// Extra environment entries, applied in order.
    pub env: Vec<(String, String)>,
    /// Start from an empty environment before applying `env`.
    pub clear_env: bool,
    pub stdin: StreamMode,
    pub stdout: StreamMode,
    pub stderr: StreamMode,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            env: Vec::new(),
            clear_env: false,
            stdin: StreamMode::Null,
            stdout: StreamMode::Piped,
            stderr: StreamMode::Piped,
        }
    }
}
