//! # Process task specification.
//!
//! Defines [`TaskSpec`]: the command, arguments, [`ExecOptions`], an optional
//! per-task timeout override and opaque caller metadata.
//!
//! A spec can be created:
//! - **Explicitly** with [`TaskSpec::new`]
//! - **Fluently** with [`TaskSpec::builder`]
//!
//! ## Rules
//! - A spec is immutable once installed; cancellation removes it from the
//!   registry instead of changing it.
//! - The metadata is never inspected, only echoed on every event about the task.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use crate::tasks::options::ExecOptions;

/// Opaque caller data attached to a task and echoed on its events.
pub type TaskMeta = Arc<dyn Any + Send + Sync>;

/// Specification of one external process run.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use procvisor::TaskSpec;
///
/// let spec = TaskSpec::builder("sh")
///     .args(["-c", "echo hello"])
///     .env("GREETING", "hi")
///     .timeout(Duration::from_secs(5))
///     .build();
///
/// assert_eq!(spec.command(), "sh");
/// assert_eq!(spec.timeout(), Some(Duration::from_secs(5)));
/// ```
#[derive(Clone)]
pub struct TaskSpec {
    command: String,
    args: Vec<String>,
    options: ExecOptions,
    timeout: Option<Duration>,
    meta: Option<TaskMeta>,
}

impl TaskSpec {
    /// Creates a spec with default options, no timeout override and no metadata.
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            options: ExecOptions::default(),
            timeout: None,
            meta: None,
        }
    }

    /// Creates a builder for constructing a spec with fluent API.
    pub fn builder(command: impl Into<String>) -> TaskSpecBuilder {
        TaskSpecBuilder::new(command)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn options(&self) -> &ExecOptions {
        &self.options
    }

    /// Returns the per-task timeout override, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn meta(&self) -> Option<&TaskMeta> {
        self.meta.as_ref()
    }

    /// Human-readable command line (`command arg1 arg2`), used in events and logs.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }

    /// Returns a new spec with updated timeout override.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns a new spec with updated execution options.
    pub fn with_options(mut self, options: ExecOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns a new spec carrying `meta`.
    pub fn with_meta(mut self, meta: TaskMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// Builder for [`TaskSpec`].
#[derive(Clone)]
pub struct TaskSpecBuilder {
    spec: TaskSpec,
}

impl TaskSpecBuilder {
    /// Creates a new builder for the given program.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            spec: TaskSpec::new(command, Vec::<String>::new()),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.spec.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.spec.options.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.options.env.push((key.into(), value.into()));
        self
    }

    pub fn options(mut self, options: ExecOptions) -> Self {
        self.spec.options = options;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.spec.timeout = Some(timeout);
        self
    }

    /// Attaches opaque metadata.
    pub fn meta<T: Any + Send + Sync>(mut self, meta: T) -> Self {
        self.spec.meta = Some(Arc::new(meta));
        self
    }

    pub fn build(self) -> TaskSpec {
        self.spec
    }
}
