//! Requests sent from [`Scheduler`](super::Scheduler) handles to the runtime.

use tokio::sync::oneshot;

use crate::error::RuntimeError;
use crate::process::KillSignal;
use crate::tasks::{StatusSnapshot, TaskSpec};

pub(crate) type Reply<T> = oneshot::Sender<Result<T, RuntimeError>>;

pub(crate) enum Command {
    SetTasks {
        specs: Vec<TaskSpec>,
        reply: Reply<()>,
    },
    SetGroups {
        groups: Vec<Vec<TaskSpec>>,
        reply: Reply<()>,
    },
    Start {
        reply: Reply<()>,
    },
    Pause {
        reply: Reply<()>,
    },
    Resume {
        reply: Reply<()>,
    },
    Stop {
        signal: Option<KillSignal>,
        reply: Reply<()>,
    },
    StopTask {
        index: usize,
        signal: Option<KillSignal>,
        reply: Reply<bool>,
    },
    CancelTask {
        index: usize,
        reply: Reply<bool>,
    },
    Destroy {
        signal: Option<KillSignal>,
        reply: Reply<()>,
    },
    Status {
        reply: Reply<StatusSnapshot>,
    },
}
