//! # Scheduler: the public handle.
//!
//! [`Scheduler`] is a cheap, cloneable handle. Every method sends one
//! [`Command`] to the runtime task and awaits its reply, so calls from
//! different tasks are serialized by the runtime's mailbox.
//!
//! ```text
//! Scheduler ──(mpsc Command + oneshot reply)──► Runtime
//!     ▲                                            │
//!     └────────── Bus::subscribe() ◄── events ─────┘
//! ```
//!
//! ## Rules
//! - Subscriber hooks run inside the runtime. A hook must not await a method
//!   of the same scheduler; `tokio::spawn` the call instead.
//! - When the last handle is dropped the runtime kills every remaining process
//!   with the configured signal and exits.

use std::future::Future;

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::core::{
    builder::SchedulerBuilder,
    command::{Command, Reply},
    config::Config,
    shutdown,
};
use crate::error::RuntimeError;
use crate::events::{Bus, Event};
use crate::process::KillSignal;
use crate::tasks::{StatusSnapshot, TaskSpec};

/// Handle to a running scheduler runtime.
///
/// Build one with [`Scheduler::new`] or [`Scheduler::builder`]; both must be
/// called inside a tokio runtime.
#[derive(Clone)]
pub struct Scheduler {
    tx: mpsc::Sender<Command>,
    bus: Bus,
}

impl Scheduler {
    pub(crate) fn from_parts(tx: mpsc::Sender<Command>, bus: Bus) -> Self {
        Self { tx, bus }
    }

    /// Builder for a scheduler with subscribers.
    pub fn builder(cfg: Config) -> SchedulerBuilder {
        SchedulerBuilder::new(cfg)
    }

    /// Scheduler without subscribers; observe it through [`Scheduler::subscribe`].
    pub fn new(cfg: Config) -> Self {
        SchedulerBuilder::new(cfg).build()
    }

    /// Installs a flat task list, replacing any previous set.
    ///
    /// Fails with [`RuntimeError::AlreadyRunning`] while processing.
    pub async fn set_tasks(&self, specs: Vec<TaskSpec>) -> Result<(), RuntimeError> {
        self.request(|reply| Command::SetTasks { specs, reply }).await
    }

    /// Installs grouped lanes. Each inner list runs sequentially; lanes run in parallel.
    ///
    /// Tasks are indexed globally, group by group: `[[a, b], [c]]` gives `a=0, b=1, c=2`.
    pub async fn set_groups(&self, groups: Vec<Vec<TaskSpec>>) -> Result<(), RuntimeError> {
        self.request(|reply| Command::SetGroups { groups, reply }).await
    }

    /// Begins processing the installed tasks.
    pub async fn start(&self) -> Result<(), RuntimeError> {
        self.request(|reply| Command::Start { reply }).await
    }

    /// Stops dispatching new tasks; running processes continue.
    pub async fn pause(&self) -> Result<(), RuntimeError> {
        self.request(|reply| Command::Pause { reply }).await
    }

    /// Continues dispatching after [`Scheduler::pause`].
    pub async fn resume(&self) -> Result<(), RuntimeError> {
        self.request(|reply| Command::Resume { reply }).await
    }

    /// Kills every running process (default: the configured signal) and resets run state.
    pub async fn stop(&self, signal: Option<KillSignal>) -> Result<(), RuntimeError> {
        self.request(|reply| Command::Stop { signal, reply }).await
    }

    /// Stops one task. Returns whether a process was running.
    ///
    /// The task is treated as processed and is not retried.
    pub async fn stop_task(
        &self,
        index: usize,
        signal: Option<KillSignal>,
    ) -> Result<bool, RuntimeError> {
        self.request(|reply| Command::StopTask {
            index,
            signal,
            reply,
        })
        .await
    }

    /// Cancels a task that is neither running nor already processed in this run.
    ///
    /// Returns `false`, leaving the status untouched, for a running task, a task
    /// that already finished (done, failed or stopped) and an already cancelled one.
    pub async fn cancel_task(&self, index: usize) -> Result<bool, RuntimeError> {
        self.request(|reply| Command::CancelTask { index, reply })
            .await
    }

    /// Stops everything and clears the task set.
    pub async fn destroy(&self, signal: Option<KillSignal>) -> Result<(), RuntimeError> {
        self.request(|reply| Command::Destroy { signal, reply })
            .await
    }

    /// Point-in-time copy of statuses and counters.
    pub async fn status(&self) -> Result<StatusSnapshot, RuntimeError> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// Receiver for every event the runtime emits (after subscribers saw it).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Starts processing and waits for the run to end.
    ///
    /// Returns the terminal event: `AllDone`, `Halted`, `AfterStop` or `Destroyed`.
    pub async fn run(&self) -> Result<Event, RuntimeError> {
        let mut rx = self.subscribe();
        self.start().await?;
        loop {
            match rx.recv().await {
                Ok(ev) if ev.is_terminal() => return Ok(ev),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return Err(RuntimeError::Closed),
            }
        }
    }

    /// Spawns a watcher that stops the scheduler on SIGINT, SIGTERM or SIGQUIT (Ctrl-C elsewhere).
    pub fn stop_on_shutdown_signal(&self) -> tokio::task::JoinHandle<()> {
        let sched = self.clone();
        tokio::spawn(async move {
            match shutdown::wait_for_shutdown_signal().await {
                Ok(name) => {
                    tracing::info!(target: "procvisor", signal = name, "shutdown signal received");
                    let _ = sched.stop(None).await;
                }
                Err(e) => {
                    tracing::warn!(target: "procvisor", error = %e, "cannot listen for shutdown signals");
                }
            }
        })
    }

    fn request<'a, T: 'a, F>(&'a self, make: F) -> impl Future<Output = Result<T, RuntimeError>> + 'a
    where
        F: FnOnce(Reply<T>) -> Command,
    {
        let (reply, rx) = oneshot::channel();
        let cmd = make(reply);
        async move {
            self.tx
                .send(cmd)
                .await
                .map_err(|_| RuntimeError::Closed)?;
            rx.await.map_err(|_| RuntimeError::Closed)?
        }
    }
}
