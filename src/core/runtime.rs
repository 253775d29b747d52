//! # Runtime: the single owner of scheduling state.
//!
//! One `Runtime` per [`Scheduler`](super::Scheduler), running as one tokio
//! task. Every table (slots, in-flight runs, completed flags, pending retries,
//! statuses, retry counters, deadline timers) is mutated only here, so no
//! lock guards any of it.
//!
//! ## Event loop
//! ```text
//! loop select {
//!   command from a handle      ─► handle_command (install/start/pause/stop/...)
//!   process chunk / close      ─► outcome::on_chunk / on_close, then tick()
//!   deadline expired           ─► outcome::on_deadline (status Timeout, kill)
//!   earliest retry due         ─► tick()
//!   poll interval (processing) ─► tick()
//! }
//! all handles dropped ─► kill remaining processes, exit
//! ```
//!
//! ## Rules
//! - Every mutation checks before it mutates: a close for a run id that is no
//!   longer tracked is ignored, a slot is only released by the task holding it.
//! - Subscribers are awaited inside the loop; a hook that awaits a call on the
//!   same `Scheduler` deadlocks. Spawn such calls instead.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::time::{DelayQueue, delay_queue};

use crate::core::{
    command::Command,
    config::{Config, LogLevel},
    lanes::Lane,
};
use crate::error::{RuntimeError, TaskError};
use crate::events::{Event, EventKind};
use crate::policies::{RetryPolicy, RetryState};
use crate::process::{KillSignal, ProcessHandle, ProcessMsg};
use crate::subscribers::SubscriberSet;
use crate::tasks::{StatusSnapshot, TaskStatus, TaskTable};

/// Execution mode selected by the installed task set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Mode {
    Flat,
    Lanes,
}

/// One live run of a task.
pub(super) struct InFlight {
    pub run: u64,
    pub handle: ProcessHandle,
    /// Worker slot (flat mode only).
    pub slot: Option<usize>,
    pub deadline: Option<delay_queue::Key>,
    pub timeout: Option<Duration>,
    pub timed_out: bool,
}

/// A failed task waiting for its retry delay.
#[derive(Debug, Clone, Copy)]
pub(super) struct PendingRetry {
    pub index: usize,
    pub due: Instant,
}

pub(crate) struct Runtime {
    pub(super) cfg: Config,
    pub(super) policy: RetryPolicy,
    pub(super) subs: SubscriberSet,

    pub(super) table: TaskTable,
    pub(super) retry: RetryState,
    pub(super) slots: Vec<Option<usize>>,
    pub(super) in_flight: Vec<Option<InFlight>>,
    pub(super) completed: Vec<bool>,
    pub(super) pending: Vec<PendingRetry>,
    pub(super) lanes: Vec<Lane>,
    pub(super) deadlines: DelayQueue<(usize, u64)>,

    pub(super) mode: Mode,
    pub(super) processing: bool,
    pub(super) paused: bool,
    pub(super) halted: bool,

    pub(super) next_run: u64,
    pub(super) proc_tx: mpsc::Sender<ProcessMsg>,
}

impl Runtime {
    pub(crate) fn new(cfg: Config, subs: SubscriberSet, proc_tx: mpsc::Sender<ProcessMsg>) -> Self {
        let policy = cfg.retry_policy();
        let slots = vec![None; cfg.slots()];
        Self {
            cfg,
            policy,
            subs,
            table: TaskTable::default(),
            retry: RetryState::default(),
            slots,
            in_flight: Vec::new(),
            completed: Vec::new(),
            pending: Vec::new(),
            lanes: Vec::new(),
            deadlines: DelayQueue::new(),
            mode: Mode::Flat,
            processing: false,
            paused: false,
            halted: false,
            next_run: 0,
            proc_tx,
        }
    }

    /// Drives the runtime until every handle is dropped.
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut processes: mpsc::Receiver<ProcessMsg>,
    ) {
        let mut ticker = time::interval(self.cfg.poll_interval_clamped());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let retry_due = self.next_retry_due();
            let retry_armed = retry_due.is_some() && self.processing && !self.paused;

            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => break,
                },
                Some(msg) = processes.recv() => self.handle_process(msg).await,
                Some(expired) = self.deadlines.next(), if !self.deadlines.is_empty() => {
                    let (index, run) = expired.into_inner();
                    self.on_deadline(index, run).await;
                }
                _ = time::sleep_until(retry_due.unwrap_or_else(Instant::now)), if retry_armed => {
                    self.tick().await;
                }
                _ = ticker.tick(), if self.processing => self.tick().await,
            }
        }

        self.kill_all(self.cfg.kill_signal);
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::SetTasks { specs, reply } => {
                let res = self.install(TaskTable::flat(specs)).await;
                let _ = reply.send(res);
            }
            Command::SetGroups { groups, reply } => {
                let res = self.install(TaskTable::grouped(groups)).await;
                let _ = reply.send(res);
            }
            Command::Start { reply } => {
                if self.processing {
                    let _ = reply.send(Err(RuntimeError::AlreadyRunning));
                    return;
                }
                self.start().await;
                let _ = reply.send(Ok(()));
                self.tick().await;
            }
            Command::Pause { reply } => {
                let res = self.pause().await;
                let _ = reply.send(res);
            }
            Command::Resume { reply } => {
                let res = self.resume().await;
                let _ = reply.send(res);
                self.tick().await;
            }
            Command::Stop { signal, reply } => {
                self.stop(signal).await;
                let _ = reply.send(Ok(()));
            }
            Command::StopTask {
                index,
                signal,
                reply,
            } => {
                let res = self.stop_task(index, signal).await;
                let _ = reply.send(res);
                self.tick().await;
            }
            Command::CancelTask { index, reply } => {
                let res = self.cancel_task(index).await;
                let _ = reply.send(res);
                self.tick().await;
            }
            Command::Destroy { signal, reply } => {
                self.destroy(signal).await;
                let _ = reply.send(Ok(()));
            }
            Command::Status { reply } => {
                let _ = reply.send(Ok(self.snapshot()));
            }
        }
    }

    async fn handle_process(&mut self, msg: ProcessMsg) {
        match msg {
            ProcessMsg::Chunk {
                task,
                run,
                stream,
                text,
            } => self.on_chunk(task, run, stream, text).await,
            ProcessMsg::Closed(exit) => {
                self.on_close(exit).await;
                self.tick().await;
            }
        }
    }

    // ---------------------------
    // Control operations
    // ---------------------------

    /// Replaces the task set and resets every table.
    async fn install(&mut self, table: TaskTable) -> Result<(), RuntimeError> {
        if self.processing {
            return Err(RuntimeError::AlreadyRunning);
        }
        // A halted run may still own processes; they would become untracked.
        self.kill_all(self.cfg.kill_signal);

        self.mode = match table.lanes() {
            Some(_) => Mode::Lanes,
            None => Mode::Flat,
        };
        self.lanes = table.lanes().map(Lane::from_groups).unwrap_or_default();
        self.retry = RetryState::new(table.len());
        self.table = table;
        self.reset_tables();
        self.paused = false;
        self.halted = false;

        let msg = match self.mode {
            Mode::Flat => format!("installed {} tasks", self.table.len()),
            Mode::Lanes => format!(
                "installed {} tasks in {} lanes",
                self.table.len(),
                self.lanes.len()
            ),
        };
        self.log(LogLevel::Debug, msg).await;
        Ok(())
    }

    async fn start(&mut self) {
        self.emit(Event::new(EventKind::BeforeStart)).await;

        self.processing = true;
        self.paused = false;
        self.halted = false;

        let total = self.run_total();
        self.emit(Event::new(EventKind::AfterStart).with_total(total))
            .await;
        let msg = match self.mode {
            Mode::Flat => format!("started {total} tasks on {} slots", self.slots.len()),
            Mode::Lanes => format!("started {total} lanes"),
        };
        self.log(LogLevel::Info, msg).await;
    }

    async fn pause(&mut self) -> Result<(), RuntimeError> {
        if !self.processing {
            return Err(RuntimeError::NotRunning);
        }
        if self.paused {
            return Ok(());
        }
        self.emit(Event::new(EventKind::BeforePause)).await;
        self.paused = true;
        self.emit(Event::new(EventKind::AfterPause)).await;
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), RuntimeError> {
        if !self.paused || !self.processing {
            return Err(RuntimeError::NotPaused);
        }
        self.emit(Event::new(EventKind::BeforeResume)).await;
        self.paused = false;
        self.emit(Event::new(EventKind::AfterResume)).await;
        Ok(())
    }

    async fn stop(&mut self, signal: Option<KillSignal>) {
        let signal = signal.unwrap_or(self.cfg.kill_signal);
        self.emit(Event::new(EventKind::BeforeStop)).await;

        self.processing = false;
        self.paused = false;
        self.halted = false;
        let killed = self.kill_all(signal);
        self.reset_tables();

        self.log(
            LogLevel::Info,
            format!("stopped; {killed} processes signalled with {signal}"),
        )
        .await;
        self.emit(Event::new(EventKind::AfterStop)).await;
    }

    async fn stop_task(
        &mut self,
        index: usize,
        signal: Option<KillSignal>,
    ) -> Result<bool, RuntimeError> {
        if !self.table.contains(index) {
            return Err(RuntimeError::UnknownTask { index });
        }
        let signal = signal.unwrap_or(self.cfg.kill_signal);
        self.emit(self.task_event(EventKind::BeforeStopTask, index))
            .await;

        let was_running = match self.in_flight[index].take() {
            Some(flight) => {
                flight.handle.kill(signal);
                if let Some(key) = flight.deadline {
                    self.deadlines.try_remove(&key);
                }
                if let Some(slot) = flight.slot {
                    self.release_slot(slot, index);
                }
                true
            }
            None => false,
        };
        self.pending.retain(|p| p.index != index);
        let was_completed = std::mem::replace(&mut self.completed[index], true);
        if was_running || !was_completed {
            self.table.set_status(index, TaskStatus::Stopped);
        }

        self.emit(
            self.task_event(EventKind::TaskStopped, index)
                .with_error(TaskError::Stopped),
        )
        .await;
        self.emit(self.task_event(EventKind::AfterStopTask, index))
            .await;
        Ok(was_running)
    }

    /// Cancels a task that has neither a live process nor a result in this run.
    async fn cancel_task(&mut self, index: usize) -> Result<bool, RuntimeError> {
        if !self.table.contains(index) {
            return Err(RuntimeError::UnknownTask { index });
        }
        if self.in_flight[index].is_some() {
            self.log(
                LogLevel::Debug,
                format!("cancel of running task {index} ignored; use stop_task"),
            )
            .await;
            return Ok(false);
        }
        if self.completed[index] {
            return Ok(false);
        }
        if !self.table.cancel(index) {
            return Ok(false);
        }
        self.pending.retain(|p| p.index != index);
        self.completed[index] = true;
        self.log(LogLevel::Info, format!("task {index} cancelled"))
            .await;
        Ok(true)
    }

    async fn destroy(&mut self, signal: Option<KillSignal>) {
        self.stop(signal).await;

        self.table = TaskTable::default();
        self.lanes.clear();
        self.mode = Mode::Flat;
        self.retry = RetryState::default();
        self.reset_tables();

        self.emit(Event::new(EventKind::Destroyed)).await;
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    /// Resets slots, in-flight, completed, pending retries, timers and lane cursors.
    fn reset_tables(&mut self) {
        let n = self.table.len();
        self.slots = vec![None; self.cfg.slots()];
        self.in_flight = std::iter::repeat_with(|| None).take(n).collect();
        // Cancelled tasks stay processed across stop/start.
        self.completed = (0..n).map(|i| self.table.spec(i).is_none()).collect();
        self.pending.clear();
        self.deadlines.clear();
        for lane in &mut self.lanes {
            lane.reset();
        }
    }

    /// Signals every tracked process and forgets it. Returns how many were signalled.
    fn kill_all(&mut self, signal: KillSignal) -> usize {
        let mut killed = 0;
        for (index, slot) in self.in_flight.iter_mut().enumerate() {
            if let Some(flight) = slot.take() {
                flight.handle.kill(signal);
                self.table.set_status(index, TaskStatus::Stopped);
                killed += 1;
            }
        }
        self.deadlines.clear();
        killed
    }

    /// Frees `slot` only if `index` still holds it.
    pub(super) fn release_slot(&mut self, slot: usize, index: usize) {
        if let Some(holder) = self.slots.get_mut(slot)
            && *holder == Some(index)
        {
            *holder = None;
        }
    }

    /// Tasks in flat mode, lanes in lane mode.
    pub(super) fn run_total(&self) -> usize {
        match self.mode {
            Mode::Flat => self.table.len(),
            Mode::Lanes => self.lanes.len(),
        }
    }

    pub(super) fn snapshot(&self) -> StatusSnapshot {
        let total = self.table.len();
        let running = self.in_flight.iter().filter(|f| f.is_some()).count();
        let done = self.completed.iter().filter(|c| **c).count();
        StatusSnapshot {
            total,
            running,
            done,
            waiting: total.saturating_sub(running + done),
            retries: self.retry.per_task(),
            global_retries: self.retry.global(),
            statuses: self.table.statuses(),
        }
    }

    /// Event about one task, with command, group and metadata filled in.
    pub(super) fn task_event(&self, kind: EventKind, index: usize) -> Event {
        let mut ev = Event::new(kind).with_task(index);
        if let Some(spec) = self.table.spec(index) {
            ev = ev
                .with_command(spec.display())
                .with_meta(spec.meta().cloned());
        }
        if let Some(group) = self.table.group_of(index) {
            ev = ev.with_group(group);
        }
        ev
    }

    pub(super) async fn emit(&self, ev: Event) {
        self.subs.emit(ev).await;
    }

    pub(super) async fn log(&self, level: LogLevel, message: impl Into<Arc<str>>) {
        if self.cfg.logs(level) {
            self.emit(Event::log(level, message)).await;
        }
    }
}
