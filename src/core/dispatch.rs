//! # Flat-mode dispatch and the shared tick.
//!
//! ```text
//! tick()
//!   ├─ not processing           ─► return
//!   ├─ not paused:
//!   │    ├─ promote due retries ─► eligible again
//!   │    └─ Flat:  fill idle slots, lowest eligible index first
//!   │       Lanes: advance every lane (see lanes.rs)
//!   ├─ any run in flight        ─► TasksRunning { snapshot }
//!   └─ not paused, all processed ─► AllDone { total }
//! ```
//!
//! A task is eligible when it has a spec (not cancelled), is not in flight,
//! not completed and not waiting for a retry delay.

use crate::core::config::LogLevel;
use crate::core::runtime::{InFlight, Mode, Runtime};
use crate::events::{Event, EventKind};
use crate::process;
use crate::tasks::TaskStatus;

use tokio::time::Instant;

impl Runtime {
    pub(super) async fn tick(&mut self) {
        if !self.processing {
            return;
        }
        if !self.paused {
            self.promote_retries();
            match self.mode {
                Mode::Flat => self.dispatch_flat().await,
                Mode::Lanes => self.advance_lanes().await,
            }
        }

        if self.in_flight.iter().any(Option::is_some) {
            self.emit(Event::new(EventKind::TasksRunning).with_snapshot(self.snapshot()))
                .await;
        }

        if !self.paused && self.finished() {
            self.finish().await;
        }
    }

    /// Earliest instant at which a pending retry becomes eligible.
    pub(super) fn next_retry_due(&self) -> Option<Instant> {
        self.pending.iter().map(|p| p.due).min()
    }

    fn promote_retries(&mut self) {
        let now = Instant::now();
        self.pending.retain(|p| p.due > now);
    }

    async fn dispatch_flat(&mut self) {
        for slot in 0..self.slots.len() {
            if self.slots[slot].is_some() {
                continue;
            }
            let Some(index) = self.next_eligible() else {
                break;
            };
            self.run_task(index, Some(slot)).await;
        }
    }

    fn next_eligible(&self) -> Option<usize> {
        (0..self.table.len()).find(|&i| self.is_eligible(i))
    }

    pub(super) fn is_eligible(&self, index: usize) -> bool {
        self.table.spec(index).is_some()
            && self.in_flight[index].is_none()
            && !self.completed[index]
            && !self.pending.iter().any(|p| p.index == index)
    }

    /// Marks the task running, fires `BeforeRunTask`, spawns the process and arms its deadline.
    pub(super) async fn run_task(&mut self, index: usize, slot: Option<usize>) {
        let Some(spec) = self.table.spec(index).cloned() else {
            return;
        };
        if let Some(slot) = slot {
            self.slots[slot] = Some(index);
        }
        self.table.set_status(index, TaskStatus::Running);

        self.next_run += 1;
        let run = self.next_run;
        let attempt = self.retry.retries(index) + 1;

        let mut ev = self
            .task_event(EventKind::BeforeRunTask, index)
            .with_attempt(attempt);
        if let Some(slot) = slot {
            ev = ev.with_slot(slot);
        }
        self.emit(ev).await;

        let handle = process::launch(index, run, &spec, self.proc_tx.clone());
        let pid = handle.pid();
        let timeout = spec
            .timeout()
            .filter(|d| !d.is_zero())
            .or_else(|| self.cfg.default_timeout());
        let deadline = timeout.map(|d| self.deadlines.insert((index, run), d));

        self.in_flight[index] = Some(InFlight {
            run,
            handle,
            slot,
            deadline,
            timeout,
            timed_out: false,
        });
        self.log(
            LogLevel::Debug,
            format!("task {index} started: run={run} attempt={attempt} pid={pid:?}"),
        )
        .await;
    }

    fn finished(&self) -> bool {
        match self.mode {
            Mode::Flat => self.completed.iter().all(|c| *c),
            Mode::Lanes => self.lanes.iter().all(|lane| lane.done),
        }
    }

    async fn finish(&mut self) {
        self.processing = false;
        let total = self.run_total();
        self.log(LogLevel::Info, format!("all done: {total}")).await;
        self.emit(Event::new(EventKind::AllDone).with_total(total))
            .await;
    }
}
