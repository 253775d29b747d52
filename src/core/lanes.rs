//! # Group pipeline runner.
//!
//! Every group is one lane. Lanes run concurrently and are not bounded by
//! the worker slots; inside a lane tasks run strictly one after another.
//!
//! ```text
//! lane g: [i0, i1, i2]      cursor ─► first task not yet processed
//!   current in flight or waiting for retry ─► Busy (wait for close)
//!   current processed or cancelled         ─► Skip (cursor += 1)
//!   current eligible                       ─► Run
//!   cursor past the end                    ─► GroupDone { g }
//! ```
//!
//! Lane tasks share the flat-mode deadline and retry policy: a retried task
//! re-runs in place and its lane does not advance until it is processed.

use crate::core::runtime::Runtime;
use crate::events::{Event, EventKind};

/// Sequential track of one group.
#[derive(Debug, Clone, Default)]
pub(crate) struct Lane {
    tasks: Vec<usize>,
    cursor: usize,
    pub(super) done: bool,
}

impl Lane {
    pub fn from_groups(groups: &[Vec<usize>]) -> Vec<Lane> {
        groups
            .iter()
            .map(|tasks| Lane {
                tasks: tasks.clone(),
                cursor: 0,
                done: false,
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.done = false;
    }

    fn current(&self) -> Option<usize> {
        self.tasks.get(self.cursor).copied()
    }
}

enum LaneStep {
    Busy,
    Skip,
    Run(usize),
    Finished,
}

impl Runtime {
    pub(super) async fn advance_lanes(&mut self) {
        for group in 0..self.lanes.len() {
            loop {
                match self.lane_step(group) {
                    None | Some(LaneStep::Busy) => break,
                    Some(LaneStep::Skip) => self.lanes[group].cursor += 1,
                    Some(LaneStep::Run(index)) => {
                        self.run_task(index, None).await;
                        break;
                    }
                    Some(LaneStep::Finished) => {
                        self.lanes[group].done = true;
                        self.emit(Event::new(EventKind::GroupDone).with_group(group)).await;
                        break;
                    }
                }
            }
        }
    }

    fn lane_step(&self, group: usize) -> Option<LaneStep> {
        let lane = &self.lanes[group];
        if lane.done {
            return None;
        }
        let Some(index) = lane.current() else {
            return Some(LaneStep::Finished);
        };
        if self.in_flight[index].is_some() || self.pending.iter().any(|p| p.index == index) {
            return Some(LaneStep::Busy);
        }
        if !self.is_eligible(index) {
            return Some(LaneStep::Skip);
        }
        Some(LaneStep::Run(index))
    }
}
