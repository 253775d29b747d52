//! # Task registry and status table.
//!
//! [`TaskTable`] holds the installed task set, either as a flat list or as
//! grouped lanes, together with one [`TaskStatus`] per task.
//!
//! ## Rules
//! - Every task owns one dense global index, in flat mode and in lane mode
//!   (lane `g` is the list of global indices of group `g`, in order).
//! - Installing a task set replaces everything; all statuses start `Waiting`.
//! - Cancelling nulls the spec permanently; the index keeps its status entry.

use crate::tasks::{spec::TaskSpec, status::TaskStatus};

/// Installed tasks plus per-task status.
#[derive(Default)]
pub(crate) struct TaskTable {
    specs: Vec<Option<TaskSpec>>,
    statuses: Vec<TaskStatus>,
    lanes: Option<Vec<Vec<usize>>>,
}

impl TaskTable {
    /// Flat task list.
    pub fn flat(specs: Vec<TaskSpec>) -> Self {
        let statuses = vec![TaskStatus::Waiting; specs.len()];
        Self {
            specs: specs.into_iter().map(Some).collect(),
            statuses,
            lanes: None,
        }
    }

    /// Grouped lanes; task indices are assigned group by group.
    pub fn grouped(groups: Vec<Vec<TaskSpec>>) -> Self {
        let mut specs = Vec::new();
        let mut lanes = Vec::with_capacity(groups.len());
        for group in groups {
            let mut lane = Vec::with_capacity(group.len());
            for spec in group {
                lane.push(specs.len());
                specs.push(Some(spec));
            }
            lanes.push(lane);
        }
        let statuses = vec![TaskStatus::Waiting; specs.len()];
        Self {
            specs,
            statuses,
            lanes: Some(lanes),
        }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.specs.len()
    }

    /// Returns the spec, or `None` for unknown or cancelled indices.
    pub fn spec(&self, index: usize) -> Option<&TaskSpec> {
        self.specs.get(index).and_then(Option::as_ref)
    }

    #[cfg(test)]
    pub fn status(&self, index: usize) -> Option<TaskStatus> {
        self.statuses.get(index).copied()
    }

    pub fn set_status(&mut self, index: usize, status: TaskStatus) {
        if let Some(slot) = self.statuses.get_mut(index) {
            *slot = status;
        }
    }

    /// Lanes of the grouped mode, `None` for a flat task list.
    pub fn lanes(&self) -> Option<&[Vec<usize>]> {
        self.lanes.as_deref()
    }

    /// Group index of a task in lane mode.
    pub fn group_of(&self, index: usize) -> Option<usize> {
        self.lanes
            .as_ref()?
            .iter()
            .position(|lane| lane.contains(&index))
    }

    /// Removes the spec and marks the task `Cancelled`.
    ///
    /// Returns `false` if the task was already cancelled.
    pub fn cancel(&mut self, index: usize) -> bool {
        match self.specs.get_mut(index) {
            Some(spec @ Some(_)) => {
                *spec = None;
                self.statuses[index] = TaskStatus::Cancelled;
                true
            }
            _ => false,
        }
    }

    /// Owned copy of all statuses.
    pub fn statuses(&self) -> Vec<TaskStatus> {
        self.statuses.clone()
    }
}

/// Point-in-time view of the scheduler, detached from internal state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    /// Number of installed tasks.
    pub total: usize,
    /// Tasks with a live process.
    pub running: usize,
    /// Tasks processed (completed set, including permanent failures and cancellations).
    pub done: usize,
    /// Tasks neither running nor processed.
    pub waiting: usize,
    /// Retries granted per task index.
    pub retries: Vec<u32>,
    /// Retries granted across all tasks.
    pub global_retries: usize,
    /// Status per task index.
    pub statuses: Vec<TaskStatus>,
}

impl StatusSnapshot {
    /// Status of one task, if the index exists.
    pub fn status(&self, index: usize) -> Option<TaskStatus> {
        self.statuses.get(index).copied()
    }

    /// Number of tasks with the given status.
    pub fn count(&self, status: TaskStatus) -> usize {
        self.statuses.iter().filter(|s| **s == status).count()
    }
}
