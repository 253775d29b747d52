//! # Retry policy and retry bookkeeping.
//!
//! [`RetryPolicy`] holds the immutable limits; [`RetryState`] holds the
//! counters for one installed task set and turns every failure into a
//! [`RetryDecision`].
//!
//! ## Decision order
//! ```text
//! failure(i)
//!   ├─ retries[i] >= max_retries       ─► Exhausted      (permanent failure)
//!   ├─ global >= global_limit (> 0)    ─► BudgetExceeded (halt dispatch)
//!   └─ retries[i] += 1, global += 1    ─► Retry { attempt, delay }
//! ```
//!
//! A task that always fails with `max_retries = 2` therefore runs three times
//! and consumes exactly two units of the global budget.

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Immutable retry limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed per task (`0` = never retry).
    pub max_retries: u32,
    /// Retries allowed across all tasks (`0` = unlimited).
    pub global_limit: usize,
    /// Delay before a failed task becomes eligible again.
    pub delay: Duration,
    /// Randomization applied to `delay`.
    pub jitter: JitterPolicy,
}

impl Default for RetryPolicy {
    /// No retries, unlimited budget, 1s delay, no jitter.
    fn default() -> Self {
        Self {
            max_retries: 0,
            global_limit: 0,
            delay: Duration::from_secs(1),
            jitter: JitterPolicy::None,
        }
    }
}

impl RetryPolicy {
    /// Returns the global ceiling as an `Option` (`None` = unlimited).
    #[inline]
    pub fn budget(&self) -> Option<usize> {
        match self.global_limit {
            0 => None,
            n => Some(n),
        }
    }

    /// Delay for the next retry with jitter applied.
    pub fn next_delay(&self) -> Duration {
        self.jitter.apply(self.delay)
    }
}

/// Outcome of feeding one failure into [`RetryState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Requeue the task after `delay`; `attempt` is the retry number (1-based).
    Retry { attempt: u32, delay: Duration },
    /// Per-task limit reached: the task stays failed.
    Exhausted,
    /// Global ceiling reached: the scheduler must halt dispatch.
    BudgetExceeded { limit: usize },
}

/// Per-task and global retry counters.
#[derive(Debug, Default)]
pub(crate) struct RetryState {
    retries: Vec<u32>,
    global: usize,
}

impl RetryState {
    pub fn new(tasks: usize) -> Self {
        Self {
            retries: vec![0; tasks],
            global: 0,
        }
    }

    /// Applies the policy to a failure of task `index`.
    pub fn on_failure(&mut self, index: usize, policy: &RetryPolicy) -> RetryDecision {
        let Some(count) = self.retries.get_mut(index) else {
            return RetryDecision::Exhausted;
        };
        if *count >= policy.max_retries {
            return RetryDecision::Exhausted;
        }
        if let Some(limit) = policy.budget()
            && self.global >= limit
        {
            return RetryDecision::BudgetExceeded { limit };
        }

        *count += 1;
        self.global += 1;
        RetryDecision::Retry {
            attempt: *count,
            delay: policy.next_delay(),
        }
    }

    pub fn retries(&self, index: usize) -> u32 {
        self.retries.get(index).copied().unwrap_or(0)
    }

    pub fn global(&self) -> usize {
        self.global
    }

    /// Owned copy of the per-task counters.
    pub fn per_task(&self) -> Vec<u32> {
        self.retries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_retries: u32, global_limit: usize) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            global_limit,
            delay: Duration::from_millis(10),
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn zero_max_retries_never_retries() {
        let mut state = RetryState::new(1);
        assert_eq!(state.on_failure(0, &policy(0, 0)), RetryDecision::Exhausted);
        assert_eq!(state.global(), 0);
    }

    #[test]
    fn two_retries_then_exhausted() {
        let p = policy(2, 0);
        let mut state = RetryState::new(1);
        assert_eq!(
            state.on_failure(0, &p),
            RetryDecision::Retry { attempt: 1, delay: Duration::from_millis(10) }
        );
        assert_eq!(
            state.on_failure(0, &p),
            RetryDecision::Retry { attempt: 2, delay: Duration::from_millis(10) }
        );
        assert_eq!(state.on_failure(0, &p), RetryDecision::Exhausted);
        assert_eq!(state.retries(0), 2);
        assert_eq!(state.global(), 2);
    }

    #[test]
    fn global_budget_is_shared() {
        let p = policy(5, 2);
        let mut state = RetryState::new(3);
        assert!(matches!(state.on_failure(0, &p), RetryDecision::Retry { .. }));
        assert!(matches!(state.on_failure(1, &p), RetryDecision::Retry { .. }));
        assert_eq!(
            state.on_failure(2, &p),
            RetryDecision::BudgetExceeded { limit: 2 }
        );
        assert_eq!(state.global(), 2);
        assert_eq!(state.per_task(), vec![1, 1, 0]);
    }

    #[test]
    fn per_task_limit_wins_over_budget() {
        let p = policy(1, 1);
        let mut state = RetryState::new(1);
        assert!(matches!(state.on_failure(0, &p), RetryDecision::Retry { .. }));
        assert_eq!(state.on_failure(0, &p), RetryDecision::Exhausted);
    }

    #[test]
    fn unknown_index_is_exhausted() {
        let mut state = RetryState::new(0);
        assert_eq!(state.on_failure(3, &policy(3, 0)), RetryDecision::Exhausted);
    }
}
