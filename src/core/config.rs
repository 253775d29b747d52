//! # Scheduler configuration.
//!
//! Provides [`Config`] centralized settings for one scheduler instance.
//!
//! ## Sentinel values
//! - `threads = 0` → clamped to one worker slot
//! - `timeout = 0s` → no default deadline
//! - `global_retry_limit = 0` → unlimited retry budget
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::{
    policies::{JitterPolicy, RetryPolicy},
    process::KillSignal,
};

/// Verbosity of `EventKind::Log` events emitted by the runtime.
///
/// A message is emitted when its level is at or below the configured level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_label(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Configuration for one scheduler instance.
///
/// ## Field semantics
/// - `threads`: Worker slots in flat mode (lanes are not bounded by it)
/// - `poll_interval`: Flat-mode tick period; closes also wake the loop immediately
/// - `max_retries`: Retries per task (`0` = never)
/// - `timeout`: Default per-task deadline (`0s` = none); overridden by `TaskSpec::timeout`
/// - `kill_signal`: Signal used on timeout and when `stop*`/`destroy` get no explicit signal
/// - `global_retry_limit`: Retries across all tasks before dispatch halts (`0` = unlimited)
/// - `retry_delay` / `retry_jitter`: Wait before a failed task becomes eligible again
/// - `log_level`: Filter for `EventKind::Log`
/// - `bus_capacity`: Broadcast ring buffer size for `Scheduler::subscribe`
/// - `command_capacity`: Queue size between handles and the runtime
#[derive(Clone, Debug)]
pub struct Config {
    pub threads: usize,
    pub poll_interval: Duration,
    pub max_retries: u32,
    pub timeout: Duration,
    pub kill_signal: KillSignal,
    pub global_retry_limit: usize,
    pub retry_delay: Duration,
    pub retry_jitter: JitterPolicy,
    pub log_level: LogLevel,
    pub bus_capacity: usize,
    pub command_capacity: usize,
}

impl Config {
    /// Returns the number of worker slots (at least one).
    #[inline]
    pub fn slots(&self) -> usize {
        self.threads.max(1)
    }

    /// Returns the default per-task timeout as an `Option`.
    ///
    /// - `None` → no deadline
    /// - `Some(d)` → deadline armed per run
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Poll interval, never zero (a zero period would make the ticker panic).
    #[inline]
    pub fn poll_interval_clamped(&self) -> Duration {
        self.poll_interval.max(Duration::from_millis(1))
    }

    /// Bundles the retry-related fields.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            global_limit: self.global_retry_limit,
            delay: self.retry_delay,
            jitter: self.retry_jitter,
        }
    }

    /// True if a log message at `level` passes the filter.
    #[inline]
    pub fn logs(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level <= self.log_level
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `threads = 4`
    /// - `poll_interval = 100ms`
    /// - `max_retries = 0` (no retries)
    /// - `timeout = 0s` (no deadline)
    /// - `kill_signal = SIGTERM`
    /// - `global_retry_limit = 0` (unlimited)
    /// - `retry_delay = 1s`, no jitter
    /// - `log_level = Info`
    /// - `bus_capacity = 1024`, `command_capacity = 64`
    fn default() -> Self {
        Self {
            threads: 4,
            poll_interval: Duration::from_millis(100),
            max_retries: 0,
            timeout: Duration::ZERO,
            kill_signal: KillSignal::TERM,
            global_retry_limit: 0,
            retry_delay: Duration::from_secs(1),
            retry_jitter: JitterPolicy::None,
            log_level: LogLevel::Info,
            bus_capacity: 1024,
            command_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_resolved_by_accessors() {
        let cfg = Config {
            threads: 0,
            bus_capacity: 0,
            poll_interval: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(cfg.slots(), 1);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.default_timeout(), None);
        assert!(cfg.poll_interval_clamped() > Duration::ZERO);
    }

    #[test]
    fn retry_policy_mirrors_fields() {
        let cfg = Config {
            max_retries: 3,
            global_retry_limit: 10,
            retry_delay: Duration::from_millis(5),
            ..Config::default()
        };
        let p = cfg.retry_policy();
        assert_eq!(p.max_retries, 3);
        assert_eq!(p.budget(), Some(10));
        assert_eq!(p.delay, Duration::from_millis(5));
    }

    #[test]
    fn log_filter_respects_level() {
        let cfg = Config {
            log_level: LogLevel::Warn,
            ..Config::default()
        };
        assert!(cfg.logs(LogLevel::Error));
        assert!(cfg.logs(LogLevel::Warn));
        assert!(!cfg.logs(LogLevel::Info));

        let silent = Config {
            log_level: LogLevel::Off,
            ..Config::default()
        };
        assert!(!silent.logs(LogLevel::Error));
    }
}
