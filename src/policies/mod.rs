//! Retry policies.
//!
//! This module groups the knobs that control **if** a failed process is run
//! again and **how long** it waits before becoming eligible.
//!
//! ## Contents
//! - [`RetryPolicy`]   per-task limit, global budget, delay
//! - [`JitterPolicy`]  randomization of the delay
//! - [`RetryDecision`] what the runtime must do with one failure
//!
//! ## Quick wiring
//! ```text
//! Config { max_retries, global_retry_limit, retry_delay, retry_jitter }
//!      └─► Config::retry_policy() ─► RetryPolicy
//!           └─► core::outcome feeds failures into RetryState::on_failure
//! ```

mod jitter;
mod retry;

pub use jitter::JitterPolicy;
pub use retry::{RetryDecision, RetryPolicy};

pub(crate) use retry::RetryState;
