//! Runtime core: the scheduler handle and the actor behind it.
//!
//! The only public API from this module is [`Scheduler`], its
//! [`SchedulerBuilder`] and the [`Config`] they take.
//!
//! Internal modules:
//! - `runtime`: owns all state, runs the event loop and control operations;
//! - `dispatch`: the shared tick and flat-mode slot filling;
//! - `lanes`: sequential per-group runner;
//! - `outcome`: closes, deadlines, retries and halting;
//! - `command`: requests from handles to the runtime;
//! - `shutdown`: OS signal listener.

mod builder;
mod command;
mod config;
mod dispatch;
mod lanes;
mod outcome;
mod runtime;
mod scheduler;
mod shutdown;

pub use builder::SchedulerBuilder;
pub use config::{Config, LogLevel};
pub use scheduler::Scheduler;
