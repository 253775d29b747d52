//! # Event subscribers for the procvisor runtime.
//!
//! This module provides the [`Subscribe`] trait (the lifecycle hook sink), the
//! [`SubscriberSet`] that delivers events to subscribers, and the built-in
//! [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Runtime ── emit(Event) ──► SubscriberSet
//!                               ├──► sub1.on_event().await
//!                               ├──► sub2.on_event().await
//!                               └──► Bus ──► Scheduler::subscribe() receivers
//! ```

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
