//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publisher**: the scheduler runtime only (hooks are awaited first, then
//!   the event is published on the bus).
//! - **Consumers**: [`Subscribe`](crate::Subscribe) implementations registered
//!   on the builder, and receivers from `Scheduler::subscribe()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
