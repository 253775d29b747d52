//! # Event subscriber trait.
//!
//! Provides [`Subscribe`] the extension point for lifecycle hooks. One method
//! receives every typed [`Event`]; match on [`EventKind`](crate::EventKind) for
//! the hooks you care about.
//!
//! ## Rules
//! - The runtime **awaits** `on_event` before it continues, so a hook may
//!   finish deferred work (flush a file, notify a service) and the scheduler
//!   waits for it. Keep hooks short: while one runs, nothing is dispatched.
//! - Subscribers are called in registration order, events in `seq` order.
//! - Panics are caught and reported as `EventKind::SubscriberPanicked`.
//! - Hooks must not keep or close process handles; they only see event data.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use procvisor::{Event, EventKind, Subscribe};
//!
//! struct Failures;
//!
//! #[async_trait]
//! impl Subscribe for Failures {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::TaskError {
//!             eprintln!("task {:?} failed: {:?}", ev.task, ev.stderr);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failures" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Lifecycle hook sink.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles a single event. Awaited by the runtime.
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name used in panic reports.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
