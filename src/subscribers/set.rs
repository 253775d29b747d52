//! # Awaited event delivery to multiple subscribers.
//!
//! Provides [`SubscriberSet`] — hands each event to every subscriber in turn,
//! awaiting each one, then publishes the event on the [`Bus`].
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     ├──► subscriber1.on_event().await ── panic → SubscriberPanicked (bus)
//!     ├──► subscriber2.on_event().await
//!     ├──► subscriberN.on_event().await
//!     └──► bus.publish(event)
//! ```
//!
//! ## Panic handling
//! Each call is wrapped in `catch_unwind`: the panic is converted into a
//! `SubscriberPanicked` event on the bus and delivery continues.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a subscriber uses `Arc<Mutex<T>>` and panics while holding the lock.

use std::sync::Arc;

use futures::FutureExt;

use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// Ordered set of subscribers plus the broadcast bus.
pub struct SubscriberSet {
    subs: Vec<Arc<dyn Subscribe>>,
    bus: Bus,
}

impl SubscriberSet {
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        Self { subs, bus }
    }

    /// Delivers `event` to every subscriber (awaiting each), then broadcasts it.
    pub async fn emit(&self, event: Event) {
        for sub in &self.subs {
            let fut = sub.on_event(&event);
            if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                let info = {
                    let any = &*panic_err;
                    if let Some(msg) = any.downcast_ref::<&'static str>() {
                        (*msg).to_string()
                    } else if let Some(msg) = any.downcast_ref::<String>() {
                        msg.clone()
                    } else {
                        "unknown panic".to_string()
                    }
                };
                self.bus.publish(Event::subscriber_panicked(sub.name(), info));
            }
        }
        self.bus.publish(event);
    }
}
