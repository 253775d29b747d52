use std::sync::Arc;

use tokio::sync::mpsc;

use super::{runtime::Runtime, scheduler::Scheduler};
use crate::{
    core::Config,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Capacity of the channel carrying process output and exits to the runtime.
const PROCESS_CHANNEL_CAPACITY: usize = 256;

/// Builder for a [`Scheduler`] with optional subscribers.
pub struct SchedulerBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SchedulerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Replaces the subscriber list.
    ///
    /// Subscribers are awaited in order for every event, before it reaches the bus.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Appends one subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Spawns the runtime task and returns its handle.
    ///
    /// Must be called within a tokio runtime.
    pub fn build(self) -> Scheduler {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());

        let (cmd_tx, cmd_rx) = mpsc::channel(self.cfg.command_capacity.max(1));
        let (proc_tx, proc_rx) = mpsc::channel(PROCESS_CHANNEL_CAPACITY);

        let runtime = Runtime::new(self.cfg, subs, proc_tx);
        tokio::spawn(runtime.run(cmd_rx, proc_rx));

        Scheduler::from_parts(cmd_tx, bus)
    }
}
