#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use procvisor::{Config, Event, EventKind, Scheduler, Subscribe, TaskSpec};
use tokio::sync::broadcast;

/// Keeps every event it sees, in delivery order.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn of(&self, kind: EventKind) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.kind == kind)
            .collect()
    }

    pub fn count(&self, kind: EventKind, task: usize) -> usize {
        self.of(kind)
            .iter()
            .filter(|e| e.task == Some(task))
            .count()
    }

    /// Sequence number of the first `kind` event for `task`.
    pub fn first_seq(&self, kind: EventKind, task: usize) -> u64 {
        self.of(kind)
            .iter()
            .find(|e| e.task == Some(task))
            .map(|e| e.seq)
            .unwrap_or_else(|| panic!("no {kind:?} event for task {task}"))
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.events.lock().unwrap().push(ev.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

/// Config with short poll and retry delays.
pub fn fast_config() -> Config {
    let mut cfg = Config::default();
    cfg.poll_interval = Duration::from_millis(10);
    cfg.retry_delay = Duration::from_millis(10);
    cfg
}

pub fn scheduler(cfg: Config) -> (Scheduler, Arc<Recorder>) {
    let rec = Arc::new(Recorder::default());
    let sched = Scheduler::builder(cfg).with_subscriber(rec.clone()).build();
    (sched, rec)
}

pub fn sh(script: &str) -> TaskSpec {
    TaskSpec::new("sh", ["-c", script])
}

/// Runs to the terminal event, failing the test after 10 seconds.
pub async fn run(sched: &Scheduler) -> Event {
    tokio::time::timeout(Duration::from_secs(10), sched.run())
        .await
        .expect("run timed out")
        .expect("run failed")
}

/// Waits for the first bus event matching `pred`.
pub async fn wait_for<F>(rx: &mut broadcast::Receiver<Event>, pred: F) -> Event
where
    F: Fn(&Event) -> bool,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(ev) if pred(&ev) => return ev,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("bus closed"),
            }
        }
    })
    .await
    .expect("event not seen in time")
}

pub fn is(kind: EventKind, task: usize) -> impl Fn(&Event) -> bool {
    move |e| e.kind == kind && e.task == Some(task)
}
