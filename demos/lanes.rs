//! # Demo: lanes
//!
//! Three build "lanes" run side by side; inside a lane every step waits for
//! the previous one. A paused scheduler holds the next steps until resumed.
//!
//! ## Run
//! ```bash
//! cargo run --example lanes
//! ```

use std::sync::Arc;
use std::time::Duration;

use procvisor::{Config, EventKind, LogWriter, Scheduler, TaskSpec};

fn step(lane: &str, name: &str, secs: f32) -> TaskSpec {
    let script = format!("sleep {secs}; echo {lane}:{name}");
    TaskSpec::builder("sh")
        .args(["-c", script.as_str()])
        .meta(format!("{lane}/{name}"))
        .build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("procvisor=info")),
        )
        .init();

    let sched = Scheduler::builder(Config::default())
        .with_subscriber(Arc::new(LogWriter::new()))
        .build();

    sched
        .set_groups(vec![
            vec![step("api", "fetch", 0.2), step("api", "build", 0.4), step("api", "test", 0.2)],
            vec![step("web", "fetch", 0.1), step("web", "bundle", 0.6)],
            vec![step("docs", "render", 0.3)],
        ])
        .await?;

    let mut rx = sched.subscribe();
    sched.start().await?;

    tokio::time::sleep(Duration::from_millis(250)).await;
    sched.pause().await?;
    println!("paused: {:?}", sched.status().await?.statuses);
    tokio::time::sleep(Duration::from_millis(500)).await;
    sched.resume().await?;

    while let Ok(ev) = rx.recv().await {
        match ev.kind {
            EventKind::TaskDone => {
                let label = ev
                    .meta
                    .as_ref()
                    .and_then(|m| m.downcast_ref::<String>())
                    .cloned()
                    .unwrap_or_default();
                println!("step {label} done");
            }
            EventKind::GroupDone => println!("lane {} finished", ev.group.unwrap_or_default()),
            EventKind::AllDone => break,
            _ => {}
        }
    }

    println!("final: {:?}", sched.status().await?.statuses);
    Ok(())
}
