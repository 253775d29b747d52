//! # Demo: pipeline
//!
//! Runs a flat batch of shell commands on two worker slots with retries and
//! a timeout, logging every event through `tracing`, and prints a summary.
//!
//! ## Flow
//! ```text
//! set_tasks([...]) ──► run()
//!     ├─► BeforeRunTask / AfterRunTask per attempt
//!     ├─► TaskError + TaskRetry for `flaky` and `broken`
//!     ├─► TaskTimeout for `slow`
//!     └─► AllDone
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=procvisor=debug cargo run --example pipeline
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use procvisor::{Config, Event, EventKind, JitterPolicy, LogWriter, Scheduler, Subscribe, TaskSpec};

/// Prints the final output of every finished run.
struct Summary;

#[async_trait]
impl Subscribe for Summary {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::TaskDone => println!(
                "[done]  #{} {} -> {}",
                ev.task.unwrap_or_default(),
                ev.command.as_deref().unwrap_or("?"),
                ev.stdout.as_deref().unwrap_or("").trim()
            ),
            EventKind::TaskError => println!(
                "[fail]  #{} {} ({})",
                ev.task.unwrap_or_default(),
                ev.command.as_deref().unwrap_or("?"),
                ev.reason.as_deref().unwrap_or("unknown")
            ),
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "summary"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("procvisor=info")),
        )
        .with_target(false)
        .init();

    let mut cfg = Config::default();
    cfg.threads = 2;
    cfg.max_retries = 2;
    cfg.global_retry_limit = 10;
    cfg.retry_delay = Duration::from_millis(200);
    cfg.retry_jitter = JitterPolicy::Equal;
    cfg.timeout = Duration::from_secs(3);

    let sched = Scheduler::builder(cfg)
        .with_subscriber(Arc::new(LogWriter::new()))
        .with_subscriber(Arc::new(Summary))
        .build();
    sched.stop_on_shutdown_signal();

    let marker = std::env::temp_dir().join(format!("procvisor-flaky-{}", std::process::id()));
    let flaky = format!(
        "if [ -e {m} ]; then echo recovered; else touch {m}; exit 1; fi",
        m = marker.display()
    );

    sched
        .set_tasks(vec![
            TaskSpec::new("echo", ["hello"]),
            TaskSpec::builder("sh").args(["-c", flaky.as_str()]).build(),
            TaskSpec::builder("sh")
                .args(["-c", "echo partial; exit 7"])
                .build(),
            TaskSpec::builder("sleep")
                .arg("10")
                .timeout(Duration::from_millis(500))
                .build(),
            TaskSpec::builder("sh")
                .args(["-c", "echo $GREETING from $PWD"])
                .env("GREETING", "hi")
                .cwd(std::env::temp_dir())
                .build(),
        ])
        .await?;

    let end = sched.run().await?;
    let _ = std::fs::remove_file(&marker);

    let snap = sched.status().await?;
    println!("finished with {:?}", end.kind);
    for (i, status) in snap.statuses.iter().enumerate() {
        println!("  #{i}: {status} (retries: {})", snap.retries[i]);
    }
    println!("global retries used: {}", snap.global_retries);
    Ok(())
}
