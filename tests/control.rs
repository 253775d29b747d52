#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{Recorder, fast_config, is, run, scheduler, sh, wait_for};
use procvisor::{Event, EventKind, KillSignal, RuntimeError, Scheduler, Subscribe, TaskStatus};

#[tokio::test]
async fn pause_holds_dispatch_until_resume() {
    let mut cfg = fast_config();
    cfg.threads = 1;
    let (sched, rec) = scheduler(cfg);
    let mut rx = sched.subscribe();

    sched
        .set_tasks(vec![sh("sleep 0.2"), sh("true")])
        .await
        .unwrap();
    sched.start().await.unwrap();
    wait_for(&mut rx, is(EventKind::BeforeRunTask, 0)).await;
    sched.pause().await.unwrap();
    sched.pause().await.unwrap();

    wait_for(&mut rx, is(EventKind::TaskDone, 0)).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    let snap = sched.status().await.unwrap();
    assert_eq!(snap.status(1), Some(TaskStatus::Waiting));
    assert_eq!(rec.count(EventKind::BeforeRunTask, 1), 0);

    sched.resume().await.unwrap();
    let end = wait_for(&mut rx, |e| e.kind == EventKind::AllDone).await;
    assert_eq!(end.total, Some(2));
    assert_eq!(rec.of(EventKind::AfterPause).len(), 1);
    assert_eq!(rec.of(EventKind::AfterResume).len(), 1);
}

#[tokio::test]
async fn control_calls_reject_invalid_states() {
    let (sched, _rec) = scheduler(fast_config());
    assert_eq!(sched.pause().await, Err(RuntimeError::NotRunning));
    assert_eq!(sched.resume().await, Err(RuntimeError::NotPaused));

    sched.set_tasks(vec![sh("sleep 1")]).await.unwrap();
    sched.start().await.unwrap();
    assert_eq!(sched.start().await, Err(RuntimeError::AlreadyRunning));
    assert_eq!(
        sched.set_tasks(Vec::new()).await,
        Err(RuntimeError::AlreadyRunning)
    );
    assert_eq!(sched.resume().await, Err(RuntimeError::NotPaused));
    assert_eq!(
        sched.stop_task(7, None).await,
        Err(RuntimeError::UnknownTask { index: 7 })
    );
    sched.stop(None).await.unwrap();
}

#[tokio::test]
async fn stop_kills_running_processes() {
    let mut cfg = fast_config();
    cfg.threads = 2;
    let (sched, rec) = scheduler(cfg);
    let mut rx = sched.subscribe();

    sched
        .set_tasks(vec![sh("sleep 5"), sh("sleep 5"), sh("sleep 5")])
        .await
        .unwrap();
    sched.start().await.unwrap();
    wait_for(&mut rx, is(EventKind::BeforeRunTask, 1)).await;

    sched.stop(Some(KillSignal::KILL)).await.unwrap();
    let snap = sched.status().await.unwrap();
    assert_eq!(snap.running, 0);
    assert_eq!(snap.status(0), Some(TaskStatus::Stopped));
    assert_eq!(snap.status(1), Some(TaskStatus::Stopped));
    assert_eq!(snap.status(2), Some(TaskStatus::Waiting));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rec.of(EventKind::AllDone).is_empty());
    assert_eq!(rec.of(EventKind::AfterStop).len(), 1);
    assert!(rec.of(EventKind::AfterRunTask).is_empty());
}

#[tokio::test]
async fn stop_task_ends_one_run_without_retry() {
    let mut cfg = fast_config();
    cfg.max_retries = 3;
    let (sched, rec) = scheduler(cfg);
    let mut rx = sched.subscribe();

    sched.set_tasks(vec![sh("sleep 5"), sh("true")]).await.unwrap();
    sched.start().await.unwrap();
    wait_for(&mut rx, is(EventKind::BeforeRunTask, 0)).await;

    assert_eq!(sched.stop_task(0, None).await, Ok(true));
    let end = wait_for(&mut rx, |e| e.kind == EventKind::AllDone).await;
    assert_eq!(end.total, Some(2));

    assert_eq!(rec.count(EventKind::BeforeStopTask, 0), 1);
    assert_eq!(rec.count(EventKind::TaskStopped, 0), 1);
    assert_eq!(rec.count(EventKind::AfterStopTask, 0), 1);
    assert_eq!(rec.count(EventKind::TaskRetry, 0), 0);

    let snap = sched.status().await.unwrap();
    assert_eq!(snap.status(0), Some(TaskStatus::Stopped));
    assert_eq!(snap.status(1), Some(TaskStatus::Done));
    assert_eq!(sched.stop_task(1, None).await, Ok(false));
}

#[tokio::test]
async fn cancel_skips_waiting_task_only() {
    let mut cfg = fast_config();
    cfg.threads = 1;
    let (sched, rec) = scheduler(cfg);
    let mut rx = sched.subscribe();

    sched
        .set_tasks(vec![sh("sleep 0.2"), sh("true"), sh("true")])
        .await
        .unwrap();
    sched.start().await.unwrap();
    wait_for(&mut rx, is(EventKind::BeforeRunTask, 0)).await;

    assert_eq!(sched.cancel_task(0).await, Ok(false));
    assert_eq!(sched.cancel_task(1).await, Ok(true));
    assert_eq!(sched.cancel_task(1).await, Ok(false));
    assert_eq!(
        sched.cancel_task(9).await,
        Err(RuntimeError::UnknownTask { index: 9 })
    );

    let end = wait_for(&mut rx, |e| e.kind == EventKind::AllDone).await;
    assert_eq!(end.total, Some(3));
    assert_eq!(rec.count(EventKind::BeforeRunTask, 1), 0);

    let snap = sched.status().await.unwrap();
    assert_eq!(snap.status(1), Some(TaskStatus::Cancelled));
    assert_eq!(snap.status(2), Some(TaskStatus::Done));
}

#[tokio::test]
async fn destroy_clears_the_task_set() {
    let (sched, rec) = scheduler(fast_config());
    sched.set_tasks(vec![sh("true"), sh("true")]).await.unwrap();
    sched.destroy(None).await.unwrap();
    assert_eq!(rec.of(EventKind::Destroyed).len(), 1);

    let end = run(&sched).await;
    assert_eq!(end.kind, EventKind::AllDone);
    assert_eq!(end.total, Some(0));
    assert!(rec.of(EventKind::BeforeRunTask).is_empty());
    assert_eq!(sched.status().await.unwrap().total, 0);
}

#[tokio::test]
async fn global_budget_halts_dispatch() {
    let mut cfg = fast_config();
    cfg.threads = 1;
    cfg.max_retries = 5;
    cfg.global_retry_limit = 2;
    let (sched, rec) = scheduler(cfg);

    sched
        .set_tasks(vec![sh("exit 1"), sh("exit 1"), sh("exit 1")])
        .await
        .unwrap();
    let end = run(&sched).await;

    assert_eq!(end.kind, EventKind::Halted);
    assert!(end.reason.as_deref().unwrap_or("").contains("budget"));
    assert_eq!(rec.of(EventKind::TaskRetry).len(), 2);
    assert!(rec.of(EventKind::AllDone).is_empty());

    let snap = sched.status().await.unwrap();
    assert_eq!(snap.global_retries, 2);

    // Halting leaves the scheduler idle, so a new set can be installed.
    sched.set_tasks(vec![sh("true")]).await.unwrap();
    assert_eq!(run(&sched).await.kind, EventKind::AllDone);
}

#[tokio::test]
async fn running_snapshots_are_published() {
    let (sched, rec) = scheduler(fast_config());
    sched.set_tasks(vec![sh("sleep 0.2")]).await.unwrap();
    run(&sched).await;

    let snaps = rec.of(EventKind::TasksRunning);
    assert!(!snaps.is_empty());
    let snap = snaps[0].snapshot.as_ref().unwrap();
    assert_eq!(snap.running, 1);
    assert_eq!(snap.status(0), Some(TaskStatus::Running));
}

struct Panicker;

#[async_trait]
impl Subscribe for Panicker {
    async fn on_event(&self, ev: &Event) {
        if ev.kind == EventKind::BeforeRunTask {
            panic!("hook failure");
        }
    }
}

#[tokio::test]
async fn panicking_hook_does_not_stop_the_run() {
    let rec = Arc::new(Recorder::default());
    let sched = Scheduler::builder(fast_config())
        .with_subscriber(Arc::new(Panicker))
        .with_subscriber(rec.clone())
        .build();
    let mut rx = sched.subscribe();

    sched.set_tasks(vec![sh("true")]).await.unwrap();
    sched.start().await.unwrap();
    let panicked = wait_for(&mut rx, |e| e.kind == EventKind::SubscriberPanicked).await;
    assert!(panicked.reason.as_deref().unwrap_or("").contains("hook failure"));

    wait_for(&mut rx, |e| e.kind == EventKind::AllDone).await;
    assert_eq!(rec.count(EventKind::TaskDone, 0), 1);
}

#[tokio::test]
async fn cancelled_task_stays_cancelled_after_stop() {
    let mut cfg = fast_config();
    cfg.threads = 1;
    let (sched, rec) = scheduler(cfg);
    let mut rx = sched.subscribe();

    sched.set_tasks(vec![sh("sleep 1"), sh("true")]).await.unwrap();
    sched.start().await.unwrap();
    wait_for(&mut rx, is(EventKind::BeforeRunTask, 0)).await;
    assert_eq!(sched.cancel_task(1).await, Ok(true));
    sched.stop(Some(KillSignal::KILL)).await.unwrap();
    assert_eq!(
        sched.status().await.unwrap().status(1),
        Some(TaskStatus::Cancelled)
    );

    let end = run(&sched).await;
    assert_eq!(end.kind, EventKind::AllDone);
    assert_eq!(end.total, Some(2));
    assert_eq!(rec.count(EventKind::BeforeRunTask, 1), 0);

    let snap = sched.status().await.unwrap();
    assert_eq!(snap.status(0), Some(TaskStatus::Done));
    assert_eq!(snap.status(1), Some(TaskStatus::Cancelled));
}

#[tokio::test]
async fn cancel_leaves_finished_tasks_alone() {
    let mut cfg = fast_config();
    cfg.threads = 1;
    let (sched, rec) = scheduler(cfg);
    let mut rx = sched.subscribe();

    sched
        .set_tasks(vec![sh("true"), sh("exit 1"), sh("sleep 0.3")])
        .await
        .unwrap();
    sched.start().await.unwrap();
    wait_for(&mut rx, is(EventKind::BeforeRunTask, 2)).await;

    assert_eq!(sched.cancel_task(0).await, Ok(false));
    assert_eq!(sched.cancel_task(1).await, Ok(false));
    let snap = sched.status().await.unwrap();
    assert_eq!(snap.status(0), Some(TaskStatus::Done));
    assert_eq!(snap.status(1), Some(TaskStatus::Failed));

    let end = wait_for(&mut rx, |e| e.kind == EventKind::AllDone).await;
    assert_eq!(end.total, Some(3));
    assert_eq!(sched.cancel_task(2).await, Ok(false));
    assert_eq!(
        sched.status().await.unwrap().status(2),
        Some(TaskStatus::Done)
    );
    assert_eq!(rec.count(EventKind::TaskDone, 0), 1);
}

#[tokio::test]
async fn destroy_while_running_kills_and_forgets() {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let mut cfg = fast_config();
    cfg.threads = 2;
    let (sched, rec) = scheduler(cfg);
    let mut rx = sched.subscribe();

    sched
        .set_tasks(vec![sh("echo $$; exec sleep 5"), sh("echo $$; exec sleep 5")])
        .await
        .unwrap();
    sched.start().await.unwrap();

    let mut pids = Vec::new();
    for task in 0..2 {
        let out = wait_for(&mut rx, is(EventKind::Stdout, task)).await;
        let pid: i32 = out.chunk.as_deref().unwrap().trim().parse().unwrap();
        pids.push(Pid::from_raw(pid));
    }

    sched.destroy(None).await.unwrap();
    let snap = sched.status().await.unwrap();
    assert_eq!(snap.total, 0);
    assert_eq!(snap.running, 0);
    assert_eq!(rec.of(EventKind::Destroyed).len(), 1);

    // Both processes are gone once their watchers reap them.
    tokio::time::timeout(Duration::from_secs(3), async {
        while pids.iter().any(|pid| kill(*pid, None).is_ok()) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("processes survived destroy");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rec.of(EventKind::AfterRunTask).is_empty());
    assert!(rec.of(EventKind::AllDone).is_empty());

    let end = run(&sched).await;
    assert_eq!(end.kind, EventKind::AllDone);
    assert_eq!(end.total, Some(0));
    assert_eq!(rec.of(EventKind::Destroyed).len(), 1);
}
