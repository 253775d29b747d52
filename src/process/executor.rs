//! # Process executor: one external process per task run.
//!
//! [`launch`] starts the process described by a [`TaskSpec`] and hands back a
//! [`ProcessHandle`]. Everything the process produces flows back to the runtime
//! as [`ProcessMsg`] values on one channel:
//!
//! ```text
//! launch(task, run, spec)
//!   ├─► Command::spawn ──(error)──► Closed { spawn_error }
//!   ├─► pump(stdout) ──► Chunk { Stdout } ...  (full bytes kept)
//!   ├─► pump(stderr) ──► Chunk { Stderr } ...  (full bytes kept)
//!   └─► watcher: wait() | kill requests
//!          └─► Closed { code, signal, stdout, stderr }
//! ```
//!
//! ## Rules
//! - Exactly one `Closed` per launch, sent after both pumps finished.
//! - Chunks are decoded lossily one by one; the full text in `Closed` is
//!   decoded from all bytes at once.
//! - On unix the child leads its own process group and kill signals go to the
//!   whole group, so shell wrappers do not leave orphans holding the pipes.
//!   Kill requests are honoured until `Closed` is sent, including after the
//!   leader exited while background members still hold the pipes.
//! - Every message carries the `run` id; the runtime drops messages of runs it
//!   no longer tracks.

use std::process::ExitStatus;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::process::KillSignal;
use crate::tasks::TaskSpec;

const READ_CHUNK: usize = 8 * 1024;

/// Which output stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputStream {
    Stdout,
    Stderr,
}

/// Terminal outcome of one launch.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProcessExit {
    pub task: usize,
    pub run: u64,
    pub code: Option<i32>,
    pub signal: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Set when the process never started.
    pub spawn_error: Option<String>,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.spawn_error.is_none() && self.code == Some(0)
    }
}

/// Messages from process watchers to the runtime.
#[derive(Debug)]
pub(crate) enum ProcessMsg {
    Chunk {
        task: usize,
        run: u64,
        stream: OutputStream,
        text: String,
    },
    Closed(ProcessExit),
}

/// Runtime-owned reference to a live process.
#[derive(Debug)]
pub(crate) struct ProcessHandle {
    pid: Option<u32>,
    kill_tx: mpsc::UnboundedSender<KillSignal>,
}

impl ProcessHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Asks the watcher to deliver `signal`. Returns `false` if the process already closed.
    pub fn kill(&self, signal: KillSignal) -> bool {
        self.kill_tx.send(signal).is_ok()
    }
}

/// Starts the process for `task` and returns its handle.
///
/// Never fails: a spawn error is reported as a `Closed` message so that it
/// takes the same path as any other exit.
pub(crate) fn launch(
    task: usize,
    run: u64,
    spec: &TaskSpec,
    tx: mpsc::Sender<ProcessMsg>,
) -> ProcessHandle {
    let (kill_tx, mut kill_rx) = mpsc::unbounded_channel();

    let mut child = match build_command(spec).spawn() {
        Ok(child) => child,
        Err(e) => {
            let exit = ProcessExit {
                task,
                run,
                spawn_error: Some(format!("{}: {e}", spec.command())),
                ..ProcessExit::default()
            };
            tokio::spawn(async move {
                let _ = tx.send(ProcessMsg::Closed(exit)).await;
            });
            return ProcessHandle { pid: None, kill_tx };
        }
    };

    let pid = child.id();
    let stdout = child
        .stdout
        .take()
        .map(|pipe| tokio::spawn(pump(pipe, task, run, OutputStream::Stdout, tx.clone())));
    let stderr = child
        .stderr
        .take()
        .map(|pipe| tokio::spawn(pump(pipe, task, run, OutputStream::Stderr, tx.clone())));

    tokio::spawn(async move {
        let status = watch(&mut child, &mut kill_rx).await;
        let (stdout, stderr) = drain(stdout, stderr, pid, &mut kill_rx).await;

        let (code, signal) = match &status {
            Ok(s) => (s.code(), exit_signal(s)),
            Err(_) => (None, None),
        };
        let exit = ProcessExit {
            task,
            run,
            code,
            signal,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            spawn_error: None,
        };
        let _ = tx.send(ProcessMsg::Closed(exit)).await;
    });

    ProcessHandle { pid, kill_tx }
}

fn build_command(spec: &TaskSpec) -> Command {
    let opts = spec.options();
    let mut cmd = Command::new(spec.command());
    cmd.args(spec.args());

    if let Some(dir) = &opts.cwd {
        cmd.current_dir(dir);
    }
    if opts.clear_env {
        cmd.env_clear();
    }
    for (key, value) in &opts.env {
        cmd.env(key, value);
    }

    cmd.stdin(opts.stdin.stdio());
    cmd.stdout(opts.stdout.stdio());
    cmd.stderr(opts.stderr.stdio());
    cmd.kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    cmd
}

/// Waits for the child, delivering kill requests while it runs.
async fn watch(
    child: &mut Child,
    kill_rx: &mut mpsc::UnboundedReceiver<KillSignal>,
) -> std::io::Result<ExitStatus> {
    loop {
        let signal = tokio::select! {
            status = child.wait() => break status,
            Some(signal) = kill_rx.recv() => signal,
        };
        deliver(child, signal);
    }
}

/// Waits for both pumps after the leader was reaped.
///
/// Background members of the group may still hold the pipes, so kill
/// requests keep flowing to the group (`pgid` is the leader's pid).
async fn drain(
    stdout: Option<JoinHandle<Vec<u8>>>,
    stderr: Option<JoinHandle<Vec<u8>>>,
    pgid: Option<u32>,
    kill_rx: &mut mpsc::UnboundedReceiver<KillSignal>,
) -> (Vec<u8>, Vec<u8>) {
    let pumps = async {
        let out = match stdout {
            Some(h) => h.await.unwrap_or_default(),
            None => Vec::new(),
        };
        let err = match stderr {
            Some(h) => h.await.unwrap_or_default(),
            None => Vec::new(),
        };
        (out, err)
    };
    tokio::pin!(pumps);

    loop {
        tokio::select! {
            output = &mut pumps => return output,
            Some(signal) = kill_rx.recv() => {
                if let Some(pgid) = pgid {
                    deliver_group(pgid, signal);
                }
            }
        }
    }
}

/// Reads a pipe to EOF, forwarding every chunk and returning all bytes.
async fn pump<R>(
    mut pipe: R,
    task: usize,
    run: u64,
    stream: OutputStream,
    tx: mpsc::Sender<ProcessMsg>,
) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK];
    let mut full = Vec::new();
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                full.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                // The runtime may be gone; keep draining so the child never blocks on a full pipe.
                let _ = tx
                    .send(ProcessMsg::Chunk {
                        task,
                        run,
                        stream,
                        text,
                    })
                    .await;
            }
        }
    }
    full
}

#[cfg(unix)]
fn deliver(child: &mut Child, signal: KillSignal) {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // `id()` is `None` once the child was reaped, so a recycled pid is never hit.
    let Some(pid) = child.id() else { return };
    let Some(sig) = signal.to_nix() else {
        let _ = child.start_kill();
        return;
    };
    if !deliver_group(pid, signal) {
        let _ = kill(Pid::from_raw(pid as i32), sig);
    }
}

/// Signals the whole process group. A pgid stays valid while any member lives.
#[cfg(unix)]
fn deliver_group(pgid: u32, signal: KillSignal) -> bool {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    match signal.to_nix() {
        Some(sig) => killpg(Pid::from_raw(pgid as i32), sig).is_ok(),
        None => false,
    }
}

#[cfg(not(unix))]
fn deliver(child: &mut Child, _signal: KillSignal) {
    let _ = child.start_kill();
}

#[cfg(not(unix))]
fn deliver_group(_pgid: u32, _signal: KillSignal) -> bool {
    false
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn collect(mut rx: mpsc::Receiver<ProcessMsg>) -> (Vec<String>, ProcessExit) {
        let mut chunks = Vec::new();
        while let Some(msg) = rx.recv().await {
            match msg {
                ProcessMsg::Chunk { text, .. } => chunks.push(text),
                ProcessMsg::Closed(exit) => return (chunks, exit),
            }
        }
        panic!("channel closed without Closed message");
    }

    #[tokio::test]
    async fn captures_output_both_ways() {
        let (tx, rx) = mpsc::channel(16);
        let spec = TaskSpec::new("sh", ["-c", "echo out; echo err >&2; exit 3"]);
        let handle = launch(4, 1, &spec, tx);
        assert!(handle.pid().is_some());

        let (chunks, exit) = collect(rx).await;
        assert_eq!(exit.task, 4);
        assert_eq!(exit.run, 1);
        assert_eq!(exit.code, Some(3));
        assert_eq!(exit.stdout, "out\n");
        assert_eq!(exit.stderr, "err\n");
        assert!(!exit.success());
        assert_eq!(chunks.concat().len(), "out\n".len() + "err\n".len());
    }

    #[tokio::test]
    async fn spawn_failure_is_reported_as_close() {
        let (tx, rx) = mpsc::channel(4);
        let spec = TaskSpec::new("/definitely/not/a/binary", Vec::<String>::new());
        let handle = launch(0, 9, &spec, tx);
        assert!(handle.pid().is_none());

        let (_, exit) = collect(rx).await;
        assert_eq!(exit.run, 9);
        assert!(exit.spawn_error.is_some());
        assert_eq!(exit.code, None);
    }

    #[tokio::test]
    async fn kill_reaches_group_after_leader_exit() {
        let (tx, rx) = mpsc::channel(4);
        let spec = TaskSpec::new("sh", ["-c", "sleep 30 & exit 0"]);
        let handle = launch(0, 1, &spec, tx);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(handle.kill(KillSignal::KILL));

        let (_, exit) = tokio::time::timeout(Duration::from_secs(5), collect(rx))
            .await
            .expect("background member kept the pipes open");
        assert_eq!(exit.code, Some(0));
    }

    #[tokio::test]
    async fn kill_request_terminates_process() {
        let (tx, rx) = mpsc::channel(4);
        let spec = TaskSpec::new("sleep", ["30"]);
        let handle = launch(0, 1, &spec, tx);
        assert!(handle.kill(KillSignal::KILL));

        let (_, exit) = tokio::time::timeout(Duration::from_secs(5), collect(rx))
            .await
            .expect("process did not die");
        assert_eq!(exit.code, None);
        assert_eq!(exit.signal, Some(9));
    }
}
