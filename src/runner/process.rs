//! Direct process runner
//!
//! Spawns the program as the leader of its own process group so a deadline
//! kill reaches everything it started.

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{CommandSpec, RawRunOutcome, Runner};

/// How long pipe readers may keep draining after the process is gone
const DRAIN_WINDOW: Duration = Duration::from_millis(250);

const READ_CHUNK: usize = 8192;

pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 8 * 1024 * 1024;

/// Runner that executes programs directly as child processes
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// Maximum bytes kept per output stream
    output_limit: usize,
}

impl ProcessRunner {
    pub fn new(output_limit: usize) -> Self {
        Self { output_limit }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_LIMIT_BYTES)
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    async fn run(&self, cmd: &CommandSpec, stdin: &str, time_limit: Duration) -> RawRunOutcome {
        debug!(
            "Spawning {} {:?} (time limit {}ms)",
            cmd.program,
            cmd.args,
            time_limit.as_millis()
        );

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);
        if let Some(dir) = &cmd.work_dir {
            command.current_dir(dir);
        }

        let start = Instant::now();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                debug!("Failed to spawn {}: {}", cmd.program, e);
                return RawRunOutcome::spawn_failed(format!(
                    "Failed to start {}: {}",
                    cmd.program, e
                ));
            }
        };
        let pid = child.id();

        let stdout = OutputCapture::start(child.stdout.take(), self.output_limit);
        let stderr = OutputCapture::start(child.stderr.take(), self.output_limit);
        let stdin_task = feed_stdin(&mut child, stdin);

        let mut exit_status = None;
        let mut timed_out = false;
        let mut wait_error = None;

        match tokio::time::timeout(time_limit, child.wait()).await {
            Ok(Ok(status)) => exit_status = Some(status),
            Ok(Err(e)) => {
                warn!("Failed to wait for {}: {}", cmd.program, e);
                wait_error = Some(format!("Failed to wait for {}: {}", cmd.program, e));
            }
            Err(_) => timed_out = true,
        }
        let wall_clock_ms = start.elapsed().as_millis() as u64;

        // Leftover group members would keep the pipes open. The leader may
        // already be reaped: while any member lives the kernel keeps the pgid
        // reserved, and once the group is empty the pid can only be reused by
        // a process that also makes itself a group leader before this call,
        // which needs a full pid wraparound in between.
        kill_process_group(pid);
        if exit_status.is_none() {
            force_kill(&mut child).await;
        }
        if let Some(task) = stdin_task {
            task.abort();
        }

        let stdout = stdout.finish().await;
        let stderr = stderr.finish().await;

        if timed_out {
            debug!("{} killed at deadline after {}ms", cmd.program, wall_clock_ms);
        }

        RawRunOutcome {
            exit_code: exit_status.and_then(|s| s.code()),
            signal: exit_status.and_then(|s| s.signal()),
            stdout,
            stderr,
            timed_out,
            wall_clock_ms,
            spawn_error: wait_error,
        }
    }
}

/// Write the payload on a separate task, then close the pipe so the program sees EOF
fn feed_stdin(child: &mut Child, payload: &str) -> Option<JoinHandle<()>> {
    let mut pipe = child.stdin.take()?;
    let payload = payload.as_bytes().to_vec();
    Some(tokio::spawn(async move {
        if let Err(e) = pipe.write_all(&payload).await {
            // Programs are free to exit without reading their input
            debug!("Stdin not fully consumed: {}", e);
        }
        drop(pipe);
    }))
}

fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => debug!("Failed to kill process group {}: {}", pid, e),
    }
}

async fn force_kill(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!("start_kill failed: {}", e);
    }
    if let Err(e) = child.wait().await {
        warn!("Failed to reap killed process: {}", e);
    }
}

/// Incrementally drains one output pipe into a shared buffer
struct OutputCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
    handle: Option<JoinHandle<()>>,
}

impl OutputCapture {
    fn start<R>(pipe: Option<R>, limit: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let handle = pipe.map(|mut pipe| {
            let sink = Arc::clone(&buffer);
            tokio::spawn(async move {
                let mut chunk = [0u8; READ_CHUNK];
                loop {
                    match pipe.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            let mut buf = sink.lock().await;
                            let room = limit.saturating_sub(buf.len());
                            buf.extend_from_slice(&chunk[..n.min(room)]);
                        }
                    }
                }
            })
        });
        Self { buffer, handle }
    }

    /// Give the reader a short window to hit EOF, then take what it has
    async fn finish(self) -> String {
        if let Some(mut handle) = self.handle {
            if tokio::time::timeout(DRAIN_WINDOW, &mut handle).await.is_err() {
                handle.abort();
            }
        }
        let buf = self.buffer.lock().await;
        String::from_utf8_lossy(&buf).into_owned()
    }
}
