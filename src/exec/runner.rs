// src/exec/runner.rs

//! Worker process runner.

use std::future::pending;
use std::io;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Sleep};
use tracing::{debug, error, info, warn};

use crate::config::WorkerSpec;
use crate::errors::{RelayError, Result};
use crate::exec::decode::Utf8ChunkDecoder;
use crate::exec::signal::{self, Interrupt};
use crate::exec::{ExitReport, WorkerEvent, WorkerJob};
use crate::types::RequestId;

const READ_BUF_SIZE: usize = 8 * 1024;
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// How long to keep reading output after the worker exited. Grandchildren
/// that inherited the pipes can keep them open indefinitely.
const DRAIN_WINDOW: Duration = Duration::from_secs(5);

/// Timing limits for one run.
#[derive(Debug, Clone, Copy)]
struct RunLimits {
    timeout: Duration,
    kill_grace: Duration,
}

/// Start the worker described by `spec` for `job`.
///
/// Spawning happens before this returns, so a missing program is reported
/// here. Everything after that arrives on the returned channel, which always
/// ends with exactly one [`WorkerEvent::Exited`].
pub fn spawn_worker(spec: &WorkerSpec, job: WorkerJob) -> Result<mpsc::Receiver<WorkerEvent>> {
    info!(
        request_id = job.request_id,
        program = %spec.program,
        args = ?spec.args,
        cwd = ?spec.cwd,
        "starting worker process"
    );

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(&spec.cwd)
        .env(&spec.input_env, &job.input_path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| RelayError::Spawn {
        program: spec.program.clone(),
        source,
    })?;

    let stdout = child.stdout.take().map(OutputPipe::new);
    let stderr = child.stderr.take().map(OutputPipe::new);

    let limits = RunLimits {
        timeout: spec.timeout,
        kill_grace: spec.kill_grace,
    };

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(supervise(child, stdout, stderr, limits, job, tx));
    Ok(rx)
}

/// One output pipe of the child plus its decoding state.
struct OutputPipe<R> {
    reader: R,
    decoder: Utf8ChunkDecoder,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> OutputPipe<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: Utf8ChunkDecoder::new(),
            buf: vec![0; READ_BUF_SIZE],
        }
    }

    /// Next chunk of text, or `None` at EOF. Cancel safe.
    async fn next_chunk(&mut self) -> io::Result<Option<String>> {
        loop {
            let n = self.reader.read(&mut self.buf).await?;
            if n == 0 {
                let rest = self.decoder.finish();
                return Ok((!rest.is_empty()).then_some(rest));
            }

            let text = self.decoder.decode(&self.buf[..n]);
            if !text.is_empty() {
                return Ok(Some(text));
            }
        }
    }
}

async fn next_from<R: AsyncRead + Unpin>(
    pipe: &mut Option<OutputPipe<R>>,
) -> io::Result<Option<String>> {
    match pipe {
        Some(pipe) => pipe.next_chunk().await,
        None => pending().await,
    }
}

async fn fire(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}

async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        // Sender gone: nobody can ask for shutdown any more.
        pending::<()>().await;
    }
}

/// Multiplex output, exit, timeout and shutdown for one child until it has
/// exited and its output is drained.
async fn supervise<O, E>(
    mut child: Child,
    mut stdout: Option<OutputPipe<O>>,
    mut stderr: Option<OutputPipe<E>>,
    limits: RunLimits,
    job: WorkerJob,
    tx: mpsc::Sender<WorkerEvent>,
) where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let WorkerJob {
        request_id,
        mut shutdown,
        ..
    } = job;

    let mut deadline = Some(Box::pin(sleep(limits.timeout)));
    let mut kill_timer: Option<Pin<Box<Sleep>>> = None;
    let mut drain_timer: Option<Pin<Box<Sleep>>> = None;
    let mut watching_shutdown = true;
    let mut exit: Option<ExitReport> = None;

    while exit.is_none() || stdout.is_some() || stderr.is_some() {
        tokio::select! {
            chunk = next_from(&mut stdout) => match chunk {
                Ok(Some(text)) => {
                    debug!(request_id, bytes = text.len(), "worker stdout: {}", text.trim_end());
                    emit(&tx, request_id, WorkerEvent::Stdout(text)).await;
                }
                Ok(None) => stdout = None,
                Err(e) => {
                    warn!(request_id, error = %e, "reading worker stdout failed");
                    stdout = None;
                }
            },

            chunk = next_from(&mut stderr) => match chunk {
                Ok(Some(text)) => {
                    debug!(request_id, bytes = text.len(), "worker stderr: {}", text.trim_end());
                    emit(&tx, request_id, WorkerEvent::Stderr(text)).await;
                }
                Ok(None) => stderr = None,
                Err(e) => {
                    warn!(request_id, error = %e, "reading worker stderr failed");
                    stderr = None;
                }
            },

            status = child.wait(), if exit.is_none() => {
                let report = match status {
                    Ok(status) => exit_report(status),
                    Err(e) => {
                        error!(request_id, error = %e, "waiting for worker process failed");
                        ExitReport::Code(-1)
                    }
                };
                info!(request_id, %report, "worker process exited");

                exit = Some(report);
                deadline = None;
                kill_timer = None;
                drain_timer = Some(Box::pin(sleep(DRAIN_WINDOW)));
            }

            _ = fire(&mut deadline) => {
                deadline = None;
                warn!(request_id, timeout = ?limits.timeout, "worker timed out; interrupting");
                if interrupt_worker(&mut child, request_id) {
                    kill_timer = Some(Box::pin(sleep(limits.kill_grace)));
                }
                emit(&tx, request_id, WorkerEvent::TimedOut).await;
            }

            _ = shutdown_requested(&mut shutdown), if watching_shutdown => {
                watching_shutdown = false;
                if exit.is_none() {
                    info!(request_id, "shutdown requested; interrupting worker");
                    deadline = None;
                    if interrupt_worker(&mut child, request_id) && kill_timer.is_none() {
                        kill_timer = Some(Box::pin(sleep(limits.kill_grace)));
                    }
                }
            }

            _ = fire(&mut kill_timer) => {
                kill_timer = None;
                warn!(
                    request_id,
                    grace = ?limits.kill_grace,
                    "worker still running after interrupt; killing"
                );
                if let Err(e) = child.start_kill() {
                    warn!(request_id, error = %e, "failed to kill worker process");
                }
            }

            _ = fire(&mut drain_timer) => {
                drain_timer = None;
                warn!(request_id, "worker output still open after exit; dropping the rest");
                stdout = None;
                stderr = None;
            }
        }
    }

    // The loop only ends once `exit` is set.
    if let Some(report) = exit {
        emit(&tx, request_id, WorkerEvent::Exited(report)).await;
    }
}

/// Returns true when a graceful interrupt was delivered and a forced kill
/// should follow if the worker ignores it.
fn interrupt_worker(child: &mut Child, request_id: RequestId) -> bool {
    match signal::interrupt(child) {
        Ok(Interrupt::Graceful) => {
            debug!(request_id, "sent SIGINT to worker");
            true
        }
        Ok(Interrupt::Forced) => {
            debug!(request_id, "worker killed (no graceful interrupt on this platform)");
            false
        }
        Ok(Interrupt::AlreadyExited) => false,
        Err(e) => {
            warn!(request_id, error = %e, "failed to interrupt worker; killing");
            if let Err(e) = child.start_kill() {
                warn!(request_id, error = %e, "failed to kill worker process");
            }
            false
        }
    }
}

async fn emit(tx: &mpsc::Sender<WorkerEvent>, request_id: RequestId, event: WorkerEvent) {
    if tx.send(event).await.is_err() {
        debug!(request_id, "worker event receiver dropped");
    }
}

fn exit_report(status: ExitStatus) -> ExitReport {
    if let Some(code) = status.code() {
        return ExitReport::Code(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return ExitReport::Signal(sig);
        }
    }

    ExitReport::Code(-1)
}
