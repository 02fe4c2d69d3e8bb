use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use relaybot::errors::{RelayError, Result};
use relaybot::exec::{ExitReport, WorkerBackend, WorkerEvent, WorkerJob};
use relaybot::fs::FileSystem;
use relaybot::types::RequestId;
use tokio::sync::mpsc;

/// What the fake saw for one launch.
#[derive(Debug, Clone)]
pub struct LaunchRecord {
    pub request_id: RequestId,
    pub input_path: PathBuf,
    /// Scratch contents at launch time, if a filesystem was attached.
    pub input: Option<String>,
}

#[derive(Debug, Clone)]
enum Ending {
    /// The script itself contains the exit event.
    Scripted,
    /// After the script, wait for shutdown and exit with this report.
    OnShutdown(ExitReport),
}

/// A fake worker backend that:
/// - records each launch (and the scratch contents, if it can read them)
/// - replays the same scripted events for every launch.
#[derive(Clone)]
pub struct FakeWorker {
    script: Vec<WorkerEvent>,
    step_delay: Duration,
    ending: Ending,
    refuse: bool,
    fs: Option<Arc<dyn FileSystem>>,
    launches: Arc<Mutex<Vec<LaunchRecord>>>,
}

impl FakeWorker {
    pub fn new(script: Vec<WorkerEvent>) -> Self {
        Self {
            script,
            step_delay: Duration::ZERO,
            ending: Ending::Scripted,
            refuse: false,
            fs: None,
            launches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Prints `stdout` and exits with `code`.
    pub fn printing(stdout: &str, code: i32) -> Self {
        Self::new(vec![
            WorkerEvent::Stdout(stdout.to_string()),
            WorkerEvent::Exited(ExitReport::Code(code)),
        ])
    }

    /// A backend whose launches always fail.
    pub fn refusing() -> Self {
        let mut worker = Self::new(Vec::new());
        worker.refuse = true;
        worker
    }

    /// Keep running after the script until the service shuts down.
    pub fn exit_on_shutdown(mut self, report: ExitReport) -> Self {
        self.ending = Ending::OnShutdown(report);
        self
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Read scratch contents through `fs` at launch.
    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.launches.lock().unwrap().clone()
    }
}

impl WorkerBackend for FakeWorker {
    fn launch(&self, job: WorkerJob) -> Result<mpsc::Receiver<WorkerEvent>> {
        if self.refuse {
            return Err(RelayError::Spawn {
                program: "fake-worker".to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "scripted launch failure"),
            });
        }

        let input = self
            .fs
            .as_ref()
            .and_then(|fs| fs.read_to_string(&job.input_path).ok());
        self.launches.lock().unwrap().push(LaunchRecord {
            request_id: job.request_id,
            input_path: job.input_path.clone(),
            input,
        });

        let (tx, rx) = mpsc::channel(16);
        let script = self.script.clone();
        let delay = self.step_delay;
        let ending = self.ending.clone();
        let mut shutdown = job.shutdown;

        tokio::spawn(async move {
            for event in script {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            if let Ending::OnShutdown(report) = ending {
                let _ = shutdown.wait_for(|stop| *stop).await;
                let _ = tx.send(WorkerEvent::Exited(report)).await;
            }
        });

        Ok(rx)
    }
}
