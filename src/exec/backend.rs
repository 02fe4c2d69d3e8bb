// src/exec/backend.rs

//! Pluggable worker backend abstraction.
//!
//! The relay talks to a `WorkerBackend` instead of spawning processes itself.
//! Production code uses [`ProcessBackend`]; tests provide a backend that
//! replays scripted [`WorkerEvent`]s without touching the OS.

use tokio::sync::mpsc;

use crate::config::WorkerSpec;
use crate::errors::Result;

use super::runner::spawn_worker;
use super::{WorkerEvent, WorkerJob};

/// Trait abstracting how a worker run is started.
pub trait WorkerBackend: Send + Sync {
    /// Start a run for `job`.
    ///
    /// An `Err` means nothing was started. On success the receiver yields the
    /// run's events and ends after a single `WorkerEvent::Exited`.
    fn launch(&self, job: WorkerJob) -> Result<mpsc::Receiver<WorkerEvent>>;
}

/// Backend that launches the configured worker as an OS process.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    spec: WorkerSpec,
}

impl ProcessBackend {
    pub fn new(spec: WorkerSpec) -> Self {
        Self { spec }
    }
}

impl WorkerBackend for ProcessBackend {
    fn launch(&self, job: WorkerJob) -> Result<mpsc::Receiver<WorkerEvent>> {
        spawn_worker(&self.spec, job)
    }
}
