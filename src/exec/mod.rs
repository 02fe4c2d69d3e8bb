// src/exec/mod.rs

//! Worker process execution layer.
//!
//! This module launches the external worker with `tokio::process::Command`
//! and reports what it does as a stream of [`WorkerEvent`]s.
//!
//! - [`runner`] spawns the process and supervises it: output pipes, exit,
//!   timeout and shutdown are multiplexed in one task.
//! - [`decode`] turns raw pipe reads into text.
//! - [`signal`] delivers the graceful interrupt.
//! - [`backend`] provides the `WorkerBackend` trait and the real
//!   `ProcessBackend`; tests can replace it with a scripted fake.

use std::fmt;
use std::path::PathBuf;

use tokio::sync::watch;

use crate::types::RequestId;

pub mod backend;
pub mod decode;
pub mod runner;
pub mod signal;

pub use backend::{ProcessBackend, WorkerBackend};
pub use runner::spawn_worker;

/// Something observable that happened to a running worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// A chunk of standard output, as delivered by the OS.
    Stdout(String),
    /// A chunk of standard error.
    Stderr(String),
    /// The timeout elapsed and the worker was interrupted.
    TimedOut,
    /// The worker exited. Always the last event of a run.
    Exited(ExitReport),
}

/// How a worker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReport {
    Code(i32),
    /// Terminated by this signal without an exit code.
    Signal(i32),
}

impl fmt::Display for ExitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReport::Code(code) => write!(f, "exit code {code}"),
            ExitReport::Signal(sig) => write!(f, "signal {sig}"),
        }
    }
}

/// One request's worth of work for a backend.
#[derive(Debug, Clone)]
pub struct WorkerJob {
    pub request_id: RequestId,
    /// Scratch file holding the request value.
    pub input_path: PathBuf,
    /// Flips to `true` when the service is shutting down.
    pub shutdown: watch::Receiver<bool>,
}
