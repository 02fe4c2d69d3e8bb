// tests/process_runner.rs
//
// Runs real `sh` workers, so unix only.
#![cfg(unix)]

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::{init_tracing, with_timeout};

use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::{mpsc, watch};

use relaybot::config::WorkerSpec;
use relaybot::errors::RelayError;
use relaybot::exec::{
    spawn_worker, ExitReport, ProcessBackend, WorkerBackend, WorkerEvent, WorkerJob,
};

fn shell_spec(dir: &TempDir, script: &str, timeout: &str, kill_grace: &str) -> WorkerSpec {
    ConfigFileBuilder::new()
        .shell_worker(script)
        .worker_cwd(dir.path())
        .timeout(timeout)
        .kill_grace(kill_grace)
        .build()
        .worker
}

fn job(input_path: PathBuf, shutdown: watch::Receiver<bool>) -> WorkerJob {
    WorkerJob {
        request_id: 1,
        input_path,
        shutdown,
    }
}

async fn collect(mut events: mpsc::Receiver<WorkerEvent>) -> Vec<WorkerEvent> {
    let mut all = Vec::new();
    while let Some(event) = events.recv().await {
        all.push(event);
    }
    all
}

fn stdout_of(events: &[WorkerEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            WorkerEvent::Stdout(s) => Some(s.as_str()),
            _ => None,
        })
        .collect()
}

fn stderr_of(events: &[WorkerEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            WorkerEvent::Stderr(s) => Some(s.as_str()),
            _ => None,
        })
        .collect()
}

fn assert_single_exit(events: &[WorkerEvent], expected: ExitReport) {
    let exits: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, WorkerEvent::Exited(_)))
        .collect();
    assert_eq!(exits.len(), 1, "events: {events:?}");
    assert_eq!(events.last(), Some(&WorkerEvent::Exited(expected)));
}

#[tokio::test]
async fn stdout_and_exit_code_are_reported() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let spec = shell_spec(&dir, "echo hello; exit 0", "10s", "1s");
    let (_stop, shutdown) = watch::channel(false);

    let rx = spawn_worker(&spec, job(dir.path().join("unused"), shutdown)).unwrap();
    let events = with_timeout(collect(rx)).await;

    assert_eq!(stdout_of(&events), "hello\n");
    assert_single_exit(&events, ExitReport::Code(0));
}

#[tokio::test]
async fn stderr_and_failing_exit_code_are_reported() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let spec = shell_spec(&dir, "echo oops >&2; exit 2", "10s", "1s");
    let (_stop, shutdown) = watch::channel(false);

    let rx = spawn_worker(&spec, job(dir.path().join("unused"), shutdown)).unwrap();
    let events = with_timeout(collect(rx)).await;

    assert_eq!(stderr_of(&events), "oops\n");
    assert!(stdout_of(&events).is_empty());
    assert_single_exit(&events, ExitReport::Code(2));
}

#[tokio::test]
async fn worker_finds_its_input_through_the_environment() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("request-1.txt");
    std::fs::write(&input, "test-id_42").unwrap();

    // Runs in a different directory than the scratch file.
    let cwd = TempDir::new().unwrap();
    let spec = shell_spec(&cwd, "cat \"$RELAY_INPUT_FILE\"", "10s", "1s");
    let backend = ProcessBackend::new(spec);
    let (_stop, shutdown) = watch::channel(false);

    let rx = backend.launch(job(input, shutdown)).unwrap();
    let events = with_timeout(collect(rx)).await;

    assert_eq!(stdout_of(&events), "test-id_42");
    assert_single_exit(&events, ExitReport::Code(0));
}

#[tokio::test]
async fn timeout_interrupts_the_worker_and_keeps_relaying() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let spec = shell_spec(
        &dir,
        "trap 'echo interrupted; exit 3' INT; sleep 5 >/dev/null 2>&1 & wait",
        "300ms",
        "5s",
    );
    let (_stop, shutdown) = watch::channel(false);

    let rx = spawn_worker(&spec, job(dir.path().join("unused"), shutdown)).unwrap();
    let events = with_timeout(collect(rx)).await;

    let timed_out = events
        .iter()
        .position(|e| *e == WorkerEvent::TimedOut)
        .expect("TimedOut event");
    let interrupted = events
        .iter()
        .position(|e| matches!(e, WorkerEvent::Stdout(s) if s.contains("interrupted")))
        .expect("output written by the interrupt handler");
    assert!(timed_out < interrupted, "events: {events:?}");
    assert_single_exit(&events, ExitReport::Code(3));
}

#[tokio::test]
async fn worker_ignoring_the_interrupt_is_killed_after_the_grace_period() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let spec = shell_spec(
        &dir,
        "trap '' INT; sleep 5 >/dev/null 2>&1 & wait",
        "300ms",
        "300ms",
    );
    let (_stop, shutdown) = watch::channel(false);

    let rx = spawn_worker(&spec, job(dir.path().join("unused"), shutdown)).unwrap();
    let events = with_timeout(collect(rx)).await;

    assert_eq!(events.first(), Some(&WorkerEvent::TimedOut));
    assert_single_exit(&events, ExitReport::Signal(libc::SIGKILL));
}

#[tokio::test]
async fn shutdown_interrupts_a_running_worker_without_a_timeout_reply() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let spec = shell_spec(
        &dir,
        "trap 'echo bye; exit 0' INT; echo started; sleep 5 >/dev/null 2>&1 & wait",
        "60s",
        "5s",
    );
    let (stop, shutdown) = watch::channel(false);

    let mut rx = spawn_worker(&spec, job(dir.path().join("unused"), shutdown)).unwrap();

    let first = with_timeout(rx.recv()).await;
    assert_eq!(first, Some(WorkerEvent::Stdout("started\n".to_string())));
    tokio::time::sleep(Duration::from_millis(100)).await;
    stop.send_replace(true);

    let events = with_timeout(collect(rx)).await;

    assert!(!events.contains(&WorkerEvent::TimedOut), "events: {events:?}");
    assert!(stdout_of(&events).contains("bye"));
    assert_single_exit(&events, ExitReport::Code(0));
}

#[tokio::test]
async fn missing_program_fails_to_spawn() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let spec = ConfigFileBuilder::new()
        .worker("relaybot-test-no-such-program", &[])
        .worker_cwd(dir.path())
        .build()
        .worker;
    let (_stop, shutdown) = watch::channel(false);

    match spawn_worker(&spec, job(dir.path().join("unused"), shutdown)) {
        Err(RelayError::Spawn { program, .. }) => {
            assert_eq!(program, "relaybot-test-no-such-program")
        }
        Err(other) => panic!("expected Spawn error, got {other:?}"),
        Ok(_) => panic!("expected Spawn error, got a running worker"),
    }
}
