// tests/service.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::{init_tracing, relay_with, with_timeout, FakeGateway, FakeWorker};

use std::sync::Arc;
use std::time::Duration;

use relaybot::config::Messages;
use relaybot::exec::{ExitReport, WorkerEvent};
use relaybot::fs::mock::MockFileSystem;
use relaybot::gateway::InboundEvent;
use relaybot::service::{BotService, ServiceHandle, ServiceSettings};

fn start_service(gateway: Arc<FakeGateway>, worker: FakeWorker) -> ServiceHandle {
    let cfg = ConfigFileBuilder::new().build();
    let relay = relay_with(
        &cfg,
        gateway.clone(),
        worker,
        Arc::new(MockFileSystem::new()),
    );
    let settings = ServiceSettings {
        poll_retry_delay: Duration::from_millis(10),
        shutdown_grace: Duration::from_secs(5),
    };
    BotService::new(gateway, Arc::new(relay), settings).start()
}

#[tokio::test]
async fn polled_events_are_answered_per_chat() {
    init_tracing();
    let gateway = Arc::new(FakeGateway::new());
    let handle = start_service(gateway.clone(), FakeWorker::printing("hello", 0));

    gateway.push(vec![
        InboundEvent::Start { chat: 1 },
        InboundEvent::Text {
            chat: 2,
            text: "test-id_42".to_string(),
        },
    ]);
    with_timeout(gateway.wait_for_sent(4)).await;

    let messages = Messages::default();
    assert_eq!(gateway.texts_for(1), vec![messages.greeting]);
    assert_eq!(
        gateway.texts_for(2),
        vec![
            messages.processing,
            "hello".to_string(),
            "Process finished with exit code 0.".to_string(),
        ]
    );

    with_timeout(handle.shutdown()).await.unwrap();
}

#[tokio::test]
async fn failed_polls_are_retried() {
    init_tracing();
    let gateway = Arc::new(FakeGateway::new());
    gateway.fail_next_polls(2);
    let handle = start_service(gateway.clone(), FakeWorker::printing("unused", 0));

    gateway.push(vec![InboundEvent::Start { chat: 7 }]);
    with_timeout(gateway.wait_for_sent(1)).await;

    assert!(gateway.poll_count() >= 3);
    assert_eq!(gateway.texts_for(7), vec![Messages::default().greeting]);

    with_timeout(handle.shutdown()).await.unwrap();
}

#[tokio::test]
async fn stop_is_idempotent() {
    init_tracing();
    let gateway = Arc::new(FakeGateway::new());
    let handle = start_service(gateway, FakeWorker::printing("unused", 0));
    let signal = handle.stop_signal();

    assert!(handle.stop());
    assert!(!handle.stop());
    assert!(!signal.stop());

    with_timeout(handle.stopped()).await.unwrap();
}

#[tokio::test]
async fn shutdown_interrupts_running_workers_and_reports_their_exit() {
    init_tracing();
    let gateway = Arc::new(FakeGateway::new());
    let worker = FakeWorker::new(vec![WorkerEvent::Stdout("working".to_string())])
        .exit_on_shutdown(ExitReport::Signal(2));
    let handle = start_service(gateway.clone(), worker.clone());

    gateway.push_text(5, "abc");
    with_timeout(gateway.wait_for_sent(2)).await;
    assert_eq!(worker.launches().len(), 1);

    with_timeout(handle.shutdown()).await.unwrap();

    assert_eq!(
        gateway.texts_for(5),
        vec![
            Messages::default().processing,
            "working".to_string(),
            "Process was terminated by signal 2.".to_string(),
        ]
    );
}

#[tokio::test]
async fn events_after_stop_are_not_handled() {
    init_tracing();
    let gateway = Arc::new(FakeGateway::new());
    let handle = start_service(gateway.clone(), FakeWorker::printing("unused", 0));

    with_timeout(handle.shutdown()).await.unwrap();
    gateway.push(vec![InboundEvent::Start { chat: 3 }]);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(gateway.sent().is_empty());
}

#[tokio::test]
async fn stop_ends_the_poll_retry_backoff() {
    init_tracing();
    let gateway = Arc::new(FakeGateway::new());
    gateway.fail_next_polls(usize::MAX);
    let handle = start_service(gateway.clone(), FakeWorker::printing("unused", 0));

    while gateway.poll_count() < 2 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    with_timeout(handle.shutdown()).await.unwrap();
    assert!(gateway.sent().is_empty());
}
