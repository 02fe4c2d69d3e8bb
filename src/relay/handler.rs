// src/relay/handler.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigFile, Messages};
use crate::exec::{WorkerBackend, WorkerEvent, WorkerJob};
use crate::gateway::{ChatGateway, InboundEvent};
use crate::input::RequestValue;
use crate::scratch::ScratchWriter;
use crate::types::{ChatId, RequestId};

use super::flow::{FlowInput, FlowState, RequestFlow};
use super::replies::{exit_reply, stderr_reply, stdout_reply, timeout_reply};

/// Reply texts and limits used by the relay.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub messages: Messages,
    pub max_reply_chars: usize,
    /// Worker timeout, quoted in the timeout reply.
    pub timeout: Duration,
}

impl RelaySettings {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            messages: cfg.messages.clone(),
            max_reply_chars: cfg.worker.max_reply_chars,
            timeout: cfg.worker.timeout,
        }
    }
}

/// How an inbound event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// Start command answered with the greeting.
    Greeted,
    /// A text message ran through the flow and ended in this state.
    Flow(FlowState),
}

/// Drives one inbound event from arrival to its last reply.
///
/// Holds no per-message state; every call to [`Relay::handle`] is
/// independent, so many may run concurrently.
pub struct Relay {
    gateway: Arc<dyn ChatGateway>,
    worker: Arc<dyn WorkerBackend>,
    scratch: ScratchWriter,
    settings: RelaySettings,
}

impl Relay {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        worker: Arc<dyn WorkerBackend>,
        scratch: ScratchWriter,
        settings: RelaySettings,
    ) -> Self {
        Self {
            gateway,
            worker,
            scratch,
            settings,
        }
    }

    pub async fn handle(
        &self,
        request_id: RequestId,
        event: InboundEvent,
        shutdown: watch::Receiver<bool>,
    ) -> Handled {
        match event {
            InboundEvent::Start { chat } => {
                debug!(request_id, chat_id = chat, "start command");
                self.reply(request_id, chat, &self.settings.messages.greeting)
                    .await;
                Handled::Greeted
            }
            InboundEvent::Text { chat, text } => {
                let end = self.handle_text(request_id, chat, &text, shutdown).await;
                debug!(request_id, chat_id = chat, state = ?end, "request finished");
                Handled::Flow(end)
            }
        }
    }

    async fn handle_text(
        &self,
        request_id: RequestId,
        chat: ChatId,
        text: &str,
        shutdown: watch::Receiver<bool>,
    ) -> FlowState {
        let mut flow = RequestFlow::new();
        step(&mut flow, request_id, FlowInput::Begin);

        let Some(value) = RequestValue::parse(text) else {
            debug!(request_id, chat_id = chat, "rejected input");
            step(&mut flow, request_id, FlowInput::InputInvalid);
            self.reply(request_id, chat, &self.settings.messages.invalid_input)
                .await;
            return flow.state();
        };
        step(&mut flow, request_id, FlowInput::InputValid);

        let scratch = match self.scratch.write(request_id, &value) {
            Ok(file) => file,
            Err(err) => {
                error!(request_id, chat_id = chat, error = %err, "failed to persist input");
                step(&mut flow, request_id, FlowInput::PersistError);
                self.reply(request_id, chat, &self.settings.messages.internal_error)
                    .await;
                return flow.state();
            }
        };
        step(&mut flow, request_id, FlowInput::Persisted);

        self.reply(request_id, chat, &self.settings.messages.processing)
            .await;

        let job = WorkerJob {
            request_id,
            input_path: scratch.path().to_path_buf(),
            shutdown,
        };
        let mut events = match self.worker.launch(job) {
            Ok(events) => events,
            Err(err) => {
                error!(request_id, chat_id = chat, error = %err, "failed to start worker");
                step(&mut flow, request_id, FlowInput::LaunchError);
                self.reply(request_id, chat, &self.settings.messages.internal_error)
                    .await;
                return flow.state();
            }
        };
        step(&mut flow, request_id, FlowInput::WorkerStarted);
        info!(request_id, chat_id = chat, "worker running");

        let max = self.settings.max_reply_chars;
        while let Some(event) = events.recv().await {
            match event {
                WorkerEvent::Stdout(chunk) => {
                    if let Some(text) = stdout_reply(&chunk, max) {
                        self.reply(request_id, chat, &text).await;
                    }
                }
                WorkerEvent::Stderr(chunk) => {
                    if let Some(text) = stderr_reply(&chunk, max) {
                        self.reply(request_id, chat, &text).await;
                    }
                }
                WorkerEvent::TimedOut => {
                    self.reply(request_id, chat, &timeout_reply(self.settings.timeout))
                        .await;
                }
                WorkerEvent::Exited(report) => {
                    info!(request_id, chat_id = chat, %report, "worker finished");
                    self.reply(request_id, chat, &exit_reply(report)).await;
                    step(&mut flow, request_id, FlowInput::WorkerExited);
                    break;
                }
            }
        }

        if flow.state() != FlowState::Terminated {
            warn!(request_id, "worker event stream ended without an exit event");
            step(&mut flow, request_id, FlowInput::WorkerExited);
        }

        // Removes a per-request scratch file.
        drop(scratch);
        flow.state()
    }

    /// Send a reply; failures are logged and otherwise ignored.
    async fn reply(&self, request_id: RequestId, chat: ChatId, text: &str) {
        if let Err(err) = self.gateway.send_text(chat, text).await {
            warn!(request_id, chat_id = chat, error = %err, "failed to send reply");
        }
    }
}

fn step(flow: &mut RequestFlow, request_id: RequestId, input: FlowInput) {
    if let Err(err) = flow.advance(input) {
        warn!(request_id, error = %err, "unexpected request flow transition");
    }
}
