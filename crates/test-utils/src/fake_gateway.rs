use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use relaybot::errors::RelayError;
use relaybot::gateway::{ChatGateway, GatewayFuture, InboundEvent};
use relaybot::types::ChatId;
use tokio::sync::{mpsc, Notify};

/// A reply the relay sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat: ChatId,
    pub text: String,
}

/// A fake chat gateway that:
/// - hands out event batches pushed with [`FakeGateway::push`]
/// - records every reply, in order
/// - can be told to fail upcoming polls.
pub struct FakeGateway {
    inbound_tx: mpsc::UnboundedSender<Vec<InboundEvent>>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<InboundEvent>>>,
    sent: Mutex<Vec<SentMessage>>,
    sent_changed: Notify,
    failing_polls: AtomicUsize,
    polls: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            sent: Mutex::new(Vec::new()),
            sent_changed: Notify::new(),
            failing_polls: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        }
    }

    /// Queue a batch for the next poll.
    pub fn push(&self, events: Vec<InboundEvent>) {
        self.inbound_tx
            .send(events)
            .expect("fake gateway receiver lives as long as the sender");
    }

    pub fn push_text(&self, chat: ChatId, text: &str) {
        self.push(vec![InboundEvent::Text {
            chat,
            text: text.to_string(),
        }]);
    }

    /// Make the next `n` polls return an error.
    pub fn fail_next_polls(&self, n: usize) {
        self.failing_polls.store(n, Ordering::SeqCst);
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts sent to `chat`, in order.
    pub fn texts_for(&self, chat: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat == chat)
            .map(|m| m.text.clone())
            .collect()
    }

    /// Wait until at least `n` replies were sent in total.
    pub async fn wait_for_sent(&self, n: usize) -> Vec<SentMessage> {
        loop {
            let changed = self.sent_changed.notified();
            {
                let sent = self.sent.lock().unwrap();
                if sent.len() >= n {
                    return sent.clone();
                }
            }
            changed.await;
        }
    }
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatGateway for FakeGateway {
    fn poll_events(&self) -> GatewayFuture<'_, Vec<InboundEvent>> {
        Box::pin(async move {
            self.polls.fetch_add(1, Ordering::SeqCst);

            let fail = self
                .failing_polls
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if fail {
                return Err(RelayError::Gateway("scripted poll failure".to_string()));
            }

            let mut rx = self.inbound_rx.lock().await;
            match rx.recv().await {
                Some(batch) => Ok(batch),
                None => std::future::pending().await,
            }
        })
    }

    fn send_text<'a>(&'a self, chat: ChatId, text: &'a str) -> GatewayFuture<'a, ()> {
        Box::pin(async move {
            self.sent.lock().unwrap().push(SentMessage {
                chat,
                text: text.to_string(),
            });
            self.sent_changed.notify_waiters();
            Ok(())
        })
    }
}
