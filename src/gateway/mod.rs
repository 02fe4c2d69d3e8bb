// src/gateway/mod.rs

//! Chat platform boundary.
//!
//! The service and relay only see [`ChatGateway`]: a source of
//! [`InboundEvent`]s and a way to send plain-text replies. [`telegram`]
//! implements it on top of the Telegram Bot API.

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::types::ChatId;

pub mod telegram;

pub use telegram::TelegramGateway;

/// Boxed future returned by gateway methods.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Inbound events the relay reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// The user sent the start command.
    Start { chat: ChatId },
    /// Any other text message.
    Text { chat: ChatId, text: String },
}

impl InboundEvent {
    pub fn chat(&self) -> ChatId {
        match self {
            InboundEvent::Start { chat } | InboundEvent::Text { chat, .. } => *chat,
        }
    }
}

/// Trait abstracting the chat platform.
pub trait ChatGateway: Send + Sync {
    /// Wait for the next batch of inbound events.
    ///
    /// May return an empty batch when the long poll times out.
    fn poll_events(&self) -> GatewayFuture<'_, Vec<InboundEvent>>;

    /// Send `text` to `chat`.
    fn send_text<'a>(&'a self, chat: ChatId, text: &'a str) -> GatewayFuture<'a, ()>;
}

/// Classify a message text as the start command or ordinary text.
///
/// Accepts `/start`, `/start <payload>` and `/start@SomeBot`.
pub fn classify_text(chat: ChatId, text: &str) -> InboundEvent {
    let command = text.split_whitespace().next().unwrap_or("");
    let command = command.split('@').next().unwrap_or("");
    if command == "/start" && text.starts_with('/') {
        InboundEvent::Start { chat }
    } else {
        InboundEvent::Text {
            chat,
            text: text.to_string(),
        }
    }
}
