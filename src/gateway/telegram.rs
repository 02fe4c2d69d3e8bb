// src/gateway/telegram.rs

//! Telegram Bot API client (long polling).
//!
//! Only the two methods the relay needs are used:
//! - `getUpdates` with an advancing offset, restricted to `message` updates
//! - `sendMessage` with a plain-text body
//!
//! The token is part of every request URL, so it is never logged and HTTP
//! errors are stripped of their URL before they leave this module.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::BotSettings;
use crate::errors::{RelayError, Result};
use crate::types::ChatId;

use super::{classify_text, ChatGateway, GatewayFuture, InboundEvent};

/// Extra time on top of the long-poll timeout before the HTTP request gives up.
const HTTP_SLACK: Duration = Duration::from_secs(10);

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

#[derive(Debug, Serialize)]
struct GetUpdatesParams {
    offset: i64,
    timeout: u64,
    allowed_updates: &'static [&'static str],
}

#[derive(Debug, Serialize)]
struct SendMessageParams<'a> {
    chat_id: ChatId,
    text: &'a str,
}

/// Unwrap an API envelope into its result.
pub fn into_result<T>(method: &str, response: ApiResponse<T>) -> Result<T> {
    match (response.ok, response.result) {
        (true, Some(result)) => Ok(result),
        (true, None) => Err(RelayError::Gateway(format!(
            "{method}: response without result"
        ))),
        (false, _) => Err(RelayError::Gateway(format!(
            "{method} failed ({}): {}",
            response
                .error_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "no code".to_string()),
            response.description.as_deref().unwrap_or("no description")
        ))),
    }
}

/// Turn a batch of updates into inbound events.
///
/// Returns the events plus the offset for the next poll (`None` if the batch
/// was empty). Updates without a text message are skipped but still advance
/// the offset so they are not delivered again.
pub fn events_from_updates(updates: Vec<Update>) -> (Vec<InboundEvent>, Option<i64>) {
    let next_offset = updates.iter().map(|u| u.update_id + 1).max();

    let events = updates
        .into_iter()
        .filter_map(|update| {
            let message = update.message?;
            let text = message.text?;
            Some(classify_text(message.chat.id, &text))
        })
        .collect();

    (events, next_offset)
}

/// [`ChatGateway`] backed by the Telegram Bot API.
pub struct TelegramGateway {
    client: reqwest::Client,
    /// `<api_url>/bot<token>`; contains the secret.
    endpoint: String,
    poll_timeout: Duration,
    offset: AtomicI64,
}

impl fmt::Debug for TelegramGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramGateway")
            .field("poll_timeout", &self.poll_timeout)
            .field("offset", &self.offset.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl TelegramGateway {
    pub fn new(settings: &BotSettings, token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.poll_timeout.saturating_add(HTTP_SLACK))
            .build()
            .map_err(|e| RelayError::Http(e.without_url()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}", settings.api_url, token),
            poll_timeout: settings.poll_timeout,
            offset: AtomicI64::new(0),
        })
    }

    async fn call<P, T>(&self, method: &str, params: &P) -> Result<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.endpoint, method);

        // Telegram reports API errors with non-2xx codes *and* a JSON body,
        // so the body is parsed regardless of the status.
        let response = self
            .client
            .post(&url)
            .json(params)
            .send()
            .await
            .map_err(|e| RelayError::Http(e.without_url()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RelayError::Http(e.without_url()))?;

        let envelope: ApiResponse<T> = serde_json::from_slice(&body).map_err(|e| {
            RelayError::Gateway(format!("{method}: unreadable response (HTTP {status}): {e}"))
        })?;

        into_result(method, envelope)
    }

    async fn get_updates(&self) -> Result<Vec<InboundEvent>> {
        let params = GetUpdatesParams {
            offset: self.offset.load(Ordering::Acquire),
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: &["message"],
        };

        let updates: Vec<Update> = self.call("getUpdates", &params).await?;
        trace!(count = updates.len(), "received updates");

        let (events, next_offset) = events_from_updates(updates);
        if let Some(next) = next_offset {
            self.offset.fetch_max(next, Ordering::AcqRel);
        }
        Ok(events)
    }

    async fn send_message(&self, chat: ChatId, text: &str) -> Result<()> {
        let params = SendMessageParams { chat_id: chat, text };
        let sent: Message = self.call("sendMessage", &params).await?;
        debug!(chat_id = chat, message_id = sent.message_id, "reply sent");
        Ok(())
    }
}

impl ChatGateway for TelegramGateway {
    fn poll_events(&self) -> GatewayFuture<'_, Vec<InboundEvent>> {
        Box::pin(self.get_updates())
    }

    fn send_text<'a>(&'a self, chat: ChatId, text: &'a str) -> GatewayFuture<'a, ()> {
        Box::pin(self.send_message(chat, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_updates(json: &str) -> Result<Vec<Update>> {
        let envelope: ApiResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        into_result("getUpdates", envelope)
    }

    #[test]
    fn text_and_start_messages_become_events() {
        let updates = parse_updates(
            r#"{"ok":true,"result":[
                {"update_id":10,"message":{"message_id":1,"chat":{"id":42,"type":"private"},"text":"/start"}},
                {"update_id":11,"message":{"message_id":2,"chat":{"id":42,"type":"private"},"text":"abc_123"}}
            ]}"#,
        )
        .unwrap();

        let (events, next) = events_from_updates(updates);
        assert_eq!(
            events,
            vec![
                InboundEvent::Start { chat: 42 },
                InboundEvent::Text {
                    chat: 42,
                    text: "abc_123".to_string()
                },
            ]
        );
        assert_eq!(next, Some(12));
    }

    #[test]
    fn non_text_updates_are_skipped_but_advance_the_offset() {
        let updates = parse_updates(
            r#"{"ok":true,"result":[
                {"update_id":7,"message":{"message_id":1,"chat":{"id":1},"photo":[]}},
                {"update_id":8,"edited_message":{"message_id":1,"chat":{"id":1},"text":"x"}}
            ]}"#,
        )
        .unwrap();

        let (events, next) = events_from_updates(updates);
        assert!(events.is_empty());
        assert_eq!(next, Some(9));
    }

    #[test]
    fn empty_batch_keeps_offset() {
        let updates = parse_updates(r#"{"ok":true,"result":[]}"#).unwrap();
        let (events, next) = events_from_updates(updates);
        assert!(events.is_empty());
        assert_eq!(next, None);
    }

    #[test]
    fn api_errors_carry_code_and_description() {
        match parse_updates(r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#) {
            Err(RelayError::Gateway(msg)) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("Unauthorized"));
            }
            other => panic!("expected Gateway error, got {other:?}"),
        }
    }

    fn settings(poll_timeout: Duration) -> BotSettings {
        BotSettings {
            token_env: "BOT_TOKEN".to_string(),
            api_url: "https://api.telegram.org".to_string(),
            poll_timeout,
            poll_retry_delay: Duration::from_secs(3),
            shutdown_grace: Duration::from_secs(15),
        }
    }

    #[test]
    fn huge_poll_timeout_does_not_overflow_the_http_timeout() {
        let gateway = TelegramGateway::new(&settings(Duration::MAX), "123456:SECRET").unwrap();
        assert_eq!(gateway.poll_timeout, Duration::MAX);
    }

    #[test]
    fn debug_output_does_not_leak_the_token() {
        let gateway =
            TelegramGateway::new(&settings(Duration::from_secs(30)), "123456:SECRET").unwrap();
        assert!(!format!("{gateway:?}").contains("SECRET"));
    }
}
