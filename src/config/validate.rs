// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{
    BotSettings, ConfigFile, RawBotSection, RawConfigFile, RawWorkerSection, WorkerSpec,
};
use crate::errors::{RelayError, Result};

/// Telegram refuses messages longer than this.
pub const PLATFORM_MESSAGE_LIMIT: usize = 4096;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RelayError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let bot = validate_bot(&raw.bot)?;
        let worker = validate_worker(&raw.worker)?;
        validate_messages(&raw)?;
        Ok(ConfigFile::new_unchecked(bot, worker, raw.scratch, raw.messages))
    }
}

/// Validate a raw config without consuming it.
pub fn validate_config(raw: &RawConfigFile) -> Result<()> {
    ConfigFile::try_from(raw.clone()).map(|_| ())
}

fn validate_bot(bot: &RawBotSection) -> Result<BotSettings> {
    if bot.token_env.trim().is_empty() {
        return Err(RelayError::ConfigError(
            "[bot].token_env must name an environment variable".to_string(),
        ));
    }

    if !(bot.api_url.starts_with("https://") || bot.api_url.starts_with("http://")) {
        return Err(RelayError::ConfigError(format!(
            "[bot].api_url must be an http(s) URL (got '{}')",
            bot.api_url
        )));
    }

    Ok(BotSettings {
        token_env: bot.token_env.trim().to_string(),
        api_url: bot.api_url.trim_end_matches('/').to_string(),
        poll_timeout: field_duration("bot", "poll_timeout", &bot.poll_timeout)?,
        poll_retry_delay: field_duration("bot", "poll_retry_delay", &bot.poll_retry_delay)?,
        shutdown_grace: field_duration("bot", "shutdown_grace", &bot.shutdown_grace)?,
    })
}

fn validate_worker(worker: &RawWorkerSection) -> Result<WorkerSpec> {
    if worker.program.trim().is_empty() {
        return Err(RelayError::ConfigError(
            "[worker].program must not be empty".to_string(),
        ));
    }

    if worker.input_env.trim().is_empty() {
        return Err(RelayError::ConfigError(
            "[worker].input_env must name an environment variable".to_string(),
        ));
    }

    if worker.max_reply_chars == 0 || worker.max_reply_chars > PLATFORM_MESSAGE_LIMIT {
        return Err(RelayError::ConfigError(format!(
            "[worker].max_reply_chars must be between 1 and {} (got {})",
            PLATFORM_MESSAGE_LIMIT, worker.max_reply_chars
        )));
    }

    let timeout = field_duration("worker", "timeout", &worker.timeout)?;
    if timeout.is_zero() {
        return Err(RelayError::ConfigError(
            "[worker].timeout must be greater than zero".to_string(),
        ));
    }

    Ok(WorkerSpec {
        program: worker.program.clone(),
        args: worker.args.clone(),
        cwd: worker.cwd.clone(),
        timeout,
        kill_grace: field_duration("worker", "kill_grace", &worker.kill_grace)?,
        input_env: worker.input_env.trim().to_string(),
        max_reply_chars: worker.max_reply_chars,
    })
}

fn validate_messages(raw: &RawConfigFile) -> Result<()> {
    let m = &raw.messages;
    let fields = [
        ("greeting", &m.greeting),
        ("invalid_input", &m.invalid_input),
        ("internal_error", &m.internal_error),
        ("processing", &m.processing),
    ];

    for (name, text) in fields {
        if text.trim().is_empty() {
            return Err(RelayError::ConfigError(format!(
                "[messages].{name} must not be empty"
            )));
        }
        if text.chars().count() > PLATFORM_MESSAGE_LIMIT {
            return Err(RelayError::ConfigError(format!(
                "[messages].{name} exceeds {PLATFORM_MESSAGE_LIMIT} characters"
            )));
        }
    }
    Ok(())
}

fn field_duration(section: &str, field: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| RelayError::ConfigError(format!("[{section}].{field}: {e}")))
}

/// Parse strings like `"500ms"`, `"30s"`, `"3m"` or `"1h"`.
///
/// Values that do not fit a `Duration` are rejected.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit (ms, s, m or h)"))?;
    let (digits, unit) = s.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|e| format!("invalid duration number '{digits}': {e}"))?;

    let secs_per_unit = match unit.trim().to_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        other => {
            return Err(format!(
                "unsupported duration unit '{other}'; expected ms, s, m or h"
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
