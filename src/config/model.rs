// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::ScratchMode;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [bot]
/// token_env = "BOT_TOKEN"
/// poll_timeout = "30s"
///
/// [worker]
/// program = "python3"
/// args = ["main.py", "-a", "3"]
/// cwd = "venv/bin"
/// timeout = "3m"
///
/// [scratch]
/// mode = "shared"
/// path = "data.txt"
///
/// [messages]
/// greeting = "Hello! Please paste your NotPixel Query ID."
/// ```
///
/// All sections are optional and have reasonable defaults. This is the raw,
/// unvalidated form; durations are still strings. Use
/// [`ConfigFile::try_from`] to obtain the checked form.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub bot: RawBotSection,

    #[serde(default)]
    pub worker: RawWorkerSection,

    #[serde(default)]
    pub scratch: ScratchSettings,

    #[serde(default)]
    pub messages: Messages,
}

/// `[bot]` section: chat gateway connection and service lifecycle.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBotSection {
    /// Name of the environment variable holding the bot token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Base URL of the Telegram Bot API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Long-poll timeout handed to `getUpdates`.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout: String,

    /// Pause before polling again after a failed poll.
    #[serde(default = "default_poll_retry_delay")]
    pub poll_retry_delay: String,

    /// How long `stop` waits for in-flight requests before aborting them.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace: String,
}

fn default_token_env() -> String {
    "BOT_TOKEN".to_string()
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> String {
    "30s".to_string()
}

fn default_poll_retry_delay() -> String {
    "3s".to_string()
}

fn default_shutdown_grace() -> String {
    "15s".to_string()
}

impl Default for RawBotSection {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            api_url: default_api_url(),
            poll_timeout: default_poll_timeout(),
            poll_retry_delay: default_poll_retry_delay(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

/// `[worker]` section: the external process launched per request.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkerSection {
    #[serde(default = "default_program")]
    pub program: String,

    /// Fixed argument list. The request value never appears here.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Working directory the worker is started in.
    #[serde(default = "default_cwd")]
    pub cwd: PathBuf,

    /// Wall-clock limit; SIGINT is sent when it elapses.
    #[serde(default = "default_timeout")]
    pub timeout: String,

    /// Time allowed between SIGINT and a forced kill.
    #[serde(default = "default_kill_grace")]
    pub kill_grace: String,

    /// Environment variable through which the worker learns the scratch path.
    #[serde(default = "default_input_env")]
    pub input_env: String,

    /// Character cap for each relayed output chunk.
    #[serde(default = "default_max_reply_chars")]
    pub max_reply_chars: usize,
}

fn default_program() -> String {
    "python3".to_string()
}

fn default_args() -> Vec<String> {
    vec!["main.py".to_string(), "-a".to_string(), "3".to_string()]
}

fn default_cwd() -> PathBuf {
    PathBuf::from("venv/bin")
}

fn default_timeout() -> String {
    "3m".to_string()
}

fn default_kill_grace() -> String {
    "10s".to_string()
}

fn default_input_env() -> String {
    "RELAY_INPUT_FILE".to_string()
}

fn default_max_reply_chars() -> usize {
    2000
}

impl Default for RawWorkerSection {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            cwd: default_cwd(),
            timeout: default_timeout(),
            kill_grace: default_kill_grace(),
            input_env: default_input_env(),
            max_reply_chars: default_max_reply_chars(),
        }
    }
}

/// `[scratch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ScratchSettings {
    #[serde(default)]
    pub mode: ScratchMode,

    /// Fixed file used in `shared` mode.
    #[serde(default = "default_scratch_path")]
    pub path: PathBuf,

    /// Directory holding per-request files in `per_request` mode.
    #[serde(default = "default_scratch_dir")]
    pub dir: PathBuf,
}

fn default_scratch_path() -> PathBuf {
    PathBuf::from("data.txt")
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from(".relaybot/scratch")
}

impl Default for ScratchSettings {
    fn default() -> Self {
        Self {
            mode: ScratchMode::default(),
            path: default_scratch_path(),
            dir: default_scratch_dir(),
        }
    }
}

/// `[messages]` section: fixed reply texts.
#[derive(Debug, Clone, Deserialize)]
pub struct Messages {
    #[serde(default = "default_greeting")]
    pub greeting: String,

    #[serde(default = "default_invalid_input")]
    pub invalid_input: String,

    #[serde(default = "default_internal_error")]
    pub internal_error: String,

    #[serde(default = "default_processing")]
    pub processing: String,
}

fn default_greeting() -> String {
    "Hello! Please paste your NotPixel Query ID.".to_string()
}

fn default_invalid_input() -> String {
    "Invalid input. Please provide a valid Query ID.".to_string()
}

fn default_internal_error() -> String {
    "An error occurred while processing your input.".to_string()
}

fn default_processing() -> String {
    "Processing your request. Please wait...".to_string()
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            invalid_input: default_invalid_input(),
            internal_error: default_internal_error(),
            processing: default_processing(),
        }
    }
}

/// Checked `[bot]` settings.
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub token_env: String,
    pub api_url: String,
    pub poll_timeout: Duration,
    pub poll_retry_delay: Duration,
    pub shutdown_grace: Duration,
}

/// Checked `[worker]` settings: everything needed to launch one run.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
    pub kill_grace: Duration,
    pub input_env: String,
    pub max_reply_chars: usize,
}

/// Validated configuration.
///
/// Can only be obtained through `TryFrom<RawConfigFile>`, so every duration
/// is parsed and every limit is in range.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub bot: BotSettings,
    pub worker: WorkerSpec,
    pub scratch: ScratchSettings,
    pub messages: Messages,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        bot: BotSettings,
        worker: WorkerSpec,
        scratch: ScratchSettings,
        messages: Messages,
    ) -> Self {
        Self {
            bot,
            worker,
            scratch,
            messages,
        }
    }
}
