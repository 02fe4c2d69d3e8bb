// src/config/mod.rs

//! Configuration loading and validation for relaybot.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and read the token (`loader.rs`).
//! - Validate durations and limits (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default, token_from_env};
pub use model::{
    BotSettings, ConfigFile, Messages, RawBotSection, RawConfigFile, RawWorkerSection,
    ScratchSettings, WorkerSpec,
};
pub use validate::{parse_duration, validate_config};
