// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("environment variable {0} is not set; the bot token is required")]
    MissingToken(String),

    #[error("failed to write scratch file {path:?}: {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to start worker '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("chat gateway error: {0}")]
    Gateway(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RelayError>;
