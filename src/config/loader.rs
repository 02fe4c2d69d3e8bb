// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{RelayError, Result};

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the effective configuration for the CLI.
///
/// - An explicit path must exist.
/// - Without one, `Relaybot.toml` is used when present, otherwise the
///   built-in defaults.
pub fn load_or_default(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        return load_and_validate(path);
    }

    let fallback = default_config_path();
    if fallback.is_file() {
        debug!(path = ?fallback, "loading default config file");
        load_and_validate(&fallback)
    } else {
        debug!("no config file found; using built-in defaults");
        ConfigFile::try_from(RawConfigFile::default())
    }
}

/// Default config location: `Relaybot.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Relaybot.toml")
}

/// Read the bot token from the process environment.
pub fn token_from_env(var: &str) -> Result<String> {
    token_from_lookup(var, |name| std::env::var(name).ok())
}

/// Token lookup with an injectable source, so callers can test it without
/// touching the process environment.
///
/// Missing and blank values are both fatal.
pub fn token_from_lookup<F>(var: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => {
            error!(env = var, "bot token is not defined in the environment");
            Err(RelayError::MissingToken(var.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_trimmed() {
        let token = token_from_lookup("BOT_TOKEN", |_| Some(" 123:abc \n".to_string())).unwrap();
        assert_eq!(token, "123:abc");
    }

    #[test]
    fn missing_or_blank_token_is_an_error() {
        assert!(matches!(
            token_from_lookup("BOT_TOKEN", |_| None),
            Err(RelayError::MissingToken(name)) if name == "BOT_TOKEN"
        ));
        assert!(matches!(
            token_from_lookup("BOT_TOKEN", |_| Some("   ".to_string())),
            Err(RelayError::MissingToken(_))
        ));
    }
}
