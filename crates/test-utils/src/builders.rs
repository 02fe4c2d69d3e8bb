#![allow(dead_code)]

use std::path::Path;

use relaybot::config::{ConfigFile, RawConfigFile};
use relaybot::types::ScratchMode;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    /// Worker command line.
    pub fn worker(mut self, program: &str, args: &[&str]) -> Self {
        self.config.worker.program = program.to_string();
        self.config.worker.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    /// `sh -c <script>` as the worker.
    pub fn shell_worker(self, script: &str) -> Self {
        self.worker("sh", &["-c", script])
    }

    pub fn worker_cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.config.worker.cwd = cwd.as_ref().to_path_buf();
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.config.worker.timeout = timeout.to_string();
        self
    }

    pub fn kill_grace(mut self, grace: &str) -> Self {
        self.config.worker.kill_grace = grace.to_string();
        self
    }

    pub fn max_reply_chars(mut self, max: usize) -> Self {
        self.config.worker.max_reply_chars = max;
        self
    }

    pub fn scratch_mode(mut self, mode: ScratchMode) -> Self {
        self.config.scratch.mode = mode;
        self
    }

    pub fn scratch_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.scratch.dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn scratch_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.scratch.path = path.as_ref().to_path_buf();
        self
    }

    pub fn poll_retry_delay(mut self, delay: &str) -> Self {
        self.config.bot.poll_retry_delay = delay.to_string();
        self
    }

    pub fn shutdown_grace(mut self, grace: &str) -> Self {
        self.config.bot.shutdown_grace = grace.to_string();
        self
    }

    pub fn raw(&self) -> &RawConfigFile {
        &self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
