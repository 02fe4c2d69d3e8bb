// src/scratch.rs

//! Persisting the request value for the worker to pick up.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::ScratchSettings;
use crate::errors::{RelayError, Result};
use crate::fs::FileSystem;
use crate::input::RequestValue;
use crate::types::{RequestId, ScratchMode};

/// Writes validated values to scratch files.
#[derive(Debug, Clone)]
pub struct ScratchWriter {
    fs: Arc<dyn FileSystem>,
    settings: ScratchSettings,
}

impl ScratchWriter {
    pub fn new(fs: Arc<dyn FileSystem>, settings: ScratchSettings) -> Self {
        Self { fs, settings }
    }

    /// Path the value of request `id` is written to.
    pub fn path_for(&self, id: RequestId) -> PathBuf {
        match self.settings.mode {
            ScratchMode::PerRequest => self.settings.dir.join(format!("request-{id}.txt")),
            ScratchMode::Shared => self.settings.path.clone(),
        }
    }

    /// Write `value` as the complete contents of the scratch file.
    ///
    /// Prior contents are truncated. No newline is appended. The returned
    /// handle carries the absolute path, which is what the worker receives.
    pub fn write(&self, id: RequestId, value: &RequestValue) -> Result<ScratchFile> {
        let relative = self.path_for(id);
        let path = std::path::absolute(&relative).map_err(|e| RelayError::Scratch {
            path: relative.clone(),
            source: e.into(),
        })?;

        self.fs
            .write(&path, value.as_str().as_bytes())
            .map_err(|source| RelayError::Scratch {
                path: path.clone(),
                source,
            })?;

        debug!(request_id = id, path = ?path, "scratch file written");

        Ok(ScratchFile {
            path,
            fs: Arc::clone(&self.fs),
            remove_on_drop: self.settings.mode == ScratchMode::PerRequest,
        })
    }
}

/// A written scratch file.
///
/// Per-request files are removed when the handle is dropped; the shared file
/// is left in place for the next request to overwrite.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
    remove_on_drop: bool,
}

impl ScratchFile {
    /// Absolute path of the file, valid from any working directory.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.remove_on_drop {
            return;
        }
        if let Err(e) = self.fs.remove_file(&self.path) {
            warn!(path = ?self.path, error = %e, "failed to remove scratch file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn settings(mode: ScratchMode) -> ScratchSettings {
        ScratchSettings {
            mode,
            path: PathBuf::from("data.txt"),
            dir: PathBuf::from("scratch"),
        }
    }

    fn value(s: &str) -> RequestValue {
        RequestValue::parse(s).unwrap()
    }

    #[test]
    fn per_request_files_are_isolated_and_cleaned_up() {
        let fs = MockFileSystem::new();
        let writer = ScratchWriter::new(Arc::new(fs.clone()), settings(ScratchMode::PerRequest));

        let first = writer.write(1, &value("first")).unwrap();
        let second = writer.write(2, &value("second")).unwrap();

        assert_ne!(first.path(), second.path());
        assert_eq!(fs.read_to_string(first.path()).unwrap(), "first");
        assert_eq!(fs.read_to_string(second.path()).unwrap(), "second");

        let first_path = first.path().to_path_buf();
        drop(first);
        assert!(!fs.exists(&first_path));
        assert!(fs.exists(second.path()));
        assert!(second.path().is_absolute());
    }

    #[test]
    fn shared_file_is_overwritten_and_kept() {
        let fs = MockFileSystem::new();
        let writer = ScratchWriter::new(Arc::new(fs.clone()), settings(ScratchMode::Shared));

        drop(writer.write(1, &value("a-much-longer-value")).unwrap());
        drop(writer.write(2, &value("short")).unwrap());

        assert_eq!(fs.read_to_string(Path::new("data.txt")).unwrap(), "short");
    }

    #[test]
    fn write_failure_is_reported_with_path() {
        let fs = MockFileSystem::new();
        fs.fail_writes_under("scratch");
        let writer = ScratchWriter::new(Arc::new(fs), settings(ScratchMode::PerRequest));

        match writer.write(7, &value("x")) {
            Err(RelayError::Scratch { path, .. }) => {
                assert!(path.ends_with("scratch/request-7.txt"), "{path:?}")
            }
            other => panic!("expected Scratch error, got {other:?}"),
        }
    }
}
