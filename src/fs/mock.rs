// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// In-memory filesystem for tests.
///
/// Paths are keyed by their absolute form, so a relative and an absolute
/// spelling of the same file agree. Writes under a path registered with
/// [`MockFileSystem::fail_writes_under`] return an error, which lets tests
/// drive the persistence-failure branch.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    failing: Arc<Mutex<Vec<PathBuf>>>,
    writes: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut files = self.files.lock().unwrap();
        files.insert(key(path.as_ref()), content.into());
    }

    /// Make every write to `prefix` (or below it) fail.
    pub fn fail_writes_under(&self, prefix: impl AsRef<Path>) {
        let mut failing = self.failing.lock().unwrap();
        failing.push(key(prefix.as_ref()));
    }

    /// Every path written so far, in order, including failed attempts.
    pub fn write_log(&self) -> Vec<PathBuf> {
        self.writes.lock().unwrap().clone()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let files = self.files.lock().unwrap();
        match files.get(&key(path)) {
            Some(content) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let path = key(path);
        self.writes.lock().unwrap().push(path.clone());

        let blocked = {
            let failing = self.failing.lock().unwrap();
            failing.iter().any(|prefix| path.starts_with(prefix))
        };
        if blocked {
            return Err(anyhow!("Permission denied: {:?}", path));
        }

        self.add_file(&path, contents);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        files
            .remove(&key(path))
            .map(|_| ())
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(&key(path))
    }
}

fn key(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
