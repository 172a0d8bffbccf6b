// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
}

/// In-memory filesystem keyed by the exact path given.
///
/// Paths are not normalised: `a/b.json` and `./a/b.json` are different
/// entries. Parent directories are created implicitly on write.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.entries();
        if let Some(parent) = path.parent() {
            ensure_dir_entry(&mut files, parent);
        }
        files.insert(path, MockEntry::File(content.into()));
    }

    /// Remove a file or directory entry; returns whether it existed.
    pub fn remove(&self, path: impl AsRef<Path>) -> bool {
        self.entries().remove(path.as_ref()).is_some()
    }

    /// Number of file entries (directories excluded).
    pub fn file_count(&self) -> usize {
        self.entries()
            .values()
            .filter(|e| matches!(e, MockEntry::File(_)))
            .count()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if path.as_os_str().is_empty() || files.contains_key(path) {
        return;
    }
    files.insert(path.to_path_buf(), MockEntry::Dir);
    if let Some(parent) = path.parent() {
        ensure_dir_entry(files, parent);
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let files = self.entries();
        match files.get(path) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if self.is_dir(path) {
            bail!("Is a directory: {:?}", path);
        }
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.entries().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.entries().get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entries().get(path), Some(MockEntry::Dir))
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        let mut files = self.entries();
        if files.contains_key(path) {
            bail!("Already exists: {:?}", path);
        }
        if let Some(parent) = path.parent() {
            ensure_dir_entry(&mut files, parent);
        }
        files.insert(path.to_path_buf(), MockEntry::Dir);
        Ok(())
    }
}
