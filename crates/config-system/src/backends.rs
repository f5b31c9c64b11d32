//! String-level storage backends for the configuration stores

use crate::store::ConfigBackend;
use crate::{Result, StoreError};
use parking_lot::RwLock;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Backend persisting the raw store contents to a JSON file on disk
pub struct JsonFileBackend {
    label: String,
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(label: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self {
            label: label.into(),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, err: std::io::Error) -> StoreError {
        StoreError::Io {
            label: self.label.clone(),
            message: err.to_string(),
        }
    }
}

impl ConfigBackend for JsonFileBackend {
    fn label(&self) -> &str {
        &self.label
    }

    fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn write(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        fs::write(&self.path, contents).map_err(|e| self.io_error(e))
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err)),
        }
    }
}

/// In-memory backend, session-scoped.
///
/// Clones share contents, so tests can keep a handle and inject raw strings
/// while the store owns another clone.
#[derive(Clone)]
pub struct MemoryBackend {
    label: String,
    contents: Arc<RwLock<Option<String>>>,
}

impl MemoryBackend {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            contents: Arc::new(RwLock::new(None)),
        }
    }

    /// Overwrite the stored string without any validation
    pub fn inject_raw(&self, contents: impl Into<String>) {
        *self.contents.write() = Some(contents.into());
    }

    /// Current raw contents, as a backend consumer would read them
    pub fn raw(&self) -> Option<String> {
        self.contents.read().clone()
    }
}

impl ConfigBackend for MemoryBackend {
    fn label(&self) -> &str {
        &self.label
    }

    fn read(&self) -> Result<Option<String>> {
        Ok(self.contents.read().clone())
    }

    fn write(&self, contents: &str) -> Result<()> {
        *self.contents.write() = Some(contents.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.contents.write() = None;
        Ok(())
    }
}
