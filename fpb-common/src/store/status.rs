//! Status slot implementations

use super::{StatusStore, NO_STATUS_YET};
use crate::{Error, Result};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Slot backed by a single text file, replaced via temp file + rename
pub struct FileStatusStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling temp path, unique per write so concurrent processes never share one
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "status".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
    }
}

#[async_trait]
impl StatusStore for FileStatusStore {
    async fn write(&self, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let temp = self.temp_path();
        let staged = match tokio::fs::write(&temp, value).await {
            Ok(()) => tokio::fs::rename(&temp, &self.path).await,
            Err(e) => Err(e),
        };

        if let Err(e) = staged {
            // A partly written or unrenamed temp file must not outlive the attempt
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(Error::from_write(e, &self.path));
        }

        debug!(path = %self.path.display(), bytes = value.len(), "Status slot replaced");
        Ok(())
    }

    async fn read(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(value) => Ok(value),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(NO_STATUS_YET.to_string()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

/// In-memory slot for tests; `set_writable(false)` simulates a read-only medium
#[derive(Default)]
pub struct MemoryStatusStore {
    value: RwLock<Option<String>>,
    read_only: AtomicBool,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_writable(&self, writable: bool) {
        self.read_only.store(!writable, Ordering::SeqCst);
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn write(&self, value: &str) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(Error::NotWritable {
                path: "memory:status".to_string(),
                detail: "store is read-only".to_string(),
            });
        }
        *self.value.write().await = Some(value.to_string());
        Ok(())
    }

    async fn read(&self) -> Result<String> {
        Ok(self
            .value
            .read()
            .await
            .clone()
            .unwrap_or_else(|| NO_STATUS_YET.to_string()))
    }
}
