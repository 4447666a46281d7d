//! Diagnostic inbox: timestamped raw traffic for operators, never read back

use super::DiagnosticSink;
use crate::{Error, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// `YYYY-MM-DD HH:MM:SS - <line>`
fn stamp(line: &str) -> String {
    format!("{} - {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"), line)
}

/// Inbox appended to a log file from detached tasks
#[derive(Clone)]
pub struct FileInbox {
    path: Arc<PathBuf>,
    write_lock: Arc<Mutex<()>>,
}

impl FileInbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one stamped line and wait for it to land
    pub async fn append(&self, line: &str) -> Result<()> {
        let stamped = stamp(line);
        let _guard = self.write_lock.lock().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&*self.path)
            .await
            .map_err(|e| Error::from_write(e, &self.path))?;
        file.write_all(stamped.as_bytes())
            .await
            .map_err(|e| Error::from_write(e, &self.path))?;
        Ok(())
    }
}

impl DiagnosticSink for FileInbox {
    fn record(&self, line: String) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("Diagnostic inbox dropped a record: no async runtime");
            return;
        };

        let inbox = self.clone();
        handle.spawn(async move {
            if let Err(e) = inbox.append(&line).await {
                warn!(path = %inbox.path.display(), "Diagnostic inbox write failed: {}", e);
            }
        });
    }
}

/// Inbox that keeps stamped lines in memory, for tests
#[derive(Default)]
pub struct MemoryInbox {
    lines: StdMutex<Vec<String>>,
}

impl MemoryInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl DiagnosticSink for MemoryInbox {
    fn record(&self, line: String) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(stamp(&line).trim_end().to_string());
    }
}
