//! Attendance ledger implementations
//!
//! On-disk format: one `timestamp,subjectId` record per line, no header.

use super::{AttendanceEntry, AttendanceLedger, ClearOutcome};
use crate::{Error, Result};
use async_trait::async_trait;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Ledger backed by an append-only CSV-style file
pub struct FileLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Whether the file has content that does not end in `\n`, e.g. a record cut
/// short by a crash or a hand edit without a final newline
async fn has_open_tail(file: &mut File) -> io::Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1)).await?;
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}

#[async_trait]
impl AttendanceLedger for FileLedger {
    async fn append(&self, entry: &AttendanceEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::from_write(e, &self.path))?;

        let mut line = entry.to_line();
        if has_open_tail(&mut file).await.map_err(Error::Io)? {
            debug!(path = %self.path.display(), "Terminating unfinished ledger line");
            line.insert(0, '\n');
        }

        // One write of the whole line so O_APPEND keeps records contiguous
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| Error::from_write(e, &self.path))?;
        file.flush()
            .await
            .map_err(|e| Error::from_write(e, &self.path))?;

        debug!(
            timestamp = %entry.timestamp,
            subject_id = %entry.subject_id,
            "Attendance appended"
        );
        Ok(())
    }

    async fn list(&self) -> Result<Vec<AttendanceEntry>> {
        // Appends from this process finish before the read, so a final line
        // without `\n` is a real record, not a write in flight
        let _guard = self.write_lock.lock().await;
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(parse_ledger(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn clear(&self) -> Result<ClearOutcome> {
        let _guard = self.write_lock.lock().await;

        let opened = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .await;

        match opened {
            Ok(_) => {
                info!(path = %self.path.display(), "Attendance ledger cleared");
                Ok(ClearOutcome::Cleared)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ClearOutcome::NothingToClear),
            Err(e) => Err(Error::from_write(e, &self.path)),
        }
    }
}

/// Parse ledger file content into entries.
///
/// A last line without `\n` still counts. Lines without a comma are malformed
/// and skipped. The record splits on the first comma.
pub fn parse_ledger(content: &str) -> Vec<AttendanceEntry> {
    content
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            if line.is_empty() {
                return None;
            }
            match parse_line(index + 1, line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping ledger line: {}", e);
                    None
                }
            }
        })
        .collect()
}

fn parse_line(line_number: usize, line: &str) -> Result<AttendanceEntry> {
    let (timestamp, subject_id) = line.split_once(',').ok_or_else(|| Error::MalformedRecord {
        line: line_number,
        content: line.to_string(),
    })?;

    Ok(AttendanceEntry {
        timestamp: timestamp.to_string(),
        subject_id: subject_id.to_string(),
    })
}

/// In-memory ledger for tests; `set_writable(false)` simulates a read-only medium
#[derive(Default)]
pub struct MemoryLedger {
    // None until the first append, mirroring a file that does not exist yet
    entries: Mutex<Option<Vec<AttendanceEntry>>>,
    read_only: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_writable(&self, writable: bool) {
        self.read_only.store(!writable, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(Error::NotWritable {
                path: "memory:ledger".to_string(),
                detail: "ledger is read-only".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AttendanceLedger for MemoryLedger {
    async fn append(&self, entry: &AttendanceEntry) -> Result<()> {
        self.check_writable()?;
        self.entries
            .lock()
            .await
            .get_or_insert_with(Vec::new)
            .push(entry.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<AttendanceEntry>> {
        Ok(self.entries.lock().await.clone().unwrap_or_default())
    }

    async fn clear(&self) -> Result<ClearOutcome> {
        let mut entries = self.entries.lock().await;
        match entries.as_mut() {
            None => Ok(ClearOutcome::NothingToClear),
            Some(existing) => {
                self.check_writable()?;
                existing.clear();
                Ok(ClearOutcome::Cleared)
            }
        }
    }
}
