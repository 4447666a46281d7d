//! Durable state owned by the bridge
//!
//! Three resources, each behind a trait so handlers can be driven by the
//! file-backed implementations in production and by in-memory fakes in tests:
//!
//! - [`StatusStore`]: single slot holding the latest classified device report
//! - [`AttendanceLedger`]: append-only `(timestamp, subject id)` records with clear
//! - [`DiagnosticSink`]: fire-and-forget operator log of raw inbound traffic
//!
//! Writers on the same resource are serialized and readers never observe a torn
//! write. The slot is replaced by rename and read without a lock. The ledger is
//! read under its writer lock.

use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;

mod inbox;
mod ledger;
mod status;

pub use inbox::{FileInbox, MemoryInbox};
pub use ledger::{parse_ledger, FileLedger, MemoryLedger};
pub use status::{FileStatusStore, MemoryStatusStore};

/// Returned by [`StatusStore::read`] before the first report arrives
pub const NO_STATUS_YET: &str = "No status received yet.";

/// Single-slot, last-write-wins holder of the latest device status
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Replace the slot wholesale. On failure the previous value stays readable.
    async fn write(&self, value: &str) -> Result<()>;

    /// Current slot value, or [`NO_STATUS_YET`] if it was never written
    async fn read(&self) -> Result<String>;
}

/// One attendance record, in arrival order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceEntry {
    pub timestamp: String,
    pub subject_id: String,
}

impl AttendanceEntry {
    /// Build an entry that round-trips through the ledger line format.
    ///
    /// Line breaks or commas in either field would split or shift the record
    /// on read, so they are rejected.
    pub fn new(timestamp: impl Into<String>, subject_id: impl Into<String>) -> Result<Self> {
        let timestamp = timestamp.into();
        let subject_id = subject_id.into();

        if timestamp.contains(['\n', '\r', ',']) {
            return Err(Error::InvalidParameter(
                "timestamp must not contain commas or line breaks".to_string(),
            ));
        }
        if subject_id.contains(['\n', '\r', ',']) {
            return Err(Error::InvalidParameter(
                "id must not contain commas or line breaks".to_string(),
            ));
        }

        Ok(Self { timestamp, subject_id })
    }

    /// `timestamp,subjectId\n`
    pub fn to_line(&self) -> String {
        format!("{},{}\n", self.timestamp, self.subject_id)
    }
}

/// Result of a successful [`AttendanceLedger::clear`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    /// The ledger was never created
    NothingToClear,
}

/// Append-only attendance ledger with an explicit full clear
#[async_trait]
pub trait AttendanceLedger: Send + Sync {
    /// Add `entry` at the end. Fails with `NotWritable` if the medium refuses.
    async fn append(&self, entry: &AttendanceEntry) -> Result<()>;

    /// All entries in storage order; empty if the ledger was never created.
    /// Malformed lines are skipped.
    async fn list(&self) -> Result<Vec<AttendanceEntry>>;

    /// Empty the ledger. A ledger that does not exist yet is a successful no-op.
    async fn clear(&self) -> Result<ClearOutcome>;
}

/// Best-effort diagnostic channel. Implementations swallow their own failures.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, line: String);
}
