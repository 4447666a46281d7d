//! # fpb common library
//!
//! Shared code for the fingerprint bridge:
//! - Error taxonomy
//! - Configuration loading
//! - Device report classification
//! - Browser command model
//! - Durable stores (status slot, attendance ledger, diagnostic inbox)

pub mod command;
pub mod config;
pub mod error;
pub mod report;
pub mod store;

pub use command::{Action, DeviceCommand, SubjectId};
pub use error::{Error, Result};
pub use report::{classify, ReportOutcome};
