//! HTTP API handlers for fpb-relay

pub mod buildinfo;
pub mod health;
pub mod ingest;
pub mod query;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use ingest::handle_report;
pub use query::handle_query;

use crate::AppState;
use fpb_common::Error;
use tracing::error;

/// Value of `name` among decoded form or query pairs; the last occurrence wins
fn field<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Storage failures go to the operator log as well as to the caller
fn report_storage_failure(state: &AppState, err: &Error, what: &str) {
    if let Error::NotWritable { .. } = err {
        error!(kind = err.kind(), "{}: {}", what, err);
        state.inbox.record(format!("{}: {}", what, err));
    }
}
