//! fpb-relay library - device command relay and report ingestion
//!
//! Bridges the browser dashboard and the fingerprint device: dashboard commands
//! are relayed to the device, device reports are classified and persisted, and
//! the dashboard polls the persisted state.

use axum::Router;
use fpb_common::config::RelayConfig;
use fpb_common::store::{
    AttendanceLedger, DiagnosticSink, FileInbox, FileLedger, FileStatusStore, StatusStore,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cli;
pub mod device;
pub mod error;

pub use crate::device::{CommandDispatcher, DeviceLink, HttpDeviceLink, RelayResult};
pub use crate::error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Latest device status slot
    pub status: Arc<dyn StatusStore>,
    /// Attendance records pushed by the device
    pub ledger: Arc<dyn AttendanceLedger>,
    /// Raw inbound traffic for operators
    pub inbox: Arc<dyn DiagnosticSink>,
    /// Relay to the device
    pub dispatcher: Arc<CommandDispatcher>,
}

impl AppState {
    pub fn new(
        status: Arc<dyn StatusStore>,
        ledger: Arc<dyn AttendanceLedger>,
        inbox: Arc<dyn DiagnosticSink>,
        dispatcher: Arc<CommandDispatcher>,
    ) -> Self {
        Self {
            status,
            ledger,
            inbox,
            dispatcher,
        }
    }

    /// File-backed stores under the data directory and an HTTP device link
    pub fn from_config(config: &RelayConfig) -> fpb_common::Result<Self> {
        let link = HttpDeviceLink::new(config.device_url.clone(), config.device_timeout)?;

        Ok(Self::new(
            Arc::new(FileStatusStore::new(config.status_path())),
            Arc::new(FileLedger::new(config.ledger_path())),
            Arc::new(FileInbox::new(config.inbox_path())),
            Arc::new(CommandDispatcher::new(Arc::new(link))),
        ))
    }
}

/// Build application router
///
/// The device firmware posts reports to `/index.php` and the dashboard polls the
/// same path with `?action=`; `/` is an alias for both.
pub fn build_router(state: AppState) -> Router {
    use axum::http::{header, Method};
    use axum::routing::get;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(api::handle_query).post(api::handle_report))
        .route("/index.php", get(api::handle_query).post(api::handle_report))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
