//! Device report ingestion
//!
//! The device POSTs form-encoded bodies of two shapes:
//! - `arduino_response=<report>`: classified, then stored in the status slot
//! - `id=<subject>&timestamp=<when>`: appended to the attendance ledger
//!
//! Every body is also captured in the diagnostic inbox once the response is
//! decided.

use axum::{body::Bytes, extract::State, Json};
use fpb_common::store::AttendanceEntry;
use fpb_common::{classify, Error};
use serde::Serialize;
use tracing::{info, warn};
use url::form_urlencoded;

use super::{field, report_storage_failure};
use crate::{ApiError, ApiResult, AppState};

/// Successful ingestion acknowledgement
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub message: String,
    /// Classified report kind; absent for attendance events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<&'static str>,
}

/// POST / and POST /index.php
pub async fn handle_report(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<IngestResponse>> {
    let fields: Vec<(String, String)> = form_urlencoded::parse(&body).into_owned().collect();

    let result = ingest(&state, &fields).await;

    state.inbox.record(format!(
        "Received: {} | Parsed: {}",
        String::from_utf8_lossy(&body),
        render_fields(&fields)
    ));

    result.map(Json)
}

async fn ingest(state: &AppState, fields: &[(String, String)]) -> ApiResult<IngestResponse> {
    if let Some(report) = field(fields, "arduino_response") {
        return ingest_report(state, report).await;
    }

    match (field(fields, "id"), field(fields, "timestamp")) {
        (Some(id), Some(timestamp)) => ingest_attendance(state, timestamp, id).await,
        _ => {
            warn!(fields = fields.len(), "Device POST carried no recognized data");
            Err(Error::NoRecognizedData.into())
        }
    }
}

async fn ingest_report(state: &AppState, report: &str) -> ApiResult<IngestResponse> {
    let report = report.trim();
    let outcome = classify(report);

    let Some(value) = outcome.slot_value() else {
        warn!(report = %report, "Unrecognized device report");
        state
            .inbox
            .record(format!("Unrecognized arduino_response: {}", report));
        return Err(Error::Unrecognized(report.to_string()).into());
    };

    if let Err(e) = state.status.write(value).await {
        report_storage_failure(state, &e, "Failed to store device status");
        return Err(ApiError::context(e, "Failed to store device status"));
    }

    info!(outcome = outcome.name(), "Device status updated");
    Ok(IngestResponse {
        success: true,
        message: outcome.ack_message().to_string(),
        outcome: Some(outcome.name()),
    })
}

async fn ingest_attendance(
    state: &AppState,
    timestamp: &str,
    id: &str,
) -> ApiResult<IngestResponse> {
    let entry = AttendanceEntry::new(timestamp, id)
        .map_err(|e| ApiError::context(e, "Failed to log attendance"))?;

    if let Err(e) = state.ledger.append(&entry).await {
        report_storage_failure(state, &e, "Failed to log attendance");
        return Err(ApiError::context(e, "Failed to log attendance"));
    }

    info!(subject_id = %entry.subject_id, timestamp = %entry.timestamp, "Attendance logged");
    Ok(IngestResponse {
        success: true,
        message: "Attendance logged".to_string(),
        outcome: None,
    })
}

fn render_fields(fields: &[(String, String)]) -> String {
    let pairs: Vec<String> = fields
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}
