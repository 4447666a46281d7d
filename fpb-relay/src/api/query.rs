//! Dashboard queries and relayed commands
//!
//! `GET ?action=<action>[&id=<n>]`. Enroll, delete and list refresh go to the
//! device; status and attendance are served from local state.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use fpb_common::store::ClearOutcome;
use fpb_common::Action;
use serde::Serialize;
use tracing::info;

use super::{field, report_storage_failure};
use crate::{ApiError, ApiResult, AppState};

/// enroll / delete
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub success: bool,
    pub message: String,
    pub esp_response: Option<String>,
}

/// get_list
#[derive(Debug, Serialize)]
pub struct ListTriggerResponse {
    pub success: bool,
    pub message: String,
    pub esp_trigger_response: Option<String>,
}

/// get_status
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub status: String,
}

/// get_attendance: rows are `[timestamp, subjectId]`
#[derive(Debug, Serialize)]
pub struct AttendanceResponse {
    pub success: bool,
    pub attendance: Vec<[String; 2]>,
}

/// clear_attendance
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// GET / and GET /index.php
///
/// The query is taken as raw pairs so repeated keys resolve like form fields
/// and a bad `id` is reported by the dispatcher rather than the extractor.
pub async fn handle_query(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Response> {
    let action: Action = field(&pairs, "action").unwrap_or_default().parse()?;
    let id = field(&pairs, "id");

    let response = match action {
        Action::Enroll | Action::Delete => {
            let relay = state.dispatcher.dispatch(action, id).await?;
            Json(CommandResponse {
                success: true,
                message: format!("Command sent to device: {}", relay.command_url),
                esp_response: relay.reply,
            })
            .into_response()
        }
        Action::GetList => {
            let relay = state.dispatcher.dispatch(action, id).await?;
            Json(ListTriggerResponse {
                success: true,
                message: "List refresh command sent to device.".to_string(),
                esp_trigger_response: relay.reply,
            })
            .into_response()
        }
        Action::GetStatus => {
            let status = state.status.read().await?;
            Json(StatusResponse {
                success: true,
                status: status.trim().to_string(),
            })
            .into_response()
        }
        Action::GetAttendance => {
            let attendance = state
                .ledger
                .list()
                .await?
                .into_iter()
                .map(|entry| [entry.timestamp, entry.subject_id])
                .collect();
            Json(AttendanceResponse {
                success: true,
                attendance,
            })
            .into_response()
        }
        Action::ClearAttendance => clear_attendance(&state).await?.into_response(),
    };

    Ok(response)
}

async fn clear_attendance(state: &AppState) -> ApiResult<Json<MessageResponse>> {
    let outcome = match state.ledger.clear().await {
        Ok(outcome) => outcome,
        Err(e) => {
            report_storage_failure(state, &e, "Failed to clear attendance log");
            return Err(ApiError::context(e, "Failed to clear attendance log"));
        }
    };

    let message = match outcome {
        ClearOutcome::Cleared => {
            info!("Attendance log cleared by dashboard");
            "Attendance log cleared."
        }
        ClearOutcome::NothingToClear => "Attendance log file does not exist, nothing to clear.",
    };

    Ok(Json(MessageResponse {
        success: true,
        message: message.to_string(),
    }))
}
