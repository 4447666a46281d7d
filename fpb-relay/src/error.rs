//! Error responses for fpb-relay
//!
//! Every failure leaves the service as `{"success": false, "message": ...}`,
//! the shape the dashboard and the device firmware both parse.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fpb_common::Error;
use serde::Serialize;
use std::fmt;

/// Failure returned from a handler, optionally prefixed with what was being done
#[derive(Debug)]
pub struct ApiError {
    source: Error,
    context: Option<&'static str>,
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
struct FailureBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_detail: Option<String>,
}

impl ApiError {
    /// Attach the operation that failed, e.g. "Failed to log attendance"
    pub fn context(source: Error, context: &'static str) -> Self {
        Self {
            source,
            context: Some(context),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.source {
            Error::MissingParameter(_)
            | Error::InvalidParameter(_)
            | Error::InvalidAction(_)
            | Error::NoRecognizedData => StatusCode::BAD_REQUEST,
            Error::Unrecognized(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::DeviceUnreachable { .. } => StatusCode::BAD_GATEWAY,
            Error::NotWritable { .. }
            | Error::MalformedRecord { .. }
            | Error::Io(_)
            | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the caller
    pub fn message(&self) -> String {
        let base = match &self.source {
            Error::MissingParameter(msg) | Error::InvalidParameter(msg) => msg.clone(),
            Error::InvalidAction(_) => "Invalid action".to_string(),
            Error::DeviceUnreachable { url, .. } => format!(
                "Failed to send command to device. Is it online and reachable at {}?",
                url
            ),
            Error::NotWritable { .. } => "File not writable. Check permissions.".to_string(),
            Error::Unrecognized(_) => "Unrecognized arduino_response data received".to_string(),
            Error::NoRecognizedData => "No recognized data received from device".to_string(),
            other => other.to_string(),
        };

        match self.context {
            Some(context) => format!("{}: {}", context, base),
            None => base,
        }
    }

    fn detail(&self) -> Option<String> {
        match &self.source {
            Error::DeviceUnreachable { detail, .. } => Some(detail.clone()),
            Error::NotWritable { .. } | Error::Io(_) => Some(self.source.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl From<Error> for ApiError {
    fn from(source: Error) -> Self {
        Self {
            source,
            context: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = FailureBody {
            success: false,
            message: self.message(),
            error_detail: self.detail(),
        };
        (self.status(), Json(body)).into_response()
    }
}
