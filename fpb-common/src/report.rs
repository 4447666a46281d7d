//! Device report classification
//!
//! The device pushes free-form text reports. [`classify`] turns one report into a
//! [`ReportOutcome`] by walking an ordered prefix table; the first matching rule
//! wins and anything left over is [`ReportOutcome::Unrecognized`].

use serde::Serialize;

/// Typed outcome of one device report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportOutcome {
    /// `arduino_status:<rest>`, carries only `<rest>`
    StatusUpdate { text: String },
    /// `enrollment_success:` / `enrollment_failed:`, carries the full report
    EnrollmentResult { success: bool, detail: String },
    /// `deleted_success:` / `deleted_failed:`, carries the full report
    DeletionResult { success: bool, detail: String },
    /// List refresh acknowledged (or list request failed on the device side)
    ListTriggerAck { detail: String },
    /// Any other `arduino_error:` report
    DeviceError { detail: String },
    /// Nothing matched
    Unrecognized { raw: String },
}

impl ReportOutcome {
    /// Text stored in the status slot, `None` for reports that must not reach it
    pub fn slot_value(&self) -> Option<&str> {
        match self {
            ReportOutcome::StatusUpdate { text } => Some(text),
            ReportOutcome::EnrollmentResult { detail, .. }
            | ReportOutcome::DeletionResult { detail, .. }
            | ReportOutcome::ListTriggerAck { detail }
            | ReportOutcome::DeviceError { detail } => Some(detail),
            ReportOutcome::Unrecognized { .. } => None,
        }
    }

    /// Acknowledgement returned to the device once the outcome is stored
    pub fn ack_message(&self) -> &'static str {
        match self {
            ReportOutcome::StatusUpdate { .. } => "Status updated",
            ReportOutcome::EnrollmentResult { .. } => "Enrollment result received",
            ReportOutcome::DeletionResult { .. } => "Deletion result received",
            ReportOutcome::ListTriggerAck { .. } => "List command processed confirmation received",
            ReportOutcome::DeviceError { .. } => "Arduino error received",
            ReportOutcome::Unrecognized { .. } => "Unrecognized arduino_response data received",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReportOutcome::StatusUpdate { .. } => "status_update",
            ReportOutcome::EnrollmentResult { .. } => "enrollment_result",
            ReportOutcome::DeletionResult { .. } => "deletion_result",
            ReportOutcome::ListTriggerAck { .. } => "list_trigger_ack",
            ReportOutcome::DeviceError { .. } => "device_error",
            ReportOutcome::Unrecognized { .. } => "unrecognized",
        }
    }
}

/// One classification rule: a prefix and how to build the outcome from
/// `(full report, remainder after the prefix)`.
struct Rule {
    prefix: &'static str,
    build: fn(&str, &str) -> ReportOutcome,
}

/// Evaluated top to bottom. `arduino_error:List_Request_Failed:` must stay ahead
/// of the generic `arduino_error:` rule.
const RULES: &[Rule] = &[
    Rule {
        prefix: "arduino_status:",
        build: |_, rest| ReportOutcome::StatusUpdate { text: rest.to_string() },
    },
    Rule {
        prefix: "enrollment_success:",
        build: |raw, _| ReportOutcome::EnrollmentResult { success: true, detail: raw.to_string() },
    },
    Rule {
        prefix: "enrollment_failed:",
        build: |raw, _| ReportOutcome::EnrollmentResult { success: false, detail: raw.to_string() },
    },
    Rule {
        prefix: "deleted_success:",
        build: |raw, _| ReportOutcome::DeletionResult { success: true, detail: raw.to_string() },
    },
    Rule {
        prefix: "deleted_failed:",
        build: |raw, _| ReportOutcome::DeletionResult { success: false, detail: raw.to_string() },
    },
    Rule {
        prefix: "fingerprint_list_trigger_ok:",
        build: |raw, _| ReportOutcome::ListTriggerAck { detail: raw.to_string() },
    },
    Rule {
        prefix: "arduino_error:List_Request_Failed:",
        build: |raw, _| ReportOutcome::ListTriggerAck { detail: raw.to_string() },
    },
    Rule {
        prefix: "arduino_error:",
        build: |raw, _| ReportOutcome::DeviceError { detail: raw.to_string() },
    },
];

/// Classify a raw device report. Pure and total.
pub fn classify(raw: &str) -> ReportOutcome {
    RULES
        .iter()
        .find_map(|rule| raw.strip_prefix(rule.prefix).map(|rest| (rule.build)(raw, rest)))
        .unwrap_or_else(|| ReportOutcome::Unrecognized { raw: raw.to_string() })
}
