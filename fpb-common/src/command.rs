//! Browser-issued commands and their device-facing form

use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Sensor template slots the device accepts
pub const SUBJECT_ID_MIN: u16 = 1;
pub const SUBJECT_ID_MAX: u16 = 254;

/// `action` query value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Enroll,
    Delete,
    GetList,
    GetStatus,
    GetAttendance,
    ClearAttendance,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Enroll => "enroll",
            Action::Delete => "delete",
            Action::GetList => "get_list",
            Action::GetStatus => "get_status",
            Action::GetAttendance => "get_attendance",
            Action::ClearAttendance => "clear_attendance",
        }
    }

    /// Whether this action is relayed to the device rather than served locally
    pub fn is_relayed(&self) -> bool {
        matches!(self, Action::Enroll | Action::Delete | Action::GetList)
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "enroll" => Ok(Action::Enroll),
            "delete" => Ok(Action::Delete),
            "get_list" => Ok(Action::GetList),
            "get_status" => Ok(Action::GetStatus),
            "get_attendance" => Ok(Action::GetAttendance),
            "clear_attendance" => Ok(Action::ClearAttendance),
            other => Err(Error::InvalidAction(other.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated fingerprint slot id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubjectId(u16);

impl SubjectId {
    pub fn new(value: u16) -> Result<Self> {
        if (SUBJECT_ID_MIN..=SUBJECT_ID_MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidParameter(format!(
                "ID must be between {} and {}",
                SUBJECT_ID_MIN, SUBJECT_ID_MAX
            )))
        }
    }

    /// Parse the raw `id` query value for `action`.
    ///
    /// Absent or blank ids are `MissingParameter` with the per-action message the
    /// dashboard shows; anything non-numeric or outside the slot range is
    /// `InvalidParameter`.
    pub fn parse_for(action: Action, raw: Option<&str>) -> Result<Self> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty());
        let Some(raw) = raw else {
            return Err(Error::MissingParameter(missing_id_message(action)));
        };

        let value: u16 = raw
            .parse()
            .map_err(|_| Error::InvalidParameter(format!("ID must be an integer, got {:?}", raw)))?;
        Self::new(value)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn missing_id_message(action: Action) -> String {
    match action {
        Action::Enroll => "ID is required for enrollment".to_string(),
        Action::Delete => "ID is required for deletion".to_string(),
        other => format!("ID is required for {}", other),
    }
}

/// Command sent over the network to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    Enroll(SubjectId),
    Delete(SubjectId),
    RefreshList,
}

impl DeviceCommand {
    /// Path and query relative to the device base URL
    pub fn path(&self) -> String {
        match self {
            DeviceCommand::Enroll(id) => format!("enroll?id={}", id),
            DeviceCommand::Delete(id) => format!("delete?id={}", id),
            DeviceCommand::RefreshList => "get_list".to_string(),
        }
    }

    /// Absolute URL against `base_url` (no trailing slash expected)
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.path())
    }
}
