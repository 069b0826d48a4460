//! Attendance status as reported by the service.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Raw `data` payload of a `getstatus` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub clock_in_time: Option<String>,
    #[serde(default)]
    pub clock_out_time: Option<String>,
    #[serde(default)]
    pub working_time: Option<String>,
    #[serde(default)]
    pub motivation_message: Option<String>,
    #[serde(default, deserialize_with = "lenient_minutes")]
    pub weekly_minutes: Option<u32>,
    #[serde(default, deserialize_with = "lenient_minutes")]
    pub monthly_minutes: Option<u32>,
}

/// Today's attendance state. Times are display strings from the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendanceStatus {
    NotClockedIn {
        motivation_message: Option<String>,
    },
    ClockedIn {
        clock_in_time: String,
    },
    ClockedOut {
        clock_in_time: String,
        clock_out_time: String,
        working_time: String,
    },
}

impl AttendanceStatus {
    #[cfg(test)]
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::NotClockedIn { .. } => "not_clocked_in",
            AttendanceStatus::ClockedIn { .. } => "clocked_in",
            AttendanceStatus::ClockedOut { .. } => "clocked_out",
        }
    }
}

/// A decoded status together with the aggregate figures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub status: AttendanceStatus,
    pub weekly_minutes: Option<u32>,
    pub monthly_minutes: Option<u32>,
}

/// Reasons a status payload cannot be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("status payload is missing")]
    MissingPayload,
    #[error("malformed status payload: {0}")]
    Malformed(String),
    #[error("status field is missing")]
    MissingStatus,
    #[error("unrecognized status \"{0}\"")]
    Unknown(String),
    #[error("status \"{status}\" requires {field}")]
    MissingField {
        status: &'static str,
        field: &'static str,
    },
}

impl TryFrom<StatusPayload> for StatusSnapshot {
    type Error = StatusError;

    fn try_from(payload: StatusPayload) -> Result<Self, Self::Error> {
        let raw = payload.status.ok_or(StatusError::MissingStatus)?;

        let status = match raw.as_str() {
            "not_clocked_in" => AttendanceStatus::NotClockedIn {
                motivation_message: payload.motivation_message,
            },
            "clocked_in" => AttendanceStatus::ClockedIn {
                clock_in_time: required(payload.clock_in_time, "clocked_in", "clockInTime")?,
            },
            "clocked_out" => AttendanceStatus::ClockedOut {
                clock_in_time: required(payload.clock_in_time, "clocked_out", "clockInTime")?,
                clock_out_time: required(payload.clock_out_time, "clocked_out", "clockOutTime")?,
                working_time: required(payload.working_time, "clocked_out", "workingTime")?,
            },
            _ => return Err(StatusError::Unknown(raw)),
        };

        Ok(StatusSnapshot {
            status,
            weekly_minutes: payload.weekly_minutes,
            monthly_minutes: payload.monthly_minutes,
        })
    }
}

impl StatusSnapshot {
    /// Decode the `data` member of a service response.
    pub fn from_data(data: Option<&Value>) -> Result<Self, StatusError> {
        let data = data.ok_or(StatusError::MissingPayload)?;
        let payload: StatusPayload = serde_json::from_value(data.clone())
            .map_err(|e| StatusError::Malformed(e.to_string()))?;
        Self::try_from(payload)
    }
}

/// Minutes as a whole number. Fractions round, negatives clamp to zero, and
/// anything that is not a number counts as absent.
fn lenient_minutes<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_f64)
        .filter(|m| m.is_finite())
        .map(|m| m.round().clamp(0.0, u32::MAX as f64) as u32))
}

fn required(
    value: Option<String>,
    status: &'static str,
    field: &'static str,
) -> Result<String, StatusError> {
    value.ok_or(StatusError::MissingField { status, field })
}
