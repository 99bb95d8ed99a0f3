use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::payload::{self, Payload};

/// Device id recorded when the reporting device does not identify itself.
pub const UNKNOWN_DEVICE: &str = "unknown";

/// A registered student. Never updated or deleted once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: u64,
    pub name: String,
    pub student_id: String,
    pub rfid_tag: String,
    pub registered_at: String,
}

/// One logged presence event. `student_id` is free text and is not checked
/// against registered students.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: u64,
    pub student_id: String,
    /// Caller supplied, stored verbatim.
    pub timestamp: String,
    pub device_id: String,
    pub recorded_at: String,
}

/// Validated registration input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewStudent {
    pub name: String,
    pub student_id: String,
    pub rfid_tag: String,
}

impl NewStudent {
    pub fn from_payload(payload: &Payload) -> Result<Self, ValidationError> {
        let [name, student_id, rfid_tag] =
            payload::required(payload, ["name", "studentId", "rfidTag"])
                .map_err(|missing| ValidationError::MissingFields { missing })?;
        Ok(Self {
            name,
            student_id,
            rfid_tag,
        })
    }

    pub fn into_student(self, id: u64, registered_at: String) -> Student {
        Student {
            id,
            name: self.name,
            student_id: self.student_id,
            rfid_tag: self.rfid_tag,
            registered_at,
        }
    }
}

/// Validated attendance input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAttendance {
    pub student_id: String,
    pub timestamp: String,
    pub device_id: Option<String>,
}

impl NewAttendance {
    pub fn from_payload(payload: &Payload) -> Result<Self, ValidationError> {
        let [student_id, timestamp] = payload::required(payload, ["studentId", "timestamp"])
            .map_err(|missing| ValidationError::MissingFields { missing })?;
        Ok(Self {
            student_id,
            timestamp,
            device_id: payload::field(payload, "deviceId"),
        })
    }

    pub fn into_record(self, id: u64, recorded_at: String) -> AttendanceRecord {
        AttendanceRecord {
            id,
            student_id: self.student_id,
            timestamp: self.timestamp,
            device_id: self.device_id.unwrap_or_else(|| UNKNOWN_DEVICE.to_string()),
            recorded_at,
        }
    }
}

/// Current UTC time as RFC 3339 with millisecond precision and a `Z` suffix.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
