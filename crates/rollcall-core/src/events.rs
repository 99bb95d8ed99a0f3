use serde::{Deserialize, Serialize};

use crate::models::AttendanceRecord;

/// Events pushed to realtime listeners.
///
/// Wire shape is `{"event": "<name>", "data": <payload>}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum RealtimeEvent {
    #[serde(rename = "new-attendance")]
    NewAttendance(AttendanceRecord),
}

impl RealtimeEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::NewAttendance(_) => "new-attendance",
        }
    }
}
