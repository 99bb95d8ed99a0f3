pub mod errors;
pub mod events;
pub mod models;
pub mod payload;

pub use errors::ValidationError;
pub use events::RealtimeEvent;
pub use models::{now_timestamp, AttendanceRecord, NewAttendance, NewStudent, Student, UNKNOWN_DEVICE};
