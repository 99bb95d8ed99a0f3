//! HTTP handlers for the attendance and student API.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rollcall_core::{AttendanceRecord, NewAttendance, NewStudent, Student};
use serde::Serialize;

use crate::error::ApiError;
use crate::extract::Payload;
use crate::server::AppState;

/// Body of `GET /api/health`.
#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub message: &'static str,
}

/// Envelope for a freshly created resource.
#[derive(Debug, Serialize)]
pub struct Created<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Created<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

pub async fn health() -> Json<Health> {
    Json(Health {
        status: "UP",
        message: "Server is running",
    })
}

/// Ingest one attendance event from a device and push it to realtime listeners.
pub async fn create_attendance(
    State(state): State<AppState>,
    Payload(body): Payload,
) -> Result<(StatusCode, Json<Created<AttendanceRecord>>), ApiError> {
    let new = NewAttendance::from_payload(&body)?;
    let record = state.attendance.record(new)?;
    Ok((StatusCode::CREATED, Json(Created::new(record))))
}

pub async fn list_attendance(
    State(state): State<AppState>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError> {
    Ok(Json(state.attendance.list()?))
}

pub async fn register_student(
    State(state): State<AppState>,
    Payload(body): Payload,
) -> Result<(StatusCode, Json<Created<Student>>), ApiError> {
    let new = NewStudent::from_payload(&body)?;
    let student = state.students.register(new)?;
    Ok((StatusCode::CREATED, Json(Created::new(student))))
}

pub async fn list_students(State(state): State<AppState>) -> Result<Json<Vec<Student>>, ApiError> {
    Ok(Json(state.students.list()?))
}
