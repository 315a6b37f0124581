use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

use super::controller::{
    chronic_absence_report, delete_record, get_records, get_student_summary, record_attendance,
};

pub fn init_attendance_router() -> Router<AppState> {
    Router::new()
        .route("/", post(record_attendance).get(get_records))
        .route("/{id}", delete(delete_record))
        .route("/students/{id}/summary", get(get_student_summary))
        .route("/reports/chronic-absence", get(chronic_absence_report))
}
