use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use schoolhouse_core::{AppError, ErrorResponse, Paginated, PaginationParams};
use schoolhouse_models::ids::{AttendanceRecordId, StudentId};
use tracing::instrument;

use crate::middleware::auth::{RequireAttendanceRead, RequireAttendanceWrite};
use crate::state::AppState;
use crate::utils::auth_helpers::{resource_scope, scoped_school_id};
use crate::validator::{ValidatedJson, ValidatedQuery};

use super::model::{
    AttendanceFilterParams, AttendanceRecord, AttendanceSummary, BulkAttendanceDto,
    BulkAttendanceResult, ChronicAbsenceParams, ChronicAbsenceReport, DateRangeParams,
};
use super::service::AttendanceService;

/// Mark a section for one day
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = BulkAttendanceDto,
    responses(
        (status = 200, description = "Attendance recorded", body = BulkAttendanceResult),
        (status = 400, description = "Future date or student not enrolled", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn record_attendance(
    State(state): State<AppState>,
    RequireAttendanceWrite(auth_user): RequireAttendanceWrite,
    ValidatedJson(dto): ValidatedJson<BulkAttendanceDto>,
) -> Result<Json<BulkAttendanceResult>, AppError> {
    let recorded_by = auth_user.staff_id()?;
    let result =
        AttendanceService::record_attendance(&state.db, resource_scope(&auth_user), recorded_by, dto)
            .await?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceFilterParams, PaginationParams),
    responses(
        (status = 200, description = "Paginated attendance records", body = Paginated<AttendanceRecord>),
        (status = 400, description = "Invalid date range", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_records(
    State(state): State<AppState>,
    RequireAttendanceRead(auth_user): RequireAttendanceRead,
    ValidatedQuery(filters): ValidatedQuery<AttendanceFilterParams>,
    ValidatedQuery(pagination): ValidatedQuery<PaginationParams>,
) -> Result<Json<Paginated<AttendanceRecord>>, AppError> {
    let school_id = scoped_school_id(&auth_user, filters.school_id)?;
    let records = AttendanceService::get_records(&state.db, school_id, filters, pagination).await?;
    Ok(Json(records))
}

#[utoipa::path(
    delete,
    path = "/api/attendance/{id}",
    params(("id" = AttendanceRecordId, Path, description = "Attendance record ID")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Record not found", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_record(
    State(state): State<AppState>,
    RequireAttendanceWrite(auth_user): RequireAttendanceWrite,
    Path(id): Path<AttendanceRecordId>,
) -> Result<StatusCode, AppError> {
    AttendanceService::delete_record(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/attendance/students/{id}/summary",
    params(("id" = StudentId, Path, description = "Student ID"), DateRangeParams),
    responses(
        (status = 200, description = "Attendance counts and rates", body = AttendanceSummary),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_student_summary(
    State(state): State<AppState>,
    RequireAttendanceRead(auth_user): RequireAttendanceRead,
    Path(id): Path<StudentId>,
    ValidatedQuery(range): ValidatedQuery<DateRangeParams>,
) -> Result<Json<AttendanceSummary>, AppError> {
    let summary = AttendanceService::get_student_summary(
        &state.db,
        id,
        resource_scope(&auth_user),
        range.from,
        range.to,
    )
    .await?;
    Ok(Json(summary))
}

/// Students at or above an absence-rate threshold
#[utoipa::path(
    get,
    path = "/api/attendance/reports/chronic-absence",
    params(ChronicAbsenceParams),
    responses(
        (status = 200, description = "Chronically absent students", body = ChronicAbsenceReport),
        (status = 400, description = "Invalid threshold or date range", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn chronic_absence_report(
    State(state): State<AppState>,
    RequireAttendanceRead(auth_user): RequireAttendanceRead,
    ValidatedQuery(params): ValidatedQuery<ChronicAbsenceParams>,
) -> Result<Json<ChronicAbsenceReport>, AppError> {
    let school_id = scoped_school_id(&auth_user, params.school_id)?;
    let report = AttendanceService::chronic_absence_report(
        &state.db,
        school_id,
        params.from,
        params.to,
        params.threshold,
    )
    .await?;
    Ok(Json(report))
}
