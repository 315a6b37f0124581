use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use schoolhouse_core::{AppError, ErrorResponse, Paginated, PaginationParams};
use schoolhouse_models::SchoolScopeParams;
use schoolhouse_models::ids::{NurseVisitId, StudentId};
use tracing::instrument;

use crate::middleware::auth::{RequireHealthRead, RequireHealthWrite};
use crate::state::AppState;
use crate::utils::auth_helpers::{resource_scope, scoped_school_id};
use crate::validator::{ValidatedJson, ValidatedQuery};

use super::model::{
    CreateNurseVisitDto, DailyReportParams, DailyVisitReport, HealthProfile, NurseVisit,
    NurseVisitFilterParams, UpsertHealthProfileDto,
};
use super::service::HealthOfficeService;

#[utoipa::path(
    get,
    path = "/api/health-office/students/{id}/profile",
    params(("id" = StudentId, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Health profile", body = HealthProfile),
        (status = 404, description = "Student or profile not found", body = ErrorResponse)
    ),
    tag = "Health Office",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_profile(
    State(state): State<AppState>,
    RequireHealthRead(auth_user): RequireHealthRead,
    Path(id): Path<StudentId>,
) -> Result<Json<HealthProfile>, AppError> {
    let profile = HealthOfficeService::get_profile(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    put,
    path = "/api/health-office/students/{id}/profile",
    params(("id" = StudentId, Path, description = "Student ID")),
    request_body = UpsertHealthProfileDto,
    responses(
        (status = 200, description = "Profile saved", body = HealthProfile),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Health Office",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn upsert_profile(
    State(state): State<AppState>,
    RequireHealthWrite(auth_user): RequireHealthWrite,
    Path(id): Path<StudentId>,
    ValidatedJson(dto): ValidatedJson<UpsertHealthProfileDto>,
) -> Result<Json<HealthProfile>, AppError> {
    let profile =
        HealthOfficeService::upsert_profile(&state.db, id, resource_scope(&auth_user), dto).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    post,
    path = "/api/health-office/visits",
    params(SchoolScopeParams),
    request_body = CreateNurseVisitDto,
    responses(
        (status = 201, description = "Visit recorded", body = NurseVisit),
        (status = 400, description = "Invalid visit times", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Health Office",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_visit(
    State(state): State<AppState>,
    RequireHealthWrite(auth_user): RequireHealthWrite,
    ValidatedQuery(scope): ValidatedQuery<SchoolScopeParams>,
    ValidatedJson(dto): ValidatedJson<CreateNurseVisitDto>,
) -> Result<(StatusCode, Json<NurseVisit>), AppError> {
    let school_id = scoped_school_id(&auth_user, scope.school_id)?;
    let staff_id = auth_user.staff_id()?;
    let visit = HealthOfficeService::create_visit(&state.db, school_id, staff_id, dto).await?;
    Ok((StatusCode::CREATED, Json(visit)))
}

#[utoipa::path(
    get,
    path = "/api/health-office/visits",
    params(NurseVisitFilterParams, PaginationParams),
    responses(
        (status = 200, description = "Paginated nurse visits", body = Paginated<NurseVisit>)
    ),
    tag = "Health Office",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_visits(
    State(state): State<AppState>,
    RequireHealthRead(auth_user): RequireHealthRead,
    ValidatedQuery(filters): ValidatedQuery<NurseVisitFilterParams>,
    ValidatedQuery(pagination): ValidatedQuery<PaginationParams>,
) -> Result<Json<Paginated<NurseVisit>>, AppError> {
    let school_id = scoped_school_id(&auth_user, filters.school_id)?;
    let visits = HealthOfficeService::get_visits(&state.db, school_id, filters, pagination).await?;
    Ok(Json(visits))
}

#[utoipa::path(
    get,
    path = "/api/health-office/visits/{id}",
    params(("id" = NurseVisitId, Path, description = "Visit ID")),
    responses(
        (status = 200, description = "Nurse visit", body = NurseVisit),
        (status = 404, description = "Visit not found", body = ErrorResponse)
    ),
    tag = "Health Office",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_visit(
    State(state): State<AppState>,
    RequireHealthRead(auth_user): RequireHealthRead,
    Path(id): Path<NurseVisitId>,
) -> Result<Json<NurseVisit>, AppError> {
    let visit = HealthOfficeService::get_visit(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(visit))
}

#[utoipa::path(
    get,
    path = "/api/health-office/daily-report",
    params(DailyReportParams),
    responses(
        (status = 200, description = "Visit counts for the day", body = DailyVisitReport)
    ),
    tag = "Health Office",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn daily_report(
    State(state): State<AppState>,
    RequireHealthRead(auth_user): RequireHealthRead,
    ValidatedQuery(params): ValidatedQuery<DailyReportParams>,
) -> Result<Json<DailyVisitReport>, AppError> {
    let school_id = scoped_school_id(&auth_user, params.school_id)?;
    let report = HealthOfficeService::daily_report(&state.db, school_id, params.date).await?;
    Ok(Json(report))
}
