use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use schoolhouse_core::{AppError, ErrorResponse, Paginated, PaginationParams};
use schoolhouse_models::ids::AcademicYearId;
use tracing::instrument;

use crate::middleware::auth::{RequireAcademicYearsRead, RequireAcademicYearsWrite};
use crate::state::AppState;
use crate::utils::auth_helpers::{resource_scope, scoped_school_id};
use crate::validator::{ValidatedJson, ValidatedQuery};

use super::model::{
    AcademicYear, AcademicYearFilterParams, AcademicYearWithStats, CreateAcademicYearDto,
    SchoolScopeParams, UpdateAcademicYearDto,
};
use super::service::AcademicYearService;

#[utoipa::path(
    post,
    path = "/api/academic-years",
    request_body = CreateAcademicYearDto,
    responses(
        (status = 201, description = "Academic year created", body = AcademicYear),
        (status = 400, description = "Invalid dates or duplicate name", body = ErrorResponse)
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_academic_year(
    State(state): State<AppState>,
    RequireAcademicYearsWrite(auth_user): RequireAcademicYearsWrite,
    ValidatedJson(dto): ValidatedJson<CreateAcademicYearDto>,
) -> Result<(StatusCode, Json<AcademicYear>), AppError> {
    let school_id = scoped_school_id(&auth_user, dto.school_id)?;
    let year = AcademicYearService::create_academic_year(&state.db, school_id, dto).await?;
    Ok((StatusCode::CREATED, Json(year)))
}

#[utoipa::path(
    get,
    path = "/api/academic-years",
    params(AcademicYearFilterParams, PaginationParams),
    responses(
        (status = 200, description = "Paginated academic years", body = Paginated<AcademicYearWithStats>)
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_academic_years(
    State(state): State<AppState>,
    RequireAcademicYearsRead(auth_user): RequireAcademicYearsRead,
    ValidatedQuery(filters): ValidatedQuery<AcademicYearFilterParams>,
    ValidatedQuery(pagination): ValidatedQuery<PaginationParams>,
) -> Result<Json<Paginated<AcademicYearWithStats>>, AppError> {
    let school_id = scoped_school_id(&auth_user, filters.school_id)?;
    let years =
        AcademicYearService::get_academic_years(&state.db, school_id, filters, pagination).await?;
    Ok(Json(years))
}

#[utoipa::path(
    get,
    path = "/api/academic-years/current",
    params(SchoolScopeParams),
    responses(
        (status = 200, description = "Current academic year", body = AcademicYearWithStats),
        (status = 404, description = "No current academic year", body = ErrorResponse)
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_current_academic_year(
    State(state): State<AppState>,
    RequireAcademicYearsRead(auth_user): RequireAcademicYearsRead,
    ValidatedQuery(scope): ValidatedQuery<SchoolScopeParams>,
) -> Result<Json<AcademicYearWithStats>, AppError> {
    let school_id = scoped_school_id(&auth_user, scope.school_id)?;
    let year = AcademicYearService::get_current_academic_year(&state.db, school_id).await?;
    Ok(Json(year))
}

#[utoipa::path(
    get,
    path = "/api/academic-years/{id}",
    params(("id" = AcademicYearId, Path, description = "Academic year ID")),
    responses(
        (status = 200, description = "Academic year with section count", body = AcademicYearWithStats),
        (status = 404, description = "Academic year not found", body = ErrorResponse)
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_academic_year(
    State(state): State<AppState>,
    RequireAcademicYearsRead(auth_user): RequireAcademicYearsRead,
    Path(id): Path<AcademicYearId>,
) -> Result<Json<AcademicYearWithStats>, AppError> {
    let year =
        AcademicYearService::get_academic_year(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(year))
}

#[utoipa::path(
    put,
    path = "/api/academic-years/{id}",
    params(("id" = AcademicYearId, Path, description = "Academic year ID")),
    request_body = UpdateAcademicYearDto,
    responses(
        (status = 200, description = "Academic year updated", body = AcademicYear),
        (status = 400, description = "Invalid dates or duplicate name", body = ErrorResponse),
        (status = 404, description = "Academic year not found", body = ErrorResponse)
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_academic_year(
    State(state): State<AppState>,
    RequireAcademicYearsWrite(auth_user): RequireAcademicYearsWrite,
    Path(id): Path<AcademicYearId>,
    ValidatedJson(dto): ValidatedJson<UpdateAcademicYearDto>,
) -> Result<Json<AcademicYear>, AppError> {
    let year =
        AcademicYearService::update_academic_year(&state.db, id, resource_scope(&auth_user), dto)
            .await?;
    Ok(Json(year))
}

#[utoipa::path(
    delete,
    path = "/api/academic-years/{id}",
    params(("id" = AcademicYearId, Path, description = "Academic year ID")),
    responses(
        (status = 204, description = "Academic year deleted"),
        (status = 400, description = "Year has scheduled sections", body = ErrorResponse),
        (status = 404, description = "Academic year not found", body = ErrorResponse)
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_academic_year(
    State(state): State<AppState>,
    RequireAcademicYearsWrite(auth_user): RequireAcademicYearsWrite,
    Path(id): Path<AcademicYearId>,
) -> Result<StatusCode, AppError> {
    AcademicYearService::delete_academic_year(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/academic-years/{id}/activate",
    params(("id" = AcademicYearId, Path, description = "Academic year ID")),
    responses(
        (status = 200, description = "Academic year is now current", body = AcademicYear),
        (status = 404, description = "Academic year not found", body = ErrorResponse)
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn activate_academic_year(
    State(state): State<AppState>,
    RequireAcademicYearsWrite(auth_user): RequireAcademicYearsWrite,
    Path(id): Path<AcademicYearId>,
) -> Result<Json<AcademicYear>, AppError> {
    let year =
        AcademicYearService::activate_academic_year(&state.db, id, resource_scope(&auth_user))
            .await?;
    Ok(Json(year))
}
