use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use schoolhouse_core::{AppError, ErrorResponse, Paginated, PaginationParams};
use schoolhouse_models::ids::SchoolId;
use tracing::instrument;

use crate::middleware::auth::RequireSchoolsManage;
use crate::state::AppState;
use crate::validator::{ValidatedJson, ValidatedQuery};

use super::model::{CreateSchoolDto, School, SchoolFilterParams, UpdateSchoolDto};
use super::service::SchoolService;

#[utoipa::path(
    post,
    path = "/api/schools",
    request_body = CreateSchoolDto,
    responses(
        (status = 201, description = "School created", body = School),
        (status = 400, description = "Duplicate name", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "System admin only", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth_user, dto))]
pub async fn create_school(
    State(state): State<AppState>,
    RequireSchoolsManage(_auth_user): RequireSchoolsManage,
    ValidatedJson(dto): ValidatedJson<CreateSchoolDto>,
) -> Result<(StatusCode, Json<School>), AppError> {
    let school = SchoolService::create_school(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(school)))
}

#[utoipa::path(
    get,
    path = "/api/schools",
    params(SchoolFilterParams, PaginationParams),
    responses(
        (status = 200, description = "Paginated schools", body = Paginated<School>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "System admin only", body = ErrorResponse)
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_schools(
    State(state): State<AppState>,
    RequireSchoolsManage(_auth_user): RequireSchoolsManage,
    ValidatedQuery(filters): ValidatedQuery<SchoolFilterParams>,
    ValidatedQuery(pagination): ValidatedQuery<PaginationParams>,
) -> Result<Json<Paginated<School>>, AppError> {
    let schools = SchoolService::get_schools(&state.db, filters, pagination).await?;
    Ok(Json(schools))
}

#[utoipa::path(
    get,
    path = "/api/schools/{id}",
    params(("id" = SchoolId, Path, description = "School ID")),
    responses(
        (status = 200, description = "School", body = School),
        (status = 404, description = "School not found", body = ErrorResponse)
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_school(
    State(state): State<AppState>,
    RequireSchoolsManage(_auth_user): RequireSchoolsManage,
    Path(id): Path<SchoolId>,
) -> Result<Json<School>, AppError> {
    let school = SchoolService::get_school(&state.db, id).await?;
    Ok(Json(school))
}

#[utoipa::path(
    put,
    path = "/api/schools/{id}",
    params(("id" = SchoolId, Path, description = "School ID")),
    request_body = UpdateSchoolDto,
    responses(
        (status = 200, description = "School updated", body = School),
        (status = 400, description = "Duplicate name", body = ErrorResponse),
        (status = 404, description = "School not found", body = ErrorResponse)
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth_user, dto))]
pub async fn update_school(
    State(state): State<AppState>,
    RequireSchoolsManage(_auth_user): RequireSchoolsManage,
    Path(id): Path<SchoolId>,
    ValidatedJson(dto): ValidatedJson<UpdateSchoolDto>,
) -> Result<Json<School>, AppError> {
    let school = SchoolService::update_school(&state.db, id, dto).await?;
    Ok(Json(school))
}

#[utoipa::path(
    delete,
    path = "/api/schools/{id}",
    params(("id" = SchoolId, Path, description = "School ID")),
    responses(
        (status = 204, description = "School deleted"),
        (status = 404, description = "School not found", body = ErrorResponse)
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth_user))]
pub async fn delete_school(
    State(state): State<AppState>,
    RequireSchoolsManage(_auth_user): RequireSchoolsManage,
    Path(id): Path<SchoolId>,
) -> Result<StatusCode, AppError> {
    SchoolService::delete_school(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
