use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use schoolhouse_core::{AppError, ErrorResponse, Paginated, PaginationParams};
use schoolhouse_models::ids::StaffId;
use tracing::instrument;

use crate::middleware::auth::{RequireStaffRead, RequireStaffWrite};
use crate::state::AppState;
use crate::utils::auth_helpers::{resource_scope, scoped_school_id};
use crate::validator::{ValidatedJson, ValidatedQuery};

use super::model::{CreateStaffDto, Staff, StaffFilterParams, UpdateStaffDto};
use super::service::StaffService;

#[utoipa::path(
    post,
    path = "/api/staff",
    request_body = CreateStaffDto,
    responses(
        (status = 201, description = "Staff member created", body = Staff),
        (status = 400, description = "Email already exists or invalid role", body = ErrorResponse),
        (status = 403, description = "Missing staff:write", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "Staff",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_staff(
    State(state): State<AppState>,
    RequireStaffWrite(auth_user): RequireStaffWrite,
    ValidatedJson(dto): ValidatedJson<CreateStaffDto>,
) -> Result<(StatusCode, Json<Staff>), AppError> {
    let school_id = scoped_school_id(&auth_user, dto.school_id)?;
    let staff = StaffService::create_staff(&state.db, state.cache(), school_id, dto).await?;
    Ok((StatusCode::CREATED, Json(staff)))
}

#[utoipa::path(
    get,
    path = "/api/staff",
    params(StaffFilterParams, PaginationParams),
    responses(
        (status = 200, description = "Paginated staff", body = Paginated<Staff>),
        (status = 400, description = "System admin did not pass school_id", body = ErrorResponse)
    ),
    tag = "Staff",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_staff_list(
    State(state): State<AppState>,
    RequireStaffRead(auth_user): RequireStaffRead,
    ValidatedQuery(filters): ValidatedQuery<StaffFilterParams>,
    ValidatedQuery(pagination): ValidatedQuery<PaginationParams>,
) -> Result<Json<Paginated<Staff>>, AppError> {
    let school_id = scoped_school_id(&auth_user, filters.school_id)?;
    let staff = StaffService::get_staff_list(&state.db, school_id, filters, pagination).await?;
    Ok(Json(staff))
}

#[utoipa::path(
    get,
    path = "/api/staff/{id}",
    params(("id" = StaffId, Path, description = "Staff ID")),
    responses(
        (status = 200, description = "Staff member", body = Staff),
        (status = 404, description = "Staff member not found", body = ErrorResponse)
    ),
    tag = "Staff",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_staff(
    State(state): State<AppState>,
    RequireStaffRead(auth_user): RequireStaffRead,
    Path(id): Path<StaffId>,
) -> Result<Json<Staff>, AppError> {
    let staff = StaffService::get_staff(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(staff))
}

#[utoipa::path(
    put,
    path = "/api/staff/{id}",
    params(("id" = StaffId, Path, description = "Staff ID")),
    request_body = UpdateStaffDto,
    responses(
        (status = 200, description = "Staff member updated", body = Staff),
        (status = 400, description = "Email already exists or invalid role", body = ErrorResponse),
        (status = 404, description = "Staff member not found", body = ErrorResponse)
    ),
    tag = "Staff",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_staff(
    State(state): State<AppState>,
    RequireStaffWrite(auth_user): RequireStaffWrite,
    Path(id): Path<StaffId>,
    ValidatedJson(dto): ValidatedJson<UpdateStaffDto>,
) -> Result<Json<Staff>, AppError> {
    let staff =
        StaffService::update_staff(&state.db, state.cache(), id, resource_scope(&auth_user), dto)
            .await?;
    Ok(Json(staff))
}

#[utoipa::path(
    post,
    path = "/api/staff/{id}/deactivate",
    params(("id" = StaffId, Path, description = "Staff ID")),
    responses(
        (status = 200, description = "Staff member deactivated", body = Staff),
        (status = 400, description = "Cannot deactivate yourself", body = ErrorResponse),
        (status = 404, description = "Staff member not found", body = ErrorResponse)
    ),
    tag = "Staff",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn deactivate_staff(
    State(state): State<AppState>,
    RequireStaffWrite(auth_user): RequireStaffWrite,
    Path(id): Path<StaffId>,
) -> Result<Json<Staff>, AppError> {
    let staff = StaffService::deactivate_staff(
        &state.db,
        state.cache(),
        id,
        resource_scope(&auth_user),
        auth_user.staff_id()?,
    )
    .await?;
    Ok(Json(staff))
}
