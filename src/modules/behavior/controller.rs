use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use schoolhouse_core::{AppError, ErrorResponse, Paginated, PaginationParams};
use schoolhouse_models::SchoolScopeParams;
use schoolhouse_models::ids::{IncidentId, StudentId};
use tracing::instrument;

use crate::middleware::auth::{RequireBehaviorRead, RequireBehaviorWrite};
use crate::state::AppState;
use crate::utils::auth_helpers::{resource_scope, scoped_school_id};
use crate::validator::{ValidatedJson, ValidatedQuery};

use super::model::{
    BehaviorIncident, BehaviorSummary, ChangeIncidentStatusDto, CreateIncidentActionDto,
    CreateIncidentDto, IncidentAction, IncidentDetail, IncidentFilterParams, UpdateIncidentDto,
};
use super::service::BehaviorService;

#[utoipa::path(
    post,
    path = "/api/behavior/incidents",
    params(SchoolScopeParams),
    request_body = CreateIncidentDto,
    responses(
        (status = 201, description = "Incident reported", body = BehaviorIncident),
        (status = 400, description = "Incident date in the future", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Behavior",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_incident(
    State(state): State<AppState>,
    RequireBehaviorWrite(auth_user): RequireBehaviorWrite,
    ValidatedQuery(scope): ValidatedQuery<SchoolScopeParams>,
    ValidatedJson(dto): ValidatedJson<CreateIncidentDto>,
) -> Result<(StatusCode, Json<BehaviorIncident>), AppError> {
    let school_id = scoped_school_id(&auth_user, scope.school_id)?;
    let reported_by = auth_user.staff_id()?;
    let incident = BehaviorService::create_incident(&state.db, school_id, reported_by, dto).await?;
    Ok((StatusCode::CREATED, Json(incident)))
}

#[utoipa::path(
    get,
    path = "/api/behavior/incidents",
    params(IncidentFilterParams, PaginationParams),
    responses(
        (status = 200, description = "Paginated incidents", body = Paginated<BehaviorIncident>)
    ),
    tag = "Behavior",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_incidents(
    State(state): State<AppState>,
    RequireBehaviorRead(auth_user): RequireBehaviorRead,
    ValidatedQuery(filters): ValidatedQuery<IncidentFilterParams>,
    ValidatedQuery(pagination): ValidatedQuery<PaginationParams>,
) -> Result<Json<Paginated<BehaviorIncident>>, AppError> {
    let school_id = scoped_school_id(&auth_user, filters.school_id)?;
    let incidents = BehaviorService::get_incidents(&state.db, school_id, filters, pagination).await?;
    Ok(Json(incidents))
}

#[utoipa::path(
    get,
    path = "/api/behavior/incidents/{id}",
    params(("id" = IncidentId, Path, description = "Incident ID")),
    responses(
        (status = 200, description = "Incident with its actions", body = IncidentDetail),
        (status = 404, description = "Incident not found", body = ErrorResponse)
    ),
    tag = "Behavior",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_incident(
    State(state): State<AppState>,
    RequireBehaviorRead(auth_user): RequireBehaviorRead,
    Path(id): Path<IncidentId>,
) -> Result<Json<IncidentDetail>, AppError> {
    let detail = BehaviorService::get_incident(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    put,
    path = "/api/behavior/incidents/{id}",
    params(("id" = IncidentId, Path, description = "Incident ID")),
    request_body = UpdateIncidentDto,
    responses(
        (status = 200, description = "Incident updated", body = BehaviorIncident),
        (status = 400, description = "Incident is closed", body = ErrorResponse),
        (status = 404, description = "Incident not found", body = ErrorResponse)
    ),
    tag = "Behavior",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_incident(
    State(state): State<AppState>,
    RequireBehaviorWrite(auth_user): RequireBehaviorWrite,
    Path(id): Path<IncidentId>,
    ValidatedJson(dto): ValidatedJson<UpdateIncidentDto>,
) -> Result<Json<BehaviorIncident>, AppError> {
    let incident =
        BehaviorService::update_incident(&state.db, id, resource_scope(&auth_user), dto).await?;
    Ok(Json(incident))
}

#[utoipa::path(
    patch,
    path = "/api/behavior/incidents/{id}/status",
    params(("id" = IncidentId, Path, description = "Incident ID")),
    request_body = ChangeIncidentStatusDto,
    responses(
        (status = 200, description = "Status changed", body = BehaviorIncident),
        (status = 400, description = "Transition not allowed", body = ErrorResponse),
        (status = 404, description = "Incident not found", body = ErrorResponse)
    ),
    tag = "Behavior",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn change_incident_status(
    State(state): State<AppState>,
    RequireBehaviorWrite(auth_user): RequireBehaviorWrite,
    Path(id): Path<IncidentId>,
    ValidatedJson(dto): ValidatedJson<ChangeIncidentStatusDto>,
) -> Result<Json<BehaviorIncident>, AppError> {
    let incident =
        BehaviorService::change_status(&state.db, id, resource_scope(&auth_user), dto).await?;
    Ok(Json(incident))
}

#[utoipa::path(
    delete,
    path = "/api/behavior/incidents/{id}",
    params(("id" = IncidentId, Path, description = "Incident ID")),
    responses(
        (status = 204, description = "Incident deleted"),
        (status = 400, description = "Incident is closed", body = ErrorResponse),
        (status = 404, description = "Incident not found", body = ErrorResponse)
    ),
    tag = "Behavior",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_incident(
    State(state): State<AppState>,
    RequireBehaviorWrite(auth_user): RequireBehaviorWrite,
    Path(id): Path<IncidentId>,
) -> Result<StatusCode, AppError> {
    BehaviorService::delete_incident(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/behavior/incidents/{id}/actions",
    params(("id" = IncidentId, Path, description = "Incident ID")),
    request_body = CreateIncidentActionDto,
    responses(
        (status = 201, description = "Action added", body = IncidentAction),
        (status = 400, description = "Incident is closed or dates invalid", body = ErrorResponse),
        (status = 404, description = "Incident not found", body = ErrorResponse)
    ),
    tag = "Behavior",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn add_action(
    State(state): State<AppState>,
    RequireBehaviorWrite(auth_user): RequireBehaviorWrite,
    Path(id): Path<IncidentId>,
    ValidatedJson(dto): ValidatedJson<CreateIncidentActionDto>,
) -> Result<(StatusCode, Json<IncidentAction>), AppError> {
    let assigned_by = auth_user.staff_id()?;
    let action =
        BehaviorService::add_action(&state.db, id, resource_scope(&auth_user), assigned_by, dto)
            .await?;
    Ok((StatusCode::CREATED, Json(action)))
}

#[utoipa::path(
    get,
    path = "/api/behavior/students/{id}/summary",
    params(("id" = StudentId, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Incident counts and behavior points", body = BehaviorSummary),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Behavior",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_student_summary(
    State(state): State<AppState>,
    RequireBehaviorRead(auth_user): RequireBehaviorRead,
    Path(id): Path<StudentId>,
) -> Result<Json<BehaviorSummary>, AppError> {
    let summary =
        BehaviorService::get_student_summary(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(summary))
}
