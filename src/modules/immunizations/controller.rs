use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use schoolhouse_core::{AppError, ErrorResponse, Paginated, PaginationParams};
use schoolhouse_models::SchoolScopeParams;
use schoolhouse_models::ids::{ExemptionId, ImmunizationRecordId, RequirementId, StudentId};
use tracing::instrument;

use crate::middleware::auth::{RequireImmunizationsRead, RequireImmunizationsWrite};
use crate::state::AppState;
use crate::utils::auth_helpers::{resource_scope, scoped_school_id};
use crate::validator::{ValidatedJson, ValidatedQuery};

use super::model::{
    ComplianceReport, ComplianceReportParams, CreateExemptionDto, CreateImmunizationRecordDto,
    CreateRequirementDto, ImmunizationExemption, ImmunizationRecord, ImmunizationRequirement,
    StudentCompliance, UpdateRequirementDto,
};
use super::service::ImmunizationService;

#[utoipa::path(
    post,
    path = "/api/immunizations/requirements",
    request_body = CreateRequirementDto,
    responses(
        (status = 201, description = "Requirement created", body = ImmunizationRequirement),
        (status = 400, description = "Invalid grade levels or duplicate vaccine", body = ErrorResponse)
    ),
    tag = "Immunizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_requirement(
    State(state): State<AppState>,
    RequireImmunizationsWrite(auth_user): RequireImmunizationsWrite,
    ValidatedJson(dto): ValidatedJson<CreateRequirementDto>,
) -> Result<(StatusCode, Json<ImmunizationRequirement>), AppError> {
    let school_id = scoped_school_id(&auth_user, dto.school_id)?;
    let requirement =
        ImmunizationService::create_requirement(&state.db, state.cache(), school_id, dto).await?;
    Ok((StatusCode::CREATED, Json(requirement)))
}

#[utoipa::path(
    get,
    path = "/api/immunizations/requirements",
    params(SchoolScopeParams, PaginationParams),
    responses(
        (status = 200, description = "Paginated requirements", body = Paginated<ImmunizationRequirement>)
    ),
    tag = "Immunizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_requirements(
    State(state): State<AppState>,
    RequireImmunizationsRead(auth_user): RequireImmunizationsRead,
    ValidatedQuery(scope): ValidatedQuery<SchoolScopeParams>,
    ValidatedQuery(pagination): ValidatedQuery<PaginationParams>,
) -> Result<Json<Paginated<ImmunizationRequirement>>, AppError> {
    let school_id = scoped_school_id(&auth_user, scope.school_id)?;
    let requirements =
        ImmunizationService::get_requirements(&state.db, school_id, pagination).await?;
    Ok(Json(requirements))
}

#[utoipa::path(
    get,
    path = "/api/immunizations/requirements/{id}",
    params(("id" = RequirementId, Path, description = "Requirement ID")),
    responses(
        (status = 200, description = "Requirement", body = ImmunizationRequirement),
        (status = 404, description = "Requirement not found", body = ErrorResponse)
    ),
    tag = "Immunizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_requirement(
    State(state): State<AppState>,
    RequireImmunizationsRead(auth_user): RequireImmunizationsRead,
    Path(id): Path<RequirementId>,
) -> Result<Json<ImmunizationRequirement>, AppError> {
    let requirement =
        ImmunizationService::get_requirement(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(requirement))
}

#[utoipa::path(
    put,
    path = "/api/immunizations/requirements/{id}",
    params(("id" = RequirementId, Path, description = "Requirement ID")),
    request_body = UpdateRequirementDto,
    responses(
        (status = 200, description = "Requirement updated", body = ImmunizationRequirement),
        (status = 400, description = "Invalid grade levels", body = ErrorResponse),
        (status = 404, description = "Requirement not found", body = ErrorResponse)
    ),
    tag = "Immunizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_requirement(
    State(state): State<AppState>,
    RequireImmunizationsWrite(auth_user): RequireImmunizationsWrite,
    Path(id): Path<RequirementId>,
    ValidatedJson(dto): ValidatedJson<UpdateRequirementDto>,
) -> Result<Json<ImmunizationRequirement>, AppError> {
    let requirement = ImmunizationService::update_requirement(
        &state.db,
        state.cache(),
        id,
        resource_scope(&auth_user),
        dto,
    )
    .await?;
    Ok(Json(requirement))
}

#[utoipa::path(
    delete,
    path = "/api/immunizations/requirements/{id}",
    params(("id" = RequirementId, Path, description = "Requirement ID")),
    responses(
        (status = 204, description = "Requirement deleted"),
        (status = 404, description = "Requirement not found", body = ErrorResponse)
    ),
    tag = "Immunizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_requirement(
    State(state): State<AppState>,
    RequireImmunizationsWrite(auth_user): RequireImmunizationsWrite,
    Path(id): Path<RequirementId>,
) -> Result<StatusCode, AppError> {
    ImmunizationService::delete_requirement(&state.db, state.cache(), id, resource_scope(&auth_user))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/immunizations/students/{id}/records",
    params(("id" = StudentId, Path, description = "Student ID")),
    request_body = CreateImmunizationRecordDto,
    responses(
        (status = 201, description = "Dose recorded", body = ImmunizationRecord),
        (status = 400, description = "Future date or duplicate dose", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Immunizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_record(
    State(state): State<AppState>,
    RequireImmunizationsWrite(auth_user): RequireImmunizationsWrite,
    Path(id): Path<StudentId>,
    ValidatedJson(dto): ValidatedJson<CreateImmunizationRecordDto>,
) -> Result<(StatusCode, Json<ImmunizationRecord>), AppError> {
    let record = ImmunizationService::create_record(
        &state.db,
        state.cache(),
        id,
        resource_scope(&auth_user),
        dto,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/api/immunizations/students/{id}/records",
    params(("id" = StudentId, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Recorded doses", body = Vec<ImmunizationRecord>),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Immunizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_records(
    State(state): State<AppState>,
    RequireImmunizationsRead(auth_user): RequireImmunizationsRead,
    Path(id): Path<StudentId>,
) -> Result<Json<Vec<ImmunizationRecord>>, AppError> {
    let records = ImmunizationService::get_records(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(records))
}

#[utoipa::path(
    delete,
    path = "/api/immunizations/records/{id}",
    params(("id" = ImmunizationRecordId, Path, description = "Record ID")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Record not found", body = ErrorResponse)
    ),
    tag = "Immunizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_record(
    State(state): State<AppState>,
    RequireImmunizationsWrite(auth_user): RequireImmunizationsWrite,
    Path(id): Path<ImmunizationRecordId>,
) -> Result<StatusCode, AppError> {
    ImmunizationService::delete_record(&state.db, state.cache(), id, resource_scope(&auth_user))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/immunizations/students/{id}/exemptions",
    params(("id" = StudentId, Path, description = "Student ID")),
    request_body = CreateExemptionDto,
    responses(
        (status = 201, description = "Exemption recorded", body = ImmunizationExemption),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Immunizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_exemption(
    State(state): State<AppState>,
    RequireImmunizationsWrite(auth_user): RequireImmunizationsWrite,
    Path(id): Path<StudentId>,
    ValidatedJson(dto): ValidatedJson<CreateExemptionDto>,
) -> Result<(StatusCode, Json<ImmunizationExemption>), AppError> {
    let exemption = ImmunizationService::create_exemption(
        &state.db,
        state.cache(),
        id,
        resource_scope(&auth_user),
        dto,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(exemption)))
}

#[utoipa::path(
    get,
    path = "/api/immunizations/students/{id}/exemptions",
    params(("id" = StudentId, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Exemptions on file", body = Vec<ImmunizationExemption>),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Immunizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_exemptions(
    State(state): State<AppState>,
    RequireImmunizationsRead(auth_user): RequireImmunizationsRead,
    Path(id): Path<StudentId>,
) -> Result<Json<Vec<ImmunizationExemption>>, AppError> {
    let exemptions =
        ImmunizationService::get_exemptions(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(exemptions))
}

#[utoipa::path(
    delete,
    path = "/api/immunizations/exemptions/{id}",
    params(("id" = ExemptionId, Path, description = "Exemption ID")),
    responses(
        (status = 204, description = "Exemption deleted"),
        (status = 404, description = "Exemption not found", body = ErrorResponse)
    ),
    tag = "Immunizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_exemption(
    State(state): State<AppState>,
    RequireImmunizationsWrite(auth_user): RequireImmunizationsWrite,
    Path(id): Path<ExemptionId>,
) -> Result<StatusCode, AppError> {
    ImmunizationService::delete_exemption(&state.db, state.cache(), id, resource_scope(&auth_user))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/immunizations/students/{id}/compliance",
    params(("id" = StudentId, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Per-vaccine compliance", body = StudentCompliance),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Immunizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_student_compliance(
    State(state): State<AppState>,
    RequireImmunizationsRead(auth_user): RequireImmunizationsRead,
    Path(id): Path<StudentId>,
) -> Result<Json<StudentCompliance>, AppError> {
    let compliance =
        ImmunizationService::get_student_compliance(&state.db, id, resource_scope(&auth_user))
            .await?;
    Ok(Json(compliance))
}

#[utoipa::path(
    get,
    path = "/api/immunizations/compliance-report",
    params(ComplianceReportParams),
    responses(
        (status = 200, description = "School compliance report", body = ComplianceReport)
    ),
    tag = "Immunizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn compliance_report(
    State(state): State<AppState>,
    RequireImmunizationsRead(auth_user): RequireImmunizationsRead,
    ValidatedQuery(params): ValidatedQuery<ComplianceReportParams>,
) -> Result<Json<ComplianceReport>, AppError> {
    let school_id = scoped_school_id(&auth_user, params.school_id)?;
    let report = ImmunizationService::compliance_report(
        &state.db,
        state.cache(),
        school_id,
        params.grade_level,
    )
    .await?;
    Ok(Json(report))
}
