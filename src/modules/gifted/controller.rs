use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use schoolhouse_core::{AppError, ErrorResponse, Paginated, PaginationParams};
use schoolhouse_models::SchoolScopeParams;
use schoolhouse_models::ids::GiftedRecordId;
use tracing::instrument;

use crate::middleware::auth::{RequireGiftedRead, RequireGiftedWrite};
use crate::state::AppState;
use crate::utils::auth_helpers::{resource_scope, scoped_school_id};
use crate::validator::{ValidatedJson, ValidatedQuery};

use super::model::{
    ChangeGiftedStatusDto, CreateEvaluationDto, CreateGiftedRecordDto, GiftedEvaluation,
    GiftedFilterParams, GiftedRecord, GiftedRecordDetail, GiftedSummary, UpcomingReviewParams,
    UpdateGiftedRecordDto,
};
use super::service::GiftedService;

#[utoipa::path(
    post,
    path = "/api/gifted/records",
    params(SchoolScopeParams),
    request_body = CreateGiftedRecordDto,
    responses(
        (status = 201, description = "Referral recorded", body = GiftedRecord),
        (status = 400, description = "Student already referred", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Gifted",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_record(
    State(state): State<AppState>,
    RequireGiftedWrite(auth_user): RequireGiftedWrite,
    ValidatedQuery(scope): ValidatedQuery<SchoolScopeParams>,
    ValidatedJson(dto): ValidatedJson<CreateGiftedRecordDto>,
) -> Result<(StatusCode, Json<GiftedRecord>), AppError> {
    let school_id = scoped_school_id(&auth_user, scope.school_id)?;
    let record = GiftedService::create_record(&state.db, school_id, dto).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/api/gifted/records",
    params(GiftedFilterParams, PaginationParams),
    responses(
        (status = 200, description = "Paginated gifted records", body = Paginated<GiftedRecord>)
    ),
    tag = "Gifted",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_records(
    State(state): State<AppState>,
    RequireGiftedRead(auth_user): RequireGiftedRead,
    ValidatedQuery(filters): ValidatedQuery<GiftedFilterParams>,
    ValidatedQuery(pagination): ValidatedQuery<PaginationParams>,
) -> Result<Json<Paginated<GiftedRecord>>, AppError> {
    let school_id = scoped_school_id(&auth_user, filters.school_id)?;
    let records = GiftedService::get_records(&state.db, school_id, filters, pagination).await?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/api/gifted/records/{id}",
    params(("id" = GiftedRecordId, Path, description = "Gifted record ID")),
    responses(
        (status = 200, description = "Record with evaluations", body = GiftedRecordDetail),
        (status = 404, description = "Record not found", body = ErrorResponse)
    ),
    tag = "Gifted",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_record(
    State(state): State<AppState>,
    RequireGiftedRead(auth_user): RequireGiftedRead,
    Path(id): Path<GiftedRecordId>,
) -> Result<Json<GiftedRecordDetail>, AppError> {
    let detail = GiftedService::get_record(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    put,
    path = "/api/gifted/records/{id}",
    params(("id" = GiftedRecordId, Path, description = "Gifted record ID")),
    request_body = UpdateGiftedRecordDto,
    responses(
        (status = 200, description = "Record updated", body = GiftedRecord),
        (status = 404, description = "Record not found", body = ErrorResponse)
    ),
    tag = "Gifted",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_record(
    State(state): State<AppState>,
    RequireGiftedWrite(auth_user): RequireGiftedWrite,
    Path(id): Path<GiftedRecordId>,
    ValidatedJson(dto): ValidatedJson<UpdateGiftedRecordDto>,
) -> Result<Json<GiftedRecord>, AppError> {
    let record = GiftedService::update_record(&state.db, id, resource_scope(&auth_user), dto).await?;
    Ok(Json(record))
}

#[utoipa::path(
    patch,
    path = "/api/gifted/records/{id}/status",
    params(("id" = GiftedRecordId, Path, description = "Gifted record ID")),
    request_body = ChangeGiftedStatusDto,
    responses(
        (status = 200, description = "Status changed", body = GiftedRecord),
        (status = 400, description = "Transition not allowed", body = ErrorResponse),
        (status = 404, description = "Record not found", body = ErrorResponse)
    ),
    tag = "Gifted",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn change_status(
    State(state): State<AppState>,
    RequireGiftedWrite(auth_user): RequireGiftedWrite,
    Path(id): Path<GiftedRecordId>,
    ValidatedJson(dto): ValidatedJson<ChangeGiftedStatusDto>,
) -> Result<Json<GiftedRecord>, AppError> {
    let record = GiftedService::change_status(&state.db, id, resource_scope(&auth_user), dto).await?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/api/gifted/records/{id}/evaluations",
    params(("id" = GiftedRecordId, Path, description = "Gifted record ID")),
    request_body = CreateEvaluationDto,
    responses(
        (status = 201, description = "Evaluation added", body = GiftedEvaluation),
        (status = 400, description = "Invalid evaluation", body = ErrorResponse),
        (status = 404, description = "Record not found", body = ErrorResponse)
    ),
    tag = "Gifted",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn add_evaluation(
    State(state): State<AppState>,
    RequireGiftedWrite(auth_user): RequireGiftedWrite,
    Path(id): Path<GiftedRecordId>,
    ValidatedJson(dto): ValidatedJson<CreateEvaluationDto>,
) -> Result<(StatusCode, Json<GiftedEvaluation>), AppError> {
    let evaluation =
        GiftedService::add_evaluation(&state.db, id, resource_scope(&auth_user), dto).await?;
    Ok((StatusCode::CREATED, Json(evaluation)))
}

#[utoipa::path(
    get,
    path = "/api/gifted/reviews/upcoming",
    params(UpcomingReviewParams),
    responses(
        (status = 200, description = "Enrolled records due for review", body = Vec<GiftedRecord>),
        (status = 400, description = "Invalid look-ahead", body = ErrorResponse)
    ),
    tag = "Gifted",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn upcoming_reviews(
    State(state): State<AppState>,
    RequireGiftedRead(auth_user): RequireGiftedRead,
    ValidatedQuery(params): ValidatedQuery<UpcomingReviewParams>,
) -> Result<Json<Vec<GiftedRecord>>, AppError> {
    let school_id = scoped_school_id(&auth_user, params.school_id)?;
    let records = GiftedService::upcoming_reviews(&state.db, school_id, params.days).await?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/api/gifted/summary",
    params(SchoolScopeParams),
    responses(
        (status = 200, description = "Record counts per status", body = GiftedSummary)
    ),
    tag = "Gifted",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn summary(
    State(state): State<AppState>,
    RequireGiftedRead(auth_user): RequireGiftedRead,
    ValidatedQuery(scope): ValidatedQuery<SchoolScopeParams>,
) -> Result<Json<GiftedSummary>, AppError> {
    let school_id = scoped_school_id(&auth_user, scope.school_id)?;
    let summary = GiftedService::summary(&state.db, school_id).await?;
    Ok(Json(summary))
}
