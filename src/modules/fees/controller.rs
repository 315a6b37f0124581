use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use schoolhouse_core::{AppError, ErrorResponse, Paginated, PaginationParams};
use schoolhouse_models::SchoolScopeParams;
use schoolhouse_models::ids::{FeeTypeId, StudentFeeId, StudentId};
use tracing::instrument;

use crate::middleware::auth::{RequireFeesRead, RequireFeesWrite};
use crate::state::AppState;
use crate::utils::auth_helpers::{resource_scope, scoped_school_id};
use crate::validator::{ValidatedJson, ValidatedQuery};

use super::model::{
    AssessFeeDto, AssessFeeResult, CreateFeeTypeDto, FeePayment, FeeStatement, FeeType,
    FeeTypeFilterParams, OverdueFee, PaymentResult, RecordPaymentDto, StudentFee,
    UpdateFeeTypeDto, WaiveFeeDto,
};
use super::service::FeeService;

#[utoipa::path(
    post,
    path = "/api/fees/types",
    request_body = CreateFeeTypeDto,
    responses(
        (status = 201, description = "Fee type created", body = FeeType),
        (status = 400, description = "Invalid input or duplicate name", body = ErrorResponse)
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_fee_type(
    State(state): State<AppState>,
    RequireFeesWrite(auth_user): RequireFeesWrite,
    ValidatedJson(dto): ValidatedJson<CreateFeeTypeDto>,
) -> Result<(StatusCode, Json<FeeType>), AppError> {
    let school_id = scoped_school_id(&auth_user, dto.school_id)?;
    let fee_type = FeeService::create_fee_type(&state.db, school_id, dto).await?;
    Ok((StatusCode::CREATED, Json(fee_type)))
}

#[utoipa::path(
    get,
    path = "/api/fees/types",
    params(FeeTypeFilterParams, PaginationParams),
    responses(
        (status = 200, description = "Paginated fee types", body = Paginated<FeeType>)
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_fee_types(
    State(state): State<AppState>,
    RequireFeesRead(auth_user): RequireFeesRead,
    ValidatedQuery(filters): ValidatedQuery<FeeTypeFilterParams>,
    ValidatedQuery(pagination): ValidatedQuery<PaginationParams>,
) -> Result<Json<Paginated<FeeType>>, AppError> {
    let school_id = scoped_school_id(&auth_user, filters.school_id)?;
    let fee_types = FeeService::get_fee_types(&state.db, school_id, filters, pagination).await?;
    Ok(Json(fee_types))
}

#[utoipa::path(
    get,
    path = "/api/fees/types/{id}",
    params(("id" = FeeTypeId, Path, description = "Fee type ID")),
    responses(
        (status = 200, description = "Fee type", body = FeeType),
        (status = 404, description = "Fee type not found", body = ErrorResponse)
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_fee_type(
    State(state): State<AppState>,
    RequireFeesRead(auth_user): RequireFeesRead,
    Path(id): Path<FeeTypeId>,
) -> Result<Json<FeeType>, AppError> {
    let fee_type = FeeService::get_fee_type(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(fee_type))
}

#[utoipa::path(
    put,
    path = "/api/fees/types/{id}",
    params(("id" = FeeTypeId, Path, description = "Fee type ID")),
    request_body = UpdateFeeTypeDto,
    responses(
        (status = 200, description = "Fee type updated", body = FeeType),
        (status = 404, description = "Fee type not found", body = ErrorResponse)
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_fee_type(
    State(state): State<AppState>,
    RequireFeesWrite(auth_user): RequireFeesWrite,
    Path(id): Path<FeeTypeId>,
    ValidatedJson(dto): ValidatedJson<UpdateFeeTypeDto>,
) -> Result<Json<FeeType>, AppError> {
    let fee_type =
        FeeService::update_fee_type(&state.db, id, resource_scope(&auth_user), dto).await?;
    Ok(Json(fee_type))
}

#[utoipa::path(
    delete,
    path = "/api/fees/types/{id}",
    params(("id" = FeeTypeId, Path, description = "Fee type ID")),
    responses(
        (status = 204, description = "Fee type deleted"),
        (status = 400, description = "Fee type has payments", body = ErrorResponse),
        (status = 404, description = "Fee type not found", body = ErrorResponse)
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_fee_type(
    State(state): State<AppState>,
    RequireFeesWrite(auth_user): RequireFeesWrite,
    Path(id): Path<FeeTypeId>,
) -> Result<StatusCode, AppError> {
    FeeService::delete_fee_type(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/fees/types/{id}/assess",
    params(("id" = FeeTypeId, Path, description = "Fee type ID")),
    request_body = AssessFeeDto,
    responses(
        (status = 200, description = "Number of new student fees", body = AssessFeeResult),
        (status = 404, description = "Fee type or student not found", body = ErrorResponse)
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn assess_fee(
    State(state): State<AppState>,
    RequireFeesWrite(auth_user): RequireFeesWrite,
    Path(id): Path<FeeTypeId>,
    ValidatedJson(dto): ValidatedJson<AssessFeeDto>,
) -> Result<Json<AssessFeeResult>, AppError> {
    let result = FeeService::assess_fee(&state.db, id, resource_scope(&auth_user), dto).await?;
    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/api/fees/student-fees/{id}/payments",
    params(("id" = StudentFeeId, Path, description = "Student fee ID")),
    request_body = RecordPaymentDto,
    responses(
        (status = 201, description = "Payment recorded", body = PaymentResult),
        (status = 400, description = "Payment exceeds balance", body = ErrorResponse),
        (status = 404, description = "Student fee not found", body = ErrorResponse)
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn record_payment(
    State(state): State<AppState>,
    RequireFeesWrite(auth_user): RequireFeesWrite,
    Path(id): Path<StudentFeeId>,
    ValidatedJson(dto): ValidatedJson<RecordPaymentDto>,
) -> Result<(StatusCode, Json<PaymentResult>), AppError> {
    let staff_id = auth_user.staff_id()?;
    let result =
        FeeService::record_payment(&state.db, id, resource_scope(&auth_user), staff_id, dto)
            .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[utoipa::path(
    get,
    path = "/api/fees/student-fees/{id}/payments",
    params(("id" = StudentFeeId, Path, description = "Student fee ID")),
    responses(
        (status = 200, description = "Payments on the fee", body = Vec<FeePayment>),
        (status = 404, description = "Student fee not found", body = ErrorResponse)
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_payments(
    State(state): State<AppState>,
    RequireFeesRead(auth_user): RequireFeesRead,
    Path(id): Path<StudentFeeId>,
) -> Result<Json<Vec<FeePayment>>, AppError> {
    let payments = FeeService::get_payments(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(payments))
}

#[utoipa::path(
    post,
    path = "/api/fees/student-fees/{id}/waive",
    params(("id" = StudentFeeId, Path, description = "Student fee ID")),
    request_body = WaiveFeeDto,
    responses(
        (status = 200, description = "Remaining balance waived", body = StudentFee),
        (status = 400, description = "Nothing left to waive", body = ErrorResponse),
        (status = 404, description = "Student fee not found", body = ErrorResponse)
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn waive_fee(
    State(state): State<AppState>,
    RequireFeesWrite(auth_user): RequireFeesWrite,
    Path(id): Path<StudentFeeId>,
    ValidatedJson(dto): ValidatedJson<WaiveFeeDto>,
) -> Result<Json<StudentFee>, AppError> {
    let fee = FeeService::waive_fee(&state.db, id, resource_scope(&auth_user), dto).await?;
    Ok(Json(fee))
}

#[utoipa::path(
    get,
    path = "/api/fees/students/{id}/statement",
    params(("id" = StudentId, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Fee statement", body = FeeStatement),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_statement(
    State(state): State<AppState>,
    RequireFeesRead(auth_user): RequireFeesRead,
    Path(id): Path<StudentId>,
) -> Result<Json<FeeStatement>, AppError> {
    let statement = FeeService::get_statement(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(statement))
}

#[utoipa::path(
    get,
    path = "/api/fees/reports/overdue",
    params(SchoolScopeParams),
    responses(
        (status = 200, description = "Outstanding fees past due", body = Vec<OverdueFee>)
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn overdue_report(
    State(state): State<AppState>,
    RequireFeesRead(auth_user): RequireFeesRead,
    ValidatedQuery(scope): ValidatedQuery<SchoolScopeParams>,
) -> Result<Json<Vec<OverdueFee>>, AppError> {
    let school_id = scoped_school_id(&auth_user, scope.school_id)?;
    let overdue = FeeService::overdue_report(&state.db, school_id).await?;
    Ok(Json(overdue))
}
