use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use schoolhouse_core::{AppError, ErrorResponse, Paginated, PaginationParams};
use schoolhouse_models::SchoolScopeParams;
use schoolhouse_models::ids::{MealAccountId, StudentId};
use tracing::instrument;

use crate::middleware::auth::{RequireCafeteriaRead, RequireCafeteriaWrite};
use crate::state::AppState;
use crate::utils::auth_helpers::{resource_scope, scoped_school_id};
use crate::validator::{ValidatedJson, ValidatedQuery};

use super::model::{
    DepositDto, LowBalanceAccount, LowBalanceParams, MealAccount, MealAccountFilterParams,
    MealTransaction, MealTransactionResult, OpenMealAccountDto, PurchaseDto,
    UpdateMealAccountDto,
};
use super::service::CafeteriaService;

#[utoipa::path(
    post,
    path = "/api/cafeteria/accounts",
    params(SchoolScopeParams),
    request_body = OpenMealAccountDto,
    responses(
        (status = 201, description = "Account opened", body = MealAccount),
        (status = 400, description = "Student already has an account", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Cafeteria",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn open_account(
    State(state): State<AppState>,
    RequireCafeteriaWrite(auth_user): RequireCafeteriaWrite,
    ValidatedQuery(scope): ValidatedQuery<SchoolScopeParams>,
    ValidatedJson(dto): ValidatedJson<OpenMealAccountDto>,
) -> Result<(StatusCode, Json<MealAccount>), AppError> {
    let school_id = scoped_school_id(&auth_user, scope.school_id)?;
    let account = CafeteriaService::open_account(&state.db, school_id, dto).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

#[utoipa::path(
    get,
    path = "/api/cafeteria/accounts",
    params(MealAccountFilterParams, PaginationParams),
    responses(
        (status = 200, description = "Paginated meal accounts", body = Paginated<MealAccount>)
    ),
    tag = "Cafeteria",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_accounts(
    State(state): State<AppState>,
    RequireCafeteriaRead(auth_user): RequireCafeteriaRead,
    ValidatedQuery(filters): ValidatedQuery<MealAccountFilterParams>,
    ValidatedQuery(pagination): ValidatedQuery<PaginationParams>,
) -> Result<Json<Paginated<MealAccount>>, AppError> {
    let school_id = scoped_school_id(&auth_user, filters.school_id)?;
    let accounts = CafeteriaService::get_accounts(&state.db, school_id, filters, pagination).await?;
    Ok(Json(accounts))
}

#[utoipa::path(
    get,
    path = "/api/cafeteria/accounts/{id}",
    params(("id" = MealAccountId, Path, description = "Meal account ID")),
    responses(
        (status = 200, description = "Meal account", body = MealAccount),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    tag = "Cafeteria",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_account(
    State(state): State<AppState>,
    RequireCafeteriaRead(auth_user): RequireCafeteriaRead,
    Path(id): Path<MealAccountId>,
) -> Result<Json<MealAccount>, AppError> {
    let account = CafeteriaService::get_account(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(account))
}

#[utoipa::path(
    get,
    path = "/api/cafeteria/students/{id}/account",
    params(("id" = StudentId, Path, description = "Student ID")),
    responses(
        (status = 200, description = "The student's meal account", body = MealAccount),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    tag = "Cafeteria",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_student_account(
    State(state): State<AppState>,
    RequireCafeteriaRead(auth_user): RequireCafeteriaRead,
    Path(id): Path<StudentId>,
) -> Result<Json<MealAccount>, AppError> {
    let account =
        CafeteriaService::get_student_account(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(account))
}

#[utoipa::path(
    put,
    path = "/api/cafeteria/accounts/{id}",
    params(("id" = MealAccountId, Path, description = "Meal account ID")),
    request_body = UpdateMealAccountDto,
    responses(
        (status = 200, description = "Account updated", body = MealAccount),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    tag = "Cafeteria",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_account(
    State(state): State<AppState>,
    RequireCafeteriaWrite(auth_user): RequireCafeteriaWrite,
    Path(id): Path<MealAccountId>,
    ValidatedJson(dto): ValidatedJson<UpdateMealAccountDto>,
) -> Result<Json<MealAccount>, AppError> {
    let account =
        CafeteriaService::update_account(&state.db, id, resource_scope(&auth_user), dto).await?;
    Ok(Json(account))
}

#[utoipa::path(
    post,
    path = "/api/cafeteria/accounts/{id}/deposits",
    params(("id" = MealAccountId, Path, description = "Meal account ID")),
    request_body = DepositDto,
    responses(
        (status = 201, description = "Deposit posted", body = MealTransactionResult),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    tag = "Cafeteria",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn deposit(
    State(state): State<AppState>,
    RequireCafeteriaWrite(auth_user): RequireCafeteriaWrite,
    Path(id): Path<MealAccountId>,
    ValidatedJson(dto): ValidatedJson<DepositDto>,
) -> Result<(StatusCode, Json<MealTransactionResult>), AppError> {
    let staff_id = auth_user.staff_id()?;
    let result =
        CafeteriaService::deposit(&state.db, id, resource_scope(&auth_user), staff_id, dto).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[utoipa::path(
    post,
    path = "/api/cafeteria/accounts/{id}/purchases",
    params(("id" = MealAccountId, Path, description = "Meal account ID")),
    request_body = PurchaseDto,
    responses(
        (status = 201, description = "Meal charged", body = MealTransactionResult),
        (status = 400, description = "Insufficient balance", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    tag = "Cafeteria",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn purchase(
    State(state): State<AppState>,
    RequireCafeteriaWrite(auth_user): RequireCafeteriaWrite,
    Path(id): Path<MealAccountId>,
    ValidatedJson(dto): ValidatedJson<PurchaseDto>,
) -> Result<(StatusCode, Json<MealTransactionResult>), AppError> {
    let staff_id = auth_user.staff_id()?;
    let result =
        CafeteriaService::purchase(&state.db, id, resource_scope(&auth_user), staff_id, dto)
            .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[utoipa::path(
    get,
    path = "/api/cafeteria/accounts/{id}/transactions",
    params(("id" = MealAccountId, Path, description = "Meal account ID"), PaginationParams),
    responses(
        (status = 200, description = "Account ledger, newest first", body = Paginated<MealTransaction>),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    tag = "Cafeteria",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_transactions(
    State(state): State<AppState>,
    RequireCafeteriaRead(auth_user): RequireCafeteriaRead,
    Path(id): Path<MealAccountId>,
    ValidatedQuery(pagination): ValidatedQuery<PaginationParams>,
) -> Result<Json<Paginated<MealTransaction>>, AppError> {
    let transactions =
        CafeteriaService::get_transactions(&state.db, id, resource_scope(&auth_user), pagination)
            .await?;
    Ok(Json(transactions))
}

#[utoipa::path(
    get,
    path = "/api/cafeteria/reports/low-balance",
    params(LowBalanceParams),
    responses(
        (status = 200, description = "Accounts below the threshold", body = Vec<LowBalanceAccount>)
    ),
    tag = "Cafeteria",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn low_balance_report(
    State(state): State<AppState>,
    RequireCafeteriaRead(auth_user): RequireCafeteriaRead,
    ValidatedQuery(params): ValidatedQuery<LowBalanceParams>,
) -> Result<Json<Vec<LowBalanceAccount>>, AppError> {
    let school_id = scoped_school_id(&auth_user, params.school_id)?;
    let accounts =
        CafeteriaService::low_balance_report(&state.db, school_id, params.threshold_cents).await?;
    Ok(Json(accounts))
}
