use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use schoolhouse_core::{AppError, ErrorResponse, Paginated, PaginationParams};
use schoolhouse_models::ids::StudentId;
use tracing::instrument;

use crate::middleware::auth::{RequireStudentsRead, RequireStudentsWrite};
use crate::state::AppState;
use crate::utils::auth_helpers::{resource_scope, scoped_school_id};
use crate::validator::{ValidatedJson, ValidatedQuery};

use super::model::{
    ChangeStudentStatusDto, CreateStudentDto, PromoteStudentsDto, PromotionResult, Student,
    StudentFilterParams, UpdateStudentDto,
};
use super::service::StudentService;

#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudentDto,
    responses(
        (status = 201, description = "Student created", body = Student),
        (status = 400, description = "Student number already exists", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_student(
    State(state): State<AppState>,
    RequireStudentsWrite(auth_user): RequireStudentsWrite,
    ValidatedJson(dto): ValidatedJson<CreateStudentDto>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let school_id = scoped_school_id(&auth_user, dto.school_id)?;
    let student = StudentService::create_student(&state.db, state.cache(), school_id, dto).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

#[utoipa::path(
    get,
    path = "/api/students",
    params(StudentFilterParams, PaginationParams),
    responses(
        (status = 200, description = "Paginated students", body = Paginated<Student>)
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_students(
    State(state): State<AppState>,
    RequireStudentsRead(auth_user): RequireStudentsRead,
    ValidatedQuery(filters): ValidatedQuery<StudentFilterParams>,
    ValidatedQuery(pagination): ValidatedQuery<PaginationParams>,
) -> Result<Json<Paginated<Student>>, AppError> {
    let school_id = scoped_school_id(&auth_user, filters.school_id)?;
    let students = StudentService::get_students(&state.db, school_id, filters, pagination).await?;
    Ok(Json(students))
}

#[utoipa::path(
    get,
    path = "/api/students/{id}",
    params(("id" = StudentId, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student", body = Student),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_student(
    State(state): State<AppState>,
    RequireStudentsRead(auth_user): RequireStudentsRead,
    Path(id): Path<StudentId>,
) -> Result<Json<Student>, AppError> {
    let student = StudentService::get_student(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(student))
}

#[utoipa::path(
    put,
    path = "/api/students/{id}",
    params(("id" = StudentId, Path, description = "Student ID")),
    request_body = UpdateStudentDto,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_student(
    State(state): State<AppState>,
    RequireStudentsWrite(auth_user): RequireStudentsWrite,
    Path(id): Path<StudentId>,
    ValidatedJson(dto): ValidatedJson<UpdateStudentDto>,
) -> Result<Json<Student>, AppError> {
    let student = StudentService::update_student(
        &state.db,
        state.cache(),
        id,
        resource_scope(&auth_user),
        dto,
    )
    .await?;
    Ok(Json(student))
}

#[utoipa::path(
    patch,
    path = "/api/students/{id}/status",
    params(("id" = StudentId, Path, description = "Student ID")),
    request_body = ChangeStudentStatusDto,
    responses(
        (status = 200, description = "Status changed", body = Student),
        (status = 400, description = "Transition not allowed", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn change_student_status(
    State(state): State<AppState>,
    RequireStudentsWrite(auth_user): RequireStudentsWrite,
    Path(id): Path<StudentId>,
    ValidatedJson(dto): ValidatedJson<ChangeStudentStatusDto>,
) -> Result<Json<Student>, AppError> {
    let student = StudentService::change_status(
        &state.db,
        state.cache(),
        id,
        resource_scope(&auth_user),
        dto.status,
    )
    .await?;
    Ok(Json(student))
}

#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    params(("id" = StudentId, Path, description = "Student ID")),
    responses(
        (status = 204, description = "Student deleted"),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_student(
    State(state): State<AppState>,
    RequireStudentsWrite(auth_user): RequireStudentsWrite,
    Path(id): Path<StudentId>,
) -> Result<StatusCode, AppError> {
    StudentService::delete_student(&state.db, state.cache(), id, resource_scope(&auth_user)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Year-end promotion of every active student in the school
#[utoipa::path(
    post,
    path = "/api/students/promote",
    request_body = PromoteStudentsDto,
    responses(
        (status = 200, description = "Promotion counts", body = PromotionResult),
        (status = 400, description = "System admin did not pass school_id", body = ErrorResponse)
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn promote_students(
    State(state): State<AppState>,
    RequireStudentsWrite(auth_user): RequireStudentsWrite,
    ValidatedJson(dto): ValidatedJson<PromoteStudentsDto>,
) -> Result<Json<PromotionResult>, AppError> {
    let school_id = scoped_school_id(&auth_user, dto.school_id)?;
    let result = StudentService::promote_students(&state.db, state.cache(), school_id).await?;
    Ok(Json(result))
}
