use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use schoolhouse_core::{AppError, ErrorResponse};
use schoolhouse_models::ids::{AssignmentId, GradeCategoryId, SectionId, StudentId};
use tracing::instrument;

use crate::middleware::auth::{RequireGradebookRead, RequireGradebookWrite};
use crate::state::AppState;
use crate::utils::auth_helpers::resource_scope;
use crate::validator::ValidatedJson;

use super::model::{
    Assignment, BulkScoresDto, CreateAssignmentDto, CreateGradeCategoryDto, GradeCategory, Score,
    SectionGradeReport, StudentGrade, UpdateAssignmentDto, UpdateGradeCategoryDto,
};
use super::service::GradebookService;

#[utoipa::path(
    post,
    path = "/api/gradebook/sections/{id}/categories",
    params(("id" = SectionId, Path, description = "Section ID")),
    request_body = CreateGradeCategoryDto,
    responses(
        (status = 201, description = "Category created", body = GradeCategory),
        (status = 400, description = "Category name already exists", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    tag = "Gradebook",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_category(
    State(state): State<AppState>,
    RequireGradebookWrite(auth_user): RequireGradebookWrite,
    Path(id): Path<SectionId>,
    ValidatedJson(dto): ValidatedJson<CreateGradeCategoryDto>,
) -> Result<(StatusCode, Json<GradeCategory>), AppError> {
    let category =
        GradebookService::create_category(&state.db, id, resource_scope(&auth_user), dto).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    get,
    path = "/api/gradebook/sections/{id}/categories",
    params(("id" = SectionId, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Section categories", body = Vec<GradeCategory>),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    tag = "Gradebook",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_categories(
    State(state): State<AppState>,
    RequireGradebookRead(auth_user): RequireGradebookRead,
    Path(id): Path<SectionId>,
) -> Result<Json<Vec<GradeCategory>>, AppError> {
    let categories =
        GradebookService::get_categories(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(categories))
}

#[utoipa::path(
    put,
    path = "/api/gradebook/categories/{id}",
    params(("id" = GradeCategoryId, Path, description = "Category ID")),
    request_body = UpdateGradeCategoryDto,
    responses(
        (status = 200, description = "Category updated", body = GradeCategory),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    tag = "Gradebook",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_category(
    State(state): State<AppState>,
    RequireGradebookWrite(auth_user): RequireGradebookWrite,
    Path(id): Path<GradeCategoryId>,
    ValidatedJson(dto): ValidatedJson<UpdateGradeCategoryDto>,
) -> Result<Json<GradeCategory>, AppError> {
    let category =
        GradebookService::update_category(&state.db, id, resource_scope(&auth_user), dto).await?;
    Ok(Json(category))
}

#[utoipa::path(
    delete,
    path = "/api/gradebook/categories/{id}",
    params(("id" = GradeCategoryId, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    tag = "Gradebook",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_category(
    State(state): State<AppState>,
    RequireGradebookWrite(auth_user): RequireGradebookWrite,
    Path(id): Path<GradeCategoryId>,
) -> Result<StatusCode, AppError> {
    GradebookService::delete_category(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/gradebook/sections/{id}/assignments",
    params(("id" = SectionId, Path, description = "Section ID")),
    request_body = CreateAssignmentDto,
    responses(
        (status = 201, description = "Assignment created", body = Assignment),
        (status = 400, description = "Category belongs to another section", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    tag = "Gradebook",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_assignment(
    State(state): State<AppState>,
    RequireGradebookWrite(auth_user): RequireGradebookWrite,
    Path(id): Path<SectionId>,
    ValidatedJson(dto): ValidatedJson<CreateAssignmentDto>,
) -> Result<(StatusCode, Json<Assignment>), AppError> {
    let assignment =
        GradebookService::create_assignment(&state.db, id, resource_scope(&auth_user), dto)
            .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

#[utoipa::path(
    get,
    path = "/api/gradebook/sections/{id}/assignments",
    params(("id" = SectionId, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Section assignments", body = Vec<Assignment>),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    tag = "Gradebook",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_assignments(
    State(state): State<AppState>,
    RequireGradebookRead(auth_user): RequireGradebookRead,
    Path(id): Path<SectionId>,
) -> Result<Json<Vec<Assignment>>, AppError> {
    let assignments =
        GradebookService::get_assignments(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(assignments))
}

#[utoipa::path(
    get,
    path = "/api/gradebook/assignments/{id}",
    params(("id" = AssignmentId, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment", body = Assignment),
        (status = 404, description = "Assignment not found", body = ErrorResponse)
    ),
    tag = "Gradebook",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_assignment(
    State(state): State<AppState>,
    RequireGradebookRead(auth_user): RequireGradebookRead,
    Path(id): Path<AssignmentId>,
) -> Result<Json<Assignment>, AppError> {
    let assignment =
        GradebookService::get_assignment(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(assignment))
}

#[utoipa::path(
    put,
    path = "/api/gradebook/assignments/{id}",
    params(("id" = AssignmentId, Path, description = "Assignment ID")),
    request_body = UpdateAssignmentDto,
    responses(
        (status = 200, description = "Assignment updated", body = Assignment),
        (status = 400, description = "Invalid category or max points", body = ErrorResponse),
        (status = 404, description = "Assignment not found", body = ErrorResponse)
    ),
    tag = "Gradebook",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_assignment(
    State(state): State<AppState>,
    RequireGradebookWrite(auth_user): RequireGradebookWrite,
    Path(id): Path<AssignmentId>,
    ValidatedJson(dto): ValidatedJson<UpdateAssignmentDto>,
) -> Result<Json<Assignment>, AppError> {
    let assignment =
        GradebookService::update_assignment(&state.db, id, resource_scope(&auth_user), dto)
            .await?;
    Ok(Json(assignment))
}

#[utoipa::path(
    delete,
    path = "/api/gradebook/assignments/{id}",
    params(("id" = AssignmentId, Path, description = "Assignment ID")),
    responses(
        (status = 204, description = "Assignment deleted"),
        (status = 404, description = "Assignment not found", body = ErrorResponse)
    ),
    tag = "Gradebook",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_assignment(
    State(state): State<AppState>,
    RequireGradebookWrite(auth_user): RequireGradebookWrite,
    Path(id): Path<AssignmentId>,
) -> Result<StatusCode, AppError> {
    GradebookService::delete_assignment(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Record or overwrite scores for an assignment
#[utoipa::path(
    put,
    path = "/api/gradebook/assignments/{id}/scores",
    params(("id" = AssignmentId, Path, description = "Assignment ID")),
    request_body = BulkScoresDto,
    responses(
        (status = 200, description = "Scores recorded", body = Vec<Score>),
        (status = 400, description = "Score out of range or student not enrolled", body = ErrorResponse),
        (status = 404, description = "Assignment not found", body = ErrorResponse)
    ),
    tag = "Gradebook",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn record_scores(
    State(state): State<AppState>,
    RequireGradebookWrite(auth_user): RequireGradebookWrite,
    Path(id): Path<AssignmentId>,
    ValidatedJson(dto): ValidatedJson<BulkScoresDto>,
) -> Result<Json<Vec<Score>>, AppError> {
    let scores =
        GradebookService::record_scores(&state.db, id, resource_scope(&auth_user), dto).await?;
    Ok(Json(scores))
}

#[utoipa::path(
    get,
    path = "/api/gradebook/assignments/{id}/scores",
    params(("id" = AssignmentId, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment scores", body = Vec<Score>),
        (status = 404, description = "Assignment not found", body = ErrorResponse)
    ),
    tag = "Gradebook",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_scores(
    State(state): State<AppState>,
    RequireGradebookRead(auth_user): RequireGradebookRead,
    Path(id): Path<AssignmentId>,
) -> Result<Json<Vec<Score>>, AppError> {
    let scores = GradebookService::get_scores(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(scores))
}

/// Weighted grade of one student in a section
#[utoipa::path(
    get,
    path = "/api/gradebook/sections/{id}/students/{student_id}/grade",
    params(
        ("id" = SectionId, Path, description = "Section ID"),
        ("student_id" = StudentId, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Student grade", body = StudentGrade),
        (status = 404, description = "Section not found or student not enrolled", body = ErrorResponse)
    ),
    tag = "Gradebook",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_student_grade(
    State(state): State<AppState>,
    RequireGradebookRead(auth_user): RequireGradebookRead,
    Path((id, student_id)): Path<(SectionId, StudentId)>,
) -> Result<Json<StudentGrade>, AppError> {
    let grade =
        GradebookService::get_student_grade(&state.db, id, student_id, resource_scope(&auth_user))
            .await?;
    Ok(Json(grade))
}

#[utoipa::path(
    get,
    path = "/api/gradebook/sections/{id}/report",
    params(("id" = SectionId, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Grades of every enrolled student", body = SectionGradeReport),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    tag = "Gradebook",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_section_report(
    State(state): State<AppState>,
    RequireGradebookRead(auth_user): RequireGradebookRead,
    Path(id): Path<SectionId>,
) -> Result<Json<SectionGradeReport>, AppError> {
    let report =
        GradebookService::get_section_report(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(report))
}
