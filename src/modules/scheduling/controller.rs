use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use schoolhouse_core::{AppError, ErrorResponse, Paginated, PaginationParams};
use schoolhouse_models::SchoolScopeParams;
use schoolhouse_models::ids::{CourseId, RoomId, SectionId, StudentId};
use tracing::instrument;

use crate::middleware::auth::{RequireSchedulingRead, RequireSchedulingWrite};
use crate::state::AppState;
use crate::utils::auth_helpers::{resource_scope, scoped_school_id};
use crate::validator::{ValidatedJson, ValidatedQuery};

use super::model::{
    AutoAssignDto, AutoAssignResult, ConflictReport, Course, CourseFilterParams, CreateCourseDto,
    CreateRoomDto, CreateSectionDto, EnrollStudentDto, Enrollment, Room, RoomFilterParams,
    RosterEntry, ScheduleHealth, ScheduleScopeParams, Section, SectionFilterParams,
    UpdateCourseDto, UpdateRoomDto, UpdateSectionDto,
};
use super::service::SchedulingService;

#[utoipa::path(
    post,
    path = "/api/scheduling/rooms",
    request_body = CreateRoomDto,
    responses(
        (status = 201, description = "Room created", body = Room),
        (status = 400, description = "Room name already exists", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_room(
    State(state): State<AppState>,
    RequireSchedulingWrite(auth_user): RequireSchedulingWrite,
    ValidatedJson(dto): ValidatedJson<CreateRoomDto>,
) -> Result<(StatusCode, Json<Room>), AppError> {
    let school_id = scoped_school_id(&auth_user, dto.school_id)?;
    let room = SchedulingService::create_room(&state.db, state.cache(), school_id, dto).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

#[utoipa::path(
    get,
    path = "/api/scheduling/rooms",
    params(RoomFilterParams, PaginationParams),
    responses(
        (status = 200, description = "Paginated rooms", body = Paginated<Room>)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_rooms(
    State(state): State<AppState>,
    RequireSchedulingRead(auth_user): RequireSchedulingRead,
    ValidatedQuery(filters): ValidatedQuery<RoomFilterParams>,
    ValidatedQuery(pagination): ValidatedQuery<PaginationParams>,
) -> Result<Json<Paginated<Room>>, AppError> {
    let school_id = scoped_school_id(&auth_user, filters.school_id)?;
    let rooms = SchedulingService::get_rooms(&state.db, school_id, filters, pagination).await?;
    Ok(Json(rooms))
}

#[utoipa::path(
    get,
    path = "/api/scheduling/rooms/{id}",
    params(("id" = RoomId, Path, description = "Room ID")),
    responses(
        (status = 200, description = "Room", body = Room),
        (status = 404, description = "Room not found", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_room(
    State(state): State<AppState>,
    RequireSchedulingRead(auth_user): RequireSchedulingRead,
    Path(id): Path<RoomId>,
) -> Result<Json<Room>, AppError> {
    let room = SchedulingService::get_room(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(room))
}

#[utoipa::path(
    put,
    path = "/api/scheduling/rooms/{id}",
    params(("id" = RoomId, Path, description = "Room ID")),
    request_body = UpdateRoomDto,
    responses(
        (status = 200, description = "Room updated", body = Room),
        (status = 400, description = "Room name already exists", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_room(
    State(state): State<AppState>,
    RequireSchedulingWrite(auth_user): RequireSchedulingWrite,
    Path(id): Path<RoomId>,
    ValidatedJson(dto): ValidatedJson<UpdateRoomDto>,
) -> Result<Json<Room>, AppError> {
    let room =
        SchedulingService::update_room(&state.db, state.cache(), id, resource_scope(&auth_user), dto)
            .await?;
    Ok(Json(room))
}

#[utoipa::path(
    delete,
    path = "/api/scheduling/rooms/{id}",
    params(("id" = RoomId, Path, description = "Room ID")),
    responses(
        (status = 204, description = "Room deleted"),
        (status = 404, description = "Room not found", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_room(
    State(state): State<AppState>,
    RequireSchedulingWrite(auth_user): RequireSchedulingWrite,
    Path(id): Path<RoomId>,
) -> Result<StatusCode, AppError> {
    SchedulingService::delete_room(&state.db, state.cache(), id, resource_scope(&auth_user)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/scheduling/courses",
    request_body = CreateCourseDto,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "Course code already exists", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_course(
    State(state): State<AppState>,
    RequireSchedulingWrite(auth_user): RequireSchedulingWrite,
    ValidatedJson(dto): ValidatedJson<CreateCourseDto>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let school_id = scoped_school_id(&auth_user, dto.school_id)?;
    let course = SchedulingService::create_course(&state.db, state.cache(), school_id, dto).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    get,
    path = "/api/scheduling/courses",
    params(CourseFilterParams, PaginationParams),
    responses(
        (status = 200, description = "Paginated courses", body = Paginated<Course>)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_courses(
    State(state): State<AppState>,
    RequireSchedulingRead(auth_user): RequireSchedulingRead,
    ValidatedQuery(filters): ValidatedQuery<CourseFilterParams>,
    ValidatedQuery(pagination): ValidatedQuery<PaginationParams>,
) -> Result<Json<Paginated<Course>>, AppError> {
    let school_id = scoped_school_id(&auth_user, filters.school_id)?;
    let courses = SchedulingService::get_courses(&state.db, school_id, filters, pagination).await?;
    Ok(Json(courses))
}

#[utoipa::path(
    get,
    path = "/api/scheduling/courses/{id}",
    params(("id" = CourseId, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course", body = Course),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_course(
    State(state): State<AppState>,
    RequireSchedulingRead(auth_user): RequireSchedulingRead,
    Path(id): Path<CourseId>,
) -> Result<Json<Course>, AppError> {
    let course = SchedulingService::get_course(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(course))
}

#[utoipa::path(
    put,
    path = "/api/scheduling/courses/{id}",
    params(("id" = CourseId, Path, description = "Course ID")),
    request_body = UpdateCourseDto,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 400, description = "Course code already exists", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_course(
    State(state): State<AppState>,
    RequireSchedulingWrite(auth_user): RequireSchedulingWrite,
    Path(id): Path<CourseId>,
    ValidatedJson(dto): ValidatedJson<UpdateCourseDto>,
) -> Result<Json<Course>, AppError> {
    let course =
        SchedulingService::update_course(&state.db, state.cache(), id, resource_scope(&auth_user), dto)
            .await?;
    Ok(Json(course))
}

#[utoipa::path(
    delete,
    path = "/api/scheduling/courses/{id}",
    params(("id" = CourseId, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_course(
    State(state): State<AppState>,
    RequireSchedulingWrite(auth_user): RequireSchedulingWrite,
    Path(id): Path<CourseId>,
) -> Result<StatusCode, AppError> {
    SchedulingService::delete_course(&state.db, state.cache(), id, resource_scope(&auth_user)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/scheduling/sections",
    params(SchoolScopeParams),
    request_body = CreateSectionDto,
    responses(
        (status = 201, description = "Section created", body = Section),
        (status = 400, description = "Referenced course, year, teacher or room is invalid", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_section(
    State(state): State<AppState>,
    RequireSchedulingWrite(auth_user): RequireSchedulingWrite,
    ValidatedQuery(params): ValidatedQuery<SchoolScopeParams>,
    ValidatedJson(dto): ValidatedJson<CreateSectionDto>,
) -> Result<(StatusCode, Json<Section>), AppError> {
    let school_id = scoped_school_id(&auth_user, params.school_id)?;
    let section = SchedulingService::create_section(&state.db, state.cache(), school_id, dto).await?;
    Ok((StatusCode::CREATED, Json(section)))
}

#[utoipa::path(
    get,
    path = "/api/scheduling/sections",
    params(SectionFilterParams, PaginationParams),
    responses(
        (status = 200, description = "Paginated sections", body = Paginated<Section>)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_sections(
    State(state): State<AppState>,
    RequireSchedulingRead(auth_user): RequireSchedulingRead,
    ValidatedQuery(filters): ValidatedQuery<SectionFilterParams>,
    ValidatedQuery(pagination): ValidatedQuery<PaginationParams>,
) -> Result<Json<Paginated<Section>>, AppError> {
    let school_id = scoped_school_id(&auth_user, filters.school_id)?;
    let sections = SchedulingService::get_sections(&state.db, school_id, filters, pagination).await?;
    Ok(Json(sections))
}

#[utoipa::path(
    get,
    path = "/api/scheduling/sections/{id}",
    params(("id" = SectionId, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Section", body = Section),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_section(
    State(state): State<AppState>,
    RequireSchedulingRead(auth_user): RequireSchedulingRead,
    Path(id): Path<SectionId>,
) -> Result<Json<Section>, AppError> {
    let section = SchedulingService::get_section(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(section))
}

#[utoipa::path(
    put,
    path = "/api/scheduling/sections/{id}",
    params(("id" = SectionId, Path, description = "Section ID")),
    request_body = UpdateSectionDto,
    responses(
        (status = 200, description = "Section updated", body = Section),
        (status = 400, description = "Referenced course, year, teacher or room is invalid", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_section(
    State(state): State<AppState>,
    RequireSchedulingWrite(auth_user): RequireSchedulingWrite,
    Path(id): Path<SectionId>,
    ValidatedJson(dto): ValidatedJson<UpdateSectionDto>,
) -> Result<Json<Section>, AppError> {
    let section =
        SchedulingService::update_section(&state.db, state.cache(), id, resource_scope(&auth_user), dto)
            .await?;
    Ok(Json(section))
}

#[utoipa::path(
    delete,
    path = "/api/scheduling/sections/{id}",
    params(("id" = SectionId, Path, description = "Section ID")),
    responses(
        (status = 204, description = "Section deleted"),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_section(
    State(state): State<AppState>,
    RequireSchedulingWrite(auth_user): RequireSchedulingWrite,
    Path(id): Path<SectionId>,
) -> Result<StatusCode, AppError> {
    SchedulingService::delete_section(&state.db, state.cache(), id, resource_scope(&auth_user)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/scheduling/sections/{id}/enrollments",
    params(("id" = SectionId, Path, description = "Section ID")),
    request_body = EnrollStudentDto,
    responses(
        (status = 201, description = "Student enrolled", body = Enrollment),
        (status = 400, description = "Section full, period clash or already enrolled", body = ErrorResponse),
        (status = 404, description = "Section or student not found", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn enroll_student(
    State(state): State<AppState>,
    RequireSchedulingWrite(auth_user): RequireSchedulingWrite,
    Path(id): Path<SectionId>,
    ValidatedJson(dto): ValidatedJson<EnrollStudentDto>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let enrollment = SchedulingService::enroll_student(
        &state.db,
        state.cache(),
        id,
        resource_scope(&auth_user),
        dto,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

#[utoipa::path(
    get,
    path = "/api/scheduling/sections/{id}/enrollments",
    params(("id" = SectionId, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Section roster", body = Vec<RosterEntry>),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_roster(
    State(state): State<AppState>,
    RequireSchedulingRead(auth_user): RequireSchedulingRead,
    Path(id): Path<SectionId>,
) -> Result<Json<Vec<RosterEntry>>, AppError> {
    let roster = SchedulingService::get_roster(&state.db, id, resource_scope(&auth_user)).await?;
    Ok(Json(roster))
}

#[utoipa::path(
    delete,
    path = "/api/scheduling/sections/{id}/enrollments/{student_id}",
    params(
        ("id" = SectionId, Path, description = "Section ID"),
        ("student_id" = StudentId, Path, description = "Student ID")
    ),
    responses(
        (status = 204, description = "Student dropped"),
        (status = 404, description = "Enrollment not found", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn drop_student(
    State(state): State<AppState>,
    RequireSchedulingWrite(auth_user): RequireSchedulingWrite,
    Path((id, student_id)): Path<(SectionId, StudentId)>,
) -> Result<StatusCode, AppError> {
    SchedulingService::drop_student(
        &state.db,
        state.cache(),
        id,
        student_id,
        resource_scope(&auth_user),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Conflicts in one academic year's schedule
#[utoipa::path(
    get,
    path = "/api/scheduling/conflicts",
    params(ScheduleScopeParams),
    responses(
        (status = 200, description = "Conflict report", body = ConflictReport),
        (status = 404, description = "Academic year not found", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_conflicts(
    State(state): State<AppState>,
    RequireSchedulingRead(auth_user): RequireSchedulingRead,
    ValidatedQuery(params): ValidatedQuery<ScheduleScopeParams>,
) -> Result<Json<ConflictReport>, AppError> {
    let school_id = scoped_school_id(&auth_user, params.school_id)?;
    let report = SchedulingService::get_conflicts(
        &state.db,
        state.cache(),
        school_id,
        params.academic_year_id,
    )
    .await?;
    Ok(Json(report))
}

/// Health score and recommendations for one academic year's schedule
#[utoipa::path(
    get,
    path = "/api/scheduling/health",
    params(ScheduleScopeParams),
    responses(
        (status = 200, description = "Schedule health", body = ScheduleHealth),
        (status = 404, description = "Academic year not found", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_health(
    State(state): State<AppState>,
    RequireSchedulingRead(auth_user): RequireSchedulingRead,
    ValidatedQuery(params): ValidatedQuery<ScheduleScopeParams>,
) -> Result<Json<ScheduleHealth>, AppError> {
    let school_id = scoped_school_id(&auth_user, params.school_id)?;
    let health =
        SchedulingService::get_health(&state.db, state.cache(), school_id, params.academic_year_id)
            .await?;
    Ok(Json(health))
}

#[utoipa::path(
    post,
    path = "/api/scheduling/assign-teachers",
    request_body = AutoAssignDto,
    responses(
        (status = 200, description = "Assignment plan", body = AutoAssignResult),
        (status = 404, description = "Academic year not found", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn assign_teachers(
    State(state): State<AppState>,
    RequireSchedulingWrite(auth_user): RequireSchedulingWrite,
    ValidatedJson(dto): ValidatedJson<AutoAssignDto>,
) -> Result<Json<AutoAssignResult>, AppError> {
    let school_id = scoped_school_id(&auth_user, dto.school_id)?;
    let result = SchedulingService::assign_teachers(
        &state.db,
        state.cache(),
        school_id,
        dto.academic_year_id,
        dto.dry_run,
    )
    .await?;
    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/api/scheduling/assign-rooms",
    request_body = AutoAssignDto,
    responses(
        (status = 200, description = "Assignment plan", body = AutoAssignResult),
        (status = 404, description = "Academic year not found", body = ErrorResponse)
    ),
    tag = "Scheduling",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn assign_rooms(
    State(state): State<AppState>,
    RequireSchedulingWrite(auth_user): RequireSchedulingWrite,
    ValidatedJson(dto): ValidatedJson<AutoAssignDto>,
) -> Result<Json<AutoAssignResult>, AppError> {
    let school_id = scoped_school_id(&auth_user, dto.school_id)?;
    let result = SchedulingService::assign_rooms(
        &state.db,
        state.cache(),
        school_id,
        dto.academic_year_id,
        dto.dry_run,
    )
    .await?;
    Ok(Json(result))
}
