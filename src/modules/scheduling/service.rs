use schoolhouse_cache::{RedisCache, invalidate, keys};
use schoolhouse_core::{AppError, Paginated, PaginationParams};
use schoolhouse_models::StaffRole;
use schoolhouse_models::StudentStatus;
use schoolhouse_models::ids::{AcademicYearId, CourseId, RoomId, SchoolId, SectionId, StaffId, StudentId};
use sqlx::{FromRow, PgPool};
use tracing::{debug, error, info, instrument, warn};

use crate::metrics;

use super::analysis::{self, RoomInfo, ScheduleSnapshot, SectionSlot, TeacherInfo};
use super::assignment;
use super::model::{
    AutoAssignResult, ConflictReport, Course, CourseFilterParams, CreateCourseDto, CreateRoomDto,
    CreateSectionDto, Enrollment, EnrollStudentDto, Room, RoomFilterParams, RosterEntry,
    ScheduleHealth, Section, SectionFilterParams, UpdateCourseDto, UpdateRoomDto,
    UpdateSectionDto,
};

const ROOM_COLUMNS: &str = "id, school_id, name, room_type, capacity, created_at, updated_at";

const COURSE_COLUMNS: &str =
    "id, school_id, code, name, subject, grade_level, required_room_type, created_at, updated_at";

const SECTION_SELECT: &str = "SELECT s.id, s.school_id, s.course_id, s.academic_year_id,
        s.teacher_id, s.room_id, s.period, s.meeting_days, s.capacity,
        (SELECT COUNT(*) FROM enrollments e WHERE e.section_id = s.id) AS enrolled_count,
        s.created_at, s.updated_at
     FROM sections s";

fn map_write_error(e: sqlx::Error, duplicate: &'static str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::bad_request(anyhow::anyhow!(duplicate));
    }
    error!(error = %e, "Database error writing schedule data");
    AppError::from(e)
}

/// Slot and ownership of a section, locked while enrolling.
#[derive(Debug, FromRow)]
struct SectionLock {
    school_id: SchoolId,
    academic_year_id: AcademicYearId,
    period: i32,
    meeting_days: i32,
    capacity: i32,
}

#[derive(Debug, Clone, Copy)]
enum Resource {
    Teacher,
    Room,
}

impl Resource {
    fn as_str(self) -> &'static str {
        match self {
            Resource::Teacher => "teacher",
            Resource::Room => "room",
        }
    }
}

pub struct SchedulingService;

impl SchedulingService {
    // Rooms

    #[instrument(skip(db, cache, dto), fields(db.operation = "INSERT", db.table = "rooms"))]
    pub async fn create_room(
        db: &PgPool,
        cache: Option<&RedisCache>,
        school_id: SchoolId,
        dto: CreateRoomDto,
    ) -> Result<Room, AppError> {
        let query = format!(
            "INSERT INTO rooms (school_id, name, room_type, capacity)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            ROOM_COLUMNS
        );
        let room = sqlx::query_as::<_, Room>(&query)
            .bind(school_id)
            .bind(&dto.name)
            .bind(dto.room_type)
            .bind(dto.capacity)
            .fetch_one(db)
            .await
            .map_err(|e| map_write_error(e, "Room name already exists in this school"))?;

        invalidate::schedule(cache, school_id.into_inner()).await;
        info!(room.id = %room.id, school.id = %school_id, "Room created");
        Ok(room)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "rooms"))]
    pub async fn get_rooms(
        db: &PgPool,
        school_id: SchoolId,
        filters: RoomFilterParams,
        pagination: PaginationParams,
    ) -> Result<Paginated<Room>, AppError> {
        let where_clause = "school_id = $1
            AND ($2::text IS NULL OR room_type = $2)
            AND ($3::int IS NULL OR capacity >= $3)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM rooms WHERE {}",
            where_clause
        ))
        .bind(school_id)
        .bind(filters.room_type)
        .bind(filters.min_capacity)
        .fetch_one(db)
        .await?;

        let query = format!(
            "SELECT {} FROM rooms WHERE {} ORDER BY name LIMIT $4 OFFSET $5",
            ROOM_COLUMNS, where_clause
        );
        let rooms = sqlx::query_as::<_, Room>(&query)
            .bind(school_id)
            .bind(filters.room_type)
            .bind(filters.min_capacity)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        Ok(Paginated::new(rooms, total, &pagination))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "rooms"))]
    pub async fn get_room(
        db: &PgPool,
        id: RoomId,
        scope: Option<SchoolId>,
    ) -> Result<Room, AppError> {
        let query = format!(
            "SELECT {} FROM rooms WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)",
            ROOM_COLUMNS
        );
        sqlx::query_as::<_, Room>(&query)
            .bind(id)
            .bind(scope)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Room not found")))
    }

    #[instrument(skip(db, cache, dto), fields(db.operation = "UPDATE", db.table = "rooms"))]
    pub async fn update_room(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: RoomId,
        scope: Option<SchoolId>,
        dto: UpdateRoomDto,
    ) -> Result<Room, AppError> {
        let query = format!(
            "UPDATE rooms SET
                name = COALESCE($3, name),
                room_type = COALESCE($4, room_type),
                capacity = COALESCE($5, capacity),
                updated_at = NOW()
             WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)
             RETURNING {}",
            ROOM_COLUMNS
        );
        let room = sqlx::query_as::<_, Room>(&query)
            .bind(id)
            .bind(scope)
            .bind(&dto.name)
            .bind(dto.room_type)
            .bind(dto.capacity)
            .fetch_optional(db)
            .await
            .map_err(|e| map_write_error(e, "Room name already exists in this school"))?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Room not found")))?;

        invalidate::schedule(cache, room.school_id.into_inner()).await;
        Ok(room)
    }

    /// Sections held in the room lose their room assignment.
    #[instrument(skip(db, cache), fields(db.operation = "DELETE", db.table = "rooms"))]
    pub async fn delete_room(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: RoomId,
        scope: Option<SchoolId>,
    ) -> Result<(), AppError> {
        let school_id = sqlx::query_scalar::<_, SchoolId>(
            "DELETE FROM rooms WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)
             RETURNING school_id",
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Room not found")))?;

        invalidate::schedule(cache, school_id.into_inner()).await;
        info!(room.id = %id, "Room deleted");
        Ok(())
    }

    // Courses

    #[instrument(skip(db, cache, dto), fields(db.operation = "INSERT", db.table = "courses"))]
    pub async fn create_course(
        db: &PgPool,
        cache: Option<&RedisCache>,
        school_id: SchoolId,
        dto: CreateCourseDto,
    ) -> Result<Course, AppError> {
        let query = format!(
            "INSERT INTO courses (school_id, code, name, subject, grade_level, required_room_type)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            COURSE_COLUMNS
        );
        let course = sqlx::query_as::<_, Course>(&query)
            .bind(school_id)
            .bind(&dto.code)
            .bind(&dto.name)
            .bind(&dto.subject)
            .bind(dto.grade_level)
            .bind(dto.required_room_type)
            .fetch_one(db)
            .await
            .map_err(|e| map_write_error(e, "Course code already exists in this school"))?;

        invalidate::schedule(cache, school_id.into_inner()).await;
        info!(course.id = %course.id, code = %course.code, "Course created");
        Ok(course)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "courses"))]
    pub async fn get_courses(
        db: &PgPool,
        school_id: SchoolId,
        filters: CourseFilterParams,
        pagination: PaginationParams,
    ) -> Result<Paginated<Course>, AppError> {
        let where_clause = "school_id = $1
            AND ($2::text IS NULL OR subject ILIKE $2)
            AND ($3::int IS NULL OR grade_level = $3)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM courses WHERE {}",
            where_clause
        ))
        .bind(school_id)
        .bind(&filters.subject)
        .bind(filters.grade_level)
        .fetch_one(db)
        .await?;

        let query = format!(
            "SELECT {} FROM courses WHERE {} ORDER BY code LIMIT $4 OFFSET $5",
            COURSE_COLUMNS, where_clause
        );
        let courses = sqlx::query_as::<_, Course>(&query)
            .bind(school_id)
            .bind(&filters.subject)
            .bind(filters.grade_level)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        Ok(Paginated::new(courses, total, &pagination))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "courses"))]
    pub async fn get_course(
        db: &PgPool,
        id: CourseId,
        scope: Option<SchoolId>,
    ) -> Result<Course, AppError> {
        let query = format!(
            "SELECT {} FROM courses WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)",
            COURSE_COLUMNS
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .bind(scope)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Course not found")))
    }

    #[instrument(skip(db, cache, dto), fields(db.operation = "UPDATE", db.table = "courses"))]
    pub async fn update_course(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: CourseId,
        scope: Option<SchoolId>,
        dto: UpdateCourseDto,
    ) -> Result<Course, AppError> {
        let query = format!(
            "UPDATE courses SET
                code = COALESCE($3, code),
                name = COALESCE($4, name),
                subject = COALESCE($5, subject),
                grade_level = COALESCE($6, grade_level),
                required_room_type = COALESCE($7, required_room_type),
                updated_at = NOW()
             WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)
             RETURNING {}",
            COURSE_COLUMNS
        );
        let course = sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .bind(scope)
            .bind(&dto.code)
            .bind(&dto.name)
            .bind(&dto.subject)
            .bind(dto.grade_level)
            .bind(dto.required_room_type)
            .fetch_optional(db)
            .await
            .map_err(|e| map_write_error(e, "Course code already exists in this school"))?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Course not found")))?;

        invalidate::schedule(cache, course.school_id.into_inner()).await;
        Ok(course)
    }

    /// Deleting a course removes its sections and their enrollments.
    #[instrument(skip(db, cache), fields(db.operation = "DELETE", db.table = "courses"))]
    pub async fn delete_course(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: CourseId,
        scope: Option<SchoolId>,
    ) -> Result<(), AppError> {
        let school_id = sqlx::query_scalar::<_, SchoolId>(
            "DELETE FROM courses WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)
             RETURNING school_id",
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Course not found")))?;

        invalidate::schedule(cache, school_id.into_inner()).await;
        info!(course.id = %id, "Course deleted");
        Ok(())
    }

    // Sections

    async fn ensure_in_school(
        db: &PgPool,
        table: &'static str,
        id: uuid::Uuid,
        school_id: SchoolId,
        message: &'static str,
    ) -> Result<(), AppError> {
        let exists = sqlx::query_scalar::<_, bool>(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1 AND school_id = $2)",
            table
        ))
        .bind(id)
        .bind(school_id)
        .fetch_one(db)
        .await?;

        if !exists {
            return Err(AppError::bad_request(anyhow::anyhow!(message)));
        }
        Ok(())
    }

    async fn ensure_teacher(
        db: &PgPool,
        teacher_id: StaffId,
        school_id: SchoolId,
    ) -> Result<(), AppError> {
        let role = sqlx::query_scalar::<_, StaffRole>(
            "SELECT role FROM staff WHERE id = $1 AND school_id = $2 AND is_active",
        )
        .bind(teacher_id)
        .bind(school_id)
        .fetch_optional(db)
        .await?;

        match role {
            Some(StaffRole::Teacher) => Ok(()),
            Some(_) => Err(AppError::bad_request(anyhow::anyhow!(
                "Assigned staff member is not a teacher"
            ))),
            None => Err(AppError::bad_request(anyhow::anyhow!(
                "Teacher not found in this school"
            ))),
        }
    }

    #[instrument(skip(db, cache, dto), fields(db.operation = "INSERT", db.table = "sections"))]
    pub async fn create_section(
        db: &PgPool,
        cache: Option<&RedisCache>,
        school_id: SchoolId,
        dto: CreateSectionDto,
    ) -> Result<Section, AppError> {
        Self::ensure_in_school(
            db,
            "courses",
            dto.course_id.into_inner(),
            school_id,
            "Course not found in this school",
        )
        .await?;
        Self::ensure_in_school(
            db,
            "academic_years",
            dto.academic_year_id.into_inner(),
            school_id,
            "Academic year not found in this school",
        )
        .await?;
        if let Some(teacher_id) = dto.teacher_id {
            Self::ensure_teacher(db, teacher_id, school_id).await?;
        }
        if let Some(room_id) = dto.room_id {
            Self::ensure_in_school(
                db,
                "rooms",
                room_id.into_inner(),
                school_id,
                "Room not found in this school",
            )
            .await?;
        }

        let id = sqlx::query_scalar::<_, SectionId>(
            "INSERT INTO sections (school_id, course_id, academic_year_id, teacher_id, room_id,
                                   period, meeting_days, capacity)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(school_id)
        .bind(dto.course_id)
        .bind(dto.academic_year_id)
        .bind(dto.teacher_id)
        .bind(dto.room_id)
        .bind(dto.period)
        .bind(dto.meeting_days)
        .bind(dto.capacity)
        .fetch_one(db)
        .await?;

        invalidate::schedule(cache, school_id.into_inner()).await;
        info!(section.id = %id, course.id = %dto.course_id, "Section created");
        Self::get_section(db, id, None).await
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "sections"))]
    pub async fn get_sections(
        db: &PgPool,
        school_id: SchoolId,
        filters: SectionFilterParams,
        pagination: PaginationParams,
    ) -> Result<Paginated<Section>, AppError> {
        let where_clause = "s.school_id = $1
            AND ($2::uuid IS NULL OR s.academic_year_id = $2)
            AND ($3::uuid IS NULL OR s.course_id = $3)
            AND ($4::uuid IS NULL OR s.teacher_id = $4)
            AND ($5::uuid IS NULL OR s.room_id = $5)
            AND ($6::int IS NULL OR s.period = $6)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM sections s WHERE {}",
            where_clause
        ))
        .bind(school_id)
        .bind(filters.academic_year_id)
        .bind(filters.course_id)
        .bind(filters.teacher_id)
        .bind(filters.room_id)
        .bind(filters.period)
        .fetch_one(db)
        .await?;

        let query = format!(
            "{} WHERE {} ORDER BY s.period, s.created_at LIMIT $7 OFFSET $8",
            SECTION_SELECT, where_clause
        );
        let sections = sqlx::query_as::<_, Section>(&query)
            .bind(school_id)
            .bind(filters.academic_year_id)
            .bind(filters.course_id)
            .bind(filters.teacher_id)
            .bind(filters.room_id)
            .bind(filters.period)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        debug!(total, returned = sections.len(), "Sections fetched");
        Ok(Paginated::new(sections, total, &pagination))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "sections"))]
    pub async fn get_section(
        db: &PgPool,
        id: SectionId,
        scope: Option<SchoolId>,
    ) -> Result<Section, AppError> {
        let query = format!(
            "{} WHERE s.id = $1 AND ($2::uuid IS NULL OR s.school_id = $2)",
            SECTION_SELECT
        );
        sqlx::query_as::<_, Section>(&query)
            .bind(id)
            .bind(scope)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Section not found")))
    }

    #[instrument(skip(db, cache, dto), fields(db.operation = "UPDATE", db.table = "sections"))]
    pub async fn update_section(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: SectionId,
        scope: Option<SchoolId>,
        dto: UpdateSectionDto,
    ) -> Result<Section, AppError> {
        let current = Self::get_section(db, id, scope).await?;

        if let Some(teacher_id) = dto.teacher_id {
            Self::ensure_teacher(db, teacher_id, current.school_id).await?;
        }
        if let Some(room_id) = dto.room_id {
            Self::ensure_in_school(
                db,
                "rooms",
                room_id.into_inner(),
                current.school_id,
                "Room not found in this school",
            )
            .await?;
        }
        if let Some(capacity) = dto.capacity
            && i64::from(capacity) < current.enrolled_count
        {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Capacity cannot be below the {} students already enrolled",
                current.enrolled_count
            )));
        }

        sqlx::query(
            "UPDATE sections SET
                teacher_id = COALESCE($2, teacher_id),
                room_id = COALESCE($3, room_id),
                period = COALESCE($4, period),
                meeting_days = COALESCE($5, meeting_days),
                capacity = COALESCE($6, capacity),
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(dto.teacher_id)
        .bind(dto.room_id)
        .bind(dto.period)
        .bind(dto.meeting_days)
        .bind(dto.capacity)
        .execute(db)
        .await?;

        invalidate::schedule(cache, current.school_id.into_inner()).await;
        Self::get_section(db, id, None).await
    }

    #[instrument(skip(db, cache), fields(db.operation = "DELETE", db.table = "sections"))]
    pub async fn delete_section(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: SectionId,
        scope: Option<SchoolId>,
    ) -> Result<(), AppError> {
        let school_id = sqlx::query_scalar::<_, SchoolId>(
            "DELETE FROM sections WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)
             RETURNING school_id",
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Section not found")))?;

        invalidate::schedule(cache, school_id.into_inner()).await;
        info!(section.id = %id, "Section deleted");
        Ok(())
    }

    // Enrollments

    /// Enrolls an active student of the same school. The section row is
    /// locked so two concurrent enrollments cannot both take the last seat.
    #[instrument(skip(db, cache, dto), fields(db.operation = "INSERT", db.table = "enrollments"))]
    pub async fn enroll_student(
        db: &PgPool,
        cache: Option<&RedisCache>,
        section_id: SectionId,
        scope: Option<SchoolId>,
        dto: EnrollStudentDto,
    ) -> Result<Enrollment, AppError> {
        let mut tx = db.begin().await?;

        let section = sqlx::query_as::<_, SectionLock>(
            "SELECT school_id, academic_year_id, period, meeting_days, capacity
             FROM sections
             WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)
             FOR UPDATE",
        )
        .bind(section_id)
        .bind(scope)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Section not found")))?;

        let status = sqlx::query_scalar::<_, StudentStatus>(
            "SELECT status FROM students WHERE id = $1 AND school_id = $2",
        )
        .bind(dto.student_id)
        .bind(section.school_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))?;

        if status != StudentStatus::Active {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Only active students can be enrolled (student is {})",
                status
            )));
        }

        let enrolled = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM enrollments WHERE section_id = $1",
        )
        .bind(section_id)
        .fetch_one(&mut *tx)
        .await?;

        if enrolled >= i64::from(section.capacity) {
            warn!(section.id = %section_id, capacity = section.capacity, "Section is full");
            return Err(AppError::bad_request(anyhow::anyhow!("Section is full")));
        }

        let clash = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM enrollments e
                JOIN sections s ON s.id = e.section_id
                WHERE e.student_id = $1
                  AND s.id <> $2
                  AND s.academic_year_id = $3
                  AND s.period = $4
                  AND (s.meeting_days & $5) <> 0
             )",
        )
        .bind(dto.student_id)
        .bind(section_id)
        .bind(section.academic_year_id)
        .bind(section.period)
        .bind(section.meeting_days)
        .fetch_one(&mut *tx)
        .await?;

        if clash {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Student already has a class in period {} on an overlapping day",
                section.period
            )));
        }

        let enrollment = sqlx::query_as::<_, Enrollment>(
            "INSERT INTO enrollments (section_id, student_id)
             VALUES ($1, $2)
             RETURNING id, section_id, student_id, enrolled_at",
        )
        .bind(section_id)
        .bind(dto.student_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "Student is already enrolled in this section"))?;

        tx.commit().await?;

        invalidate::schedule(cache, section.school_id.into_inner()).await;
        metrics::track_enrollment();
        info!(section.id = %section_id, student.id = %dto.student_id, "Student enrolled");
        Ok(enrollment)
    }

    #[instrument(skip(db, cache), fields(db.operation = "DELETE", db.table = "enrollments"))]
    pub async fn drop_student(
        db: &PgPool,
        cache: Option<&RedisCache>,
        section_id: SectionId,
        student_id: StudentId,
        scope: Option<SchoolId>,
    ) -> Result<(), AppError> {
        let section = Self::get_section(db, section_id, scope).await?;

        let result =
            sqlx::query("DELETE FROM enrollments WHERE section_id = $1 AND student_id = $2")
                .bind(section_id)
                .bind(student_id)
                .execute(db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!(
                "Student is not enrolled in this section"
            )));
        }

        invalidate::schedule(cache, section.school_id.into_inner()).await;
        info!(section.id = %section_id, student.id = %student_id, "Student dropped");
        Ok(())
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "enrollments"))]
    pub async fn get_roster(
        db: &PgPool,
        section_id: SectionId,
        scope: Option<SchoolId>,
    ) -> Result<Vec<RosterEntry>, AppError> {
        Self::get_section(db, section_id, scope).await?;

        let roster = sqlx::query_as::<_, RosterEntry>(
            "SELECT st.id AS student_id, st.student_number, st.first_name, st.last_name,
                    st.grade_level, e.enrolled_at
             FROM enrollments e
             JOIN students st ON st.id = e.student_id
             WHERE e.section_id = $1
             ORDER BY st.last_name, st.first_name",
        )
        .bind(section_id)
        .fetch_all(db)
        .await?;

        Ok(roster)
    }

    // Analysis

    async fn load_snapshot(
        db: &PgPool,
        school_id: SchoolId,
        academic_year_id: AcademicYearId,
    ) -> Result<ScheduleSnapshot, AppError> {
        let year_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM academic_years WHERE id = $1 AND school_id = $2)",
        )
        .bind(academic_year_id)
        .bind(school_id)
        .fetch_one(db)
        .await?;

        if !year_exists {
            return Err(AppError::not_found(anyhow::anyhow!(
                "Academic year not found"
            )));
        }

        let sections = sqlx::query_as::<_, SectionSlot>(
            "SELECT s.id, c.code AS course_code, c.subject, c.required_room_type,
                    s.teacher_id, s.room_id, s.period, s.meeting_days, s.capacity,
                    (SELECT COUNT(*) FROM enrollments e WHERE e.section_id = s.id) AS enrolled_count
             FROM sections s
             JOIN courses c ON c.id = s.course_id
             WHERE s.school_id = $1 AND s.academic_year_id = $2
             ORDER BY c.code, s.period",
        )
        .bind(school_id)
        .bind(academic_year_id)
        .fetch_all(db)
        .await?;

        let teachers = sqlx::query_as::<_, TeacherInfo>(
            "SELECT id, first_name || ' ' || last_name AS name, certifications, max_sections,
                    is_active
             FROM staff
             WHERE school_id = $1 AND role = $2
             ORDER BY last_name, first_name",
        )
        .bind(school_id)
        .bind(StaffRole::Teacher)
        .fetch_all(db)
        .await?;

        let rooms = sqlx::query_as::<_, RoomInfo>(
            "SELECT id, name, room_type, capacity FROM rooms WHERE school_id = $1 ORDER BY name",
        )
        .bind(school_id)
        .fetch_all(db)
        .await?;

        debug!(
            sections = sections.len(),
            teachers = teachers.len(),
            rooms = rooms.len(),
            "Schedule snapshot loaded"
        );

        Ok(ScheduleSnapshot {
            sections,
            teachers,
            rooms,
        })
    }

    async fn cached<T>(cache: Option<&RedisCache>, report: &'static str, key: &str) -> Option<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let cache = cache?;
        let value = cache.get::<T>(key).await;
        metrics::track_cache_lookup(report, value.is_some());
        value
    }

    async fn store<T>(cache: Option<&RedisCache>, key: &str, value: &T)
    where
        T: serde::Serialize,
    {
        if let Some(cache) = cache
            && let Err(e) = cache.set(key, value).await
        {
            warn!(error = %e, key, "Failed to cache schedule report");
        }
    }

    #[instrument(skip(db, cache), fields(db.operation = "SELECT", db.table = "sections"))]
    pub async fn get_conflicts(
        db: &PgPool,
        cache: Option<&RedisCache>,
        school_id: SchoolId,
        academic_year_id: AcademicYearId,
    ) -> Result<ConflictReport, AppError> {
        let key = keys::scheduling::conflicts(school_id.into_inner(), academic_year_id.into_inner());
        if let Some(report) = Self::cached(cache, "schedule_conflicts", &key).await {
            return Ok(report);
        }

        let snapshot = Self::load_snapshot(db, school_id, academic_year_id).await?;
        let report = analysis::conflict_report(academic_year_id, &snapshot);

        Self::store(cache, &key, &report).await;
        info!(
            errors = report.errors,
            warnings = report.warnings,
            "Schedule conflicts analyzed"
        );
        Ok(report)
    }

    #[instrument(skip(db, cache), fields(db.operation = "SELECT", db.table = "sections"))]
    pub async fn get_health(
        db: &PgPool,
        cache: Option<&RedisCache>,
        school_id: SchoolId,
        academic_year_id: AcademicYearId,
    ) -> Result<ScheduleHealth, AppError> {
        let key = keys::scheduling::health(school_id.into_inner(), academic_year_id.into_inner());
        if let Some(health) = Self::cached(cache, "schedule_health", &key).await {
            return Ok(health);
        }

        let snapshot = Self::load_snapshot(db, school_id, academic_year_id).await?;
        let report = analysis::conflict_report(academic_year_id, &snapshot);
        let health = analysis::schedule_health(&report, &snapshot);

        Self::store(cache, &key, &health).await;
        info!(score = health.score, grade = %health.grade, "Schedule health computed");
        Ok(health)
    }

    async fn apply_plan(
        db: &PgPool,
        resource: Resource,
        result: &AutoAssignResult,
    ) -> Result<(), AppError> {
        let query = match resource {
            Resource::Teacher => {
                "UPDATE sections SET teacher_id = $2, updated_at = NOW()
                 WHERE id = $1 AND teacher_id IS NULL"
            }
            Resource::Room => {
                "UPDATE sections SET room_id = $2, updated_at = NOW()
                 WHERE id = $1 AND room_id IS NULL"
            }
        };

        let mut tx = db.begin().await?;
        for planned in &result.plan {
            sqlx::query(query)
                .bind(planned.section_id)
                .bind(planned.resource_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn auto_assign(
        db: &PgPool,
        cache: Option<&RedisCache>,
        school_id: SchoolId,
        academic_year_id: AcademicYearId,
        dry_run: bool,
        resource: Resource,
    ) -> Result<AutoAssignResult, AppError> {
        let snapshot = Self::load_snapshot(db, school_id, academic_year_id).await?;
        let result = match resource {
            Resource::Teacher => assignment::plan_teacher_assignments(&snapshot, dry_run),
            Resource::Room => assignment::plan_room_assignments(&snapshot, dry_run),
        };

        if !dry_run && !result.plan.is_empty() {
            Self::apply_plan(db, resource, &result).await?;
            invalidate::schedule(cache, school_id.into_inner()).await;
        }

        metrics::track_auto_assign(resource.as_str(), result.assigned, dry_run);
        info!(
            resource = resource.as_str(),
            assigned = result.assigned,
            unassigned = result.unassigned,
            dry_run,
            "Auto-assignment finished"
        );
        Ok(result)
    }

    #[instrument(skip(db, cache), fields(db.operation = "UPDATE", db.table = "sections"))]
    pub async fn assign_teachers(
        db: &PgPool,
        cache: Option<&RedisCache>,
        school_id: SchoolId,
        academic_year_id: AcademicYearId,
        dry_run: bool,
    ) -> Result<AutoAssignResult, AppError> {
        Self::auto_assign(db, cache, school_id, academic_year_id, dry_run, Resource::Teacher).await
    }

    #[instrument(skip(db, cache), fields(db.operation = "UPDATE", db.table = "sections"))]
    pub async fn assign_rooms(
        db: &PgPool,
        cache: Option<&RedisCache>,
        school_id: SchoolId,
        academic_year_id: AcademicYearId,
        dry_run: bool,
    ) -> Result<AutoAssignResult, AppError> {
        Self::auto_assign(db, cache, school_id, academic_year_id, dry_run, Resource::Room).await
    }
}
