use schoolhouse_cache::{RedisCache, invalidate};
use schoolhouse_core::{AppError, Paginated, PaginationParams};
use schoolhouse_models::ids::{SchoolId, StudentId};
use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};

use crate::metrics;

use super::model::{
    CreateStudentDto, FINAL_GRADE, PromotionResult, Student, StudentFilterParams, StudentStatus,
    UpdateStudentDto,
};

pub(crate) const STUDENT_COLUMNS: &str = "id, school_id, student_number, first_name, last_name, \
     date_of_birth, grade_level, status, created_at, updated_at";

fn map_write_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::bad_request(anyhow::anyhow!(
            "Student number already exists in this school"
        ));
    }
    error!(error = %e, "Database error writing student");
    AppError::from(e)
}

/// Rosters feed both the compliance report and the schedule analysis.
async fn invalidate_reports(cache: Option<&RedisCache>, school_id: SchoolId) {
    invalidate::compliance(cache, school_id.into_inner()).await;
    invalidate::schedule(cache, school_id.into_inner()).await;
}

pub struct StudentService;

impl StudentService {
    #[instrument(skip(db, cache, dto), fields(db.operation = "INSERT", db.table = "students"))]
    pub async fn create_student(
        db: &PgPool,
        cache: Option<&RedisCache>,
        school_id: SchoolId,
        dto: CreateStudentDto,
    ) -> Result<Student, AppError> {
        let query = format!(
            "INSERT INTO students (school_id, student_number, first_name, last_name,
                                   date_of_birth, grade_level)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            STUDENT_COLUMNS
        );
        let student = sqlx::query_as::<_, Student>(&query)
            .bind(school_id)
            .bind(&dto.student_number)
            .bind(&dto.first_name)
            .bind(&dto.last_name)
            .bind(dto.date_of_birth)
            .bind(dto.grade_level)
            .fetch_one(db)
            .await
            .map_err(map_write_error)?;

        invalidate_reports(cache, school_id).await;
        info!(student.id = %student.id, school.id = %school_id, "Student created");
        Ok(student)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "students"))]
    pub async fn get_students(
        db: &PgPool,
        school_id: SchoolId,
        filters: StudentFilterParams,
        pagination: PaginationParams,
    ) -> Result<Paginated<Student>, AppError> {
        let search = filters.search.map(|s| format!("%{}%", s));
        let where_clause = "school_id = $1
            AND ($2::int IS NULL OR grade_level = $2)
            AND ($3::text IS NULL OR status = $3)
            AND ($4::text IS NULL OR first_name ILIKE $4 OR last_name ILIKE $4
                 OR student_number ILIKE $4)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM students WHERE {}",
            where_clause
        ))
        .bind(school_id)
        .bind(filters.grade_level)
        .bind(filters.status)
        .bind(&search)
        .fetch_one(db)
        .await?;

        let query = format!(
            "SELECT {} FROM students WHERE {}
             ORDER BY last_name, first_name LIMIT $5 OFFSET $6",
            STUDENT_COLUMNS, where_clause
        );
        let students = sqlx::query_as::<_, Student>(&query)
            .bind(school_id)
            .bind(filters.grade_level)
            .bind(filters.status)
            .bind(&search)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        debug!(total, returned = students.len(), "Students fetched");
        Ok(Paginated::new(students, total, &pagination))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "students"))]
    pub async fn get_student(
        db: &PgPool,
        id: StudentId,
        scope: Option<SchoolId>,
    ) -> Result<Student, AppError> {
        let query = format!(
            "SELECT {} FROM students WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)",
            STUDENT_COLUMNS
        );
        sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .bind(scope)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))
    }

    #[instrument(skip(db, cache, dto), fields(db.operation = "UPDATE", db.table = "students"))]
    pub async fn update_student(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: StudentId,
        scope: Option<SchoolId>,
        dto: UpdateStudentDto,
    ) -> Result<Student, AppError> {
        let query = format!(
            "UPDATE students SET
                student_number = COALESCE($3, student_number),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                date_of_birth = COALESCE($6, date_of_birth),
                grade_level = COALESCE($7, grade_level),
                updated_at = NOW()
             WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)
             RETURNING {}",
            STUDENT_COLUMNS
        );
        let student = sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .bind(scope)
            .bind(&dto.student_number)
            .bind(&dto.first_name)
            .bind(&dto.last_name)
            .bind(dto.date_of_birth)
            .bind(dto.grade_level)
            .fetch_optional(db)
            .await
            .map_err(map_write_error)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))?;

        invalidate_reports(cache, student.school_id).await;
        Ok(student)
    }

    /// The update only applies while the status is still the one the
    /// transition was checked against.
    #[instrument(skip(db, cache), fields(db.operation = "UPDATE", db.table = "students"))]
    pub async fn change_status(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: StudentId,
        scope: Option<SchoolId>,
        next: StudentStatus,
    ) -> Result<Student, AppError> {
        let student = Self::get_student(db, id, scope).await?;

        if !student.status.can_transition_to(next) {
            warn!(from = %student.status, to = %next, "Rejected student status change");
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Cannot change student status from {} to {}",
                student.status,
                next
            )));
        }

        let query = format!(
            "UPDATE students SET status = $2, updated_at = NOW()
             WHERE id = $1 AND status = $3
             RETURNING {}",
            STUDENT_COLUMNS
        );
        let Some(updated) = sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .bind(next)
            .bind(student.status)
            .fetch_optional(db)
            .await?
        else {
            warn!(student.id = %id, "Student status changed concurrently");
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Student status was changed by another request, reload and retry"
            )));
        };

        invalidate_reports(cache, updated.school_id).await;
        info!(student.id = %id, status = %next, "Student status changed");
        Ok(updated)
    }

    #[instrument(skip(db, cache), fields(db.operation = "DELETE", db.table = "students"))]
    pub async fn delete_student(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: StudentId,
        scope: Option<SchoolId>,
    ) -> Result<(), AppError> {
        let school_id = sqlx::query_scalar::<_, SchoolId>(
            "DELETE FROM students WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)
             RETURNING school_id",
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))?;

        invalidate_reports(cache, school_id).await;
        info!(student.id = %id, "Student deleted");
        Ok(())
    }

    /// Moves every active student up one grade; students already in the
    /// final grade graduate instead. Both updates share one transaction.
    #[instrument(skip(db, cache), fields(db.operation = "UPDATE", db.table = "students"))]
    pub async fn promote_students(
        db: &PgPool,
        cache: Option<&RedisCache>,
        school_id: SchoolId,
    ) -> Result<PromotionResult, AppError> {
        let mut tx = db.begin().await?;

        let graduated = sqlx::query(
            "UPDATE students SET status = $2, updated_at = NOW()
             WHERE school_id = $1 AND status = $3 AND grade_level >= $4",
        )
        .bind(school_id)
        .bind(StudentStatus::Graduated)
        .bind(StudentStatus::Active)
        .bind(FINAL_GRADE)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let promoted = sqlx::query(
            "UPDATE students SET grade_level = grade_level + 1, updated_at = NOW()
             WHERE school_id = $1 AND status = $2 AND grade_level < $3",
        )
        .bind(school_id)
        .bind(StudentStatus::Active)
        .bind(FINAL_GRADE)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        invalidate_reports(cache, school_id).await;
        metrics::track_students_promoted(promoted, graduated);
        info!(school.id = %school_id, promoted, graduated, "Students promoted");

        Ok(PromotionResult {
            promoted,
            graduated,
        })
    }
}
