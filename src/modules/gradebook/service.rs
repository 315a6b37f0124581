use schoolhouse_core::AppError;
use schoolhouse_models::first_duplicate;
use schoolhouse_models::ids::{AssignmentId, GradeCategoryId, SchoolId, SectionId, StudentId};
use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};

use super::model::{
    Assignment, BulkScoresDto, CategoryWeight, CreateAssignmentDto, CreateGradeCategoryDto,
    GradeCategory, Score, ScoredWork, SectionGradeReport, StudentGrade, UpdateAssignmentDto,
    UpdateGradeCategoryDto, class_average, compute_grade, validate_score,
};

const CATEGORY_COLUMNS: &str = "c.id, c.section_id, c.name, c.weight, c.created_at, c.updated_at";

const ASSIGNMENT_COLUMNS: &str = "a.id, a.section_id, a.category_id, a.title, a.max_points, \
     a.due_date, a.created_at, a.updated_at";

const SCORE_COLUMNS: &str =
    "id, assignment_id, student_id, points, excused, comment, created_at, updated_at";

fn map_write_error(e: sqlx::Error, duplicate: &'static str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::bad_request(anyhow::anyhow!(duplicate));
    }
    error!(error = %e, "Database error writing gradebook data");
    AppError::from(e)
}

pub struct GradebookService;

impl GradebookService {
    /// Resolves a section inside the caller's scope.
    async fn section_school(
        db: &PgPool,
        section_id: SectionId,
        scope: Option<SchoolId>,
    ) -> Result<SchoolId, AppError> {
        sqlx::query_scalar::<_, SchoolId>(
            "SELECT school_id FROM sections WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)",
        )
        .bind(section_id)
        .bind(scope)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Section not found")))
    }

    // Categories

    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "grade_categories"))]
    pub async fn create_category(
        db: &PgPool,
        section_id: SectionId,
        scope: Option<SchoolId>,
        dto: CreateGradeCategoryDto,
    ) -> Result<GradeCategory, AppError> {
        Self::section_school(db, section_id, scope).await?;

        let category = sqlx::query_as::<_, GradeCategory>(
            "INSERT INTO grade_categories (section_id, name, weight)
             VALUES ($1, $2, $3)
             RETURNING id, section_id, name, weight, created_at, updated_at",
        )
        .bind(section_id)
        .bind(&dto.name)
        .bind(dto.weight)
        .fetch_one(db)
        .await
        .map_err(|e| map_write_error(e, "Category name already exists in this section"))?;

        info!(category.id = %category.id, section.id = %section_id, "Grade category created");
        Ok(category)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "grade_categories"))]
    pub async fn get_categories(
        db: &PgPool,
        section_id: SectionId,
        scope: Option<SchoolId>,
    ) -> Result<Vec<GradeCategory>, AppError> {
        Self::section_school(db, section_id, scope).await?;

        let query = format!(
            "SELECT {} FROM grade_categories c WHERE c.section_id = $1 ORDER BY c.name",
            CATEGORY_COLUMNS
        );
        let categories = sqlx::query_as::<_, GradeCategory>(&query)
            .bind(section_id)
            .fetch_all(db)
            .await?;
        Ok(categories)
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "grade_categories"))]
    pub async fn update_category(
        db: &PgPool,
        id: GradeCategoryId,
        scope: Option<SchoolId>,
        dto: UpdateGradeCategoryDto,
    ) -> Result<GradeCategory, AppError> {
        let query = format!(
            "UPDATE grade_categories c SET
                name = COALESCE($3, c.name),
                weight = COALESCE($4, c.weight),
                updated_at = NOW()
             FROM sections s
             WHERE c.id = $1 AND s.id = c.section_id
               AND ($2::uuid IS NULL OR s.school_id = $2)
             RETURNING {}",
            CATEGORY_COLUMNS
        );
        sqlx::query_as::<_, GradeCategory>(&query)
            .bind(id)
            .bind(scope)
            .bind(&dto.name)
            .bind(dto.weight)
            .fetch_optional(db)
            .await
            .map_err(|e| map_write_error(e, "Category name already exists in this section"))?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Grade category not found")))
    }

    /// Removes the category with its assignments and their scores.
    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "grade_categories"))]
    pub async fn delete_category(
        db: &PgPool,
        id: GradeCategoryId,
        scope: Option<SchoolId>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM grade_categories c USING sections s
             WHERE c.id = $1 AND s.id = c.section_id
               AND ($2::uuid IS NULL OR s.school_id = $2)",
        )
        .bind(id)
        .bind(scope)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!(
                "Grade category not found"
            )));
        }

        info!(category.id = %id, "Grade category deleted");
        Ok(())
    }

    // Assignments

    async fn ensure_category_in_section(
        db: &PgPool,
        category_id: GradeCategoryId,
        section_id: SectionId,
    ) -> Result<(), AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM grade_categories WHERE id = $1 AND section_id = $2)",
        )
        .bind(category_id)
        .bind(section_id)
        .fetch_one(db)
        .await?;

        if !exists {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Grade category does not belong to this section"
            )));
        }
        Ok(())
    }

    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "assignments"))]
    pub async fn create_assignment(
        db: &PgPool,
        section_id: SectionId,
        scope: Option<SchoolId>,
        dto: CreateAssignmentDto,
    ) -> Result<Assignment, AppError> {
        Self::section_school(db, section_id, scope).await?;
        Self::ensure_category_in_section(db, dto.category_id, section_id).await?;

        let assignment = sqlx::query_as::<_, Assignment>(
            "INSERT INTO assignments (section_id, category_id, title, max_points, due_date)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, section_id, category_id, title, max_points, due_date,
                       created_at, updated_at",
        )
        .bind(section_id)
        .bind(dto.category_id)
        .bind(&dto.title)
        .bind(dto.max_points)
        .bind(dto.due_date)
        .fetch_one(db)
        .await?;

        info!(assignment.id = %assignment.id, section.id = %section_id, "Assignment created");
        Ok(assignment)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "assignments"))]
    pub async fn get_assignments(
        db: &PgPool,
        section_id: SectionId,
        scope: Option<SchoolId>,
    ) -> Result<Vec<Assignment>, AppError> {
        Self::section_school(db, section_id, scope).await?;

        let query = format!(
            "SELECT {} FROM assignments a
             WHERE a.section_id = $1
             ORDER BY a.due_date NULLS LAST, a.created_at",
            ASSIGNMENT_COLUMNS
        );
        let assignments = sqlx::query_as::<_, Assignment>(&query)
            .bind(section_id)
            .fetch_all(db)
            .await?;
        Ok(assignments)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "assignments"))]
    pub async fn get_assignment(
        db: &PgPool,
        id: AssignmentId,
        scope: Option<SchoolId>,
    ) -> Result<Assignment, AppError> {
        let query = format!(
            "SELECT {} FROM assignments a
             JOIN sections s ON s.id = a.section_id
             WHERE a.id = $1 AND ($2::uuid IS NULL OR s.school_id = $2)",
            ASSIGNMENT_COLUMNS
        );
        sqlx::query_as::<_, Assignment>(&query)
            .bind(id)
            .bind(scope)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Assignment not found")))
    }

    /// Lowering `max_points` below an existing score is rejected.
    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "assignments"))]
    pub async fn update_assignment(
        db: &PgPool,
        id: AssignmentId,
        scope: Option<SchoolId>,
        dto: UpdateAssignmentDto,
    ) -> Result<Assignment, AppError> {
        let current = Self::get_assignment(db, id, scope).await?;

        if let Some(category_id) = dto.category_id {
            Self::ensure_category_in_section(db, category_id, current.section_id).await?;
        }
        if let Some(max_points) = dto.max_points {
            let highest = sqlx::query_scalar::<_, Option<f64>>(
                "SELECT MAX(points) FROM scores WHERE assignment_id = $1",
            )
            .bind(id)
            .fetch_one(db)
            .await?;
            if let Some(highest) = highest
                && highest > max_points
            {
                return Err(AppError::bad_request(anyhow::anyhow!(
                    "max_points cannot be below the highest recorded score ({})",
                    highest
                )));
            }
        }

        let query = format!(
            "UPDATE assignments a SET
                category_id = COALESCE($2, a.category_id),
                title = COALESCE($3, a.title),
                max_points = COALESCE($4, a.max_points),
                due_date = COALESCE($5, a.due_date),
                updated_at = NOW()
             WHERE a.id = $1
             RETURNING {}",
            ASSIGNMENT_COLUMNS
        );
        let assignment = sqlx::query_as::<_, Assignment>(&query)
            .bind(id)
            .bind(dto.category_id)
            .bind(&dto.title)
            .bind(dto.max_points)
            .bind(dto.due_date)
            .fetch_one(db)
            .await?;

        Ok(assignment)
    }

    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "assignments"))]
    pub async fn delete_assignment(
        db: &PgPool,
        id: AssignmentId,
        scope: Option<SchoolId>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM assignments a USING sections s
             WHERE a.id = $1 AND s.id = a.section_id
               AND ($2::uuid IS NULL OR s.school_id = $2)",
        )
        .bind(id)
        .bind(scope)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Assignment not found")));
        }

        info!(assignment.id = %id, "Assignment deleted");
        Ok(())
    }

    // Scores

    /// Upserts every entry in one transaction. Each student must be enrolled
    /// in the assignment's section and points must fit `0..=max_points`.
    #[instrument(skip(db, dto), fields(db.operation = "UPSERT", db.table = "scores"))]
    pub async fn record_scores(
        db: &PgPool,
        assignment_id: AssignmentId,
        scope: Option<SchoolId>,
        dto: BulkScoresDto,
    ) -> Result<Vec<Score>, AppError> {
        let assignment = Self::get_assignment(db, assignment_id, scope).await?;

        for entry in &dto.scores {
            validate_score(entry, assignment.max_points)
                .map_err(|msg| AppError::bad_request(anyhow::anyhow!(msg)))?;
        }

        let student_ids: Vec<StudentId> = dto.scores.iter().map(|s| s.student_id).collect();
        if let Some(repeated) = first_duplicate(student_ids.iter().copied()) {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Student {} has more than one score in this request",
                repeated
            )));
        }

        let enrolled = sqlx::query_scalar::<_, StudentId>(
            "SELECT student_id FROM enrollments WHERE section_id = $1 AND student_id = ANY($2)",
        )
        .bind(assignment.section_id)
        .bind(&student_ids)
        .fetch_all(db)
        .await?;

        if let Some(missing) = student_ids.iter().find(|id| !enrolled.contains(id)) {
            warn!(student.id = %missing, "Score for student outside the section");
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Student {} is not enrolled in this section",
                missing
            )));
        }

        let query = format!(
            "INSERT INTO scores (assignment_id, student_id, points, excused, comment)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (assignment_id, student_id) DO UPDATE SET
                points = EXCLUDED.points,
                excused = EXCLUDED.excused,
                comment = EXCLUDED.comment,
                updated_at = NOW()
             RETURNING {}",
            SCORE_COLUMNS
        );

        let mut tx = db.begin().await?;
        let mut scores = Vec::with_capacity(dto.scores.len());
        for entry in &dto.scores {
            let points = if entry.excused { None } else { entry.points };
            let score = sqlx::query_as::<_, Score>(&query)
                .bind(assignment_id)
                .bind(entry.student_id)
                .bind(points)
                .bind(entry.excused)
                .bind(&entry.comment)
                .fetch_one(&mut *tx)
                .await?;
            scores.push(score);
        }
        tx.commit().await?;

        info!(assignment.id = %assignment_id, count = scores.len(), "Scores recorded");
        Ok(scores)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "scores"))]
    pub async fn get_scores(
        db: &PgPool,
        assignment_id: AssignmentId,
        scope: Option<SchoolId>,
    ) -> Result<Vec<Score>, AppError> {
        Self::get_assignment(db, assignment_id, scope).await?;

        let query = format!(
            "SELECT {} FROM scores WHERE assignment_id = $1 ORDER BY created_at",
            SCORE_COLUMNS
        );
        let scores = sqlx::query_as::<_, Score>(&query)
            .bind(assignment_id)
            .fetch_all(db)
            .await?;
        Ok(scores)
    }

    // Grades

    async fn grade_inputs(
        db: &PgPool,
        section_id: SectionId,
        student_id: Option<StudentId>,
    ) -> Result<(Vec<CategoryWeight>, Vec<ScoredWork>), AppError> {
        let categories = sqlx::query_as::<_, CategoryWeight>(
            "SELECT id AS category_id, name, weight FROM grade_categories
             WHERE section_id = $1 ORDER BY name",
        )
        .bind(section_id)
        .fetch_all(db)
        .await?;

        let work = sqlx::query_as::<_, ScoredWork>(
            "SELECT sc.student_id, a.category_id, sc.points, a.max_points, sc.excused
             FROM scores sc
             JOIN assignments a ON a.id = sc.assignment_id
             WHERE a.section_id = $1 AND ($2::uuid IS NULL OR sc.student_id = $2)",
        )
        .bind(section_id)
        .bind(student_id)
        .fetch_all(db)
        .await?;

        debug!(categories = categories.len(), scores = work.len(), "Grade inputs loaded");
        Ok((categories, work))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "scores"))]
    pub async fn get_student_grade(
        db: &PgPool,
        section_id: SectionId,
        student_id: StudentId,
        scope: Option<SchoolId>,
    ) -> Result<StudentGrade, AppError> {
        Self::section_school(db, section_id, scope).await?;

        let enrolled = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE section_id = $1 AND student_id = $2)",
        )
        .bind(section_id)
        .bind(student_id)
        .fetch_one(db)
        .await?;

        if !enrolled {
            return Err(AppError::not_found(anyhow::anyhow!(
                "Student is not enrolled in this section"
            )));
        }

        let (categories, work) = Self::grade_inputs(db, section_id, Some(student_id)).await?;
        Ok(compute_grade(student_id, &categories, &work))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "scores"))]
    pub async fn get_section_report(
        db: &PgPool,
        section_id: SectionId,
        scope: Option<SchoolId>,
    ) -> Result<SectionGradeReport, AppError> {
        Self::section_school(db, section_id, scope).await?;

        let students = sqlx::query_scalar::<_, StudentId>(
            "SELECT e.student_id FROM enrollments e
             JOIN students st ON st.id = e.student_id
             WHERE e.section_id = $1
             ORDER BY st.last_name, st.first_name",
        )
        .bind(section_id)
        .fetch_all(db)
        .await?;

        let (categories, work) = Self::grade_inputs(db, section_id, None).await?;
        let grades: Vec<StudentGrade> = students
            .into_iter()
            .map(|student_id| compute_grade(student_id, &categories, &work))
            .collect();

        Ok(SectionGradeReport {
            section_id,
            class_average: class_average(&grades),
            students: grades,
        })
    }
}
