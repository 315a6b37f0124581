use schoolhouse_core::{AppError, Paginated, PaginationParams};
use schoolhouse_models::ids::{AcademicYearId, SchoolId};
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};

use super::model::{
    AcademicYear, AcademicYearFilterParams, AcademicYearWithStats, CreateAcademicYearDto,
    UpdateAcademicYearDto, validate_date_range,
};

const YEAR_COLUMNS: &str = "id, school_id, name, start_date, end_date, is_current, created_at, updated_at";

const YEAR_WITH_STATS: &str = "SELECT y.id, y.school_id, y.name, y.start_date, y.end_date,
        y.is_current, y.created_at, y.updated_at,
        (SELECT COUNT(*) FROM sections s WHERE s.academic_year_id = y.id) AS section_count
     FROM academic_years y";

fn map_write_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::bad_request(anyhow::anyhow!(
                "An academic year with this name already exists"
            ));
        }
        if db_err.is_check_violation() {
            return AppError::bad_request(anyhow::anyhow!("Start date must be before end date"));
        }
    }
    error!(error = %e, "Database error writing academic year");
    AppError::from(e)
}

pub struct AcademicYearService;

impl AcademicYearService {
    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "academic_years"))]
    pub async fn create_academic_year(
        db: &PgPool,
        school_id: SchoolId,
        dto: CreateAcademicYearDto,
    ) -> Result<AcademicYear, AppError> {
        validate_date_range(dto.start_date, dto.end_date)
            .map_err(|e| AppError::bad_request(anyhow::anyhow!(e)))?;

        let query = format!(
            "INSERT INTO academic_years (school_id, name, start_date, end_date)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            YEAR_COLUMNS
        );
        let year = sqlx::query_as::<_, AcademicYear>(&query)
            .bind(school_id)
            .bind(&dto.name)
            .bind(dto.start_date)
            .bind(dto.end_date)
            .fetch_one(db)
            .await
            .map_err(map_write_error)?;

        info!(academic_year.id = %year.id, "Academic year created");
        Ok(year)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "academic_years"))]
    pub async fn get_academic_years(
        db: &PgPool,
        school_id: SchoolId,
        filters: AcademicYearFilterParams,
        pagination: PaginationParams,
    ) -> Result<Paginated<AcademicYearWithStats>, AppError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM academic_years
             WHERE school_id = $1 AND ($2::boolean IS NULL OR is_current = $2)",
        )
        .bind(school_id)
        .bind(filters.is_current)
        .fetch_one(db)
        .await?;

        let query = format!(
            "{} WHERE y.school_id = $1 AND ($2::boolean IS NULL OR y.is_current = $2)
             ORDER BY y.start_date DESC LIMIT $3 OFFSET $4",
            YEAR_WITH_STATS
        );
        let years = sqlx::query_as::<_, AcademicYearWithStats>(&query)
            .bind(school_id)
            .bind(filters.is_current)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        debug!(total, returned = years.len(), "Academic years fetched");
        Ok(Paginated::new(years, total, &pagination))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "academic_years"))]
    pub async fn get_academic_year(
        db: &PgPool,
        id: AcademicYearId,
        scope: Option<SchoolId>,
    ) -> Result<AcademicYearWithStats, AppError> {
        let query = format!(
            "{} WHERE y.id = $1 AND ($2::uuid IS NULL OR y.school_id = $2)",
            YEAR_WITH_STATS
        );
        sqlx::query_as::<_, AcademicYearWithStats>(&query)
            .bind(id)
            .bind(scope)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Academic year not found")))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "academic_years"))]
    pub async fn get_current_academic_year(
        db: &PgPool,
        school_id: SchoolId,
    ) -> Result<AcademicYearWithStats, AppError> {
        let query = format!("{} WHERE y.school_id = $1 AND y.is_current", YEAR_WITH_STATS);
        sqlx::query_as::<_, AcademicYearWithStats>(&query)
            .bind(school_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("No current academic year")))
    }

    /// Dates are re-validated against the stored values when only one side
    /// changes.
    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "academic_years"))]
    pub async fn update_academic_year(
        db: &PgPool,
        id: AcademicYearId,
        scope: Option<SchoolId>,
        dto: UpdateAcademicYearDto,
    ) -> Result<AcademicYear, AppError> {
        let existing = Self::get_academic_year(db, id, scope).await?;

        let start = dto.start_date.unwrap_or(existing.start_date);
        let end = dto.end_date.unwrap_or(existing.end_date);
        validate_date_range(start, end).map_err(|e| AppError::bad_request(anyhow::anyhow!(e)))?;

        let query = format!(
            "UPDATE academic_years SET
                name = COALESCE($2, name),
                start_date = $3,
                end_date = $4,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            YEAR_COLUMNS
        );
        let year = sqlx::query_as::<_, AcademicYear>(&query)
            .bind(id)
            .bind(&dto.name)
            .bind(start)
            .bind(end)
            .fetch_one(db)
            .await
            .map_err(map_write_error)?;

        info!(academic_year.id = %id, "Academic year updated");
        Ok(year)
    }

    /// Years with scheduled sections cannot be deleted.
    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "academic_years"))]
    pub async fn delete_academic_year(
        db: &PgPool,
        id: AcademicYearId,
        scope: Option<SchoolId>,
    ) -> Result<(), AppError> {
        let existing = Self::get_academic_year(db, id, scope).await?;

        if existing.section_count > 0 {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Cannot delete an academic year with {} scheduled sections",
                existing.section_count
            )));
        }

        sqlx::query("DELETE FROM academic_years WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        info!(academic_year.id = %id, "Academic year deleted");
        Ok(())
    }

    /// Makes the year current and clears the flag on the school's other
    /// years in one transaction.
    #[instrument(skip(db), fields(db.operation = "UPDATE", db.table = "academic_years"))]
    pub async fn activate_academic_year(
        db: &PgPool,
        id: AcademicYearId,
        scope: Option<SchoolId>,
    ) -> Result<AcademicYear, AppError> {
        let mut tx = db.begin().await?;

        let school_id = sqlx::query_scalar::<_, SchoolId>(
            "SELECT school_id FROM academic_years
             WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)
             FOR UPDATE",
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Academic year not found")))?;

        sqlx::query(
            "UPDATE academic_years SET is_current = FALSE, updated_at = NOW()
             WHERE school_id = $1 AND is_current AND id <> $2",
        )
        .bind(school_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let query = format!(
            "UPDATE academic_years SET is_current = TRUE, updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            YEAR_COLUMNS
        );
        let year = sqlx::query_as::<_, AcademicYear>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(academic_year.id = %id, school.id = %school_id, "Academic year activated");
        Ok(year)
    }
}
