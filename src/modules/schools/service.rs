use schoolhouse_core::{AppError, Paginated, PaginationParams};
use schoolhouse_models::ids::SchoolId;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};

use crate::metrics;

use super::model::{CreateSchoolDto, School, SchoolFilterParams, UpdateSchoolDto};

const SCHOOL_COLUMNS: &str = "id, name, address, phone, email, created_at, updated_at";

fn map_unique_violation(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::bad_request(anyhow::anyhow!("School name already exists"));
    }
    error!(error = %e, "Database error writing school");
    AppError::from(e)
}

pub struct SchoolService;

impl SchoolService {
    #[instrument(skip(db, dto), fields(school.name = %dto.name, db.operation = "INSERT", db.table = "schools"))]
    pub async fn create_school(db: &PgPool, dto: CreateSchoolDto) -> Result<School, AppError> {
        let query = format!(
            "INSERT INTO schools (name, address, phone, email) VALUES ($1, $2, $3, $4)
             RETURNING {}",
            SCHOOL_COLUMNS
        );
        let school = sqlx::query_as::<_, School>(&query)
            .bind(&dto.name)
            .bind(&dto.address)
            .bind(&dto.phone)
            .bind(&dto.email)
            .fetch_one(db)
            .await
            .map_err(map_unique_violation)?;

        metrics::track_school_created();
        info!(school.id = %school.id, "School created");

        Ok(school)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "schools"))]
    pub async fn get_schools(
        db: &PgPool,
        filters: SchoolFilterParams,
        pagination: PaginationParams,
    ) -> Result<Paginated<School>, AppError> {
        let search = filters.search.map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM schools WHERE ($1::text IS NULL OR name ILIKE $1)",
        )
        .bind(&search)
        .fetch_one(db)
        .await?;

        let query = format!(
            "SELECT {} FROM schools WHERE ($1::text IS NULL OR name ILIKE $1)
             ORDER BY name LIMIT $2 OFFSET $3",
            SCHOOL_COLUMNS
        );
        let schools = sqlx::query_as::<_, School>(&query)
            .bind(&search)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        debug!(total, returned = schools.len(), "Schools fetched");
        Ok(Paginated::new(schools, total, &pagination))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "schools"))]
    pub async fn get_school(db: &PgPool, id: SchoolId) -> Result<School, AppError> {
        let query = format!("SELECT {} FROM schools WHERE id = $1", SCHOOL_COLUMNS);
        sqlx::query_as::<_, School>(&query)
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("School not found")))
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "schools"))]
    pub async fn update_school(
        db: &PgPool,
        id: SchoolId,
        dto: UpdateSchoolDto,
    ) -> Result<School, AppError> {
        let query = format!(
            "UPDATE schools SET
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            SCHOOL_COLUMNS
        );
        sqlx::query_as::<_, School>(&query)
            .bind(id)
            .bind(&dto.name)
            .bind(&dto.address)
            .bind(&dto.phone)
            .bind(&dto.email)
            .fetch_optional(db)
            .await
            .map_err(map_unique_violation)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("School not found")))
    }

    /// Cascades to every record owned by the school.
    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "schools"))]
    pub async fn delete_school(db: &PgPool, id: SchoolId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM schools WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("School not found")));
        }

        warn!(school.id = %id, "School deleted");
        Ok(())
    }
}
