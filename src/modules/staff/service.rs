use schoolhouse_cache::{RedisCache, invalidate};
use schoolhouse_core::{AppError, Paginated, PaginationParams, hash_password};
use schoolhouse_models::ids::{SchoolId, StaffId};
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};

use crate::metrics;
use crate::modules::auth::service::STAFF_COLUMNS;

use super::model::{CreateStaffDto, Staff, StaffFilterParams, StaffRole, UpdateStaffDto};

fn map_write_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::bad_request(anyhow::anyhow!("Email already exists"));
    }
    error!(error = %e, "Database error writing staff");
    AppError::from(e)
}

fn reject_system_admin(role: StaffRole) -> Result<(), AppError> {
    if role.is_system_admin() {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "System admins can only be created from the CLI"
        )));
    }
    Ok(())
}

pub struct StaffService;

impl StaffService {
    #[instrument(skip(db, cache, dto), fields(staff.role = %dto.role, db.operation = "INSERT", db.table = "staff"))]
    pub async fn create_staff(
        db: &PgPool,
        cache: Option<&RedisCache>,
        school_id: SchoolId,
        dto: CreateStaffDto,
    ) -> Result<Staff, AppError> {
        reject_system_admin(dto.role)?;

        let password = hash_password(&dto.password)?;
        let query = format!(
            "INSERT INTO staff (school_id, first_name, last_name, email, password, role,
                                certifications, max_sections)
             VALUES ($1, $2, $3, LOWER($4), $5, $6, $7, $8)
             RETURNING {}",
            STAFF_COLUMNS
        );

        let staff = sqlx::query_as::<_, Staff>(&query)
            .bind(school_id)
            .bind(&dto.first_name)
            .bind(&dto.last_name)
            .bind(&dto.email)
            .bind(&password)
            .bind(dto.role)
            .bind(dto.certifications.unwrap_or_default())
            .bind(dto.max_sections.unwrap_or(5))
            .fetch_one(db)
            .await
            .map_err(map_write_error)?;

        metrics::track_staff_created(staff.role.as_str());
        invalidate::schedule(cache, school_id.into_inner()).await;
        info!(staff.id = %staff.id, school.id = %school_id, "Staff member created");

        Ok(staff)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "staff"))]
    pub async fn get_staff_list(
        db: &PgPool,
        school_id: SchoolId,
        filters: StaffFilterParams,
        pagination: PaginationParams,
    ) -> Result<Paginated<Staff>, AppError> {
        let search = filters.search.map(|s| format!("%{}%", s));
        let where_clause = "school_id = $1
            AND ($2::text IS NULL OR role = $2)
            AND ($3::boolean IS NULL OR is_active = $3)
            AND ($4::text IS NULL OR first_name ILIKE $4 OR last_name ILIKE $4 OR email ILIKE $4)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM staff WHERE {}",
            where_clause
        ))
        .bind(school_id)
        .bind(filters.role)
        .bind(filters.is_active)
        .bind(&search)
        .fetch_one(db)
        .await?;

        let query = format!(
            "SELECT {} FROM staff WHERE {}
             ORDER BY last_name, first_name LIMIT $5 OFFSET $6",
            STAFF_COLUMNS, where_clause
        );
        let staff = sqlx::query_as::<_, Staff>(&query)
            .bind(school_id)
            .bind(filters.role)
            .bind(filters.is_active)
            .bind(&search)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        debug!(total, returned = staff.len(), "Staff fetched");
        Ok(Paginated::new(staff, total, &pagination))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "staff"))]
    pub async fn get_staff(
        db: &PgPool,
        id: StaffId,
        scope: Option<SchoolId>,
    ) -> Result<Staff, AppError> {
        let query = format!(
            "SELECT {} FROM staff WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)",
            STAFF_COLUMNS
        );
        sqlx::query_as::<_, Staff>(&query)
            .bind(id)
            .bind(scope)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Staff member not found")))
    }

    #[instrument(skip(db, cache, dto), fields(db.operation = "UPDATE", db.table = "staff"))]
    pub async fn update_staff(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: StaffId,
        scope: Option<SchoolId>,
        dto: UpdateStaffDto,
    ) -> Result<Staff, AppError> {
        if let Some(role) = dto.role {
            reject_system_admin(role)?;
        }

        let existing = Self::get_staff(db, id, scope).await?;
        if existing.role.is_system_admin() {
            return Err(AppError::forbidden("System admins cannot be modified here"));
        }

        let password = dto.password.as_deref().map(hash_password).transpose()?;

        let query = format!(
            "UPDATE staff SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE(LOWER($4), email),
                password = COALESCE($5, password),
                role = COALESCE($6, role),
                certifications = COALESCE($7, certifications),
                max_sections = COALESCE($8, max_sections),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            STAFF_COLUMNS
        );
        let staff = sqlx::query_as::<_, Staff>(&query)
            .bind(id)
            .bind(&dto.first_name)
            .bind(&dto.last_name)
            .bind(&dto.email)
            .bind(&password)
            .bind(dto.role)
            .bind(&dto.certifications)
            .bind(dto.max_sections)
            .fetch_one(db)
            .await
            .map_err(map_write_error)?;

        if let Some(school_id) = staff.school_id {
            invalidate::schedule(cache, school_id.into_inner()).await;
        }
        info!(staff.id = %staff.id, "Staff member updated");
        Ok(staff)
    }

    /// Deactivated staff can no longer log in; their history is kept.
    #[instrument(skip(db, cache), fields(db.operation = "UPDATE", db.table = "staff"))]
    pub async fn deactivate_staff(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: StaffId,
        scope: Option<SchoolId>,
        acting_staff_id: StaffId,
    ) -> Result<Staff, AppError> {
        if id == acting_staff_id {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "You cannot deactivate your own account"
            )));
        }

        let existing = Self::get_staff(db, id, scope).await?;
        if existing.role.is_system_admin() {
            return Err(AppError::forbidden("System admins cannot be deactivated here"));
        }

        let query = format!(
            "UPDATE staff SET is_active = FALSE, updated_at = NOW() WHERE id = $1 RETURNING {}",
            STAFF_COLUMNS
        );
        let staff = sqlx::query_as::<_, Staff>(&query)
            .bind(id)
            .fetch_one(db)
            .await?;

        if let Some(school_id) = staff.school_id {
            invalidate::schedule(cache, school_id.into_inner()).await;
        }
        info!(staff.id = %staff.id, "Staff member deactivated");
        Ok(staff)
    }
}
