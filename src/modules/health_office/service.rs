use chrono::{NaiveDate, Utc};
use schoolhouse_core::{AppError, Paginated, PaginationParams};
use schoolhouse_models::ids::{NurseVisitId, SchoolId, StaffId, StudentId};
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use crate::metrics;
use crate::modules::students::service::StudentService;

use super::model::{
    CreateNurseVisitDto, DailyVisitReport, HealthProfile, NurseVisit, NurseVisitFilterParams,
    UpsertHealthProfileDto, VisitDisposition,
};

const PROFILE_COLUMNS: &str = "id, student_id, allergies, conditions, medications, \
     emergency_contact_name, emergency_contact_phone, notes, created_at, updated_at";

const VISIT_COLUMNS: &str = "id, school_id, student_id, staff_id, arrived_at, departed_at, \
     reason, treatment, disposition, notes, created_at";

pub struct HealthOfficeService;

impl HealthOfficeService {
    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "health_profiles"))]
    pub async fn get_profile(
        db: &PgPool,
        student_id: StudentId,
        scope: Option<SchoolId>,
    ) -> Result<HealthProfile, AppError> {
        StudentService::get_student(db, student_id, scope).await?;

        let query = format!(
            "SELECT {} FROM health_profiles WHERE student_id = $1",
            PROFILE_COLUMNS
        );
        sqlx::query_as::<_, HealthProfile>(&query)
            .bind(student_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Health profile not found")))
    }

    /// Creates the profile or replaces every field of the existing one.
    #[instrument(skip(db, dto), fields(db.operation = "UPSERT", db.table = "health_profiles"))]
    pub async fn upsert_profile(
        db: &PgPool,
        student_id: StudentId,
        scope: Option<SchoolId>,
        dto: UpsertHealthProfileDto,
    ) -> Result<HealthProfile, AppError> {
        StudentService::get_student(db, student_id, scope).await?;

        let clean = |items: &[String]| -> Vec<String> {
            items
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };

        let query = format!(
            "INSERT INTO health_profiles
                (student_id, allergies, conditions, medications, emergency_contact_name,
                 emergency_contact_phone, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (student_id) DO UPDATE SET
                allergies = EXCLUDED.allergies,
                conditions = EXCLUDED.conditions,
                medications = EXCLUDED.medications,
                emergency_contact_name = EXCLUDED.emergency_contact_name,
                emergency_contact_phone = EXCLUDED.emergency_contact_phone,
                notes = EXCLUDED.notes,
                updated_at = NOW()
             RETURNING {}",
            PROFILE_COLUMNS
        );
        let profile = sqlx::query_as::<_, HealthProfile>(&query)
            .bind(student_id)
            .bind(clean(&dto.allergies))
            .bind(clean(&dto.conditions))
            .bind(clean(&dto.medications))
            .bind(&dto.emergency_contact_name)
            .bind(&dto.emergency_contact_phone)
            .bind(&dto.notes)
            .fetch_one(db)
            .await?;

        info!(student.id = %student_id, "Health profile saved");
        Ok(profile)
    }

    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "nurse_visits"))]
    pub async fn create_visit(
        db: &PgPool,
        school_id: SchoolId,
        staff_id: StaffId,
        dto: CreateNurseVisitDto,
    ) -> Result<NurseVisit, AppError> {
        StudentService::get_student(db, dto.student_id, Some(school_id)).await?;

        let now = Utc::now();
        let arrived_at = dto.arrived_at.unwrap_or(now);
        if arrived_at > now {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Visit arrival cannot be in the future"
            )));
        }
        if let Some(departed_at) = dto.departed_at
            && departed_at < arrived_at
        {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "departed_at must not be before arrived_at"
            )));
        }

        let query = format!(
            "INSERT INTO nurse_visits
                (school_id, student_id, staff_id, arrived_at, departed_at, reason, treatment,
                 disposition, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {}",
            VISIT_COLUMNS
        );
        let visit = sqlx::query_as::<_, NurseVisit>(&query)
            .bind(school_id)
            .bind(dto.student_id)
            .bind(staff_id)
            .bind(arrived_at)
            .bind(dto.departed_at)
            .bind(&dto.reason)
            .bind(&dto.treatment)
            .bind(dto.disposition)
            .bind(&dto.notes)
            .fetch_one(db)
            .await?;

        metrics::track_nurse_visit(visit.disposition.as_str());
        info!(
            visit.id = %visit.id,
            student.id = %visit.student_id,
            disposition = %visit.disposition,
            "Nurse visit recorded"
        );
        Ok(visit)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "nurse_visits"))]
    pub async fn get_visits(
        db: &PgPool,
        school_id: SchoolId,
        filters: NurseVisitFilterParams,
        pagination: PaginationParams,
    ) -> Result<Paginated<NurseVisit>, AppError> {
        let where_clause = "school_id = $1
            AND ($2::uuid IS NULL OR student_id = $2)
            AND ($3::text IS NULL OR disposition = $3)
            AND ($4::date IS NULL OR (arrived_at AT TIME ZONE 'UTC')::date >= $4)
            AND ($5::date IS NULL OR (arrived_at AT TIME ZONE 'UTC')::date <= $5)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM nurse_visits WHERE {}",
            where_clause
        ))
        .bind(school_id)
        .bind(filters.student_id)
        .bind(filters.disposition)
        .bind(filters.from)
        .bind(filters.to)
        .fetch_one(db)
        .await?;

        let query = format!(
            "SELECT {} FROM nurse_visits WHERE {}
             ORDER BY arrived_at DESC LIMIT $6 OFFSET $7",
            VISIT_COLUMNS, where_clause
        );
        let visits = sqlx::query_as::<_, NurseVisit>(&query)
            .bind(school_id)
            .bind(filters.student_id)
            .bind(filters.disposition)
            .bind(filters.from)
            .bind(filters.to)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        debug!(total, returned = visits.len(), "Nurse visits fetched");
        Ok(Paginated::new(visits, total, &pagination))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "nurse_visits"))]
    pub async fn get_visit(
        db: &PgPool,
        id: NurseVisitId,
        scope: Option<SchoolId>,
    ) -> Result<NurseVisit, AppError> {
        let query = format!(
            "SELECT {} FROM nurse_visits WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)",
            VISIT_COLUMNS
        );
        sqlx::query_as::<_, NurseVisit>(&query)
            .bind(id)
            .bind(scope)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Nurse visit not found")))
    }

    /// Visits that arrived on `date` (UTC), counted per disposition.
    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "nurse_visits"))]
    pub async fn daily_report(
        db: &PgPool,
        school_id: SchoolId,
        date: Option<NaiveDate>,
    ) -> Result<DailyVisitReport, AppError> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());

        let visits = sqlx::query_as::<_, (StudentId, VisitDisposition)>(
            "SELECT student_id, disposition FROM nurse_visits
             WHERE school_id = $1 AND (arrived_at AT TIME ZONE 'UTC')::date = $2",
        )
        .bind(school_id)
        .bind(date)
        .fetch_all(db)
        .await?;

        Ok(DailyVisitReport::new(date, &visits))
    }
}
