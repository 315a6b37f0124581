use chrono::Utc;
use schoolhouse_core::{AppError, Paginated, PaginationParams};
use schoolhouse_models::ids::{IncidentId, SchoolId, StaffId, StudentId};
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};

use crate::metrics;
use crate::modules::students::service::StudentService;

use super::model::{
    BehaviorIncident, BehaviorSummary, ChangeIncidentStatusDto, CreateIncidentActionDto,
    CreateIncidentDto, IncidentAction, IncidentDetail, IncidentFilterParams, IncidentSeverity,
    IncidentStatus, UpdateIncidentDto,
};

const INCIDENT_COLUMNS: &str = "id, school_id, student_id, reported_by, incident_date, location, \
     category, severity, description, status, resolution_notes, created_at, updated_at";

const ACTION_COLUMNS: &str =
    "id, incident_id, action_type, start_date, end_date, notes, assigned_by, created_at";

fn closed_error(status: IncidentStatus) -> AppError {
    AppError::bad_request(anyhow::anyhow!(
        "Incident is {} and can no longer be changed",
        status
    ))
}

fn concurrent_change_error(id: IncidentId) -> AppError {
    warn!(incident.id = %id, "Incident status changed concurrently");
    AppError::bad_request(anyhow::anyhow!(
        "Incident was changed by another request, reload and retry"
    ))
}

pub struct BehaviorService;

impl BehaviorService {
    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "behavior_incidents"))]
    pub async fn create_incident(
        db: &PgPool,
        school_id: SchoolId,
        reported_by: StaffId,
        dto: CreateIncidentDto,
    ) -> Result<BehaviorIncident, AppError> {
        if dto.incident_date > Utc::now().date_naive() {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Incident date cannot be in the future"
            )));
        }
        StudentService::get_student(db, dto.student_id, Some(school_id)).await?;

        let query = format!(
            "INSERT INTO behavior_incidents
                (school_id, student_id, reported_by, incident_date, location, category,
                 severity, description)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {}",
            INCIDENT_COLUMNS
        );
        let incident = sqlx::query_as::<_, BehaviorIncident>(&query)
            .bind(school_id)
            .bind(dto.student_id)
            .bind(reported_by)
            .bind(dto.incident_date)
            .bind(&dto.location)
            .bind(&dto.category)
            .bind(dto.severity)
            .bind(&dto.description)
            .fetch_one(db)
            .await?;

        metrics::track_incident_reported(incident.severity.as_str());
        info!(
            incident.id = %incident.id,
            student.id = %incident.student_id,
            severity = %incident.severity,
            "Behavior incident reported"
        );
        Ok(incident)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "behavior_incidents"))]
    pub async fn get_incidents(
        db: &PgPool,
        school_id: SchoolId,
        filters: IncidentFilterParams,
        pagination: PaginationParams,
    ) -> Result<Paginated<BehaviorIncident>, AppError> {
        let where_clause = "school_id = $1
            AND ($2::uuid IS NULL OR student_id = $2)
            AND ($3::text IS NULL OR status = $3)
            AND ($4::text IS NULL OR severity = $4)
            AND ($5::date IS NULL OR incident_date >= $5)
            AND ($6::date IS NULL OR incident_date <= $6)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM behavior_incidents WHERE {}",
            where_clause
        ))
        .bind(school_id)
        .bind(filters.student_id)
        .bind(filters.status)
        .bind(filters.severity)
        .bind(filters.from)
        .bind(filters.to)
        .fetch_one(db)
        .await?;

        let query = format!(
            "SELECT {} FROM behavior_incidents WHERE {}
             ORDER BY incident_date DESC, created_at DESC LIMIT $7 OFFSET $8",
            INCIDENT_COLUMNS, where_clause
        );
        let incidents = sqlx::query_as::<_, BehaviorIncident>(&query)
            .bind(school_id)
            .bind(filters.student_id)
            .bind(filters.status)
            .bind(filters.severity)
            .bind(filters.from)
            .bind(filters.to)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        debug!(total, returned = incidents.len(), "Incidents fetched");
        Ok(Paginated::new(incidents, total, &pagination))
    }

    async fn find_incident(
        db: &PgPool,
        id: IncidentId,
        scope: Option<SchoolId>,
    ) -> Result<BehaviorIncident, AppError> {
        let query = format!(
            "SELECT {} FROM behavior_incidents
             WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)",
            INCIDENT_COLUMNS
        );
        sqlx::query_as::<_, BehaviorIncident>(&query)
            .bind(id)
            .bind(scope)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Incident not found")))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "behavior_incidents"))]
    pub async fn get_incident(
        db: &PgPool,
        id: IncidentId,
        scope: Option<SchoolId>,
    ) -> Result<IncidentDetail, AppError> {
        let incident = Self::find_incident(db, id, scope).await?;

        let query = format!(
            "SELECT {} FROM incident_actions WHERE incident_id = $1 ORDER BY start_date, created_at",
            ACTION_COLUMNS
        );
        let actions = sqlx::query_as::<_, IncidentAction>(&query)
            .bind(id)
            .fetch_all(db)
            .await?;

        Ok(IncidentDetail { incident, actions })
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "behavior_incidents"))]
    pub async fn update_incident(
        db: &PgPool,
        id: IncidentId,
        scope: Option<SchoolId>,
        dto: UpdateIncidentDto,
    ) -> Result<BehaviorIncident, AppError> {
        let current = Self::find_incident(db, id, scope).await?;
        if current.status.is_closed() {
            return Err(closed_error(current.status));
        }
        if let Some(date) = dto.incident_date
            && date > Utc::now().date_naive()
        {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Incident date cannot be in the future"
            )));
        }

        let query = format!(
            "UPDATE behavior_incidents SET
                incident_date = COALESCE($2, incident_date),
                location = COALESCE($3, location),
                category = COALESCE($4, category),
                severity = COALESCE($5, severity),
                description = COALESCE($6, description),
                updated_at = NOW()
             WHERE id = $1 AND status = $7
             RETURNING {}",
            INCIDENT_COLUMNS
        );
        sqlx::query_as::<_, BehaviorIncident>(&query)
            .bind(id)
            .bind(dto.incident_date)
            .bind(&dto.location)
            .bind(&dto.category)
            .bind(dto.severity)
            .bind(&dto.description)
            .bind(current.status)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| concurrent_change_error(id))
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "behavior_incidents"))]
    pub async fn change_status(
        db: &PgPool,
        id: IncidentId,
        scope: Option<SchoolId>,
        dto: ChangeIncidentStatusDto,
    ) -> Result<BehaviorIncident, AppError> {
        let current = Self::find_incident(db, id, scope).await?;

        if !current.status.can_transition_to(dto.status) {
            warn!(from = %current.status, to = %dto.status, "Rejected incident status change");
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Cannot change incident status from {} to {}",
                current.status,
                dto.status
            )));
        }

        let query = format!(
            "UPDATE behavior_incidents SET
                status = $2,
                resolution_notes = COALESCE($3, resolution_notes),
                updated_at = NOW()
             WHERE id = $1 AND status = $4
             RETURNING {}",
            INCIDENT_COLUMNS
        );
        let incident = sqlx::query_as::<_, BehaviorIncident>(&query)
            .bind(id)
            .bind(dto.status)
            .bind(&dto.resolution_notes)
            .bind(current.status)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| concurrent_change_error(id))?;

        info!(incident.id = %id, status = %incident.status, "Incident status changed");
        Ok(incident)
    }

    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "behavior_incidents"))]
    pub async fn delete_incident(
        db: &PgPool,
        id: IncidentId,
        scope: Option<SchoolId>,
    ) -> Result<(), AppError> {
        let current = Self::find_incident(db, id, scope).await?;
        if current.status.is_closed() {
            return Err(closed_error(current.status));
        }

        let result = sqlx::query("DELETE FROM behavior_incidents WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(current.status)
            .execute(db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(concurrent_change_error(id));
        }

        info!(incident.id = %id, "Incident deleted");
        Ok(())
    }

    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "incident_actions"))]
    pub async fn add_action(
        db: &PgPool,
        incident_id: IncidentId,
        scope: Option<SchoolId>,
        assigned_by: StaffId,
        dto: CreateIncidentActionDto,
    ) -> Result<IncidentAction, AppError> {
        let incident = Self::find_incident(db, incident_id, scope).await?;
        if incident.status.is_closed() {
            return Err(closed_error(incident.status));
        }
        if let Some(end) = dto.end_date
            && end < dto.start_date
        {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "end_date must not be before start_date"
            )));
        }

        let query = format!(
            "INSERT INTO incident_actions
                (incident_id, action_type, start_date, end_date, notes, assigned_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            ACTION_COLUMNS
        );
        let action = sqlx::query_as::<_, IncidentAction>(&query)
            .bind(incident_id)
            .bind(dto.action_type)
            .bind(dto.start_date)
            .bind(dto.end_date)
            .bind(&dto.notes)
            .bind(assigned_by)
            .fetch_one(db)
            .await?;

        info!(incident.id = %incident_id, action = %action.action_type, "Incident action added");
        Ok(action)
    }

    /// Severity counts and behavior points, dismissed incidents excluded.
    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "behavior_incidents"))]
    pub async fn get_student_summary(
        db: &PgPool,
        student_id: StudentId,
        scope: Option<SchoolId>,
    ) -> Result<BehaviorSummary, AppError> {
        StudentService::get_student(db, student_id, scope).await?;

        let rows = sqlx::query_as::<_, (IncidentSeverity, IncidentStatus)>(
            "SELECT severity, status FROM behavior_incidents WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_all(db)
        .await?;

        Ok(BehaviorSummary::from_incidents(student_id, rows))
    }
}
