use chrono::{Duration, Utc};
use schoolhouse_core::{AppError, Paginated, PaginationParams};
use schoolhouse_models::ids::{GiftedRecordId, SchoolId};
use sqlx::PgPool;
use tracing::{error, info, instrument, warn};

use crate::modules::students::service::StudentService;

use super::model::{
    ChangeGiftedStatusDto, CreateEvaluationDto, CreateGiftedRecordDto, DEFAULT_REVIEW_WINDOW_DAYS,
    GiftedArea, GiftedEvaluation, GiftedFilterParams, GiftedRecord, GiftedRecordDetail,
    GiftedStatus, GiftedSummary, UpdateGiftedRecordDto, annual_review_date,
};

const RECORD_COLUMNS: &str = "id, school_id, student_id, referral_source, referred_on, areas, status, \
     eligibility_date, next_review_date, notes, created_at, updated_at";

const EVALUATION_COLUMNS: &str =
    "id, record_id, instrument, score, percentile, evaluated_on, evaluator, notes, created_at";

const MAX_REVIEW_WINDOW_DAYS: i64 = 365;

fn dedup_areas(areas: &[GiftedArea]) -> Vec<GiftedArea> {
    let mut unique = Vec::with_capacity(areas.len());
    for area in areas {
        if !unique.contains(area) {
            unique.push(*area);
        }
    }
    unique
}

fn concurrent_change_error(id: GiftedRecordId) -> AppError {
    warn!(record.id = %id, "Gifted status changed concurrently");
    AppError::bad_request(anyhow::anyhow!(
        "Gifted record was changed by another request, reload and retry"
    ))
}

pub struct GiftedService;

impl GiftedService {
    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "gifted_records"))]
    pub async fn create_record(
        db: &PgPool,
        school_id: SchoolId,
        dto: CreateGiftedRecordDto,
    ) -> Result<GiftedRecord, AppError> {
        StudentService::get_student(db, dto.student_id, Some(school_id)).await?;

        let today = Utc::now().date_naive();
        let referred_on = dto.referred_on.unwrap_or(today);
        if referred_on > today {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "referred_on cannot be in the future"
            )));
        }

        let query = format!(
            "INSERT INTO gifted_records (school_id, student_id, referral_source, referred_on, areas, notes)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            RECORD_COLUMNS
        );
        let record = sqlx::query_as::<_, GiftedRecord>(&query)
            .bind(school_id)
            .bind(dto.student_id)
            .bind(&dto.referral_source)
            .bind(referred_on)
            .bind(dedup_areas(&dto.areas))
            .bind(&dto.notes)
            .fetch_one(db)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e
                    && db_err.is_unique_violation()
                {
                    return AppError::bad_request(anyhow::anyhow!(
                        "Student already has a gifted program record"
                    ));
                }
                error!(error = %e, "Database error creating gifted record");
                AppError::from(e)
            })?;

        info!(record.id = %record.id, student.id = %record.student_id, "Gifted referral created");
        Ok(record)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "gifted_records"))]
    pub async fn get_records(
        db: &PgPool,
        school_id: SchoolId,
        filters: GiftedFilterParams,
        pagination: PaginationParams,
    ) -> Result<Paginated<GiftedRecord>, AppError> {
        let where_clause = "school_id = $1
            AND ($2::uuid IS NULL OR student_id = $2)
            AND ($3::text IS NULL OR status = $3)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM gifted_records WHERE {}",
            where_clause
        ))
        .bind(school_id)
        .bind(filters.student_id)
        .bind(filters.status)
        .fetch_one(db)
        .await?;

        let query = format!(
            "SELECT {} FROM gifted_records WHERE {}
             ORDER BY referred_on DESC, created_at DESC LIMIT $4 OFFSET $5",
            RECORD_COLUMNS, where_clause
        );
        let records = sqlx::query_as::<_, GiftedRecord>(&query)
            .bind(school_id)
            .bind(filters.student_id)
            .bind(filters.status)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        Ok(Paginated::new(records, total, &pagination))
    }

    async fn find_record(
        db: &PgPool,
        id: GiftedRecordId,
        scope: Option<SchoolId>,
    ) -> Result<GiftedRecord, AppError> {
        let query = format!(
            "SELECT {} FROM gifted_records WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)",
            RECORD_COLUMNS
        );
        sqlx::query_as::<_, GiftedRecord>(&query)
            .bind(id)
            .bind(scope)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Gifted record not found")))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "gifted_records"))]
    pub async fn get_record(
        db: &PgPool,
        id: GiftedRecordId,
        scope: Option<SchoolId>,
    ) -> Result<GiftedRecordDetail, AppError> {
        let record = Self::find_record(db, id, scope).await?;
        let evaluations = sqlx::query_as::<_, GiftedEvaluation>(&format!(
            "SELECT {} FROM gifted_evaluations WHERE record_id = $1 ORDER BY evaluated_on, created_at",
            EVALUATION_COLUMNS
        ))
        .bind(id)
        .fetch_all(db)
        .await?;

        Ok(GiftedRecordDetail { record, evaluations })
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "gifted_records"))]
    pub async fn update_record(
        db: &PgPool,
        id: GiftedRecordId,
        scope: Option<SchoolId>,
        dto: UpdateGiftedRecordDto,
    ) -> Result<GiftedRecord, AppError> {
        let current = Self::find_record(db, id, scope).await?;
        if dto.next_review_date.is_some() && current.status != GiftedStatus::Enrolled {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Only enrolled students have a review date"
            )));
        }

        let areas = dto.areas.as_deref().map(dedup_areas);
        let query = format!(
            "UPDATE gifted_records SET
                referral_source = COALESCE($2, referral_source),
                areas = COALESCE($3, areas),
                next_review_date = COALESCE($4, next_review_date),
                notes = COALESCE($5, notes),
                updated_at = NOW()
             WHERE id = $1 AND status = $6
             RETURNING {}",
            RECORD_COLUMNS
        );
        sqlx::query_as::<_, GiftedRecord>(&query)
            .bind(id)
            .bind(&dto.referral_source)
            .bind(areas)
            .bind(dto.next_review_date)
            .bind(&dto.notes)
            .bind(current.status)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| concurrent_change_error(id))
    }

    /// Moves a record along the workflow. Becoming eligible stamps the
    /// eligibility date, enrolling schedules the first annual review and
    /// exiting clears it.
    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "gifted_records"))]
    pub async fn change_status(
        db: &PgPool,
        id: GiftedRecordId,
        scope: Option<SchoolId>,
        dto: ChangeGiftedStatusDto,
    ) -> Result<GiftedRecord, AppError> {
        let current = Self::find_record(db, id, scope).await?;

        if !current.status.can_transition_to(dto.status) {
            warn!(from = %current.status, to = %dto.status, "Rejected gifted status change");
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Cannot change gifted status from {} to {}",
                current.status,
                dto.status
            )));
        }

        if dto.status == GiftedStatus::Evaluated {
            let evaluated = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM gifted_evaluations WHERE record_id = $1)",
            )
            .bind(id)
            .fetch_one(db)
            .await?;
            if !evaluated {
                return Err(AppError::bad_request(anyhow::anyhow!(
                    "Record an evaluation before marking the student evaluated"
                )));
            }
        }

        let today = Utc::now().date_naive();
        let (eligibility_date, next_review_date) = match dto.status {
            GiftedStatus::Eligible => (Some(today), current.next_review_date),
            GiftedStatus::Enrolled => (current.eligibility_date, Some(annual_review_date(today))),
            GiftedStatus::Exited => (current.eligibility_date, None),
            _ => (current.eligibility_date, current.next_review_date),
        };

        let query = format!(
            "UPDATE gifted_records SET
                status = $2,
                eligibility_date = $3,
                next_review_date = $4,
                updated_at = NOW()
             WHERE id = $1 AND status = $5
             RETURNING {}",
            RECORD_COLUMNS
        );
        let record = sqlx::query_as::<_, GiftedRecord>(&query)
            .bind(id)
            .bind(dto.status)
            .bind(eligibility_date)
            .bind(next_review_date)
            .bind(current.status)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| concurrent_change_error(id))?;

        info!(record.id = %id, status = %record.status, "Gifted status changed");
        Ok(record)
    }

    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "gifted_evaluations"))]
    pub async fn add_evaluation(
        db: &PgPool,
        id: GiftedRecordId,
        scope: Option<SchoolId>,
        dto: CreateEvaluationDto,
    ) -> Result<GiftedEvaluation, AppError> {
        let record = Self::find_record(db, id, scope).await?;

        if dto.evaluated_on > Utc::now().date_naive() {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "evaluated_on cannot be in the future"
            )));
        }
        if dto.evaluated_on < record.referred_on {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "evaluated_on cannot be before the referral date"
            )));
        }

        let query = format!(
            "INSERT INTO gifted_evaluations
                (record_id, instrument, score, percentile, evaluated_on, evaluator, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            EVALUATION_COLUMNS
        );
        let evaluation = sqlx::query_as::<_, GiftedEvaluation>(&query)
            .bind(id)
            .bind(&dto.instrument)
            .bind(dto.score)
            .bind(dto.percentile)
            .bind(dto.evaluated_on)
            .bind(&dto.evaluator)
            .bind(&dto.notes)
            .fetch_one(db)
            .await?;

        info!(
            record.id = %id,
            instrument = %evaluation.instrument,
            percentile = evaluation.percentile,
            "Gifted evaluation added"
        );
        Ok(evaluation)
    }

    /// Enrolled records whose review falls within `days` from today,
    /// including reviews already past due.
    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "gifted_records"))]
    pub async fn upcoming_reviews(
        db: &PgPool,
        school_id: SchoolId,
        days: Option<i64>,
    ) -> Result<Vec<GiftedRecord>, AppError> {
        let days = days.unwrap_or(DEFAULT_REVIEW_WINDOW_DAYS);
        if !(0..=MAX_REVIEW_WINDOW_DAYS).contains(&days) {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "days must be between 0 and {}",
                MAX_REVIEW_WINDOW_DAYS
            )));
        }
        let until = Utc::now().date_naive() + Duration::days(days);

        let query = format!(
            "SELECT {} FROM gifted_records
             WHERE school_id = $1 AND status = $2
               AND next_review_date IS NOT NULL AND next_review_date <= $3
             ORDER BY next_review_date",
            RECORD_COLUMNS
        );
        let records = sqlx::query_as::<_, GiftedRecord>(&query)
            .bind(school_id)
            .bind(GiftedStatus::Enrolled)
            .bind(until)
            .fetch_all(db)
            .await?;
        Ok(records)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "gifted_records"))]
    pub async fn summary(db: &PgPool, school_id: SchoolId) -> Result<GiftedSummary, AppError> {
        let counts = sqlx::query_as::<_, (GiftedStatus, i64)>(
            "SELECT status, COUNT(*) FROM gifted_records WHERE school_id = $1 GROUP BY status",
        )
        .bind(school_id)
        .fetch_all(db)
        .await?;
        Ok(GiftedSummary::from_counts(counts))
    }
}
