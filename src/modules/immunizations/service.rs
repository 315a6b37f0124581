use chrono::Utc;
use schoolhouse_cache::{RedisCache, hash_filters, invalidate, keys};
use schoolhouse_core::{AppError, Paginated, PaginationParams};
use schoolhouse_models::StudentStatus;
use schoolhouse_models::ids::{ExemptionId, ImmunizationRecordId, RequirementId, SchoolId, StudentId};
use sqlx::{FromRow, PgPool};
use tracing::{error, info, instrument, warn};

use crate::metrics;
use crate::modules::students::service::StudentService;

use super::model::{
    ComplianceReport, ComplianceStatus, CreateExemptionDto, CreateImmunizationRecordDto,
    CreateRequirementDto, ImmunizationExemption, ImmunizationRecord, ImmunizationRequirement,
    NonCompliantStudent, StudentCompliance, UpdateRequirementDto, evaluate_compliance,
    validate_grade_levels,
};

const REQUIREMENT_COLUMNS: &str =
    "id, school_id, vaccine_code, vaccine_name, doses_required, grade_levels, created_at, updated_at";

const RECORD_COLUMNS: &str =
    "id, student_id, vaccine_code, dose_number, administered_on, provider, created_at";

const EXEMPTION_COLUMNS: &str =
    "id, student_id, vaccine_code, exemption_type, reason, expires_on, created_at";

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn map_write_error(e: sqlx::Error, duplicate: &'static str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::bad_request(anyhow::anyhow!(duplicate));
    }
    error!(error = %e, "Database error writing immunization data");
    AppError::from(e)
}

#[derive(Debug, FromRow)]
struct ReportStudent {
    id: StudentId,
    student_number: String,
    first_name: String,
    last_name: String,
    grade_level: i32,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct ImmunizationService;

impl ImmunizationService {
    // Requirements

    #[instrument(skip(db, cache, dto), fields(db.operation = "INSERT", db.table = "immunization_requirements"))]
    pub async fn create_requirement(
        db: &PgPool,
        cache: Option<&RedisCache>,
        school_id: SchoolId,
        dto: CreateRequirementDto,
    ) -> Result<ImmunizationRequirement, AppError> {
        validate_grade_levels(&dto.grade_levels)
            .map_err(|msg| AppError::bad_request(anyhow::anyhow!(msg)))?;

        let query = format!(
            "INSERT INTO immunization_requirements
                (school_id, vaccine_code, vaccine_name, doses_required, grade_levels)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            REQUIREMENT_COLUMNS
        );
        let requirement = sqlx::query_as::<_, ImmunizationRequirement>(&query)
            .bind(school_id)
            .bind(normalize_code(&dto.vaccine_code))
            .bind(&dto.vaccine_name)
            .bind(dto.doses_required)
            .bind(&dto.grade_levels)
            .fetch_one(db)
            .await
            .map_err(|e| map_write_error(e, "Requirement for this vaccine already exists"))?;

        invalidate::compliance(cache, school_id.into_inner()).await;
        info!(
            requirement.id = %requirement.id,
            vaccine = %requirement.vaccine_code,
            "Immunization requirement created"
        );
        Ok(requirement)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "immunization_requirements"))]
    pub async fn get_requirements(
        db: &PgPool,
        school_id: SchoolId,
        pagination: PaginationParams,
    ) -> Result<Paginated<ImmunizationRequirement>, AppError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM immunization_requirements WHERE school_id = $1",
        )
        .bind(school_id)
        .fetch_one(db)
        .await?;

        let query = format!(
            "SELECT {} FROM immunization_requirements WHERE school_id = $1
             ORDER BY vaccine_code LIMIT $2 OFFSET $3",
            REQUIREMENT_COLUMNS
        );
        let requirements = sqlx::query_as::<_, ImmunizationRequirement>(&query)
            .bind(school_id)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        Ok(Paginated::new(requirements, total, &pagination))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "immunization_requirements"))]
    pub async fn get_requirement(
        db: &PgPool,
        id: RequirementId,
        scope: Option<SchoolId>,
    ) -> Result<ImmunizationRequirement, AppError> {
        let query = format!(
            "SELECT {} FROM immunization_requirements
             WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)",
            REQUIREMENT_COLUMNS
        );
        sqlx::query_as::<_, ImmunizationRequirement>(&query)
            .bind(id)
            .bind(scope)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Requirement not found")))
    }

    #[instrument(skip(db, cache, dto), fields(db.operation = "UPDATE", db.table = "immunization_requirements"))]
    pub async fn update_requirement(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: RequirementId,
        scope: Option<SchoolId>,
        dto: UpdateRequirementDto,
    ) -> Result<ImmunizationRequirement, AppError> {
        if let Some(levels) = &dto.grade_levels {
            validate_grade_levels(levels)
                .map_err(|msg| AppError::bad_request(anyhow::anyhow!(msg)))?;
        }

        let query = format!(
            "UPDATE immunization_requirements SET
                vaccine_name = COALESCE($3, vaccine_name),
                doses_required = COALESCE($4, doses_required),
                grade_levels = COALESCE($5, grade_levels),
                updated_at = NOW()
             WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)
             RETURNING {}",
            REQUIREMENT_COLUMNS
        );
        let requirement = sqlx::query_as::<_, ImmunizationRequirement>(&query)
            .bind(id)
            .bind(scope)
            .bind(&dto.vaccine_name)
            .bind(dto.doses_required)
            .bind(&dto.grade_levels)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Requirement not found")))?;

        invalidate::compliance(cache, requirement.school_id.into_inner()).await;
        Ok(requirement)
    }

    #[instrument(skip(db, cache), fields(db.operation = "DELETE", db.table = "immunization_requirements"))]
    pub async fn delete_requirement(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: RequirementId,
        scope: Option<SchoolId>,
    ) -> Result<(), AppError> {
        let school_id = sqlx::query_scalar::<_, SchoolId>(
            "DELETE FROM immunization_requirements
             WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)
             RETURNING school_id",
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Requirement not found")))?;

        invalidate::compliance(cache, school_id.into_inner()).await;
        info!(requirement.id = %id, "Immunization requirement deleted");
        Ok(())
    }

    // Dose records

    #[instrument(skip(db, cache, dto), fields(db.operation = "INSERT", db.table = "immunization_records"))]
    pub async fn create_record(
        db: &PgPool,
        cache: Option<&RedisCache>,
        student_id: StudentId,
        scope: Option<SchoolId>,
        dto: CreateImmunizationRecordDto,
    ) -> Result<ImmunizationRecord, AppError> {
        let student = StudentService::get_student(db, student_id, scope).await?;

        if dto.administered_on > Utc::now().date_naive() {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "administered_on cannot be in the future"
            )));
        }

        let query = format!(
            "INSERT INTO immunization_records
                (student_id, vaccine_code, dose_number, administered_on, provider)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            RECORD_COLUMNS
        );
        let record = sqlx::query_as::<_, ImmunizationRecord>(&query)
            .bind(student_id)
            .bind(normalize_code(&dto.vaccine_code))
            .bind(dto.dose_number)
            .bind(dto.administered_on)
            .bind(&dto.provider)
            .fetch_one(db)
            .await
            .map_err(|e| map_write_error(e, "This dose is already recorded for the student"))?;

        invalidate::compliance(cache, student.school_id.into_inner()).await;
        info!(
            student.id = %student_id,
            vaccine = %record.vaccine_code,
            dose = record.dose_number,
            "Immunization dose recorded"
        );
        Ok(record)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "immunization_records"))]
    pub async fn get_records(
        db: &PgPool,
        student_id: StudentId,
        scope: Option<SchoolId>,
    ) -> Result<Vec<ImmunizationRecord>, AppError> {
        StudentService::get_student(db, student_id, scope).await?;

        let query = format!(
            "SELECT {} FROM immunization_records WHERE student_id = $1
             ORDER BY vaccine_code, dose_number",
            RECORD_COLUMNS
        );
        let records = sqlx::query_as::<_, ImmunizationRecord>(&query)
            .bind(student_id)
            .fetch_all(db)
            .await?;
        Ok(records)
    }

    #[instrument(skip(db, cache), fields(db.operation = "DELETE", db.table = "immunization_records"))]
    pub async fn delete_record(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: ImmunizationRecordId,
        scope: Option<SchoolId>,
    ) -> Result<(), AppError> {
        let school_id = sqlx::query_scalar::<_, SchoolId>(
            "DELETE FROM immunization_records r USING students s
             WHERE r.id = $1 AND s.id = r.student_id
               AND ($2::uuid IS NULL OR s.school_id = $2)
             RETURNING s.school_id",
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Immunization record not found")))?;

        invalidate::compliance(cache, school_id.into_inner()).await;
        info!(record.id = %id, "Immunization record deleted");
        Ok(())
    }

    // Exemptions

    #[instrument(skip(db, cache, dto), fields(db.operation = "INSERT", db.table = "immunization_exemptions"))]
    pub async fn create_exemption(
        db: &PgPool,
        cache: Option<&RedisCache>,
        student_id: StudentId,
        scope: Option<SchoolId>,
        dto: CreateExemptionDto,
    ) -> Result<ImmunizationExemption, AppError> {
        let student = StudentService::get_student(db, student_id, scope).await?;

        let query = format!(
            "INSERT INTO immunization_exemptions
                (student_id, vaccine_code, exemption_type, reason, expires_on)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            EXEMPTION_COLUMNS
        );
        let exemption = sqlx::query_as::<_, ImmunizationExemption>(&query)
            .bind(student_id)
            .bind(normalize_code(&dto.vaccine_code))
            .bind(dto.exemption_type)
            .bind(&dto.reason)
            .bind(dto.expires_on)
            .fetch_one(db)
            .await?;

        invalidate::compliance(cache, student.school_id.into_inner()).await;
        info!(
            student.id = %student_id,
            vaccine = %exemption.vaccine_code,
            kind = %exemption.exemption_type,
            "Immunization exemption recorded"
        );
        Ok(exemption)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "immunization_exemptions"))]
    pub async fn get_exemptions(
        db: &PgPool,
        student_id: StudentId,
        scope: Option<SchoolId>,
    ) -> Result<Vec<ImmunizationExemption>, AppError> {
        StudentService::get_student(db, student_id, scope).await?;

        let query = format!(
            "SELECT {} FROM immunization_exemptions WHERE student_id = $1 ORDER BY created_at",
            EXEMPTION_COLUMNS
        );
        let exemptions = sqlx::query_as::<_, ImmunizationExemption>(&query)
            .bind(student_id)
            .fetch_all(db)
            .await?;
        Ok(exemptions)
    }

    #[instrument(skip(db, cache), fields(db.operation = "DELETE", db.table = "immunization_exemptions"))]
    pub async fn delete_exemption(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: ExemptionId,
        scope: Option<SchoolId>,
    ) -> Result<(), AppError> {
        let school_id = sqlx::query_scalar::<_, SchoolId>(
            "DELETE FROM immunization_exemptions x USING students s
             WHERE x.id = $1 AND s.id = x.student_id
               AND ($2::uuid IS NULL OR s.school_id = $2)
             RETURNING s.school_id",
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Exemption not found")))?;

        invalidate::compliance(cache, school_id.into_inner()).await;
        Ok(())
    }

    // Compliance

    async fn school_requirements(
        db: &PgPool,
        school_id: SchoolId,
    ) -> Result<Vec<ImmunizationRequirement>, AppError> {
        let query = format!(
            "SELECT {} FROM immunization_requirements WHERE school_id = $1 ORDER BY vaccine_code",
            REQUIREMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, ImmunizationRequirement>(&query)
            .bind(school_id)
            .fetch_all(db)
            .await?)
    }

    async fn doses_and_exemptions(
        db: &PgPool,
        student_ids: &[StudentId],
    ) -> Result<(Vec<ImmunizationRecord>, Vec<ImmunizationExemption>), AppError> {
        let records = sqlx::query_as::<_, ImmunizationRecord>(&format!(
            "SELECT {} FROM immunization_records WHERE student_id = ANY($1)",
            RECORD_COLUMNS
        ))
        .bind(student_ids)
        .fetch_all(db)
        .await?;

        let exemptions = sqlx::query_as::<_, ImmunizationExemption>(&format!(
            "SELECT {} FROM immunization_exemptions WHERE student_id = ANY($1)",
            EXEMPTION_COLUMNS
        ))
        .bind(student_ids)
        .fetch_all(db)
        .await?;

        Ok((records, exemptions))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "immunization_records"))]
    pub async fn get_student_compliance(
        db: &PgPool,
        student_id: StudentId,
        scope: Option<SchoolId>,
    ) -> Result<StudentCompliance, AppError> {
        let student = StudentService::get_student(db, student_id, scope).await?;
        let requirements = Self::school_requirements(db, student.school_id).await?;
        let (records, exemptions) = Self::doses_and_exemptions(db, &[student_id]).await?;

        Ok(evaluate_compliance(
            student_id,
            student.grade_level,
            &requirements,
            &records,
            &exemptions,
            Utc::now().date_naive(),
        ))
    }

    /// Compliance of every active student in the school, optionally one
    /// grade only. Cached per school and filter.
    #[instrument(skip(db, cache), fields(db.operation = "SELECT", db.table = "immunization_records"))]
    pub async fn compliance_report(
        db: &PgPool,
        cache: Option<&RedisCache>,
        school_id: SchoolId,
        grade_level: Option<i32>,
    ) -> Result<ComplianceReport, AppError> {
        let key = keys::immunizations::compliance_report(
            school_id.into_inner(),
            &hash_filters(&grade_level),
        );
        if let Some(cache) = cache {
            let cached = cache.get::<ComplianceReport>(&key).await;
            metrics::track_cache_lookup("immunization_compliance", cached.is_some());
            if let Some(report) = cached {
                return Ok(report);
            }
        }

        let students = sqlx::query_as::<_, ReportStudent>(
            "SELECT id, student_number, first_name, last_name, grade_level FROM students
             WHERE school_id = $1 AND status = $2 AND ($3::int IS NULL OR grade_level = $3)
             ORDER BY last_name, first_name",
        )
        .bind(school_id)
        .bind(StudentStatus::Active)
        .bind(grade_level)
        .fetch_all(db)
        .await?;

        let requirements = Self::school_requirements(db, school_id).await?;
        let ids: Vec<StudentId> = students.iter().map(|s| s.id).collect();
        let (records, exemptions) = Self::doses_and_exemptions(db, &ids).await?;
        let today = Utc::now().date_naive();

        let mut compliant = 0;
        let mut exempt = 0;
        let mut non_compliant_students = Vec::new();
        for student in students.iter() {
            let result = evaluate_compliance(
                student.id,
                student.grade_level,
                &requirements,
                &records,
                &exemptions,
                today,
            );
            match result.overall_status {
                ComplianceStatus::Compliant => compliant += 1,
                ComplianceStatus::Exempt => exempt += 1,
                ComplianceStatus::NonCompliant => {
                    non_compliant_students.push(NonCompliantStudent {
                        student_id: student.id,
                        student_number: student.student_number.clone(),
                        first_name: student.first_name.clone(),
                        last_name: student.last_name.clone(),
                        grade_level: student.grade_level,
                        missing_vaccines: result.missing(),
                    });
                }
            }
        }

        let total_students = students.len();
        let compliance_rate = if total_students == 0 {
            100.0
        } else {
            round2((compliant + exempt) as f64 * 100.0 / total_students as f64)
        };

        let report = ComplianceReport {
            school_id,
            total_students,
            compliant,
            exempt,
            non_compliant: non_compliant_students.len(),
            compliance_rate,
            non_compliant_students,
        };

        if let Some(cache) = cache
            && let Err(e) = cache.set(&key, &report).await
        {
            warn!(error = %e, "Failed to cache compliance report");
        }

        info!(
            school.id = %school_id,
            total = report.total_students,
            non_compliant = report.non_compliant,
            "Compliance report built"
        );
        Ok(report)
    }
}
