use chrono::{NaiveDate, Utc};
use schoolhouse_core::{AppError, Paginated, PaginationParams};
use schoolhouse_models::first_duplicate;
use schoolhouse_models::ids::{AttendanceRecordId, SchoolId, StaffId, StudentId};
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};

use crate::metrics;

use super::model::{
    AttendanceCounts, AttendanceFilterParams, AttendanceRecord, AttendanceSummary,
    BulkAttendanceDto, BulkAttendanceResult, ChronicAbsenceReport, DEFAULT_CHRONIC_THRESHOLD,
    StudentAttendanceRow, chronic_absentees,
};

const RECORD_COLUMNS: &str = "id, school_id, student_id, section_id, date, status, note, \
     recorded_by, created_at, updated_at";

const COUNT_COLUMNS: &str = "COUNT(*) FILTER (WHERE ar.status = 'present') AS present,
     COUNT(*) FILTER (WHERE ar.status = 'absent') AS absent,
     COUNT(*) FILTER (WHERE ar.status = 'tardy') AS tardy,
     COUNT(*) FILTER (WHERE ar.status = 'excused') AS excused";

fn check_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<(), AppError> {
    if let (Some(from), Some(to)) = (from, to)
        && from > to
    {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "'from' must not be after 'to'"
        )));
    }
    Ok(())
}

pub struct AttendanceService;

impl AttendanceService {
    /// Marks a section for one day. Existing marks for the same
    /// student/section/date are overwritten.
    #[instrument(skip(db, dto), fields(db.operation = "UPSERT", db.table = "attendance_records"))]
    pub async fn record_attendance(
        db: &PgPool,
        scope: Option<SchoolId>,
        recorded_by: StaffId,
        dto: BulkAttendanceDto,
    ) -> Result<BulkAttendanceResult, AppError> {
        if dto.date > Utc::now().date_naive() {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Attendance cannot be recorded for a future date"
            )));
        }

        let school_id = sqlx::query_scalar::<_, SchoolId>(
            "SELECT school_id FROM sections WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)",
        )
        .bind(dto.section_id)
        .bind(scope)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Section not found")))?;

        let student_ids: Vec<StudentId> = dto.entries.iter().map(|e| e.student_id).collect();
        if let Some(repeated) = first_duplicate(student_ids.iter().copied()) {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Student {} appears more than once",
                repeated
            )));
        }

        let enrolled = sqlx::query_scalar::<_, StudentId>(
            "SELECT student_id FROM enrollments WHERE section_id = $1 AND student_id = ANY($2)",
        )
        .bind(dto.section_id)
        .bind(&student_ids)
        .fetch_all(db)
        .await?;

        if let Some(missing) = student_ids.iter().find(|id| !enrolled.contains(id)) {
            warn!(student.id = %missing, section.id = %dto.section_id, "Attendance for unenrolled student");
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Student {} is not enrolled in this section",
                missing
            )));
        }

        let query = format!(
            "INSERT INTO attendance_records
                (school_id, student_id, section_id, date, status, note, recorded_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (student_id, section_id, date) DO UPDATE SET
                status = EXCLUDED.status,
                note = EXCLUDED.note,
                recorded_by = EXCLUDED.recorded_by,
                updated_at = NOW()
             RETURNING {}",
            RECORD_COLUMNS
        );

        let mut tx = db.begin().await?;
        let mut records = Vec::with_capacity(dto.entries.len());
        for entry in &dto.entries {
            let record = sqlx::query_as::<_, AttendanceRecord>(&query)
                .bind(school_id)
                .bind(entry.student_id)
                .bind(dto.section_id)
                .bind(dto.date)
                .bind(entry.status)
                .bind(&entry.note)
                .bind(recorded_by)
                .fetch_one(&mut *tx)
                .await?;
            records.push(record);
        }
        tx.commit().await?;

        metrics::track_attendance_recorded(records.len());
        info!(
            section.id = %dto.section_id,
            date = %dto.date,
            count = records.len(),
            "Attendance recorded"
        );

        Ok(BulkAttendanceResult {
            recorded: records.len(),
            records,
        })
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "attendance_records"))]
    pub async fn get_records(
        db: &PgPool,
        school_id: SchoolId,
        filters: AttendanceFilterParams,
        pagination: PaginationParams,
    ) -> Result<Paginated<AttendanceRecord>, AppError> {
        check_range(filters.from, filters.to)?;

        let where_clause = "school_id = $1
            AND ($2::uuid IS NULL OR student_id = $2)
            AND ($3::uuid IS NULL OR section_id = $3)
            AND ($4::text IS NULL OR status = $4)
            AND ($5::date IS NULL OR date >= $5)
            AND ($6::date IS NULL OR date <= $6)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM attendance_records WHERE {}",
            where_clause
        ))
        .bind(school_id)
        .bind(filters.student_id)
        .bind(filters.section_id)
        .bind(filters.status)
        .bind(filters.from)
        .bind(filters.to)
        .fetch_one(db)
        .await?;

        let query = format!(
            "SELECT {} FROM attendance_records WHERE {}
             ORDER BY date DESC, created_at LIMIT $7 OFFSET $8",
            RECORD_COLUMNS, where_clause
        );
        let records = sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(school_id)
            .bind(filters.student_id)
            .bind(filters.section_id)
            .bind(filters.status)
            .bind(filters.from)
            .bind(filters.to)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        debug!(total, returned = records.len(), "Attendance records fetched");
        Ok(Paginated::new(records, total, &pagination))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "attendance_records"))]
    pub async fn get_student_summary(
        db: &PgPool,
        student_id: StudentId,
        scope: Option<SchoolId>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<AttendanceSummary, AppError> {
        check_range(from, to)?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM students
                           WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2))",
        )
        .bind(student_id)
        .bind(scope)
        .fetch_one(db)
        .await?;

        if !exists {
            return Err(AppError::not_found(anyhow::anyhow!("Student not found")));
        }

        let counts = sqlx::query_as::<_, AttendanceCounts>(&format!(
            "SELECT {} FROM attendance_records ar
             WHERE ar.student_id = $1
               AND ($2::date IS NULL OR ar.date >= $2)
               AND ($3::date IS NULL OR ar.date <= $3)",
            COUNT_COLUMNS
        ))
        .bind(student_id)
        .bind(from)
        .bind(to)
        .fetch_one(db)
        .await?;

        Ok(AttendanceSummary::new(student_id, from, to, counts))
    }

    /// Students whose absence rate over the window is at or above the
    /// threshold, worst first.
    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "attendance_records"))]
    pub async fn chronic_absence_report(
        db: &PgPool,
        school_id: SchoolId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        threshold: Option<f64>,
    ) -> Result<ChronicAbsenceReport, AppError> {
        check_range(from, to)?;

        let threshold = threshold.unwrap_or(DEFAULT_CHRONIC_THRESHOLD);
        if !(0.0..=100.0).contains(&threshold) {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "threshold must be between 0 and 100"
            )));
        }

        let rows = sqlx::query_as::<_, StudentAttendanceRow>(&format!(
            "SELECT st.id AS student_id, st.student_number, st.first_name, st.last_name,
                    st.grade_level, {}
             FROM students st
             JOIN attendance_records ar ON ar.student_id = st.id
             WHERE st.school_id = $1
               AND ($2::date IS NULL OR ar.date >= $2)
               AND ($3::date IS NULL OR ar.date <= $3)
             GROUP BY st.id",
            COUNT_COLUMNS
        ))
        .bind(school_id)
        .bind(from)
        .bind(to)
        .fetch_all(db)
        .await?;

        let students = chronic_absentees(rows, threshold);
        info!(school.id = %school_id, threshold, flagged = students.len(), "Chronic absence report");

        Ok(ChronicAbsenceReport {
            threshold,
            from,
            to,
            students,
        })
    }

    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "attendance_records"))]
    pub async fn delete_record(
        db: &PgPool,
        id: AttendanceRecordId,
        scope: Option<SchoolId>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM attendance_records
             WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)",
        )
        .bind(id)
        .bind(scope)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!(
                "Attendance record not found"
            )));
        }

        info!(record.id = %id, "Attendance record deleted");
        Ok(())
    }
}
