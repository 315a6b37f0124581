use chrono::Utc;
use schoolhouse_core::{AppError, Paginated, PaginationParams};
use schoolhouse_models::StudentStatus;
use schoolhouse_models::ids::{AcademicYearId, FeeTypeId, SchoolId, StaffId, StudentFeeId, StudentId};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{error, info, instrument};

use crate::metrics;
use crate::modules::students::service::StudentService;

use super::model::{
    AssessFeeDto, AssessFeeResult, CreateFeeTypeDto, FeePayment, FeeStatement, FeeType,
    FeeTypeFilterParams, OverdueFee, PaymentResult, RecordPaymentDto, StudentFee, StudentFeeRow,
    UpdateFeeTypeDto, WaiveFeeDto,
};

const FEE_TYPE_COLUMNS: &str = "id, school_id, academic_year_id, name, description, amount_cents, \
     due_date, grade_level, created_at, updated_at";

const STUDENT_FEE_COLUMNS: &str = "f.id, f.student_id, f.fee_type_id, f.amount_cents, f.paid_cents, \
     f.waived_cents, f.waiver_reason, f.due_date, f.created_at, f.updated_at";

const PAYMENT_COLUMNS: &str = "id, student_fee_id, amount_cents, method, reference, received_by, paid_at";

fn map_write_error(e: sqlx::Error, duplicate: &'static str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::bad_request(anyhow::anyhow!(duplicate));
    }
    error!(error = %e, "Database error writing fee data");
    AppError::from(e)
}

pub struct FeeService;

impl FeeService {
    async fn ensure_year_in_school(
        db: &PgPool,
        school_id: SchoolId,
        year: Option<AcademicYearId>,
    ) -> Result<(), AppError> {
        let Some(year) = year else {
            return Ok(());
        };
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM academic_years WHERE id = $1 AND school_id = $2)",
        )
        .bind(year)
        .bind(school_id)
        .fetch_one(db)
        .await?;
        if !found {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Academic year does not belong to this school"
            )));
        }
        Ok(())
    }

    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "fee_types"))]
    pub async fn create_fee_type(
        db: &PgPool,
        school_id: SchoolId,
        dto: CreateFeeTypeDto,
    ) -> Result<FeeType, AppError> {
        Self::ensure_year_in_school(db, school_id, dto.academic_year_id).await?;

        let query = format!(
            "INSERT INTO fee_types
                (school_id, academic_year_id, name, description, amount_cents, due_date, grade_level)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            FEE_TYPE_COLUMNS
        );
        let fee_type = sqlx::query_as::<_, FeeType>(&query)
            .bind(school_id)
            .bind(dto.academic_year_id)
            .bind(&dto.name)
            .bind(&dto.description)
            .bind(dto.amount_cents)
            .bind(dto.due_date)
            .bind(dto.grade_level)
            .fetch_one(db)
            .await
            .map_err(|e| map_write_error(e, "A fee type with this name already exists"))?;

        info!(fee_type.id = %fee_type.id, amount = fee_type.amount_cents, "Fee type created");
        Ok(fee_type)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "fee_types"))]
    pub async fn get_fee_types(
        db: &PgPool,
        school_id: SchoolId,
        filters: FeeTypeFilterParams,
        pagination: PaginationParams,
    ) -> Result<Paginated<FeeType>, AppError> {
        let where_clause = "school_id = $1 AND ($2::uuid IS NULL OR academic_year_id = $2)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM fee_types WHERE {}",
            where_clause
        ))
        .bind(school_id)
        .bind(filters.academic_year_id)
        .fetch_one(db)
        .await?;

        let query = format!(
            "SELECT {} FROM fee_types WHERE {} ORDER BY due_date, name LIMIT $3 OFFSET $4",
            FEE_TYPE_COLUMNS, where_clause
        );
        let fee_types = sqlx::query_as::<_, FeeType>(&query)
            .bind(school_id)
            .bind(filters.academic_year_id)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        Ok(Paginated::new(fee_types, total, &pagination))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "fee_types"))]
    pub async fn get_fee_type(
        db: &PgPool,
        id: FeeTypeId,
        scope: Option<SchoolId>,
    ) -> Result<FeeType, AppError> {
        let query = format!(
            "SELECT {} FROM fee_types WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)",
            FEE_TYPE_COLUMNS
        );
        sqlx::query_as::<_, FeeType>(&query)
            .bind(id)
            .bind(scope)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Fee type not found")))
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "fee_types"))]
    pub async fn update_fee_type(
        db: &PgPool,
        id: FeeTypeId,
        scope: Option<SchoolId>,
        dto: UpdateFeeTypeDto,
    ) -> Result<FeeType, AppError> {
        let query = format!(
            "UPDATE fee_types SET
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                amount_cents = COALESCE($5, amount_cents),
                due_date = COALESCE($6, due_date),
                grade_level = COALESCE($7, grade_level),
                updated_at = NOW()
             WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)
             RETURNING {}",
            FEE_TYPE_COLUMNS
        );
        sqlx::query_as::<_, FeeType>(&query)
            .bind(id)
            .bind(scope)
            .bind(&dto.name)
            .bind(&dto.description)
            .bind(dto.amount_cents)
            .bind(dto.due_date)
            .bind(dto.grade_level)
            .fetch_optional(db)
            .await
            .map_err(|e| map_write_error(e, "A fee type with this name already exists"))?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Fee type not found")))
    }

    /// Fee types with recorded payments cannot be deleted; the cascade would
    /// erase payment history.
    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "fee_types"))]
    pub async fn delete_fee_type(
        db: &PgPool,
        id: FeeTypeId,
        scope: Option<SchoolId>,
    ) -> Result<(), AppError> {
        let fee_type = Self::get_fee_type(db, id, scope).await?;

        let has_payments = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM fee_payments p
                JOIN student_fees f ON f.id = p.student_fee_id
                WHERE f.fee_type_id = $1)",
        )
        .bind(id)
        .fetch_one(db)
        .await?;
        if has_payments {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Cannot delete a fee type with recorded payments"
            )));
        }

        sqlx::query("DELETE FROM fee_types WHERE id = $1")
            .bind(fee_type.id)
            .execute(db)
            .await?;
        info!(fee_type.id = %id, "Fee type deleted");
        Ok(())
    }

    /// Assesses a fee type to one student, or to every active student the
    /// fee applies to. Students already assessed are skipped.
    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "student_fees"))]
    pub async fn assess_fee(
        db: &PgPool,
        id: FeeTypeId,
        scope: Option<SchoolId>,
        dto: AssessFeeDto,
    ) -> Result<AssessFeeResult, AppError> {
        let fee_type = Self::get_fee_type(db, id, scope).await?;

        let result = match dto.student_id {
            Some(student_id) => {
                let student =
                    StudentService::get_student(db, student_id, Some(fee_type.school_id)).await?;
                if student.status != StudentStatus::Active {
                    return Err(AppError::bad_request(anyhow::anyhow!(
                        "Fees can only be assessed to active students"
                    )));
                }
                sqlx::query(
                    "INSERT INTO student_fees (student_id, fee_type_id, amount_cents, due_date)
                     VALUES ($1, $2, $3, $4)
                     ON CONFLICT (student_id, fee_type_id) DO NOTHING",
                )
                .bind(student_id)
                .bind(fee_type.id)
                .bind(fee_type.amount_cents)
                .bind(fee_type.due_date)
                .execute(db)
                .await?
            }
            None => {
                sqlx::query(
                    "INSERT INTO student_fees (student_id, fee_type_id, amount_cents, due_date)
                     SELECT s.id, $1, $2, $3 FROM students s
                     WHERE s.school_id = $4 AND s.status = $5
                       AND ($6::int IS NULL OR s.grade_level = $6)
                     ON CONFLICT (student_id, fee_type_id) DO NOTHING",
                )
                .bind(fee_type.id)
                .bind(fee_type.amount_cents)
                .bind(fee_type.due_date)
                .bind(fee_type.school_id)
                .bind(StudentStatus::Active)
                .bind(fee_type.grade_level)
                .execute(db)
                .await?
            }
        };

        let assessed = result.rows_affected();
        info!(fee_type.id = %id, assessed, "Fee assessed");
        Ok(AssessFeeResult { assessed })
    }

    async fn lock_student_fee(
        tx: &mut Transaction<'_, Postgres>,
        id: StudentFeeId,
        scope: Option<SchoolId>,
    ) -> Result<StudentFee, AppError> {
        let query = format!(
            "SELECT {} FROM student_fees f
             JOIN students s ON s.id = f.student_id
             WHERE f.id = $1 AND ($2::uuid IS NULL OR s.school_id = $2)
             FOR UPDATE OF f",
            STUDENT_FEE_COLUMNS
        );
        sqlx::query_as::<_, StudentFee>(&query)
            .bind(id)
            .bind(scope)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student fee not found")))
    }

    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "fee_payments"))]
    pub async fn record_payment(
        db: &PgPool,
        id: StudentFeeId,
        scope: Option<SchoolId>,
        received_by: StaffId,
        dto: RecordPaymentDto,
    ) -> Result<PaymentResult, AppError> {
        let mut tx = db.begin().await?;
        let fee = Self::lock_student_fee(&mut tx, id, scope).await?;

        let balance = fee.balance_cents();
        if dto.amount_cents > balance {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Payment of {} cents exceeds the outstanding balance of {} cents",
                dto.amount_cents,
                balance
            )));
        }

        let payment = sqlx::query_as::<_, FeePayment>(&format!(
            "INSERT INTO fee_payments (student_fee_id, amount_cents, method, reference, received_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(id)
        .bind(dto.amount_cents)
        .bind(dto.method)
        .bind(&dto.reference)
        .bind(received_by)
        .fetch_one(&mut *tx)
        .await?;

        let fee = sqlx::query_as::<_, StudentFee>(&format!(
            "UPDATE student_fees f SET paid_cents = paid_cents + $2, updated_at = NOW()
             WHERE f.id = $1
             RETURNING {}",
            STUDENT_FEE_COLUMNS
        ))
        .bind(id)
        .bind(dto.amount_cents)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        metrics::track_fee_payment(payment.method.as_str(), payment.amount_cents);
        info!(
            student_fee.id = %id,
            amount = payment.amount_cents,
            method = %payment.method,
            balance = fee.balance_cents(),
            "Fee payment recorded"
        );
        Ok(PaymentResult { payment, fee })
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "fee_payments"))]
    pub async fn get_payments(
        db: &PgPool,
        id: StudentFeeId,
        scope: Option<SchoolId>,
    ) -> Result<Vec<FeePayment>, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM student_fees f JOIN students s ON s.id = f.student_id
                WHERE f.id = $1 AND ($2::uuid IS NULL OR s.school_id = $2))",
        )
        .bind(id)
        .bind(scope)
        .fetch_one(db)
        .await?;
        if !exists {
            return Err(AppError::not_found(anyhow::anyhow!("Student fee not found")));
        }

        let payments = sqlx::query_as::<_, FeePayment>(&format!(
            "SELECT {} FROM fee_payments WHERE student_fee_id = $1 ORDER BY paid_at",
            PAYMENT_COLUMNS
        ))
        .bind(id)
        .fetch_all(db)
        .await?;
        Ok(payments)
    }

    /// Waives whatever is still owed on the fee.
    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "student_fees"))]
    pub async fn waive_fee(
        db: &PgPool,
        id: StudentFeeId,
        scope: Option<SchoolId>,
        dto: WaiveFeeDto,
    ) -> Result<StudentFee, AppError> {
        let mut tx = db.begin().await?;
        let fee = Self::lock_student_fee(&mut tx, id, scope).await?;

        let balance = fee.balance_cents();
        if balance <= 0 {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Fee has no outstanding balance to waive"
            )));
        }

        let fee = sqlx::query_as::<_, StudentFee>(&format!(
            "UPDATE student_fees f SET
                waived_cents = waived_cents + $2,
                waiver_reason = $3,
                updated_at = NOW()
             WHERE f.id = $1
             RETURNING {}",
            STUDENT_FEE_COLUMNS
        ))
        .bind(id)
        .bind(balance)
        .bind(&dto.reason)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(student_fee.id = %id, waived = balance, "Fee balance waived");
        Ok(fee)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "student_fees"))]
    pub async fn get_statement(
        db: &PgPool,
        student_id: StudentId,
        scope: Option<SchoolId>,
    ) -> Result<FeeStatement, AppError> {
        StudentService::get_student(db, student_id, scope).await?;

        let query = format!(
            "SELECT {}, t.name AS fee_name FROM student_fees f
             JOIN fee_types t ON t.id = f.fee_type_id
             WHERE f.student_id = $1
             ORDER BY f.due_date, t.name",
            STUDENT_FEE_COLUMNS
        );
        let rows = sqlx::query_as::<_, StudentFeeRow>(&query)
            .bind(student_id)
            .fetch_all(db)
            .await?;

        Ok(FeeStatement::build(student_id, rows, Utc::now().date_naive()))
    }

    /// Open balances past their due date, oldest first.
    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "student_fees"))]
    pub async fn overdue_report(db: &PgPool, school_id: SchoolId) -> Result<Vec<OverdueFee>, AppError> {
        let overdue = sqlx::query_as::<_, OverdueFee>(
            "SELECT f.id AS student_fee_id, s.id AS student_id, s.student_number,
                    s.first_name, s.last_name, t.name AS fee_name, f.due_date,
                    f.amount_cents - f.paid_cents - f.waived_cents AS balance_cents,
                    ($2::date - f.due_date)::int AS days_overdue
             FROM student_fees f
             JOIN students s ON s.id = f.student_id
             JOIN fee_types t ON t.id = f.fee_type_id
             WHERE s.school_id = $1
               AND f.due_date < $2
               AND f.amount_cents - f.paid_cents - f.waived_cents > 0
             ORDER BY f.due_date, s.last_name, s.first_name",
        )
        .bind(school_id)
        .bind(Utc::now().date_naive())
        .fetch_all(db)
        .await?;
        Ok(overdue)
    }
}
