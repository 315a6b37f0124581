//! Fee types, per-student fees, payments and waivers. Money is in cents.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{AcademicYearId, FeeTypeId, PaymentId, SchoolId, StaffId, StudentFeeId, StudentId};
use crate::text_enum::text_enum;

text_enum!(
    PaymentMethod {
        Cash => "cash",
        Check => "check",
        Card => "card",
        Online => "online",
    }
);

text_enum!(
    FeeStatus {
        Paid => "paid",
        Waived => "waived",
        Partial => "partial",
        Overdue => "overdue",
        Pending => "pending",
    }
);

/// Status derived from the amounts and the due date.
///
/// A settled fee is `waived` when nothing was paid, otherwise `paid`. An open
/// fee past its due date is `overdue` regardless of partial payments.
#[must_use]
pub fn fee_status(amount: i64, paid: i64, waived: i64, due_date: NaiveDate, today: NaiveDate) -> FeeStatus {
    let balance = amount - paid - waived;
    if balance <= 0 {
        if paid == 0 && waived > 0 {
            FeeStatus::Waived
        } else {
            FeeStatus::Paid
        }
    } else if due_date < today {
        FeeStatus::Overdue
    } else if paid > 0 {
        FeeStatus::Partial
    } else {
        FeeStatus::Pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FeeType {
    pub id: FeeTypeId,
    pub school_id: SchoolId,
    pub academic_year_id: Option<AcademicYearId>,
    pub name: String,
    pub description: Option<String>,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    /// Only students in this grade are assessed in bulk; `None` means all
    pub grade_level: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateFeeTypeDto {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    #[validate(range(min = 0, max = 12))]
    pub grade_level: Option<i32>,
    pub academic_year_id: Option<AcademicYearId>,
    pub school_id: Option<SchoolId>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateFeeTypeDto {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub amount_cents: Option<i64>,
    pub due_date: Option<NaiveDate>,
    #[validate(range(min = 0, max = 12))]
    pub grade_level: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeeTypeFilterParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub academic_year_id: Option<AcademicYearId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudentFee {
    pub id: StudentFeeId,
    pub student_id: StudentId,
    pub fee_type_id: FeeTypeId,
    pub amount_cents: i64,
    pub paid_cents: i64,
    pub waived_cents: i64,
    pub waiver_reason: Option<String>,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentFee {
    #[must_use]
    pub fn balance_cents(&self) -> i64 {
        self.amount_cents - self.paid_cents - self.waived_cents
    }
}

/// Assess a fee type to one student, or to every active student of the
/// fee's grade level when `student_id` is omitted.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct AssessFeeDto {
    pub student_id: Option<StudentId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssessFeeResult {
    /// Newly created student fees; already assessed students are skipped
    pub assessed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FeePayment {
    pub id: PaymentId,
    pub student_fee_id: StudentFeeId,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub received_by: Option<StaffId>,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordPaymentDto {
    #[validate(range(min = 1))]
    pub amount_cents: i64,
    pub method: PaymentMethod,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct WaiveFeeDto {
    #[validate(length(min = 1, max = 2000))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentResult {
    pub payment: FeePayment,
    pub fee: StudentFee,
}

/// A student fee joined with its fee type name.
#[derive(Debug, Clone, FromRow)]
pub struct StudentFeeRow {
    #[sqlx(flatten)]
    pub fee: StudentFee,
    pub fee_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatementLine {
    pub student_fee_id: StudentFeeId,
    pub fee_type_id: FeeTypeId,
    pub name: String,
    pub due_date: NaiveDate,
    pub amount_cents: i64,
    pub paid_cents: i64,
    pub waived_cents: i64,
    pub balance_cents: i64,
    pub status: FeeStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeeStatement {
    pub student_id: StudentId,
    pub lines: Vec<StatementLine>,
    pub total_amount_cents: i64,
    pub total_paid_cents: i64,
    pub total_waived_cents: i64,
    pub total_balance_cents: i64,
}

impl FeeStatement {
    pub fn build(student_id: StudentId, rows: Vec<StudentFeeRow>, today: NaiveDate) -> Self {
        let lines: Vec<StatementLine> = rows
            .into_iter()
            .map(|row| {
                let fee = row.fee;
                StatementLine {
                    student_fee_id: fee.id,
                    fee_type_id: fee.fee_type_id,
                    name: row.fee_name,
                    due_date: fee.due_date,
                    amount_cents: fee.amount_cents,
                    paid_cents: fee.paid_cents,
                    waived_cents: fee.waived_cents,
                    balance_cents: fee.balance_cents(),
                    status: fee_status(
                        fee.amount_cents,
                        fee.paid_cents,
                        fee.waived_cents,
                        fee.due_date,
                        today,
                    ),
                }
            })
            .collect();

        Self {
            student_id,
            total_amount_cents: lines.iter().map(|l| l.amount_cents).sum(),
            total_paid_cents: lines.iter().map(|l| l.paid_cents).sum(),
            total_waived_cents: lines.iter().map(|l| l.waived_cents).sum(),
            total_balance_cents: lines.iter().map(|l| l.balance_cents).sum(),
            lines,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OverdueFee {
    pub student_fee_id: StudentFeeId,
    pub student_id: StudentId,
    pub student_number: String,
    pub first_name: String,
    pub last_name: String,
    pub fee_name: String,
    pub due_date: NaiveDate,
    pub balance_cents: i64,
    pub days_overdue: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, day).unwrap()
    }

    #[test]
    fn test_fee_status() {
        let due = d(15);
        assert_eq!(fee_status(1000, 1000, 0, due, d(20)), FeeStatus::Paid);
        assert_eq!(fee_status(1000, 0, 1000, due, d(20)), FeeStatus::Waived);
        assert_eq!(fee_status(1000, 400, 600, due, d(20)), FeeStatus::Paid);
        assert_eq!(fee_status(1000, 400, 0, due, d(10)), FeeStatus::Partial);
        assert_eq!(fee_status(1000, 400, 0, due, d(16)), FeeStatus::Overdue);
        assert_eq!(fee_status(1000, 0, 0, due, d(15)), FeeStatus::Pending);
        assert_eq!(fee_status(1000, 0, 0, due, d(16)), FeeStatus::Overdue);
    }

    #[test]
    fn test_statement_totals() {
        let student_id = StudentId::new();
        let row = |amount, paid, waived, due| StudentFeeRow {
            fee: StudentFee {
                id: StudentFeeId::new(),
                student_id,
                fee_type_id: FeeTypeId::new(),
                amount_cents: amount,
                paid_cents: paid,
                waived_cents: waived,
                waiver_reason: None,
                due_date: due,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            fee_name: "Lab fee".to_string(),
        };
        let statement = FeeStatement::build(
            student_id,
            vec![row(5000, 2000, 0, d(1)), row(2500, 0, 2500, d(1))],
            d(10),
        );
        assert_eq!(statement.total_amount_cents, 7500);
        assert_eq!(statement.total_paid_cents, 2000);
        assert_eq!(statement.total_waived_cents, 2500);
        assert_eq!(statement.total_balance_cents, 3000);
        assert_eq!(statement.lines[0].status, FeeStatus::Overdue);
        assert_eq!(statement.lines[1].status, FeeStatus::Waived);
    }

    #[test]
    fn test_payment_amount_must_be_positive() {
        let dto = RecordPaymentDto {
            amount_cents: 0,
            method: PaymentMethod::Cash,
            reference: None,
        };
        assert!(dto.validate().is_err());
    }
}
