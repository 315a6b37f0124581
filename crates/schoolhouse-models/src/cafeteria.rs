//! Cafeteria meal accounts.
//!
//! Balances are in cents and may go negative down to the account's
//! `negative_limit_cents`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{MealAccountId, MealTransactionId, SchoolId, StaffId, StudentId};
use crate::text_enum::text_enum;

/// Balance below which an account shows up on the low-balance report.
pub const DEFAULT_LOW_BALANCE_CENTS: i64 = 500;

text_enum!(
    MealEligibility {
        Free => "free",
        Reduced => "reduced",
        Paid => "paid",
    }
);

text_enum!(
    MealType {
        Breakfast => "breakfast",
        Lunch => "lunch",
        Snack => "snack",
    }
);

text_enum!(
    TransactionKind {
        Deposit => "deposit",
        Purchase => "purchase",
    }
);

/// Price in cents of a meal for a given eligibility. Snacks are never
/// subsidised.
#[must_use]
pub const fn meal_price(eligibility: MealEligibility, meal: MealType) -> i64 {
    match (meal, eligibility) {
        (MealType::Snack, _) => 150,
        (_, MealEligibility::Free) => 0,
        (MealType::Breakfast, MealEligibility::Reduced) => 30,
        (MealType::Lunch, MealEligibility::Reduced) => 40,
        (MealType::Breakfast, MealEligibility::Paid) => 250,
        (MealType::Lunch, MealEligibility::Paid) => 375,
    }
}

/// Returns the balance after the purchase, or `None` when it would drop
/// below `-negative_limit`.
#[must_use]
/// `None` when the new balance would not fit.
#[must_use]
pub fn balance_after_deposit(balance: i64, amount: i64) -> Option<i64> {
    balance.checked_add(amount)
}

pub fn balance_after_purchase(balance: i64, price: i64, negative_limit: i64) -> Option<i64> {
    let after = balance - price;
    (after >= -negative_limit).then_some(after)
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MealAccount {
    pub id: MealAccountId,
    pub school_id: SchoolId,
    pub student_id: StudentId,
    pub eligibility: MealEligibility,
    pub balance_cents: i64,
    pub negative_limit_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MealTransaction {
    pub id: MealTransactionId,
    pub account_id: MealAccountId,
    pub kind: TransactionKind,
    pub meal_type: Option<MealType>,
    /// Signed: deposits positive, purchases negative
    pub amount_cents: i64,
    pub balance_after_cents: i64,
    pub note: Option<String>,
    pub created_by: Option<StaffId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct OpenMealAccountDto {
    pub student_id: StudentId,
    /// Defaults to `paid`
    pub eligibility: Option<MealEligibility>,
    #[validate(range(min = 0, max = 10_000))]
    pub negative_limit_cents: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateMealAccountDto {
    pub eligibility: Option<MealEligibility>,
    #[validate(range(min = 0, max = 10_000))]
    pub negative_limit_cents: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DepositDto {
    /// At most $1,000 per deposit
    #[validate(range(min = 1, max = 100_000))]
    pub amount_cents: i64,
    #[validate(length(max = 200))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PurchaseDto {
    pub meal_type: MealType,
    #[validate(length(max = 200))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MealTransactionResult {
    pub account: MealAccount,
    pub transaction: MealTransaction,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MealAccountFilterParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub eligibility: Option<MealEligibility>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LowBalanceParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
    /// Accounts strictly below this balance are listed (default 500)
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub threshold_cents: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LowBalanceAccount {
    pub account_id: MealAccountId,
    pub student_id: StudentId,
    pub student_number: String,
    pub first_name: String,
    pub last_name: String,
    pub eligibility: MealEligibility,
    pub balance_cents: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_table() {
        use MealEligibility::*;
        use MealType::*;
        assert_eq!(meal_price(Free, Breakfast), 0);
        assert_eq!(meal_price(Free, Lunch), 0);
        assert_eq!(meal_price(Reduced, Breakfast), 30);
        assert_eq!(meal_price(Reduced, Lunch), 40);
        assert_eq!(meal_price(Paid, Breakfast), 250);
        assert_eq!(meal_price(Paid, Lunch), 375);
        for e in MealEligibility::ALL {
            assert_eq!(meal_price(*e, Snack), 150);
        }
    }

    #[test]
    fn test_negative_limit() {
        assert_eq!(balance_after_purchase(500, 375, 0), Some(125));
        assert_eq!(balance_after_purchase(100, 375, 0), None);
        assert_eq!(balance_after_purchase(100, 375, 300), Some(-275));
        assert_eq!(balance_after_purchase(0, 375, 375), Some(-375));
        assert_eq!(balance_after_purchase(-375, 0, 375), Some(-375));
    }

    #[test]
    fn test_deposit_must_be_positive() {
        let dto = DepositDto {
            amount_cents: -5,
            note: None,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_deposit_is_bounded() {
        let dto = DepositDto {
            amount_cents: i64::MAX,
            note: None,
        };
        assert!(dto.validate().is_err());
        assert_eq!(balance_after_deposit(1, i64::MAX), None);
        assert_eq!(balance_after_deposit(-375, 1000), Some(625));
    }
}
