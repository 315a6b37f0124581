use schoolhouse_core::{AppError, Paginated, PaginationParams};
use schoolhouse_models::ids::{MealAccountId, SchoolId, StaffId, StudentId};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{error, info, instrument, warn};

use crate::metrics;
use crate::modules::students::service::StudentService;

use super::model::{
    DEFAULT_LOW_BALANCE_CENTS, DepositDto, LowBalanceAccount, MealAccount,
    MealAccountFilterParams, MealEligibility, MealTransaction, MealTransactionResult, MealType,
    OpenMealAccountDto, PurchaseDto, TransactionKind, UpdateMealAccountDto,
    balance_after_deposit, balance_after_purchase, meal_price,
};

const ACCOUNT_COLUMNS: &str = "id, school_id, student_id, eligibility, balance_cents, \
     negative_limit_cents, created_at, updated_at";

const TRANSACTION_COLUMNS: &str = "id, account_id, kind, meal_type, amount_cents, \
     balance_after_cents, note, created_by, created_at";

pub struct CafeteriaService;

impl CafeteriaService {
    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "meal_accounts"))]
    pub async fn open_account(
        db: &PgPool,
        school_id: SchoolId,
        dto: OpenMealAccountDto,
    ) -> Result<MealAccount, AppError> {
        StudentService::get_student(db, dto.student_id, Some(school_id)).await?;

        let query = format!(
            "INSERT INTO meal_accounts (school_id, student_id, eligibility, negative_limit_cents)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query_as::<_, MealAccount>(&query)
            .bind(school_id)
            .bind(dto.student_id)
            .bind(dto.eligibility.unwrap_or(MealEligibility::Paid))
            .bind(dto.negative_limit_cents.unwrap_or(0))
            .fetch_one(db)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e
                    && db_err.is_unique_violation()
                {
                    return AppError::bad_request(anyhow::anyhow!(
                        "Student already has a meal account"
                    ));
                }
                error!(error = %e, "Database error opening meal account");
                AppError::from(e)
            })?;

        info!(
            account.id = %account.id,
            student.id = %account.student_id,
            eligibility = %account.eligibility,
            "Meal account opened"
        );
        Ok(account)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "meal_accounts"))]
    pub async fn get_accounts(
        db: &PgPool,
        school_id: SchoolId,
        filters: MealAccountFilterParams,
        pagination: PaginationParams,
    ) -> Result<Paginated<MealAccount>, AppError> {
        let where_clause = "school_id = $1 AND ($2::text IS NULL OR eligibility = $2)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM meal_accounts WHERE {}",
            where_clause
        ))
        .bind(school_id)
        .bind(filters.eligibility)
        .fetch_one(db)
        .await?;

        let query = format!(
            "SELECT {} FROM meal_accounts WHERE {} ORDER BY created_at LIMIT $3 OFFSET $4",
            ACCOUNT_COLUMNS, where_clause
        );
        let accounts = sqlx::query_as::<_, MealAccount>(&query)
            .bind(school_id)
            .bind(filters.eligibility)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        Ok(Paginated::new(accounts, total, &pagination))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "meal_accounts"))]
    pub async fn get_account(
        db: &PgPool,
        id: MealAccountId,
        scope: Option<SchoolId>,
    ) -> Result<MealAccount, AppError> {
        let query = format!(
            "SELECT {} FROM meal_accounts WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)",
            ACCOUNT_COLUMNS
        );
        sqlx::query_as::<_, MealAccount>(&query)
            .bind(id)
            .bind(scope)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Meal account not found")))
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "meal_accounts"))]
    pub async fn get_student_account(
        db: &PgPool,
        student_id: StudentId,
        scope: Option<SchoolId>,
    ) -> Result<MealAccount, AppError> {
        let query = format!(
            "SELECT {} FROM meal_accounts
             WHERE student_id = $1 AND ($2::uuid IS NULL OR school_id = $2)",
            ACCOUNT_COLUMNS
        );
        sqlx::query_as::<_, MealAccount>(&query)
            .bind(student_id)
            .bind(scope)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Meal account not found")))
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "meal_accounts"))]
    pub async fn update_account(
        db: &PgPool,
        id: MealAccountId,
        scope: Option<SchoolId>,
        dto: UpdateMealAccountDto,
    ) -> Result<MealAccount, AppError> {
        let query = format!(
            "UPDATE meal_accounts SET
                eligibility = COALESCE($3, eligibility),
                negative_limit_cents = COALESCE($4, negative_limit_cents),
                updated_at = NOW()
             WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)
             RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query_as::<_, MealAccount>(&query)
            .bind(id)
            .bind(scope)
            .bind(dto.eligibility)
            .bind(dto.negative_limit_cents)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Meal account not found")))?;

        info!(account.id = %id, eligibility = %account.eligibility, "Meal account updated");
        Ok(account)
    }

    async fn lock_account(
        tx: &mut Transaction<'_, Postgres>,
        id: MealAccountId,
        scope: Option<SchoolId>,
    ) -> Result<MealAccount, AppError> {
        let query = format!(
            "SELECT {} FROM meal_accounts
             WHERE id = $1 AND ($2::uuid IS NULL OR school_id = $2)
             FOR UPDATE",
            ACCOUNT_COLUMNS
        );
        sqlx::query_as::<_, MealAccount>(&query)
            .bind(id)
            .bind(scope)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Meal account not found")))
    }

    /// Writes the new balance and its ledger entry inside the caller's
    /// transaction.
    #[allow(clippy::too_many_arguments)]
    async fn post_transaction(
        tx: &mut Transaction<'_, Postgres>,
        account_id: MealAccountId,
        kind: TransactionKind,
        meal_type: Option<MealType>,
        amount_cents: i64,
        balance_after: i64,
        note: Option<&str>,
        created_by: StaffId,
    ) -> Result<MealTransactionResult, AppError> {
        let account = sqlx::query_as::<_, MealAccount>(&format!(
            "UPDATE meal_accounts SET balance_cents = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(account_id)
        .bind(balance_after)
        .fetch_one(&mut **tx)
        .await?;

        let transaction = sqlx::query_as::<_, MealTransaction>(&format!(
            "INSERT INTO meal_transactions
                (account_id, kind, meal_type, amount_cents, balance_after_cents, note, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            TRANSACTION_COLUMNS
        ))
        .bind(account_id)
        .bind(kind)
        .bind(meal_type)
        .bind(amount_cents)
        .bind(balance_after)
        .bind(note)
        .bind(created_by)
        .fetch_one(&mut **tx)
        .await?;

        Ok(MealTransactionResult {
            account,
            transaction,
        })
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "meal_accounts"))]
    pub async fn deposit(
        db: &PgPool,
        id: MealAccountId,
        scope: Option<SchoolId>,
        staff_id: StaffId,
        dto: DepositDto,
    ) -> Result<MealTransactionResult, AppError> {
        let mut tx = db.begin().await?;
        let account = Self::lock_account(&mut tx, id, scope).await?;

        let Some(balance_after) = balance_after_deposit(account.balance_cents, dto.amount_cents)
        else {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Deposit would overflow the account balance"
            )));
        };
        let result = Self::post_transaction(
            &mut tx,
            id,
            TransactionKind::Deposit,
            None,
            dto.amount_cents,
            balance_after,
            dto.note.as_deref(),
            staff_id,
        )
        .await?;

        tx.commit().await?;

        metrics::track_meal_transaction(TransactionKind::Deposit.as_str(), None);
        info!(account.id = %id, amount = dto.amount_cents, balance = balance_after, "Meal deposit");
        Ok(result)
    }

    /// Charges one meal at the account's eligibility price. The account row
    /// stays locked until commit so concurrent purchases see each other.
    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "meal_accounts"))]
    pub async fn purchase(
        db: &PgPool,
        id: MealAccountId,
        scope: Option<SchoolId>,
        staff_id: StaffId,
        dto: PurchaseDto,
    ) -> Result<MealTransactionResult, AppError> {
        let mut tx = db.begin().await?;
        let account = Self::lock_account(&mut tx, id, scope).await?;

        let price = meal_price(account.eligibility, dto.meal_type);
        let Some(balance_after) =
            balance_after_purchase(account.balance_cents, price, account.negative_limit_cents)
        else {
            warn!(
                account.id = %id,
                balance = account.balance_cents,
                price,
                "Meal purchase declined"
            );
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Insufficient balance: {} cents available, meal costs {} cents",
                account.balance_cents + account.negative_limit_cents,
                price
            )));
        };

        let result = Self::post_transaction(
            &mut tx,
            id,
            TransactionKind::Purchase,
            Some(dto.meal_type),
            -price,
            balance_after,
            dto.note.as_deref(),
            staff_id,
        )
        .await?;

        tx.commit().await?;

        metrics::track_meal_transaction(
            TransactionKind::Purchase.as_str(),
            Some(dto.meal_type.as_str()),
        );
        info!(
            account.id = %id,
            meal = %dto.meal_type,
            price,
            balance = balance_after,
            "Meal purchased"
        );
        Ok(result)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "meal_transactions"))]
    pub async fn get_transactions(
        db: &PgPool,
        id: MealAccountId,
        scope: Option<SchoolId>,
        pagination: PaginationParams,
    ) -> Result<Paginated<MealTransaction>, AppError> {
        Self::get_account(db, id, scope).await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM meal_transactions WHERE account_id = $1",
        )
        .bind(id)
        .fetch_one(db)
        .await?;

        let query = format!(
            "SELECT {} FROM meal_transactions WHERE account_id = $1
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            TRANSACTION_COLUMNS
        );
        let transactions = sqlx::query_as::<_, MealTransaction>(&query)
            .bind(id)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        Ok(Paginated::new(transactions, total, &pagination))
    }

    /// Accounts strictly below `threshold_cents`, lowest first.
    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "meal_accounts"))]
    pub async fn low_balance_report(
        db: &PgPool,
        school_id: SchoolId,
        threshold_cents: Option<i64>,
    ) -> Result<Vec<LowBalanceAccount>, AppError> {
        let threshold = threshold_cents.unwrap_or(DEFAULT_LOW_BALANCE_CENTS);

        let accounts = sqlx::query_as::<_, LowBalanceAccount>(
            "SELECT a.id AS account_id, s.id AS student_id, s.student_number,
                    s.first_name, s.last_name, a.eligibility, a.balance_cents
             FROM meal_accounts a
             JOIN students s ON s.id = a.student_id
             WHERE a.school_id = $1 AND a.balance_cents < $2
             ORDER BY a.balance_cents, s.last_name, s.first_name",
        )
        .bind(school_id)
        .bind(threshold)
        .fetch_all(db)
        .await?;
        Ok(accounts)
    }
}
