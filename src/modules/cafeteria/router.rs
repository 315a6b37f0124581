use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    deposit, get_account, get_accounts, get_student_account, get_transactions,
    low_balance_report, open_account, purchase, update_account,
};

pub fn init_cafeteria_router() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(open_account).get(get_accounts))
        .route("/accounts/{id}", get(get_account).put(update_account))
        .route("/accounts/{id}/deposits", post(deposit))
        .route("/accounts/{id}/purchases", post(purchase))
        .route("/accounts/{id}/transactions", get(get_transactions))
        .route("/students/{id}/account", get(get_student_account))
        .route("/reports/low-balance", get(low_balance_report))
}
