use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    assess_fee, create_fee_type, delete_fee_type, get_fee_type, get_fee_types, get_payments,
    get_statement, overdue_report, record_payment, update_fee_type, waive_fee,
};

pub fn init_fees_router() -> Router<AppState> {
    Router::new()
        .route("/types", post(create_fee_type).get(get_fee_types))
        .route(
            "/types/{id}",
            get(get_fee_type).put(update_fee_type).delete(delete_fee_type),
        )
        .route("/types/{id}/assess", post(assess_fee))
        .route(
            "/student-fees/{id}/payments",
            post(record_payment).get(get_payments),
        )
        .route("/student-fees/{id}/waive", post(waive_fee))
        .route("/students/{id}/statement", get(get_statement))
        .route("/reports/overdue", get(overdue_report))
}
