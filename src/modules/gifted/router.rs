use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

use super::controller::{
    add_evaluation, change_status, create_record, get_record, get_records, summary,
    update_record, upcoming_reviews,
};

pub fn init_gifted_router() -> Router<AppState> {
    Router::new()
        .route("/records", post(create_record).get(get_records))
        .route("/records/{id}", get(get_record).put(update_record))
        .route("/records/{id}/status", patch(change_status))
        .route("/records/{id}/evaluations", post(add_evaluation))
        .route("/reviews/upcoming", get(upcoming_reviews))
        .route("/summary", get(summary))
}
