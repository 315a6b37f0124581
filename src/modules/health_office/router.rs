use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    create_visit, daily_report, get_profile, get_visit, get_visits, upsert_profile,
};

pub fn init_health_office_router() -> Router<AppState> {
    Router::new()
        .route("/students/{id}/profile", get(get_profile).put(upsert_profile))
        .route("/visits", post(create_visit).get(get_visits))
        .route("/visits/{id}", get(get_visit))
        .route("/daily-report", get(daily_report))
}
