use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{create_staff, deactivate_staff, get_staff, get_staff_list, update_staff};

pub fn init_staff_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_staff).get(get_staff_list))
        .route("/{id}", get(get_staff).put(update_staff))
        .route("/{id}/deactivate", post(deactivate_staff))
}
