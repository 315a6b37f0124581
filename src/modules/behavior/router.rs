use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

use super::controller::{
    add_action, change_incident_status, create_incident, delete_incident, get_incident,
    get_incidents, get_student_summary, update_incident,
};

pub fn init_behavior_router() -> Router<AppState> {
    Router::new()
        .route("/incidents", post(create_incident).get(get_incidents))
        .route(
            "/incidents/{id}",
            get(get_incident)
                .put(update_incident)
                .delete(delete_incident),
        )
        .route("/incidents/{id}/status", patch(change_incident_status))
        .route("/incidents/{id}/actions", post(add_action))
        .route("/students/{id}/summary", get(get_student_summary))
}
