use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    create_assignment, create_category, delete_assignment, delete_category, get_assignment,
    get_assignments, get_categories, get_scores, get_section_report, get_student_grade,
    record_scores, update_assignment, update_category,
};

pub fn init_gradebook_router() -> Router<AppState> {
    Router::new()
        .route(
            "/sections/{id}/categories",
            post(create_category).get(get_categories),
        )
        .route(
            "/sections/{id}/assignments",
            post(create_assignment).get(get_assignments),
        )
        .route(
            "/sections/{id}/students/{student_id}/grade",
            get(get_student_grade),
        )
        .route("/sections/{id}/report", get(get_section_report))
        .route(
            "/categories/{id}",
            put(update_category).delete(delete_category),
        )
        .route(
            "/assignments/{id}",
            get(get_assignment)
                .put(update_assignment)
                .delete(delete_assignment),
        )
        .route("/assignments/{id}/scores", put(record_scores).get(get_scores))
}
