use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

use super::controller::{
    assign_rooms, assign_teachers, create_course, create_room, create_section, delete_course,
    delete_room, delete_section, drop_student, enroll_student, get_conflicts, get_course,
    get_courses, get_health, get_room, get_roster, get_rooms, get_section, get_sections,
    update_course, update_room, update_section,
};

pub fn init_scheduling_router() -> Router<AppState> {
    Router::new()
        .route("/rooms", post(create_room).get(get_rooms))
        .route(
            "/rooms/{id}",
            get(get_room).put(update_room).delete(delete_room),
        )
        .route("/courses", post(create_course).get(get_courses))
        .route(
            "/courses/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/sections", post(create_section).get(get_sections))
        .route(
            "/sections/{id}",
            get(get_section).put(update_section).delete(delete_section),
        )
        .route(
            "/sections/{id}/enrollments",
            post(enroll_student).get(get_roster),
        )
        .route(
            "/sections/{id}/enrollments/{student_id}",
            delete(drop_student),
        )
        .route("/conflicts", get(get_conflicts))
        .route("/health", get(get_health))
        .route("/assign-teachers", post(assign_teachers))
        .route("/assign-rooms", post(assign_rooms))
}
