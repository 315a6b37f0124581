use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

use super::controller::{
    compliance_report, create_exemption, create_record, create_requirement, delete_exemption,
    delete_record, delete_requirement, get_exemptions, get_records, get_requirement,
    get_requirements, get_student_compliance, update_requirement,
};

pub fn init_immunizations_router() -> Router<AppState> {
    Router::new()
        .route("/requirements", post(create_requirement).get(get_requirements))
        .route(
            "/requirements/{id}",
            get(get_requirement)
                .put(update_requirement)
                .delete(delete_requirement),
        )
        .route("/students/{id}/records", post(create_record).get(get_records))
        .route("/records/{id}", delete(delete_record))
        .route(
            "/students/{id}/exemptions",
            post(create_exemption).get(get_exemptions),
        )
        .route("/exemptions/{id}", delete(delete_exemption))
        .route("/students/{id}/compliance", get(get_student_compliance))
        .route("/compliance-report", get(compliance_report))
}
