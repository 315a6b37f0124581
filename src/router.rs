use axum::http::{HeaderValue, Method};
use axum::{Json, Router, extract::State, middleware, routing::get};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::middleware::rate_limit::{auth_rate_limit, general_rate_limit};
use crate::modules::academic_years::router::init_academic_years_router;
use crate::modules::attendance::router::init_attendance_router;
use crate::modules::auth::router::init_auth_router;
use crate::modules::behavior::router::init_behavior_router;
use crate::modules::cafeteria::router::init_cafeteria_router;
use crate::modules::fees::router::init_fees_router;
use crate::modules::gifted::router::init_gifted_router;
use crate::modules::gradebook::router::init_gradebook_router;
use crate::modules::health_office::router::init_health_office_router;
use crate::modules::immunizations::router::init_immunizations_router;
use crate::modules::scheduling::router::init_scheduling_router;
use crate::modules::schools::router::init_schools_router;
use crate::modules::staff::router::init_staff_router;
use crate::modules::students::router::init_students_router;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub cache: &'static str,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => "up",
        Err(e) => {
            error!(error = %e, "Health check could not reach the database");
            "down"
        }
    };

    Json(HealthResponse {
        status: "ok",
        database,
        cache: if state.cache.is_some() { "up" } else { "disabled" },
    })
}

pub fn init_router(state: AppState) -> Router {
    let api = Router::new()
        .nest(
            "/auth",
            init_auth_router().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_rate_limit,
            )),
        )
        .nest("/schools", init_schools_router())
        .nest("/staff", init_staff_router())
        .nest("/students", init_students_router())
        .nest("/academic-years", init_academic_years_router())
        .nest("/scheduling", init_scheduling_router())
        .nest("/gradebook", init_gradebook_router())
        .nest("/attendance", init_attendance_router())
        .nest("/behavior", init_behavior_router())
        .nest("/health-office", init_health_office_router())
        .nest("/immunizations", init_immunizations_router())
        .nest("/fees", init_fees_router())
        .nest("/gifted", init_gifted_router())
        .nest("/cafeteria", init_cafeteria_router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            general_rate_limit,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .route("/health", get(health_check))
        .nest("/api", api)
        .with_state(state.clone())
        .layer({
            let allowed_origins: Vec<HeaderValue> = state
                .cors_config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::ACCEPT,
                ])
                .allow_credentials(true)
        })
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
