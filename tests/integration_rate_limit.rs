mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{TEST_PASSWORD, setup_school, test_jwt_config};
use schoolhouse::middleware::rate_limit::RateLimiters;
use schoolhouse::router::init_router;
use schoolhouse::schoolhouse_config::RateLimitConfig;
use schoolhouse::state::AppState;
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;

fn strict_config() -> RateLimitConfig {
    RateLimitConfig {
        general_per_second: 1,
        general_burst_size: 2,
        auth_per_second: 1,
        auth_burst_size: 1,
    }
}

fn app_with(pool: PgPool, config: RateLimitConfig) -> Router {
    let mut state = AppState::new(pool, test_jwt_config());
    state.rate_limiters = Arc::new(RateLimiters::new(&config));
    state.rate_limit_config = config;
    init_router(state)
}

fn login_request(ip: &str, email: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(
            json!({ "email": email, "password": TEST_PASSWORD }).to_string(),
        ))
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_auth_burst_is_per_client(pool: PgPool) {
    let app = app_with(pool, strict_config());

    let response = app
        .clone()
        .oneshot(login_request("192.0.2.1", "nobody@example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(login_request("192.0.2.1", "nobody@example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    let body = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["success"], false);

    // A different client has its own bucket.
    let response = app
        .oneshot(login_request("192.0.2.2", "nobody@example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_general_limit_on_api_routes(pool: PgPool) {
    let school = setup_school(&pool).await;
    let app = app_with(pool, strict_config());

    let request = || {
        Request::builder()
            .method("GET")
            .uri("/api/students")
            .header(header::AUTHORIZATION, format!("Bearer {}", school.admin.token))
            .header("x-forwarded-for", "198.51.100.9")
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..2 {
        let response = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // Health sits outside /api and is never limited.
    let health = Request::builder()
        .uri("/health")
        .header("x-forwarded-for", "198.51.100.9")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(health).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
