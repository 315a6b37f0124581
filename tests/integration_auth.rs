mod common;

use axum::http::StatusCode;
use common::{TEST_PASSWORD, create_staff, get, send, setup_school, setup_test_app};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_login_returns_tokens_and_staff(pool: PgPool) {
    let school = setup_school(&pool).await;
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": school.admin.email, "password": TEST_PASSWORD })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].as_str().is_some());
    assert!(body["refresh_token"].as_str().is_some());
    assert_eq!(body["staff"]["role"], "admin");
    assert!(body["staff"].get("password").is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_is_case_insensitive_on_email(pool: PgPool) {
    let school = setup_school(&pool).await;
    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": school.admin.email.to_uppercase(), "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_wrong_password(pool: PgPool) {
    let school = setup_school(&pool).await;
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": school.admin.email, "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_unknown_email(pool: PgPool) {
    let app = setup_test_app(pool);
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@test.com", "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_deactivated_staff_forbidden(pool: PgPool) {
    let school = setup_school(&pool).await;
    let teacher = create_staff(&pool, Some(school.id), "teacher").await;
    sqlx::query("UPDATE staff SET is_active = FALSE WHERE id = $1")
        .bind(teacher.id)
        .execute(&pool)
        .await
        .unwrap();
    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": teacher.email, "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_refresh_issues_new_access_token(pool: PgPool) {
    let school = setup_school(&pool).await;
    let app = setup_test_app(pool);

    let (_, login) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": school.admin.email, "password": TEST_PASSWORD })),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh_token": login["refresh_token"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["access_token"].as_str().unwrap();

    let (status, me) = get(&app, "/api/auth/me", access).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], school.admin.email.as_str());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_refresh_rejects_access_token(pool: PgPool) {
    let school = setup_school(&pool).await;
    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh_token": school.admin.token })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_protected_route_requires_token(pool: PgPool) {
    let app = setup_test_app(pool);
    let (status, _) = send(&app, "GET", "/api/students", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_health_endpoint_reports_database(pool: PgPool) {
    let app = setup_test_app(pool);
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "up");
    assert_eq!(body["cache"], "disabled");
}
