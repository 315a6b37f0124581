mod common;

use axum::http::StatusCode;
use common::{create_staff, get, post, setup_school, setup_test_app, unique_email};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_creates_teacher_in_own_school(pool: PgPool) {
    let school = setup_school(&pool).await;
    let app = setup_test_app(pool);

    let (status, body) = post(
        &app,
        "/api/staff",
        &school.admin.token,
        json!({
            "first_name": "Ada",
            "last_name": "Byron",
            "email": unique_email(),
            "password": "password123",
            "role": "teacher",
            "certifications": ["Mathematics"],
            "max_sections": 4
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["school_id"], school.id.to_string());
    assert_eq!(body["certifications"][0], "Mathematics");
    assert_eq!(body["is_active"], true);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cannot_create_system_admin_over_api(pool: PgPool) {
    let school = setup_school(&pool).await;
    let app = setup_test_app(pool);

    let (status, _) = post(
        &app,
        "/api/staff",
        &school.admin.token,
        json!({
            "first_name": "Root",
            "last_name": "User",
            "email": unique_email(),
            "password": "password123",
            "role": "system_admin"
        }),
    )
    .await;
    assert!(status == StatusCode::BAD_REQUEST || status == StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_teacher_cannot_create_staff(pool: PgPool) {
    let school = setup_school(&pool).await;
    let teacher = create_staff(&pool, Some(school.id), "teacher").await;
    let app = setup_test_app(pool);

    let (status, _) = post(
        &app,
        "/api/staff",
        &teacher.token,
        json!({
            "first_name": "A",
            "last_name": "B",
            "email": unique_email(),
            "password": "password123",
            "role": "teacher"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_staff_of_other_school_not_visible(pool: PgPool) {
    let school = setup_school(&pool).await;
    let other = setup_school(&pool).await;
    let app = setup_test_app(pool);

    let (status, _) = get(
        &app,
        &format!("/api/staff/{}", other.admin.id),
        &school.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deactivate_staff(pool: PgPool) {
    let school = setup_school(&pool).await;
    let teacher = create_staff(&pool, Some(school.id), "teacher").await;
    let app = setup_test_app(pool);

    let (status, body) = post(
        &app,
        &format!("/api/staff/{}/deactivate", teacher.id),
        &school.admin.token,
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);

    let (status, _) = post(
        &app,
        &format!("/api/staff/{}/deactivate", school.admin.id),
        &school.admin.token,
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
