#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use schoolhouse::router::init_router;
use schoolhouse::schoolhouse_auth::create_access_token;
use schoolhouse::schoolhouse_config::JwtConfig;
use schoolhouse::schoolhouse_core::hash_password;
use schoolhouse::schoolhouse_core::permissions::permissions_for_role;
use schoolhouse::state::AppState;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "testpass123";

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "integration-test-secret".to_string(),
        access_token_expiry: 3600,
        refresh_token_expiry: 604800,
    }
}

pub fn setup_test_app(pool: PgPool) -> Router {
    init_router(AppState::new(pool, test_jwt_config()))
}

pub fn unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

pub fn unique_name(prefix: &str) -> String {
    format!("{} {}", prefix, Uuid::new_v4())
}

pub async fn create_school(pool: &PgPool) -> Uuid {
    sqlx::query_scalar("INSERT INTO schools (name) VALUES ($1) RETURNING id")
        .bind(unique_name("School"))
        .fetch_one(pool)
        .await
        .unwrap()
}

pub struct TestStaff {
    pub id: Uuid,
    pub email: String,
    pub school_id: Option<Uuid>,
    pub role: &'static str,
    pub token: String,
}

/// Inserts a staff row and mints an access token for it.
pub async fn create_staff(pool: &PgPool, school_id: Option<Uuid>, role: &'static str) -> TestStaff {
    create_staff_with(pool, school_id, role, &[], 5).await
}

pub async fn create_staff_with(
    pool: &PgPool,
    school_id: Option<Uuid>,
    role: &'static str,
    certifications: &[&str],
    max_sections: i32,
) -> TestStaff {
    let email = unique_email();
    let certifications: Vec<String> = certifications.iter().map(|c| c.to_string()).collect();
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO staff (school_id, first_name, last_name, email, password, role, certifications, max_sections)
         VALUES ($1, 'Test', 'Staff', $2, $3, $4, $5, $6)
         RETURNING id",
    )
    .bind(school_id)
    .bind(&email)
    .bind(hash_password(TEST_PASSWORD).unwrap())
    .bind(role)
    .bind(&certifications)
    .bind(max_sections)
    .fetch_one(pool)
    .await
    .unwrap();

    let permissions = permissions_for_role(role)
        .into_iter()
        .map(String::from)
        .collect();
    let token =
        create_access_token(id, &email, school_id, role, permissions, &test_jwt_config()).unwrap();

    TestStaff {
        id,
        email,
        school_id,
        role,
        token,
    }
}

pub async fn create_student(pool: &PgPool, school_id: Uuid, grade_level: i32) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO students (school_id, student_number, first_name, last_name, grade_level)
         VALUES ($1, $2, 'Test', 'Student', $3)
         RETURNING id",
    )
    .bind(school_id)
    .bind(format!("S-{}", &Uuid::new_v4().simple().to_string()[..10]))
    .bind(grade_level)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_current_year(pool: &PgPool, school_id: Uuid) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO academic_years (school_id, name, start_date, end_date, is_current)
         VALUES ($1, '2025-2026', '2025-08-15', '2026-06-15', TRUE)
         RETURNING id",
    )
    .bind(school_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// A school with an admin account, the starting point of most tests.
pub struct TestSchool {
    pub id: Uuid,
    pub admin: TestStaff,
}

pub async fn setup_school(pool: &PgPool) -> TestSchool {
    let id = create_school(pool).await;
    let admin = create_staff(pool, Some(id), "admin").await;
    TestSchool { id, admin }
}

/// Sends one request through the router and returns the status with the
/// parsed JSON body (`Value::Null` for empty bodies).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

pub async fn get(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, Some(token), None).await
}

pub async fn post(app: &Router, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(token), Some(body)).await
}

pub async fn put(app: &Router, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    send(app, "PUT", uri, Some(token), Some(body)).await
}

pub async fn patch(app: &Router, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    send(app, "PATCH", uri, Some(token), Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(app, "DELETE", uri, Some(token), None).await
}

/// Inserts a course and one Mon-Fri section of it in the school's year.
pub async fn create_section(pool: &PgPool, school_id: Uuid, academic_year_id: Uuid, period: i32) -> Uuid {
    let course_id: Uuid = sqlx::query_scalar(
        "INSERT INTO courses (school_id, code, name, subject)
         VALUES ($1, $2, 'Test Course', 'Mathematics')
         RETURNING id",
    )
    .bind(school_id)
    .bind(format!("C-{}", &Uuid::new_v4().simple().to_string()[..8]))
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query_scalar(
        "INSERT INTO sections (school_id, course_id, academic_year_id, period, meeting_days, capacity)
         VALUES ($1, $2, $3, $4, 31, 30)
         RETURNING id",
    )
    .bind(school_id)
    .bind(course_id)
    .bind(academic_year_id)
    .bind(period)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn enroll(pool: &PgPool, section_id: Uuid, student_id: Uuid) {
    sqlx::query("INSERT INTO enrollments (section_id, student_id) VALUES ($1, $2)")
        .bind(section_id)
        .bind(student_id)
        .execute(pool)
        .await
        .unwrap();
}
