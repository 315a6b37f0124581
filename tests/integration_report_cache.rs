mod common;

use axum::Router;
use axum::http::StatusCode;
use common::{
    create_current_year, create_section, create_staff, create_staff_with, create_student, get,
    patch, post, put, setup_school, test_jwt_config,
};
use schoolhouse::router::init_router;
use schoolhouse::schoolhouse_cache::{CacheConfig, RedisCache};
use schoolhouse::state::AppState;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

/// Router backed by Redis, with a key prefix of its own so parallel tests
/// never read each other's entries.
async fn cached_app(pool: PgPool) -> Router {
    let config = CacheConfig {
        key_prefix: format!("schoolhouse-test-{}", Uuid::new_v4().simple()),
        ..CacheConfig::from_env()
    };
    let mut state = AppState::new(pool, test_jwt_config());
    state.cache = Some(RedisCache::new(&config).await.unwrap());
    init_router(state)
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires Redis"]
async fn test_staff_update_refreshes_schedule_reports(pool: PgPool) {
    let school = setup_school(&pool).await;
    let year = create_current_year(&pool, school.id).await;
    let teacher = create_staff_with(&pool, Some(school.id), "teacher", &["English"], 5).await;
    let section = create_section(&pool, school.id, year, 2).await;
    sqlx::query("UPDATE sections SET teacher_id = $1 WHERE id = $2")
        .bind(teacher.id)
        .bind(section)
        .execute(&pool)
        .await
        .unwrap();
    let app = cached_app(pool).await;
    let conflicts_uri = format!("/api/scheduling/conflicts?academic_year_id={}", year);

    let (status, report) = get(&app, &conflicts_uri, &school.admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["by_kind"]["teacher_not_certified"], 1);

    let (status, _) = put(
        &app,
        &format!("/api/staff/{}", teacher.id),
        &school.admin.token,
        json!({ "certifications": ["English", "Mathematics"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, report) = get(&app, &conflicts_uri, &school.admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(report["by_kind"].get("teacher_not_certified").is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires Redis"]
async fn test_student_writes_refresh_compliance_report(pool: PgPool) {
    let school = setup_school(&pool).await;
    let nurse = create_staff(&pool, Some(school.id), "nurse").await;
    let regraded = create_student(&pool, school.id, 0).await;
    let withdrawn = create_student(&pool, school.id, 0).await;
    let app = cached_app(pool).await;

    let (status, _) = post(
        &app,
        "/api/immunizations/requirements",
        &nurse.token,
        json!({
            "vaccine_code": "POLIO",
            "vaccine_name": "Polio",
            "doses_required": 1,
            "grade_levels": [0]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let report_uri = "/api/immunizations/compliance-report";
    let (status, report) = get(&app, report_uri, &nurse.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_students"], 2);
    assert_eq!(report["non_compliant"], 2);

    // Grade 3 has no requirements.
    let (status, _) = put(
        &app,
        &format!("/api/students/{}", regraded),
        &school.admin.token,
        json!({ "grade_level": 3 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, report) = get(&app, report_uri, &nurse.token).await;
    assert_eq!(report["total_students"], 2);
    assert_eq!(report["non_compliant"], 1);

    let (status, _) = patch(
        &app,
        &format!("/api/students/{}/status", withdrawn),
        &school.admin.token,
        json!({ "status": "withdrawn" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, report) = get(&app, report_uri, &nurse.token).await;
    assert_eq!(report["total_students"], 1);
    assert_eq!(report["non_compliant"], 0);
}
