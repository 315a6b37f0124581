mod common;

use axum::Router;
use axum::http::StatusCode;
use common::{
    TestSchool, create_current_year, create_staff_with, create_student, delete, get, post,
    setup_school, setup_test_app,
};
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

// Mon/Wed/Fri
const MWF: i32 = 1 | 4 | 16;
// Tue/Thu
const TTH: i32 = 2 | 8;

async fn create_course(app: &Router, school: &TestSchool, code: &str, subject: &str) -> Value {
    let (status, body) = post(
        app,
        "/api/scheduling/courses",
        &school.admin.token,
        json!({ "code": code, "name": format!("{} course", subject), "subject": subject }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

async fn create_section(
    app: &Router,
    school: &TestSchool,
    body: Value,
) -> (StatusCode, Value) {
    post(app, "/api/scheduling/sections", &school.admin.token, body).await
}

#[sqlx::test(migrations = "./migrations")]
async fn test_rooms_and_courses(pool: PgPool) {
    let school = setup_school(&pool).await;
    let app = setup_test_app(pool);

    let (status, room) = post(
        &app,
        "/api/scheduling/rooms",
        &school.admin.token,
        json!({ "name": "Lab 1", "room_type": "lab", "capacity": 24 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(room["room_type"], "lab");

    let (status, _) = post(
        &app,
        "/api/scheduling/rooms",
        &school.admin.token,
        json!({ "name": "Lab 1", "room_type": "classroom", "capacity": 30 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &app,
        "/api/scheduling/rooms",
        &school.admin.token,
        json!({ "name": "Pool", "room_type": "pool", "capacity": 30 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    create_course(&app, &school, "BIO-1", "Science").await;
    let (status, list) = get(&app, "/api/scheduling/courses", &school.admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["meta"]["total"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_section_rejects_foreign_course(pool: PgPool) {
    let school = setup_school(&pool).await;
    let other = setup_school(&pool).await;
    let year = create_current_year(&pool, school.id).await;
    let app = setup_test_app(pool);

    let foreign_course = create_course(&app, &other, "ALG-1", "Mathematics").await;
    let (status, _) = create_section(
        &app,
        &school,
        json!({
            "course_id": foreign_course["id"],
            "academic_year_id": year,
            "period": 1,
            "meeting_days": MWF,
            "capacity": 20
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_section_teacher_must_be_teacher(pool: PgPool) {
    let school = setup_school(&pool).await;
    let year = create_current_year(&pool, school.id).await;
    let app = setup_test_app(pool);
    let course = create_course(&app, &school, "ENG-9", "English").await;

    let (status, _) = create_section(
        &app,
        &school,
        json!({
            "course_id": course["id"],
            "academic_year_id": year,
            "teacher_id": school.admin.id,
            "period": 2,
            "meeting_days": MWF,
            "capacity": 20
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_enrollment_rules(pool: PgPool) {
    let school = setup_school(&pool).await;
    let year = create_current_year(&pool, school.id).await;
    let first = create_student(&pool, school.id, 9).await;
    let second = create_student(&pool, school.id, 9).await;
    let app = setup_test_app(pool);

    let algebra = create_course(&app, &school, "ALG-1", "Mathematics").await;
    let art = create_course(&app, &school, "ART-1", "Art").await;
    let (_, section) = create_section(
        &app,
        &school,
        json!({
            "course_id": algebra["id"],
            "academic_year_id": year,
            "period": 1,
            "meeting_days": MWF,
            "capacity": 1
        }),
    )
    .await;
    let (_, clashing) = create_section(
        &app,
        &school,
        json!({
            "course_id": art["id"],
            "academic_year_id": year,
            "period": 1,
            "meeting_days": 1,
            "capacity": 10
        }),
    )
    .await;
    let enroll_uri = format!("/api/scheduling/sections/{}/enrollments", section["id"].as_str().unwrap());

    let (status, _) = post(&app, &enroll_uri, &school.admin.token, json!({ "student_id": first })).await;
    assert_eq!(status, StatusCode::CREATED);

    // Already enrolled
    let (status, _) = post(&app, &enroll_uri, &school.admin.token, json!({ "student_id": first })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Full
    let (status, body) = post(&app, &enroll_uri, &school.admin.token, json!({ "student_id": second })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Section is full");

    // Same period on Monday
    let (status, _) = post(
        &app,
        &format!("/api/scheduling/sections/{}/enrollments", clashing["id"].as_str().unwrap()),
        &school.admin.token,
        json!({ "student_id": first }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, roster) = get(&app, &enroll_uri, &school.admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roster.as_array().unwrap().len(), 1);

    let (status, _) = delete(&app, &format!("{}/{}", enroll_uri, first), &school.admin.token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = post(&app, &enroll_uri, &school.admin.token, json!({ "student_id": second })).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_conflicts_and_health(pool: PgPool) {
    let school = setup_school(&pool).await;
    let year = create_current_year(&pool, school.id).await;
    let teacher = create_staff_with(&pool, Some(school.id), "teacher", &["English"], 5).await;
    let app = setup_test_app(pool);

    let algebra = create_course(&app, &school, "ALG-1", "Mathematics").await;
    let geometry = create_course(&app, &school, "GEO-1", "Mathematics").await;
    for (course, days) in [(&algebra, MWF), (&geometry, 1)] {
        let (status, _) = create_section(
            &app,
            &school,
            json!({
                "course_id": course["id"],
                "academic_year_id": year,
                "teacher_id": teacher.id,
                "period": 3,
                "meeting_days": days,
                "capacity": 25
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, report) = get(
        &app,
        &format!("/api/scheduling/conflicts?academic_year_id={}", year),
        &school.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["section_count"], 2);
    assert_eq!(report["by_kind"]["teacher_double_booked"], 1);
    assert!(report["by_kind"]["teacher_not_certified"].as_u64().unwrap() >= 1);
    assert!(report["errors"].as_u64().unwrap() >= 1);

    let (status, health) = get(
        &app,
        &format!("/api/scheduling/health?academic_year_id={}", year),
        &school.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(health["score"].as_i64().unwrap() < 100);
    assert_eq!(health["unassigned_teacher_pct"], 0.0);
    assert_eq!(health["unassigned_room_pct"], 100.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_assign_teachers_prefers_certified(pool: PgPool) {
    let school = setup_school(&pool).await;
    let year = create_current_year(&pool, school.id).await;
    let uncertified = create_staff_with(&pool, Some(school.id), "teacher", &["Art"], 5).await;
    let certified = create_staff_with(&pool, Some(school.id), "teacher", &["Mathematics"], 5).await;
    let app = setup_test_app(pool.clone());

    let algebra = create_course(&app, &school, "ALG-1", "Mathematics").await;
    let (_, section) = create_section(
        &app,
        &school,
        json!({
            "course_id": algebra["id"],
            "academic_year_id": year,
            "period": 4,
            "meeting_days": TTH,
            "capacity": 25
        }),
    )
    .await;

    let (status, plan) = post(
        &app,
        "/api/scheduling/assign-teachers",
        &school.admin.token,
        json!({ "academic_year_id": year, "dry_run": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan["assigned"], 1);
    assert_eq!(plan["plan"][0]["resource_id"], certified.id.to_string());
    assert_ne!(plan["plan"][0]["resource_id"], uncertified.id.to_string());

    let section_id: Uuid = section["id"].as_str().unwrap().parse().unwrap();
    let teacher: Option<Uuid> = sqlx::query_scalar("SELECT teacher_id FROM sections WHERE id = $1")
        .bind(section_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(teacher, None);

    let (status, applied) = post(
        &app,
        "/api/scheduling/assign-teachers",
        &school.admin.token,
        json!({ "academic_year_id": year, "dry_run": false }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(applied["dry_run"], false);

    let teacher: Option<Uuid> = sqlx::query_scalar("SELECT teacher_id FROM sections WHERE id = $1")
        .bind(section_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(teacher, Some(certified.id));
}
