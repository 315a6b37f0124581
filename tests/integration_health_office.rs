mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{create_staff, create_student, get, post, put, setup_school, setup_test_app};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_profile_upsert_and_permissions(pool: PgPool) {
    let school = setup_school(&pool).await;
    let nurse = create_staff(&pool, Some(school.id), "nurse").await;
    let teacher = create_staff(&pool, Some(school.id), "teacher").await;
    let student = create_student(&pool, school.id, 3).await;
    let app = setup_test_app(pool);
    let uri = format!("/api/health-office/students/{}/profile", student);

    let (status, _) = get(&app, &uri, &nurse.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, profile) = put(
        &app,
        &uri,
        &nurse.token,
        json!({
            "allergies": ["Peanuts"],
            "emergency_contact_name": "Pat Doe",
            "emergency_contact_phone": "555-0101"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["allergies"][0], "Peanuts");

    let (status, profile) = put(&app, &uri, &nurse.token, json!({ "medications": ["Inhaler"] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["medications"][0], "Inhaler");
    assert_eq!(profile["allergies"].as_array().unwrap().len(), 0);

    let (status, _) = get(&app, &uri, &teacher.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_visits_and_daily_report(pool: PgPool) {
    let school = setup_school(&pool).await;
    let nurse = create_staff(&pool, Some(school.id), "nurse").await;
    let first = create_student(&pool, school.id, 3).await;
    let second = create_student(&pool, school.id, 4).await;
    let app = setup_test_app(pool);

    for (student, disposition) in [
        (first, "returned_to_class"),
        (first, "sent_home"),
        (second, "returned_to_class"),
    ] {
        let (status, visit) = post(
            &app,
            "/api/health-office/visits",
            &nurse.token,
            json!({ "student_id": student, "reason": "Headache", "disposition": disposition }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(visit["staff_id"], nurse.id.to_string());
    }

    let (status, _) = post(
        &app,
        "/api/health-office/visits",
        &nurse.token,
        json!({
            "student_id": first,
            "reason": "Time travel",
            "disposition": "sent_home",
            "arrived_at": Utc::now() + Duration::hours(2)
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, report) = get(&app, "/api/health-office/daily-report", &nurse.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_visits"], 3);
    assert_eq!(report["unique_students"], 2);

    let (status, visits) = get(
        &app,
        &format!("/api/health-office/visits?student_id={}", first),
        &nurse.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(visits["meta"]["total"], 2);
}
