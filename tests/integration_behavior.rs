mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{create_staff, create_student, delete, get, patch, post, put, setup_school, setup_test_app};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_incident_lifecycle(pool: PgPool) {
    let school = setup_school(&pool).await;
    let teacher = create_staff(&pool, Some(school.id), "teacher").await;
    let student = create_student(&pool, school.id, 8).await;
    let app = setup_test_app(pool);
    let today = Utc::now().date_naive();

    let (status, incident) = post(
        &app,
        "/api/behavior/incidents",
        &teacher.token,
        json!({
            "student_id": student,
            "incident_date": today,
            "location": "Cafeteria",
            "category": "Disruption",
            "severity": "moderate",
            "description": "Threw food"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(incident["status"], "reported");
    let uri = format!("/api/behavior/incidents/{}", incident["id"].as_str().unwrap());

    let (status, _) = patch(
        &app,
        &format!("{}/status", uri),
        &school.admin.token,
        json!({ "status": "resolved" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = patch(
        &app,
        &format!("{}/status", uri),
        &school.admin.token,
        json!({ "status": "under_review" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        &app,
        &format!("{}/actions", uri),
        &school.admin.token,
        json!({ "action_type": "detention", "start_date": today, "end_date": today + Duration::days(1) }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, resolved) = patch(
        &app,
        &format!("{}/status", uri),
        &school.admin.token,
        json!({ "status": "resolved", "resolution_notes": "Served detention" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["status"], "resolved");

    let (status, detail) = get(&app, &uri, &school.admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["actions"].as_array().unwrap().len(), 1);

    // Closed incidents are frozen.
    let (status, _) = put(&app, &uri, &school.admin.token, json!({ "location": "Gym" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = delete(&app, &uri, &school.admin.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_incident_rejects_future_date(pool: PgPool) {
    let school = setup_school(&pool).await;
    let student = create_student(&pool, school.id, 8).await;
    let app = setup_test_app(pool);

    let (status, _) = post(
        &app,
        "/api/behavior/incidents",
        &school.admin.token,
        json!({
            "student_id": student,
            "incident_date": Utc::now().date_naive() + Duration::days(2),
            "location": "Hall",
            "category": "Tardy",
            "severity": "minor",
            "description": "Late"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_behavior_summary_points_skip_dismissed(pool: PgPool) {
    let school = setup_school(&pool).await;
    let student = create_student(&pool, school.id, 10).await;
    let app = setup_test_app(pool);
    let today = Utc::now().date_naive();

    let mut ids = Vec::new();
    for severity in ["minor", "major", "severe"] {
        let (_, incident) = post(
            &app,
            "/api/behavior/incidents",
            &school.admin.token,
            json!({
                "student_id": student,
                "incident_date": today,
                "location": "Classroom",
                "category": "Conduct",
                "severity": severity,
                "description": "Incident"
            }),
        )
        .await;
        ids.push(incident["id"].as_str().unwrap().to_string());
    }

    let (status, _) = patch(
        &app,
        &format!("/api/behavior/incidents/{}/status", ids[2]),
        &school.admin.token,
        json!({ "status": "dismissed" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, summary) = get(
        &app,
        &format!("/api/behavior/students/{}/summary", student),
        &school.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["minor"], 1);
    assert_eq!(summary["major"], 1);
    assert_eq!(summary["severe"], 0);
    assert_eq!(summary["points"], 6);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_closures_apply_once(pool: PgPool) {
    let school = setup_school(&pool).await;
    let student = create_student(&pool, school.id, 6).await;
    let app = setup_test_app(pool);
    let token = &school.admin.token;

    let (status, incident) = post(
        &app,
        "/api/behavior/incidents",
        token,
        json!({
            "student_id": student,
            "incident_date": Utc::now().date_naive(),
            "location": "Gym",
            "category": "Conflict",
            "severity": "minor",
            "description": "Argument during class"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/behavior/incidents/{}", incident["id"].as_str().unwrap());
    let status_uri = format!("{}/status", uri);

    let (status, _) = patch(&app, &status_uri, token, json!({ "status": "under_review" })).await;
    assert_eq!(status, StatusCode::OK);

    let (resolved, dismissed) = tokio::join!(
        patch(&app, &status_uri, token, json!({ "status": "resolved", "resolution_notes": "Mediated" })),
        patch(&app, &status_uri, token, json!({ "status": "dismissed" })),
    );
    let mut statuses = [resolved.0, dismissed.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);

    let winner = if resolved.0 == StatusCode::OK { "resolved" } else { "dismissed" };
    let (_, detail) = get(&app, &uri, token).await;
    assert_eq!(detail["incident"]["status"], winner);

    // Closed either way, so edits are refused.
    let (status, _) = put(&app, &uri, token, json!({ "location": "Hallway" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
