mod common;

use axum::http::StatusCode;
use chrono::{Duration, Months, Utc};
use common::{create_staff, create_student, get, patch, post, put, setup_school, setup_test_app};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_referral_to_enrollment(pool: PgPool) {
    let school = setup_school(&pool).await;
    let counselor = create_staff(&pool, Some(school.id), "counselor").await;
    let student = create_student(&pool, school.id, 5).await;
    let app = setup_test_app(pool);

    let (status, record) = post(
        &app,
        "/api/gifted/records",
        &counselor.token,
        json!({
            "student_id": student,
            "referral_source": "Teacher nomination",
            "areas": ["intellectual", "creative", "intellectual"]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["status"], "referred");
    assert_eq!(record["areas"], json!(["intellectual", "creative"]));
    let record_uri = format!("/api/gifted/records/{}", record["id"].as_str().unwrap());

    let (status, _) = post(
        &app,
        "/api/gifted/records",
        &counselor.token,
        json!({ "student_id": student, "referral_source": "Parent", "areas": ["arts"] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Skipping screening is not allowed.
    let status_uri = format!("{}/status", record_uri);
    let (status, _) = patch(&app, &status_uri, &counselor.token, json!({ "status": "evaluated" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = patch(&app, &status_uri, &counselor.token, json!({ "status": "screening" })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = patch(&app, &status_uri, &counselor.token, json!({ "status": "evaluated" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("evaluation"));

    let today = Utc::now().date_naive();
    let (status, evaluation) = post(
        &app,
        &format!("{}/evaluations", record_uri),
        &counselor.token,
        json!({
            "instrument": "CogAT",
            "score": 131.0,
            "percentile": 98,
            "evaluated_on": today.to_string()
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(evaluation["percentile"], 98);

    for next in ["evaluated", "eligible"] {
        let (status, _) = patch(&app, &status_uri, &counselor.token, json!({ "status": next })).await;
        assert_eq!(status, StatusCode::OK);
    }

    // Review dates only exist once enrolled.
    let (status, _) = put(
        &app,
        &record_uri,
        &counselor.token,
        json!({ "next_review_date": (today + Duration::days(10)).to_string() }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, enrolled) = patch(&app, &status_uri, &counselor.token, json!({ "status": "enrolled" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(enrolled["eligibility_date"], today.to_string());
    let annual = today.checked_add_months(Months::new(12)).unwrap();
    assert_eq!(enrolled["next_review_date"], annual.to_string());

    let (status, detail) = get(&app, &record_uri, &counselor.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["record"]["status"], "enrolled");
    assert_eq!(detail["evaluations"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_upcoming_reviews_and_summary(pool: PgPool) {
    let school = setup_school(&pool).await;
    let token = &school.admin.token;
    let first = create_student(&pool, school.id, 6).await;
    let second = create_student(&pool, school.id, 6).await;
    let teacher = create_staff(&pool, Some(school.id), "teacher").await;
    let app = setup_test_app(pool);

    let mut uris = Vec::new();
    for student in [first, second] {
        let (status, record) = post(
            &app,
            "/api/gifted/records",
            token,
            json!({ "student_id": student, "referral_source": "Screening", "areas": ["academic"] }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        uris.push(format!("/api/gifted/records/{}", record["id"].as_str().unwrap()));
    }

    let today = Utc::now().date_naive();
    let enrolled_uri = &uris[0];
    let (status, _) = patch(&app, &format!("{}/status", enrolled_uri), token, json!({ "status": "screening" })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post(
        &app,
        &format!("{}/evaluations", enrolled_uri),
        token,
        json!({ "instrument": "NNAT", "score": 125.5, "percentile": 95, "evaluated_on": today.to_string() }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    for next in ["evaluated", "eligible", "enrolled"] {
        let (status, _) = patch(&app, &format!("{}/status", enrolled_uri), token, json!({ "status": next })).await;
        assert_eq!(status, StatusCode::OK);
    }

    // The annual review is a year out, outside the default window.
    let (status, upcoming) = get(&app, "/api/gifted/reviews/upcoming", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(upcoming.as_array().unwrap().len(), 0);

    let (status, _) = put(
        &app,
        enrolled_uri,
        token,
        json!({ "next_review_date": (today + Duration::days(10)).to_string() }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, upcoming) = get(&app, "/api/gifted/reviews/upcoming?days=30", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(upcoming.as_array().unwrap().len(), 1);

    let (status, upcoming) = get(&app, "/api/gifted/reviews/upcoming?days=5", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(upcoming.as_array().unwrap().len(), 0);

    let (status, _) = get(&app, "/api/gifted/reviews/upcoming?days=400", token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, summary) = get(&app, "/api/gifted/summary", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["referred"], 1);
    assert_eq!(summary["enrolled"], 1);
    assert_eq!(summary["exited"], 0);

    // Teachers can read but not change the program.
    let (status, _) = get(&app, "/api/gifted/records", &teacher.token).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = patch(&app, &format!("{}/status", uris[1]), &teacher.token, json!({ "status": "screening" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_status_changes_apply_once(pool: PgPool) {
    let school = setup_school(&pool).await;
    let student = create_student(&pool, school.id, 4).await;
    let app = setup_test_app(pool);
    let token = &school.admin.token;

    let (status, record) = post(
        &app,
        "/api/gifted/records",
        token,
        json!({ "student_id": student, "referral_source": "Parent", "areas": ["leadership"] }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let record_uri = format!("/api/gifted/records/{}", record["id"].as_str().unwrap());
    let status_uri = format!("{}/status", record_uri);

    let (first, second) = tokio::join!(
        patch(&app, &status_uri, token, json!({ "status": "screening" })),
        patch(&app, &status_uri, token, json!({ "status": "screening" })),
    );
    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);

    let (_, detail) = get(&app, &record_uri, token).await;
    assert_eq!(detail["record"]["status"], "screening");
}
