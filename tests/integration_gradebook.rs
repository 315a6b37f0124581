mod common;

use axum::http::StatusCode;
use common::{
    create_current_year, create_section, create_staff, create_student, enroll, get, post, put,
    setup_school, setup_test_app,
};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_weighted_grade_and_report(pool: PgPool) {
    let school = setup_school(&pool).await;
    let teacher = create_staff(&pool, Some(school.id), "teacher").await;
    let year = create_current_year(&pool, school.id).await;
    let section = create_section(&pool, school.id, year, 1).await;
    let strong = create_student(&pool, school.id, 9).await;
    let weak = create_student(&pool, school.id, 9).await;
    enroll(&pool, section, strong).await;
    enroll(&pool, section, weak).await;
    let app = setup_test_app(pool);
    let token = &teacher.token;

    let (status, homework) = post(
        &app,
        &format!("/api/gradebook/sections/{}/categories", section),
        token,
        json!({ "name": "Homework", "weight": 40.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, tests) = post(
        &app,
        &format!("/api/gradebook/sections/{}/categories", section),
        token,
        json!({ "name": "Tests", "weight": 60.0 }),
    )
    .await;

    let (status, hw1) = post(
        &app,
        &format!("/api/gradebook/sections/{}/assignments", section),
        token,
        json!({ "category_id": homework["id"], "title": "HW 1", "max_points": 10.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, test1) = post(
        &app,
        &format!("/api/gradebook/sections/{}/assignments", section),
        token,
        json!({ "category_id": tests["id"], "title": "Unit Test", "max_points": 100.0 }),
    )
    .await;

    let hw1_id = hw1["id"].as_str().unwrap();
    let test1_id = test1["id"].as_str().unwrap();

    let (status, scores) = put(
        &app,
        &format!("/api/gradebook/assignments/{}/scores", hw1_id),
        token,
        json!({ "scores": [
            { "student_id": strong, "points": 8.0 },
            { "student_id": weak, "points": 5.0 }
        ] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scores.as_array().unwrap().len(), 2);

    let (status, _) = put(
        &app,
        &format!("/api/gradebook/assignments/{}/scores", test1_id),
        token,
        json!({ "scores": [
            { "student_id": strong, "points": 90.0 },
            { "student_id": weak, "excused": true }
        ] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // 0.4 * 80 + 0.6 * 90
    let (status, grade) = get(
        &app,
        &format!("/api/gradebook/sections/{}/students/{}/grade", section, strong),
        token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(grade["percentage"], 86.0);
    assert_eq!(grade["letter"], "B");

    // Excused test leaves homework as the only graded category.
    let (_, grade) = get(
        &app,
        &format!("/api/gradebook/sections/{}/students/{}/grade", section, weak),
        token,
    )
    .await;
    assert_eq!(grade["percentage"], 50.0);
    assert_eq!(grade["letter"], "F");

    let (status, report) = get(&app, &format!("/api/gradebook/sections/{}/report", section), token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["students"].as_array().unwrap().len(), 2);
    assert_eq!(report["class_average"], 68.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_score_rules(pool: PgPool) {
    let school = setup_school(&pool).await;
    let year = create_current_year(&pool, school.id).await;
    let section = create_section(&pool, school.id, year, 2).await;
    let enrolled = create_student(&pool, school.id, 9).await;
    let outsider = create_student(&pool, school.id, 9).await;
    enroll(&pool, section, enrolled).await;
    let app = setup_test_app(pool);
    let token = &school.admin.token;

    let (_, category) = post(
        &app,
        &format!("/api/gradebook/sections/{}/categories", section),
        token,
        json!({ "name": "Quizzes", "weight": 100.0 }),
    )
    .await;
    let (_, quiz) = post(
        &app,
        &format!("/api/gradebook/sections/{}/assignments", section),
        token,
        json!({ "category_id": category["id"], "title": "Quiz", "max_points": 20.0 }),
    )
    .await;
    let scores_uri = format!("/api/gradebook/assignments/{}/scores", quiz["id"].as_str().unwrap());

    let (status, _) = put(
        &app,
        &scores_uri,
        token,
        json!({ "scores": [{ "student_id": enrolled, "points": 25.0 }] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = put(
        &app,
        &scores_uri,
        token,
        json!({ "scores": [{ "student_id": outsider, "points": 10.0 }] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = put(
        &app,
        &scores_uri,
        token,
        json!({ "scores": [{ "student_id": enrolled, "points": 18.0 }] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Re-submitting overwrites the earlier score.
    let (_, scores) = put(
        &app,
        &scores_uri,
        token,
        json!({ "scores": [{ "student_id": enrolled, "points": 15.0 }] }),
    )
    .await;
    assert_eq!(scores[0]["points"], 15.0);

    let (status, _) = put(
        &app,
        &scores_uri,
        token,
        json!({
            "scores": [
                { "student_id": enrolled, "points": 19.0 },
                { "student_id": enrolled, "points": 5.0 }
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, scores) = get(&app, &scores_uri, token).await;
    assert_eq!(scores.as_array().unwrap().len(), 1);
    assert_eq!(scores[0]["points"], 15.0);

    let (status, _) = put(
        &app,
        &format!("/api/gradebook/assignments/{}", quiz["id"].as_str().unwrap()),
        token,
        json!({ "max_points": 10.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_category_weight_bounds(pool: PgPool) {
    let school = setup_school(&pool).await;
    let year = create_current_year(&pool, school.id).await;
    let section = create_section(&pool, school.id, year, 3).await;
    let cashier = create_staff(&pool, Some(school.id), "cashier").await;
    let app = setup_test_app(pool);
    let uri = format!("/api/gradebook/sections/{}/categories", section);

    let (status, _) = post(&app, &uri, &school.admin.token, json!({ "name": "Bad", "weight": 0.0 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = post(&app, &uri, &cashier.token, json!({ "name": "Labs", "weight": 20.0 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
