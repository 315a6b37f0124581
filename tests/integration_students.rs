mod common;

use axum::http::StatusCode;
use common::{create_staff, create_student, delete, get, patch, post, setup_school, setup_test_app};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_create_and_list_students(pool: PgPool) {
    let school = setup_school(&pool).await;
    let app = setup_test_app(pool);

    for (number, grade) in [("1001", 9), ("1002", 9), ("1003", 10)] {
        let (status, body) = post(
            &app,
            "/api/students",
            &school.admin.token,
            json!({
                "student_number": number,
                "first_name": "Sam",
                "last_name": "Lee",
                "grade_level": grade
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "active");
        assert_eq!(body["school_id"], school.id.to_string());
    }

    let (status, body) = get(&app, "/api/students?grade_level=9", &school.admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_student_number_rejected(pool: PgPool) {
    let school = setup_school(&pool).await;
    let app = setup_test_app(pool);
    let dto = json!({
        "student_number": "2001",
        "first_name": "Kim",
        "last_name": "Park",
        "grade_level": 3
    });

    let (status, _) = post(&app, "/api/students", &school.admin.token, dto.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = post(&app, "/api/students", &school.admin.token, dto).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_grade_level_out_of_range(pool: PgPool) {
    let school = setup_school(&pool).await;
    let app = setup_test_app(pool);

    let (status, _) = post(
        &app,
        "/api/students",
        &school.admin.token,
        json!({
            "student_number": "3001",
            "first_name": "Too",
            "last_name": "Old",
            "grade_level": 13
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_of_other_school_is_not_found(pool: PgPool) {
    let school = setup_school(&pool).await;
    let other = setup_school(&pool).await;
    let student = create_student(&pool, other.id, 5).await;
    let app = setup_test_app(pool);

    let (status, _) = get(&app, &format!("/api/students/{}", student), &school.admin.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, &format!("/api/students/{}", student), &other.admin.token).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_system_admin_must_name_school(pool: PgPool) {
    let school = setup_school(&pool).await;
    let sysadmin = create_staff(&pool, None, "system_admin").await;
    let app = setup_test_app(pool);
    let dto = json!({
        "student_number": "4001",
        "first_name": "No",
        "last_name": "School",
        "grade_level": 1
    });

    let (status, _) = post(&app, "/api/students", &sysadmin.token, dto.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut dto = dto;
    dto["school_id"] = json!(school.id);
    let (status, body) = post(&app, "/api/students", &sysadmin.token, dto).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["school_id"], school.id.to_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_status_transitions(pool: PgPool) {
    let school = setup_school(&pool).await;
    let student = create_student(&pool, school.id, 8).await;
    let app = setup_test_app(pool);
    let uri = format!("/api/students/{}/status", student);

    let (status, body) = patch(&app, &uri, &school.admin.token, json!({ "status": "withdrawn" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "withdrawn");

    // Withdrawn students must be re-activated before graduating.
    let (status, _) = patch(&app, &uri, &school.admin.token, json!({ "status": "graduated" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = patch(&app, &uri, &school.admin.token, json!({ "status": "active" })).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_status_changes_apply_once(pool: PgPool) {
    let school = setup_school(&pool).await;
    let student = create_student(&pool, school.id, 12).await;
    let app = setup_test_app(pool);
    let uri = format!("/api/students/{}/status", student);

    let (withdrawn, graduated) = tokio::join!(
        patch(&app, &uri, &school.admin.token, json!({ "status": "withdrawn" })),
        patch(&app, &uri, &school.admin.token, json!({ "status": "graduated" })),
    );
    let mut statuses = [withdrawn.0, graduated.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);

    let winner = if withdrawn.0 == StatusCode::OK { "withdrawn" } else { "graduated" };
    let (_, body) = get(&app, &format!("/api/students/{}", student), &school.admin.token).await;
    assert_eq!(body["status"], winner);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_promotion_advances_and_graduates(pool: PgPool) {
    let school = setup_school(&pool).await;
    let junior = create_student(&pool, school.id, 11).await;
    let senior = create_student(&pool, school.id, 12).await;
    let withdrawn = create_student(&pool, school.id, 4).await;
    sqlx::query("UPDATE students SET status = 'withdrawn' WHERE id = $1")
        .bind(withdrawn)
        .execute(&pool)
        .await
        .unwrap();
    let app = setup_test_app(pool);

    let (status, body) = post(&app, "/api/students/promote", &school.admin.token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["promoted"], 1);
    assert_eq!(body["graduated"], 1);

    let (_, junior) = get(&app, &format!("/api/students/{}", junior), &school.admin.token).await;
    assert_eq!(junior["grade_level"], 12);
    let (_, senior) = get(&app, &format!("/api/students/{}", senior), &school.admin.token).await;
    assert_eq!(senior["status"], "graduated");
    let (_, withdrawn) = get(&app, &format!("/api/students/{}", withdrawn), &school.admin.token).await;
    assert_eq!(withdrawn["grade_level"], 4);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_teacher_cannot_delete_student(pool: PgPool) {
    let school = setup_school(&pool).await;
    let teacher = create_staff(&pool, Some(school.id), "teacher").await;
    let student = create_student(&pool, school.id, 2).await;
    let app = setup_test_app(pool);

    let (status, _) = delete(&app, &format!("/api/students/{}", student), &teacher.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = delete(&app, &format!("/api/students/{}", student), &school.admin.token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
