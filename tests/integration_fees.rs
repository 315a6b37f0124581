mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{create_staff, create_student, delete, get, post, setup_school, setup_test_app};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_assess_pay_and_statement(pool: PgPool) {
    let school = setup_school(&pool).await;
    let cashier = create_staff(&pool, Some(school.id), "cashier").await;
    let ninth_a = create_student(&pool, school.id, 9).await;
    let ninth_b = create_student(&pool, school.id, 9).await;
    let tenth = create_student(&pool, school.id, 10).await;
    let app = setup_test_app(pool);

    let (status, fee_type) = post(
        &app,
        "/api/fees/types",
        &cashier.token,
        json!({
            "name": "Lab Fee",
            "amount_cents": 5000,
            "due_date": Utc::now().date_naive() + Duration::days(30),
            "grade_level": 9
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let type_id = fee_type["id"].as_str().unwrap();

    // Bulk assessment follows the fee type's grade.
    let (status, result) = post(&app, &format!("/api/fees/types/{}/assess", type_id), &cashier.token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["assessed"], 2);

    // Assessing again is a no-op.
    let (_, result) = post(&app, &format!("/api/fees/types/{}/assess", type_id), &cashier.token, json!({})).await;
    assert_eq!(result["assessed"], 0);

    let (_, statement) = get(&app, &format!("/api/fees/students/{}/statement", tenth), &cashier.token).await;
    assert_eq!(statement["lines"].as_array().unwrap().len(), 0);
    assert_eq!(statement["total_balance_cents"], 0);

    let (status, statement) = get(&app, &format!("/api/fees/students/{}/statement", ninth_a), &cashier.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(statement["total_balance_cents"], 5000);
    assert_eq!(statement["lines"][0]["status"], "pending");
    assert_eq!(statement["lines"][0]["name"], "Lab Fee");
    let student_fee_id = statement["lines"][0]["student_fee_id"].as_str().unwrap().to_string();
    let payments_uri = format!("/api/fees/student-fees/{}/payments", student_fee_id);

    let (status, paid) = post(
        &app,
        &payments_uri,
        &cashier.token,
        json!({ "amount_cents": 2000, "method": "cash" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(paid["fee"]["paid_cents"], 2000);
    assert_eq!(paid["payment"]["received_by"], cashier.id.to_string());

    let (status, body) = post(
        &app,
        &payments_uri,
        &cashier.token,
        json!({ "amount_cents": 3001, "method": "card" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = post(
        &app,
        &payments_uri,
        &cashier.token,
        json!({ "amount_cents": 3000, "method": "check", "reference": "CHK-1" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, statement) = get(&app, &format!("/api/fees/students/{}/statement", ninth_a), &cashier.token).await;
    assert_eq!(statement["lines"][0]["status"], "paid");
    assert_eq!(statement["total_paid_cents"], 5000);
    assert_eq!(statement["total_balance_cents"], 0);

    let (status, payments) = get(&app, &payments_uri, &cashier.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payments.as_array().unwrap().len(), 2);

    // A fee type with payments on record cannot be deleted.
    let (status, _) = delete(&app, &format!("/api/fees/types/{}", type_id), &cashier.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, statement) = get(&app, &format!("/api/fees/students/{}/statement", ninth_b), &cashier.token).await;
    assert_eq!(statement["total_balance_cents"], 5000);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_waiver_and_overdue_report(pool: PgPool) {
    let school = setup_school(&pool).await;
    let late = create_student(&pool, school.id, 5).await;
    let waived = create_student(&pool, school.id, 5).await;
    let app = setup_test_app(pool);
    let token = &school.admin.token;

    let (_, fee_type) = post(
        &app,
        "/api/fees/types",
        token,
        json!({
            "name": "Field Trip",
            "amount_cents": 1500,
            "due_date": Utc::now().date_naive() - Duration::days(5)
        }),
    )
    .await;
    let type_id = fee_type["id"].as_str().unwrap();

    for student in [late, waived] {
        let (status, result) = post(
            &app,
            &format!("/api/fees/types/{}/assess", type_id),
            token,
            json!({ "student_id": student }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["assessed"], 1);
    }

    let (_, statement) = get(&app, &format!("/api/fees/students/{}/statement", late), token).await;
    assert_eq!(statement["lines"][0]["status"], "overdue");

    let (_, statement) = get(&app, &format!("/api/fees/students/{}/statement", waived), token).await;
    let fee_id = statement["lines"][0]["student_fee_id"].as_str().unwrap().to_string();

    let (status, fee) = post(
        &app,
        &format!("/api/fees/student-fees/{}/waive", fee_id),
        token,
        json!({ "reason": "Hardship" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fee["waived_cents"], 1500);
    assert_eq!(fee["waiver_reason"], "Hardship");

    let (status, _) = post(
        &app,
        &format!("/api/fees/student-fees/{}/waive", fee_id),
        token,
        json!({ "reason": "Again" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, statement) = get(&app, &format!("/api/fees/students/{}/statement", waived), token).await;
    assert_eq!(statement["lines"][0]["status"], "waived");

    let (status, overdue) = get(&app, "/api/fees/reports/overdue", token).await;
    assert_eq!(status, StatusCode::OK);
    let rows = overdue.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["student_id"], late.to_string());
    assert_eq!(rows[0]["days_overdue"], 5);
    assert_eq!(rows[0]["balance_cents"], 1500);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_fee_permissions_and_validation(pool: PgPool) {
    let school = setup_school(&pool).await;
    let teacher = create_staff(&pool, Some(school.id), "teacher").await;
    let app = setup_test_app(pool);
    let dto = json!({ "name": "Band", "amount_cents": 0, "due_date": "2026-01-01" });

    let (status, _) = post(&app, "/api/fees/types", &teacher.token, dto.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = post(&app, "/api/fees/types", &school.admin.token, dto).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
