mod common;

use axum::http::StatusCode;
use common::{create_staff, create_student, get, post, put, setup_school, setup_test_app};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_deposit_and_purchase(pool: PgPool) {
    let school = setup_school(&pool).await;
    let cashier = create_staff(&pool, Some(school.id), "cashier").await;
    let student = create_student(&pool, school.id, 4).await;
    let app = setup_test_app(pool);

    let (status, account) = post(
        &app,
        "/api/cafeteria/accounts",
        &cashier.token,
        json!({ "student_id": student }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(account["eligibility"], "paid");
    assert_eq!(account["balance_cents"], 0);
    let account_uri = format!("/api/cafeteria/accounts/{}", account["id"].as_str().unwrap());

    let (status, _) = post(
        &app,
        "/api/cafeteria/accounts",
        &cashier.token,
        json!({ "student_id": student }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, deposit) = post(
        &app,
        &format!("{}/deposits", account_uri),
        &cashier.token,
        json!({ "amount_cents": 1000 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(deposit["account"]["balance_cents"], 1000);
    assert_eq!(deposit["transaction"]["kind"], "deposit");

    // Paid lunch costs 375 cents.
    let (status, purchase) = post(
        &app,
        &format!("{}/purchases", account_uri),
        &cashier.token,
        json!({ "meal_type": "lunch" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(purchase["account"]["balance_cents"], 625);
    assert_eq!(purchase["transaction"]["amount_cents"], -375);

    let (status, history) = get(&app, &format!("{}/transactions", account_uri), &cashier.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["meta"]["total"], 2);
    assert_eq!(history["data"][0]["kind"], "purchase");

    let (status, by_student) = get(
        &app,
        &format!("/api/cafeteria/students/{}/account", student),
        &cashier.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_student["id"], account["id"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_negative_limit_and_free_meals(pool: PgPool) {
    let school = setup_school(&pool).await;
    let paid = create_student(&pool, school.id, 4).await;
    let free = create_student(&pool, school.id, 4).await;
    let app = setup_test_app(pool);
    let token = &school.admin.token;

    let (_, account) = post(
        &app,
        "/api/cafeteria/accounts",
        token,
        json!({ "student_id": paid, "negative_limit_cents": 400 }),
    )
    .await;
    let account_uri = format!("/api/cafeteria/accounts/{}", account["id"].as_str().unwrap());

    let (status, purchase) = post(&app, &format!("{}/purchases", account_uri), token, json!({ "meal_type": "lunch" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(purchase["account"]["balance_cents"], -375);

    let (status, body) = post(&app, &format!("{}/purchases", account_uri), token, json!({ "meal_type": "breakfast" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Insufficient balance"));

    let (status, updated) = put(&app, &account_uri, token, json!({ "eligibility": "reduced" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["eligibility"], "reduced");

    let (_, free_account) = post(
        &app,
        "/api/cafeteria/accounts",
        token,
        json!({ "student_id": free, "eligibility": "free" }),
    )
    .await;
    let (status, purchase) = post(
        &app,
        &format!("/api/cafeteria/accounts/{}/purchases", free_account["id"].as_str().unwrap()),
        token,
        json!({ "meal_type": "lunch" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(purchase["account"]["balance_cents"], 0);

    let (status, low) = get(&app, "/api/cafeteria/reports/low-balance", token).await;
    assert_eq!(status, StatusCode::OK);
    let rows = low.as_array().unwrap();
    // 0 < 500 and -375 < 500, lowest first
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["student_id"], paid.to_string());

    let (_, low) = get(&app, "/api/cafeteria/reports/low-balance?threshold_cents=0", token).await;
    assert_eq!(low.as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deposit_amount_bounds(pool: PgPool) {
    let school = setup_school(&pool).await;
    let student = create_student(&pool, school.id, 4).await;
    let app = setup_test_app(pool);

    let (_, account) = post(
        &app,
        "/api/cafeteria/accounts",
        &school.admin.token,
        json!({ "student_id": student }),
    )
    .await;
    let (status, _) = post(
        &app,
        &format!("/api/cafeteria/accounts/{}/deposits", account["id"].as_str().unwrap()),
        &school.admin.token,
        json!({ "amount_cents": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let deposits = format!("/api/cafeteria/accounts/{}/deposits", account["id"].as_str().unwrap());
    let (status, _) = post(&app, &deposits, &school.admin.token, json!({ "amount_cents": 1 })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = post(
        &app,
        &deposits,
        &school.admin.token,
        json!({ "amount_cents": i64::MAX }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, history) = get(
        &app,
        &format!("/api/cafeteria/accounts/{}/transactions", account["id"].as_str().unwrap()),
        &school.admin.token,
    )
    .await;
    assert_eq!(history["meta"]["total"], 1);
}
