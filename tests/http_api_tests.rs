use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use loan_ledger::infrastructure::in_memory::{InMemoryBalanceCache, InMemoryLedgerStore};
use loan_ledger::interfaces::http::{router, AppState};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app() -> Router {
    router(AppState::new(
        Arc::new(InMemoryLedgerStore::new()),
        Arc::new(InMemoryBalanceCache::new()),
        Duration::from_secs(600),
    ))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("decimal encoded as string")).unwrap()
}

#[tokio::test]
async fn test_create_loan() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/loans",
        Some(json!({ "borrower_id": 5, "amount": 1000 })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], 1);
    assert_eq!(body["borrower_id"], 5);
    assert_eq!(decimal(&body["amount"]), dec!(1000));
    assert_eq!(decimal(&body["interest_rate"]), dec!(0.10));
    assert_eq!(decimal(&body["weekly_payment"]), dec!(22));
    assert_eq!(decimal(&body["remaining_balance"]), dec!(1100));
    assert!(body["created_at"].is_string());
}

#[tokio::test]
async fn test_create_loan_rejects_bad_input() {
    let app = app();

    for body in [
        json!({ "borrower_id": 5, "amount": 0 }),
        json!({ "borrower_id": 5, "amount": -10 }),
        json!({ "borrower_id": 5 }),
        json!({ "amount": 100 }),
        json!({ "borrower_id": "five", "amount": 100 }),
    ] {
        let (status, response) = send(&app, "POST", "/loans", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "Invalid input");
    }

    // Nothing was created along the way
    let (status, _) = send(&app, "GET", "/loans/1/outstanding", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_loan_rejects_overflowing_amount() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/loans",
        Some(json!({ "borrower_id": 5, "amount": Decimal::MAX.to_string() })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid input");
    let (status, _) = send(&app, "GET", "/loans/1/outstanding", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_loan_id_is_invalid_input() {
    let app = app();

    for (method, uri) in [
        ("POST", "/loans/abc/payments"),
        ("GET", "/loans/abc/outstanding"),
        ("GET", "/loans/-1/delinquent"),
    ] {
        let (status, body) = send(&app, method, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {uri}");
        assert_eq!(body["error"], "Invalid input");
    }
}

#[tokio::test]
async fn test_payment_flow() {
    let app = app();
    send(&app, "POST", "/loans", Some(json!({ "borrower_id": 1, "amount": 1000 }))).await;

    let (status, body) = send(&app, "POST", "/loans/1/payments", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment successful");
    assert_eq!(decimal(&body["remaining_balance"]), dec!(1078));

    let (status, body) = send(&app, "GET", "/loans/1/outstanding", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["remaining_balance"]), dec!(1078));

    let (status, body) = send(&app, "GET", "/loans/1/delinquent", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_delinquent"], true);
}

#[tokio::test]
async fn test_fully_repaid_loan_rejects_payment() {
    let app = app();
    send(&app, "POST", "/loans", Some(json!({ "borrower_id": 1, "amount": 100 }))).await;

    for _ in 0..50 {
        let (status, _) = send(&app, "POST", "/loans/1/payments", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, "POST", "/loans/1/payments", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No pending repayments");

    let (_, body) = send(&app, "GET", "/loans/1/delinquent", None).await;
    assert_eq!(body["is_delinquent"], false);
}

#[tokio::test]
async fn test_unknown_loan_is_not_found() {
    let app = app();

    for (method, uri) in [
        ("POST", "/loans/42/payments"),
        ("GET", "/loans/42/outstanding"),
        ("GET", "/loans/42/delinquent"),
    ] {
        let (status, body) = send(&app, method, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert_eq!(body["error"], "Loan not found");
    }
}
