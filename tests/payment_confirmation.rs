mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use snakeshop_api::entities::customer::CustomerRole;
use snakeshop_api::entities::order::{self, ShippingMode};
use snakeshop_api::entities::payment_transaction::{self, TransactionStatus};
use snakeshop_api::errors::ServiceError;
use snakeshop_api::services::orders::{BuyerInfo, ConfirmationOutcome, PlacedOrder};

async fn place_test_order(app: &TestApp, server: &MockServer) -> PlacedOrder {
    Mock::given(method("POST"))
        .and(path("/payment/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": "https://pay.example.com/session",
            "token": "tok-placed"
        })))
        .mount(server)
        .await;

    let staff = app.seed_customer(CustomerRole::Staff).await;
    let snake = app.seed_product("Ball Python", dec!(1000), None, false, 5).await;
    let cart_id = app.cart_with(Some(staff.id), &[(&snake, 2)]).await;

    app.state
        .services
        .orders
        .place_order(
            cart_id,
            BuyerInfo {
                customer_id: Some(staff.id),
                ..Default::default()
            },
            ShippingMode::HomeDelivery,
        )
        .await
        .unwrap()
}

fn mock_status(token: &str, status: i32, commerce_order: &str, amount: i64) -> Mock {
    Mock::given(method("GET"))
        .and(path("/payment/getStatus"))
        .and(query_param("token", token.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": status,
            "commerceOrder": commerce_order,
            "amount": amount
        })))
}

#[tokio::test]
async fn paid_status_flips_the_order_exactly_once() {
    let server = MockServer::start().await;
    let app = TestApp::spawn_with_gateway(Some(server.uri())).await;
    let placed = place_test_order(&app, &server).await;

    mock_status("tok-1", 2, &placed.order_id.to_string(), 5690)
        .mount(&server)
        .await;

    let outcome = app
        .state
        .services
        .orders
        .confirm_payment("tok-1")
        .await
        .unwrap();
    assert_eq!(outcome, ConfirmationOutcome::Paid);

    // Duplicate delivery is an idempotent no-op
    let outcome = app
        .state
        .services
        .orders
        .confirm_payment("tok-1")
        .await
        .unwrap();
    assert_eq!(outcome, ConfirmationOutcome::AlreadyPaid);

    let saved = order::Entity::find_by_id(placed.order_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert!(saved.paid);
    assert!(!saved.flagged);

    let rows = payment_transaction::Entity::find()
        .filter(payment_transaction::Column::OrderId.eq(placed.order_id))
        .all(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1, "exactly one paid transaction per order");
    assert_eq!(rows[0].status, TransactionStatus::Paid);
    assert_eq!(rows[0].amount, dec!(5690));
    assert_eq!(rows[0].provider_token.as_deref(), Some("tok-1"));
}

#[tokio::test]
async fn amount_mismatch_flags_and_holds_the_order() {
    let server = MockServer::start().await;
    let app = TestApp::spawn_with_gateway(Some(server.uri())).await;
    let placed = place_test_order(&app, &server).await;

    // Provider claims 1 instead of the stored 5690
    mock_status("tok-bad", 2, &placed.order_id.to_string(), 1)
        .mount(&server)
        .await;

    let outcome = app
        .state
        .services
        .orders
        .confirm_payment("tok-bad")
        .await
        .unwrap();
    assert_eq!(outcome, ConfirmationOutcome::AmountMismatch);

    let saved = order::Entity::find_by_id(placed.order_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert!(!saved.paid, "mismatched amounts must never mark paid");
    assert!(saved.flagged);

    let rows = payment_transaction::Entity::find()
        .filter(payment_transaction::Column::OrderId.eq(placed.order_id))
        .all(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, TransactionStatus::Error);
    assert_eq!(rows[0].amount, dec!(1));
    assert!(rows[0].raw_payload.is_some(), "raw payload kept for audit");
}

#[tokio::test]
async fn non_paid_statuses_are_acknowledged_no_ops() {
    let server = MockServer::start().await;
    let app = TestApp::spawn_with_gateway(Some(server.uri())).await;
    let placed = place_test_order(&app, &server).await;

    // 3 = rejected
    mock_status("tok-rej", 3, &placed.order_id.to_string(), 5690)
        .mount(&server)
        .await;

    let outcome = app
        .state
        .services
        .orders
        .confirm_payment("tok-rej")
        .await
        .unwrap();
    assert_eq!(outcome, ConfirmationOutcome::NotPaid { status: 3 });

    let saved = order::Entity::find_by_id(placed.order_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert!(!saved.paid);
    let rows = payment_transaction::Entity::find()
        .filter(payment_transaction::Column::OrderId.eq(placed.order_id))
        .all(app.db.as_ref())
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn unknown_orders_are_logged_and_acknowledged() {
    let server = MockServer::start().await;
    let app = TestApp::spawn_with_gateway(Some(server.uri())).await;

    mock_status("tok-ghost", 2, &Uuid::new_v4().to_string(), 100)
        .mount(&server)
        .await;
    let outcome = app
        .state
        .services
        .orders
        .confirm_payment("tok-ghost")
        .await
        .unwrap();
    assert_eq!(outcome, ConfirmationOutcome::UnknownOrder);

    mock_status("tok-garbled", 2, "not-a-uuid", 100)
        .mount(&server)
        .await;
    let outcome = app
        .state
        .services
        .orders
        .confirm_payment("tok-garbled")
        .await
        .unwrap();
    assert_eq!(outcome, ConfirmationOutcome::UnknownOrder);
}

#[tokio::test]
async fn failed_status_lookup_is_the_only_retryable_case() {
    let server = MockServer::start().await;
    let app = TestApp::spawn_with_gateway(Some(server.uri())).await;

    Mock::given(method("GET"))
        .and(path("/payment/getStatus"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = app
        .state
        .services
        .orders
        .confirm_payment("tok-any")
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Gateway(_));
}
