mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use snakeshop_api::entities::customer::CustomerRole;
use snakeshop_api::entities::order::{self, ShippingMode};
use snakeshop_api::entities::{cart, folio_sequence, order_item, product};
use snakeshop_api::errors::ServiceError;
use snakeshop_api::events::Event;
use snakeshop_api::services::orders::BuyerInfo;

async fn mock_payment_create(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/payment/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": "https://pay.example.com/session",
            "token": "tok-test-1"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn staff_checkout_charges_the_expected_total() {
    let server = MockServer::start().await;
    let app = TestApp::spawn_with_gateway(Some(server.uri())).await;

    // Exactly the signed amount must reach the provider.
    Mock::given(method("POST"))
        .and(path("/payment/create"))
        .and(body_string_contains("amount=5690"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": "https://pay.example.com/session",
            "token": "tok-staff"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let staff = app.seed_customer(CustomerRole::Staff).await;
    let snake = app.seed_product("Ball Python", dec!(1000), None, false, 5).await;
    let cart_id = app.cart_with(Some(staff.id), &[(&snake, 2)]).await;

    let placed = app
        .state
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
        .unwrap();

    assert_eq!(placed.total, dec!(5690));
    assert_eq!(
        placed.redirect_url,
        "https://pay.example.com/session?token=tok-staff"
    );
    assert!(placed.folio.starts_with("SS-"));
    assert!(placed.folio.ends_with("-00001"));

    let saved = order::Entity::find_by_id(placed.order_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.total, dec!(5690));
    assert_eq!(saved.discount, dec!(300));
    assert_eq!(saved.shipping_cost, dec!(3990));
    assert!(!saved.paid);

    // Stock reserved, cart converted and emptied
    assert_eq!(app.product_stock(snake.id).await, 3);
    let cart_row = cart::Entity::find_by_id(cart_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cart_row.status, cart::CartStatus::Converted);
    let view = app.state.services.carts.get_cart(cart_id).await.unwrap();
    assert!(view.lines.is_empty());

    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(placed.order_id))
        .all(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].unit_price, dec!(1000));
    assert_eq!(items[0].quantity, 2);
}

#[tokio::test]
async fn quote_matches_what_checkout_charges() {
    let server = MockServer::start().await;
    let app = TestApp::spawn_with_gateway(Some(server.uri())).await;
    mock_payment_create(&server).await;

    let staff = app.seed_customer(CustomerRole::Staff).await;
    let snake = app.seed_product("Ball Python", dec!(1000), None, false, 5).await;
    let cart_id = app.cart_with(Some(staff.id), &[(&snake, 2)]).await;

    let totals = app
        .state
        .services
        .orders
        .quote(cart_id, Some(staff.id), ShippingMode::HomeDelivery)
        .await
        .unwrap();
    assert_eq!(totals.subtotal, dec!(2000));
    assert_eq!(totals.discount, dec!(300));
    assert_eq!(totals.shipping, dec!(3990));
    assert_eq!(totals.total, dec!(5690));

    let placed = app
        .state
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
        .unwrap();
    assert_eq!(placed.total, totals.total);
}

#[tokio::test]
async fn gateway_failure_rolls_everything_back() {
    let server = MockServer::start().await;
    let app = TestApp::spawn_with_gateway(Some(server.uri())).await;

    Mock::given(method("POST"))
        .and(path("/payment/create"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let snake = app.seed_product("Corn Snake", dec!(1000), None, false, 5).await;
    let cart_id = app.cart_with(None, &[(&snake, 2)]).await;

    let err = app
        .state
        .services
        .orders
        .place_order(
            cart_id,
            BuyerInfo {
                email: Some("guest@example.com".into()),
                address: Some("Calle Falsa 123".into()),
                city: Some("Santiago".into()),
                ..Default::default()
            },
            ShippingMode::HomeDelivery,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Gateway(_));

    // Stock intact, no order persisted, cart preserved
    assert_eq!(app.product_stock(snake.id).await, 5);
    assert_eq!(
        order::Entity::find().all(app.db.as_ref()).await.unwrap().len(),
        0
    );
    let view = app.state.services.carts.get_cart(cart_id).await.unwrap();
    assert_eq!(view.total_quantity, 2);

    // The folio increment rolled back with the order
    let seq = folio_sequence::Entity::find_by_id("order")
        .one(app.db.as_ref())
        .await
        .unwrap();
    assert!(seq.map(|s| s.correlative).unwrap_or(0) == 0);
}

#[tokio::test]
async fn insufficient_stock_aborts_whole_order() {
    let server = MockServer::start().await;
    let app = TestApp::spawn_with_gateway(Some(server.uri())).await;
    mock_payment_create(&server).await;

    let plenty = app.seed_product("Gecko", dec!(500), None, false, 10).await;
    let scarce = app.seed_product("Rare Boa", dec!(9000), None, false, 1).await;
    let cart_id = app.cart_with(None, &[(&plenty, 2), (&scarce, 3)]).await;

    let err = app
        .state
        .services
        .orders
        .place_order(
            cart_id,
            BuyerInfo {
                email: Some("guest@example.com".into()),
                ..Default::default()
            },
            ShippingMode::Pickup,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(msg) if msg.contains("Rare Boa"));

    // All-or-nothing: the other line's decrement also rolled back
    assert_eq!(app.product_stock(plenty.id).await, 10);
    assert_eq!(app.product_stock(scarce.id).await, 1);
    assert_eq!(
        order::Entity::find().all(app.db.as_ref()).await.unwrap().len(),
        0
    );
}

#[tokio::test]
async fn guest_checkout_requires_contact_data() {
    let server = MockServer::start().await;
    let app = TestApp::spawn_with_gateway(Some(server.uri())).await;
    mock_payment_create(&server).await;

    let snake = app.seed_product("Python", dec!(1000), None, false, 5).await;
    let cart_id = app.cart_with(None, &[(&snake, 1)]).await;

    // No email at all
    let err = app
        .state
        .services
        .orders
        .place_order(cart_id, BuyerInfo::default(), ShippingMode::Pickup)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Validation(_));

    // Home delivery without an address
    let err = app
        .state
        .services
        .orders
        .place_order(
            cart_id,
            BuyerInfo {
                email: Some("guest@example.com".into()),
                ..Default::default()
            },
            ShippingMode::HomeDelivery,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Validation(_));

    // Pickup waives the address fields
    let placed = app
        .state
        .services
        .orders
        .place_order(
            cart_id,
            BuyerInfo {
                email: Some("guest@example.com".into()),
                ..Default::default()
            },
            ShippingMode::Pickup,
        )
        .await
        .unwrap();
    let saved = order::Entity::find_by_id(placed.order_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.shipping_cost, dec!(0));
    assert_eq!(saved.email, "guest@example.com");
}

#[tokio::test]
async fn empty_cart_cannot_check_out() {
    let server = MockServer::start().await;
    let app = TestApp::spawn_with_gateway(Some(server.uri())).await;
    mock_payment_create(&server).await;

    let cart_id = app.cart_with(None, &[]).await;
    let err = app
        .state
        .services
        .orders
        .place_order(
            cart_id,
            BuyerInfo {
                email: Some("guest@example.com".into()),
                ..Default::default()
            },
            ShippingMode::Pickup,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Validation(_));
}

#[tokio::test]
async fn low_stock_events_report_the_committed_count() {
    let server = MockServer::start().await;
    let (app, mut events) = TestApp::spawn_capturing_events(Some(server.uri())).await;
    mock_payment_create(&server).await;

    let snake = app.seed_product("Milk Snake", dec!(1000), None, false, 10).await;
    let cart_id = app.cart_with(None, &[(&snake, 2)]).await;

    // Units sold elsewhere after the cart was filled
    product::Entity::update_many()
        .col_expr(product::Column::Stock, Expr::value(4))
        .filter(product::Column::Id.eq(snake.id))
        .exec(app.db.as_ref())
        .await
        .unwrap();

    app.state
        .services
        .orders
        .place_order(
            cart_id,
            BuyerInfo {
                email: Some("guest@example.com".into()),
                ..Default::default()
            },
            ShippingMode::Pickup,
        )
        .await
        .unwrap();
    assert_eq!(app.product_stock(snake.id).await, 2);

    let mut reported = None;
    while let Ok(event) = events.try_recv() {
        if let Event::LowStock {
            product_id,
            remaining,
        } = event
        {
            assert_eq!(product_id, snake.id);
            reported = Some(remaining);
        }
    }
    assert_eq!(
        reported,
        Some(2),
        "the event must carry the committed count, not a stale read"
    );
}

#[tokio::test]
async fn racing_checkouts_over_the_last_unit() {
    let server = MockServer::start().await;
    let app = TestApp::spawn_with_gateway(Some(server.uri())).await;
    mock_payment_create(&server).await;

    let last_one = app.seed_product("Last Boa", dec!(1000), None, false, 1).await;
    let cart_a = app.cart_with(None, &[(&last_one, 1)]).await;
    let cart_b = app.cart_with(None, &[(&last_one, 1)]).await;

    let buyer = || BuyerInfo {
        email: Some("guest@example.com".into()),
        ..Default::default()
    };

    let orders = &app.state.services.orders;
    let (a, b) = tokio::join!(
        orders.place_order(cart_a, buyer(), ShippingMode::Pickup),
        orders.place_order(cart_b, buyer(), ShippingMode::Pickup),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one racer may win the last unit");
    for result in [a, b] {
        if let Err(err) = result {
            assert_matches!(err, ServiceError::InsufficientStock(_));
        }
    }
    assert_eq!(app.product_stock(last_one.id).await, 0);
    assert_eq!(
        order::Entity::find().all(app.db.as_ref()).await.unwrap().len(),
        1
    );
}
