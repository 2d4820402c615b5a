mod common;

use assert_matches::assert_matches;
use common::TestApp;

use snakeshop_api::entities::customer::CustomerRole;
use snakeshop_api::errors::ServiceError;
use snakeshop_api::services::customers::{CustomerUpdate, NewCustomer};

fn new_customer(email: &str) -> NewCustomer {
    NewCustomer {
        email: email.into(),
        full_name: "Ada Buyer".into(),
        address: None,
        city: None,
        postal_code: None,
        phone: None,
    }
}

#[tokio::test]
async fn new_profiles_always_start_as_plain_customers() {
    let app = TestApp::spawn().await;

    let created = app
        .state
        .services
        .customers
        .create_customer(new_customer("ada@example.com"))
        .await
        .unwrap();
    assert_eq!(created.role, CustomerRole::Customer);

    let err = app
        .state
        .services
        .customers
        .create_customer(new_customer("ada@example.com"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Validation(_));
}

#[tokio::test]
async fn role_changes_require_a_staff_actor() {
    let app = TestApp::spawn().await;
    let target = app.seed_customer(CustomerRole::Customer).await;
    let plain = app.seed_customer(CustomerRole::Customer).await;
    let staff = app.seed_customer(CustomerRole::Staff).await;

    let promote = || CustomerUpdate {
        role: Some(CustomerRole::Seller),
        ..Default::default()
    };

    // No actor at all
    let err = app
        .state
        .services
        .customers
        .update_customer(target.id, None, promote())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Unauthorized(_));

    // Non-staff actor
    let err = app
        .state
        .services
        .customers
        .update_customer(target.id, Some(plain.id), promote())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Unauthorized(_));

    let updated = app
        .state
        .services
        .customers
        .update_customer(target.id, Some(staff.id), promote())
        .await
        .unwrap();
    assert_eq!(updated.role, CustomerRole::Seller);
}

#[tokio::test]
async fn contact_data_updates_need_no_actor() {
    let app = TestApp::spawn().await;
    let target = app.seed_customer(CustomerRole::Customer).await;

    let updated = app
        .state
        .services
        .customers
        .update_customer(
            target.id,
            None,
            CustomerUpdate {
                city: Some("Valparaíso".into()),
                phone: Some("+56 9 1234 5678".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.city.as_deref(), Some("Valparaíso"));
    assert_eq!(updated.phone.as_deref(), Some("+56 9 1234 5678"));
    assert_eq!(updated.role, CustomerRole::Customer);
}
