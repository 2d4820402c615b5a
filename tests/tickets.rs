mod common;

use assert_matches::assert_matches;
use chrono::{Datelike, Utc};
use common::TestApp;

use snakeshop_api::entities::customer::CustomerRole;
use snakeshop_api::entities::support_ticket::{TicketKind, TicketStatus};
use snakeshop_api::errors::ServiceError;
use snakeshop_api::services::tickets::NewTicket;

fn new_ticket() -> NewTicket {
    NewTicket {
        customer_id: None,
        full_name: "Guest Buyer".into(),
        email: "guest@example.com".into(),
        kind: TicketKind::Warranty,
        order_folio: Some(format!("SS-{}-00001", Utc::now().year())),
        subject: "Heat lamp arrived broken".into(),
        body: "The lamp in my order does not turn on.".into(),
    }
}

#[tokio::test]
async fn opening_a_ticket_assigns_a_ticket_folio() {
    let app = TestApp::spawn().await;
    let year = Utc::now().year();

    let first = app.state.services.tickets.open_ticket(new_ticket()).await.unwrap();
    let second = app.state.services.tickets.open_ticket(new_ticket()).await.unwrap();

    assert_eq!(first.folio, format!("SS-{}-00001", year));
    assert_eq!(second.folio, format!("SS-{}-00002", year));
    assert_eq!(first.status, TicketStatus::Open);
    assert_eq!(first.kind, TicketKind::Warranty);
}

#[tokio::test]
async fn blank_contact_data_is_rejected() {
    let app = TestApp::spawn().await;

    let mut ticket = new_ticket();
    ticket.email = "  ".into();
    let err = app.state.services.tickets.open_ticket(ticket).await.unwrap_err();
    assert_matches!(err, ServiceError::Validation(_));

    let mut ticket = new_ticket();
    ticket.subject = String::new();
    let err = app.state.services.tickets.open_ticket(ticket).await.unwrap_err();
    assert_matches!(err, ServiceError::Validation(_));
}

#[tokio::test]
async fn listing_and_status_changes_are_privileged() {
    let app = TestApp::spawn().await;
    let ticket = app.state.services.tickets.open_ticket(new_ticket()).await.unwrap();

    let plain = app.seed_customer(CustomerRole::Customer).await;
    let err = app
        .state
        .services
        .tickets
        .list_tickets(plain.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Unauthorized(_));

    let staff = app.seed_customer(CustomerRole::Staff).await;
    let tickets = app.state.services.tickets.list_tickets(staff.id).await.unwrap();
    assert_eq!(tickets.len(), 1);

    let err = app
        .state
        .services
        .tickets
        .update_status(plain.id, ticket.id, TicketStatus::Closed)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Unauthorized(_));

    let updated = app
        .state
        .services
        .tickets
        .update_status(staff.id, ticket.id, TicketStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(updated.status, TicketStatus::InProgress);
}
