mod common;

use chrono::{Datelike, Utc};
use common::TestApp;
use sea_orm::{ActiveModelTrait, Set};
use std::collections::HashSet;

use snakeshop_api::entities::folio_sequence;
use snakeshop_api::services::sequences::{next_folio, FolioKind};

#[tokio::test]
async fn folios_are_sequential_within_a_kind() {
    let app = TestApp::spawn().await;
    let year = Utc::now().year();

    for expected in 1..=12 {
        let folio = next_folio(app.db.as_ref(), FolioKind::Order).await.unwrap();
        assert_eq!(folio, format!("SS-{}-{:05}", year, expected));
    }
}

#[tokio::test]
async fn order_and_ticket_sequences_advance_independently() {
    let app = TestApp::spawn().await;
    let year = Utc::now().year();

    let order_1 = next_folio(app.db.as_ref(), FolioKind::Order).await.unwrap();
    let order_2 = next_folio(app.db.as_ref(), FolioKind::Order).await.unwrap();
    let ticket_1 = next_folio(app.db.as_ref(), FolioKind::Ticket).await.unwrap();

    assert_eq!(order_1, format!("SS-{}-00001", year));
    assert_eq!(order_2, format!("SS-{}-00002", year));
    assert_eq!(ticket_1, format!("SS-{}-00001", year));
}

#[tokio::test]
async fn the_sequence_restarts_at_one_on_year_rollover() {
    let app = TestApp::spawn().await;
    let year = Utc::now().year();

    // A counter left over from last year
    folio_sequence::ActiveModel {
        kind: Set("order".to_string()),
        year: Set(year - 1),
        correlative: Set(42),
    }
    .insert(app.db.as_ref())
    .await
    .unwrap();

    let folio = next_folio(app.db.as_ref(), FolioKind::Order).await.unwrap();
    assert_eq!(folio, format!("SS-{}-00001", year));
}

#[tokio::test]
async fn concurrent_requests_never_share_a_folio() {
    let app = TestApp::spawn().await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let db = app.db.clone();
        handles.push(tokio::spawn(async move {
            next_folio(db.as_ref(), FolioKind::Order).await.unwrap()
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        let folio = handle.await.unwrap();
        assert!(seen.insert(folio.clone()), "duplicate folio {}", folio);
    }
    assert_eq!(seen.len(), 16);
}
