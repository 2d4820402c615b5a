use crate::entities::folio_sequence::{self, Entity as FolioSequence};
use crate::errors::ServiceError;
use chrono::{Datelike, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::debug;

/// Document kinds that receive correlative folios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolioKind {
    Order,
    Ticket,
}

impl FolioKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FolioKind::Order => "order",
            FolioKind::Ticket => "ticket",
        }
    }
}

const FOLIO_PREFIX: &str = "SS";
const MAX_CAS_RETRIES: usize = 16;

/// Formats a folio as `SS-<year>-<correlative padded to 5 digits>`.
pub fn format_folio(year: i32, correlative: i32) -> String {
    format!("{}-{}-{:05}", FOLIO_PREFIX, year, correlative)
}

/// Issues the next folio for `kind`, atomically.
///
/// Runs against the caller's connection, so a checkout that hands in its
/// transaction rolls the increment back together with the order: failed
/// attempts never burn folios. Uniqueness under concurrency comes from a
/// compare-and-swap update filtered on the previously observed (year,
/// correlative); zero rows affected means another caller advanced the counter
/// first and the loop re-reads. The year rollover resets the correlative to 1.
pub async fn next_folio<C: ConnectionTrait>(
    conn: &C,
    kind: FolioKind,
) -> Result<String, ServiceError> {
    let year = Utc::now().year();

    for attempt in 0..MAX_CAS_RETRIES {
        let current = match FolioSequence::find_by_id(kind.as_str()).one(conn).await? {
            Some(row) => row,
            None => {
                // First folio of this kind ever. A concurrent seeder may get
                // there first; ON CONFLICT keeps that from poisoning the
                // enclosing transaction.
                let seed = folio_sequence::ActiveModel {
                    kind: Set(kind.as_str().to_string()),
                    year: Set(year),
                    correlative: Set(0),
                };
                FolioSequence::insert(seed)
                    .on_conflict(
                        OnConflict::column(folio_sequence::Column::Kind)
                            .do_nothing()
                            .to_owned(),
                    )
                    .exec_without_returning(conn)
                    .await?;
                match FolioSequence::find_by_id(kind.as_str()).one(conn).await? {
                    Some(row) => row,
                    None => continue,
                }
            }
        };

        let next = if current.year != year {
            1
        } else {
            current.correlative + 1
        };

        let updated = FolioSequence::update_many()
            .col_expr(folio_sequence::Column::Year, year.into())
            .col_expr(folio_sequence::Column::Correlative, next.into())
            .filter(folio_sequence::Column::Kind.eq(kind.as_str()))
            .filter(folio_sequence::Column::Year.eq(current.year))
            .filter(folio_sequence::Column::Correlative.eq(current.correlative))
            .exec(conn)
            .await?;

        if updated.rows_affected == 1 {
            return Ok(format_folio(year, next));
        }

        debug!(
            kind = kind.as_str(),
            attempt, "folio CAS lost a race, retrying"
        );
    }

    Err(ServiceError::Integrity(format!(
        "folio sequence for kind '{}' could not be advanced after {} attempts",
        kind.as_str(),
        MAX_CAS_RETRIES
    )))
}
