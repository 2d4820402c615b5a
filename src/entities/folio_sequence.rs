use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Yearly-resetting correlative counter, one row per document kind. The only
/// global mutable state in the system; advanced through a compare-and-swap
/// update so two concurrent callers never observe the same correlative.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "folio_sequences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub kind: String,
    pub year: i32,
    pub correlative: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
