use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Buyer profile. Roles gate the checkout discount and the privileged
/// catalog/order/ticket operations; they are read from this row, never from
/// request bodies.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: CustomerRole,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// Sellers and staff may use seller-side maintenance endpoints.
    pub fn is_privileged(&self) -> bool {
        matches!(self.role, CustomerRole::Seller | CustomerRole::Staff)
    }

    /// Only staff get the checkout discount.
    pub fn is_staff(&self) -> bool {
        self.role == CustomerRole::Staff
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CustomerRole {
    #[sea_orm(string_value = "customer")]
    Customer,
    #[sea_orm(string_value = "seller")]
    Seller,
    #[sea_orm(string_value = "staff")]
    Staff,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
