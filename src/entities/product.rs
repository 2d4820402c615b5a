use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Catalog product. Stock is reserved by conditional decrement at checkout
/// and must never go negative.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub price: Decimal,
    pub promo_price: Option<Decimal>,
    pub on_promotion: bool,
    pub stock: i32,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Promotional price when the promotion flag is set and a promo price
    /// exists, else the list price. Carts and order lines always charge this.
    pub fn effective_price(&self) -> Decimal {
        if self.on_promotion {
            if let Some(promo) = self.promo_price {
                return promo;
            }
        }
        self.price
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(price: Decimal, promo: Option<Decimal>, on_promotion: bool) -> Model {
        Model {
            id: Uuid::new_v4(),
            category_id: None,
            seller_id: None,
            name: "Ball Python".into(),
            slug: "ball-python".into(),
            description: String::new(),
            price,
            promo_price: promo,
            on_promotion,
            stock: 5,
            available: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn effective_price_uses_promo_when_active() {
        let p = product(dec!(1000), Some(dec!(800)), true);
        assert_eq!(p.effective_price(), dec!(800));
    }

    #[test]
    fn effective_price_ignores_promo_without_flag() {
        let p = product(dec!(1000), Some(dec!(800)), false);
        assert_eq!(p.effective_price(), dec!(1000));
    }

    #[test]
    fn effective_price_falls_back_when_promo_unset() {
        let p = product(dec!(1000), None, true);
        assert_eq!(p.effective_price(), dec!(1000));
    }
}
