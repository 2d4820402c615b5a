use crate::db::DbPool;
use crate::entities::cart::{self, CartStatus, Entity as Cart};
use crate::entities::cart_item::{self, Entity as CartItem};
use crate::entities::product::{self, Entity as Product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// Cart line enriched with the live product record. `unit_price` is the
/// current effective price, not the snapshot captured at add time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub product: product::Model,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Full cart view returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartView {
    pub cart: cart::Model,
    pub lines: Vec<CartLine>,
    pub total_quantity: i32,
    pub total_price: Decimal,
}

impl CartView {
    fn from_lines(cart: cart::Model, lines: Vec<CartLine>) -> Self {
        let total_quantity = lines.iter().map(|l| l.quantity).sum();
        let total_price = lines.iter().map(|l| l.line_total).sum();
        Self {
            cart,
            lines,
            total_quantity,
            total_price,
        }
    }
}

pub struct CartService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl CartService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create_cart(
        &self,
        customer_id: Option<Uuid>,
    ) -> Result<cart::Model, ServiceError> {
        let now = Utc::now();
        let model = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            status: Set(CartStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(self.db.as_ref()).await?;

        self.event_sender
            .send_or_log(Event::CartCreated(created.id))
            .await;
        Ok(created)
    }

    /// Adds a product to the cart. A fresh entry snapshots the current
    /// effective price; an existing entry either accumulates quantity or is
    /// set to the given quantity when `override_quantity` is true.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        override_quantity: bool,
    ) -> Result<(), ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::Validation(
                "quantity must be positive".into(),
            ));
        }

        let cart = self.require_active_cart(cart_id).await?;

        let product = Product::find_by_id(product_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
        if !product.available {
            return Err(ServiceError::Validation(format!(
                "product {} is not available for sale",
                product.name
            )));
        }

        let now = Utc::now();
        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product.id))
            .one(self.db.as_ref())
            .await?;

        match existing {
            Some(item) => {
                let new_quantity = if override_quantity {
                    quantity
                } else {
                    item.quantity + quantity
                };
                let mut active: cart_item::ActiveModel = item.into();
                active.quantity = Set(new_quantity);
                active.updated_at = Set(now);
                active.update(self.db.as_ref()).await?;
            }
            None => {
                let item = cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(cart.id),
                    product_id: Set(product.id),
                    quantity: Set(quantity),
                    snapshot_price: Set(product.effective_price()),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                item.insert(self.db.as_ref()).await?;
            }
        }

        self.touch_cart(cart).await?;
        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id,
                product_id,
            })
            .await;
        Ok(())
    }

    /// Removes the entry for `product_id` if present; absent entries no-op.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, cart_id: Uuid, product_id: Uuid) -> Result<(), ServiceError> {
        let cart = self.require_active_cart(cart_id).await?;

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(self.db.as_ref())
            .await?;

        if let Some(item) = existing {
            item.delete(self.db.as_ref()).await?;
            self.touch_cart(cart).await?;
            self.event_sender
                .send_or_log(Event::CartItemRemoved {
                    cart_id,
                    product_id,
                })
                .await;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn clear(&self, cart_id: Uuid) -> Result<(), ServiceError> {
        let cart = self.require_cart(cart_id).await?;

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(self.db.as_ref())
            .await?;

        self.touch_cart(cart).await?;
        self.event_sender
            .send_or_log(Event::CartCleared(cart_id))
            .await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_cart(&self, cart_id: Uuid) -> Result<CartView, ServiceError> {
        let cart = self.require_cart(cart_id).await?;
        let lines = load_lines(self.db.as_ref(), cart.id).await?;
        Ok(CartView::from_lines(cart, lines))
    }

    async fn require_cart(&self, cart_id: Uuid) -> Result<cart::Model, ServiceError> {
        Cart::find_by_id(cart_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))
    }

    async fn require_active_cart(&self, cart_id: Uuid) -> Result<cart::Model, ServiceError> {
        let cart = self.require_cart(cart_id).await?;
        if cart.status != CartStatus::Active {
            return Err(ServiceError::InvalidState(format!(
                "cart {} is no longer active",
                cart_id
            )));
        }
        Ok(cart)
    }

    async fn touch_cart(&self, cart: cart::Model) -> Result<(), ServiceError> {
        let mut active: cart::ActiveModel = cart.into();
        active.updated_at = Set(Utc::now());
        active.update(self.db.as_ref()).await?;
        Ok(())
    }
}

/// Loads the cart's lines joined with the live catalog, pricing each at the
/// current effective price. Entries whose product has been deleted are
/// skipped. Runs against any connection so checkout can call it inside its
/// transaction.
pub async fn load_lines<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
) -> Result<Vec<CartLine>, ServiceError> {
    let rows = CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .find_also_related(Product)
        .all(conn)
        .await?;

    let lines = rows
        .into_iter()
        .filter_map(|(item, product)| {
            product.map(|product| {
                let unit_price = product.effective_price();
                CartLine {
                    line_total: unit_price * Decimal::from(item.quantity),
                    quantity: item.quantity,
                    unit_price,
                    product,
                }
            })
        })
        .collect();

    Ok(lines)
}
