use crate::config::AppConfig;
use crate::db::DbPool;
use crate::entities::cart::{self, CartStatus, Entity as Cart};
use crate::entities::cart_item::{self, Entity as CartItem};
use crate::entities::customer::{self, Entity as Customer};
use crate::entities::order::{self, Entity as Order, ShippingMode};
use crate::entities::order_item::{self, Entity as OrderItem};
use crate::entities::payment_transaction::{
    self, Entity as PaymentTransaction, TransactionStatus,
};
use crate::entities::product::{self, Entity as Product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::gateway::{CreatePaymentRequest, PaymentGateway};
use crate::mailer::Mailer;
use crate::services::carts::{load_lines, CartLine};
use crate::services::pricing::{compute_totals, Totals};
use crate::services::sequences::{next_folio, FolioKind};
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

const LOW_STOCK_THRESHOLD: i32 = 3;

/// Buyer identity and contact data supplied at checkout. For known customers
/// the profile fills in whatever the request omits; guests must supply
/// everything home delivery needs.
#[derive(Debug, Clone, Default)]
pub struct BuyerInfo {
    pub customer_id: Option<Uuid>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlacedOrder {
    pub order_id: Uuid,
    pub folio: String,
    /// Hosted payment page the buyer must be redirected to
    pub redirect_url: String,
    pub total: Decimal,
}

/// Outcome of processing a payment confirmation. Every variant is a
/// logically handled webhook; only status-lookup failures are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Paid,
    AlreadyPaid,
    UnknownOrder,
    AmountMismatch,
    NotPaid { status: i32 },
}

/// Privileged fulfilment update. `paid` overrides the payment state and
/// reconciles the transaction ledger to match.
#[derive(Debug, Clone, Default)]
pub struct FulfilmentUpdate {
    pub shipping_mode: Option<ShippingMode>,
    pub paid: Option<bool>,
}

/// Order plus its lines, the read model for order views.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDetail {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

struct ResolvedBuyer {
    customer: Option<customer::Model>,
    email: String,
    address: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
}

impl ResolvedBuyer {
    fn is_staff(&self) -> bool {
        self.customer.as_ref().map(|c| c.is_staff()).unwrap_or(false)
    }
}

pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    gateway: Arc<PaymentGateway>,
    mailer: Arc<dyn Mailer>,
    config: Arc<AppConfig>,
}

impl OrderService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: EventSender,
        gateway: Arc<PaymentGateway>,
        mailer: Arc<dyn Mailer>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            gateway,
            mailer,
            config,
        }
    }

    /// Recomputes checkout totals for preview. Client-supplied totals are
    /// never trusted; this is the same arithmetic `place_order` runs.
    #[instrument(skip(self))]
    pub async fn quote(
        &self,
        cart_id: Uuid,
        customer_id: Option<Uuid>,
        shipping_mode: ShippingMode,
    ) -> Result<Totals, ServiceError> {
        self.require_cart(self.db.as_ref(), cart_id).await?;
        let lines = load_lines(self.db.as_ref(), cart_id).await?;
        let subtotal = subtotal_of(&lines);

        let is_staff = match customer_id {
            Some(id) => self.load_customer(id).await?.is_staff(),
            None => false,
        };

        Ok(compute_totals(
            &self.config.pricing,
            subtotal,
            shipping_mode,
            is_staff,
        ))
    }

    /// Places an order from the cart: recomputes totals, issues a folio,
    /// reserves stock, and initiates the provider payment, all inside one
    /// transaction. Any failure, the gateway included, rolls everything back
    /// and leaves the cart untouched.
    #[instrument(skip(self, buyer))]
    pub async fn place_order(
        &self,
        cart_id: Uuid,
        buyer: BuyerInfo,
        shipping_mode: ShippingMode,
    ) -> Result<PlacedOrder, ServiceError> {
        let buyer = self.resolve_buyer(buyer, shipping_mode).await?;

        let txn = self.db.begin().await?;

        let cart = self.require_cart(&txn, cart_id).await?;
        if cart.status != CartStatus::Active {
            return Err(ServiceError::InvalidState(format!(
                "cart {} is no longer active",
                cart_id
            )));
        }

        let lines = load_lines(&txn, cart_id).await?;
        if lines.is_empty() {
            return Err(ServiceError::Validation("cart is empty".into()));
        }

        let totals = compute_totals(
            &self.config.pricing,
            subtotal_of(&lines),
            shipping_mode,
            buyer.is_staff(),
        );
        let amount = integer_amount(totals.total)?;

        let folio = next_folio(&txn, FolioKind::Order).await?;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let order_row = order::ActiveModel {
            id: Set(order_id),
            folio: Set(folio.clone()),
            customer_id: Set(buyer.customer.as_ref().map(|c| c.id)),
            email: Set(buyer.email.clone()),
            shipping_mode: Set(shipping_mode),
            address: Set(buyer.address.clone()),
            city: Set(buyer.city.clone()),
            postal_code: Set(buyer.postal_code.clone()),
            shipping_cost: Set(totals.shipping),
            discount: Set(totals.discount),
            total: Set(totals.total),
            paid: Set(false),
            flagged: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };
        order_row.insert(&txn).await?;

        let mut low_stock = Vec::new();
        for line in &lines {
            let reserved = Product::update_many()
                .col_expr(
                    product::Column::Stock,
                    Expr::col(product::Column::Stock).sub(line.quantity),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(now))
                .filter(product::Column::Id.eq(line.product.id))
                .filter(product::Column::Stock.gte(line.quantity))
                .exec(&txn)
                .await?;

            if reserved.rows_affected == 0 {
                // Rollback happens on drop, but be explicit: no partial orders.
                txn.rollback().await?;
                return Err(ServiceError::InsufficientStock(format!(
                    "not enough stock of {} (requested {})",
                    line.product.name, line.quantity
                )));
            }

            // The count loaded with the cart lines can lag behind concurrent
            // checkouts; the row just decremented in this transaction is
            // current.
            let remaining = Product::find_by_id(line.product.id)
                .one(&txn)
                .await?
                .map(|p| p.stock)
                .unwrap_or(0);
            if remaining <= LOW_STOCK_THRESHOLD {
                low_stock.push((line.product.id, remaining));
            }

            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product.id),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                created_at: Set(now),
            };
            item.insert(&txn).await?;
        }

        let payment = CreatePaymentRequest {
            commerce_order: order_id.to_string(),
            subject: format!("Snake Shop order {}", folio),
            amount,
            email: buyer.email.clone(),
            url_return: format!(
                "{}/api/v1/payments/return/{}",
                self.config.public_base_url, order_id
            ),
            url_confirmation: format!(
                "{}/api/v1/payments/confirmation",
                self.config.public_base_url
            ),
        };

        let created = match self.gateway.create_payment(payment).await {
            Ok(created) => created,
            Err(err) => {
                warn!(%order_id, "payment initiation failed, rolling checkout back");
                txn.rollback().await?;
                return Err(err);
            }
        };

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .exec(&txn)
            .await?;
        let mut converted: cart::ActiveModel = cart.into();
        converted.status = Set(CartStatus::Converted);
        converted.updated_at = Set(now);
        converted.update(&txn).await?;

        txn.commit().await?;

        info!(%order_id, %folio, %totals.total, "order placed, awaiting payment");
        self.event_sender
            .send_or_log(Event::OrderPlaced {
                order_id,
                folio: folio.clone(),
            })
            .await;
        for (product_id, remaining) in low_stock {
            self.event_sender
                .send_or_log(Event::LowStock {
                    product_id,
                    remaining,
                })
                .await;
        }

        Ok(PlacedOrder {
            order_id,
            folio,
            redirect_url: created.redirect_url(),
            total: totals.total,
        })
    }

    /// Processes a provider payment confirmation, idempotently. The webhook
    /// body is never trusted; the authoritative status comes from a fresh
    /// provider lookup. Every returned outcome is acknowledgeable; a failed
    /// lookup is the only retryable error.
    #[instrument(skip(self))]
    pub async fn confirm_payment(&self, token: &str) -> Result<ConfirmationOutcome, ServiceError> {
        let status = self.gateway.get_status(token).await?;

        let order_id = match Uuid::parse_str(&status.commerce_order) {
            Ok(id) => id,
            Err(_) => {
                error!(
                    commerce_order = %status.commerce_order,
                    "payment confirmation references an unparseable order id"
                );
                return Ok(ConfirmationOutcome::UnknownOrder);
            }
        };

        let order = match Order::find_by_id(order_id).one(self.db.as_ref()).await? {
            Some(order) => order,
            None => {
                error!(%order_id, "payment confirmation references an unknown order");
                return Ok(ConfirmationOutcome::UnknownOrder);
            }
        };

        if order.paid {
            return Ok(ConfirmationOutcome::AlreadyPaid);
        }

        if !status.is_paid() {
            info!(%order_id, status = status.status, "payment not completed, nothing to do");
            self.event_sender
                .send_or_log(Event::OrderPaymentRejected {
                    order_id,
                    status: status.status,
                })
                .await;
            return Ok(ConfirmationOutcome::NotPaid {
                status: status.status,
            });
        }

        let reported = Decimal::from(status.amount);
        if reported != order.total {
            return self.flag_amount_mismatch(order, token, reported, &status).await;
        }

        let now = Utc::now();
        let txn = self.db.begin().await?;

        // The losing racer of a duplicate delivery sees zero rows here.
        let flipped = Order::update_many()
            .col_expr(order::Column::Paid, Expr::value(true))
            .col_expr(order::Column::UpdatedAt, Expr::value(now))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Paid.eq(false))
            .exec(&txn)
            .await?;

        if flipped.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(ConfirmationOutcome::AlreadyPaid);
        }

        let raw_payload = serde_json::to_value(&status).ok();
        let txn_row = payment_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            reference: Set(token.to_string()),
            provider_token: Set(Some(token.to_string())),
            amount: Set(reported),
            status: Set(TransactionStatus::Paid),
            raw_payload: Set(raw_payload),
            created_at: Set(now),
        };
        txn_row.insert(&txn).await?;

        txn.commit().await?;

        info!(%order_id, folio = %order.folio, "payment confirmed");
        self.event_sender
            .send_or_log(Event::OrderPaid {
                order_id,
                amount: reported,
            })
            .await;
        self.send_receipt(&order).await;

        Ok(ConfirmationOutcome::Paid)
    }

    /// Privileged fulfilment override. The manual paid path writes the same
    /// ledger as the webhook and never duplicates rows for one order.
    #[instrument(skip(self, update))]
    pub async fn seller_force_update(
        &self,
        actor_id: Uuid,
        order_id: Uuid,
        update: FulfilmentUpdate,
    ) -> Result<order::Model, ServiceError> {
        let actor = self.load_customer(actor_id).await?;
        if !actor.is_privileged() {
            return Err(ServiceError::Unauthorized(
                "fulfilment updates require a seller or staff role".into(),
            ));
        }

        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        let total = order.total;

        let mut active: order::ActiveModel = order.into();
        if let Some(mode) = update.shipping_mode {
            active.shipping_mode = Set(mode);
        }

        match update.paid {
            Some(true) => {
                active.paid = Set(true);

                let existing = PaymentTransaction::find()
                    .filter(payment_transaction::Column::OrderId.eq(order_id))
                    .one(&txn)
                    .await?;
                match existing {
                    Some(row) if row.status == TransactionStatus::Paid => {}
                    Some(row) => {
                        // A non-paid row may carry a mismatched provider
                        // amount; the ledger records the stored total once
                        // the override declares the order settled.
                        let mut row: payment_transaction::ActiveModel = row.into();
                        row.status = Set(TransactionStatus::Paid);
                        row.amount = Set(total);
                        row.update(&txn).await?;
                    }
                    None => {
                        let manual = payment_transaction::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            order_id: Set(order_id),
                            reference: Set(format!("manual-{}", order_id)),
                            provider_token: Set(None),
                            amount: Set(total),
                            status: Set(TransactionStatus::Paid),
                            raw_payload: Set(None),
                            created_at: Set(Utc::now()),
                        };
                        manual.insert(&txn).await?;
                    }
                }
            }
            Some(false) => {
                active.paid = Set(false);
                PaymentTransaction::delete_many()
                    .filter(payment_transaction::Column::OrderId.eq(order_id))
                    .exec(&txn)
                    .await?;
            }
            None => {}
        }

        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderFulfilmentUpdated(order_id))
            .await;
        Ok(updated)
    }

    /// Cancels an unpaid order, restoring every line's quantity to stock and
    /// deleting the order with its lines. Paid orders cannot be cancelled.
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        requester_id: Uuid,
    ) -> Result<(), ServiceError> {
        let requester = self.load_customer(requester_id).await?;

        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order.paid {
            return Err(ServiceError::InvalidState(format!(
                "order {} is paid and cannot be cancelled",
                order.folio
            )));
        }
        let owns_order = order.customer_id == Some(requester.id);
        if !owns_order && !requester.is_staff() {
            return Err(ServiceError::Unauthorized(
                "only the owning customer or staff may cancel an order".into(),
            ));
        }

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;

        for item in &items {
            // Products deleted since purchase match zero rows; nothing to
            // restore in that case.
            Product::update_many()
                .col_expr(
                    product::Column::Stock,
                    Expr::col(product::Column::Stock).add(item.quantity),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(product::Column::Id.eq(item.product_id))
                .exec(&txn)
                .await?;
        }

        OrderItem::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        PaymentTransaction::delete_many()
            .filter(payment_transaction::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        Order::delete_by_id(order_id).exec(&txn).await?;

        txn.commit().await?;

        info!(%order_id, "order cancelled, stock restored");
        self.event_sender
            .send_or_log(Event::OrderCancelled(order_id))
            .await;
        Ok(())
    }

    /// Order summary for the return-URL view; requires no session.
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderDetail, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(self.db.as_ref())
            .await?;

        Ok(OrderDetail { order, items })
    }

    #[instrument(skip(self))]
    pub async fn list_orders(&self, customer_id: Uuid) -> Result<Vec<order::Model>, ServiceError> {
        Ok(Order::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list_all_orders(&self, actor_id: Uuid) -> Result<Vec<order::Model>, ServiceError> {
        let actor = self.load_customer(actor_id).await?;
        if !actor.is_privileged() {
            return Err(ServiceError::Unauthorized(
                "the order dashboard requires a seller or staff role".into(),
            ));
        }
        Ok(Order::find()
            .order_by_desc(order::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?)
    }

    async fn flag_amount_mismatch(
        &self,
        order: order::Model,
        token: &str,
        reported: Decimal,
        status: &crate::gateway::PaymentStatus,
    ) -> Result<ConfirmationOutcome, ServiceError> {
        error!(
            order_id = %order.id,
            folio = %order.folio,
            expected = %order.total,
            %reported,
            "provider-reported amount disagrees with stored total, order flagged"
        );

        let order_id = order.id;
        let expected = order.total;
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let mut active: order::ActiveModel = order.into();
        active.flagged = Set(true);
        active.updated_at = Set(now);
        active.update(&txn).await?;

        let row = payment_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            reference: Set(token.to_string()),
            provider_token: Set(Some(token.to_string())),
            amount: Set(reported),
            status: Set(TransactionStatus::Error),
            raw_payload: Set(serde_json::to_value(status).ok()),
            created_at: Set(now),
        };
        row.insert(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderFlagged {
                order_id,
                expected,
                reported,
            })
            .await;
        Ok(ConfirmationOutcome::AmountMismatch)
    }

    async fn resolve_buyer(
        &self,
        buyer: BuyerInfo,
        shipping_mode: ShippingMode,
    ) -> Result<ResolvedBuyer, ServiceError> {
        let customer = match buyer.customer_id {
            Some(id) => Some(self.load_customer(id).await?),
            None => None,
        };

        let email = buyer
            .email
            .or_else(|| customer.as_ref().map(|c| c.email.clone()))
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| ServiceError::Validation("a contact email is required".into()))?;

        let address = buyer
            .address
            .or_else(|| customer.as_ref().and_then(|c| c.address.clone()));
        let city = buyer
            .city
            .or_else(|| customer.as_ref().and_then(|c| c.city.clone()));
        let postal_code = buyer
            .postal_code
            .or_else(|| customer.as_ref().and_then(|c| c.postal_code.clone()));

        if shipping_mode == ShippingMode::HomeDelivery {
            if address.as_deref().map_or(true, |a| a.trim().is_empty()) {
                return Err(ServiceError::Validation(
                    "home delivery requires a shipping address".into(),
                ));
            }
            if city.as_deref().map_or(true, |c| c.trim().is_empty()) {
                return Err(ServiceError::Validation(
                    "home delivery requires a city".into(),
                ));
            }
        }

        Ok(ResolvedBuyer {
            customer,
            email,
            address,
            city,
            postal_code,
        })
    }

    async fn load_customer(&self, id: Uuid) -> Result<customer::Model, ServiceError> {
        Customer::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", id)))
    }

    async fn require_cart<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart_id: Uuid,
    ) -> Result<cart::Model, ServiceError> {
        Cart::find_by_id(cart_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))
    }

    async fn send_receipt(&self, order: &order::Model) {
        let subject = format!("Payment received for order {}", order.folio);
        let body = format!(
            "Order {} is paid in full ({} {}).",
            order.folio, order.total, self.config.gateway.currency
        );
        if let Err(err) = self.mailer.send(&order.email, &subject, &body).await {
            warn!(folio = %order.folio, "receipt mail failed: {}", err);
        }
    }
}

fn subtotal_of(lines: &[CartLine]) -> Decimal {
    lines.iter().map(|l| l.line_total).sum()
}

/// The provider only accepts whole currency units.
fn integer_amount(total: Decimal) -> Result<i64, ServiceError> {
    if !total.fract().is_zero() {
        return Err(ServiceError::Validation(format!(
            "order total {} is not a whole currency amount",
            total
        )));
    }
    total
        .to_i64()
        .ok_or_else(|| ServiceError::Validation(format!("order total {} is out of range", total)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn integer_amount_accepts_whole_totals() {
        assert_eq!(integer_amount(dec!(5690)).unwrap(), 5690);
        assert_eq!(integer_amount(dec!(0)).unwrap(), 0);
    }

    #[test]
    fn integer_amount_rejects_fractions() {
        assert!(integer_amount(dec!(5690.50)).is_err());
    }
}
