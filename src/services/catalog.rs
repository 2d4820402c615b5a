use crate::db::DbPool;
use crate::entities::category::{self, Entity as Category};
use crate::entities::customer::{self, Entity as Customer};
use crate::entities::product::{self, Entity as Product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Browse filters for the product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_slug: Option<String>,
    pub only_available: bool,
    pub only_promotions: bool,
}

/// Fields for creating a product. The acting seller is passed separately.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub category_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub promo_price: Option<Decimal>,
    pub on_promotion: bool,
    pub stock: i32,
    pub available: bool,
}

/// Partial product update. Unset fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub category_id: Option<Option<Uuid>>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub promo_price: Option<Option<Decimal>>,
    pub on_promotion: Option<bool>,
    pub stock: Option<i32>,
    pub available: Option<bool>,
}

pub struct CatalogService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        Ok(Category::find()
            .order_by_asc(category::Column::Name)
            .all(self.db.as_ref())
            .await?)
    }

    #[instrument(skip(self, filter))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let mut query = Product::find().order_by_asc(product::Column::Name);

        if let Some(slug) = &filter.category_slug {
            let cat = Category::find()
                .filter(category::Column::Slug.eq(slug.as_str()))
                .one(self.db.as_ref())
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", slug)))?;
            query = query.filter(product::Column::CategoryId.eq(cat.id));
        }
        if filter.only_available {
            query = query
                .filter(product::Column::Available.eq(true))
                .filter(product::Column::Stock.gt(0));
        }
        if filter.only_promotions {
            query = query.filter(product::Column::OnPromotion.eq(true));
        }

        Ok(query.all(self.db.as_ref()).await?)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, slug: &str) -> Result<product::Model, ServiceError> {
        Product::find()
            .filter(product::Column::Slug.eq(slug))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", slug)))
    }

    #[instrument(skip(self, new))]
    pub async fn create_product(
        &self,
        seller_id: Uuid,
        new: NewProduct,
    ) -> Result<product::Model, ServiceError> {
        let seller = self.require_privileged(seller_id).await?;
        validate_product_fields(&new.name, &new.slug, new.price, new.stock)?;
        self.require_unique_slug(&new.slug, None).await?;

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            category_id: Set(new.category_id),
            seller_id: Set(Some(seller.id)),
            name: Set(new.name),
            slug: Set(new.slug),
            description: Set(new.description),
            price: Set(new.price),
            promo_price: Set(new.promo_price),
            on_promotion: Set(new.on_promotion),
            stock: Set(new.stock),
            available: Set(new.available),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(self.db.as_ref()).await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(created.id))
            .await;
        Ok(created)
    }

    /// Price edits change the live catalog only; historical order lines keep
    /// the unit price they were sold at.
    #[instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        seller_id: Uuid,
        product_id: Uuid,
        update: ProductUpdate,
    ) -> Result<product::Model, ServiceError> {
        self.require_privileged(seller_id).await?;

        let existing = Product::find_by_id(product_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        if let Some(slug) = &update.slug {
            if slug != &existing.slug {
                self.require_unique_slug(slug, Some(product_id)).await?;
            }
        }
        if let Some(price) = update.price {
            if price < Decimal::ZERO {
                return Err(ServiceError::Validation(
                    "price must not be negative".into(),
                ));
            }
        }
        if let Some(stock) = update.stock {
            if stock < 0 {
                return Err(ServiceError::Validation(
                    "stock must not be negative".into(),
                ));
            }
        }

        let mut active: product::ActiveModel = existing.into();
        if let Some(category_id) = update.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(slug) = update.slug {
            active.slug = Set(slug);
        }
        if let Some(description) = update.description {
            active.description = Set(description);
        }
        if let Some(price) = update.price {
            active.price = Set(price);
        }
        if let Some(promo_price) = update.promo_price {
            active.promo_price = Set(promo_price);
        }
        if let Some(on_promotion) = update.on_promotion {
            active.on_promotion = Set(on_promotion);
        }
        if let Some(stock) = update.stock {
            active.stock = Set(stock);
        }
        if let Some(available) = update.available {
            active.available = Set(available);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(self.db.as_ref()).await?;
        self.event_sender
            .send_or_log(Event::ProductUpdated(updated.id))
            .await;
        Ok(updated)
    }

    async fn require_privileged(&self, actor_id: Uuid) -> Result<customer::Model, ServiceError> {
        let actor = Customer::find_by_id(actor_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", actor_id)))?;
        if !actor.is_privileged() {
            return Err(ServiceError::Unauthorized(
                "catalog maintenance requires a seller or staff role".into(),
            ));
        }
        Ok(actor)
    }

    async fn require_unique_slug(
        &self,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = Product::find().filter(product::Column::Slug.eq(slug));
        if let Some(id) = exclude {
            query = query.filter(product::Column::Id.ne(id));
        }
        if query.one(self.db.as_ref()).await?.is_some() {
            return Err(ServiceError::Validation(format!(
                "a product with slug '{}' already exists",
                slug
            )));
        }
        Ok(())
    }
}

fn validate_product_fields(
    name: &str,
    slug: &str,
    price: Decimal,
    stock: i32,
) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::Validation("name must not be empty".into()));
    }
    if slug.trim().is_empty() {
        return Err(ServiceError::Validation("slug must not be empty".into()));
    }
    if price < Decimal::ZERO {
        return Err(ServiceError::Validation(
            "price must not be negative".into(),
        ));
    }
    if stock < 0 {
        return Err(ServiceError::Validation(
            "stock must not be negative".into(),
        ));
    }
    Ok(())
}
