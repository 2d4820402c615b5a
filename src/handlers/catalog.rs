use crate::errors::ApiError;
use crate::handlers::common::{created_response, success_response, validate_input};
use crate::services::catalog::{NewProduct, ProductFilter, ProductUpdate};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Browse filters for `GET /products`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductListQuery {
    /// Restrict to a category slug
    pub category: Option<String>,
    /// Only products that are available and in stock
    #[serde(default)]
    pub available: bool,
    /// Only products on promotion
    #[serde(default)]
    pub promotions: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    /// Acting seller; the role is read from the customer record
    pub seller_id: Uuid,
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub promo_price: Option<Decimal>,
    #[serde(default)]
    pub on_promotion: bool,
    #[validate(range(min = 0))]
    pub stock: i32,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

/// Partial product update; absent fields keep their current value. Clearing
/// a promotion is done by setting `on_promotion` to false.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    /// Acting seller; the role is read from the customer record
    pub seller_id: Uuid,
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub promo_price: Option<Decimal>,
    pub on_promotion: Option<bool>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub available: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "catalog",
    responses((status = 200, description = "All categories"))
)]
pub(crate) async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(success_response(categories))
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    tag = "catalog",
    params(ProductListQuery),
    responses((status = 200, description = "Matching products"))
)]
pub(crate) async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ProductFilter {
        category_slug: query.category,
        only_available: query.available,
        only_promotions: query.promotions,
    };
    let products = state.services.catalog.list_products(filter).await?;
    Ok(success_response(products))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{slug}",
    tag = "catalog",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "The product"),
        (status = 404, description = "Unknown slug")
    )
)]
pub(crate) async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.services.catalog.get_product(&slug).await?;
    Ok(success_response(product))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    tag = "catalog",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created"),
        (status = 403, description = "Actor is not a seller or staff")
    )
)]
pub(crate) async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let new = NewProduct {
        category_id: payload.category_id,
        name: payload.name,
        slug: payload.slug,
        description: payload.description,
        price: payload.price,
        promo_price: payload.promo_price,
        on_promotion: payload.on_promotion,
        stock: payload.stock,
        available: payload.available,
    };
    let product = state
        .services
        .catalog
        .create_product(payload.seller_id, new)
        .await?;
    Ok(created_response(product))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    tag = "catalog",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated"),
        (status = 403, description = "Actor is not a seller or staff"),
        (status = 404, description = "Unknown product")
    )
)]
pub(crate) async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let update = ProductUpdate {
        category_id: payload.category_id.map(Some),
        name: payload.name,
        slug: payload.slug,
        description: payload.description,
        price: payload.price,
        promo_price: payload.promo_price.map(Some),
        on_promotion: payload.on_promotion,
        stock: payload.stock,
        available: payload.available,
    };
    let product = state
        .services
        .catalog
        .update_product(payload.seller_id, id, update)
        .await?;
    Ok(success_response(product))
}

pub fn catalog_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:slug",
            get(get_product).put(update_product),
        )
}
