use crate::errors::ApiError;
use crate::handlers::common::{created_response, no_content_response, success_response, validate_input};
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateCartRequest {
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Replace the quantity instead of accumulating it
    #[serde(default, rename = "override")]
    pub override_quantity: bool,
}

#[utoipa::path(
    post,
    path = "/api/v1/carts",
    tag = "carts",
    request_body = CreateCartRequest,
    responses((status = 201, description = "Cart created"))
)]
pub(crate) async fn create_cart(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<CreateCartRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let customer_id = payload.and_then(|Json(p)| p.customer_id);
    let cart = state.services.carts.create_cart(customer_id).await?;
    Ok(created_response(cart))
}

#[utoipa::path(
    get,
    path = "/api/v1/carts/{id}",
    tag = "carts",
    params(("id" = Uuid, Path, description = "Cart id")),
    responses(
        (status = 200, description = "Cart with lines at current prices"),
        (status = 404, description = "Unknown cart")
    )
)]
pub(crate) async fn get_cart(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.services.carts.get_cart(id).await?;
    Ok(success_response(view))
}

#[utoipa::path(
    post,
    path = "/api/v1/carts/{id}/items",
    tag = "carts",
    params(("id" = Uuid, Path, description = "Cart id")),
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Cart after the addition"),
        (status = 400, description = "Invalid quantity or unavailable product"),
        (status = 404, description = "Unknown cart or product")
    )
)]
pub(crate) async fn add_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    state
        .services
        .carts
        .add_item(id, payload.product_id, payload.quantity, payload.override_quantity)
        .await?;
    let view = state.services.carts.get_cart(id).await?;
    Ok(success_response(view))
}

#[utoipa::path(
    delete,
    path = "/api/v1/carts/{id}/items/{product_id}",
    tag = "carts",
    params(
        ("id" = Uuid, Path, description = "Cart id"),
        ("product_id" = Uuid, Path, description = "Product to remove")
    ),
    responses(
        (status = 204, description = "Entry removed (or was absent)"),
        (status = 404, description = "Unknown cart")
    )
)]
pub(crate) async fn remove_item(
    State(state): State<Arc<AppState>>,
    Path((id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.carts.remove_item(id, product_id).await?;
    Ok(no_content_response())
}

#[utoipa::path(
    delete,
    path = "/api/v1/carts/{id}/items",
    tag = "carts",
    params(("id" = Uuid, Path, description = "Cart id")),
    responses(
        (status = 204, description = "Cart emptied"),
        (status = 404, description = "Unknown cart")
    )
)]
pub(crate) async fn clear_cart(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.carts.clear(id).await?;
    Ok(no_content_response())
}

pub fn cart_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/carts", post(create_cart))
        .route("/carts/:id", get(get_cart))
        .route("/carts/:id/items", post(add_item).delete(clear_cart))
        .route("/carts/:id/items/:product_id", delete(remove_item))
}
