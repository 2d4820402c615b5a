use crate::entities::order::ShippingMode;
use crate::errors::ApiError;
use crate::handlers::common::{created_response, success_response, validate_input};
use crate::services::orders::BuyerInfo;
use crate::AppState;
use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct QuoteRequest {
    pub cart_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub shipping_mode: ShippingMode,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    pub cart_id: Uuid,
    pub shipping_mode: ShippingMode,
    /// Known customer placing the order; omit for guest checkout
    pub customer_id: Option<Uuid>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/quote",
    tag = "checkout",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Recomputed totals"),
        (status = 404, description = "Unknown cart or customer")
    )
)]
pub(crate) async fn quote(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let totals = state
        .services
        .orders
        .quote(payload.cart_id, payload.customer_id, payload.shipping_mode)
        .await?;
    Ok(success_response(totals))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    tag = "checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order placed; redirect the buyer to the payment page"),
        (status = 400, description = "Missing buyer data or empty cart"),
        (status = 422, description = "Insufficient stock"),
        (status = 502, description = "Payment provider unreachable; nothing was charged")
    )
)]
pub(crate) async fn checkout(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let buyer = BuyerInfo {
        customer_id: payload.customer_id,
        email: payload.email,
        address: payload.address,
        city: payload.city,
        postal_code: payload.postal_code,
    };
    let placed = state
        .services
        .orders
        .place_order(payload.cart_id, buyer, payload.shipping_mode)
        .await?;
    Ok(created_response(placed))
}

pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/checkout/quote", post(quote))
        .route("/checkout", post(checkout))
}
