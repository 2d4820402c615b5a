use crate::entities::order::ShippingMode;
use crate::errors::ApiError;
use crate::handlers::common::{no_content_response, success_response};
use crate::services::orders::FulfilmentUpdate;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// `GET /orders` filter: a customer's history, or the full dashboard for a
/// privileged actor.
#[derive(Debug, Deserialize, IntoParams)]
pub struct OrderListQuery {
    pub customer_id: Option<Uuid>,
    /// Privileged actor requesting every order
    pub actor_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CancelQuery {
    /// Customer requesting the cancellation
    pub requester_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FulfilmentRequest {
    /// Acting seller or staff member
    pub actor_id: Uuid,
    pub shipping_mode: Option<ShippingMode>,
    /// Overrides the payment state and reconciles the transaction ledger
    pub paid: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with its lines"),
        (status = 404, description = "Unknown order")
    )
)]
pub(crate) async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.services.orders.get_order(id).await?;
    Ok(success_response(detail))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    tag = "orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Matching orders"),
        (status = 400, description = "Neither customer_id nor actor_id given"),
        (status = 403, description = "Actor is not a seller or staff")
    )
)]
pub(crate) async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = match (query.customer_id, query.actor_id) {
        (Some(customer_id), _) => state.services.orders.list_orders(customer_id).await?,
        (None, Some(actor_id)) => state.services.orders.list_all_orders(actor_id).await?,
        (None, None) => {
            return Err(ApiError::Validation(
                "customer_id or actor_id is required".into(),
            ))
        }
    };
    Ok(success_response(orders))
}

#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order id"), CancelQuery),
    responses(
        (status = 204, description = "Order cancelled, stock restored"),
        (status = 403, description = "Requester is neither the owner nor staff"),
        (status = 404, description = "Unknown order"),
        (status = 409, description = "Order is paid and cannot be cancelled")
    )
)]
pub(crate) async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<CancelQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .orders
        .cancel_order(id, query.requester_id)
        .await?;
    Ok(no_content_response())
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/fulfilment",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = FulfilmentRequest,
    responses(
        (status = 200, description = "Order updated"),
        (status = 403, description = "Actor is not a seller or staff"),
        (status = 404, description = "Unknown order")
    )
)]
pub(crate) async fn update_fulfilment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FulfilmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .seller_force_update(
            payload.actor_id,
            id,
            FulfilmentUpdate {
                shipping_mode: payload.shipping_mode,
                paid: payload.paid,
            },
        )
        .await?;
    Ok(success_response(order))
}

pub fn order_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order).delete(cancel_order))
        .route("/orders/:id/fulfilment", put(update_fulfilment))
}
