use crate::errors::ApiError;
use crate::handlers::common::success_response;
use crate::services::orders::ConfirmationOutcome;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Webhook body the provider posts after a payment attempt.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmationForm {
    pub token: String,
}

/// Server-to-server payment confirmation. Responds 200 for every logically
/// handled outcome so the provider stops retrying; only a failed status
/// lookup propagates as 502 and is retried.
#[utoipa::path(
    post,
    path = "/api/v1/payments/confirmation",
    tag = "payments",
    responses(
        (status = 200, description = "Confirmation handled"),
        (status = 502, description = "Status lookup failed; provider should retry")
    )
)]
pub(crate) async fn payment_confirmation(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ConfirmationForm>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.services.orders.confirm_payment(&form.token).await?;

    let outcome_tag = match outcome {
        ConfirmationOutcome::Paid => "paid",
        ConfirmationOutcome::AlreadyPaid => "already_paid",
        ConfirmationOutcome::UnknownOrder => "unknown_order",
        ConfirmationOutcome::AmountMismatch => "amount_mismatch",
        ConfirmationOutcome::NotPaid { .. } => "not_paid",
    };
    Ok(Json(json!({ "outcome": outcome_tag })))
}

/// Post-payment landing view: order summary, no session required.
#[utoipa::path(
    get,
    path = "/api/v1/payments/return/{order_id}",
    tag = "payments",
    params(("order_id" = Uuid, Path, description = "Order id from the return URL")),
    responses(
        (status = 200, description = "Order summary"),
        (status = 404, description = "Unknown order")
    )
)]
pub(crate) async fn payment_return(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.services.orders.get_order(order_id).await?;
    Ok(success_response(detail))
}

pub fn payment_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payments/confirmation", post(payment_confirmation))
        .route("/payments/return/:order_id", get(payment_return))
}
