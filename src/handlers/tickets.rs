use crate::entities::support_ticket::{TicketKind, TicketStatus};
use crate::errors::ApiError;
use crate::handlers::common::{created_response, success_response, validate_input};
use crate::services::tickets::NewTicket;
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
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OpenTicketRequest {
    pub customer_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    pub kind: TicketKind,
    pub order_folio: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub subject: String,
    #[validate(length(min = 1))]
    pub body: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TicketListQuery {
    /// Acting seller or staff member
    pub actor_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TicketStatusRequest {
    /// Acting seller or staff member
    pub actor_id: Uuid,
    pub status: TicketStatus,
}

#[utoipa::path(
    post,
    path = "/api/v1/tickets",
    tag = "tickets",
    request_body = OpenTicketRequest,
    responses(
        (status = 201, description = "Ticket opened with a fresh folio"),
        (status = 400, description = "Missing contact data")
    )
)]
pub(crate) async fn open_ticket(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OpenTicketRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let ticket = state
        .services
        .tickets
        .open_ticket(NewTicket {
            customer_id: payload.customer_id,
            full_name: payload.full_name,
            email: payload.email,
            kind: payload.kind,
            order_folio: payload.order_folio,
            subject: payload.subject,
            body: payload.body,
        })
        .await?;
    Ok(created_response(ticket))
}

#[utoipa::path(
    get,
    path = "/api/v1/tickets",
    tag = "tickets",
    params(TicketListQuery),
    responses(
        (status = 200, description = "All tickets, newest first"),
        (status = 403, description = "Actor is not a seller or staff")
    )
)]
pub(crate) async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TicketListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let tickets = state.services.tickets.list_tickets(query.actor_id).await?;
    Ok(success_response(tickets))
}

#[utoipa::path(
    put,
    path = "/api/v1/tickets/{id}/status",
    tag = "tickets",
    params(("id" = Uuid, Path, description = "Ticket id")),
    request_body = TicketStatusRequest,
    responses(
        (status = 200, description = "Ticket updated"),
        (status = 403, description = "Actor is not a seller or staff"),
        (status = 404, description = "Unknown ticket")
    )
)]
pub(crate) async fn update_ticket_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TicketStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = state
        .services
        .tickets
        .update_status(payload.actor_id, id, payload.status)
        .await?;
    Ok(success_response(ticket))
}

pub fn ticket_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets", get(list_tickets).post(open_ticket))
        .route("/tickets/:id/status", put(update_ticket_status))
}
