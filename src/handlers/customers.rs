use crate::entities::customer::CustomerRole;
use crate::errors::ApiError;
use crate::handlers::common::{created_response, success_response, validate_input};
use crate::services::customers::{CustomerUpdate, NewCustomer};
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCustomerRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
}

/// Contact-data update; `role` changes additionally require a staff
/// `actor_id`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCustomerRequest {
    pub actor_id: Option<Uuid>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub role: Option<CustomerRole>,
}

#[utoipa::path(
    post,
    path = "/api/v1/customers",
    tag = "customers",
    request_body = CreateCustomerRequest,
    responses(
        (status = 201, description = "Customer created"),
        (status = 400, description = "Invalid or duplicate email")
    )
)]
pub(crate) async fn create_customer(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCustomerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let customer = state
        .services
        .customers
        .create_customer(NewCustomer {
            email: payload.email,
            full_name: payload.full_name,
            address: payload.address,
            city: payload.city,
            postal_code: payload.postal_code,
            phone: payload.phone,
        })
        .await?;
    Ok(created_response(customer))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    tag = "customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "The customer"),
        (status = 404, description = "Unknown customer")
    )
)]
pub(crate) async fn get_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = state.services.customers.get_customer(id).await?;
    Ok(success_response(customer))
}

#[utoipa::path(
    put,
    path = "/api/v1/customers/{id}",
    tag = "customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = UpdateCustomerRequest,
    responses(
        (status = 200, description = "Customer updated"),
        (status = 403, description = "Role change without a staff actor"),
        (status = 404, description = "Unknown customer")
    )
)]
pub(crate) async fn update_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let customer = state
        .services
        .customers
        .update_customer(
            id,
            payload.actor_id,
            CustomerUpdate {
                email: payload.email,
                full_name: payload.full_name,
                address: payload.address,
                city: payload.city,
                postal_code: payload.postal_code,
                phone: payload.phone,
                role: payload.role,
            },
        )
        .await?;
    Ok(success_response(customer))
}

pub fn customer_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/customers", post(create_customer))
        .route("/customers/:id", get(get_customer).put(update_customer))
}
