//! Snake Shop API
//!
//! Storefront backend: catalog, carts, checkout against a Flow-style payment
//! gateway, folio sequencing, and support tickets.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod mailer;
pub mod openapi;
pub mod services;

use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::gateway::PaymentGateway;
use crate::mailer::Mailer;
use crate::services::carts::CartService;
use crate::services::catalog::CatalogService;
use crate::services::customers::CustomerService;
use crate::services::orders::OrderService;
use crate::services::tickets::TicketService;

/// Service registry shared by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub carts: Arc<CartService>,
    pub catalog: Arc<CatalogService>,
    pub customers: Arc<CustomerService>,
    pub orders: Arc<OrderService>,
    pub tickets: Arc<TicketService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: EventSender,
        config: Arc<AppConfig>,
        gateway: Arc<PaymentGateway>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            carts: Arc::new(CartService::new(db.clone(), event_sender.clone())),
            catalog: Arc::new(CatalogService::new(db.clone(), event_sender.clone())),
            customers: Arc::new(CustomerService::new(db.clone())),
            orders: Arc::new(OrderService::new(
                db.clone(),
                event_sender.clone(),
                gateway,
                mailer.clone(),
                config,
            )),
            tickets: Arc::new(TicketService::new(db, event_sender, mailer)),
        }
    }
}

/// Shared application state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub services: AppServices,
    pub event_sender: EventSender,
}

/// All `/api/v1` routes.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(handlers::health::health_routes())
        .merge(handlers::catalog::catalog_routes())
        .merge(handlers::customers::customer_routes())
        .merge(handlers::carts::cart_routes())
        .merge(handlers::checkout::checkout_routes())
        .merge(handlers::payments::payment_routes())
        .merge(handlers::orders::order_routes())
        .merge(handlers::tickets::ticket_routes())
}

/// Builds the full application router with tracing, compression, CORS, and
/// timeout layers.
pub fn app_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);
    let timeout = TimeoutLayer::new(Duration::from_secs(state.config.request_timeout_secs));

    Router::new()
        .nest("/api/v1", api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(timeout)
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::Any;

    let configured: Option<Vec<HeaderValue>> = config
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    match configured {
        Some(origins) => CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    }
}
