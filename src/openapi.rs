use utoipa::OpenApi;

use crate::entities::{
    cart, cart_item, category, customer, order, order_item, payment_transaction, product,
    support_ticket,
};
use crate::errors::ErrorResponse;
use crate::handlers;
use crate::services::carts::{CartLine, CartView};
use crate::services::orders::{OrderDetail, PlacedOrder};
use crate::services::pricing::Totals;

/// OpenAPI description of the storefront API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Snake Shop API",
        description = "Storefront backend: catalog, carts, checkout against a \
            Flow-style payment gateway, folio sequencing, and support tickets."
    ),
    paths(
        handlers::health::health_check,
        handlers::health::status_check,
        handlers::catalog::list_categories,
        handlers::catalog::list_products,
        handlers::catalog::get_product,
        handlers::catalog::create_product,
        handlers::catalog::update_product,
        handlers::customers::create_customer,
        handlers::customers::get_customer,
        handlers::customers::update_customer,
        handlers::carts::create_cart,
        handlers::carts::get_cart,
        handlers::carts::add_item,
        handlers::carts::remove_item,
        handlers::carts::clear_cart,
        handlers::checkout::quote,
        handlers::checkout::checkout,
        handlers::payments::payment_confirmation,
        handlers::payments::payment_return,
        handlers::orders::get_order,
        handlers::orders::list_orders,
        handlers::orders::cancel_order,
        handlers::orders::update_fulfilment,
        handlers::tickets::open_ticket,
        handlers::tickets::list_tickets,
        handlers::tickets::update_ticket_status,
    ),
    components(schemas(
        category::Model,
        product::Model,
        customer::Model,
        customer::CustomerRole,
        cart::Model,
        cart::CartStatus,
        cart_item::Model,
        order::Model,
        order::ShippingMode,
        order_item::Model,
        payment_transaction::Model,
        payment_transaction::TransactionStatus,
        support_ticket::Model,
        support_ticket::TicketKind,
        support_ticket::TicketStatus,
        CartLine,
        CartView,
        Totals,
        PlacedOrder,
        OrderDetail,
        ErrorResponse,
        handlers::catalog::CreateProductRequest,
        handlers::catalog::UpdateProductRequest,
        handlers::customers::CreateCustomerRequest,
        handlers::customers::UpdateCustomerRequest,
        handlers::carts::CreateCartRequest,
        handlers::carts::AddItemRequest,
        handlers::checkout::QuoteRequest,
        handlers::checkout::CheckoutRequest,
        handlers::payments::ConfirmationForm,
        handlers::orders::FulfilmentRequest,
        handlers::tickets::OpenTicketRequest,
        handlers::tickets::TicketStatusRequest,
    )),
    tags(
        (name = "health", description = "Liveness and readiness"),
        (name = "catalog", description = "Categories and products"),
        (name = "customers", description = "Customer profiles"),
        (name = "carts", description = "Shopping carts"),
        (name = "checkout", description = "Quotes and order placement"),
        (name = "payments", description = "Provider webhook and return view"),
        (name = "orders", description = "Order history and fulfilment"),
        (name = "tickets", description = "Post-sale support"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_builds_and_covers_the_surface() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().unwrap();
        assert!(json.contains("/api/v1/checkout"));
        assert!(json.contains("/api/v1/payments/confirmation"));
        assert!(json.contains("/api/v1/tickets"));
    }
}
