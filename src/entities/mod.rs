//! SeaORM entities for the storefront schema.

pub mod cart;
pub mod cart_item;
pub mod category;
pub mod customer;
pub mod folio_sequence;
pub mod order;
pub mod order_item;
pub mod payment_transaction;
pub mod product;
pub mod support_ticket;
