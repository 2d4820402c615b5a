pub mod carts;
pub mod catalog;
pub mod customers;
pub mod orders;
pub mod pricing;
pub mod sequences;
pub mod tickets;
