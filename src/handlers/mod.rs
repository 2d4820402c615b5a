pub mod carts;
pub mod catalog;
pub mod checkout;
pub mod common;
pub mod customers;
pub mod health;
pub mod orders;
pub mod payments;
pub mod tickets;
