pub use sea_orm_migration::prelude::*;

mod m20240115_000001_create_categories_table;
mod m20240115_000002_create_products_table;
mod m20240115_000003_create_customers_table;
mod m20240115_000004_create_carts_table;
mod m20240115_000005_create_cart_items_table;
mod m20240115_000006_create_folio_sequences_table;
mod m20240115_000007_create_orders_table;
mod m20240115_000008_create_order_items_table;
mod m20240115_000009_create_payment_transactions_table;
mod m20240115_000010_create_support_tickets_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240115_000001_create_categories_table::Migration),
            Box::new(m20240115_000002_create_products_table::Migration),
            Box::new(m20240115_000003_create_customers_table::Migration),
            Box::new(m20240115_000004_create_carts_table::Migration),
            Box::new(m20240115_000005_create_cart_items_table::Migration),
            Box::new(m20240115_000006_create_folio_sequences_table::Migration),
            Box::new(m20240115_000007_create_orders_table::Migration),
            Box::new(m20240115_000008_create_order_items_table::Migration),
            Box::new(m20240115_000009_create_payment_transactions_table::Migration),
            Box::new(m20240115_000010_create_support_tickets_table::Migration),
        ]
    }
}
