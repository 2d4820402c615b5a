use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PaymentTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentTransactions::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::OrderId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::Reference)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::ProviderToken)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::Amount)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::RawPayload)
                            .json()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_transactions_order_id")
                            .from(
                                PaymentTransactions::Table,
                                PaymentTransactions::OrderId,
                            )
                            .to(
                                super::m20240115_000007_create_orders_table::Orders::Table,
                                super::m20240115_000007_create_orders_table::Orders::Id,
                            )
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_transactions_order_id")
                    .table(PaymentTransactions::Table)
                    .col(PaymentTransactions::OrderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(PaymentTransactions::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
pub enum PaymentTransactions {
    Table,
    Id,
    OrderId,
    Reference,
    ProviderToken,
    Amount,
    Status,
    RawPayload,
    CreatedAt,
}
