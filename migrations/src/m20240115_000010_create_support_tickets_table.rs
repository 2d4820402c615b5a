use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SupportTickets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SupportTickets::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SupportTickets::Folio)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(SupportTickets::CustomerId).uuid().null())
                    .col(ColumnDef::new(SupportTickets::FullName).string().not_null())
                    .col(ColumnDef::new(SupportTickets::Email).string().not_null())
                    .col(ColumnDef::new(SupportTickets::Kind).string().not_null())
                    .col(ColumnDef::new(SupportTickets::OrderFolio).string().null())
                    .col(ColumnDef::new(SupportTickets::Subject).string().not_null())
                    .col(ColumnDef::new(SupportTickets::Body).text().not_null())
                    .col(
                        ColumnDef::new(SupportTickets::Status)
                            .string()
                            .not_null()
                            .default("open"),
                    )
                    .col(
                        ColumnDef::new(SupportTickets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SupportTickets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_support_tickets_status")
                    .table(SupportTickets::Table)
                    .col(SupportTickets::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SupportTickets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum SupportTickets {
    Table,
    Id,
    Folio,
    CustomerId,
    FullName,
    Email,
    Kind,
    OrderFolio,
    Subject,
    Body,
    Status,
    CreatedAt,
    UpdatedAt,
}
