use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Customers::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Customers::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Customers::FullName).string().not_null())
                    .col(
                        ColumnDef::new(Customers::Role)
                            .string()
                            .not_null()
                            .default("customer"),
                    )
                    .col(ColumnDef::new(Customers::Address).string().null())
                    .col(ColumnDef::new(Customers::City).string().null())
                    .col(ColumnDef::new(Customers::PostalCode).string().null())
                    .col(ColumnDef::new(Customers::Phone).string().null())
                    .col(
                        ColumnDef::new(Customers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Customers {
    Table,
    Id,
    Email,
    FullName,
    Role,
    Address,
    City,
    PostalCode,
    Phone,
    CreatedAt,
}
