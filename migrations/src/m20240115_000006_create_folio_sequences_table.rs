use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FolioSequences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FolioSequences::Kind)
                            .string()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FolioSequences::Year).integer().not_null())
                    .col(
                        ColumnDef::new(FolioSequences::Correlative)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FolioSequences::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum FolioSequences {
    Table,
    Kind,
    Year,
    Correlative,
}
