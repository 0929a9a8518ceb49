use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VaultMeta::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VaultMeta::Key)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VaultMeta::Value).text().not_null())
                    .col(
                        ColumnDef::new(VaultMeta::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VaultMeta::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VaultMeta {
    #[sea_orm(iden = "vault_meta")]
    Table,
    Key,
    Value,
    UpdatedAt,
}
