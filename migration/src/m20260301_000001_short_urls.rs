use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ShortUrl::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShortUrl::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ShortUrl::TargetUrl).text().not_null())
                    .col(
                        ColumnDef::new(ShortUrl::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShortUrl::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ShortUrl::Secret)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .to_owned(),
            )
            .await?;

        // 过期扫描按 expires_at 过滤
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_short_urls_expires_at")
                    .table(ShortUrl::Table)
                    .col(ShortUrl::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RedirectTemplate::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RedirectTemplate::TemplateUrl)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RedirectTemplate::TargetTemplate)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RedirectTemplate::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LinkPool::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LinkPool::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LinkPool::OwnerSecret)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(LinkPool::Ids).text().not_null())
                    .col(
                        ColumnDef::new(LinkPool::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LinkPool::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(RedirectTemplate::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_short_urls_expires_at").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ShortUrl::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ShortUrl {
    #[sea_orm(iden = "short_urls")]
    Table,
    Id,
    TargetUrl,
    CreatedAt,
    ExpiresAt,
    Secret,
}

#[derive(DeriveIden)]
enum RedirectTemplate {
    #[sea_orm(iden = "redirect_templates")]
    Table,
    TemplateUrl,
    TargetTemplate,
    CreatedAt,
}

#[derive(DeriveIden)]
enum LinkPool {
    #[sea_orm(iden = "link_pools")]
    Table,
    Id,
    OwnerSecret,
    Ids,
    CreatedAt,
}
