//! SeaORM 关系型后端，支持 SQLite、MySQL/MariaDB 与 PostgreSQL
//!
//! 没有原生 TTL：`expires_at` 作为普通列保存，由过期扫描回收。

mod connection;
mod converters;
pub mod retry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, sea_query::OnConflict,
};
use tracing::{debug, info};

use crate::config::SqlConfig;
use crate::errors::{Result, VaultError};
use crate::storage::{
    LAST_EXPIRATION_CHECK_KEY, LinkPool, RecordStore, RedirectTemplate, ShortRecord,
};
use migration::entities::{link_pool, redirect_template, short_url, vault_meta};

pub use connection::{connect_generic, connect_sqlite, infer_backend_from_url, run_migrations};
use converters::{
    meta_active_model, model_to_pool, model_to_record, model_to_template, pool_to_active_model,
    record_to_active_model, template_to_active_model,
};
use retry::{RetryConfig, with_retry};

#[derive(Clone)]
pub struct DatabaseStore {
    db: DatabaseConnection,
    kind: &'static str,
    retry: RetryConfig,
}

impl DatabaseStore {
    /// 连接数据库并执行迁移
    pub async fn new(config: &SqlConfig) -> Result<Self> {
        if config.database_url.is_empty() {
            return Err(VaultError::database_config("database_url 未设置"));
        }

        let kind = infer_backend_from_url(&config.database_url)?;
        let db = if kind == "sqlite" {
            connect_sqlite(&config.database_url).await?
        } else {
            connect_generic(&config.database_url, kind, config.pool_size).await?
        };

        run_migrations(&db).await?;

        info!("{} storage initialized", kind.to_uppercase());
        Ok(Self {
            db,
            kind,
            retry: RetryConfig::from(config),
        })
    }

    /// 具体数据库类型：sqlite / mysql / postgres
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl RecordStore for DatabaseStore {
    fn backend_name(&self) -> &'static str {
        "database"
    }

    async fn save(&self, record: &ShortRecord) -> Result<()> {
        let db = &self.db;
        with_retry(&format!("save({})", record.id), self.retry, || async {
            short_url::Entity::insert(record_to_active_model(record))
                .on_conflict(
                    OnConflict::column(short_url::Column::Id)
                        .update_columns([
                            short_url::Column::TargetUrl,
                            short_url::Column::CreatedAt,
                            short_url::Column::ExpiresAt,
                            short_url::Column::Secret,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(db)
                .await
        })
        .await?;

        debug!("Short URL upserted: {}", record.id);
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<ShortRecord>> {
        let db = &self.db;
        let model = with_retry(&format!("find({})", id), self.retry, || async {
            short_url::Entity::find_by_id(id).one(db).await
        })
        .await?;

        Ok(model.map(model_to_record))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let db = &self.db;
        let result = with_retry(&format!("delete({})", id), self.retry, || async {
            short_url::Entity::delete_by_id(id).exec(db).await
        })
        .await?;

        if result.rows_affected > 0 {
            debug!("Short URL deleted: {}", id);
        }
        Ok(())
    }

    async fn find_expired(&self) -> Result<Vec<ShortRecord>> {
        let now = Utc::now();
        let models = short_url::Entity::find()
            .filter(short_url::Column::ExpiresAt.is_not_null())
            .filter(short_url::Column::ExpiresAt.lte(now))
            .order_by_asc(short_url::Column::ExpiresAt)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(model_to_record).collect())
    }

    async fn last_expiration_check(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(meta) = vault_meta::Entity::find_by_id(LAST_EXPIRATION_CHECK_KEY)
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        DateTime::parse_from_rfc3339(&meta.value)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| {
                VaultError::serialization(format!(
                    "Invalid {} value '{}': {}",
                    LAST_EXPIRATION_CHECK_KEY, meta.value, e
                ))
            })
    }

    async fn update_last_expiration_check(&self, at: DateTime<Utc>) -> Result<()> {
        vault_meta::Entity::insert(meta_active_model(LAST_EXPIRATION_CHECK_KEY, at))
            .on_conflict(
                OnConflict::column(vault_meta::Column::Key)
                    .update_columns([vault_meta::Column::Value, vault_meta::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn find_templates(&self) -> Result<Vec<RedirectTemplate>> {
        let models = redirect_template::Entity::find().all(&self.db).await?;
        Ok(models.into_iter().map(model_to_template).collect())
    }

    async fn save_template(&self, template: &RedirectTemplate) -> Result<()> {
        redirect_template::Entity::insert(template_to_active_model(template))
            .on_conflict(
                OnConflict::column(redirect_template::Column::TemplateUrl)
                    .update_columns([
                        redirect_template::Column::TargetTemplate,
                        redirect_template::Column::CreatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn find_pool(&self, id: &str) -> Result<Option<LinkPool>> {
        link_pool::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(model_to_pool)
            .transpose()
    }

    async fn save_pool(&self, pool: &LinkPool) -> Result<()> {
        link_pool::Entity::insert(pool_to_active_model(pool)?)
            .on_conflict(
                OnConflict::column(link_pool::Column::Id)
                    .update_columns([
                        link_pool::Column::OwnerSecret,
                        link_pool::Column::Ids,
                        link_pool::Column::CreatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.db.ping().await?;
        Ok(())
    }
}
