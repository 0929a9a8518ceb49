use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::storage::{LinkPool, RedirectTemplate, ShortRecord};
use migration::entities::{link_pool, redirect_template, short_url, vault_meta};

pub fn model_to_record(model: short_url::Model) -> ShortRecord {
    ShortRecord {
        id: model.id,
        target_url: model.target_url,
        created_at: model.created_at,
        expires_at: model.expires_at,
        secret: model.secret,
    }
}

pub fn record_to_active_model(record: &ShortRecord) -> short_url::ActiveModel {
    use sea_orm::ActiveValue::Set;

    short_url::ActiveModel {
        id: Set(record.id.clone()),
        target_url: Set(record.target_url.clone()),
        created_at: Set(record.created_at),
        expires_at: Set(record.expires_at),
        secret: Set(record.secret.clone()),
    }
}

pub fn model_to_template(model: redirect_template::Model) -> RedirectTemplate {
    RedirectTemplate {
        template_url: model.template_url,
        target_template: model.target_template,
        created_at: model.created_at,
    }
}

pub fn template_to_active_model(template: &RedirectTemplate) -> redirect_template::ActiveModel {
    use sea_orm::ActiveValue::Set;

    redirect_template::ActiveModel {
        template_url: Set(template.template_url.clone()),
        target_template: Set(template.target_template.clone()),
        created_at: Set(template.created_at),
    }
}

/// 短码列表以 JSON 数组存储
pub fn model_to_pool(model: link_pool::Model) -> Result<LinkPool> {
    Ok(LinkPool {
        id: model.id,
        owner_secret: model.owner_secret,
        ids: serde_json::from_str(&model.ids)?,
        created_at: model.created_at,
    })
}

pub fn pool_to_active_model(pool: &LinkPool) -> Result<link_pool::ActiveModel> {
    use sea_orm::ActiveValue::Set;

    Ok(link_pool::ActiveModel {
        id: Set(pool.id.clone()),
        owner_secret: Set(pool.owner_secret.clone()),
        ids: Set(serde_json::to_string(&pool.ids)?),
        created_at: Set(pool.created_at),
    })
}

pub fn meta_active_model(key: &str, value: DateTime<Utc>) -> vault_meta::ActiveModel {
    use sea_orm::ActiveValue::Set;

    vault_meta::ActiveModel {
        key: Set(key.to_string()),
        value: Set(value.to_rfc3339()),
        updated_at: Set(Utc::now()),
    }
}
