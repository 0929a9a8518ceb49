pub mod link_pool;
pub mod redirect_template;
pub mod short_url;
pub mod vault_meta;

pub use link_pool::Entity as LinkPoolEntity;
pub use redirect_template::Entity as RedirectTemplateEntity;
pub use short_url::Entity as ShortUrlEntity;
pub use vault_meta::Entity as VaultMetaEntity;
