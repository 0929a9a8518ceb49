use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "redirect_templates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub template_url: String,
    #[sea_orm(column_type = "Text")]
    pub target_template: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
