use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "app_versions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub app_id: Uuid,
    pub name: String,
    /// UI definition document; component id -> component with event bindings
    pub definition: Option<Json>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::apps::Entity",
        from = "Column::AppId",
        to = "super::apps::Column::Id"
    )]
    Apps,
    #[sea_orm(has_many = "super::app_environments::Entity")]
    AppEnvironments,
    #[sea_orm(has_many = "super::data_sources::Entity")]
    DataSources,
    #[sea_orm(has_many = "super::data_queries::Entity")]
    DataQueries,
}

impl Related<super::apps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Apps.def()
    }
}

impl Related<super::app_environments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AppEnvironments.def()
    }
}

impl Related<super::data_sources::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DataSources.def()
    }
}

impl Related<super::data_queries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DataQueries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
