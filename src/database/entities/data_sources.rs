use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "data_sources")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub app_id: Uuid,
    pub app_version_id: Uuid,
    pub name: String,
    /// Connector type, e.g. "postgresql" or "restapi"
    pub kind: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::app_versions::Entity",
        from = "Column::AppVersionId",
        to = "super::app_versions::Column::Id"
    )]
    AppVersions,
    #[sea_orm(has_many = "super::data_source_options::Entity")]
    DataSourceOptions,
    #[sea_orm(has_many = "super::data_queries::Entity")]
    DataQueries,
}

impl Related<super::app_versions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AppVersions.def()
    }
}

impl Related<super::data_source_options::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DataSourceOptions.def()
    }
}

impl Related<super::data_queries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DataQueries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
