use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "data_queries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub app_id: Uuid,
    pub app_version_id: Uuid,
    /// None for derived/utility queries
    pub data_source_id: Option<Uuid>,
    pub name: String,
    pub kind: String,
    /// May reference sibling queries through `events[*].queryId`
    pub options: Option<Json>,
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
    #[sea_orm(
        belongs_to = "super::data_sources::Entity",
        from = "Column::DataSourceId",
        to = "super::data_sources::Column::Id"
    )]
    DataSources,
}

impl Related<super::app_versions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AppVersions.def()
    }
}

impl Related<super::data_sources::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DataSources.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
