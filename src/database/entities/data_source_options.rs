use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::services::data_source_options::OptionsDocument;

/// Connection options of one data source in one environment
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "data_source_options")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub data_source_id: Uuid,
    pub environment_id: Uuid,
    /// key -> {value, encrypted, credential_id}
    pub options: Json,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::data_sources::Entity",
        from = "Column::DataSourceId",
        to = "super::data_sources::Column::Id"
    )]
    DataSources,
    #[sea_orm(
        belongs_to = "super::app_environments::Entity",
        from = "Column::EnvironmentId",
        to = "super::app_environments::Column::Id"
    )]
    AppEnvironments,
}

impl Related<super::data_sources::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DataSources.def()
    }
}

impl Related<super::app_environments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AppEnvironments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parse the stored options into a typed document
    pub fn document(&self) -> Result<OptionsDocument, serde_json::Error> {
        OptionsDocument::from_json(&self.options)
    }
}
