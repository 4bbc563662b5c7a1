use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "apps")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: Option<String>,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub is_public: bool,
    pub is_maintenance_on: bool,
    /// Released version; immutable while referenced here
    pub current_version_id: Option<Uuid>,
    pub icon: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::app_versions::Entity")]
    AppVersions,
    #[sea_orm(has_many = "super::app_users::Entity")]
    AppUsers,
}

impl Related<super::app_versions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AppVersions.def()
    }
}

impl Related<super::app_users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AppUsers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether `version_id` is the released version of this app
    pub fn is_released_version(&self, version_id: Uuid) -> bool {
        self.current_version_id == Some(version_id)
    }
}
