use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Organization-level permission group ("admin", "all_users", custom groups)
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_permissions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub group: String,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::app_group_permissions::Entity")]
    AppGroupPermissions,
}

impl Related<super::app_group_permissions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AppGroupPermissions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
