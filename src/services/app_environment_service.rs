use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::debug;
use uuid::Uuid;

use crate::config::EnvironmentDefault;
use crate::database::entities::app_environments;
use crate::errors::CoreResult;

/// Environments scoping data source options within a version
#[derive(Clone)]
pub struct AppEnvironmentService {
    db: DatabaseConnection,
}

impl AppEnvironmentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create<C>(
        &self,
        version_id: Uuid,
        name: &str,
        is_default: bool,
        conn: &C,
    ) -> CoreResult<app_environments::Model>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();
        let environment = app_environments::ActiveModel {
            id: Set(Uuid::new_v4()),
            version_id: Set(version_id),
            name: Set(name.to_string()),
            is_default: Set(is_default),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await?;

        debug!(
            "Created environment '{}' ({}) for version {}",
            environment.name, environment.id, version_id
        );
        Ok(environment)
    }

    pub async fn create_defaults<C>(
        &self,
        version_id: Uuid,
        defaults: &[EnvironmentDefault],
        conn: &C,
    ) -> CoreResult<Vec<app_environments::Model>>
    where
        C: ConnectionTrait,
    {
        let mut created = Vec::with_capacity(defaults.len());
        for default in defaults {
            created.push(
                self.create(version_id, &default.name, default.is_default, conn)
                    .await?,
            );
        }
        Ok(created)
    }

    pub async fn list_for_version(&self, version_id: Uuid) -> CoreResult<Vec<app_environments::Model>> {
        self.list_for_version_in(version_id, &self.db).await
    }

    /// Same as [`Self::list_for_version`] on an explicit connection or transaction
    pub async fn list_for_version_in<C>(
        &self,
        version_id: Uuid,
        conn: &C,
    ) -> CoreResult<Vec<app_environments::Model>>
    where
        C: ConnectionTrait,
    {
        let environments = app_environments::Entity::find()
            .filter(app_environments::Column::VersionId.eq(version_id))
            .order_by_asc(app_environments::Column::CreatedAt)
            .order_by_asc(app_environments::Column::Name)
            .all(conn)
            .await?;
        Ok(environments)
    }
}
