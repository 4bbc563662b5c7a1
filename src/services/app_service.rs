use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, Set,
};
use tracing::info;
use uuid::Uuid;

use crate::database::begin_scope;
use crate::database::entities::{
    app_group_permissions, app_users, app_versions, apps, folder_apps, group_permissions,
};
use crate::errors::{AppError, CoreError, CoreResult, VersionError};
use crate::services::app_import_export_service::AppPorter;
use crate::services::app_version_service::{purge_versions, AppVersionService};
use crate::services::User;

pub const DEFAULT_APP_NAME: &str = "Untitled app";
pub const INITIAL_VERSION_NAME: &str = "v1";
pub const ADMIN_GROUP: &str = "admin";
pub const ALL_USERS_GROUP: &str = "all_users";
pub const ADMIN_ROLE: &str = "admin";

/// App permissions granted to a default group when an app is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultAppPermissions {
    pub read: bool,
    pub update: bool,
    pub delete: bool,
}

pub fn fetch_default_app_group_permissions(group: &str) -> Result<DefaultAppPermissions, AppError> {
    match group {
        ALL_USERS_GROUP => Ok(DefaultAppPermissions {
            read: true,
            update: false,
            delete: false,
        }),
        ADMIN_GROUP => Ok(DefaultAppPermissions {
            read: true,
            update: true,
            delete: true,
        }),
        other => Err(AppError::UnknownGroup(other.to_string())),
    }
}

/// Fields of an app that may be edited; `None` leaves a field as is
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub is_public: Option<bool>,
    pub is_maintenance_on: Option<bool>,
    /// Releases the given version; it must belong to the app
    pub current_version_id: Option<Uuid>,
    pub icon: Option<String>,
}

/// Application lifecycle: create, update, clone and delete
#[derive(Clone)]
pub struct AppService {
    db: DatabaseConnection,
    versions: AppVersionService,
    porter: Arc<dyn AppPorter>,
}

impl AppService {
    pub fn new(db: DatabaseConnection, versions: AppVersionService, porter: Arc<dyn AppPorter>) -> Self {
        Self {
            db,
            versions,
            porter,
        }
    }

    /// Create an app owned by `user` with an initial version and default grants
    pub async fn create(&self, user: &User, scope: Option<&DatabaseTransaction>) -> CoreResult<apps::Model> {
        let txn = begin_scope(&self.db, scope).await?;

        let now = Utc::now();
        let app = apps::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(DEFAULT_APP_NAME.to_string()),
            slug: Set(None),
            organization_id: Set(user.organization_id),
            user_id: Set(user.id),
            is_public: Set(false),
            is_maintenance_on: Set(false),
            current_version_id: Set(None),
            icon: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        self.versions
            .create_version(&app, INITIAL_VERSION_NAME, None, Some(&txn))
            .await?;
        grant_owner(&txn, app.id, user.id).await?;
        self.create_app_group_permissions_for_admin(&app, Some(&txn))
            .await?;

        txn.commit().await?;

        info!("Created app {} for user {}", app.id, user.id);
        Ok(app)
    }

    /// Grant every `admin` group of the app's organization its default permissions
    pub async fn create_app_group_permissions_for_admin(
        &self,
        app: &apps::Model,
        scope: Option<&DatabaseTransaction>,
    ) -> CoreResult<Vec<app_group_permissions::Model>> {
        let txn = begin_scope(&self.db, scope).await?;
        let grants = create_admin_group_permissions(&txn, app).await?;
        txn.commit().await?;
        Ok(grants)
    }

    pub async fn find(&self, id: Uuid) -> CoreResult<apps::Model> {
        let app = apps::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound(id))?;
        Ok(app)
    }

    pub async fn find_by_slug(&self, slug: &str) -> CoreResult<apps::Model> {
        apps::Entity::find()
            .filter(apps::Column::Slug.eq(slug))
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("App", slug))
    }

    pub async fn update(
        &self,
        app_id: Uuid,
        patch: AppPatch,
        scope: Option<&DatabaseTransaction>,
    ) -> CoreResult<apps::Model> {
        let txn = begin_scope(&self.db, scope).await?;

        let app = apps::Entity::find_by_id(app_id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound(app_id))?;

        if let Some(version_id) = patch.current_version_id {
            app_versions::Entity::find_by_id(version_id)
                .filter(app_versions::Column::AppId.eq(app_id))
                .one(&txn)
                .await?
                .ok_or(VersionError::NotFound(version_id))?;
        }

        let mut active: apps::ActiveModel = app.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(slug) = patch.slug {
            active.slug = Set(Some(slug));
        }
        if let Some(is_public) = patch.is_public {
            active.is_public = Set(is_public);
        }
        if let Some(is_maintenance_on) = patch.is_maintenance_on {
            active.is_maintenance_on = Set(is_maintenance_on);
        }
        if let Some(version_id) = patch.current_version_id {
            active.current_version_id = Set(Some(version_id));
        }
        if let Some(icon) = patch.icon {
            active.icon = Set(Some(icon));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!("Updated app {}", updated.id);
        Ok(updated)
    }

    /// Copy a whole app through the export/import collaborator
    pub async fn clone_app(&self, existing: &apps::Model, user: &User) -> CoreResult<apps::Model> {
        let bundle = self.porter.export(user, existing.id).await?;
        let cloned = self.porter.import(user, bundle).await?;

        info!("Cloned app {} into {}", existing.id, cloned.id);
        Ok(cloned)
    }

    /// Delete an app with its grants, folders, versions and everything under them
    pub async fn delete(&self, app_id: Uuid, scope: Option<&DatabaseTransaction>) -> CoreResult<()> {
        let txn = begin_scope(&self.db, scope).await?;

        apps::Entity::find_by_id(app_id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound(app_id))?;

        app_users::Entity::delete_many()
            .filter(app_users::Column::AppId.eq(app_id))
            .exec(&txn)
            .await?;

        folder_apps::Entity::delete_many()
            .filter(folder_apps::Column::AppId.eq(app_id))
            .exec(&txn)
            .await?;

        app_group_permissions::Entity::delete_many()
            .filter(app_group_permissions::Column::AppId.eq(app_id))
            .exec(&txn)
            .await?;

        let version_ids: Vec<Uuid> = app_versions::Entity::find()
            .filter(app_versions::Column::AppId.eq(app_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|version| version.id)
            .collect();
        purge_versions(&txn, &version_ids).await?;

        apps::Entity::delete_by_id(app_id).exec(&txn).await?;

        txn.commit().await?;

        info!("Deleted app {} with {} versions", app_id, version_ids.len());
        Ok(())
    }
}

pub(crate) async fn grant_owner<C: ConnectionTrait>(
    conn: &C,
    app_id: Uuid,
    user_id: Uuid,
) -> CoreResult<app_users::Model> {
    let now = Utc::now();
    let app_user = app_users::ActiveModel {
        id: Set(Uuid::new_v4()),
        app_id: Set(app_id),
        user_id: Set(user_id),
        role: Set(ADMIN_ROLE.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;
    Ok(app_user)
}

pub(crate) async fn create_admin_group_permissions<C: ConnectionTrait>(
    conn: &C,
    app: &apps::Model,
) -> CoreResult<Vec<app_group_permissions::Model>> {
    let groups = group_permissions::Entity::find()
        .filter(group_permissions::Column::OrganizationId.eq(app.organization_id))
        .filter(group_permissions::Column::Group.eq(ADMIN_GROUP))
        .all(conn)
        .await?;

    let mut grants = Vec::with_capacity(groups.len());
    for group in groups {
        let permissions = fetch_default_app_group_permissions(&group.group)?;
        let grant = app_group_permissions::ActiveModel {
            id: Set(Uuid::new_v4()),
            group_permission_id: Set(group.id),
            app_id: Set(app.id),
            read: Set(permissions.read),
            update: Set(permissions.update),
            delete: Set(permissions.delete),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await?;
        grants.push(grant);
    }

    Ok(grants)
}
