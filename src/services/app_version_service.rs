use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::config::EnvironmentDefault;
use crate::database::begin_scope;
use crate::database::entities::{
    app_environments, app_versions, apps, data_queries, data_source_options, data_sources,
};
use crate::errors::{AppError, CoreResult, VersionError};
use crate::services::app_environment_service::AppEnvironmentService;
use crate::services::credential_service::CredentialService;
use crate::services::data_source_options::OptionsDocument;
use crate::services::version_clone_service::VersionCloneService;

/// Fields of a version that may be edited; `None` leaves a field as is
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionPatch {
    pub name: Option<String>,
    pub definition: Option<Value>,
}

/// Service for creating, editing and deleting app versions
#[derive(Clone)]
pub struct AppVersionService {
    db: DatabaseConnection,
    environments: AppEnvironmentService,
    cloner: VersionCloneService,
    default_environments: Vec<EnvironmentDefault>,
}

impl AppVersionService {
    pub fn new(
        db: DatabaseConnection,
        cloner: VersionCloneService,
        default_environments: Vec<EnvironmentDefault>,
    ) -> Self {
        Self {
            environments: AppEnvironmentService::new(db.clone()),
            db,
            cloner,
            default_environments,
        }
    }

    /// Create a version of `app`, empty or cloned from `from_version_id`.
    ///
    /// The version row and every cloned child commit together.
    pub async fn create_version(
        &self,
        app: &apps::Model,
        name: &str,
        from_version_id: Option<Uuid>,
        scope: Option<&DatabaseTransaction>,
    ) -> CoreResult<app_versions::Model> {
        let txn = begin_scope(&self.db, scope).await?;

        ensure_name_available(&txn, app.id, name, None).await?;

        let source = match from_version_id {
            Some(source_id) => Some(
                app_versions::Entity::find_by_id(source_id)
                    .filter(app_versions::Column::AppId.eq(app.id))
                    .one(&txn)
                    .await?
                    .ok_or(VersionError::SourceNotFound(source_id))?,
            ),
            None => None,
        };

        let now = Utc::now();
        let version = app_versions::ActiveModel {
            id: Set(Uuid::new_v4()),
            app_id: Set(app.id),
            name: Set(name.to_string()),
            definition: Set(source.as_ref().and_then(|s| s.definition.clone())),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        match &source {
            Some(source) => {
                self.cloner.clone_version_graph(source, &version, &txn).await?;
            }
            None => {
                self.environments
                    .create_defaults(version.id, &self.default_environments, &txn)
                    .await?;
            }
        }

        let version = app_versions::Entity::find_by_id(version.id)
            .one(&txn)
            .await?
            .ok_or(VersionError::NotFound(version.id))?;

        txn.commit().await?;

        match source {
            Some(source) => info!(
                "Created version '{}' ({}) of app {} from version {}",
                version.name, version.id, app.id, source.id
            ),
            None => info!(
                "Created version '{}' ({}) of app {}",
                version.name, version.id, app.id
            ),
        }

        Ok(version)
    }

    pub async fn update_version(
        &self,
        version: &app_versions::Model,
        patch: VersionPatch,
        scope: Option<&DatabaseTransaction>,
    ) -> CoreResult<app_versions::Model> {
        let txn = begin_scope(&self.db, scope).await?;

        let app = find_app(&txn, version.app_id).await?;
        if app.is_released_version(version.id) {
            return Err(VersionError::Released { action: "update" }.into());
        }

        let mut active: app_versions::ActiveModel = version.clone().into();
        if let Some(name) = patch.name {
            if name != version.name {
                ensure_name_available(&txn, version.app_id, &name, Some(version.id)).await?;
            }
            active.name = Set(name);
        }
        if let Some(definition) = patch.definition {
            active.definition = Set(Some(definition));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!("Updated version '{}' ({})", updated.name, updated.id);
        Ok(updated)
    }

    /// Delete a version that is not the app's released version, with its
    /// environments, data sources, options, credentials and queries.
    pub async fn delete_version(
        &self,
        app: &apps::Model,
        version: &app_versions::Model,
        scope: Option<&DatabaseTransaction>,
    ) -> CoreResult<()> {
        if version.app_id != app.id {
            return Err(VersionError::NotFound(version.id).into());
        }

        let txn = begin_scope(&self.db, scope).await?;

        // Re-read the release pointer inside the transaction
        let app = find_app(&txn, app.id).await?;
        if app.is_released_version(version.id) {
            return Err(VersionError::Released { action: "delete" }.into());
        }

        purge_versions(&txn, &[version.id]).await?;
        txn.commit().await?;

        info!("Deleted version '{}' ({}) of app {}", version.name, version.id, app.id);
        Ok(())
    }

    pub async fn find_version(&self, id: Uuid) -> CoreResult<app_versions::Model> {
        let version = app_versions::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(VersionError::NotFound(id))?;
        Ok(version)
    }

    /// Versions of an app, newest first
    pub async fn fetch_versions(&self, app_id: Uuid) -> CoreResult<Vec<app_versions::Model>> {
        let versions = app_versions::Entity::find()
            .filter(app_versions::Column::AppId.eq(app_id))
            .order_by_desc(app_versions::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(versions)
    }

    pub async fn find_data_queries_for_version(
        &self,
        version_id: Uuid,
    ) -> CoreResult<Vec<data_queries::Model>> {
        let queries = data_queries::Entity::find()
            .filter(data_queries::Column::AppVersionId.eq(version_id))
            .order_by_asc(data_queries::Column::CreatedAt)
            .order_by_asc(data_queries::Column::Name)
            .all(&self.db)
            .await?;
        Ok(queries)
    }
}

async fn find_app<C: ConnectionTrait>(conn: &C, app_id: Uuid) -> CoreResult<apps::Model> {
    let app = apps::Entity::find_by_id(app_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound(app_id))?;
    Ok(app)
}

async fn ensure_name_available<C: ConnectionTrait>(
    conn: &C,
    app_id: Uuid,
    name: &str,
    except: Option<Uuid>,
) -> CoreResult<()> {
    let mut query = app_versions::Entity::find()
        .filter(app_versions::Column::AppId.eq(app_id))
        .filter(app_versions::Column::Name.eq(name));
    if let Some(version_id) = except {
        query = query.filter(app_versions::Column::Id.ne(version_id));
    }

    if query.one(conn).await?.is_some() {
        return Err(VersionError::NameTaken(name.to_string()).into());
    }
    Ok(())
}

/// Removes everything hanging off the given versions, then the versions.
///
/// Children go first: options and their credentials, queries, data sources,
/// environments.
pub(crate) async fn purge_versions<C: ConnectionTrait>(
    conn: &C,
    version_ids: &[Uuid],
) -> CoreResult<()> {
    if version_ids.is_empty() {
        return Ok(());
    }

    let data_source_ids: Vec<Uuid> = data_sources::Entity::find()
        .filter(data_sources::Column::AppVersionId.is_in(version_ids.to_vec()))
        .all(conn)
        .await?
        .into_iter()
        .map(|data_source| data_source.id)
        .collect();

    if !data_source_ids.is_empty() {
        let options = data_source_options::Entity::find()
            .filter(data_source_options::Column::DataSourceId.is_in(data_source_ids.clone()))
            .all(conn)
            .await?;

        data_source_options::Entity::delete_many()
            .filter(data_source_options::Column::DataSourceId.is_in(data_source_ids.clone()))
            .exec(conn)
            .await?;

        let credentials = CredentialService::new();
        for row in &options {
            let document: OptionsDocument = row.document()?;
            credentials.delete_for_document(&document, conn).await?;
        }
    }

    data_queries::Entity::delete_many()
        .filter(data_queries::Column::AppVersionId.is_in(version_ids.to_vec()))
        .exec(conn)
        .await?;

    data_sources::Entity::delete_many()
        .filter(data_sources::Column::AppVersionId.is_in(version_ids.to_vec()))
        .exec(conn)
        .await?;

    app_environments::Entity::delete_many()
        .filter(app_environments::Column::VersionId.is_in(version_ids.to_vec()))
        .exec(conn)
        .await?;

    app_versions::Entity::delete_many()
        .filter(app_versions::Column::Id.is_in(version_ids.to_vec()))
        .exec(conn)
        .await?;

    Ok(())
}
