use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::entities::{
    app_environments, app_versions, apps, credentials, data_queries, data_source_options,
    data_sources,
};
use crate::errors::{AppError, CoreResult};
use crate::remap::{self, DocumentKind, IdMap};
use crate::services::app_service::{create_admin_group_permissions, grant_owner};
use crate::services::data_source_options::{OptionEntry, OptionParser};
use crate::services::User;

/// Whole-application serialize/deserialize used to clone apps
#[async_trait]
pub trait AppPorter: Send + Sync {
    async fn export(&self, user: &User, app_id: Uuid) -> CoreResult<AppExport>;
    async fn import(&self, user: &User, bundle: AppExport) -> CoreResult<apps::Model>;
}

/// Serialized app graph. Credentials are referenced by id, never embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppExport {
    pub app: apps::Model,
    pub versions: Vec<app_versions::Model>,
    pub environments: Vec<app_environments::Model>,
    pub data_sources: Vec<data_sources::Model>,
    pub data_source_options: Vec<data_source_options::Model>,
    pub data_queries: Vec<data_queries::Model>,
}

#[derive(Clone)]
pub struct AppImportExportService {
    db: DatabaseConnection,
    parser: Arc<dyn OptionParser>,
}

/// Fresh ids allocated for every row of a bundle before anything is written
#[derive(Default)]
struct ImportIds {
    versions: HashMap<Uuid, Uuid>,
    environments: HashMap<Uuid, Uuid>,
    data_sources: HashMap<Uuid, Uuid>,
    queries: IdMap,
}

impl ImportIds {
    fn allocate(bundle: &AppExport) -> Self {
        let mut ids = Self::default();
        for version in &bundle.versions {
            ids.versions.insert(version.id, Uuid::new_v4());
        }
        for environment in &bundle.environments {
            ids.environments.insert(environment.id, Uuid::new_v4());
        }
        for data_source in &bundle.data_sources {
            ids.data_sources.insert(data_source.id, Uuid::new_v4());
        }
        for query in &bundle.data_queries {
            ids.queries.insert(query.id, Uuid::new_v4());
        }
        ids
    }
}

fn lookup(map: &HashMap<Uuid, Uuid>, id: Uuid, what: &str) -> Result<Uuid, AppError> {
    map.get(&id)
        .copied()
        .ok_or_else(|| AppError::InvalidBundle(format!("{} {} is not part of the bundle", what, id)))
}

impl AppImportExportService {
    pub fn new(db: DatabaseConnection, parser: Arc<dyn OptionParser>) -> Self {
        Self { db, parser }
    }
}

#[async_trait]
impl AppPorter for AppImportExportService {
    async fn export(&self, user: &User, app_id: Uuid) -> CoreResult<AppExport> {
        let app = apps::Entity::find_by_id(app_id)
            .filter(apps::Column::OrganizationId.eq(user.organization_id))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound(app_id))?;

        let versions = app_versions::Entity::find()
            .filter(app_versions::Column::AppId.eq(app.id))
            .order_by_asc(app_versions::Column::CreatedAt)
            .all(&self.db)
            .await?;
        let version_ids: Vec<Uuid> = versions.iter().map(|v| v.id).collect();

        let environments = app_environments::Entity::find()
            .filter(app_environments::Column::VersionId.is_in(version_ids.clone()))
            .order_by_asc(app_environments::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let data_sources = data_sources::Entity::find()
            .filter(data_sources::Column::AppVersionId.is_in(version_ids.clone()))
            .order_by_asc(data_sources::Column::CreatedAt)
            .all(&self.db)
            .await?;
        let data_source_ids: Vec<Uuid> = data_sources.iter().map(|ds| ds.id).collect();

        let data_source_options = data_source_options::Entity::find()
            .filter(data_source_options::Column::DataSourceId.is_in(data_source_ids))
            .all(&self.db)
            .await?;

        let data_queries = data_queries::Entity::find()
            .filter(data_queries::Column::AppVersionId.is_in(version_ids))
            .order_by_asc(data_queries::Column::CreatedAt)
            .all(&self.db)
            .await?;

        info!(
            "Exported app {}: {} versions, {} data sources, {} queries",
            app.id,
            versions.len(),
            data_sources.len(),
            data_queries.len()
        );

        Ok(AppExport {
            app,
            versions,
            environments,
            data_sources,
            data_source_options,
            data_queries,
        })
    }

    async fn import(&self, user: &User, bundle: AppExport) -> CoreResult<apps::Model> {
        let ids = ImportIds::allocate(&bundle);
        let txn = self.db.begin().await?;
        let now = Utc::now();

        let app = apps::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(bundle.app.name.clone()),
            slug: Set(None),
            organization_id: Set(user.organization_id),
            user_id: Set(user.id),
            is_public: Set(bundle.app.is_public),
            is_maintenance_on: Set(bundle.app.is_maintenance_on),
            current_version_id: Set(None),
            icon: Set(bundle.app.icon.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for version in &bundle.versions {
            let definition = version.definition.as_ref().map(|definition| {
                for referenced in remap::collect_query_ids(definition, DocumentKind::Definition) {
                    if ids.queries.get(&referenced).is_none() {
                        warn!(
                            "Version '{}' references query {} outside the bundle",
                            version.name, referenced
                        );
                    }
                }
                remap::remap_definition(definition, &ids.queries)
            });

            app_versions::ActiveModel {
                id: Set(lookup(&ids.versions, version.id, "Version")?),
                app_id: Set(app.id),
                name: Set(version.name.clone()),
                definition: Set(definition),
                created_at: Set(version.created_at),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        for environment in &bundle.environments {
            app_environments::ActiveModel {
                id: Set(lookup(&ids.environments, environment.id, "Environment")?),
                version_id: Set(lookup(&ids.versions, environment.version_id, "Version")?),
                name: Set(environment.name.clone()),
                is_default: Set(environment.is_default),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        for data_source in &bundle.data_sources {
            data_sources::ActiveModel {
                id: Set(lookup(&ids.data_sources, data_source.id, "Data source")?),
                app_id: Set(app.id),
                app_version_id: Set(lookup(&ids.versions, data_source.app_version_id, "Version")?),
                name: Set(data_source.name.clone()),
                kind: Set(data_source.kind.clone()),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        for stored in &bundle.data_source_options {
            let source_document = stored.document()?;

            // Fresh credential rows sealed with the ciphertext of the originals
            let mut entries = Vec::with_capacity(source_document.len());
            for entry in source_document.to_entries() {
                let entry = match (entry.encrypted, entry.credential_id) {
                    (true, Some(credential_id)) => {
                        let ciphertext = credentials::Entity::find_by_id(credential_id)
                            .one(&txn)
                            .await?
                            .map(|credential| credential.value_ciphertext);
                        OptionEntry::secret(entry.key, ciphertext.map(serde_json::Value::String))
                    }
                    _ => entry,
                };
                entries.push(entry);
            }
            let document = self
                .parser
                .parse_options_for_create(entries, false, &txn)
                .await?;

            data_source_options::ActiveModel {
                id: Set(Uuid::new_v4()),
                data_source_id: Set(lookup(&ids.data_sources, stored.data_source_id, "Data source")?),
                environment_id: Set(lookup(&ids.environments, stored.environment_id, "Environment")?),
                options: Set(document.to_json()?),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        for query in &bundle.data_queries {
            let data_source_id = match query.data_source_id {
                Some(id) => Some(lookup(&ids.data_sources, id, "Data source")?),
                None => None,
            };
            let id = ids
                .queries
                .get_uuid(query.id)
                .ok_or_else(|| AppError::InvalidBundle(format!("Query {} has no allocated id", query.id)))?;

            data_queries::ActiveModel {
                id: Set(id),
                app_id: Set(app.id),
                app_version_id: Set(lookup(&ids.versions, query.app_version_id, "Version")?),
                data_source_id: Set(data_source_id),
                name: Set(query.name.clone()),
                kind: Set(query.kind.clone()),
                options: Set(query
                    .options
                    .as_ref()
                    .map(|options| remap::remap_query_options(options, &ids.queries))),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        let current_version_id = match bundle.app.current_version_id {
            Some(id) => Some(lookup(&ids.versions, id, "Version")?),
            None => None,
        };
        let mut active: apps::ActiveModel = app.into();
        active.current_version_id = Set(current_version_id);
        let app = active.update(&txn).await?;

        grant_owner(&txn, app.id, user.id).await?;
        create_admin_group_permissions(&txn, &app).await?;

        txn.commit().await?;

        info!(
            "Imported app '{}' as {} ({} versions, {} queries)",
            app.name,
            app.id,
            bundle.versions.len(),
            bundle.data_queries.len()
        );
        Ok(app)
    }
}
