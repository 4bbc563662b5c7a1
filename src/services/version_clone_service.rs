use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::QueryCloneStrategy;
use crate::database::entities::{
    app_environments, app_versions, data_queries, data_source_options, data_sources,
};
use crate::errors::{CoreResult, DataSourceError};
use crate::remap::{self, DocumentKind, IdMap};
use crate::services::app_environment_service::AppEnvironmentService;
use crate::services::credential_service::CredentialService;
use crate::services::data_source_options::{OptionEntry, OptionParser};

/// Counts of rows created by one clone, plus the old -> new query id map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloneSummary {
    pub environments: usize,
    pub data_sources: usize,
    pub options: usize,
    pub credentials: usize,
    pub queries: usize,
    pub query_ids: IdMap,
}

/// Copies the environments, data sources, options, credentials and queries of
/// one version into another and rewires every query reference.
#[derive(Clone)]
pub struct VersionCloneService {
    environments: AppEnvironmentService,
    credentials: CredentialService,
    parser: Arc<dyn OptionParser>,
    strategy: QueryCloneStrategy,
}

/// Mutable state threaded through one clone
struct CloneRun {
    summary: CloneSummary,
    definition: Option<Value>,
    new_queries: Vec<data_queries::Model>,
}

impl VersionCloneService {
    pub fn new(
        db: DatabaseConnection,
        parser: Arc<dyn OptionParser>,
        strategy: QueryCloneStrategy,
    ) -> Self {
        Self {
            environments: AppEnvironmentService::new(db),
            credentials: CredentialService::new(),
            parser,
            strategy,
        }
    }

    pub fn strategy(&self) -> QueryCloneStrategy {
        self.strategy
    }

    /// Clones the graph of `source` into `target` inside `txn`.
    ///
    /// `target` is expected to already carry a copy of the source definition;
    /// its query references are rewritten and persisted as clones are made.
    /// Queries without a data source are not cloned.
    pub async fn clone_version_graph(
        &self,
        source: &app_versions::Model,
        target: &app_versions::Model,
        txn: &DatabaseTransaction,
    ) -> CoreResult<CloneSummary> {
        let source_environments = self
            .environments
            .list_for_version_in(source.id, txn)
            .await?;

        let source_data_sources = data_sources::Entity::find()
            .filter(data_sources::Column::AppVersionId.eq(source.id))
            .order_by_asc(data_sources::Column::CreatedAt)
            .order_by_asc(data_sources::Column::Name)
            .all(txn)
            .await?;

        let mut run = CloneRun {
            summary: CloneSummary::default(),
            definition: target.definition.clone(),
            new_queries: Vec::new(),
        };

        if source_data_sources.is_empty() {
            self.mirror_environments(&source_environments, target, txn, &mut run)
                .await?;
        } else {
            match self.strategy {
                QueryCloneStrategy::PerVersion => {
                    self.clone_per_version(
                        &source_environments,
                        &source_data_sources,
                        source,
                        target,
                        txn,
                        &mut run,
                    )
                    .await?
                }
                QueryCloneStrategy::PerEnvironment => {
                    self.clone_per_environment(
                        &source_environments,
                        &source_data_sources,
                        source,
                        target,
                        txn,
                        &mut run,
                    )
                    .await?
                }
            }
        }

        self.remap_new_query_options(txn, &run).await?;

        info!(
            "Cloned version {} into {}: {} environments, {} data sources, {} options, {} credentials, {} queries",
            source.id,
            target.id,
            run.summary.environments,
            run.summary.data_sources,
            run.summary.options,
            run.summary.credentials,
            run.summary.queries
        );

        Ok(run.summary)
    }

    async fn mirror_environments(
        &self,
        source_environments: &[app_environments::Model],
        target: &app_versions::Model,
        txn: &DatabaseTransaction,
        run: &mut CloneRun,
    ) -> CoreResult<HashMap<Uuid, Uuid>> {
        let mut environment_ids = HashMap::with_capacity(source_environments.len());
        for environment in source_environments {
            let mirrored = self
                .environments
                .create(target.id, &environment.name, environment.is_default, txn)
                .await?;
            environment_ids.insert(environment.id, mirrored.id);
            run.summary.environments += 1;
        }
        Ok(environment_ids)
    }

    async fn clone_per_version(
        &self,
        source_environments: &[app_environments::Model],
        source_data_sources: &[data_sources::Model],
        source: &app_versions::Model,
        target: &app_versions::Model,
        txn: &DatabaseTransaction,
        run: &mut CloneRun,
    ) -> CoreResult<()> {
        let environment_ids = self
            .mirror_environments(source_environments, target, txn, run)
            .await?;

        for data_source in source_data_sources {
            let new_data_source = self.clone_data_source(data_source, target, txn, run).await?;

            for environment in source_environments {
                let Some(&new_environment_id) = environment_ids.get(&environment.id) else {
                    continue;
                };
                self.clone_options(
                    data_source.id,
                    environment.id,
                    new_data_source.id,
                    new_environment_id,
                    txn,
                    run,
                )
                .await?;
            }

            self.clone_queries(source, data_source.id, new_data_source.id, target, txn, run)
                .await?;
            self.persist_definition(target, txn, run).await?;
        }

        Ok(())
    }

    /// One environment, data source, options row and query set per
    /// (data source, environment) pair.
    async fn clone_per_environment(
        &self,
        source_environments: &[app_environments::Model],
        source_data_sources: &[data_sources::Model],
        source: &app_versions::Model,
        target: &app_versions::Model,
        txn: &DatabaseTransaction,
        run: &mut CloneRun,
    ) -> CoreResult<()> {
        for data_source in source_data_sources {
            for environment in source_environments {
                let new_environment = self
                    .environments
                    .create(target.id, &environment.name, environment.is_default, txn)
                    .await?;
                run.summary.environments += 1;

                let new_data_source =
                    self.clone_data_source(data_source, target, txn, run).await?;
                self.clone_options(
                    data_source.id,
                    environment.id,
                    new_data_source.id,
                    new_environment.id,
                    txn,
                    run,
                )
                .await?;

                self.clone_queries(source, data_source.id, new_data_source.id, target, txn, run)
                    .await?;
                self.persist_definition(target, txn, run).await?;
            }
        }

        Ok(())
    }

    async fn clone_data_source(
        &self,
        data_source: &data_sources::Model,
        target: &app_versions::Model,
        txn: &DatabaseTransaction,
        run: &mut CloneRun,
    ) -> CoreResult<data_sources::Model> {
        let now = Utc::now();
        let cloned = data_sources::ActiveModel {
            id: Set(Uuid::new_v4()),
            app_id: Set(target.app_id),
            app_version_id: Set(target.id),
            name: Set(data_source.name.clone()),
            kind: Set(data_source.kind.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;

        run.summary.data_sources += 1;
        debug!("Cloned data source {} -> {}", data_source.id, cloned.id);
        Ok(cloned)
    }

    async fn clone_options(
        &self,
        data_source_id: Uuid,
        environment_id: Uuid,
        new_data_source_id: Uuid,
        new_environment_id: Uuid,
        txn: &DatabaseTransaction,
        run: &mut CloneRun,
    ) -> CoreResult<()> {
        let stored = data_source_options::Entity::find()
            .filter(data_source_options::Column::DataSourceId.eq(data_source_id))
            .filter(data_source_options::Column::EnvironmentId.eq(environment_id))
            .one(txn)
            .await?
            .ok_or(DataSourceError::OptionsNotFound {
                data_source_id,
                environment_id,
            })?;

        let source_document = stored.document()?;
        let entries: Vec<OptionEntry> = source_document
            .to_entries()
            .into_iter()
            .map(OptionEntry::without_secret)
            .collect();

        let document = self
            .parser
            .parse_options_for_create(entries, false, txn)
            .await?;
        run.summary.credentials += self
            .credentials
            .propagate(&document, &source_document, txn)
            .await?;

        let now = Utc::now();
        data_source_options::ActiveModel {
            id: Set(Uuid::new_v4()),
            data_source_id: Set(new_data_source_id),
            environment_id: Set(new_environment_id),
            options: Set(document.to_json()?),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;

        run.summary.options += 1;
        Ok(())
    }

    async fn clone_queries(
        &self,
        source: &app_versions::Model,
        data_source_id: Uuid,
        new_data_source_id: Uuid,
        target: &app_versions::Model,
        txn: &DatabaseTransaction,
        run: &mut CloneRun,
    ) -> CoreResult<()> {
        let queries = data_queries::Entity::find()
            .filter(data_queries::Column::AppVersionId.eq(source.id))
            .filter(data_queries::Column::DataSourceId.eq(data_source_id))
            .order_by_asc(data_queries::Column::CreatedAt)
            .order_by_asc(data_queries::Column::Name)
            .all(txn)
            .await?;

        for query in queries {
            let now = Utc::now();
            let cloned = data_queries::ActiveModel {
                id: Set(Uuid::new_v4()),
                app_id: Set(target.app_id),
                app_version_id: Set(target.id),
                data_source_id: Set(Some(new_data_source_id)),
                name: Set(query.name.clone()),
                kind: Set(query.kind.clone()),
                options: Set(query.options.clone()),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(txn)
            .await?;

            run.summary.query_ids.insert(query.id, cloned.id);
            run.summary.queries += 1;
            run.new_queries.push(cloned);
        }

        Ok(())
    }

    /// Rewrites the target definition with the ids mapped so far
    async fn persist_definition(
        &self,
        target: &app_versions::Model,
        txn: &DatabaseTransaction,
        run: &mut CloneRun,
    ) -> CoreResult<()> {
        let Some(definition) = run.definition.as_mut() else {
            return Ok(());
        };
        remap::remap_in_place(definition, DocumentKind::Definition, &run.summary.query_ids);

        app_versions::ActiveModel {
            id: Set(target.id),
            definition: Set(Some(definition.clone())),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(txn)
        .await?;

        Ok(())
    }

    /// Second pass: queries may trigger sibling queries through `options.events`
    async fn remap_new_query_options(
        &self,
        txn: &DatabaseTransaction,
        run: &CloneRun,
    ) -> CoreResult<()> {
        for query in &run.new_queries {
            let Some(options) = query.options.as_ref() else {
                continue;
            };
            let mut remapped = options.clone();
            let rewritten =
                remap::remap_in_place(&mut remapped, DocumentKind::QueryOptions, &run.summary.query_ids);
            if rewritten == 0 {
                continue;
            }

            data_queries::ActiveModel {
                id: Set(query.id),
                options: Set(Some(remapped)),
                updated_at: Set(Utc::now()),
                ..Default::default()
            }
            .update(txn)
            .await?;
        }

        Ok(())
    }
}
