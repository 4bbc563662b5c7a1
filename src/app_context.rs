use std::sync::Arc;

use anyhow::Result;
use sea_orm::DatabaseConnection;

use crate::config::CoreConfig;
use crate::database::establish_connection;
use crate::services::{
    AppEnvironmentService, AppImportExportService, AppService, AppVersionService,
    CredentialOptionParser, InternalTableService, OptionParser, VersionCloneService,
};

/// Shared application context exposing the core services over the metadata
/// store and the internal data store.
#[derive(Clone)]
pub struct AppContext {
    db: DatabaseConnection,
    internal_db: DatabaseConnection,
    config: CoreConfig,
    app_service: Arc<AppService>,
    app_version_service: Arc<AppVersionService>,
    app_environment_service: Arc<AppEnvironmentService>,
    version_clone_service: Arc<VersionCloneService>,
    import_export_service: Arc<AppImportExportService>,
    internal_table_service: Arc<InternalTableService>,
}

impl AppContext {
    pub fn new(db: DatabaseConnection, internal_db: DatabaseConnection, config: CoreConfig) -> Self {
        Self::with_option_parser(db, internal_db, config, Arc::new(CredentialOptionParser::new()))
    }

    /// Same as [`AppContext::new`] with a connector-specific option parser
    pub fn with_option_parser(
        db: DatabaseConnection,
        internal_db: DatabaseConnection,
        config: CoreConfig,
        parser: Arc<dyn OptionParser>,
    ) -> Self {
        let version_clone_service = VersionCloneService::new(
            db.clone(),
            parser.clone(),
            config.query_clone_strategy,
        );
        let app_version_service = AppVersionService::new(
            db.clone(),
            version_clone_service.clone(),
            config.default_environments.clone(),
        );
        let import_export_service = Arc::new(AppImportExportService::new(db.clone(), parser));
        let app_service = AppService::new(
            db.clone(),
            app_version_service.clone(),
            import_export_service.clone(),
        );

        Self {
            app_environment_service: Arc::new(AppEnvironmentService::new(db.clone())),
            internal_table_service: Arc::new(InternalTableService::new(
                db.clone(),
                internal_db.clone(),
            )),
            app_service: Arc::new(app_service),
            app_version_service: Arc::new(app_version_service),
            version_clone_service: Arc::new(version_clone_service),
            import_export_service,
            db,
            internal_db,
            config,
        }
    }

    /// Connect both stores described by `config`
    pub async fn connect(config: CoreConfig) -> Result<Self> {
        let db = establish_connection(&config.metadata_database_url, false).await?;
        let internal_db = establish_connection(&config.internal_database_url, false).await?;
        Ok(Self::new(db, internal_db, config))
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn internal_db(&self) -> &DatabaseConnection {
        &self.internal_db
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn app_service(&self) -> Arc<AppService> {
        self.app_service.clone()
    }

    pub fn app_version_service(&self) -> Arc<AppVersionService> {
        self.app_version_service.clone()
    }

    pub fn app_environment_service(&self) -> Arc<AppEnvironmentService> {
        self.app_environment_service.clone()
    }

    pub fn version_clone_service(&self) -> Arc<VersionCloneService> {
        self.version_clone_service.clone()
    }

    pub fn import_export_service(&self) -> Arc<AppImportExportService> {
        self.import_export_service.clone()
    }

    pub fn internal_table_service(&self) -> Arc<InternalTableService> {
        self.internal_table_service.clone()
    }
}
