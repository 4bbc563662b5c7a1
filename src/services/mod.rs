pub mod app_environment_service;
pub mod app_import_export_service;
pub mod app_service;
pub mod app_version_service;
pub mod credential_service;
pub mod data_source_options;
pub mod internal_table_service;
pub mod version_clone_service;

pub use app_environment_service::AppEnvironmentService;
pub use app_import_export_service::{AppExport, AppImportExportService, AppPorter};
pub use app_service::{AppPatch, AppService};
pub use app_version_service::{AppVersionService, VersionPatch};
pub use credential_service::CredentialService;
pub use data_source_options::{
    CredentialOptionParser, OptionEntry, OptionParser, OptionValue, OptionsDocument,
};
pub use internal_table_service::{
    AddColumnParams, ColumnDefinition, CreateTableParams, InternalTableService,
    ReconciliationReport, TableAction, TableOperation, TableOperationOutcome,
};
pub use version_clone_service::{CloneSummary, VersionCloneService};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated caller as seen by the services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub organization_id: Uuid,
}
