//! User-defined tables living in a separate data store.
//!
//! Metadata rows (`internal_tables`) live in the metadata store; the physical
//! tables, named after the metadata row id, live in the internal data store. The
//! two stores cannot share a transaction, so every DDL statement is journalled in
//! `internal_table_operations` before it runs and [`InternalTableService::reconcile`]
//! repairs whatever an interrupted operation left behind.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use chrono::Utc;
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, Statement, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::entities::internal_table_operations::{self, OperationStatus};
use crate::database::entities::internal_tables;
use crate::errors::{CoreResult, InternalTableError};
use crate::services::User;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{(\w+)\}").expect("Invalid placeholder pattern"));

static COLUMN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid column name pattern"));

static ADDED_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^ALTER TABLE "[^"]+" ADD ([A-Za-z_][A-Za-z0-9_]*) "#)
        .expect("Invalid add column pattern")
});

// e.g. integer, varchar(255), numeric(10, 2), double precision, text[]
static DATA_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_ ]*(\(\s*\d+(\s*,\s*\d+)?\s*\))?(\[\])?$")
        .expect("Invalid data type pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum TableAction {
    ViewTables,
    CreateTable,
    AddColumn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub column_name: String,
    pub data_type: String,
}

impl ColumnDefinition {
    pub fn new(column_name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
        }
    }

    fn validate(&self) -> Result<(), InternalTableError> {
        if !COLUMN_NAME.is_match(&self.column_name) {
            return Err(InternalTableError::InvalidIdentifier(self.column_name.clone()));
        }
        if !DATA_TYPE.is_match(self.data_type.trim()) {
            return Err(InternalTableError::InvalidIdentifier(self.data_type.clone()));
        }
        Ok(())
    }

    fn to_sql(&self) -> String {
        format!("{} {}", self.column_name, self.data_type.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTableParams {
    pub table_name: String,
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddColumnParams {
    pub table_name: String,
    pub column: ColumnDefinition,
}

/// Operations accepted by [`InternalTableService::perform`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOperation {
    ViewTables,
    CreateTable(CreateTableParams),
    AddColumn(AddColumnParams),
}

impl TableOperation {
    /// Build an operation from an action name and its JSON parameters
    pub fn from_request(action: &str, params: Value) -> Result<Self, InternalTableError> {
        let action = TableAction::from_str(action)
            .map_err(|_| InternalTableError::UnknownAction(action.to_string()))?;

        let operation = match action {
            TableAction::ViewTables => TableOperation::ViewTables,
            TableAction::CreateTable => TableOperation::CreateTable(parse_params(params)?),
            TableAction::AddColumn => TableOperation::AddColumn(parse_params(params)?),
        };
        Ok(operation)
    }

    pub fn action(&self) -> TableAction {
        match self {
            TableOperation::ViewTables => TableAction::ViewTables,
            TableOperation::CreateTable(_) => TableAction::CreateTable,
            TableOperation::AddColumn(_) => TableAction::AddColumn,
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, InternalTableError> {
    serde_json::from_value(params).map_err(|e| InternalTableError::InvalidParams(e.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableOperationOutcome {
    Tables(Vec<String>),
    TableCreated(internal_tables::Model),
    ColumnAdded(internal_tables::Model),
}

/// What a reconciliation pass repaired
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Physical tables dropped because no metadata row describes them
    pub dropped_tables: Vec<Uuid>,
    /// Metadata rows removed because their physical table is missing
    pub removed_metadata: Vec<Uuid>,
    pub applied_intents: usize,
    pub rolled_back_intents: usize,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_tables.is_empty()
            && self.removed_metadata.is_empty()
            && self.applied_intents == 0
            && self.rolled_back_intents == 0
    }
}

pub fn create_table_statement(table_id: Uuid, columns: &[ColumnDefinition]) -> String {
    let definitions: Vec<String> = columns.iter().map(ColumnDefinition::to_sql).collect();
    format!("CREATE TABLE \"{}\" ({});", table_id, definitions.join(", "))
}

pub fn add_column_statement(table_id: Uuid, column: &ColumnDefinition) -> String {
    format!("ALTER TABLE \"{}\" ADD {};", table_id, column.to_sql())
}

/// Column named by a statement built with [`add_column_statement`]
fn added_column(statement: &str) -> Option<&str> {
    ADDED_COLUMN
        .captures(statement)
        .and_then(|captures| captures.get(1))
        .map(|column| column.as_str())
}

fn drop_table_statement(table_id: Uuid) -> String {
    format!("DROP TABLE IF EXISTS \"{}\";", table_id)
}

/// Table names are stored and looked up without surrounding whitespace
pub fn normalize_table_name(name: &str) -> &str {
    name.trim()
}

/// Placeholder names in order of first appearance
pub fn placeholder_names(path: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    PLACEHOLDER
        .captures_iter(path)
        .filter_map(|captures| captures.get(1))
        .map(|name| name.as_str().to_string())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

#[derive(Clone)]
pub struct InternalTableService {
    db: DatabaseConnection,
    internal: DatabaseConnection,
}

impl InternalTableService {
    pub fn new(db: DatabaseConnection, internal: DatabaseConnection) -> Self {
        Self { db, internal }
    }

    pub async fn perform(
        &self,
        user: &User,
        organization_id: Uuid,
        operation: TableOperation,
    ) -> CoreResult<TableOperationOutcome> {
        debug!(
            "User {} performing {} in organization {}",
            user.id,
            operation.action(),
            organization_id
        );

        match operation {
            TableOperation::ViewTables => {
                Ok(TableOperationOutcome::Tables(self.view_tables(organization_id).await?))
            }
            TableOperation::CreateTable(params) => Ok(TableOperationOutcome::TableCreated(
                self.create_table(organization_id, params).await?,
            )),
            TableOperation::AddColumn(params) => Ok(TableOperationOutcome::ColumnAdded(
                self.add_column(organization_id, params).await?,
            )),
        }
    }

    /// Table names of the organization, ascending
    pub async fn view_tables(&self, organization_id: Uuid) -> CoreResult<Vec<String>> {
        let tables = internal_tables::Entity::find()
            .filter(internal_tables::Column::OrganizationId.eq(organization_id))
            .order_by_asc(internal_tables::Column::TableName)
            .all(&self.db)
            .await?;
        Ok(tables.into_iter().map(|table| table.table_name).collect())
    }

    /// Create the metadata row and the physical table.
    ///
    /// The metadata row only commits once the DDL succeeded.
    pub async fn create_table(
        &self,
        organization_id: Uuid,
        params: CreateTableParams,
    ) -> CoreResult<internal_tables::Model> {
        let table_name = normalize_table_name(&params.table_name).to_string();
        if table_name.is_empty() {
            return Err(InternalTableError::InvalidParams("table_name must not be empty".into()).into());
        }
        if params.columns.is_empty() {
            return Err(
                InternalTableError::InvalidParams("at least one column is required".into()).into(),
            );
        }
        for column in &params.columns {
            column.validate()?;
        }

        if self.find_table(organization_id, &table_name).await?.is_some() {
            return Err(InternalTableError::AlreadyExists(table_name).into());
        }

        let table_id = Uuid::new_v4();
        let statement = create_table_statement(table_id, &params.columns);
        let intent = self
            .record_intent(organization_id, table_id, &table_name, TableAction::CreateTable, &statement)
            .await?;

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let inserted = internal_tables::ActiveModel {
            id: Set(table_id),
            organization_id: Set(organization_id),
            table_name: Set(table_name.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await;

        let table = match inserted {
            Ok(table) => table,
            Err(err) => {
                txn.rollback().await?;
                self.finish_intent(intent, OperationStatus::RolledBack, Some(err.to_string()))
                    .await?;
                return Err(err.into());
            }
        };

        if let Err(err) = self.execute_internal(&statement).await {
            txn.rollback().await?;
            self.finish_intent(intent, OperationStatus::RolledBack, Some(err.to_string()))
                .await?;
            warn!(
                "Rolled back internal table '{}' ({}): {}",
                table_name, table_id, err
            );
            return Err(InternalTableError::Ddl(err).into());
        }

        if let Err(err) = txn.commit().await {
            // Physical table exists without metadata; compensate
            if let Err(drop_err) = self.execute_internal(&drop_table_statement(table_id)).await {
                warn!("Failed to drop orphaned table {}: {}", table_id, drop_err);
            }
            self.finish_intent(intent, OperationStatus::RolledBack, Some(err.to_string()))
                .await?;
            return Err(err.into());
        }

        self.finish_intent(intent, OperationStatus::Applied, None).await?;
        info!(
            "Created internal table '{}' ({}) in organization {}",
            table.table_name, table.id, organization_id
        );
        Ok(table)
    }

    pub async fn add_column(
        &self,
        organization_id: Uuid,
        params: AddColumnParams,
    ) -> CoreResult<internal_tables::Model> {
        params.column.validate()?;

        let table = self
            .find_table(organization_id, &params.table_name)
            .await?
            .ok_or_else(|| {
                InternalTableError::NotFound(vec![normalize_table_name(&params.table_name).to_string()])
            })?;

        let statement = add_column_statement(table.id, &params.column);
        let intent = self
            .record_intent(organization_id, table.id, &table.table_name, TableAction::AddColumn, &statement)
            .await?;

        if let Err(err) = self.execute_internal(&statement).await {
            self.finish_intent(intent, OperationStatus::RolledBack, Some(err.to_string()))
                .await?;
            return Err(InternalTableError::Ddl(err).into());
        }

        self.finish_intent(intent, OperationStatus::Applied, None).await?;
        info!(
            "Added column {} to internal table '{}' ({})",
            params.column.column_name, table.table_name, table.id
        );
        Ok(table)
    }

    /// Percent-decode `path` and substitute every `${name}` with the id of the
    /// organization's internal table of that name.
    pub async fn replace_table_names_at_placeholder(&self, path: &str, user: &User) -> CoreResult<String> {
        let decoded = percent_decode_str(path)
            .decode_utf8()
            .map_err(|e| InternalTableError::InvalidParams(format!("request path: {}", e)))?
            .into_owned();

        let names: Vec<String> = placeholder_names(&decoded)
            .iter()
            .map(|name| normalize_table_name(name).to_string())
            .collect();
        if names.is_empty() {
            return Ok(decoded);
        }

        let tables = internal_tables::Entity::find()
            .filter(internal_tables::Column::OrganizationId.eq(user.organization_id))
            .filter(internal_tables::Column::TableName.is_in(names.clone()))
            .all(&self.db)
            .await?;
        let ids: HashMap<String, String> = tables
            .into_iter()
            .map(|table| (table.table_name.clone(), table.physical_name()))
            .collect();

        let missing: Vec<String> = names.into_iter().filter(|name| !ids.contains_key(name)).collect();
        if !missing.is_empty() {
            return Err(InternalTableError::NotFound(missing).into());
        }

        let replaced = PLACEHOLDER.replace_all(&decoded, |captures: &Captures| {
            ids.get(normalize_table_name(&captures[1]))
                .cloned()
                .unwrap_or_default()
        });
        Ok(replaced.into_owned())
    }

    /// Bring both stores back in line after interrupted operations.
    ///
    /// Meant to run while no table operations are in flight.
    pub async fn reconcile(&self) -> CoreResult<ReconciliationReport> {
        let mut report = ReconciliationReport::default();

        let physical = self.physical_tables().await?;
        let metadata = internal_tables::Entity::find().all(&self.db).await?;
        let known: HashSet<Uuid> = metadata.iter().map(|table| table.id).collect();

        for table_id in physical.iter().filter(|id| !known.contains(*id)) {
            self.execute_internal(&drop_table_statement(*table_id))
                .await
                .map_err(InternalTableError::Ddl)?;
            warn!("Dropped orphaned internal table {}", table_id);
            report.dropped_tables.push(*table_id);
        }

        for table in metadata.iter().filter(|table| !physical.contains(&table.id)) {
            internal_tables::Entity::delete_by_id(table.id)
                .exec(&self.db)
                .await?;
            warn!(
                "Removed metadata for missing internal table '{}' ({})",
                table.table_name, table.id
            );
            report.removed_metadata.push(table.id);
        }

        let pending = internal_table_operations::Entity::find()
            .filter(internal_table_operations::Column::Status.eq(OperationStatus::Pending.as_str()))
            .all(&self.db)
            .await?;

        for intent in pending {
            let table_id = intent.internal_table_id;
            let present = known.contains(&table_id) && physical.contains(&table_id);
            let survived = match TableAction::from_str(&intent.operation) {
                Ok(TableAction::CreateTable) => present,
                Ok(TableAction::AddColumn) if present => match added_column(&intent.statement) {
                    Some(column) => self
                        .physical_columns(table_id)
                        .await?
                        .contains(&column.to_lowercase()),
                    None => false,
                },
                _ => false,
            };

            if survived {
                self.finish_intent(intent, OperationStatus::Applied, None).await?;
                report.applied_intents += 1;
            } else {
                self.finish_intent(
                    intent,
                    OperationStatus::RolledBack,
                    Some("Interrupted before completion".to_string()),
                )
                .await?;
                report.rolled_back_intents += 1;
            }
        }

        info!(
            "Reconciled internal tables: {} dropped, {} metadata rows removed, {} intents applied, {} rolled back",
            report.dropped_tables.len(),
            report.removed_metadata.len(),
            report.applied_intents,
            report.rolled_back_intents
        );
        Ok(report)
    }

    /// Journal entries for one table, oldest first
    pub async fn operations_for_table(
        &self,
        table_id: Uuid,
    ) -> CoreResult<Vec<internal_table_operations::Model>> {
        let operations = internal_table_operations::Entity::find()
            .filter(internal_table_operations::Column::InternalTableId.eq(table_id))
            .order_by_asc(internal_table_operations::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(operations)
    }

    async fn find_table(
        &self,
        organization_id: Uuid,
        table_name: &str,
    ) -> CoreResult<Option<internal_tables::Model>> {
        let table = internal_tables::Entity::find()
            .filter(internal_tables::Column::OrganizationId.eq(organization_id))
            .filter(internal_tables::Column::TableName.eq(normalize_table_name(table_name)))
            .one(&self.db)
            .await?;
        Ok(table)
    }

    async fn record_intent(
        &self,
        organization_id: Uuid,
        table_id: Uuid,
        table_name: &str,
        action: TableAction,
        statement: &str,
    ) -> CoreResult<internal_table_operations::Model> {
        let now = Utc::now();
        let intent = internal_table_operations::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(organization_id),
            internal_table_id: Set(table_id),
            table_name: Set(table_name.to_string()),
            operation: Set(action.as_ref().to_string()),
            statement: Set(statement.to_string()),
            status: Set(OperationStatus::Pending.as_str().to_string()),
            error_message: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;
        Ok(intent)
    }

    async fn finish_intent(
        &self,
        intent: internal_table_operations::Model,
        status: OperationStatus,
        error: Option<String>,
    ) -> CoreResult<()> {
        let active: internal_table_operations::ActiveModel = intent.into();
        active.set_status(status, error).update(&self.db).await?;
        Ok(())
    }

    async fn execute_internal(&self, sql: &str) -> Result<(), DbErr> {
        let backend = self.internal.get_database_backend();
        self.internal
            .execute(Statement::from_string(backend, sql.to_string()))
            .await?;
        Ok(())
    }

    /// Lower-cased column names of one physical table
    async fn physical_columns(&self, table_id: Uuid) -> CoreResult<HashSet<String>> {
        let backend = self.internal.get_database_backend();
        let sql = match backend {
            DatabaseBackend::Sqlite => format!("PRAGMA table_info(\"{}\")", table_id),
            DatabaseBackend::Postgres => format!(
                "SELECT column_name AS name FROM information_schema.columns WHERE table_schema = current_schema() AND table_name = '{}'",
                table_id
            ),
            DatabaseBackend::MySql => format!(
                "SELECT column_name AS name FROM information_schema.columns WHERE table_schema = DATABASE() AND table_name = '{}'",
                table_id
            ),
        };

        let rows = self
            .internal
            .query_all(Statement::from_string(backend, sql))
            .await?;

        let mut columns = HashSet::new();
        for row in rows {
            let name: String = row.try_get("", "name")?;
            columns.insert(name.to_lowercase());
        }
        Ok(columns)
    }

    /// Tables of the internal store whose names are internal table ids
    async fn physical_tables(&self) -> CoreResult<HashSet<Uuid>> {
        let backend = self.internal.get_database_backend();
        let sql = match backend {
            DatabaseBackend::Sqlite => {
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'"
            }
            DatabaseBackend::Postgres => {
                "SELECT table_name AS name FROM information_schema.tables WHERE table_schema = current_schema()"
            }
            DatabaseBackend::MySql => {
                "SELECT table_name AS name FROM information_schema.tables WHERE table_schema = DATABASE()"
            }
        };

        let rows = self
            .internal
            .query_all(Statement::from_string(backend, sql.to_string()))
            .await?;

        let mut tables = HashSet::new();
        for row in rows {
            let name: String = row.try_get("", "name")?;
            if let Ok(id) = Uuid::parse_str(&name) {
                tables.insert(id);
            }
        }
        Ok(tables)
    }
}
