use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

/// Intent journal for DDL issued against the internal data store.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "internal_table_operations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Internal table id the statement targets (also the physical table name)
    pub internal_table_id: Uuid,
    pub table_name: String,
    pub operation: String,
    #[sea_orm(column_type = "Text")]
    pub statement: String,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    Pending,
    Applied,
    RolledBack,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Pending => "pending",
            OperationStatus::Applied => "applied",
            OperationStatus::RolledBack => "rolled_back",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(OperationStatus::Pending),
            "applied" => Some(OperationStatus::Applied),
            "rolled_back" => Some(OperationStatus::RolledBack),
            _ => None,
        }
    }
}

impl Model {
    pub fn get_status(&self) -> Option<OperationStatus> {
        OperationStatus::parse(&self.status)
    }
}

impl ActiveModel {
    pub fn set_status(mut self, status: OperationStatus, error: Option<String>) -> Self {
        self.status = Set(status.as_str().to_string());
        self.error_message = Set(error);
        self.updated_at = Set(chrono::Utc::now());
        self
    }
}
