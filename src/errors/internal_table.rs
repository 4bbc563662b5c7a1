//! Internal table error types
//!
//! # Examples
//!
//! ```rust
//! use appforge::errors::InternalTableError;
//!
//! let err = InternalTableError::NotFound(vec!["orders".to_string(), "items".to_string()]);
//! assert_eq!(err.to_string(), "Internal table not found: orders,items");
//! ```

use thiserror::Error;

use super::{CoreError, CoreErrorKind};

#[derive(Error, Debug)]
pub enum InternalTableError {
    /// One or more table names could not be resolved in the organization
    #[error("Internal table not found: {}", .0.join(","))]
    NotFound(Vec<String>),

    /// Table name already used in the organization
    #[error("Internal table already exists: {0}")]
    AlreadyExists(String),

    #[error("Action not defined: {0}")]
    UnknownAction(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Column name or data type that cannot be emitted into DDL
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// DDL statement rejected by the internal data store
    #[error("Internal data store rejected statement: {0}")]
    Ddl(sea_orm::DbErr),
}

impl InternalTableError {
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            InternalTableError::AlreadyExists(_)
                | InternalTableError::UnknownAction(_)
                | InternalTableError::InvalidParams(_)
                | InternalTableError::InvalidIdentifier(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, InternalTableError::NotFound(_))
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            InternalTableError::NotFound(_) => "NOT_FOUND",
            InternalTableError::AlreadyExists(_) => "CONFLICT",
            InternalTableError::UnknownAction(_)
            | InternalTableError::InvalidParams(_)
            | InternalTableError::InvalidIdentifier(_) => "VALIDATION_FAILED",
            InternalTableError::Ddl(_) => "DDL_FAILED",
        }
    }
}

impl From<InternalTableError> for CoreError {
    fn from(err: InternalTableError) -> Self {
        let message = err.to_string();
        match err {
            InternalTableError::Ddl(db) => CoreError::new(CoreErrorKind::Internal, message).with_source(db),
            InternalTableError::AlreadyExists(name) => {
                CoreError::new(CoreErrorKind::Conflict, message).with_field("table", name)
            }
            InternalTableError::NotFound(names) => {
                CoreError::new(CoreErrorKind::NotFound, message).with_field("tables", names.join(","))
            }
            _ => CoreError::new(CoreErrorKind::Validation, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_lists_tables() {
        let core: CoreError = InternalTableError::NotFound(vec!["orders".to_string()]).into();
        assert!(core.is_not_found());
        assert_eq!(core.message(), "Internal table not found: orders");
        assert_eq!(
            core.fields().and_then(|f| f.get("tables")).map(String::as_str),
            Some("orders")
        );
    }

    #[test]
    fn unknown_action_is_validation() {
        let err = InternalTableError::UnknownAction("drop_table".to_string());
        assert!(err.is_client_error());
        let core: CoreError = err.into();
        assert_eq!(core.kind(), CoreErrorKind::Validation);
    }
}
