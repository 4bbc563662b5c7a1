//! Application lifecycle error types

use thiserror::Error;
use uuid::Uuid;

use super::{CoreError, CoreErrorKind};

/// App-related errors
#[derive(Error, Debug)]
pub enum AppError {
    /// App not found by ID
    #[error("App {0} not found")]
    NotFound(Uuid),

    /// Permission group without default app permissions
    #[error("{0} is not a default group")]
    UnknownGroup(String),

    /// Import bundle is inconsistent
    #[error("Invalid app bundle: {0}")]
    InvalidBundle(String),
}

impl AppError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::UnknownGroup(_) | AppError::InvalidBundle(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::UnknownGroup(_) | AppError::InvalidBundle(_) => "VALIDATION_FAILED",
        }
    }
}

impl From<AppError> for CoreError {
    fn from(err: AppError) -> Self {
        let message = err.to_string();
        match err {
            AppError::NotFound(id) => CoreError::new(CoreErrorKind::NotFound, message)
                .with_field("entity", "App")
                .with_field("id", id.to_string()),
            AppError::UnknownGroup(group) => {
                CoreError::new(CoreErrorKind::Validation, message).with_field("group", group)
            }
            AppError::InvalidBundle(_) => CoreError::new(CoreErrorKind::Validation, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_group_names_the_group() {
        let err = AppError::UnknownGroup("developers".to_string());
        assert_eq!(err.to_string(), "developers is not a default group");
        assert_eq!(err.error_code(), "VALIDATION_FAILED");

        let core: CoreError = err.into();
        assert_eq!(core.kind(), CoreErrorKind::Validation);
    }
}
