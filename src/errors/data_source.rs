//! Data source, connection option and credential error types

use thiserror::Error;
use uuid::Uuid;

use super::{CoreError, CoreErrorKind};

/// Data source operation errors
#[derive(Error, Debug)]
pub enum DataSourceError {
    /// Credential row referenced by an encrypted option does not exist
    #[error("Credential {0} not found")]
    CredentialNotFound(Uuid),

    /// Encrypted option entry without a credential reference
    #[error("Encrypted option '{0}' has no credential")]
    MissingCredentialRef(String),

    /// Option key present in the new document but not in the original one
    #[error("Option '{0}' not found in source options")]
    MissingOption(String),

    /// No options stored for a data source in an environment
    #[error("Options for data source {data_source_id} in environment {environment_id} not found")]
    OptionsNotFound {
        data_source_id: Uuid,
        environment_id: Uuid,
    },
}

impl DataSourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DataSourceError::CredentialNotFound(_) | DataSourceError::OptionsNotFound { .. }
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            DataSourceError::CredentialNotFound(_) | DataSourceError::OptionsNotFound { .. } => {
                "NOT_FOUND"
            }
            DataSourceError::MissingCredentialRef(_) | DataSourceError::MissingOption(_) => {
                "INVALID_OPTIONS"
            }
        }
    }
}

impl From<DataSourceError> for CoreError {
    fn from(err: DataSourceError) -> Self {
        let message = err.to_string();
        match err {
            DataSourceError::CredentialNotFound(id) => CoreError::new(CoreErrorKind::NotFound, message)
                .with_field("entity", "Credential")
                .with_field("id", id.to_string()),
            _ => CoreError::new(CoreErrorKind::NotFound, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_errors_surface_as_not_found() {
        let missing = DataSourceError::OptionsNotFound {
            data_source_id: Uuid::nil(),
            environment_id: Uuid::nil(),
        };
        assert!(missing.is_not_found());
        assert_eq!(missing.error_code(), "NOT_FOUND");

        let dangling = DataSourceError::MissingCredentialRef("password".to_string());
        assert!(!dangling.is_not_found());
        assert_eq!(dangling.error_code(), "INVALID_OPTIONS");

        let core: CoreError = dangling.into();
        assert_eq!(core.kind(), CoreErrorKind::NotFound);
        assert_eq!(core.message(), "Encrypted option 'password' has no credential");
    }
}
