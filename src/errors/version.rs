//! Application version error types
//!
//! Errors raised while creating, updating, cloning or deleting app versions.
//!
//! # Examples
//!
//! ```rust
//! use appforge::errors::VersionError;
//!
//! let err = VersionError::NameTaken("v2".to_string());
//! assert!(err.is_client_error());
//! assert_eq!(err.error_code(), "CONFLICT");
//! ```

use thiserror::Error;
use uuid::Uuid;

use super::{CoreError, CoreErrorKind};

/// Version-related errors
#[derive(Error, Debug)]
pub enum VersionError {
    /// Another version of the same app already uses this name
    #[error("Version name already exists: {0}")]
    NameTaken(String),

    /// The version is the app's current (released) version
    #[error("You cannot {action} a released version")]
    Released {
        /// Attempted operation, e.g. "update" or "delete"
        action: &'static str,
    },

    /// Version not found by ID
    #[error("Version {0} not found")]
    NotFound(Uuid),

    /// The version to clone from does not exist or belongs to another app
    #[error("Version to clone from {0} not found")]
    SourceNotFound(Uuid),
}

impl VersionError {
    /// Check if this is a client error (400-series)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            VersionError::NameTaken(_) | VersionError::Released { .. }
        )
    }

    /// Check if this is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            VersionError::NotFound(_) | VersionError::SourceNotFound(_)
        )
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            VersionError::NameTaken(_) | VersionError::Released { .. } => "CONFLICT",
            VersionError::NotFound(_) | VersionError::SourceNotFound(_) => "NOT_FOUND",
        }
    }
}

impl From<VersionError> for CoreError {
    fn from(err: VersionError) -> Self {
        let message = err.to_string();
        match err {
            VersionError::NameTaken(name) => {
                CoreError::new(CoreErrorKind::Conflict, message).with_field("version", name)
            }
            VersionError::Released { .. } => CoreError::new(CoreErrorKind::Conflict, message),
            VersionError::NotFound(id) | VersionError::SourceNotFound(id) => {
                CoreError::new(CoreErrorKind::NotFound, message)
                    .with_field("entity", "AppVersion")
                    .with_field("id", id.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_version_message_names_action() {
        let err = VersionError::Released { action: "delete" };
        assert_eq!(err.to_string(), "You cannot delete a released version");
        assert!(err.is_client_error());

        let core: CoreError = err.into();
        assert_eq!(core.kind(), CoreErrorKind::Conflict);
    }

    #[test]
    fn name_taken_maps_to_conflict_with_field() {
        let core: CoreError = VersionError::NameTaken("v1".to_string()).into();
        assert!(core.is_conflict());
        assert_eq!(
            core.fields().and_then(|f| f.get("version")).map(String::as_str),
            Some("v1")
        );
    }

    #[test]
    fn source_not_found_is_not_found() {
        let err = VersionError::SourceNotFound(Uuid::nil());
        assert!(err.is_not_found());
        let core: CoreError = err.into();
        assert!(core.is_not_found());
    }
}
