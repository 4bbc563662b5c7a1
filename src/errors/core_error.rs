use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use sea_orm::DbErr;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CoreErrorKind {
    NotFound,
    Validation,
    Conflict,
    Forbidden,
    Unauthorized,
    Unavailable,
    Internal,
}

impl CoreErrorKind {
    pub fn as_code(&self) -> &'static str {
        match self {
            CoreErrorKind::NotFound => "NOT_FOUND",
            CoreErrorKind::Validation => "VALIDATION_FAILED",
            CoreErrorKind::Conflict => "CONFLICT",
            CoreErrorKind::Forbidden => "FORBIDDEN",
            CoreErrorKind::Unauthorized => "UNAUTHORIZED",
            CoreErrorKind::Unavailable => "UNAVAILABLE",
            CoreErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug)]
pub struct CoreError {
    kind: CoreErrorKind,
    message: String,
    fields: Option<BTreeMap<String, String>>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: None,
            source: None,
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        let entity = entity.into();
        let id = id.into();
        let mut fields = BTreeMap::new();
        fields.insert("entity".to_string(), entity.clone());
        fields.insert("id".to_string(), id.clone());

        Self {
            kind: CoreErrorKind::NotFound,
            message: format!("{} {} not found", entity, id),
            fields: Some(fields),
            source: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Conflict, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Forbidden, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Unavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Internal, message)
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> CoreErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> Option<&BTreeMap<String, String>> {
        self.fields.as_ref()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == CoreErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == CoreErrorKind::Conflict
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl StdError for CoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<DbErr> for CoreError {
    fn from(err: DbErr) -> Self {
        CoreError::internal(err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::validation(format!("Invalid JSON document: {}", err)).with_source(err)
    }
}

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        let message = err.to_string();
        CoreError::internal(message).with_source(AnyhowSource(err))
    }
}

// anyhow::Error does not implement std::error::Error itself.
#[derive(Debug)]
struct AnyhowSource(anyhow::Error);

impl fmt::Display for AnyhowSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl StdError for AnyhowSource {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_carries_entity_fields() {
        let err = CoreError::not_found("AppVersion", "v-1");
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
        assert_eq!(err.message(), "AppVersion v-1 not found");
        let fields = err.fields().unwrap();
        assert_eq!(fields.get("entity").map(String::as_str), Some("AppVersion"));
        assert_eq!(fields.get("id").map(String::as_str), Some("v-1"));
    }

    #[test]
    fn db_errors_become_internal_with_source() {
        let err: CoreError = DbErr::Custom("disk full".to_string()).into();
        assert_eq!(err.kind(), CoreErrorKind::Internal);
        assert!(err.message().contains("disk full"));
        assert!(err.source().is_some());
    }

    #[test]
    fn display_includes_kind() {
        let err = CoreError::conflict("Version name already exists.");
        assert_eq!(err.to_string(), "Conflict: Version name already exists.");
        assert_eq!(err.kind().as_code(), "CONFLICT");
    }
}
