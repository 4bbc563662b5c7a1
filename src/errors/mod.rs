//! Domain-specific error types for appforge
//!
//! Services return [`CoreResult`]. Each domain has its own `thiserror` enum that
//! converts into a [`CoreError`] carrying one of the [`CoreErrorKind`] categories,
//! so callers can branch on the kind without knowing the domain.
//!
//! # Error Categories
//!
//! - **VersionError**: duplicate names, released-version guards, missing versions
//! - **AppError**: app lookup, default permission groups, import bundles
//! - **DataSourceError**: connection options and credentials
//! - **InternalTableError**: internal table DDL and placeholder resolution
//!
//! # Examples
//!
//! ```rust
//! use appforge::errors::{CoreError, CoreErrorKind, VersionError};
//!
//! let err: CoreError = VersionError::Released { action: "update" }.into();
//! assert_eq!(err.kind(), CoreErrorKind::Conflict);
//! ```

pub mod app;
pub mod core_error;
pub mod data_source;
pub mod internal_table;
pub mod version;

pub use app::AppError;
pub use core_error::{CoreError, CoreErrorKind, CoreResult};
pub use data_source::DataSourceError;
pub use internal_table::InternalTableError;
pub use version::VersionError;
