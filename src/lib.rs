//! Versioning and cloning of low-code applications, plus management of
//! user-defined internal tables kept in a separate data store.

pub mod app_context;
pub mod config;
pub mod database;
pub mod errors;
pub mod remap;
pub mod services;

pub use app_context::AppContext;
pub use errors::{CoreError, CoreErrorKind, CoreResult};
