//! Transaction scopes threaded explicitly through writing operations.
//!
//! Every public operation that writes takes `scope: Option<&DatabaseTransaction>`.
//! With no scope it opens a root transaction on the connection; inside an existing
//! scope it opens a nested one (a savepoint), so the caller's transaction still
//! decides the final outcome.
//!
//! A `DatabaseTransaction` that is dropped without `commit()` rolls back, so any
//! early `?` return leaves nothing behind:
//!
//! ```rust,ignore
//! let txn = begin_scope(&self.db, scope).await?;
//! let version = self.insert_version(&txn, ...).await?;
//! txn.commit().await?;
//! ```
//!
//! SQLite pools hold a single connection, so code running inside a scope must use
//! the transaction and never the bare connection.

use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};

pub async fn begin_scope(
    db: &DatabaseConnection,
    scope: Option<&DatabaseTransaction>,
) -> Result<DatabaseTransaction, DbErr> {
    match scope {
        Some(outer) => outer.begin().await,
        None => db.begin().await,
    }
}
