use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use super::migrations::Migrator;

pub async fn establish_connection(
    database_url: &str,
    sql_logging: bool,
) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_string());
    options.sqlx_logging(sql_logging);
    Database::connect(options).await
}

pub fn get_database_url(database_path: Option<&str>) -> String {
    match database_path {
        Some(path) if path == ":memory:" => "sqlite::memory:".to_string(),
        Some(path) if path.contains("://") || path.starts_with("sqlite:") => path.to_string(),
        Some(path) => format!("sqlite:{}?mode=rwc", path),
        None => "sqlite:appforge.db?mode=rwc".to_string(),
    }
}

/// Bring the metadata schema up to date
pub async fn setup_database(db: &DatabaseConnection) -> Result<(), DbErr> {
    Migrator::up(db, None).await?;
    info!("Metadata store migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_url_mapping() {
        assert_eq!(get_database_url(Some(":memory:")), "sqlite::memory:");
        assert_eq!(get_database_url(Some("data/app.db")), "sqlite:data/app.db?mode=rwc");
        assert_eq!(
            get_database_url(Some("postgres://localhost/appforge")),
            "postgres://localhost/appforge"
        );
        assert_eq!(get_database_url(None), "sqlite:appforge.db?mode=rwc");
    }
}
