//! Fixtures shared by unit and integration tests.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, DbErr, Set};
use serde_json::Value;
use uuid::Uuid;

use crate::database::entities::{
    app_environments, app_versions, apps, credentials, data_queries, data_source_options,
    data_sources, group_permissions,
};
use crate::services::User;

/// In-memory SQLite database with the metadata schema applied
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    use sea_orm_migration::MigratorTrait;
    crate::database::migrations::Migrator::up(&db, None).await?;

    Ok(db)
}

/// Empty in-memory SQLite database standing in for the internal data store
pub async fn setup_internal_store() -> Result<DatabaseConnection, DbErr> {
    Database::connect("sqlite::memory:").await
}

pub fn test_user() -> User {
    User {
        id: Uuid::new_v4(),
        organization_id: Uuid::new_v4(),
    }
}

pub async fn create_test_app(
    db: &DatabaseConnection,
    user: &User,
    name: &str,
) -> Result<apps::Model, DbErr> {
    let now = Utc::now();
    apps::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        slug: Set(None),
        organization_id: Set(user.organization_id),
        user_id: Set(user.id),
        is_public: Set(false),
        is_maintenance_on: Set(false),
        current_version_id: Set(None),
        icon: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}

pub async fn create_test_version(
    db: &DatabaseConnection,
    app_id: Uuid,
    name: &str,
    definition: Option<Value>,
) -> Result<app_versions::Model, DbErr> {
    let now = Utc::now();
    app_versions::ActiveModel {
        id: Set(Uuid::new_v4()),
        app_id: Set(app_id),
        name: Set(name.to_string()),
        definition: Set(definition),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}

pub async fn create_test_environment(
    db: &DatabaseConnection,
    version_id: Uuid,
    name: &str,
    is_default: bool,
) -> Result<app_environments::Model, DbErr> {
    let now = Utc::now();
    app_environments::ActiveModel {
        id: Set(Uuid::new_v4()),
        version_id: Set(version_id),
        name: Set(name.to_string()),
        is_default: Set(is_default),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}

pub async fn create_test_data_source(
    db: &DatabaseConnection,
    version: &app_versions::Model,
    name: &str,
    kind: &str,
) -> Result<data_sources::Model, DbErr> {
    let now = Utc::now();
    data_sources::ActiveModel {
        id: Set(Uuid::new_v4()),
        app_id: Set(version.app_id),
        app_version_id: Set(version.id),
        name: Set(name.to_string()),
        kind: Set(kind.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}

pub async fn create_test_credential(
    db: &DatabaseConnection,
    ciphertext: &str,
) -> Result<credentials::Model, DbErr> {
    let now = Utc::now();
    credentials::ActiveModel {
        id: Set(Uuid::new_v4()),
        value_ciphertext: Set(ciphertext.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}

pub async fn create_test_options(
    db: &DatabaseConnection,
    data_source_id: Uuid,
    environment_id: Uuid,
    options: Value,
) -> Result<data_source_options::Model, DbErr> {
    let now = Utc::now();
    data_source_options::ActiveModel {
        id: Set(Uuid::new_v4()),
        data_source_id: Set(data_source_id),
        environment_id: Set(environment_id),
        options: Set(options),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}

pub async fn create_test_query(
    db: &DatabaseConnection,
    version: &app_versions::Model,
    data_source_id: Option<Uuid>,
    name: &str,
    options: Option<Value>,
) -> Result<data_queries::Model, DbErr> {
    let now = Utc::now();
    data_queries::ActiveModel {
        id: Set(Uuid::new_v4()),
        app_id: Set(version.app_id),
        app_version_id: Set(version.id),
        data_source_id: Set(data_source_id),
        name: Set(name.to_string()),
        kind: Set("postgresql".to_string()),
        options: Set(options),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}

pub async fn create_test_group(
    db: &DatabaseConnection,
    organization_id: Uuid,
    group: &str,
) -> Result<group_permissions::Model, DbErr> {
    group_permissions::ActiveModel {
        id: Set(Uuid::new_v4()),
        organization_id: Set(organization_id),
        group: Set(group.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
}
