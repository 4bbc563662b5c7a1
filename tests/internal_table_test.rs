use appforge::database::entities::{internal_table_operations, internal_tables};
use appforge::database::test_utils::*;
use appforge::database::{establish_connection, setup_database};
use appforge::services::{
    AddColumnParams, ColumnDefinition, CreateTableParams, InternalTableService, TableOperation,
    TableOperationOutcome,
};
use appforge::CoreErrorKind;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection,
    EntityTrait, QueryFilter, Set, Statement,
};
use serde_json::json;
use uuid::Uuid;

async fn setup() -> (DatabaseConnection, DatabaseConnection, InternalTableService) {
    let db = setup_test_db().await.unwrap();
    let internal = setup_internal_store().await.unwrap();
    let service = InternalTableService::new(db.clone(), internal.clone());
    (db, internal, service)
}

fn orders_params() -> CreateTableParams {
    CreateTableParams {
        table_name: "orders".to_string(),
        columns: vec![
            ColumnDefinition::new("id", "integer"),
            ColumnDefinition::new("customer", "varchar(255)"),
        ],
    }
}

async fn physical_columns(internal: &DatabaseConnection, table_id: Uuid) -> Vec<String> {
    let rows = internal
        .query_all(Statement::from_string(
            DatabaseBackend::Sqlite,
            format!("PRAGMA table_info(\"{}\")", table_id),
        ))
        .await
        .unwrap();
    rows.into_iter()
        .map(|row| row.try_get::<String>("", "name").unwrap())
        .collect()
}

async fn physical_table_count(internal: &DatabaseConnection) -> usize {
    internal
        .query_all(Statement::from_string(
            DatabaseBackend::Sqlite,
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'"
                .to_string(),
        ))
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn create_table_writes_metadata_and_physical_table() {
    let (_db, internal, service) = setup().await;
    let user = test_user();

    let table = service
        .create_table(user.organization_id, orders_params())
        .await
        .unwrap();

    assert_eq!(table.table_name, "orders");
    assert_eq!(physical_columns(&internal, table.id).await, vec!["id", "customer"]);

    let journal = service.operations_for_table(table.id).await.unwrap();
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].status, "applied");
    assert_eq!(journal[0].operation, "create_table");
    assert!(journal[0].statement.starts_with(&format!("CREATE TABLE \"{}\"", table.id)));
}

#[tokio::test]
async fn view_tables_lists_organization_tables_in_order() {
    let (_db, _internal, service) = setup().await;
    let user = test_user();
    for name in ["shipments", "customers", "orders"] {
        service
            .create_table(
                user.organization_id,
                CreateTableParams {
                    table_name: name.to_string(),
                    columns: vec![ColumnDefinition::new("id", "integer")],
                },
            )
            .await
            .unwrap();
    }
    service
        .create_table(Uuid::new_v4(), orders_params())
        .await
        .unwrap();

    let tables = service.view_tables(user.organization_id).await.unwrap();
    assert_eq!(tables, vec!["customers", "orders", "shipments"]);
}

#[tokio::test]
async fn failed_ddl_leaves_no_metadata_row() {
    let (db, internal, service) = setup().await;
    let user = test_user();

    let err = service
        .create_table(
            user.organization_id,
            CreateTableParams {
                table_name: "broken".to_string(),
                columns: vec![
                    ColumnDefinition::new("amount", "integer"),
                    ColumnDefinition::new("amount", "text"),
                ],
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Internal);

    assert!(internal_tables::Entity::find().all(&db).await.unwrap().is_empty());
    assert_eq!(physical_table_count(&internal).await, 0);

    let journal = internal_table_operations::Entity::find()
        .filter(internal_table_operations::Column::TableName.eq("broken"))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].status, "rolled_back");
    assert!(journal[0].error_message.is_some());
}

#[tokio::test]
async fn create_table_validates_input() {
    let (db, _internal, service) = setup().await;
    let user = test_user();

    let no_columns = service
        .create_table(
            user.organization_id,
            CreateTableParams {
                table_name: "empty".to_string(),
                columns: vec![],
            },
        )
        .await
        .unwrap_err();
    assert_eq!(no_columns.kind(), CoreErrorKind::Validation);

    let injected = service
        .create_table(
            user.organization_id,
            CreateTableParams {
                table_name: "evil".to_string(),
                columns: vec![ColumnDefinition::new("id integer); DROP TABLE x; --", "integer")],
            },
        )
        .await
        .unwrap_err();
    assert_eq!(injected.kind(), CoreErrorKind::Validation);

    service
        .create_table(user.organization_id, orders_params())
        .await
        .unwrap();
    let duplicate = service
        .create_table(user.organization_id, orders_params())
        .await
        .unwrap_err();
    assert_eq!(duplicate.kind(), CoreErrorKind::Conflict);

    assert_eq!(internal_tables::Entity::find().all(&db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn add_column_alters_the_physical_table() {
    let (_db, internal, service) = setup().await;
    let user = test_user();
    let table = service
        .create_table(user.organization_id, orders_params())
        .await
        .unwrap();

    service
        .add_column(
            user.organization_id,
            AddColumnParams {
                table_name: "orders".to_string(),
                column: ColumnDefinition::new("total", "numeric(10, 2)"),
            },
        )
        .await
        .unwrap();

    assert_eq!(
        physical_columns(&internal, table.id).await,
        vec!["id", "customer", "total"]
    );
    assert_eq!(service.operations_for_table(table.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn add_column_to_unknown_table_is_not_found() {
    let (_db, _internal, service) = setup().await;
    let user = test_user();
    // A table of the same name in another organization does not count
    service
        .create_table(Uuid::new_v4(), orders_params())
        .await
        .unwrap();

    let err = service
        .add_column(
            user.organization_id,
            AddColumnParams {
                table_name: "orders".to_string(),
                column: ColumnDefinition::new("total", "integer"),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.message(), "Internal table not found: orders");
}

#[tokio::test]
async fn placeholders_resolve_to_internal_table_ids() {
    let (_db, _internal, service) = setup().await;
    let user = test_user();
    let orders = service
        .create_table(user.organization_id, orders_params())
        .await
        .unwrap();

    let path = service
        .replace_table_names_at_placeholder("/api/${orders}/rows", &user)
        .await
        .unwrap();
    assert_eq!(path, format!("/api/{}/rows", orders.id));

    let encoded = service
        .replace_table_names_at_placeholder("/api/%24%7Borders%7D/rows?select=id", &user)
        .await
        .unwrap();
    assert_eq!(encoded, format!("/api/{}/rows?select=id", orders.id));

    let plain = service
        .replace_table_names_at_placeholder("/api/health", &user)
        .await
        .unwrap();
    assert_eq!(plain, "/api/health");
}

#[tokio::test]
async fn unresolved_placeholders_are_all_reported() {
    let (_db, _internal, service) = setup().await;
    let user = test_user();
    service
        .create_table(user.organization_id, orders_params())
        .await
        .unwrap();

    let err = service
        .replace_table_names_at_placeholder("/api/${orders}/rows", &test_user())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.message(), "Internal table not found: orders");

    let err = service
        .replace_table_names_at_placeholder("/api/${items}/join/${orders}/${refunds}/${items}", &user)
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Internal table not found: items,refunds");
}

#[tokio::test]
async fn perform_dispatches_parsed_operations() {
    let (_db, _internal, service) = setup().await;
    let user = test_user();

    let create = TableOperation::from_request(
        "create_table",
        json!({"table_name": "orders", "columns": [{"column_name": "id", "data_type": "integer"}]}),
    )
    .unwrap();
    let outcome = service
        .perform(&user, user.organization_id, create)
        .await
        .unwrap();
    assert!(matches!(outcome, TableOperationOutcome::TableCreated(ref t) if t.table_name == "orders"));

    let add = TableOperation::from_request(
        "add_column",
        json!({"table_name": "orders", "column": {"column_name": "note", "data_type": "text"}}),
    )
    .unwrap();
    assert!(matches!(
        service.perform(&user, user.organization_id, add).await.unwrap(),
        TableOperationOutcome::ColumnAdded(_)
    ));

    let view = TableOperation::from_request("view_tables", json!({})).unwrap();
    assert_eq!(
        service.perform(&user, user.organization_id, view).await.unwrap(),
        TableOperationOutcome::Tables(vec!["orders".to_string()])
    );
}

#[tokio::test]
async fn reconcile_repairs_both_stores() {
    let (db, internal, service) = setup().await;
    let user = test_user();
    let healthy = service
        .create_table(user.organization_id, orders_params())
        .await
        .unwrap();

    // Physical table left by a crash between DDL and metadata commit
    let orphan = Uuid::new_v4();
    internal
        .execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            format!("CREATE TABLE \"{}\" (id integer);", orphan),
        ))
        .await
        .unwrap();
    // Unrelated tables are left alone
    internal
        .execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            "CREATE TABLE audit_log (id integer);".to_string(),
        ))
        .await
        .unwrap();

    // Metadata row whose physical table never materialized
    let ghost = internal_tables::ActiveModel {
        id: Set(Uuid::new_v4()),
        organization_id: Set(user.organization_id),
        table_name: Set("ghost".to_string()),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&db)
    .await
    .unwrap();

    // Intent that never finished
    internal_table_operations::ActiveModel {
        id: Set(Uuid::new_v4()),
        organization_id: Set(user.organization_id),
        internal_table_id: Set(orphan),
        table_name: Set("orphan".to_string()),
        operation: Set("create_table".to_string()),
        statement: Set("CREATE TABLE ...".to_string()),
        status: Set("pending".to_string()),
        error_message: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&db)
    .await
    .unwrap();

    let report = service.reconcile().await.unwrap();
    assert_eq!(report.dropped_tables, vec![orphan]);
    assert_eq!(report.removed_metadata, vec![ghost.id]);
    assert_eq!(report.rolled_back_intents, 1);
    assert_eq!(report.applied_intents, 0);

    assert_eq!(service.view_tables(user.organization_id).await.unwrap(), vec!["orders"]);
    assert_eq!(physical_columns(&internal, healthy.id).await, vec!["id", "customer"]);
    assert_eq!(physical_table_count(&internal).await, 2);

    assert!(service.reconcile().await.unwrap().is_clean());
}

#[tokio::test]
async fn file_backed_stores_stay_consistent_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let metadata_url = format!("sqlite:{}?mode=rwc", dir.path().join("metadata.db").display());
    let internal_url = format!("sqlite:{}?mode=rwc", dir.path().join("internal.db").display());
    let user = test_user();

    let table_id = {
        let db = establish_connection(&metadata_url, false).await.unwrap();
        setup_database(&db).await.unwrap();
        let internal = establish_connection(&internal_url, false).await.unwrap();
        let service = InternalTableService::new(db, internal);

        let table = service
            .create_table(user.organization_id, orders_params())
            .await
            .unwrap();
        let _ = service
            .create_table(
                user.organization_id,
                CreateTableParams {
                    table_name: "broken".to_string(),
                    columns: vec![
                        ColumnDefinition::new("a", "integer"),
                        ColumnDefinition::new("a", "integer"),
                    ],
                },
            )
            .await
            .unwrap_err();
        table.id
    };

    let db = establish_connection(&metadata_url, false).await.unwrap();
    let internal = establish_connection(&internal_url, false).await.unwrap();
    let service = InternalTableService::new(db, internal.clone());

    assert!(service.reconcile().await.unwrap().is_clean());
    assert_eq!(service.view_tables(user.organization_id).await.unwrap(), vec!["orders"]);
    assert_eq!(physical_columns(&internal, table_id).await, vec!["id", "customer"]);
}

#[tokio::test]
async fn padded_table_name_resolves_on_every_path() {
    let (_db, internal, service) = setup().await;
    let user = test_user();

    let table = service
        .create_table(
            user.organization_id,
            CreateTableParams {
                table_name: " orders ".to_string(),
                columns: vec![ColumnDefinition::new("id", "integer")],
            },
        )
        .await
        .unwrap();
    assert_eq!(table.table_name, "orders");

    let altered = service
        .add_column(
            user.organization_id,
            AddColumnParams {
                table_name: " orders ".to_string(),
                column: ColumnDefinition::new("total", "integer"),
            },
        )
        .await
        .unwrap();
    assert_eq!(altered.id, table.id);
    assert_eq!(physical_columns(&internal, table.id).await, vec!["id", "total"]);

    let duplicate = service
        .create_table(
            user.organization_id,
            CreateTableParams {
                table_name: "orders\t".to_string(),
                columns: vec![ColumnDefinition::new("id", "integer")],
            },
        )
        .await
        .unwrap_err();
    assert_eq!(duplicate.kind(), CoreErrorKind::Conflict);

    let path = service
        .replace_table_names_at_placeholder("/api/${orders}/rows", &user)
        .await
        .unwrap();
    assert_eq!(path, format!("/api/{}/rows", table.id));

    let missing = service
        .add_column(
            user.organization_id,
            AddColumnParams {
                table_name: "  refunds ".to_string(),
                column: ColumnDefinition::new("total", "integer"),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(missing.message(), "Internal table not found: refunds");
}

#[tokio::test]
async fn reconcile_settles_add_column_intents_from_the_physical_schema() {
    let (db, _internal, service) = setup().await;
    let user = test_user();
    let table = service
        .create_table(user.organization_id, orders_params())
        .await
        .unwrap();
    service
        .add_column(
            user.organization_id,
            AddColumnParams {
                table_name: "orders".to_string(),
                column: ColumnDefinition::new("total", "integer"),
            },
        )
        .await
        .unwrap();

    // Journal of an ALTER that ran but was never marked finished
    let journal = service.operations_for_table(table.id).await.unwrap();
    let applied_alter = journal
        .into_iter()
        .find(|entry| entry.operation == "add_column")
        .unwrap();
    let mut reopened: internal_table_operations::ActiveModel = applied_alter.clone().into();
    reopened.status = Set("pending".to_string());
    reopened.update(&db).await.unwrap();

    // Journal of an ALTER that never reached the internal store
    internal_table_operations::ActiveModel {
        id: Set(Uuid::new_v4()),
        organization_id: Set(user.organization_id),
        internal_table_id: Set(table.id),
        table_name: Set("orders".to_string()),
        operation: Set("add_column".to_string()),
        statement: Set(format!("ALTER TABLE \"{}\" ADD refunded integer;", table.id)),
        status: Set("pending".to_string()),
        error_message: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&db)
    .await
    .unwrap();

    let report = service.reconcile().await.unwrap();
    assert_eq!(report.applied_intents, 1);
    assert_eq!(report.rolled_back_intents, 1);
    assert!(report.dropped_tables.is_empty());
    assert!(report.removed_metadata.is_empty());

    let settled = internal_table_operations::Entity::find_by_id(applied_alter.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settled.status, "applied");

    let abandoned = internal_table_operations::Entity::find()
        .filter(internal_table_operations::Column::Statement.contains("refunded"))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(abandoned.status, "rolled_back");
}
