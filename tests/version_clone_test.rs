use std::sync::Arc;

use appforge::config::{CoreConfig, QueryCloneStrategy};
use appforge::database::entities::{
    app_environments, app_versions, credentials, data_queries, data_source_options, data_sources,
};
use appforge::database::test_utils::*;
use appforge::services::{AppVersionService, CredentialOptionParser, VersionCloneService};
use appforge::CoreErrorKind;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde_json::{json, Value};
use uuid::Uuid;

fn version_service(db: &DatabaseConnection, strategy: QueryCloneStrategy) -> AppVersionService {
    let cloner = VersionCloneService::new(
        db.clone(),
        Arc::new(CredentialOptionParser::new()),
        strategy,
    );
    AppVersionService::new(db.clone(), cloner, CoreConfig::default().default_environments)
}

async fn environments_of(db: &DatabaseConnection, version_id: Uuid) -> Vec<app_environments::Model> {
    app_environments::Entity::find()
        .filter(app_environments::Column::VersionId.eq(version_id))
        .all(db)
        .await
        .unwrap()
}

async fn data_sources_of(db: &DatabaseConnection, version_id: Uuid) -> Vec<data_sources::Model> {
    data_sources::Entity::find()
        .filter(data_sources::Column::AppVersionId.eq(version_id))
        .all(db)
        .await
        .unwrap()
}

async fn queries_of(db: &DatabaseConnection, version_id: Uuid) -> Vec<data_queries::Model> {
    data_queries::Entity::find()
        .filter(data_queries::Column::AppVersionId.eq(version_id))
        .all(db)
        .await
        .unwrap()
}

async fn options_of(db: &DatabaseConnection, data_source_ids: Vec<Uuid>) -> Vec<data_source_options::Model> {
    data_source_options::Entity::find()
        .filter(data_source_options::Column::DataSourceId.is_in(data_source_ids))
        .all(db)
        .await
        .unwrap()
}

fn button_definition(query_id: Uuid) -> Value {
    json!({
        "components": {
            "button-1": {
                "component": {
                    "component": "Button",
                    "definition": {
                        "events": [{"eventId": "onClick", "actionId": "run-query", "queryId": query_id.to_string()}]
                    }
                }
            }
        }
    })
}

#[tokio::test]
async fn clone_without_data_sources_mirrors_environments_only() {
    let db = setup_test_db().await.unwrap();
    let user = test_user();
    let app = create_test_app(&db, &user, "crm").await.unwrap();
    let source = create_test_version(&db, app.id, "v1", Some(json!({"components": {}})))
        .await
        .unwrap();
    create_test_environment(&db, source.id, "production", true).await.unwrap();
    create_test_environment(&db, source.id, "staging", false).await.unwrap();
    // Utility query without a data source is not carried over
    create_test_query(&db, &source, None, "transform", None).await.unwrap();

    let versions = version_service(&db, QueryCloneStrategy::PerVersion);
    let target = versions
        .create_version(&app, "v2", Some(source.id), None)
        .await
        .unwrap();

    let mut names: Vec<String> = environments_of(&db, target.id)
        .await
        .into_iter()
        .map(|env| env.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["production", "staging"]);
    assert!(data_sources_of(&db, target.id).await.is_empty());
    assert!(queries_of(&db, target.id).await.is_empty());
    assert_eq!(target.definition, Some(json!({"components": {}})));
}

#[tokio::test]
async fn clone_rewires_queries_definition_and_credentials() {
    let db = setup_test_db().await.unwrap();
    let user = test_user();
    let app = create_test_app(&db, &user, "crm").await.unwrap();
    let source = create_test_version(&db, app.id, "v1", None).await.unwrap();
    let environment = create_test_environment(&db, source.id, "production", true)
        .await
        .unwrap();
    let data_source = create_test_data_source(&db, &source, "customers-db", "postgresql")
        .await
        .unwrap();
    let credential = create_test_credential(&db, "sealed:s3cr3t").await.unwrap();
    create_test_options(
        &db,
        data_source.id,
        environment.id,
        json!({
            "host": {"value": "db.internal", "encrypted": false},
            "password": {"value": null, "encrypted": true, "credential_id": credential.id.to_string()}
        }),
    )
    .await
    .unwrap();

    let first = create_test_query(
        &db,
        &source,
        Some(data_source.id),
        "list_customers",
        Some(json!({"query": "select * from customers"})),
    )
    .await
    .unwrap();
    let second = create_test_query(
        &db,
        &source,
        Some(data_source.id),
        "add_customer",
        Some(json!({
            "query": "insert into customers default values",
            "events": [{"eventId": "onDataQuerySuccess", "actionId": "run-query", "queryId": first.id.to_string()}]
        })),
    )
    .await
    .unwrap();

    // The definition is attached after the queries exist
    let source = {
        use sea_orm::{ActiveModelTrait, Set};
        let mut active: app_versions::ActiveModel = source.into();
        active.definition = Set(Some(button_definition(first.id)));
        active.update(&db).await.unwrap()
    };

    let versions = version_service(&db, QueryCloneStrategy::PerVersion);
    let target = versions
        .create_version(&app, "v2", Some(source.id), None)
        .await
        .unwrap();

    let environments = environments_of(&db, target.id).await;
    assert_eq!(environments.len(), 1);
    assert_eq!(environments[0].name, "production");
    assert!(environments[0].is_default);

    let cloned_sources = data_sources_of(&db, target.id).await;
    assert_eq!(cloned_sources.len(), 1);
    assert_ne!(cloned_sources[0].id, data_source.id);
    assert_eq!(cloned_sources[0].kind, "postgresql");

    let options = options_of(&db, vec![cloned_sources[0].id]).await;
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].environment_id, environments[0].id);
    let document = options[0].document().unwrap();
    assert_eq!(document.get("host").unwrap().value, Some(json!("db.internal")));
    let cloned_credential_id = document.get("password").unwrap().credential_id.unwrap();
    assert_ne!(cloned_credential_id, credential.id);
    let cloned_credential = credentials::Entity::find_by_id(cloned_credential_id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cloned_credential.value_ciphertext, "sealed:s3cr3t");

    let queries = queries_of(&db, target.id).await;
    assert_eq!(queries.len(), 2);
    let new_first = queries.iter().find(|q| q.name == "list_customers").unwrap();
    let new_second = queries.iter().find(|q| q.name == "add_customer").unwrap();
    assert_ne!(new_first.id, first.id);
    assert_ne!(new_second.id, second.id);
    assert_eq!(new_first.data_source_id, Some(cloned_sources[0].id));

    let options = new_second.options.as_ref().unwrap();
    assert_eq!(options["events"][0]["queryId"], json!(new_first.id.to_string()));

    let definition = target.definition.unwrap();
    assert_eq!(
        definition["components"]["button-1"]["component"]["definition"]["events"][0]["queryId"],
        json!(new_first.id.to_string())
    );

    // Source rows are untouched
    assert_eq!(queries_of(&db, source.id).await.len(), 2);
    let source_second = data_queries::Entity::find_by_id(second.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        source_second.options.unwrap()["events"][0]["queryId"],
        json!(first.id.to_string())
    );
}

async fn seed_two_environment_version(db: &DatabaseConnection) -> (appforge::database::entities::apps::Model, app_versions::Model) {
    let user = test_user();
    let app = create_test_app(db, &user, "inventory").await.unwrap();
    let source = create_test_version(db, app.id, "v1", None).await.unwrap();
    let production = create_test_environment(db, source.id, "production", true)
        .await
        .unwrap();
    let staging = create_test_environment(db, source.id, "staging", false)
        .await
        .unwrap();
    let data_source = create_test_data_source(db, &source, "stock", "restapi")
        .await
        .unwrap();
    create_test_options(db, data_source.id, production.id, json!({"url": {"value": "https://prod"}}))
        .await
        .unwrap();
    create_test_options(db, data_source.id, staging.id, json!({"url": {"value": "https://staging"}}))
        .await
        .unwrap();
    create_test_query(db, &source, Some(data_source.id), "stock_levels", None)
        .await
        .unwrap();
    create_test_query(db, &source, Some(data_source.id), "reorder", None)
        .await
        .unwrap();
    (app, source)
}

#[tokio::test]
async fn per_version_strategy_clones_each_query_once() {
    let db = setup_test_db().await.unwrap();
    let (app, source) = seed_two_environment_version(&db).await;

    let target = version_service(&db, QueryCloneStrategy::PerVersion)
        .create_version(&app, "v2", Some(source.id), None)
        .await
        .unwrap();

    let environments = environments_of(&db, target.id).await;
    let sources = data_sources_of(&db, target.id).await;
    assert_eq!(environments.len(), 2);
    assert_eq!(sources.len(), 1);
    assert_eq!(queries_of(&db, target.id).await.len(), 2);

    let options = options_of(&db, vec![sources[0].id]).await;
    assert_eq!(options.len(), 2);
    let staging = environments.iter().find(|e| e.name == "staging").unwrap();
    let staging_options = options
        .iter()
        .find(|o| o.environment_id == staging.id)
        .unwrap();
    assert_eq!(
        staging_options.document().unwrap().get("url").unwrap().value,
        Some(json!("https://staging"))
    );
}

#[tokio::test]
async fn per_environment_strategy_repeats_the_graph_for_each_environment() {
    let db = setup_test_db().await.unwrap();
    let (app, source) = seed_two_environment_version(&db).await;

    let target = version_service(&db, QueryCloneStrategy::PerEnvironment)
        .create_version(&app, "v2", Some(source.id), None)
        .await
        .unwrap();

    let sources = data_sources_of(&db, target.id).await;
    assert_eq!(environments_of(&db, target.id).await.len(), 2);
    assert_eq!(sources.len(), 2);
    assert_eq!(
        options_of(&db, sources.iter().map(|s| s.id).collect()).await.len(),
        2
    );
    assert_eq!(queries_of(&db, target.id).await.len(), 4);
}

#[tokio::test]
async fn clone_service_reports_what_it_created() {
    let db = setup_test_db().await.unwrap();
    let (app, source) = seed_two_environment_version(&db).await;
    let target = create_test_version(&db, app.id, "manual", None).await.unwrap();

    let cloner = VersionCloneService::new(
        db.clone(),
        Arc::new(CredentialOptionParser::new()),
        QueryCloneStrategy::PerVersion,
    );
    let txn = {
        use sea_orm::TransactionTrait;
        db.begin().await.unwrap()
    };
    let summary = cloner.clone_version_graph(&source, &target, &txn).await.unwrap();
    txn.commit().await.unwrap();

    assert_eq!(summary.environments, 2);
    assert_eq!(summary.data_sources, 1);
    assert_eq!(summary.options, 2);
    assert_eq!(summary.credentials, 0);
    assert_eq!(summary.queries, 2);
    assert_eq!(summary.query_ids.len(), 2);
}

#[tokio::test]
async fn failed_clone_leaves_nothing_behind() {
    let db = setup_test_db().await.unwrap();
    let user = test_user();
    let app = create_test_app(&db, &user, "billing").await.unwrap();
    let source = create_test_version(&db, app.id, "v1", None).await.unwrap();
    let environment = create_test_environment(&db, source.id, "production", true)
        .await
        .unwrap();
    let data_source = create_test_data_source(&db, &source, "ledger", "postgresql")
        .await
        .unwrap();
    // Encrypted option pointing at a credential that does not exist
    create_test_options(
        &db,
        data_source.id,
        environment.id,
        json!({"password": {"encrypted": true, "credential_id": Uuid::new_v4().to_string()}}),
    )
    .await
    .unwrap();
    create_test_query(&db, &source, Some(data_source.id), "balances", None)
        .await
        .unwrap();

    let err = version_service(&db, QueryCloneStrategy::PerVersion)
        .create_version(&app, "v2", Some(source.id), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::NotFound);

    let versions = app_versions::Entity::find()
        .filter(app_versions::Column::AppId.eq(app.id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(app_environments::Entity::find().all(&db).await.unwrap().len(), 1);
    assert_eq!(data_sources::Entity::find().all(&db).await.unwrap().len(), 1);
    assert_eq!(data_queries::Entity::find().all(&db).await.unwrap().len(), 1);
    assert!(credentials::Entity::find().all(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn cloned_data_sources_never_share_credentials() {
    let db = setup_test_db().await.unwrap();
    let user = test_user();
    let app = create_test_app(&db, &user, "crm").await.unwrap();
    let source = create_test_version(&db, app.id, "v1", None).await.unwrap();
    let environment = create_test_environment(&db, source.id, "production", true)
        .await
        .unwrap();
    let data_source = create_test_data_source(&db, &source, "api", "restapi")
        .await
        .unwrap();
    let credential = create_test_credential(&db, "sealed:token").await.unwrap();
    create_test_options(
        &db,
        data_source.id,
        environment.id,
        json!({"token": {"encrypted": true, "credential_id": credential.id.to_string()}}),
    )
    .await
    .unwrap();

    let versions = version_service(&db, QueryCloneStrategy::PerVersion);
    let v2 = versions.create_version(&app, "v2", Some(source.id), None).await.unwrap();
    let v3 = versions.create_version(&app, "v3", Some(source.id), None).await.unwrap();

    let mut credential_ids = vec![credential.id];
    for version in [&v2, &v3] {
        let sources = data_sources_of(&db, version.id).await;
        for options in options_of(&db, sources.iter().map(|s| s.id).collect()).await {
            credential_ids.extend(options.document().unwrap().credential_ids());
        }
    }
    credential_ids.sort();
    credential_ids.dedup();
    assert_eq!(credential_ids.len(), 3);

    for stored in credentials::Entity::find().all(&db).await.unwrap() {
        assert_eq!(stored.value_ciphertext, "sealed:token");
    }
}
