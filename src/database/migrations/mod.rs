pub use sea_orm_migration::prelude::*;

mod m20240105_000001_create_app_schema;
mod m20240112_000002_create_internal_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240105_000001_create_app_schema::Migration),
            Box::new(m20240112_000002_create_internal_tables::Migration),
        ]
    }
}
