use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InternalTables::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InternalTables::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InternalTables::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InternalTables::TableName).string().not_null())
                    .col(
                        ColumnDef::new(InternalTables::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InternalTables::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_internal_tables_org_table_name")
                    .table(InternalTables::Table)
                    .col(InternalTables::OrganizationId)
                    .col(InternalTables::TableName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InternalTableOperations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InternalTableOperations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InternalTableOperations::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InternalTableOperations::InternalTableId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InternalTableOperations::TableName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InternalTableOperations::Operation)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InternalTableOperations::Statement)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InternalTableOperations::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(InternalTableOperations::ErrorMessage).text())
                    .col(
                        ColumnDef::new(InternalTableOperations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InternalTableOperations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InternalTableOperations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InternalTables::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum InternalTables {
    Table,
    Id,
    OrganizationId,
    TableName,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum InternalTableOperations {
    Table,
    Id,
    OrganizationId,
    InternalTableId,
    TableName,
    Operation,
    Statement,
    Status,
    ErrorMessage,
    CreatedAt,
    UpdatedAt,
}
