use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create apps table
        manager
            .create_table(
                Table::create()
                    .table(Apps::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Apps::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Apps::Name).string().not_null())
                    .col(ColumnDef::new(Apps::Slug).string().unique_key())
                    .col(ColumnDef::new(Apps::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(Apps::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Apps::IsPublic)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Apps::IsMaintenanceOn)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Apps::CurrentVersionId).uuid())
                    .col(ColumnDef::new(Apps::Icon).string())
                    .col(ColumnDef::new(Apps::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Apps::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        // Create app_versions table
        manager
            .create_table(
                Table::create()
                    .table(AppVersions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AppVersions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(AppVersions::AppId).uuid().not_null())
                    .col(ColumnDef::new(AppVersions::Name).string().not_null())
                    .col(ColumnDef::new(AppVersions::Definition).json())
                    .col(
                        ColumnDef::new(AppVersions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AppVersions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_app_versions_app_id")
                            .from(AppVersions::Table, AppVersions::AppId)
                            .to(Apps::Table, Apps::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_app_versions_app_id_name")
                    .table(AppVersions::Table)
                    .col(AppVersions::AppId)
                    .col(AppVersions::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create app_environments table
        manager
            .create_table(
                Table::create()
                    .table(AppEnvironments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AppEnvironments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AppEnvironments::VersionId).uuid().not_null())
                    .col(ColumnDef::new(AppEnvironments::Name).string().not_null())
                    .col(
                        ColumnDef::new(AppEnvironments::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AppEnvironments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AppEnvironments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_app_environments_version_id")
                            .from(AppEnvironments::Table, AppEnvironments::VersionId)
                            .to(AppVersions::Table, AppVersions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create data_sources table
        manager
            .create_table(
                Table::create()
                    .table(DataSources::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(DataSources::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(DataSources::AppId).uuid().not_null())
                    .col(ColumnDef::new(DataSources::AppVersionId).uuid().not_null())
                    .col(ColumnDef::new(DataSources::Name).string().not_null())
                    .col(ColumnDef::new(DataSources::Kind).string().not_null())
                    .col(
                        ColumnDef::new(DataSources::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DataSources::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_data_sources_app_version_id")
                            .from(DataSources::Table, DataSources::AppVersionId)
                            .to(AppVersions::Table, AppVersions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create credentials table
        manager
            .create_table(
                Table::create()
                    .table(Credentials::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Credentials::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Credentials::ValueCiphertext)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Credentials::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Credentials::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create data_source_options table
        manager
            .create_table(
                Table::create()
                    .table(DataSourceOptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DataSourceOptions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DataSourceOptions::DataSourceId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DataSourceOptions::EnvironmentId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DataSourceOptions::Options).json().not_null())
                    .col(
                        ColumnDef::new(DataSourceOptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DataSourceOptions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_data_source_options_data_source_id")
                            .from(DataSourceOptions::Table, DataSourceOptions::DataSourceId)
                            .to(DataSources::Table, DataSources::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_data_source_options_environment_id")
                            .from(DataSourceOptions::Table, DataSourceOptions::EnvironmentId)
                            .to(AppEnvironments::Table, AppEnvironments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create data_queries table
        manager
            .create_table(
                Table::create()
                    .table(DataQueries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(DataQueries::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(DataQueries::AppId).uuid().not_null())
                    .col(ColumnDef::new(DataQueries::AppVersionId).uuid().not_null())
                    .col(ColumnDef::new(DataQueries::DataSourceId).uuid())
                    .col(ColumnDef::new(DataQueries::Name).string().not_null())
                    .col(ColumnDef::new(DataQueries::Kind).string().not_null())
                    .col(ColumnDef::new(DataQueries::Options).json())
                    .col(
                        ColumnDef::new(DataQueries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DataQueries::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_data_queries_app_version_id")
                            .from(DataQueries::Table, DataQueries::AppVersionId)
                            .to(AppVersions::Table, AppVersions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_data_queries_data_source_id")
                            .from(DataQueries::Table, DataQueries::DataSourceId)
                            .to(DataSources::Table, DataSources::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Create app_users table
        manager
            .create_table(
                Table::create()
                    .table(AppUsers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AppUsers::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(AppUsers::AppId).uuid().not_null())
                    .col(ColumnDef::new(AppUsers::UserId).uuid().not_null())
                    .col(ColumnDef::new(AppUsers::Role).string().not_null())
                    .col(
                        ColumnDef::new(AppUsers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AppUsers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_app_users_app_id")
                            .from(AppUsers::Table, AppUsers::AppId)
                            .to(Apps::Table, Apps::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create folder_apps table
        manager
            .create_table(
                Table::create()
                    .table(FolderApps::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(FolderApps::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(FolderApps::FolderId).uuid().not_null())
                    .col(ColumnDef::new(FolderApps::AppId).uuid().not_null())
                    .col(
                        ColumnDef::new(FolderApps::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create group_permissions table
        manager
            .create_table(
                Table::create()
                    .table(GroupPermissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupPermissions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GroupPermissions::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GroupPermissions::Group).string().not_null())
                    .col(
                        ColumnDef::new(GroupPermissions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create app_group_permissions table
        manager
            .create_table(
                Table::create()
                    .table(AppGroupPermissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AppGroupPermissions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AppGroupPermissions::GroupPermissionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AppGroupPermissions::AppId).uuid().not_null())
                    .col(
                        ColumnDef::new(AppGroupPermissions::Read)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AppGroupPermissions::Update)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AppGroupPermissions::Delete)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AppGroupPermissions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_app_group_permissions_app_id")
                            .from(AppGroupPermissions::Table, AppGroupPermissions::AppId)
                            .to(Apps::Table, Apps::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_app_group_permissions_group_permission_id")
                            .from(
                                AppGroupPermissions::Table,
                                AppGroupPermissions::GroupPermissionId,
                            )
                            .to(GroupPermissions::Table, GroupPermissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AppGroupPermissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupPermissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FolderApps::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AppUsers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DataQueries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DataSourceOptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Credentials::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DataSources::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AppEnvironments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AppVersions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Apps::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Apps {
    Table,
    Id,
    Name,
    Slug,
    OrganizationId,
    UserId,
    IsPublic,
    IsMaintenanceOn,
    CurrentVersionId,
    Icon,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum AppVersions {
    Table,
    Id,
    AppId,
    Name,
    Definition,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum AppEnvironments {
    Table,
    Id,
    VersionId,
    Name,
    IsDefault,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum DataSources {
    Table,
    Id,
    AppId,
    AppVersionId,
    Name,
    Kind,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Credentials {
    Table,
    Id,
    ValueCiphertext,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum DataSourceOptions {
    Table,
    Id,
    DataSourceId,
    EnvironmentId,
    Options,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum DataQueries {
    Table,
    Id,
    AppId,
    AppVersionId,
    DataSourceId,
    Name,
    Kind,
    Options,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum AppUsers {
    Table,
    Id,
    AppId,
    UserId,
    Role,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum FolderApps {
    Table,
    Id,
    FolderId,
    AppId,
    CreatedAt,
}

#[derive(Iden)]
enum GroupPermissions {
    Table,
    Id,
    OrganizationId,
    Group,
    CreatedAt,
}

#[derive(Iden)]
enum AppGroupPermissions {
    Table,
    Id,
    GroupPermissionId,
    AppId,
    Read,
    Update,
    Delete,
    CreatedAt,
}
