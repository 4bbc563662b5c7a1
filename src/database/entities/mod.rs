pub mod app_environments;
pub mod app_group_permissions;
pub mod app_users;
pub mod app_versions;
pub mod apps;
pub mod credentials;
pub mod data_queries;
pub mod data_source_options;
pub mod data_sources;
pub mod folder_apps;
pub mod group_permissions;

// Internal table metadata (primary store side)
pub mod internal_table_operations;
pub mod internal_tables;
