use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How queries are copied when a version is cloned from another one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueryCloneStrategy {
    /// Environments mirrored once, each data source and query cloned once,
    /// options cloned per data source and environment.
    #[default]
    PerVersion,
    /// One environment, data source and query set per (data source, environment)
    /// pair of the source version.
    PerEnvironment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDefault {
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Runtime configuration. Defaults target local SQLite files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Store holding apps, versions, data sources and internal table metadata.
    pub metadata_database_url: String,
    /// Physically separate store receiving internal table DDL.
    pub internal_database_url: String,
    /// Environments created for a version that is not cloned from another.
    pub default_environments: Vec<EnvironmentDefault>,
    pub query_clone_strategy: QueryCloneStrategy,
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            metadata_database_url: "sqlite:appforge.db?mode=rwc".to_string(),
            internal_database_url: "sqlite:appforge_internal.db?mode=rwc".to_string(),
            default_environments: vec![EnvironmentDefault {
                name: "production".to_string(),
                is_default: true,
            }],
            query_clone_strategy: QueryCloneStrategy::PerVersion,
            log_level: "info".to_string(),
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse configuration")
    }

    /// Reads a TOML file, then applies environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&contents)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("APPFORGE_DATABASE_URL") {
            self.metadata_database_url = url;
        }
        if let Some(url) = lookup("APPFORGE_INTERNAL_DATABASE_URL") {
            self.internal_database_url = url;
        }
        if let Some(strategy) = lookup("APPFORGE_QUERY_CLONE_STRATEGY") {
            self.query_clone_strategy = strategy
                .parse()
                .with_context(|| format!("Unknown query clone strategy '{}'", strategy))?;
        }
        if let Some(level) = lookup("APPFORGE_LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_create_a_single_production_environment() {
        let config = CoreConfig::default();
        assert_eq!(config.default_environments.len(), 1);
        assert_eq!(config.default_environments[0].name, "production");
        assert!(config.default_environments[0].is_default);
        assert_eq!(config.query_clone_strategy, QueryCloneStrategy::PerVersion);
    }

    #[test]
    fn parses_partial_toml() {
        let config = CoreConfig::from_toml_str(
            r#"
            query_clone_strategy = "per_environment"

            [[default_environments]]
            name = "development"

            [[default_environments]]
            name = "production"
            is_default = true
            "#,
        )
        .unwrap();

        assert_eq!(config.query_clone_strategy, QueryCloneStrategy::PerEnvironment);
        assert_eq!(config.default_environments.len(), 2);
        assert!(!config.default_environments[0].is_default);
        assert_eq!(config.metadata_database_url, "sqlite:appforge.db?mode=rwc");
    }

    #[test]
    fn overrides_win_over_file_values() {
        let vars: HashMap<&str, &str> = [
            ("APPFORGE_DATABASE_URL", "sqlite::memory:"),
            ("APPFORGE_QUERY_CLONE_STRATEGY", "per_environment"),
        ]
        .into_iter()
        .collect();

        let mut config = CoreConfig::from_toml_str("log_level = \"debug\"").unwrap();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.metadata_database_url, "sqlite::memory:");
        assert_eq!(config.query_clone_strategy, QueryCloneStrategy::PerEnvironment);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn rejects_unknown_strategy() {
        let mut config = CoreConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "APPFORGE_QUERY_CLONE_STRATEGY").then(|| "sometimes".to_string())
        });
        assert!(result.is_err());
    }
}
