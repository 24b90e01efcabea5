//! Configuration types for the query-log layer.
//!
//! A single strongly typed structure, loaded from YAML (or JSON, which YAML
//! accepts), replaces the loosely shaped settings arrays of older setups.
//!
//! ```yaml
//! disabled: false
//! failure_policy: best_effort
//! database:
//!   adapter: postgresql
//!   host: localhost
//!   port: 5432
//!   username: audit
//!   name: logs
//!   schema: audit
//!   table: query_log
//! matrix:
//!   Reports: false
//!   Users:
//!     create: false
//! additional_parameters:
//!   service: billing
//! ```

pub mod database;
pub mod matrix;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use database::LogDatabaseConfig;
pub use matrix::{FilterMatrix, MatrixEntry};

/// What happens when writing an audit record fails after the delegated call
/// succeeded.
///
/// A delegated call's own failure always wins over a logging failure,
/// whatever the policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report through the diagnostic log and return the delegate's result.
    #[default]
    BestEffort,
    /// Fail the call when its audit record cannot be written.
    Fatal,
}

/// Complete query-log configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryLogConfig {
    /// When true, activation is a no-op and no interception is installed.
    #[serde(default)]
    pub disabled: bool,

    /// Log-store connection settings. Required unless `disabled`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<LogDatabaseConfig>,

    /// Call-site suppression rules.
    #[serde(default)]
    pub matrix: FilterMatrix,

    /// Opaque payload stored on every record written by one proxy instance.
    #[serde(
        default,
        alias = "additionalParameters",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_parameters: Option<serde_json::Value>,

    #[serde(default, alias = "failurePolicy")]
    pub failure_policy: FailurePolicy,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl QueryLogConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Check that everything needed to build the log store is present.
    ///
    /// A disabled configuration is always valid: nothing will be installed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.disabled {
            return Ok(());
        }

        let database = self.database.as_ref().ok_or_else(|| {
            ConfigError::Config("database setting is not set for query-log".to_string())
        })?;
        database.validate()
    }

    /// Log-store settings of an enabled configuration.
    pub fn database(&self) -> Result<&LogDatabaseConfig, ConfigError> {
        self.database.as_ref().ok_or_else(|| {
            ConfigError::Config("database setting is not set for query-log".to_string())
        })
    }
}

/// Accept only plain SQL identifiers for table and schema names.
pub(crate) fn is_plain_identifier(ident: &str) -> bool {
    !ident.is_empty()
        && !ident.starts_with(|c: char| c.is_ascii_digit())
        && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
disabled: false
failure_policy: fatal
database:
  adapter: postgresql
  host: db.internal
  port: 5433
  username: audit
  password: secret
  name: logs
  schema: audit
matrix:
  Reports: false
  Users:
    create: false
    fetch: true
additionalParameters:
  service: billing
  shard: 3
"#;

    #[test]
    fn test_parse_full_config() {
        let config = QueryLogConfig::from_yaml(FULL).unwrap();
        assert!(!config.disabled);
        assert_eq!(config.failure_policy, FailurePolicy::Fatal);

        let db = config.database.as_ref().unwrap();
        assert_eq!(db.adapter, "postgresql");
        assert_eq!(db.port, 5433);
        assert_eq!(db.schema.as_deref(), Some("audit"));
        assert_eq!(db.table, "query_log");

        assert_eq!(config.matrix.len(), 2);
        assert_eq!(
            config.additional_parameters,
            Some(serde_json::json!({"service": "billing", "shard": 3}))
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = QueryLogConfig::from_yaml("disabled: true").unwrap();
        assert!(config.disabled);
        assert!(config.database.is_none());
        assert!(config.matrix.is_empty());
        assert_eq!(config.failure_policy, FailurePolicy::BestEffort);
    }

    #[test]
    fn test_missing_database_is_rejected() {
        let config = QueryLogConfig::from_yaml("matrix: {}").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("database setting is not set"));
    }

    #[test]
    fn test_disabled_config_needs_no_database() {
        let config = QueryLogConfig {
            disabled: true,
            ..Default::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn test_json_config_is_accepted() {
        let json = r#"{"database": {"adapter": "mysql", "name": "logs"}, "matrix": {"A": true}}"#;
        let config = QueryLogConfig::from_yaml(json).unwrap();
        assert_eq!(config.database().unwrap().adapter, "mysql");
    }

    #[test]
    fn test_plain_identifier() {
        assert!(is_plain_identifier("query_log"));
        assert!(!is_plain_identifier(""));
        assert!(!is_plain_identifier("1table"));
        assert!(!is_plain_identifier("logs; DROP TABLE users"));
    }
}
