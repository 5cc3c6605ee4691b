//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use crate::identifier::validate_urn;
use crate::sync::FailurePolicy;
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use validator::Validate;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Configuration failed validation: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
    /// Run one full table sync before accepting trigger requests
    pub sync_on_startup: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0),
            port: 3000,
            sync_on_startup: false,
        }
    }
}

/// Catalog endpoint configuration
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EmitterConfig {
    #[validate(url(message = "DATAHUB_SERVER must be a valid URL"))]
    pub server: String,
    pub token: Option<String>,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            server: "http://localhost:8080".to_string(),
            token: None,
        }
    }
}

/// Everything the sync engine needs to know about the table and the catalog
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SyncConfig {
    #[validate(length(min = 1, message = "SYNC_DATABASE_NAME is required"))]
    pub database_name: String,
    #[validate(length(min = 1, message = "SYNC_TABLE_NAME is required"))]
    pub table_name: String,
    #[validate(length(min = 1, message = "SYNC_BASE_PATH is required"))]
    pub base_path: String,

    /// Overrides the partition fields recorded in the table config
    pub partition_fields: Option<Vec<String>>,
    /// Overrides the base file format recorded in the table config
    pub base_file_format: Option<String>,
    pub spark_version: Option<String>,
    #[validate(range(min = 1, message = "schema string length threshold must be positive"))]
    pub schema_string_length_threshold: usize,
    /// Raw `key=val` list merged into the serde properties
    pub serde_properties: String,
    /// Raw `key=val` list attached to the dataset as custom properties
    pub table_properties: String,

    pub domain_identifier: Option<String>,
    pub suppress_exceptions: bool,
    pub undo_soft_delete: bool,
    #[validate(range(min = 1, message = "emit timeout must be at least one second"))]
    pub emit_timeout_secs: u64,

    #[validate(length(min = 1))]
    pub dataset_env: String,
    #[validate(length(min = 1))]
    pub platform_name: String,
    #[validate(length(min = 1))]
    pub metadata_field_prefix: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database_name: String::new(),
            table_name: String::new(),
            base_path: String::new(),
            partition_fields: None,
            base_file_format: None,
            spark_version: None,
            schema_string_length_threshold: 4000,
            serde_properties: String::new(),
            table_properties: String::new(),
            domain_identifier: None,
            suppress_exceptions: true,
            undo_soft_delete: true,
            emit_timeout_secs: 30,
            dataset_env: "PROD".to_string(),
            platform_name: "hudi".to_string(),
            metadata_field_prefix: "_hoodie_".to_string(),
        }
    }
}

impl SyncConfig {
    pub fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::from_suppress_flag(self.suppress_exceptions)
    }

    pub fn emit_timeout(&self) -> Duration {
        Duration::from_secs(self.emit_timeout_secs)
    }

    /// Domain attachment is enabled whenever an identifier is configured
    pub fn attach_domain(&self) -> bool {
        self.domain_identifier
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }
}

/// Complete application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub emitter: EmitterConfig,
    pub sync: SyncConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| var(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

        let server_defaults = ServerConfig::default();
        let server = ServerConfig {
            host: parse_or(var("HOST"), "HOST", server_defaults.host)?,
            port: parse_or(var("PORT"), "PORT", server_defaults.port)?,
            sync_on_startup: parse_or(var("SYNC_ON_STARTUP"), "SYNC_ON_STARTUP", false)?,
        };

        let emitter = EmitterConfig {
            server: var("DATAHUB_SERVER").unwrap_or_else(|| EmitterConfig::default().server),
            token: var("DATAHUB_TOKEN"),
        };

        let defaults = SyncConfig::default();
        let sync = SyncConfig {
            database_name: required("SYNC_DATABASE_NAME")?,
            table_name: required("SYNC_TABLE_NAME")?,
            base_path: required("SYNC_BASE_PATH")?,
            // An explicitly empty value clears the table's partition fields
            partition_fields: lookup("SYNC_PARTITION_FIELDS").map(|s| split_list(&s)),
            base_file_format: var("SYNC_BASE_FILE_FORMAT"),
            spark_version: var("SYNC_SPARK_VERSION"),
            schema_string_length_threshold: parse_or(
                var("SYNC_SCHEMA_STRING_LENGTH_THRESHOLD"),
                "SYNC_SCHEMA_STRING_LENGTH_THRESHOLD",
                defaults.schema_string_length_threshold,
            )?,
            serde_properties: lookup("SYNC_SERDE_PROPERTIES").unwrap_or_default(),
            table_properties: lookup("DATAHUB_TABLE_PROPERTIES").unwrap_or_default(),
            domain_identifier: var("DATAHUB_DOMAIN_IDENTIFIER"),
            suppress_exceptions: parse_or(
                var("DATAHUB_SUPPRESS_EXCEPTIONS"),
                "DATAHUB_SUPPRESS_EXCEPTIONS",
                defaults.suppress_exceptions,
            )?,
            undo_soft_delete: parse_or(
                var("DATAHUB_UNDO_SOFT_DELETE"),
                "DATAHUB_UNDO_SOFT_DELETE",
                defaults.undo_soft_delete,
            )?,
            emit_timeout_secs: parse_or(
                var("DATAHUB_EMIT_TIMEOUT_SECS"),
                "DATAHUB_EMIT_TIMEOUT_SECS",
                defaults.emit_timeout_secs,
            )?,
            dataset_env: var("DATAHUB_DATASET_ENV").unwrap_or(defaults.dataset_env),
            platform_name: var("DATAHUB_PLATFORM_NAME").unwrap_or(defaults.platform_name),
            metadata_field_prefix: var("SYNC_METADATA_FIELD_PREFIX")
                .unwrap_or(defaults.metadata_field_prefix),
        };

        emitter.validate()?;
        sync.validate()?;

        if let Some(domain) = sync.domain_identifier.as_deref() {
            if validate_urn(domain).is_err() {
                warn!("⚠️  DATAHUB_DOMAIN_IDENTIFIER '{}' is not a URN, domains will not be attached", domain);
            }
        }

        Ok(Self {
            server,
            emitter,
            sync,
        })
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{}={}", key, value))),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("SYNC_DATABASE_NAME", "sales"),
            ("SYNC_TABLE_NAME", "orders"),
            ("SYNC_BASE_PATH", "/data/sales/orders"),
        ]
    }

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, Ipv4Addr::new(0, 0, 0, 0));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_defaults_applied() {
        let settings = Settings::from_lookup(lookup_from(&minimal())).unwrap();

        assert_eq!(settings.emitter.server, "http://localhost:8080");
        assert_eq!(settings.sync.emit_timeout(), Duration::from_secs(30));
        assert_eq!(settings.sync.schema_string_length_threshold, 4000);
        assert_eq!(settings.sync.failure_policy(), FailurePolicy::SuppressErrors);
        assert!(settings.sync.partition_fields.is_none());
        assert!(!settings.sync.attach_domain());
    }

    #[test]
    fn test_missing_table_name() {
        let result = Settings::from_lookup(lookup_from(&[
            ("SYNC_DATABASE_NAME", "sales"),
            ("SYNC_BASE_PATH", "/data"),
        ]));
        assert!(matches!(result, Err(ConfigError::MissingVar(key)) if key == "SYNC_TABLE_NAME"));
    }

    #[test]
    fn test_propagate_policy_and_partitions() {
        let mut pairs = minimal();
        pairs.push(("DATAHUB_SUPPRESS_EXCEPTIONS", "false"));
        pairs.push(("SYNC_PARTITION_FIELDS", "region, dt"));
        pairs.push(("DATAHUB_DOMAIN_IDENTIFIER", "urn:li:domain:finance"));
        let settings = Settings::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(settings.sync.failure_policy(), FailurePolicy::PropagateFirstError);
        assert_eq!(
            settings.sync.partition_fields,
            Some(vec!["region".to_string(), "dt".to_string()])
        );
        assert!(settings.sync.attach_domain());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut pairs = minimal();
        pairs.push(("DATAHUB_EMIT_TIMEOUT_SECS", "soon"));
        assert!(matches!(
            Settings::from_lookup(lookup_from(&pairs)),
            Err(ConfigError::InvalidValue(_))
        ));

        let mut pairs = minimal();
        pairs.push(("DATAHUB_SERVER", "not a url"));
        assert!(matches!(
            Settings::from_lookup(lookup_from(&pairs)),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_malformed_domain_only_warns() {
        let mut pairs = minimal();
        pairs.push(("DATAHUB_DOMAIN_IDENTIFIER", "finance"));
        let settings = Settings::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(settings.sync.domain_identifier.as_deref(), Some("finance"));
    }

    #[test]
    fn test_empty_partition_fields_override() {
        let mut pairs = minimal();
        pairs.push(("SYNC_PARTITION_FIELDS", ""));
        let settings = Settings::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(settings.sync.partition_fields, Some(Vec::new()));
    }
}
