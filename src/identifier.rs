//! Catalog identifiers
//!
//! Derives the stable URNs the catalog uses to address the table's dataset
//! and its parent database container.

use crate::config::SyncConfig;
use crate::error::SyncError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

static URN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^urn:li:([A-Za-z][A-Za-z0-9]*):(.+)$").expect("valid URN regex"));

/// A catalog entity identifier of the form `urn:li:<entityType>:<key>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Urn(String);

impl Urn {
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        let trimmed = raw.trim();
        if URN_PATTERN.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(SyncError::build(format!("Invalid URN: '{}'", raw)))
        }
    }

    pub fn entity_type(&self) -> &str {
        URN_PATTERN
            .captures(&self.0)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Urn {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Urn::parse(&value)
    }
}

impl From<Urn> for String {
    fn from(urn: Urn) -> Self {
        urn.0
    }
}

/// Validator hook for URN-valued configuration
pub fn validate_urn(value: &str) -> Result<(), validator::ValidationError> {
    if URN_PATTERN.is_match(value.trim()) {
        return Ok(());
    }
    let mut err = validator::ValidationError::new("invalid_urn");
    err.message = Some("Expected an identifier of the form urn:li:<type>:<key>".into());
    Err(err)
}

/// Resolved identities for one synced table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetIdentifier {
    pub dataset_urn: Urn,
    pub container_urn: Urn,
    pub platform_urn: Urn,
    pub table_name: String,
    pub database_name: String,
}

impl DatasetIdentifier {
    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        Self::new(
            &config.platform_name,
            &config.database_name,
            &config.table_name,
            &config.dataset_env,
        )
    }

    pub fn new(platform: &str, database: &str, table: &str, env: &str) -> Result<Self, SyncError> {
        if database.trim().is_empty() || table.trim().is_empty() {
            return Err(SyncError::build("Database and table names must not be empty"));
        }

        let platform_urn = Urn::parse(&format!("urn:li:dataPlatform:{}", platform))?;
        let dataset_urn = Urn::parse(&format!(
            "urn:li:dataset:({},{}.{},{})",
            platform_urn, database, table, env
        ))?;
        let container_urn = Urn::parse(&format!(
            "urn:li:container:{}",
            container_guid(platform, database, env)
        ))?;

        Ok(Self {
            dataset_urn,
            container_urn,
            platform_urn,
            table_name: table.to_string(),
            database_name: database.to_string(),
        })
    }

    /// Qualified `database.table` name
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database_name, self.table_name)
    }
}

/// Deterministic container key, stable across runs for the same database
fn container_guid(platform: &str, database: &str, env: &str) -> String {
    let key = serde_json::json!({
        "database": database,
        "env": env,
        "platform": platform,
    });

    let mut hasher = Sha256::new();
    hasher.update(key.to_string().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}
