//! Table facts read from a Hudi table's `.hoodie` directory

use super::props_file::parse_properties;
use super::{BaseFileFormat, TableFacts, TableMetadata, TableType};
use crate::error::SyncError;
use crate::schema::avro::add_metadata_fields;
use crate::schema::parse_avro_schema;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const METAFOLDER: &str = ".hoodie";
const TIMELINE_FOLDER: &str = "timeline";
const PROPERTIES_FILE: &str = "hoodie.properties";
const COMPLETED_ACTIONS: [&str; 3] = ["commit", "deltacommit", "replacecommit"];

/// Reads table facts from the local file system
#[derive(Debug, Clone)]
pub struct HoodieTableReader {
    base_path: PathBuf,
}

impl HoodieTableReader {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn meta_path(&self) -> PathBuf {
        self.base_path.join(METAFOLDER)
    }

    async fn table_config(&self) -> Result<HashMap<String, String>, SyncError> {
        let path = self.meta_path().join(PROPERTIES_FILE);
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            SyncError::metadata(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(parse_properties(&text))
    }
}

#[async_trait]
impl TableMetadata for HoodieTableReader {
    async fn facts(&self) -> Result<TableFacts, SyncError> {
        let config = self.table_config().await?;
        let get = |key: &str| config.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let table_type = match get("hoodie.table.type") {
            Some(raw) => raw.parse()?,
            None => TableType::CopyOnWrite,
        };
        let base_file_format = match get("hoodie.table.base.file.format") {
            Some(raw) => raw.parse()?,
            None => BaseFileFormat::Parquet,
        };

        // Newer table versions record `field:keygen-type` pairs
        let partition_fields = get("hoodie.table.partition.fields")
            .map(|raw| {
                raw.split(',')
                    .filter_map(|f| f.split(':').next())
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let raw_schema = get("hoodie.table.create.schema").ok_or_else(|| {
            SyncError::build("Table config has no hoodie.table.create.schema to sync")
        })?;
        let schema = parse_avro_schema(&add_metadata_fields(raw_schema)?)?;

        debug!(
            "Read table config for {} ({} columns)",
            self.base_path.display(),
            schema.fields.len()
        );

        Ok(TableFacts {
            table_type,
            table_version: get("hoodie.table.version").unwrap_or("0").to_string(),
            base_path: self.base_path.to_string_lossy().into_owned(),
            partition_fields,
            base_file_format,
            schema,
        })
    }

    async fn last_commit_time(&self) -> Result<Option<String>, SyncError> {
        let meta = self.meta_path();
        let mut latest: Option<String> = None;

        for dir in [meta.clone(), meta.join(TIMELINE_FOLDER)] {
            for name in list_file_names(&dir).await? {
                if let Some(instant) = completed_instant(&name) {
                    if latest.as_deref().map_or(true, |l| instant > l) {
                        latest = Some(instant.to_string());
                    }
                }
            }
        }

        Ok(latest)
    }
}

async fn list_file_names(dir: &Path) -> Result<Vec<String>, SyncError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(SyncError::metadata(format!(
                "Failed to list {}: {}",
                dir.display(),
                e
            )))
        }
    };

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| SyncError::metadata(format!("Failed to list {}: {}", dir.display(), e)))?
    {
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Instant time of a completed commit file, e.g. `20240501101500000.commit`
/// or `20240501101500000_20240501101512000.deltacommit`
fn completed_instant(file_name: &str) -> Option<&str> {
    let (stem, action) = file_name.split_once('.')?;
    if !COMPLETED_ACTIONS.contains(&action) {
        return None;
    }
    let instant = stem.split('_').next()?;
    (!instant.is_empty() && instant.chars().all(|c| c.is_ascii_digit())).then_some(instant)
}
