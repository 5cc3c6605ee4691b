//! Dataset custom properties derived from table facts and configuration

use super::{BaseFileFormat, TableFacts};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::schema::spark::spark_table_properties;
use std::collections::BTreeMap;
use tracing::debug;

/// Custom property holding the last synced commit instant
pub const LAST_COMMIT_TIME_SYNC: &str = "last_commit_time_sync";

/// Parse a `key1=val1,key2=val2` list. Entries may also be separated by
/// newlines; a bare key maps to an empty value.
pub fn parse_key_values(raw: &str) -> Result<BTreeMap<String, String>, SyncError> {
    let mut map = BTreeMap::new();

    for entry in raw.split(['\n', ',']) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let parts: Vec<&str> = entry.split('=').collect();
        match parts.as_slice() {
            [key] => {
                map.insert(key.trim().to_string(), String::new());
            }
            [key, value] => {
                map.insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => {
                return Err(SyncError::build(format!(
                    "Invalid key=value entry '{}': more than one '='",
                    entry
                )))
            }
        }
    }

    Ok(map)
}

/// Partition fields from configuration when set, otherwise from the table
pub fn effective_partition_fields<'a>(config: &'a SyncConfig, facts: &'a TableFacts) -> &'a [String] {
    config
        .partition_fields
        .as_deref()
        .unwrap_or(facts.partition_fields.as_slice())
}

fn effective_file_format(config: &SyncConfig, facts: &TableFacts) -> Result<BaseFileFormat, SyncError> {
    match config.base_file_format.as_deref() {
        Some(raw) => raw.parse(),
        None => Ok(facts.base_file_format),
    }
}

/// Full set of custom properties published for the table. Later groups
/// override earlier ones on key collisions.
pub fn derive_table_properties(
    config: &SyncConfig,
    facts: &TableFacts,
) -> Result<BTreeMap<String, String>, SyncError> {
    let partition_fields = effective_partition_fields(config, facts);
    let mut props = BTreeMap::new();

    props.insert("hudi.table.type".to_string(), facts.table_type.to_string());
    props.insert("hudi.table.version".to_string(), facts.table_version.clone());
    props.insert("hudi.base.path".to_string(), config.base_path.clone());
    if !partition_fields.is_empty() {
        props.insert("hudi.partition.fields".to_string(), partition_fields.join(","));
    }

    props.extend(parse_key_values(&config.table_properties)?);

    props.extend(spark_table_properties(
        &facts.schema,
        partition_fields,
        config.spark_version.as_deref(),
        config.schema_string_length_threshold,
    ));

    props.extend(serde_properties(config, facts)?);

    debug!("Derived {} table properties", props.len());
    Ok(props)
}

fn serde_properties(config: &SyncConfig, facts: &TableFacts) -> Result<BTreeMap<String, String>, SyncError> {
    let format = effective_file_format(config, facts)?;
    let mut serde = parse_key_values(&config.serde_properties)?;

    serde.insert("inputFormat".to_string(), format.input_format().to_string());
    serde.insert("outputFormat".to_string(), format.output_format().to_string());
    serde.insert("serdeClass".to_string(), format.serde_class().to_string());

    serde
        .entry("spark.hoodie.query.as.ro.table".to_string())
        .or_insert_with(|| "false".to_string());
    serde
        .entry("spark.path".to_string())
        .or_insert_with(|| config.base_path.clone());

    Ok(serde)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, SchemaField, TableSchema};
    use crate::table::TableType;
    use pretty_assertions::assert_eq;

    fn config() -> SyncConfig {
        SyncConfig {
            database_name: "sales".to_string(),
            table_name: "orders".to_string(),
            base_path: "/data/sales/orders".to_string(),
            ..SyncConfig::default()
        }
    }

    fn facts() -> TableFacts {
        TableFacts {
            table_type: TableType::CopyOnWrite,
            table_version: "6".to_string(),
            base_path: "/data/sales/orders".to_string(),
            partition_fields: vec!["dt".to_string()],
            base_file_format: BaseFileFormat::Parquet,
            schema: TableSchema {
                name: "orders".to_string(),
                namespace: None,
                fields: vec![
                    SchemaField::new("id", FieldType::Long, false),
                    SchemaField::new("dt", FieldType::String, false),
                ],
                raw: String::new(),
            },
        }
    }

    #[test]
    fn test_parse_key_values() {
        let map = parse_key_values("owner=data-eng, tier=gold\nflag").unwrap();

        assert_eq!(map.len(), 3);
        assert_eq!(map["owner"], "data-eng");
        assert_eq!(map["tier"], "gold");
        assert_eq!(map["flag"], "");
        assert!(parse_key_values("").unwrap().is_empty());
        assert!(matches!(parse_key_values("a=b=c"), Err(SyncError::Build(_))));
    }

    #[test]
    fn test_derived_properties() {
        let mut config = config();
        config.table_properties = "owner=data-eng".to_string();
        config.spark_version = Some("3.5.1".to_string());
        let props = derive_table_properties(&config, &facts()).unwrap();

        assert_eq!(props["hudi.table.type"], "COPY_ON_WRITE");
        assert_eq!(props["hudi.table.version"], "6");
        assert_eq!(props["hudi.base.path"], "/data/sales/orders");
        assert_eq!(props["hudi.partition.fields"], "dt");
        assert_eq!(props["owner"], "data-eng");
        assert_eq!(props["spark.sql.sources.provider"], "hudi");
        assert_eq!(props["spark.sql.sources.schema.partCol.0"], "dt");
        assert_eq!(
            props["inputFormat"],
            "org.apache.hudi.hadoop.HoodieParquetInputFormat"
        );
        assert_eq!(props["spark.path"], "/data/sales/orders");
        assert_eq!(props["spark.hoodie.query.as.ro.table"], "false");
    }

    #[test]
    fn test_configured_overrides() {
        let mut config = config();
        config.partition_fields = Some(Vec::new());
        config.base_file_format = Some("orc".to_string());
        config.serde_properties = "spark.path=/mnt/orders".to_string();
        let props = derive_table_properties(&config, &facts()).unwrap();

        assert!(!props.contains_key("hudi.partition.fields"));
        assert!(!props.contains_key("spark.sql.sources.schema.numPartCols"));
        assert_eq!(props["serdeClass"], "org.apache.hadoop.hive.ql.io.orc.OrcSerde");
        assert_eq!(props["spark.path"], "/mnt/orders");

        config.base_file_format = Some("csv".to_string());
        assert!(matches!(
            derive_table_properties(&config, &facts()),
            Err(SyncError::Build(_))
        ));
    }
}
