//! Table facts
//!
//! What the sync engine knows about the source table. Facts are read through
//! the [`TableMetadata`] trait so the orchestrator never touches storage
//! directly.

mod props_file;
pub mod properties;
pub mod reader;

pub use properties::{derive_table_properties, parse_key_values, LAST_COMMIT_TIME_SYNC};
pub use reader::HoodieTableReader;

use crate::error::SyncError;
use crate::schema::TableSchema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage layout of a Hudi table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableType {
    CopyOnWrite,
    MergeOnRead,
}

impl TableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableType::CopyOnWrite => "COPY_ON_WRITE",
            TableType::MergeOnRead => "MERGE_ON_READ",
        }
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "COPY_ON_WRITE" => Ok(TableType::CopyOnWrite),
            "MERGE_ON_READ" => Ok(TableType::MergeOnRead),
            other => Err(SyncError::metadata(format!("Unknown table type '{}'", other))),
        }
    }
}

/// File format of the table's base files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BaseFileFormat {
    Parquet,
    Orc,
    HFile,
}

impl BaseFileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseFileFormat::Parquet => "PARQUET",
            BaseFileFormat::Orc => "ORC",
            BaseFileFormat::HFile => "HFILE",
        }
    }

    /// Hive input format class used to read the base files
    pub fn input_format(&self) -> &'static str {
        match self {
            BaseFileFormat::Parquet => "org.apache.hudi.hadoop.HoodieParquetInputFormat",
            BaseFileFormat::Orc => "org.apache.hadoop.hive.ql.io.orc.OrcInputFormat",
            BaseFileFormat::HFile => "org.apache.hudi.hadoop.HoodieHFileInputFormat",
        }
    }

    pub fn output_format(&self) -> &'static str {
        match self {
            BaseFileFormat::Parquet => {
                "org.apache.hadoop.hive.ql.io.parquet.MapredParquetOutputFormat"
            }
            BaseFileFormat::Orc => "org.apache.hadoop.hive.ql.io.orc.OrcOutputFormat",
            BaseFileFormat::HFile => "org.apache.hadoop.hive.ql.io.HiveIgnoreKeyTextOutputFormat",
        }
    }

    pub fn serde_class(&self) -> &'static str {
        match self {
            BaseFileFormat::Parquet => "org.apache.hadoop.hive.ql.io.parquet.serde.ParquetHiveSerDe",
            BaseFileFormat::Orc => "org.apache.hadoop.hive.ql.io.orc.OrcSerde",
            BaseFileFormat::HFile => "org.apache.hadoop.hive.serde2.lazy.LazySimpleSerDe",
        }
    }
}

impl fmt::Display for BaseFileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BaseFileFormat {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PARQUET" => Ok(BaseFileFormat::Parquet),
            "ORC" => Ok(BaseFileFormat::Orc),
            "HFILE" => Ok(BaseFileFormat::HFile),
            other => Err(SyncError::build(format!("Unsupported base file format '{}'", other))),
        }
    }
}

/// Read-only snapshot of the table's configuration and schema
#[derive(Debug, Clone, PartialEq)]
pub struct TableFacts {
    pub table_type: TableType,
    pub table_version: String,
    pub base_path: String,
    pub partition_fields: Vec<String>,
    pub base_file_format: BaseFileFormat,
    /// Writer schema including the Hudi metadata columns
    pub schema: TableSchema,
}

/// Source of table facts
#[async_trait]
pub trait TableMetadata: Send + Sync {
    async fn facts(&self) -> Result<TableFacts, SyncError>;

    /// Instant time of the latest completed commit, if any
    async fn last_commit_time(&self) -> Result<Option<String>, SyncError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_type_parsing() {
        assert_eq!("merge_on_read".parse::<TableType>().unwrap(), TableType::MergeOnRead);
        assert_eq!(TableType::CopyOnWrite.to_string(), "COPY_ON_WRITE");
        assert!("APPEND_ONLY".parse::<TableType>().is_err());
    }

    #[test]
    fn test_base_file_format() {
        let orc: BaseFileFormat = "orc".parse().unwrap();
        assert_eq!(orc.serde_class(), "org.apache.hadoop.hive.ql.io.orc.OrcSerde");
        assert!(matches!(
            "avro".parse::<BaseFileFormat>(),
            Err(SyncError::Build(_))
        ));
    }
}
