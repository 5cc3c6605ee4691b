//! Table schema model
//!
//! The structural schema of a table as read from its Avro definition, plus
//! conversions into the shapes the catalog and Spark expect:
//! - `avro`: parsing the Avro JSON definition
//! - `datahub`: the catalog `schemaMetadata` aspect and field reordering
//! - `spark`: the Spark `StructType` JSON stored in table properties

pub mod avro;
pub mod datahub;
pub mod spark;

pub use avro::parse_avro_schema;
pub use datahub::{reorder_prefixed_fields, SchemaMetadata};

use serde::Serialize;

/// Logical type of a single column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Fixed { size: usize },
    Enum { symbols: Vec<String> },
    Uuid,
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    Decimal { precision: u32, scale: u32 },
    Record { name: String, fields: Vec<SchemaField> },
    Array { items: Box<FieldType>, items_nullable: bool },
    Map { values: Box<FieldType>, values_nullable: bool },
    /// Union of two or more non-null branches
    Union { branches: Vec<FieldType> },
}

impl FieldType {
    /// The Avro spelling of this type, used as the catalog's native type
    pub fn native_name(&self) -> String {
        match self {
            FieldType::Boolean => "boolean".to_string(),
            FieldType::Int => "int".to_string(),
            FieldType::Long => "long".to_string(),
            FieldType::Float => "float".to_string(),
            FieldType::Double => "double".to_string(),
            FieldType::Bytes => "bytes".to_string(),
            FieldType::String => "string".to_string(),
            FieldType::Fixed { size } => format!("fixed({})", size),
            FieldType::Enum { .. } => "enum".to_string(),
            FieldType::Uuid => "uuid".to_string(),
            FieldType::Date => "date".to_string(),
            FieldType::TimeMillis => "time-millis".to_string(),
            FieldType::TimeMicros => "time-micros".to_string(),
            FieldType::TimestampMillis => "timestamp-millis".to_string(),
            FieldType::TimestampMicros => "timestamp-micros".to_string(),
            FieldType::Decimal { precision, scale } => format!("decimal({},{})", precision, scale),
            FieldType::Record { name, .. } => name.clone(),
            FieldType::Array { items, .. } => format!("array<{}>", items.native_name()),
            FieldType::Map { values, .. } => format!("map<string,{}>", values.native_name()),
            FieldType::Union { branches } => format!(
                "union<{}>",
                branches.iter().map(|b| b.native_name()).collect::<Vec<_>>().join(",")
            ),
        }
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, field_type: FieldType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable,
            doc: None,
        }
    }
}

/// Structural schema of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub namespace: Option<String>,
    pub fields: Vec<SchemaField>,
    /// The schema definition exactly as it was read
    pub raw: String,
}

impl TableSchema {
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Column-level changes between two versions of a schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDifference {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
}

impl SchemaDifference {
    pub fn between(previous: &TableSchema, current: &TableSchema) -> Self {
        let mut diff = SchemaDifference::default();

        for field in &current.fields {
            match previous.field(&field.name) {
                None => diff.added.push(field.name.clone()),
                Some(old) if old.field_type != field.field_type || old.nullable != field.nullable => {
                    diff.updated.push(field.name.clone())
                }
                Some(_) => {}
            }
        }
        for field in &previous.fields {
            if current.field(&field.name).is_none() {
                diff.deleted.push(field.name.clone());
            }
        }

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}
