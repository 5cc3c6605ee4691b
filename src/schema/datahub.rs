//! Catalog schema aspect
//!
//! Converts a [`TableSchema`] into the catalog's `schemaMetadata` aspect.
//! Nested record columns are flattened into dotted field paths.

use crate::identifier::Urn;
use crate::schema::{FieldType, SchemaField, TableSchema};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// The `schemaMetadata` aspect payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaMetadata {
    pub schema_name: String,
    pub platform: String,
    pub version: i64,
    pub hash: String,
    pub platform_schema: PlatformSchema,
    pub fields: Vec<CatalogField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformSchema {
    #[serde(rename = "com.linkedin.schema.OtherSchema")]
    pub other_schema: OtherSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherSchema {
    pub raw_schema: String,
}

/// One column as the catalog sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogField {
    pub field_path: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub data_type: CatalogType,
    pub native_data_type: String,
    pub recursive: bool,
}

/// Catalog type classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogType {
    Boolean,
    Number,
    String,
    Bytes,
    Fixed,
    Enum,
    Date,
    Time,
    Record,
    Array,
    Map,
    Union,
}

impl CatalogType {
    pub fn class_name(&self) -> &'static str {
        match self {
            CatalogType::Boolean => "com.linkedin.schema.BooleanType",
            CatalogType::Number => "com.linkedin.schema.NumberType",
            CatalogType::String => "com.linkedin.schema.StringType",
            CatalogType::Bytes => "com.linkedin.schema.BytesType",
            CatalogType::Fixed => "com.linkedin.schema.FixedType",
            CatalogType::Enum => "com.linkedin.schema.EnumType",
            CatalogType::Date => "com.linkedin.schema.DateType",
            CatalogType::Time => "com.linkedin.schema.TimeType",
            CatalogType::Record => "com.linkedin.schema.RecordType",
            CatalogType::Array => "com.linkedin.schema.ArrayType",
            CatalogType::Map => "com.linkedin.schema.MapType",
            CatalogType::Union => "com.linkedin.schema.UnionType",
        }
    }

    fn of(field_type: &FieldType) -> Self {
        match field_type {
            FieldType::Boolean => CatalogType::Boolean,
            FieldType::Int
            | FieldType::Long
            | FieldType::Float
            | FieldType::Double
            | FieldType::Decimal { .. } => CatalogType::Number,
            FieldType::String | FieldType::Uuid => CatalogType::String,
            FieldType::Bytes => CatalogType::Bytes,
            FieldType::Fixed { .. } => CatalogType::Fixed,
            FieldType::Enum { .. } => CatalogType::Enum,
            FieldType::Date => CatalogType::Date,
            FieldType::TimeMillis
            | FieldType::TimeMicros
            | FieldType::TimestampMillis
            | FieldType::TimestampMicros => CatalogType::Time,
            FieldType::Record { .. } => CatalogType::Record,
            FieldType::Array { .. } => CatalogType::Array,
            FieldType::Map { .. } => CatalogType::Map,
            FieldType::Union { .. } => CatalogType::Union,
        }
    }
}

// Serialized as `{"type": {"<class>": {}}}`
impl Serialize for CatalogType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut inner = serde_json::Map::new();
        inner.insert(self.class_name().to_string(), serde_json::json!({}));

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("type", &inner)?;
        map.end()
    }
}

impl SchemaMetadata {
    /// Build the aspect for a table; field order follows the schema
    pub fn from_table_schema(schema: &TableSchema, platform: &Urn, schema_name: &str) -> Self {
        let mut fields = Vec::new();
        for field in &schema.fields {
            flatten_field(field, None, &mut fields);
        }

        let mut hasher = Sha256::new();
        hasher.update(schema.raw.as_bytes());

        Self {
            schema_name: schema_name.to_string(),
            platform: platform.to_string(),
            version: 0,
            hash: format!("{:x}", hasher.finalize()),
            platform_schema: PlatformSchema {
                other_schema: OtherSchema {
                    raw_schema: schema.raw.clone(),
                },
            },
            fields,
        }
    }
}

fn flatten_field(field: &SchemaField, parent: Option<&str>, out: &mut Vec<CatalogField>) {
    let path = match parent {
        Some(p) => format!("{}.{}", p, field.name),
        None => field.name.clone(),
    };

    out.push(CatalogField {
        field_path: path.clone(),
        nullable: field.nullable,
        description: field.doc.clone(),
        data_type: CatalogType::of(&field.field_type),
        native_data_type: field.field_type.native_name(),
        recursive: false,
    });

    let nested = match &field.field_type {
        FieldType::Record { fields, .. } => Some(fields),
        FieldType::Array { items, .. } => match items.as_ref() {
            FieldType::Record { fields, .. } => Some(fields),
            _ => None,
        },
        FieldType::Map { values, .. } => match values.as_ref() {
            FieldType::Record { fields, .. } => Some(fields),
            _ => None,
        },
        _ => None,
    };

    if let Some(children) = nested {
        for child in children {
            flatten_field(child, Some(path.as_str()), out);
        }
    }
}

/// Move fields whose path starts with `prefix` after all other fields,
/// keeping the relative order inside both groups.
pub fn reorder_prefixed_fields(fields: Vec<CatalogField>, prefix: &str) -> Vec<CatalogField> {
    let (reserved, user): (Vec<_>, Vec<_>) = fields
        .into_iter()
        .partition(|f| f.field_path.starts_with(prefix));

    user.into_iter().chain(reserved).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::avro::{add_metadata_fields, parse_avro_schema};
    use pretty_assertions::assert_eq;

    const SCHEMA: &str = r#"{
        "type": "record", "name": "orders",
        "fields": [
            {"name": "id", "type": "long", "doc": "order id"},
            {"name": "customer", "type": {"type": "record", "name": "customer",
                "fields": [{"name": "name", "type": ["null", "string"]}]}},
            {"name": "placed", "type": {"type": "int", "logicalType": "date"}}
        ]
    }"#;

    fn paths(fields: &[CatalogField]) -> Vec<&str> {
        fields.iter().map(|f| f.field_path.as_str()).collect()
    }

    fn metadata() -> SchemaMetadata {
        let raw = add_metadata_fields(SCHEMA).unwrap();
        let schema = parse_avro_schema(&raw).unwrap();
        let platform = Urn::parse("urn:li:dataPlatform:hudi").unwrap();
        SchemaMetadata::from_table_schema(&schema, &platform, "sales.orders")
    }

    #[test]
    fn test_flattens_nested_records() {
        let meta = metadata();
        let customer_name = meta
            .fields
            .iter()
            .find(|f| f.field_path == "customer.name")
            .unwrap();

        assert!(customer_name.nullable);
        assert_eq!(customer_name.data_type, CatalogType::String);
        assert_eq!(meta.fields.len(), 9);
        assert_eq!(meta.platform, "urn:li:dataPlatform:hudi");
        assert_eq!(meta.hash.len(), 64);
    }

    #[test]
    fn test_reorder_moves_metadata_last() {
        let reordered = reorder_prefixed_fields(metadata().fields, "_hoodie_");

        assert_eq!(
            paths(&reordered),
            vec![
                "id",
                "customer",
                "customer.name",
                "placed",
                "_hoodie_commit_time",
                "_hoodie_commit_seqno",
                "_hoodie_record_key",
                "_hoodie_partition_path",
                "_hoodie_file_name",
            ]
        );
    }

    #[test]
    fn test_reorder_is_idempotent() {
        let once = reorder_prefixed_fields(metadata().fields, "_hoodie_");
        let twice = reorder_prefixed_fields(once.clone(), "_hoodie_");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_type_serialization() {
        let meta = metadata();
        let field = &meta.fields[5];
        let json = serde_json::to_value(field).unwrap();

        assert_eq!(json["fieldPath"], "id");
        assert_eq!(json["description"], "order id");
        assert_eq!(
            json["type"],
            serde_json::json!({"type": {"com.linkedin.schema.NumberType": {}}})
        );
        assert_eq!(json["nativeDataType"], "long");
    }
}
