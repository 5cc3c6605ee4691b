//! Avro schema parsing
//!
//! Hudi stores the table's writer schema as Avro JSON. Only the parts that
//! matter for catalog and Spark metadata are modelled: primitives, the common
//! logical types, named types, nested containers and nullable unions.

use crate::error::SyncError;
use crate::schema::{FieldType, SchemaField, TableSchema};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Metadata columns Hudi prepends to every record
pub const HOODIE_METADATA_FIELDS: [&str; 5] = [
    "_hoodie_commit_time",
    "_hoodie_commit_seqno",
    "_hoodie_record_key",
    "_hoodie_partition_path",
    "_hoodie_file_name",
];

/// Parse an Avro record schema into a [`TableSchema`]
pub fn parse_avro_schema(raw: &str) -> Result<TableSchema, SyncError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| SyncError::build(format!("Invalid Avro schema JSON: {}", e)))?;

    let mut named = HashMap::new();
    let (field_type, _) = parse_type(&value, &mut named)?;

    match field_type {
        FieldType::Record { name, fields } => Ok(TableSchema {
            name,
            namespace: value
                .get("namespace")
                .and_then(Value::as_str)
                .map(str::to_string),
            fields,
            raw: raw.to_string(),
        }),
        other => Err(SyncError::build(format!(
            "Top-level Avro schema must be a record, found {}",
            other.native_name()
        ))),
    }
}

/// Prepend the Hudi metadata columns that the stored schema does not carry
pub fn add_metadata_fields(raw: &str) -> Result<String, SyncError> {
    let mut value: Value = serde_json::from_str(raw)
        .map_err(|e| SyncError::build(format!("Invalid Avro schema JSON: {}", e)))?;

    let fields = value
        .get_mut("fields")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| SyncError::build("Avro record schema has no 'fields' array"))?;

    let existing: Vec<String> = fields
        .iter()
        .filter_map(|f| f.get("name").and_then(Value::as_str).map(str::to_string))
        .collect();

    let missing: Vec<Value> = HOODIE_METADATA_FIELDS
        .iter()
        .filter(|name| !existing.iter().any(|e| e.as_str() == **name))
        .map(|name| {
            json!({
                "name": name,
                "type": ["null", "string"],
                "doc": "",
                "default": null,
            })
        })
        .collect();

    if missing.is_empty() {
        return Ok(raw.to_string());
    }

    let mut merged = missing;
    merged.append(fields);
    *fields = merged;
    Ok(value.to_string())
}

fn parse_type(
    value: &Value,
    named: &mut HashMap<String, FieldType>,
) -> Result<(FieldType, bool), SyncError> {
    match value {
        Value::String(name) => Ok((resolve_name(name, named)?, false)),
        Value::Array(branches) => parse_union(branches, named),
        Value::Object(map) => parse_complex(map, named),
        other => Err(SyncError::build(format!("Unsupported Avro type definition: {}", other))),
    }
}

fn resolve_name(name: &str, named: &HashMap<String, FieldType>) -> Result<FieldType, SyncError> {
    let primitive = match name {
        "boolean" => Some(FieldType::Boolean),
        "int" => Some(FieldType::Int),
        "long" => Some(FieldType::Long),
        "float" => Some(FieldType::Float),
        "double" => Some(FieldType::Double),
        "bytes" => Some(FieldType::Bytes),
        "string" => Some(FieldType::String),
        _ => None,
    };
    if let Some(t) = primitive {
        return Ok(t);
    }
    if name == "null" {
        return Err(SyncError::build("A column cannot have the bare 'null' type"));
    }

    named
        .get(name)
        .or_else(|| name.rsplit('.').next().and_then(|short| named.get(short)))
        .cloned()
        .ok_or_else(|| SyncError::build(format!("Unknown Avro type '{}'", name)))
}

fn parse_union(
    branches: &[Value],
    named: &mut HashMap<String, FieldType>,
) -> Result<(FieldType, bool), SyncError> {
    let mut nullable = false;
    let mut members = Vec::new();

    for branch in branches {
        if branch.as_str() == Some("null") {
            nullable = true;
            continue;
        }
        let (t, inner_nullable) = parse_type(branch, named)?;
        nullable |= inner_nullable;
        members.push(t);
    }

    match members.len() {
        0 => Err(SyncError::build("Union must contain at least one non-null branch")),
        1 => Ok((members.remove(0), nullable)),
        _ => Ok((FieldType::Union { branches: members }, nullable)),
    }
}

fn parse_complex(
    map: &Map<String, Value>,
    named: &mut HashMap<String, FieldType>,
) -> Result<(FieldType, bool), SyncError> {
    let type_value = map
        .get("type")
        .ok_or_else(|| SyncError::build("Avro type object has no 'type' attribute"))?;

    let type_name = match type_value {
        Value::String(s) => s.as_str(),
        nested => return parse_type(nested, named),
    };

    if let Some(logical) = logical_type(map, type_name) {
        return Ok((logical, false));
    }

    let parsed = match type_name {
        "record" | "error" => {
            let name = required_str(map, "name")?;
            let field_values = map
                .get("fields")
                .and_then(Value::as_array)
                .ok_or_else(|| SyncError::build(format!("Record '{}' has no 'fields' array", name)))?;

            let mut fields = Vec::with_capacity(field_values.len());
            for field in field_values {
                let field_map = field
                    .as_object()
                    .ok_or_else(|| SyncError::build(format!("Malformed field in record '{}'", name)))?;
                let field_name = required_str(field_map, "name")?;
                let field_type = field_map.get("type").ok_or_else(|| {
                    SyncError::build(format!("Field '{}.{}' has no type", name, field_name))
                })?;
                let (field_type, nullable) = parse_type(field_type, named)?;
                fields.push(SchemaField {
                    name: field_name.to_string(),
                    field_type,
                    nullable,
                    doc: field_map
                        .get("doc")
                        .and_then(Value::as_str)
                        .filter(|d| !d.is_empty())
                        .map(str::to_string),
                });
            }

            let record = FieldType::Record {
                name: name.to_string(),
                fields,
            };
            register(map, name, &record, named);
            record
        }
        "enum" => {
            let name = required_str(map, "name")?;
            let symbols = map
                .get("symbols")
                .and_then(Value::as_array)
                .map(|s| s.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default();
            let t = FieldType::Enum { symbols };
            register(map, name, &t, named);
            t
        }
        "fixed" => {
            let name = required_str(map, "name")?;
            let size = map.get("size").and_then(Value::as_u64).unwrap_or(0) as usize;
            let t = FieldType::Fixed { size };
            register(map, name, &t, named);
            t
        }
        "array" => {
            let items = map
                .get("items")
                .ok_or_else(|| SyncError::build("Array type has no 'items'"))?;
            let (items, items_nullable) = parse_type(items, named)?;
            FieldType::Array {
                items: Box::new(items),
                items_nullable,
            }
        }
        "map" => {
            let values = map
                .get("values")
                .ok_or_else(|| SyncError::build("Map type has no 'values'"))?;
            let (values, values_nullable) = parse_type(values, named)?;
            FieldType::Map {
                values: Box::new(values),
                values_nullable,
            }
        }
        primitive => resolve_name(primitive, named)?,
    };

    Ok((parsed, false))
}

fn logical_type(map: &Map<String, Value>, base: &str) -> Option<FieldType> {
    let logical = map.get("logicalType")?.as_str()?;
    match (logical, base) {
        ("date", "int") => Some(FieldType::Date),
        ("time-millis", "int") => Some(FieldType::TimeMillis),
        ("time-micros", "long") => Some(FieldType::TimeMicros),
        ("timestamp-millis", "long") | ("local-timestamp-millis", "long") => {
            Some(FieldType::TimestampMillis)
        }
        ("timestamp-micros", "long") | ("local-timestamp-micros", "long") => {
            Some(FieldType::TimestampMicros)
        }
        ("uuid", "string") => Some(FieldType::Uuid),
        ("decimal", "bytes") | ("decimal", "fixed") => Some(FieldType::Decimal {
            precision: map.get("precision").and_then(Value::as_u64).unwrap_or(0) as u32,
            scale: map.get("scale").and_then(Value::as_u64).unwrap_or(0) as u32,
        }),
        // Unknown logical types degrade to their underlying type
        _ => None,
    }
}

fn required_str<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a str, SyncError> {
    map.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| SyncError::build(format!("Avro type is missing '{}'", key)))
}

fn register(map: &Map<String, Value>, name: &str, t: &FieldType, named: &mut HashMap<String, FieldType>) {
    if let Some(ns) = map.get("namespace").and_then(Value::as_str) {
        named.insert(format!("{}.{}", ns, name), t.clone());
    }
    named.insert(name.to_string(), t.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ORDERS: &str = r#"{
        "type": "record",
        "name": "orders_record",
        "namespace": "hoodie.orders",
        "fields": [
            {"name": "id", "type": "long"},
            {"name": "amount", "type": ["null", {"type": "bytes", "logicalType": "decimal", "precision": 10, "scale": 2}], "default": null},
            {"name": "created_at", "type": {"type": "long", "logicalType": "timestamp-micros"}},
            {"name": "address", "type": ["null", {
                "type": "record", "name": "address",
                "fields": [{"name": "city", "type": "string", "doc": "city name"}]
            }]},
            {"name": "billing", "type": ["null", "address"]},
            {"name": "tags", "type": {"type": "array", "items": ["null", "string"]}},
            {"name": "status", "type": {"type": "enum", "name": "status_enum", "symbols": ["NEW", "PAID"]}}
        ]
    }"#;

    #[test]
    fn test_parse_record() {
        let schema = parse_avro_schema(ORDERS).unwrap();

        assert_eq!(schema.name, "orders_record");
        assert_eq!(schema.namespace.as_deref(), Some("hoodie.orders"));
        assert_eq!(schema.fields.len(), 7);

        let amount = schema.field("amount").unwrap();
        assert!(amount.nullable);
        assert_eq!(amount.field_type, FieldType::Decimal { precision: 10, scale: 2 });

        let created = schema.field("created_at").unwrap();
        assert!(!created.nullable);
        assert_eq!(created.field_type, FieldType::TimestampMicros);

        let billing = schema.field("billing").unwrap();
        assert_eq!(billing.field_type, schema.field("address").unwrap().field_type);

        assert_eq!(
            schema.field("tags").unwrap().field_type,
            FieldType::Array {
                items: Box::new(FieldType::String),
                items_nullable: true
            }
        );
    }

    #[test]
    fn test_rejects_non_record() {
        assert!(matches!(parse_avro_schema(r#""string""#), Err(SyncError::Build(_))));
        assert!(matches!(parse_avro_schema("{not json"), Err(SyncError::Build(_))));
        assert!(matches!(
            parse_avro_schema(r#"{"type":"record","name":"r","fields":[{"name":"x","type":"mystery"}]}"#),
            Err(SyncError::Build(_))
        ));
    }

    #[test]
    fn test_add_metadata_fields() {
        let with_meta = add_metadata_fields(ORDERS).unwrap();
        let schema = parse_avro_schema(&with_meta).unwrap();

        let names: Vec<&str> = schema.fields.iter().take(6).map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "_hoodie_commit_time",
                "_hoodie_commit_seqno",
                "_hoodie_record_key",
                "_hoodie_partition_path",
                "_hoodie_file_name",
                "id"
            ]
        );
        assert!(schema.field("_hoodie_record_key").unwrap().nullable);

        // already present: unchanged
        assert_eq!(add_metadata_fields(&with_meta).unwrap(), with_meta);
    }
}
