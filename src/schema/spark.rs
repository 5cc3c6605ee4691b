//! Spark catalog schema
//!
//! Spark reads a data source table's schema from its table properties as a
//! `StructType` JSON string, split across numbered parts when it is long.

use crate::schema::{FieldType, SchemaField, TableSchema};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
struct SparkStruct {
    #[serde(rename = "type")]
    kind: &'static str,
    fields: Vec<SparkField>,
}

#[derive(Debug, Serialize)]
struct SparkField {
    name: String,
    #[serde(rename = "type")]
    data_type: SparkType,
    nullable: bool,
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum SparkType {
    Primitive(String),
    Struct(SparkStruct),
    Array(SparkArray),
    Map(SparkMap),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SparkArray {
    #[serde(rename = "type")]
    kind: &'static str,
    element_type: Box<SparkType>,
    contains_null: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SparkMap {
    #[serde(rename = "type")]
    kind: &'static str,
    key_type: Box<SparkType>,
    value_type: Box<SparkType>,
    value_contains_null: bool,
}

fn spark_type(field_type: &FieldType) -> SparkType {
    let primitive = |name: &str| SparkType::Primitive(name.to_string());
    match field_type {
        FieldType::Boolean => primitive("boolean"),
        FieldType::Int | FieldType::TimeMillis => primitive("integer"),
        FieldType::Long | FieldType::TimeMicros => primitive("long"),
        FieldType::Float => primitive("float"),
        FieldType::Double => primitive("double"),
        FieldType::Bytes | FieldType::Fixed { .. } => primitive("binary"),
        FieldType::String | FieldType::Enum { .. } | FieldType::Uuid => primitive("string"),
        FieldType::Date => primitive("date"),
        FieldType::TimestampMillis | FieldType::TimestampMicros => primitive("timestamp"),
        FieldType::Decimal { precision, scale } => {
            SparkType::Primitive(format!("decimal({},{})", precision, scale))
        }
        FieldType::Record { fields, .. } => SparkType::Struct(spark_struct(fields.iter())),
        FieldType::Array {
            items,
            items_nullable,
        } => SparkType::Array(SparkArray {
            kind: "array",
            element_type: Box::new(spark_type(items)),
            contains_null: *items_nullable,
        }),
        FieldType::Map {
            values,
            values_nullable,
        } => SparkType::Map(SparkMap {
            kind: "map",
            key_type: Box::new(primitive("string")),
            value_type: Box::new(spark_type(values)),
            value_contains_null: *values_nullable,
        }),
        // Spark exposes multi-branch unions as a struct of optional members
        FieldType::Union { branches } => SparkType::Struct(SparkStruct {
            kind: "struct",
            fields: branches
                .iter()
                .enumerate()
                .map(|(i, b)| SparkField {
                    name: format!("member{}", i),
                    data_type: spark_type(b),
                    nullable: true,
                    metadata: BTreeMap::new(),
                })
                .collect(),
        }),
    }
}

fn spark_struct<'a>(fields: impl Iterator<Item = &'a SchemaField>) -> SparkStruct {
    SparkStruct {
        kind: "struct",
        fields: fields
            .map(|f| SparkField {
                name: f.name.clone(),
                data_type: spark_type(&f.field_type),
                nullable: f.nullable,
                metadata: BTreeMap::new(),
            })
            .collect(),
    }
}

/// Spark schema JSON with the partition columns moved to the end in
/// partition order
pub fn spark_schema_json(schema: &TableSchema, partition_fields: &[String]) -> String {
    let data = schema
        .fields
        .iter()
        .filter(|f| !partition_fields.contains(&f.name));
    let partitions = partition_fields
        .iter()
        .filter_map(|p| schema.fields.iter().find(|f| &f.name == p));

    let root = spark_struct(data.chain(partitions));
    // Plain structs with string keys always serialize
    serde_json::to_string(&root).unwrap_or_default()
}

/// Table properties that let Spark resolve the table as a Hudi data source
pub fn spark_table_properties(
    schema: &TableSchema,
    partition_fields: &[String],
    spark_version: Option<&str>,
    schema_length_threshold: usize,
) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();
    props.insert("spark.sql.sources.provider".to_string(), "hudi".to_string());
    if let Some(version) = spark_version.filter(|v| !v.is_empty()) {
        props.insert("spark.sql.create.version".to_string(), version.to_string());
    }

    let schema_json = spark_schema_json(schema, partition_fields);
    let parts = split_chars(&schema_json, schema_length_threshold.max(1));
    props.insert(
        "spark.sql.sources.schema.numParts".to_string(),
        parts.len().to_string(),
    );
    for (i, part) in parts.into_iter().enumerate() {
        props.insert(format!("spark.sql.sources.schema.part.{}", i), part);
    }

    if !partition_fields.is_empty() {
        props.insert(
            "spark.sql.sources.schema.numPartCols".to_string(),
            partition_fields.len().to_string(),
        );
        for (i, field) in partition_fields.iter().enumerate() {
            props.insert(format!("spark.sql.sources.schema.partCol.{}", i), field.clone());
        }
    }

    props
}

fn split_chars(s: &str, chunk: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    chars.chunks(chunk).map(|c| c.iter().collect()).collect()
}
