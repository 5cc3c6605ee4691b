//! Proposal data models
//!
//! A proposal is one desired mutation of one aspect of one catalog entity.
//! Proposals are immutable once built.

use crate::identifier::Urn;
use crate::schema::SchemaMetadata;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Catalog entity kind, used for transport routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Dataset,
    Container,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Dataset => "dataset",
            EntityKind::Container => "container",
        }
    }
}

/// How the catalog applies the aspect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    /// Replace the aspect wholesale
    Upsert,
    /// Merge only the supplied fields
    Patch,
}

/// `status` aspect; `removed: false` undoes a soft delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub removed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTypes {
    pub type_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerProperties {
    pub name: String,
}

/// `container` aspect: the parent container of a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerMembership {
    pub container: Urn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowsePathEntry {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urn: Option<Urn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowsePathsV2 {
    pub path: Vec<BrowsePathEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Domains {
    pub domains: Vec<Urn>,
}

/// Partial update of `datasetProperties`. Only the listed custom properties
/// and, when present, the display name are asserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetPropertiesPatch {
    pub name: Option<String>,
    pub custom_properties: BTreeMap<String, String>,
}

impl DatasetPropertiesPatch {
    /// JSON-Patch `add` operations, one per property plus one for the name
    pub fn operations(&self) -> Vec<Value> {
        let mut ops: Vec<Value> = self
            .custom_properties
            .iter()
            .map(|(key, value)| {
                json!({
                    "op": "add",
                    "path": format!("/customProperties/{}", escape_pointer(key)),
                    "value": value,
                })
            })
            .collect();

        if let Some(name) = &self.name {
            ops.push(json!({ "op": "add", "path": "/name", "value": name }));
        }
        ops
    }
}

// RFC 6901 reference token escaping
fn escape_pointer(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Aspect payload; the variant is the aspect kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Aspect {
    Status(Status),
    SubTypes(SubTypes),
    ContainerProperties(ContainerProperties),
    Container(ContainerMembership),
    BrowsePathsV2(BrowsePathsV2),
    Domains(Domains),
    SchemaMetadata(SchemaMetadata),
    DatasetPropertiesPatch(DatasetPropertiesPatch),
}

impl Aspect {
    /// Aspect name as the catalog knows it
    pub fn name(&self) -> &'static str {
        match self {
            Aspect::Status(_) => "status",
            Aspect::SubTypes(_) => "subTypes",
            Aspect::ContainerProperties(_) => "containerProperties",
            Aspect::Container(_) => "container",
            Aspect::BrowsePathsV2(_) => "browsePathsV2",
            Aspect::Domains(_) => "domains",
            Aspect::SchemaMetadata(_) => "schemaMetadata",
            Aspect::DatasetPropertiesPatch(_) => "datasetProperties",
        }
    }

    pub fn change_type(&self) -> ChangeType {
        match self {
            Aspect::DatasetPropertiesPatch(_) => ChangeType::Patch,
            _ => ChangeType::Upsert,
        }
    }

    /// The value sent on the wire: the aspect document for upserts, the
    /// operation list for patches
    pub fn wire_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Aspect::DatasetPropertiesPatch(patch) => Ok(Value::Array(patch.operations())),
            other => serde_json::to_value(other),
        }
    }
}

/// One desired mutation against one catalog entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    entity_urn: Urn,
    entity_kind: EntityKind,
    aspect: Aspect,
}

impl Proposal {
    pub fn new(entity_kind: EntityKind, entity_urn: Urn, aspect: Aspect) -> Self {
        Self {
            entity_urn,
            entity_kind,
            aspect,
        }
    }

    pub fn entity_urn(&self) -> &Urn {
        &self.entity_urn
    }

    pub fn entity_kind(&self) -> EntityKind {
        self.entity_kind
    }

    pub fn aspect(&self) -> &Aspect {
        &self.aspect
    }

    pub fn aspect_name(&self) -> &'static str {
        self.aspect.name()
    }

    pub fn change_type(&self) -> ChangeType {
        self.aspect.change_type()
    }

    pub fn is_patch(&self) -> bool {
        self.change_type() == ChangeType::Patch
    }
}

impl std::fmt::Display for Proposal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} on {}", self.entity_kind.as_str(), self.aspect_name(), self.entity_urn)
    }
}
