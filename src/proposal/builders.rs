//! Proposal builders
//!
//! Turn table facts into ordered proposal lists. Building is pure: no I/O and
//! the same inputs always give the same proposals. Container proposals come
//! before dataset proposals.

use super::models::*;
use crate::config::SyncConfig;
use crate::identifier::{DatasetIdentifier, Urn};
use crate::schema::{reorder_prefixed_fields, SchemaMetadata, TableSchema};
use std::collections::BTreeMap;
use tracing::warn;

const CONTAINER_SUB_TYPE: &str = "Database";
const DATASET_SUB_TYPE: &str = "Table";

/// Builds proposals for one table
#[derive(Debug, Clone)]
pub struct ProposalBuilder {
    identifier: DatasetIdentifier,
    domain: Option<Urn>,
    undo_soft_delete: bool,
    metadata_field_prefix: String,
}

impl ProposalBuilder {
    pub fn new(
        identifier: DatasetIdentifier,
        domain: Option<Urn>,
        undo_soft_delete: bool,
        metadata_field_prefix: impl Into<String>,
    ) -> Self {
        Self {
            identifier,
            domain,
            undo_soft_delete,
            metadata_field_prefix: metadata_field_prefix.into(),
        }
    }

    /// A malformed domain identifier only drops the domain proposals
    pub fn from_config(config: &SyncConfig, identifier: DatasetIdentifier) -> Self {
        let domain = match config.domain_identifier.as_deref() {
            Some(raw) if config.attach_domain() => match Urn::parse(raw) {
                Ok(urn) => Some(urn),
                Err(e) => {
                    warn!("Failed to create domain URN from '{}', skipping domain: {}", raw, e);
                    None
                }
            },
            _ => None,
        };

        Self::new(
            identifier,
            domain,
            config.undo_soft_delete,
            config.metadata_field_prefix.clone(),
        )
    }

    pub fn identifier(&self) -> &DatasetIdentifier {
        &self.identifier
    }

    /// `status{removed: false}` when soft deletes should be undone
    pub fn status_proposal(&self, kind: EntityKind, urn: &Urn) -> Option<Proposal> {
        self.undo_soft_delete
            .then(|| Proposal::new(kind, urn.clone(), Aspect::Status(Status { removed: false })))
    }

    /// Domain attachment when a domain is configured
    pub fn domain_proposal(&self, kind: EntityKind, urn: &Urn) -> Option<Proposal> {
        self.domain.as_ref().map(|domain| {
            Proposal::new(
                kind,
                urn.clone(),
                Aspect::Domains(Domains {
                    domains: vec![domain.clone()],
                }),
            )
        })
    }

    pub fn container_proposals(&self) -> Vec<Proposal> {
        let urn = &self.identifier.container_urn;
        let kind = EntityKind::Container;
        let upsert = |aspect| Proposal::new(kind, urn.clone(), aspect);

        [
            Some(upsert(Aspect::ContainerProperties(ContainerProperties {
                name: self.identifier.database_name.clone(),
            }))),
            Some(upsert(Aspect::SubTypes(SubTypes {
                type_names: vec![CONTAINER_SUB_TYPE.to_string()],
            }))),
            Some(upsert(Aspect::BrowsePathsV2(BrowsePathsV2 { path: Vec::new() }))),
            self.status_proposal(kind, urn),
            self.domain_proposal(kind, urn),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn dataset_proposals(&self, schema: &TableSchema) -> Vec<Proposal> {
        let urn = &self.identifier.dataset_urn;
        let kind = EntityKind::Dataset;
        let upsert = |aspect| Proposal::new(kind, urn.clone(), aspect);

        [
            self.status_proposal(kind, urn),
            Some(upsert(Aspect::SubTypes(SubTypes {
                type_names: vec![DATASET_SUB_TYPE.to_string()],
            }))),
            Some(upsert(Aspect::BrowsePathsV2(BrowsePathsV2 {
                path: vec![BrowsePathEntry {
                    id: self.identifier.database_name.clone(),
                    urn: Some(self.identifier.container_urn.clone()),
                }],
            }))),
            Some(upsert(Aspect::Container(ContainerMembership {
                container: self.identifier.container_urn.clone(),
            }))),
            Some(upsert(Aspect::SchemaMetadata(self.schema_metadata(schema)))),
            self.domain_proposal(kind, urn),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Every proposal of a schema sync: container first, then dataset
    pub fn schema_sync_proposals(&self, schema: &TableSchema) -> Vec<Proposal> {
        let mut proposals = self.container_proposals();
        proposals.extend(self.dataset_proposals(schema));
        proposals
    }

    /// Schema aspect with metadata fields after user fields
    pub fn schema_metadata(&self, schema: &TableSchema) -> SchemaMetadata {
        let mut metadata = SchemaMetadata::from_table_schema(
            schema,
            &self.identifier.platform_urn,
            &self.identifier.qualified_name(),
        );
        metadata.fields = reorder_prefixed_fields(metadata.fields, &self.metadata_field_prefix);
        metadata
    }

    /// Patch asserting exactly the given custom properties, plus the display
    /// name when one is supplied
    pub fn properties_patch(&self, name: Option<&str>, properties: BTreeMap<String, String>) -> Proposal {
        Proposal::new(
            EntityKind::Dataset,
            self.identifier.dataset_urn.clone(),
            Aspect::DatasetPropertiesPatch(DatasetPropertiesPatch {
                name: name.map(str::to_string),
                custom_properties: properties,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, SchemaField};
    use pretty_assertions::assert_eq;

    fn identifier() -> DatasetIdentifier {
        DatasetIdentifier::new("hudi", "sales", "orders", "PROD").unwrap()
    }

    fn schema() -> TableSchema {
        TableSchema {
            name: "orders".to_string(),
            namespace: None,
            fields: vec![
                SchemaField::new("_hoodie_commit_time", FieldType::String, true),
                SchemaField::new("id", FieldType::Long, false),
            ],
            raw: r#"{"type":"record"}"#.to_string(),
        }
    }

    fn aspect_names(proposals: &[Proposal]) -> Vec<&'static str> {
        proposals.iter().map(|p| p.aspect_name()).collect()
    }

    #[test]
    fn test_schema_sync_order_with_all_options() {
        let domain = Urn::parse("urn:li:domain:finance").unwrap();
        let builder = ProposalBuilder::new(identifier(), Some(domain), true, "_hoodie_");
        let proposals = builder.schema_sync_proposals(&schema());

        assert_eq!(
            aspect_names(&proposals),
            vec![
                "containerProperties",
                "subTypes",
                "browsePathsV2",
                "status",
                "domains",
                "status",
                "subTypes",
                "browsePathsV2",
                "container",
                "schemaMetadata",
                "domains",
            ]
        );
        assert!(proposals[..5]
            .iter()
            .all(|p| p.entity_kind() == EntityKind::Container));
        assert!(proposals[5..]
            .iter()
            .all(|p| p.entity_kind() == EntityKind::Dataset));
        assert!(proposals.iter().all(|p| !p.is_patch()));
    }

    #[test]
    fn test_domain_disabled_emits_no_domains() {
        let builder = ProposalBuilder::new(identifier(), None, false, "_hoodie_");
        let proposals = builder.schema_sync_proposals(&schema());

        assert_eq!(proposals.len(), 7);
        assert!(proposals
            .iter()
            .all(|p| !matches!(p.aspect(), Aspect::Domains(_) | Aspect::Status(_))));
    }

    #[test]
    fn test_malformed_domain_skips_domains_only() {
        let config = SyncConfig {
            domain_identifier: Some("finance".to_string()),
            ..SyncConfig::default()
        };
        let builder = ProposalBuilder::from_config(&config, identifier());
        let proposals = builder.schema_sync_proposals(&schema());

        assert_eq!(proposals.len(), 9);
        assert!(proposals
            .iter()
            .all(|p| !matches!(p.aspect(), Aspect::Domains(_))));
        assert!(proposals
            .iter()
            .any(|p| matches!(p.aspect(), Aspect::SchemaMetadata(_))));
    }

    #[test]
    fn test_valid_domain_from_config() {
        let config = SyncConfig {
            domain_identifier: Some("urn:li:domain:finance".to_string()),
            ..SyncConfig::default()
        };
        let proposals = ProposalBuilder::from_config(&config, identifier()).schema_sync_proposals(&schema());

        assert_eq!(proposals.len(), 11);
        assert_eq!(
            proposals
                .iter()
                .filter(|p| matches!(p.aspect(), Aspect::Domains(_)))
                .count(),
            2
        );
    }

    #[test]
    fn test_schema_fields_reordered() {
        let builder = ProposalBuilder::new(identifier(), None, true, "_hoodie_");
        let metadata = builder.schema_metadata(&schema());
        let paths: Vec<&str> = metadata.fields.iter().map(|f| f.field_path.as_str()).collect();

        assert_eq!(paths, vec!["id", "_hoodie_commit_time"]);
        assert_eq!(metadata.schema_name, "sales.orders");
    }

    #[test]
    fn test_properties_patch_only_asserts_given_keys() {
        let builder = ProposalBuilder::new(identifier(), None, true, "_hoodie_");
        let mut props = BTreeMap::new();
        props.insert("hudi.table.type".to_string(), "COPY_ON_WRITE".to_string());

        let proposal = builder.properties_patch(None, props.clone());
        assert!(proposal.is_patch());
        match proposal.aspect() {
            Aspect::DatasetPropertiesPatch(patch) => {
                assert_eq!(patch.custom_properties, props);
                assert_eq!(patch.name, None);
                assert_eq!(patch.operations().len(), 1);
            }
            other => panic!("unexpected aspect {:?}", other),
        }

        let named = builder.properties_patch(Some("orders"), BTreeMap::new());
        match named.aspect() {
            Aspect::DatasetPropertiesPatch(patch) => {
                assert!(patch.custom_properties.is_empty());
                assert_eq!(patch.operations().len(), 1);
            }
            other => panic!("unexpected aspect {:?}", other),
        }
    }
}
