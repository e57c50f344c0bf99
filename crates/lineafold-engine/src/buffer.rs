//! Translation of metadata instance events into the buffer graph
//!
//! Entities become vertices keyed by `guid` and labeled with their type name.
//! Relationships become edges labeled with their type name. Process context events
//! also yield the column-to-column fragments that the consolidator folds into the
//! main graph.
//!
//! Events may arrive repeated or out of order: entity writes are upserts and a
//! relationship is only added once per (label, endpoints).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use lineafold_core::{keys, GraphName};
use lineafold_store::{GraphSnapshot, GraphStore, GraphTransaction, Properties, VertexId};

use crate::consolidator::ProcessRef;
use crate::error::{LineageError, Result};

/// An entity instance as delivered by the event source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDetail {
    pub guid: String,
    pub type_name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl EntityDetail {
    pub fn new(guid: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            type_name: type_name.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Add an entity property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// A relationship instance linking two entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDetail {
    pub guid: String,
    pub type_name: String,
    pub end_one_guid: String,
    pub end_two_guid: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl RelationshipDetail {
    pub fn new(
        guid: impl Into<String>,
        type_name: impl Into<String>,
        end_one_guid: impl Into<String>,
        end_two_guid: impl Into<String>,
    ) -> Self {
        Self {
            guid: guid.into(),
            type_name: type_name.into(),
            end_one_guid: end_one_guid.into(),
            end_two_guid: end_two_guid.into(),
            properties: BTreeMap::new(),
        }
    }
}

/// One "column in feeds column out" mapping of a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub input_column: String,
    pub output_column: String,
}

/// Metadata instance change event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum InstanceEvent {
    NewEntity { entity: EntityDetail },

    UpdatedEntity { entity: EntityDetail },

    NewRelationship { relationship: RelationshipDetail },

    /// Full context of a process: the process entity and its column mappings
    ProcessContext {
        process: EntityDetail,
        #[serde(default)]
        mappings: Vec<ColumnMapping>,
    },
}

impl InstanceEvent {
    /// Stable event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::NewEntity { .. } => "NewEntity",
            Self::UpdatedEntity { .. } => "UpdatedEntity",
            Self::NewRelationship { .. } => "NewRelationship",
            Self::ProcessContext { .. } => "ProcessContext",
        }
    }
}

/// A buffered lineage fragment ready for consolidation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageFragment {
    pub column_in: String,
    pub column_out: String,
    pub process: ProcessRef,
}

/// Writes instance events into the buffer graph
pub struct BufferWriter {
    buffer: Arc<dyn GraphStore>,
}

impl BufferWriter {
    pub fn new(buffer: Arc<dyn GraphStore>) -> Self {
        Self { buffer }
    }

    /// Apply one event in a single buffer transaction
    ///
    /// Returns the lineage fragments carried by the event (only process context
    /// events carry any).
    pub fn apply(&self, event: &InstanceEvent) -> Result<Vec<LineageFragment>> {
        let mut tx = self.buffer.begin()?;

        let fragments = match event {
            InstanceEvent::NewEntity { entity } | InstanceEvent::UpdatedEntity { entity } => {
                upsert_entity(&mut *tx, entity)?;
                Vec::new()
            }
            InstanceEvent::NewRelationship { relationship } => {
                add_relationship(&mut *tx, relationship)?;
                Vec::new()
            }
            InstanceEvent::ProcessContext { process, mappings } => {
                let id = upsert_entity(&mut *tx, process)?;
                let vertex = tx.require_vertex(id)?;
                let process_ref = ProcessRef::from_vertex(&vertex).ok_or_else(|| LineageError::NotFound {
                    operation: "apply_process_context",
                    graph: GraphName::Buffer,
                    guid: process.guid.clone(),
                })?;

                mappings
                    .iter()
                    .map(|m| LineageFragment {
                        column_in: m.input_column.clone(),
                        column_out: m.output_column.clone(),
                        process: process_ref.clone(),
                    })
                    .collect()
            }
        };

        tx.commit()?;

        tracing::debug!(
            event = event.event_type(),
            fragments = fragments.len(),
            "event applied to buffer graph"
        );
        Ok(fragments)
    }
}

/// Buffer representation of entity properties
fn entity_properties(properties: &BTreeMap<String, String>) -> impl Iterator<Item = (String, String)> + '_ {
    properties
        .iter()
        .map(|(name, value)| (keys::entity_property(name), value.clone()))
}

fn upsert_entity<T: GraphTransaction + ?Sized>(tx: &mut T, entity: &EntityDetail) -> Result<VertexId> {
    if let Some(existing) = tx.find_vertex(keys::GUID, &entity.guid)? {
        if existing.label != entity.type_name {
            tracing::debug!(
                guid = %entity.guid,
                stored = %existing.label,
                received = %entity.type_name,
                "entity type differs from buffered vertex, keeping stored label"
            );
        }
        for (key, value) in entity_properties(&entity.properties) {
            tx.set_property(existing.id, &key, &value)?;
        }
        return Ok(existing.id);
    }

    let mut properties: Properties = entity_properties(&entity.properties).collect();
    properties.insert(keys::GUID.to_string(), entity.guid.clone());
    Ok(tx.add_vertex(&entity.type_name, properties)?)
}

fn add_relationship<T: GraphTransaction + ?Sized>(tx: &mut T, relationship: &RelationshipDetail) -> Result<()> {
    let mut ends = Vec::with_capacity(2);
    for guid in [&relationship.end_one_guid, &relationship.end_two_guid] {
        let vertex = tx.find_vertex(keys::GUID, guid)?.ok_or_else(|| LineageError::NotFound {
            operation: "apply_relationship",
            graph: GraphName::Buffer,
            guid: guid.clone(),
        })?;
        ends.push(vertex.id);
    }
    let (from, to) = (ends[0], ends[1]);

    if tx.has_edge(from, &relationship.type_name, to)? {
        return Ok(());
    }

    let mut properties: Properties = entity_properties(&relationship.properties).collect();
    properties.insert(keys::GUID.to_string(), relationship.guid.clone());
    tx.add_edge(&relationship.type_name, from, to, properties)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineafold_store::{Direction, MemoryGraph};
    use pretty_assertions::assert_eq;

    fn writer() -> (Arc<dyn GraphStore>, BufferWriter) {
        let buffer: Arc<dyn GraphStore> = Arc::new(MemoryGraph::new("buffer"));
        (Arc::clone(&buffer), BufferWriter::new(buffer))
    }

    #[test]
    fn entity_upsert_prefixes_properties() {
        let (buffer, writer) = writer();
        let entity = EntityDetail::new("c1", "RelationalColumn").with_property("displayName", "id");

        writer.apply(&InstanceEvent::NewEntity { entity: entity.clone() }).unwrap();
        writer
            .apply(&InstanceEvent::UpdatedEntity {
                entity: entity.with_property("displayName", "customer_id"),
            })
            .unwrap();

        let snapshot = buffer.snapshot().unwrap();
        let vertices = snapshot.find_vertices("guid", "c1").unwrap();
        assert_eq!(vertices.len(), 1);
        assert_eq!(vertices[0].label, "RelationalColumn");
        assert_eq!(vertices[0].property("vepropdisplayName"), Some("customer_id"));
    }

    #[test]
    fn relationships_are_added_once() {
        let (buffer, writer) = writer();
        writer
            .apply(&InstanceEvent::NewEntity { entity: EntityDetail::new("t1", "RelationalTable") })
            .unwrap();
        writer
            .apply(&InstanceEvent::NewEntity { entity: EntityDetail::new("c1", "RelationalColumn") })
            .unwrap();

        let event = InstanceEvent::NewRelationship {
            relationship: RelationshipDetail::new("r1", "NestedSchemaAttribute", "t1", "c1"),
        };
        writer.apply(&event).unwrap();
        writer.apply(&event).unwrap();

        let snapshot = buffer.snapshot().unwrap();
        let table = snapshot.find_vertex("guid", "t1").unwrap().unwrap();
        let edges = snapshot.edges(table.id, Direction::Out, None).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].label, "NestedSchemaAttribute");
        assert_eq!(edges[0].properties.get("guid").map(String::as_str), Some("r1"));
    }

    #[test]
    fn relationship_to_unknown_entity_fails_without_writes() {
        let (buffer, writer) = writer();
        writer
            .apply(&InstanceEvent::NewEntity { entity: EntityDetail::new("t1", "RelationalTable") })
            .unwrap();

        let err = writer
            .apply(&InstanceEvent::NewRelationship {
                relationship: RelationshipDetail::new("r1", "NestedSchemaAttribute", "t1", "ghost"),
            })
            .unwrap_err();

        assert!(matches!(err, LineageError::NotFound { ref guid, .. } if guid == "ghost"));
        assert!(buffer.snapshot().unwrap().all_edges().unwrap().is_empty());
    }

    #[test]
    fn process_context_yields_fragments() {
        let (_, writer) = writer();
        let event = InstanceEvent::ProcessContext {
            process: EntityDetail::new("p1", "Process").with_property("displayName", "load_customers"),
            mappings: vec![
                ColumnMapping { input_column: "c1".to_string(), output_column: "c2".to_string() },
                ColumnMapping { input_column: "c3".to_string(), output_column: "c4".to_string() },
            ],
        };

        let fragments = writer.apply(&event).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[1].column_in, "c3");
        assert_eq!(fragments[1].process.guid, "p1");
        assert_eq!(fragments[1].process.display_name.as_deref(), Some("load_customers"));
    }

    #[test]
    fn events_deserialize_from_tagged_json() {
        let json = r#"[
            {"eventType": "NewEntity", "entity": {"guid": "c1", "typeName": "RelationalColumn",
                "properties": {"displayName": "id"}}},
            {"eventType": "NewRelationship", "relationship": {"guid": "r1", "typeName": "SemanticAssignment",
                "endOneGuid": "c1", "endTwoGuid": "g1"}},
            {"eventType": "ProcessContext", "process": {"guid": "p1", "typeName": "Process"},
                "mappings": [{"inputColumn": "c1", "outputColumn": "c2"}]}
        ]"#;

        let events: Vec<InstanceEvent> = serde_json::from_str(json).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].event_type(), "NewRelationship");
        assert!(matches!(&events[2], InstanceEvent::ProcessContext { mappings, .. } if mappings.len() == 1));
    }
}
