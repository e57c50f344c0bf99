//! Lineage response model (wire format)
//!
//! This is the shape returned to callers:
//! `{ vertices: [{id, type, guid?, displayName?, attributes}], edges: [{label, sourceId, destinationId}] }`

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A vertex as presented to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageVertex {
    /// Abstracted node id (the stored `nodeId`)
    pub id: String,

    /// Vertex label
    #[serde(rename = "type")]
    pub node_type: String,

    /// Originating instance guid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Whitelisted attributes only
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl LineageVertex {
    /// Create a vertex with no guid, display name or attributes
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            guid: None,
            display_name: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// A directed edge as presented to callers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageEdge {
    pub label: String,
    pub source_id: String,
    pub destination_id: String,
}

impl LineageEdge {
    pub fn new(label: impl Into<String>, source_id: impl Into<String>, destination_id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            source_id: source_id.into(),
            destination_id: destination_id.into(),
        }
    }
}

/// Deduplicated set of vertices and edges answering one lineage query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageResponse {
    pub vertices: Vec<LineageVertex>,
    pub edges: Vec<LineageEdge>,
}

impl LineageResponse {
    /// Build a response from vertices keyed by id and a set of edges
    ///
    /// Output is ordered by vertex id and by edge, so identical graphs always
    /// serialize identically.
    pub fn from_parts(vertices: BTreeMap<String, LineageVertex>, edges: BTreeSet<LineageEdge>) -> Self {
        Self {
            vertices: vertices.into_values().collect(),
            edges: edges.into_iter().collect(),
        }
    }

    /// Find a vertex by id
    pub fn vertex(&self, id: &str) -> Option<&LineageVertex> {
        self.vertices.iter().find(|v| v.id == id)
    }

    pub fn contains_vertex(&self, id: &str) -> bool {
        self.vertex(id).is_some()
    }

    /// Check for an edge with the given label and endpoints
    pub fn contains_edge(&self, label: &str, source_id: &str, destination_id: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.label == label && e.source_id == source_id && e.destination_id == destination_id)
    }

    /// Ids of all vertices
    pub fn vertex_ids(&self) -> BTreeSet<&str> {
        self.vertices.iter().map(|v| v.id.as_str()).collect()
    }

    /// Vertices of the given type
    pub fn vertices_of_type<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = &'a LineageVertex> + 'a {
        self.vertices.iter().filter(move |v| v.node_type == node_type)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
