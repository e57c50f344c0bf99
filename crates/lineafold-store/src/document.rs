//! Portable graph documents
//!
//! A GraphSON-like JSON form of a whole graph, used for dumps to disk, exports over the
//! wire and for reloading persisted state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::memory::{GraphData, MemoryGraph};
use crate::store::{Edge, EdgeId, GraphStore, Properties, StoreError, Vertex, VertexId};

/// Document format version
pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexRecord {
    pub id: u64,
    pub label: String,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: u64,
    pub label: String,
    #[serde(rename = "outV")]
    pub out_vertex: u64,
    #[serde(rename = "inV")]
    pub in_vertex: u64,
    #[serde(default)]
    pub properties: Properties,
}

/// Serialized form of one graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub version: u32,
    pub graph: String,
    pub vertices: Vec<VertexRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl GraphDocument {
    /// Capture the committed state of a store
    pub fn capture(store: &dyn GraphStore) -> Result<Self, StoreError> {
        let snapshot = store.snapshot()?;

        let vertices = snapshot
            .all_vertices()?
            .into_iter()
            .map(|v| VertexRecord {
                id: v.id.0,
                label: v.label,
                properties: v.properties,
            })
            .collect();

        let edges = snapshot
            .all_edges()?
            .into_iter()
            .map(|e| EdgeRecord {
                id: e.id.0,
                label: e.label,
                out_vertex: e.from.0,
                in_vertex: e.to.0,
                properties: e.properties,
            })
            .collect();

        Ok(Self {
            version: DOCUMENT_VERSION,
            graph: store.name().to_string(),
            vertices,
            edges,
        })
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let document: GraphDocument = serde_json::from_str(json)?;
        if document.version != DOCUMENT_VERSION {
            return Err(StoreError::InvalidDocument(format!(
                "unsupported document version {} (expected {})",
                document.version, DOCUMENT_VERSION
            )));
        }
        Ok(document)
    }

    /// Load from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Rebuild an in-memory graph, preserving vertex and edge ids
    pub fn into_graph(self, name: impl Into<String>) -> Result<MemoryGraph, StoreError> {
        let mut data = GraphData::default();

        for record in self.vertices {
            data.insert_vertex(Vertex {
                id: VertexId(record.id),
                label: record.label,
                properties: record.properties,
            });
        }

        for record in self.edges {
            let id = record.id;
            data.insert_edge(Edge {
                id: EdgeId(record.id),
                label: record.label,
                from: VertexId(record.out_vertex),
                to: VertexId(record.in_vertex),
                properties: record.properties,
            })
            .map_err(|missing| {
                StoreError::InvalidDocument(format!("edge e{} references unknown vertex {}", id, missing))
            })?;
        }

        Ok(MemoryGraph::with_data(name, data))
    }
}

impl MemoryGraph {
    /// Rebuild a graph from a document
    pub fn from_document(name: impl Into<String>, document: GraphDocument) -> Result<Self, StoreError> {
        document.into_graph(name)
    }
}

/// Export a graph to a serialized string
pub fn export_graph(store: &dyn GraphStore) -> Result<String, StoreError> {
    GraphDocument::capture(store)?.to_json()
}

/// Dump a graph to `<dir>/<graph>.json`, returning the written path
pub fn dump_graph(store: &dyn GraphStore, dir: &Path) -> Result<PathBuf, StoreError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", store.name()));
    std::fs::write(&path, export_graph(store)?)?;

    tracing::info!(graph = store.name(), path = %path.display(), "graph dumped");
    Ok(path)
}

/// Load a graph previously written by [`dump_graph`]
pub fn load_graph(name: impl Into<String>, path: &Path) -> Result<MemoryGraph, StoreError> {
    GraphDocument::from_file(path)?.into_graph(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GraphTransaction;
    use pretty_assertions::assert_eq;

    fn sample() -> MemoryGraph {
        let graph = MemoryGraph::new("main");
        let mut tx = graph.begin().unwrap();
        let c = tx
            .add_vertex("Column", Properties::from([("nodeId".to_string(), "c1".to_string())]))
            .unwrap();
        let t = tx
            .add_vertex("Table", Properties::from([("nodeId".to_string(), "t1".to_string())]))
            .unwrap();
        tx.add_edge("IncludedIn", c, t, Properties::new()).unwrap();
        tx.commit().unwrap();
        graph
    }

    #[test]
    fn export_contains_elements() {
        let json = export_graph(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["graph"], "main");
        assert_eq!(value["vertices"].as_array().unwrap().len(), 2);
        assert_eq!(value["edges"][0]["label"], "IncludedIn");
        assert_eq!(value["edges"][0]["outV"], 0);
        assert_eq!(value["edges"][0]["inV"], 1);
    }

    #[test]
    fn dump_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let original = sample();
        let path = dump_graph(&original, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("main.json"));

        let reloaded = load_graph("main", &path).unwrap();
        assert_eq!(
            GraphDocument::capture(&reloaded).unwrap(),
            GraphDocument::capture(&original).unwrap()
        );

        // ids keep counting from the loaded maximum
        let mut tx = reloaded.begin().unwrap();
        let next = tx.add_vertex("Process", Properties::new()).unwrap();
        assert_eq!(next, VertexId(2));
    }

    #[test]
    fn dangling_edge_is_rejected() {
        let document = GraphDocument {
            version: DOCUMENT_VERSION,
            graph: "main".to_string(),
            vertices: vec![VertexRecord {
                id: 0,
                label: "Column".to_string(),
                properties: Properties::new(),
            }],
            edges: vec![EdgeRecord {
                id: 0,
                label: "IncludedIn".to_string(),
                out_vertex: 0,
                in_vertex: 5,
                properties: Properties::new(),
            }],
        };

        let err = MemoryGraph::from_document("main", document).unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument(msg) if msg.contains("v5")));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let json = r#"{"version": 9, "graph": "main", "vertices": [], "edges": []}"#;
        assert!(matches!(GraphDocument::from_json(json), Err(StoreError::InvalidDocument(_))));
    }
}
