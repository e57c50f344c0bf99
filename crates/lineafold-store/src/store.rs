//! Graph store traits and element types

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;

use lineafold_core::keys;

/// Vertex or edge properties, keyed by property name
pub type Properties = BTreeMap<String, String>;

/// Store-assigned vertex identifier
///
/// Only meaningful inside one graph. Lineage identity lives in the `nodeId` and
/// `guid` properties, never in this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub u64);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Store-assigned edge identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// A labeled vertex with string properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex {
    pub id: VertexId,
    pub label: String,
    pub properties: Properties,
}

impl Vertex {
    /// Get a property value
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn guid(&self) -> Option<&str> {
        self.property(keys::GUID)
    }

    pub fn node_id(&self) -> Option<&str> {
        self.property(keys::NODE_ID)
    }

    /// Display name, falling back to the buffer entity property
    pub fn display_name(&self) -> Option<&str> {
        self.property(keys::DISPLAY_NAME)
            .or_else(|| self.property(keys::ALTERNATIVE_DISPLAY_NAME))
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.label == label
    }
}

/// A directed, labeled edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: EdgeId,
    pub label: String,
    pub from: VertexId,
    pub to: VertexId,
    pub properties: Properties,
}

impl Edge {
    /// The endpoint opposite to `vertex`
    pub fn other(&self, vertex: VertexId) -> VertexId {
        if self.from == vertex {
            self.to
        } else {
            self.from
        }
    }
}

/// Direction of an edge expansion relative to the current vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Follow edges leaving the vertex
    Out,

    /// Follow edges entering the vertex
    In,

    /// Follow edges in either direction
    Both,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Self::Out => Self::In,
            Self::In => Self::Out,
            Self::Both => Self::Both,
        }
    }
}

/// A vertex reached by [`GraphSnapshot::expand`] and its hop distance from the start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reached {
    pub vertex: Vertex,
    pub depth: usize,
}

/// Errors raised by graph stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Vertex {id} not found in graph '{graph}'")]
    VertexNotFound { graph: String, id: VertexId },

    #[error("Graph '{0}' is unavailable: lock poisoned")]
    Poisoned(String),

    #[error("Invalid graph document: {0}")]
    InvalidDocument(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read access to a consistent view of one graph
pub trait GraphSnapshot {
    /// Name of the graph this view belongs to
    fn graph_name(&self) -> &str;

    /// Get a vertex by store id
    fn vertex(&self, id: VertexId) -> Result<Option<Vertex>, StoreError>;

    /// All vertices whose property `key` equals `value`, in id order
    fn find_vertices(&self, key: &str, value: &str) -> Result<Vec<Vertex>, StoreError>;

    /// Edges incident to `vertex` in the given direction, optionally filtered by label
    fn edges(&self, vertex: VertexId, direction: Direction, label: Option<&str>) -> Result<Vec<Edge>, StoreError>;

    /// Every vertex in the graph, in id order
    fn all_vertices(&self) -> Result<Vec<Vertex>, StoreError>;

    /// Every edge in the graph, in id order
    fn all_edges(&self) -> Result<Vec<Edge>, StoreError>;

    /// First vertex whose property `key` equals `value`
    fn find_vertex(&self, key: &str, value: &str) -> Result<Option<Vertex>, StoreError> {
        Ok(self.find_vertices(key, value)?.into_iter().next())
    }

    /// Get a vertex that is known to exist
    fn require_vertex(&self, id: VertexId) -> Result<Vertex, StoreError> {
        self.vertex(id)?.ok_or_else(|| StoreError::VertexNotFound {
            graph: self.graph_name().to_string(),
            id,
        })
    }

    /// Check for an edge `from -[label]-> to`
    fn has_edge(&self, from: VertexId, label: &str, to: VertexId) -> Result<bool, StoreError> {
        Ok(self
            .edges(from, Direction::Out, Some(label))?
            .iter()
            .any(|e| e.to == to))
    }

    /// Neighbors of `vertex` across matching edges, paired with the edge used
    fn neighbors(&self, vertex: VertexId, direction: Direction, label: Option<&str>) -> Result<Vec<(Edge, Vertex)>, StoreError> {
        let mut result = Vec::new();
        for edge in self.edges(vertex, direction, label)? {
            let other = self.require_vertex(edge.other(vertex))?;
            result.push((edge, other));
        }
        Ok(result)
    }

    /// Bounded breadth-first expansion from `start`
    ///
    /// Emits the start vertex (depth 0) and every vertex reachable within `max_hops`
    /// hops across edges matching `direction` and `label`. With `simple_path`, a path
    /// never revisits one of its own vertices. Each vertex is reported once, at the
    /// depth it was first reached.
    fn expand(
        &self,
        start: VertexId,
        direction: Direction,
        label: Option<&str>,
        max_hops: usize,
        simple_path: bool,
    ) -> Result<Vec<Reached>, StoreError> {
        let accept = |edge: &Edge| label.map_or(true, |l| edge.label == l);
        self.expand_matching(start, direction, &accept, max_hops, simple_path)
    }

    /// [`expand`](GraphSnapshot::expand) across the edges accepted by `accept`
    fn expand_matching(
        &self,
        start: VertexId,
        direction: Direction,
        accept: &dyn Fn(&Edge) -> bool,
        max_hops: usize,
        simple_path: bool,
    ) -> Result<Vec<Reached>, StoreError> {
        let mut reached = Vec::new();
        let mut emitted = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(vec![start]);

        while let Some(path) = queue.pop_front() {
            let Some(&current) = path.last() else {
                continue;
            };
            let depth = path.len() - 1;

            if emitted.insert(current) {
                reached.push(Reached {
                    vertex: self.require_vertex(current)?,
                    depth,
                });
            }

            if depth >= max_hops {
                continue;
            }

            for edge in self.edges(current, direction, None)? {
                if !accept(&edge) {
                    continue;
                }
                let next = edge.other(current);
                if simple_path && path.contains(&next) {
                    continue;
                }
                // Without the simple-path rule a vertex is only worth expanding once
                if !simple_path && emitted.contains(&next) {
                    continue;
                }
                let mut extended = path.clone();
                extended.push(next);
                queue.push_back(extended);
            }
        }

        Ok(reached)
    }
}

/// Read-write access to one graph
///
/// Changes become visible to other snapshots only on [`commit`](GraphTransaction::commit).
/// Dropping a transaction without committing discards every change made through it.
pub trait GraphTransaction: GraphSnapshot {
    /// Create a vertex
    fn add_vertex(&mut self, label: &str, properties: Properties) -> Result<VertexId, StoreError>;

    /// Set (or overwrite) one vertex property
    fn set_property(&mut self, vertex: VertexId, key: &str, value: &str) -> Result<(), StoreError>;

    /// Create an edge `from -[label]-> to`
    fn add_edge(&mut self, label: &str, from: VertexId, to: VertexId, properties: Properties) -> Result<EdgeId, StoreError>;

    /// Publish all changes atomically
    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard all changes
    fn rollback(self: Box<Self>);
}

/// A named, transactional property graph
pub trait GraphStore: Send + Sync {
    /// Graph name (e.g., "main", "buffer")
    fn name(&self) -> &str;

    /// Acquire a read-only snapshot
    ///
    /// A snapshot never observes a transaction that commits after it was taken.
    fn snapshot(&self) -> Result<Box<dyn GraphSnapshot + '_>, StoreError>;

    /// Begin a read-write transaction
    fn begin(&self) -> Result<Box<dyn GraphTransaction + '_>, StoreError>;
}
