//! In-memory transactional graph store
//!
//! Committed state is a [`GraphData`] behind an `Arc`. Snapshots clone the `Arc`, so
//! readers never block and never see half-applied work. Writers are serialized by a
//! writer lock and record their changes in an overlay on top of the committed state.
//! Commit folds the overlay into the committed state in place; the state is copied
//! only while an older snapshot still shares it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::store::{
    Direction, Edge, EdgeId, GraphSnapshot, GraphStore, GraphTransaction, Properties, StoreError, Vertex, VertexId,
};

/// Graph contents plus adjacency, edge and property indexes
#[derive(Debug, Clone, Default)]
pub(crate) struct GraphData {
    next_vertex: u64,
    next_edge: u64,
    vertices: BTreeMap<VertexId, Vertex>,
    edges: BTreeMap<EdgeId, Edge>,
    out_edges: HashMap<VertexId, Vec<EdgeId>>,
    in_edges: HashMap<VertexId, Vec<EdgeId>>,
    /// (from, to) -> labels of the edges between them
    links: HashMap<(VertexId, VertexId), BTreeSet<String>>,
    /// key -> value -> vertices holding that pair
    index: HashMap<String, HashMap<String, BTreeSet<VertexId>>>,
}

impl GraphData {
    /// Empty overlay whose fresh ids continue after `base`
    fn overlay_of(base: &GraphData) -> Self {
        Self {
            next_vertex: base.next_vertex,
            next_edge: base.next_edge,
            ..Self::default()
        }
    }

    fn contains_vertex(&self, id: VertexId) -> bool {
        self.vertices.contains_key(&id)
    }

    fn vertex(&self, id: VertexId) -> Option<Vertex> {
        self.vertices.get(&id).cloned()
    }

    fn vertex_ids(&self, key: &str, value: &str) -> Option<&BTreeSet<VertexId>> {
        self.index.get(key).and_then(|values| values.get(value))
    }

    fn find_vertices(&self, key: &str, value: &str) -> Vec<Vertex> {
        self.vertex_ids(key, value)
            .map(|ids| ids.iter().filter_map(|id| self.vertices.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    fn edges(&self, vertex: VertexId, direction: Direction, label: Option<&str>) -> Vec<Edge> {
        let outgoing = matches!(direction, Direction::Out | Direction::Both)
            .then(|| self.out_edges.get(&vertex))
            .flatten();
        let incoming = matches!(direction, Direction::In | Direction::Both)
            .then(|| self.in_edges.get(&vertex))
            .flatten();

        outgoing
            .into_iter()
            .chain(incoming)
            .flatten()
            .filter_map(|id| self.edges.get(id))
            .filter(|edge| label.map_or(true, |l| edge.label == l))
            .cloned()
            .collect()
    }

    fn has_link(&self, from: VertexId, label: &str, to: VertexId) -> bool {
        self.links
            .get(&(from, to))
            .map_or(false, |labels| labels.contains(label))
    }

    fn index_property(&mut self, vertex: VertexId, key: &str, value: &str) {
        self.index
            .entry(key.to_string())
            .or_default()
            .entry(value.to_string())
            .or_default()
            .insert(vertex);
    }

    fn unindex_property(&mut self, vertex: VertexId, key: &str, value: &str) {
        if let Some(values) = self.index.get_mut(key) {
            if let Some(ids) = values.get_mut(value) {
                ids.remove(&vertex);
                if ids.is_empty() {
                    values.remove(value);
                }
            }
        }
    }

    /// Insert or replace a vertex with a caller-chosen id
    pub(crate) fn insert_vertex(&mut self, vertex: Vertex) {
        if let Some(previous) = self.vertices.remove(&vertex.id) {
            for (key, value) in &previous.properties {
                self.unindex_property(previous.id, key, value);
            }
        }
        for (key, value) in &vertex.properties {
            self.index_property(vertex.id, key, value);
        }
        self.next_vertex = self.next_vertex.max(vertex.id.0 + 1);
        self.vertices.insert(vertex.id, vertex);
    }

    /// Returns false when the vertex does not exist
    fn set_property(&mut self, vertex: VertexId, key: &str, value: &str) -> bool {
        let Some(target) = self.vertices.get_mut(&vertex) else {
            return false;
        };
        if let Some(previous) = target.properties.insert(key.to_string(), value.to_string()) {
            self.unindex_property(vertex, key, &previous);
        }
        self.index_property(vertex, key, value);
        true
    }

    /// Insert an edge with a caller-chosen id; both endpoints must exist
    pub(crate) fn insert_edge(&mut self, edge: Edge) -> Result<(), VertexId> {
        for endpoint in [edge.from, edge.to] {
            if !self.contains_vertex(endpoint) {
                return Err(endpoint);
            }
        }
        self.attach_edge(edge);
        Ok(())
    }

    fn attach_edge(&mut self, edge: Edge) {
        self.out_edges.entry(edge.from).or_default().push(edge.id);
        self.in_edges.entry(edge.to).or_default().push(edge.id);
        self.links
            .entry((edge.from, edge.to))
            .or_default()
            .insert(edge.label.clone());
        self.next_edge = self.next_edge.max(edge.id.0 + 1);
        self.edges.insert(edge.id, edge);
    }

    /// Fold a transaction overlay into this state
    fn absorb(&mut self, overlay: GraphData) {
        for vertex in overlay.vertices.into_values() {
            self.insert_vertex(vertex);
        }
        for edge in overlay.edges.into_values() {
            self.attach_edge(edge);
        }
        self.next_vertex = self.next_vertex.max(overlay.next_vertex);
        self.next_edge = self.next_edge.max(overlay.next_edge);
    }
}

/// In-memory implementation of [`GraphStore`]
pub struct MemoryGraph {
    name: String,
    state: RwLock<Arc<GraphData>>,
    writer: Mutex<()>,
}

impl MemoryGraph {
    /// Create an empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_data(name, GraphData::default())
    }

    pub(crate) fn with_data(name: impl Into<String>, data: GraphData) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(Arc::new(data)),
            writer: Mutex::new(()),
        }
    }

    fn committed(&self) -> Result<Arc<GraphData>, StoreError> {
        self.state
            .read()
            .map(|state| Arc::clone(&state))
            .map_err(|_| StoreError::Poisoned(self.name.clone()))
    }

    /// Number of committed vertices
    pub fn vertex_count(&self) -> Result<usize, StoreError> {
        Ok(self.committed()?.vertices.len())
    }

    /// Number of committed edges
    pub fn edge_count(&self) -> Result<usize, StoreError> {
        Ok(self.committed()?.edges.len())
    }
}

impl std::fmt::Debug for MemoryGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGraph").field("name", &self.name).finish_non_exhaustive()
    }
}

impl GraphStore for MemoryGraph {
    fn name(&self) -> &str {
        &self.name
    }

    fn snapshot(&self) -> Result<Box<dyn GraphSnapshot + '_>, StoreError> {
        Ok(Box::new(MemorySnapshot {
            name: &self.name,
            data: self.committed()?,
        }))
    }

    fn begin(&self) -> Result<Box<dyn GraphTransaction + '_>, StoreError> {
        let guard = self
            .writer
            .lock()
            .map_err(|_| StoreError::Poisoned(self.name.clone()))?;
        let base = self.committed()?;
        let overlay = GraphData::overlay_of(&base);

        tracing::trace!(graph = %self.name, "transaction started");

        Ok(Box::new(MemoryTransaction {
            graph: self,
            _writer: guard,
            base,
            overlay,
            finished: false,
        }))
    }
}

/// Immutable view of committed state
struct MemorySnapshot<'a> {
    name: &'a str,
    data: Arc<GraphData>,
}

impl GraphSnapshot for MemorySnapshot<'_> {
    fn graph_name(&self) -> &str {
        self.name
    }

    fn vertex(&self, id: VertexId) -> Result<Option<Vertex>, StoreError> {
        Ok(self.data.vertex(id))
    }

    fn find_vertices(&self, key: &str, value: &str) -> Result<Vec<Vertex>, StoreError> {
        Ok(self.data.find_vertices(key, value))
    }

    fn edges(&self, vertex: VertexId, direction: Direction, label: Option<&str>) -> Result<Vec<Edge>, StoreError> {
        Ok(self.data.edges(vertex, direction, label))
    }

    fn all_vertices(&self) -> Result<Vec<Vertex>, StoreError> {
        Ok(self.data.vertices.values().cloned().collect())
    }

    fn all_edges(&self) -> Result<Vec<Edge>, StoreError> {
        Ok(self.data.edges.values().cloned().collect())
    }

    fn has_edge(&self, from: VertexId, label: &str, to: VertexId) -> Result<bool, StoreError> {
        Ok(self.data.has_link(from, label, to))
    }
}

/// Pending changes held while the writer lock is taken
///
/// `overlay` holds new vertices and edges plus copies of committed vertices whose
/// properties changed. Reads consult the overlay first, then `base`.
struct MemoryTransaction<'a> {
    graph: &'a MemoryGraph,
    _writer: MutexGuard<'a, ()>,
    base: Arc<GraphData>,
    overlay: GraphData,
    finished: bool,
}

impl MemoryTransaction<'_> {
    fn missing(&self, id: VertexId) -> StoreError {
        StoreError::VertexNotFound {
            graph: self.graph.name.clone(),
            id,
        }
    }

    fn contains_vertex(&self, id: VertexId) -> bool {
        self.overlay.contains_vertex(id) || self.base.contains_vertex(id)
    }
}

impl GraphSnapshot for MemoryTransaction<'_> {
    fn graph_name(&self) -> &str {
        &self.graph.name
    }

    fn vertex(&self, id: VertexId) -> Result<Option<Vertex>, StoreError> {
        Ok(self.overlay.vertex(id).or_else(|| self.base.vertex(id)))
    }

    fn find_vertices(&self, key: &str, value: &str) -> Result<Vec<Vertex>, StoreError> {
        let mut found = BTreeMap::new();
        if let Some(ids) = self.base.vertex_ids(key, value) {
            for id in ids.iter().filter(|id| !self.overlay.contains_vertex(**id)) {
                if let Some(vertex) = self.base.vertex(*id) {
                    found.insert(*id, vertex);
                }
            }
        }
        for vertex in self.overlay.find_vertices(key, value) {
            found.insert(vertex.id, vertex);
        }
        Ok(found.into_values().collect())
    }

    fn edges(&self, vertex: VertexId, direction: Direction, label: Option<&str>) -> Result<Vec<Edge>, StoreError> {
        let mut edges = self.base.edges(vertex, direction, label);
        edges.extend(self.overlay.edges(vertex, direction, label));
        Ok(edges)
    }

    fn all_vertices(&self) -> Result<Vec<Vertex>, StoreError> {
        let mut vertices = self.base.vertices.clone();
        vertices.extend(self.overlay.vertices.iter().map(|(id, v)| (*id, v.clone())));
        Ok(vertices.into_values().collect())
    }

    fn all_edges(&self) -> Result<Vec<Edge>, StoreError> {
        Ok(self
            .base
            .edges
            .values()
            .chain(self.overlay.edges.values())
            .cloned()
            .collect())
    }

    fn has_edge(&self, from: VertexId, label: &str, to: VertexId) -> Result<bool, StoreError> {
        Ok(self.base.has_link(from, label, to) || self.overlay.has_link(from, label, to))
    }
}

impl GraphTransaction for MemoryTransaction<'_> {
    fn add_vertex(&mut self, label: &str, properties: Properties) -> Result<VertexId, StoreError> {
        let id = VertexId(self.overlay.next_vertex);
        self.overlay.insert_vertex(Vertex {
            id,
            label: label.to_string(),
            properties,
        });
        Ok(id)
    }

    fn set_property(&mut self, vertex: VertexId, key: &str, value: &str) -> Result<(), StoreError> {
        if !self.overlay.contains_vertex(vertex) {
            let committed = self.base.vertex(vertex).ok_or_else(|| self.missing(vertex))?;
            self.overlay.insert_vertex(committed);
        }
        self.overlay.set_property(vertex, key, value);
        Ok(())
    }

    fn add_edge(&mut self, label: &str, from: VertexId, to: VertexId, properties: Properties) -> Result<EdgeId, StoreError> {
        for endpoint in [from, to] {
            if !self.contains_vertex(endpoint) {
                return Err(self.missing(endpoint));
            }
        }
        let id = EdgeId(self.overlay.next_edge);
        self.overlay.attach_edge(Edge {
            id,
            label: label.to_string(),
            from,
            to,
            properties,
        });
        Ok(id)
    }

    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        let overlay = std::mem::take(&mut self.overlay);
        let changed = overlay.vertices.len() + overlay.edges.len();
        // An unshared committed state is updated without a copy
        drop(std::mem::take(&mut self.base));

        let mut state = self
            .graph
            .state
            .write()
            .map_err(|_| StoreError::Poisoned(self.graph.name.clone()))?;
        Arc::make_mut(&mut *state).absorb(overlay);
        self.finished = true;

        tracing::trace!(graph = %self.graph.name, changed, "transaction committed");
        Ok(())
    }

    fn rollback(mut self: Box<Self>) {
        self.finished = true;
        tracing::debug!(graph = %self.graph.name, "transaction rolled back");
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(graph = %self.graph.name, "uncommitted transaction discarded");
        }
    }
}
