//! Repeated directional expansion over one edge label
//!
//! Lineage frontiers are the vertices where a repeated expansion stops: the vertex has
//! no further edge in the expansion direction. A simple path ends either at such a
//! vertex or by closing a cycle, so the terminals of every simple path from the start
//! are exactly the reachable vertices without further edges. Computing them over the
//! reachable set keeps traversals linear in the size of the subgraph.

use std::collections::{HashSet, VecDeque};

use lineafold_store::{Direction, Edge, GraphSnapshot, Vertex, VertexId};

use crate::error::Result;

/// Everything reached by repeatedly expanding from one vertex
#[derive(Debug, Clone, Default)]
pub struct Reachable {
    /// Reached vertices in discovery order, the start first
    pub vertices: Vec<Vertex>,

    /// Edges traversed, each once
    pub edges: Vec<Edge>,

    /// Reached vertices with no edge to expand, in discovery order
    pub terminals: Vec<Vertex>,
}

impl Reachable {
    /// Check if the start vertex is its own only terminal
    pub fn is_trivial(&self, start: VertexId) -> bool {
        self.terminals.len() == 1 && self.terminals[0].id == start
    }
}

/// Expand from `start` across `label` edges in `direction` until nothing new is reached
pub fn reachable<S: GraphSnapshot + ?Sized>(
    snapshot: &S,
    start: &Vertex,
    direction: Direction,
    label: &str,
) -> Result<Reachable> {
    let mut result = Reachable::default();
    let mut seen_vertices = HashSet::from([start.id]);
    let mut seen_edges = HashSet::new();
    let mut queue = VecDeque::from([start.clone()]);

    while let Some(current) = queue.pop_front() {
        let edges = snapshot.edges(current.id, direction, Some(label))?;
        if edges.is_empty() {
            result.terminals.push(current.clone());
        }

        for edge in edges {
            let next = edge.other(current.id);
            if seen_edges.insert(edge.id) {
                result.edges.push(edge);
            }
            if seen_vertices.insert(next) {
                queue.push_back(snapshot.require_vertex(next)?);
            }
        }
        result.vertices.push(current);
    }

    tracing::debug!(
        start = %start.id,
        ?direction,
        label,
        vertices = result.vertices.len(),
        terminals = result.terminals.len(),
        "expansion finished"
    );
    Ok(result)
}

/// Terminal vertices of the repeated expansion from `start`
pub fn frontier<S: GraphSnapshot + ?Sized>(
    snapshot: &S,
    start: &Vertex,
    direction: Direction,
    label: &str,
) -> Result<Vec<Vertex>> {
    Ok(reachable(snapshot, start, direction, label)?.terminals)
}
