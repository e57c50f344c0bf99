//! Lineage queries over a read-only snapshot of one named graph

use lineafold_core::{keys, AttributeWhitelist, EdgeLabel, GraphName, LineageResponse, Scope, View};
use lineafold_store::{Direction, GraphSet, GraphSnapshot, Vertex};

use crate::builder::{ResponseBuilder, Side};
use crate::error::{LineageError, Result};
use crate::traversal::reachable;

/// Answers lineage requests
pub struct LineageQuery {
    graphs: GraphSet,
    whitelist: AttributeWhitelist,
}

impl LineageQuery {
    pub fn new(graphs: GraphSet, whitelist: AttributeWhitelist) -> Self {
        Self { graphs, whitelist }
    }

    pub fn whitelist(&self) -> &AttributeWhitelist {
        &self.whitelist
    }

    /// Parse request parameters, then run the query
    ///
    /// Unknown graph names, scopes or views are rejected before any graph is read.
    pub fn query_raw(&self, graph: &str, scope: &str, view: &str, guid: &str) -> Result<LineageResponse> {
        let graph: GraphName = graph.parse()?;
        let scope: Scope = scope.parse()?;
        let view: View = view.parse()?;
        self.query(graph, scope, view, guid)
    }

    /// Run a lineage query for the vertex identified by `guid`
    pub fn query(&self, graph: GraphName, scope: Scope, view: View, guid: &str) -> Result<LineageResponse> {
        let store = self.graphs.get(graph);
        let snapshot = store.snapshot()?;
        let operation = scope.as_str();

        let queried = find_node(&*snapshot, guid)?.ok_or_else(|| LineageError::NodeNotFound {
            operation,
            graph,
            guid: guid.to_string(),
        })?;

        tracing::debug!(%graph, %scope, %view, guid, "running lineage query");

        let label = view.edge_label();
        let mut builder = ResponseBuilder::new(&self.whitelist);
        builder.add_vertex(&queried);

        match scope {
            Scope::UltimateSource => {
                directional(&mut builder, &*snapshot, &queried, Side::Upstream, label, operation, guid)?;
            }
            Scope::UltimateDestination => {
                directional(&mut builder, &*snapshot, &queried, Side::Downstream, label, operation, guid)?;
            }
            Scope::SourceAndDestination => {
                directional(&mut builder, &*snapshot, &queried, Side::Upstream, label, operation, guid)?;
                directional(&mut builder, &*snapshot, &queried, Side::Downstream, label, operation, guid)?;
            }
            Scope::EndToEnd => end_to_end(&mut builder, &*snapshot, &queried, label)?,
            Scope::Glossary => glossary(&mut builder, &*snapshot, &queried)?,
        }

        let response = builder.finish();
        tracing::debug!(
            scope = operation,
            guid,
            vertices = response.vertices.len(),
            edges = response.edges.len(),
            "lineage query answered"
        );
        Ok(response)
    }
}

/// Look up the queried vertex by `nodeId`, falling back to `guid`
fn find_node<S: GraphSnapshot + ?Sized>(snapshot: &S, guid: &str) -> Result<Option<Vertex>> {
    if let Some(vertex) = snapshot.find_vertex(keys::NODE_ID, guid)? {
        return Ok(Some(vertex));
    }
    Ok(snapshot.find_vertex(keys::GUID, guid)?)
}

/// Ultimate sources (upstream) or ultimate destinations (downstream) of `queried`
fn directional<S: GraphSnapshot + ?Sized>(
    builder: &mut ResponseBuilder<'_>,
    snapshot: &S,
    queried: &Vertex,
    side: Side,
    label: EdgeLabel,
    operation: &'static str,
    guid: &str,
) -> Result<()> {
    let direction = match side {
        Side::Upstream => Direction::In,
        Side::Downstream => Direction::Out,
    };
    let reached = reachable(snapshot, queried, direction, label.as_str())?;

    if reached.terminals.is_empty() {
        tracing::warn!(scope = operation, guid, "no terminal vertex, lineage is cyclic");
        return Err(LineageError::LineageCycle {
            operation,
            guid: guid.to_string(),
        });
    }

    if reached.is_trivial(queried.id) {
        return Ok(());
    }

    if reached.terminals.len() == 1 {
        builder.add_vertices(&reached.vertices);
        builder.add_edges(snapshot, &reached.edges)?;
    } else {
        builder.condense(side, queried, &reached.terminals);
    }
    Ok(())
}

/// Everything upstream and downstream of `queried`, uncondensed
fn end_to_end<S: GraphSnapshot + ?Sized>(
    builder: &mut ResponseBuilder<'_>,
    snapshot: &S,
    queried: &Vertex,
    label: EdgeLabel,
) -> Result<()> {
    for direction in [Direction::In, Direction::Out] {
        let reached = reachable(snapshot, queried, direction, label.as_str())?;
        builder.add_vertices(&reached.vertices);
        builder.add_edges(snapshot, &reached.edges)?;
    }
    Ok(())
}

/// Synonym closure of a glossary term plus the assets assigned to any term in it
fn glossary<S: GraphSnapshot + ?Sized>(builder: &mut ResponseBuilder<'_>, snapshot: &S, queried: &Vertex) -> Result<()> {
    let synonyms = reachable(
        snapshot,
        queried,
        Direction::Both,
        EdgeLabel::GlossaryTermToGlossaryTerm.as_str(),
    )?;
    builder.add_vertices(&synonyms.vertices);
    builder.add_edges(snapshot, &synonyms.edges)?;

    for term in &synonyms.vertices {
        for (edge, asset) in snapshot.neighbors(term.id, Direction::In, Some(EdgeLabel::Semantic.as_str()))? {
            builder.add_vertex(&asset);
            builder.add_edge(snapshot, &edge)?;
        }
    }
    Ok(())
}
