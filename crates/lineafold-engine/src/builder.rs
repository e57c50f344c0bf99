//! Assembly of lineage responses from stored vertices and edges

use std::collections::{BTreeMap, BTreeSet, HashMap};

use lineafold_core::{keys, AttributeWhitelist, EdgeLabel, LineageEdge, LineageResponse, LineageVertex, NodeLabel};
use lineafold_store::{Edge, GraphSnapshot, Vertex, VertexId};

use crate::error::Result;

/// Sentinel id of the vertex condensing several ultimate sources
pub const CONDENSED_SOURCE: &str = "condensedSource";

/// Sentinel id of the vertex condensing several ultimate destinations
pub const CONDENSED_DESTINATION: &str = "condensedDestination";

/// Which side of the queried vertex a frontier lies on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Upstream,
    Downstream,
}

impl Side {
    fn sentinel(self) -> &'static str {
        match self {
            Self::Upstream => CONDENSED_SOURCE,
            Self::Downstream => CONDENSED_DESTINATION,
        }
    }
}

/// Response identity of a stored vertex: `nodeId`, else `guid`, else the store id
fn response_id(vertex: &Vertex) -> String {
    vertex
        .node_id()
        .or_else(|| vertex.guid())
        .map(str::to_string)
        .unwrap_or_else(|| vertex.id.to_string())
}

/// Turn a stored vertex into its response form
pub fn abstract_vertex(vertex: &Vertex, whitelist: &AttributeWhitelist) -> LineageVertex {
    let attributes = vertex
        .properties
        .iter()
        .filter(|(key, _)| whitelist.allows(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect::<BTreeMap<_, _>>();

    LineageVertex {
        id: response_id(vertex),
        node_type: vertex.label.clone(),
        guid: vertex.property(keys::GUID).map(str::to_string),
        display_name: vertex.display_name().map(str::to_string),
        attributes,
    }
}

/// Accumulates a deduplicated response
pub struct ResponseBuilder<'a> {
    whitelist: &'a AttributeWhitelist,
    ids: HashMap<VertexId, String>,
    vertices: BTreeMap<String, LineageVertex>,
    edges: BTreeSet<LineageEdge>,
}

impl<'a> ResponseBuilder<'a> {
    pub fn new(whitelist: &'a AttributeWhitelist) -> Self {
        Self {
            whitelist,
            ids: HashMap::new(),
            vertices: BTreeMap::new(),
            edges: BTreeSet::new(),
        }
    }

    /// Add a stored vertex, returning its response id
    pub fn add_vertex(&mut self, vertex: &Vertex) -> String {
        if let Some(id) = self.ids.get(&vertex.id) {
            return id.clone();
        }
        let abstracted = abstract_vertex(vertex, self.whitelist);
        let id = abstracted.id.clone();
        self.vertices.entry(id.clone()).or_insert(abstracted);
        self.ids.insert(vertex.id, id.clone());
        id
    }

    pub fn add_vertices<'v>(&mut self, vertices: impl IntoIterator<Item = &'v Vertex>) {
        for vertex in vertices {
            self.add_vertex(vertex);
        }
    }

    /// Add a stored edge together with both endpoints
    pub fn add_edge<S: GraphSnapshot + ?Sized>(&mut self, snapshot: &S, edge: &Edge) -> Result<()> {
        let from = self.endpoint(snapshot, edge.from)?;
        let to = self.endpoint(snapshot, edge.to)?;
        self.edges.insert(LineageEdge::new(edge.label.clone(), from, to));
        Ok(())
    }

    pub fn add_edges<'e, S: GraphSnapshot + ?Sized>(
        &mut self,
        snapshot: &S,
        edges: impl IntoIterator<Item = &'e Edge>,
    ) -> Result<()> {
        for edge in edges {
            self.add_edge(snapshot, edge)?;
        }
        Ok(())
    }

    fn endpoint<S: GraphSnapshot + ?Sized>(&mut self, snapshot: &S, id: VertexId) -> Result<String> {
        if let Some(existing) = self.ids.get(&id) {
            return Ok(existing.clone());
        }
        let vertex = snapshot.require_vertex(id)?;
        Ok(self.add_vertex(&vertex))
    }

    /// Replace a multi-vertex frontier with one synthetic vertex
    ///
    /// Upstream: every frontier vertex -> condensed -> queried.
    /// Downstream: queried -> condensed -> every frontier vertex.
    pub fn condense(&mut self, side: Side, queried: &Vertex, frontier: &[Vertex]) {
        let sentinel = side.sentinel();
        let queried_id = self.add_vertex(queried);
        self.vertices.insert(
            sentinel.to_string(),
            LineageVertex::new(sentinel, NodeLabel::Condensed.as_str()).with_display_name(sentinel),
        );

        let label = EdgeLabel::Condensed.as_str();
        match side {
            Side::Upstream => self.edges.insert(LineageEdge::new(label, sentinel, queried_id.clone())),
            Side::Downstream => self.edges.insert(LineageEdge::new(label, queried_id.clone(), sentinel)),
        };

        for vertex in frontier {
            let id = self.add_vertex(vertex);
            match side {
                Side::Upstream => self.edges.insert(LineageEdge::new(label, id, sentinel)),
                Side::Downstream => self.edges.insert(LineageEdge::new(label, sentinel, id)),
            };
        }
    }

    pub fn finish(self) -> LineageResponse {
        LineageResponse::from_parts(self.vertices, self.edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vertex(id: u64, label: &str, props: &[(&str, &str)]) -> Vertex {
        Vertex {
            id: VertexId(id),
            label: label.to_string(),
            properties: props.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn abstraction_filters_attributes() {
        let whitelist = AttributeWhitelist::default();
        let column = vertex(
            0,
            "Column",
            &[
                ("nodeId", "c1"),
                ("guid", "c1"),
                ("vepropdisplayName", "customer_id"),
                ("tableDisplayName", "customers"),
                ("vepropinternalHash", "ab12"),
            ],
        );

        let abstracted = abstract_vertex(&column, &whitelist);
        assert_eq!(abstracted.id, "c1");
        assert_eq!(abstracted.node_type, "Column");
        assert_eq!(abstracted.display_name.as_deref(), Some("customer_id"));
        assert_eq!(
            abstracted.attributes,
            BTreeMap::from([("tableDisplayName".to_string(), "customers".to_string())])
        );

        let bare = abstract_vertex(&column, &AttributeWhitelist::empty());
        assert!(bare.attributes.is_empty());
    }

    #[test]
    fn id_falls_back_to_guid() {
        let buffered = vertex(4, "RelationalColumn", &[("guid", "c7")]);
        assert_eq!(abstract_vertex(&buffered, &AttributeWhitelist::empty()).id, "c7");

        let anonymous = vertex(4, "RelationalColumn", &[]);
        assert_eq!(abstract_vertex(&anonymous, &AttributeWhitelist::empty()).id, "v4");
    }

    #[test]
    fn upstream_condensation() {
        let whitelist = AttributeWhitelist::empty();
        let mut builder = ResponseBuilder::new(&whitelist);
        let queried = vertex(0, "Column", &[("nodeId", "c3")]);
        let frontier = [
            vertex(1, "Column", &[("nodeId", "c1")]),
            vertex(2, "Column", &[("nodeId", "c2")]),
        ];

        builder.condense(Side::Upstream, &queried, &frontier);
        let response = builder.finish();

        assert_eq!(response.vertex_ids(), BTreeSet::from(["c1", "c2", "c3", CONDENSED_SOURCE]));
        assert!(response.contains_edge("Condensed", "c1", CONDENSED_SOURCE));
        assert!(response.contains_edge("Condensed", "c2", CONDENSED_SOURCE));
        assert!(response.contains_edge("Condensed", CONDENSED_SOURCE, "c3"));
        assert_eq!(response.edges.len(), 3);
        assert_eq!(response.vertex(CONDENSED_SOURCE).map(|v| v.node_type.as_str()), Some("Condensed"));
    }

    #[test]
    fn vertices_are_deduplicated() {
        let whitelist = AttributeWhitelist::empty();
        let mut builder = ResponseBuilder::new(&whitelist);
        let column = vertex(0, "Column", &[("nodeId", "c1")]);
        builder.add_vertex(&column);
        builder.add_vertex(&column);
        builder.add_vertices([&column]);

        let response = builder.finish();
        assert_eq!(response.vertices.len(), 1);
        assert!(response.edges.is_empty());
    }
}
