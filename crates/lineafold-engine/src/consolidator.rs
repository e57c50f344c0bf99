//! Consolidation of buffered lineage fragments into the main graph
//!
//! A fragment says "process P transforms data from column A into column B". Folding
//! it into the main graph:
//! 1. resolves both columns in the buffer graph
//! 2. materializes missing column vertices (properties copied, enclosing table and
//!    schema names denormalized, glossary terms attached)
//! 3. links `A -> SubProcess -> B`, unless this exact fragment is already present
//! 4. attaches the sub-process to its top-level Process vertex
//! 5. links both columns to their tables and the tables to the process
//!
//! All main-graph writes of one fragment happen in one transaction. Any error drops
//! the transaction, so a failed fragment leaves no trace.

use std::sync::Arc;

use lineafold_core::{buffer_labels, keys, ConsolidationConfig, EdgeLabel, GraphName, NodeLabel};
use lineafold_store::{
    Direction, Edge, GraphSet, GraphSnapshot, GraphStore, GraphTransaction, Properties, Vertex, VertexId,
};

use crate::error::{LineageError, Result};

const OPERATION: &str = "consolidate";

/// The process a fragment belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRef {
    pub guid: String,
    pub display_name: Option<String>,
}

impl ProcessRef {
    pub fn new(guid: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            guid: guid.into(),
            display_name,
        }
    }

    /// Build from a buffer-graph process vertex; `None` if it has no guid
    pub fn from_vertex(vertex: &Vertex) -> Option<Self> {
        Some(Self {
            guid: vertex.guid()?.to_string(),
            display_name: vertex.display_name().map(str::to_string),
        })
    }
}

/// Result of consolidating one fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Consolidation {
    /// New sub-process created with this node id
    Applied { sub_process: String },

    /// The fragment had been consolidated before; nothing changed
    AlreadyPresent,
}

/// Where a table sits relative to the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableRole {
    Input,
    Output,
}

/// Folds buffer fragments into the main graph
pub struct Consolidator {
    buffer: Arc<dyn GraphStore>,
    main: Arc<dyn GraphStore>,
    config: ConsolidationConfig,
}

impl Consolidator {
    pub fn new(buffer: Arc<dyn GraphStore>, main: Arc<dyn GraphStore>, config: ConsolidationConfig) -> Self {
        Self { buffer, main, config }
    }

    /// Consolidator over the buffer and main graphs of a graph set
    pub fn from_graphs(graphs: &GraphSet, config: ConsolidationConfig) -> Self {
        Self::new(graphs.buffer(), graphs.main(), config)
    }

    /// Consolidate a fragment whose process is looked up in the buffer graph by guid
    pub fn consolidate_by_guid(&self, column_in_guid: &str, column_out_guid: &str, process_guid: &str) -> Result<Consolidation> {
        let process = {
            let buffer = self.buffer.snapshot()?;
            let vertex = find_buffer_vertex(&*buffer, process_guid)?;
            ProcessRef::from_vertex(&vertex).ok_or_else(|| not_found(process_guid))?
        };
        self.consolidate(column_in_guid, column_out_guid, &process)
    }

    /// Consolidate one fragment
    pub fn consolidate(&self, column_in_guid: &str, column_out_guid: &str, process: &ProcessRef) -> Result<Consolidation> {
        let buffer = self.buffer.snapshot()?;
        let buffer_in = find_buffer_vertex(&*buffer, column_in_guid)?;
        let buffer_out = find_buffer_vertex(&*buffer, column_out_guid)?;

        let mut main = self.main.begin()?;

        let column_in = self.ensure_asset(&*buffer, &mut *main, &buffer_in, column_in_guid)?;
        let column_out = self.ensure_asset(&*buffer, &mut *main, &buffer_out, column_out_guid)?;

        if fragment_exists(&*main, column_in, column_out, &process.guid)? {
            // Asset creation above only happens for unseen columns, which cannot be linked yet
            main.rollback();
            tracing::debug!(
                column_in = column_in_guid,
                column_out = column_out_guid,
                process = %process.guid,
                "fragment already consolidated"
            );
            return Ok(Consolidation::AlreadyPresent);
        }

        let sub_process_node_id = uuid::Uuid::new_v4().to_string();
        let mut sub_properties = Properties::new();
        sub_properties.insert(keys::NODE_ID.to_string(), sub_process_node_id.clone());
        sub_properties.insert(keys::GUID.to_string(), process.guid.clone());
        if let Some(name) = &process.display_name {
            sub_properties.insert(keys::DISPLAY_NAME.to_string(), name.clone());
        }
        let sub_process = main.add_vertex(NodeLabel::SubProcess.as_str(), sub_properties)?;

        let column_and_process = EdgeLabel::ColumnAndProcess.as_str();
        main.add_edge(column_and_process, column_in, sub_process, Properties::new())?;
        main.add_edge(column_and_process, sub_process, column_out, Properties::new())?;

        let process_vertex = ensure_process(&mut *main, process)?;
        main.add_edge(
            EdgeLabel::SubprocessToProcess.as_str(),
            sub_process,
            process_vertex,
            Properties::new(),
        )?;

        let table_in = self.ensure_table(&*buffer, &mut *main, &buffer_in, column_in_guid)?;
        let table_out = self.ensure_table(&*buffer, &mut *main, &buffer_out, column_out_guid)?;

        self.link_table(&*buffer, &mut *main, table_in, process_vertex, column_in, TableRole::Input)?;
        self.link_table(&*buffer, &mut *main, table_out, process_vertex, column_out, TableRole::Output)?;

        main.commit()?;

        tracing::info!(
            column_in = column_in_guid,
            column_out = column_out_guid,
            process = %process.guid,
            sub_process = %sub_process_node_id,
            "fragment consolidated"
        );

        Ok(Consolidation::Applied {
            sub_process: sub_process_node_id,
        })
    }

    /// Look up a main-graph asset by node id, materializing it from the buffer if absent
    fn ensure_asset<S, T>(&self, buffer: &S, main: &mut T, buffer_vertex: &Vertex, guid: &str) -> Result<VertexId>
    where
        S: GraphSnapshot + ?Sized,
        T: GraphTransaction + ?Sized,
    {
        if let Some(existing) = main.find_vertex(keys::NODE_ID, guid)? {
            return Ok(existing.id);
        }

        let label = if buffer_labels::is_table_like(&buffer_vertex.label) {
            NodeLabel::Table
        } else {
            NodeLabel::Column
        };

        let mut properties = buffer_vertex.properties.clone();
        properties.insert(keys::NODE_ID.to_string(), guid.to_string());

        let table = nearest_ancestor(
            buffer,
            buffer_vertex.id,
            buffer_labels::is_table_like,
            self.config.table_search_depth,
        )?;
        if let Some(name) = table.as_ref().and_then(Vertex::display_name) {
            properties.insert(keys::TABLE_DISPLAY_NAME.to_string(), name.to_string());
        }

        let schema = nearest_ancestor(
            buffer,
            buffer_vertex.id,
            buffer_labels::is_schema_like,
            self.config.schema_search_depth,
        )?;
        if let Some(name) = schema.as_ref().and_then(Vertex::display_name) {
            properties.insert(keys::SCHEMA_DISPLAY_NAME.to_string(), name.to_string());
        }

        let id = main.add_vertex(label.as_str(), properties)?;
        tracing::debug!(guid, label = %label, "asset materialized in main graph");

        attach_glossary_terms(buffer, main, buffer_vertex, id)?;
        Ok(id)
    }

    /// Resolve the table enclosing a buffer column and make sure it exists in the main graph
    fn ensure_table<S, T>(&self, buffer: &S, main: &mut T, buffer_column: &Vertex, column_guid: &str) -> Result<VertexId>
    where
        S: GraphSnapshot + ?Sized,
        T: GraphTransaction + ?Sized,
    {
        let missing = || LineageError::MissingTable {
            operation: OPERATION,
            guid: column_guid.to_string(),
        };

        let table = nearest_ancestor(
            buffer,
            buffer_column.id,
            buffer_labels::is_table_like,
            self.config.table_search_depth,
        )?
        .ok_or_else(|| {
            tracing::warn!(column = column_guid, "no enclosing table, aborting fragment");
            missing()
        })?;
        let table_guid = table.guid().ok_or_else(missing)?;

        if let Some(existing) = main.find_vertex(keys::NODE_ID, table_guid)? {
            return Ok(existing.id);
        }

        let mut properties = table.properties.clone();
        properties.insert(keys::NODE_ID.to_string(), table_guid.to_string());
        if let Some(schema) = nearest_ancestor(
            buffer,
            table.id,
            buffer_labels::is_schema_like,
            self.config.schema_search_depth,
        )? {
            if let Some(name) = schema.display_name() {
                properties.insert(keys::SCHEMA_DISPLAY_NAME.to_string(), name.to_string());
            }
        }

        let id = main.add_vertex(NodeLabel::Table.as_str(), properties)?;
        tracing::debug!(guid = table_guid, "table materialized in main graph");
        Ok(id)
    }

    /// Ensure table/process and column/table membership edges, then the table's glossary terms
    fn link_table<S, T>(
        &self,
        buffer: &S,
        main: &mut T,
        table: VertexId,
        process: VertexId,
        column: VertexId,
        role: TableRole,
    ) -> Result<()>
    where
        S: GraphSnapshot + ?Sized,
        T: GraphTransaction + ?Sized,
    {
        let table_and_process = EdgeLabel::TableAndProcess.as_str();
        let (from, to) = match role {
            TableRole::Input => (table, process),
            TableRole::Output => (process, table),
        };
        ensure_edge(main, table_and_process, from, to)?;
        ensure_edge(main, EdgeLabel::IncludedIn.as_str(), column, table)?;

        let table_vertex = main.require_vertex(table)?;
        if let Some(guid) = table_vertex.guid() {
            if let Some(buffer_table) = buffer.find_vertex(keys::GUID, guid)? {
                attach_glossary_terms(buffer, main, &buffer_table, table)?;
            }
        }
        Ok(())
    }
}

fn not_found(guid: &str) -> LineageError {
    LineageError::NotFound {
        operation: OPERATION,
        graph: GraphName::Buffer,
        guid: guid.to_string(),
    }
}

fn find_buffer_vertex<S: GraphSnapshot + ?Sized>(buffer: &S, guid: &str) -> Result<Vertex> {
    buffer.find_vertex(keys::GUID, guid)?.ok_or_else(|| not_found(guid))
}

/// Create `from -[label]-> to` unless it already exists
fn ensure_edge<T: GraphTransaction + ?Sized>(main: &mut T, label: &str, from: VertexId, to: VertexId) -> Result<()> {
    if !main.has_edge(from, label, to)? {
        main.add_edge(label, from, to, Properties::new())?;
    }
    Ok(())
}

/// Nearest vertex within `max_hops` whose label matches
///
/// Walks structural relationships in both directions along simple paths. Glossary
/// and lineage relationships are skipped, so a term shared with another table never
/// leads to that table.
fn nearest_ancestor<S: GraphSnapshot + ?Sized>(
    buffer: &S,
    start: VertexId,
    matches: fn(&str) -> bool,
    max_hops: usize,
) -> Result<Option<Vertex>> {
    let structural = |edge: &Edge| buffer_labels::is_structural(&edge.label);
    Ok(buffer
        .expand_matching(start, Direction::Both, &structural, max_hops, true)?
        .into_iter()
        .find(|reached| reached.depth > 0 && matches(&reached.vertex.label))
        .map(|reached| reached.vertex))
}

/// Check whether `column_in -> SubProcess(process_guid) -> column_out` is already linked
fn fragment_exists<S: GraphSnapshot + ?Sized>(main: &S, column_in: VertexId, column_out: VertexId, process_guid: &str) -> Result<bool> {
    let column_and_process = EdgeLabel::ColumnAndProcess.as_str();
    for (_, sub_process) in main.neighbors(column_in, Direction::Out, Some(column_and_process))? {
        if sub_process.has_label(NodeLabel::SubProcess.as_str())
            && sub_process.guid() == Some(process_guid)
            && main.has_edge(sub_process.id, column_and_process, column_out)?
        {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Look up the top-level process by node id, creating it if absent
fn ensure_process<T: GraphTransaction + ?Sized>(main: &mut T, process: &ProcessRef) -> Result<VertexId> {
    let existing = main
        .find_vertices(keys::NODE_ID, &process.guid)?
        .into_iter()
        .find(|v| v.has_label(NodeLabel::Process.as_str()));
    if let Some(existing) = existing {
        return Ok(existing.id);
    }

    let mut properties = Properties::new();
    properties.insert(keys::NODE_ID.to_string(), process.guid.clone());
    properties.insert(keys::GUID.to_string(), process.guid.clone());
    if let Some(name) = &process.display_name {
        properties.insert(keys::DISPLAY_NAME.to_string(), name.clone());
    }
    Ok(main.add_vertex(NodeLabel::Process.as_str(), properties)?)
}

/// Link a main-graph asset to every glossary term assigned to it in the buffer graph
fn attach_glossary_terms<S, T>(buffer: &S, main: &mut T, buffer_asset: &Vertex, asset: VertexId) -> Result<()>
where
    S: GraphSnapshot + ?Sized,
    T: GraphTransaction + ?Sized,
{
    let assignments = buffer.neighbors(buffer_asset.id, Direction::Both, Some(buffer_labels::SEMANTIC_ASSIGNMENT))?;
    for (_, buffer_term) in assignments {
        if buffer_term.guid().is_none() {
            continue;
        }
        let term = ensure_glossary_term(buffer, main, &buffer_term)?;
        ensure_edge(main, EdgeLabel::Semantic.as_str(), asset, term)?;
    }
    Ok(())
}

/// Lookup-or-create a glossary term and mirror its buffer synonyms
fn ensure_glossary_term<S, T>(buffer: &S, main: &mut T, buffer_term: &Vertex) -> Result<VertexId>
where
    S: GraphSnapshot + ?Sized,
    T: GraphTransaction + ?Sized,
{
    let term = term_vertex(main, buffer_term)?;

    let synonym_label = EdgeLabel::GlossaryTermToGlossaryTerm.as_str();
    for (_, buffer_synonym) in buffer.neighbors(buffer_term.id, Direction::Both, Some(buffer_labels::SYNONYM))? {
        if buffer_synonym.guid().is_none() {
            continue;
        }
        let synonym = term_vertex(main, &buffer_synonym)?;
        if !main.has_edge(term, synonym_label, synonym)? && !main.has_edge(synonym, synonym_label, term)? {
            main.add_edge(synonym_label, term, synonym, Properties::new())?;
        }
    }
    Ok(term)
}

fn term_vertex<T: GraphTransaction + ?Sized>(main: &mut T, buffer_term: &Vertex) -> Result<VertexId> {
    let guid = buffer_term.guid().unwrap_or_default();
    if let Some(existing) = main.find_vertex(keys::NODE_ID, guid)? {
        return Ok(existing.id);
    }

    let mut properties = buffer_term.properties.clone();
    properties.insert(keys::NODE_ID.to_string(), guid.to_string());
    Ok(main.add_vertex(NodeLabel::GlossaryTerm.as_str(), properties)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineafold_store::MemoryGraph;

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn process_ref_from_vertex() {
        let vertex = Vertex {
            id: VertexId(3),
            label: "Process".to_string(),
            properties: props(&[("guid", "p1"), ("vepropdisplayName", "nightly load")]),
        };
        let process = ProcessRef::from_vertex(&vertex).unwrap();
        assert_eq!(process, ProcessRef::new("p1", Some("nightly load".to_string())));

        let anonymous = Vertex { properties: Properties::new(), ..vertex };
        assert!(ProcessRef::from_vertex(&anonymous).is_none());
    }

    #[test]
    fn nearest_ancestor_skips_start_and_respects_depth() {
        let graph = MemoryGraph::new("buffer");
        let mut tx = graph.begin().unwrap();
        let table = tx.add_vertex("RelationalTable", props(&[("guid", "t1")])).unwrap();
        let schema_type = tx.add_vertex("TabularSchemaType", Properties::new()).unwrap();
        let column = tx.add_vertex("RelationalColumn", props(&[("guid", "c1")])).unwrap();
        tx.add_edge("SchemaTypeForTable", table, schema_type, Properties::new()).unwrap();
        tx.add_edge("AttributeForSchema", schema_type, column, Properties::new()).unwrap();

        let found = nearest_ancestor(&*tx, column, buffer_labels::is_table_like, 2).unwrap();
        assert_eq!(found.map(|v| v.id), Some(table));
        assert!(nearest_ancestor(&*tx, column, buffer_labels::is_table_like, 1).unwrap().is_none());
        assert!(nearest_ancestor(&*tx, table, buffer_labels::is_table_like, 3).unwrap().is_none());
    }

    #[test]
    fn nearest_ancestor_ignores_glossary_links() {
        // c1 sits two structural hops from t1, but a shared term puts t9 at distance two as well
        let graph = MemoryGraph::new("buffer");
        let mut tx = graph.begin().unwrap();
        let column = tx.add_vertex("RelationalColumn", props(&[("guid", "c1")])).unwrap();
        let term = tx.add_vertex("GlossaryTerm", props(&[("guid", "g1")])).unwrap();
        let other = tx.add_vertex("RelationalTable", props(&[("guid", "t9")])).unwrap();
        let table = tx.add_vertex("RelationalTable", props(&[("guid", "t1")])).unwrap();
        let schema_type = tx.add_vertex("TabularSchemaType", Properties::new()).unwrap();
        tx.add_edge("SemanticAssignment", column, term, Properties::new()).unwrap();
        tx.add_edge("SemanticAssignment", other, term, Properties::new()).unwrap();
        tx.add_edge("SchemaTypeForTable", table, schema_type, Properties::new()).unwrap();
        tx.add_edge("AttributeForSchema", schema_type, column, Properties::new()).unwrap();

        let found = nearest_ancestor(&*tx, column, buffer_labels::is_table_like, 2).unwrap();
        assert_eq!(found.map(|v| v.id), Some(table));
        assert!(nearest_ancestor(&*tx, column, buffer_labels::is_table_like, 1).unwrap().is_none());
    }

    #[test]
    fn ensure_process_is_unique_per_guid() {
        let graph = MemoryGraph::new("main");
        let mut tx = graph.begin().unwrap();
        let process = ProcessRef::new("p1", None);
        let first = ensure_process(&mut *tx, &process).unwrap();
        let second = ensure_process(&mut *tx, &process).unwrap();
        assert_eq!(first, second);
        assert_eq!(tx.find_vertices("nodeId", "p1").unwrap().len(), 1);
    }
}
