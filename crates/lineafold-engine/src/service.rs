//! Service facade bundling ingestion, consolidation, queries and export

use std::path::{Path, PathBuf};

use lineafold_core::{Config, ConsolidationConfig, GraphName, LineageResponse, Scope, View};
use lineafold_store::{dump_graph, export_graph, GraphSet};

use crate::buffer::{BufferWriter, InstanceEvent, LineageFragment};
use crate::consolidator::{Consolidation, Consolidator, ProcessRef};
use crate::error::{LineageError, Result};
use crate::mock::MockLineage;
use crate::query::LineageQuery;

/// A fragment that could not be consolidated
#[derive(Debug)]
pub struct FragmentFailure {
    pub fragment: LineageFragment,
    pub error: LineageError,
}

/// An event the buffer graph did not accept
#[derive(Debug)]
pub struct EventFailure {
    /// Position of the event in the ingested batch
    pub index: usize,
    pub event_type: &'static str,
    pub error: LineageError,
}

/// Outcome of ingesting one or more events
#[derive(Debug, Default)]
pub struct IngestSummary {
    /// Events written to the buffer graph
    pub events: usize,

    /// Lineage fragments carried by those events
    pub fragments: usize,

    /// Fragments that changed the main graph
    pub applied: usize,

    /// Fragments that were consolidated before
    pub already_present: usize,

    /// Fragments left out of the main graph
    pub failed: Vec<FragmentFailure>,

    /// Events rejected by the buffer graph
    pub rejected: Vec<EventFailure>,
}

impl IngestSummary {
    /// True when every event was buffered and every fragment consolidated
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.rejected.is_empty()
    }

    pub(crate) fn record(&mut self, fragment: &LineageFragment, outcome: Result<Consolidation>) {
        match outcome {
            Ok(Consolidation::Applied { .. }) => self.applied += 1,
            Ok(Consolidation::AlreadyPresent) => self.already_present += 1,
            Err(error) => {
                tracing::warn!(
                    column_in = %fragment.column_in,
                    column_out = %fragment.column_out,
                    process = %fragment.process.guid,
                    error = %error,
                    "fragment not consolidated"
                );
                self.failed.push(FragmentFailure {
                    fragment: fragment.clone(),
                    error,
                });
            }
        }
    }

    pub(crate) fn reject(&mut self, index: usize, event: &InstanceEvent, error: LineageError) {
        tracing::warn!(index, event_type = event.event_type(), error = %error, "event rejected");
        self.rejected.push(EventFailure {
            index,
            event_type: event.event_type(),
            error,
        });
    }

    fn merge(&mut self, other: IngestSummary) {
        self.events += other.events;
        self.fragments += other.fragments;
        self.applied += other.applied;
        self.already_present += other.already_present;
        self.failed.extend(other.failed);
        self.rejected.extend(other.rejected);
    }
}

/// Lineage graph service
pub struct LineageService {
    graphs: GraphSet,
    writer: BufferWriter,
    consolidator: Consolidator,
    consolidation: ConsolidationConfig,
    query: LineageQuery,
}

impl LineageService {
    pub fn new(graphs: GraphSet, config: &Config) -> Self {
        Self {
            writer: BufferWriter::new(graphs.buffer()),
            consolidator: Consolidator::from_graphs(&graphs, config.consolidation),
            consolidation: config.consolidation,
            query: LineageQuery::new(graphs.clone(), config.whitelist.clone()),
            graphs,
        }
    }

    /// Service over empty in-memory graphs with default settings
    pub fn in_memory() -> Self {
        Self::new(GraphSet::in_memory(), &Config::default())
    }

    pub fn graphs(&self) -> &GraphSet {
        &self.graphs
    }

    /// Write one event to the buffer graph and consolidate the fragments it carries
    ///
    /// Fails only when the buffer graph rejects the event. A fragment that cannot be
    /// consolidated is recorded in [`IngestSummary::failed`] and the remaining
    /// fragments are still attempted.
    pub fn ingest(&self, event: &InstanceEvent) -> Result<IngestSummary> {
        let fragments = self.writer.apply(event)?;
        let mut summary = IngestSummary {
            events: 1,
            fragments: fragments.len(),
            ..IngestSummary::default()
        };

        for fragment in &fragments {
            let outcome = self
                .consolidator
                .consolidate(&fragment.column_in, &fragment.column_out, &fragment.process);
            summary.record(fragment, outcome);
        }
        Ok(summary)
    }

    /// Ingest events in order; rejected events are recorded and skipped
    pub fn ingest_all<'a>(&self, events: impl IntoIterator<Item = &'a InstanceEvent>) -> IngestSummary {
        let mut summary = IngestSummary::default();
        for (index, event) in events.into_iter().enumerate() {
            match self.ingest(event) {
                Ok(outcome) => summary.merge(outcome),
                Err(error) => summary.reject(index, event, error),
            }
        }
        tracing::info!(
            events = summary.events,
            applied = summary.applied,
            already_present = summary.already_present,
            failed = summary.failed.len(),
            rejected = summary.rejected.len(),
            "ingestion finished"
        );
        summary
    }

    /// Fill the mock graph with a synthetic table chain
    pub fn populate_mock(&self, lineage: MockLineage) -> IngestSummary {
        lineage.populate(self.graphs.get(GraphName::Mock), self.consolidation)
    }

    /// Consolidate one buffered fragment
    pub fn consolidate(&self, column_in: &str, column_out: &str, process: &ProcessRef) -> Result<Consolidation> {
        self.consolidator.consolidate(column_in, column_out, process)
    }

    /// Consolidate one buffered fragment, resolving the process in the buffer graph
    pub fn consolidate_by_guid(&self, column_in: &str, column_out: &str, process_guid: &str) -> Result<Consolidation> {
        self.consolidator.consolidate_by_guid(column_in, column_out, process_guid)
    }

    pub fn query(&self, graph: GraphName, scope: Scope, view: View, guid: &str) -> Result<LineageResponse> {
        self.query.query(graph, scope, view, guid)
    }

    pub fn query_raw(&self, graph: &str, scope: &str, view: &str, guid: &str) -> Result<LineageResponse> {
        self.query.query_raw(graph, scope, view, guid)
    }

    /// Write a graph to `<dir>/<graph>.json`
    pub fn dump_graph(&self, graph: GraphName, dir: &Path) -> Result<PathBuf> {
        Ok(dump_graph(self.graphs.get(graph).as_ref(), dir)?)
    }

    /// Serialize a graph to a GraphSON-like JSON string
    pub fn export_graph(&self, graph: GraphName) -> Result<String> {
        Ok(export_graph(self.graphs.get(graph).as_ref())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{EntityDetail, RelationshipDetail};

    #[test]
    fn summary_counts_events_without_fragments() {
        let service = LineageService::in_memory();
        let summary = service
            .ingest(&InstanceEvent::NewEntity {
                entity: EntityDetail::new("t1", "RelationalTable"),
            })
            .unwrap();
        assert_eq!(summary.events, 1);
        assert_eq!(summary.fragments, 0);
        assert!(summary.is_clean());
    }

    #[test]
    fn rejected_event_does_not_stop_the_batch() {
        let service = LineageService::in_memory();
        let events = [
            InstanceEvent::NewRelationship {
                relationship: RelationshipDetail::new("r1", "AttachedSchema", "ghost", "t1"),
            },
            InstanceEvent::NewEntity {
                entity: EntityDetail::new("t1", "RelationalTable"),
            },
        ];

        let summary = service.ingest_all(&events);
        assert_eq!(summary.events, 1);
        assert_eq!(summary.rejected.len(), 1);
        assert_eq!(summary.rejected[0].index, 0);
        assert_eq!(summary.rejected[0].event_type, "NewRelationship");
        assert!(!summary.is_clean());
    }

    #[test]
    fn mock_graph_is_queryable() {
        let service = LineageService::in_memory();
        let summary = service.populate_mock(MockLineage::new(4, 1));
        assert_eq!(summary.applied, 3);

        let last = MockLineage::column_guid(3, 0);
        let response = service
            .query(GraphName::Mock, Scope::UltimateSource, View::ColumnView, &last)
            .unwrap();
        assert!(response.contains_vertex(&MockLineage::column_guid(0, 0)));
        assert!(service.graphs().main().snapshot().unwrap().all_vertices().unwrap().is_empty());
    }

    #[test]
    fn export_of_empty_graph() {
        let service = LineageService::in_memory();
        let json = service.export_graph(GraphName::History).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["graph"], "history");
        assert!(value["vertices"].as_array().unwrap().is_empty());
    }
}
