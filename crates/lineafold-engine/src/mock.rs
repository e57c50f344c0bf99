//! Synthetic lineage for the mock graph
//!
//! Generates a chain of tables in one schema, each with the same number of columns,
//! where every column feeds the same-position column of the next table through one
//! process per table pair. The events go through a scratch buffer graph and are
//! consolidated into the target graph exactly like connector events.

use std::sync::Arc;

use lineafold_core::ConsolidationConfig;
use lineafold_store::{GraphStore, MemoryGraph};

use crate::buffer::{BufferWriter, ColumnMapping, EntityDetail, InstanceEvent, RelationshipDetail};
use crate::consolidator::Consolidator;
use crate::service::IngestSummary;

/// Shape of a synthetic table chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockLineage {
    pub tables: usize,
    pub columns_per_table: usize,
}

impl MockLineage {
    pub fn new(tables: usize, columns_per_table: usize) -> Self {
        Self {
            tables,
            columns_per_table,
        }
    }

    /// Guid of a generated table
    pub fn table_guid(table: usize) -> String {
        format!("mock-t{}", table)
    }

    /// Guid of a generated column
    pub fn column_guid(table: usize, column: usize) -> String {
        format!("mock-c{}_{}", table, column)
    }

    /// Instance events describing the chain, in dependency order
    pub fn events(&self) -> Vec<InstanceEvent> {
        let schema = "mock-s0";
        let mut events = vec![InstanceEvent::NewEntity {
            entity: EntityDetail::new(schema, "RelationalDBSchemaType").with_property("displayName", "mock_schema"),
        }];

        for table in 0..self.tables {
            let table_guid = Self::table_guid(table);
            events.push(InstanceEvent::NewEntity {
                entity: EntityDetail::new(&table_guid, "RelationalTable")
                    .with_property("displayName", format!("mock_table_{}", table)),
            });
            events.push(InstanceEvent::NewRelationship {
                relationship: RelationshipDetail::new(format!("mock-r{}", table), "AttachedSchema", schema, &table_guid),
            });

            for column in 0..self.columns_per_table {
                let guid = Self::column_guid(table, column);
                events.push(InstanceEvent::NewEntity {
                    entity: EntityDetail::new(&guid, "RelationalColumn")
                        .with_property("displayName", format!("mock_column_{}", column)),
                });
                events.push(InstanceEvent::NewRelationship {
                    relationship: RelationshipDetail::new(
                        format!("mock-r{}", guid),
                        "NestedSchemaAttribute",
                        &table_guid,
                        &guid,
                    ),
                });
            }

            if table > 0 {
                events.push(InstanceEvent::ProcessContext {
                    process: EntityDetail::new(format!("mock-p{}", table), "Process")
                        .with_property("displayName", format!("mock_process_{}", table)),
                    mappings: (0..self.columns_per_table)
                        .map(|column| ColumnMapping {
                            input_column: Self::column_guid(table - 1, column),
                            output_column: Self::column_guid(table, column),
                        })
                        .collect(),
                });
            }
        }

        events
    }

    /// Consolidate the chain into `target` through a scratch buffer graph
    pub fn populate(&self, target: Arc<dyn GraphStore>, config: ConsolidationConfig) -> IngestSummary {
        let scratch: Arc<dyn GraphStore> = Arc::new(MemoryGraph::new("mock-buffer"));
        let writer = BufferWriter::new(Arc::clone(&scratch));
        let consolidator = Consolidator::new(scratch, target, config);

        let mut summary = IngestSummary::default();
        for (index, event) in self.events().iter().enumerate() {
            match writer.apply(event) {
                Ok(fragments) => {
                    summary.events += 1;
                    summary.fragments += fragments.len();
                    for fragment in &fragments {
                        let outcome =
                            consolidator.consolidate(&fragment.column_in, &fragment.column_out, &fragment.process);
                        summary.record(fragment, outcome);
                    }
                }
                Err(error) => summary.reject(index, event, error),
            }
        }

        tracing::info!(
            tables = self.tables,
            columns_per_table = self.columns_per_table,
            applied = summary.applied,
            "mock lineage generated"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_counts_follow_shape() {
        let events = MockLineage::new(3, 2).events();
        // schema, then per table: entity + attachment + 2 * (column + nesting), plus 2 processes
        assert_eq!(events.len(), 1 + 3 * (2 + 2 * 2) + 2);
        let processes = events
            .iter()
            .filter(|e| e.event_type() == "ProcessContext")
            .count();
        assert_eq!(processes, 2);
    }

    #[test]
    fn populate_fills_only_the_target() {
        let target = Arc::new(MemoryGraph::new("mock"));
        let summary = MockLineage::new(3, 2).populate(target.clone(), ConsolidationConfig::default());

        assert!(summary.is_clean());
        assert_eq!(summary.fragments, 4);
        assert_eq!(summary.applied, 4);
        // 6 columns, 3 tables, 2 processes, 4 sub-processes
        assert_eq!(target.vertex_count().unwrap(), 15);
    }
}
