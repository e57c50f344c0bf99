//! Test fixtures for lineage scenarios
//!
//! Each fixture is a list of metadata instance events as a connector would emit them.
//! Ingesting them through [`LineageService`] exercises the whole path: buffer
//! translation, consolidation and then queries over the main graph.
//!
//! Buffer layout used throughout:
//! - schema `s1` (`RelationalDBSchemaType`) holds tables via `AttachedSchema`
//! - tables (`RelationalTable`) hold columns via `NestedSchemaAttribute`
//! - processes carry their column mappings in a `ProcessContext` event

#![allow(dead_code)]

use lineafold_engine::{ColumnMapping, EntityDetail, InstanceEvent, LineageService, RelationshipDetail};

pub fn entity(guid: &str, type_name: &str, display_name: &str) -> InstanceEvent {
    InstanceEvent::NewEntity {
        entity: EntityDetail::new(guid, type_name)
            .with_property("displayName", display_name)
            .with_property("qualifiedName", format!("warehouse.{}", display_name)),
    }
}

pub fn relationship(type_name: &str, end_one: &str, end_two: &str) -> InstanceEvent {
    InstanceEvent::NewRelationship {
        relationship: RelationshipDetail::new(
            format!("{}-{}-{}", type_name, end_one, end_two),
            type_name,
            end_one,
            end_two,
        ),
    }
}

pub fn process(guid: &str, display_name: &str, mappings: &[(&str, &str)]) -> InstanceEvent {
    InstanceEvent::ProcessContext {
        process: EntityDetail::new(guid, "Process").with_property("displayName", display_name),
        mappings: mappings
            .iter()
            .map(|(input, output)| ColumnMapping {
                input_column: input.to_string(),
                output_column: output.to_string(),
            })
            .collect(),
    }
}

/// Schema `s1` with tables and their columns, no processes
///
/// `tables` pairs a table guid with the guids of its columns.
pub fn warehouse(tables: &[(&str, &[&str])]) -> Vec<InstanceEvent> {
    let mut events = vec![entity("s1", "RelationalDBSchemaType", "sales")];
    for (table, columns) in tables {
        events.push(entity(table, "RelationalTable", &format!("{}_table", table)));
        events.push(relationship("AttachedSchema", "s1", table));
        for column in columns.iter() {
            events.push(entity(column, "RelationalColumn", &format!("{}_column", column)));
            events.push(relationship("NestedSchemaAttribute", table, column));
        }
    }
    events
}

/// `c1` in `t1` feeds `c2` in `t2` through process `p1`
pub fn single_hop() -> Vec<InstanceEvent> {
    let mut events = warehouse(&[("t1", &["c1"]), ("t2", &["c2"])]);
    events.push(process("p1", "load_orders", &[("c1", "c2")]));
    events
}

/// `c1` and `c2` (table `t1`) both feed `c3` (table `t2`) through `p1`
pub fn fan_in() -> Vec<InstanceEvent> {
    let mut events = warehouse(&[("t1", &["c1", "c2"]), ("t2", &["c3"])]);
    events.push(process("p1", "merge_names", &[("c1", "c3"), ("c2", "c3")]));
    events
}

/// `c1 -> c2 -> c3` through `p1` then `p2`, plus `c2 -> c4` through `p2`
pub fn branching_chain() -> Vec<InstanceEvent> {
    let mut events = warehouse(&[("t1", &["c1"]), ("t2", &["c2"]), ("t3", &["c3", "c4"])]);
    events.push(process("p1", "stage", &[("c1", "c2")]));
    events.push(process("p2", "publish", &[("c2", "c3"), ("c2", "c4")]));
    events
}

/// `c1 -> c2` through `p1` and `c2 -> c1` through `p2`
pub fn cycle() -> Vec<InstanceEvent> {
    let mut events = warehouse(&[("t1", &["c1"]), ("t2", &["c2"])]);
    events.push(process("p1", "forward", &[("c1", "c2")]));
    events.push(process("p2", "backward", &[("c2", "c1")]));
    events
}

/// Terms `g1` and `g2` are synonyms; column `a1` is assigned to `g2` and feeds `b1`
pub fn glossary() -> Vec<InstanceEvent> {
    let mut events = warehouse(&[("t1", &["a1"]), ("t2", &["b1"])]);
    events.push(entity("g1", "GlossaryTerm", "Customer"));
    events.push(entity("g2", "GlossaryTerm", "Client"));
    events.push(relationship("Synonym", "g1", "g2"));
    events.push(relationship("SemanticAssignment", "a1", "g2"));
    events.push(process("p1", "copy_clients", &[("a1", "b1")]));
    events
}

/// Service with every event of `events` ingested
pub fn service_with(events: &[InstanceEvent]) -> LineageService {
    let service = LineageService::in_memory();
    let summary = service.ingest_all(events);
    assert!(summary.is_clean(), "fixture ingestion failed: {:?}", summary);
    service
}
