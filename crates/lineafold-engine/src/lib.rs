//! Lineafold engine - consolidation and lineage queries
//!
//! This crate implements the lineage graph engine:
//! - Event-to-buffer translation of metadata instance events
//! - Consolidation of buffered column/process fragments into the main graph
//! - Lineage queries (ultimate source/destination, end-to-end, glossary)
//! - Response building with condensation and attribute whitelisting
//! - Synthetic lineage for the mock graph

pub mod error;
pub mod buffer;
pub mod consolidator;
pub mod traversal;
pub mod builder;
pub mod query;
pub mod service;
pub mod mock;

pub use error::{LineageError, Result};
pub use buffer::{BufferWriter, InstanceEvent, EntityDetail, RelationshipDetail, ColumnMapping, LineageFragment};
pub use consolidator::{Consolidator, Consolidation, ProcessRef};
pub use builder::{abstract_vertex, ResponseBuilder, CONDENSED_DESTINATION, CONDENSED_SOURCE};
pub use traversal::{frontier, reachable, Reachable};
pub use query::LineageQuery;
pub use mock::MockLineage;
pub use service::{LineageService, IngestSummary, FragmentFailure, EventFailure};
