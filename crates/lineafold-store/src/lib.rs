//! Property-graph store capability for the lineage engine
//!
//! The engine never talks to a concrete graph database. It works against the traits in
//! [`store`]:
//! - [`GraphStore`] hands out read-only snapshots and read-write transactions
//! - [`GraphSnapshot`] offers lookups, neighbor expansion and bounded traversal
//! - [`GraphTransaction`] adds vertex/edge creation with commit and rollback
//!
//! [`MemoryGraph`] is the in-process implementation used by the CLI and the tests.
//! [`GraphSet`] holds the four named graphs, and [`document`] converts graphs to and
//! from a portable JSON form for dumps and exports.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lineafold_store::{GraphStore, MemoryGraph, Properties};
//!
//! let graph = MemoryGraph::new("buffer");
//! let mut tx = graph.begin()?;
//! let table = tx.add_vertex("RelationalTable", Properties::from([("guid".into(), "t1".into())]))?;
//! tx.commit()?;
//! ```

pub mod store;
pub mod memory;
pub mod graphs;
pub mod document;

pub use store::{
    GraphStore, GraphSnapshot, GraphTransaction, Vertex, Edge, VertexId, EdgeId, Direction,
    Properties, Reached, StoreError,
};
pub use memory::MemoryGraph;
pub use graphs::GraphSet;
pub use document::{GraphDocument, export_graph, dump_graph, load_graph};
