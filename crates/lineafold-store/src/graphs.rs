//! The named graph instances shared by the consolidator and the query engine

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use lineafold_core::GraphName;

use crate::document::{dump_graph, load_graph};
use crate::memory::MemoryGraph;
use crate::store::{GraphStore, StoreError};

/// One store per [`GraphName`]
#[derive(Clone)]
pub struct GraphSet {
    graphs: BTreeMap<GraphName, Arc<dyn GraphStore>>,
}

impl GraphSet {
    /// Create a set of empty in-memory graphs
    pub fn in_memory() -> Self {
        let graphs = GraphName::ALL
            .into_iter()
            .map(|name| (name, Arc::new(MemoryGraph::new(name.as_str())) as Arc<dyn GraphStore>))
            .collect();
        Self { graphs }
    }

    /// Replace one graph with another store
    pub fn with_graph(mut self, name: GraphName, store: Arc<dyn GraphStore>) -> Self {
        self.graphs.insert(name, store);
        self
    }

    /// Get the store for a named graph
    pub fn get(&self, name: GraphName) -> Arc<dyn GraphStore> {
        match self.graphs.get(&name) {
            Some(store) => Arc::clone(store),
            // every constructor fills all names
            None => Arc::new(MemoryGraph::new(name.as_str())),
        }
    }

    pub fn main(&self) -> Arc<dyn GraphStore> {
        self.get(GraphName::Main)
    }

    pub fn buffer(&self) -> Arc<dyn GraphStore> {
        self.get(GraphName::Buffer)
    }

    /// Load every graph from `<dir>/<graph>.json`, starting empty where no file exists
    pub fn load_dir(dir: &Path) -> Result<Self, StoreError> {
        let mut graphs = BTreeMap::new();
        for name in GraphName::ALL {
            let path = dir.join(format!("{}.json", name.as_str()));
            let graph = if path.exists() {
                tracing::debug!(graph = %name, path = %path.display(), "loading graph");
                load_graph(name.as_str(), &path)?
            } else {
                MemoryGraph::new(name.as_str())
            };
            graphs.insert(name, Arc::new(graph) as Arc<dyn GraphStore>);
        }
        Ok(Self { graphs })
    }

    /// Write every graph to `<dir>/<graph>.json`
    pub fn save_dir(&self, dir: &Path) -> Result<(), StoreError> {
        for store in self.graphs.values() {
            dump_graph(store.as_ref(), dir)?;
        }
        Ok(())
    }
}

impl Default for GraphSet {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for GraphSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.graphs.keys()).finish()
    }
}
