//! Engine error types
//!
//! Every variant names the operation that failed and the offending guid or value, so
//! callers can log and triage without looking at traversal internals.

use lineafold_core::{GraphName, RequestError};
use lineafold_store::StoreError;

pub type Result<T> = std::result::Result<T, LineageError>;

#[derive(Debug, thiserror::Error)]
pub enum LineageError {
    /// A referenced instance is missing from the graph an operation reads from
    #[error("{operation}: no vertex with guid '{guid}' in the {graph} graph")]
    NotFound {
        operation: &'static str,
        graph: GraphName,
        guid: String,
    },

    /// The queried node does not exist in the selected graph
    #[error("{operation}: node '{guid}' not found in the {graph} graph")]
    NodeNotFound {
        operation: &'static str,
        graph: GraphName,
        guid: String,
    },

    /// A column has no enclosing table or data file within the search bound
    #[error("{operation}: no enclosing table found for column '{guid}'")]
    MissingTable {
        operation: &'static str,
        guid: String,
    },

    /// A directional traversal produced no terminal vertex
    #[error("{operation}: lineage cycle detected starting from '{guid}'")]
    LineageCycle {
        operation: &'static str,
        guid: String,
    },

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Graph store error: {0}")]
    Store(#[from] StoreError),
}

impl LineageError {
    /// Check if the error came from invalid caller input rather than graph state
    pub fn is_request_error(&self) -> bool {
        matches!(self, Self::Request(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = LineageError::NodeNotFound {
            operation: "ultimateSource",
            graph: GraphName::Main,
            guid: "c9".to_string(),
        };
        assert_eq!(err.to_string(), "ultimateSource: node 'c9' not found in the main graph");

        let err = LineageError::from(RequestError::InvalidScope("sideways".to_string()));
        assert_eq!(err.to_string(), "Invalid scope 'sideways'");
        assert!(err.is_request_error());
    }
}
