//! Lineafold Core
//!
//! Core domain model with stable types shared by the store, the engine and the CLI.
//! Label and property-key strings are persisted in graph documents - never rename them.

pub mod model;
pub mod request;
pub mod response;
pub mod config;

pub use model::{NodeLabel, EdgeLabel, keys, buffer_labels};
pub use request::{GraphName, Scope, View, RequestError};
pub use response::{LineageResponse, LineageVertex, LineageEdge};
pub use config::{Config, ConfigError, AttributeWhitelist, ConsolidationConfig, StorageConfig};
