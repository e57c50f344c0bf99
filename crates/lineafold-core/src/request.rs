//! Lineage request parameters
//!
//! Closed sets of graph names, scopes and views. Parsing accepts the common spellings
//! used by callers (`ultimate-source`, `ultimateSource`, `ULTIMATE_SOURCE`) and rejects
//! anything else before a traversal starts.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::model::EdgeLabel;

/// Errors for unrecognized request parameters
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Invalid scope '{0}'")]
    InvalidScope(String),

    #[error("Invalid view '{0}'")]
    InvalidView(String),

    #[error("Invalid graph source '{0}'")]
    InvalidSource(String),
}

/// Lowercase and drop separators so that all accepted spellings compare equal
fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Named graph instance to operate on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphName {
    /// Consolidated lineage graph
    Main,

    /// Staging graph holding ingested fragments
    Buffer,

    /// Graph holding synthetic lineage, filled by the `mock` command
    Mock,

    /// Historical lineage
    History,
}

impl GraphName {
    pub const ALL: [GraphName; 4] = [Self::Main, Self::Buffer, Self::Mock, Self::History];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Buffer => "buffer",
            Self::Mock => "mock",
            Self::History => "history",
        }
    }
}

impl std::fmt::Display for GraphName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GraphName {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "main" => Ok(Self::Main),
            "buffer" => Ok(Self::Buffer),
            "mock" => Ok(Self::Mock),
            "history" => Ok(Self::History),
            _ => Err(RequestError::InvalidSource(s.to_string())),
        }
    }
}

/// Shape of the lineage requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scope {
    /// Ultimate sources and ultimate destinations together
    SourceAndDestination,

    /// Every path through the queried vertex, both directions
    EndToEnd,

    /// Terminal upstream vertices
    UltimateSource,

    /// Terminal downstream vertices
    UltimateDestination,

    /// Glossary-term synonym closure and the assets assigned to it
    Glossary,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceAndDestination => "sourceAndDestination",
            Self::EndToEnd => "endToEnd",
            Self::UltimateSource => "ultimateSource",
            Self::UltimateDestination => "ultimateDestination",
            Self::Glossary => "glossary",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Scope {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "sourceanddestination" => Ok(Self::SourceAndDestination),
            "endtoend" | "end2end" => Ok(Self::EndToEnd),
            "ultimatesource" => Ok(Self::UltimateSource),
            "ultimatedestination" => Ok(Self::UltimateDestination),
            "glossary" | "glossarylineage" => Ok(Self::Glossary),
            _ => Err(RequestError::InvalidScope(s.to_string())),
        }
    }
}

/// Granularity of the traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum View {
    /// Table-level lineage over `TableAndProcess` edges
    TableView,

    /// Column-level lineage over `ColumnAndProcess` edges
    ColumnView,
}

impl View {
    /// Edge label that drives traversals for this view
    pub fn edge_label(&self) -> EdgeLabel {
        match self {
            Self::TableView => EdgeLabel::TableAndProcess,
            Self::ColumnView => EdgeLabel::ColumnAndProcess,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TableView => "TABLE_VIEW",
            Self::ColumnView => "COLUMN_VIEW",
        }
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for View {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "tableview" | "table" => Ok(Self::TableView),
            "columnview" | "column" => Ok(Self::ColumnView),
            _ => Err(RequestError::InvalidView(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_scope_spellings() {
        assert_eq!("ultimate-source".parse::<Scope>(), Ok(Scope::UltimateSource));
        assert_eq!("ultimateDestination".parse::<Scope>(), Ok(Scope::UltimateDestination));
        assert_eq!("END_TO_END".parse::<Scope>(), Ok(Scope::EndToEnd));
        assert_eq!("end2end".parse::<Scope>(), Ok(Scope::EndToEnd));
        assert_eq!(
            "sideways".parse::<Scope>(),
            Err(RequestError::InvalidScope("sideways".to_string()))
        );
    }

    #[test]
    fn parse_view_and_source() {
        assert_eq!("COLUMNVIEW".parse::<View>(), Ok(View::ColumnView));
        assert_eq!("table-view".parse::<View>(), Ok(View::TableView));
        assert!(matches!("row".parse::<View>(), Err(RequestError::InvalidView(_))));

        assert_eq!("Main".parse::<GraphName>(), Ok(GraphName::Main));
        assert!(matches!("archive".parse::<GraphName>(), Err(RequestError::InvalidSource(_))));
    }

    #[test]
    fn view_edge_labels() {
        assert_eq!(View::TableView.edge_label(), EdgeLabel::TableAndProcess);
        assert_eq!(View::ColumnView.edge_label(), EdgeLabel::ColumnAndProcess);
    }

    #[test]
    fn display_round_trips_through_parse() {
        for graph in GraphName::ALL {
            assert_eq!(graph.to_string().parse::<GraphName>(), Ok(graph));
        }
        assert_eq!(Scope::Glossary.to_string().parse::<Scope>(), Ok(Scope::Glossary));
    }
}
