//! Main-graph vocabulary: vertex labels, edge labels and property keys
//!
//! IMPORTANT: these strings are written into stored graphs and exported documents.
//! NEVER rename a label or key - add new ones instead.

use serde::{Deserialize, Serialize};

/// Label of a vertex in the main lineage graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeLabel {
    /// Table-level asset (relational table or data file)
    Table,

    /// Column-level asset
    Column,

    /// Top-level process, unique per process guid
    Process,

    /// One column-to-column transformation step of a process
    SubProcess,

    /// Business glossary term
    GlossaryTerm,

    /// Response-only summarization vertex (never persisted)
    Condensed,
}

impl NodeLabel {
    /// All labels in declaration order
    pub const ALL: [NodeLabel; 6] = [
        Self::Table,
        Self::Column,
        Self::Process,
        Self::SubProcess,
        Self::GlossaryTerm,
        Self::Condensed,
    ];

    /// Get the label as the string stored in the graph
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "Table",
            Self::Column => "Column",
            Self::Process => "Process",
            Self::SubProcess => "SubProcess",
            Self::GlossaryTerm => "GlossaryTerm",
            Self::Condensed => "Condensed",
        }
    }

    /// Resolve a stored label string
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == label)
    }
}

impl std::fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Label of a directed edge in the main lineage graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeLabel {
    /// Column -> SubProcess and SubProcess -> Column
    ColumnAndProcess,

    /// Input table -> Process and Process -> output table
    TableAndProcess,

    /// SubProcess -> owning Process
    SubprocessToProcess,

    /// Column -> enclosing Table
    IncludedIn,

    /// Asset -> GlossaryTerm
    Semantic,

    /// Synonym link between two glossary terms
    GlossaryTermToGlossaryTerm,

    /// Response-only summarization edge
    Condensed,
}

impl EdgeLabel {
    /// Get the label as the string stored in the graph
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ColumnAndProcess => "ColumnAndProcess",
            Self::TableAndProcess => "TableAndProcess",
            Self::SubprocessToProcess => "SubprocessToProcess",
            Self::IncludedIn => "IncludedIn",
            Self::Semantic => "Semantic",
            Self::GlossaryTermToGlossaryTerm => "GlossaryTermToGlossaryTerm",
            Self::Condensed => "Condensed",
        }
    }
}

impl std::fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Property keys used on stored vertices
pub mod keys {
    /// Lookup key of every main-graph vertex
    pub const NODE_ID: &str = "nodeId";

    /// Originating metadata instance identifier
    pub const GUID: &str = "guid";

    /// Display name written by the consolidator
    pub const DISPLAY_NAME: &str = "displayName";

    /// Display name as copied from buffer entity properties
    pub const ALTERNATIVE_DISPLAY_NAME: &str = "vepropdisplayName";

    /// Denormalized name of the enclosing table or data file
    pub const TABLE_DISPLAY_NAME: &str = "tableDisplayName";

    /// Denormalized name of the enclosing schema or folder
    pub const SCHEMA_DISPLAY_NAME: &str = "schemaDisplayName";

    /// Prefix applied to entity properties when written to the buffer graph
    pub const ENTITY_PROPERTY_PREFIX: &str = "veprop";

    /// Build the buffer key for an entity property (`qualifiedName` -> `vepropqualifiedName`)
    pub fn entity_property(name: &str) -> String {
        format!("{}{}", ENTITY_PROPERTY_PREFIX, name)
    }
}

/// Type names found on buffer-graph vertices and edges
pub mod buffer_labels {
    pub const RELATIONAL_TABLE: &str = "RelationalTable";
    pub const DATA_FILE: &str = "DataFile";
    pub const RELATIONAL_DB_SCHEMA_TYPE: &str = "RelationalDBSchemaType";
    pub const FILE_FOLDER: &str = "FileFolder";
    pub const GLOSSARY_TERM: &str = "GlossaryTerm";
    pub const PROCESS: &str = "Process";

    /// Relationship linking an asset to a glossary term
    pub const SEMANTIC_ASSIGNMENT: &str = "SemanticAssignment";

    /// Relationship linking two glossary terms with the same meaning
    pub const SYNONYM: &str = "Synonym";

    /// Relationships carrying meaning or data flow rather than containment
    pub const NON_STRUCTURAL: [&str; 6] = [
        SEMANTIC_ASSIGNMENT,
        SYNONYM,
        "LineageMapping",
        "DataFlow",
        "ControlFlow",
        "ProcessPort",
    ];

    /// Labels that enclose columns
    pub const TABLE_LIKE: [&str; 2] = [RELATIONAL_TABLE, DATA_FILE];

    /// Labels that enclose tables
    pub const SCHEMA_LIKE: [&str; 2] = [RELATIONAL_DB_SCHEMA_TYPE, FILE_FOLDER];

    /// Check if a buffer label denotes a table-level asset
    pub fn is_table_like(label: &str) -> bool {
        TABLE_LIKE.contains(&label)
    }

    /// Check if a buffer label denotes a schema-level container
    pub fn is_schema_like(label: &str) -> bool {
        SCHEMA_LIKE.contains(&label)
    }

    /// Check if a buffer relationship can lead from an asset to its container
    pub fn is_structural(label: &str) -> bool {
        !NON_STRUCTURAL.contains(&label)
    }
}
