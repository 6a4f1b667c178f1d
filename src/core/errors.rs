//! Shared error types for graph construction and execution

use thiserror::Error;

/// Main error type for dcrcheck operations.
///
/// Parse and reference errors abort the enclosing construction call; no
/// partially built graph is ever returned. Analysis non-results and trace
/// replay failures are ordinary data and do not go through this type.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Activity record with a wrong shape (field count, missing id)
    #[error("invalid activity record: {record}")]
    InvalidActivityRecord { record: String },

    /// Activity record whose marking values are not 0 or 1
    #[error("invalid marking value in activity record (executed, included and pending must each be 0 or 1): {record}")]
    InvalidMarking { record: String },

    /// Relation record with a wrong shape
    #[error("invalid relation record: {record}")]
    InvalidRelationRecord { record: String },

    /// Relation record with a type code outside 0..=4
    #[error("invalid relation type code {code} (valid codes are 0 to 4): {record}")]
    InvalidRelationType { code: i64, record: String },

    /// Relation record referencing an activity index that was never declared
    #[error("relation references activity index {index} but only {count} activities are declared: {record}")]
    ActivityIndexOutOfRange {
        index: usize,
        count: usize,
        record: String,
    },

    /// Malformed textual source (unterminated quote, dangling arrow, ...)
    #[error("invalid dcr text at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// Operation addressed an activity id not present in the graph
    #[error("unknown activity '{id}'; known activities: {}", known.join(", "))]
    UnknownActivity { id: String, known: Vec<String> },

    /// IO errors from reading graph or trace files
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors from the trace file format
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GraphError {
    /// Create a syntax error with offset context.
    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }

    /// Create an unknown-activity reference error carrying the known-id
    /// snapshot for the caller's report.
    pub fn unknown_activity(id: impl Into<String>, known: Vec<String>) -> Self {
        Self::UnknownActivity {
            id: id.into(),
            known,
        }
    }
}

/// Convenience result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;
