//! Typed relations between activities

use serde::{Deserialize, Serialize};

use super::errors::{GraphError, Result};

/// The five DCR relation kinds.
///
/// `Condition` and `Milestone` gate execution of their target; `Include`,
/// `Exclude` and `Response` change the target's markings when the source
/// fires. Wire type codes follow the structured intermediate format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    Include,
    Exclude,
    Response,
    Condition,
    Milestone,
}

impl RelationType {
    /// Decode a structured-format type code (0..=4).
    pub fn from_code(code: i64, record: &str) -> Result<Self> {
        match code {
            0 => Ok(Self::Include),
            1 => Ok(Self::Exclude),
            2 => Ok(Self::Response),
            3 => Ok(Self::Condition),
            4 => Ok(Self::Milestone),
            _ => Err(GraphError::InvalidRelationType {
                code,
                record: record.to_string(),
            }),
        }
    }

    /// Encode to the structured-format type code.
    pub fn code(self) -> u8 {
        match self {
            Self::Include => 0,
            Self::Exclude => 1,
            Self::Response => 2,
            Self::Condition => 3,
            Self::Milestone => 4,
        }
    }

    /// The arrow token used by the textual wire format.
    pub fn arrow(self) -> &'static str {
        match self {
            Self::Include => "-->+",
            Self::Exclude => "-->%",
            Self::Response => "*-->",
            Self::Condition => "-->*",
            Self::Milestone => "--<>",
        }
    }
}

/// A directed typed edge between two activities, addressed by arena index.
///
/// Immutable once created; merge operations splice new relations in rather
/// than editing existing ones. Equality of a relation pair for merge
/// purposes is the `(from, to, relation_type)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub from: usize,
    pub to: usize,
    pub relation_type: RelationType,
}

impl Relation {
    pub fn new(from: usize, to: usize, relation_type: RelationType) -> Self {
        Self {
            from,
            to,
            relation_type,
        }
    }
}
