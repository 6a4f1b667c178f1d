//! Activities and their runtime markings

use serde::{Deserialize, Serialize};

use super::errors::{GraphError, Result};
use super::relation::RelationType;

/// The marking triple of an activity at a point in time.
///
/// Captured at parse time and restored by `DcrGraph::reset_graph_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityState {
    pub executed: bool,
    pub excluded: bool,
    pub pending: bool,
}

/// A modeled event with identity and three independent boolean markings.
///
/// Inclusion is stored inverted (`excluded`) because activities are included
/// far more often than not. Markings are mutated only through the execution
/// engine's firing rule; relations live in the owning graph's arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub executed: bool,
    pub excluded: bool,
    pub pending: bool,
    pub strict: bool,
    pub execution_count: u32,
}

impl Activity {
    /// Build an activity from a structured-format record's marking values.
    /// Values other than 0 or 1 are a parse error.
    pub fn new(executed: i64, included: i64, pending: i64, id: &str, record: &str) -> Result<Self> {
        if !is_zero_or_one(executed) || !is_zero_or_one(included) || !is_zero_or_one(pending) {
            return Err(GraphError::InvalidMarking {
                record: record.to_string(),
            });
        }

        let executed = executed != 0;
        Ok(Self {
            id: id.to_string(),
            executed,
            excluded: included == 0,
            pending: pending != 0,
            strict: false,
            execution_count: if executed { 1 } else { 0 },
        })
    }

    /// Current marking triple.
    pub fn state(&self) -> ActivityState {
        ActivityState {
            executed: self.executed,
            excluded: self.excluded,
            pending: self.pending,
        }
    }

    /// Restore parse-time markings. The execution count resets to zero even
    /// for activities declared executed.
    pub fn reset(&mut self, state: ActivityState) {
        self.executed = state.executed;
        self.excluded = state.excluded;
        self.pending = state.pending;
        self.execution_count = 0;
    }

    /// Whether this activity, as the source of an incoming relation of the
    /// given kind, blocks its target. Condition blocks while included and
    /// not executed; Milestone blocks while included and pending. The other
    /// kinds never block.
    pub fn is_blocking(&self, relation_type: RelationType) -> bool {
        match relation_type {
            RelationType::Condition => !self.excluded && !self.executed,
            RelationType::Milestone => !self.excluded && self.pending,
            RelationType::Include | RelationType::Exclude | RelationType::Response => false,
        }
    }

    /// Apply the marking effect of an outgoing relation of the given kind
    /// from a just-fired source. Condition and Milestone only gate; they
    /// have no direct state effect.
    pub fn apply_effect(&mut self, relation_type: RelationType) {
        match relation_type {
            RelationType::Include => self.excluded = false,
            RelationType::Exclude => self.excluded = true,
            RelationType::Response => self.pending = true,
            RelationType::Condition | RelationType::Milestone => {}
        }
    }

    /// Serialize current markings to the textual wire format: the id quoted
    /// once per marking slot, prefixed with `:` / `%` / `!` for set flags.
    pub fn export_text(&self) -> String {
        let mut out = String::new();
        if self.executed {
            out.push(':');
        }
        out.push_str(&format!("\"{}\"", self.id));
        if self.excluded {
            out.push('%');
        }
        out.push_str(&format!("\"{}\"", self.id));
        if self.pending {
            out.push('!');
        }
        out.push_str(&format!("\"{}\"", self.id));
        out
    }
}

fn is_zero_or_one(value: i64) -> bool {
    value == 0 || value == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_inverts_included_into_excluded() {
        let a = Activity::new(0, 1, 0, "A", "0 1 0 A").unwrap();
        assert!(!a.excluded);
        let b = Activity::new(0, 0, 0, "B", "0 0 0 B").unwrap();
        assert!(b.excluded);
    }

    #[test]
    fn executed_activity_starts_with_count_one() {
        let a = Activity::new(1, 1, 0, "A", "1 1 0 A").unwrap();
        assert_eq!(a.execution_count, 1);
        let b = Activity::new(0, 1, 0, "B", "0 1 0 B").unwrap();
        assert_eq!(b.execution_count, 0);
    }

    #[test]
    fn non_binary_marking_is_a_parse_error() {
        let err = Activity::new(2, 1, 0, "A", "2 1 0 A").unwrap_err();
        assert!(matches!(err, GraphError::InvalidMarking { .. }));
    }

    #[test]
    fn condition_blocks_only_while_included_and_unexecuted() {
        let mut a = Activity::new(0, 1, 0, "A", "0 1 0 A").unwrap();
        assert!(a.is_blocking(RelationType::Condition));
        a.executed = true;
        assert!(!a.is_blocking(RelationType::Condition));
        a.executed = false;
        a.excluded = true;
        assert!(!a.is_blocking(RelationType::Condition));
    }

    #[test]
    fn milestone_blocks_only_while_included_and_pending() {
        let mut a = Activity::new(0, 1, 1, "A", "0 1 1 A").unwrap();
        assert!(a.is_blocking(RelationType::Milestone));
        a.pending = false;
        assert!(!a.is_blocking(RelationType::Milestone));
        a.pending = true;
        a.excluded = true;
        assert!(!a.is_blocking(RelationType::Milestone));
    }

    #[test]
    fn include_and_exclude_and_response_never_block() {
        let a = Activity::new(0, 1, 1, "A", "0 1 1 A").unwrap();
        assert!(!a.is_blocking(RelationType::Include));
        assert!(!a.is_blocking(RelationType::Exclude));
        assert!(!a.is_blocking(RelationType::Response));
    }

    #[test]
    fn export_prefixes_set_markings() {
        let mut a = Activity::new(1, 0, 1, "Pay", "1 0 1 Pay").unwrap();
        assert_eq!(a.export_text(), ":\"Pay\"%\"Pay\"!\"Pay\"");
        a.executed = false;
        a.excluded = false;
        a.pending = false;
        assert_eq!(a.export_text(), "\"Pay\"\"Pay\"\"Pay\"");
    }

    #[test]
    fn reset_restores_markings_and_zeroes_count() {
        let mut a = Activity::new(1, 1, 0, "A", "1 1 0 A").unwrap();
        let initial = a.state();
        a.executed = true;
        a.pending = true;
        a.execution_count = 4;
        a.reset(initial);
        assert_eq!(a.state(), initial);
        assert_eq!(a.execution_count, 0);
    }
}
