//! Recorded traces and their replay contexts

pub mod replay;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::DcrGraph;

/// Which merge view a trace asserts against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeScope {
    Local,
    EventLocal,
    Global,
}

/// Classifies a trace's relevant-activity universe.
///
/// Strict: every activity in the graph is foreign unless it appears in the
/// trace's recorded sequence. Defined: only the explicitly tagged set is
/// foreign. Foreign activities may never be fired by a forcing chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub strict: bool,
    pub scope: MergeScope,
    #[serde(default)]
    pub activities: HashSet<String>,
}

impl Context {
    pub fn new(strict: bool, scope: MergeScope) -> Self {
        Self {
            strict,
            scope,
            activities: HashSet::new(),
        }
    }
}

/// A named, ordered sequence of activity ids representing a recorded run.
///
/// The sequence is immutable once recording stops; replay only rewrites
/// `passed` and `accepting` (the concrete sequence that fired, including
/// forced chains — it may differ from the recorded one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub name: String,
    pub sequence: Vec<String>,
    pub recorded: DateTime<Utc>,
    pub context: Context,
    /// Expectation: a positive trace must replay, a negative one must not.
    pub positive: bool,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub accepting: Vec<String>,
}

impl Trace {
    pub fn new(name: &str, scope: MergeScope, strict: bool, positive: bool) -> Self {
        let now = Utc::now();
        let name = if name.is_empty() {
            now.format("%Y-%m-%d %H:%M").to_string()
        } else {
            name.to_string()
        };
        Self {
            name,
            sequence: Vec::new(),
            recorded: now,
            context: Context::new(strict, scope),
            positive,
            passed: false,
            accepting: Vec::new(),
        }
    }

    /// Append an executed activity to the recorded sequence.
    pub fn record_execution(&mut self, id: &str) {
        self.sequence.push(id.to_string());
    }

    /// Tag an activity as foreign for a Defined context.
    pub fn add_context(&mut self, id: &str) {
        self.context.activities.insert(id.to_string());
    }

    /// Replay against a graph and store the verdict: pass iff the replay
    /// outcome matches the positive/negative expectation.
    pub fn check(&mut self, graph: &mut DcrGraph) -> bool {
        let replayed = replay::check_trace(self, graph);
        self.passed = (self.positive && replayed) || (!self.positive && !replayed);
        self.passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_defaults_to_timestamp() {
        let trace = Trace::new("", MergeScope::Local, false, true);
        assert!(!trace.name.is_empty());
    }

    #[test]
    fn recording_appends_to_sequence_only() {
        let mut trace = Trace::new("t", MergeScope::Local, false, true);
        trace.record_execution("A");
        trace.record_execution("B");
        assert_eq!(trace.sequence, vec!["A", "B"]);
        assert!(trace.context.activities.is_empty());
    }

    #[test]
    fn context_tags_are_a_set() {
        let mut trace = Trace::new("t", MergeScope::Local, false, true);
        trace.add_context("X");
        trace.add_context("X");
        assert_eq!(trace.context.activities.len(), 1);
    }

    #[test]
    fn negative_trace_passes_when_replay_fails() {
        let mut graph = DcrGraph::from_source("%\"A\"", "neg").unwrap();
        let mut trace = Trace::new("t", MergeScope::Local, false, false);
        trace.record_execution("A");
        assert!(trace.check(&mut graph));
        assert!(trace.passed);
    }

    #[test]
    fn trace_round_trips_through_json() {
        let mut trace = Trace::new("t", MergeScope::Global, true, true);
        trace.record_execution("A");
        trace.add_context("B");
        let json = serde_json::to_string(&trace).unwrap();
        let back: Trace = serde_json::from_str(&json).unwrap();
        assert_eq!(back, trace);
    }
}
