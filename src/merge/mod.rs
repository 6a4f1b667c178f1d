//! Graph merging and behavior-preservation checking
//!
//! Three views over a list of graphs: the full textual merge, one
//! event-local merge per graph (markings OR'd in and relations spliced for
//! shared activities), and a pairwise transparency test that flags merges
//! which could change a pre-existing graph's observable behavior.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::analysis::freedom::Freedom;
use crate::analysis::safety::is_safe;
use crate::core::errors::Result;
use crate::core::relation::RelationType;
use crate::graph::DcrGraph;
use crate::trace::{MergeScope, Trace};

/// A relation named by endpoint ids, for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescription {
    pub from: String,
    pub to: String,
    pub relation_type: RelationType,
}

/// The first failing transparency condition found: the activity whose
/// markings change, or the offending new relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransparencyViolation {
    pub activity: Option<String>,
    pub relation: Option<RelationDescription>,
}

impl TransparencyViolation {
    fn activity(id: &str) -> Self {
        Self {
            activity: Some(id.to_string()),
            relation: None,
        }
    }

    fn relation(from: &str, to: &str, relation_type: RelationType) -> Self {
        Self {
            activity: None,
            relation: Some(RelationDescription {
                from: from.to_string(),
                to: to.to_string(),
                relation_type,
            }),
        }
    }
}

/// One failed pairwise preservation test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreservationFailure {
    /// The pre-existing graph whose behavior the merge would change
    pub base: String,
    /// The graph merged into it
    pub merged: String,
    pub violation: TransparencyViolation,
}

/// Replay outcome of one stored trace against its scope target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceOutcome {
    pub trace: String,
    pub graph: String,
    pub scope: MergeScope,
    pub passed: bool,
    pub accepting: Vec<String>,
}

impl DcrGraph {
    /// Whether merging `other` into this graph preserves this graph's
    /// externally observed behavior. Returns the first failing condition,
    /// or `None` when the merge is transparent. Both graphs are judged
    /// from their initial markings.
    pub fn is_transparent(&self, other: &DcrGraph) -> Result<Option<TransparencyViolation>> {
        let base = self.fresh_copy(&self.name)?;
        let merged_raw = format!("{} \n {}", self.source_text, other.source_text);
        let merged = DcrGraph::from_source(&merged_raw, "transparency probe")?;

        // no pre-existing activity may change its marking triple, and no
        // activity may arrive pending that was not already
        for activity in merged.activities() {
            match base.find(&activity.id) {
                Some(idx) => {
                    if base.activity(idx).state() != activity.state() {
                        return Ok(Some(TransparencyViolation::activity(&activity.id)));
                    }
                }
                None => {
                    if activity.pending {
                        return Ok(Some(TransparencyViolation::activity(&activity.id)));
                    }
                }
            }
        }

        for relation in merged.relations() {
            let from_id = &merged.activity(relation.from).id;
            let to_id = &merged.activity(relation.to).id;
            let pre_from = base.find(from_id);
            let pre_to = base.find(to_id);

            let existed = match (pre_from, pre_to) {
                (Some(from), Some(to)) => base.has_relation(from, to, relation.relation_type),
                _ => false,
            };
            if existed {
                continue;
            }

            let violation =
                TransparencyViolation::relation(from_id, to_id, relation.relation_type);
            match relation.relation_type {
                // a new Include/Response out of a pre-existing activity
                // changes what firing it does
                RelationType::Include | RelationType::Response if pre_from.is_some() => {
                    return Ok(Some(violation));
                }
                // a new Include/Exclude into a pre-existing activity gives
                // outsiders control over its inclusion
                RelationType::Include | RelationType::Exclude if pre_to.is_some() => {
                    return Ok(Some(violation));
                }
                RelationType::Condition | RelationType::Milestone => {
                    if pre_from.is_some() {
                        return Ok(Some(violation));
                    }
                    if pre_to.is_some() && !is_safe(&merged, relation.from, &merged) {
                        return Ok(Some(violation));
                    }
                }
                _ => {}
            }
        }

        Ok(None)
    }

    /// Pull shared activities' state in from another graph: markings OR
    /// together, and relations touching a shared activity are spliced in
    /// when the other endpoint exists locally and no equal-typed relation
    /// between the pair is present yet.
    pub fn take_event_local_activities(&mut self, other: &DcrGraph) {
        for (other_idx, other_activity) in other.activities().iter().enumerate() {
            let Some(local_idx) = self.find(&other_activity.id) else {
                continue;
            };

            {
                let local = self.activity_mut(local_idx);
                local.executed |= other_activity.executed;
                local.excluded |= other_activity.excluded;
                local.pending |= other_activity.pending;
            }

            let touching: Vec<(String, String, RelationType)> = other
                .relations()
                .iter()
                .filter(|r| r.from == other_idx || r.to == other_idx)
                .map(|r| {
                    (
                        other.activity(r.from).id.clone(),
                        other.activity(r.to).id.clone(),
                        r.relation_type,
                    )
                })
                .collect();

            for (from_id, to_id, relation_type) in touching {
                let (Some(from), Some(to)) = (self.find(&from_id), self.find(&to_id)) else {
                    continue;
                };
                if !self.has_relation(from, to, relation_type) {
                    debug!(
                        "event-local merge '{}': splicing {from_id} {} {to_id}",
                        self.name,
                        relation_type.arrow()
                    );
                    self.add_relation(from, to, relation_type);
                }
            }
        }
    }
}

/// The three merge views plus the freedom and preservation results for a
/// list of graphs. Construction resets every input graph to its initial
/// markings first.
#[derive(Debug)]
pub struct GraphMerge {
    pub originals: Vec<DcrGraph>,
    pub full_merge: DcrGraph,
    pub event_local_merges: Vec<DcrGraph>,
    pub freedom: Freedom,
    pub preservation_failures: Vec<PreservationFailure>,
}

impl GraphMerge {
    pub fn new(mut graphs: Vec<DcrGraph>) -> Result<Self> {
        for graph in &mut graphs {
            graph.reset_graph_state();
        }

        let full_merge = create_full_merge(&graphs)?;
        let mut event_local_merges = Vec::with_capacity(graphs.len());
        for index in 0..graphs.len() {
            event_local_merges.push(create_event_local_merge(&graphs, index)?);
        }
        let freedom = Freedom::check(&graphs)?;
        let preservation_failures = preservation_check(&graphs)?;

        Ok(Self {
            originals: graphs,
            full_merge,
            event_local_merges,
            freedom,
            preservation_failures,
        })
    }

    /// Replay every stored trace against the view its scope selects:
    /// Global against the full merge, EventLocal against the owning graph's
    /// event-local merge, Local against the owning graph itself. Updated
    /// pass results are stored back on the owning graph's trace.
    pub fn test_all_traces(&mut self) -> Vec<TraceOutcome> {
        let mut outcomes = Vec::new();

        for graph_index in 0..self.originals.len() {
            for trace_index in 0..self.originals[graph_index].stored_traces.len() {
                let mut trace = self.originals[graph_index].stored_traces[trace_index].clone();
                let target_name = match trace.context.scope {
                    MergeScope::Global => {
                        trace.check(&mut self.full_merge);
                        self.full_merge.name.clone()
                    }
                    MergeScope::EventLocal => {
                        trace.check(&mut self.event_local_merges[graph_index]);
                        self.event_local_merges[graph_index].name.clone()
                    }
                    MergeScope::Local => {
                        trace.check(&mut self.originals[graph_index]);
                        self.originals[graph_index].name.clone()
                    }
                };

                outcomes.push(TraceOutcome {
                    trace: trace.name.clone(),
                    graph: target_name,
                    scope: trace.context.scope,
                    passed: trace.passed,
                    accepting: trace.accepting.clone(),
                });
                self.originals[graph_index].stored_traces[trace_index] = trace;
            }
        }

        outcomes
    }

    /// Stored traces across all graphs with the given scope.
    pub fn traces_with_scope(&self, scope: MergeScope) -> Vec<&Trace> {
        self.originals
            .iter()
            .flat_map(|g| g.stored_traces.iter())
            .filter(|t| t.context.scope == scope)
            .collect()
    }
}

/// Textual concatenation of every source, re-parsed as one graph; strict
/// id lists union.
fn create_full_merge(graphs: &[DcrGraph]) -> Result<DcrGraph> {
    let mut raw = String::new();
    let mut strict = Vec::new();
    for graph in graphs {
        raw.push_str(&graph.source_text);
        raw.push_str(" \n\n ");
        strict.extend(graph.strict_activities.iter().cloned());
    }
    DcrGraph::from_text(&raw, &strict, &raw, "Full merge graph")
}

fn create_event_local_merge(graphs: &[DcrGraph], index: usize) -> Result<DcrGraph> {
    let source = &graphs[index];
    let mut merge = source.fresh_copy(&source.name)?;
    merge.stored_traces = source.stored_traces.clone();

    for (other_index, other) in graphs.iter().enumerate() {
        if other_index == index {
            continue;
        }
        merge.take_event_local_activities(other);
    }

    Ok(merge)
}

/// Pairwise transparency over the graph list. Transparent pairs fold into
/// a running known-transparent accumulator; failing pairs are recorded and
/// the accumulator carries on from the last known-transparent state.
fn preservation_check(graphs: &[DcrGraph]) -> Result<Vec<PreservationFailure>> {
    let mut failures = Vec::new();
    let Some(first) = graphs.first() else {
        return Ok(failures);
    };

    let mut safe_graph = first.clone();
    for next in &graphs[1..] {
        let forward = safe_graph.is_transparent(next)?;
        let backward = next.is_transparent(&safe_graph)?;

        if forward.is_none() && backward.is_none() {
            let raw = format!("{} \n {}", safe_graph.source_text, next.source_text);
            safe_graph = DcrGraph::from_text(&raw, &[], &raw, "MergedTestPreserved")?;
        } else {
            if let Some(violation) = forward {
                failures.push(PreservationFailure {
                    base: safe_graph.name.clone(),
                    merged: next.name.clone(),
                    violation,
                });
            }
            if let Some(violation) = backward {
                failures.push(PreservationFailure {
                    base: next.name.clone(),
                    merged: safe_graph.name.clone(),
                    violation,
                });
            }
        }
    }

    Ok(failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn graph(name: &str, raw: &str) -> DcrGraph {
        DcrGraph::from_source(raw, name).unwrap()
    }

    #[test]
    fn merging_a_graph_with_itself_is_transparent() {
        let g = graph("self", indoc! {r#"
            :"A"%"B"
            "A" -->+ "B"
            "A" -->* "B"
        "#});
        assert_eq!(g.is_transparent(&g).unwrap(), None);
    }

    #[test]
    fn changed_marking_is_reported_first() {
        let a = graph("a", "\"X\"");
        let b = graph("b", "%\"X\"");
        let violation = a.is_transparent(&b).unwrap().unwrap();
        assert_eq!(violation.activity.as_deref(), Some("X"));
    }

    #[test]
    fn new_pending_activity_is_a_violation() {
        let a = graph("a", "\"X\"");
        let b = graph("b", "!\"Y\"");
        let violation = a.is_transparent(&b).unwrap().unwrap();
        assert_eq!(violation.activity.as_deref(), Some("Y"));
    }

    #[test]
    fn new_include_from_pre_existing_activity_is_a_violation() {
        let a = graph("a", "\"X\"");
        let b = graph("b", "\"X\" -->+ \"Y\"");
        let violation = a.is_transparent(&b).unwrap().unwrap();
        let relation = violation.relation.unwrap();
        assert_eq!(relation.relation_type, RelationType::Include);
        assert_eq!(relation.from, "X");
    }

    #[test]
    fn new_exclude_into_pre_existing_activity_is_a_violation() {
        let a = graph("a", "\"X\"");
        let b = graph("b", "\"Y\" -->% \"X\"");
        let violation = a.is_transparent(&b).unwrap().unwrap();
        assert_eq!(
            violation.relation.unwrap().relation_type,
            RelationType::Exclude
        );
    }

    #[test]
    fn new_condition_from_pre_existing_activity_is_a_violation() {
        let a = graph("a", "\"X\"");
        let b = graph("b", "\"X\" -->* \"Y\"");
        assert!(a.is_transparent(&b).unwrap().is_some());
    }

    #[test]
    fn new_condition_into_pre_existing_from_safe_source_is_transparent() {
        let a = graph("a", "\"X\"");
        let b = graph("b", "\"Y\" -->* \"X\"");
        assert_eq!(a.is_transparent(&b).unwrap(), None);
    }

    #[test]
    fn disjoint_graphs_are_transparent() {
        let a = graph("a", "\"X\" -->* \"Z\"");
        let b = graph("b", "\"Y\"");
        assert_eq!(a.is_transparent(&b).unwrap(), None);
        assert_eq!(b.is_transparent(&a).unwrap(), None);
    }

    #[test]
    fn event_local_merge_ors_markings_in() {
        let mut a = graph("a", "\"X\"\"W\"");
        let b = graph("b", ":%!\"X\"");
        a.take_event_local_activities(&b);
        let x = a.activity(a.find("X").unwrap());
        assert!(x.executed && x.excluded && x.pending);
        // unshared activities stay untouched and foreign ones stay out
        let w = a.activity(a.find("W").unwrap());
        assert!(!w.executed && !w.excluded && !w.pending);
    }

    #[test]
    fn event_local_merge_splices_relations_between_shared_activities() {
        let mut a = graph("a", "\"X\"\"Y\"");
        let b = graph("b", "\"X\" -->* \"Y\"");
        a.take_event_local_activities(&b);
        let (x, y) = (a.find("X").unwrap(), a.find("Y").unwrap());
        assert!(a.has_relation(x, y, RelationType::Condition));
    }

    #[test]
    fn event_local_merge_skips_relations_to_foreign_activities() {
        let mut a = graph("a", "\"X\"");
        let b = graph("b", "\"X\" -->* \"Z\"");
        a.take_event_local_activities(&b);
        assert!(a.find("Z").is_none());
        assert!(a.relations().is_empty());
    }

    #[test]
    fn event_local_merge_never_duplicates_equal_typed_relations() {
        let mut a = graph("a", "\"X\" -->* \"Y\"");
        let b = graph("b", "\"X\" -->* \"Y\"");
        a.take_event_local_activities(&b);
        assert_eq!(a.relations().len(), 1);
    }

    #[test]
    fn full_merge_unions_activities_and_accumulates_relations() {
        let merge = GraphMerge::new(vec![
            graph("a", "\"X\" -->* \"Y\""),
            graph("b", "\"Y\" -->% \"Z\""),
        ])
        .unwrap();
        let mut names = merge.full_merge.activity_names();
        names.sort();
        assert_eq!(names, vec!["X", "Y", "Z"]);
        assert_eq!(merge.full_merge.relations().len(), 2);
    }

    #[test]
    fn failing_pair_is_recorded_and_accumulator_continues() {
        let merge = GraphMerge::new(vec![
            graph("a", "\"X\""),
            graph("b", "%\"X\""),
            graph("c", "\"Q\""),
        ])
        .unwrap();
        // merging b into a flips X's inclusion, so the pair is recorded;
        // merging a into b is absorbed by the marking union and stays
        // transparent
        assert_eq!(merge.preservation_failures.len(), 1);
        assert_eq!(merge.preservation_failures[0].base, "a");
        assert_eq!(merge.preservation_failures[0].merged, "b");
    }

    #[test]
    fn traces_route_by_scope() {
        let mut a = graph("a", "\"X\" -->* \"Y\"");
        let mut local = Trace::new("local", MergeScope::Local, false, true);
        local.record_execution("Y");
        a.stored_traces.push(local);

        let mut global = Trace::new("global", MergeScope::Global, false, true);
        global.record_execution("Z");
        a.stored_traces.push(global);

        let b = graph("b", "\"Z\"");

        let mut merge = GraphMerge::new(vec![a, b]).unwrap();
        let outcomes = merge.test_all_traces();
        assert_eq!(outcomes.len(), 2);

        let local = outcomes.iter().find(|o| o.trace == "local").unwrap();
        assert_eq!(local.graph, "a");
        assert!(local.passed);
        assert_eq!(local.accepting, vec!["X", "Y"]);

        // Z only exists in the full merge; the global scope finds it there
        let global = outcomes.iter().find(|o| o.trace == "global").unwrap();
        assert_eq!(global.graph, "Full merge graph");
        assert!(global.passed);

        // results are stored back on the owning graph
        assert!(merge.originals[0].stored_traces.iter().all(|t| t.passed));
    }
}
