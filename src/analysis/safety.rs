//! Safety analysis: is an activity's backward dependency closure
//! independently controllable?
//!
//! The test is conservative by design — it never claims safety for a
//! structure it cannot prove (full reachability checking in this model is
//! NP-hard-adjacent), so a `false` here is "unproven", not "unsafe".

use std::collections::HashSet;

use log::warn;

use crate::analysis::cycles::CycleDetector;
use crate::core::relation::RelationType;
use crate::graph::DcrGraph;
use crate::trace::replay::{self, ReplaySession};

/// Transitive closure over incoming Condition, Milestone and Response
/// edges, starting activity first, in discovery order.
pub fn build_dependency_closure(graph: &DcrGraph, start: usize) -> Vec<usize> {
    let mut closure = vec![start];
    collect_dependencies(graph, start, &mut closure);
    closure
}

fn collect_dependencies(graph: &DcrGraph, current: usize, closure: &mut Vec<usize>) {
    for ridx in graph.incoming_indices(current) {
        let relation = graph.relation(*ridx);
        let gating = matches!(
            relation.relation_type,
            RelationType::Condition | RelationType::Milestone | RelationType::Response
        );
        if gating && !closure.contains(&relation.from) {
            closure.push(relation.from);
            collect_dependencies(graph, relation.from, closure);
        }
    }
}

/// Whether the activity's dependency closure is acyclic, free of marking
/// side effects between members, and has every gating edge operationally
/// reachable in a fresh instance of `reference`.
pub fn is_safe(graph: &DcrGraph, idx: usize, reference: &DcrGraph) -> bool {
    let closure = build_dependency_closure(graph, idx);

    if CycleDetector::exists_condition_milestone_cycle(graph, &closure).is_some() {
        return false;
    }
    if CycleDetector::exists_response_cycle(graph, &closure).is_some() {
        return false;
    }

    let members: HashSet<usize> = closure.iter().copied().collect();

    // no Include/Exclude/Response side effect onto another closure member
    for &member in &closure {
        for relation in graph.outgoing_relations(member) {
            let side_effect = matches!(
                relation.relation_type,
                RelationType::Include | RelationType::Exclude | RelationType::Response
            );
            if side_effect && relation.to != member && members.contains(&relation.to) {
                return false;
            }
        }
    }

    // every gating edge sourced in the closure must be operationally
    // reachable: in a fresh copy of the reference graph, the source and
    // then the target must both be forceable
    for &member in &closure {
        for relation in graph.outgoing_relations(member) {
            let gating = matches!(
                relation.relation_type,
                RelationType::Condition | RelationType::Milestone
            );
            if gating
                && !reachable_from_to(
                    &graph.activity(relation.from).id,
                    &graph.activity(relation.to).id,
                    reference,
                )
            {
                return false;
            }
        }
    }

    true
}

/// Operational reachability probe: instantiate the reference graph from
/// scratch, force-execute `from`, then force-execute `to`.
fn reachable_from_to(from_id: &str, to_id: &str, reference: &DcrGraph) -> bool {
    let mut probe = match reference.fresh_copy(&reference.name) {
        Ok(probe) => probe,
        Err(err) => {
            warn!("reachability probe could not re-instantiate '{}': {err}", reference.name);
            return false;
        }
    };

    let (Some(from), Some(to)) = (probe.find(from_id), probe.find(to_id)) else {
        return false;
    };

    let mut session = ReplaySession::new(HashSet::new());
    if !replay::try_execute(&mut probe, from, &mut session, false) {
        return false;
    }
    replay::try_execute(&mut probe, to, &mut session, false)
}
