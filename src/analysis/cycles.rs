//! Cycle detection over the incoming-relation direction
//!
//! Two independent cycle families matter downstream: Condition/Milestone
//! cycles are the structural prerequisite for deadlock risk, Response cycles
//! for livelock risk. Walks go backward along incoming edges of the chosen
//! family; a walk terminates because it never revisits an activity within
//! the same path and the activity set is finite.

use crate::core::relation::RelationType;
use crate::graph::DcrGraph;

/// Cycle walks over a graph's incoming relations.
///
/// All entry points take the set of start activities to scan (arena
/// indices) — the whole graph for freedom analysis, a dependency closure
/// for safety checks. Edges followed during a walk may leave that set.
pub struct CycleDetector;

impl CycleDetector {
    /// First Condition/Milestone cycle reachable from any start activity,
    /// as the ordered list of activities on the cycle.
    pub fn exists_condition_milestone_cycle(
        graph: &DcrGraph,
        activities: &[usize],
    ) -> Option<Vec<usize>> {
        Self::exists_cycle_filtered(graph, activities, condition_or_milestone)
    }

    /// First Response cycle reachable from any start activity.
    pub fn exists_response_cycle(graph: &DcrGraph, activities: &[usize]) -> Option<Vec<usize>> {
        Self::exists_cycle_filtered(graph, activities, response)
    }

    /// First cycle over incoming relations of any kind.
    pub fn exists_cycle(graph: &DcrGraph, activities: &[usize]) -> Option<Vec<usize>> {
        Self::exists_cycle_filtered(graph, activities, |_| true)
    }

    /// Every minimal Condition/Milestone cycle, enumerated per start
    /// activity.
    pub fn all_condition_milestone_cycles(
        graph: &DcrGraph,
        activities: &[usize],
    ) -> Vec<Vec<usize>> {
        Self::all_cycles_filtered(graph, activities, condition_or_milestone)
    }

    /// Every minimal Response cycle, enumerated per start activity.
    pub fn all_response_cycles(graph: &DcrGraph, activities: &[usize]) -> Vec<Vec<usize>> {
        Self::all_cycles_filtered(graph, activities, response)
    }

    fn exists_cycle_filtered(
        graph: &DcrGraph,
        activities: &[usize],
        filter: fn(RelationType) -> bool,
    ) -> Option<Vec<usize>> {
        for &start in activities {
            let mut path = Vec::new();
            if let Some(cycle) = Self::walk_first(graph, start, &mut path, filter) {
                return Some(cycle);
            }
        }
        None
    }

    /// Depth-first walk along incoming edges of the family. Re-hitting an
    /// activity already on the path closes a cycle; the returned cycle is
    /// the path slice from the repeat point, so a self-edge yields a
    /// length-1 cycle.
    fn walk_first(
        graph: &DcrGraph,
        current: usize,
        path: &mut Vec<usize>,
        filter: fn(RelationType) -> bool,
    ) -> Option<Vec<usize>> {
        if let Some(pos) = path.iter().position(|&a| a == current) {
            return Some(path[pos..].to_vec());
        }

        path.push(current);
        for ridx in graph.incoming_indices(current) {
            let relation = graph.relation(*ridx);
            if !filter(relation.relation_type) {
                continue;
            }
            if let Some(cycle) = Self::walk_first(graph, relation.from, path, filter) {
                return Some(cycle);
            }
        }
        path.pop();

        None
    }

    fn all_cycles_filtered(
        graph: &DcrGraph,
        activities: &[usize],
        filter: fn(RelationType) -> bool,
    ) -> Vec<Vec<usize>> {
        let mut cycles = Vec::new();
        for &start in activities {
            let mut path = Vec::new();
            Self::walk_all(graph, start, &mut path, &mut cycles, filter);
        }
        cycles
    }

    fn walk_all(
        graph: &DcrGraph,
        current: usize,
        path: &mut Vec<usize>,
        cycles: &mut Vec<Vec<usize>>,
        filter: fn(RelationType) -> bool,
    ) {
        if let Some(pos) = path.iter().position(|&a| a == current) {
            cycles.push(path[pos..].to_vec());
            return;
        }

        path.push(current);
        for ridx in graph.incoming_indices(current) {
            let relation = graph.relation(*ridx);
            if !filter(relation.relation_type) {
                continue;
            }
            Self::walk_all(graph, relation.from, path, cycles, filter);
        }
        path.pop();
    }

    /// Cycle as activity ids, for reporting.
    pub fn cycle_ids(graph: &DcrGraph, cycle: &[usize]) -> Vec<String> {
        cycle.iter().map(|&a| graph.activity(a).id.clone()).collect()
    }
}

fn condition_or_milestone(relation_type: RelationType) -> bool {
    matches!(
        relation_type,
        RelationType::Condition | RelationType::Milestone
    )
}

fn response(relation_type: RelationType) -> bool {
    relation_type == RelationType::Response
}
