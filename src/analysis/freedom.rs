//! Deadlock/livelock freedom analysis over a family of graphs
//!
//! The rules approximate "can the process always eventually make progress"
//! without full model checking. Reported cycles are advisory diagnostics,
//! not correctness proofs: a cycle listed here could not be proven
//! breakable, and an empty report is not an authoritative negative.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::analysis::cycles::CycleDetector;
use crate::analysis::safety::{build_dependency_closure, is_safe};
use crate::core::errors::Result;
use crate::core::relation::RelationType;
use crate::graph::DcrGraph;

/// One reported cycle, by graph name and member activity ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub graph: String,
    pub activities: Vec<String>,
}

/// Result of a freedom check: unresolved Condition/Milestone cycles as
/// deadlocks, unresolved Response (and escaping Condition/Milestone) cycles
/// as livelocks, plus the related graph showing the cross-module coupling
/// that drove the result.
#[derive(Debug)]
pub struct Freedom {
    pub deadlocks: Vec<CycleReport>,
    pub livelocks: Vec<CycleReport>,
    pub related_graph: DcrGraph,
}

impl Freedom {
    /// Run the full analysis over a family of graphs (typically a set of
    /// modules about to be merged). Graphs are inspected in their current
    /// markings; callers wanting the initial-state verdict reset first.
    pub fn check(graphs: &[DcrGraph]) -> Result<Self> {
        let related_graph = create_related_graph(graphs)?;

        let mut freedom = Self {
            deadlocks: Vec::new(),
            livelocks: Vec::new(),
            related_graph,
        };

        for graph in graphs {
            freedom.find_deadlocks(graph)?;
            freedom.find_livelocks(graph)?;
        }

        Ok(freedom)
    }

    pub fn is_free(&self) -> bool {
        self.deadlocks.is_empty() && self.livelocks.is_empty()
    }

    fn find_deadlocks(&mut self, graph: &DcrGraph) -> Result<()> {
        let indices: Vec<usize> = (0..graph.activity_count()).collect();
        let cycles = CycleDetector::all_condition_milestone_cycles(graph, &indices);
        if cycles.is_empty() {
            return Ok(());
        }

        // the graph is exempt if some included activity has only
        // Include-typed incoming relations
        let exempt = indices.iter().any(|&idx| {
            !graph.activity(idx).excluded
                && graph
                    .incoming_relations(idx)
                    .all(|r| r.relation_type == RelationType::Include)
        });
        if exempt {
            debug!("graph '{}' deadlock-exempt: free-standing included activity", graph.name);
            return Ok(());
        }

        // ... or if some safe activity cannot be excluded
        let exempt = indices.iter().any(|&idx| {
            is_safe(graph, idx, graph)
                && graph
                    .incoming_relations(idx)
                    .all(|r| r.relation_type != RelationType::Exclude)
        });
        if exempt {
            debug!("graph '{}' deadlock-exempt: unexcludable safe activity", graph.name);
            return Ok(());
        }

        for cycle in &cycles {
            let mut breakable = cycle.iter().any(|&member| {
                graph
                    .incoming_relations(member)
                    .all(|r| r.relation_type != RelationType::Include)
                    && graph.incoming_relations(member).all(|r| {
                        r.relation_type == RelationType::Exclude && is_safe(graph, r.from, graph)
                    })
            });

            if !breakable {
                breakable = cycle.iter().all(|&member| {
                    !graph.activity(member).pending
                        && graph
                            .incoming_relations(member)
                            .all(|r| r.relation_type != RelationType::Response)
                });
            }

            if !breakable {
                self.deadlocks.push(CycleReport {
                    graph: graph.name.clone(),
                    activities: CycleDetector::cycle_ids(graph, cycle),
                });
            }
        }

        Ok(())
    }

    fn find_livelocks(&mut self, graph: &DcrGraph) -> Result<()> {
        let indices: Vec<usize> = (0..graph.activity_count()).collect();
        let gating_cycles = CycleDetector::all_condition_milestone_cycles(graph, &indices);
        let response_cycles = CycleDetector::all_response_cycles(graph, &indices);

        for cycle in &gating_cycles {
            if !self.gating_cycle_resolves(graph, cycle)? {
                self.livelocks.push(CycleReport {
                    graph: graph.name.clone(),
                    activities: CycleDetector::cycle_ids(graph, cycle),
                });
            }
        }

        for cycle in &response_cycles {
            if !response_cycle_resolves(graph, cycle) {
                self.livelocks.push(CycleReport {
                    graph: graph.name.clone(),
                    activities: CycleDetector::cycle_ids(graph, cycle),
                });
            }
        }

        Ok(())
    }

    /// A Condition/Milestone cycle resolves when no pending obligation can
    /// be trapped in it: either nothing in the cycle is (or can become)
    /// pending and the cycle has no gating escape edge to other activities,
    /// or every trapped member is excluded or reachably excluded by a safe
    /// excluder.
    fn gating_cycle_resolves(&self, graph: &DcrGraph, cycle: &[usize]) -> Result<bool> {
        let never_pending = cycle.iter().all(|&member| {
            !graph.activity(member).pending
                && graph
                    .incoming_relations(member)
                    .all(|r| r.relation_type != RelationType::Response)
        });

        if never_pending {
            let escapes = cycle.iter().any(|&member| {
                graph.outgoing_relations(member).any(|r| {
                    matches!(
                        r.relation_type,
                        RelationType::Condition | RelationType::Milestone
                    ) && r.to != r.from
                })
            });
            return Ok(!escapes);
        }

        let possibly_pending: Vec<usize> = cycle
            .iter()
            .copied()
            .filter(|&member| {
                graph.activity(member).pending
                    || graph
                        .incoming_relations(member)
                        .any(|r| r.relation_type == RelationType::Response)
            })
            .collect();

        for member in possibly_pending {
            if !self.member_reachably_excluded(graph, member)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Whether a trapped member is excluded already, or some safe excluder
    /// can fire to exclude it. Excluders are judged in a copy of the graph
    /// with their exclude edge onto the member removed, so the member under
    /// test does not taint its own excluder's safety.
    fn member_reachably_excluded(&self, graph: &DcrGraph, member: usize) -> Result<bool> {
        if graph.activity(member).excluded {
            return Ok(true);
        }

        let member_id = graph.activity(member).id.clone();
        let mut probe = graph.fresh_copy(&graph.name)?;

        let excluders: Vec<usize> = (0..probe.activity_count())
            .filter(|&idx| {
                probe.outgoing_relations(idx).any(|r| {
                    r.relation_type == RelationType::Exclude
                        && probe.activity(r.to).id == member_id
                })
            })
            .collect();

        let mut doomed: Vec<usize> = Vec::new();
        for &excluder in &excluders {
            let first_exclude = probe.outgoing_indices(excluder).iter().copied().find(|&r| {
                let relation = probe.relation(r);
                relation.relation_type == RelationType::Exclude
                    && probe.activity(relation.to).id == member_id
            });
            if let Some(ridx) = first_exclude {
                doomed.push(ridx);
            }
        }
        doomed.sort_unstable();
        for ridx in doomed.into_iter().rev() {
            probe.remove_relation(ridx);
        }

        let any_safe_excluder = excluders.iter().any(|&excluder| {
            is_safe(&probe, excluder, &probe)
                && probe
                    .incoming_relations(excluder)
                    .all(|r| r.relation_type != RelationType::Exclude)
        });

        Ok(any_safe_excluder)
    }
}

/// A Response cycle resolves when every member is safe, or some member is
/// excluded (or reachably excluded by a safe unexcludable excluder) and
/// cannot be re-included.
fn response_cycle_resolves(graph: &DcrGraph, cycle: &[usize]) -> bool {
    if cycle.iter().all(|&member| is_safe(graph, member, graph)) {
        return true;
    }

    cycle.iter().any(|&member| {
        let activity = graph.activity(member);
        let safe_excluder = graph.incoming_relations(member).any(|r| {
            r.relation_type == RelationType::Exclude
                && is_safe(graph, r.from, graph)
                && graph
                    .incoming_relations(r.from)
                    .all(|z| z.relation_type != RelationType::Exclude)
        });
        let never_reincluded = graph
            .incoming_relations(member)
            .all(|r| r.relation_type != RelationType::Include);
        activity.excluded || (safe_excluder && never_reincluded)
    })
}

/// The related graph: the full textual merge of all inputs, restricted to
/// activities shared by at least two graphs plus their dependency closures.
fn create_related_graph(graphs: &[DcrGraph]) -> Result<DcrGraph> {
    let mut shared_ids: Vec<String> = Vec::new();
    for graph in graphs {
        for activity in graph.activities() {
            if shared_ids.contains(&activity.id) {
                continue;
            }
            let elsewhere = graphs
                .iter()
                .any(|other| other.name != graph.name && other.find(&activity.id).is_some());
            if elsewhere {
                shared_ids.push(activity.id.clone());
            }
        }
    }

    let merged_text: Vec<&str> = graphs.iter().map(|g| g.source_text.as_str()).collect();
    let merged_text = merged_text.join(" \n ");
    let merged = DcrGraph::from_source(&merged_text, "RelatedGraph")?;

    // shared activities plus their full dependency closures
    let mut kept: Vec<usize> = shared_ids.iter().filter_map(|id| merged.find(id)).collect();
    let mut cursor = 0;
    while cursor < kept.len() {
        for dependency in build_dependency_closure(&merged, kept[cursor]) {
            if !kept.contains(&dependency) {
                kept.push(dependency);
            }
        }
        cursor += 1;
    }

    // re-export only the kept activities and the relations fully inside the
    // kept set, then reparse
    let mut restricted = String::new();
    for (idx, activity) in merged.activities().iter().enumerate() {
        if kept.contains(&idx) {
            restricted.push_str(&activity.export_text());
            restricted.push('\n');
        }
    }
    for relation in merged.relations() {
        if kept.contains(&relation.from) && kept.contains(&relation.to) {
            restricted.push_str(&merged.export_relation(relation));
            restricted.push('\n');
        }
    }

    DcrGraph::from_source(&restricted, "RelatedGraph")
}
