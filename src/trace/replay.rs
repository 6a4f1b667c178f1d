//! Trace replay with forced execution
//!
//! Replay drives the recorded sequence through the live execution engine.
//! When a requested event is not executable, the replayer backward-chains:
//! it forces the activity included, then discharges each blocking
//! Condition/Milestone source by executing it, excluding it, or recursively
//! forcing it. A re-entrancy stack bounds the recursion on cyclic
//! dependency chains, and a forbidden set keeps forcing hops away from
//! activities foreign to the trace's context. Only the top-level requested
//! event is exempt from the forbidden check.
//!
//! A replay that cannot complete is a normal outcome, reported through the
//! trace's pass/fail status — never an error.

use std::collections::HashSet;

use log::debug;

use crate::core::relation::RelationType;
use crate::graph::DcrGraph;

use super::Trace;

/// Per-replay state: the forbidden set, the re-entrancy guard, and the
/// sequence of events that actually fired (forced chains included).
///
/// One session spans one top-level replay; independent callers analyzing
/// different graphs never share state.
#[derive(Debug, Default)]
pub struct ReplaySession {
    forbidden: HashSet<String>,
    in_progress: Vec<usize>,
    pub executed: Vec<String>,
}

impl ReplaySession {
    pub fn new(forbidden: HashSet<String>) -> Self {
        Self {
            forbidden,
            in_progress: Vec::new(),
            executed: Vec::new(),
        }
    }
}

/// Replay a trace's recorded sequence against a graph, resetting it first.
/// On success the trace's accepting sequence is the concrete sequence that
/// fired; on failure it stays empty.
pub fn check_trace(trace: &mut Trace, graph: &mut DcrGraph) -> bool {
    graph.reset_graph_state();
    trace.accepting.clear();

    let mut session = ReplaySession::new(forbidden_set(trace, graph));

    for id in &trace.sequence {
        let Some(idx) = graph.find(id) else {
            debug!("trace '{}': unknown activity '{id}'", trace.name);
            return false;
        };
        if !try_execute(graph, idx, &mut session, true) {
            debug!("trace '{}': could not fire '{id}'", trace.name);
            return false;
        }
    }

    trace.accepting = session.executed;
    true
}

/// The activities a forcing chain may not fire: under a strict context,
/// everything not appearing verbatim in the recorded sequence; otherwise
/// the explicitly tagged context activities plus the graph's strict ids.
fn forbidden_set(trace: &Trace, graph: &DcrGraph) -> HashSet<String> {
    if trace.context.strict {
        graph
            .activity_names()
            .into_iter()
            .filter(|name| !trace.sequence.contains(name))
            .collect()
    } else {
        let mut forbidden = trace.context.activities.clone();
        forbidden.extend(graph.strict_activities.iter().cloned());
        forbidden
    }
}

/// Fire an activity, forcing it executable first if needed. `requested`
/// marks the top-level event the trace asked for, which skips the
/// forbidden check; every upstream forcing hop passes `false`.
pub fn try_execute(
    graph: &mut DcrGraph,
    idx: usize,
    session: &mut ReplaySession,
    requested: bool,
) -> bool {
    if !requested && session.forbidden.contains(&graph.activity(idx).id) {
        return false;
    }
    if execute_recorded(graph, idx, session) {
        return true;
    }
    try_make_executable(graph, idx, session);
    execute_recorded(graph, idx, session)
}

fn execute_recorded(graph: &mut DcrGraph, idx: usize, session: &mut ReplaySession) -> bool {
    if graph.execute(idx) {
        session.executed.push(graph.activity(idx).id.clone());
        true
    } else {
        false
    }
}

/// Backward-chain toward executability: include if excluded, then discharge
/// each blocking gating source. An activity already being forced higher up
/// the chain is skipped.
fn try_make_executable(graph: &mut DcrGraph, idx: usize, session: &mut ReplaySession) {
    if session.in_progress.contains(&idx) {
        return;
    }
    session.in_progress.push(idx);

    if graph.activity(idx).excluded {
        try_include(graph, idx, session);
        if graph.activity(idx).excluded {
            session.in_progress.pop();
            return;
        }
    }

    if !graph.is_executable(idx) {
        let blockers: Vec<(usize, RelationType)> = graph
            .incoming_relations(idx)
            .filter(|r| {
                matches!(
                    r.relation_type,
                    RelationType::Condition | RelationType::Milestone
                )
            })
            .map(|r| (r.from, r.relation_type))
            .collect();
        for (source, relation_type) in blockers {
            try_discharge(graph, source, relation_type, session);
        }
    }

    session.in_progress.pop();
}

/// Stop a gating source from blocking: execute it, failing that exclude
/// it, failing that force it executable and try once more.
fn try_discharge(
    graph: &mut DcrGraph,
    source: usize,
    relation_type: RelationType,
    session: &mut ReplaySession,
) {
    if !graph.activity(source).is_blocking(relation_type) {
        return;
    }
    try_execute(graph, source, session, false);
    if !graph.activity(source).is_blocking(relation_type) {
        return;
    }
    try_exclude(graph, source, session);
    if !graph.activity(source).is_blocking(relation_type) {
        return;
    }
    try_make_executable(graph, source, session);
    try_execute(graph, source, session, false);
}

fn try_exclude(graph: &mut DcrGraph, idx: usize, session: &mut ReplaySession) {
    if graph.activity(idx).excluded {
        return;
    }
    let sources: Vec<usize> = graph
        .incoming_relations(idx)
        .filter(|r| r.relation_type == RelationType::Exclude)
        .map(|r| r.from)
        .collect();
    for source in sources {
        try_execute(graph, source, session, false);
        if graph.activity(idx).excluded {
            return;
        }
    }
}

fn try_include(graph: &mut DcrGraph, idx: usize, session: &mut ReplaySession) {
    if !graph.activity(idx).excluded {
        return;
    }
    let sources: Vec<usize> = graph
        .incoming_relations(idx)
        .filter(|r| r.relation_type == RelationType::Include)
        .map(|r| r.from)
        .collect();
    for source in sources {
        try_execute(graph, source, session, false);
        if !graph.activity(idx).excluded {
            return;
        }
    }
}
