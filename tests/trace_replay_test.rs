//! Trace replay behavior over the public API

use dcrcheck::{DcrGraph, GraphMerge, MergeScope, Trace};
use indoc::indoc;
use pretty_assertions::assert_eq;

fn trace_with(name: &str, scope: MergeScope, strict: bool, sequence: &[&str]) -> Trace {
    let mut trace = Trace::new(name, scope, strict, true);
    for id in sequence {
        trace.record_execution(id);
    }
    trace
}

#[test]
fn forced_execution_records_the_forcing_chain() {
    let mut graph = DcrGraph::from_source("\"A\" -->* \"B\"", "forcing").unwrap();
    let mut trace = trace_with("b only", MergeScope::Local, false, &["B"]);

    assert!(trace.check(&mut graph));
    assert_eq!(trace.accepting, vec!["A", "B"]);
    // the accepting sequence differs from the recorded one
    assert_eq!(trace.sequence, vec!["B"]);
}

#[test]
fn positive_trace_fails_when_replay_is_blocked() {
    let mut graph = DcrGraph::from_source("%\"A\"", "blocked").unwrap();
    let mut trace = trace_with("a", MergeScope::Local, false, &["A"]);

    assert!(!trace.check(&mut graph));
    assert!(!trace.passed);
    assert!(trace.accepting.is_empty());
}

#[test]
fn negative_trace_passes_when_replay_is_blocked() {
    let mut graph = DcrGraph::from_source("%\"A\"", "blocked").unwrap();
    let mut trace = Trace::new("no a", MergeScope::Local, false, false);
    trace.record_execution("A");

    assert!(trace.check(&mut graph));
    assert!(trace.passed);
}

#[test]
fn replay_is_repeatable_because_it_resets_first() {
    let mut graph = DcrGraph::from_source(
        indoc! {r#"
            "A" -->* "B"
            "B" -->% "A"
        "#},
        "repeat",
    )
    .unwrap();
    let mut trace = trace_with("seq", MergeScope::Local, false, &["A", "B"]);

    assert!(trace.check(&mut graph));
    assert!(trace.check(&mut graph));
    assert_eq!(trace.accepting, vec!["A", "B"]);
}

#[test]
fn strict_trace_cannot_borrow_foreign_activities() {
    let graph_raw = indoc! {r#"
        "Approve" -->* "Ship"
    "#};
    let mut graph = DcrGraph::from_source(graph_raw, "strictness").unwrap();

    let mut foreign = trace_with("foreign", MergeScope::Local, true, &["Ship"]);
    assert!(!foreign.check(&mut graph));

    let mut covered = trace_with("covered", MergeScope::Local, true, &["Approve", "Ship"]);
    assert!(covered.check(&mut graph));
    assert_eq!(covered.accepting, vec!["Approve", "Ship"]);
}

#[test]
fn merge_routes_each_scope_to_its_view() {
    let mut orders = DcrGraph::from_source(
        indoc! {r#"
            "Approve" -->* "Ship"
        "#},
        "orders",
    )
    .unwrap();
    let billing = DcrGraph::from_source(
        indoc! {r#"
            "Invoice" -->* "Ship"
        "#},
        "billing",
    )
    .unwrap();

    orders
        .stored_traces
        .push(trace_with("ship locally", MergeScope::Local, false, &["Ship"]));
    orders
        .stored_traces
        .push(trace_with("ship globally", MergeScope::Global, false, &["Ship"]));

    let mut merge = GraphMerge::new(vec![orders, billing]).unwrap();
    let outcomes = merge.test_all_traces();

    let local = outcomes.iter().find(|o| o.trace == "ship locally").unwrap();
    assert!(local.passed);
    assert_eq!(local.accepting, vec!["Approve", "Ship"]);

    // in the full merge, Ship is gated by both conditions
    let global = outcomes.iter().find(|o| o.trace == "ship globally").unwrap();
    assert!(global.passed);
    assert_eq!(global.accepting, vec!["Approve", "Invoice", "Ship"]);
}

#[test]
fn traces_survive_json_round_trips() {
    let trace = trace_with("persisted", MergeScope::EventLocal, true, &["A", "B"]);
    let json = serde_json::to_string_pretty(&trace).unwrap();
    let back: Trace = serde_json::from_str(&json).unwrap();
    assert_eq!(back, trace);
}
