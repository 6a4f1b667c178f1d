//! Merge views and behavior-preservation checking

use dcrcheck::{DcrGraph, GraphMerge, RelationType};
use indoc::indoc;
use pretty_assertions::assert_eq;

fn graph(name: &str, raw: &str) -> DcrGraph {
    DcrGraph::from_source(raw, name).unwrap()
}

#[test]
fn merging_a_graph_with_itself_is_transparent() {
    let g = graph(
        "orders",
        indoc! {r#"
            :"Approve"%"Cancel"!"Ship"
            "Approve" -->* "Ship"
            "Approve" -->% "Cancel"
            "Ship" *--> "Approve"
            "Cancel" --<> "Ship"
        "#},
    );
    assert_eq!(g.is_transparent(&g).unwrap(), None);
}

#[test]
fn full_merge_unions_duplicate_activities() {
    let merge = GraphMerge::new(vec![
        graph("left", ":\"Shared\" \"Only left\""),
        graph("right", "%\"Shared\" \"Only right\""),
    ])
    .unwrap();

    let full = &merge.full_merge;
    assert_eq!(full.activity_count(), 3);
    let shared = full.activity(full.find("Shared").unwrap());
    assert!(shared.executed);
    assert!(shared.excluded);
}

#[test]
fn event_local_merge_only_touches_shared_activities() {
    let merge = GraphMerge::new(vec![
        graph("left", "\"Shared\"\"Private\""),
        graph("right", ":\"Shared\" \"Shared\" -->* \"Foreign\""),
    ])
    .unwrap();

    let local = &merge.event_local_merges[0];
    // shared markings OR'd in, foreign activities and their relations not
    assert!(local.activity(local.find("Shared").unwrap()).executed);
    assert!(local.find("Foreign").is_none());
    assert!(local.relations().is_empty());
    assert!(local.find("Private").is_some());
}

#[test]
fn event_local_merge_splices_shared_relations_once() {
    let merge = GraphMerge::new(vec![
        graph("left", "\"A\"\"B\""),
        graph("right", "\"A\" -->* \"B\""),
        graph("other", "\"A\" -->* \"B\""),
    ])
    .unwrap();

    let local = &merge.event_local_merges[0];
    let (a, b) = (local.find("A").unwrap(), local.find("B").unwrap());
    assert!(local.has_relation(a, b, RelationType::Condition));
    assert_eq!(local.relations().len(), 1);
}

#[test]
fn marking_flip_breaks_transparency() {
    let a = graph("a", "\"X\"");
    let b = graph("b", "%\"X\"");
    let violation = a.is_transparent(&b).unwrap().unwrap();
    assert_eq!(violation.activity.as_deref(), Some("X"));
}

#[test]
fn new_response_from_pre_existing_activity_breaks_transparency() {
    let a = graph("a", "\"X\"");
    let b = graph("b", "\"X\" *--> \"Y\"");
    let violation = a.is_transparent(&b).unwrap().unwrap();
    let relation = violation.relation.unwrap();
    assert_eq!(relation.relation_type, RelationType::Response);
    assert_eq!(relation.from, "X");
    assert_eq!(relation.to, "Y");
}

#[test]
fn safe_new_condition_into_pre_existing_activity_is_transparent() {
    let a = graph("a", "\"X\"");
    let b = graph("b", "\"New\" -->* \"X\"");
    assert_eq!(a.is_transparent(&b).unwrap(), None);
}

#[test]
fn unsafe_new_condition_into_pre_existing_activity_breaks_transparency() {
    let a = graph("a", "\"X\"");
    // the new condition source sits on a gating cycle, so it is not safe
    let b = graph(
        "b",
        indoc! {r#"
            "New" -->* "X"
            "New" -->* "Other"
            "Other" -->* "New"
        "#},
    );
    let violation = a.is_transparent(&b).unwrap().unwrap();
    assert_eq!(
        violation.relation.unwrap().relation_type,
        RelationType::Condition
    );
}

#[test]
fn failing_pairs_are_recorded_while_the_accumulator_continues() {
    let merge = GraphMerge::new(vec![
        graph("a", "\"X\""),
        graph("b", "%\"X\""),
        graph("c", "\"X\""),
    ])
    .unwrap();

    // a|b is recorded; c is then tested against the untouched a and passes
    assert_eq!(merge.preservation_failures.len(), 1);
    assert_eq!(merge.preservation_failures[0].base, "a");
    assert_eq!(merge.preservation_failures[0].merged, "b");
}
