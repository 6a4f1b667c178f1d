//! The DCR graph arena and its execution engine
//!
//! Activities and relations live in owning vectors; relations address their
//! endpoints by index. Incoming and outgoing relation-index lists are built
//! once after parsing and are touched afterwards only by merge splicing.

use std::collections::HashMap;

use log::debug;

use crate::core::activity::{Activity, ActivityState};
use crate::core::errors::{GraphError, Result};
use crate::core::relation::{Relation, RelationType};
use crate::parse::{structured, text};
use crate::trace::Trace;

/// One process model: the full set of activities and relations, the source
/// text it was parsed from, and the traces recorded against it.
#[derive(Debug, Clone)]
pub struct DcrGraph {
    activities: Vec<Activity>,
    relations: Vec<Relation>,
    incoming: Vec<Vec<usize>>,
    outgoing: Vec<Vec<usize>>,
    index: HashMap<String, usize>,
    initial_states: Vec<ActivityState>,
    pub name: String,
    pub source_text: String,
    pub strict_activities: Vec<String>,
    pub stored_traces: Vec<Trace>,
}

impl DcrGraph {
    /// Parse a graph from textual DCR source. `source_text` is kept for
    /// re-instantiation (reachability probes, merges); it usually equals
    /// `raw` but may be the editor's version of an exported graph.
    pub fn from_text(
        raw: &str,
        strict_activities: &[String],
        source_text: &str,
        name: &str,
    ) -> Result<Self> {
        let structured = text::to_structured(raw)?;
        Self::from_structured(&structured, strict_activities, source_text, name)
    }

    /// Parse a graph from the structured intermediate format.
    pub fn from_structured(
        structured: &str,
        strict_activities: &[String],
        source_text: &str,
        name: &str,
    ) -> Result<Self> {
        let parsed = structured::parse(structured)?;

        let mut graph = Self {
            activities: parsed.activities,
            relations: parsed.relations,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            index: HashMap::new(),
            initial_states: Vec::new(),
            name: name.to_string(),
            source_text: source_text.to_string(),
            strict_activities: strict_activities.to_vec(),
            stored_traces: Vec::new(),
        };

        for (idx, activity) in graph.activities.iter().enumerate() {
            graph.index.insert(activity.id.clone(), idx);
        }
        for id in strict_activities {
            if let Some(&idx) = graph.index.get(id) {
                graph.activities[idx].strict = true;
            }
        }
        graph.initial_states = graph.activities.iter().map(Activity::state).collect();
        graph.rebuild_indexes();

        Ok(graph)
    }

    /// Convenience constructor for a graph whose source text is the raw
    /// input itself.
    pub fn from_source(raw: &str, name: &str) -> Result<Self> {
        Self::from_text(raw, &[], raw, name)
    }

    /// A fresh copy re-parsed from this graph's source text, with initial
    /// markings regardless of what has been executed here.
    pub fn fresh_copy(&self, name: &str) -> Result<Self> {
        Self::from_text(&self.source_text, &self.strict_activities, &self.source_text, name)
    }

    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn activity(&self, idx: usize) -> &Activity {
        &self.activities[idx]
    }

    pub(crate) fn activity_mut(&mut self, idx: usize) -> &mut Activity {
        &mut self.activities[idx]
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn relation(&self, ridx: usize) -> &Relation {
        &self.relations[ridx]
    }

    /// Arena index of an activity id.
    pub fn find(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn activity_names(&self) -> Vec<String> {
        self.activities.iter().map(|a| a.id.clone()).collect()
    }

    pub fn executable_activity_names(&self) -> Vec<String> {
        (0..self.activities.len())
            .filter(|&idx| self.is_executable(idx))
            .map(|idx| self.activities[idx].id.clone())
            .collect()
    }

    /// Relation-arena indices of the relations targeting `idx`.
    pub fn incoming_indices(&self, idx: usize) -> &[usize] {
        &self.incoming[idx]
    }

    /// Relation-arena indices of the relations sourced at `idx`.
    pub fn outgoing_indices(&self, idx: usize) -> &[usize] {
        &self.outgoing[idx]
    }

    pub fn incoming_relations(&self, idx: usize) -> impl Iterator<Item = &Relation> {
        self.incoming[idx].iter().map(|&r| &self.relations[r])
    }

    pub fn outgoing_relations(&self, idx: usize) -> impl Iterator<Item = &Relation> {
        self.outgoing[idx].iter().map(|&r| &self.relations[r])
    }

    /// Whether a relation with this exact `(from, to, type)` triple exists.
    pub fn has_relation(&self, from: usize, to: usize, relation_type: RelationType) -> bool {
        self.outgoing[from]
            .iter()
            .any(|&r| self.relations[r].to == to && self.relations[r].relation_type == relation_type)
    }

    /// Splice in a relation, maintaining both index lists. Used by merge
    /// operations only; parsing builds the arena wholesale.
    pub fn add_relation(&mut self, from: usize, to: usize, relation_type: RelationType) {
        let ridx = self.relations.len();
        self.relations.push(Relation::new(from, to, relation_type));
        self.outgoing[from].push(ridx);
        self.incoming[to].push(ridx);
    }

    /// Remove a relation by arena index. Indices shift, so the lookup lists
    /// are rebuilt.
    pub fn remove_relation(&mut self, ridx: usize) {
        self.relations.remove(ridx);
        self.rebuild_indexes();
    }

    /// An activity may fire iff it is included and no incoming relation's
    /// source is in a blocking state for that relation's kind.
    pub fn is_executable(&self, idx: usize) -> bool {
        if self.activities[idx].excluded {
            return false;
        }
        self.incoming[idx].iter().all(|&r| {
            let relation = &self.relations[r];
            !self.activities[relation.from].is_blocking(relation.relation_type)
        })
    }

    /// Fire an activity. Returns false with no side effects when it is not
    /// executable; otherwise marks it executed, clears pending, and applies
    /// every outgoing relation's effect on its target.
    pub fn execute(&mut self, idx: usize) -> bool {
        if !self.is_executable(idx) {
            return false;
        }

        let activity = &mut self.activities[idx];
        activity.executed = true;
        activity.execution_count += 1;
        activity.pending = false;
        debug!("executed '{}' in graph '{}'", activity.id, self.name);

        let effects: Vec<(usize, RelationType)> = self.outgoing[idx]
            .iter()
            .map(|&r| (self.relations[r].to, self.relations[r].relation_type))
            .collect();
        for (to, relation_type) in effects {
            self.activities[to].apply_effect(relation_type);
        }

        true
    }

    /// Fire an activity by id. An unknown id is a reference error carrying
    /// the known-id snapshot.
    pub fn execute_by_id(&mut self, id: &str) -> Result<bool> {
        match self.find(id) {
            Some(idx) => Ok(self.execute(idx)),
            None => Err(GraphError::unknown_activity(id, self.activity_names())),
        }
    }

    /// Restore every activity's parse-time markings. Idempotent.
    pub fn reset_graph_state(&mut self) {
        for (activity, state) in self.activities.iter_mut().zip(&self.initial_states) {
            activity.reset(*state);
        }
    }

    /// No activity is pending. Exclusion is deliberately not consulted: a
    /// pending-but-excluded activity still blocks acceptance.
    pub fn is_accepting(&self) -> bool {
        !self.activities.iter().any(|a| a.pending)
    }

    /// Serialize markings and relations to the textual wire format.
    pub fn export_text(&self) -> String {
        let mut out = String::new();
        for activity in &self.activities {
            out.push_str(&activity.export_text());
            out.push('\n');
        }
        for relation in &self.relations {
            out.push_str(&self.export_relation(relation));
            out.push('\n');
        }
        out
    }

    /// One relation in the textual wire format.
    pub fn export_relation(&self, relation: &Relation) -> String {
        format!(
            "\"{}\" {} \"{}\"",
            self.activities[relation.from].id,
            relation.relation_type.arrow(),
            self.activities[relation.to].id
        )
    }

    fn rebuild_indexes(&mut self) {
        self.incoming = vec![Vec::new(); self.activities.len()];
        self.outgoing = vec![Vec::new(); self.activities.len()];
        for (ridx, relation) in self.relations.iter().enumerate() {
            self.outgoing[relation.from].push(ridx);
            self.incoming[relation.to].push(ridx);
        }
    }
}
