//! Structured intermediate format parsing
//!
//! Record stream: the activity count, then one activity record per declared
//! activity (`<0|1> <0|1> <0|1> <id>` — executed, included, pending), then
//! relation records (`<fromIndex> <toIndex> <typeCode>`) whose indices
//! reference the just-declared activity order. Records are separated by
//! commas or line breaks. Any malformed record aborts the parse with the
//! offending raw record.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::core::activity::Activity;
use crate::core::errors::{GraphError, Result};
use crate::core::relation::{Relation, RelationType};

/// Activities and relations decoded from one structured record stream.
#[derive(Debug, Default)]
pub struct ParsedGraph {
    pub activities: Vec<Activity>,
    pub relations: Vec<Relation>,
}

fn activity_record_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+) (\d+) (\d+) (.+)$").expect("activity record regex"))
}

/// Parse a structured record stream into activities and relations.
pub fn parse(structured: &str) -> Result<ParsedGraph> {
    let records: Vec<&str> = structured
        .split(|c| c == ',' || c == '\n' || c == '\r')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .collect();

    let Some(count_record) = records.first() else {
        return Ok(ParsedGraph::default());
    };
    let declared: usize = count_record.parse().map_err(|_| {
        GraphError::syntax(0, format!("invalid activity count record: {count_record}"))
    })?;

    if declared == 0 {
        return Ok(ParsedGraph::default());
    }
    if records.len() < declared + 1 {
        return Err(GraphError::syntax(
            0,
            format!(
                "expected {} activity records, found {}",
                declared,
                records.len() - 1
            ),
        ));
    }

    let mut parsed = ParsedGraph::default();
    let mut index: HashMap<String, usize> = HashMap::new();
    // record position -> canonical activity index, so relation records keep
    // working when duplicate declarations collapse
    let mut record_map: Vec<usize> = Vec::with_capacity(declared);

    for record in &records[1..=declared] {
        let activity = parse_activity_record(record)?;
        match index.get(&activity.id) {
            Some(&existing) => {
                let merged = &mut parsed.activities[existing];
                merged.executed |= activity.executed;
                merged.excluded |= activity.excluded;
                merged.pending |= activity.pending;
                if merged.executed && merged.execution_count == 0 {
                    merged.execution_count = 1;
                }
                record_map.push(existing);
            }
            None => {
                index.insert(activity.id.clone(), parsed.activities.len());
                record_map.push(parsed.activities.len());
                parsed.activities.push(activity);
            }
        }
    }

    for record in &records[declared + 1..] {
        let relation = parse_relation_record(record, &record_map)?;
        parsed.relations.push(relation);
    }

    Ok(parsed)
}

fn parse_activity_record(record: &str) -> Result<Activity> {
    let Some(captures) = activity_record_regex().captures(record) else {
        return Err(GraphError::InvalidActivityRecord {
            record: record.to_string(),
        });
    };

    let executed: i64 = captures[1].parse().map_err(|_| GraphError::InvalidMarking {
        record: record.to_string(),
    })?;
    let included: i64 = captures[2].parse().map_err(|_| GraphError::InvalidMarking {
        record: record.to_string(),
    })?;
    let pending: i64 = captures[3].parse().map_err(|_| GraphError::InvalidMarking {
        record: record.to_string(),
    })?;

    Activity::new(executed, included, pending, &captures[4], record)
}

fn parse_relation_record(record: &str, record_map: &[usize]) -> Result<Relation> {
    let fields: Vec<&str> = record.split(' ').collect();
    if fields.len() != 3 {
        return Err(GraphError::InvalidRelationRecord {
            record: record.to_string(),
        });
    }

    let from: i64 = parse_relation_field(fields[0], record)?;
    let to: i64 = parse_relation_field(fields[1], record)?;
    let code: i64 = parse_relation_field(fields[2], record)?;

    let from = resolve_index(from, record_map, record)?;
    let to = resolve_index(to, record_map, record)?;
    let relation_type = RelationType::from_code(code, record)?;

    Ok(Relation::new(from, to, relation_type))
}

fn parse_relation_field(field: &str, record: &str) -> Result<i64> {
    field.parse().map_err(|_| GraphError::InvalidRelationRecord {
        record: record.to_string(),
    })
}

fn resolve_index(index: i64, record_map: &[usize], record: &str) -> Result<usize> {
    if index < 0 || index as usize >= record_map.len() {
        return Err(GraphError::ActivityIndexOutOfRange {
            index: index.max(0) as usize,
            count: record_map.len(),
            record: record.to_string(),
        });
    }
    Ok(record_map[index as usize])
}
