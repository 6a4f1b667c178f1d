//! Textual wire format to structured intermediate format conversion
//!
//! The textual format is human-authored: quoted activity ids optionally
//! prefixed with `:` (executed), `%` (excluded) or `!` (pending), and five
//! relation arrows between quoted ids. Conversion produces the structured
//! record format consumed by [`crate::parse::structured`]: the activity
//! count, one `<executed> <included> <pending> <id>` record per activity in
//! first-mention order, then `<from> <to> <typeCode>` relation records.
//!
//! Marking prefixes accumulate by OR across mentions of the same id, so a
//! graph's export parses back to the same markings and concatenated sources
//! union their declarations.

use std::collections::HashMap;

use crate::core::errors::{GraphError, Result};
use crate::core::relation::RelationType;

#[derive(Debug)]
struct ActivityDecl {
    id: String,
    executed: bool,
    excluded: bool,
    pending: bool,
}

#[derive(Debug)]
enum Token {
    Mention {
        id: String,
        executed: bool,
        excluded: bool,
        pending: bool,
    },
    Arrow(RelationType),
}

/// Convert textual DCR source to the structured intermediate format.
pub fn to_structured(raw: &str) -> Result<String> {
    let tokens = tokenize(raw)?;

    let mut activities: Vec<ActivityDecl> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut relations: Vec<(usize, usize, u8)> = Vec::new();

    let mut last_mention: Option<usize> = None;
    let mut pending_arrow: Option<RelationType> = None;

    for token in tokens {
        match token {
            Token::Mention {
                id,
                executed,
                excluded,
                pending,
            } => {
                let idx = match index.get(&id) {
                    Some(&idx) => idx,
                    None => {
                        activities.push(ActivityDecl {
                            id: id.clone(),
                            executed: false,
                            excluded: false,
                            pending: false,
                        });
                        index.insert(id, activities.len() - 1);
                        activities.len() - 1
                    }
                };
                let decl = &mut activities[idx];
                decl.executed |= executed;
                decl.excluded |= excluded;
                decl.pending |= pending;

                if let Some(relation_type) = pending_arrow.take() {
                    // tokenize() only emits an arrow after a mention
                    let from = last_mention.expect("arrow token without source mention");
                    relations.push((from, idx, relation_type.code()));
                }
                last_mention = Some(idx);
            }
            Token::Arrow(relation_type) => {
                if last_mention.is_none() {
                    return Err(GraphError::syntax(0, "relation arrow with no source activity"));
                }
                if pending_arrow.is_some() {
                    return Err(GraphError::syntax(0, "two relation arrows in a row"));
                }
                pending_arrow = Some(relation_type);
            }
        }
    }

    if pending_arrow.is_some() {
        return Err(GraphError::syntax(
            raw.len(),
            "relation arrow with no target activity",
        ));
    }

    let mut out = String::new();
    out.push_str(&activities.len().to_string());
    for decl in &activities {
        out.push('\n');
        out.push_str(&format!(
            "{} {} {} {}",
            decl.executed as u8,
            !decl.excluded as u8,
            decl.pending as u8,
            decl.id
        ));
    }
    for (from, to, code) in &relations {
        out.push('\n');
        out.push_str(&format!("{} {} {}", from, to, code));
    }

    Ok(out)
}

const ARROWS: [(&str, RelationType); 5] = [
    ("-->+", RelationType::Include),
    ("-->%", RelationType::Exclude),
    ("-->*", RelationType::Condition),
    ("--<>", RelationType::Milestone),
    ("*-->", RelationType::Response),
];

fn tokenize(raw: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    let mut executed = false;
    let mut excluded = false;
    let mut pending = false;

    while pos < raw.len() {
        let rest = &raw[pos..];
        let c = rest.chars().next().expect("pos is on a char boundary");

        if c.is_whitespace() {
            pos += c.len_utf8();
            continue;
        }

        match c {
            ':' => {
                executed = true;
                pos += 1;
            }
            '%' => {
                excluded = true;
                pos += 1;
            }
            '!' => {
                pending = true;
                pos += 1;
            }
            '"' => {
                let end = match raw[pos + 1..].find('"') {
                    Some(offset) => pos + 1 + offset,
                    None => return Err(GraphError::syntax(pos, "unterminated activity id quote")),
                };
                let id = &raw[pos + 1..end];
                if id.is_empty() {
                    return Err(GraphError::syntax(pos, "empty activity id"));
                }
                if id.contains(',') || id.contains('\n') || id.contains('\r') {
                    return Err(GraphError::syntax(
                        pos,
                        "activity id may not contain commas or line breaks",
                    ));
                }
                if id.trim() != id {
                    return Err(GraphError::syntax(
                        pos,
                        "activity id may not start or end with whitespace",
                    ));
                }
                tokens.push(Token::Mention {
                    id: id.to_string(),
                    executed,
                    excluded,
                    pending,
                });
                executed = false;
                excluded = false;
                pending = false;
                pos = end + 1;
            }
            '-' | '*' => {
                let arrow = ARROWS
                    .iter()
                    .find(|(text, _)| rest.starts_with(text))
                    .map(|&(_, relation_type)| relation_type);
                match arrow {
                    Some(relation_type) => {
                        if executed || excluded || pending {
                            return Err(GraphError::syntax(
                                pos,
                                "marking prefix attached to a relation arrow",
                            ));
                        }
                        tokens.push(Token::Arrow(relation_type));
                        pos += 4;
                    }
                    None => {
                        let near: String = rest.chars().take(4).collect();
                        return Err(GraphError::syntax(
                            pos,
                            format!("unknown relation arrow near '{near}'"),
                        ));
                    }
                }
            }
            other => {
                return Err(GraphError::syntax(pos, format!("unexpected character '{other}'")));
            }
        }
    }

    Ok(tokens)
}
