//! Request path templates for relationship edges.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::table::Row;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A sub-resource path such as `courses/{id}/projects`.
///
/// Placeholders name fields of the source row. Templates are relative to the
/// API root; a leading `/` is accepted and dropped so that paths written the
/// way the API documents them (`/courses/{id}/projects`) work unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template, returning a description of the problem on failure.
    pub(crate) fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            return Err("path template is empty".to_string());
        }

        let mut segments = Vec::new();
        let mut rest = trimmed;

        while let Some(open) = rest.find('{') {
            if let Some(stray) = rest[..open].find('}') {
                return Err(format!("unmatched '}}' at offset {stray} in '{trimmed}'"));
            }
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }

            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| format!("unclosed '{{' in '{trimmed}'"))?;
            let field = after[..close].trim();
            if field.is_empty() || field.contains('{') {
                return Err(format!("empty or nested placeholder in '{trimmed}'"));
            }
            segments.push(Segment::Field(field.to_string()));
            rest = &after[close + 1..];
        }

        if rest.contains('}') {
            return Err(format!("unmatched '}}' in '{trimmed}'"));
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    /// The template text (without any leading `/`).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Field names referenced by placeholders, in order of appearance.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(f) => Some(f.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute a row's field values into the template.
    ///
    /// Values are percent-encoded. Missing, null and non-scalar values are
    /// rejected with a description of the offending field.
    pub(crate) fn render(&self, row: &Row) -> Result<String, String> {
        let mut out = String::with_capacity(self.raw.len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => {
                    let text = match row.get(field) {
                        None => return Err(format!("row has no field '{field}'")),
                        Some(Value::String(s)) => s.clone(),
                        Some(Value::Number(n)) => n.to_string(),
                        Some(Value::Bool(b)) => b.to_string(),
                        Some(Value::Null) => return Err(format!("field '{field}' is null")),
                        Some(_) => return Err(format!("field '{field}' is not a scalar")),
                    };
                    out.push_str(&urlencoding::encode(&text));
                }
            }
        }

        Ok(out)
    }
}

impl Serialize for PathTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
