//! Output formatting for CLI display.
//!
//! Provides the [`PrettyPrint`] trait for human-readable tables
//! as an alternative to JSON serialization.

use serde_json::Value;
use tabled::builder::Builder;
use tabled::{Table, Tabled};

use crate::dispatch::Invocation;
use crate::registry::{Cardinality, Registry};
use crate::table::Column;
use crate::RowCollection;

/// Trait for human-readable output.
///
/// Implemented by collection types to provide formatted output
/// suitable for terminal display when `--json` is not specified.
pub trait PrettyPrint {
    /// Returns a formatted string for terminal display.
    fn pretty_print(&self) -> String;
}

/// Render a cell. Strings print without quotes; absent and null cells are
/// blank.
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

impl PrettyPrint for RowCollection {
    fn pretty_print(&self) -> String {
        let footer = format!("{} {} row(s)", self.len(), self.kind_name());
        if self.is_empty() {
            return footer;
        }

        let mut builder = Builder::default();
        builder.push_record(self.columns().iter().cloned());
        for row in self.rows() {
            builder.push_record(self.columns().iter().map(|c| cell(row.get(c))));
        }

        format!("{}\n\n{}", builder.build(), footer)
    }
}

impl PrettyPrint for Column {
    fn pretty_print(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record([self.name.clone()]);
        for value in &self.values {
            builder.push_record([cell(value.as_ref())]);
        }

        format!(
            "{}\n\n{} value(s), {} absent",
            builder.build(),
            self.len(),
            self.absent_count()
        )
    }
}

impl PrettyPrint for Invocation {
    fn pretty_print(&self) -> String {
        match self {
            Invocation::Related(collection) => collection.pretty_print(),
            Invocation::Column(column) => column.pretty_print(),
        }
    }
}

#[derive(Tabled)]
struct KindRow {
    kind: String,
    root: String,
    fields: String,
    relationships: String,
}

impl PrettyPrint for Registry {
    fn pretty_print(&self) -> String {
        let rows: Vec<KindRow> = self
            .kinds()
            .map(|kind| KindRow {
                kind: kind.name().to_string(),
                root: kind.root().unwrap_or_default().to_string(),
                fields: kind.fields().join(", "),
                relationships: kind
                    .edges()
                    .map(|e| {
                        let arrow = match e.cardinality() {
                            Cardinality::One => "->",
                            Cardinality::Many => "->>",
                        };
                        format!("{} {arrow} {}", e.name(), e.target_kind())
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            })
            .collect();

        Table::new(rows).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn courses() -> RowCollection {
        let kind = Registry::ces().lookup("Course").unwrap().clone();
        RowCollection::from_values(
            kind,
            vec![
                json!({"id": 1, "name": "Algebra"}),
                json!({"id": 2, "name": null, "code": "BIO-101"}),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_collection_pretty_print() {
        let output = courses().pretty_print();
        assert!(output.contains("Algebra"));
        assert!(output.contains("BIO-101"));
        assert!(output.contains("code"));
        assert!(!output.contains("null"));
        assert!(output.ends_with("2 Course row(s)"));
    }

    #[test]
    fn test_empty_collection_pretty_print() {
        let kind = Registry::ces().lookup("Term").unwrap().clone();
        assert_eq!(RowCollection::empty(kind).pretty_print(), "0 Term row(s)");
    }

    #[test]
    fn test_column_pretty_print() {
        let column = courses().project("code").unwrap();
        let output = column.pretty_print();
        assert!(output.contains("BIO-101"));
        assert!(output.ends_with("2 value(s), 1 absent"));
    }

    #[test]
    fn test_registry_pretty_print() {
        let output = Registry::ces().pretty_print();
        assert!(output.contains("Course"));
        assert!(output.contains("projects ->> Project"));
    }
}
