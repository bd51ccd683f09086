//! Ordered columnar row storage.
//!
//! [`Table`] is the storage behind a [`RowCollection`](crate::RowCollection):
//! an ordered sequence of semi-structured rows plus the order in which columns
//! were first observed. Rows may carry different field sets.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A single record: field name to JSON value, in API order.
pub type Row = Map<String, Value>;

/// Values of one column, one entry per row.
///
/// `None` marks a row that does not have the field at all; `Some(Value::Null)`
/// is a field that is present but null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<Value>>,
}

impl Column {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Present values, skipping absent rows.
    pub fn present(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().flatten()
    }

    /// Number of rows without the field.
    pub fn absent_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }
}

/// Ordered rows with observed column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<Row>,
    columns: Vec<String>,
}

impl Table {
    pub fn new(rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        Self { rows, columns }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Columns in first-observed order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Values of one column, absent rows as `None`.
    pub fn project(&self, name: &str) -> Column {
        Column {
            name: name.to_string(),
            values: self.rows.iter().map(|r| r.get(name).cloned()).collect(),
        }
    }

    /// Rows for which `mask` holds, order preserved.
    pub fn filter<F>(&self, mut mask: F) -> Table
    where
        F: FnMut(&Row) -> bool,
    {
        let rows = self.rows.iter().filter(|r| mask(r)).cloned().collect();
        Table {
            rows,
            columns: self.columns.clone(),
        }
    }

    /// Rows of `self` followed by rows of `other`.
    pub fn concat(&self, other: &Table) -> Table {
        let mut rows = Vec::with_capacity(self.rows.len() + other.rows.len());
        rows.extend(self.rows.iter().cloned());
        rows.extend(other.rows.iter().cloned());

        let mut columns = self.columns.clone();
        for column in &other.columns {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }

        Table { rows, columns }
    }

    /// Set `name` on every row. `values` must have one entry per row.
    pub fn with_column(mut self, name: &str, values: Vec<Value>) -> Table {
        debug_assert_eq!(values.len(), self.rows.len());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.insert(name.to_string(), value);
        }
        if !self.has_column(name) && !self.rows.is_empty() {
            self.columns.push(name.to_string());
        }
        self
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}

impl FromIterator<Row> for Table {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Table::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: Value) -> Vec<Row> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_columns_follow_first_observation() {
        let table = Table::new(rows(json!([{"id": 1, "b": 2}, {"c": 3, "id": 4}])));
        assert_eq!(table.columns(), ["id", "b", "c"]);
    }

    #[test]
    fn test_project_distinguishes_absent_from_null() {
        let table = Table::new(rows(json!([{"x": null}, {}, {"x": 5}])));
        let column = table.project("x");
        assert_eq!(
            column.values,
            vec![Some(Value::Null), None, Some(json!(5))]
        );
        assert_eq!(column.absent_count(), 1);
        assert_eq!(column.present().count(), 2);
    }

    #[test]
    fn test_concat_merges_columns() {
        let a = Table::new(rows(json!([{"id": 1}])));
        let b = Table::new(rows(json!([{"id": 2, "extra": true}])));
        let joined = a.concat(&b);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.columns(), ["id", "extra"]);
    }

    #[test]
    fn test_with_column_sets_every_row() {
        let table = Table::new(rows(json!([{"id": 1}, {"id": 2}])))
            .with_column("_source_row_index", vec![json!(0), json!(0)]);
        assert_eq!(table.columns(), ["id", "_source_row_index"]);
        assert_eq!(table.rows()[1]["_source_row_index"], json!(0));
    }
}
