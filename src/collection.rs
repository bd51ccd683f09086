//! Row-collections: typed tables of entity rows.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{CesError, Result};
use crate::filter::FilterSet;
use crate::registry::EntityKind;
use crate::resolver::SOURCE_ROW_COLUMN;
use crate::table::{Column, Row, Table};

/// An ordered table of rows tagged with their entity kind.
///
/// Collections are immutable values: every operation returns a new
/// collection. The kind decides which relationships can be traversed from
/// the rows (see [`Resolver`](crate::Resolver) and
/// [`Dispatcher`](crate::Dispatcher)).
///
/// Rows are not validated against the kind's declared fields; extra or
/// missing fields are tolerated since the upstream API evolves independently.
///
/// # Example
///
/// ```
/// use cesapi::{Registry, RowCollection};
/// use serde_json::json;
///
/// let registry = Registry::ces();
/// let course = registry.lookup("Course").unwrap().clone();
/// let rows = vec![
///     json!({"id": 1, "name": "Algebra"}),
///     json!({"id": 2, "name": "Biology"}),
/// ];
/// let courses = RowCollection::from_values(course, rows).unwrap();
///
/// let names = courses.project("name").unwrap();
/// assert_eq!(names.values.len(), 2);
/// ```
#[derive(Clone)]
pub struct RowCollection {
    kind: Arc<EntityKind>,
    table: Table,
}

impl RowCollection {
    /// Build a collection from raw records.
    pub fn of(kind: Arc<EntityKind>, rows: impl IntoIterator<Item = Row>) -> Self {
        Self {
            kind,
            table: rows.into_iter().collect(),
        }
    }

    /// An empty collection of `kind`.
    pub fn empty(kind: Arc<EntityKind>) -> Self {
        Self {
            kind,
            table: Table::default(),
        }
    }

    /// Build a collection from JSON values, each of which must be an object.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::ParseError`] if any value is not a JSON object.
    pub fn from_values(kind: Arc<EntityKind>, values: Vec<Value>) -> Result<Self> {
        let rows = values
            .into_iter()
            .map(serde_json::from_value::<Row>)
            .collect::<core::result::Result<Vec<_>, _>>()?;
        Ok(Self::of(kind, rows))
    }

    pub(crate) fn from_table(kind: Arc<EntityKind>, table: Table) -> Self {
        Self { kind, table }
    }

    pub fn kind(&self) -> &Arc<EntityKind> {
        &self.kind
    }

    pub fn kind_name(&self) -> &str {
        self.kind.name()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Iterate the rows in order. The iterator can be restarted by calling
    /// `rows()` again.
    pub fn rows(&self) -> std::slice::Iter<'_, Row> {
        self.table.rows().iter()
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.table.rows().get(index)
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.table.into_rows()
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Columns observed in the rows, in first-seen order.
    pub fn columns(&self) -> &[String] {
        self.table.columns()
    }

    /// Whether `field` is declared on the kind or observed in any row.
    pub fn has_field(&self, field: &str) -> bool {
        self.kind.declares_field(field) || self.table.has_column(field)
    }

    /// Column access.
    ///
    /// Rows without the field yield `None`. A declared field that no row
    /// carries yields a column of `None`s rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::UnknownField`] if the field is neither declared on
    /// the kind nor present in any row.
    pub fn project(&self, field: &str) -> Result<Column> {
        if !self.has_field(field) {
            return Err(CesError::UnknownField {
                kind: self.kind_name().to_string(),
                field: field.to_string(),
            });
        }
        Ok(self.table.project(field))
    }

    /// Rows for which `predicate` holds, same kind, order preserved.
    #[must_use]
    pub fn filter<F>(&self, predicate: F) -> RowCollection
    where
        F: FnMut(&Row) -> bool,
    {
        Self::from_table(self.kind.clone(), self.table.filter(predicate))
    }

    /// Apply client-side filter expressions.
    #[must_use]
    pub fn apply(&self, filters: &FilterSet) -> RowCollection {
        if filters.is_empty() {
            return self.clone();
        }
        for column in filters.columns() {
            if !self.table.has_column(column) {
                tracing::warn!(kind = self.kind_name(), column, "filter column not present, skipping");
            }
        }
        let present = |c: &str| self.table.has_column(c);
        self.filter(|row| filters.matches(row, present))
    }

    /// Rows of `self` followed by rows of `other`.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::KindMismatch`] if the kinds differ.
    pub fn concat(&self, other: &RowCollection) -> Result<RowCollection> {
        if self.kind_name() != other.kind_name() {
            return Err(CesError::KindMismatch {
                expected: self.kind_name().to_string(),
                found: other.kind_name().to_string(),
            });
        }
        Ok(Self::from_table(
            self.kind.clone(),
            self.table.concat(&other.table),
        ))
    }

    /// Concatenate many collections of `kind` in order.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::KindMismatch`] if any part has a different kind.
    pub fn concat_all<I>(kind: Arc<EntityKind>, parts: I) -> Result<RowCollection>
    where
        I: IntoIterator<Item = RowCollection>,
    {
        let mut rows = Vec::new();
        for part in parts {
            if part.kind_name() != kind.name() {
                return Err(CesError::KindMismatch {
                    expected: kind.name().to_string(),
                    found: part.kind_name().to_string(),
                });
            }
            rows.extend(part.into_rows());
        }
        Ok(Self::of(kind, rows))
    }

    /// Set a column on every row. `values` must have one entry per row.
    #[must_use]
    pub fn with_column(&self, name: &str, values: Vec<Value>) -> RowCollection {
        Self::from_table(self.kind.clone(), self.table.clone().with_column(name, values))
    }

    /// Rename every column to `<kind>_<column>`, with the kind lowercased.
    #[must_use]
    pub fn prefixed(&self) -> RowCollection {
        let prefix = column_prefix(self.kind_name());
        Self::of(
            self.kind.clone(),
            self.rows().map(|row| prefix_row(&prefix, row)).collect::<Vec<_>>(),
        )
    }

    /// Join rows resolved with source-row tagging back to the rows of
    /// `source` they were fetched for.
    ///
    /// The result keeps the kind and row order of `self`. Columns of both
    /// sides are prefixed as in [`prefixed`](Self::prefixed); when both
    /// kinds are the same, source columns get a `source_` prefix in front.
    /// Source rows that produced nothing do not appear.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::MissingSourceRow`] if a row has no
    /// [`SOURCE_ROW_COLUMN`] value or one outside `source`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use cesapi::{CesClient, ResolveOptions};
    ///
    /// # async fn example() -> cesapi::Result<()> {
    /// let client = CesClient::from_env()?;
    /// let courses = client.list_courses(&Default::default()).await?;
    /// let options = ResolveOptions::default().with_source_rows();
    /// let projects = client.resolve_with(&courses, "projects", &options).await?;
    ///
    /// let joined = projects.join_source(&courses)?;
    /// let course_names = joined.project("course_name")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn join_source(&self, source: &RowCollection) -> Result<RowCollection> {
        let indices = self.source_indices(source)?;
        let own = column_prefix(self.kind_name());
        let mut theirs = column_prefix(source.kind_name());
        if theirs == own {
            theirs = format!("source_{theirs}");
        }

        let rows = self
            .rows()
            .zip(indices)
            .map(|(row, index)| {
                let mut joined = prefix_row(&own, row);
                joined.extend(prefix_row(&theirs, &source.table.rows()[index]));
                joined
            })
            .collect::<Vec<_>>();
        Ok(Self::of(self.kind.clone(), rows))
    }

    /// The rows of `source` that produced at least one row of `self`, once
    /// each and in source order.
    ///
    /// This turns a traversal result back into its ancestor kind, e.g. the
    /// courses having a project in a given state.
    ///
    /// # Errors
    ///
    /// Same as [`join_source`](Self::join_source).
    pub fn select_sources(&self, source: &RowCollection) -> Result<RowCollection> {
        let indices: BTreeSet<usize> = self.source_indices(source)?.into_iter().collect();
        let rows = indices
            .into_iter()
            .map(|index| source.table.rows()[index].clone())
            .collect::<Vec<_>>();
        Ok(Self::of(source.kind.clone(), rows))
    }

    fn source_indices(&self, source: &RowCollection) -> Result<Vec<usize>> {
        self.rows()
            .enumerate()
            .map(|(row_index, row)| {
                row.get(SOURCE_ROW_COLUMN)
                    .and_then(Value::as_u64)
                    .and_then(|index| usize::try_from(index).ok())
                    .filter(|index| *index < source.len())
                    .ok_or(CesError::MissingSourceRow { row_index })
            })
            .collect()
    }
}

fn column_prefix(kind: &str) -> String {
    format!("{}_", kind.to_lowercase())
}

fn prefix_row(prefix: &str, row: &Row) -> Row {
    row.iter()
        .filter(|(name, _)| name.as_str() != SOURCE_ROW_COLUMN)
        .map(|(name, value)| (format!("{prefix}{name}"), value.clone()))
        .collect()
}

impl fmt::Debug for RowCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowCollection")
            .field("kind", &self.kind_name())
            .field("rows", &self.table.rows())
            .finish()
    }
}

impl PartialEq for RowCollection {
    fn eq(&self, other: &Self) -> bool {
        self.kind_name() == other.kind_name() && self.table.rows() == other.table.rows()
    }
}

impl Serialize for RowCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        self.table.serialize(serializer)
    }
}

impl<'a> IntoIterator for &'a RowCollection {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows()
    }
}
