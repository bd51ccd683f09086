//! Client-side row filters.
//!
//! Filters are written as `column=expression`. Expressions are either numeric
//! comparisons (`>3`, `<=10`, `!=0`, `42`) or text patterns where `*` matches
//! any run of characters (`MATH*`). Prefixing a text pattern with `!=`, `≠`
//! or `<>` excludes matching rows instead.
//!
//! Within one column the positive expressions are alternatives; different
//! columns must all match; exclusions always remove rows.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value;

use crate::error::{CesError, Result};
use crate::table::Row;

const OPERATOR_CHARS: &[char] = &['>', '<', '≥', '≤', '!', '=', '≠'];

/// Numeric comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "" | "=" | "==" => CompareOp::Eq,
            "!=" | "≠" | "<>" => CompareOp::Ne,
            ">" => CompareOp::Gt,
            ">=" | "≥" => CompareOp::Ge,
            "<" => CompareOp::Lt,
            "<=" | "≤" => CompareOp::Le,
            _ => return None,
        })
    }

    fn eval(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
        }
    }
}

/// A single parsed filter expression.
#[derive(Debug, Clone)]
pub enum FilterExpr {
    /// Numeric comparison against the column value.
    Numeric { op: CompareOp, value: f64 },
    /// Anchored wildcard pattern the column text must match.
    Matches(Regex),
    /// Anchored wildcard pattern the column text must not match.
    Excludes(Regex),
}

impl FilterExpr {
    /// Parse an expression such as `>=3` or `!=MATH*`.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::InvalidFilter`] for an unknown operator or an
    /// operator without an operand.
    pub fn parse(expr: &str) -> Result<Self> {
        let expr = expr.trim();
        let split = expr
            .char_indices()
            .find(|(_, c)| !OPERATOR_CHARS.contains(c))
            .map_or(expr.len(), |(i, _)| i);
        let (op, operand) = expr.split_at(split);

        if operand.is_empty() {
            return Err(CesError::InvalidFilter(expr.to_string()));
        }

        if let Ok(value) = operand.parse::<f64>() {
            let op = CompareOp::parse(op).ok_or_else(|| CesError::InvalidFilter(expr.to_string()))?;
            return Ok(FilterExpr::Numeric { op, value });
        }

        let pattern = glob_regex(operand).map_err(|_| CesError::InvalidFilter(expr.to_string()))?;
        match op {
            "" | "=" | "==" => Ok(FilterExpr::Matches(pattern)),
            "!=" | "≠" | "<>" => Ok(FilterExpr::Excludes(pattern)),
            _ => Err(CesError::InvalidFilter(expr.to_string())),
        }
    }

    fn is_exclusion(&self) -> bool {
        matches!(self, FilterExpr::Excludes(_))
    }

    fn test(&self, value: Option<&Value>) -> bool {
        match self {
            FilterExpr::Numeric { op, value: rhs } => {
                numeric(value).is_some_and(|lhs| op.eval(lhs, *rhs))
            }
            FilterExpr::Matches(re) => text(value).is_some_and(|t| re.is_match(&t)),
            FilterExpr::Excludes(re) => text(value).is_some_and(|t| re.is_match(&t)),
        }
    }
}

fn glob_regex(pattern: &str) -> core::result::Result<Regex, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$"))
}

fn numeric(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Filter expressions grouped by column.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: BTreeMap<String, Vec<FilterExpr>>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an expression for `column`.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::InvalidFilter`] if the expression cannot be parsed.
    pub fn with(mut self, column: &str, expr: &str) -> Result<Self> {
        let parsed = FilterExpr::parse(expr)?;
        self.filters
            .entry(column.to_string())
            .or_default()
            .push(parsed);
        Ok(self)
    }

    /// Build from `column=expression` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::InvalidFilter`] if a pair has no `=` or an
    /// unparsable expression.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        pairs.into_iter().try_fold(Self::new(), |set, pair| {
            let pair = pair.as_ref();
            let (column, expr) = pair
                .split_once('=')
                .filter(|(c, _)| !c.trim().is_empty())
                .ok_or_else(|| CesError::InvalidFilter(pair.to_string()))?;
            set.with(column.trim(), expr)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filtered columns.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    /// Whether `row` passes every filter on a column for which `present`
    /// holds. Filters on other columns are ignored.
    pub fn matches<P>(&self, row: &Row, present: P) -> bool
    where
        P: Fn(&str) -> bool,
    {
        self.filters
            .iter()
            .filter(|(column, _)| present(column))
            .all(|(column, exprs)| {
                let value = row.get(column);
                let mut positives = exprs.iter().filter(|e| !e.is_exclusion()).peekable();
                let positive_ok =
                    positives.peek().is_none() || positives.any(|e| e.test(value));
                let excluded = exprs
                    .iter()
                    .filter(|e| e.is_exclusion())
                    .any(|e| e.test(value));
                positive_ok && !excluded
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        serde_json::from_value(value).unwrap()
    }

    fn all(_: &str) -> bool {
        true
    }

    #[test]
    fn test_numeric_operators() {
        let r = row(json!({"n": 5, "s": "7"}));
        let check = |col: &str, expr: &str| FilterSet::new().with(col, expr).unwrap().matches(&r, all);

        assert!(check("n", ">3"));
        assert!(!check("n", ">5"));
        assert!(check("n", ">=5"));
        assert!(check("n", "≥5"));
        assert!(check("n", "<6"));
        assert!(check("n", "<=5"));
        assert!(check("n", "5"));
        assert!(check("n", "!=4"));
        assert!(check("s", "7"));
    }

    #[test]
    fn test_glob_patterns() {
        let r = row(json!({"code": "MATH-101"}));
        let check = |expr: &str| FilterSet::new().with("code", expr).unwrap().matches(&r, all);

        assert!(check("MATH*"));
        assert!(check("*101"));
        assert!(!check("MATH"));
        assert!(!check("!=MATH*"));
        assert!(check("<>BIO*"));
        // regex metacharacters are literal
        assert!(!check("MATH.101"));
    }

    #[test]
    fn test_positive_alternatives_and_column_conjunction() {
        let filters = FilterSet::from_pairs(["code=MATH*", "code=BIO*", "term=>2"]).unwrap();

        assert!(filters.matches(&row(json!({"code": "BIO-1", "term": 3})), all));
        assert!(!filters.matches(&row(json!({"code": "BIO-1", "term": 1})), all));
        assert!(!filters.matches(&row(json!({"code": "CHEM-1", "term": 3})), all));
    }

    #[test]
    fn test_columns_are_conjunctive_not_alternatives() {
        let filters = FilterSet::from_pairs(["title=Fall*", "projectStatus=2"]).unwrap();

        assert!(filters.matches(&row(json!({"title": "Fall 2023", "projectStatus": 2})), all));
        assert!(!filters.matches(&row(json!({"title": "Fall 2023", "projectStatus": 3})), all));
        assert!(!filters.matches(&row(json!({"title": "Spring", "projectStatus": 2})), all));
    }

    #[test]
    fn test_exclusions_alone_keep_other_rows() {
        let filters = FilterSet::from_pairs(["code=!=MATH*"]).unwrap();

        assert!(filters.matches(&row(json!({"code": "BIO-1"})), all));
        assert!(!filters.matches(&row(json!({"code": "MATH-1"})), all));
    }

    #[test]
    fn test_unicode_bounds_are_inclusive() {
        let r = row(json!({"n": 5}));
        assert!(FilterSet::new().with("n", "≤5").unwrap().matches(&r, all));
        assert!(FilterSet::new().with("n", "≥5").unwrap().matches(&r, all));
    }

    #[test]
    fn test_absent_columns_are_skipped() {
        let filters = FilterSet::from_pairs(["missing=1"]).unwrap();
        let r = row(json!({"id": 1}));
        assert!(filters.matches(&r, |c| c == "id"));
        assert!(!filters.matches(&r, all));
    }

    #[test]
    fn test_invalid_filters() {
        assert!(FilterExpr::parse(">").is_err());
        assert!(FilterExpr::parse(">>3").is_err());
        assert!(FilterExpr::parse(">abc").is_err());
        assert!(FilterSet::from_pairs(["noequals"]).is_err());
        assert!(FilterSet::from_pairs(["=5"]).is_err());
    }
}
