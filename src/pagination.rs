//! Pagination utilities for CES API responses.
//!
//! List endpoints answer with an envelope:
//!
//! ```json
//! { "page": 1, "pageSize": 100, "resultList": [ { ... }, ... ] }
//! ```
//!
//! A further page exists while a page comes back full. Endpoints that return
//! a single resource answer with a bare object, and a few answer with a bare
//! array; both are treated as one complete page.

use serde::Serialize;
use serde_json::Value;

use crate::table::Row;

/// First page number requested from the API.
pub const FIRST_PAGE: u32 = 1;

/// Maximum pages to fetch (safety limit).
pub const MAX_PAGES: u32 = 1000;

/// One page of raw records from the API.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordPage {
    /// The records on this page, `null` entries dropped.
    pub records: Vec<Row>,
    /// Page number reported by the server, if any.
    pub page: Option<u32>,
    /// Page size reported by the server, if any.
    pub page_size: Option<u32>,
    /// Whether there are more pages.
    pub has_more: bool,
}

impl RecordPage {
    /// A final page holding `records`.
    #[must_use]
    pub fn last(records: Vec<Row>) -> Self {
        Self {
            records,
            page: None,
            page_size: None,
            has_more: false,
        }
    }

    /// Interpret a response body.
    ///
    /// Returns `None` if the body is neither an object, an array, nor null.
    pub fn from_body(body: Value) -> Option<Self> {
        match body {
            Value::Null => Some(Self::last(Vec::new())),
            Value::Array(items) => Some(Self::last(objects(items))),
            Value::Object(mut map) => match map.remove("resultList") {
                Some(Value::Array(items)) => {
                    let page = map.get("page").and_then(Value::as_u64).map(|p| p as u32);
                    let page_size = map
                        .get("pageSize")
                        .and_then(Value::as_u64)
                        .map(|p| p as u32);
                    let served = items.len();
                    Some(Self::envelope(objects(items), served, page, page_size))
                }
                Some(Value::Null) => Some(Self::last(Vec::new())),
                Some(other) => {
                    map.insert("resultList".to_string(), other);
                    Some(Self::last(vec![map]))
                }
                None => Some(Self::last(vec![map])),
            },
            _ => None,
        }
    }

    /// `served` is the length of `resultList` before `null` entries were
    /// dropped; a full page means another one may follow.
    fn envelope(records: Vec<Row>, served: usize, page: Option<u32>, page_size: Option<u32>) -> Self {
        let has_more = match (page, page_size) {
            (Some(_), Some(size)) => size > 0 && served == size as usize,
            _ => false,
        };
        Self {
            records,
            page,
            page_size,
            has_more,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

fn objects(items: Vec<Value>) -> Vec<Row> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                tracing::warn!(value = %other, "dropping non-object record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_page_has_more() {
        let page = RecordPage::from_body(json!({
            "page": 1,
            "pageSize": 2,
            "resultList": [{"id": 1}, {"id": 2}]
        }))
        .unwrap();
        assert!(page.has_more);
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn test_partial_page_is_last() {
        let page = RecordPage::from_body(json!({
            "page": 3,
            "pageSize": 2,
            "resultList": [{"id": 5}]
        }))
        .unwrap();
        assert!(!page.has_more);
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn test_full_page_with_nulls_has_more() {
        let page = RecordPage::from_body(json!({
            "page": 1,
            "pageSize": 2,
            "resultList": [{"id": 1}, null]
        }))
        .unwrap();
        assert!(page.has_more);
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn test_envelope_without_page_is_last() {
        let page = RecordPage::from_body(json!({
            "pageSize": 1,
            "resultList": [{"id": 1}]
        }))
        .unwrap();
        assert!(!page.has_more);
    }

    #[test]
    fn test_single_object_and_array_bodies() {
        let single = RecordPage::from_body(json!({"id": 9, "name": "x"})).unwrap();
        assert_eq!(single.len(), 1);
        assert!(!single.has_more);

        let array = RecordPage::from_body(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(array.len(), 2);

        assert!(RecordPage::from_body(json!(null)).unwrap().is_empty());
        assert!(RecordPage::from_body(json!("nope")).is_none());
    }
}
