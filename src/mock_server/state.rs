//! Mock server state management.
//!
//! Provides the in-memory data store for the mock CES API server.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::table::Row;

/// Records returned by list endpoints per page unless the request overrides
/// it with `pageSize`.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// What the server returns for a path.
#[derive(Debug, Clone)]
pub enum Resource {
    /// A paginated list, served inside a `resultList` envelope.
    List(Vec<Row>),
    /// A single object, served as-is.
    Single(Value),
}

/// Shared state for the mock server.
///
/// Resources are keyed by API path relative to `/api/`, including any query
/// parameters other than `page` and `pageSize` (e.g.
/// `users/metadata?username=jdoe`). A request whose exact key is unknown
/// falls back to the path without its query.
#[derive(Debug)]
pub struct MockState {
    pub resources: HashMap<String, Resource>,

    /// Page size for list endpoints.
    pub page_size: usize,

    /// Optional authentication token. If set, requests must send it in the
    /// `AuthToken` header.
    pub required_token: Option<String>,

    /// Keys of every request served, in arrival order.
    pub requests: Vec<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            resources: HashMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
            required_token: None,
            requests: Vec::new(),
        }
    }
}

impl MockState {
    /// Create a new empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state wrapped in Arc<RwLock> for sharing.
    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }

    /// Serve `records` as a paginated list at `path`. Non-object values are
    /// ignored.
    pub fn with_list(mut self, path: &str, records: Vec<Value>) -> Self {
        let rows = records
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.resources
            .insert(normalize_path(path), Resource::List(rows));
        self
    }

    /// Serve `body` verbatim at `path`.
    pub fn with_single(mut self, path: &str, body: Value) -> Self {
        self.resources
            .insert(normalize_path(path), Resource::Single(body));
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Set the required authentication token.
    pub fn with_required_token(mut self, token: &str) -> Self {
        self.required_token = Some(token.to_string());
        self
    }

    /// Look a resource up by path and query, falling back to the bare path.
    pub fn lookup(&self, path: &str, query: &BTreeMap<String, String>) -> Option<&Resource> {
        let key = resource_key(path, query);
        self.resources
            .get(&key)
            .or_else(|| self.resources.get(path.trim_matches('/')))
    }

    /// Number of requests served for `path` (query excluded).
    pub fn request_count(&self, path: &str) -> usize {
        let path = path.trim_matches('/');
        self.requests
            .iter()
            .filter(|k| k.split('?').next() == Some(path))
            .count()
    }
}

/// Canonical key for a path and its query parameters.
pub fn resource_key(path: &str, query: &BTreeMap<String, String>) -> String {
    let path = path.trim_matches('/');
    let params: Vec<String> = query
        .iter()
        .filter(|(k, _)| k.as_str() != "page" && k.as_str() != "pageSize")
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    if params.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", params.join("&"))
    }
}

fn normalize_path(raw: &str) -> String {
    match raw.split_once('?') {
        Some((path, query)) => {
            let query: BTreeMap<String, String> = query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            resource_key(path, &query)
        }
        None => raw.trim_matches('/').to_string(),
    }
}
