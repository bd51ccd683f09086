//! The transport seam between the traversal engine and HTTP.

use async_trait::async_trait;

use crate::error::Result;
use crate::pagination::{RecordPage, FIRST_PAGE, MAX_PAGES};
use crate::query::Query;
use crate::table::Row;

/// Fetch raw records for a resource path.
///
/// [`CesClient`](crate::CesClient) is the HTTP implementation. Tests and
/// alternative backends implement [`fetch_page`](Transport::fetch_page) (or
/// override [`fetch`](Transport::fetch) directly) to feed the resolver without
/// a network.
///
/// Errors are returned as-is; the resolver adds row context during fan-out.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch one page of `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Resource path relative to the API root
    /// * `query` - Query parameters (excluding the page number)
    /// * `page` - Page number (1-indexed)
    async fn fetch_page(&self, path: &str, query: &Query, page: u32) -> Result<RecordPage>;

    /// Fetch every record of `path`, following pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    async fn fetch(&self, path: &str, query: &Query) -> Result<Vec<Row>> {
        let mut records = Vec::new();
        let mut page = FIRST_PAGE;

        loop {
            let result = self.fetch_page(path, query, page).await?;
            let has_more = result.has_more;
            records.extend(result.records);

            if !has_more {
                break;
            }
            page += 1;

            // Safety limit to prevent infinite loops
            if page > MAX_PAGES {
                tracing::warn!(path, "Reached pagination limit of {} pages, stopping", MAX_PAGES);
                break;
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for &T {
    async fn fetch_page(&self, path: &str, query: &Query, page: u32) -> Result<RecordPage> {
        (**self).fetch_page(path, query, page).await
    }

    async fn fetch(&self, path: &str, query: &Query) -> Result<Vec<Row>> {
        (**self).fetch(path, query).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn fetch_page(&self, path: &str, query: &Query, page: u32) -> Result<RecordPage> {
        (**self).fetch_page(path, query, page).await
    }

    async fn fetch(&self, path: &str, query: &Query) -> Result<Vec<Row>> {
        (**self).fetch(path, query).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transport double that records every request.

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::Value;

    use super::*;
    use crate::error::CesError;

    #[derive(Debug, Default)]
    pub struct StubTransport {
        responses: HashMap<String, Vec<Vec<Row>>>,
        failures: HashMap<String, fn() -> CesError>,
        delays: HashMap<String, Duration>,
        pub calls: Mutex<Vec<(String, u32)>>,
    }

    impl StubTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Serve `records` as a single page for `path`.
        pub fn with(self, path: &str, records: Value) -> Self {
            self.with_pages(path, vec![records])
        }

        /// Serve each value as one page for `path`.
        pub fn with_pages(mut self, path: &str, pages: Vec<Value>) -> Self {
            let pages = pages
                .into_iter()
                .map(|p| serde_json::from_value(p).expect("page must be an array of objects"))
                .collect();
            self.responses.insert(path.to_string(), pages);
            self
        }

        pub fn failing(mut self, path: &str, error: fn() -> CesError) -> Self {
            self.failures.insert(path.to_string(), error);
            self
        }

        pub fn delayed(mut self, path: &str, delay: Duration) -> Self {
            self.delays.insert(path.to_string(), delay);
            self
        }

        pub fn paths(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn fetch_page(&self, path: &str, _query: &Query, page: u32) -> Result<RecordPage> {
            self.calls.lock().unwrap().push((path.to_string(), page));

            if let Some(delay) = self.delays.get(path) {
                tokio::time::sleep(*delay).await;
            }
            if let Some(error) = self.failures.get(path) {
                return Err(error());
            }

            let pages = self
                .responses
                .get(path)
                .ok_or_else(|| CesError::NotFound {
                    path: path.to_string(),
                })?;
            let index = (page - FIRST_PAGE) as usize;
            let records = pages.get(index).cloned().unwrap_or_default();
            Ok(RecordPage {
                has_more: index + 1 < pages.len(),
                page: Some(page),
                page_size: Some(records.len() as u32),
                records,
            })
        }
    }
}
