//! CES API client.
//!
//! Low-level HTTP client that handles authentication, pagination and raw
//! requests, plus the root listings that seed the first [`RowCollection`] of
//! each entity kind. Relationship traversal is delegated to the
//! [`Resolver`] and [`Dispatcher`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use url::Url;

use crate::collection::RowCollection;
use crate::config::ClientConfig;
use crate::dispatch::{Dispatcher, Invocation};
use crate::error::{CesError, Result};
use crate::filter::FilterSet;
use crate::pagination::RecordPage;
use crate::query::{to_query, ProjectListQuery, Query, UserListQuery};
use crate::registry::Registry;
use crate::resolver::{ResolveOptions, Resolver};
use crate::transport::Transport;

const USER_AGENT: &str = concat!("cesapi/", env!("CARGO_PKG_VERSION"));
const AUTH_HEADER: &str = "AuthToken";

/// CES API client.
///
/// Handles authentication and HTTP requests, implements [`Transport`] for
/// the relationship resolver, and carries the [`Registry`] used to type the
/// collections it returns.
///
/// This struct is cheaply cloneable; clones reference the same underlying
/// connection pool and registry.
///
/// # Example
///
/// ```no_run
/// use cesapi::CesClient;
///
/// # async fn example() -> cesapi::Result<()> {
/// let client = CesClient::new("your-api-key", "https://ces.example.edu")?;
///
/// let courses = client.list_courses(&Default::default()).await?;
/// let projects = client.resolve(&courses, "projects").await?;
/// let surveys = client.invoke(&projects, "surveys").await?.into_collection()?;
/// println!("{} surveys across {} courses", surveys.len(), courses.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CesClient {
    http: Client,
    base_url: Arc<Url>,
    config: Arc<ClientConfig>,
    registry: Arc<Registry>,
}

impl std::fmt::Debug for CesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CesClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl CesClient {
    /// Create a client from environment variables.
    ///
    /// See [`ClientConfig::from_env`] for the variables read.
    ///
    /// # Errors
    ///
    /// Returns an error if `CES_API_KEY` or `CES_API_URL` is not set or invalid.
    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// Create a new client with the provided token and instance URL.
    ///
    /// # Arguments
    ///
    /// * `token` - CES API key
    /// * `base_url` - Root URL of the CES instance, without `/api`
    ///
    /// # Errors
    ///
    /// Returns an error if either value is blank or the URL is invalid.
    pub fn new(token: &str, base_url: &str) -> Result<Self> {
        Self::with_config(ClientConfig::new(token, base_url))
    }

    /// Create a client from an explicit configuration, using the built-in
    /// CES registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let config = config.validated()?;
        let base_url = Url::parse(&format!("{}/api/", config.base_url))?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .timeout(config.timeout)
            .build()
            .map_err(CesError::HttpError)?;

        tracing::info!(base_url = %base_url, "CES client initialized");

        Ok(Self {
            http,
            base_url: Arc::new(base_url),
            config: Arc::new(config),
            registry: Arc::new(Registry::ces()),
        })
    }

    /// Replace the entity registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    /// Get the API base URL (ends in `/api/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// A resolver that fetches through this client.
    pub fn resolver(&self) -> Resolver<CesClient> {
        Resolver::new(self.registry.clone(), self.clone())
    }

    /// A dispatcher over this client's registry.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.registry.clone())
    }

    /// Make a GET request, retrying on rate limiting.
    #[tracing::instrument(skip(self, query))]
    pub async fn get(&self, path: &str, query: &Query, page: Option<u32>) -> Result<Response> {
        let url = self.base_url.join(path.trim_start_matches('/'))?;
        let mut attempt = 0;

        loop {
            let mut request = self
                .http
                .get(url.clone())
                .header(AUTH_HEADER, &self.config.api_key)
                .query(query);
            if let Some(page) = page {
                request = request.query(&[("page", page)]);
            }

            let response = request.send().await.map_err(CesError::HttpError)?;
            tracing::debug!(status = response.status().as_u16(), "response received");

            match Self::check_response(response, path).await {
                Err(CesError::RateLimited { retry_after_secs }) if attempt < self.config.max_retries => {
                    let delay = retry_after_secs
                        .map(std::time::Duration::from_secs)
                        .unwrap_or_else(|| self.config.retry_delay(attempt));
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        ?delay,
                        "rate limited, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// GET a path and decode the JSON body.
    pub async fn get_json(&self, path: &str, query: &Query) -> Result<Value> {
        let response = self.get(path, query, None).await?;
        let body: Value = response.json().await.map_err(CesError::HttpError)?;
        Ok(body)
    }

    /// Check response status and convert errors.
    async fn check_response(response: Response, path: &str) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED => Err(CesError::Unauthorized),
            StatusCode::NOT_FOUND => Err(CesError::NotFound {
                path: path.to_string(),
            }),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                Err(CesError::RateLimited {
                    retry_after_secs: retry_after,
                })
            }
            StatusCode::UNPROCESSABLE_ENTITY => {
                let message = Self::extract_error_message(response, status).await;
                Err(CesError::UnprocessableEntity(message))
            }
            _ => {
                let message = Self::extract_error_message(response, status).await;
                Err(CesError::ApiError {
                    message,
                    status_code: Some(status.as_u16()),
                })
            }
        }
    }

    /// Extract error message from a failed response.
    async fn extract_error_message(response: Response, status: StatusCode) -> String {
        let body = match response.text().await {
            Ok(b) => b,
            Err(_) => return format!("HTTP {status}"),
        };

        // Try to parse as JSON and extract message field
        if let Ok(json) = serde_json::from_str::<Value>(&body) {
            if let Some(msg) = json.get("message").and_then(|m| m.as_str()) {
                return msg.to_string();
            }
            if let Some(err) = json.get("error").and_then(|m| m.as_str()) {
                return err.to_string();
            }
        }

        if body.is_empty() {
            format!("HTTP {status}")
        } else {
            body
        }
    }

    // =========================================================================
    // Root listings
    // =========================================================================

    /// List a kind from its root endpoint.
    ///
    /// `query` is sent to the server; `filters` are applied to the returned
    /// rows.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::UnknownKind`] or [`CesError::NoRootListing`] for
    /// schema problems, or the transport error if the request fails.
    #[tracing::instrument(skip(self, query, filters))]
    pub async fn list(&self, kind: &str, query: &Query, filters: &FilterSet) -> Result<RowCollection> {
        let entity = self.registry.lookup(kind)?.clone();
        let root = entity
            .root()
            .ok_or_else(|| CesError::NoRootListing(kind.to_string()))?;

        let records = self.fetch(root, query).await?;
        tracing::debug!(kind, rows = records.len(), "root listing fetched");
        Ok(RowCollection::of(entity, records).apply(filters))
    }

    /// Fetch an arbitrary path as a collection of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::UnknownKind`] or the transport error.
    pub async fn fetch_kind(&self, kind: &str, path: &str, query: &Query) -> Result<RowCollection> {
        let entity = self.registry.lookup(kind)?.clone();
        let records = self.fetch(path, query).await?;
        Ok(RowCollection::of(entity, records))
    }

    /// The account for the token.
    pub async fn account(&self) -> Result<RowCollection> {
        self.list("Account", &Query::new(), &FilterSet::new()).await
    }

    pub async fn list_subaccounts(&self, filters: &FilterSet) -> Result<RowCollection> {
        self.list("SubAccount", &Query::new(), filters).await
    }

    pub async fn list_terms(&self, filters: &FilterSet) -> Result<RowCollection> {
        self.list("Term", &Query::new(), filters).await
    }

    pub async fn list_courses(&self, filters: &FilterSet) -> Result<RowCollection> {
        self.list("Course", &Query::new(), filters).await
    }

    pub async fn list_surveys(&self, filters: &FilterSet) -> Result<RowCollection> {
        self.list("Survey", &Query::new(), filters).await
    }

    pub async fn list_nodes(&self, filters: &FilterSet) -> Result<RowCollection> {
        self.list("Node", &Query::new(), filters).await
    }

    /// List projects, filtered server-side by `query`.
    pub async fn list_projects(
        &self,
        query: &ProjectListQuery,
        filters: &FilterSet,
    ) -> Result<RowCollection> {
        self.list("Project", &to_query(query)?, filters).await
    }

    /// List account users, filtered server-side by `query`.
    pub async fn list_users(&self, query: &UserListQuery, filters: &FilterSet) -> Result<RowCollection> {
        self.list("User", &to_query(query)?, filters).await
    }

    pub async fn get_project(&self, id: i64) -> Result<RowCollection> {
        self.fetch_kind("Project", &format!("projects/{id}"), &Query::new())
            .await
    }

    pub async fn get_course(&self, id: i64) -> Result<RowCollection> {
        self.fetch_kind("Course", &format!("courses/{id}"), &Query::new())
            .await
    }

    /// Look a course up by its institution-assigned unique id.
    pub async fn get_course_by_unique_id(&self, unique_id: &str) -> Result<RowCollection> {
        let query = Query::from([("uniqueId".to_string(), unique_id.to_string())]);
        self.fetch_kind("Course", "courses", &query).await
    }

    pub async fn get_survey(&self, id: i64) -> Result<RowCollection> {
        self.fetch_kind("Survey", &format!("surveys/{id}"), &Query::new())
            .await
    }

    /// Whether the user has an in-progress survey in any project.
    pub async fn user_has_in_progress_survey(&self, username: &str) -> Result<bool> {
        self.user_flag("users/hasInProgressSurvey", username).await
    }

    /// Whether the user has an in-progress survey in a project that blocks
    /// grades.
    pub async fn user_has_grade_block(&self, username: &str) -> Result<bool> {
        self.user_flag("users/hasGradeBlock", username).await
    }

    async fn user_flag(&self, path: &str, username: &str) -> Result<bool> {
        let query = Query::from([("username".to_string(), username.to_string())]);
        let body = self.get_json(path, &query).await?;
        Ok(body.get("result").and_then(Value::as_bool).unwrap_or(false))
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Follow relationship `edge` from every row of `collection`.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve`].
    pub async fn resolve(&self, collection: &RowCollection, edge: &str) -> Result<RowCollection> {
        self.resolver().resolve(collection, edge).await
    }

    /// Follow relationship `edge` with explicit options.
    pub async fn resolve_with(
        &self,
        collection: &RowCollection,
        edge: &str,
        options: &ResolveOptions,
    ) -> Result<RowCollection> {
        self.resolver().resolve_with(collection, edge, options).await
    }

    /// Resolve `name` against the collection's kind: a relationship is
    /// traversed, a column is projected.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::invoke`].
    pub async fn invoke(&self, collection: &RowCollection, name: &str) -> Result<Invocation> {
        self.dispatcher()
            .invoke(collection, name, self, &ResolveOptions::default())
            .await
    }

    /// [`invoke`](Self::invoke) with explicit resolve options.
    pub async fn invoke_with(
        &self,
        collection: &RowCollection,
        name: &str,
        options: &ResolveOptions,
    ) -> Result<Invocation> {
        self.dispatcher().invoke(collection, name, self, options).await
    }
}

#[async_trait]
impl Transport for CesClient {
    #[tracing::instrument(skip(self, query))]
    async fn fetch_page(&self, path: &str, query: &Query, page: u32) -> Result<RecordPage> {
        let response = self.get(path, query, Some(page)).await?;
        let body: Value = response.json().await.map_err(CesError::HttpError)?;

        RecordPage::from_body(body).ok_or_else(|| CesError::ApiError {
            message: format!("unexpected response body for '{path}'"),
            status_code: None,
        })
    }
}
