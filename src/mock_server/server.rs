//! Mock CES API server.
//!
//! Provides an axum-based HTTP server that simulates the CES API.

use std::io;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::fixtures::Fixtures;
use super::handlers;
use super::state::MockState;

/// A mock CES API server for testing.
///
/// The server runs in the background and can be used to test the CES client
/// against a realistic API implementation.
pub struct MockServer {
    /// The URL where the server is listening, without `/api`.
    url: String,
    /// Handle to the server task.
    handle: JoinHandle<()>,
    /// Shared state that can be modified during tests.
    state: Arc<RwLock<MockState>>,
}

impl MockServer {
    /// Start a new mock server with default fixtures.
    ///
    /// The server listens on a random available port and returns immediately.
    /// Use `url()` to get the server's base URL.
    pub async fn start() -> io::Result<Self> {
        Self::with_state(Fixtures::default_state()).await
    }

    /// Start a mock server with empty state.
    ///
    /// Useful when you want to control exactly what data is available.
    pub async fn start_empty() -> io::Result<Self> {
        Self::with_state(MockState::new()).await
    }

    /// Start a mock server with custom state.
    pub async fn with_state(state: MockState) -> io::Result<Self> {
        let shared_state = state.shared();
        let app = Self::create_router(shared_state.clone());

        // Bind to a random available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "mock server stopped");
            }
        });

        Ok(Self {
            url: format!("http://{}", addr),
            handle,
            state: shared_state,
        })
    }

    /// Get the base URL of the mock server.
    ///
    /// Use this URL when creating a `CesClient` for testing.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get access to the server's shared state.
    ///
    /// This allows modifying the mock data during a test.
    pub fn state(&self) -> Arc<RwLock<MockState>> {
        self.state.clone()
    }

    /// Shutdown the server.
    ///
    /// This aborts the server task. It's safe to call multiple times.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }

    /// Create the axum router with all routes.
    fn create_router(state: Arc<RwLock<MockState>>) -> Router {
        Router::new()
            .route("/api/*path", get(handlers::get_resource))
            .route("/health", get(health_check))
            .with_state(state)
    }
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CesClient;

    #[tokio::test]
    async fn test_server_starts_and_responds() {
        let server = MockServer::start().await.unwrap();

        // Server should be accessible
        let client = reqwest::Client::new();
        let response = client
            .get(format!("{}/health", server.url()))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());
        assert_eq!(response.text().await.unwrap(), "ok");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_list_courses_with_ces_client() {
        let server = MockServer::start().await.unwrap();
        let client = CesClient::new("test-token", server.url()).unwrap();

        let courses = client
            .list_courses(&Default::default())
            .await
            .expect("Failed to list courses");

        assert_eq!(courses.len(), 3);
        assert_eq!(courses.row(0).unwrap()["name"], "Algebra I");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_pages_are_followed() {
        let server = MockServer::with_state(Fixtures::default_state().with_page_size(2))
            .await
            .unwrap();
        let client = CesClient::new("test-token", server.url()).unwrap();

        let courses = client.list_courses(&Default::default()).await.unwrap();

        assert_eq!(courses.len(), 3);
        assert_eq!(server.state().read().await.request_count("courses"), 2);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_server() {
        let server = MockServer::start_empty().await.unwrap();
        let client = CesClient::new("test-token", server.url()).unwrap();

        let result = client.get_project(10).await;

        assert!(matches!(result, Err(crate::CesError::NotFound { .. })));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_required_token() {
        let state = Fixtures::default_state().with_required_token("secret");
        let server = MockServer::with_state(state).await.unwrap();

        let wrong = CesClient::new("nope", server.url()).unwrap();
        assert!(matches!(
            wrong.list_terms(&Default::default()).await,
            Err(crate::CesError::Unauthorized)
        ));

        let right = CesClient::new("secret", server.url()).unwrap();
        assert_eq!(right.list_terms(&Default::default()).await.unwrap().len(), 2);

        server.shutdown().await;
    }
}
