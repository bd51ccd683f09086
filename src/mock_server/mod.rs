//! Mock CES API server for E2E testing.
//!
//! This module provides an in-memory mock server that simulates the CES API
//! for integration and end-to-end testing. Unlike wiremock which mocks at the
//! HTTP level per-test, this server maintains state across requests, enabling
//! realistic traversal testing.
//!
//! # Example
//!
//! ```ignore
//! use cesapi::mock_server::MockServer;
//! use cesapi::CesClient;
//!
//! #[tokio::test]
//! async fn test_workflow() {
//!     let server = MockServer::start().await.unwrap();
//!     let client = CesClient::new("test-token", server.url()).unwrap();
//!
//!     // Server comes with default fixtures
//!     let courses = client.list_courses(&Default::default()).await.unwrap();
//!     let projects = client.resolve(&courses, "projects").await.unwrap();
//!     assert_eq!(projects.len(), 3);
//!
//!     server.shutdown().await;
//! }
//! ```

mod fixtures;
mod handlers;
mod server;
mod state;

pub use fixtures::Fixtures;
pub use server::MockServer;
pub use state::{MockState, Resource, DEFAULT_PAGE_SIZE};
