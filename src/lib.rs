//! CES API client library.
//!
//! A Rust library for the Course Evaluations & Surveys (CES) REST API that
//! treats API resources as tables of rows and lets a relationship be followed
//! from every row of a table in one call.
//!
//! # Quick Start
//!
//! ```no_run
//! use cesapi::{CesClient, FilterSet};
//!
//! #[tokio::main]
//! async fn main() -> cesapi::Result<()> {
//!     // Create client from environment variables
//!     let client = CesClient::from_env()?;
//!
//!     // List courses whose name starts with "Bio"
//!     let filters = FilterSet::new().with("name", "Bio*")?;
//!     let courses = client.list_courses(&filters).await?;
//!     println!("Found {} courses", courses.len());
//!
//!     // One request per course; rows come back in course order
//!     let projects = client.resolve(&courses, "projects").await?;
//!
//!     // Names resolve to a relationship or a column
//!     let titles = client.invoke(&projects, "title").await?.into_column()?;
//!     println!("{:?}", titles.values);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`Registry`] - entity kinds, their fields and relationship edges
//! - [`RowCollection`] - an immutable table of rows tagged with a kind
//! - [`Resolver`] - fans a relationship out over every row of a collection
//! - [`Dispatcher`] - maps a name to a relationship or a column
//! - [`Transport`] - the fetch seam, implemented over HTTP by [`CesClient`]
//!
//! # Configuration
//!
//! The client reads configuration from environment variables:
//!
//! - `CES_API_KEY` (required) - Your CES API key
//! - `CES_API_URL` (required) - Instance URL, without `/api`

pub mod cli;
mod client;
mod collection;
mod config;
mod dispatch;
mod error;
mod filter;
pub mod output;
mod pagination;
mod query;
mod registry;
mod resolver;
mod table;
mod transport;

#[cfg(feature = "test-server")]
pub mod mock_server;

// Re-export core types
pub use client::CesClient;
pub use config::ClientConfig;
pub use error::{CesError, Result};
pub use pagination::{RecordPage, FIRST_PAGE, MAX_PAGES};
pub use transport::Transport;

// Re-export the entity model
pub use collection::RowCollection;
pub use registry::{Cardinality, EdgeSpec, EntityKind, KindDecl, PathTemplate, Registry, RegistryBuilder};
pub use table::{Column, Row, Table};

// Re-export traversal
pub use dispatch::{Dispatcher, Invocation, Target};
pub use resolver::{ResolveOptions, Resolver, SOURCE_ROW_COLUMN};

// Re-export query and filter types
pub use filter::{CompareOp, FilterExpr, FilterSet};
pub use query::{to_query, ProjectListQuery, Query, UserListQuery};
