//! Relationship fan-out.
//!
//! Following an edge from a collection issues one sub-resource request per
//! source row and concatenates the results, in row order, into a single
//! collection of the target kind.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;

use crate::collection::RowCollection;
use crate::error::{CesError, Result};
use crate::query::Query;
use crate::registry::{Cardinality, Registry};
use crate::table::Row;
use crate::transport::Transport;

/// Column added to resolved rows when
/// [`ResolveOptions::tag_source_rows`] is set.
pub const SOURCE_ROW_COLUMN: &str = "_source_row_index";

/// Knobs for a single resolve call.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Maximum per-row requests in flight. `1` fetches sequentially.
    pub concurrency: usize,
    /// Query parameters sent with every per-row request.
    pub query: Query,
    /// Add a [`SOURCE_ROW_COLUMN`] column holding the index of the source row
    /// each result came from.
    pub tag_source_rows: bool,
    /// Abort with [`CesError::Cancelled`] if the fan-out takes longer.
    pub deadline: Option<Duration>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            query: Query::new(),
            tag_source_rows: false,
            deadline: None,
        }
    }
}

impl ResolveOptions {
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_source_rows(mut self) -> Self {
        self.tag_source_rows = true;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Resolves relationship edges against a [`Transport`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use cesapi::{CesClient, Registry, Resolver, ResolveOptions};
///
/// # async fn example() -> cesapi::Result<()> {
/// let client = CesClient::from_env()?;
/// let resolver = Resolver::new(Arc::new(Registry::ces()), client.clone());
///
/// let courses = client.list_courses(&Default::default()).await?;
/// let options = ResolveOptions::default().with_concurrency(8);
/// let projects = resolver.resolve_with(&courses, "projects", &options).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Resolver<T> {
    registry: Arc<Registry>,
    transport: T,
}

impl<T: Transport> Resolver<T> {
    pub fn new(registry: Arc<Registry>, transport: T) -> Self {
        Self {
            registry,
            transport,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Follow `edge` from every row of `collection`, sequentially.
    ///
    /// # Errors
    ///
    /// See [`resolve_until`](Self::resolve_until).
    pub async fn resolve(&self, collection: &RowCollection, edge: &str) -> Result<RowCollection> {
        self.resolve_with(collection, edge, &ResolveOptions::default())
            .await
    }

    /// Follow `edge` with explicit options.
    ///
    /// # Errors
    ///
    /// See [`resolve_until`](Self::resolve_until).
    pub async fn resolve_with(
        &self,
        collection: &RowCollection,
        edge: &str,
        options: &ResolveOptions,
    ) -> Result<RowCollection> {
        self.resolve_until(collection, edge, options, std::future::pending::<()>())
            .await
    }

    /// Follow `edge`, giving up as soon as `cancel` completes.
    ///
    /// The result holds, for each source row in order, the records fetched
    /// for that row. An empty collection resolves to an empty collection of
    /// the target kind without touching the transport.
    ///
    /// # Errors
    ///
    /// - [`CesError::UnknownKind`] / [`CesError::UnknownEdge`] before any
    ///   request is made.
    /// - [`CesError::MalformedEdge`] if any row cannot fill the path template;
    ///   every path is rendered before the first request.
    /// - [`CesError::RowFetch`] wrapping the transport error of the first
    ///   failing row.
    /// - [`CesError::CardinalityViolation`] if a `one` edge returns more than
    ///   one record for a row.
    /// - [`CesError::Cancelled`] on deadline or cancellation. Partial results
    ///   are discarded.
    #[tracing::instrument(
        skip(self, collection, options, cancel),
        fields(kind = collection.kind_name(), rows = collection.len())
    )]
    pub async fn resolve_until<F>(
        &self,
        collection: &RowCollection,
        edge: &str,
        options: &ResolveOptions,
        cancel: F,
    ) -> Result<RowCollection>
    where
        F: Future<Output = ()>,
    {
        let spec = self.registry.resolve_edge(collection.kind_name(), edge)?;
        let target = self.registry.lookup(spec.target_kind())?.clone();

        if collection.is_empty() {
            return Ok(RowCollection::empty(target));
        }

        let paths = collection
            .rows()
            .map(|row| {
                spec.path()
                    .render(row)
                    .map_err(|reason| CesError::MalformedEdge {
                        kind: collection.kind_name().to_string(),
                        edge: edge.to_string(),
                        reason,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let check = RowCheck {
            kind: collection.kind_name(),
            edge,
            cardinality: spec.cardinality(),
            tag_source_rows: options.tag_source_rows,
        };

        let fan_out = async {
            match options.deadline {
                Some(deadline) => {
                    tokio::time::timeout(deadline, self.fan_out(&paths, &check, options))
                        .await
                        .map_err(|_| {
                            tracing::warn!(?deadline, "resolve deadline exceeded");
                            CesError::Cancelled
                        })?
                }
                None => self.fan_out(&paths, &check, options).await,
            }
        };

        let per_row = tokio::select! {
            result = fan_out => result?,
            () = cancel => {
                tracing::warn!("resolve cancelled");
                return Err(CesError::Cancelled);
            }
        };

        let resolved = RowCollection::of(target, per_row.into_iter().flatten());
        tracing::debug!(
            target_kind = resolved.kind_name(),
            results = resolved.len(),
            "edge resolved"
        );
        Ok(resolved)
    }

    /// Fetch every path, returning one record list per path in input order.
    ///
    /// Each row is checked as soon as its fetch returns, so the first failure
    /// in row order ends the fan-out. Rows past the concurrency window are
    /// never requested.
    async fn fan_out(
        &self,
        paths: &[String],
        check: &RowCheck<'_>,
        options: &ResolveOptions,
    ) -> Result<Vec<Vec<Row>>> {
        let query = &options.query;
        let fetches = paths.iter().enumerate().map(|(row_index, path)| async move {
            let records = self
                .transport
                .fetch(path, query)
                .await
                .map_err(|source| CesError::RowFetch {
                    row_index,
                    path: path.clone(),
                    source: Box::new(source),
                })?;
            check.apply(row_index, records)
        });

        if options.concurrency <= 1 {
            let mut results = Vec::with_capacity(paths.len());
            for fetch in fetches {
                results.push(fetch.await?);
            }
            Ok(results)
        } else {
            stream::iter(fetches)
                .buffered(options.concurrency)
                .try_collect()
                .await
        }
    }
}

/// Per-row post-processing applied during fan-out.
struct RowCheck<'a> {
    kind: &'a str,
    edge: &'a str,
    cardinality: Cardinality,
    tag_source_rows: bool,
}

impl RowCheck<'_> {
    fn apply(&self, row_index: usize, mut records: Vec<Row>) -> Result<Vec<Row>> {
        if self.cardinality == Cardinality::One && records.len() > 1 {
            return Err(CesError::CardinalityViolation {
                kind: self.kind.to_string(),
                edge: self.edge.to_string(),
                row_index,
                count: records.len(),
            });
        }
        if self.tag_source_rows {
            for record in &mut records {
                record.insert(SOURCE_ROW_COLUMN.to_string(), Value::from(row_index));
            }
        }
        Ok(records)
    }
}
