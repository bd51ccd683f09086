//! Name-based access to relationships and columns.
//!
//! A name applied to a collection means one of two things: if the kind has a
//! relationship of that name, the relationship is traversed; otherwise, if
//! the kind declares or the rows carry a column of that name, the column is
//! projected. Relationships win when a name is both.

use std::sync::Arc;

use crate::collection::RowCollection;
use crate::error::{CesError, Result};
use crate::registry::{EdgeSpec, Registry};
use crate::resolver::{ResolveOptions, Resolver};
use crate::table::Column;
use crate::transport::Transport;

/// What a name refers to on a collection.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// A relationship of the collection's kind.
    Edge(&'a EdgeSpec),
    /// A declared or observed column.
    Field,
    /// Neither.
    Unknown,
}

/// Result of applying a name to a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// Rows of the related kind.
    Related(RowCollection),
    /// A projected column.
    Column(Column),
}

impl Invocation {
    /// The related collection.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::InvocationMismatch`] if this is a column.
    pub fn into_collection(self) -> Result<RowCollection> {
        match self {
            Invocation::Related(collection) => Ok(collection),
            Invocation::Column(column) => Err(CesError::InvocationMismatch {
                expected: "collection".to_string(),
                found: format!("column '{}'", column.name),
            }),
        }
    }

    /// The projected column.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::InvocationMismatch`] if this is a collection.
    pub fn into_column(self) -> Result<Column> {
        match self {
            Invocation::Column(column) => Ok(column),
            Invocation::Related(collection) => Err(CesError::InvocationMismatch {
                expected: "column".to_string(),
                found: format!("{} collection", collection.kind_name()),
            }),
        }
    }
}

/// Resolves names against a registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Classify `name` on `collection` without any I/O.
    ///
    /// A kind missing from the registry has no relationships, so only its
    /// columns classify.
    pub fn classify<'a>(&'a self, collection: &RowCollection, name: &str) -> Target<'a> {
        let edge = self
            .registry
            .lookup(collection.kind_name())
            .ok()
            .and_then(|kind| kind.edge(name));

        match edge {
            Some(edge) => Target::Edge(edge),
            None if collection.has_field(name) => Target::Field,
            None => Target::Unknown,
        }
    }

    /// Apply `name` to `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::UnknownKind`] if the collection's kind is not
    /// registered, [`CesError::UnknownAttribute`] without any request if
    /// `name` is neither a relationship nor a column, or any error of
    /// [`Resolver::resolve_with`] when traversing.
    #[tracing::instrument(skip(self, collection, transport, options), fields(kind = collection.kind_name()))]
    pub async fn invoke<T: Transport>(
        &self,
        collection: &RowCollection,
        name: &str,
        transport: T,
        options: &ResolveOptions,
    ) -> Result<Invocation> {
        self.registry.lookup(collection.kind_name())?;

        match self.classify(collection, name) {
            Target::Edge(_) => Resolver::new(self.registry.clone(), transport)
                .resolve_with(collection, name, options)
                .await
                .map(Invocation::Related),
            Target::Field => collection.project(name).map(Invocation::Column),
            Target::Unknown => Err(CesError::UnknownAttribute {
                kind: collection.kind_name().to_string(),
                name: name.to_string(),
            }),
        }
    }

    /// Apply a chain of names, each to the result of the previous one.
    ///
    /// Only the last name may be a column.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::NameAfterColumn`] if a name follows a column, or
    /// any error of [`invoke`](Self::invoke).
    pub async fn traverse<T, S>(
        &self,
        collection: &RowCollection,
        names: &[S],
        transport: T,
        options: &ResolveOptions,
    ) -> Result<Invocation>
    where
        T: Transport,
        S: AsRef<str>,
    {
        let mut current = Invocation::Related(collection.clone());

        for name in names {
            let name = name.as_ref();
            current = match current {
                Invocation::Related(collection) => {
                    self.invoke(&collection, name, &transport, options).await?
                }
                Invocation::Column(column) => {
                    return Err(CesError::NameAfterColumn {
                        column: column.name,
                        name: name.to_string(),
                    })
                }
            };
        }

        Ok(current)
    }
}
