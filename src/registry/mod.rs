//! Entity kinds and the relationship edges between them.
//!
//! A [`Registry`] is built once at startup from [`KindDecl`] declarations and
//! is read-only afterwards. It is shared as an `Arc<Registry>` and handed to
//! the resolver and dispatcher explicitly, so a process can hold several
//! registries (for example a test double next to [`Registry::ces`]).

mod ces;
mod template;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::{CesError, Result};

pub use template::PathTemplate;

/// How many target records a relationship yields per source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    /// At most one record per source row.
    One,
    /// Any number of records per source row.
    Many,
}

/// A validated relationship from one kind to another.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeSpec {
    name: String,
    source_kind: String,
    target_kind: String,
    path: PathTemplate,
    cardinality: Cardinality,
}

impl EdgeSpec {
    /// Edge name, as used for dispatch (e.g. `projects`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind the edge is declared on.
    pub fn source_kind(&self) -> &str {
        &self.source_kind
    }

    /// Kind of the related rows.
    pub fn target_kind(&self) -> &str {
        &self.target_kind
    }

    /// Sub-resource path template.
    pub fn path(&self) -> &PathTemplate {
        &self.path
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }
}

/// A registered entity kind: its declared fields and outgoing edges.
#[derive(Debug, Clone, Serialize)]
pub struct EntityKind {
    name: String,
    fields: Vec<String>,
    edges: BTreeMap<String, EdgeSpec>,
    root: Option<String>,
}

impl EntityKind {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared field names, in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Whether `field` is part of the declared schema.
    pub fn declares_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Outgoing edges, ordered by name.
    pub fn edges(&self) -> impl Iterator<Item = &EdgeSpec> {
        self.edges.values()
    }

    pub fn edge(&self, name: &str) -> Option<&EdgeSpec> {
        self.edges.get(name)
    }

    /// Root listing path, if the kind can be listed from the API root.
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// A kind with no fields, edges or root listing.
    ///
    /// Useful for collections whose kind is not known to any registry.
    pub fn bare(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fields: Vec::new(),
            edges: BTreeMap::new(),
            root: None,
        })
    }
}

#[derive(Debug, Clone)]
struct EdgeDecl {
    name: String,
    target: String,
    path: String,
    cardinality: Cardinality,
}

/// Declaration of an entity kind, consumed by [`RegistryBuilder::kind`].
///
/// # Example
///
/// ```
/// use cesapi::{KindDecl, Registry};
///
/// let registry = Registry::builder()
///     .kind(KindDecl::new("Course").fields(["id", "name"]).root("courses")
///         .many("projects", "Project", "courses/{id}/projects"))
///     .kind(KindDecl::new("Project").fields(["id", "title"]))
///     .build()
///     .unwrap();
///
/// let edge = registry.resolve_edge("Course", "projects").unwrap();
/// assert_eq!(edge.target_kind(), "Project");
/// ```
#[derive(Debug, Clone)]
pub struct KindDecl {
    name: String,
    fields: Vec<String>,
    root: Option<String>,
    edges: Vec<EdgeDecl>,
}

impl KindDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            root: None,
            edges: Vec::new(),
        }
    }

    /// Add declared field names. Duplicates are ignored.
    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field = field.into();
            if !self.fields.contains(&field) {
                self.fields.push(field);
            }
        }
        self
    }

    /// Set the root listing path.
    #[must_use]
    pub fn root(mut self, path: impl Into<String>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Declare an edge.
    #[must_use]
    pub fn edge(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        path: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        self.edges.push(EdgeDecl {
            name: name.into(),
            target: target.into(),
            path: path.into(),
            cardinality,
        });
        self
    }

    /// Declare a one-to-many edge.
    #[must_use]
    pub fn many(
        self,
        name: impl Into<String>,
        target: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        self.edge(name, target, path, Cardinality::Many)
    }

    /// Declare a one-to-one edge.
    #[must_use]
    pub fn one(
        self,
        name: impl Into<String>,
        target: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        self.edge(name, target, path, Cardinality::One)
    }
}

/// Collects kind declarations and validates them into a [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    kinds: Vec<KindDecl>,
}

impl RegistryBuilder {
    /// Register a kind.
    #[must_use]
    pub fn kind(mut self, decl: KindDecl) -> Self {
        self.kinds.push(decl);
        self
    }

    /// Validate all declarations.
    ///
    /// # Errors
    ///
    /// - [`CesError::DuplicateKind`] if a kind is declared twice.
    /// - [`CesError::MalformedEdge`] if an edge targets an unregistered kind,
    ///   has an unparsable path, or references a field its kind does not
    ///   declare.
    pub fn build(self) -> Result<Registry> {
        let mut names = BTreeSet::new();
        for decl in &self.kinds {
            if !names.insert(decl.name.as_str()) {
                return Err(CesError::DuplicateKind(decl.name.clone()));
            }
        }

        let mut kinds = BTreeMap::new();
        for decl in &self.kinds {
            let mut edges = BTreeMap::new();

            for edge in &decl.edges {
                let malformed = |reason: String| CesError::MalformedEdge {
                    kind: decl.name.clone(),
                    edge: edge.name.clone(),
                    reason,
                };

                if !names.contains(edge.target.as_str()) {
                    return Err(malformed(format!(
                        "target kind '{}' is not registered",
                        edge.target
                    )));
                }

                let path = PathTemplate::parse(&edge.path).map_err(malformed)?;
                if let Some(field) = path.fields().find(|f| !decl.fields.iter().any(|d| d == f)) {
                    return Err(malformed(format!(
                        "path '{path}' references undeclared field '{field}'"
                    )));
                }

                let spec = EdgeSpec {
                    name: edge.name.clone(),
                    source_kind: decl.name.clone(),
                    target_kind: edge.target.clone(),
                    path,
                    cardinality: edge.cardinality,
                };
                if edges.insert(edge.name.clone(), spec).is_some() {
                    return Err(malformed("edge is declared twice".to_string()));
                }
            }

            let kind = EntityKind {
                name: decl.name.clone(),
                fields: decl.fields.clone(),
                edges,
                root: decl.root.as_ref().map(|r| r.trim_start_matches('/').to_string()),
            };
            kinds.insert(decl.name.clone(), Arc::new(kind));
        }

        tracing::debug!(kinds = kinds.len(), "entity registry built");
        Ok(Registry { kinds })
    }
}

/// Immutable set of entity kinds and their relationships.
#[derive(Debug, Clone)]
pub struct Registry {
    kinds: BTreeMap<String, Arc<EntityKind>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Look up a kind by name.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::UnknownKind`] if the kind is not registered.
    pub fn lookup(&self, kind: &str) -> Result<&Arc<EntityKind>> {
        self.kinds
            .get(kind)
            .ok_or_else(|| CesError::UnknownKind(kind.to_string()))
    }

    /// Look up an edge of a kind.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::UnknownKind`] or [`CesError::UnknownEdge`].
    pub fn resolve_edge(&self, kind: &str, edge: &str) -> Result<&EdgeSpec> {
        self.lookup(kind)?
            .edge(edge)
            .ok_or_else(|| CesError::UnknownEdge {
                kind: kind.to_string(),
                edge: edge.to_string(),
            })
    }

    /// All kinds, ordered by name.
    pub fn kinds(&self) -> impl Iterator<Item = &Arc<EntityKind>> {
        self.kinds.values()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }
}

impl Serialize for Registry {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.kinds.values().map(AsRef::<EntityKind>::as_ref))
    }
}
