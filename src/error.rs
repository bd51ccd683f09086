//! Error types for CES API operations.

use thiserror::Error;

/// Errors that can occur while listing, traversing or dispatching on CES
/// entities.
///
/// Variants fall into three groups that callers usually want to tell apart:
/// schema errors (a relationship, attribute or kind name is wrong), transport
/// errors (the server or network failed) and data errors (the upstream data
/// violated a declared invariant).
#[derive(Debug, Error)]
pub enum CesError {
    /// Configuration is missing or incomplete.
    #[error("CES configuration required: {0}")]
    ConfigMissing(String),

    /// Configuration value is present but unusable.
    #[error("Invalid CES configuration: {0}")]
    InvalidConfig(String),

    /// Entity kind is not registered.
    #[error("Unknown entity kind '{0}'")]
    UnknownKind(String),

    /// Entity kind was registered more than once.
    #[error("Entity kind '{0}' is already registered")]
    DuplicateKind(String),

    /// Entity kind has no relationship with this name.
    #[error("{kind} has no relationship named '{edge}'")]
    UnknownEdge { kind: String, edge: String },

    /// Name is neither a relationship nor a column of the kind.
    #[error("{kind} has no relationship or column named '{name}'")]
    UnknownAttribute { kind: String, name: String },

    /// An invocation result was taken as the other shape.
    #[error("Expected a {expected}, found {found}")]
    InvocationMismatch { expected: String, found: String },

    /// A name was applied to a projected column.
    #[error("Cannot apply '{name}' to column '{column}'")]
    NameAfterColumn { column: String, name: String },

    /// Column is neither declared on the kind nor present in any row.
    #[error("{kind} has no column named '{field}'")]
    UnknownField { kind: String, field: String },

    /// Entity kind cannot be listed from the API root.
    #[error("{0} has no root listing endpoint")]
    NoRootListing(String),

    /// Relationship declaration cannot be rendered into a request path.
    #[error("Malformed relationship {kind}.{edge}: {reason}")]
    MalformedEdge {
        kind: String,
        edge: String,
        reason: String,
    },

    /// A `one` relationship returned more than one record for a row.
    #[error("{kind}.{edge} expects at most one record but row {row_index} returned {count}")]
    CardinalityViolation {
        kind: String,
        edge: String,
        row_index: usize,
        count: usize,
    },

    /// A row lacks a usable `_source_row_index` for joining back to its
    /// source collection.
    #[error("Row {row_index} has no valid _source_row_index")]
    MissingSourceRow { row_index: usize },

    /// Operation across collections of different kinds.
    #[error("Kind mismatch: expected {expected}, found {found}")]
    KindMismatch { expected: String, found: String },

    /// Filter expression could not be parsed.
    #[error("Invalid filter '{0}'")]
    InvalidFilter(String),

    /// The API token was rejected.
    #[error("The token is not valid")]
    Unauthorized,

    /// Resource not found.
    #[error("Resource '{path}' not found")]
    NotFound { path: String },

    /// Request parameters were rejected.
    #[error("The request parameters are not valid: {0}")]
    UnprocessableEntity(String),

    /// API request failed.
    #[error("CES API error: {message}")]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("Failed to parse response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    /// Rate limited.
    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// A per-row fetch failed during a relationship fan-out.
    #[error("Fetching '{path}' for row {row_index} failed: {source}")]
    RowFetch {
        row_index: usize,
        path: String,
        #[source]
        source: Box<CesError>,
    },

    /// The operation was cancelled or ran past its deadline.
    #[error("Operation cancelled")]
    Cancelled,
}

impl CesError {
    /// The error with any fan-out row context removed.
    pub fn root_cause(&self) -> &CesError {
        match self {
            CesError::RowFetch { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Source row index when the error was raised mid fan-out.
    pub fn row_index(&self) -> Option<usize> {
        match self {
            CesError::RowFetch { row_index, .. } => Some(*row_index),
            CesError::CardinalityViolation { row_index, .. } => Some(*row_index),
            _ => None,
        }
    }

    /// Whether the error originated in the server or the network.
    pub fn is_transport(&self) -> bool {
        matches!(
            self.root_cause(),
            CesError::Unauthorized
                | CesError::NotFound { .. }
                | CesError::UnprocessableEntity(_)
                | CesError::ApiError { .. }
                | CesError::HttpError(_)
                | CesError::ParseError(_)
                | CesError::RateLimited { .. }
        )
    }
}

/// Result type alias for CES operations.
pub type Result<T> = core::result::Result<T, CesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_row_context() {
        let err = CesError::RowFetch {
            row_index: 3,
            path: "courses/7/projects".to_string(),
            source: Box::new(CesError::Unauthorized),
        };

        assert!(matches!(err.root_cause(), CesError::Unauthorized));
        assert_eq!(err.row_index(), Some(3));
        assert!(err.is_transport());
        assert!(err.to_string().contains("row 3"));
    }

    #[test]
    fn test_schema_errors_are_not_transport() {
        let err = CesError::UnknownEdge {
            kind: "Course".to_string(),
            edge: "foo".to_string(),
        };
        assert!(!err.is_transport());
        assert_eq!(err.row_index(), None);
    }
}
