//! Error types for pgexpr

use crate::schema::TableId;
use thiserror::Error;

/// Result type alias for pgexpr operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for expression resolution
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Expression resolution failed
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Table ordering failed
    #[error("Dependency error: {0}")]
    Dependency(#[from] DependencyError),

    /// Invalid schema model (unknown table/column, bad name, ...)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Statement execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Wrap a driver error, keeping the server message when there is one.
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            return Self::Other(format!("{}: {}", db_err.code().code(), db_err.message()));
        }
        Self::Query(err)
    }

    /// Check if this is a resolution error
    pub fn is_resolve(&self) -> bool {
        matches!(self, Self::Resolve(_))
    }

    /// Check if this is a dependency (cycle) error
    pub fn is_dependency(&self) -> bool {
        matches!(self, Self::Dependency(_))
    }
}

/// A failed resolution, carried as the ordered path of operators and operands
/// leading to the failing leaf.
///
/// Rendered as the segments joined by `" -> "`, e.g.
/// `sum -> 1 -> undefined` or `switch statement -> cases -> 0 -> when -> undefined`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .path.join(" -> "))]
pub struct ResolveError {
    path: Vec<String>,
}

impl ResolveError {
    /// A value was absent outside of ignore mode.
    pub const UNDEFINED: &'static str = "undefined";
    /// A child resolved to neutral outside of ignore mode.
    pub const NEUTRAL: &'static str = "neutral";
    /// Nothing to emit (no operands, no cases, empty raw text).
    pub const EMPTY: &'static str = "empty";

    /// Create an error with a single leaf segment.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            path: vec![reason.into()],
        }
    }

    pub fn undefined() -> Self {
        Self::new(Self::UNDEFINED)
    }

    pub fn neutral() -> Self {
        Self::new(Self::NEUTRAL)
    }

    pub fn empty() -> Self {
        Self::new(Self::EMPTY)
    }

    /// Prepend a segment naming the enclosing operator or operand.
    #[must_use]
    pub fn within(mut self, segment: impl Into<String>) -> Self {
        self.path.insert(0, segment.into());
        self
    }

    /// Prepend a 0-based child index.
    #[must_use]
    pub fn at(self, index: usize) -> Self {
        self.within(index.to_string())
    }

    /// The ordered path segments, outermost first.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The innermost segment (the reason).
    pub fn reason(&self) -> &str {
        self.path.last().map_or("", String::as_str)
    }
}

/// Failure to order tables by foreign-key dependency.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// Two tables reference each other directly.
    #[error("bidirectional dependency between {first} and {second}")]
    Bidirectional { first: String, second: String },

    /// A longer reference cycle. The first table is repeated at the end.
    #[error("circular dependency: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },

    /// A handle that does not belong to the catalog.
    #[error("unknown table handle {0:?}")]
    UnknownTable(TableId),
}
