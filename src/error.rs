//! Error types for the relation-graph query engine.
//!
//! Mirrors quaint's split between a `thiserror`-derived [`ErrorKind`] and an
//! opaque [`Error`] wrapper that callers match on via [`Error::kind`].

use std::fmt;

/// The engine's result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("unknown attribute(s): {0:?}")]
    UnknownAttribute(Vec<String>),

    #[error("unknown relation: {0}")]
    UnknownRelation(String),

    #[error("missing configuration key: {0}")]
    MissingConfig(String),

    #[error("malformed configuration: {0}")]
    MalformedConfig(String),

    #[error("invalid comparator `{comp}` for {context}")]
    InvalidComparator { comp: String, context: String },

    #[error("expected exactly one row, got {0}")]
    NotASingleton(usize),

    #[error("update/delete requires a constraint; pass `all(true)` to override")]
    MissingWhere,

    #[error("expected exactly one grouping element for `{0}`")]
    ExpectedOneElement(String),

    #[error("driver error: {0}")]
    Driver(String),
}

/// A boxed, `Display`-able error carrying an [`ErrorKind`].
///
/// Kept as a distinct struct (rather than using `ErrorKind` directly) so that
/// additional context can be attached later without breaking callers that
/// only match on `kind()`, following quaint's `Error`/`ErrorKind` split.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

#[cfg(feature = "postgres-native")]
impl From<tokio_postgres::Error> for Error {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::new(ErrorKind::Driver(err.to_string()))
    }
}
