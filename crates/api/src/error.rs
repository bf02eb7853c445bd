#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportSyntaxError {
    #[error("Empty import directive")]
    Empty,
    #[error("Invalid identifier '{segment}' in import '{text}'")]
    InvalidSegment { text: String, segment: String },
    #[error("Wildcard must be the last segment in import '{0}'")]
    MisplacedWildcard(String),
    #[error("Static import '{0}' must name a member of a type")]
    IncompleteStatic(String),
}

/// Failure to produce a shape for a type.
///
/// These never reach import callers: a handle whose resolution fails is
/// recorded as failed and omitted from results.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Type not found: {0}")]
    NotFound(String),
    #[error("Malformed class data for {name}: {reason}")]
    Malformed { name: String, reason: String },
    #[error("Linkage error for {name}: {reason}")]
    Linkage { name: String, reason: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ResolveResult<T> = std::result::Result<T, ResolveError>;
