use classdex_api::ResolveError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Class not found: {0}")]
    NotFound(String),

    #[error("Malformed class file for {name}: {reason}")]
    Malformed { name: String, reason: String },

    #[error("Expected class {expected} but the class file declares {found}")]
    NameMismatch { expected: String, found: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Class loader is no longer available")]
    LoaderDropped,
}

impl From<LoadError> for ResolveError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::NotFound(name) => ResolveError::NotFound(name),
            LoadError::Malformed { name, reason } => ResolveError::Malformed { name, reason },
            LoadError::NameMismatch { expected, found } => ResolveError::Linkage {
                name: expected,
                reason: format!("class file declares {}", found),
            },
            other => ResolveError::Internal(other.to_string()),
        }
    }
}
