//! Classpath entry model and the indexer abstraction used by the scan engine.
//!
//! A classpath is an ordered list of entries. Each entry is either a directory
//! tree of class files, an archive (jar, zip, jmod), or a platform runtime image.
//! Entries also carry their origin, which decides whether the packages they
//! contribute are eligible for the persistent platform cache.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Error type for entry indexing
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Physical layout of a classpath entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Directory root containing `pkg/Name.class` files
    Directory,
    /// Zip based archive (jar, zip, jmod)
    Archive,
    /// Java 9+ runtime image (`lib/modules`)
    RuntimeImage,
}

/// Where an entry comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryOrigin {
    /// Platform runtime library; cacheable across runs
    Platform,
    /// Library or output directory referenced by the project; always rescanned
    Project,
}

impl EntryOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryOrigin::Platform => "platform",
            EntryOrigin::Project => "project",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClasspathEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    pub origin: EntryOrigin,
}

impl ClasspathEntry {
    pub fn new(path: PathBuf, kind: EntryKind, origin: EntryOrigin) -> Self {
        Self { path, kind, origin }
    }

    /// Infer the entry kind from the path on disk.
    ///
    /// Missing paths are treated as archives; indexing them fails later and
    /// the scan skips them.
    pub fn detect(path: impl Into<PathBuf>, origin: EntryOrigin) -> Self {
        let path = path.into();
        let kind = if path.is_dir() {
            EntryKind::Directory
        } else if path.file_name().and_then(|n| n.to_str()) == Some("modules") {
            EntryKind::RuntimeImage
        } else {
            EntryKind::Archive
        };
        Self { path, kind, origin }
    }

    pub fn project(path: impl Into<PathBuf>) -> Self {
        Self::detect(path, EntryOrigin::Project)
    }

    pub fn platform(path: impl Into<PathBuf>) -> Self {
        Self::detect(path, EntryOrigin::Platform)
    }

    pub fn is_platform(&self) -> bool {
        self.origin == EntryOrigin::Platform
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for ClasspathEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}, {})", self.path.display(), self.kind, self.origin.as_str())
    }
}

/// Entry indexer - knows how to read the internal structure of an entry.
///
/// Indexing is the cheap pass: it reports type names only and never reads
/// class contents.
pub trait EntryIndexer: Send + Sync {
    /// Check if this indexer can handle the entry
    fn can_index(&self, entry: &ClasspathEntry) -> bool;

    /// List the binary names of the top-level types in the entry,
    /// e.g. `java.lang.String`.
    ///
    /// An error means the entry contributes nothing.
    fn index(&self, entry: &ClasspathEntry) -> Result<Vec<String>, BoxError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_kinds() {
        let temp = std::env::temp_dir();
        assert_eq!(
            ClasspathEntry::project(&temp).kind,
            EntryKind::Directory
        );
        assert_eq!(
            ClasspathEntry::platform("/nonexistent/jdk/lib/modules").kind,
            EntryKind::RuntimeImage
        );
        let jar = ClasspathEntry::project("/nonexistent/lib/app.jar");
        assert_eq!(jar.kind, EntryKind::Archive);
        assert!(!jar.is_platform());
    }
}
