pub mod cache;
pub mod classpath;
pub mod error;
pub mod import;
pub mod models;
pub mod shape;

// Re-export commonly used types
pub use cache::{CacheStats, PlatformCacheManager};
pub use classpath::{BoxError, ClasspathEntry, EntryIndexer, EntryKind, EntryOrigin};
pub use error::{ImportSyntaxError, ResolveError, ResolveResult};
pub use import::ImportDirective;
pub use models::*;
pub use shape::{OBJECT, ShapeProvider, SharedShape, TypeShape};
