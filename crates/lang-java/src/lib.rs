//! Java platform support: classpath indexing, class loading and type shapes
//! backed by class files.

pub mod class;
pub mod converter;
pub mod error;
pub mod index;
pub mod jdk;
pub mod loader;
pub mod shape;
pub mod signature;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use class::LoadedClass;
pub use error::LoadError;
pub use index::JavaEntryIndexer;
pub use jdk::JdkInstallation;
pub use loader::ClasspathLoader;
pub use shape::{DetachedShape, LoadedShape, Primitive, RuntimeType};
