//! Classpath type discovery and import resolution.
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │  ImportResolver  │──▶│ ScanCoordinator  │──▶│ ClasspathScanner │
//! └────────┬─────────┘   └────────┬─────────┘   └──────────────────┘
//!          │                      │ ready
//!          ▼                      ▼
//! ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │  ShapeProvider   │◀──│   PackageTree    │◀─▶│  PlatformCache   │
//! └──────────────────┘   └──────────────────┘   └──────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod resolver;
pub mod scan;
pub mod tree;

pub use cache::PlatformCache;
pub use config::ClassdexConfig;
pub use coordinator::{ScanCoordinator, ScanPhase};
pub use error::{ClassdexError, Result};
pub use resolver::{ImportResolver, ImportedType};
pub use scan::{ClasspathScanner, ScanReport};
pub use tree::{PackageNode, PackageTree, ResolutionState, TypeHandle};
