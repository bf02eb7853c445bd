//! Import resolution: the query surface used by completion and auto-import.

use crate::coordinator::ScanCoordinator;
use crate::tree::{PackageTree, TypeHandle};
use classdex_api::import::WILDCARD;
use classdex_api::{ImportDirective, ImportSyntaxError, ShapeProvider, SharedShape};
use std::sync::Arc;
use tracing::{debug, warn};

/// A type brought into scope by an import, with its resolved shape
#[derive(Debug, Clone)]
pub struct ImportedType {
    pub handle: Arc<TypeHandle>,
    pub shape: SharedShape,
}

impl ImportedType {
    pub fn fqn(&self) -> &str {
        self.handle.fqn()
    }
}

pub struct ImportResolver {
    coordinator: Arc<ScanCoordinator>,
    provider: Arc<dyn ShapeProvider>,
}

impl ImportResolver {
    pub fn new(coordinator: Arc<ScanCoordinator>, provider: Arc<dyn ShapeProvider>) -> Self {
        Self {
            coordinator,
            provider,
        }
    }

    pub fn coordinator(&self) -> &Arc<ScanCoordinator> {
        &self.coordinator
    }

    /// Kick off the classpath scan without waiting for it
    pub fn start_scanning(&self) {
        self.coordinator.ensure_started();
    }

    /// Types named by `chain` under the dotted package `prefix` (empty for
    /// the root).
    ///
    /// A trailing `*` selects every type declared directly in the package
    /// reached by the preceding segments; otherwise the last segment names a
    /// single type. Unknown packages or types yield an empty list, as do
    /// types whose shape cannot be resolved. Blocks until the scan finishes.
    pub fn resolve_import<S: AsRef<str>>(&self, prefix: &str, chain: &[S]) -> Vec<ImportedType> {
        let tree = match self.coordinator.wait_ready() {
            Ok(tree) => tree,
            Err(e) => {
                warn!("Classpath unavailable for import resolution: {}", e);
                return Vec::new();
            }
        };
        resolve_handles(self.provider.as_ref(), select_handles(&tree, prefix, chain))
    }

    /// Async variant of [`resolve_import`](Self::resolve_import). Shape
    /// resolution reads class files and runs on the blocking pool.
    pub async fn resolve_import_async<S: AsRef<str>>(
        &self,
        prefix: &str,
        chain: &[S],
    ) -> Vec<ImportedType> {
        let tree = match self.coordinator.ready().await {
            Ok(tree) => tree,
            Err(e) => {
                warn!("Classpath unavailable for import resolution: {}", e);
                return Vec::new();
            }
        };

        let handles = select_handles(&tree, prefix, chain);
        if handles.is_empty() {
            return Vec::new();
        }

        let provider = Arc::clone(&self.provider);
        match tokio::task::spawn_blocking(move || resolve_handles(provider.as_ref(), handles)).await
        {
            Ok(types) => types,
            Err(e) => {
                warn!("Shape resolution task failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Parse an import directive and return the types it brings into scope.
    ///
    /// Only malformed syntax is an error. Static imports resolve to the
    /// declaring type.
    pub fn get_imported_types(&self, text: &str) -> Result<Vec<ImportedType>, ImportSyntaxError> {
        let directive = ImportDirective::parse(text)?;
        debug!("Resolving {}", directive);
        Ok(self.resolve_import("", &directive.type_chain()))
    }

    /// Names of the sub-packages of the dotted package `prefix`, sorted
    pub fn known_packages(&self, prefix: &str) -> Vec<String> {
        let Ok(tree) = self.coordinator.wait_ready() else {
            return Vec::new();
        };
        tree.lookup_dotted(prefix)
            .map(|node| node.children().map(|c| c.name().to_string()).collect())
            .unwrap_or_default()
    }

    /// Flush the platform part of the index to the persistent cache
    pub fn save_cached_imports(&self) -> bool {
        self.coordinator.save_cache()
    }
}

fn select_handles<S: AsRef<str>>(
    tree: &PackageTree,
    prefix: &str,
    chain: &[S],
) -> Vec<Arc<TypeHandle>> {
    let mut path: Vec<&str> = prefix.split('.').filter(|s| !s.is_empty()).collect();
    path.extend(chain.iter().map(AsRef::as_ref));

    let Some((last, package)) = path.split_last() else {
        return Vec::new();
    };
    let Some(node) = tree.lookup(package) else {
        return Vec::new();
    };

    if *last == WILDCARD {
        node.types().cloned().collect()
    } else {
        node.type_handle(last).cloned().into_iter().collect()
    }
}

fn resolve_handles(provider: &dyn ShapeProvider, handles: Vec<Arc<TypeHandle>>) -> Vec<ImportedType> {
    handles
        .into_iter()
        .filter_map(|handle| {
            let shape = handle.resolve(provider)?;
            Some(ImportedType { handle, shape })
        })
        .collect()
}
