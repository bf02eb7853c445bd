//! Classpath scanner: the cheap, name-only pass.
//!
//! The scanner walks every entry independently:
//! 1. An indexer that understands the entry lists its type names
//! 2. The names are recorded in the package tree
//!
//! A failing entry is logged and skipped; it never stops the scan.

use crate::tree::PackageTree;
use classdex_api::{ClasspathEntry, EntryIndexer};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Combines entry indexers
#[derive(Clone, Default)]
pub struct ClasspathScanner {
    indexers: Vec<Arc<dyn EntryIndexer>>,
}

impl ClasspathScanner {
    pub fn new() -> Self {
        Self {
            indexers: Vec::new(),
        }
    }

    /// Add an indexer
    pub fn add_indexer(mut self, indexer: Arc<dyn EntryIndexer>) -> Self {
        self.indexers.push(indexer);
        self
    }

    /// Add multiple indexers
    pub fn with_indexers(
        mut self,
        indexers: impl IntoIterator<Item = Arc<dyn EntryIndexer>>,
    ) -> Self {
        self.indexers.extend(indexers);
        self
    }

    /// Scan the entries into a new tree
    pub fn scan(&self, entries: &[ClasspathEntry]) -> (PackageTree, ScanReport) {
        let mut tree = PackageTree::new();
        let mut report = ScanReport::default();
        self.scan_into(entries, &mut tree, &mut report);
        (tree, report)
    }

    /// Scan the entries, in order, into an existing tree
    pub fn scan_into(
        &self,
        entries: &[ClasspathEntry],
        tree: &mut PackageTree,
        report: &mut ScanReport,
    ) {
        let start = Instant::now();

        for entry in entries {
            report.total_entries += 1;

            let Some(indexer) = self.find_indexer(entry) else {
                debug!("No indexer for {}", entry);
                report.skipped_entries += 1;
                continue;
            };

            let entry_start = Instant::now();
            match Self::index_entry(entry, indexer.as_ref()) {
                Ok(names) => {
                    let added = names
                        .iter()
                        .filter(|name| tree.insert_binary_name(name))
                        .count();
                    report.indexed_entries += 1;
                    report.types_recorded += added;
                    debug!(
                        "Indexed {}: {} types ({} new) in {:?}",
                        entry,
                        names.len(),
                        added,
                        entry_start.elapsed()
                    );
                }
                Err(reason) => {
                    warn!("Failed to index {}: {}", entry, reason);
                    report.failed_entries += 1;
                }
            }
        }

        report.duration += start.elapsed();
        info!(
            "Classpath scan pass complete: {} entries, {} indexed, {} failed, {} types in {:?}",
            report.total_entries,
            report.indexed_entries,
            report.failed_entries,
            report.types_recorded,
            report.duration
        );
    }

    /// Find an indexer that can handle the given entry
    fn find_indexer(&self, entry: &ClasspathEntry) -> Option<&Arc<dyn EntryIndexer>> {
        self.indexers.iter().find(|indexer| indexer.can_index(entry))
    }

    fn index_entry(entry: &ClasspathEntry, indexer: &dyn EntryIndexer) -> Result<Vec<String>, String> {
        // Archive readers may panic on malformed input; contain it to this entry.
        match panic::catch_unwind(AssertUnwindSafe(|| indexer.index(entry))) {
            Ok(Ok(names)) => Ok(names),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("indexer panicked".to_string()),
        }
    }
}

/// Result of a scan
#[derive(Debug, Default, Clone)]
pub struct ScanReport {
    /// Total number of entries visited
    pub total_entries: usize,
    /// Number of entries successfully indexed
    pub indexed_entries: usize,
    /// Number of entries skipped (no indexer available)
    pub skipped_entries: usize,
    /// Number of entries that failed to index
    pub failed_entries: usize,
    /// Number of distinct types added to the tree
    pub types_recorded: usize,
    /// Whether platform packages came from the persistent cache
    pub from_cache: bool,
    /// Time spent scanning
    pub duration: Duration,
}

impl ScanReport {
    /// Fold the counters of another pass into this report
    pub fn merge(&mut self, other: ScanReport) {
        self.total_entries += other.total_entries;
        self.indexed_entries += other.indexed_entries;
        self.skipped_entries += other.skipped_entries;
        self.failed_entries += other.failed_entries;
        self.types_recorded += other.types_recorded;
        self.from_cache |= other.from_cache;
        self.duration += other.duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classdex_api::{BoxError, EntryKind, EntryOrigin};
    use std::path::{Path, PathBuf};

    /// Mock indexer for testing
    struct MockIndexer {
        names: Vec<String>,
    }

    impl EntryIndexer for MockIndexer {
        fn can_index(&self, entry: &ClasspathEntry) -> bool {
            entry.kind == EntryKind::Archive
        }

        fn index(&self, entry: &ClasspathEntry) -> Result<Vec<String>, BoxError> {
            if entry.path.ends_with("broken.jar") {
                return Err("corrupt archive".into());
            }
            if entry.path.ends_with("panics.jar") {
                panic!("reader bug");
            }
            Ok(self.names.clone())
        }
    }

    fn archive(path: &str) -> ClasspathEntry {
        ClasspathEntry::new(PathBuf::from(path), EntryKind::Archive, EntryOrigin::Project)
    }

    fn scanner() -> ClasspathScanner {
        ClasspathScanner::new().add_indexer(Arc::new(MockIndexer {
            names: vec!["com.example.Foo".to_string(), "com.example.Bar".to_string()],
        }))
    }

    #[test]
    fn test_scanner_basic() {
        let (tree, report) = scanner().scan(&[archive("/a.jar")]);

        assert_eq!(report.total_entries, 1);
        assert_eq!(report.indexed_entries, 1);
        assert_eq!(report.types_recorded, 2);
        assert!(tree.find_type("com.example.Foo").is_some());
    }

    #[test]
    fn test_failures_do_not_abort_scan() {
        let (tree, report) = scanner().scan(&[
            archive("/broken.jar"),
            archive("/panics.jar"),
            archive("/good.jar"),
        ]);

        assert_eq!(report.failed_entries, 2);
        assert_eq!(report.indexed_entries, 1);
        assert_eq!(tree.type_count(), 2);
    }

    #[test]
    fn test_duplicate_entries_collapse() {
        let (tree, report) = scanner().scan(&[archive("/a.jar"), archive("/b.jar")]);

        assert_eq!(report.indexed_entries, 2);
        assert_eq!(report.types_recorded, 2);
        assert_eq!(tree.type_count(), 2);
    }

    #[test]
    fn test_rescan_into_filled_tree_counts_new_types() {
        let mut tree = PackageTree::new();
        tree.add_binary_name("com.example.Foo");
        tree.add_binary_name("org.other.Kept");
        let mut report = ScanReport::default();

        scanner().scan_into(&[archive("/a.jar")], &mut tree, &mut report);

        assert_eq!(report.types_recorded, 1);
        assert_eq!(tree.type_count(), 3);
        assert!(tree.find_type("com.example.Bar").is_some());
    }

    #[test]
    fn test_scanner_no_indexer() {
        let dir = ClasspathEntry::new(
            Path::new("/classes").to_path_buf(),
            EntryKind::Directory,
            EntryOrigin::Project,
        );
        let (tree, report) = scanner().scan(&[dir]);

        assert_eq!(report.skipped_entries, 1);
        assert!(tree.is_empty());
    }
}
