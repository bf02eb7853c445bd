//! Persistent cache of platform packages.
//!
//! Stores every package name and type name contributed by the platform
//! entries, so that later runs can skip walking the runtime image. A warm
//! tree must equal the cold one, so nothing is filtered out. The record
//! is keyed by the platform fingerprint (version + vendor): any mismatch
//! discards the whole record.
//!
//! The cache is an optimization only. Every failure here degrades to "no
//! cache" and is never surfaced to import callers.

use crate::error::{ClassdexError, Result};
use crate::tree::{PackageNode, PackageTree};
use classdex_api::{CacheStats, PlatformCacheManager};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

pub const CACHE_FORMAT_VERSION: u32 = 2;
pub const CACHE_FILE_NAME: &str = "platform-packages.cache";

/// One package with its directly declared types and sub-packages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPackage {
    pub types: Vec<String>,
    pub children: BTreeMap<String, CachedPackage>,
}

impl CachedPackage {
    fn from_node(node: &PackageNode) -> Self {
        Self {
            types: node.type_names().map(str::to_string).collect(),
            children: node
                .children()
                .map(|c| (c.name().to_string(), Self::from_node(c)))
                .collect(),
        }
    }

    fn restore_into(&self, tree: &mut PackageTree, path: &mut Vec<String>) {
        for name in &self.types {
            tree.add_type(path.as_slice(), name);
        }
        for (segment, child) in &self.children {
            path.push(segment.clone());
            child.restore_into(tree, path);
            path.pop();
        }
    }

    fn count(&self) -> (usize, usize) {
        self.children
            .values()
            .map(CachedPackage::count)
            .fold((0, self.types.len()), |(packages, types), (p, t)| {
                (packages + 1 + p, types + t)
            })
    }
}

/// On-disk cache file
#[derive(Debug, Serialize, Deserialize)]
pub struct PlatformCacheFile {
    pub version: u32,
    pub fingerprint: String,
    pub created_at: u64,
    pub root: CachedPackage,
}

/// Platform package cache manager
#[derive(Debug, Clone)]
pub struct PlatformCache {
    base_dir: PathBuf,
}

impl PlatformCache {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn cache_path(&self) -> PathBuf {
        self.base_dir.join(CACHE_FILE_NAME)
    }

    /// Load the cached platform packages for `fingerprint`.
    ///
    /// Returns `None` for a missing, unreadable, corrupt, outdated or
    /// mismatched cache. Never returns a partial tree.
    pub fn load(&self, fingerprint: &str) -> Option<PackageTree> {
        match self.try_load(fingerprint) {
            Ok(Some(tree)) => {
                info!(
                    "Loaded platform cache for '{}': {} types",
                    fingerprint,
                    tree.type_count()
                );
                Some(tree)
            }
            Ok(None) => None,
            Err(e) => {
                debug!("Ignoring unusable platform cache {:?}: {}", self.cache_path(), e);
                None
            }
        }
    }

    fn try_load(&self, fingerprint: &str) -> Result<Option<PackageTree>> {
        let path = self.cache_path();
        if !path.exists() {
            debug!("No platform cache at {:?}", path);
            return Ok(None);
        }

        let file = Self::read_file(&path)?;
        if file.version != CACHE_FORMAT_VERSION {
            debug!(
                "Platform cache format {} does not match {}",
                file.version, CACHE_FORMAT_VERSION
            );
            return Ok(None);
        }
        if file.fingerprint != fingerprint {
            debug!(
                "Platform cache fingerprint '{}' does not match '{}'",
                file.fingerprint, fingerprint
            );
            return Ok(None);
        }

        let mut tree = PackageTree::new();
        file.root.restore_into(&mut tree, &mut Vec::new());
        Ok(Some(tree))
    }

    fn read_file(path: &Path) -> Result<PlatformCacheFile> {
        let bytes = fs::read(path)?;
        let decompressed = zstd::decode_all(&bytes[..])?;
        Ok(rmp_serde::from_slice(&decompressed)?)
    }

    /// Persist `tree`, the packages contributed by the platform entries, for
    /// `fingerprint`.
    ///
    /// The file is
    /// written to a temporary sibling and renamed into place, so a failed
    /// write leaves the previous cache intact. Returns the number of types
    /// written.
    pub fn save(&self, fingerprint: &str, tree: &PackageTree) -> Result<usize> {
        let root = CachedPackage::from_node(tree.root());
        let (_, type_count) = root.count();

        let file = PlatformCacheFile {
            version: CACHE_FORMAT_VERSION,
            fingerprint: fingerprint.to_string(),
            created_at: now_secs(),
            root,
        };

        let bytes = rmp_serde::to_vec(&file)?;
        let compressed = zstd::encode_all(&bytes[..], 0)?;

        fs::create_dir_all(&self.base_dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.base_dir)?;
        tmp.write_all(&compressed)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.cache_path())
            .map_err(|e| ClassdexError::Io(e.error))?;

        info!(
            "Saved platform cache for '{}': {} types to {:?}",
            fingerprint,
            type_count,
            self.cache_path()
        );
        Ok(type_count)
    }

    /// Remove the cache file
    pub fn clear(&self) -> Result<()> {
        let path = self.cache_path();
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let cache_file = self.cache_path();
        let size_bytes = fs::metadata(&cache_file).map(|m| m.len()).ok();
        let mut stats = CacheStats {
            cache_file: cache_file.clone(),
            exists: size_bytes.is_some(),
            size_bytes: size_bytes.unwrap_or(0),
            format_version: None,
            fingerprint: None,
            created_at: None,
            package_count: 0,
            type_count: 0,
        };

        if let Ok(file) = Self::read_file(&cache_file) {
            let (packages, types) = file.root.count();
            stats.format_version = Some(file.version);
            stats.fingerprint = Some(file.fingerprint);
            stats.created_at = Some(file.created_at);
            stats.package_count = packages;
            stats.type_count = types;
        }

        stats
    }
}

impl PlatformCacheManager for PlatformCache {
    fn stats(&self) -> CacheStats {
        self.stats()
    }

    fn clear(&self) -> std::result::Result<(), String> {
        self.clear().map_err(|e| e.to_string())
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn platform_tree() -> PackageTree {
        let mut tree = PackageTree::new();
        tree.add_binary_name("java.lang.String");
        tree.add_binary_name("java.lang.Object");
        tree.add_binary_name("java.util.concurrent.Future");
        tree.add_binary_name("javax.swing.JFrame");
        tree.add_binary_name("netscape.javascript.JSObject");
        tree
    }

    #[test]
    fn test_round_trip() {
        let temp = TempDir::new().unwrap();
        let cache = PlatformCache::new(temp.path().to_path_buf());

        let written = cache.save("17.0.2 Eclipse Adoptium", &platform_tree()).unwrap();
        assert_eq!(written, 5);

        let loaded = cache.load("17.0.2 Eclipse Adoptium").expect("cache hit");
        assert_eq!(
            loaded.type_names(),
            vec![
                "java.lang.Object",
                "java.lang.String",
                "java.util.concurrent.Future",
                "javax.swing.JFrame",
                "netscape.javascript.JSObject"
            ]
        );
        assert_eq!(
            loaded.packages(),
            vec![
                "java.lang",
                "java.util.concurrent",
                "javax.swing",
                "netscape.javascript"
            ]
        );
    }

    #[test]
    fn test_fingerprint_mismatch() {
        let temp = TempDir::new().unwrap();
        let cache = PlatformCache::new(temp.path().to_path_buf());
        cache.save("17.0.2 Eclipse Adoptium", &platform_tree()).unwrap();

        assert!(cache.load("21.0.1 Eclipse Adoptium").is_none());
        assert!(cache.load("17.0.2").is_none());
    }

    #[test]
    fn test_missing_and_corrupt_files() {
        let temp = TempDir::new().unwrap();
        let cache = PlatformCache::new(temp.path().join("nested"));
        assert!(cache.load("17").is_none());

        fs::create_dir_all(cache.base_dir()).unwrap();
        fs::write(cache.cache_path(), b"definitely not a cache").unwrap();
        assert!(cache.load("17").is_none());

        let stats = cache.stats();
        assert!(stats.exists);
        assert!(stats.fingerprint.is_none());
    }

    #[test]
    fn test_save_replaces_previous_cache() {
        let temp = TempDir::new().unwrap();
        let cache = PlatformCache::new(temp.path().to_path_buf());
        cache.save("11", &platform_tree()).unwrap();

        let mut newer = PackageTree::new();
        newer.add_binary_name("java.lang.Record");
        cache.save("17", &newer).unwrap();

        assert!(cache.load("11").is_none());
        let loaded = cache.load("17").unwrap();
        assert_eq!(loaded.type_names(), vec!["java.lang.Record"]);

        // Only the cache file remains; the temporary file was renamed away.
        let files: Vec<_> = fs::read_dir(temp.path()).unwrap().flatten().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_stats_and_clear() {
        let temp = TempDir::new().unwrap();
        let cache = PlatformCache::new(temp.path().to_path_buf());
        cache.save("17", &platform_tree()).unwrap();

        let stats = cache.stats();
        assert!(stats.exists);
        assert_eq!(stats.format_version, Some(CACHE_FORMAT_VERSION));
        assert_eq!(stats.fingerprint.as_deref(), Some("17"));
        assert_eq!(stats.type_count, 5);
        // java, java.lang, java.util, java.util.concurrent, javax, javax.swing,
        // netscape, netscape.javascript
        assert_eq!(stats.package_count, 8);

        cache.clear().unwrap();
        assert!(!cache.stats().exists);
        assert!(cache.load("17").is_none());
    }
}
