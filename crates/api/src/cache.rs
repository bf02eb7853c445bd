use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Statistics for the platform package cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub cache_file: PathBuf,
    pub exists: bool,
    pub size_bytes: u64,
    pub format_version: Option<u32>,
    pub fingerprint: Option<String>,
    pub created_at: Option<u64>,
    pub package_count: usize,
    pub type_count: usize,
}

/// Service interface for managing the platform package cache
pub trait PlatformCacheManager: Send + Sync {
    /// Get cache statistics
    fn stats(&self) -> CacheStats;

    /// Remove the cache file
    fn clear(&self) -> Result<(), String>;
}
