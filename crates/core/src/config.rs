//! Runtime configuration.
//!
//! Read from `~/.classdex/config.json` when present, then overridden by
//! environment variables:
//! - `CLASSDEX_CACHE_DIR`: directory for the platform cache
//! - `CLASSDEX_NO_CACHE`: disable the platform cache when set to anything but `0`

use crate::cache::PlatformCache;
use crate::error::{ClassdexError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const BASE_DIR_NAME: &str = ".classdex";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_SCAN_THREAD_NAME: &str = "classdex-scan";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassdexConfig {
    /// Directory holding the platform package cache
    pub cache_dir: PathBuf,
    pub cache_enabled: bool,
    /// Scan platform entries even when the cache is valid, merging the
    /// cached packages underneath the fresh ones
    pub rescan_platform: bool,
    /// Name of the dedicated scan thread
    pub scan_thread_name: String,
}

impl Default for ClassdexConfig {
    fn default() -> Self {
        Self {
            cache_dir: Self::base_dir().join("cache"),
            cache_enabled: true,
            rescan_platform: false,
            scan_thread_name: DEFAULT_SCAN_THREAD_NAME.to_string(),
        }
    }
}

impl ClassdexConfig {
    /// `~/.classdex`, or `./.classdex` when no home directory is known
    pub fn base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(BASE_DIR_NAME)
    }

    pub fn default_config_path() -> PathBuf {
        Self::base_dir().join(CONFIG_FILE_NAME)
    }

    /// Load the default config file (if any) and apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::default_config_path();
        let config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| ClassdexError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production)
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup("CLASSDEX_CACHE_DIR").filter(|d| !d.is_empty()) {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(flag) = lookup("CLASSDEX_NO_CACHE") {
            if flag != "0" {
                self.cache_enabled = false;
            }
        }
        self
    }

    /// The platform cache, if enabled
    pub fn platform_cache(&self) -> Option<PlatformCache> {
        self.cache_enabled
            .then(|| PlatformCache::new(self.cache_dir.clone()))
    }
}
