//! JDK discovery.
//!
//! Locates the platform runtime from:
//! - `JAVA_HOME`
//! - the macOS `java_home` tool
//! - common installation roots and SDKMAN
//!
//! and derives the fingerprint that keys the platform cache.

use classdex_api::{ClasspathEntry, EntryKind, EntryOrigin};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

static RELEASE_LINE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"^\s*([A-Z_]+)\s*=\s*"?([^"]*)"?\s*$"#).ok());

static VERSION_IN_PATH: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"jdk-?(\d+(?:\.\d+)*)").ok());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JdkInstallation {
    home: PathBuf,
    entries: Vec<ClasspathEntry>,
    version: Option<String>,
    vendor: Option<String>,
}

impl JdkInstallation {
    /// Find the first usable JDK on this machine
    pub fn discover() -> Option<Self> {
        if let Ok(java_home) = std::env::var("JAVA_HOME") {
            if let Some(jdk) = Self::from_home(Path::new(&java_home)) {
                return Some(jdk);
            }
        }

        #[cfg(target_os = "macos")]
        if let Ok(output) = std::process::Command::new("/usr/libexec/java_home").output() {
            if output.status.success() {
                let home = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if let Some(jdk) = Self::from_home(Path::new(&home)) {
                    return Some(jdk);
                }
            }
        }

        Self::search_roots()
            .into_iter()
            .filter(|root| root.exists())
            .find_map(|root| Self::search_root(&root))
    }

    fn search_roots() -> Vec<PathBuf> {
        let mut roots = Vec::new();

        #[cfg(target_os = "macos")]
        {
            roots.push(PathBuf::from("/Library/Java/JavaVirtualMachines/"));
            roots.push(PathBuf::from("/opt/homebrew/opt/openjdk/"));
            roots.push(PathBuf::from("/usr/local/opt/openjdk/"));
        }
        #[cfg(target_os = "linux")]
        {
            roots.push(PathBuf::from("/usr/lib/jvm/"));
        }
        #[cfg(target_os = "windows")]
        {
            roots.push(PathBuf::from("C:\\Program Files\\Java\\"));
        }

        if let Some(home) = dirs::home_dir() {
            roots.push(home.join(".sdkman/candidates/java/"));
        }
        roots
    }

    /// A root is either a JDK itself or a directory of JDKs
    fn search_root(root: &Path) -> Option<Self> {
        if let Some(jdk) = Self::from_home(root) {
            return Some(jdk);
        }
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(root)
            .ok()?
            .flatten()
            .map(|entry| {
                let path = entry.path();
                let bundle_home = path.join("Contents/Home");
                if bundle_home.exists() { bundle_home } else { path }
            })
            .collect();
        candidates.sort();
        candidates.iter().find_map(|home| Self::from_home(home))
    }

    /// Inspect a JDK home. Returns `None` when it has no runtime classes.
    pub fn from_home(home: &Path) -> Option<Self> {
        let entries = Self::runtime_entries(home);
        if entries.is_empty() {
            return None;
        }
        let (version, vendor) = read_release(home);
        let version = version.or_else(|| version_from_path(home));
        debug!(
            "Found JDK at {} (version {:?}, vendor {:?})",
            home.display(),
            version,
            vendor
        );
        Some(Self {
            home: home.to_path_buf(),
            entries,
            version,
            vendor,
        })
    }

    /// Runtime classes, by preference: the jimage, `rt.jar`, or `jmods/*.jmod`
    fn runtime_entries(home: &Path) -> Vec<ClasspathEntry> {
        let modules = home.join("lib/modules");
        if modules.is_file() {
            return vec![ClasspathEntry::new(
                modules,
                EntryKind::RuntimeImage,
                EntryOrigin::Platform,
            )];
        }

        for rt in [home.join("jre/lib/rt.jar"), home.join("lib/rt.jar")] {
            if rt.is_file() {
                return vec![ClasspathEntry::new(rt, EntryKind::Archive, EntryOrigin::Platform)];
            }
        }

        let Ok(jmods) = std::fs::read_dir(home.join("jmods")) else {
            return Vec::new();
        };
        let mut paths: Vec<PathBuf> = jmods
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("jmod"))
            .collect();
        paths.sort();
        paths
            .into_iter()
            .map(|path| ClasspathEntry::new(path, EntryKind::Archive, EntryOrigin::Platform))
            .collect()
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Platform classpath entries, in search order
    pub fn entries(&self) -> &[ClasspathEntry] {
        &self.entries
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }

    /// Version and vendor, e.g. `17.0.2 Eclipse Adoptium`. `None` when the
    /// version is unknown, in which case the platform cache is not used.
    pub fn fingerprint(&self) -> Option<String> {
        let version = self.version.as_deref()?;
        Some(match self.vendor.as_deref() {
            Some(vendor) => format!("{} {}", version, vendor),
            None => version.to_string(),
        })
    }
}

/// `JAVA_VERSION` and `IMPLEMENTOR` from the `release` file
fn read_release(home: &Path) -> (Option<String>, Option<String>) {
    let Ok(content) = std::fs::read_to_string(home.join("release")) else {
        return (None, None);
    };
    let Some(re) = RELEASE_LINE.as_ref() else {
        return (None, None);
    };

    let mut version = None;
    let mut vendor = None;
    for line in content.lines() {
        let Some(caps) = re.captures(line) else {
            continue;
        };
        let value = caps[2].trim().to_string();
        if value.is_empty() {
            continue;
        }
        match &caps[1] {
            "JAVA_VERSION" => version = Some(value),
            "IMPLEMENTOR" => vendor = Some(value),
            _ => {}
        }
    }
    (version, vendor)
}

fn version_from_path(home: &Path) -> Option<String> {
    let path = home.to_string_lossy();
    let caps = VERSION_IN_PATH.as_ref()?.captures(&path)?;
    caps.get(1).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::File::create(path).unwrap();
    }

    #[test]
    fn test_modern_jdk() {
        let temp = tempdir().unwrap();
        let home = temp.path();
        touch(&home.join("lib/modules"));
        std::fs::write(
            home.join("release"),
            "IMPLEMENTOR=\"Eclipse Adoptium\"\nJAVA_VERSION=\"17.0.2\"\nOS_NAME=\"Linux\"\n",
        )
        .unwrap();

        let jdk = JdkInstallation::from_home(home).unwrap();
        assert_eq!(jdk.entries().len(), 1);
        assert_eq!(jdk.entries()[0].kind, EntryKind::RuntimeImage);
        assert!(jdk.entries()[0].is_platform());
        assert_eq!(jdk.version(), Some("17.0.2"));
        assert_eq!(jdk.fingerprint().as_deref(), Some("17.0.2 Eclipse Adoptium"));
    }

    #[test]
    fn test_legacy_jdk() {
        let temp = tempdir().unwrap();
        let home = temp.path().join("jdk1.8.0");
        touch(&home.join("jre/lib/rt.jar"));

        let jdk = JdkInstallation::from_home(&home).unwrap();
        assert!(jdk.entries()[0].path.ends_with("jre/lib/rt.jar"));
        assert_eq!(jdk.entries()[0].kind, EntryKind::Archive);
        // No release file: version comes from the directory name.
        assert_eq!(jdk.fingerprint().as_deref(), Some("1.8.0"));
    }

    #[test]
    fn test_jmods_fallback() {
        let temp = tempdir().unwrap();
        let home = temp.path();
        touch(&home.join("jmods/java.sql.jmod"));
        touch(&home.join("jmods/java.base.jmod"));
        touch(&home.join("jmods/README"));

        let jdk = JdkInstallation::from_home(home).unwrap();
        let names: Vec<_> = jdk
            .entries()
            .iter()
            .map(|e| e.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["java.base.jmod", "java.sql.jmod"]);
    }

    #[test]
    fn test_not_a_jdk() {
        let temp = tempdir().unwrap();
        assert!(JdkInstallation::from_home(temp.path()).is_none());
        assert!(JdkInstallation::search_root(temp.path()).is_none());
    }

    #[test]
    fn test_search_root_with_several_jdks() {
        let temp = tempdir().unwrap();
        touch(&temp.path().join("jdk-21/lib/modules"));
        touch(&temp.path().join("jdk-17/lib/modules"));

        let jdk = JdkInstallation::search_root(temp.path()).unwrap();
        assert!(jdk.home().ends_with("jdk-17"));
        assert_eq!(jdk.version(), Some("17"));
    }
}
