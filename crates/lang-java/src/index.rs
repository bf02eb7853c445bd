//! Name-only indexing of Java classpath entries.
//!
//! Lists the top-level class names an entry contains without parsing any
//! class file. Handles class directories, jar/zip/jmod archives and the
//! jimage runtime image (`lib/modules`).

use classdex_api::{BoxError, ClasspathEntry, EntryIndexer, EntryKind};
use ristretto_jimage::{Image, Resource};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use walkdir::WalkDir;
use zip::ZipArchive;

/// Prefix of class entries inside a jmod archive
pub(crate) const JMOD_CLASSES: &str = "classes/";

const ARCHIVE_EXTENSIONS: &[&str] = &["jar", "zip", "jmod"];

pub struct JavaEntryIndexer;

impl JavaEntryIndexer {
    pub fn new() -> Self {
        Self
    }

    fn index_directory(root: &Path) -> Result<Vec<String>, BoxError> {
        if !root.is_dir() {
            return Err(format!("Not a directory: {}", root.display()).into());
        }
        let mut names = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if let Some(name) = class_name_from_path(&relative) {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Detect the format by magic bytes and list the classes
    fn index_file(path: &Path) -> Result<Vec<String>, BoxError> {
        let mut file = File::open(path)?;
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;

        match &magic {
            // ZIP local header or empty archive; jmod files carry a "JM" header
            // in front of the zip data
            [0x50, 0x4B, _, _] | [0x4A, 0x4D, _, _] => {
                file.seek(SeekFrom::Start(0))?;
                let is_jmod = magic[0] == 0x4A;
                Self::index_zip(ZipArchive::new(file)?, is_jmod)
            }
            // JImage magic, either byte order
            [0xCA, 0xFE, 0xDA, 0xDA] | [0xDA, 0xDA, 0xFE, 0xCA] => {
                drop(file);
                let image = Image::from_file(path)?;
                Ok(Self::index_image(&image))
            }
            _ => Err(format!("Unrecognized archive format: {}", path.display()).into()),
        }
    }

    fn index_zip(mut archive: ZipArchive<File>, is_jmod: bool) -> Result<Vec<String>, BoxError> {
        let mut names = Vec::new();
        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            let entry_name = entry.name();
            let relative = if is_jmod {
                match entry_name.strip_prefix(JMOD_CLASSES) {
                    Some(rest) => rest,
                    None => continue,
                }
            } else {
                entry_name
            };
            if let Some(name) = class_name_from_path(relative) {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn index_image(image: &Image) -> Vec<String> {
        image
            .iter()
            .flatten()
            .filter_map(|resource| class_name_from_path(&image_class_path(&resource)?))
            .collect()
    }
}

impl Default for JavaEntryIndexer {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryIndexer for JavaEntryIndexer {
    fn can_index(&self, entry: &ClasspathEntry) -> bool {
        match entry.kind {
            EntryKind::Directory | EntryKind::RuntimeImage => true,
            EntryKind::Archive => entry
                .path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| ARCHIVE_EXTENSIONS.contains(&ext.to_lowercase().as_str())),
        }
    }

    fn index(&self, entry: &ClasspathEntry) -> Result<Vec<String>, BoxError> {
        match entry.kind {
            EntryKind::Directory => Self::index_directory(&entry.path),
            EntryKind::Archive | EntryKind::RuntimeImage => Self::index_file(&entry.path),
        }
    }
}

/// Dotted binary name for a top-level class at `path` (e.g.
/// `java/lang/String.class`). Nested classes, `module-info`,
/// `package-info`, non-class files and `META-INF` entries yield `None`.
pub fn class_name_from_path(path: &str) -> Option<String> {
    let stem = path.strip_suffix(".class")?;
    if stem.is_empty() || stem.contains('$') || stem.starts_with("META-INF/") {
        return None;
    }
    let simple = stem.rsplit('/').next()?;
    if simple.is_empty() || simple == "module-info" || simple == "package-info" {
        return None;
    }
    Some(stem.replace('/', "."))
}

/// Path of a class inside its module, e.g. `java/lang/String.class` for
/// `/java.base/java/lang/String.class`. `None` for resources outside a module
/// and for anything that is not a class file.
pub(crate) fn image_class_path(resource: &Resource<'_>) -> Option<String> {
    if resource.module().is_empty() || resource.extension() != "class" {
        return None;
    }
    Some(resource.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ClassFileBuilder, write_class_dir, write_jar};
    use classdex_api::EntryOrigin;
    use tempfile::tempdir;

    fn sorted(mut names: Vec<String>) -> Vec<String> {
        names.sort();
        names
    }

    #[test]
    fn test_class_name_from_path() {
        assert_eq!(
            class_name_from_path("java/lang/String.class").as_deref(),
            Some("java.lang.String")
        );
        assert_eq!(class_name_from_path("Main.class").as_deref(), Some("Main"));
        assert!(class_name_from_path("java/util/Map$Entry.class").is_none());
        assert!(class_name_from_path("module-info.class").is_none());
        assert!(class_name_from_path("java/lang/package-info.class").is_none());
        assert!(class_name_from_path("META-INF/versions/11/a/B.class").is_none());
        assert!(class_name_from_path("java/lang/String.java").is_none());
    }

    #[test]
    fn test_index_jar() {
        let dir = tempdir().unwrap();
        let jar = dir.path().join("lib.jar");
        write_jar(
            &jar,
            &[
                ("com/example/Test.class".to_string(), vec![0xCA, 0xFE, 0xBA, 0xBE]),
                ("com/example/Test$Inner.class".to_string(), vec![0xCA, 0xFE, 0xBA, 0xBE]),
                ("com/example/package-info.class".to_string(), vec![0xCA, 0xFE, 0xBA, 0xBE]),
                ("META-INF/MANIFEST.MF".to_string(), b"Manifest-Version: 1.0\n".to_vec()),
                ("Top.class".to_string(), vec![0xCA, 0xFE, 0xBA, 0xBE]),
            ],
        )
        .unwrap();

        let indexer = JavaEntryIndexer::new();
        let entry = ClasspathEntry::project(jar);
        assert!(indexer.can_index(&entry));
        assert_eq!(
            sorted(indexer.index(&entry).unwrap()),
            vec!["Top", "com.example.Test"]
        );
    }

    #[test]
    fn test_index_directory() {
        let dir = tempdir().unwrap();
        write_class_dir(
            dir.path(),
            &[
                ClassFileBuilder::class("app/Main"),
                ClassFileBuilder::class("app/Main$1"),
                ClassFileBuilder::class("app/util/Strings"),
            ],
        )
        .unwrap();
        std::fs::write(dir.path().join("app/readme.txt"), "not a class").unwrap();

        let entry = ClasspathEntry::project(dir.path().to_path_buf());
        assert_eq!(entry.kind, EntryKind::Directory);
        let names = JavaEntryIndexer::new().index(&entry).unwrap();
        assert_eq!(sorted(names), vec!["app.Main", "app.util.Strings"]);
    }

    #[test]
    fn test_corrupt_archive_is_an_error() {
        let dir = tempdir().unwrap();
        let jar = dir.path().join("broken.jar");
        std::fs::write(&jar, b"PK\x03\x04 truncated garbage").unwrap();

        let entry = ClasspathEntry::project(jar);
        assert!(JavaEntryIndexer::new().index(&entry).is_err());

        let missing = ClasspathEntry::new(
            dir.path().join("missing.jar"),
            EntryKind::Archive,
            EntryOrigin::Project,
        );
        assert!(JavaEntryIndexer::new().index(&missing).is_err());
    }

    #[test]
    fn test_unsupported_archive_extension() {
        let entry = ClasspathEntry::new(
            "/tmp/notes.txt".into(),
            EntryKind::Archive,
            EntryOrigin::Project,
        );
        assert!(!JavaEntryIndexer::new().can_index(&entry));
    }

    #[test]
    fn test_index_runtime_image() {
        let Some(image) = crate::jdk::JdkInstallation::discover().and_then(|jdk| {
            jdk.entries()
                .iter()
                .find(|entry| entry.kind == EntryKind::RuntimeImage)
                .cloned()
        }) else {
            println!("WARNING: No JDK runtime image found, skipping.");
            return;
        };

        let names = JavaEntryIndexer::new().index(&image).unwrap();
        assert!(names.iter().any(|n| n == "java.lang.String"));
        assert!(names.iter().any(|n| n == "java.util.List"));
        assert!(names.iter().all(|n| !n.contains('$') && !n.starts_with('/')));
        assert!(!names.iter().any(|n| n.starts_with("java.base")));
    }
}

