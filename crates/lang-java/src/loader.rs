//! Class loading from a captured classpath.
//!
//! Entries are searched in classpath order; the first entry containing a
//! class wins. Each binary name is loaded at most once per loader and maps to
//! a single `Arc<LoadedClass>`, which is what gives loaded shapes their
//! identity.

use crate::class::LoadedClass;
use crate::error::LoadError;
use crate::index::{JMOD_CLASSES, image_class_path};
use crate::shape::{LoadedShape, Primitive, RuntimeType};
use classdex_api::{ClasspathEntry, EntryKind, ResolveResult, ShapeProvider, SharedShape};
use dashmap::DashMap;
use ristretto_jimage::Image;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Class bytes located on the classpath
struct Located {
    bytes: Vec<u8>,
    module: Option<String>,
    source: PathBuf,
}

/// Opened runtime image plus the module owning each package, keyed by
/// package path (`java/lang`)
struct RuntimeImage {
    image: Image,
    modules: HashMap<String, String>,
}

/// Opened at most once per path; `None` when the image is unreadable
type ImageSlot = Arc<OnceLock<Option<RuntimeImage>>>;

pub struct ClasspathLoader {
    me: Weak<ClasspathLoader>,
    entries: Vec<ClasspathEntry>,
    classes: DashMap<String, Arc<LoadedClass>>,
    images: DashMap<PathBuf, ImageSlot>,
}

impl ClasspathLoader {
    pub fn new(entries: Vec<ClasspathEntry>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            entries,
            classes: DashMap::new(),
            images: DashMap::new(),
        })
    }

    pub fn entries(&self) -> &[ClasspathEntry] {
        &self.entries
    }

    /// Number of classes loaded so far
    pub fn loaded_count(&self) -> usize {
        self.classes.len()
    }

    /// Load a class by binary name, e.g. `java.lang.String`,
    /// `java/util/Map$Entry`
    pub fn load_class(&self, binary_name: &str) -> Result<Arc<LoadedClass>, LoadError> {
        let binary_name = binary_name.replace('/', ".");
        if let Some(class) = self.classes.get(&binary_name) {
            return Ok(Arc::clone(class.value()));
        }

        let located = self
            .locate(&binary_name)?
            .ok_or_else(|| LoadError::NotFound(binary_name.clone()))?;
        let class = LoadedClass::parse(located.bytes, located.module, Some(located.source))?;
        if class.binary_name() != binary_name {
            return Err(LoadError::NameMismatch {
                expected: binary_name,
                found: class.binary_name().to_string(),
            });
        }

        // Racing loaders converge on whichever class was stored first.
        let stored = self
            .classes
            .entry(binary_name)
            .or_insert_with(|| Arc::new(class));
        Ok(Arc::clone(stored.value()))
    }

    /// Shape for a type name: a primitive, a class binary name, or either
    /// followed by one or more `[]`
    pub fn shape(&self, name: &str) -> Result<LoadedShape, LoadError> {
        let loader = self.me.upgrade().ok_or(LoadError::LoaderDropped)?;
        let ty = self.runtime_type(name.trim())?;
        Ok(LoadedShape::new(loader, ty))
    }

    fn runtime_type(&self, name: &str) -> Result<RuntimeType, LoadError> {
        if let Some(element) = name.strip_suffix("[]") {
            return Ok(RuntimeType::Array(Box::new(self.runtime_type(element)?)));
        }
        if let Some(primitive) = Primitive::from_name(name) {
            return Ok(RuntimeType::Primitive(primitive));
        }
        Ok(RuntimeType::Class(self.load_class(name)?))
    }

    fn locate(&self, binary_name: &str) -> Result<Option<Located>, LoadError> {
        let class_path = format!("{}.class", binary_name.replace('.', "/"));
        for entry in &self.entries {
            let found = match entry.kind {
                EntryKind::Directory => Self::read_from_directory(entry, &class_path),
                EntryKind::Archive => Self::read_from_archive(entry, &class_path),
                EntryKind::RuntimeImage => self.read_from_image(entry, &class_path),
            };
            match found {
                Ok(Some(located)) => return Ok(Some(located)),
                Ok(None) => {}
                // An unreadable entry must not hide classes in later entries.
                Err(e) => debug!("Cannot read {} from {}: {}", class_path, entry, e),
            }
        }
        Ok(None)
    }

    fn read_from_directory(
        entry: &ClasspathEntry,
        class_path: &str,
    ) -> Result<Option<Located>, LoadError> {
        let path = entry.path.join(class_path);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(Located {
            bytes: fs::read(&path)?,
            module: None,
            source: path,
        }))
    }

    fn read_from_archive(
        entry: &ClasspathEntry,
        class_path: &str,
    ) -> Result<Option<Located>, LoadError> {
        let file = File::open(&entry.path)?;
        let mut archive = ZipArchive::new(file).map_err(|e| LoadError::Malformed {
            name: entry.path.display().to_string(),
            reason: e.to_string(),
        })?;

        let is_jmod = entry
            .path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jmod"));
        let name = if is_jmod {
            format!("{}{}", JMOD_CLASSES, class_path)
        } else {
            class_path.to_string()
        };

        let Ok(mut file) = archive.by_name(&name) else {
            return Ok(None);
        };
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(Some(Located {
            bytes,
            module: None,
            source: entry.path.clone(),
        }))
    }

    fn read_from_image(
        &self,
        entry: &ClasspathEntry,
        class_path: &str,
    ) -> Result<Option<Located>, LoadError> {
        // Clone the slot out so no map shard stays locked while reading.
        let slot = self
            .images
            .entry(entry.path.clone())
            .or_default()
            .value()
            .clone();
        let Some(runtime) = slot.get_or_init(|| Self::open_image(entry)) else {
            return Ok(None);
        };

        let package = class_path.rsplit_once('/').map_or("", |(package, _)| package);
        let Some(module) = runtime.modules.get(package) else {
            return Ok(None);
        };
        let resource_name = format!("/{}/{}", module, class_path);
        match runtime.image.get_resource(&resource_name) {
            Ok(resource) => Ok(Some(Located {
                bytes: resource.data().to_vec(),
                module: Some(module.clone()),
                source: entry.path.clone(),
            })),
            Err(e) => {
                debug!("{} not in {}: {}", resource_name, entry, e);
                Ok(None)
            }
        }
    }

    fn open_image(entry: &ClasspathEntry) -> Option<RuntimeImage> {
        let image = match Image::from_file(&entry.path) {
            Ok(image) => image,
            Err(e) => {
                warn!("Failed to open runtime image {}: {}", entry.path.display(), e);
                return None;
            }
        };
        let mut modules = HashMap::new();
        for resource in image.iter().flatten() {
            if image_class_path(&resource).is_some() && !resource.parent().is_empty() {
                modules
                    .entry(resource.parent().to_string())
                    .or_insert_with(|| resource.module().to_string());
            }
        }
        debug!(
            "Indexed {} packages in runtime image {}",
            modules.len(),
            entry.path.display()
        );
        Some(RuntimeImage { image, modules })
    }
}

impl ShapeProvider for ClasspathLoader {
    fn resolve(&self, fqn: &str) -> ResolveResult<SharedShape> {
        let shape = self.shape(fqn)?;
        Ok(Arc::new(shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ClassFileBuilder, platform_classes, write_class_dir, write_class_jar};
    use classdex_api::ResolveError;
    use tempfile::tempdir;

    fn loader_with(dir: &std::path::Path) -> Arc<ClasspathLoader> {
        let jar = dir.join("rt.jar");
        write_class_jar(&jar, &platform_classes()).unwrap();
        let classes = dir.join("classes");
        write_class_dir(
            &classes,
            &[ClassFileBuilder::class("app/Main").implements("java/lang/Runnable")],
        )
        .unwrap();
        ClasspathLoader::new(vec![
            ClasspathEntry::platform(jar),
            ClasspathEntry::project(classes),
        ])
    }

    #[test]
    fn test_loads_from_archives_and_directories() {
        let dir = tempdir().unwrap();
        let loader = loader_with(dir.path());

        let string = loader.load_class("java.lang.String").unwrap();
        assert_eq!(string.binary_name(), "java.lang.String");
        assert!(string.source().unwrap().ends_with("rt.jar"));

        let main = loader.load_class("app/Main").unwrap();
        assert_eq!(main.binary_name(), "app.Main");
    }

    #[test]
    fn test_one_identity_per_name() {
        let dir = tempdir().unwrap();
        let loader = loader_with(dir.path());

        let first = loader.load_class("java.lang.Object").unwrap();
        let second = loader.load_class("java/lang/Object").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.loaded_count(), 1);
    }

    #[test]
    fn test_first_entry_wins() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first.jar");
        let second = dir.path().join("second.jar");
        write_class_jar(&first, &[ClassFileBuilder::class("dup/Thing")]).unwrap();
        write_class_jar(
            &second,
            &[ClassFileBuilder::class("dup/Thing").access(access_final())],
        )
        .unwrap();

        let loader = ClasspathLoader::new(vec![
            ClasspathEntry::project(first),
            ClasspathEntry::project(second),
        ]);
        let thing = loader.load_class("dup.Thing").unwrap();
        assert!(!thing.is_final());
        assert!(thing.source().unwrap().ends_with("first.jar"));
    }

    fn access_final() -> u16 {
        crate::testing::access::PUBLIC | crate::testing::access::FINAL
    }

    #[test]
    fn test_missing_and_mismatched_classes() {
        let dir = tempdir().unwrap();
        let classes = dir.path().join("classes");
        write_class_dir(&classes, &[ClassFileBuilder::class("app/Real")]).unwrap();
        fs::copy(classes.join("app/Real.class"), classes.join("app/Fake.class")).unwrap();
        fs::write(classes.join("app/Broken.class"), b"\xCA\xFE\xBA\xBE").unwrap();

        let loader = ClasspathLoader::new(vec![ClasspathEntry::project(classes)]);
        assert!(matches!(
            loader.load_class("app.Missing"),
            Err(LoadError::NotFound(_))
        ));
        assert!(matches!(
            loader.load_class("app.Fake"),
            Err(LoadError::NameMismatch { .. })
        ));
        assert!(matches!(
            loader.resolve("app.Broken"),
            Err(ResolveError::Malformed { .. })
        ));
    }

    #[test]
    fn test_unreadable_entry_does_not_hide_later_entries() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("broken.jar");
        fs::write(&broken, b"PK\x03\x04 garbage").unwrap();
        let good = dir.path().join("good.jar");
        write_class_jar(&good, &[ClassFileBuilder::class("lib/Util")]).unwrap();

        let loader = ClasspathLoader::new(vec![
            ClasspathEntry::project(broken),
            ClasspathEntry::project(good),
        ]);
        assert!(loader.load_class("lib.Util").is_ok());
    }

    #[test]
    fn test_shape_names() {
        let dir = tempdir().unwrap();
        let loader = loader_with(dir.path());

        assert_eq!(loader.shape("int").unwrap().to_string(), "int");
        assert_eq!(loader.shape("int[][]").unwrap().to_string(), "int[][]");
        assert_eq!(
            loader.shape("java.lang.String[]").unwrap().to_string(),
            "java.lang.String[]"
        );
        assert!(loader.shape("java.lang.Missing[]").is_err());
    }

    /// The runtime image of the locally installed JDK, if there is one
    fn local_runtime_image() -> Option<ClasspathEntry> {
        crate::jdk::JdkInstallation::discover()?
            .entries()
            .iter()
            .find(|entry| entry.kind == EntryKind::RuntimeImage)
            .cloned()
    }

    #[test]
    fn test_loads_from_runtime_image() {
        use classdex_api::TypeShape;

        let Some(image) = local_runtime_image() else {
            println!("WARNING: No JDK runtime image found, skipping.");
            return;
        };
        let loader = ClasspathLoader::new(vec![image]);

        let string = loader.load_class("java.lang.String").unwrap();
        assert_eq!(string.binary_name(), "java.lang.String");
        assert_eq!(string.module(), Some("java.base"));

        let shape = loader.shape("java.lang.String").unwrap();
        assert_eq!(shape.module_name().as_deref(), Some("java.base"));
        let list = loader.shape("java.util.ArrayList").unwrap();
        assert_eq!(list.module_name().as_deref(), Some("java.base"));

        assert!(matches!(
            loader.load_class("java.lang.NoSuchClass"),
            Err(LoadError::NotFound(_))
        ));
        assert!(matches!(
            loader.load_class("nowhere.Missing"),
            Err(LoadError::NotFound(_))
        ));
    }
}
