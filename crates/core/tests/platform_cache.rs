//! Platform cache behavior across coordinator lifetimes

use classdex_api::ClasspathEntry;
use classdex_core::{ClassdexConfig, ImportResolver, PlatformCache, ScanCoordinator};
use classdex_java::testing::{ClassFileBuilder, platform_classes, write_class_dir, write_class_jar};
use classdex_java::{ClasspathLoader, JavaEntryIndexer};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn entries(root: &Path) -> Vec<ClasspathEntry> {
    let jar = root.join("rt.jar");
    if !jar.exists() {
        write_class_jar(&jar, &platform_classes()).unwrap();
        write_class_dir(&root.join("classes"), &[ClassFileBuilder::class("app/Main")]).unwrap();
    }
    vec![
        ClasspathEntry::platform(jar),
        ClasspathEntry::project(root.join("classes")),
    ]
}

fn coordinator(root: &Path, config: &ClassdexConfig, fingerprint: &str) -> ScanCoordinator {
    ScanCoordinator::builder(entries(root))
        .with_indexer(Arc::new(JavaEntryIndexer::new()))
        .with_config(config)
        .with_fingerprint(fingerprint)
        .build()
}

fn config(cache_dir: &Path) -> ClassdexConfig {
    ClassdexConfig {
        cache_dir: cache_dir.to_path_buf(),
        ..ClassdexConfig::default()
    }
}

#[test]
fn test_second_run_reads_platform_from_cache() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp.path().join("cache"));

    let cold = coordinator(temp.path(), &config, "17.0.2 Test");
    let cold_tree = cold.wait_ready().unwrap();
    assert!(!cold.report().unwrap().from_cache);

    let warm = coordinator(temp.path(), &config, "17.0.2 Test");
    let warm_tree = warm.wait_ready().unwrap();
    assert!(warm.report().unwrap().from_cache);

    assert_eq!(warm_tree.type_names(), cold_tree.type_names());
    assert_eq!(warm_tree.packages(), cold_tree.packages());
}

#[test]
fn test_cached_platform_types_still_resolve() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp.path().join("cache"));
    coordinator(temp.path(), &config, "17").wait_ready().unwrap();

    // Names come from the cache, shapes from the loader.
    let warm = Arc::new(coordinator(temp.path(), &config, "17"));
    let loader = ClasspathLoader::new(warm.entries().to_vec());
    let resolver = ImportResolver::new(Arc::clone(&warm), loader);

    let names: Vec<String> = resolver
        .resolve_import("", &["java", "lang", "*"])
        .iter()
        .map(|t| t.fqn().to_string())
        .collect();
    assert!(names.contains(&"java.lang.String".to_string()));
    assert!(warm.report().unwrap().from_cache);
}

#[test]
fn test_fingerprint_mismatch_rescans() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp.path().join("cache"));
    coordinator(temp.path(), &config, "11").wait_ready().unwrap();

    let upgraded = coordinator(temp.path(), &config, "17");
    upgraded.wait_ready().unwrap();
    assert!(!upgraded.report().unwrap().from_cache);

    let cache = PlatformCache::new(config.cache_dir.clone());
    assert_eq!(cache.stats().fingerprint.as_deref(), Some("17"));
    assert!(cache.load("11").is_none());
}

#[test]
fn test_corrupt_cache_falls_back_to_scan() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp.path().join("cache"));
    std::fs::create_dir_all(&config.cache_dir).unwrap();
    let cache = PlatformCache::new(config.cache_dir.clone());
    std::fs::write(cache.cache_path(), b"\x28\xb5\x2f\xfd garbage").unwrap();

    let coordinator = coordinator(temp.path(), &config, "17");
    let tree = coordinator.wait_ready().unwrap();
    assert!(tree.find_type("java.lang.Object").is_some());
    assert!(!coordinator.report().unwrap().from_cache);

    // The scan replaced the corrupt file with a valid one.
    assert!(cache.load("17").is_some());
}

#[test]
fn test_disabled_cache_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let config = ClassdexConfig {
        cache_enabled: false,
        ..config(&temp.path().join("cache"))
    };

    let coordinator = coordinator(temp.path(), &config, "17");
    coordinator.wait_ready().unwrap();
    assert!(!coordinator.save_cache());
    assert!(!config.cache_dir.exists());
}

#[test]
fn test_explicit_flush() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp.path().join("cache"));
    let coordinator = Arc::new(coordinator(temp.path(), &config, "17"));
    let resolver = ImportResolver::new(
        Arc::clone(&coordinator),
        ClasspathLoader::new(coordinator.entries().to_vec()),
    );

    resolver.resolve_import("", &["app", "Main"]);
    std::fs::remove_dir_all(&config.cache_dir).unwrap();
    assert!(resolver.save_cached_imports());

    let stats = PlatformCache::new(config.cache_dir.clone()).stats();
    assert_eq!(stats.type_count, platform_classes().len());
}

#[test]
fn test_platform_packages_outside_java_survive_the_cache() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp.path().join("cache"));
    let jsobject = temp.path().join("jsobject.jar");
    write_class_jar(&jsobject, &[ClassFileBuilder::class("netscape/javascript/JSObject")]).unwrap();
    let mut entries = entries(temp.path());
    entries.push(ClasspathEntry::platform(jsobject));

    let build = || {
        ScanCoordinator::builder(entries.clone())
            .with_indexer(Arc::new(JavaEntryIndexer::new()))
            .with_config(&config)
            .with_fingerprint("17")
            .build()
    };
    let cold = build().wait_ready().unwrap().type_names();

    let warm = Arc::new(build());
    let resolver = ImportResolver::new(Arc::clone(&warm), ClasspathLoader::new(entries.clone()));
    let names: Vec<String> = resolver
        .resolve_import("netscape", &["javascript", "*"])
        .iter()
        .map(|t| t.fqn().to_string())
        .collect();

    assert_eq!(names, vec!["netscape.javascript.JSObject"]);
    assert!(warm.report().unwrap().from_cache);
    assert_eq!(warm.try_tree().unwrap().type_names(), cold);
}
