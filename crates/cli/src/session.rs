use crate::{ClasspathArgs, GlobalArgs};
use classdex_api::ClasspathEntry;
use classdex_core::{ClassdexConfig, ImportResolver, ScanCoordinator};
use classdex_java::{ClasspathLoader, JavaEntryIndexer, JdkInstallation};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Configuration and classpath for one command
pub struct Session {
    pub config: ClassdexConfig,
    pub jdk: Option<JdkInstallation>,
    pub entries: Vec<ClasspathEntry>,
}

impl Session {
    pub fn new(global: &GlobalArgs, classpath: &ClasspathArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let config = load_config(global)?;

        let jdk = if classpath.no_jdk {
            None
        } else {
            let found = JdkInstallation::discover();
            match &found {
                Some(jdk) => info!(
                    "Using JDK at {} ({})",
                    jdk.home().display(),
                    jdk.fingerprint().unwrap_or_else(|| "unknown version".to_string())
                ),
                None => warn!("No JDK found; indexing the project classpath only"),
            }
            found
        };

        let mut entries: Vec<ClasspathEntry> = jdk
            .as_ref()
            .map(|jdk| jdk.entries().to_vec())
            .unwrap_or_default();
        entries.extend(project_entries(&classpath.classpath));

        Ok(Self {
            config,
            jdk,
            entries,
        })
    }

    pub fn coordinator(&self) -> ScanCoordinator {
        let mut builder = ScanCoordinator::builder(self.entries.clone())
            .with_indexer(Arc::new(JavaEntryIndexer::new()))
            .with_config(&self.config);
        if let Some(fingerprint) = self.jdk.as_ref().and_then(JdkInstallation::fingerprint) {
            builder = builder.with_fingerprint(fingerprint);
        }
        builder.build()
    }

    pub fn resolver(&self) -> ImportResolver {
        let loader = ClasspathLoader::new(self.entries.clone());
        ImportResolver::new(Arc::new(self.coordinator()), loader)
    }
}

/// Config file and environment, then command-line flags
pub fn load_config(global: &GlobalArgs) -> Result<ClassdexConfig, Box<dyn std::error::Error>> {
    let mut config = ClassdexConfig::load()?;
    if let Some(dir) = &global.cache_dir {
        config.cache_dir = dir.clone();
    }
    if global.no_cache {
        config.cache_enabled = false;
    }
    Ok(config)
}

fn project_entries(args: &[String]) -> Vec<ClasspathEntry> {
    args.iter()
        .flat_map(std::env::split_paths)
        .filter(|path: &PathBuf| !path.as_os_str().is_empty())
        .map(ClasspathEntry::project)
        .collect()
}
