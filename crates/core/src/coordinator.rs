//! Scan coordinator: runs the classpath scan at most once and shares the
//! resulting tree with every waiter.
//!
//! ```text
//! NotStarted ──ensure_started()──▶ Running ──▶ Ready(tree)
//!                                          └─▶ Failed(reason)
//! ```
//!
//! The scan runs on its own OS thread, never on the tokio runtime or its
//! blocking pool: callers commonly wait for the tree from those pools, and a
//! scan queued behind its own waiters would never start. Completion is
//! broadcast through a `watch` channel, so async and blocking waiters observe
//! the same `Arc<PackageTree>`.

use crate::cache::PlatformCache;
use crate::config::{ClassdexConfig, DEFAULT_SCAN_THREAD_NAME};
use crate::error::{ClassdexError, Result};
use crate::scan::{ClasspathScanner, ScanReport};
use crate::tree::PackageTree;
use classdex_api::{ClasspathEntry, EntryIndexer};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub enum ScanPhase {
    NotStarted,
    Running,
    Ready(Arc<PackageTree>),
    Failed(String),
}

impl ScanPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanPhase::Ready(_) | ScanPhase::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScanPhase::NotStarted => "not-started",
            ScanPhase::Running => "running",
            ScanPhase::Ready(_) => "ready",
            ScanPhase::Failed(_) => "failed",
        }
    }

    fn into_tree(self) -> Result<Arc<PackageTree>> {
        match self {
            ScanPhase::Ready(tree) => Ok(tree),
            ScanPhase::Failed(reason) => Err(ClassdexError::ScanFailed(reason)),
            other => Err(ClassdexError::Internal(format!(
                "scan is still {}",
                other.name()
            ))),
        }
    }
}

pub struct ScanCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    /// Classpath captured at construction; read-only afterwards
    entries: Vec<ClasspathEntry>,
    scanner: ClasspathScanner,
    cache: Option<PlatformCache>,
    fingerprint: Option<String>,
    rescan_platform: bool,
    thread_name: String,
    phase: watch::Sender<ScanPhase>,
    report: Mutex<Option<ScanReport>>,
    /// Everything the platform entries contributed, as cached
    platform: Mutex<Option<Arc<PackageTree>>>,
    runs: AtomicUsize,
}

pub struct ScanCoordinatorBuilder {
    entries: Vec<ClasspathEntry>,
    scanner: ClasspathScanner,
    cache: Option<PlatformCache>,
    fingerprint: Option<String>,
    rescan_platform: bool,
    thread_name: String,
}

impl ScanCoordinatorBuilder {
    pub fn new(entries: Vec<ClasspathEntry>) -> Self {
        Self {
            entries,
            scanner: ClasspathScanner::new(),
            cache: None,
            fingerprint: None,
            rescan_platform: false,
            thread_name: DEFAULT_SCAN_THREAD_NAME.to_string(),
        }
    }

    pub fn with_indexer(mut self, indexer: Arc<dyn EntryIndexer>) -> Self {
        self.scanner = self.scanner.add_indexer(indexer);
        self
    }

    pub fn with_scanner(mut self, scanner: ClasspathScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Use a platform cache. It is only consulted when a fingerprint is set.
    pub fn with_cache(mut self, cache: PlatformCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Platform version/vendor fingerprint validating the cache
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    pub fn rescan_platform(mut self, rescan: bool) -> Self {
        self.rescan_platform = rescan;
        self
    }

    /// Apply cache, rescan and thread settings from a config
    pub fn with_config(mut self, config: &ClassdexConfig) -> Self {
        self.cache = config.platform_cache();
        self.rescan_platform = config.rescan_platform;
        self.thread_name = config.scan_thread_name.clone();
        self
    }

    pub fn build(self) -> ScanCoordinator {
        let (phase, _) = watch::channel(ScanPhase::NotStarted);
        ScanCoordinator {
            inner: Arc::new(Inner {
                entries: self.entries,
                scanner: self.scanner,
                cache: self.cache,
                fingerprint: self.fingerprint,
                rescan_platform: self.rescan_platform,
                thread_name: self.thread_name,
                phase,
                report: Mutex::new(None),
                platform: Mutex::new(None),
                runs: AtomicUsize::new(0),
            }),
        }
    }
}

impl ScanCoordinator {
    pub fn builder(entries: Vec<ClasspathEntry>) -> ScanCoordinatorBuilder {
        ScanCoordinatorBuilder::new(entries)
    }

    pub fn entries(&self) -> &[ClasspathEntry] {
        &self.inner.entries
    }

    /// Current phase
    pub fn state(&self) -> ScanPhase {
        self.inner.phase.borrow().clone()
    }

    /// Start the scan if nobody has yet. Safe to call any number of times
    /// from any thread.
    pub fn ensure_started(&self) {
        let claimed = self.inner.phase.send_if_modified(|phase| {
            if matches!(phase, ScanPhase::NotStarted) {
                *phase = ScanPhase::Running;
                true
            } else {
                false
            }
        });
        if !claimed {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let spawned = thread::Builder::new()
            .name(self.inner.thread_name.clone())
            .spawn(move || inner.run());

        match spawned {
            Ok(_) => debug!(
                "Started classpath scan of {} entries on thread '{}'",
                self.inner.entries.len(),
                self.inner.thread_name
            ),
            Err(e) => {
                error!("Failed to spawn classpath scan thread: {}", e);
                self.inner
                    .phase
                    .send_replace(ScanPhase::Failed(format!("spawn failed: {}", e)));
            }
        }
    }

    /// Wait for the scanned tree, starting the scan if needed.
    ///
    /// Dropping the future abandons only this wait; the scan continues for
    /// other waiters.
    pub async fn ready(&self) -> Result<Arc<PackageTree>> {
        self.ensure_started();
        let mut rx = self.inner.phase.subscribe();
        let phase = rx
            .wait_for(ScanPhase::is_terminal)
            .await
            .map_err(|_| ClassdexError::Internal("scan coordinator closed".to_string()))?
            .clone();
        phase.into_tree()
    }

    /// Like [`ready`](Self::ready), giving up after `timeout`. `Ok(None)`
    /// means the wait timed out.
    pub async fn ready_timeout(&self, timeout: Duration) -> Result<Option<Arc<PackageTree>>> {
        match tokio::time::timeout(timeout, self.ready()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Block the calling thread until the tree is ready, starting the scan
    /// if needed. Safe to call from runtime worker and blocking-pool threads.
    pub fn wait_ready(&self) -> Result<Arc<PackageTree>> {
        futures::executor::block_on(self.ready())
    }

    /// The tree if the scan already finished successfully; never blocks
    pub fn try_tree(&self) -> Option<Arc<PackageTree>> {
        match &*self.inner.phase.borrow() {
            ScanPhase::Ready(tree) => Some(Arc::clone(tree)),
            _ => None,
        }
    }

    /// Report of the finished scan
    pub fn report(&self) -> Option<ScanReport> {
        self.inner
            .report
            .lock()
            .ok()
            .and_then(|report| report.clone())
    }

    /// Number of times the scan has executed (0 or 1)
    pub fn scan_count(&self) -> usize {
        self.inner.runs.load(Ordering::SeqCst)
    }

    /// Write the platform packages of the scanned tree to the cache.
    ///
    /// Returns whether anything was written. Failures are logged, never
    /// returned.
    pub fn save_cache(&self) -> bool {
        if self.try_tree().is_none() {
            debug!("Skipping platform cache flush: scan not finished");
            return false;
        }
        let platform = self.inner.platform.lock().ok().and_then(|slot| slot.clone());
        match platform {
            Some(platform) if !platform.is_empty() => self.inner.persist(&platform),
            _ => false,
        }
    }
}

impl Inner {
    fn run(self: Arc<Self>) {
        self.runs.fetch_add(1, Ordering::SeqCst);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.build_tree()));
        let phase = match outcome {
            Ok((tree, report)) => {
                info!(
                    "Classpath ready: {} types in {} packages (cache: {}) after {:?}",
                    tree.type_count(),
                    tree.package_count(),
                    report.from_cache,
                    report.duration
                );
                if let Ok(mut slot) = self.report.lock() {
                    *slot = Some(report);
                }
                ScanPhase::Ready(Arc::new(tree))
            }
            Err(payload) => {
                let reason = panic_message(payload);
                error!("Classpath scan failed: {}", reason);
                ScanPhase::Failed(reason)
            }
        };

        self.phase.send_replace(phase);
    }

    fn build_tree(&self) -> (PackageTree, ScanReport) {
        let (platform, project): (Vec<ClasspathEntry>, Vec<ClasspathEntry>) = self
            .entries
            .iter()
            .cloned()
            .partition(ClasspathEntry::is_platform);

        let mut report = ScanReport::default();
        let mut tree = PackageTree::new();
        self.scanner.scan_into(&project, &mut tree, &mut report);

        let cached = match (&self.cache, &self.fingerprint) {
            (Some(cache), Some(fingerprint)) if !platform.is_empty() => cache.load(fingerprint),
            _ => None,
        };

        let platform_tree = match cached {
            Some(cached) if !self.rescan_platform => {
                debug!("Skipping {} platform entries: cache is current", platform.len());
                report.total_entries += platform.len();
                report.from_cache = true;
                cached
            }
            cached => {
                let mut platform_report = ScanReport::default();
                let mut fresh = PackageTree::new();
                self.scanner
                    .scan_into(&platform, &mut fresh, &mut platform_report);

                let complete = platform_report.failed_entries == 0 && !fresh.is_empty();
                if let Some(older) = cached {
                    fresh.absorb(older);
                }
                // An incomplete platform scan must not replace a good cache.
                if complete {
                    self.persist(&fresh);
                } else if !platform.is_empty() {
                    warn!("Platform scan incomplete; not updating the platform cache");
                }

                report.merge(platform_report);
                fresh
            }
        };

        tree.absorb(platform_tree.clone());
        if let Ok(mut slot) = self.platform.lock() {
            *slot = Some(Arc::new(platform_tree));
        }
        (tree, report)
    }

    fn persist(&self, tree: &PackageTree) -> bool {
        let (Some(cache), Some(fingerprint)) = (&self.cache, &self.fingerprint) else {
            return false;
        };
        match cache.save(fingerprint, tree) {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to save platform cache: {}", e);
                false
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "scan thread panicked".to_string()
    }
}
