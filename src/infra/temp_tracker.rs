// ============================================================
// Layer 6 — Temp Resource Tracker
// ============================================================
// Every decode writes intermediate images (the cropped text
// region and one file per glyph). They are kept on disk while
// the process runs and removed exactly once when it ends:
//
//   main()
//     ├─ TempTracker::new()           shared Arc, owned by main
//     ├─ tracker.guard()              RAII: cleanup on normal exit
//     ├─ install_interrupt_handler()  Ctrl+C: cleanup, exit(130)
//     └─ CaptchaService ─ register(path) from any decode thread
//
// Removal failures (already deleted, permission denied) are
// logged and skipped; they never abort the remaining removals.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
};

use anyhow::{Context, Result};
use parking_lot::Mutex;

/// Registry of generated artifact paths, deleted once at shutdown.
#[derive(Debug, Default)]
pub struct TempTracker {
    paths:   Mutex<Vec<PathBuf>>,
    cleaned: AtomicBool,
}

impl TempTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record a path for removal at shutdown. Safe to call from
    /// many threads at once. Once cleanup has run, the path is
    /// removed on the spot instead.
    pub fn register(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut paths = self.paths.lock();
        if self.cleaned.load(Ordering::SeqCst) {
            drop(paths);
            tracing::info!("Cleanup already ran, removing '{}' now", path.display());
            remove_artifact(&path);
            return;
        }
        tracing::debug!("Tracking temp artifact '{}'", path.display());
        paths.push(path);
    }

    /// Snapshot of every registered path, in registration order.
    pub fn registered(&self) -> Vec<PathBuf> {
        self.paths.lock().clone()
    }

    pub fn is_cleaned(&self) -> bool {
        self.cleaned.load(Ordering::SeqCst)
    }

    /// Delete every registered path. Only the first call does any
    /// work; later calls return 0 immediately.
    ///
    /// Returns the number of files actually removed.
    pub fn cleanup_all(&self) -> usize {
        // Flag flip and drain happen under the lock that register takes
        let paths = {
            let mut guard = self.paths.lock();
            if self.cleaned.swap(true, Ordering::SeqCst) {
                return 0;
            }
            std::mem::take(&mut *guard)
        };
        tracing::info!("Starting cleanup of {} temp artifacts", paths.len());

        let mut seen    = HashSet::new();
        let mut removed = 0usize;
        for path in paths {
            if !seen.insert(path.clone()) {
                continue;
            }
            if remove_artifact(&path) {
                removed += 1;
            }
        }
        removed
    }

    /// Scoped handle that runs [`TempTracker::cleanup_all`] when dropped.
    pub fn guard(self: &Arc<Self>) -> CleanupGuard {
        CleanupGuard { tracker: Arc::clone(self) }
    }
}

fn remove_artifact(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed '{}'", path.display());
            true
        }
        Err(e) => {
            tracing::info!("Could not remove '{}': {}", path.display(), e);
            false
        }
    }
}

/// Runs cleanup when the owning scope ends (normal process exit
/// from `main`, or an early `?` return).
#[must_use = "cleanup runs when the guard is dropped"]
pub struct CleanupGuard {
    tracker: Arc<TempTracker>,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        self.tracker.cleanup_all();
    }
}

/// Install a Ctrl+C hook that cleans up `tracker` and exits with
/// status 130. Only the first call per process installs anything.
pub fn install_interrupt_handler(tracker: Arc<TempTracker>) -> Result<()> {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    if INSTALLED.set(()).is_err() {
        tracing::debug!("Interrupt handler already installed");
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build signal runtime")?;

    std::thread::Builder::new()
        .name("interrupt-handler".into())
        .spawn(move || {
            runtime.block_on(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                    return;
                }
                tracing::info!("Ctrl+C caught. Closing");
                tracker.cleanup_all();
                std::process::exit(130);
            })
        })
        .context("Failed to spawn interrupt handler thread")?;

    Ok(())
}
