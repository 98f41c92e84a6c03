//! Background watcher that rebuilds the detector when its source file changes
//! and reruns detection on the last loaded image.

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::DetectorParams;
use crate::detection::{ContourRegionDetector, DetectorHandle};
use crate::error::{RegionError, Result};
use crate::orchestrator::PipelineOrchestrator;

/// How often an idle watcher checks for shutdown.
const IDLE_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    Modified,
}

/// A filesystem change relevant to the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: WatchKind,
}

impl WatchEvent {
    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: WatchKind::Modified,
        }
    }

    /// Modifications and creations (editors that save by renaming a temp file
    /// produce the latter) map to `Modified`; everything else is dropped.
    pub fn from_notify(event: &notify::Event) -> Vec<Self> {
        match event.kind {
            EventKind::Modify(_) | EventKind::Create(_) => {
                event.paths.iter().cloned().map(Self::modified).collect()
            }
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    PendingReload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Event did not concern the detector source.
    Ignored,
    /// New detector installed and detection rerun.
    Reloaded,
    /// Rebuild failed, previous detector still active.
    Failed,
}

/// Produces a fresh detector from its source artifact.
pub trait DetectorLoader: Send + Sync {
    fn source_path(&self) -> &Path;
    fn load(&self) -> Result<DetectorHandle>;
}

/// Loads a `ContourRegionDetector` from a TOML parameter file.
pub struct TomlDetectorLoader {
    path: PathBuf,
}

impl TomlDetectorLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DetectorLoader for TomlDetectorLoader {
    fn source_path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<DetectorHandle> {
        let reload_failure = |reason: String| RegionError::ReloadFailure {
            path: self.path.clone(),
            reason,
        };
        let params = DetectorParams::load_or_default(&self.path).map_err(|e| reload_failure(e.to_string()))?;
        let detector = ContourRegionDetector::new(params).map_err(|e| reload_failure(e.to_string()))?;
        Ok(Arc::new(detector))
    }
}

pub struct SourceWatcher {
    suffix: String,
    loader: Arc<dyn DetectorLoader>,
    orchestrator: Arc<PipelineOrchestrator>,
    state: WatchState,
    reloads: usize,
    shutdown: Arc<AtomicBool>,
}

impl SourceWatcher {
    /// `suffix` filters watch events: only paths ending with it trigger a reload.
    pub fn new(
        suffix: impl Into<String>,
        loader: Arc<dyn DetectorLoader>,
        orchestrator: Arc<PipelineOrchestrator>,
    ) -> Self {
        Self {
            suffix: suffix.into(),
            loader,
            orchestrator,
            state: WatchState::Idle,
            reloads: 0,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Number of reload attempts so far.
    pub fn reload_count(&self) -> usize {
        self.reloads
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.to_string_lossy().ends_with(&self.suffix)
    }

    /// Record an event; a matching one leaves a reload pending.
    pub fn observe(&mut self, event: &WatchEvent) -> bool {
        if !self.matches(&event.path) {
            debug!(path = %event.path.display(), "ignoring change");
            return false;
        }
        info!(path = %event.path.display(), "detected change in detector source");
        self.state = WatchState::PendingReload;
        true
    }

    /// Execute the pending reload, if any, and return to `Idle`.
    pub fn flush(&mut self) -> ReloadOutcome {
        if self.state != WatchState::PendingReload {
            return ReloadOutcome::Ignored;
        }
        let outcome = self.reload();
        self.state = WatchState::Idle;
        outcome
    }

    /// Observe one event and immediately act on it.
    pub fn handle_event(&mut self, event: &WatchEvent) -> ReloadOutcome {
        if !self.observe(event) {
            return ReloadOutcome::Ignored;
        }
        self.flush()
    }

    fn reload(&mut self) -> ReloadOutcome {
        self.reloads += 1;
        match self.loader.load() {
            Ok(detector) => {
                info!(source = %self.loader.source_path().display(), "reloaded detector");
                self.orchestrator.swap_detector(detector);
                if let Err(e) = self.orchestrator.run_detection() {
                    warn!("rerun after reload failed: {e}");
                }
                ReloadOutcome::Reloaded
            }
            Err(e) => {
                warn!("{e}");
                self.orchestrator.report(&e);
                ReloadOutcome::Failed
            }
        }
    }

    /// Drain filesystem events until the channel closes or shutdown is
    /// requested. Matching events arriving within `debounce` of each other
    /// collapse into a single reload.
    pub fn run(&mut self, events: Receiver<notify::Result<notify::Event>>, debounce: Duration) {
        loop {
            let timeout = match self.state {
                WatchState::PendingReload => debounce,
                WatchState::Idle => IDLE_POLL,
            };

            match events.recv_timeout(timeout) {
                Ok(Ok(event)) => {
                    for watch_event in WatchEvent::from_notify(&event) {
                        self.observe(&watch_event);
                    }
                }
                Ok(Err(e)) => error!("watch error: {e}"),
                Err(RecvTimeoutError::Timeout) => {
                    self.flush();
                    if self.shutdown.load(Ordering::Relaxed) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.flush();
                    break;
                }
            }
        }
        debug!("source watcher stopped");
    }

    /// Watch `watch_dir` (non-recursively) on a background thread.
    pub fn spawn(mut self, watch_dir: &Path, debounce: Duration) -> Result<WatcherGuard> {
        let (sender, receiver) = mpsc::channel::<notify::Result<notify::Event>>();
        let mut watcher = notify::recommended_watcher(sender)?;
        watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;
        info!(
            dir = %watch_dir.display(),
            suffix = %self.suffix,
            "watching for detector changes"
        );

        let shutdown = self.shutdown.clone();
        let thread = thread::Builder::new()
            .name("source-watcher".to_string())
            .spawn(move || self.run(receiver, debounce))?;

        Ok(WatcherGuard {
            watcher: Some(watcher),
            thread: Some(thread),
            shutdown,
        })
    }
}

/// Keeps the background watcher alive; stops it when dropped.
pub struct WatcherGuard {
    watcher: Option<RecommendedWatcher>,
    thread: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl Drop for WatcherGuard {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        drop(self.watcher.take());
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            error!("source watcher thread panicked");
        }
    }
}
