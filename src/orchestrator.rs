//! Owns the last loaded image path and the active detector, and forwards
//! every fresh result to the display.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::detection::{self, DetectorHandle};
use crate::error::{RegionError, Result};
use crate::models::DetectionResult;

/// Presentation surface owned by the shell.
pub trait DisplaySink: Send + Sync {
    /// Show a new result. Receives a shared immutable view, never a buffer the
    /// core keeps mutating.
    fn present(&self, result: Arc<DetectionResult>);

    /// A run produced no update; show a diagnostic instead.
    fn report(&self, _error: &RegionError) {}
}

/// Update forwarded to the foreground thread.
#[derive(Debug, Clone)]
pub enum DisplayUpdate {
    Frame(Arc<DetectionResult>),
    Failure(String),
}

/// Sink that marshals updates over a channel so only the thread draining the
/// receiver touches presentation state.
pub struct ChannelSink {
    sender: Sender<DisplayUpdate>,
}

impl ChannelSink {
    pub fn new(sender: Sender<DisplayUpdate>) -> Self {
        Self { sender }
    }
}

impl DisplaySink for ChannelSink {
    fn present(&self, result: Arc<DetectionResult>) {
        if self.sender.send(DisplayUpdate::Frame(result)).is_err() {
            debug!("display receiver dropped, discarding frame");
        }
    }

    fn report(&self, error: &RegionError) {
        if self.sender.send(DisplayUpdate::Failure(error.to_string())).is_err() {
            debug!("display receiver dropped, discarding failure");
        }
    }
}

/// Sink for headless runs: results only show up in the log.
pub struct LogSink;

impl DisplaySink for LogSink {
    fn present(&self, result: Arc<DetectionResult>) {
        let (width, height) = result.dimensions();
        info!(regions = result.regions().len(), width, height, "detection updated");
        for region in result.regions() {
            info!(
                "  region at ({}, {}) {}x{}",
                region.x, region.y, region.width, region.height
            );
        }
    }

    fn report(&self, error: &RegionError) {
        warn!("no update: {error}");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct PipelineOrchestrator {
    detector: RwLock<DetectorHandle>,
    image_path: Mutex<Option<PathBuf>>,
    current: Mutex<Option<Arc<DetectionResult>>>,
    // Serializes whole runs so results reach the sink in start order.
    run_lock: Mutex<()>,
    sink: Arc<dyn DisplaySink>,
    output_dir: PathBuf,
}

impl PipelineOrchestrator {
    pub fn new(detector: DetectorHandle, sink: Arc<dyn DisplaySink>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            detector: RwLock::new(detector),
            image_path: Mutex::new(None),
            current: Mutex::new(None),
            run_lock: Mutex::new(()),
            sink,
            output_dir: output_dir.into(),
        }
    }

    /// Snapshot of the active detector.
    pub fn detector(&self) -> DetectorHandle {
        self.detector
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install a new detector. Runs already in flight keep their snapshot.
    pub fn swap_detector(&self, detector: DetectorHandle) {
        let mut slot = self.detector.write().unwrap_or_else(PoisonError::into_inner);
        info!(detector = detector.name(), "installed detector");
        *slot = detector;
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        lock(&self.image_path).clone()
    }

    pub fn current_result(&self) -> Option<Arc<DetectionResult>> {
        lock(&self.current).clone()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Forward a diagnostic to the sink.
    pub fn report(&self, error: &RegionError) {
        self.sink.report(error);
    }

    /// Remember `path` as the current image and run detection on it. If the
    /// image cannot be loaded the previous path is kept.
    pub fn load_image(&self, path: impl AsRef<Path>) -> Result<Option<Arc<DetectionResult>>> {
        let path = path.as_ref().to_path_buf();
        info!(path = %path.display(), "image loaded");
        let previous = lock(&self.image_path).replace(path.clone());

        let outcome = self.run_detection();
        if let Err(RegionError::LoadFailure { .. }) = &outcome {
            self.restore_path(&path, previous);
        }
        outcome
    }

    /// Put `previous` back unless another load replaced `attempted` meanwhile.
    fn restore_path(&self, attempted: &Path, previous: Option<PathBuf>) {
        let mut current = lock(&self.image_path);
        if current.as_deref() == Some(attempted) {
            *current = previous;
        }
    }

    /// Run the active detector on the current image and present the result.
    /// Does nothing until an image has been loaded. On failure the previous
    /// result stays current and the sink only receives a diagnostic.
    pub fn run_detection(&self) -> Result<Option<Arc<DetectionResult>>> {
        let _run = lock(&self.run_lock);

        let Some(path) = self.current_path() else {
            debug!("no image loaded, skipping detection");
            return Ok(None);
        };

        match self.detect_path(&path) {
            Ok(result) => {
                let result = Arc::new(result);
                *lock(&self.current) = Some(result.clone());
                self.sink.present(result.clone());
                Ok(Some(result))
            }
            Err(e) => {
                warn!(path = %path.display(), "detection produced no update: {e}");
                self.sink.report(&e);
                Err(e)
            }
        }
    }

    fn detect_path(&self, path: &Path) -> Result<DetectionResult> {
        debug!(path = %path.display(), "processing image");
        let image = detection::load_image(path)?;
        let detector = self.detector();
        let result = detector.detect(&image)?;
        let marked = result.save(&self.output_dir)?;
        info!(
            detector = detector.name(),
            regions = result.regions().len(),
            marked = %marked.display(),
            "detection finished"
        );
        Ok(result)
    }
}
