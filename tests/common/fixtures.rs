#![allow(dead_code)]

use image::{DynamicImage, Rgb, RgbImage};
use regionlab::{
    ContourRegionDetector, DetectionResult, DetectorHandle, DetectorLoader, DisplaySink,
    PipelineOrchestrator, RegionError,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// White image of the given size.
pub fn blank_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, WHITE))
}

/// White image with solid black rectangles given as (x, y, width, height).
pub fn image_with_rects(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> DynamicImage {
    let mut img = RgbImage::from_pixel(width, height, WHITE);
    for &(x0, y0, w, h) in rects {
        for y in y0..(y0 + h).min(height) {
            for x in x0..(x0 + w).min(width) {
                img.put_pixel(x, y, BLACK);
            }
        }
    }
    DynamicImage::ImageRgb8(img)
}

/// Saves an image as a temporary PNG.
/// The file will be automatically cleaned up when dropped.
pub fn save_temp_png(img: &DynamicImage) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// Sink that records everything it receives.
#[derive(Default)]
pub struct RecordingSink {
    pub frames: Mutex<Vec<Arc<DetectionResult>>>,
    pub failures: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.lock().unwrap().len()
    }

    pub fn last_frame(&self) -> Option<Arc<DetectionResult>> {
        self.frames.lock().unwrap().last().cloned()
    }
}

impl DisplaySink for RecordingSink {
    fn present(&self, result: Arc<DetectionResult>) {
        self.frames.lock().unwrap().push(result);
    }

    fn report(&self, error: &RegionError) {
        self.failures.lock().unwrap().push(error.to_string());
    }
}

/// Orchestrator with a recording sink writing into `output_dir`.
pub fn orchestrator(output_dir: &Path) -> (Arc<PipelineOrchestrator>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        Arc::new(ContourRegionDetector::default()),
        sink.clone(),
        output_dir,
    ));
    (orchestrator, sink)
}

/// Loader that counts attempts and either hands out a fresh default
/// detector or fails.
pub struct CountingLoader {
    pub path: PathBuf,
    pub loads: AtomicUsize,
    pub fail: bool,
}

impl CountingLoader {
    pub fn new(fail: bool) -> Self {
        Self {
            path: PathBuf::from("regions.toml"),
            loads: AtomicUsize::new(0),
            fail,
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl DetectorLoader for CountingLoader {
    fn source_path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> regionlab::Result<DetectorHandle> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RegionError::ReloadFailure {
                path: self.path.clone(),
                reason: "malformed source".to_string(),
            });
        }
        Ok(Arc::new(ContourRegionDetector::default()))
    }
}
