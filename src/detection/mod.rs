pub mod annotate;
pub mod contours;
pub mod preprocessing;
pub mod steps;
pub mod transforms;

use image::{DynamicImage, GrayImage, ImageReader, Rgb};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::DetectorParams;
use crate::error::{RegionError, Result};
use crate::models::{BatchItem, DetectionResult, Region};
use crate::pipeline::Pipeline;

/// Stable seam for the active detection logic. Implementations are pure:
/// the same image always yields the same result.
pub trait RegionDetector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<DetectionResult>;

    /// Human-readable name (used in logs)
    fn name(&self) -> &str;
}

/// Reference to the currently active detection logic. Replaced as a whole on
/// reload, never mutated in place.
pub type DetectorHandle = Arc<dyn RegionDetector>;

/// Grayscale, Gaussian adaptive threshold, closing, external contours,
/// size filter, outline drawing.
#[derive(Clone)]
pub struct ContourRegionDetector {
    params: DetectorParams,
    pipeline: Pipeline,
}

impl ContourRegionDetector {
    pub fn new(params: DetectorParams) -> Result<Self> {
        params.validate()?;
        Ok(Self::build(params))
    }

    fn build(params: DetectorParams) -> Self {
        let pipeline = build_region_pipeline(&params);
        Self { params, pipeline }
    }

    /// Dump every intermediate image into `output_dir` (must be empty).
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        self.pipeline = self.pipeline.with_debug(output_dir)?;
        Ok(self)
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// The closed binary mask contours are extracted from.
    pub fn closed_mask(&self, image: &DynamicImage) -> Result<GrayImage> {
        let mask_steps = self.pipeline.len().saturating_sub(1);
        let items = self.pipeline.run_partial(image.clone(), mask_steps)?;
        Ok(items
            .into_iter()
            .next()
            .map(|item| item.image.to_luma8())
            .unwrap_or_else(|| GrayImage::new(image.width(), image.height())))
    }

    /// Detect and persist the annotated image to `<output_dir>/marked_image.png`.
    pub fn detect_and_save(&self, image: &DynamicImage, output_dir: &Path) -> Result<(DetectionResult, PathBuf)> {
        let result = self.detect(image)?;
        let path = result.save(output_dir)?;
        info!(path = %path.display(), "saved marked image");
        Ok((result, path))
    }
}

impl Default for ContourRegionDetector {
    fn default() -> Self {
        Self::build(DetectorParams::default())
    }
}

impl RegionDetector for ContourRegionDetector {
    fn detect(&self, image: &DynamicImage) -> Result<DetectionResult> {
        let items = self.pipeline.run(image.clone())?;

        let regions: Vec<Region> = items.iter().filter_map(|item| item.region).collect();
        for (item, region) in items.iter().zip(&regions) {
            debug!(
                x = region.x,
                y = region.y,
                w = region.width,
                h = region.height,
                contour = region.contour_index,
                fill_ratio = item.get_float("fill_ratio").unwrap_or(0.0),
                "marking region"
            );
        }

        let annotation = &self.params.annotation;
        let annotated = annotate::draw_regions(
            image,
            &regions,
            Rgb(annotation.color),
            annotation.stroke_width,
        );
        Ok(DetectionResult::new(annotated, regions))
    }

    fn name(&self) -> &str {
        "Contour Region Detector"
    }
}

/// Build the region pipeline for a parameter set
pub fn build_region_pipeline(params: &DetectorParams) -> Pipeline {
    use steps::*;

    let mut pipeline = Pipeline::new().add_step(Arc::new(GrayscaleStep));
    for aux in &params.auxiliary.steps {
        pipeline = pipeline.add_step(Arc::new(AuxiliaryStep::new(aux.clone())));
    }
    pipeline
        .add_step(Arc::new(AdaptiveThresholdStep {
            block_size: params.threshold.block_size,
            offset: params.threshold.offset,
        }))
        .add_step(Arc::new(ClosingStep {
            kernel_size: params.closing.kernel_size,
            iterations: params.closing.iterations,
        }))
        .add_step(Arc::new(RegionExtractionStep {
            min_region_size: params.filter.min_region_size,
        }))
}

/// Decode an image from disk.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let load_failure = |source| RegionError::LoadFailure {
        path: path.to_path_buf(),
        source,
    };
    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| load_failure(image::ImageError::IoError(e)))?
        .decode()
        .map_err(load_failure)
}

/// Batch entry point: detect regions in every image, writing each annotated
/// result to `<output_dir>/marked_image.png` (so the last success wins).
/// Images that fail to load or process are logged and skipped.
pub fn mark_regions(
    detector: &dyn RegionDetector,
    image_paths: &[PathBuf],
    output_dir: &Path,
) -> Result<Vec<BatchItem>> {
    std::fs::create_dir_all(output_dir)?;
    let mut results = Vec::new();

    for image_path in image_paths {
        info!(path = %image_path.display(), "reading image");
        let image = match load_image(image_path) {
            Ok(image) => image,
            Err(e) => {
                warn!("{e}");
                continue;
            }
        };

        let outcome = detector
            .detect(&image)
            .and_then(|result| result.save(output_dir).map(|path| (result, path)));
        match outcome {
            Ok((result, marked_image_path)) => {
                info!(
                    regions = result.regions().len(),
                    path = %marked_image_path.display(),
                    "saved marked image"
                );
                results.push(BatchItem {
                    source: image_path.clone(),
                    marked_image_path,
                    regions: result.regions().to_vec(),
                });
            }
            Err(e) => warn!(path = %image_path.display(), "skipping image: {e}"),
        }
    }

    Ok(results)
}
