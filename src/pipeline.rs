use image::DynamicImage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::error::{RegionError, Result};
use crate::models::Region;

/// Data that flows through the pipeline.
/// Each PipelineData is either the whole image or a single region of it.
#[derive(Clone)]
pub struct PipelineData {
    /// The image data (grayscale, binary mask or color)
    pub image: DynamicImage,

    /// Reference to the original image (shared efficiently via Arc)
    pub original: Arc<DynamicImage>,

    /// Region in the original image (None means full image)
    pub region: Option<Region>,

    /// Metadata for tracking properties (e.g. "contour_points", "fill_ratio")
    pub metadata: HashMap<String, MetadataValue>,
}

/// Metadata value types
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Float(f32),
    Int(i64),
}

impl PipelineData {
    /// Create PipelineData for a full image
    pub fn from_image(image: DynamicImage) -> Self {
        let original = Arc::new(image.clone());
        Self {
            image,
            original,
            region: None,
            metadata: HashMap::new(),
        }
    }

    /// Create PipelineData for a region of an image
    pub fn from_region(image: DynamicImage, original: Arc<DynamicImage>, region: Region) -> Self {
        Self {
            image,
            original,
            region: Some(region),
            metadata: HashMap::new(),
        }
    }

    /// Same provenance, new pixels.
    pub fn with_image(&self, image: DynamicImage) -> Self {
        Self {
            image,
            original: self.original.clone(),
            region: self.region,
            metadata: self.metadata.clone(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.metadata.get(key) {
            Some(MetadataValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.metadata.get(key) {
            Some(MetadataValue::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Process data and return transformed data
    /// Steps can split data (1 → many), filter (many → fewer), or transform (many → many)
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>>;

    /// Human-readable name for this step (used in logs and debug directories)
    fn name(&self) -> &str;
}

/// Composable pipeline builder
#[derive(Clone)]
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext::default(),
        }
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(RegionError::DebugDirNotEmpty(output_dir));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Helper method to add a step from a Box (for convenience)
    pub fn add_step_boxed(mut self, step: Box<dyn PipelineStep>) -> Self {
        self.steps.push(Arc::from(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step sequentially on an input image
    pub fn run(&self, input: DynamicImage) -> Result<Vec<PipelineData>> {
        self.run_partial(input, self.steps.len())
    }

    /// Run the pipeline but stop after `num_steps` steps (useful for inspecting
    /// intermediate images such as the closed mask)
    pub fn run_partial(&self, input: DynamicImage, num_steps: usize) -> Result<Vec<PipelineData>> {
        if let Some(debug_config) = &self.context.debug {
            let input_dir = debug_config.output_dir.join("00_input");
            std::fs::create_dir_all(&input_dir)?;
            let input_path = input_dir.join("01.png");
            input.save(&input_path).map_err(|source| RegionError::Save {
                path: input_path.clone(),
                source,
            })?;
        }

        let mut data = vec![PipelineData::from_image(input)];

        for (step_idx, step) in self.steps.iter().take(num_steps).enumerate() {
            debug!(step = step.name(), items = data.len(), "running step");
            data = step.process(data, &self.context)?;

            if let Some(debug_config) = &self.context.debug {
                save_debug_outputs(debug_config, step_idx, step.name(), &data)?;
            }

            debug!(step = step.name(), items = data.len(), "step finished");
        }

        Ok(data)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn save_debug_outputs(
    debug_config: &DebugConfig,
    step_idx: usize,
    step_name: &str,
    data: &[PipelineData],
) -> Result<()> {
    let step_dir_name = format!(
        "{:02}_{}",
        step_idx + 1,
        step_name.to_lowercase().replace(' ', "_")
    );
    let step_dir = debug_config.output_dir.join(&step_dir_name);
    std::fs::create_dir_all(&step_dir)?;

    for (idx, item) in data.iter().enumerate() {
        let output_path = step_dir.join(format!("{:02}.png", idx + 1));
        item.image
            .save(&output_path)
            .map_err(|source| RegionError::Save {
                path: output_path.clone(),
                source,
            })?;
    }

    debug!(count = data.len(), dir = %step_dir_name, "saved debug images");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    struct Invert;

    impl PipelineStep for Invert {
        fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
            Ok(data
                .into_iter()
                .map(|item| {
                    let mut gray = item.image.to_luma8();
                    image::imageops::invert(&mut gray);
                    item.with_image(DynamicImage::ImageLuma8(gray))
                })
                .collect())
        }

        fn name(&self) -> &str {
            "Invert Colors"
        }
    }

    struct Duplicate;

    impl PipelineStep for Duplicate {
        fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
            Ok(data
                .into_iter()
                .flat_map(|item| {
                    let copy = item.clone().with_metadata("copy", MetadataValue::Int(1));
                    [item, copy]
                })
                .collect())
        }

        fn name(&self) -> &str {
            "Duplicate"
        }
    }

    fn input() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([10])))
    }

    #[test]
    fn run_partial_stops_early() {
        let pipeline = Pipeline::new()
            .add_step_boxed(Box::new(Invert))
            .add_step_boxed(Box::new(Duplicate));

        let partial = pipeline.run_partial(input(), 1).unwrap();
        assert_eq!(partial.len(), 1);
        assert_eq!(partial[0].image.to_luma8().get_pixel(0, 0)[0], 245);

        let full = pipeline.run(input()).unwrap();
        assert_eq!(full.len(), 2);
        assert_eq!(full[1].get_int("copy"), Some(1));
        assert_eq!(full[0].original.to_luma8().get_pixel(0, 0)[0], 10);
    }

    #[test]
    fn debug_mode_writes_one_directory_per_step() {
        let dir = tempfile::TempDir::new().unwrap();
        let debug_dir = dir.path().join("debug");
        let pipeline = Pipeline::new()
            .with_debug(debug_dir.clone())
            .unwrap()
            .add_step_boxed(Box::new(Invert))
            .add_step_boxed(Box::new(Duplicate));

        pipeline.run(input()).unwrap();

        assert!(debug_dir.join("00_input/01.png").exists());
        assert!(debug_dir.join("01_invert_colors/01.png").exists());
        assert!(debug_dir.join("02_duplicate/02.png").exists());
    }

    #[test]
    fn debug_mode_requires_empty_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("leftover.txt"), "x").unwrap();
        let err = Pipeline::new()
            .with_debug(dir.path().to_path_buf())
            .err()
            .unwrap();
        assert!(matches!(err, RegionError::DebugDirNotEmpty(_)));
    }
}
