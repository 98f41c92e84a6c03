use crate::config::AuxStep;
use crate::detection::{contours, preprocessing, transforms};
use crate::error::Result;
use crate::pipeline::{MetadataValue, PipelineContext, PipelineData, PipelineStep};
use image::DynamicImage;

/// Convert image to grayscale
pub struct GrayscaleStep;

impl PipelineStep for GrayscaleStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let gray = preprocessing::to_grayscale(&item.image);
                item.with_image(DynamicImage::ImageLuma8(gray))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Grayscale Conversion"
    }
}

/// Optional smoothing ahead of thresholding
pub struct AuxiliaryStep {
    pub step: AuxStep,
    name: String,
}

impl AuxiliaryStep {
    pub fn new(step: AuxStep) -> Self {
        let name = match &step {
            AuxStep::Blur { .. } => "Gaussian Blur",
            AuxStep::Median { .. } => "Median Filter",
            AuxStep::Bilateral { .. } => "Bilateral Filter",
        }
        .to_string();
        Self { step, name }
    }
}

impl PipelineStep for AuxiliaryStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::with_capacity(data.len());
        for item in data {
            let filtered = transforms::apply(&self.step, &item.image)?;
            result.push(item.with_image(DynamicImage::ImageLuma8(filtered)));
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Inverted Gaussian adaptive threshold producing a binary mask
pub struct AdaptiveThresholdStep {
    pub block_size: u32,
    pub offset: i32,
}

impl PipelineStep for AdaptiveThresholdStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::with_capacity(data.len());
        for item in data {
            let gray = preprocessing::require_luma(&item.image, "adaptive threshold")?;
            let mask = preprocessing::adaptive_threshold(gray, self.block_size, self.offset);
            result.push(item.with_image(DynamicImage::ImageLuma8(mask)));
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Adaptive Threshold"
    }
}

/// Morphological closing of the mask
pub struct ClosingStep {
    pub kernel_size: u32,
    pub iterations: u32,
}

impl PipelineStep for ClosingStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::with_capacity(data.len());
        for item in data {
            let mask = preprocessing::require_luma(&item.image, "morphological closing")?;
            let closed = preprocessing::close(mask, self.kernel_size, self.iterations);
            result.push(item.with_image(DynamicImage::ImageLuma8(closed)));
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Morphological Closing"
    }
}

/// Find external contours in the closed mask - splits one mask into one item
/// per region that survives the size filter
pub struct RegionExtractionStep {
    pub min_region_size: u32,
}

impl PipelineStep for RegionExtractionStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let mask = preprocessing::require_luma(&item.image, "contour extraction")?;
            let found = contours::find_external_contours(mask);
            let total = found.len() as i64;

            for contour in &found {
                let Some(region) = contour.bounding_region(self.min_region_size) else {
                    continue;
                };

                let region_mask = image::imageops::crop_imm(mask, region.x, region.y, region.width, region.height)
                    .to_image();
                let fill_ratio =
                    preprocessing::foreground_count(&region_mask) as f32 / region.area() as f32;

                // Each region becomes its own PipelineData, cropped from the original
                let cropped = item.original.crop_imm(region.x, region.y, region.width, region.height);
                let region_data = PipelineData::from_region(cropped, item.original.clone(), region)
                    .with_metadata("contour_points", MetadataValue::Int(contour.point_count as i64))
                    .with_metadata("contour_total", MetadataValue::Int(total))
                    .with_metadata("fill_ratio", MetadataValue::Float(fill_ratio));
                result.push(region_data);
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Region Extraction"
    }
}
