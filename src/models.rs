use image::{DynamicImage, RgbImage};
use std::path::{Path, PathBuf};

use crate::error::{RegionError, Result};

/// Smallest width and height a region may have, in pixels.
pub const MIN_REGION_SIZE: u32 = 40;

/// File name of the annotated output, overwritten on every run.
pub const MARKED_IMAGE_NAME: &str = "marked_image.png";

/// Outer boundary of one foreground blob, reduced to its extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    /// Position in contour discovery order.
    pub index: usize,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub point_count: usize,
}

impl Contour {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Axis-aligned bounding rectangle, or `None` when it is smaller than
    /// `min_size` in either dimension.
    pub fn bounding_region(&self, min_size: u32) -> Option<Region> {
        if self.width() < min_size || self.height() < min_size {
            return None;
        }
        Some(Region {
            x: self.min_x,
            y: self.min_y,
            width: self.width(),
            height: self.height(),
            contour_index: self.index,
        })
    }
}

/// A bounding box believed to enclose a block of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Index of the external contour this box was derived from.
    pub contour_index: usize,
}

impl Region {
    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Top-left and bottom-right corners, as reported by the batch output.
    pub fn corners(&self) -> ((u32, u32), (u32, u32)) {
        ((self.x, self.y), (self.right(), self.bottom()))
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }
}

/// Output of one detection run: the annotated copy plus the regions drawn on
/// it, in contour discovery order.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    annotated: RgbImage,
    regions: Vec<Region>,
}

impl DetectionResult {
    pub fn new(annotated: RgbImage, regions: Vec<Region>) -> Self {
        Self { annotated, regions }
    }

    pub fn annotated(&self) -> &RgbImage {
        &self.annotated
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.annotated.dimensions()
    }

    /// RGBA copy of the annotated image for display surfaces.
    pub fn to_rgba8(&self) -> image::RgbaImage {
        DynamicImage::ImageRgb8(self.annotated.clone()).to_rgba8()
    }

    /// Write the annotated image to `<output_dir>/marked_image.png`,
    /// creating the directory if needed.
    pub fn save(&self, output_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(MARKED_IMAGE_NAME);
        self.annotated
            .save(&path)
            .map_err(|source| RegionError::Save {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

/// One entry of a batch run.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub source: PathBuf,
    pub marked_image_path: PathBuf,
    pub regions: Vec<Region>,
}
