//! Detector parameters and application settings.
//!
//! The detector parameters double as the hot-swappable "source" of the
//! detection logic: editing the TOML file while the viewer runs rebuilds the
//! detector and reruns it on the current image.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{RegionError, Result};

/// Full parameter set of the contour region detector.
///
/// Every field defaults to the canonical pipeline values, so an empty file
/// (or no file at all) yields the canonical detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorParams {
    pub threshold: ThresholdParams,
    pub closing: ClosingParams,
    pub filter: FilterParams,
    pub annotation: AnnotationParams,
    pub auxiliary: AuxiliaryParams,
}

/// Adaptive (Gaussian-weighted) threshold settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdParams {
    /// Side of the square neighborhood, odd and at least 3.
    pub block_size: u32,
    /// Constant subtracted from the local mean.
    pub offset: i32,
}

/// Morphological closing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClosingParams {
    /// Side of the square structuring element, odd.
    pub kernel_size: u32,
    /// Dilation passes, followed by the same number of erosion passes.
    pub iterations: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterParams {
    /// Regions narrower or shorter than this are discarded.
    pub min_region_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnotationParams {
    pub color: [u8; 3],
    pub stroke_width: u32,
}

/// Optional smoothing transforms applied to the grayscale image before
/// thresholding. Empty in the canonical pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AuxiliaryParams {
    pub steps: Vec<AuxStep>,
}

/// A pre-threshold transform that can be wired into the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AuxStep {
    Blur {
        sigma: f32,
    },
    Median {
        radius: u32,
    },
    Bilateral {
        window: u32,
        sigma_color: f32,
        sigma_spatial: f32,
    },
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            block_size: 11,
            offset: 2,
        }
    }
}

impl Default for ClosingParams {
    fn default() -> Self {
        Self {
            kernel_size: 9,
            iterations: 4,
        }
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            min_region_size: crate::models::MIN_REGION_SIZE,
        }
    }
}

impl Default for AnnotationParams {
    fn default() -> Self {
        Self {
            color: [255, 0, 255],
            stroke_width: 2,
        }
    }
}

impl DetectorParams {
    /// Parse parameters from TOML text and validate them.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let params: Self =
            toml::from_str(content).map_err(|e| RegionError::InvalidParams(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Read parameters from a file. A missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RegionError::InvalidParams(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let block = self.threshold.block_size;
        if block < 3 || block % 2 == 0 {
            return Err(RegionError::InvalidParams(format!(
                "threshold.block_size must be odd and at least 3, got {block}"
            )));
        }

        let kernel = self.closing.kernel_size;
        if kernel == 0 || kernel % 2 == 0 || kernel > 511 {
            return Err(RegionError::InvalidParams(format!(
                "closing.kernel_size must be odd and between 1 and 511, got {kernel}"
            )));
        }

        if self.annotation.stroke_width == 0 {
            return Err(RegionError::InvalidParams(
                "annotation.stroke_width must be at least 1".to_string(),
            ));
        }

        for step in &self.auxiliary.steps {
            match step {
                AuxStep::Blur { sigma } if !(*sigma > 0.0) => {
                    return Err(RegionError::InvalidParams(format!(
                        "blur sigma must be positive, got {sigma}"
                    )));
                }
                AuxStep::Median { radius } if *radius == 0 => {
                    return Err(RegionError::InvalidParams(
                        "median radius must be at least 1".to_string(),
                    ));
                }
                AuxStep::Bilateral {
                    window,
                    sigma_color,
                    sigma_spatial,
                } if *window == 0 || !(*sigma_color > 0.0) || !(*sigma_spatial > 0.0) => {
                    return Err(RegionError::InvalidParams(
                        "bilateral needs a non-zero window and positive sigmas".to_string(),
                    ));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// Runtime settings of the viewer, assembled from the command line.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory receiving `marked_image.png`.
    pub output_dir: PathBuf,
    /// Detector parameter file, relative paths resolve against `watch_dir`.
    pub source: PathBuf,
    /// Directory observed for edits (non-recursive).
    pub watch_dir: PathBuf,
    /// Quiet period that coalesces bursts of modification events.
    pub debounce: Duration,
    /// Image loaded right after startup.
    pub initial_image: Option<PathBuf>,
}

impl Settings {
    pub fn source_path(&self) -> PathBuf {
        if self.source.is_absolute() {
            self.source.clone()
        } else {
            self.watch_dir.join(&self.source)
        }
    }

    /// File name used to filter watch events down to the detector source.
    pub fn source_suffix(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.to_string_lossy().into_owned())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output_images"),
            source: PathBuf::from("regions.toml"),
            watch_dir: PathBuf::from("."),
            debounce: Duration::from_millis(200),
            initial_image: None,
        }
    }
}
