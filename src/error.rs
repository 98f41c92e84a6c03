//! Error types shared by the detector, the orchestrator and the source watcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while detecting, reloading or persisting regions.
///
/// None of these are fatal to the process. A failed run leaves the last good
/// detection result and the last good detector in place.
#[derive(Error, Debug)]
pub enum RegionError {
    /// The image path is missing or the file could not be decoded.
    #[error("failed to load image {path}: {source}")]
    LoadFailure {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Rebuilding the detector from its source file failed.
    #[error("failed to reload detector from {path}: {reason}")]
    ReloadFailure { path: PathBuf, reason: String },

    /// A transform received an image with a channel layout it cannot handle.
    #[error("{operation} expects a {expected} image, got {found} channel(s)")]
    UnsupportedFormat {
        operation: &'static str,
        expected: &'static str,
        found: u8,
    },

    /// Detector parameters failed validation.
    #[error("invalid detector parameters: {0}")]
    InvalidParams(String),

    /// Writing an image to disk failed.
    #[error("failed to save image {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("debug directory is not empty: {0}")]
    DebugDirNotEmpty(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Watch(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, RegionError>;
