pub mod config;
pub mod detection;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod watcher;

pub use config::{DetectorParams, Settings};
pub use detection::{ContourRegionDetector, DetectorHandle, RegionDetector, mark_regions};
pub use error::{RegionError, Result};
pub use models::{BatchItem, DetectionResult, MARKED_IMAGE_NAME, MIN_REGION_SIZE, Region};
pub use orchestrator::{ChannelSink, DisplaySink, DisplayUpdate, LogSink, PipelineOrchestrator};
pub use pipeline::{MetadataValue, Pipeline, PipelineContext, PipelineData, PipelineStep};
pub use watcher::{
    DetectorLoader, ReloadOutcome, SourceWatcher, TomlDetectorLoader, WatchEvent, WatchState,
    WatcherGuard,
};

#[cfg(feature = "gui")]
pub mod gui;
