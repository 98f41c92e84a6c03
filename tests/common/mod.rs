#![allow(unused_imports)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from regionlab for tests
pub use regionlab::{
    ContourRegionDetector, DetectionResult, DetectorHandle, DetectorLoader, DisplaySink,
    PipelineOrchestrator, Region, RegionDetector, RegionError, SourceWatcher, WatchEvent,
};
