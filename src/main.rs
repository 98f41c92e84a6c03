use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use regionlab::detection::ContourRegionDetector;
use regionlab::watcher::DetectorLoader;
use regionlab::{
    DetectorParams, LogSink, PipelineOrchestrator, Settings, SourceWatcher, TomlDetectorLoader,
    logging, mark_regions,
};

#[derive(Parser)]
#[command(name = "regionlab")]
#[command(about = "Iterate on document region detection with live reload")]
struct Cli {
    /// Images to process; the first one is loaded at startup in interactive modes
    #[arg(value_name = "IMAGE")]
    images: Vec<PathBuf>,

    /// Directory receiving marked_image.png
    #[arg(long, value_name = "DIR", default_value = "output_images")]
    output_dir: PathBuf,

    /// Detector parameter file watched for changes
    #[arg(long, value_name = "FILE", default_value = "regions.toml")]
    source: PathBuf,

    /// Directory to watch (non-recursive)
    #[arg(long, value_name = "DIR", default_value = ".")]
    watch_dir: PathBuf,

    /// Quiet period that coalesces bursts of file changes
    #[arg(long, value_name = "MS", default_value_t = 200)]
    debounce_ms: u64,

    /// Process IMAGES once and exit
    #[arg(long)]
    batch: bool,

    /// Watch and log results without opening a window
    #[arg(long)]
    headless: bool,

    /// Save every intermediate pipeline image to directory (batch mode, must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            output_dir: self.output_dir.clone(),
            source: self.source.clone(),
            watch_dir: self.watch_dir.clone(),
            debounce: Duration::from_millis(self.debounce_ms),
            initial_image: self.images.first().cloned(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    logging::init_tracing(args.verbose);
    let settings = args.settings();

    if args.batch {
        return run_batch(&args, &settings);
    }

    if args.headless || !cfg!(feature = "gui") {
        return run_headless(settings);
    }

    run_gui(settings)
}

fn run_batch(args: &Cli, settings: &Settings) -> anyhow::Result<()> {
    if args.images.is_empty() {
        anyhow::bail!("batch mode needs at least one IMAGE");
    }

    let params = DetectorParams::load_or_default(&settings.source_path())?;
    let mut detector = ContourRegionDetector::new(params)?;
    if let Some(debug_dir) = &args.debug_out {
        detector = detector.with_debug(debug_dir.clone())?;
    }

    let results = mark_regions(&detector, &args.images, &settings.output_dir)?;

    println!("\n=== Region Detection Results ===");
    println!("Images processed: {} of {}", results.len(), args.images.len());
    for item in &results {
        println!("\n{}: {} region(s)", item.source.display(), item.regions.len());
        for region in &item.regions {
            let ((x0, y0), (x1, y1)) = region.corners();
            println!("  ({x0}, {y0}) -> ({x1}, {y1})");
        }
    }
    if let Some(last) = results.last() {
        println!("\nMarked image: {}", last.marked_image_path.display());
    }

    Ok(())
}

fn run_headless(settings: Settings) -> anyhow::Result<()> {
    let loader = Arc::new(TomlDetectorLoader::new(settings.source_path()));
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        loader.load()?,
        Arc::new(LogSink),
        settings.output_dir.clone(),
    ));

    if let Some(path) = &settings.initial_image
        && let Err(e) = orchestrator.load_image(path)
    {
        warn!("initial image not loaded: {e}");
    }

    let _watcher = SourceWatcher::new(settings.source_suffix(), loader, orchestrator)
        .spawn(&settings.watch_dir, settings.debounce)?;
    info!("press Ctrl-C to stop");

    loop {
        std::thread::park();
    }
}

#[cfg(feature = "gui")]
fn run_gui(settings: Settings) -> anyhow::Result<()> {
    use regionlab::gui::RegionViewerApp;

    iced::application(
        move || RegionViewerApp::new(settings.clone()),
        RegionViewerApp::update,
        RegionViewerApp::view,
    )
    .title(RegionViewerApp::title)
    .subscription(RegionViewerApp::subscription)
    .run()
    .inspect_err(|e| tracing::error!("viewer exited with error: {e}"))?;

    Ok(())
}

#[cfg(not(feature = "gui"))]
fn run_gui(settings: Settings) -> anyhow::Result<()> {
    run_headless(settings)
}
