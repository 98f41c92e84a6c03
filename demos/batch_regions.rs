use std::env;
use std::path::PathBuf;

use regionlab::{ContourRegionDetector, mark_regions};

fn main() -> anyhow::Result<()> {
    regionlab::logging::init_tracing(false);

    let paths: Vec<PathBuf> = env::args().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        eprintln!("Usage: batch_regions <image_path>...");
        std::process::exit(1);
    }

    let detector = ContourRegionDetector::default();
    let results = mark_regions(&detector, &paths, "output_images".as_ref())?;

    for item in &results {
        println!("{}: {} region(s)", item.source.display(), item.regions.len());
        for (i, region) in item.regions.iter().enumerate() {
            println!(
                "  {}: ({}, {}) {}x{} from contour {}",
                i + 1,
                region.x,
                region.y,
                region.width,
                region.height,
                region.contour_index
            );
        }
    }
    println!("Skipped {} image(s)", paths.len() - results.len());

    Ok(())
}
