use std::env;
use std::path::PathBuf;

use image::DynamicImage;
use regionlab::detection::{load_image, preprocessing, transforms};

// Saves every auxiliary transform of one image side by side for inspection.
fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <image_path>", args[0]);
        std::process::exit(1);
    }

    let img = load_image(args[1].as_ref())?;
    let gray = DynamicImage::ImageLuma8(preprocessing::to_grayscale(&img));
    let out = PathBuf::from("aux_output");
    std::fs::create_dir_all(&out)?;

    transforms::gaussian_blur(&gray, 1.5)?.save(out.join("blur.png"))?;
    transforms::detect_edges(&gray, 50.0, 100.0)?.save(out.join("edges.png"))?;
    transforms::median_filter(&gray, 2)?.save(out.join("median.png"))?;
    transforms::bilateral_filter(&gray, 9, 75.0, 75.0)?.save(out.join("bilateral.png"))?;
    transforms::global_threshold(&gray, 127)?.save(out.join("threshold.png"))?;
    transforms::rotate(&img, 5.0).save(out.join("rotated.png"))?;
    transforms::translate(&img, 25, 50).save(out.join("translated.png"))?;
    if let Ok(hsv) = transforms::to_hsv(&img) {
        hsv.save(out.join("hsv.png"))?;
    }

    let bins = transforms::histogram(&gray)?;
    let (peak, count) = bins
        .iter()
        .enumerate()
        .max_by_key(|(_, count)| **count)
        .unwrap_or((0, &0));
    println!("Histogram peak: level {peak} ({count} pixels)");
    println!("Saved transforms to {}/", out.display());

    Ok(())
}
