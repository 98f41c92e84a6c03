//! Auxiliary transforms for experimenting with the detector.
//!
//! None of these run in the canonical region pipeline. The smoothing filters
//! can be wired in ahead of thresholding through `[[auxiliary.steps]]` in the
//! detector parameters; the rest are standalone building blocks.

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::geometric_transformations::{rotate_about_center, translate as translate_image, Interpolation};

use crate::config::AuxStep;
use crate::detection::preprocessing::require_luma;
use crate::error::{RegionError, Result};

/// Gaussian blur of a grayscale image.
pub fn gaussian_blur(img: &DynamicImage, sigma: f32) -> Result<GrayImage> {
    let gray = require_luma(img, "gaussian blur")?;
    Ok(imageproc::filter::gaussian_blur_f32(gray, sigma))
}

/// Canny edge map of a grayscale image.
pub fn detect_edges(img: &DynamicImage, low_threshold: f32, high_threshold: f32) -> Result<GrayImage> {
    let gray = require_luma(img, "edge detection")?;
    Ok(imageproc::edges::canny(gray, low_threshold, high_threshold))
}

/// Intensity histogram with one bin per level.
pub fn histogram(img: &DynamicImage) -> Result<[u32; 256]> {
    let gray = require_luma(img, "histogram")?;
    let mut bins = [0u32; 256];
    for pixel in gray.pixels() {
        bins[pixel[0] as usize] += 1;
    }
    Ok(bins)
}

/// Rotate a color image about its center by `degrees` (counter-clockwise),
/// filling uncovered pixels with white.
pub fn rotate(img: &DynamicImage, degrees: f32) -> RgbImage {
    rotate_about_center(
        &img.to_rgb8(),
        -degrees.to_radians(),
        Interpolation::Bilinear,
        Rgb([255, 255, 255]),
    )
}

/// Shift a color image by `(dx, dy)` pixels.
pub fn translate(img: &DynamicImage, dx: i32, dy: i32) -> RgbImage {
    translate_image(&img.to_rgb8(), (dx, dy))
}

/// Median filter over a `(2 * radius + 1)` square.
pub fn median_filter(img: &DynamicImage, radius: u32) -> Result<GrayImage> {
    let gray = require_luma(img, "median filter")?;
    Ok(imageproc::filter::median_filter(gray, radius, radius))
}

/// Edge-preserving bilateral filter over a `window` x `window` square.
pub fn bilateral_filter(
    img: &DynamicImage,
    window: u32,
    sigma_color: f32,
    sigma_spatial: f32,
) -> Result<GrayImage> {
    let gray = require_luma(img, "bilateral filter")?;
    Ok(imageproc::filter::bilateral_filter(gray, window, sigma_color, sigma_spatial))
}

/// Convert a three-channel image to 8-bit HSV, packed as (H / 2, S, V) so
/// hue fits in 0..180.
pub fn to_hsv(img: &DynamicImage) -> Result<RgbImage> {
    let channels = img.color().channel_count();
    if channels != 3 {
        return Err(RegionError::UnsupportedFormat {
            operation: "hsv conversion",
            expected: "three-channel",
            found: channels,
        });
    }

    let rgb = img.to_rgb8();
    let mut out = RgbImage::new(rgb.width(), rgb.height());
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let [r, g, b] = pixel.0.map(|c| c as f32);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let saturation = if max > 0.0 { 255.0 * delta / max } else { 0.0 };
        let hue = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * (g - b) / delta
        } else if max == g {
            120.0 + 60.0 * (b - r) / delta
        } else {
            240.0 + 60.0 * (r - g) / delta
        };
        let hue = if hue < 0.0 { hue + 360.0 } else { hue };

        out.put_pixel(
            x,
            y,
            Rgb([
                (hue / 2.0).round().min(179.0) as u8,
                saturation.round() as u8,
                max as u8,
            ]),
        );
    }
    Ok(out)
}

/// Global binary threshold: pixels brighter than `level` become 255.
pub fn global_threshold(img: &DynamicImage, level: u8) -> Result<GrayImage> {
    let gray = require_luma(img, "global threshold")?;
    Ok(GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] > level {
            Luma([255])
        } else {
            Luma([0])
        }
    }))
}

/// Apply one configured pre-threshold step.
pub fn apply(step: &AuxStep, img: &DynamicImage) -> Result<GrayImage> {
    match step {
        AuxStep::Blur { sigma } => gaussian_blur(img, *sigma),
        AuxStep::Median { radius } => median_filter(img, *radius),
        AuxStep::Bilateral {
            window,
            sigma_color,
            sigma_spatial,
        } => bilateral_filter(img, *window, *sigma_color, *sigma_spatial),
    }
}
