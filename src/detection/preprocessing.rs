use image::{DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};

use crate::error::{RegionError, Result};

/// Mask value of foreground pixels.
pub const FOREGROUND: u8 = 255;

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Borrow the single-channel buffer of an image, rejecting any other layout.
pub fn require_luma<'a>(img: &'a DynamicImage, operation: &'static str) -> Result<&'a GrayImage> {
    img.as_luma8().ok_or(RegionError::UnsupportedFormat {
        operation,
        expected: "single-channel",
        found: img.color().channel_count(),
    })
}

/// Normalized 1-D Gaussian weights for a window of `size` taps. Sigma is
/// derived from the window the same way the classic adaptive-threshold
/// implementations do: `0.3 * ((size - 1) / 2 - 1) + 0.8`.
pub fn gaussian_kernel(size: u32) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;
    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);
    kernel
}

/// Gaussian-weighted local mean over a `block_size` square, replicating
/// edge pixels beyond the border. Values are rounded to the nearest level.
///
/// Both passes accumulate in `f32` and round once at the end.
/// `imageproc::filter::separable_filter_equal` rounds to `u8` between passes,
/// which moves the mean by a level and changes the thresholded mask.
pub fn gaussian_local_mean(gray: &GrayImage, block_size: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let kernel = gaussian_kernel(block_size);
    let radius = (block_size / 2) as i64;
    let mut out = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }

    let max_x = width as i64 - 1;
    let max_y = height as i64 - 1;
    let mut horizontal = vec![0f32; width as usize * height as usize];

    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x as i64 + k as i64 - radius).clamp(0, max_x) as u32;
                acc += weight * gray.get_pixel(sx, y)[0] as f32;
            }
            horizontal[(y * width + x) as usize] = acc;
        }
    }

    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (y as i64 + k as i64 - radius).clamp(0, max_y) as u32;
                acc += weight * horizontal[(sy * width + x) as usize];
            }
            out.put_pixel(x, y, Luma([acc.round().clamp(0.0, 255.0) as u8]));
        }
    }

    out
}

/// Inverted adaptive threshold: a pixel is foreground when it is at least
/// `offset` levels darker than its Gaussian-weighted neighborhood mean.
pub fn adaptive_threshold(gray: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let mean = gaussian_local_mean(gray, block_size);
    let mut mask = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        let local = mean.get_pixel(x, y)[0] as i32;
        if pixel[0] as i32 <= local - offset {
            mask.put_pixel(x, y, Luma([FOREGROUND]));
        }
    }
    mask
}

/// Morphological closing with a square structuring element of side
/// `kernel_size`: `iterations` dilations followed by as many erosions.
/// Pixels outside the image never erode the foreground.
pub fn close(mask: &GrayImage, kernel_size: u32, iterations: u32) -> GrayImage {
    let radius = (kernel_size / 2).min(u8::MAX as u32) as u8;
    if radius == 0 || iterations == 0 {
        return mask.clone();
    }

    let mut closed = mask.clone();
    for _ in 0..iterations {
        closed = dilate(&closed, Norm::LInf, radius);
    }
    for _ in 0..iterations {
        closed = erode(&closed, Norm::LInf, radius);
    }
    closed
}

/// Number of foreground pixels in a mask.
pub fn foreground_count(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] > 0).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn white_with_black_square(size: u32, x0: u32, y0: u32, side: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            if x >= x0 && x < x0 + side && y >= y0 && y < y0 + side {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    #[test]
    fn gaussian_kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(11);
        assert_eq!(kernel.len(), 11);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!((kernel[0] - kernel[10]).abs() < 1e-7);
        assert!(kernel[5] > kernel[4]);
    }

    #[test]
    fn local_mean_of_flat_image_is_flat() {
        let gray = GrayImage::from_pixel(20, 15, Luma([137]));
        let mean = gaussian_local_mean(&gray, 11);
        assert!(mean.pixels().all(|p| p[0] == 137));
    }

    #[test]
    fn local_mean_rounds_once() {
        // Single dark column: the mean is the exact weighted sum, rounded.
        let gray = GrayImage::from_fn(21, 21, |x, _| if x == 10 { Luma([0]) } else { Luma([255]) });
        let mean = gaussian_local_mean(&gray, 11);

        let kernel = gaussian_kernel(11);
        let expected = (255.0 * (1.0 - kernel[5])).round() as u8;
        assert_eq!(mean.get_pixel(10, 10)[0], expected);
        let expected_beside = (255.0 * (1.0 - kernel[4])).round() as u8;
        assert_eq!(mean.get_pixel(11, 10)[0], expected_beside);
    }

    #[test]
    fn flat_image_has_no_foreground() {
        let gray = GrayImage::from_pixel(40, 30, Luma([255]));
        assert_eq!(foreground_count(&adaptive_threshold(&gray, 11, 2)), 0);
    }

    #[test]
    fn dark_edges_become_foreground() {
        let gray = white_with_black_square(60, 20, 20, 20);
        let mask = adaptive_threshold(&gray, 11, 2);

        // Edge of the dark square is darker than its mixed neighborhood.
        assert_eq!(mask.get_pixel(20, 25)[0], FOREGROUND);
        // Deep inside, the neighborhood is uniformly dark.
        assert_eq!(mask.get_pixel(29, 29)[0], 0);
        // Light pixels are never foreground.
        assert_eq!(mask.get_pixel(19, 25)[0], 0);
        assert_eq!(mask.get_pixel(5, 5)[0], 0);
    }

    #[test]
    fn closing_merges_nearby_blobs_and_restores_extent() {
        let mut mask = GrayImage::new(120, 80);
        for y in 30..40 {
            for x in 30..40 {
                mask.put_pixel(x, y, Luma([FOREGROUND]));
                mask.put_pixel(x + 30, y, Luma([FOREGROUND]));
            }
        }

        let closed = close(&mask, 9, 4);
        // Gap between the blobs is filled.
        assert_eq!(closed.get_pixel(50, 35)[0], FOREGROUND);
        // Extent is preserved.
        assert_eq!(closed.get_pixel(30, 30)[0], FOREGROUND);
        assert_eq!(closed.get_pixel(69, 39)[0], FOREGROUND);
        assert_eq!(closed.get_pixel(29, 35)[0], 0);
        assert_eq!(closed.get_pixel(70, 35)[0], 0);
        assert_eq!(closed.get_pixel(50, 41)[0], 0);
    }

    #[test]
    fn zero_iterations_leave_mask_untouched() {
        let gray = white_with_black_square(30, 5, 5, 10);
        let mask = adaptive_threshold(&gray, 11, 2);
        assert_eq!(close(&mask, 9, 0), mask);
    }

    #[test]
    fn require_luma_rejects_color() {
        let color = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        let err = require_luma(&color, "adaptive threshold").unwrap_err();
        assert!(matches!(err, RegionError::UnsupportedFormat { found: 3, .. }));

        let gray = DynamicImage::ImageLuma8(GrayImage::new(2, 2));
        assert!(require_luma(&gray, "adaptive threshold").is_ok());
    }
}
