use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};

use crate::models::{Contour, Region};

/// Find the external contours of a binary mask (non-zero pixels are
/// foreground). Hole borders and blobs nested inside holes are skipped.
/// Contours are returned in discovery (raster scan) order.
pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour> {
    // Border following needs a background frame, otherwise blobs touching
    // the left edge come back as holes.
    let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
    image::imageops::replace(&mut padded, mask, 1, 1);

    find_contours::<i32>(&padded)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .filter_map(|c| {
            let first = c.points.first()?;
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
            for p in &c.points {
                min_x = min_x.min(p.x);
                min_y = min_y.min(p.y);
                max_x = max_x.max(p.x);
                max_y = max_y.max(p.y);
            }
            Some((min_x - 1, min_y - 1, max_x - 1, max_y - 1, c.points.len()))
        })
        .enumerate()
        .map(|(index, (min_x, min_y, max_x, max_y, point_count))| Contour {
            index,
            min_x: min_x as u32,
            min_y: min_y as u32,
            max_x: max_x as u32,
            max_y: max_y as u32,
            point_count,
        })
        .collect()
}

/// Bounding rectangles of the contours that reach `min_size` in both
/// dimensions, in contour order.
pub fn bounding_regions(contours: &[Contour], min_size: u32) -> Vec<Region> {
    contours
        .iter()
        .filter_map(|c| c.bounding_region(min_size))
        .collect()
}
