use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::models::Region;

/// Draw a region outline `stroke_width` pixels wide. The stroke grows inward
/// so the outline never leaves the region.
pub fn draw_region(canvas: &mut RgbImage, region: &Region, color: Rgb<u8>, stroke_width: u32) {
    for t in 0..stroke_width {
        let width = region.width.saturating_sub(2 * t);
        let height = region.height.saturating_sub(2 * t);
        if width == 0 || height == 0 {
            break;
        }
        let rect = Rect::at((region.x + t) as i32, (region.y + t) as i32).of_size(width, height);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Color copy of `image` with every region outlined.
pub fn draw_regions(
    image: &DynamicImage,
    regions: &[Region],
    color: Rgb<u8>,
    stroke_width: u32,
) -> RgbImage {
    let mut canvas = image.to_rgb8();
    for region in regions {
        draw_region(&mut canvas, region, color, stroke_width);
    }
    canvas
}
