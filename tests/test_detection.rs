mod common;

use common::*;
use regionlab::config::DetectorParams;
use regionlab::detection::{contours, load_image, transforms};
use regionlab::{MARKED_IMAGE_NAME, mark_regions};
use std::collections::HashSet;

fn detector_with_min_size(min_region_size: u32) -> ContourRegionDetector {
    let mut params = DetectorParams::default();
    params.filter.min_region_size = min_region_size;
    ContourRegionDetector::new(params).expect("valid parameters")
}

/// Three separated blocks: 60x60, 150x30 and 20x20.
fn three_blocks() -> image::DynamicImage {
    image_with_rects(
        400,
        300,
        &[(20, 20, 60, 60), (200, 40, 150, 30), (50, 200, 20, 20)],
    )
}

#[test]
fn test_blank_page_has_no_regions() -> anyhow::Result<()> {
    let img = blank_image(800, 600);
    let result = ContourRegionDetector::default().detect(&img)?;

    assert!(result.regions().is_empty());
    assert_eq!(result.annotated(), &img.to_rgb8());
    Ok(())
}

#[test]
fn test_single_block_yields_one_region() -> anyhow::Result<()> {
    let img = image_with_rects(800, 600, &[(200, 150, 100, 50)]);
    let result = ContourRegionDetector::default().detect(&img)?;

    assert_eq!(result.regions().len(), 1);
    let region = result.regions()[0];
    assert_eq!(
        (region.x, region.y, region.width, region.height),
        (200, 150, 100, 50)
    );

    // The outline is magenta and drawn inside the box.
    let magenta = image::Rgb([255, 0, 255]);
    let annotated = result.annotated();
    assert_eq!(*annotated.get_pixel(200, 150), magenta);
    assert_eq!(*annotated.get_pixel(201, 151), magenta);
    assert_eq!(*annotated.get_pixel(299, 199), magenta);
    assert_eq!(*annotated.get_pixel(199, 150), WHITE);
    assert_eq!(*annotated.get_pixel(250, 175), BLACK);
    Ok(())
}

#[test]
fn test_block_near_top_left_corner() -> anyhow::Result<()> {
    let img = image_with_rects(800, 600, &[(10, 10, 100, 50)]);
    let result = ContourRegionDetector::default().detect(&img)?;

    assert_eq!(result.regions().len(), 1);
    let region = result.regions()[0];
    // Closing grows the blob up to the image border, where erosion stops.
    assert_eq!(
        (region.x, region.y, region.width, region.height),
        (0, 0, 110, 60)
    );
    assert!(region.fits_within(img.width(), img.height()));
    Ok(())
}

#[test]
fn test_blocks_touching_each_edge() -> anyhow::Result<()> {
    let cases = [
        ("left", (0, 120, 60, 60)),
        ("top", (170, 0, 60, 60)),
        ("right", (340, 120, 60, 60)),
        ("bottom", (170, 240, 60, 60)),
    ];

    for (edge, rect) in cases {
        let img = image_with_rects(400, 300, &[rect]);
        let result = ContourRegionDetector::default().detect(&img)?;

        assert_eq!(result.regions().len(), 1, "{edge} edge");
        let region = result.regions()[0];
        assert_eq!(
            (region.x, region.y, region.width, region.height),
            rect,
            "{edge} edge"
        );
    }
    Ok(())
}

#[test]
fn test_regions_are_in_bounds_and_large_enough() -> anyhow::Result<()> {
    let img = three_blocks();
    let detector = ContourRegionDetector::default();
    let result = detector.detect(&img)?;

    assert!(!result.regions().is_empty());
    for region in result.regions() {
        assert!(region.fits_within(img.width(), img.height()));
        assert!(region.width >= detector.params().filter.min_region_size);
        assert!(region.height >= detector.params().filter.min_region_size);
    }
    Ok(())
}

#[test]
fn test_detection_is_deterministic() -> anyhow::Result<()> {
    let img = three_blocks();
    let detector = ContourRegionDetector::default();

    let first = detector.detect(&img)?;
    let second = detector.detect(&img)?;

    assert_eq!(first.regions(), second.regions());
    assert_eq!(first.annotated(), second.annotated());
    Ok(())
}

#[test]
fn test_one_region_per_external_contour_at_most() -> anyhow::Result<()> {
    let img = three_blocks();
    let detector = detector_with_min_size(1);

    let mask = detector.closed_mask(&img)?;
    let external = contours::find_external_contours(&mask);
    let result = detector.detect(&img)?;

    assert_eq!(external.len(), 3);
    assert!(result.regions().len() <= external.len());

    let indices: HashSet<usize> = result.regions().iter().map(|r| r.contour_index).collect();
    assert_eq!(indices.len(), result.regions().len());
    Ok(())
}

#[test]
fn test_raising_min_size_never_adds_regions() -> anyhow::Result<()> {
    let img = three_blocks();

    let counts: Vec<usize> = [10, 40, 80]
        .into_iter()
        .map(|size| detector_with_min_size(size).detect(&img).map(|r| r.regions().len()))
        .collect::<Result<_, _>>()?;

    assert_eq!(counts, vec![3, 1, 0]);
    Ok(())
}

#[test]
fn test_detect_and_save_writes_marked_image() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let out = dir.path().join("nested").join("out");
    let img = image_with_rects(400, 300, &[(100, 100, 80, 60)]);

    let (result, path) = ContourRegionDetector::default().detect_and_save(&img, &out)?;

    assert_eq!(path, out.join(MARKED_IMAGE_NAME));
    let saved = load_image(&path)?.to_rgb8();
    assert_eq!(&saved, result.annotated());
    Ok(())
}

#[test]
fn test_batch_skips_unreadable_images() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let good = save_temp_png(&image_with_rects(400, 300, &[(100, 100, 80, 60)]));
    let missing = dir.path().join("does-not-exist.png");

    let paths = vec![missing, good.path().to_path_buf()];
    let items = mark_regions(&ContourRegionDetector::default(), &paths, dir.path())?;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].source, good.path());
    assert_eq!(items[0].regions.len(), 1);
    assert!(dir.path().join(MARKED_IMAGE_NAME).exists());
    Ok(())
}

#[test]
fn test_missing_image_is_a_load_failure() {
    let err = load_image(std::path::Path::new("/definitely/not/here.png")).unwrap_err();
    assert!(matches!(err, RegionError::LoadFailure { .. }));
}

#[test]
fn test_hsv_requires_three_channels() {
    let gray = image::DynamicImage::ImageLuma8(blank_image(10, 10).to_luma8());
    let err = transforms::to_hsv(&gray).unwrap_err();
    assert!(matches!(
        err,
        RegionError::UnsupportedFormat { found: 1, .. }
    ));
}

#[test]
fn test_debug_mode_dumps_every_step() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let img = image_with_rects(400, 300, &[(100, 100, 80, 60)]);

    let detector = ContourRegionDetector::default().with_debug(dir.path().to_path_buf())?;
    detector.detect(&img)?;

    let mut entries: Vec<String> = std::fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();

    assert_eq!(entries.first().map(String::as_str), Some("00_input"));
    assert_eq!(entries.len(), detector.pipeline().len() + 1);
    Ok(())
}

#[test]
fn test_debug_dir_must_be_empty() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    std::fs::write(dir.path().join("leftover.txt"), "x")?;

    let err = ContourRegionDetector::default()
        .with_debug(dir.path().to_path_buf())
        .err()
        .expect("non-empty debug directory must be rejected");
    assert!(matches!(err, RegionError::DebugDirNotEmpty(_)));
    Ok(())
}
