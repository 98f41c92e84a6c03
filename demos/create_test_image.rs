use image::{Rgb, RgbImage};

// Writes a synthetic page: two paragraphs of "words" and a lone dot of noise.
fn main() -> anyhow::Result<()> {
    let mut img = RgbImage::from_pixel(800, 600, Rgb([255, 255, 255]));

    let mut word = |x0: u32, y0: u32, w: u32| {
        for y in y0..y0 + 12 {
            for x in x0..x0 + w {
                img.put_pixel(x, y, Rgb([20, 20, 20]));
            }
        }
    };

    // Paragraph 1: five lines of words
    for line in 0..5 {
        let y = 80 + line * 24;
        let mut x = 60;
        for w in [40, 65, 30, 80, 55] {
            word(x, y, w);
            x += w + 10;
        }
    }

    // Paragraph 2: three lines further down
    for line in 0..3 {
        let y = 380 + line * 24;
        let mut x = 420;
        for w in [50, 35, 70] {
            word(x, y, w);
            x += w + 10;
        }
    }

    // Noise: too small to become a region
    word(700, 40, 6);

    img.save("test_page.png")?;
    println!("Created test_page.png (800x600 synthetic page)");
    Ok(())
}
