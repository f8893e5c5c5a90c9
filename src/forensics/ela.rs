//! Error-level analysis: re-encode the image as JPEG and measure where the
//! recompression residue concentrates. Uniform residue is what a single-pass
//! camera file looks like; localized hotspots hint at pasted or regenerated
//! regions.

use std::io::Cursor;

use anyhow::Context;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::GenericImageView;

use super::ForensicScan;

/// Requality level for the recompression pass.
const ELA_QUALITY: u8 = 90;
/// Images are thumbnailed down to this edge before analysis.
const MAX_EDGE: u32 = 1024;
/// Residue grid granularity in pixels.
const BLOCK: u32 = 16;
/// A block is a hotspot when its mean residue exceeds this multiple of the
/// global mean.
const HOTSPOT_FACTOR: f32 = 4.0;

pub struct ElaScan;

#[async_trait]
impl ForensicScan for ElaScan {
    fn name(&self) -> &'static str {
        "ela"
    }

    async fn scan(&self, image: &[u8]) -> anyhow::Result<Vec<String>> {
        let decoded = image::load_from_memory(image).context("image decode failed")?;
        let decoded = if decoded.width().max(decoded.height()) > MAX_EDGE {
            decoded.thumbnail(MAX_EDGE, MAX_EDGE)
        } else {
            decoded
        };
        let original = decoded.to_rgb8();

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut Cursor::new(&mut jpeg), ELA_QUALITY)
            .encode_image(&original)
            .context("jpeg re-encode failed")?;
        let recompressed = image::load_from_memory(&jpeg)
            .context("jpeg re-decode failed")?
            .to_rgb8();

        let (w, h) = (original.width(), original.height());
        let mut sum: u64 = 0;
        let mut peak: u8 = 0;
        let blocks_x = w.div_ceil(BLOCK);
        let blocks_y = h.div_ceil(BLOCK);
        let mut block_sums = vec![0u64; (blocks_x * blocks_y) as usize];

        for (x, y, a) in original.enumerate_pixels() {
            let b = recompressed.get_pixel(x, y);
            let d = a.0[0].abs_diff(b.0[0]) as u64
                + a.0[1].abs_diff(b.0[1]) as u64
                + a.0[2].abs_diff(b.0[2]) as u64;
            sum += d;
            peak = peak.max((d / 3) as u8);
            block_sums[((y / BLOCK) * blocks_x + (x / BLOCK)) as usize] += d;
        }

        let total_channels = (w as u64 * h as u64 * 3).max(1);
        let mean = sum as f32 / total_channels as f32;

        let block_channels = (BLOCK as u64 * BLOCK as u64 * 3) as f32;
        let hotspots = block_sums
            .iter()
            .filter(|&&s| s as f32 / block_channels > mean * HOTSPOT_FACTOR && mean > 0.0)
            .count();

        let mut lines = vec![format!(
            "Error-level residue: mean {:.2}, peak {}.",
            mean, peak
        )];
        if hotspots == 0 {
            lines.push("Residue is uniform across the frame.".to_string());
        } else {
            lines.push(format!(
                "{} of {} blocks show elevated residue; possible localized edits.",
                hotspots,
                block_sums.len()
            ));
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn png_bytes(img: RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn flat_image_has_uniform_residue() {
        let img = RgbImage::from_pixel(64, 64, Rgb([128, 128, 128]));
        let lines = ElaScan.scan(&png_bytes(img)).await.unwrap();
        assert!(lines[0].starts_with("Error-level residue"));
        assert!(lines.iter().any(|l| l.contains("uniform")));
    }

    #[tokio::test]
    async fn textured_image_still_produces_two_lines() {
        let img = RgbImage::from_fn(64, 64, |x, y| {
            Rgb([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8])
        });
        let lines = ElaScan.scan(&png_bytes(img)).await.unwrap();
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test]
    async fn corrupt_input_errors_and_is_absorbed_by_the_suite() {
        let err = ElaScan.scan(b"definitely not an image").await.unwrap_err();
        assert!(err.to_string().contains("decode failed"));
    }
}
