use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::error::{Error, Result};
use crate::math::matrix::Matrix;
use crate::network::cnn::DigitCnn;
use crate::network::metadata::InputNorm;

/// Inverted intensities at or below this value are treated as background.
/// Suppresses compression artifacts and antialiasing noise around the
/// stroke; survivors pass through unrescaled.
const INK_THRESHOLD: u8 = 50;
/// Margin kept around the ink bounding box before resizing, in pixels of
/// the source image.
const CROP_PADDING: u32 = 4;

/// Turns an encoded canvas image into a model-ready intensity grid.
///
/// The pipeline is: decode → grayscale → invert (canvas draws dark-on-
/// bright, the training corpus is bright-on-dark) → threshold → crop to
/// the padded ink bounding box → Lanczos resize to the model resolution →
/// scale to the unit interval → shift by the training-corpus mean/std.
///
/// Deterministic and pure: the same payload always yields the same grid,
/// so failures are never retried.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    pub width: u32,
    pub height: u32,
    pub threshold: u8,
    pub padding: u32,
    pub norm: InputNorm,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        ImageNormalizer {
            width: 28,
            height: 28,
            threshold: INK_THRESHOLD,
            padding: CROP_PADDING,
            norm: InputNorm::default(),
        }
    }
}

impl ImageNormalizer {
    /// Normalizer matching a loaded model: target resolution and
    /// normalization statistics come from the model metadata, so the
    /// constants the weights were trained with travel with the weights.
    pub fn for_model(cnn: &DigitCnn) -> ImageNormalizer {
        ImageNormalizer {
            width: cnn.metadata.input_width,
            height: cnn.metadata.input_height,
            norm: cnn.metadata.norm,
            ..ImageNormalizer::default()
        }
    }

    /// Normalizes a base64 payload, optionally carrying a
    /// `data:<mime>;base64,` prefix. Anything after the first comma (or
    /// the whole string when there is none) is taken as the payload.
    pub fn normalize_data_url(&self, payload: &str) -> Result<Matrix> {
        let b64 = match payload.split_once(',') {
            Some((_header, rest)) => rest,
            None => payload,
        };
        let bytes = STANDARD.decode(b64.trim()).map_err(|e| {
            Error::invalid_image(format!("base64 decode failed: {e}"))
        })?;
        log::debug!("decoded base64 payload: {} bytes", bytes.len());
        self.normalize_bytes(&bytes)
    }

    /// Normalizes raw encoded image bytes (PNG/JPEG/BMP/GIF).
    pub fn normalize_bytes(&self, bytes: &[u8]) -> Result<Matrix> {
        let img = image::load_from_memory(bytes).map_err(|e| {
            Error::invalid_image(format!("image decode failed: {e}"))
        })?;
        let mut gray = img.to_luma8();
        log::debug!("decoded image: {}x{}", gray.width(), gray.height());

        invert_and_threshold(&mut gray, self.threshold);

        let cropped = match ink_bounds(&gray) {
            Some((min_x, min_y, max_x, max_y)) => {
                let x0 = min_x.saturating_sub(self.padding);
                let y0 = min_y.saturating_sub(self.padding);
                let x1 = (max_x + 1 + self.padding).min(gray.width());
                let y1 = (max_y + 1 + self.padding).min(gray.height());
                log::debug!("ink box ({min_x},{min_y})-({max_x},{max_y}), crop ({x0},{y0})-({x1},{y1})");
                imageops::crop_imm(&gray, x0, y0, x1 - x0, y1 - y0).to_image()
            }
            // Entirely blank after thresholding: deliberate fallback, the
            // full frame goes through as-is rather than erroring.
            None => {
                log::debug!("no ink found after thresholding; using full frame");
                gray
            }
        };

        let resized = imageops::resize(&cropped, self.width, self.height, FilterType::Lanczos3);

        let data = (0..self.height)
            .map(|y| {
                (0..self.width)
                    .map(|x| {
                        let unit = resized.get_pixel(x, y).0[0] as f64 / 255.0;
                        (unit - self.norm.mean) / self.norm.std
                    })
                    .collect()
            })
            .collect();
        Ok(Matrix::from_data(data))
    }
}

/// Flips dark-stroke-on-bright-background to the training corpus
/// convention and zeroes everything at or below `threshold`.
fn invert_and_threshold(gray: &mut GrayImage, threshold: u8) {
    for pixel in gray.pixels_mut() {
        let inverted = 255 - pixel.0[0];
        pixel.0[0] = if inverted <= threshold { 0 } else { inverted };
    }
}

/// Tight bounding box of all nonzero pixels as inclusive
/// `(min_x, min_y, max_x, max_y)`, or `None` when the image is blank.
fn ink_bounds(gray: &GrayImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in gray.enumerate_pixels() {
        if pixel.0[0] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((min_x, min_y, max_x, max_y)) => {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            }
        });
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use std::io::Cursor;

    fn encode_png(img: &GrayImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageOutputFormat::Png)
            .expect("png encode");
        buf.into_inner()
    }

    /// White canvas with a filled dark rectangle, canvas-style.
    fn canvas_with_stroke(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> GrayImage {
        let mut img = GrayImage::from_pixel(w, h, Luma([255]));
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        img
    }

    #[test]
    fn inversion_flips_extremes() {
        let mut img = GrayImage::from_pixel(2, 1, Luma([255]));
        img.put_pixel(1, 0, Luma([0]));
        invert_and_threshold(&mut img, 50);
        // White background inverts to 0, a pure-black stroke to 255.
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
        assert_eq!(img.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn threshold_zeroes_at_or_below_cutoff() {
        // 205 inverts to exactly 50 (zeroed); 204 inverts to 51 (kept).
        let mut img = GrayImage::from_pixel(2, 1, Luma([205]));
        img.put_pixel(1, 0, Luma([204]));
        invert_and_threshold(&mut img, 50);
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
        assert_eq!(img.get_pixel(1, 0).0[0], 51);
    }

    #[test]
    fn ink_bounds_finds_tight_box() {
        let mut img = GrayImage::from_pixel(100, 80, Luma([0]));
        for y in 20..30 {
            for x in 55..60 {
                img.put_pixel(x, y, Luma([200]));
            }
        }
        assert_eq!(ink_bounds(&img), Some((55, 20, 59, 29)));
    }

    #[test]
    fn ink_bounds_empty_for_blank_image() {
        let img = GrayImage::from_pixel(10, 10, Luma([0]));
        assert_eq!(ink_bounds(&img), None);
    }

    #[test]
    fn output_is_target_resolution_and_finite() {
        let png = encode_png(&canvas_with_stroke(280, 280, 100, 60, 160, 220));
        let grid = ImageNormalizer::default().normalize_bytes(&png).unwrap();
        assert_eq!((grid.rows, grid.cols), (28, 28));
        assert!(grid.is_finite());
    }

    #[test]
    fn blank_canvas_falls_back_to_full_frame() {
        let png = encode_png(&GrayImage::from_pixel(280, 280, Luma([255])));
        let grid = ImageNormalizer::default().normalize_bytes(&png).unwrap();
        assert_eq!((grid.rows, grid.cols), (28, 28));
        let background = (0.0 - 0.1307) / 0.3081;
        for v in grid.data.iter().flatten() {
            assert!((v - background).abs() < 1e-12, "expected {background}, got {v}");
        }
    }

    #[test]
    fn already_clean_28x28_is_nearly_unchanged() {
        // Ink in all four corners pins the bounding box to the full frame,
        // so cropping and resizing are both no-ops up to resample rounding.
        let mut img = GrayImage::from_pixel(28, 28, Luma([255]));
        for &(x, y) in &[(0, 0), (27, 0), (0, 27), (27, 27)] {
            img.put_pixel(x, y, Luma([0]));
        }
        for y in 10..18 {
            for x in 12..16 {
                img.put_pixel(x, y, Luma([30]));
            }
        }
        let normalizer = ImageNormalizer::default();
        let grid = normalizer.normalize_bytes(&encode_png(&img)).unwrap();

        for (y, row) in grid.data.iter().enumerate() {
            for (x, &actual) in row.iter().enumerate() {
                let source = img.get_pixel(x as u32, y as u32).0[0];
                let inverted = 255 - source;
                let thresholded = if inverted <= 50 { 0 } else { inverted };
                let expected = (thresholded as f64 / 255.0 - 0.1307) / 0.3081;
                assert!(
                    (actual - expected).abs() < 0.05,
                    "pixel ({x},{y}): expected {expected}, got {actual}"
                );
            }
        }
    }

    #[test]
    fn data_url_prefix_is_stripped() {
        let png = encode_png(&canvas_with_stroke(64, 64, 20, 20, 40, 40));
        let url = format!("data:image/png;base64,{}", STANDARD.encode(&png));
        let grid = ImageNormalizer::default().normalize_data_url(&url).unwrap();
        assert_eq!((grid.rows, grid.cols), (28, 28));
    }

    #[test]
    fn bare_base64_without_prefix_is_accepted() {
        let png = encode_png(&canvas_with_stroke(64, 64, 20, 20, 40, 40));
        let grid = ImageNormalizer::default()
            .normalize_data_url(&STANDARD.encode(&png))
            .unwrap();
        assert_eq!((grid.rows, grid.cols), (28, 28));
    }

    #[test]
    fn invalid_base64_is_invalid_image_data() {
        let err = ImageNormalizer::default()
            .normalize_data_url("not base64 at all")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidImageData { .. }), "got {err:?}");
    }

    #[test]
    fn non_image_bytes_are_invalid_image_data() {
        let payload = STANDARD.encode(b"these bytes are not an image");
        let err = ImageNormalizer::default()
            .normalize_data_url(&payload)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidImageData { .. }), "got {err:?}");
    }

    #[test]
    fn cropping_recenters_an_off_center_stroke() {
        // Same stroke drawn in opposite corners normalizes to similar
        // grids because both are cropped to their ink box first.
        let normalizer = ImageNormalizer::default();
        let top_left = encode_png(&canvas_with_stroke(280, 280, 10, 10, 70, 110));
        let bottom_right = encode_png(&canvas_with_stroke(280, 280, 210, 170, 270, 270));
        let a = normalizer.normalize_bytes(&top_left).unwrap();
        let b = normalizer.normalize_bytes(&bottom_right).unwrap();
        let max_diff = a
            .data
            .iter()
            .flatten()
            .zip(b.data.iter().flatten())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0f64, f64::max);
        assert!(max_diff < 1e-9, "max diff {max_diff}");
    }
}
