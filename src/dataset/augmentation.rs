//! Randomized image augmentation for the training split.
//!
//! Each draw samples an independent rotation, shift, shear, zoom, and
//! horizontal flip, applied as a single inverse-mapped affine transform.
//! Borders introduced by the transform are filled with the nearest source
//! pixel. The validation and test splits never go through this module.

use image::{imageops, RgbImage};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Augmentation parameter ranges; every draw samples uniformly within them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentationConfig {
    /// Maximum absolute rotation in degrees
    pub rotation_degrees: f32,
    /// Maximum horizontal shift as a fraction of image width
    pub width_shift: f32,
    /// Maximum vertical shift as a fraction of image height
    pub height_shift: f32,
    /// Maximum absolute shear factor
    pub shear: f32,
    /// Maximum zoom deviation; scale is drawn from [1 - zoom, 1 + zoom]
    pub zoom: f32,
    /// Whether to randomly flip horizontally
    pub horizontal_flip: bool,
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            rotation_degrees: 20.0,
            width_shift: 0.2,
            height_shift: 0.2,
            shear: 0.2,
            zoom: 0.2,
            horizontal_flip: true,
        }
    }
}

impl AugmentationConfig {
    /// Identity configuration (no augmentation)
    pub fn none() -> Self {
        Self {
            rotation_degrees: 0.0,
            width_shift: 0.0,
            height_shift: 0.0,
            shear: 0.0,
            zoom: 0.0,
            horizontal_flip: false,
        }
    }
}

/// Applies randomized augmentations to training images
#[derive(Debug, Clone)]
pub struct Augmenter {
    config: AugmentationConfig,
}

impl Augmenter {
    pub fn new(config: AugmentationConfig) -> Self {
        Self { config }
    }

    /// Augment an image with freshly sampled parameters.
    pub fn augment<R: Rng>(&self, image: &RgbImage, rng: &mut R) -> RgbImage {
        let c = &self.config;

        let image = if c.horizontal_flip && rng.gen_bool(0.5) {
            imageops::flip_horizontal(image)
        } else {
            image.clone()
        };

        let angle = sample(rng, c.rotation_degrees).to_radians();
        let shear = sample(rng, c.shear);
        let zoom_x = 1.0 + sample(rng, c.zoom);
        let zoom_y = 1.0 + sample(rng, c.zoom);

        let (width, height) = image.dimensions();
        let shift_x = sample(rng, c.width_shift) * width as f32;
        let shift_y = sample(rng, c.height_shift) * height as f32;

        if angle == 0.0 && shear == 0.0 && zoom_x == 1.0 && zoom_y == 1.0
            && shift_x == 0.0
            && shift_y == 0.0
        {
            return image;
        }

        affine(&image, angle, shear, zoom_x, zoom_y, shift_x, shift_y)
    }
}

fn sample<R: Rng>(rng: &mut R, range: f32) -> f32 {
    if range <= 0.0 {
        0.0
    } else {
        rng.gen_range(-range..=range)
    }
}

/// Apply a centered affine transform (rotation, shear, zoom) followed by a
/// translation. Output pixels are inverse-mapped to the source; coordinates
/// outside the source are clamped to the nearest edge pixel.
fn affine(
    image: &RgbImage,
    angle: f32,
    shear: f32,
    zoom_x: f32,
    zoom_y: f32,
    shift_x: f32,
    shift_y: f32,
) -> RgbImage {
    let (width, height) = image.dimensions();
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;

    // Forward matrix: rotation * shear * zoom
    let (sin, cos) = angle.sin_cos();
    let a = cos * zoom_x;
    let b = (-cos * shear - sin) * zoom_y;
    let c = sin * zoom_x;
    let d = (-sin * shear + cos) * zoom_y;

    let det = a * d - b * c;
    if det.abs() < 1e-6 {
        return image.clone();
    }
    let ia = d / det;
    let ib = -b / det;
    let ic = -c / det;
    let id = a / det;

    RgbImage::from_fn(width, height, |x, y| {
        let dx = x as f32 - cx - shift_x;
        let dy = y as f32 - cy - shift_y;

        let sx = (ia * dx + ib * dy + cx)
            .round()
            .clamp(0.0, width as f32 - 1.0);
        let sy = (ic * dx + id * dy + cy)
            .round()
            .clamp(0.0, height as f32 - 1.0);

        *image.get_pixel(sx as u32, sy as u32)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn gradient_image() -> RgbImage {
        RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 128u8]))
    }

    #[test]
    fn test_dimensions_preserved() {
        let augmenter = Augmenter::new(AugmentationConfig::default());
        let image = gradient_image();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..10 {
            let out = augmenter.augment(&image, &mut rng);
            assert_eq!(out.dimensions(), image.dimensions());
        }
    }

    #[test]
    fn test_identity_config_is_noop() {
        let augmenter = Augmenter::new(AugmentationConfig::none());
        let image = gradient_image();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let out = augmenter.augment(&image, &mut rng);
        assert_eq!(out.as_raw(), image.as_raw());
    }

    #[test]
    fn test_constant_image_stays_constant() {
        let augmenter = Augmenter::new(AugmentationConfig::default());
        let image = RgbImage::from_pixel(16, 16, Rgb([10u8, 20u8, 30u8]));
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let out = augmenter.augment(&image, &mut rng);
        assert!(out.pixels().all(|p| *p == Rgb([10u8, 20u8, 30u8])));
    }

    #[test]
    fn test_pure_shift_moves_content() {
        let config = AugmentationConfig {
            width_shift: 0.25,
            ..AugmentationConfig::none()
        };
        let augmenter = Augmenter::new(config);
        let image = gradient_image();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        // With only shift enabled, some draw must differ from the source.
        let mut changed = false;
        for _ in 0..10 {
            let out = augmenter.augment(&image, &mut rng);
            if out.as_raw() != image.as_raw() {
                changed = true;
                break;
            }
        }
        assert!(changed);
    }

    #[test]
    fn test_fill_uses_existing_pixels_only() {
        let config = AugmentationConfig {
            rotation_degrees: 20.0,
            ..AugmentationConfig::none()
        };
        let augmenter = Augmenter::new(config);
        // Two-tone image: every output pixel must be one of the two tones.
        let image = RgbImage::from_fn(16, 16, |x, _| {
            if x < 8 {
                Rgb([0u8, 0u8, 0u8])
            } else {
                Rgb([255u8, 255u8, 255u8])
            }
        });
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let out = augmenter.augment(&image, &mut rng);
        assert!(out
            .pixels()
            .all(|p| *p == Rgb([0u8, 0u8, 0u8]) || *p == Rgb([255u8, 255u8, 255u8])));
    }
}
