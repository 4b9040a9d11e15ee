//! CPU reference implementation of the execution facility.
//!
//! Per-pixel operations run in parallel with rayon; convolution and
//! resampling go through `image::imageops`.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, Rgba, Rgba32FImage};
use rayon::prelude::*;

use crate::color_management::color_space::{convert_rgb, from_lut_domain, to_lut_domain};
use crate::color_management::white_balance::warmth_matrix;
use crate::exec::{ColorControls, ExecutionFacility, FacilityError, LumaMask};
use crate::grading::sliders::{
    self, LUMA_REC601, apply_color_controls, apply_exposure, apply_hue_rotation, apply_tint,
    apply_vibrance, smoothstep,
};
use crate::image::{ForegroundMask, GradingImage};
use crate::transform::lut::LookupTable;
use crate::transform::params::ColorSpace;

/// Normalized radius where the vignette starts to darken.
const VIGNETTE_INNER: f32 = 0.35;

/// Runs every primitive on the CPU.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuFacility;

impl CpuFacility {
    pub fn new() -> Self {
        Self
    }
}

/// Map RGB of every pixel, alpha untouched.
fn map_rgb<F>(image: &GradingImage, f: F) -> GradingImage
where
    F: Fn([f32; 3]) -> [f32; 3] + Sync,
{
    let pixels = image
        .pixels
        .par_iter()
        .map(|px| {
            let [r, g, b] = f([px[0], px[1], px[2]]);
            [r, g, b, px[3]]
        })
        .collect();
    image.with_pixels(pixels)
}

/// Affine remap of sample values into `[0, 1]`.
///
/// `imageops` clamps `f32` samples to the unit range. Blur and resize use
/// normalized weights, so remapping before and after keeps extended values.
#[derive(Debug, Clone, Copy)]
struct UnitRange {
    offset: f32,
    scale: f32,
}

impl UnitRange {
    fn of(pixels: &[[f32; 4]]) -> Self {
        let (lo, hi) = pixels
            .iter()
            .flatten()
            .fold((0.0_f32, 1.0_f32), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Self {
            offset: lo,
            scale: hi - lo,
        }
    }

    fn encode(self, v: f32) -> f32 {
        (v - self.offset) / self.scale
    }

    fn decode(self, v: f32) -> f32 {
        v * self.scale + self.offset
    }
}

fn to_buffer(
    image: &GradingImage,
    operation: &'static str,
) -> Result<(Rgba32FImage, UnitRange), FacilityError> {
    let range = UnitRange::of(&image.pixels);
    let flat: Vec<f32> = bytemuck::cast_slice::<[f32; 4], f32>(&image.pixels)
        .iter()
        .map(|&v| range.encode(v))
        .collect();
    let buffer =
        ImageBuffer::from_raw(image.width, image.height, flat).ok_or_else(|| {
            FacilityError::NoOutput {
                operation,
                reason: format!(
                    "{} pixels do not fill {}x{}",
                    image.pixels.len(),
                    image.width,
                    image.height
                ),
            }
        })?;
    Ok((buffer, range))
}

fn from_buffer(
    buffer: &ImageBuffer<Rgba<f32>, Vec<f32>>,
    range: UnitRange,
    color_space: ColorSpace,
) -> GradingImage {
    let (width, height) = buffer.dimensions();
    GradingImage::new(
        width,
        height,
        buffer.pixels().map(|p| p.0.map(|v| range.decode(v))).collect(),
        color_space,
    )
}

fn check_size(
    operation: &'static str,
    expected: (u32, u32),
    actual: (u32, u32),
) -> Result<(), FacilityError> {
    if expected != actual {
        return Err(FacilityError::SizeMismatch {
            operation,
            expected,
            actual,
        });
    }
    Ok(())
}

impl ExecutionFacility for CpuFacility {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn convert(&self, image: &GradingImage, to: ColorSpace) -> Result<GradingImage, FacilityError> {
        if image.color_space == to {
            return Ok(image.clone());
        }
        let from = image.color_space;
        let mut out = map_rgb(image, |rgb| convert_rgb(rgb, from, to));
        out.color_space = to;
        Ok(out)
    }

    fn color_controls(
        &self,
        image: &GradingImage,
        controls: ColorControls,
    ) -> Result<GradingImage, FacilityError> {
        // Mid-gray: encoded 0.5 for sRGB, scene-linear 0.18 for extended.
        let pivot = match image.color_space {
            ColorSpace::Standard => 0.5,
            ColorSpace::Extended => 0.18,
        };
        Ok(map_rgb(image, |rgb| {
            apply_color_controls(
                rgb,
                controls.saturation,
                controls.brightness,
                controls.contrast,
                pivot,
            )
        }))
    }

    fn luminance_mask(&self, image: &GradingImage) -> Result<LumaMask, FacilityError> {
        let values = image
            .pixels
            .par_iter()
            .map(|px| sliders::luma([px[0], px[1], px[2]], LUMA_REC601).clamp(0.0, 1.0))
            .collect();
        Ok(LumaMask {
            width: image.width,
            height: image.height,
            values,
        })
    }

    fn shape_mask(
        &self,
        mask: &LumaMask,
        exponent: f32,
        invert: bool,
    ) -> Result<LumaMask, FacilityError> {
        let values = mask
            .values
            .par_iter()
            .map(|&m| {
                let base = if invert { 1.0 - m } else { m };
                base.clamp(0.0, 1.0).powf(exponent)
            })
            .collect();
        Ok(LumaMask {
            width: mask.width,
            height: mask.height,
            values,
        })
    }

    fn resample_mask(
        &self,
        mask: &ForegroundMask,
        width: u32,
        height: u32,
    ) -> Result<LumaMask, FacilityError> {
        if (mask.width, mask.height) == (width, height) {
            return Ok(LumaMask {
                width,
                height,
                values: mask.weights.clone(),
            });
        }
        let buffer: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_raw(mask.width, mask.height, mask.weights.clone()).ok_or_else(
                || FacilityError::NoOutput {
                    operation: "resample_mask",
                    reason: "mask weights do not fill the mask size".to_string(),
                },
            )?;
        let resized = imageops::resize(&buffer, width, height, FilterType::Triangle);
        Ok(LumaMask {
            width,
            height,
            values: resized.pixels().map(|p| p.0[0].clamp(0.0, 1.0)).collect(),
        })
    }

    fn exposure(&self, image: &GradingImage, ev: f32) -> Result<GradingImage, FacilityError> {
        Ok(map_rgb(image, |rgb| apply_exposure(rgb, ev)))
    }

    fn blend_with_mask(
        &self,
        foreground: &GradingImage,
        background: &GradingImage,
        mask: &LumaMask,
    ) -> Result<GradingImage, FacilityError> {
        let size = (foreground.width, foreground.height);
        check_size("blend_with_mask", size, (background.width, background.height))?;
        check_size("blend_with_mask", size, (mask.width, mask.height))?;

        let pixels = foreground
            .pixels
            .par_iter()
            .zip(background.pixels.par_iter())
            .zip(mask.values.par_iter())
            .map(|((fg, bg), &m)| {
                let inv = 1.0 - m;
                [
                    fg[0] * m + bg[0] * inv,
                    fg[1] * m + bg[1] * inv,
                    fg[2] * m + bg[2] * inv,
                    fg[3] * m + bg[3] * inv,
                ]
            })
            .collect();
        Ok(foreground.with_pixels(pixels))
    }

    fn white_balance(
        &self,
        image: &GradingImage,
        warmth: f32,
    ) -> Result<GradingImage, FacilityError> {
        let matrix = warmth_matrix(warmth);
        Ok(map_rgb(image, |rgb| matrix.apply(rgb)))
    }

    fn vibrance(&self, image: &GradingImage, amount: f32) -> Result<GradingImage, FacilityError> {
        Ok(map_rgb(image, |rgb| apply_vibrance(rgb, amount)))
    }

    fn hue_rotate(
        &self,
        image: &GradingImage,
        degrees: f32,
    ) -> Result<GradingImage, FacilityError> {
        Ok(map_rgb(image, |rgb| apply_hue_rotation(rgb, degrees)))
    }

    fn unsharp_mask(
        &self,
        image: &GradingImage,
        radius: f32,
        intensity: f32,
    ) -> Result<GradingImage, FacilityError> {
        let blurred = self.gaussian_blur(image, radius)?;
        let pixels = image
            .pixels
            .par_iter()
            .zip(blurred.pixels.par_iter())
            .map(|(px, bl)| {
                [
                    px[0] + (px[0] - bl[0]) * intensity,
                    px[1] + (px[1] - bl[1]) * intensity,
                    px[2] + (px[2] - bl[2]) * intensity,
                    px[3],
                ]
            })
            .collect();
        Ok(image.with_pixels(pixels))
    }

    fn gaussian_blur(
        &self,
        image: &GradingImage,
        radius: f32,
    ) -> Result<GradingImage, FacilityError> {
        if radius <= 0.0 {
            return Ok(image.clone());
        }
        let (buffer, range) = to_buffer(image, "gaussian_blur")?;
        let blurred = imageops::blur(&buffer, radius);
        Ok(from_buffer(&blurred, range, image.color_space))
    }

    fn tint(
        &self,
        image: &GradingImage,
        color: [f32; 3],
        intensity: f32,
    ) -> Result<GradingImage, FacilityError> {
        Ok(map_rgb(image, |rgb| apply_tint(rgb, color, intensity)))
    }

    fn vignette(
        &self,
        image: &GradingImage,
        intensity: f32,
    ) -> Result<GradingImage, FacilityError> {
        let (w, h) = (image.width as f32, image.height as f32);
        let (cx, cy) = (w * 0.5, h * 0.5);
        let half_diagonal = (cx * cx + cy * cy).sqrt().max(f32::EPSILON);
        let width = image.width as usize;

        let pixels = image
            .pixels
            .par_iter()
            .enumerate()
            .map(|(i, px)| {
                let x = (i % width) as f32 + 0.5 - cx;
                let y = (i / width) as f32 + 0.5 - cy;
                let d = (x * x + y * y).sqrt() / half_diagonal;
                let gain = 1.0 - intensity * smoothstep(VIGNETTE_INNER, 1.0, d);
                [px[0] * gain, px[1] * gain, px[2] * gain, px[3]]
            })
            .collect();
        Ok(image.with_pixels(pixels))
    }

    fn apply_lut(
        &self,
        image: &GradingImage,
        lut: &LookupTable,
        space: ColorSpace,
    ) -> Result<GradingImage, FacilityError> {
        if image.color_space != space {
            return Err(FacilityError::ColorSpaceMismatch {
                operation: "apply_lut",
                expected: space,
                actual: image.color_space,
            });
        }
        Ok(map_rgb(image, |rgb| {
            let encoded = to_lut_domain(rgb, space);
            let graded = match space {
                ColorSpace::Standard => lut.sample(encoded),
                ColorSpace::Extended => lut.sample_unbounded(encoded),
            };
            from_lut_domain(graded, space)
        }))
    }

    fn downscale(
        &self,
        image: &GradingImage,
        max_dimension: u32,
    ) -> Result<GradingImage, FacilityError> {
        let longest = image.width.max(image.height);
        if max_dimension == 0 || longest <= max_dimension {
            return Ok(image.clone());
        }
        let scale = max_dimension as f64 / longest as f64;
        let width = ((image.width as f64 * scale).round() as u32).clamp(1, max_dimension);
        let height = ((image.height as f64 * scale).round() as u32).clamp(1, max_dimension);

        let (buffer, range) = to_buffer(image, "downscale")?;
        let resized = imageops::resize(&buffer, width, height, FilterType::Triangle);
        Ok(from_buffer(&resized, range, image.color_space))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn gradient(width: u32, height: u32) -> GradingImage {
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let r = x as f32 / (width - 1).max(1) as f32;
                let g = y as f32 / (height - 1).max(1) as f32;
                pixels.push([r, g, 0.5, 1.0]);
            }
        }
        GradingImage::new(width, height, pixels, ColorSpace::Standard)
    }

    #[test]
    fn test_convert_roundtrip() {
        let img = gradient(4, 4);
        let ext = CpuFacility.convert(&img, ColorSpace::Extended).unwrap();
        assert_eq!(ext.color_space, ColorSpace::Extended);
        let back = CpuFacility.convert(&ext, ColorSpace::Standard).unwrap();
        for (a, b) in back.pixels.iter().zip(&img.pixels) {
            for c in 0..4 {
                assert!((a[c] - b[c]).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_shape_mask_exponent_and_invert() {
        let mask = LumaMask {
            width: 2,
            height: 1,
            values: vec![0.25, 0.5],
        };
        let shaped = CpuFacility.shape_mask(&mask, 2.0, false).unwrap();
        assert!((shaped.values[0] - 0.0625).abs() < EPSILON);
        let inverted = CpuFacility.shape_mask(&mask, 2.0, true).unwrap();
        assert!((inverted.values[0] - 0.5625).abs() < EPSILON);
    }

    #[test]
    fn test_blend_respects_mask_weights() {
        let fg = GradingImage::filled(2, 1, [1.0, 1.0, 1.0, 1.0], ColorSpace::Standard);
        let bg = GradingImage::filled(2, 1, [0.0, 0.0, 0.0, 1.0], ColorSpace::Standard);
        let mask = LumaMask {
            width: 2,
            height: 1,
            values: vec![1.0, 0.25],
        };
        let out = CpuFacility.blend_with_mask(&fg, &bg, &mask).unwrap();
        assert_eq!(out.pixels[0][0], 1.0);
        assert!((out.pixels[1][0] - 0.25).abs() < EPSILON);
    }

    #[test]
    fn test_blend_rejects_size_mismatch() {
        let fg = GradingImage::filled(2, 2, [1.0; 4], ColorSpace::Standard);
        let bg = GradingImage::filled(2, 1, [0.0; 4], ColorSpace::Standard);
        let mask = LumaMask {
            width: 2,
            height: 2,
            values: vec![1.0; 4],
        };
        assert!(matches!(
            CpuFacility.blend_with_mask(&fg, &bg, &mask),
            Err(FacilityError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_blur_flattens_a_step_edge() {
        let mut img = GradingImage::filled(16, 1, [0.0, 0.0, 0.0, 1.0], ColorSpace::Standard);
        for px in &mut img.pixels[8..] {
            *px = [1.0, 1.0, 1.0, 1.0];
        }
        let out = CpuFacility.gaussian_blur(&img, 2.0).unwrap();
        assert_eq!((out.width, out.height), (16, 1));
        assert!(out.pixels[7][0] > 0.05 && out.pixels[8][0] < 0.95);
    }

    #[test]
    fn test_blur_keeps_extended_range_values() {
        let img = GradingImage::filled(6, 6, [2.5, -0.25, 1.0, 1.0], ColorSpace::Extended);
        let out = CpuFacility.gaussian_blur(&img, 1.0).unwrap();
        for px in &out.pixels {
            assert!((px[0] - 2.5).abs() < 1e-3, "{px:?}");
            assert!((px[1] + 0.25).abs() < 1e-3, "{px:?}");
        }
    }

    #[test]
    fn test_unsharp_mask_leaves_flat_image_alone() {
        let img = GradingImage::filled(8, 8, [0.4, 0.5, 0.6, 1.0], ColorSpace::Standard);
        let out = CpuFacility.unsharp_mask(&img, 1.5, 1.0).unwrap();
        for px in &out.pixels {
            assert!((px[0] - 0.4).abs() < 1e-3);
        }
    }

    #[test]
    fn test_vignette_darkens_corners_not_center() {
        let img = GradingImage::filled(9, 9, [0.8, 0.8, 0.8, 1.0], ColorSpace::Standard);
        let out = CpuFacility.vignette(&img, 1.0).unwrap();
        assert!((out.pixels[4 * 9 + 4][0] - 0.8).abs() < EPSILON);
        assert!(out.pixels[0][0] < 0.8);
    }

    #[test]
    fn test_apply_identity_lut_is_passthrough() {
        let img = gradient(5, 5);
        let lut = LookupTable::identity(17).unwrap();
        let out = CpuFacility.apply_lut(&img, &lut, ColorSpace::Standard).unwrap();
        for (a, b) in out.pixels.iter().zip(&img.pixels) {
            for c in 0..3 {
                assert!((a[c] - b[c]).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_apply_lut_rejects_wrong_space() {
        let img = gradient(2, 2);
        let lut = LookupTable::identity(2).unwrap();
        assert!(matches!(
            CpuFacility.apply_lut(&img, &lut, ColorSpace::Extended),
            Err(FacilityError::ColorSpaceMismatch { .. })
        ));
    }

    #[test]
    fn test_downscale_keeps_aspect() {
        let img = gradient(40, 20);
        let out = CpuFacility.downscale(&img, 10).unwrap();
        assert_eq!((out.width, out.height), (10, 5));

        let untouched = CpuFacility.downscale(&img, 100).unwrap();
        assert_eq!((untouched.width, untouched.height), (40, 20));
    }

    #[test]
    fn test_resample_mask_to_image_size() {
        let mask = ForegroundMask::from_weights(2, 2, vec![1.0, 1.0, 1.0, 1.0]).unwrap();
        let resampled = CpuFacility.resample_mask(&mask, 6, 4).unwrap();
        assert_eq!((resampled.width, resampled.height), (6, 4));
        assert_eq!(resampled.values.len(), 24);
        assert!(resampled.values.iter().all(|&v| (v - 1.0).abs() < 1e-4));
    }
}
