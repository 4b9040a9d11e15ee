//! Image representation for the color pipeline.

use std::fmt;

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgba32FImage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::transform::params::ColorSpace;

/// Caller-assigned identity of a base image.
///
/// Two renders of different base images must never share a preview, even
/// with identical adjustments, so the identity is part of preview keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(pub u64);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image#{}", self.0)
    }
}

/// Why an image cannot be rendered.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImageError {
    #[error("image has zero size ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("{width}x{height} image carries {actual} pixels")]
    PixelCount {
        width: u32,
        height: u32,
        actual: usize,
    },
}

/// RGBA `f32` pixels tagged with the color space they are encoded in.
#[derive(Debug, Clone, PartialEq)]
pub struct GradingImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA.
    pub pixels: Vec<[f32; 4]>,
    pub color_space: ColorSpace,
}

impl GradingImage {
    pub fn new(width: u32, height: u32, pixels: Vec<[f32; 4]>, color_space: ColorSpace) -> Self {
        Self {
            width,
            height,
            pixels,
            color_space,
        }
    }

    /// Every pixel set to `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [f32; 4], color_space: ColorSpace) -> Self {
        Self::new(
            width,
            height,
            vec![rgba; width as usize * height as usize],
            color_space,
        )
    }

    /// Same size and tag, new pixel data.
    pub fn with_pixels(&self, pixels: Vec<[f32; 4]>) -> Self {
        Self {
            width: self.width,
            height: self.height,
            pixels,
            color_space: self.color_space,
        }
    }

    pub fn validate(&self) -> Result<(), ImageError> {
        if self.width == 0 || self.height == 0 {
            return Err(ImageError::Empty {
                width: self.width,
                height: self.height,
            });
        }
        if self.pixels.len() != self.width as usize * self.height as usize {
            return Err(ImageError::PixelCount {
                width: self.width,
                height: self.height,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }

    /// Convert a decoded image. Pixel values are taken as `Standard` (sRGB).
    pub fn from_dynamic(img: &DynamicImage) -> Self {
        let rgba = img.to_rgba32f();
        let (width, height) = rgba.dimensions();
        let pixels = rgba.pixels().map(|p| p.0).collect();
        Self::new(width, height, pixels, ColorSpace::Standard)
    }

    /// Hand back to the `image` crate, e.g. for encoding.
    pub fn to_rgba32f(&self) -> Option<Rgba32FImage> {
        let flat: Vec<f32> = bytemuck::cast_slice(&self.pixels).to_vec();
        ImageBuffer::from_raw(self.width, self.height, flat)
    }

    pub fn to_dynamic(&self) -> Option<DynamicImage> {
        self.to_rgba32f().map(DynamicImage::ImageRgba32F)
    }
}

/// Errors from decoding a foreground mask.
#[derive(Debug, thiserror::Error)]
pub enum MaskError {
    #[error("failed to decode mask PNG: {0}")]
    Decode(#[from] image::ImageError),
    #[error("mask has zero size")]
    Empty,
}

/// Per-pixel foreground weight in `[0, 1]` (1 = subject, 0 = background).
#[derive(Debug, Clone, PartialEq)]
pub struct ForegroundMask {
    pub width: u32,
    pub height: u32,
    pub weights: Vec<f32>,
    digest: String,
}

impl ForegroundMask {
    /// Decode a PNG-encoded mask.
    ///
    /// Masks with alpha use the alpha channel; others use luminance.
    pub fn from_png(bytes: &[u8]) -> Result<Self, MaskError> {
        let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)?;
        let gray: GrayImage = if decoded.color().has_alpha() {
            let rgba = decoded.to_rgba8();
            ImageBuffer::from_fn(rgba.width(), rgba.height(), |x, y| {
                Luma([rgba.get_pixel(x, y).0[3]])
            })
        } else {
            decoded.to_luma8()
        };
        if gray.width() == 0 || gray.height() == 0 {
            return Err(MaskError::Empty);
        }
        let weights = gray.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
        Ok(Self {
            width: gray.width(),
            height: gray.height(),
            weights,
            digest: hex::encode(Sha256::digest(bytes)),
        })
    }

    /// Build from raw weights (clamped into `[0, 1]`).
    pub fn from_weights(width: u32, height: u32, weights: Vec<f32>) -> Result<Self, MaskError> {
        if width == 0 || height == 0 || weights.len() != width as usize * height as usize {
            return Err(MaskError::Empty);
        }
        let weights: Vec<f32> = weights.into_iter().map(|w| w.clamp(0.0, 1.0)).collect();
        let digest = hex::encode(Sha256::digest(bytemuck::cast_slice::<f32, u8>(&weights)));
        Ok(Self {
            width,
            height,
            weights,
            digest,
        })
    }

    /// Content digest used in preview cache keys.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}
