//! Execution facility: the primitive image operations the engine requests.
//!
//! The engine decides *what* to run; an [`ExecutionFacility`] decides *how*
//! pixels are processed (CPU, GPU filter graph, platform framework). Every
//! primitive may fail; the pipeline absorbs failures stage by stage.

pub mod cpu;

use crate::image::{ForegroundMask, GradingImage};
use crate::transform::lut::LookupTable;
use crate::transform::params::ColorSpace;

pub use cpu::CpuFacility;

/// A single-channel weight image in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LumaMask {
    pub width: u32,
    pub height: u32,
    pub values: Vec<f32>,
}

/// Saturation, brightness and contrast applied as one operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorControls {
    pub saturation: f32,
    pub brightness: f32,
    pub contrast: f32,
}

/// Failure of a single primitive operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FacilityError {
    #[error("{operation} is not supported by the {facility} facility")]
    Unsupported {
        operation: &'static str,
        facility: &'static str,
    },
    #[error("{operation}: expected {expected:?}, got {actual:?}")]
    SizeMismatch {
        operation: &'static str,
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("{operation}: image is in {actual:?}, expected {expected:?}")]
    ColorSpaceMismatch {
        operation: &'static str,
        expected: ColorSpace,
        actual: ColorSpace,
    },
    #[error("{operation} produced no output: {reason}")]
    NoOutput {
        operation: &'static str,
        reason: String,
    },
}

/// Primitive color operations a filter-graph backend must provide.
///
/// Implementations must be shareable across worker threads.
pub trait ExecutionFacility: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Re-encode into another working space.
    fn convert(&self, image: &GradingImage, to: ColorSpace) -> Result<GradingImage, FacilityError>;

    fn color_controls(
        &self,
        image: &GradingImage,
        controls: ColorControls,
    ) -> Result<GradingImage, FacilityError>;

    /// Rec. 601 luma of every pixel.
    fn luminance_mask(&self, image: &GradingImage) -> Result<LumaMask, FacilityError>;

    /// `m' = (invert ? 1 − m : m) ^ exponent`.
    fn shape_mask(
        &self,
        mask: &LumaMask,
        exponent: f32,
        invert: bool,
    ) -> Result<LumaMask, FacilityError>;

    /// Resample a foreground mask to `width × height`.
    fn resample_mask(
        &self,
        mask: &ForegroundMask,
        width: u32,
        height: u32,
    ) -> Result<LumaMask, FacilityError>;

    /// Multiply RGB by `2^ev`.
    fn exposure(&self, image: &GradingImage, ev: f32) -> Result<GradingImage, FacilityError>;

    /// `out = mask·foreground + (1 − mask)·background`.
    fn blend_with_mask(
        &self,
        foreground: &GradingImage,
        background: &GradingImage,
        mask: &LumaMask,
    ) -> Result<GradingImage, FacilityError>;

    fn white_balance(&self, image: &GradingImage, warmth: f32)
    -> Result<GradingImage, FacilityError>;

    fn vibrance(&self, image: &GradingImage, amount: f32) -> Result<GradingImage, FacilityError>;

    fn hue_rotate(&self, image: &GradingImage, degrees: f32)
    -> Result<GradingImage, FacilityError>;

    fn unsharp_mask(
        &self,
        image: &GradingImage,
        radius: f32,
        intensity: f32,
    ) -> Result<GradingImage, FacilityError>;

    fn gaussian_blur(&self, image: &GradingImage, radius: f32)
    -> Result<GradingImage, FacilityError>;

    fn tint(
        &self,
        image: &GradingImage,
        color: [f32; 3],
        intensity: f32,
    ) -> Result<GradingImage, FacilityError>;

    fn vignette(&self, image: &GradingImage, intensity: f32)
    -> Result<GradingImage, FacilityError>;

    /// Remap through `lut` with trilinear interpolation, interpreting
    /// values in `space`'s LUT encoding. In the extended space, encoded
    /// components outside the cube keep their excess past the edge.
    fn apply_lut(
        &self,
        image: &GradingImage,
        lut: &LookupTable,
        space: ColorSpace,
    ) -> Result<GradingImage, FacilityError>;

    /// Shrink so the longer side is at most `max_dimension`, keeping aspect.
    fn downscale(
        &self,
        image: &GradingImage,
        max_dimension: u32,
    ) -> Result<GradingImage, FacilityError>;
}
