//! Working-space conversions and the encoding a LUT is evaluated in.
//!
//! `Standard` pixels are sRGB-encoded Rec. 709 values. `Extended` pixels are
//! linear Display P3 values that may leave `[0, 1]`. Tone-curve LUTs are
//! always evaluated on perceptually encoded values: `Standard` as-is,
//! `Extended` after the sign-mirrored sRGB curve (Display P3 encoding).

use glam::Mat3;

use crate::color_management::transfer::{ExtendedSrgbTransfer, TransferFunction};
pub use crate::transform::params::ColorSpace;

/// Linear Rec. 709 → linear Display P3, row-major.
const SRGB_TO_P3: [[f32; 3]; 3] = [
    [0.822_462_1, 0.177_538, 0.0],
    [0.033_194_1, 0.966_805_8, 0.0],
    [0.017_082_7, 0.072_397_4, 0.910_519_9],
];

/// Linear Display P3 → linear Rec. 709, row-major.
const P3_TO_SRGB: [[f32; 3]; 3] = [
    [1.224_940_1, -0.224_940_4, 0.0],
    [-0.042_056_9, 1.042_057_1, 0.0],
    [-0.019_637_6, -0.078_636_1, 1.098_273_5],
];

/// A 3x3 color matrix for linear color space conversions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix(pub Mat3);

impl ColorMatrix {
    pub fn identity() -> Self {
        Self(Mat3::IDENTITY)
    }

    /// Build from row-major coefficients.
    pub fn from_rows(rows: [[f32; 3]; 3]) -> Self {
        // glam is column-major: load rows as columns, then transpose.
        Self(Mat3::from_cols_array_2d(&rows).transpose())
    }

    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        (self.0 * glam::Vec3::from_array(rgb)).to_array()
    }
}

/// Convert one pixel's RGB from `from` into `to`.
pub fn convert_rgb(rgb: [f32; 3], from: ColorSpace, to: ColorSpace) -> [f32; 3] {
    match (from, to) {
        (ColorSpace::Standard, ColorSpace::Extended) => {
            let linear = rgb.map(|v| ExtendedSrgbTransfer.to_linear(v));
            ColorMatrix::from_rows(SRGB_TO_P3).apply(linear)
        }
        (ColorSpace::Extended, ColorSpace::Standard) => {
            let linear = ColorMatrix::from_rows(P3_TO_SRGB).apply(rgb);
            linear.map(|v| ExtendedSrgbTransfer.to_encoded(v))
        }
        _ => rgb,
    }
}

/// Working-space value → the encoding the LUT grid is indexed by.
pub fn to_lut_domain(rgb: [f32; 3], space: ColorSpace) -> [f32; 3] {
    match space {
        ColorSpace::Standard => rgb,
        ColorSpace::Extended => rgb.map(|v| ExtendedSrgbTransfer.to_encoded(v)),
    }
}

/// LUT output → working-space value.
pub fn from_lut_domain(rgb: [f32; 3], space: ColorSpace) -> [f32; 3] {
    match space {
        ColorSpace::Standard => rgb,
        ColorSpace::Extended => rgb.map(|v| ExtendedSrgbTransfer.to_linear(v)),
    }
}
