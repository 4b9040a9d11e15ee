//! Warmth adjustment via Bradford chromatic adaptation.
//!
//! Warmth moves the destination white point along the Planckian locus
//! tangent at D65 (blue ↔ yellow) and adapts from D65 to it.
//!
//! # Reference
//! - Hernández-Andrés et al. (1999), Planckian locus approximation
//! - Lindbloom, Bruce J., Bradford chromatic adaptation

use glam::{DMat3, DVec3};

use crate::color_management::color_space::ColorMatrix;

/// D65 chromaticity.
const D65_XY: (f64, f64) = (0.3127, 0.3290);
/// Planckian locus tangent at D65 in CIE xy.
const LOCUS_TANGENT: (f64, f64) = (0.3585, 0.1501);
/// xy shift per unit of warmth.
const WARMTH_SCALE: f64 = 0.05;

/// Bradford cone response matrix, row-major.
const BRADFORD: [[f64; 3]; 3] = [
    [0.8951, 0.2664, -0.1614],
    [-0.7502, 1.7135, 0.0367],
    [0.0389, -0.0685, 1.0296],
];

/// Adaptation matrix for `warmth` in `[-1, 1]`.
///
/// Positive warms (toward yellow), negative cools (toward blue), 0 is the
/// identity. Apply per pixel with [`ColorMatrix::apply`].
pub fn warmth_matrix(warmth: f32) -> ColorMatrix {
    if warmth.abs() < 1e-7 {
        return ColorMatrix::identity();
    }

    let t = warmth as f64 * WARMTH_SCALE;
    let dst = (D65_XY.0 + LOCUS_TANGENT.0 * t, D65_XY.1 + LOCUS_TANGENT.1 * t);

    let m = DMat3::from_cols_array_2d(&BRADFORD).transpose();
    let src_cone = m * xy_to_xyz(D65_XY);
    let dst_cone = m * xy_to_xyz(dst);
    let scale = DMat3::from_diagonal(dst_cone / src_cone);
    let adapt = m.inverse() * scale * m;

    ColorMatrix(adapt.as_mat3())
}

/// CIE xy → XYZ with Y = 1.
fn xy_to_xyz((x, y): (f64, f64)) -> DVec3 {
    DVec3::new(x / y, 1.0, (1.0 - x - y) / y)
}
