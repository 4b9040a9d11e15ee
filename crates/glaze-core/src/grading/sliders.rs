//! Per-pixel slider math: color controls, exposure, hue, vibrance, tint.
//!
//! These are the reference formulas the CPU execution facility runs. Each
//! function is the identity at its knob's neutral value.

use palette::{FromColor, Hsv, Srgb};

/// Rec. 709 luminance weights.
pub const LUMA_REC709: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Rec. 601 (broadcast video) luma weights, used for tonal masks.
pub const LUMA_REC601: [f32; 3] = [0.299, 0.587, 0.114];

pub fn luma(rgb: [f32; 3], weights: [f32; 3]) -> f32 {
    rgb[0] * weights[0] + rgb[1] * weights[1] + rgb[2] * weights[2]
}

/// Saturation, brightness, then contrast around `pivot`.
///
/// ```text
/// s   = luma + (rgb − luma) × saturation
/// b   = s + brightness
/// out = sign(b) × pow(|b| / pivot, contrast) × pivot
/// ```
pub fn apply_color_controls(
    rgb: [f32; 3],
    saturation: f32,
    brightness: f32,
    contrast: f32,
    pivot: f32,
) -> [f32; 3] {
    let mut out = rgb;

    if (saturation - 1.0).abs() > 1e-7 {
        let l = luma(out, LUMA_REC709);
        out = out.map(|v| l + (v - l) * saturation);
    }

    if brightness.abs() > 1e-7 {
        out = out.map(|v| v + brightness);
    }

    if (contrast - 1.0).abs() > 1e-7 {
        // Odd-symmetric so negative out-of-gamut components keep their sign.
        out = out.map(|v| v.signum() * (v.abs() / pivot).powf(contrast) * pivot);
    }
    out
}

/// Multiply by `2^ev`.
pub fn apply_exposure(rgb: [f32; 3], ev: f32) -> [f32; 3] {
    let gain = ev.exp2();
    rgb.map(|v| v * gain)
}

/// Rotate hue by `degrees` around the gray axis, keeping Rec. 709 luma.
pub fn apply_hue_rotation(rgb: [f32; 3], degrees: f32) -> [f32; 3] {
    if degrees.abs() < 1e-7 {
        return rgb;
    }
    let l = luma(rgb, LUMA_REC709);
    let chroma = rotate_chroma([rgb[0] - l, rgb[1] - l, rgb[2] - l], degrees);
    [l + chroma[0], l + chroma[1], l + chroma[2]]
}

/// Rotate the chrominance vector by `degrees` around the luminance axis.
///
/// Uses the Rodrigues rotation formula in the plane perpendicular to (1,1,1).
fn rotate_chroma(chroma: [f32; 3], degrees: f32) -> [f32; 3] {
    let (sin_a, cos_a) = degrees.to_radians().sin_cos();
    let axis = glam::Vec3::splat(1.0 / 3.0_f32.sqrt());
    let v = glam::Vec3::from_array(chroma);

    // Rodrigues: v·cos(a) + (k×v)·sin(a) + k·(k·v)·(1 − cos(a))
    let rotated = v * cos_a + axis.cross(v) * sin_a + axis * axis.dot(v) * (1.0 - cos_a);
    rotated.to_array()
}

/// Boost saturation of muted colors more than already-saturated ones.
///
/// ```text
/// gain = 1 + amount × (1 − hsv_saturation)
/// out  = luma + (rgb − luma) × gain
/// ```
pub fn apply_vibrance(rgb: [f32; 3], amount: f32) -> [f32; 3] {
    if amount.abs() < 1e-7 {
        return rgb;
    }
    let hsv: Hsv = Hsv::from_color(Srgb::new(rgb[0], rgb[1], rgb[2]));
    let sat = hsv.saturation.clamp(0.0, 1.0);
    let gain = (1.0 + amount * (1.0 - sat)).max(0.0);
    let l = luma(rgb, LUMA_REC709);
    rgb.map(|v| l + (v - l) * gain)
}

/// Blend toward a monochrome rendition in `color`.
///
/// ```text
/// out = lerp(rgb, luma × color, intensity)
/// ```
pub fn apply_tint(rgb: [f32; 3], color: [f32; 3], intensity: f32) -> [f32; 3] {
    let l = luma(rgb, LUMA_REC709);
    [
        rgb[0] + (l * color[0] - rgb[0]) * intensity,
        rgb[1] + (l * color[1] - rgb[1]) * intensity,
        rgb[2] + (l * color[2] - rgb[2]) * intensity,
    ]
}

/// Hermite smoothstep, `0` below `edge0` and `1` above `edge1`.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn assert_close(a: [f32; 3], b: [f32; 3]) {
        for i in 0..3 {
            assert!(
                (a[i] - b[i]).abs() < EPSILON,
                "channel {i}: {:.6} vs {:.6}",
                a[i],
                b[i]
            );
        }
    }

    #[test]
    fn test_color_controls_neutral_is_identity() {
        let rgb = [0.3, 0.5, 0.7];
        assert_eq!(apply_color_controls(rgb, 1.0, 0.0, 1.0, 0.5), rgb);
    }

    #[test]
    fn test_saturation_zero_produces_grayscale() {
        let result = apply_color_controls([0.8, 0.4, 0.2], 0.0, 0.0, 1.0, 0.5);
        assert!((result[0] - result[1]).abs() < EPSILON);
        assert!((result[1] - result[2]).abs() < EPSILON);
    }

    #[test]
    fn test_contrast_at_pivot_is_identity() {
        let result = apply_color_controls([0.5, 0.5, 0.5], 1.0, 0.0, 2.0, 0.5);
        assert_close(result, [0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_contrast_increases_spread() {
        let result = apply_color_controls([0.8, 0.2, 0.8], 1.0, 0.0, 2.0, 0.5);
        assert!(result[0] > 0.8);
        assert!(result[1] < 0.2);
    }

    #[test]
    fn test_contrast_keeps_negative_components() {
        let result = apply_color_controls([-0.1, 0.0, 1.5], 1.0, 0.0, 1.1, 0.18);
        let expected = -(0.1_f32 / 0.18).powf(1.1) * 0.18;
        assert!((result[0] - expected).abs() < 1e-6, "{}", result[0]);
        assert!(result[0] < 0.0);
        assert_eq!(result[1], 0.0);
        assert!(result[2] > 1.5);
    }

    #[test]
    fn test_exposure_one_stop_doubles() {
        assert_close(apply_exposure([0.1, 0.2, 0.3], 1.0), [0.2, 0.4, 0.6]);
        assert_close(apply_exposure([0.1, 0.2, 0.3], 0.0), [0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_hue_rotation_360_is_identity() {
        let rgb = [0.5, 0.3, 0.7];
        assert_close(apply_hue_rotation(rgb, 360.0), rgb);
    }

    #[test]
    fn test_hue_rotation_leaves_gray_alone() {
        assert_close(apply_hue_rotation([0.4, 0.4, 0.4], 90.0), [0.4, 0.4, 0.4]);
    }

    #[test]
    fn test_hue_rotation_changes_color() {
        let out = apply_hue_rotation([0.8, 0.2, 0.2], 120.0);
        assert!(out[1] > out[0], "red rotated 120° should lean green: {out:?}");
    }

    #[test]
    fn test_vibrance_favors_muted_colors() {
        let muted = [0.55, 0.5, 0.45];
        let vivid = [0.9, 0.1, 0.1];
        let muted_out = apply_vibrance(muted, 1.0);
        let vivid_out = apply_vibrance(vivid, 1.0);
        let spread = |c: [f32; 3]| c[0] - c[2];
        let muted_gain = spread(muted_out) / spread(muted);
        let vivid_gain = spread(vivid_out) / spread(vivid);
        assert!(muted_gain > vivid_gain);
        assert!(vivid_gain >= 1.0);
    }

    #[test]
    fn test_tint_full_intensity_is_monochrome_in_tint_color() {
        let out = apply_tint([0.2, 0.6, 0.4], [1.0, 0.5, 0.0], 1.0);
        let l = luma([0.2, 0.6, 0.4], LUMA_REC709);
        assert_close(out, [l, l * 0.5, 0.0]);
    }

    #[test]
    fn test_smoothstep_edges() {
        assert_eq!(smoothstep(0.2, 0.8, 0.0), 0.0);
        assert_eq!(smoothstep(0.2, 0.8, 1.0), 1.0);
        assert!((smoothstep(0.2, 0.8, 0.5) - 0.5).abs() < EPSILON);
    }
}
