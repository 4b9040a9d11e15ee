//! Adjustment parameters and render profiles.
//!
//! `AdjustmentParams` is the flat record of every user knob. Each knob has a
//! neutral value (no visual change) and a valid range; out-of-range input is
//! clamped by [`AdjustmentParams::sanitized`], never rejected.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;

/// Working color space of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorSpace {
    /// sRGB primaries, sRGB transfer, display-referred `[0, 1]`.
    Standard,
    /// Display P3 primaries, linear light, extended range (may exceed 1).
    Extended,
}

impl ColorSpace {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Standard => "sRGB",
            Self::Extended => "Extended Linear Display P3",
        }
    }

    pub const fn all() -> [Self; 2] {
        [Self::Standard, Self::Extended]
    }
}

/// Working space plus LUT resolution for one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderProfile {
    pub color_space: ColorSpace,
    /// Grid points per LUT axis. 16 for previews, 64 for final output.
    pub lut_dimension: u32,
}

impl RenderProfile {
    pub const fn new(color_space: ColorSpace, lut_dimension: u32) -> Self {
        Self {
            color_space,
            lut_dimension,
        }
    }

    /// Interactive preview tier.
    pub fn preview(color_space: ColorSpace, config: &EngineConfig) -> Self {
        Self::new(color_space, config.preview_lut_dimension)
    }

    /// Full-quality export tier.
    pub fn full(color_space: ColorSpace, config: &EngineConfig) -> Self {
        Self::new(color_space, config.full_lut_dimension)
    }
}

/// Valid range and neutral value of one scalar knob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Knob {
    pub neutral: f32,
    pub min: f32,
    pub max: f32,
}

impl Knob {
    const fn new(neutral: f32, min: f32, max: f32) -> Self {
        Self { neutral, min, max }
    }

    /// Clamp into range. NaN becomes neutral, -0.0 becomes 0.0.
    pub fn sanitize(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.neutral;
        }
        value.clamp(self.min, self.max) + 0.0
    }
}

/// Wrap an angle into `[-180, 180)`. Non-finite input becomes NaN.
fn wrap_degrees(degrees: f32) -> f32 {
    (degrees + 180.0).rem_euclid(360.0) - 180.0
}

pub const SATURATION: Knob = Knob::new(1.0, 0.0, 2.0);
pub const BRIGHTNESS: Knob = Knob::new(0.0, -1.0, 1.0);
pub const CONTRAST: Knob = Knob::new(1.0, 0.25, 4.0);
pub const TONAL: Knob = Knob::new(0.0, -1.0, 1.0);
pub const WARMTH: Knob = Knob::new(0.0, -1.0, 1.0);
pub const VIBRANCE: Knob = Knob::new(0.0, -1.0, 1.0);
pub const HUE_DEGREES: Knob = Knob::new(0.0, -180.0, 180.0);
pub const SHARPNESS: Knob = Knob::new(0.0, 0.0, 2.0);
pub const BLUR_RADIUS: Knob = Knob::new(0.0, 0.0, 100.0);
pub const UNIT: Knob = Knob::new(0.0, 0.0, 1.0);

/// Every adjustment the editor exposes. `Default` is the all-neutral record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentParams {
    /// Saturation multiplier. 1.0 = neutral, 0.0 = grayscale.
    pub saturation: f32,
    /// Additive brightness. 0.0 = neutral.
    pub brightness: f32,
    /// Contrast around mid-gray. 1.0 = neutral.
    pub contrast: f32,
    /// Highlight exposure. 0.0 = neutral.
    pub highlights: f32,
    /// Shadow exposure. 0.0 = neutral.
    pub shadows: f32,
    /// Deep-shadow exposure. 0.0 = neutral.
    pub blacks: f32,
    /// Brightest-tone exposure. 0.0 = neutral.
    pub whites: f32,
    /// Color temperature shift, positive is warmer. 0.0 = neutral.
    pub warmth: f32,
    /// Saturation boost weighted toward muted colors. 0.0 = neutral.
    pub vibrance: f32,
    /// Hue rotation in degrees. 0.0 = neutral.
    pub hue: f32,
    /// Unsharp-mask intensity. 0.0 = neutral.
    pub sharpness: f32,
    /// Gaussian blur radius in pixels. 0.0 = neutral.
    pub blur_radius: f32,
    /// Optional tint color (RGB in `[0, 1]`).
    pub tint_color: Option<[f32; 3]>,
    /// Tint blend amount. 0.0 = neutral.
    pub tint_intensity: f32,
    /// Blur radius applied behind the foreground mask. 0.0 = neutral.
    pub background_blur_radius: f32,
    /// Vignette darkening. 0.0 = neutral.
    pub vignette: f32,
}

impl Default for AdjustmentParams {
    /// All knobs at their neutral value; the image passes through unchanged.
    fn default() -> Self {
        Self {
            saturation: SATURATION.neutral,
            brightness: BRIGHTNESS.neutral,
            contrast: CONTRAST.neutral,
            highlights: TONAL.neutral,
            shadows: TONAL.neutral,
            blacks: TONAL.neutral,
            whites: TONAL.neutral,
            warmth: WARMTH.neutral,
            vibrance: VIBRANCE.neutral,
            hue: HUE_DEGREES.neutral,
            sharpness: SHARPNESS.neutral,
            blur_radius: BLUR_RADIUS.neutral,
            tint_color: None,
            tint_intensity: UNIT.neutral,
            background_blur_radius: BLUR_RADIUS.neutral,
            vignette: UNIT.neutral,
        }
    }
}

impl AdjustmentParams {
    /// Copy with every knob clamped into its range.
    pub fn sanitized(&self) -> Self {
        Self {
            saturation: SATURATION.sanitize(self.saturation),
            brightness: BRIGHTNESS.sanitize(self.brightness),
            contrast: CONTRAST.sanitize(self.contrast),
            highlights: TONAL.sanitize(self.highlights),
            shadows: TONAL.sanitize(self.shadows),
            blacks: TONAL.sanitize(self.blacks),
            whites: TONAL.sanitize(self.whites),
            warmth: WARMTH.sanitize(self.warmth),
            vibrance: VIBRANCE.sanitize(self.vibrance),
            hue: HUE_DEGREES.sanitize(wrap_degrees(self.hue)),
            sharpness: SHARPNESS.sanitize(self.sharpness),
            blur_radius: BLUR_RADIUS.sanitize(self.blur_radius),
            tint_color: self.tint_color.map(|c| c.map(|v| UNIT.sanitize(v))),
            tint_intensity: UNIT.sanitize(self.tint_intensity),
            background_blur_radius: BLUR_RADIUS.sanitize(self.background_blur_radius),
            vignette: UNIT.sanitize(self.vignette),
        }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}
