//! The ordered chain of scalar adjustment stages.
//!
//! [`StageChain::build`] turns a parameter record into the stages that
//! actually do something, in fixed order. Neutral stages are never emitted,
//! so an all-neutral record yields an empty chain.

use crate::exec::{ColorControls, ExecutionFacility, FacilityError};
use crate::grading::tonal::{TonalRegion, apply_tonal};
use crate::image::{ForegroundMask, GradingImage};
use crate::transform::params::AdjustmentParams;

/// Blur radius of the unsharp mask used for sharpening, in pixels.
pub const SHARPEN_RADIUS: f32 = 1.5;

/// One adjustment with its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    ColorControls(ColorControls),
    Tonal { region: TonalRegion, amount: f32 },
    Warmth(f32),
    Vibrance(f32),
    Hue(f32),
    Sharpness(f32),
    Blur(f32),
    Tint { color: [f32; 3], intensity: f32 },
    BackgroundBlur(f32),
    Vignette(f32),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::ColorControls(_) => "color_controls",
            Stage::Tonal { region, .. } => region.label(),
            Stage::Warmth(_) => "warmth",
            Stage::Vibrance(_) => "vibrance",
            Stage::Hue(_) => "hue",
            Stage::Sharpness(_) => "sharpness",
            Stage::Blur(_) => "blur",
            Stage::Tint { .. } => "tint",
            Stage::BackgroundBlur(_) => "background_blur",
            Stage::Vignette(_) => "vignette",
        }
    }

    /// True when applying the stage would not change any pixel.
    pub fn is_neutral(&self) -> bool {
        match *self {
            Stage::ColorControls(c) => {
                c.saturation == 1.0 && c.brightness == 0.0 && c.contrast == 1.0
            }
            Stage::Tonal { amount, .. } => amount == 0.0,
            Stage::Warmth(v)
            | Stage::Vibrance(v)
            | Stage::Hue(v)
            | Stage::Sharpness(v)
            | Stage::Blur(v)
            | Stage::BackgroundBlur(v)
            | Stage::Vignette(v) => v == 0.0,
            Stage::Tint { intensity, .. } => intensity == 0.0,
        }
    }

    /// Run the stage through `facility`.
    ///
    /// `mask` is only consulted by [`Stage::BackgroundBlur`].
    pub fn apply(
        &self,
        facility: &dyn ExecutionFacility,
        image: &GradingImage,
        mask: Option<&ForegroundMask>,
    ) -> Result<GradingImage, FacilityError> {
        match *self {
            Stage::ColorControls(controls) => facility.color_controls(image, controls),
            Stage::Tonal { region, amount } => apply_tonal(facility, image, region, amount),
            Stage::Warmth(warmth) => facility.white_balance(image, warmth),
            Stage::Vibrance(amount) => facility.vibrance(image, amount),
            Stage::Hue(degrees) => facility.hue_rotate(image, degrees),
            Stage::Sharpness(intensity) => facility.unsharp_mask(image, SHARPEN_RADIUS, intensity),
            Stage::Blur(radius) => facility.gaussian_blur(image, radius),
            Stage::Tint { color, intensity } => facility.tint(image, color, intensity),
            Stage::BackgroundBlur(radius) => {
                let mask = mask.ok_or_else(|| FacilityError::NoOutput {
                    operation: "background_blur",
                    reason: "no foreground mask supplied".to_string(),
                })?;
                let weights = facility.resample_mask(mask, image.width, image.height)?;
                let blurred = facility.gaussian_blur(image, radius)?;
                facility.blend_with_mask(image, &blurred, &weights)
            }
            Stage::Vignette(intensity) => facility.vignette(image, intensity),
        }
    }
}

/// Non-neutral stages in application order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageChain {
    stages: Vec<Stage>,
}

impl StageChain {
    /// Build the chain for `params` (sanitized first).
    ///
    /// Background blur is only emitted when `has_mask` is set.
    pub fn build(params: &AdjustmentParams, has_mask: bool) -> Self {
        let p = params.sanitized();

        let mut candidates = vec![Stage::ColorControls(ColorControls {
            saturation: p.saturation,
            brightness: p.brightness,
            contrast: p.contrast,
        })];
        candidates.extend(TonalRegion::ALL.into_iter().map(|region| Stage::Tonal {
            region,
            amount: match region {
                TonalRegion::Highlights => p.highlights,
                TonalRegion::Shadows => p.shadows,
                TonalRegion::Blacks => p.blacks,
                TonalRegion::Whites => p.whites,
            },
        }));
        candidates.extend([
            Stage::Warmth(p.warmth),
            Stage::Vibrance(p.vibrance),
            Stage::Hue(p.hue),
            Stage::Sharpness(p.sharpness),
            Stage::Blur(p.blur_radius),
        ]);
        if let Some(color) = p.tint_color {
            candidates.push(Stage::Tint {
                color,
                intensity: p.tint_intensity,
            });
        }
        if has_mask {
            candidates.push(Stage::BackgroundBlur(p.background_blur_radius));
        }
        candidates.push(Stage::Vignette(p.vignette));

        Self {
            stages: candidates.into_iter().filter(|s| !s.is_neutral()).collect(),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::name).collect()
    }
}

impl<'a> IntoIterator for &'a StageChain {
    type Item = &'a Stage;
    type IntoIter = std::slice::Iter<'a, Stage>;

    fn into_iter(self) -> Self::IntoIter {
        self.stages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::CpuFacility;
    use crate::transform::params::ColorSpace;

    #[test]
    fn test_neutral_params_build_empty_chain() {
        assert!(StageChain::build(&AdjustmentParams::default(), true).is_empty());
    }

    #[test]
    fn test_chain_order_is_fixed() {
        let params = AdjustmentParams {
            vignette: 0.5,
            blur_radius: 2.0,
            saturation: 0.5,
            whites: 0.3,
            highlights: -0.2,
            hue: 30.0,
            warmth: 0.1,
            sharpness: 1.0,
            vibrance: 0.4,
            shadows: 0.2,
            blacks: -0.1,
            tint_color: Some([1.0, 0.8, 0.6]),
            tint_intensity: 0.5,
            background_blur_radius: 8.0,
            ..AdjustmentParams::default()
        };
        let chain = StageChain::build(&params, true);
        assert_eq!(
            chain.names(),
            vec![
                "color_controls",
                "highlights",
                "shadows",
                "blacks",
                "whites",
                "warmth",
                "vibrance",
                "hue",
                "sharpness",
                "blur",
                "tint",
                "background_blur",
                "vignette",
            ]
        );
    }

    #[test]
    fn test_neutral_stages_are_skipped() {
        let params = AdjustmentParams {
            contrast: 1.5,
            vibrance: 0.2,
            ..AdjustmentParams::default()
        };
        assert_eq!(
            StageChain::build(&params, false).names(),
            vec!["color_controls", "vibrance"]
        );
    }

    #[test]
    fn test_background_blur_needs_mask() {
        let params = AdjustmentParams {
            background_blur_radius: 10.0,
            ..AdjustmentParams::default()
        };
        assert!(StageChain::build(&params, false).is_empty());
        assert_eq!(StageChain::build(&params, true).names(), vec!["background_blur"]);
    }

    #[test]
    fn test_tint_without_color_is_skipped() {
        let params = AdjustmentParams {
            tint_intensity: 1.0,
            ..AdjustmentParams::default()
        };
        assert!(StageChain::build(&params, false).is_empty());
    }

    #[test]
    fn test_out_of_range_params_are_sanitized_before_building() {
        let params = AdjustmentParams {
            saturation: f32::NAN,
            vignette: 7.0,
            ..AdjustmentParams::default()
        };
        let chain = StageChain::build(&params, false);
        assert_eq!(chain.stages(), &[Stage::Vignette(1.0)]);
    }

    #[test]
    fn test_background_blur_keeps_foreground_sharp() {
        let mut img = GradingImage::filled(8, 1, [0.0, 0.0, 0.0, 1.0], ColorSpace::Standard);
        for px in &mut img.pixels[4..] {
            *px = [1.0, 1.0, 1.0, 1.0];
        }
        let mut weights = vec![0.0; 8];
        weights[3] = 1.0;
        let mask = ForegroundMask::from_weights(8, 1, weights).unwrap();

        let out = Stage::BackgroundBlur(2.0)
            .apply(&CpuFacility, &img, Some(&mask))
            .unwrap();
        assert_eq!(out.pixels[3][0], 0.0);
        assert!(out.pixels[4][0] < 1.0);
    }

    #[test]
    fn test_background_blur_without_mask_fails() {
        let img = GradingImage::filled(2, 2, [0.5; 4], ColorSpace::Standard);
        assert!(Stage::BackgroundBlur(2.0).apply(&CpuFacility, &img, None).is_err());
    }
}
