//! Tonal-range adjustments (highlights, shadows, blacks, whites).
//!
//! Each region is a masked blend: the Rec. 601 luma of the image is shaped
//! into a weight mask that selects the region, an exposure-shifted copy is
//! made, and the two are mixed by the mask.

use serde::{Deserialize, Serialize};

use crate::exec::{ExecutionFacility, FacilityError};
use crate::image::GradingImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TonalRegion {
    Highlights,
    Shadows,
    Blacks,
    Whites,
}

impl TonalRegion {
    /// Chain order.
    pub const ALL: [TonalRegion; 4] = [
        TonalRegion::Highlights,
        TonalRegion::Shadows,
        TonalRegion::Blacks,
        TonalRegion::Whites,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TonalRegion::Highlights => "highlights",
            TonalRegion::Shadows => "shadows",
            TonalRegion::Blacks => "blacks",
            TonalRegion::Whites => "whites",
        }
    }

    /// Mask exponent; higher values narrow the selection toward the extremes.
    pub fn exponent(self) -> f32 {
        match self {
            TonalRegion::Highlights | TonalRegion::Shadows => 2.0,
            TonalRegion::Blacks | TonalRegion::Whites => 4.0,
        }
    }

    /// Dark regions select on `1 − luma`.
    pub fn inverted(self) -> bool {
        matches!(self, TonalRegion::Shadows | TonalRegion::Blacks)
    }

    /// Exposure shift in stops at `amount = ±1`.
    pub fn ev_range(self) -> f32 {
        match self {
            TonalRegion::Highlights | TonalRegion::Shadows => 1.0,
            TonalRegion::Blacks => 1.5,
            TonalRegion::Whites => 0.5,
        }
    }
}

/// Apply one tonal region adjustment through `facility`.
pub fn apply_tonal(
    facility: &dyn ExecutionFacility,
    image: &GradingImage,
    region: TonalRegion,
    amount: f32,
) -> Result<GradingImage, FacilityError> {
    let luma = facility.luminance_mask(image)?;
    let mask = facility.shape_mask(&luma, region.exponent(), region.inverted())?;
    let adjusted = facility.exposure(image, amount * region.ev_range())?;
    facility.blend_with_mask(&adjusted, image, &mask)
}
