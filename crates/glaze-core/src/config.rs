//! Engine configuration: cache capacities and LUT resolutions per tier.

use std::ops::RangeInclusive;

use serde::Deserialize;

use crate::transform::lut::{MAX_LUT_DIMENSION, MIN_LUT_DIMENSION};

/// Default number of baked LUTs kept per color space.
const DEFAULT_LUT_CACHE_CAPACITY: usize = 10;
/// Default number of rendered previews kept.
const DEFAULT_PREVIEW_CACHE_CAPACITY: usize = 8;
/// Default LUT grid size for interactive previews.
const DEFAULT_PREVIEW_LUT_DIMENSION: u32 = 16;
/// Default LUT grid size for final output.
const DEFAULT_FULL_LUT_DIMENSION: u32 = 64;

/// Errors from loading or validating an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: u64,
        max: u64,
        value: u64,
    },
}

/// Runtime configuration for the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Entries per [`LutCache`](crate::cache::LutCache) instance.
    pub lut_cache_capacity: usize,
    /// Entries in the [`PreviewResultCache`](crate::cache::PreviewResultCache).
    pub preview_cache_capacity: usize,
    /// LUT grid size for the preview tier.
    pub preview_lut_dimension: u32,
    /// LUT grid size for the full-quality tier.
    pub full_lut_dimension: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lut_cache_capacity: env_or("GLAZE_LUT_CACHE_CAPACITY", DEFAULT_LUT_CACHE_CAPACITY),
            preview_cache_capacity: env_or(
                "GLAZE_PREVIEW_CACHE_CAPACITY",
                DEFAULT_PREVIEW_CACHE_CAPACITY,
            ),
            preview_lut_dimension: env_or(
                "GLAZE_PREVIEW_LUT_DIMENSION",
                DEFAULT_PREVIEW_LUT_DIMENSION,
            ),
            full_lut_dimension: env_or("GLAZE_FULL_LUT_DIMENSION", DEFAULT_FULL_LUT_DIMENSION),
        }
    }
}

impl EngineConfig {
    /// Parse from JSON. Absent fields fall back to [`Default`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let capacity = 1..=u64::MAX;
        let dimension = u64::from(MIN_LUT_DIMENSION)..=u64::from(MAX_LUT_DIMENSION);
        check("lut_cache_capacity", self.lut_cache_capacity as u64, &capacity)?;
        check("preview_cache_capacity", self.preview_cache_capacity as u64, &capacity)?;
        check("preview_lut_dimension", self.preview_lut_dimension as u64, &dimension)?;
        check("full_lut_dimension", self.full_lut_dimension as u64, &dimension)?;
        Ok(())
    }
}

fn check(
    field: &'static str,
    value: u64,
    range: &RangeInclusive<u64>,
) -> Result<(), ConfigError> {
    if !range.contains(&value) {
        return Err(ConfigError::OutOfRange {
            field,
            min: *range.start(),
            max: *range.end(),
            value,
        });
    }
    Ok(())
}

fn env_or<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(fallback)
}
