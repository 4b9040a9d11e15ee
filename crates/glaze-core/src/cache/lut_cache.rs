//! Cache of baked tone-curve LUTs, one instance per working color space.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::cache::bounded::{BoundedCache, CacheStats};
use crate::cache::fingerprint::Fingerprint;
use crate::config::EngineConfig;
use crate::transform::bake::LookupTableBuilder;
use crate::transform::curve_model::CurveModel;
use crate::transform::lut::{LookupTable, LutError};
use crate::transform::params::ColorSpace;

/// Fingerprint of curves + dimension + color space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LutKey(Fingerprint);

#[derive(Serialize)]
struct LutKeyMaterial<'a> {
    curves: &'a CurveModel,
    dimension: u32,
    color_space: ColorSpace,
}

impl LutKey {
    pub fn new(
        curves: &CurveModel,
        dimension: u32,
        color_space: ColorSpace,
    ) -> Result<Self, LutError> {
        Fingerprint::of(&LutKeyMaterial {
            curves,
            dimension,
            color_space,
        })
        .map(Self)
        .map_err(|e| LutError::Fingerprint(e.to_string()))
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.0
    }
}

/// Result of a LUT lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LutHandle {
    /// All curves are identity; skip the LUT step.
    Identity,
    Table(Arc<LookupTable>),
}

impl LutHandle {
    pub fn table(&self) -> Option<&Arc<LookupTable>> {
        match self {
            LutHandle::Identity => None,
            LutHandle::Table(table) => Some(table),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, LutHandle::Identity)
    }
}

/// Bounded LUT cache for one color space.
#[derive(Debug)]
pub struct LutCache {
    color_space: ColorSpace,
    builder: LookupTableBuilder,
    entries: BoundedCache<LutKey, LutHandle>,
}

impl LutCache {
    pub fn new(color_space: ColorSpace, capacity: usize) -> Self {
        Self {
            color_space,
            builder: LookupTableBuilder,
            entries: BoundedCache::new(capacity),
        }
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Return the cached table for `curves` at `dimension`, baking on a miss.
    ///
    /// The table is built outside the lock; if another thread stored the
    /// same key meanwhile its table is returned and ours is dropped.
    pub fn get_or_build(
        &self,
        curves: &CurveModel,
        dimension: u32,
        color_space: ColorSpace,
    ) -> Result<LutHandle, LutError> {
        if color_space != self.color_space {
            return Err(LutError::ProfileMismatch {
                expected: self.color_space,
                requested: color_space,
            });
        }
        let key = LutKey::new(curves, dimension, color_space)?;

        if let Some(handle) = self.entries.get(&key) {
            tracing::debug!(
                space = color_space.label(),
                dimension,
                key = %key.fingerprint(),
                "LUT cache hit"
            );
            return Ok(handle);
        }

        tracing::debug!(
            space = color_space.label(),
            dimension,
            key = %key.fingerprint(),
            "LUT cache miss"
        );
        let started = Instant::now();
        let handle = match self.builder.build(curves, dimension)? {
            Some(table) => LutHandle::Table(Arc::new(table)),
            None => LutHandle::Identity,
        };
        self.entries.record_build();
        tracing::debug!(
            elapsed_us = started.elapsed().as_micros() as u64,
            identity = handle.is_identity(),
            "LUT ready"
        );
        Ok(self.entries.insert_if_absent(key, handle))
    }

    pub fn contains(
        &self,
        curves: &CurveModel,
        dimension: u32,
    ) -> Result<bool, LutError> {
        Ok(self
            .entries
            .contains(&LutKey::new(curves, dimension, self.color_space)?))
    }

    pub fn stats(&self) -> CacheStats {
        self.entries.stats()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// One [`LutCache`] per color space.
#[derive(Debug)]
pub struct LutCaches {
    standard: LutCache,
    extended: LutCache,
}

impl LutCaches {
    pub fn new(capacity: usize) -> Self {
        Self {
            standard: LutCache::new(ColorSpace::Standard, capacity),
            extended: LutCache::new(ColorSpace::Extended, capacity),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.lut_cache_capacity)
    }

    pub fn for_space(&self, color_space: ColorSpace) -> &LutCache {
        match color_space {
            ColorSpace::Standard => &self.standard,
            ColorSpace::Extended => &self.extended,
        }
    }

    pub fn clear(&self) {
        self.standard.clear();
        self.extended.clear();
    }
}

impl Default for LutCaches {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
