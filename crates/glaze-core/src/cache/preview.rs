//! Cache of finished preview renders.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::cache::bounded::{BoundedCache, CacheStats};
use crate::cache::fingerprint::Fingerprint;
use crate::image::{GradingImage, ImageId};
use crate::transform::curve_model::CurveModel;
use crate::transform::params::{AdjustmentParams, RenderProfile};

/// Fingerprint of everything that can change a rendered preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewKey(Fingerprint);

#[derive(Serialize)]
struct PreviewKeyMaterial<'a> {
    image: ImageId,
    curves: &'a CurveModel,
    params: &'a AdjustmentParams,
    profile: RenderProfile,
    max_dimension: Option<u32>,
    mask_digest: Option<&'a str>,
}

impl PreviewKey {
    /// `params` are sanitized first so equivalent inputs share a key.
    pub fn new(
        image: ImageId,
        curves: &CurveModel,
        params: &AdjustmentParams,
        profile: RenderProfile,
        max_dimension: Option<u32>,
        mask_digest: Option<&str>,
    ) -> Result<Self, serde_json::Error> {
        let params = params.sanitized();
        Fingerprint::of(&PreviewKeyMaterial {
            image,
            curves,
            params: &params,
            profile,
            max_dimension,
            mask_digest,
        })
        .map(Self)
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.0
    }
}

/// Bounded cache of rendered previews for the current base image.
#[derive(Debug)]
pub struct PreviewResultCache {
    entries: BoundedCache<PreviewKey, Arc<GradingImage>>,
    current_image: Mutex<Option<ImageId>>,
}

impl PreviewResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: BoundedCache::new(capacity),
            current_image: Mutex::new(None),
        }
    }

    pub fn get(&self, key: &PreviewKey) -> Option<Arc<GradingImage>> {
        let found = self.entries.get(key);
        tracing::debug!(key = %key.fingerprint(), hit = found.is_some(), "preview cache lookup");
        found
    }

    pub fn set(&self, key: PreviewKey, image: Arc<GradingImage>) {
        self.entries.insert(key, image);
    }

    pub fn invalidate_all(&self) {
        tracing::debug!(entries = self.entries.len(), "preview cache invalidated");
        self.entries.clear();
    }

    /// Record the base image being previewed; a different image clears the
    /// cache. Returns `true` if entries were invalidated.
    pub fn track_image(&self, image: ImageId) -> bool {
        let mut current = self.current_image.lock();
        let changed = matches!(*current, Some(previous) if previous != image);
        *current = Some(image);
        drop(current);

        if changed {
            self.invalidate_all();
        }
        changed
    }

    pub fn stats(&self) -> CacheStats {
        self.entries.stats()
    }
}
