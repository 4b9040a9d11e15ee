//! The color pipeline: convert → stages → tone-curve LUT → downscale.
//!
//! Every step runs through an [`ExecutionFacility`]. A step whose primitive
//! fails is logged and passes its input through, so a render always
//! produces an image unless the source itself is unusable.

use std::sync::Arc;
use std::time::Instant;

use crate::cache::{LutCaches, LutHandle, PreviewKey, PreviewResultCache};
use crate::config::EngineConfig;
use crate::exec::ExecutionFacility;
use crate::grading::stages::StageChain;
use crate::image::{ForegroundMask, GradingImage, ImageError, ImageId};
use crate::transform::curve_model::CurveModel;
use crate::transform::params::{AdjustmentParams, RenderProfile};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid source image: {0}")]
    InvalidSource(#[from] ImageError),
}

/// Everything one render needs.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub image: Arc<GradingImage>,
    pub params: AdjustmentParams,
    pub curves: CurveModel,
    pub profile: RenderProfile,
    /// Longest output side; `None` keeps the source size.
    pub max_dimension: Option<u32>,
    pub mask: Option<Arc<ForegroundMask>>,
}

impl RenderRequest {
    /// Neutral params and identity curves.
    pub fn new(image: Arc<GradingImage>, profile: RenderProfile) -> Self {
        Self {
            image,
            params: AdjustmentParams::default(),
            curves: CurveModel::default(),
            profile,
            max_dimension: None,
            mask: None,
        }
    }

    pub fn with_params(mut self, params: AdjustmentParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_curves(mut self, curves: CurveModel) -> Self {
        self.curves = curves;
        self
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = Some(max_dimension);
        self
    }

    pub fn with_mask(mut self, mask: Arc<ForegroundMask>) -> Self {
        self.mask = Some(mask);
        self
    }
}

/// What happened to the tone-curve LUT step.
#[derive(Debug, Clone, PartialEq)]
pub enum LutOutcome {
    /// Curves are identity; nothing applied.
    Skipped,
    Applied { dimension: u32 },
    /// The table could not be built or applied; the step passed through.
    Failed(String),
}

/// A pipeline step that failed and was passed through.
#[derive(Debug, Clone, PartialEq)]
pub struct StepFailure {
    pub step: &'static str,
    pub error: String,
}

/// Summary of one render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub applied_stages: Vec<&'static str>,
    pub failures: Vec<StepFailure>,
    pub lut: LutOutcome,
    pub preview_cache_hit: bool,
}

impl RenderReport {
    fn new() -> Self {
        Self {
            applied_stages: Vec::new(),
            failures: Vec::new(),
            lut: LutOutcome::Skipped,
            preview_cache_hit: false,
        }
    }

    fn cache_hit() -> Self {
        Self {
            preview_cache_hit: true,
            ..Self::new()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn absorb(&mut self, step: &'static str, error: impl ToString) {
        let error = error.to_string();
        tracing::warn!(step, %error, "pipeline step failed, passing input through");
        self.failures.push(StepFailure { step, error });
    }
}

#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub image: Arc<GradingImage>,
    pub report: RenderReport,
}

/// Shared, thread-safe renderer.
pub struct ColorPipeline {
    facility: Arc<dyn ExecutionFacility>,
    luts: LutCaches,
    previews: Option<PreviewResultCache>,
}

impl std::fmt::Debug for ColorPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorPipeline")
            .field("facility", &self.facility.name())
            .field("luts", &self.luts)
            .field("previews", &self.previews)
            .finish()
    }
}

impl ColorPipeline {
    pub fn new(facility: Arc<dyn ExecutionFacility>, luts: LutCaches) -> Self {
        Self {
            facility,
            luts,
            previews: None,
        }
    }

    /// Pipeline with LUT and preview caches sized from `config`.
    pub fn from_config(facility: Arc<dyn ExecutionFacility>, config: &EngineConfig) -> Self {
        Self::new(facility, LutCaches::from_config(config))
            .with_preview_cache(PreviewResultCache::new(config.preview_cache_capacity))
    }

    pub fn with_preview_cache(mut self, previews: PreviewResultCache) -> Self {
        self.previews = Some(previews);
        self
    }

    pub fn luts(&self) -> &LutCaches {
        &self.luts
    }

    pub fn previews(&self) -> Option<&PreviewResultCache> {
        self.previews.as_ref()
    }

    pub fn facility(&self) -> &dyn ExecutionFacility {
        self.facility.as_ref()
    }

    /// Render without mask or downscale.
    pub fn run(
        &self,
        image: Arc<GradingImage>,
        params: &AdjustmentParams,
        curves: &CurveModel,
        profile: RenderProfile,
    ) -> Result<RenderOutput, PipelineError> {
        let request = RenderRequest::new(image, profile)
            .with_params(params.clone())
            .with_curves(curves.clone());
        self.run_request(&request)
    }

    pub fn run_request(&self, request: &RenderRequest) -> Result<RenderOutput, PipelineError> {
        request.image.validate()?;
        let started = Instant::now();
        let space = request.profile.color_space;
        let facility = self.facility.as_ref();
        let mut report = RenderReport::new();

        // 1. Working space.
        let mut current = if request.image.color_space == space {
            Arc::clone(&request.image)
        } else {
            match facility.convert(&request.image, space) {
                Ok(converted) => Arc::new(converted),
                Err(e) => {
                    report.absorb("convert", e);
                    Arc::clone(&request.image)
                }
            }
        };

        // 2. Scalar stages.
        let mask = request.mask.as_deref();
        let chain = StageChain::build(&request.params, mask.is_some());
        for stage in &chain {
            tracing::debug!(stage = stage.name(), facility = facility.name(), "applying stage");
            match stage.apply(facility, &current, mask) {
                Ok(next) => {
                    current = Arc::new(next);
                    report.applied_stages.push(stage.name());
                }
                Err(e) => report.absorb(stage.name(), e),
            }
        }

        // 3. Tone curves.
        let lut = self.luts.for_space(space).get_or_build(
            &request.curves,
            request.profile.lut_dimension,
            space,
        );
        report.lut = match lut {
            Ok(LutHandle::Identity) => LutOutcome::Skipped,
            Ok(LutHandle::Table(table)) => match facility.apply_lut(&current, &table, space) {
                Ok(next) => {
                    current = Arc::new(next);
                    LutOutcome::Applied {
                        dimension: table.dimension(),
                    }
                }
                Err(e) => {
                    let outcome = LutOutcome::Failed(e.to_string());
                    report.absorb("lut", e);
                    outcome
                }
            },
            Err(e) => {
                let outcome = LutOutcome::Failed(e.to_string());
                report.absorb("lut", e);
                outcome
            }
        };

        // 4. Downscale last.
        if let Some(max_dimension) = request.max_dimension {
            match facility.downscale(&current, max_dimension) {
                Ok(next) => current = Arc::new(next),
                Err(e) => report.absorb("downscale", e),
            }
        }

        tracing::debug!(
            stages = report.applied_stages.len(),
            failures = report.failures.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "render finished"
        );
        Ok(RenderOutput {
            image: current,
            report,
        })
    }

    /// Render through the preview cache when one is attached.
    ///
    /// `image_id` names the base image; switching to a new id drops every
    /// cached preview of the previous one.
    pub fn run_cached(
        &self,
        image_id: ImageId,
        request: &RenderRequest,
    ) -> Result<RenderOutput, PipelineError> {
        let Some(previews) = &self.previews else {
            return self.run_request(request);
        };
        previews.track_image(image_id);

        let key = match PreviewKey::new(
            image_id,
            &request.curves,
            &request.params,
            request.profile,
            request.max_dimension,
            request.mask.as_deref().map(ForegroundMask::digest),
        ) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = %e, "preview key unavailable, rendering uncached");
                return self.run_request(request);
            }
        };

        if let Some(image) = previews.get(&key) {
            return Ok(RenderOutput {
                image,
                report: RenderReport::cache_hit(),
            });
        }

        let output = self.run_request(request)?;
        // Partial renders are not worth keeping.
        if output.report.is_clean() {
            previews.set(key, Arc::clone(&output.image));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{ColorControls, CpuFacility, FacilityError, LumaMask};
    use crate::transform::curve_model::Curve;
    use crate::transform::lut::LookupTable;
    use crate::transform::params::ColorSpace;

    /// Fails every primitive.
    struct FailingFacility;

    fn fail<T>(operation: &'static str) -> Result<T, FacilityError> {
        Err(FacilityError::Unsupported {
            operation,
            facility: "failing",
        })
    }

    impl ExecutionFacility for FailingFacility {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn convert(&self, _: &GradingImage, _: ColorSpace) -> Result<GradingImage, FacilityError> {
            fail("convert")
        }
        fn color_controls(
            &self,
            _: &GradingImage,
            _: ColorControls,
        ) -> Result<GradingImage, FacilityError> {
            fail("color_controls")
        }
        fn luminance_mask(&self, _: &GradingImage) -> Result<LumaMask, FacilityError> {
            fail("luminance_mask")
        }
        fn shape_mask(&self, _: &LumaMask, _: f32, _: bool) -> Result<LumaMask, FacilityError> {
            fail("shape_mask")
        }
        fn resample_mask(
            &self,
            _: &ForegroundMask,
            _: u32,
            _: u32,
        ) -> Result<LumaMask, FacilityError> {
            fail("resample_mask")
        }
        fn exposure(&self, _: &GradingImage, _: f32) -> Result<GradingImage, FacilityError> {
            fail("exposure")
        }
        fn blend_with_mask(
            &self,
            _: &GradingImage,
            _: &GradingImage,
            _: &LumaMask,
        ) -> Result<GradingImage, FacilityError> {
            fail("blend_with_mask")
        }
        fn white_balance(&self, _: &GradingImage, _: f32) -> Result<GradingImage, FacilityError> {
            fail("white_balance")
        }
        fn vibrance(&self, _: &GradingImage, _: f32) -> Result<GradingImage, FacilityError> {
            fail("vibrance")
        }
        fn hue_rotate(&self, _: &GradingImage, _: f32) -> Result<GradingImage, FacilityError> {
            fail("hue_rotate")
        }
        fn unsharp_mask(
            &self,
            _: &GradingImage,
            _: f32,
            _: f32,
        ) -> Result<GradingImage, FacilityError> {
            fail("unsharp_mask")
        }
        fn gaussian_blur(&self, _: &GradingImage, _: f32) -> Result<GradingImage, FacilityError> {
            fail("gaussian_blur")
        }
        fn tint(&self, _: &GradingImage, _: [f32; 3], _: f32) -> Result<GradingImage, FacilityError> {
            fail("tint")
        }
        fn vignette(&self, _: &GradingImage, _: f32) -> Result<GradingImage, FacilityError> {
            fail("vignette")
        }
        fn apply_lut(
            &self,
            _: &GradingImage,
            _: &LookupTable,
            _: ColorSpace,
        ) -> Result<GradingImage, FacilityError> {
            fail("apply_lut")
        }
        fn downscale(&self, _: &GradingImage, _: u32) -> Result<GradingImage, FacilityError> {
            fail("downscale")
        }
    }

    fn pipeline() -> ColorPipeline {
        ColorPipeline::new(Arc::new(CpuFacility), LutCaches::new(4))
            .with_preview_cache(PreviewResultCache::new(4))
    }

    fn source() -> Arc<GradingImage> {
        let pixels = (0..16)
            .map(|i| {
                let v = i as f32 / 15.0;
                [v, 1.0 - v, 0.5, 1.0]
            })
            .collect();
        Arc::new(GradingImage::new(4, 4, pixels, ColorSpace::Standard))
    }

    fn lifted() -> CurveModel {
        CurveModel::with_master(Curve::new([(0.0, 0.0), (0.5, 0.7), (1.0, 1.0)]).unwrap())
    }

    fn profile() -> RenderProfile {
        RenderProfile::new(ColorSpace::Standard, 16)
    }

    #[test]
    fn test_neutral_render_is_passthrough() {
        let src = source();
        let out = pipeline()
            .run(Arc::clone(&src), &AdjustmentParams::default(), &CurveModel::default(), profile())
            .unwrap();
        assert_eq!(out.image.pixels, src.pixels);
        assert!(out.report.applied_stages.is_empty());
        assert_eq!(out.report.lut, LutOutcome::Skipped);
    }

    #[test]
    fn test_invalid_source_is_an_error() {
        let bad = Arc::new(GradingImage::new(2, 2, vec![[0.0; 4]; 3], ColorSpace::Standard));
        let err = pipeline()
            .run(bad, &AdjustmentParams::default(), &CurveModel::default(), profile())
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSource(ImageError::PixelCount { .. })));
    }

    #[test]
    fn test_curves_apply_lut() {
        let out = pipeline()
            .run(source(), &AdjustmentParams::default(), &lifted(), profile())
            .unwrap();
        assert_eq!(out.report.lut, LutOutcome::Applied { dimension: 16 });
    }

    #[test]
    fn test_oversized_lut_dimension_degrades_to_passthrough() {
        let src = source();
        let out = pipeline()
            .run(
                Arc::clone(&src),
                &AdjustmentParams::default(),
                &lifted(),
                RenderProfile::new(ColorSpace::Standard, 3_000_000),
            )
            .unwrap();
        assert!(matches!(out.report.lut, LutOutcome::Failed(_)));
        assert_eq!(out.image.pixels, src.pixels);
    }

    #[test]
    fn test_failing_facility_passes_everything_through() {
        let pipeline = ColorPipeline::new(Arc::new(FailingFacility), LutCaches::new(2));
        let src = Arc::new(GradingImage::filled(4, 2, [0.2, 0.4, 0.6, 1.0], ColorSpace::Extended));
        let params = AdjustmentParams {
            saturation: 0.0,
            highlights: 0.5,
            vignette: 0.5,
            ..AdjustmentParams::default()
        };
        let request = RenderRequest::new(Arc::clone(&src), profile())
            .with_params(params)
            .with_curves(lifted())
            .with_max_dimension(2);

        let out = pipeline.run_request(&request).unwrap();
        assert_eq!(out.image.pixels, src.pixels);
        assert_eq!(
            out.report.failures.iter().map(|f| f.step).collect::<Vec<_>>(),
            vec!["convert", "color_controls", "highlights", "vignette", "lut", "downscale"]
        );
        assert!(matches!(out.report.lut, LutOutcome::Failed(_)));
    }

    #[test]
    fn test_downscale_happens_last() {
        let request = RenderRequest::new(source(), profile())
            .with_curves(lifted())
            .with_max_dimension(2);
        let out = pipeline().run_request(&request).unwrap();
        assert_eq!((out.image.width, out.image.height), (2, 2));
    }

    #[test]
    fn test_run_cached_hits_on_repeat() {
        let pipeline = pipeline();
        let request = RenderRequest::new(source(), profile()).with_curves(lifted());

        let first = pipeline.run_cached(ImageId(7), &request).unwrap();
        let second = pipeline.run_cached(ImageId(7), &request).unwrap();
        assert!(!first.report.preview_cache_hit);
        assert!(second.report.preview_cache_hit);
        assert!(Arc::ptr_eq(&first.image, &second.image));
    }

    #[test]
    fn test_run_cached_new_image_misses() {
        let pipeline = pipeline();
        let request = RenderRequest::new(source(), profile()).with_curves(lifted());
        pipeline.run_cached(ImageId(1), &request).unwrap();

        let other = pipeline.run_cached(ImageId(2), &request).unwrap();
        assert!(!other.report.preview_cache_hit);
        assert_eq!(pipeline.previews().unwrap().stats().len, 1);
    }

    #[test]
    fn test_run_cached_without_preview_cache_still_renders() {
        let pipeline = ColorPipeline::new(Arc::new(CpuFacility), LutCaches::new(2));
        let request = RenderRequest::new(source(), profile());
        let out = pipeline.run_cached(ImageId(1), &request).unwrap();
        assert!(!out.report.preview_cache_hit);
    }
}
