//! Worker dispatch against a real pipeline.

use std::sync::Arc;

use glaze_core::{
    AdjustmentParams, ColorPipeline, ColorSpace, CpuFacility, Curve, CurveModel, EngineConfig,
    GradingImage, ImageId, RenderProfile, RenderRequest,
};
use glaze_worker::RenderWorker;

fn pipeline() -> Arc<ColorPipeline> {
    let config = EngineConfig::from_json(r#"{"lut_cache_capacity": 4, "preview_cache_capacity": 4}"#)
        .unwrap();
    Arc::new(ColorPipeline::from_config(Arc::new(CpuFacility), &config))
}

fn request(saturation: f32) -> RenderRequest {
    let image = GradingImage::filled(8, 8, [0.8, 0.3, 0.2, 1.0], ColorSpace::Standard);
    let curves =
        CurveModel::with_master(Curve::new([(0.0, 0.0), (0.5, 0.7), (1.0, 1.0)]).unwrap());
    RenderRequest::new(Arc::new(image), RenderProfile::new(ColorSpace::Standard, 16))
        .with_curves(curves)
        .with_params(AdjustmentParams {
            saturation,
            ..AdjustmentParams::default()
        })
}

#[tokio::test(flavor = "multi_thread")]
async fn test_preview_renders_complete_off_thread() {
    let worker = RenderWorker::current(pipeline()).unwrap();
    let ticket = worker.submit_preview(ImageId(1), request(0.0));
    let output = ticket.wait().await.unwrap();

    let px = output.image.pixels[0];
    assert!((px[0] - px[1]).abs() < 1e-4);
    assert!(output.report.is_clean());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_repeat_preview_hits_cache() {
    let worker = RenderWorker::current(pipeline()).unwrap();
    worker.submit_preview(ImageId(1), request(0.5)).wait().await.unwrap();
    let again = worker.submit_preview(ImageId(1), request(0.5)).wait().await.unwrap();
    assert!(again.report.preview_cache_hit);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_latest_generation_is_published() {
    let worker = RenderWorker::current(pipeline()).unwrap();
    let mut updates = worker.subscribe();

    let tickets: Vec<_> = (0..4)
        .map(|i| worker.submit(request(i as f32 * 0.25)))
        .collect();
    let last = tickets.last().map(|t| t.generation()).unwrap();
    for ticket in tickets {
        ticket.wait().await.unwrap();
    }

    updates.changed().await.unwrap();
    let published = updates.borrow().clone().unwrap();
    assert_eq!(published.generation, last);
    assert!(worker.is_current(published.generation));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_source_surfaces_as_error() {
    let worker = RenderWorker::current(pipeline()).unwrap();
    let bad = GradingImage::new(0, 0, Vec::new(), ColorSpace::Standard);
    let request = RenderRequest::new(Arc::new(bad), RenderProfile::new(ColorSpace::Standard, 16));
    assert!(worker.submit(request).wait().await.is_err());
}
