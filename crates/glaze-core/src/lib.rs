//! Glaze Core: parametrized color-transform engine.
//!
//! Turns adjustment values and tone curves into a reusable pixel transform
//! (a baked 3D LUT plus an ordered chain of scalar stages), runs it through
//! an execution facility, and caches the expensive parts. No async runtime
//! and no GPU dependencies.

pub mod cache;
pub mod color_management;
pub mod config;
pub mod exec;
pub mod grading;
pub mod image;
pub mod pipeline;
pub mod transform;

// Re-exports for convenience.
pub use cache::{LutCache, LutCaches, LutHandle, PreviewKey, PreviewResultCache};
pub use config::EngineConfig;
pub use exec::{CpuFacility, ExecutionFacility, FacilityError};
pub use grading::stages::{Stage, StageChain};
pub use image::{ForegroundMask, GradingImage, ImageId};
pub use pipeline::{ColorPipeline, PipelineError, RenderOutput, RenderReport, RenderRequest};
pub use transform::bake::LookupTableBuilder;
pub use transform::curve_model::{ControlPoint, Curve, CurveModel};
pub use transform::lut::{LookupTable, LutError};
pub use transform::params::{AdjustmentParams, ColorSpace, RenderProfile};
