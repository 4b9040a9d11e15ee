//! Grading tools: curves, sliders, tonal regions, and the stage chain.

pub mod curves;
pub mod sliders;
pub mod stages;
pub mod tonal;
