//! Bake a [`CurveModel`] into a 3D lookup table.
//!
//! Per grid cell, with normalized coordinates `r, g, b ∈ [0, 1]`:
//! ```text
//! 1. r, g, b ← master(r), master(g), master(b)     (if master is not identity)
//! 2. r ← red(r), g ← green(g), b ← blue(b)          (each if not identity)
//! 3. clamp to [0, 1], alpha = 1
//! ```
//! Every step is per-channel, so each axis collapses to a 1D table of
//! `dimension` samples and the cube is filled from three lookups per cell.
//! Cells are written blue-major, then green, then red.

use std::time::Instant;

use rayon::prelude::*;

use crate::grading::curves::MonotonicSpline;
use crate::transform::curve_model::{Curve, CurveModel};
use crate::transform::lut::{LookupTable, LutError, check_dimension};

/// Builds lookup tables from curve models.
#[derive(Debug, Clone, Copy, Default)]
pub struct LookupTableBuilder;

impl LookupTableBuilder {
    /// Bake `curves` at `dimension` grid points per axis.
    ///
    /// Returns `Ok(None)` when all four curves are identity: there is nothing
    /// to apply and callers should skip the LUT pass.
    pub fn build(
        &self,
        curves: &CurveModel,
        dimension: u32,
    ) -> Result<Option<LookupTable>, LutError> {
        check_dimension(dimension)?;
        if curves.is_identity() {
            return Ok(None);
        }
        self.build_table(curves, dimension).map(Some)
    }

    /// Bake unconditionally, even for identity curves.
    pub fn build_table(
        &self,
        curves: &CurveModel,
        dimension: u32,
    ) -> Result<LookupTable, LutError> {
        check_dimension(dimension)?;
        let started = Instant::now();
        let axes = channel_tables(curves, dimension as usize);

        let dim = dimension as usize;
        let mut data = vec![0.0_f32; LookupTable::float_len(dimension)];
        data.par_chunks_mut(dim * dim * 4)
            .enumerate()
            .for_each(|(b, slice)| {
                for g in 0..dim {
                    for r in 0..dim {
                        let i = (g * dim + r) * 4;
                        slice[i] = axes[0][r];
                        slice[i + 1] = axes[1][g];
                        slice[i + 2] = axes[2][b];
                        slice[i + 3] = 1.0;
                    }
                }
            });

        tracing::info!(
            dimension,
            cells = dim * dim * dim,
            elapsed_us = started.elapsed().as_micros() as u64,
            "baked tone-curve LUT"
        );
        LookupTable::from_raw(dimension, data)
    }
}

/// Composed master-then-channel output for each grid index, per channel.
fn channel_tables(curves: &CurveModel, dim: usize) -> [Vec<f32>; 3] {
    let master = spline_unless_identity(&curves.master);
    let channels = curves.channels().map(spline_unless_identity);
    let max = (dim - 1) as f32;

    std::array::from_fn(|c| {
        (0..dim)
            .map(|i| {
                let mut v = i as f32 / max;
                if let Some(m) = &master {
                    v = m.evaluate(v);
                }
                if let Some(ch) = &channels[c] {
                    v = ch.evaluate(v);
                }
                v.clamp(0.0, 1.0)
            })
            .collect()
    })
}

fn spline_unless_identity(curve: &Curve) -> Option<MonotonicSpline> {
    (!curve.is_identity()).then(|| MonotonicSpline::from_curve(curve))
}
