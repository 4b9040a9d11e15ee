//! Monotone tone-curve interpolation.
//!
//! Implements Fritsch–Carlson monotone cubic Hermite interpolation. Unlike
//! Catmull-Rom, the curve never overshoots between control points, so a
//! non-decreasing set of points always yields a non-decreasing remap and
//! tonal order is preserved.
//!
//! # Algorithm
//! For points `(x_k, y_k)` with secants `d_k = (y_{k+1} - y_k) / h_k`:
//! ```text
//! m_0 = d_0,  m_{n-1} = d_{n-2}
//! m_k = 0                                   if d_{k-1}·d_k <= 0
//! m_k = (w1 + w2) / (w1/d_{k-1} + w2/d_k)   otherwise (weighted harmonic mean)
//!       w1 = 2h_k + h_{k-1},  w2 = h_k + 2h_{k-1}
//!
//! per segment: α = m_k/d_k, β = m_{k+1}/d_k
//!   if α² + β² > 9:  τ = 3/√(α²+β²),  m_k = τα·d_k,  m_{k+1} = τβ·d_k
//! ```
//!
//! # Complexity
//! - Build: O(N)
//! - Evaluate: O(log N) binary search + O(1) Hermite basis

use crate::transform::curve_model::{ControlPoint, Curve};

/// A monotone cubic Hermite spline through a curve's control points.
///
/// Precondition: at least 2 points with strictly increasing inputs. [`Curve`]
/// guarantees both; [`MonotonicSpline::new`] on raw slices falls back to the
/// identity map for fewer than 2 points.
#[derive(Debug, Clone)]
pub struct MonotonicSpline {
    xs: Vec<f32>,
    ys: Vec<f32>,
    tangents: Vec<f32>,
}

impl MonotonicSpline {
    pub fn new(points: &[ControlPoint]) -> Self {
        let xs: Vec<f32> = points.iter().map(|p| p.input).collect();
        let ys: Vec<f32> = points.iter().map(|p| p.output).collect();
        let tangents = fritsch_carlson_tangents(&xs, &ys);
        Self { xs, ys, tangents }
    }

    pub fn from_curve(curve: &Curve) -> Self {
        Self::new(curve.points())
    }

    /// Evaluate at `x`. Outside the control range the boundary output is held.
    pub fn evaluate(&self, x: f32) -> f32 {
        let n = self.xs.len();
        if n < 2 {
            return x;
        }
        if x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[n - 1] {
            return self.ys[n - 1];
        }

        // Binary search for the segment containing x
        let mut lo = 0;
        let mut hi = n - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.xs[mid] <= x {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let h = self.xs[hi] - self.xs[lo];
        let t = (x - self.xs[lo]) / h;
        hermite(
            self.ys[lo],
            self.ys[hi],
            self.tangents[lo] * h,
            self.tangents[hi] * h,
            t,
        )
    }
}

fn fritsch_carlson_tangents(xs: &[f32], ys: &[f32]) -> Vec<f32> {
    let n = xs.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let h: Vec<f32> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    let d: Vec<f32> = (0..n - 1).map(|k| (ys[k + 1] - ys[k]) / h[k]).collect();

    let mut m = vec![0.0_f32; n];
    m[0] = d[0];
    m[n - 1] = d[n - 2];
    for k in 1..n - 1 {
        if d[k - 1] * d[k] > 0.0 {
            let w1 = 2.0 * h[k] + h[k - 1];
            let w2 = h[k] + 2.0 * h[k - 1];
            m[k] = (w1 + w2) / (w1 / d[k - 1] + w2 / d[k]);
        }
    }

    for k in 0..n - 1 {
        if d[k] == 0.0 {
            m[k] = 0.0;
            m[k + 1] = 0.0;
            continue;
        }
        let alpha = m[k] / d[k];
        let beta = m[k + 1] / d[k];
        // Tangent pointing against the secant would leave the segment's range.
        if alpha < 0.0 {
            m[k] = 0.0;
        }
        if beta < 0.0 {
            m[k + 1] = 0.0;
        }
        let alpha = alpha.max(0.0);
        let beta = beta.max(0.0);
        let r2 = alpha * alpha + beta * beta;
        if r2 > 9.0 {
            let tau = 3.0 / r2.sqrt();
            m[k] = tau * alpha * d[k];
            m[k + 1] = tau * beta * d[k];
        }
    }
    m
}

/// Cubic Hermite between `p0` and `p1` with scaled tangents `m0`, `m1`.
///
/// ```text
/// q(t) = (2t³ − 3t² + 1)·p0 + (t³ − 2t² + t)·m0 + (−2t³ + 3t²)·p1 + (t³ − t²)·m1
/// ```
fn hermite(p0: f32, p1: f32, m0: f32, m1: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    (2.0 * t3 - 3.0 * t2 + 1.0) * p0
        + (t3 - 2.0 * t2 + t) * m0
        + (-2.0 * t3 + 3.0 * t2) * p1
        + (t3 - t2) * m1
}
