//! Tone-curve control points and the four-curve model (master + R, G, B).
//!
//! Curves are validated when they are built: at least two points, inputs
//! strictly increasing after sorting, every coordinate clamped into `[0, 1]`.
//! Everything downstream (spline, LUT bake, fingerprints) relies on that.

use serde::{Deserialize, Serialize};

/// Maximum `|input - output|` for a curve to still count as identity.
pub const IDENTITY_TOLERANCE: f32 = 0.01;

/// One `(input, output)` control point of a tone curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    /// Input level in `[0, 1]`.
    pub input: f32,
    /// Output level in `[0, 1]`.
    pub output: f32,
}

impl ControlPoint {
    pub const fn new(input: f32, output: f32) -> Self {
        Self { input, output }
    }
}

impl From<(f32, f32)> for ControlPoint {
    fn from((input, output): (f32, f32)) -> Self {
        Self { input, output }
    }
}

/// Errors raised while constructing a curve.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurveError {
    #[error("a curve needs at least 2 control points, got {0}")]
    TooFewPoints(usize),
    #[error("control point {index} is not a finite number")]
    NonFinite { index: usize },
    #[error("two control points share input {input}")]
    DuplicateInput { input: f32 },
}

/// An ordered set of ≥2 control points with strictly increasing inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Curve {
    points: Vec<ControlPoint>,
}

impl Curve {
    /// Build a curve from control points in any order.
    ///
    /// Points are clamped into `[0, 1]` and sorted by input. Two points with
    /// the same input (after clamping) are rejected.
    pub fn new<I, P>(points: I) -> Result<Self, CurveError>
    where
        I: IntoIterator<Item = P>,
        P: Into<ControlPoint>,
    {
        let mut pts: Vec<ControlPoint> = points.into_iter().map(Into::into).collect();
        if pts.len() < 2 {
            return Err(CurveError::TooFewPoints(pts.len()));
        }

        for (index, p) in pts.iter_mut().enumerate() {
            if !p.input.is_finite() || !p.output.is_finite() {
                return Err(CurveError::NonFinite { index });
            }
            // `+ 0.0` folds -0.0 into 0.0 so equal curves fingerprint equally.
            p.input = p.input.clamp(0.0, 1.0) + 0.0;
            p.output = p.output.clamp(0.0, 1.0) + 0.0;
        }

        pts.sort_by(|a, b| a.input.total_cmp(&b.input));
        if let Some(w) = pts.windows(2).find(|w| w[0].input == w[1].input) {
            return Err(CurveError::DuplicateInput { input: w[0].input });
        }

        Ok(Self { points: pts })
    }

    /// The straight `(0,0) → (1,1)` curve.
    pub fn identity() -> Self {
        Self {
            points: vec![ControlPoint::new(0.0, 0.0), ControlPoint::new(1.0, 1.0)],
        }
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    /// True when every point lies within [`IDENTITY_TOLERANCE`] of the diagonal.
    pub fn is_identity(&self) -> bool {
        self.points
            .iter()
            .all(|p| (p.input - p.output).abs() <= IDENTITY_TOLERANCE)
    }
}

impl Default for Curve {
    fn default() -> Self {
        Self::identity()
    }
}

impl<'de> Deserialize<'de> for Curve {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            points: Vec<ControlPoint>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Curve::new(raw.points).map_err(serde::de::Error::custom)
    }
}

/// Master curve plus one curve per RGB channel.
///
/// An immutable snapshot created per edit action. Equality is structural.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveModel {
    pub master: Curve,
    pub red: Curve,
    pub green: Curve,
    pub blue: Curve,
}

impl CurveModel {
    pub fn new(master: Curve, red: Curve, green: Curve, blue: Curve) -> Self {
        Self {
            master,
            red,
            green,
            blue,
        }
    }

    /// Only the master curve set; channels stay identity.
    pub fn with_master(master: Curve) -> Self {
        Self {
            master,
            ..Self::default()
        }
    }

    /// Channel curves in R, G, B order.
    pub fn channels(&self) -> [&Curve; 3] {
        [&self.red, &self.green, &self.blue]
    }

    pub fn is_identity(&self) -> bool {
        self.master.is_identity()
            && self.red.is_identity()
            && self.green.is_identity()
            && self.blue.is_identity()
    }
}
