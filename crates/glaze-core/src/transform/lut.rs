//! 3D lookup tables: storage layout, trilinear application, `.cube` text I/O.

use std::fmt::Write as _;

/// Smallest grid that can interpolate.
pub const MIN_LUT_DIMENSION: u32 = 2;
/// Largest accepted grid (256³ RGBA floats is 256 MiB).
pub const MAX_LUT_DIMENSION: u32 = 256;

/// Errors from constructing or parsing a lookup table.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LutError {
    #[error("LUT dimension must be between 2 and 256, got {0}")]
    InvalidDimension(u32),
    #[error("LUT buffer holds {actual} floats, expected {expected} for dimension {dimension}")]
    BufferSize {
        dimension: u32,
        expected: usize,
        actual: usize,
    },
    #[error("cache bound to {expected:?} was asked for a {requested:?} table")]
    ProfileMismatch {
        expected: crate::transform::params::ColorSpace,
        requested: crate::transform::params::ColorSpace,
    },
    #[error("could not fingerprint cache key: {0}")]
    Fingerprint(String),
}

/// Errors from parsing `.cube` text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CubeError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("missing LUT_3D_SIZE")]
    MissingSize,
    #[error("expected {expected} entries, found {actual}")]
    EntryCount { expected: usize, actual: usize },
    #[error(transparent)]
    Lut(#[from] LutError),
}

/// A `dimension³` color cube of RGBA `f32` entries.
///
/// Entry `(r, g, b)` lives at float offset
/// `((b·dim² + g·dim + r)·4 + channel)`: red varies fastest, blue slowest.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    dimension: u32,
    data: Vec<f32>,
}

impl LookupTable {
    /// Wrap a flat RGBA buffer of `dimension³ × 4` floats.
    pub fn from_raw(dimension: u32, data: Vec<f32>) -> Result<Self, LutError> {
        check_dimension(dimension)?;
        let expected = Self::float_len(dimension);
        if data.len() != expected {
            return Err(LutError::BufferSize {
                dimension,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { dimension, data })
    }

    /// The table that maps every color to itself.
    pub fn identity(dimension: u32) -> Result<Self, LutError> {
        check_dimension(dimension)?;
        let max = (dimension - 1) as f32;
        let mut data = Vec::with_capacity(Self::float_len(dimension));
        for b in 0..dimension {
            for g in 0..dimension {
                for r in 0..dimension {
                    data.extend_from_slice(&[
                        r as f32 / max,
                        g as f32 / max,
                        b as f32 / max,
                        1.0,
                    ]);
                }
            }
        }
        Ok(Self { dimension, data })
    }

    /// Callers validate `dimension` with [`check_dimension`] first.
    pub(crate) fn float_len(dimension: u32) -> usize {
        (dimension as usize).pow(3) * 4
    }

    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Raw bytes in native endianness, ready for a GPU texture upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// RGBA entry at grid coordinates.
    pub fn entry(&self, r: u32, g: u32, b: u32) -> [f32; 4] {
        let dim = self.dimension as usize;
        let i = ((b as usize * dim + g as usize) * dim + r as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Apply to an RGB triplet with trilinear interpolation.
    ///
    /// Inputs are clamped to the `[0, 1]` domain of the cube.
    pub fn sample(&self, rgb: [f32; 3]) -> [f32; 3] {
        let max = (self.dimension - 1) as f32;
        let mut i0 = [0u32; 3];
        let mut i1 = [0u32; 3];
        let mut frac = [0.0_f32; 3];
        for c in 0..3 {
            let unit = if rgb[c].is_nan() { 0.0 } else { rgb[c].clamp(0.0, 1.0) };
            let v = unit * max;
            let lo = v.floor().min(max - 1.0);
            i0[c] = lo as u32;
            i1[c] = i0[c] + 1;
            frac[c] = v - lo;
        }

        let corner = |r: u32, g: u32, b: u32| {
            let e = self.entry(r, g, b);
            [e[0], e[1], e[2]]
        };
        let lerp = |a: [f32; 3], b: [f32; 3], t: f32| {
            [
                a[0] + (b[0] - a[0]) * t,
                a[1] + (b[1] - a[1]) * t,
                a[2] + (b[2] - a[2]) * t,
            ]
        };

        let c00 = lerp(corner(i0[0], i0[1], i0[2]), corner(i1[0], i0[1], i0[2]), frac[0]);
        let c10 = lerp(corner(i0[0], i1[1], i0[2]), corner(i1[0], i1[1], i0[2]), frac[0]);
        let c01 = lerp(corner(i0[0], i0[1], i1[2]), corner(i1[0], i0[1], i1[2]), frac[0]);
        let c11 = lerp(corner(i0[0], i1[1], i1[2]), corner(i1[0], i1[1], i1[2]), frac[0]);
        let c0 = lerp(c00, c10, frac[1]);
        let c1 = lerp(c01, c11, frac[1]);
        lerp(c0, c1, frac[2])
    }

    /// Like [`sample`](Self::sample), but a component outside `[0, 1]` keeps
    /// its distance past the cube edge: `out = lut(edge) + (v − edge)`.
    pub fn sample_unbounded(&self, rgb: [f32; 3]) -> [f32; 3] {
        let inside = self.sample(rgb);
        std::array::from_fn(|c| {
            let v = rgb[c];
            let excess = if v.is_nan() { 0.0 } else { v - v.clamp(0.0, 1.0) };
            inside[c] + excess
        })
    }

    /// Serialize as `.cube` text. Entry order already matches the format.
    pub fn to_cube_string(&self, title: &str) -> String {
        let mut out = String::with_capacity(self.data.len() * 8);
        let _ = writeln!(out, "TITLE \"{title}\"");
        let _ = writeln!(out, "LUT_3D_SIZE {}", self.dimension);
        let _ = writeln!(out, "DOMAIN_MIN 0.0 0.0 0.0");
        let _ = writeln!(out, "DOMAIN_MAX 1.0 1.0 1.0");
        for px in self.data.chunks_exact(4) {
            let _ = writeln!(out, "{:.6} {:.6} {:.6}", px[0], px[1], px[2]);
        }
        out
    }

    /// Parse `.cube` text (3D tables only; `DOMAIN_*` must be the unit cube).
    pub fn parse_cube(text: &str) -> Result<Self, CubeError> {
        let mut dimension: Option<u32> = None;
        let mut data = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let syntax = |message: &str| CubeError::Syntax {
                line: line_no,
                message: message.to_string(),
            };

            let mut fields = line.split_whitespace();
            let Some(head) = fields.next() else {
                continue;
            };
            match head {
                "TITLE" => {}
                "LUT_1D_SIZE" => return Err(syntax("1D tables are not supported")),
                "LUT_3D_SIZE" => {
                    let size = fields
                        .next()
                        .and_then(|s| s.parse::<u32>().ok())
                        .ok_or_else(|| syntax("LUT_3D_SIZE needs an integer"))?;
                    dimension = Some(size);
                }
                "DOMAIN_MIN" | "DOMAIN_MAX" => {
                    let want = if head == "DOMAIN_MIN" { 0.0 } else { 1.0 };
                    let values: Vec<f32> = fields.filter_map(|s| s.parse().ok()).collect();
                    if values.len() != 3 || values.iter().any(|v| (v - want).abs() > 1e-6) {
                        return Err(syntax("only the unit domain is supported"));
                    }
                }
                _ => {
                    let rgb: Vec<f32> = line
                        .split_whitespace()
                        .map(str::parse)
                        .collect::<Result<_, _>>()
                        .map_err(|_| syntax("expected three numbers"))?;
                    if rgb.len() != 3 {
                        return Err(syntax("expected three numbers"));
                    }
                    data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 1.0]);
                }
            }
        }

        let dimension = dimension.ok_or(CubeError::MissingSize)?;
        check_dimension(dimension)?;
        let expected = (dimension as usize).pow(3);
        if data.len() / 4 != expected {
            return Err(CubeError::EntryCount {
                expected,
                actual: data.len() / 4,
            });
        }
        Ok(Self::from_raw(dimension, data)?)
    }
}

/// Reject grids outside `MIN_LUT_DIMENSION..=MAX_LUT_DIMENSION`.
pub fn check_dimension(dimension: u32) -> Result<(), LutError> {
    if (MIN_LUT_DIMENSION..=MAX_LUT_DIMENSION).contains(&dimension) {
        Ok(())
    } else {
        Err(LutError::InvalidDimension(dimension))
    }
}
