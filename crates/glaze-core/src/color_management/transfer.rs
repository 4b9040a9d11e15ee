//! Transfer functions between encoded and linear-light values.

/// Converts between linear light and a non-linear encoding.
pub trait TransferFunction: Send + Sync {
    /// Encoded → linear light.
    fn to_linear(&self, encoded: f32) -> f32;

    /// Linear light → encoded.
    fn to_encoded(&self, linear: f32) -> f32;
}

/// sRGB transfer function per IEC 61966-2-1.
///
/// ```text
/// to_linear:   V <= 0.04045 → V / 12.92
///              V >  0.04045 → ((V + 0.055) / 1.055) ^ 2.4
///
/// from_linear: L <= 0.0031308 → L × 12.92
///              L >  0.0031308 → 1.055 × L^(1/2.4) − 0.055
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SrgbTransfer;

impl TransferFunction for SrgbTransfer {
    fn to_linear(&self, encoded: f32) -> f32 {
        if encoded <= 0.04045 {
            encoded / 12.92
        } else {
            ((encoded + 0.055) / 1.055).powf(2.4)
        }
    }

    fn to_encoded(&self, linear: f32) -> f32 {
        if linear <= 0.0031308 {
            linear * 12.92
        } else {
            1.055 * linear.powf(1.0 / 2.4) - 0.055
        }
    }
}

/// sRGB curve mirrored through the origin, unbounded above 1.
///
/// Keeps negative and >1 components of wide-gamut, high-dynamic-range values
/// finite through encode/decode.
#[derive(Debug, Clone, Copy)]
pub struct ExtendedSrgbTransfer;

impl TransferFunction for ExtendedSrgbTransfer {
    fn to_linear(&self, encoded: f32) -> f32 {
        encoded.signum() * SrgbTransfer.to_linear(encoded.abs())
    }

    fn to_encoded(&self, linear: f32) -> f32 {
        linear.signum() * SrgbTransfer.to_encoded(linear.abs())
    }
}
