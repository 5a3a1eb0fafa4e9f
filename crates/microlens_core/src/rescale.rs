//! Per-sample conditioning of the lens geometry.
//!
//! Source and lens positions arrive in arcseconds, where separations of a
//! few milliarcseconds make the quintic coefficients badly scaled. Each
//! sample is therefore recentered on the centroid of the three positions and
//! scaled so they span a unit box, with the mass terms scaled by the square
//! of the same factor. The transform is a pure similarity, so validated
//! image positions map back exactly and amplifications are unchanged.

use crate::types::SampleError;
use num_complex::Complex;
use serde::{Deserialize, Serialize};

/// One sample's geometry after recentering and rescaling, together with the
/// transform needed to map solutions back to the input frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RescaledFrame {
    pub w: Complex<f64>,
    pub z1: Complex<f64>,
    pub z2: Complex<f64>,
    pub m1: f64,
    pub m2: f64,
    /// Multiplicative factor applied to recentered positions.
    pub scale: f64,
    /// Centroid subtracted before scaling.
    pub shift: Complex<f64>,
}

impl RescaledFrame {
    /// A pass-through frame for callers that skip conditioning.
    pub fn identity(
        w: Complex<f64>,
        z1: Complex<f64>,
        z2: Complex<f64>,
        m1: f64,
        m2: f64,
    ) -> Self {
        Self {
            w,
            z1,
            z2,
            m1,
            m2,
            scale: 1.0,
            shift: Complex::new(0.0, 0.0),
        }
    }

    /// Map a position found in this frame back to the input frame.
    pub fn restore(&self, z: Complex<f64>) -> Complex<f64> {
        z / self.scale + self.shift
    }
}

/// Build the conditioned frame for one sample.
///
/// The scale factor is the reciprocal of the larger of the x and y spans of
/// the three positions. Samples whose positions span no more than
/// `spread_floor` (including any non-finite input) are rejected; there is no
/// meaningful geometry to solve there.
pub fn rescale(
    w: Complex<f64>,
    z1: Complex<f64>,
    z2: Complex<f64>,
    m1: f64,
    m2: f64,
    spread_floor: f64,
) -> Result<RescaledFrame, SampleError> {
    // f64::max and f64::min ignore NaN operands, so a NaN position would
    // leave a finite spread from the remaining two; check explicitly.
    if !(w.is_finite() && z1.is_finite() && z2.is_finite()) {
        return Err(SampleError::DegenerateGeometry(f64::NAN));
    }

    let spread_x = w.re.max(z1.re).max(z2.re) - w.re.min(z1.re).min(z2.re);
    let spread_y = w.im.max(z1.im).max(z2.im) - w.im.min(z1.im).min(z2.im);
    let spread = spread_x.max(spread_y);
    if !(spread > spread_floor) {
        return Err(SampleError::DegenerateGeometry(spread));
    }

    let shift = (w + z1 + z2) / 3.0;
    let scale = spread.recip();
    Ok(RescaledFrame {
        w: (w - shift) * scale,
        z1: (z1 - shift) * scale,
        z2: (z2 - shift) * scale,
        m1: m1 * scale * scale,
        m2: m2 * scale * scale,
        scale,
        shift,
    })
}
