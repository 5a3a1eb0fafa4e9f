//! Core types for the binary-lens solver.
//!
//! Everything here is per-sample data: one observation epoch in, one set of
//! candidate images out. Nothing carries state between epochs.

use num_complex::Complex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of candidate image positions per epoch (the lens polynomial is a
/// quintic, so there are at most five).
pub const MAX_IMAGES: usize = 5;

/// Complex NaN used to mark invalid image slots in fixed-size outputs.
pub const NAN_POSITION: Complex<f64> = Complex::new(f64::NAN, f64::NAN);

/// One observation epoch in a common 2-D sky frame. `w` is the true
/// (unlensed) source position; `z1` and `z2` are the two lens components.
/// All three share the same units (arcsec in the physical frame).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeSample {
    pub t: f64,
    pub w: Complex<f64>,
    pub z1: Complex<f64>,
    pub z2: Complex<f64>,
}

/// The two point-mass lens components, expressed as squared angular Einstein
/// radii (arcsec² in the physical frame). These are read-only per model
/// evaluation and shared across all epochs of that evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LensSystem {
    pub m1: f64,
    pub m2: f64,
}

impl LensSystem {
    pub fn new(m1: f64, m2: f64) -> Self {
        Self { m1, m2 }
    }

    /// Combined mass term `m1 + m2`, the squared Einstein radius of the
    /// whole system.
    pub fn total_mass(&self) -> f64 {
        self.m1 + self.m2
    }

    /// Angular Einstein radius of the combined system.
    pub fn einstein_radius(&self) -> f64 {
        self.total_mass().sqrt()
    }

    /// Mass fraction of the primary component.
    pub fn primary_fraction(&self) -> f64 {
        self.m1 / self.total_mass()
    }
}

/// Settings shared by the whole per-sample pipeline. Callers construct one of
/// these per model evaluation; there are no implicit per-call fallbacks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolveSettings {
    /// Residual tolerance for accepting a polynomial root as a lensed image.
    /// Applies in the rescaled frame when `rescale` is on.
    pub tolerance: f64,
    /// Recenter and rescale each sample into a unit box before building the
    /// polynomial. Leave on unless inputs are already well-conditioned.
    pub rescale: bool,
    /// Treat a validated image count outside {3, 5} as a sample-level
    /// failure (all-NaN output) instead of keeping the passing roots.
    pub strict: bool,
    /// Iteration cap for the root finder.
    pub max_iterations: u32,
    /// Relative step size below which the root iteration is converged.
    pub root_epsilon: f64,
    /// Positions spanning less than this are rejected as degenerate
    /// geometry before any coefficient is built.
    pub spread_floor: f64,
}

impl Default for SolveSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            rescale: true,
            strict: false,
            max_iterations: 100,
            root_epsilon: 1e-13,
            spread_floor: 1e-12,
        }
    }
}

/// Per-sample outcome carried alongside the output arrays so batch callers
/// can make pass/fail decisions without parsing logs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SampleStatus {
    /// The validated image count was 3 or 5, as the even-image theorem
    /// requires for a binary lens.
    Ok,
    /// Source and lens positions were coincident (or non-finite); no frame
    /// could be built.
    DegenerateGeometry,
    /// The root finder did not converge for this sample.
    NoConvergence,
    /// Validation left an image count outside {3, 5}. The passing roots are
    /// kept unless strict mode is on.
    AnomalousCount(usize),
}

impl SampleStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, SampleStatus::Ok)
    }
}

/// Recoverable per-sample failures. These never cross the batch boundary as
/// errors; they are mapped to a [`SampleStatus`] and an all-NaN output row.
#[derive(Debug, Clone, Copy, Error)]
pub enum SampleError {
    #[error("degenerate lens geometry: positions span {0:e}, below the configured floor")]
    DegenerateGeometry(f64),
    #[error("root finder did not converge within {0} iterations")]
    NoConvergence(u32),
    #[error("lens polynomial degenerates to a constant")]
    DegeneratePolynomial,
}

impl SampleError {
    pub fn status(&self) -> SampleStatus {
        match self {
            SampleError::DegenerateGeometry(_) => SampleStatus::DegenerateGeometry,
            SampleError::NoConvergence(_) => SampleStatus::NoConvergence,
            SampleError::DegeneratePolynomial => SampleStatus::DegenerateGeometry,
        }
    }
}

/// Coefficients of the image-position polynomial, ascending in power:
/// `coefficients[k]` multiplies `z^k`.
pub type Coefficients = [Complex<f64>; 6];

/// The five polynomial roots of one epoch, tagged by whether each satisfies
/// the original (non-polynomial) lens equation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RootSet {
    pub roots: [Complex<f64>; MAX_IMAGES],
    pub valid: [bool; MAX_IMAGES],
}

impl RootSet {
    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }
}

/// Validated images of one epoch: positions in the input frame and
/// per-image amplifications, NaN-filled in invalid slots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImageSet {
    pub positions: [Complex<f64>; MAX_IMAGES],
    pub amplifications: [f64; MAX_IMAGES],
    pub status: SampleStatus,
}

impl ImageSet {
    /// An all-NaN set for a sample that produced no usable images.
    pub fn invalid(status: SampleStatus) -> Self {
        Self {
            positions: [NAN_POSITION; MAX_IMAGES],
            amplifications: [f64::NAN; MAX_IMAGES],
            status,
        }
    }

    pub fn valid_count(&self) -> usize {
        self.amplifications.iter().filter(|a| a.is_finite()).count()
    }

    /// Sum of the finite per-image amplifications. NaN when no image is
    /// usable, so a failed sample never contributes silently to a flux sum.
    pub fn total_amplification(&self) -> f64 {
        let mut total = 0.0;
        let mut any = false;
        for amp in &self.amplifications {
            if amp.is_finite() {
                total += amp;
                any = true;
            }
        }
        if any {
            total
        } else {
            f64::NAN
        }
    }

    /// Amplification-weighted mean of the usable image positions. NaN when
    /// no image is usable.
    pub fn centroid(&self) -> Complex<f64> {
        let mut weighted = Complex::new(0.0, 0.0);
        let mut total = 0.0;
        for k in 0..MAX_IMAGES {
            let amp = self.amplifications[k];
            let pos = self.positions[k];
            if amp.is_finite() && pos.re.is_finite() && pos.im.is_finite() {
                weighted += amp * pos;
                total += amp;
            }
        }
        if total > 0.0 {
            weighted / total
        } else {
            NAN_POSITION
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lens_system_derived_quantities() {
        let lenses = LensSystem::new(0.3, 0.1);
        assert!((lenses.total_mass() - 0.4).abs() < 1e-15);
        assert!((lenses.einstein_radius() - 0.4_f64.sqrt()).abs() < 1e-15);
        assert!((lenses.primary_fraction() - 0.75).abs() < 1e-15);
    }

    #[test]
    fn invalid_image_set_is_all_nan() {
        let set = ImageSet::invalid(SampleStatus::NoConvergence);
        assert_eq!(set.valid_count(), 0);
        assert!(set.total_amplification().is_nan());
        assert!(set.centroid().re.is_nan());
        assert_eq!(set.status, SampleStatus::NoConvergence);
    }

    #[test]
    fn masked_reductions_skip_non_finite_entries() {
        let mut set = ImageSet::invalid(SampleStatus::Ok);
        set.positions[0] = Complex::new(1.0, 0.0);
        set.amplifications[0] = 2.0;
        set.positions[1] = Complex::new(3.0, 0.0);
        set.amplifications[1] = f64::INFINITY;
        set.positions[2] = Complex::new(-1.0, 0.0);
        set.amplifications[2] = 1.0;

        assert_eq!(set.valid_count(), 2);
        assert!((set.total_amplification() - 3.0).abs() < 1e-15);
        // Centroid weights: 2 at +1 and 1 at -1.
        let centroid = set.centroid();
        assert!((centroid.re - 1.0 / 3.0).abs() < 1e-15);
        assert!(centroid.im.abs() < 1e-15);
    }

    #[test]
    fn sample_error_maps_to_status() {
        assert_eq!(
            SampleError::DegenerateGeometry(0.0).status(),
            SampleStatus::DegenerateGeometry
        );
        assert_eq!(
            SampleError::NoConvergence(64).status(),
            SampleStatus::NoConvergence
        );
        assert!(!SampleStatus::AnomalousCount(4).is_ok());
        assert!(SampleStatus::Ok.is_ok());
    }
}
