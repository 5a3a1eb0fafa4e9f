//! Critical curves and caustics of the binary lens.
//!
//! The critical curve is the image-plane locus where the Jacobian of the
//! lens mapping vanishes, `|m1/(z - z1)^2 + m2/(z - z2)^2| = 1`. Writing
//! the shear as a unit phasor `e^{i phi}` and clearing denominators gives a
//! quartic in `z` for each phase, so sweeping the phase traces the full
//! curve with four points per phase. Mapping each critical point through
//! the lens equation yields the caustic, the source-plane boundary between
//! the three- and five-image regions.

use crate::{
    lens, roots,
    types::{LensSystem, SolveSettings},
};
use anyhow::{bail, Context, Result};
use num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Sampled critical curve and its caustic, four points per phase sample.
/// Points are unordered across phases; plotting code can sort by branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CausticCurves {
    pub critical: Vec<Complex<f64>>,
    pub caustic: Vec<Complex<f64>>,
}

/// Trace the critical curve and caustic of a binary lens.
pub fn caustic_curves(
    lenses: &LensSystem,
    z1: Complex<f64>,
    z2: Complex<f64>,
    phases: usize,
    settings: &SolveSettings,
) -> Result<CausticCurves> {
    if phases == 0 {
        bail!("Caustic tracing needs at least one phase sample.");
    }
    if lenses.m1 < 0.0 || lenses.m2 < 0.0 || !(lenses.total_mass() > 0.0) {
        bail!("Lens mass terms must be non-negative with positive total mass.");
    }
    if (z1 - z2).norm() == 0.0 {
        bail!("Lens components must be separated to trace a binary caustic.");
    }

    let s = z1 + z2;
    let p = z1 * z2;
    let total = lenses.total_mass();
    let cm = lenses.m1 * z2 + lenses.m2 * z1;
    let sq = lenses.m1 * z2 * z2 + lenses.m2 * z1 * z1;

    let mut critical = Vec::with_capacity(4 * phases);
    let mut caustic = Vec::with_capacity(4 * phases);
    for k in 0..phases {
        let phi = TAU * k as f64 / phases as f64;
        let e = Complex::from_polar(1.0, phi);
        // (z - z1)^2 (z - z2)^2 = e * [m1 (z - z2)^2 + m2 (z - z1)^2],
        // expanded in ascending powers.
        let coeffs = [
            p * p - e * sq,
            -2.0 * s * p + 2.0 * e * cm,
            s * s + 2.0 * p - e * total,
            -2.0 * s,
            Complex::new(1.0, 0.0),
        ];
        let found = roots::polynomial_roots(&coeffs, settings.max_iterations, settings.root_epsilon)
            .with_context(|| format!("Critical-curve solve failed at phase {phi:.3}."))?;
        for root in found {
            critical.push(root);
            caustic.push(lens::source_position(root, z1, z2, lenses.m1, lenses.m2));
        }
    }
    Ok(CausticCurves { critical, caustic })
}
