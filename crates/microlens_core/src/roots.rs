//! Complex polynomial root finding for the lens quintic.
//!
//! The image-position polynomial has complex coefficients and degree at most
//! five, so roots are found with the Aberth–Ehrlich simultaneous iteration:
//! all roots are refined together, each Newton step damped by the repulsion
//! of the other current estimates. There is no deflation step, so no
//! accumulated round-off between roots. Simple roots converge cubically;
//! multiple or tightly clustered roots settle into a round-off limit cycle
//! that never meets the step criterion, so when the iteration cap runs out
//! each estimate is judged by its own residual: estimates at the round-off
//! level of the polynomial's terms are kept, the rest become NaN for the
//! downstream validator to skip.

use crate::types::{Coefficients, SampleError, MAX_IMAGES, NAN_POSITION};
use num_complex::Complex;
use num_traits::Zero;
use std::f64::consts::TAU;

/// Trailing coefficients within this factor of the largest coefficient
/// magnitude are treated as zero when picking the effective degree.
const LEADING_FLOOR: f64 = 1e-13;

/// After a stalled iteration, an estimate is kept only if its residual is
/// below this fraction of the summed term magnitudes at that point.
const RESIDUAL_FLOOR: f64 = 1e-10;

/// Evaluate the polynomial and its derivative at `z` by Horner's scheme.
/// Coefficients ascend in power.
fn eval_with_derivative(coeffs: &[Complex<f64>], z: Complex<f64>) -> (Complex<f64>, Complex<f64>) {
    let mut p = Complex::zero();
    let mut dp = Complex::zero();
    for &c in coeffs.iter().rev() {
        dp = dp * z + p;
        p = p * z + c;
    }
    (p, dp)
}

/// Magnitude sum of the polynomial's terms at `z`, the scale against which
/// a residual counts as round-off.
fn term_scale(coeffs: &[Complex<f64>], z: Complex<f64>) -> f64 {
    let r = z.norm();
    let mut sum = 0.0;
    for &c in coeffs.iter().rev() {
        sum = sum * r + c.norm();
    }
    sum
}

/// Fujiwara's bound on the magnitude of any root, used to place the initial
/// estimates on an enclosing circle.
fn fujiwara_radius(coeffs: &[Complex<f64>]) -> f64 {
    let degree = coeffs.len() - 1;
    let lead = coeffs[degree].norm();
    let mut radius = 0.0_f64;
    for k in 0..degree {
        let bound = (coeffs[k].norm() / lead).powf(1.0 / (degree - k) as f64);
        radius = radius.max(bound);
    }
    2.0 * radius
}

fn aberth(
    coeffs: &[Complex<f64>],
    max_iterations: u32,
    epsilon: f64,
) -> Result<Vec<Complex<f64>>, SampleError> {
    let degree = coeffs.len() - 1;
    let lead = coeffs[degree];
    if degree == 1 {
        return Ok(vec![-coeffs[0] / lead]);
    }

    // Start on a circle around the root centroid, angularly offset so no
    // estimate begins on a coordinate axis of a symmetric configuration.
    let center = -coeffs[degree - 1] / (degree as f64 * lead);
    let radius = fujiwara_radius(coeffs).max(1e-9);
    let mut roots: Vec<Complex<f64>> = (0..degree)
        .map(|k| {
            let angle = TAU * k as f64 / degree as f64 + 0.35;
            center + Complex::from_polar(radius, angle)
        })
        .collect();

    for _ in 0..max_iterations {
        let mut converged = true;
        for k in 0..degree {
            let (p, dp) = eval_with_derivative(coeffs, roots[k]);
            if p.norm() == 0.0 {
                continue;
            }
            if dp.norm() == 0.0 {
                // Stationary point of the polynomial; step off it.
                roots[k] += Complex::new(epsilon.sqrt(), epsilon.sqrt());
                converged = false;
                continue;
            }
            let newton = p / dp;
            let mut repulsion = Complex::zero();
            for j in 0..degree {
                if j != k {
                    repulsion += (roots[k] - roots[j]).inv();
                }
            }
            let denom = Complex::new(1.0, 0.0) - newton * repulsion;
            let step = if denom.norm() == 0.0 { newton } else { newton / denom };
            roots[k] -= step;
            if step.norm() > epsilon * (1.0 + roots[k].norm()) {
                converged = false;
            }
        }
        if converged && roots.iter().all(|r| r.is_finite()) {
            return Ok(roots);
        }
    }

    // The step criterion can cycle at round-off level with the estimates
    // already as accurate as the polynomial's conditioning allows. Keep
    // each estimate whose residual is at that level and NaN the rest; the
    // lens-equation validator rejects anything still wrong.
    let mut kept = 0usize;
    for root in roots.iter_mut() {
        let accepted = root.is_finite() && {
            let (p, _) = eval_with_derivative(coeffs, *root);
            p.norm() <= RESIDUAL_FLOOR * term_scale(coeffs, *root)
        };
        if accepted {
            kept += 1;
        } else {
            *root = NAN_POSITION;
        }
    }
    if kept == 0 {
        return Err(SampleError::NoConvergence(max_iterations));
    }
    Ok(roots)
}

/// Roots of a complex-coefficient polynomial given ascending coefficients.
///
/// The effective degree is the highest coefficient whose magnitude exceeds a
/// relative floor, so a vanishing leading term falls back to the reduced
/// polynomial instead of producing a spurious far-field root. A polynomial
/// that reduces to a constant has no roots to report and is an error.
pub fn polynomial_roots(
    coeffs: &[Complex<f64>],
    max_iterations: u32,
    epsilon: f64,
) -> Result<Vec<Complex<f64>>, SampleError> {
    let max_norm = coeffs.iter().map(|c| c.norm()).fold(0.0_f64, f64::max);
    if !(max_norm > 0.0) {
        return Err(SampleError::DegeneratePolynomial);
    }
    let mut degree = coeffs.len() - 1;
    while degree > 0 && coeffs[degree].norm() <= max_norm * LEADING_FLOOR {
        degree -= 1;
    }
    if degree == 0 {
        return Err(SampleError::DegeneratePolynomial);
    }
    aberth(&coeffs[..=degree], max_iterations, epsilon)
}

/// Roots of the lens quintic in fixed-size form: always `MAX_IMAGES` slots,
/// NaN-filled past the effective degree.
pub fn quintic_roots(
    coeffs: &Coefficients,
    max_iterations: u32,
    epsilon: f64,
) -> Result<[Complex<f64>; MAX_IMAGES], SampleError> {
    let found = polynomial_roots(coeffs, max_iterations, epsilon)?;
    let mut out = [NAN_POSITION; MAX_IMAGES];
    for (slot, root) in out.iter_mut().zip(found) {
        *slot = root;
    }
    Ok(out)
}
