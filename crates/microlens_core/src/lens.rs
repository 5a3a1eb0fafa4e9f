//! The binary point-mass lens mapping and its image-position polynomial.
//!
//! With positions as complex numbers `z = x + iy`, a source at `w` and lens
//! components at `z1`, `z2` with mass terms `m1`, `m2` (squared Einstein
//! radii), an image position `z` satisfies
//!
//! ```text
//! w = z - m1 / conj(z - z1) - m2 / conj(z - z2)
//! ```
//!
//! Conjugating once and substituting the conjugate back turns this into a
//! degree-five polynomial in `z` whose roots are the candidate images. Not
//! every root of the polynomial solves the original equation, which is why
//! candidates are validated against [`residual`] downstream.

use crate::types::Coefficients;
use num_complex::Complex;

/// Forward lens mapping: where on the source plane the apparent position
/// `z` came from.
pub fn source_position(
    z: Complex<f64>,
    z1: Complex<f64>,
    z2: Complex<f64>,
    m1: f64,
    m2: f64,
) -> Complex<f64> {
    z - m1 / (z - z1).conj() - m2 / (z - z2).conj()
}

/// Lens-equation residual of a candidate image `z` for a source at `w`.
/// Exact images have zero residual; spurious polynomial roots do not.
pub fn residual(
    z: Complex<f64>,
    w: Complex<f64>,
    z1: Complex<f64>,
    z2: Complex<f64>,
    m1: f64,
    m2: f64,
) -> Complex<f64> {
    w - source_position(z, z1, z2, m1, m2)
}

/// Complex shear of the deflection at `z`: the derivative of the conjugated
/// mapping, `m1/(z - z1)^2 + m2/(z - z2)^2`.
pub fn shear(z: Complex<f64>, z1: Complex<f64>, z2: Complex<f64>, m1: f64, m2: f64) -> Complex<f64> {
    let d1 = z - z1;
    let d2 = z - z2;
    m1 / (d1 * d1) + m2 / (d2 * d2)
}

/// Jacobian determinant of the real 2-D lens mapping at `z`,
/// `1 - |shear|^2`. Negative for saddle images, zero on the critical curve.
pub fn jacobian(z: Complex<f64>, z1: Complex<f64>, z2: Complex<f64>, m1: f64, m2: f64) -> f64 {
    1.0 - shear(z, z1, z2, m1, m2).norm_sqr()
}

/// Point-source amplification of the image at `z`: the reciprocal of the
/// absolute Jacobian determinant. Unbounded as `z` approaches the critical
/// curve.
pub fn amplification(z: Complex<f64>, z1: Complex<f64>, z2: Complex<f64>, m1: f64, m2: f64) -> f64 {
    jacobian(z, z1, z2, m1, m2).abs().recip()
}

/// Coefficients of the image-position quintic, ascending in power.
///
/// Writing `pq(z) = (z - z1)(z - z2)` and eliminating `conj(z)` gives the
/// two conjugate-denominator quadratics
///
/// ```text
/// n1(z) = d1*z^2 + (S - d1*s)*z + (d1*p - cm)
/// n2(z) = d2*z^2 + (S - d2*s)*z + (d2*p - cm)
/// ```
///
/// with `d1 = conj(w - z1)`, `d2 = conj(w - z2)`, `s = z1 + z2`,
/// `p = z1*z2`, `S = m1 + m2` and `cm = m1*z2 + m2*z1`. The polynomial is
///
/// ```text
/// (w - z)*n1(z)*n2(z) + m1*pq(z)*n2(z) + m2*pq(z)*n1(z)
/// ```
///
/// The leading coefficient `-d1*d2` vanishes when the source sits exactly
/// on a lens component; the root finder falls back to the reduced degree in
/// that case.
pub fn coefficients(
    w: Complex<f64>,
    z1: Complex<f64>,
    z2: Complex<f64>,
    m1: f64,
    m2: f64,
) -> Coefficients {
    let d1 = (w - z1).conj();
    let d2 = (w - z2).conj();
    let s = z1 + z2;
    let p = z1 * z2;
    let total = m1 + m2;
    let cm = m1 * z2 + m2 * z1;

    let a = d1;
    let b = total - d1 * s;
    let c = d1 * p - cm;
    let e = d2;
    let f = total - d2 * s;
    let g = d2 * p - cm;

    // n1 * n2, ascending degree 0..=4.
    let q0 = c * g;
    let q1 = b * g + c * f;
    let q2 = a * g + b * f + c * e;
    let q3 = a * f + b * e;
    let q4 = a * e;

    // m1 * pq * n2 + m2 * pq * n1, with pq = z^2 - s*z + p.
    let r0 = m1 * (p * g) + m2 * (p * c);
    let r1 = m1 * (p * f - s * g) + m2 * (p * b - s * c);
    let r2 = m1 * (g - s * f + p * e) + m2 * (c - s * b + p * a);
    let r3 = m1 * (f - s * e) + m2 * (b - s * a);
    let r4 = m1 * e + m2 * a;

    [
        w * q0 + r0,
        w * q1 - q0 + r1,
        w * q2 - q1 + r2,
        w * q3 - q2 + r3,
        w * q4 - q3 + r4,
        -q4,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix2;

    fn evaluate(coeffs: &Coefficients, z: Complex<f64>) -> Complex<f64> {
        let mut p = Complex::new(0.0, 0.0);
        for &c in coeffs.iter().rev() {
            p = p * z + c;
        }
        p
    }

    #[test]
    fn coefficients_match_the_rational_form() {
        // The expanded coefficients must agree with the unexpanded products
        // at arbitrary evaluation points.
        let w = Complex::new(0.13, -0.21);
        let z1 = Complex::new(-0.42, 0.05);
        let z2 = Complex::new(0.55, -0.1);
        let (m1, m2) = (0.31, 0.08);
        let coeffs = coefficients(w, z1, z2, m1, m2);

        let d1 = (w - z1).conj();
        let d2 = (w - z2).conj();
        for &z in &[
            Complex::new(0.7, 0.3),
            Complex::new(-1.1, 0.9),
            Complex::new(0.05, -2.0),
            Complex::new(3.0, 0.0),
        ] {
            let pq = (z - z1) * (z - z2);
            let n1 = d1 * pq + m1 * (z - z2) + m2 * (z - z1);
            let n2 = d2 * pq + m1 * (z - z2) + m2 * (z - z1);
            let direct = (w - z) * n1 * n2 + m1 * pq * n2 + m2 * pq * n1;
            assert!(
                (evaluate(&coeffs, z) - direct).norm() < 1e-10,
                "expansion disagrees at z = {z}"
            );
        }
    }

    #[test]
    fn polynomial_vanishes_at_known_symmetric_images() {
        // Equal masses m at +/-a on the real axis with the source at the
        // origin: images at 0, +/-sqrt(a^2 + 2m) and +/-i*sqrt(2m - a^2).
        let a = 0.45;
        let m = 0.2025;
        let w = Complex::new(0.0, 0.0);
        let z1 = Complex::new(-a, 0.0);
        let z2 = Complex::new(a, 0.0);
        let coeffs = coefficients(w, z1, z2, m, m);

        let x = (a * a + 2.0 * m).sqrt();
        let y = (2.0 * m - a * a).sqrt();
        for &image in &[
            Complex::new(0.0, 0.0),
            Complex::new(x, 0.0),
            Complex::new(-x, 0.0),
            Complex::new(0.0, y),
            Complex::new(0.0, -y),
        ] {
            assert!(
                evaluate(&coeffs, image).norm() < 1e-10,
                "polynomial does not vanish at image {image}"
            );
            assert!(residual(image, w, z1, z2, m, m).norm() < 1e-10);
        }
    }

    #[test]
    fn polynomial_vanishes_at_single_lens_images() {
        // With m2 = 0 the quintic factors through the single-lens quadratic,
        // whose images are known in closed form for a lens at the origin.
        let m1 = 1.0;
        let u = 0.8;
        let w = Complex::new(u, 0.0);
        let z1 = Complex::new(0.0, 0.0);
        let z2 = Complex::new(3.0, 0.0);
        let coeffs = coefficients(w, z1, z2, m1, 0.0);

        let root = (u * u + 4.0).sqrt();
        for &image in &[
            Complex::new((u + root) / 2.0, 0.0),
            Complex::new((u - root) / 2.0, 0.0),
        ] {
            assert!(evaluate(&coeffs, image).norm() < 1e-10);
            assert!(residual(image, w, z1, z2, m1, 0.0).norm() < 1e-12);
        }
    }

    #[test]
    fn jacobian_matches_finite_differences() {
        let z1 = Complex::new(-0.45, 0.0);
        let z2 = Complex::new(0.45, 0.0);
        let (m1, m2) = (0.2025, 0.11);
        let z = Complex::new(0.3, 0.2);

        let map = |x: f64, y: f64| source_position(Complex::new(x, y), z1, z2, m1, m2);
        let h = 1e-6;
        let dx = (map(z.re + h, z.im) - map(z.re - h, z.im)) / (2.0 * h);
        let dy = (map(z.re, z.im + h) - map(z.re, z.im - h)) / (2.0 * h);
        let numeric = Matrix2::new(dx.re, dy.re, dx.im, dy.im).determinant();

        let analytic = jacobian(z, z1, z2, m1, m2);
        assert!(
            (numeric - analytic).abs() < 1e-6,
            "numeric {numeric} vs analytic {analytic}"
        );
        assert!((amplification(z, z1, z2, m1, m2) - analytic.abs().recip()).abs() < 1e-12);
    }

    #[test]
    fn shear_cancels_at_the_symmetric_vertical_image() {
        // At z = i*sqrt(2m - a^2) with y = a the two shear terms are equal
        // and opposite, so the image has unit amplification.
        let a = 0.45;
        let m: f64 = 0.2025;
        let z1 = Complex::new(-a, 0.0);
        let z2 = Complex::new(a, 0.0);
        let z = Complex::new(0.0, (2.0 * m - a * a).sqrt());

        assert!(shear(z, z1, z2, m, m).norm() < 1e-14);
        assert!((amplification(z, z1, z2, m, m) - 1.0).abs() < 1e-12);
    }
}
