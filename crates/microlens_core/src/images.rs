//! Per-sample image solving: condition, build the quintic, find roots,
//! validate, amplify.
//!
//! Every candidate root of the polynomial is checked against the original
//! lens equation before it counts as an image; the polynomial picks up
//! spurious roots wherever the source is outside a caustic. A binary lens
//! produces 3 images outside a caustic and 5 inside, so any other validated
//! count marks the sample as anomalous. Failures never escape as errors:
//! one bad epoch yields one NaN output row and a status, nothing more.

use crate::{
    lens,
    rescale::{rescale, RescaledFrame},
    roots,
    types::{
        ImageSet, LensSystem, RootSet, SampleError, SampleStatus, SolveSettings, TimeSample,
        MAX_IMAGES,
    },
};
use log::warn;
use num_complex::Complex;

/// Solve one epoch for its lensed images.
///
/// The output is total: recoverable failures (degenerate geometry, root
/// finder stalls) come back as an all-NaN [`ImageSet`] tagged with the
/// reason, so batch callers keep a one-to-one row correspondence.
pub fn solve_images(sample: &TimeSample, lenses: &LensSystem, settings: &SolveSettings) -> ImageSet {
    match solve_frame(sample, lenses, settings) {
        Ok(set) => set,
        Err(err) => {
            warn!("sample at t = {} dropped: {err}", sample.t);
            ImageSet::invalid(err.status())
        }
    }
}

fn solve_frame(
    sample: &TimeSample,
    lenses: &LensSystem,
    settings: &SolveSettings,
) -> Result<ImageSet, SampleError> {
    let frame = if settings.rescale {
        rescale(
            sample.w,
            sample.z1,
            sample.z2,
            lenses.m1,
            lenses.m2,
            settings.spread_floor,
        )?
    } else {
        RescaledFrame::identity(sample.w, sample.z1, sample.z2, lenses.m1, lenses.m2)
    };

    let coeffs = lens::coefficients(frame.w, frame.z1, frame.z2, frame.m1, frame.m2);
    let raw = roots::quintic_roots(&coeffs, settings.max_iterations, settings.root_epsilon)?;
    let candidates = validate_roots(
        &raw,
        frame.w,
        frame.z1,
        frame.z2,
        frame.m1,
        frame.m2,
        settings.tolerance,
    );

    let count = candidates.valid_count();
    let status = if count == 3 || count == 5 {
        SampleStatus::Ok
    } else {
        warn!(
            "validated image count {count} outside {{3, 5}} at t = {}",
            sample.t
        );
        SampleStatus::AnomalousCount(count)
    };
    if settings.strict && !status.is_ok() {
        return Ok(ImageSet::invalid(status));
    }

    // Amplifications are invariant under the similarity transform, so they
    // can be taken in the conditioned frame; positions map back through it.
    let mut set = ImageSet::invalid(status);
    for k in 0..MAX_IMAGES {
        if candidates.valid[k] {
            let root = candidates.roots[k];
            set.positions[k] = frame.restore(root);
            set.amplifications[k] =
                lens::amplification(root, frame.z1, frame.z2, frame.m1, frame.m2);
        }
    }
    Ok(set)
}

/// Tag each candidate root by whether it solves the lens equation to within
/// `tolerance`. The acceptance test is written in positive form so that NaN
/// residuals (unfilled degree-fallback slots, diverged roots) always fail.
pub fn validate_roots(
    candidates: &[Complex<f64>; MAX_IMAGES],
    w: Complex<f64>,
    z1: Complex<f64>,
    z2: Complex<f64>,
    m1: f64,
    m2: f64,
    tolerance: f64,
) -> RootSet {
    let mut valid = [false; MAX_IMAGES];
    for k in 0..MAX_IMAGES {
        let r = lens::residual(candidates[k], w, z1, z2, m1, m2).norm();
        valid[k] = r <= tolerance;
    }
    RootSet {
        roots: *candidates,
        valid,
    }
}
