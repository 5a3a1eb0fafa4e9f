//! Parallel batch evaluation over many epochs. Output rows line up
//! one-to-one with input samples; failed epochs carry NaN rows and a
//! status instead of shrinking the output.

use crate::{
    images,
    types::{ImageSet, LensSystem, SampleStatus, SolveSettings, TimeSample, MAX_IMAGES},
};
use anyhow::{bail, Result};
use num_complex::Complex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Image positions, amplifications and per-sample statuses for a batch of
/// epochs. Row `i` belongs to input sample `i`; invalid image slots are NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSolution {
    pub positions: Vec<[Complex<f64>; MAX_IMAGES]>,
    pub amplifications: Vec<[f64; MAX_IMAGES]>,
    pub status: Vec<SampleStatus>,
}

impl BatchSolution {
    fn from_image_sets(sets: Vec<ImageSet>) -> Self {
        let mut positions = Vec::with_capacity(sets.len());
        let mut amplifications = Vec::with_capacity(sets.len());
        let mut status = Vec::with_capacity(sets.len());
        for set in sets {
            positions.push(set.positions);
            amplifications.push(set.amplifications);
            status.push(set.status);
        }
        Self {
            positions,
            amplifications,
            status,
        }
    }

    pub fn len(&self) -> usize {
        self.status.len()
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_empty()
    }

    fn row(&self, i: usize) -> ImageSet {
        ImageSet {
            positions: self.positions[i],
            amplifications: self.amplifications[i],
            status: self.status[i],
        }
    }

    /// Per-epoch sums of the finite image amplifications; NaN where an
    /// epoch produced no usable image.
    pub fn total_amplifications(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.row(i).total_amplification())
            .collect()
    }

    /// Per-epoch amplification-weighted image centroids; NaN where an epoch
    /// produced no usable image.
    pub fn centroids(&self) -> Vec<Complex<f64>> {
        (0..self.len()).map(|i| self.row(i).centroid()).collect()
    }

    /// Per-epoch validated image counts.
    pub fn valid_counts(&self) -> Vec<usize> {
        (0..self.len()).map(|i| self.row(i).valid_count()).collect()
    }
}

/// Bundle parallel position arrays into per-epoch samples. Length mismatch
/// between the arrays is a caller bug and fails the whole call.
pub fn samples_from_arrays(
    t: &[f64],
    w: &[Complex<f64>],
    z1: &[Complex<f64>],
    z2: &[Complex<f64>],
) -> Result<Vec<TimeSample>> {
    if w.len() != t.len() || z1.len() != t.len() || z2.len() != t.len() {
        bail!(
            "Position arrays must match the time array length ({} epochs, got {}, {} and {}).",
            t.len(),
            w.len(),
            z1.len(),
            z2.len()
        );
    }
    Ok((0..t.len())
        .map(|i| TimeSample {
            t: t[i],
            w: w[i],
            z1: z1[i],
            z2: z2[i],
        })
        .collect())
}

/// Solve every epoch of a batch.
///
/// Settings and lens masses are validated once here; per-epoch problems
/// never fail the batch. Samples are solved in parallel and results land in
/// input order.
pub fn solve_batch(
    samples: &[TimeSample],
    lenses: &LensSystem,
    settings: &SolveSettings,
) -> Result<BatchSolution> {
    if !lenses.m1.is_finite() || !lenses.m2.is_finite() || lenses.m1 < 0.0 || lenses.m2 < 0.0 {
        bail!("Lens mass terms must be finite and non-negative.");
    }
    if lenses.total_mass() == 0.0 {
        bail!("Lens system must have positive total mass.");
    }
    if !(settings.tolerance > 0.0) {
        bail!("Residual tolerance must be positive.");
    }
    if settings.max_iterations == 0 {
        bail!("Root finder needs at least one iteration.");
    }
    if !(settings.root_epsilon > 0.0) {
        bail!("Root step epsilon must be positive.");
    }
    if !(settings.spread_floor >= 0.0) {
        bail!("Spread floor must be non-negative.");
    }

    let sets: Vec<ImageSet> = samples
        .par_iter()
        .map(|sample| images::solve_images(sample, lenses, settings))
        .collect();
    Ok(BatchSolution::from_image_sets(sets))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resonant() -> (LensSystem, Complex<f64>, Complex<f64>) {
        (
            LensSystem::new(0.2025, 0.2025),
            Complex::new(-0.45, 0.0),
            Complex::new(0.45, 0.0),
        )
    }

    #[test]
    fn rows_follow_input_order() {
        let (lenses, z1, z2) = resonant();
        let settings = SolveSettings::default();
        let samples = vec![
            TimeSample {
                t: 0.0,
                w: Complex::new(0.1, 0.0),
                z1,
                z2,
            },
            TimeSample {
                t: 1.0,
                w: Complex::new(0.5, 0.0),
                z1,
                z2,
            },
        ];

        let batch = solve_batch(&samples, &lenses, &settings).expect("batch should solve");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.valid_counts(), vec![5, 3]);

        // Each row must agree exactly with a standalone per-sample solve.
        let totals = batch.total_amplifications();
        for (i, sample) in samples.iter().enumerate() {
            let single = images::solve_images(sample, &lenses, &settings);
            assert!((totals[i] - single.total_amplification()).abs() < 1e-15);
            assert_eq!(batch.status[i], single.status);
        }
    }

    #[test]
    fn one_bad_sample_does_not_poison_the_batch() {
        let (lenses, z1, z2) = resonant();
        let p = Complex::new(0.3, 0.3);
        let samples = vec![
            TimeSample {
                t: 0.0,
                w: Complex::new(0.1, 0.0),
                z1,
                z2,
            },
            TimeSample {
                t: 1.0,
                w: p,
                z1: p,
                z2: p,
            },
            TimeSample {
                t: 2.0,
                w: Complex::new(0.5, 0.0),
                z1,
                z2,
            },
        ];

        let batch =
            solve_batch(&samples, &lenses, &SolveSettings::default()).expect("batch should solve");
        assert_eq!(batch.status[0], SampleStatus::Ok);
        assert_eq!(batch.status[1], SampleStatus::DegenerateGeometry);
        assert_eq!(batch.status[2], SampleStatus::Ok);

        let totals = batch.total_amplifications();
        assert!(totals[0].is_finite());
        assert!(totals[1].is_nan());
        assert!(totals[2].is_finite());

        let centroids = batch.centroids();
        assert!(centroids[0].re.is_finite());
        assert!(centroids[1].re.is_nan());
    }

    #[test]
    fn reductions_skip_non_finite_amplifications() {
        let batch = BatchSolution {
            positions: vec![[Complex::new(1.0, 0.0); MAX_IMAGES]],
            amplifications: vec![[2.0, f64::INFINITY, f64::NAN, 1.0, f64::NAN]],
            status: vec![SampleStatus::Ok],
        };
        let totals = batch.total_amplifications();
        assert!((totals[0] - 3.0).abs() < 1e-15);
    }

    #[test]
    fn empty_batch_is_allowed() {
        let (lenses, _, _) = resonant();
        let batch =
            solve_batch(&[], &lenses, &SolveSettings::default()).expect("empty batch should solve");
        assert!(batch.is_empty());
        assert!(batch.total_amplifications().is_empty());
    }

    #[test]
    fn contract_violations_fail_the_whole_call() {
        let (_, z1, z2) = resonant();
        let samples = vec![TimeSample {
            t: 0.0,
            w: Complex::new(0.1, 0.0),
            z1,
            z2,
        }];

        let err = solve_batch(
            &samples,
            &LensSystem::new(-0.1, 0.2),
            &SolveSettings::default(),
        )
        .expect_err("negative mass should be rejected");
        assert!(err.to_string().contains("non-negative"));

        let err = solve_batch(
            &samples,
            &LensSystem::new(0.2, 0.2),
            &SolveSettings {
                tolerance: 0.0,
                ..SolveSettings::default()
            },
        )
        .expect_err("zero tolerance should be rejected");
        assert!(err.to_string().contains("tolerance"));
    }

    #[test]
    fn mismatched_arrays_are_rejected() {
        let t = [0.0, 1.0];
        let w = [Complex::new(0.0, 0.0); 2];
        let z1 = [Complex::new(-0.5, 0.0); 2];
        let z2 = [Complex::new(0.5, 0.0); 1];
        let err = samples_from_arrays(&t, &w, &z1, &z2).expect_err("length mismatch");
        assert!(err.to_string().contains("match the time array"));

        let z2_ok = [Complex::new(0.5, 0.0); 2];
        let samples = samples_from_arrays(&t, &w, &z1, &z2_ok).expect("lengths match");
        assert_eq!(samples.len(), 2);
        assert!((samples[1].t - 1.0).abs() < 1e-15);
    }
}
