//! Observable-level model: photometry and astrometry on top of the image
//! solver.
//!
//! A model couples a trajectory provider with a lens system and per-filter
//! photometric parameters. Flux blending follows the usual survey
//! convention: `b_sff` is the source's share of the baseline flux, and the
//! blend light is assumed co-located with the unlensed source when diluting
//! the astrometric signal.

use crate::{
    batch::{self, BatchSolution},
    trajectory::Trajectory,
    types::{LensSystem, SolveSettings},
};
use anyhow::{bail, Result};
use log::warn;
use nalgebra::Vector2;
use num_complex::Complex;
use serde::{Deserialize, Serialize};

/// Photometric parameters of one observing filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FilterParams {
    /// Unlensed source magnitude (instrumental zero point of 0).
    pub mag_src: f64,
    /// Source flux fraction of the baseline, `f_src / (f_src + f_blend)`.
    /// Values above 1 encode negative blend flux, which fitting codes allow.
    pub b_sff: f64,
}

/// Linear flux for a magnitude with a zero point of 0.
pub fn flux_from_mag(mag: f64) -> f64 {
    10f64.powf(-0.4 * mag)
}

/// Magnitude for a linear flux; NaN for non-positive or non-finite flux.
pub fn mag_from_flux(flux: f64) -> f64 {
    if flux > 0.0 && flux.is_finite() {
        -2.5 * flux.log10()
    } else {
        f64::NAN
    }
}

/// A binary-lens event model over some trajectory provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryLensModel<T> {
    pub trajectory: T,
    pub lenses: LensSystem,
    pub filters: Vec<FilterParams>,
    pub settings: SolveSettings,
}

impl<T: Trajectory> BinaryLensModel<T> {
    pub fn new(trajectory: T, lenses: LensSystem, filters: Vec<FilterParams>) -> Self {
        Self {
            trajectory,
            lenses,
            filters,
            settings: SolveSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SolveSettings) -> Self {
        self.settings = settings;
        self
    }

    fn filter(&self, filt: usize) -> Result<FilterParams> {
        let params = match self.filters.get(filt) {
            Some(params) => *params,
            None => bail!(
                "Filter index {filt} out of range ({} filters configured).",
                self.filters.len()
            ),
        };
        if !params.b_sff.is_finite() || params.b_sff <= 0.0 {
            bail!("Source flux fraction must be positive and finite (filter {filt}).");
        }
        if !params.mag_src.is_finite() {
            bail!("Source magnitude must be finite (filter {filt}).");
        }
        Ok(params)
    }

    /// Source and lens component positions for the given epochs, as complex
    /// sky coordinates.
    pub fn complex_positions(
        &self,
        times: &[f64],
    ) -> (Vec<Complex<f64>>, Vec<Complex<f64>>, Vec<Complex<f64>>) {
        let mut w = Vec::with_capacity(times.len());
        let mut z1 = Vec::with_capacity(times.len());
        let mut z2 = Vec::with_capacity(times.len());
        for sample in self.trajectory.samples(times) {
            w.push(sample.w);
            z1.push(sample.z1);
            z2.push(sample.z2);
        }
        (w, z1, z2)
    }

    /// Image positions and amplifications for the given epochs.
    pub fn image_arrays(&self, times: &[f64]) -> Result<BatchSolution> {
        batch::solve_batch(&self.trajectory.samples(times), &self.lenses, &self.settings)
    }

    /// Blended apparent magnitude per epoch. Epochs whose image solve
    /// failed carry NaN.
    pub fn photometry(&self, times: &[f64], filt: usize) -> Result<Vec<f64>> {
        let params = self.filter(filt)?;
        let solution = self.image_arrays(times)?;

        let f_src = flux_from_mag(params.mag_src);
        let f_blend = f_src * (1.0 - params.b_sff) / params.b_sff;
        let mut mags = Vec::with_capacity(times.len());
        let mut bad = 0usize;
        for amplification in solution.total_amplifications() {
            let mag = mag_from_flux(f_src * amplification + f_blend);
            if mag.is_nan() {
                bad += 1;
            }
            mags.push(mag);
        }
        if bad > 0 {
            warn!("{bad} of {} epochs produced no usable flux", times.len());
        }
        Ok(mags)
    }

    /// Observed (blend-diluted) position of the lensed light per epoch, in
    /// the sky frame. Epochs whose image solve failed carry NaN.
    pub fn astrometry(&self, times: &[f64], filt: usize) -> Result<Vec<Vector2<f64>>> {
        let params = self.filter(filt)?;
        let samples = self.trajectory.samples(times);
        let solution = batch::solve_batch(&samples, &self.lenses, &self.settings)?;

        let blend_ratio = (1.0 - params.b_sff) / params.b_sff;
        let totals = solution.total_amplifications();
        let centroids = solution.centroids();
        let mut out = Vec::with_capacity(samples.len());
        for i in 0..samples.len() {
            let amplification = totals[i];
            let centroid = centroids[i];
            if !amplification.is_finite() || !centroid.re.is_finite() || !centroid.im.is_finite() {
                out.push(Vector2::new(f64::NAN, f64::NAN));
                continue;
            }
            let observed = (amplification * centroid + blend_ratio * samples[i].w)
                / (amplification + blend_ratio);
            out.push(Vector2::new(observed.re, observed.im));
        }
        Ok(out)
    }

    /// Where the source would appear without lensing, with the same time
    /// sampling as [`BinaryLensModel::astrometry`].
    pub fn astrometry_unlensed(&self, times: &[f64]) -> Vec<Vector2<f64>> {
        self.trajectory
            .samples(times)
            .iter()
            .map(|sample| Vector2::new(sample.w.re, sample.w.im))
            .collect()
    }
}
