//! Sky-frame trajectory providers.
//!
//! A trajectory turns an observation time into one [`TimeSample`]: source
//! position and the two lens component positions in a common sky frame.
//! Times are in days, positions in arcseconds, proper motions in
//! arcseconds per year. The solver itself never depends on how positions
//! were produced, so alternative providers (annual parallax here, satellite
//! ephemerides elsewhere) slot in through the same trait.

use crate::types::{LensSystem, TimeSample};
use nalgebra::Vector2;
use num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

pub const DAYS_PER_YEAR: f64 = 365.25;

/// Per-epoch geometry provider for the solver.
pub trait Trajectory {
    fn sample(&self, t: f64) -> TimeSample;

    fn samples(&self, times: &[f64]) -> Vec<TimeSample> {
        times.iter().map(|&t| self.sample(t)).collect()
    }
}

/// Rectilinear source and lens motion with a static binary axis.
///
/// The lens position and proper motion describe the barycenter; the two
/// components straddle it along the binary axis according to the primary's
/// mass fraction, so the heavier component sits closer to the barycenter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinearTrajectory {
    /// Reference epoch (days) at which the positions below apply.
    pub t0: f64,
    pub source_pos: Complex<f64>,
    pub source_pm: Complex<f64>,
    /// Barycenter position of the binary at `t0`.
    pub lens_pos: Complex<f64>,
    pub lens_pm: Complex<f64>,
    /// Component separation (arcsec).
    pub separation: f64,
    /// Position angle of the secondary as seen from the primary (radians).
    pub angle: f64,
    /// Mass fraction of the primary, `m1 / (m1 + m2)`.
    pub primary_fraction: f64,
}

impl LinearTrajectory {
    /// Take the primary's mass fraction from the lens system this
    /// trajectory will be solved with, so component placement and masses
    /// stay consistent.
    pub fn with_lens_fractions(mut self, lenses: &LensSystem) -> Self {
        self.primary_fraction = lenses.primary_fraction();
        self
    }
}

impl Trajectory for LinearTrajectory {
    fn sample(&self, t: f64) -> TimeSample {
        let dt = (t - self.t0) / DAYS_PER_YEAR;
        let barycenter = self.lens_pos + self.lens_pm * dt;
        let axis = Complex::from_polar(self.separation, self.angle);
        TimeSample {
            t,
            w: self.source_pos + self.source_pm * dt,
            z1: barycenter - axis * (1.0 - self.primary_fraction),
            z2: barycenter + axis * self.primary_fraction,
        }
    }
}

/// Unit-parallax displacement factors on the sky at a given time, in the
/// (east, north) basis of the target's ecliptic position.
pub trait SkyEphemeris {
    fn parallax_factors(&self, t: f64) -> Vector2<f64>;
}

/// First-order annual parallax from a circular, coplanar Earth orbit.
///
/// Good to the few-percent level of the parallax signal itself; fitting
/// codes that need full ephemeris accuracy can supply their own
/// [`SkyEphemeris`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CircularEarthOrbit {
    /// Ecliptic longitude of the target (radians).
    pub ecliptic_longitude: f64,
    /// Ecliptic latitude of the target (radians).
    pub ecliptic_latitude: f64,
    /// Epoch (days) of a northern vernal equinox.
    pub t_equinox: f64,
}

impl SkyEphemeris for CircularEarthOrbit {
    fn parallax_factors(&self, t: f64) -> Vector2<f64> {
        // At the equinox the Sun sits at zero ecliptic longitude, so the
        // Earth sits at pi.
        let earth_longitude = TAU * (t - self.t_equinox) / DAYS_PER_YEAR + PI;
        let phase = self.ecliptic_longitude - earth_longitude;
        Vector2::new(phase.sin(), self.ecliptic_latitude.sin() * phase.cos())
    }
}

/// Linear motion plus annual parallax wobble for source and lens.
///
/// Both lens components share the lens parallax; what the solver sees is
/// driven by the relative parallax between lens and source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParallaxTrajectory<E> {
    pub linear: LinearTrajectory,
    /// Annual parallax of the source (arcsec).
    pub source_parallax: f64,
    /// Annual parallax of the lens (arcsec).
    pub lens_parallax: f64,
    pub ephemeris: E,
}

impl<E: SkyEphemeris> Trajectory for ParallaxTrajectory<E> {
    fn sample(&self, t: f64) -> TimeSample {
        let base = self.linear.sample(t);
        let factors = self.ephemeris.parallax_factors(t);
        let shift = Complex::new(factors.x, factors.y);
        TimeSample {
            t: base.t,
            w: base.w + self.source_parallax * shift,
            z1: base.z1 + self.lens_parallax * shift,
            z2: base.z2 + self.lens_parallax * shift,
        }
    }
}
