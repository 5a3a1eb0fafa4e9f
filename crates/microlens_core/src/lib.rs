//! Binary point-mass gravitational lens solver.
//!
//! Given per-epoch source and lens component positions on the sky, the
//! crate forms the degree-five image polynomial of the binary lens, finds
//! its roots, validates them against the original lens equation and returns
//! image positions with their amplifications. On top of that sit batch
//! evaluation over many epochs, trajectory providers (linear motion, annual
//! parallax), caustic tracing and observable-level photometry and
//! astrometry with flux blending.
//!
//! Failures are per-epoch: a degenerate or non-convergent sample yields a
//! NaN output row tagged with a status, never a failed batch. Only misuse
//! of the API (negative masses, mismatched array lengths, bad filter
//! indices) is surfaced as an error.

pub mod batch;
pub mod caustics;
pub mod images;
pub mod lens;
pub mod model;
pub mod point_lens;
pub mod rescale;
pub mod roots;
pub mod trajectory;
pub mod types;
