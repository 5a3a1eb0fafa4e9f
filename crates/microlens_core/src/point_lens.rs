//! Closed-form single point-mass lens quantities, in Einstein-radius
//! units: `u` is the source-lens separation over the Einstein radius.

/// Total magnification of the two point-lens images. Diverges as `u`
/// approaches zero, where the source sits on the point caustic.
pub fn amplification(u: f64) -> f64 {
    let u2 = u * u;
    (u2 + 2.0) / (u * (u2 + 4.0).sqrt())
}

/// Shift of the combined image centroid away from the unlensed source, in
/// Einstein radii, directed along the lens-to-source axis. Largest at
/// `u = sqrt(2)`, where it reaches `sqrt(2)/4`.
pub fn centroid_shift(u: f64) -> f64 {
    u / (u * u + 2.0)
}
