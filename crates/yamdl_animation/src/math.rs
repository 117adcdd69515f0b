//! Mapping helpers for turning spring values into styles

/// Linear interpolation. `t` is not clamped, so overshooting springs map to
/// values past either end.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    t * (b - a) + a
}

/// Constrain `x` to `[lo, hi]`
///
/// Unlike [`f64::clamp`] this never panics: when `lo > hi` the result is `lo`.
pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    lo.max(x.min(hi))
}
