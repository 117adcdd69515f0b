//! Timing functions for keyframe playback
//!
//! Sampled spring curves are played back with [`Easing::Linear`]; the named
//! curves exist for hosts that animate between hand-written keyframes.

/// A CSS-compatible timing function
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Easing {
    #[default]
    Linear,
    Ease,
    EaseIn,
    EaseOut,
    EaseInOut,
    /// Control points `(x1, y1, x2, y2)`; x values are clamped to [0, 1]
    CubicBezier(f64, f64, f64, f64),
}

impl Easing {
    /// Control points of the equivalent cubic bezier, or `None` for linear
    pub fn control_points(&self) -> Option<(f64, f64, f64, f64)> {
        match *self {
            Easing::Linear => None,
            Easing::Ease => Some((0.25, 0.1, 0.25, 1.0)),
            Easing::EaseIn => Some((0.42, 0.0, 1.0, 1.0)),
            Easing::EaseOut => Some((0.0, 0.0, 0.58, 1.0)),
            Easing::EaseInOut => Some((0.42, 0.0, 0.58, 1.0)),
            Easing::CubicBezier(x1, y1, x2, y2) => {
                Some((x1.clamp(0.0, 1.0), y1, x2.clamp(0.0, 1.0), y2))
            }
        }
    }

    /// Map linear progress in [0, 1] to eased progress
    ///
    /// Endpoints are exact; progress outside [0, 1] is clamped.
    pub fn apply(&self, progress: f64) -> f64 {
        if progress <= 0.0 {
            return 0.0;
        }
        if progress >= 1.0 {
            return 1.0;
        }
        match self.control_points() {
            None => progress,
            Some((x1, y1, x2, y2)) => {
                let p = solve_parameter(progress, x1, x2);
                bezier(p, y1, y2)
            }
        }
    }

    /// CSS `<easing-function>` text
    pub fn to_css(&self) -> String {
        match *self {
            Easing::Linear => "linear".to_string(),
            Easing::Ease => "ease".to_string(),
            Easing::EaseIn => "ease-in".to_string(),
            Easing::EaseOut => "ease-out".to_string(),
            Easing::EaseInOut => "ease-in-out".to_string(),
            Easing::CubicBezier(x1, y1, x2, y2) => {
                format!("cubic-bezier({}, {}, {}, {})", x1, y1, x2, y2)
            }
        }
    }
}

const SOLVE_EPSILON: f64 = 1e-7;

/// Find the curve parameter whose x coordinate is `x`
///
/// Newton-Raphson first; bisection when the slope gets too flat to trust.
fn solve_parameter(x: f64, x1: f64, x2: f64) -> f64 {
    let mut p = x;
    for _ in 0..8 {
        let err = bezier(p, x1, x2) - x;
        if err.abs() < SOLVE_EPSILON {
            return p;
        }
        let slope = bezier_slope(p, x1, x2);
        if slope.abs() < SOLVE_EPSILON {
            break;
        }
        p -= err / slope;
    }

    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    p = x;
    for _ in 0..32 {
        let err = bezier(p, x1, x2) - x;
        if err.abs() < SOLVE_EPSILON {
            break;
        }
        if err < 0.0 {
            lo = p;
        } else {
            hi = p;
        }
        p = (lo + hi) / 2.0;
    }
    p
}

/// One coordinate of a unit cubic bezier with endpoints 0 and 1
#[inline]
fn bezier(t: f64, c1: f64, c2: f64) -> f64 {
    let a = 1.0 - 3.0 * c2 + 3.0 * c1;
    let b = 3.0 * c2 - 6.0 * c1;
    let c = 3.0 * c1;
    ((a * t + b) * t + c) * t
}

#[inline]
fn bezier_slope(t: f64, c1: f64, c2: f64) -> f64 {
    let a = 1.0 - 3.0 * c2 + 3.0 * c1;
    let b = 3.0 * c2 - 6.0 * c1;
    let c = 3.0 * c1;
    (3.0 * a * t + 2.0 * b) * t + c
}
