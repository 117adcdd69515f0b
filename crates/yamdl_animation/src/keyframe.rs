//! Keyframe animations
//!
//! Playback of a list of sampled styles over a fixed duration. This is what a
//! native declarative timeline does with the keyframes the bridge produces;
//! [`TimelineTarget`](crate::TimelineTarget) uses it to provide the same
//! behavior in software.

use crate::easing::Easing;
use crate::timeline::AnimationTiming;

/// Values that can be linearly interpolated
pub trait Interpolate: Clone {
    /// Interpolate between self and other by factor t (0.0 to 1.0)
    fn lerp(&self, other: &Self, t: f64) -> Self;
}

impl Interpolate for f64 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        self + (other - self) * t
    }
}

impl Interpolate for f32 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        self + (other - self) * t as f32
    }
}

impl<const N: usize> Interpolate for [f64; N] {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        let mut out = *self;
        for (value, target) in out.iter_mut().zip(other) {
            *value = value.lerp(target, t);
        }
        out
    }
}

/// State outside the active interval
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FillMode {
    /// No style before start or after completion
    #[default]
    None,
    /// Hold the final keyframe after completion
    Forwards,
    /// Apply the first keyframe before playback starts
    Backwards,
    Both,
}

impl FillMode {
    pub fn fills_forwards(self) -> bool {
        matches!(self, FillMode::Forwards | FillMode::Both)
    }

    pub fn fills_backwards(self) -> bool {
        matches!(self, FillMode::Backwards | FillMode::Both)
    }
}

/// A value at a position in the animation
#[derive(Clone, Debug, PartialEq)]
pub struct Keyframe<S> {
    /// Position (0.0 to 1.0)
    pub offset: f64,
    pub value: S,
    /// Easing used when transitioning TO this keyframe
    pub easing: Easing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Playing,
    Finished,
}

/// A keyframe animation over a fixed duration
#[derive(Clone, Debug)]
pub struct KeyframeAnimation<S> {
    duration_ms: f64,
    keyframes: Vec<Keyframe<S>>,
    fill: FillMode,
    current_time: f64,
    phase: Phase,
}

impl<S: Interpolate> KeyframeAnimation<S> {
    pub fn new(duration_ms: f64, keyframes: Vec<Keyframe<S>>) -> Self {
        Self {
            duration_ms,
            keyframes,
            fill: FillMode::None,
            current_time: 0.0,
            phase: Phase::Idle,
        }
    }

    /// Spread `values` evenly over the timing's duration
    pub fn evenly_spaced(values: Vec<S>, timing: &AnimationTiming) -> Self {
        let last = values.len().saturating_sub(1).max(1) as f64;
        let keyframes = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| Keyframe {
                offset: i as f64 / last,
                value,
                easing: timing.easing,
            })
            .collect();
        Self::new(timing.duration_ms, keyframes).with_fill(timing.fill)
    }

    pub fn with_fill(mut self, fill: FillMode) -> Self {
        self.fill = fill;
        self
    }

    pub fn start(&mut self) {
        self.current_time = 0.0;
        self.phase = Phase::Playing;
    }

    pub fn stop(&mut self) {
        self.phase = Phase::Idle;
    }

    pub fn is_playing(&self) -> bool {
        self.phase == Phase::Playing
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn fill(&self) -> FillMode {
        self.fill
    }

    pub fn keyframes(&self) -> &[Keyframe<S>] {
        &self.keyframes
    }

    /// Progress through the active interval (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.duration_ms <= 0.0 {
            return if self.phase == Phase::Idle { 0.0 } else { 1.0 };
        }
        (self.current_time / self.duration_ms).clamp(0.0, 1.0)
    }

    /// Advance by `dt_ms` milliseconds
    ///
    /// Returns true on the tick that completes the animation.
    pub fn tick(&mut self, dt_ms: f64) -> bool {
        if self.phase != Phase::Playing {
            return false;
        }

        self.current_time += dt_ms;
        if self.current_time >= self.duration_ms {
            self.current_time = self.duration_ms;
            self.phase = Phase::Finished;
            return true;
        }
        false
    }

    /// The style in effect right now, honoring the fill mode
    pub fn current(&self) -> Option<S> {
        match self.phase {
            Phase::Playing => self.sample_at(self.progress()),
            Phase::Idle if self.fill.fills_backwards() => {
                self.keyframes.first().map(|kf| kf.value.clone())
            }
            Phase::Finished if self.fill.fills_forwards() => {
                self.keyframes.last().map(|kf| kf.value.clone())
            }
            _ => None,
        }
    }

    /// Sample at a given progress (0.0 to 1.0), ignoring the play state
    pub fn sample_at(&self, progress: f64) -> Option<S> {
        let first = self.keyframes.first()?;
        let progress = progress.clamp(0.0, 1.0);

        let mut prev = first;
        let mut next = first;
        for kf in &self.keyframes {
            if kf.offset <= progress {
                prev = kf;
            }
            if kf.offset >= progress {
                next = kf;
                break;
            }
        }

        if (next.offset - prev.offset).abs() < f64::EPSILON {
            return Some(prev.value.clone());
        }

        let local = (progress - prev.offset) / (next.offset - prev.offset);
        Some(prev.value.lerp(&next.value, next.easing.apply(local)))
    }
}

/// A sampled visual state: the subset of style properties springs usually drive
///
/// Unset properties are left to the host's base style.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleFrame {
    pub opacity: Option<f64>,
    pub scale_x: Option<f64>,
    pub scale_y: Option<f64>,
    /// Pixels
    pub translate_x: Option<f64>,
    /// Pixels
    pub translate_y: Option<f64>,
    /// Degrees
    pub rotate: Option<f64>,
    /// Pixels
    pub margin_right: Option<f64>,
}

impl StyleFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale_x = Some(scale);
        self.scale_y = Some(scale);
        self
    }

    pub fn with_scale_xy(mut self, x: f64, y: f64) -> Self {
        self.scale_x = Some(x);
        self.scale_y = Some(y);
        self
    }

    pub fn with_translate(mut self, x: f64, y: f64) -> Self {
        self.translate_x = Some(x);
        self.translate_y = Some(y);
        self
    }

    pub fn with_rotate(mut self, degrees: f64) -> Self {
        self.rotate = Some(degrees);
        self
    }

    pub fn with_margin_right(mut self, px: f64) -> Self {
        self.margin_right = Some(px);
        self
    }

    pub fn resolved_opacity(&self) -> f64 {
        self.opacity.unwrap_or(1.0)
    }

    pub fn resolved_scale(&self) -> (f64, f64) {
        (self.scale_x.unwrap_or(1.0), self.scale_y.unwrap_or(1.0))
    }

    pub fn resolved_translate(&self) -> (f64, f64) {
        (self.translate_x.unwrap_or(0.0), self.translate_y.unwrap_or(0.0))
    }

    /// CSS `transform` value, or `None` when no transform property is set
    pub fn css_transform(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.translate_x.is_some() || self.translate_y.is_some() {
            let (x, y) = self.resolved_translate();
            parts.push(format!("translate({}px, {}px)", x, y));
        }
        if self.scale_x.is_some() || self.scale_y.is_some() {
            let (x, y) = self.resolved_scale();
            parts.push(format!("scale({}, {})", x, y));
        }
        if let Some(rotate) = self.rotate {
            parts.push(format!("rotate({}deg)", rotate));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

fn lerp_opt(a: Option<f64>, b: Option<f64>, t: f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.lerp(&b, t)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

impl Interpolate for StyleFrame {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Self {
            opacity: lerp_opt(self.opacity, other.opacity, t),
            scale_x: lerp_opt(self.scale_x, other.scale_x, t),
            scale_y: lerp_opt(self.scale_y, other.scale_y, t),
            translate_x: lerp_opt(self.translate_x, other.translate_x, t),
            translate_y: lerp_opt(self.translate_y, other.translate_y, t),
            rotate: lerp_opt(self.rotate, other.rotate, t),
            margin_right: lerp_opt(self.margin_right, other.margin_right, t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(values: Vec<f64>, duration_ms: f64, fill: FillMode) -> KeyframeAnimation<f64> {
        let timing = AnimationTiming::new(duration_ms).with_fill(fill);
        KeyframeAnimation::evenly_spaced(values, &timing)
    }

    #[test]
    fn test_evenly_spaced_offsets() {
        let anim = linear(vec![0.0, 10.0, 20.0, 30.0], 300.0, FillMode::None);
        let offsets: Vec<f64> = anim.keyframes().iter().map(|kf| kf.offset).collect();
        assert_eq!(offsets.len(), 4);
        assert_eq!(offsets[0], 0.0);
        assert!((offsets[1] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(offsets[3], 1.0);
    }

    #[test]
    fn test_playback_interpolates() {
        let mut anim = linear(vec![0.0, 100.0], 100.0, FillMode::None);
        assert_eq!(anim.current(), None);

        anim.start();
        assert_eq!(anim.current(), Some(0.0));
        assert!(!anim.tick(25.0));
        assert!((anim.current().unwrap() - 25.0).abs() < 1e-9);

        assert!(anim.tick(100.0));
        assert!(anim.is_finished());
        assert!(!anim.tick(10.0));
    }

    #[test]
    fn test_fill_modes() {
        let mut none = linear(vec![1.0, 2.0], 50.0, FillMode::None);
        none.start();
        none.tick(50.0);
        assert_eq!(none.current(), None);

        let mut forwards = linear(vec![1.0, 2.0], 50.0, FillMode::Forwards);
        assert_eq!(forwards.current(), None);
        forwards.start();
        forwards.tick(50.0);
        assert_eq!(forwards.current(), Some(2.0));

        let backwards = linear(vec![1.0, 2.0], 50.0, FillMode::Backwards);
        assert_eq!(backwards.current(), Some(1.0));

        let both = linear(vec![1.0, 2.0], 50.0, FillMode::Both);
        assert_eq!(both.current(), Some(1.0));
    }

    #[test]
    fn test_single_keyframe_finishes_on_first_tick() {
        let mut anim = linear(vec![7.0], 0.0, FillMode::Forwards);
        anim.start();
        assert_eq!(anim.current(), Some(7.0));
        assert!(anim.tick(0.0));
        assert_eq!(anim.current(), Some(7.0));
    }

    #[test]
    fn test_segment_easing_applies() {
        let timing = AnimationTiming::new(100.0).with_easing(Easing::EaseIn);
        let anim = KeyframeAnimation::evenly_spaced(vec![0.0, 1.0], &timing);
        assert!(anim.sample_at(0.5).unwrap() < 0.5);
        assert_eq!(anim.sample_at(1.0), Some(1.0));
    }

    #[test]
    fn test_empty_animation_has_no_style() {
        let mut anim = KeyframeAnimation::<f64>::new(100.0, Vec::new());
        anim.start();
        assert_eq!(anim.current(), None);
        assert_eq!(anim.sample_at(0.5), None);
    }

    #[test]
    fn test_style_frame_lerp_holds_unset_side() {
        let a = StyleFrame::new().with_opacity(0.0).with_translate(0.0, 10.0);
        let b = StyleFrame::new().with_opacity(1.0).with_scale(2.0);
        let mid = a.lerp(&b, 0.5);

        assert_eq!(mid.opacity, Some(0.5));
        assert_eq!(mid.translate_y, Some(10.0));
        assert_eq!(mid.scale_x, Some(2.0));
        assert_eq!(mid.rotate, None);
    }

    #[test]
    fn test_style_frame_css_transform() {
        assert_eq!(StyleFrame::new().with_opacity(0.5).css_transform(), None);
        assert_eq!(
            StyleFrame::new()
                .with_translate(4.0, 0.0)
                .with_scale(0.5)
                .with_rotate(90.0)
                .css_transform()
                .as_deref(),
            Some("translate(4px, 0px) scale(0.5, 0.5) rotate(90deg)")
        );
    }

    #[test]
    fn test_array_lerp() {
        let a = [0.0, 10.0, -4.0];
        let b = [1.0, 20.0, 4.0];
        assert_eq!(a.lerp(&b, 0.5), [0.5, 15.0, 0.0]);
        assert_eq!(1.0_f32.lerp(&3.0, 0.5), 2.0);
    }
}
