//! Animation targets
//!
//! The bridge hands its sampled keyframes to an [`AnimationTarget`], the
//! abstraction of a native declarative timeline (an element's `animate()`).
//! [`TimelineTarget`] is the software implementation: it plays keyframes when
//! the host ticks it and reports the style in effect.

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::easing::Easing;
use crate::keyframe::{FillMode, Interpolate, KeyframeAnimation};

new_key_type! {
    /// Handle to a playback started on a [`TimelineTarget`]
    pub struct PlaybackId;
}

/// Timing options for a keyframe animation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationTiming {
    pub duration_ms: f64,
    pub easing: Easing,
    pub fill: FillMode,
}

impl AnimationTiming {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            duration_ms,
            easing: Easing::Linear,
            fill: FillMode::None,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_fill(mut self, fill: FillMode) -> Self {
        self.fill = fill;
        self
    }
}

/// Called once when an animation completes
pub type FinishCallback = Box<dyn FnOnce()>;

/// A running animation created by an [`AnimationTarget`]
pub trait NativeAnimation {
    /// Stop the animation and remove its effect. Its finish callback never runs.
    fn cancel(&self);
}

/// Something that can play a keyframe animation of styles `S`
///
/// `on_finish` must run after `animate` returns, never from inside it.
pub trait AnimationTarget<S> {
    /// False when there is nothing to animate (e.g. the element isn't mounted)
    fn is_attached(&self) -> bool {
        true
    }

    fn animate(
        &self,
        keyframes: Vec<S>,
        timing: AnimationTiming,
        on_finish: Option<FinishCallback>,
    ) -> Box<dyn NativeAnimation>;
}

struct Playback<S> {
    animation: KeyframeAnimation<S>,
    on_finish: Option<FinishCallback>,
    /// Start order; later playbacks override earlier ones
    order: u64,
}

struct TimelineState<S> {
    playbacks: SlotMap<PlaybackId, Playback<S>>,
    attached: bool,
    started: u64,
}

/// Software keyframe timeline for a single visual element
///
/// Cloning yields another handle to the same timeline.
pub struct TimelineTarget<S> {
    state: Rc<RefCell<TimelineState<S>>>,
}

impl<S: Interpolate + 'static> TimelineTarget<S> {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(TimelineState {
                playbacks: SlotMap::with_key(),
                attached: true,
                started: 0,
            })),
        }
    }

    /// Mark the element as gone; the bridge stops animating it
    pub fn detach(&self) {
        self.state.borrow_mut().attached = false;
    }

    pub fn attach(&self) {
        self.state.borrow_mut().attached = true;
    }

    /// Advance every playback by `dt_ms` milliseconds
    ///
    /// Finished playbacks are released unless they are the latest one and fill
    /// forwards. Finish callbacks run after the timeline is updated, so they
    /// may start new playbacks. Returns how many finished on this tick.
    pub fn tick(&self, dt_ms: f64) -> usize {
        let finished: SmallVec<[FinishCallback; 2]> = {
            let mut state = self.state.borrow_mut();
            let finished = state
                .playbacks
                .values_mut()
                .filter_map(|playback| {
                    if playback.animation.tick(dt_ms) {
                        playback.on_finish.take()
                    } else {
                        None
                    }
                })
                .collect();
            release_finished(&mut state.playbacks);
            finished
        };

        let count = finished.len();
        for callback in finished {
            callback();
        }
        count
    }

    /// The style currently applied by the most recent playback, if any
    pub fn current_style(&self) -> Option<S> {
        let state = self.state.borrow();
        let mut playbacks: SmallVec<[&Playback<S>; 4]> = state.playbacks.values().collect();
        playbacks.sort_by_key(|playback| std::cmp::Reverse(playback.order));
        let style = playbacks
            .into_iter()
            .find_map(|playback| playback.animation.current());
        style
    }

    /// Whether any playback is still in its active interval
    pub fn is_playing(&self) -> bool {
        self.state
            .borrow()
            .playbacks
            .values()
            .any(|playback| playback.animation.is_playing())
    }

    /// Playbacks that haven't been cancelled, finished ones included
    pub fn playback_count(&self) -> usize {
        self.state.borrow().playbacks.len()
    }

    /// Total number of `animate` calls
    pub fn animations_started(&self) -> u64 {
        self.state.borrow().started
    }
}

impl<S: Interpolate + 'static> Default for TimelineTarget<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for TimelineTarget<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<S> std::fmt::Debug for TimelineTarget<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("TimelineTarget")
            .field("playbacks", &state.playbacks.len())
            .field("attached", &state.attached)
            .field("started", &state.started)
            .finish()
    }
}

impl<S: Interpolate + 'static> AnimationTarget<S> for TimelineTarget<S> {
    fn is_attached(&self) -> bool {
        self.state.borrow().attached
    }

    fn animate(
        &self,
        keyframes: Vec<S>,
        timing: AnimationTiming,
        on_finish: Option<FinishCallback>,
    ) -> Box<dyn NativeAnimation> {
        let mut animation = KeyframeAnimation::evenly_spaced(keyframes, &timing);
        animation.start();

        let mut state = self.state.borrow_mut();
        state.started += 1;
        let order = state.started;
        let id = state.playbacks.insert(Playback {
            animation,
            on_finish,
            order,
        });
        tracing::trace!(?id, duration_ms = timing.duration_ms, "TimelineTarget: playback started");

        Box::new(TimelinePlayback {
            state: Rc::downgrade(&self.state),
            id,
        })
    }
}

/// Drop finished playbacks that no longer contribute a style
fn release_finished<S: Interpolate>(playbacks: &mut SlotMap<PlaybackId, Playback<S>>) {
    playbacks.retain(|_, playback| {
        !playback.animation.is_finished() || playback.animation.fill().fills_forwards()
    });
    let latest = playbacks.values().map(|playback| playback.order).max();
    playbacks.retain(|_, playback| {
        !playback.animation.is_finished() || Some(playback.order) == latest
    });
}

struct TimelinePlayback<S> {
    state: Weak<RefCell<TimelineState<S>>>,
    id: PlaybackId,
}

impl<S> NativeAnimation for TimelinePlayback<S> {
    fn cancel(&self) {
        if let Some(state) = self.state.upgrade() {
            state.borrow_mut().playbacks.remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, FinishCallback) {
        let count = Rc::new(Cell::new(0));
        let hits = count.clone();
        (count, Box::new(move || hits.set(hits.get() + 1)))
    }

    fn forwards(duration_ms: f64) -> AnimationTiming {
        AnimationTiming::new(duration_ms).with_fill(FillMode::Forwards)
    }

    #[test]
    fn test_fill_forward_holds_last_keyframe() {
        let target = TimelineTarget::<f64>::new();
        let (finished, on_finish) = counter();
        let _anim = target.animate(vec![0.0, 0.5, 1.0], forwards(100.0), Some(on_finish));

        target.tick(50.0);
        assert!((target.current_style().unwrap() - 0.5).abs() < 1e-9);
        assert!(target.is_playing());

        assert_eq!(target.tick(60.0), 1);
        assert_eq!(target.current_style(), Some(1.0));
        assert!(!target.is_playing());

        target.tick(100.0);
        assert_eq!(finished.get(), 1);
        assert_eq!(target.current_style(), Some(1.0));
    }

    #[test]
    fn test_finished_playbacks_are_released() {
        let target = TimelineTarget::<f64>::new();
        let (finished, _) = counter();
        for _ in 0..1000 {
            let hits = finished.clone();
            let _anim = target.animate(
                vec![0.0, 1.0],
                AnimationTiming::new(10.0),
                Some(Box::new(move || hits.set(hits.get() + 1))),
            );
        }
        assert_eq!(target.playback_count(), 1000);

        assert_eq!(target.tick(20.0), 1000);
        assert_eq!(finished.get(), 1000);
        assert_eq!(target.playback_count(), 0);
        assert_eq!(target.current_style(), None);
    }

    #[test]
    fn test_only_latest_forward_fill_is_kept() {
        let target = TimelineTarget::<f64>::new();
        for i in 0..50 {
            let value = i as f64;
            let _anim = target.animate(vec![0.0, value], forwards(10.0), None);
        }

        target.tick(20.0);
        assert_eq!(target.playback_count(), 1);
        assert_eq!(target.current_style(), Some(49.0));

        // A newer playback supersedes the filled one
        let _next = target.animate(vec![100.0, 200.0], forwards(100.0), None);
        target.tick(10.0);
        assert_eq!(target.playback_count(), 1);
        assert!((target.current_style().unwrap() - 110.0).abs() < 1e-9);
        target.tick(100.0);
        assert_eq!(target.playback_count(), 1);
        assert_eq!(target.current_style(), Some(200.0));
    }

    #[test]
    fn test_cancelled_playback_never_finishes() {
        let target = TimelineTarget::<f64>::new();
        let (finished, on_finish) = counter();
        let anim = target.animate(vec![0.0, 1.0], forwards(100.0), Some(on_finish));

        target.tick(50.0);
        anim.cancel();
        target.tick(100.0);

        assert_eq!(finished.get(), 0);
        assert_eq!(target.current_style(), None);
        assert_eq!(target.playback_count(), 0);
    }

    #[test]
    fn test_latest_playback_wins() {
        let target = TimelineTarget::<f64>::new();
        let _first = target.animate(vec![0.0, 0.0], forwards(100.0), None);
        let _second = target.animate(vec![5.0, 5.0], forwards(100.0), None);
        assert_eq!(target.current_style(), Some(5.0));
        assert_eq!(target.animations_started(), 2);
    }

    #[test]
    fn test_finish_callback_may_start_new_playback() {
        let target = TimelineTarget::<f64>::new();
        let chained = target.clone();
        let _anim = target.animate(
            vec![0.0, 1.0],
            forwards(10.0),
            Some(Box::new(move || {
                let _next = chained.animate(vec![1.0, 2.0], forwards(10.0), None);
            })),
        );

        target.tick(10.0);
        assert_eq!(target.animations_started(), 2);
        assert_eq!(target.playback_count(), 2);
    }

    #[test]
    fn test_cancel_after_target_dropped_is_harmless() {
        let target = TimelineTarget::<f64>::new();
        let anim = target.animate(vec![0.0, 1.0], forwards(10.0), None);
        drop(target);
        anim.cancel();
    }

    #[test]
    fn test_detach() {
        let target = TimelineTarget::<f64>::new();
        assert!(target.is_attached());
        target.detach();
        assert!(!target.is_attached());
        target.attach();
        assert!(target.is_attached());
    }
}
