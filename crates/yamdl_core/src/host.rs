//! Host environment primitives
//!
//! The animation runtime never talks to a windowing system directly. It needs
//! three things from whoever embeds it:
//!
//! - a [`Clock`] that is monotonic within a session
//! - a [`FrameSource`] that runs a callback before the next repaint
//! - a [`Visibility`] signal so idle work can pause in the background
//!
//! [`FrameQueue`] adapts any vsync/redraw hook into a `FrameSource`, and doubles
//! as the fixed-rate timer fallback when the host has no refresh callback.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Frame interval used when the host offers no refresh-callback primitive
pub const FALLBACK_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Monotonic time source, in seconds
pub trait Clock {
    fn now(&self) -> f64;
}

/// Wall-clock time elapsed since the clock was created
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A clock that only moves when told to
///
/// Used by tests and headless drivers that step time deterministically.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(seconds: f64) -> Self {
        Self {
            now: Cell::new(seconds),
        }
    }

    pub fn set(&self, seconds: f64) {
        self.now.set(seconds);
    }

    /// Move the clock forward and return the new time
    pub fn advance(&self, seconds: f64) -> f64 {
        let now = self.now.get() + seconds;
        self.now.set(now);
        now
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

/// Callback scheduled for the next frame
pub type FrameCallback = Box<dyn FnOnce()>;

/// "Run this once before the next repaint"
///
/// Implementations must defer the callback: running it synchronously inside
/// `request_frame` would recurse into the caller's frame loop.
pub trait FrameSource {
    fn request_frame(&self, callback: FrameCallback);
}

/// Queue of pending frame callbacks
///
/// Cloning yields another handle to the same queue. The host calls
/// [`dispatch`](Self::dispatch) once per display refresh.
#[derive(Clone, Default)]
pub struct FrameQueue {
    pending: Rc<RefCell<Vec<FrameCallback>>>,
    dispatched: Rc<Cell<u64>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks waiting for the next frame
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    /// Number of frames dispatched so far
    pub fn frames_dispatched(&self) -> u64 {
        self.dispatched.get()
    }

    /// Run one frame
    ///
    /// Only callbacks queued before this call run; anything requested while
    /// they run waits for the next frame. Returns the number of callbacks run.
    pub fn dispatch(&self) -> usize {
        let batch = std::mem::take(&mut *self.pending.borrow_mut());
        self.dispatched.set(self.dispatched.get() + 1);

        let count = batch.len();
        for callback in batch {
            callback();
        }
        count
    }

    /// Drop every pending callback without running it
    pub fn clear(&self) {
        self.pending.borrow_mut().clear();
    }

    /// Timer fallback for hosts without a refresh callback
    ///
    /// Sleeps `interval` and dispatches, for as long as callbacks are pending
    /// and fewer than `max_frames` frames have run. Blocks the calling thread.
    /// Returns the number of frames run.
    pub fn run_fixed_rate(&self, interval: Duration, max_frames: usize) -> usize {
        let mut frames = 0;
        while frames < max_frames && self.has_pending() {
            std::thread::sleep(interval);
            self.dispatch();
            frames += 1;
        }
        tracing::debug!("FrameQueue: fixed-rate loop ran {} frames", frames);
        frames
    }
}

impl FrameSource for FrameQueue {
    fn request_frame(&self, callback: FrameCallback) {
        self.pending.borrow_mut().push(callback);
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameQueue")
            .field("pending", &self.pending())
            .field("dispatched", &self.frames_dispatched())
            .finish()
    }
}

/// Whether the host surface is currently shown
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

impl Visibility {
    /// Map a "document is hidden" style flag
    pub fn from_hidden(hidden: bool) -> Self {
        if hidden {
            Visibility::Hidden
        } else {
            Visibility::Visible
        }
    }

    pub fn is_visible(self) -> bool {
        self == Visibility::Visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::starting_at(2.0);
        assert_eq!(clock.now(), 2.0);
        assert_eq!(clock.advance(0.5), 2.5);
        clock.set(10.0);
        assert_eq!(clock.now(), 10.0);
    }

    #[test]
    fn test_monotonic_clock_never_goes_back() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
        assert!(a >= 0.0);
    }

    #[test]
    fn test_callbacks_requested_during_dispatch_wait_a_frame() {
        let frames = FrameQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let queue = frames.clone();
        let outer_log = log.clone();
        frames.request_frame(Box::new(move || {
            outer_log.borrow_mut().push("first");
            let inner_log = outer_log.clone();
            queue.request_frame(Box::new(move || inner_log.borrow_mut().push("second")));
        }));

        assert_eq!(frames.dispatch(), 1);
        assert_eq!(*log.borrow(), vec!["first"]);
        assert_eq!(frames.pending(), 1);

        assert_eq!(frames.dispatch(), 1);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
        assert_eq!(frames.frames_dispatched(), 2);
    }

    #[test]
    fn test_fixed_rate_stops_when_idle() {
        let frames = FrameQueue::new();
        let remaining = Rc::new(Cell::new(3));

        fn tick(frames: FrameQueue, remaining: Rc<Cell<u32>>) {
            remaining.set(remaining.get() - 1);
            if remaining.get() > 0 {
                let next = frames.clone();
                frames.request_frame(Box::new(move || tick(next, remaining)));
            }
        }

        let queue = frames.clone();
        let counter = remaining.clone();
        frames.request_frame(Box::new(move || tick(queue, counter)));

        let ran = frames.run_fixed_rate(Duration::from_millis(1), 100);
        assert_eq!(ran, 3);
        assert_eq!(remaining.get(), 0);
        assert!(!frames.has_pending());
    }

    #[test]
    fn test_fixed_rate_respects_frame_cap() {
        let frames = FrameQueue::new();

        fn forever(frames: FrameQueue) {
            let next = frames.clone();
            frames.request_frame(Box::new(move || forever(next)));
        }
        forever(frames.clone());

        assert_eq!(frames.run_fixed_rate(Duration::ZERO, 5), 5);
        assert!(frames.has_pending());
        frames.clear();
        assert!(!frames.has_pending());
    }

    #[test]
    fn test_visibility() {
        assert_eq!(Visibility::from_hidden(true), Visibility::Hidden);
        assert!(Visibility::from_hidden(false).is_visible());
        assert_eq!(Visibility::default(), Visibility::Visible);
    }
}
