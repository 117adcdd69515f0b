//! Animation scheduler
//!
//! One cooperative frame loop drives every registered [`Animatable`]. The loop
//! runs on the host's [`FrameSource`], suspends itself when nothing is
//! registered, and resumes on the next `register` or `start`.
//!
//! Targets are held weakly: the scheduler never keeps an animated object
//! alive, and dead targets are pruned on the next frame.

use indexmap::IndexMap;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use yamdl_core::{Clock, FrameSource, Visibility};

use crate::config::MotionConfig;

/// Something the scheduler advances once per frame
pub trait Animatable {
    /// Advance by `dt` seconds. Returning false deregisters the target.
    fn update(&mut self, dt: f64) -> bool;
}

type TargetRef = Weak<RefCell<dyn Animatable>>;

/// Identity of a target: the address of its shared allocation
fn target_key(target: &TargetRef) -> usize {
    target.as_ptr() as *const () as usize
}

fn downgrade<T: Animatable + 'static>(target: &Rc<RefCell<T>>) -> TargetRef {
    let weak = Rc::downgrade(target);
    weak
}

struct SchedulerInner {
    targets: IndexMap<usize, TargetRef>,
    running: bool,
    /// Bumped on every start; frame callbacks from older loops are ignored
    loop_id: u64,
    prev_time: f64,
    frame_count: u64,
    animation_speed: f64,
    visibility: Visibility,
    clock: Rc<dyn Clock>,
    frames: Rc<dyn FrameSource>,
}

/// Shared per-frame dispatcher for animated objects
///
/// Cloning yields another handle to the same scheduler.
#[derive(Clone)]
pub struct AnimationScheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl AnimationScheduler {
    pub fn new(clock: Rc<dyn Clock>, frames: Rc<dyn FrameSource>) -> Self {
        Self::with_config(&MotionConfig::default(), clock, frames)
    }

    /// Create a scheduler using the configured animation speed
    pub fn with_config(
        config: &MotionConfig,
        clock: Rc<dyn Clock>,
        frames: Rc<dyn FrameSource>,
    ) -> Self {
        let prev_time = clock.now();
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                targets: IndexMap::new(),
                running: false,
                loop_id: 0,
                prev_time,
                frame_count: 0,
                animation_speed: config.animation_speed,
                visibility: Visibility::Visible,
                clock,
                frames,
            })),
        }
    }

    /// Get a weak handle for animated objects to hold
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Add a target and make sure the loop is running
    ///
    /// Registering an already registered target has no effect. A target added
    /// during a frame is first updated on the following frame. While the host
    /// is hidden the target is recorded but the loop stays stopped.
    pub fn register(&self, target: Weak<RefCell<dyn Animatable>>) {
        let visible = {
            let mut inner = self.inner.borrow_mut();
            inner.targets.entry(target_key(&target)).or_insert(target);
            inner.visibility.is_visible()
        };
        if visible {
            start(&self.inner);
        }
    }

    /// [`register`](Self::register) for a concrete shared target
    pub fn register_rc<T: Animatable + 'static>(&self, target: &Rc<RefCell<T>>) {
        self.register(downgrade(target));
    }

    /// Remove a target. No-op if it isn't registered.
    pub fn deregister(&self, target: &Weak<RefCell<dyn Animatable>>) {
        self.inner
            .borrow_mut()
            .targets
            .shift_remove(&target_key(target));
    }

    pub fn deregister_rc<T: Animatable + 'static>(&self, target: &Rc<RefCell<T>>) {
        self.deregister(&downgrade(target));
    }

    pub fn is_registered(&self, target: &Weak<RefCell<dyn Animatable>>) -> bool {
        self.inner
            .borrow()
            .targets
            .contains_key(&target_key(target))
    }

    /// Start the frame loop. No-op if it is already running.
    pub fn start(&self) {
        start(&self.inner);
    }

    /// Stop the frame loop. A frame that is already requested does nothing.
    pub fn stop(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.running {
            inner.running = false;
            tracing::debug!(loop_id = inner.loop_id, "AnimationScheduler: stopped");
        }
    }

    /// Forward the host's visibility signal
    ///
    /// Hidden stops the loop; visible restarts it if anything is registered.
    pub fn set_visibility(&self, visibility: Visibility) {
        let resume = {
            let mut inner = self.inner.borrow_mut();
            if inner.visibility == visibility {
                return;
            }
            inner.visibility = visibility;
            tracing::debug!(?visibility, "AnimationScheduler: visibility changed");
            visibility.is_visible() && !inner.targets.is_empty()
        };

        if visibility.is_visible() {
            if resume {
                start(&self.inner);
            }
        } else {
            self.stop();
        }
    }

    pub fn visibility(&self) -> Visibility {
        self.inner.borrow().visibility
    }

    /// Multiplier applied to every frame's delta time
    pub fn set_animation_speed(&self, speed: f64) {
        self.inner.borrow_mut().animation_speed = speed;
    }

    pub fn animation_speed(&self) -> f64 {
        self.inner.borrow().animation_speed
    }

    pub fn is_running(&self) -> bool {
        self.inner.borrow().running
    }

    pub fn target_count(&self) -> usize {
        self.inner.borrow().targets.len()
    }

    pub fn loop_id(&self) -> u64 {
        self.inner.borrow().loop_id
    }

    /// Number of frames that dispatched updates
    pub fn frame_count(&self) -> u64 {
        self.inner.borrow().frame_count
    }
}

impl std::fmt::Debug for AnimationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("AnimationScheduler")
            .field("targets", &inner.targets.len())
            .field("running", &inner.running)
            .field("loop_id", &inner.loop_id)
            .field("visibility", &inner.visibility)
            .finish()
    }
}

fn start(inner: &Rc<RefCell<SchedulerInner>>) {
    let (loop_id, frames) = {
        let mut state = inner.borrow_mut();
        if state.running {
            return;
        }
        state.running = true;
        state.loop_id += 1;
        state.prev_time = state.clock.now();
        tracing::debug!(loop_id = state.loop_id, "AnimationScheduler: started");
        (state.loop_id, state.frames.clone())
    };
    request_frame(inner, frames.as_ref(), loop_id);
}

fn request_frame(inner: &Rc<RefCell<SchedulerInner>>, frames: &dyn FrameSource, loop_id: u64) {
    let weak = Rc::downgrade(inner);
    frames.request_frame(Box::new(move || {
        if let Some(inner) = weak.upgrade() {
            run_frame(&inner, loop_id);
        }
    }));
}

fn run_frame(inner: &Rc<RefCell<SchedulerInner>>, loop_id: u64) {
    let (dt, snapshot, frames) = {
        let mut state = inner.borrow_mut();
        if !state.running || state.loop_id != loop_id {
            tracing::trace!(loop_id, "AnimationScheduler: ignoring stale frame");
            return;
        }
        if state.targets.is_empty() {
            state.running = false;
            tracing::debug!(loop_id, "AnimationScheduler: idle, stopping");
            return;
        }

        let now = state.clock.now();
        let dt = (now - state.prev_time) * state.animation_speed;
        state.prev_time = now;
        state.frame_count += 1;

        let snapshot: SmallVec<[(usize, TargetRef); 8]> = state
            .targets
            .iter()
            .map(|(key, target)| (*key, target.clone()))
            .collect();
        (dt, snapshot, state.frames.clone())
    };

    request_frame(inner, frames.as_ref(), loop_id);

    for (key, target) in snapshot {
        // Deregistered by an earlier target in this frame
        if !inner.borrow().targets.contains_key(&key) {
            continue;
        }

        let Some(target) = target.upgrade() else {
            inner.borrow_mut().targets.shift_remove(&key);
            continue;
        };

        let keep = match target.try_borrow_mut() {
            Ok(mut target) => target.update(dt),
            Err(_) => {
                tracing::trace!("AnimationScheduler: target busy, skipping this frame");
                true
            }
        };
        if !keep {
            inner.borrow_mut().targets.shift_remove(&key);
        }
    }
}

/// Weak reference to an [`AnimationScheduler`]
///
/// Every operation is a no-op once the scheduler has been dropped.
#[derive(Clone, Default)]
pub struct SchedulerHandle {
    inner: Weak<RefCell<SchedulerInner>>,
}

impl SchedulerHandle {
    pub fn upgrade(&self) -> Option<AnimationScheduler> {
        self.inner
            .upgrade()
            .map(|inner| AnimationScheduler { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn register(&self, target: Weak<RefCell<dyn Animatable>>) {
        if let Some(scheduler) = self.upgrade() {
            scheduler.register(target);
        }
    }

    pub fn deregister(&self, target: &Weak<RefCell<dyn Animatable>>) {
        if let Some(scheduler) = self.upgrade() {
            scheduler.deregister(target);
        }
    }

    pub fn is_registered(&self, target: &Weak<RefCell<dyn Animatable>>) -> bool {
        self.upgrade()
            .map(|scheduler| scheduler.is_registered(target))
            .unwrap_or(false)
    }

    pub fn start(&self) {
        if let Some(scheduler) = self.upgrade() {
            scheduler.start();
        }
    }

    pub fn stop(&self) {
        if let Some(scheduler) = self.upgrade() {
            scheduler.stop();
        }
    }
}

impl std::fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}
