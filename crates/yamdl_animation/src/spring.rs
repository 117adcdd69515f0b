//! Frame-driven springs
//!
//! [`Spring`] wraps a [`SpringSolver`] with absolute value/velocity/target
//! semantics. Time advances through [`Spring::update`], normally called by the
//! [`AnimationScheduler`](crate::AnimationScheduler) once per frame.
//!
//! Every setter pivots the solver at the current elapsed time and resets the
//! elapsed time to zero, so the motion stays continuous.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use yamdl_core::{Emitter, ListenerId};

use crate::scheduler::{Animatable, SchedulerHandle};
use crate::solver::{friction_for, SpringSolver};

/// Default rest threshold
pub const DEFAULT_TOLERANCE: f64 = 1.0 / 1000.0;

/// Hard limit on samples produced by [`Spring::keyframes`]
pub const MAX_KEYFRAMES: usize = 10_000;

/// Smallest time step between generated keyframes, in seconds
const MIN_KEYFRAME_STEP: f64 = 1e-2;

/// Physical parameters of a spring
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    /// < 1 oscillates, 1 is critical, > 1 is overdamped
    pub damping_ratio: f64,
    /// Characteristic period, in seconds
    pub period: f64,
}

/// Qualitative behavior implied by a damping ratio
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DampingRegime {
    Undamped,
    Underdamped,
    Critical,
    Overdamped,
}

impl SpringConfig {
    pub const fn new(damping_ratio: f64, period: f64) -> Self {
        Self {
            damping_ratio,
            period,
        }
    }

    /// Dialogs and menus appearing and disappearing
    pub const fn presence() -> Self {
        Self::new(1.0, 0.3)
    }

    /// Slower layout changes (app bar, menu icon, heights)
    pub const fn relaxed() -> Self {
        Self::new(1.0, 0.5)
    }

    /// Ripple expansion after release
    pub const fn ripple() -> Self {
        Self::new(1.0, 0.5)
    }

    /// Ripple expansion while the pointer is held down
    pub const fn ripple_hold() -> Self {
        Self::new(1.0, 3.0)
    }

    pub const fn ripple_fade_in() -> Self {
        Self::new(1.0, 0.4)
    }

    pub fn friction(&self) -> f64 {
        friction_for(self.damping_ratio, self.period)
    }

    pub fn undamped_angular_frequency(&self) -> f64 {
        2.0 * std::f64::consts::PI / self.period
    }

    pub fn regime(&self) -> DampingRegime {
        if self.damping_ratio == 0.0 {
            DampingRegime::Undamped
        } else if self.damping_ratio < 1.0 {
            DampingRegime::Underdamped
        } else if self.damping_ratio == 1.0 {
            DampingRegime::Critical
        } else {
            DampingRegime::Overdamped
        }
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::presence()
    }
}

impl From<SpringConfig> for SpringSolver {
    fn from(config: SpringConfig) -> Self {
        SpringSolver::new(config.damping_ratio, config.period)
    }
}

/// A spring shared with the scheduler
pub type SharedSpring = Rc<RefCell<Spring>>;

#[derive(Debug)]
struct Driver {
    scheduler: SchedulerHandle,
    this: Weak<RefCell<Spring>>,
}

impl Driver {
    fn target(&self) -> Weak<RefCell<dyn Animatable>> {
        self.this.clone()
    }
}

/// A scalar animated by a damped harmonic oscillator
#[derive(Debug)]
pub struct Spring {
    solver: SpringSolver,
    /// Seconds since the solver's last pivot
    time: f64,
    tolerance: f64,
    stop_automatically: bool,
    locked: bool,
    updates: Emitter<f64>,
    driver: Option<Driver>,
}

impl Spring {
    /// Create a spring at rest at `initial`
    ///
    /// This spring has no scheduler: `start`/`stop` do nothing and the owner
    /// calls [`update`](Self::update) itself.
    pub fn new(config: SpringConfig, initial: f64) -> Self {
        let mut solver = SpringSolver::from(config);
        solver.reset_value(0.0, initial);
        solver.retarget(0.0, Some(initial));
        Self {
            solver,
            time: 0.0,
            tolerance: DEFAULT_TOLERANCE,
            stop_automatically: true,
            locked: false,
            updates: Emitter::new(),
            driver: None,
        }
    }

    /// Create a spring that registers itself with `scheduler` on `start`
    pub fn shared(scheduler: &SchedulerHandle, config: SpringConfig, initial: f64) -> SharedSpring {
        Rc::new_cyclic(|this| {
            let mut spring = Spring::new(config, initial);
            spring.driver = Some(Driver {
                scheduler: scheduler.clone(),
                this: this.clone(),
            });
            RefCell::new(spring)
        })
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn value(&self) -> f64 {
        self.solver.value(self.time)
    }

    pub fn velocity(&self) -> f64 {
        self.solver.velocity(self.time)
    }

    pub fn target(&self) -> Option<f64> {
        self.solver.target()
    }

    /// Seconds since the last pivot
    pub fn elapsed(&self) -> f64 {
        self.time
    }

    pub fn damping_ratio(&self) -> f64 {
        self.solver.damping_ratio()
    }

    pub fn period(&self) -> f64 {
        self.solver.period()
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
    }

    /// Jump to `value`, keeping the velocity. Resets the elapsed time.
    pub fn set_value(&mut self, value: f64) {
        self.solver.reset_value(self.time, value);
        self.time = 0.0;
    }

    /// Replace the velocity, keeping the value. Resets the elapsed time.
    pub fn set_velocity(&mut self, velocity: f64) {
        self.solver.reset_velocity(self.time, velocity);
        self.time = 0.0;
    }

    /// Move the target, or remove it with `None` to let the value coast
    ///
    /// No-op when the target is unchanged; otherwise resets the elapsed time.
    pub fn retarget(&mut self, target: impl Into<Option<f64>>) {
        let target = target.into();
        if self.solver.target() == target {
            return;
        }
        self.solver.retarget(self.time, target);
        self.time = 0.0;
    }

    /// Change both parameters at the same pivot. Resets the elapsed time.
    pub fn set_damping_ratio_and_period(&mut self, damping_ratio: f64, period: f64) {
        self.solver.reset_damping_ratio(self.time, damping_ratio);
        self.solver.reset_period(0.0, period);
        self.time = 0.0;
    }

    pub fn set_damping_ratio(&mut self, damping_ratio: f64) {
        let period = self.period();
        self.set_damping_ratio_and_period(damping_ratio, period);
    }

    pub fn set_period(&mut self, period: f64) {
        let damping_ratio = self.damping_ratio();
        self.set_damping_ratio_and_period(damping_ratio, period);
    }

    /// Value `dt` seconds from now, without advancing
    pub fn value_after(&self, dt: f64) -> f64 {
        self.solver.value(self.time + dt)
    }

    /// Velocity `dt` seconds from now, without advancing
    pub fn velocity_after(&self, dt: f64) -> f64 {
        self.solver.velocity(self.time + dt)
    }

    /// Freeze time. Updates keep notifying listeners with the same value.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether `update` finishes and deregisters the spring once it settles
    pub fn set_stop_automatically(&mut self, stop_automatically: bool) {
        self.stop_automatically = stop_automatically;
    }

    pub fn stops_automatically(&self) -> bool {
        self.stop_automatically
    }

    /// Listen for value updates
    ///
    /// Listeners run while the spring is borrowed and must not borrow it.
    pub fn on_update<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&f64) + 'static,
    {
        self.updates.on(listener)
    }

    pub fn off_update(&self, id: ListenerId) -> bool {
        self.updates.off(id)
    }

    /// False once the spring is within tolerance of its rest state
    pub fn wants_update(&self) -> bool {
        match self.target() {
            Some(target) => {
                (self.value() - target).abs() + self.velocity().abs() > self.tolerance
            }
            None => self.velocity().abs() > self.tolerance,
        }
    }

    /// Advance by `elapsed` seconds and notify listeners
    ///
    /// Returns false when the spring settled and finished during this update.
    pub fn update(&mut self, elapsed: f64) -> bool {
        if !self.locked {
            self.time += elapsed;
        }

        let mut keep = true;
        if self.stop_automatically && !self.wants_update() {
            self.finish();
            self.stop();
            keep = false;
        }

        self.updates.emit(&self.value());
        keep
    }

    /// Jump to the target with zero velocity, notify, and stop
    ///
    /// No-op when there is no target.
    pub fn finish(&mut self) {
        let Some(target) = self.target() else {
            return;
        };
        self.solver.reset_value(self.time, target);
        self.solver.reset_velocity(0.0, 0.0);
        self.time = 0.0;
        self.updates.emit(&self.value());
        self.stop();
    }

    /// Register with the scheduler this spring was created with
    pub fn start(&self) {
        if let Some(driver) = &self.driver {
            driver.scheduler.register(driver.target());
        }
    }

    /// Deregister from the scheduler
    pub fn stop(&self) {
        if let Some(driver) = &self.driver {
            driver.scheduler.deregister(&driver.target());
        }
    }

    /// Whether the scheduler currently drives this spring
    pub fn is_running(&self) -> bool {
        self.driver
            .as_ref()
            .map(|driver| driver.scheduler.is_registered(&driver.target()))
            .unwrap_or(false)
    }

    /// Sample the motion from the current instant
    ///
    /// Yields `(value, time_offset)` pairs. The step adapts to the velocity
    /// (`max(0.01, sqrt(|v|) / sample_scale)`); a larger `sample_scale` samples
    /// more densely. The sequence ends with the first sample for which
    /// `should_stop(value, velocity, time_offset)` is true, or after
    /// [`MAX_KEYFRAMES`] samples.
    pub fn keyframes<F>(&self, should_stop: F, sample_scale: f64) -> SpringKeyframes<F>
    where
        F: FnMut(f64, f64, f64) -> bool,
    {
        SpringKeyframes {
            solver: self.solver,
            start: self.time,
            t: self.time,
            sample_scale,
            should_stop,
            remaining: MAX_KEYFRAMES,
        }
    }
}

impl Animatable for Spring {
    fn update(&mut self, dt: f64) -> bool {
        Spring::update(self, dt)
    }
}

/// Iterator returned by [`Spring::keyframes`]
///
/// Holds a copy of the solver taken when it was created; later changes to the
/// spring don't affect it.
pub struct SpringKeyframes<F> {
    solver: SpringSolver,
    start: f64,
    t: f64,
    sample_scale: f64,
    should_stop: F,
    remaining: usize,
}

impl<F> Iterator for SpringKeyframes<F>
where
    F: FnMut(f64, f64, f64) -> bool,
{
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let value = self.solver.value(self.t);
        let velocity = self.solver.velocity(self.t);
        let offset = self.t - self.start;

        if (self.should_stop)(value, velocity, offset) {
            self.remaining = 0;
        } else {
            self.t += MIN_KEYFRAME_STEP.max(velocity.abs().sqrt() / self.sample_scale);
        }
        Some((value, offset))
    }
}
