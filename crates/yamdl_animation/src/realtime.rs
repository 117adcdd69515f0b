//! Absolute-time springs
//!
//! A [`RealtimeSpring`] is evaluated against the host clock instead of
//! accumulated frame deltas, so it needs no scheduler: reading the value at any
//! instant (including the future) is a pure function of the clock. This is the
//! input the keyframe bridge samples ahead of time.

use std::cell::Cell;
use std::rc::Rc;
use yamdl_core::Clock;

use crate::bridge::MotionInput;
use crate::solver::SpringSolver;
use crate::spring::{SpringConfig, DEFAULT_TOLERANCE};

/// A spring whose phase is anchored to clock time
///
/// Setters take `&self` so the spring can be shared as `Rc<RealtimeSpring>`
/// between a component and its keyframe bridge. Every mutation pivots the
/// solver at the current clock time and bumps [`last_reset`](Self::last_reset).
pub struct RealtimeSpring {
    solver: Cell<SpringSolver>,
    /// Clock time at which the solver's t = 0
    pivot: Cell<f64>,
    resets: Cell<u64>,
    tolerance: Cell<f64>,
    clock: Rc<dyn Clock>,
}

impl RealtimeSpring {
    /// Create a spring at rest at 0, targeting 0
    pub fn new(clock: Rc<dyn Clock>, config: SpringConfig) -> Self {
        let pivot = clock.now();
        Self {
            solver: Cell::new(SpringSolver::from(config)),
            pivot: Cell::new(pivot),
            resets: Cell::new(0),
            tolerance: Cell::new(DEFAULT_TOLERANCE),
            clock,
        }
    }

    /// Start at `value` instead of 0
    pub fn with_value(self, value: f64) -> Self {
        self.configure(|solver, t| solver.reset_value(t, value));
        self
    }

    /// Start moving towards `target`
    pub fn with_target(self, target: impl Into<Option<f64>>) -> Self {
        let target = target.into();
        self.configure(|solver, t| solver.retarget(t, target));
        self
    }

    pub fn with_tolerance(self, tolerance: f64) -> Self {
        self.tolerance.set(tolerance);
        self
    }

    fn configure(&self, change: impl FnOnce(&mut SpringSolver, f64)) {
        let now = self.clock.now();
        let mut solver = self.solver.get();
        change(&mut solver, now - self.pivot.get());
        self.solver.set(solver);
        self.pivot.set(now);
    }

    /// Apply a change at the current instant and record the discontinuity
    fn mutate(&self, change: impl FnOnce(&mut SpringSolver, f64)) {
        self.configure(change);
        self.resets.set(self.resets.get() + 1);
    }

    pub fn value(&self) -> f64 {
        self.value_at(self.clock.now())
    }

    pub fn velocity(&self) -> f64 {
        self.velocity_at(self.clock.now())
    }

    /// Value at clock time `t`
    pub fn value_at(&self, t: f64) -> f64 {
        self.solver.get().value(t - self.pivot.get())
    }

    /// Velocity at clock time `t`
    pub fn velocity_at(&self, t: f64) -> f64 {
        self.solver.get().velocity(t - self.pivot.get())
    }

    pub fn target(&self) -> Option<f64> {
        self.solver.get().target()
    }

    pub fn damping_ratio(&self) -> f64 {
        self.solver.get().damping_ratio()
    }

    pub fn period(&self) -> f64 {
        self.solver.get().period()
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance.get()
    }

    pub fn set_tolerance(&self, tolerance: f64) {
        self.tolerance.set(tolerance);
    }

    /// Number of discontinuities so far
    pub fn last_reset(&self) -> u64 {
        self.resets.get()
    }

    /// Move the target. No-op when unchanged.
    pub fn set_target(&self, target: impl Into<Option<f64>>) {
        let target = target.into();
        if self.target() == target {
            return;
        }
        self.mutate(|solver, t| solver.retarget(t, target));
    }

    pub fn set_value(&self, value: f64) {
        self.mutate(|solver, t| solver.reset_value(t, value));
    }

    pub fn set_velocity(&self, velocity: f64) {
        self.mutate(|solver, t| solver.reset_velocity(t, velocity));
    }

    pub fn set_damping_ratio_and_period(&self, damping_ratio: f64, period: f64) {
        self.mutate(|solver, t| {
            solver.reset_damping_ratio(t, damping_ratio);
            solver.reset_period(0.0, period);
        });
    }

    pub fn set_damping_ratio(&self, damping_ratio: f64) {
        self.set_damping_ratio_and_period(damping_ratio, self.period());
    }

    pub fn set_period(&self, period: f64) {
        self.set_damping_ratio_and_period(self.damping_ratio(), period);
    }

    /// Whether the spring is at rest at clock time `t`
    pub fn should_stop(&self, t: f64) -> bool {
        let velocity = self.velocity_at(t).abs();
        match self.target() {
            Some(target) => (self.value_at(t) - target).abs() + velocity <= self.tolerance.get(),
            None => velocity <= self.tolerance.get(),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.should_stop(self.clock.now())
    }

    /// Jump to the target with zero velocity. No-op without a target.
    pub fn finish(&self) {
        let Some(target) = self.target() else {
            return;
        };
        self.mutate(|solver, t| {
            solver.reset_value(t, target);
            solver.reset_velocity(0.0, 0.0);
        });
    }
}

impl MotionInput for RealtimeSpring {
    fn value_at(&self, t: f64) -> f64 {
        RealtimeSpring::value_at(self, t)
    }

    fn velocity_at(&self, t: f64) -> f64 {
        RealtimeSpring::velocity_at(self, t)
    }

    fn should_stop(&self, t: f64) -> bool {
        RealtimeSpring::should_stop(self, t)
    }

    fn last_reset(&self) -> u64 {
        RealtimeSpring::last_reset(self)
    }
}

impl std::fmt::Debug for RealtimeSpring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeSpring")
            .field("solver", &self.solver.get())
            .field("pivot", &self.pivot.get())
            .field("resets", &self.resets.get())
            .field("tolerance", &self.tolerance.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yamdl_core::ManualClock;

    fn spring(clock: &Rc<ManualClock>) -> RealtimeSpring {
        RealtimeSpring::new(clock.clone(), SpringConfig::presence())
    }

    #[test]
    fn test_builders_do_not_count_as_resets() {
        let clock = Rc::new(ManualClock::starting_at(10.0));
        let s = spring(&clock).with_value(2.0).with_target(5.0);
        assert_eq!(s.last_reset(), 0);
        assert!((s.value() - 2.0).abs() < 1e-9);
        assert_eq!(s.target(), Some(5.0));
    }

    #[test]
    fn test_follows_the_clock() {
        let clock = Rc::new(ManualClock::new());
        let s = spring(&clock).with_target(1.0);
        let ahead = s.value_at(0.1);

        clock.advance(0.1);
        assert!((s.value() - ahead).abs() < 1e-12);

        clock.advance(5.0);
        assert!(s.is_settled());
    }

    #[test]
    fn test_unchanged_target_is_not_a_reset() {
        let clock = Rc::new(ManualClock::new());
        let s = spring(&clock).with_target(1.0);

        s.set_target(1.0);
        assert_eq!(s.last_reset(), 0);

        s.set_target(2.0);
        assert_eq!(s.last_reset(), 1);
        s.set_value(0.5);
        s.set_velocity(1.0);
        s.set_period(0.5);
        s.set_damping_ratio(0.8);
        assert_eq!(s.last_reset(), 5);
    }

    #[test]
    fn test_mutations_pivot_at_now() {
        let clock = Rc::new(ManualClock::new());
        let s = spring(&clock).with_target(10.0);
        clock.advance(0.05);

        let (x, v) = (s.value(), s.velocity());
        s.set_target(-3.0);
        assert!((s.value() - x).abs() < 1e-6);
        assert!((s.velocity() - v).abs() < 1e-6);

        s.set_damping_ratio_and_period(0.5, 0.8);
        assert!((s.value() - x).abs() < 1e-6);
        assert!((s.period() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_should_stop_looks_ahead() {
        let clock = Rc::new(ManualClock::new());
        let s = spring(&clock).with_target(1.0);
        assert!(!s.should_stop(0.0));
        assert!(s.should_stop(3.0));
    }

    #[test]
    fn test_finish_snaps_to_target() {
        let clock = Rc::new(ManualClock::new());
        let s = spring(&clock).with_target(4.0);
        clock.advance(0.02);
        s.finish();
        assert!((s.value() - 4.0).abs() < 1e-9);
        assert!(s.velocity().abs() < 1e-9);
        assert!(s.is_settled());
        assert_eq!(s.last_reset(), 1);

        s.set_target(None);
        let resets = s.last_reset();
        s.finish();
        assert_eq!(s.last_reset(), resets);
    }
}
