//! Closed-form damped harmonic oscillator
//!
//! Solves `x'' + friction·x' + ω₀²·(x - target) = 0` analytically, so a spring
//! can be evaluated at any time without integrating. Three regimes:
//!
//! - **Underdamped** (`damping_ratio < 1`): decaying cosine around the target
//! - **Critically damped / overdamped** (`damping_ratio >= 1`): sum of two
//!   real exponentials
//! - **Free** (no target): velocity decays as `v' = -friction·v`, nothing pulls
//!   the value back
//!
//! Every coefficient is relative to the last *pivot*: each mutator evaluates the
//! current value and velocity at the pivot time and re-derives the coefficients
//! as if time restarted at 0. Value and velocity are therefore continuous across
//! any parameter change.
//!
//! Invalid parameters (period <= 0, negative damping ratio) are not rejected;
//! they propagate as NaN/inf like any other floating point math.

use std::f64::consts::PI;

/// Floor for the damped friction term; keeps the exact critical point finite
const MIN_DAMPED_FRICTION: f64 = 1e-5;

/// Below this displacement the underdamped amplitude is derived from velocity
const SMALL_DISPLACEMENT: f64 = 1e-5;

/// Friction coefficient for a damping ratio and oscillation period
pub fn friction_for(damping_ratio: f64, period: f64) -> f64 {
    damping_ratio * (4.0 * PI / period)
}

/// Regime-specific coefficients, valid from the last pivot (t = 0)
#[derive(Clone, Copy, Debug, PartialEq)]
enum Motion {
    Free {
        value_offset: f64,
        velocity: f64,
    },
    Underdamped {
        target: f64,
        amplitude: f64,
        damped_angular_frequency: f64,
        angular_offset: f64,
    },
    Overdamped {
        target: f64,
        damped_friction: f64,
        a1: f64,
        a2: f64,
    },
}

/// Position and velocity of a single damped oscillator as a function of time
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringSolver {
    damping_ratio: f64,
    friction: f64,
    undamped_angular_frequency: f64,
    target: Option<f64>,
    motion: Motion,
}

impl SpringSolver {
    /// Create a solver at rest at 0, targeting 0
    pub fn new(damping_ratio: f64, period: f64) -> Self {
        let mut solver = Self {
            damping_ratio,
            friction: friction_for(damping_ratio, period),
            undamped_angular_frequency: 2.0 * PI / period,
            target: Some(0.0),
            motion: Motion::Free {
                value_offset: 0.0,
                velocity: 0.0,
            },
        };
        solver.hydrate(0.0, 0.0);
        solver
    }

    pub fn damping_ratio(&self) -> f64 {
        self.damping_ratio
    }

    pub fn friction(&self) -> f64 {
        self.friction
    }

    pub fn undamped_angular_frequency(&self) -> f64 {
        self.undamped_angular_frequency
    }

    /// Oscillation period implied by the current parameters
    pub fn period(&self) -> f64 {
        2.0 * PI / self.undamped_angular_frequency
    }

    /// `None` means no restoring force: the value coasts and decelerates
    pub fn target(&self) -> Option<f64> {
        self.target
    }

    /// Derive coefficients for the given initial conditions at t = 0
    fn hydrate(&mut self, initial_value: f64, initial_velocity: f64) {
        let Some(target) = self.target else {
            let value_offset = initial_value
                + if self.friction == 0.0 {
                    0.0
                } else {
                    initial_velocity / self.friction
                };
            self.motion = Motion::Free {
                value_offset,
                velocity: initial_velocity,
            };
            return;
        };

        // With a zero damping ratio the frequency can't be recovered from friction,
        // so the last known one (initially from the period) stays in effect
        if self.damping_ratio > 0.0 {
            self.undamped_angular_frequency = self.friction / self.damping_ratio / 2.0;
        }

        let x0 = initial_value - target;
        let v0 = initial_velocity;
        let friction = self.friction;
        let omega = self.undamped_angular_frequency;

        self.motion = if self.damping_ratio < 1.0 {
            let damped_angular_frequency = omega * (1.0 - self.damping_ratio.powi(2)).sqrt();
            let angular_offset =
                (2.0 * v0 + friction * x0).atan2(2.0 * x0 * damped_angular_frequency);
            let amplitude = if x0.abs() < SMALL_DISPLACEMENT {
                sign(v0) * v0 / damped_angular_frequency
            } else {
                x0 / angular_offset.cos()
            };
            Motion::Underdamped {
                target,
                amplitude,
                damped_angular_frequency,
                angular_offset,
            }
        } else {
            let damped_friction = MIN_DAMPED_FRICTION
                .max(((friction / 2.0).powi(2) - omega.powi(2)).sqrt() * 2.0);
            let a1 = (-2.0 * v0 + x0 * (-friction + damped_friction)) / (2.0 * damped_friction);
            let a2 = (2.0 * v0 + x0 * (friction + damped_friction)) / (2.0 * damped_friction);
            Motion::Overdamped {
                target,
                damped_friction,
                a1,
                a2,
            }
        };
    }

    /// Value at time `t` since the last pivot
    pub fn value(&self, t: f64) -> f64 {
        let friction = self.friction;
        match self.motion {
            Motion::Free {
                value_offset,
                velocity,
            } => {
                if friction == 0.0 {
                    value_offset + t * velocity
                } else {
                    // v = k·e^(-ct)  =>  x = C - k·e^(-ct) / c
                    value_offset - velocity * (-t * friction).exp() / friction
                }
            }
            Motion::Underdamped {
                target,
                amplitude,
                damped_angular_frequency,
                angular_offset,
            } => {
                amplitude
                    * (-t * friction / 2.0).exp()
                    * (damped_angular_frequency * t - angular_offset).cos()
                    + target
            }
            Motion::Overdamped {
                target,
                damped_friction,
                a1,
                a2,
            } => {
                a1 * (t * (-friction - damped_friction) / 2.0).exp()
                    + a2 * (t * (-friction + damped_friction) / 2.0).exp()
                    + target
            }
        }
    }

    /// Velocity at time `t` since the last pivot
    pub fn velocity(&self, t: f64) -> f64 {
        let friction = self.friction;
        match self.motion {
            Motion::Free { velocity, .. } => velocity * (-t * friction).exp(),
            Motion::Underdamped {
                amplitude,
                damped_angular_frequency,
                angular_offset,
                ..
            } => {
                let decay = (-t * friction / 2.0).exp();
                let phase = damped_angular_frequency * t - angular_offset;
                amplitude
                    * (-friction / 2.0 * decay * phase.cos()
                        - damped_angular_frequency * decay * phase.sin())
            }
            Motion::Overdamped {
                damped_friction,
                a1,
                a2,
                ..
            } => {
                let fast = (-friction - damped_friction) / 2.0;
                let slow = (-friction + damped_friction) / 2.0;
                a1 * fast * (t * fast).exp() + a2 * slow * (t * slow).exp()
            }
        }
    }

    /// Value and velocity at time `t`
    pub fn state(&self, t: f64) -> (f64, f64) {
        (self.value(t), self.velocity(t))
    }

    /// Change the target, keeping value and velocity. `t` becomes the new zero.
    pub fn retarget(&mut self, t: f64, target: Option<f64>) {
        let (value, velocity) = self.state(t);
        self.target = target;
        self.hydrate(value, velocity);
    }

    /// Replace the velocity, keeping the value. `t` becomes the new zero.
    pub fn reset_velocity(&mut self, t: f64, velocity: f64) {
        let value = self.value(t);
        self.hydrate(value, velocity);
    }

    /// Change the damping ratio, keeping friction. `t` becomes the new zero.
    pub fn reset_damping_ratio(&mut self, t: f64, damping_ratio: f64) {
        let (value, velocity) = self.state(t);
        self.damping_ratio = damping_ratio;
        self.hydrate(value, velocity);
    }

    /// Change the friction coefficient. `t` becomes the new zero.
    pub fn reset_friction(&mut self, t: f64, friction: f64) {
        let (value, velocity) = self.state(t);
        self.friction = friction;
        self.hydrate(value, velocity);
    }

    /// Change the period, keeping the damping ratio. `t` becomes the new zero.
    pub fn reset_period(&mut self, t: f64, period: f64) {
        if self.damping_ratio == 0.0 {
            self.undamped_angular_frequency = 2.0 * PI / period;
        }
        self.reset_friction(t, friction_for(self.damping_ratio, period));
    }

    /// Replace the value, keeping the velocity. `t` becomes the new zero.
    pub fn reset_value(&mut self, t: f64, value: f64) {
        let velocity = self.velocity(t);
        self.hydrate(value, velocity);
    }
}

/// Sign with `sign(0) == 0`, unlike `f64::signum`
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}
