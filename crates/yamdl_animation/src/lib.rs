//! Yamdl Animation System
//!
//! Closed-form spring physics, a shared frame scheduler, and a bridge that turns
//! spring motion into keyframes for declarative timelines.
//!
//! # Features
//!
//! - **Spring solver**: exact damped-oscillator solution in every damping regime,
//!   with continuous retargeting
//! - **Springs**: frame-driven ([`Spring`]) and clock-anchored ([`RealtimeSpring`])
//! - **Scheduler**: one cooperative frame loop for every animated object
//! - **Keyframe bridge**: samples motion a bounded horizon ahead and hands it to
//!   native timelines, re-sampling only when the motion changes shape
//! - **Software timeline**: plays keyframe animations when the host has no native one
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use yamdl_animation::{AnimationScheduler, Spring, SpringConfig};
//! use yamdl_core::{FrameQueue, ManualClock};
//!
//! let clock = Rc::new(ManualClock::new());
//! let frames = Rc::new(FrameQueue::new());
//! let scheduler = AnimationScheduler::new(clock.clone(), frames.clone());
//!
//! let spring = Spring::shared(&scheduler.handle(), SpringConfig::presence(), 0.0);
//! spring.borrow_mut().retarget(1.0);
//! spring.borrow().start();
//!
//! for _ in 0..120 {
//!     clock.advance(1.0 / 60.0);
//!     frames.dispatch();
//! }
//!
//! assert!((spring.borrow().value() - 1.0).abs() < 1e-3);
//! assert!(!scheduler.is_running());
//! ```

pub mod bridge;
pub mod config;
pub mod easing;
pub mod keyframe;
pub mod math;
pub mod realtime;
pub mod scheduler;
pub mod solver;
pub mod spring;
pub mod timeline;

pub use bridge::{
    ComputeStyles, ElementAnimationController, MotionInput, MotionInputs, ResolveEvent,
    SampledValues,
};
pub use config::{ConfigError, MotionConfig};
pub use easing::Easing;
pub use keyframe::{FillMode, Interpolate, Keyframe, KeyframeAnimation, StyleFrame};
pub use math::{clamp, lerp};
pub use realtime::RealtimeSpring;
pub use scheduler::{Animatable, AnimationScheduler, SchedulerHandle};
pub use solver::SpringSolver;
pub use spring::{DampingRegime, SharedSpring, Spring, SpringConfig, SpringKeyframes};
pub use timeline::{
    AnimationTarget, AnimationTiming, FinishCallback, NativeAnimation, PlaybackId,
    TimelineTarget,
};
