//! Benchmarks for spring evaluation and keyframe sampling
//!
//! - Closed-form solver evaluation in each damping regime
//! - Adaptive keyframe generation from a frame-driven spring
//! - A full bridge resolve over the default one-second horizon

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::rc::Rc;
use yamdl_animation::{
    AnimationTarget, AnimationTiming, ElementAnimationController, FinishCallback, MotionInputs,
    NativeAnimation, RealtimeSpring, Spring, SpringConfig, SpringSolver,
};
use yamdl_core::ManualClock;

struct Discard;

impl NativeAnimation for Discard {
    fn cancel(&self) {}
}

/// Target that drops every animation it is given
struct NullTarget;

impl AnimationTarget<f64> for NullTarget {
    fn animate(
        &self,
        keyframes: Vec<f64>,
        _timing: AnimationTiming,
        _on_finish: Option<FinishCallback>,
    ) -> Box<dyn NativeAnimation> {
        black_box(keyframes);
        Box::new(Discard)
    }
}

fn bench_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver_value");
    for damping_ratio in [0.3, 1.0, 2.5] {
        let mut solver = SpringSolver::new(damping_ratio, 0.3);
        solver.retarget(0.0, Some(1.0));

        group.bench_with_input(
            BenchmarkId::from_parameter(damping_ratio),
            &solver,
            |b, solver| {
                b.iter(|| {
                    let mut sum = 0.0;
                    for i in 0..60 {
                        let t = i as f64 / 60.0;
                        sum += solver.value(black_box(t)) + solver.velocity(t);
                    }
                    sum
                });
            },
        );
    }
    group.finish();
}

fn bench_keyframes(c: &mut Criterion) {
    let mut spring = Spring::new(SpringConfig::ripple(), 0.0);
    spring.retarget(100.0);
    let tolerance = spring.tolerance();

    c.bench_function("spring_keyframes", |b| {
        b.iter(|| {
            spring
                .keyframes(
                    |value, velocity, _| (value - 100.0).abs() + velocity.abs() <= tolerance,
                    black_box(10.0),
                )
                .count()
        });
    });
}

fn bench_bridge_resolve(c: &mut Criterion) {
    let clock = Rc::new(ManualClock::new());
    let spring = Rc::new(RealtimeSpring::new(clock.clone(), SpringConfig::ripple_hold()).with_target(1.0));
    let target: Rc<dyn AnimationTarget<f64>> = Rc::new(NullTarget);
    let controller = ElementAnimationController::new(
        |values, _| values[0],
        vec![target],
        clock.clone(),
    );
    controller.set_inputs(MotionInputs::positional().push(spring));
    controller.did_mount();

    c.bench_function("bridge_resolve", |b| {
        b.iter(|| controller.resolve());
    });
}

criterion_group!(benches, bench_solver, bench_keyframes, bench_bridge_resolve);
criterion_main!(benches);
