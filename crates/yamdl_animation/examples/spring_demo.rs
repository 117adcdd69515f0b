//! Spring Animation Demo
//!
//! Drives two kinds of motion headlessly on the fixed-rate frame fallback:
//! - A frame-driven spring rotating a menu icon, updated by the scheduler
//! - A dialog whose presence spring is turned into keyframes by the bridge and
//!   played on a software timeline
//!
//! Pass a directory or `motion.toml` path to override the motion config.
//!
//! Run with: cargo run -p yamdl_animation --example spring_demo [-- path/to/motion.toml]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use yamdl_animation::{
    clamp, lerp, Animatable, AnimationScheduler, AnimationTarget, ElementAnimationController,
    MotionConfig, MotionInputs, RealtimeSpring, SampledValues, Spring, SpringConfig, StyleFrame,
    TimelineTarget,
};
use yamdl_core::{Clock, FrameQueue, MonotonicClock};

/// Plays the dialog's timeline in step with the scheduler
struct TimelineDriver {
    timeline: TimelineTarget<StyleFrame>,
    done: Rc<Cell<bool>>,
}

impl Animatable for TimelineDriver {
    fn update(&mut self, dt: f64) -> bool {
        self.timeline.tick(dt * 1000.0);
        if let Some(style) = self.timeline.current_style() {
            tracing::info!(
                opacity = style.resolved_opacity(),
                transform = style.css_transform().unwrap_or_default(),
                "dialog"
            );
        }
        !self.done.get()
    }
}

fn dialog_styles(values: &SampledValues, _t: f64) -> StyleFrame {
    let presence = values["presence"];
    StyleFrame::new()
        .with_opacity(clamp(lerp(0.0, 50.0, presence), 0.0, 1.0))
        .with_translate(0.0, lerp(100.0, 0.0, presence))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => MotionConfig::load(path)?,
        None => MotionConfig::default(),
    };

    let clock: Rc<dyn Clock> = Rc::new(MonotonicClock::new());
    let frames = Rc::new(FrameQueue::new());
    let scheduler = AnimationScheduler::with_config(&config, clock.clone(), frames.clone());

    // Menu icon: 0 is the hamburger, 1 is the back arrow
    let icon = Spring::shared(&scheduler.handle(), SpringConfig::relaxed(), 0.0);
    {
        let mut icon = icon.borrow_mut();
        icon.set_tolerance(config.tolerance);
        icon.on_update(|value| {
            tracing::info!(rotate = lerp(0.0, 180.0, *value), "menu icon");
        });
        icon.retarget(1.0);
        icon.start();
    }

    // Dialog: presence springs from closed to open
    let presence = Rc::new(
        RealtimeSpring::new(clock.clone(), config.spring).with_tolerance(config.tolerance),
    );
    let timeline = TimelineTarget::<StyleFrame>::new();
    let target: Rc<dyn AnimationTarget<StyleFrame>> = Rc::new(timeline.clone());
    let controller =
        ElementAnimationController::with_config(&config, dialog_styles, vec![target], clock.clone());

    let done = Rc::new(Cell::new(false));
    let finished = done.clone();
    controller.on_resolve(|event| {
        tracing::info!(
            keyframes = event.keyframes.len(),
            duration_ms = event.duration_ms,
            settles = event.settles,
            "dialog resolved"
        );
    });
    controller.on_finish(move || finished.set(true));

    presence.set_target(1.0);
    controller.set_inputs(MotionInputs::named().with("presence", presence.clone()));
    controller.did_mount();

    let driver = Rc::new(RefCell::new(TimelineDriver {
        timeline,
        done: done.clone(),
    }));
    scheduler.register_rc(&driver);

    let ran = frames.run_fixed_rate(config.fallback_frame_interval(), 600);
    tracing::info!(
        frames = ran,
        icon = icon.borrow().value(),
        presence = presence.value(),
        settled = done.get(),
        "demo finished"
    );

    controller.unmount();
    Ok(())
}
