//! Keyframe bridge
//!
//! Native declarative timelines need a concrete keyframe list, but spring
//! motion is continuous and open-ended. [`ElementAnimationController`] samples
//! its inputs a bounded horizon ahead, hands the samples to its targets as a
//! linear, fill-forward animation, and samples again when:
//!
//! - an input is new, or its discontinuity counter changed (`set_inputs`)
//! - the animation reached the horizon before the motion settled
//!
//! When the sampled motion settles inside the horizon the animation is the last
//! one and its completion is reported through `on_finish`.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::ops::Index;
use std::rc::{Rc, Weak};
use yamdl_core::{Clock, Emitter, ListenerId};

use crate::config::{sample_count, MotionConfig};
use crate::easing::Easing;
use crate::keyframe::FillMode;
use crate::timeline::{AnimationTarget, AnimationTiming, FinishCallback, NativeAnimation};

/// Something whose motion can be evaluated at any clock time
pub trait MotionInput {
    fn value_at(&self, t: f64) -> f64;

    fn velocity_at(&self, t: f64) -> f64;

    /// Whether the motion is at rest at clock time `t`
    fn should_stop(&self, t: f64) -> bool;

    /// Counter bumped on every discontinuity (target or value forcibly reset)
    fn last_reset(&self) -> u64;
}

type InputRef = Rc<dyn MotionInput>;

fn input_key(input: &InputRef) -> usize {
    Rc::as_ptr(input) as *const () as usize
}

/// The inputs of a controller, by name or by position
///
/// The shape is fixed at construction and carried over to [`SampledValues`].
#[derive(Clone)]
pub enum MotionInputs {
    Named(Vec<(String, InputRef)>),
    Positional(Vec<InputRef>),
}

impl MotionInputs {
    pub fn named() -> Self {
        MotionInputs::Named(Vec::new())
    }

    pub fn positional() -> Self {
        MotionInputs::Positional(Vec::new())
    }

    /// Add an input. Positional inputs ignore the name.
    pub fn with(mut self, name: impl Into<String>, input: InputRef) -> Self {
        match &mut self {
            MotionInputs::Named(entries) => entries.push((name.into(), input)),
            MotionInputs::Positional(entries) => entries.push(input),
        }
        self
    }

    /// Append an input. Named inputs are keyed by their position.
    pub fn push(self, input: InputRef) -> Self {
        let name = self.len().to_string();
        self.with(name, input)
    }

    pub fn len(&self) -> usize {
        match self {
            MotionInputs::Named(entries) => entries.len(),
            MotionInputs::Positional(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputRef> + '_ {
        let (named, positional) = match self {
            MotionInputs::Named(entries) => (Some(entries.iter().map(|(_, input)| input)), None),
            MotionInputs::Positional(entries) => (None, Some(entries.iter())),
        };
        named
            .into_iter()
            .flatten()
            .chain(positional.into_iter().flatten())
    }

    /// Evaluate every input at clock time `t`
    pub fn sample(&self, t: f64) -> SampledValues {
        match self {
            MotionInputs::Named(entries) => SampledValues::Named(
                entries
                    .iter()
                    .map(|(name, input)| (name.clone(), input.value_at(t)))
                    .collect(),
            ),
            MotionInputs::Positional(entries) => {
                SampledValues::Positional(entries.iter().map(|input| input.value_at(t)).collect())
            }
        }
    }
}

impl Default for MotionInputs {
    fn default() -> Self {
        Self::named()
    }
}

impl std::fmt::Debug for MotionInputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MotionInputs::Named(entries) => f
                .debug_list()
                .entries(entries.iter().map(|(name, _)| name))
                .finish(),
            MotionInputs::Positional(entries) => f
                .debug_struct("Positional")
                .field("len", &entries.len())
                .finish(),
        }
    }
}

/// Input values at one instant, in the shape the inputs were given
#[derive(Clone, Debug, PartialEq)]
pub enum SampledValues {
    Named(IndexMap<String, f64>),
    Positional(Vec<f64>),
}

impl SampledValues {
    pub fn get(&self, name: &str) -> Option<f64> {
        match self {
            SampledValues::Named(values) => values.get(name).copied(),
            SampledValues::Positional(_) => None,
        }
    }

    /// Value by position; named values keep insertion order
    pub fn at(&self, index: usize) -> Option<f64> {
        match self {
            SampledValues::Named(values) => values.get_index(index).map(|(_, v)| *v),
            SampledValues::Positional(values) => values.get(index).copied(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SampledValues::Named(values) => values.len(),
            SampledValues::Positional(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Index<&str> for SampledValues {
    type Output = f64;

    fn index(&self, name: &str) -> &f64 {
        match self {
            SampledValues::Named(values) => &values[name],
            SampledValues::Positional(_) => panic!("no input named {:?}", name),
        }
    }
}

impl Index<usize> for SampledValues {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        match self {
            SampledValues::Named(values) => &values[index],
            SampledValues::Positional(values) => &values[index],
        }
    }
}

/// Emitted after every resolve
#[derive(Clone, Debug)]
pub struct ResolveEvent<S> {
    /// Styles at evenly spaced instants, starting now
    pub keyframes: Vec<S>,
    pub duration_ms: f64,
    /// True when every input settles within these keyframes
    pub settles: bool,
}

/// Styles for a set of input values at a clock time
pub type ComputeStyles<S> = dyn Fn(&SampledValues, f64) -> S;

struct ControllerState {
    inputs: MotionInputs,
    /// Tracked inputs and the discontinuity counter last seen for each
    tracked: IndexMap<usize, (InputRef, u64)>,
    animations: Vec<Box<dyn NativeAnimation>>,
    mounted: bool,
    dropped: bool,
    /// Invalidates finish callbacks of superseded animations
    generation: u64,
    resolve_count: u64,
}

struct Core<S> {
    compute_styles: Box<ComputeStyles<S>>,
    targets: Vec<Rc<dyn AnimationTarget<S>>>,
    clock: Rc<dyn Clock>,
    horizon: f64,
    step: f64,
    state: RefCell<ControllerState>,
    resolved: Emitter<ResolveEvent<S>>,
    finished: Emitter<()>,
}

/// Drives target animations from continuously evaluable motion inputs
///
/// Call [`set_inputs`](Self::set_inputs) on every render pass, and
/// [`did_mount`](Self::did_mount)/[`unmount`](Self::unmount) at the element's
/// lifecycle boundaries. Dropping the controller cancels its animations.
pub struct ElementAnimationController<S> {
    core: Rc<Core<S>>,
}

impl<S: Clone + 'static> ElementAnimationController<S> {
    pub fn new<F>(compute_styles: F, targets: Vec<Rc<dyn AnimationTarget<S>>>, clock: Rc<dyn Clock>) -> Self
    where
        F: Fn(&SampledValues, f64) -> S + 'static,
    {
        Self::with_config(&MotionConfig::default(), compute_styles, targets, clock)
    }

    /// Create a controller using the configured horizon and step
    pub fn with_config<F>(
        config: &MotionConfig,
        compute_styles: F,
        targets: Vec<Rc<dyn AnimationTarget<S>>>,
        clock: Rc<dyn Clock>,
    ) -> Self
    where
        F: Fn(&SampledValues, f64) -> S + 'static,
    {
        Self {
            core: Rc::new(Core {
                compute_styles: Box::new(compute_styles),
                targets,
                clock,
                horizon: config.keyframe_horizon,
                step: config.keyframe_step,
                state: RefCell::new(ControllerState {
                    inputs: MotionInputs::default(),
                    tracked: IndexMap::new(),
                    animations: Vec::new(),
                    mounted: false,
                    dropped: false,
                    generation: 0,
                    resolve_count: 0,
                }),
                resolved: Emitter::new(),
                finished: Emitter::new(),
            }),
        }
    }

    /// Record the current inputs, resolving if the motion changed shape
    ///
    /// Resolves when an input wasn't tracked before or its discontinuity
    /// counter moved since it was last seen. Inputs no longer present stop
    /// being tracked.
    pub fn set_inputs(&self, inputs: MotionInputs) {
        let needs_resolve = {
            let mut state = self.core.state.borrow_mut();
            let mut needs_resolve = false;
            let mut present = FxHashSet::default();

            for input in inputs.iter() {
                let key = input_key(input);
                present.insert(key);
                let reset = input.last_reset();
                let changed = match state.tracked.get(&key) {
                    Some((_, seen)) => *seen != reset,
                    None => true,
                };
                if changed {
                    state.tracked.insert(key, (input.clone(), reset));
                    needs_resolve = true;
                }
            }

            state.tracked.retain(|key, _| present.contains(key));
            state.inputs = inputs;
            needs_resolve
        };

        if needs_resolve {
            resolve(&self.core);
        }
    }

    /// Sample the inputs and restart the target animations
    ///
    /// Keyframe `i` is sampled at `now + i * step`, so the animation lasts
    /// `(keyframes - 1) * step` and stays aligned with clock time. With the
    /// defaults an unsettled resolve spans 59/60 s, one step short of the
    /// horizon, and the next resolve picks up from there.
    ///
    /// No-op before [`did_mount`](Self::did_mount) and after
    /// [`unmount`](Self::unmount).
    pub fn resolve(&self) {
        resolve(&self.core);
    }

    /// Styles at the current instant, without touching the targets
    pub fn get_current_styles(&self) -> S {
        let now = self.core.clock.now();
        let values = self.core.state.borrow().inputs.sample(now);
        (self.core.compute_styles)(&values, now)
    }

    /// The element exists: start animating it
    pub fn did_mount(&self) {
        {
            let mut state = self.core.state.borrow_mut();
            if state.dropped || state.mounted {
                return;
            }
            state.mounted = true;
        }
        resolve(&self.core);
    }

    /// Cancel the running animations and make the controller inert
    pub fn unmount(&self) {
        let animations = {
            let mut state = self.core.state.borrow_mut();
            if state.dropped {
                return;
            }
            state.dropped = true;
            state.mounted = false;
            std::mem::take(&mut state.animations)
        };
        for animation in animations {
            animation.cancel();
        }
        tracing::debug!("ElementAnimationController: unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.core.state.borrow().mounted
    }

    pub fn is_dropped(&self) -> bool {
        self.core.state.borrow().dropped
    }

    /// Number of resolves that produced keyframes
    pub fn resolve_count(&self) -> u64 {
        self.core.state.borrow().resolve_count
    }

    /// Number of inputs currently tracked
    pub fn tracked_inputs(&self) -> usize {
        self.core.state.borrow().tracked.len()
    }

    pub fn horizon(&self) -> f64 {
        self.core.horizon
    }

    pub fn step(&self) -> f64 {
        self.core.step
    }

    pub fn on_resolve<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&ResolveEvent<S>) + 'static,
    {
        self.core.resolved.on(listener)
    }

    pub fn off_resolve(&self, id: ListenerId) -> bool {
        self.core.resolved.off(id)
    }

    /// Listen for the end of a motion that settled
    pub fn on_finish<F>(&self, mut listener: F) -> ListenerId
    where
        F: FnMut() + 'static,
    {
        self.core.finished.on(move |_| listener())
    }

    pub fn off_finish(&self, id: ListenerId) -> bool {
        self.core.finished.off(id)
    }
}

impl<S> Drop for ElementAnimationController<S> {
    fn drop(&mut self) {
        let animations = match self.core.state.try_borrow_mut() {
            Ok(mut state) => {
                state.dropped = true;
                std::mem::take(&mut state.animations)
            }
            Err(_) => return,
        };
        for animation in animations {
            animation.cancel();
        }
    }
}

impl<S> std::fmt::Debug for ElementAnimationController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.core.state.borrow();
        f.debug_struct("ElementAnimationController")
            .field("inputs", &state.inputs)
            .field("targets", &self.core.targets.len())
            .field("mounted", &state.mounted)
            .field("dropped", &state.dropped)
            .field("resolve_count", &state.resolve_count)
            .finish()
    }
}

fn resolve<S: Clone + 'static>(core: &Rc<Core<S>>) {
    let (inputs, tracked) = {
        let state = core.state.borrow();
        if state.dropped || !state.mounted {
            return;
        }
        let tracked: SmallVec<[InputRef; 8]> =
            state.tracked.values().map(|(input, _)| input.clone()).collect();
        (state.inputs.clone(), tracked)
    };

    let now = core.clock.now();
    let samples = sample_count(core.horizon, core.step);
    let step = if core.step > 0.0 { core.step } else { 0.0 };

    let mut keyframes = Vec::with_capacity(samples);
    let mut settles = false;
    for i in 0..samples {
        let t = now + i as f64 * step;
        keyframes.push((core.compute_styles)(&inputs.sample(t), t));

        if tracked.iter().all(|input| input.should_stop(t)) {
            settles = true;
            break;
        }
    }

    // Keyframe i sits at i * step
    let duration_ms = (keyframes.len() - 1) as f64 * step * 1000.0;

    let (previous, generation) = {
        let mut state = core.state.borrow_mut();
        state.generation += 1;
        state.resolve_count += 1;
        (std::mem::take(&mut state.animations), state.generation)
    };
    for animation in previous {
        animation.cancel();
    }

    let timing = AnimationTiming::new(duration_ms)
        .with_easing(Easing::Linear)
        .with_fill(FillMode::Forwards);

    let mut animations = Vec::with_capacity(core.targets.len());
    let mut on_finish = Some(finish_callback(core, generation, settles));
    for target in core.targets.iter().filter(|target| target.is_attached()) {
        // Completion is observed on the first target only
        animations.push(target.animate(keyframes.clone(), timing, on_finish.take()));
    }
    core.state.borrow_mut().animations = animations;

    tracing::debug!(
        keyframes = keyframes.len(),
        duration_ms,
        settles,
        "ElementAnimationController: resolved"
    );
    core.resolved.emit(&ResolveEvent {
        keyframes,
        duration_ms,
        settles,
    });
}

fn finish_callback<S: Clone + 'static>(core: &Rc<Core<S>>, generation: u64, settles: bool) -> FinishCallback {
    let core: Weak<Core<S>> = Rc::downgrade(core);
    Box::new(move || {
        let Some(core) = core.upgrade() else {
            return;
        };
        {
            let state = core.state.borrow();
            if state.dropped || state.generation != generation {
                return;
            }
        }

        if settles {
            tracing::debug!("ElementAnimationController: finished");
            core.finished.emit(&());
        } else {
            resolve(&core);
        }
    })
}
