//! Ephemeral visual particle emitter.
//!
//! An [`Emitter`] produces a rate-limited, population-capped stream of
//! short-lived visual instances. Each instance is attached to a [`Stage`],
//! handed to an [`Animator`] for its birth-to-death tween, and retired when the
//! tween completes. A periodic [`Emitter::sweep`] catches instances whose
//! completion never arrived.
//!
//! The engine never touches the DOM directly; the browser implementations of
//! the seams live in `crate::web`, the headless ones in [`manual`].
//!
//! Everything runs on one thread. Runtime state sits behind `Rc<RefCell<_>>`
//! so completion callbacks can retire instances; no borrow is held across a
//! call into the animator, so an animator that completes synchronously is
//! fine.

pub mod manual;
pub mod motion;
pub mod policy;
pub mod random;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use log::{debug, info, trace, warn};

use crate::error::EffectsError;
pub use motion::{Easing, Frame, Motion, Variation};
pub use policy::{EmitterPolicy, Entry, Point, Range, SpawnSchedule};
pub use random::{RandomSource, ScriptedRandom, SplitMix64};

pub type InstanceId = u64;

// --- Capability seams -------------------------------------------------------

/// Monotonic time source in milliseconds.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Where instances are drawn: creates and removes visual nodes.
pub trait Stage {
    type Node: Clone + 'static;

    fn attach(&self, appearance: &Appearance) -> Result<Self::Node, EffectsError>;
    /// Removes `node`; must tolerate nodes that are already gone.
    fn detach(&self, node: &Self::Node);
    /// Width and height of the drawing area in px.
    fn viewport(&self) -> (f64, f64);
}

/// Declarative tweening capability.
///
/// `run` plays `tween` on `node` and calls `on_complete` once, near the end of
/// the tween. Looping tweens never complete.
pub trait Animator<N> {
    fn run(&self, node: &N, tween: Tween, on_complete: Box<dyn FnOnce()>);
}

/// Birth styling for a new node.
#[derive(Clone, Debug, PartialEq)]
pub struct Appearance {
    pub position: Point,
    pub size: f64,
    pub color: String,
    pub glow: bool,
    pub frame: Frame,
}

impl Appearance {
    /// Inline style string for a DOM node.
    pub fn to_style(&self) -> String {
        let px = motion::css_num;
        let mut style = format!(
            "position: absolute; left: {}px; top: {}px; width: {}px; height: {}px; background: {}; \
             border-radius: 50%; pointer-events: none; will-change: transform, opacity; ",
            px(self.position.x),
            px(self.position.y),
            px(self.size),
            px(self.size),
            self.color
        );
        if self.glow {
            style.push_str(&format!("box-shadow: 0 0 10px {}; ", self.color));
        }
        style.push_str(&self.frame.to_css());
        style
    }
}

/// One birth-to-death animation.
#[derive(Clone, Debug, PartialEq)]
pub struct Tween {
    /// `(offset in 0..=1, frame)` pairs, first at 0, last at 1.
    pub keyframes: Vec<(f64, Frame)>,
    pub duration_ms: f64,
    /// Negative values start a loop part-way through its cycle.
    pub delay_ms: f64,
    pub easing: Easing,
    pub looping: bool,
}

impl Tween {
    /// Birth frame.
    pub fn start_frame(&self) -> Frame {
        self.keyframes.first().map(|(_, f)| *f).unwrap_or_default()
    }

    /// Death frame.
    pub fn end_frame(&self) -> Frame {
        self.keyframes.last().map(|(_, f)| *f).unwrap_or_default()
    }
}

// --- Runtime state -----------------------------------------------------------

/// One live instance.
#[derive(Clone, Debug)]
pub struct ParticleInstance<N> {
    pub id: InstanceId,
    pub node: N,
    pub spawned_at: f64,
    pub lifetime: f64,
    pub death_at: f64,
    pub looping: bool,
    pub color: String,
    pub size: f64,
    pub position: Point,
    pub variation: Variation,
}

impl<N> ParticleInstance<N> {
    /// Past its death timestamp and eligible for the sweep.
    pub fn is_due(&self, now: f64) -> bool {
        !self.looping && now >= self.death_at
    }
}

/// Counters exposed for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmitterStats {
    pub live: usize,
    pub spawned: u64,
    pub retired: u64,
}

/// Mutable state of one running emitter.
#[derive(Debug)]
pub struct EmitterRuntimeState<N> {
    live: BTreeMap<InstanceId, ParticleInstance<N>>,
    last_spawn: Option<f64>,
    next_id: InstanceId,
    spawned: u64,
    retired: u64,
}

impl<N> Default for EmitterRuntimeState<N> {
    fn default() -> Self {
        Self { live: BTreeMap::new(), last_spawn: None, next_id: 0, spawned: 0, retired: 0 }
    }
}

impl<N> EmitterRuntimeState<N> {
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn last_spawn(&self) -> Option<f64> {
        self.last_spawn
    }

    fn insert(&mut self, mut instance: ParticleInstance<N>) -> InstanceId {
        let id = self.next_id;
        self.next_id += 1;
        instance.id = id;
        self.last_spawn = Some(instance.spawned_at);
        self.spawned += 1;
        self.live.insert(id, instance);
        id
    }

    fn remove(&mut self, id: InstanceId) -> Option<ParticleInstance<N>> {
        let removed = self.live.remove(&id);
        if removed.is_some() {
            self.retired += 1;
        }
        removed
    }
}

/// Detaches `id` if it is still live. Returns whether anything happened.
fn retire_in<S: Stage>(state: &RefCell<EmitterRuntimeState<S::Node>>, stage: &S, id: InstanceId) -> bool {
    let removed = state.borrow_mut().remove(id);
    match removed {
        Some(instance) => {
            stage.detach(&instance.node);
            true
        }
        None => {
            trace!("retire of instance {id} ignored: already retired");
            false
        }
    }
}

// --- Emitter -----------------------------------------------------------------

pub struct Emitter<S: Stage, A, C, R> {
    policy: EmitterPolicy,
    stage: Rc<S>,
    animator: A,
    clock: C,
    rng: R,
    state: Rc<RefCell<EmitterRuntimeState<S::Node>>>,
}

impl<S, A, C, R> Emitter<S, A, C, R>
where
    S: Stage + 'static,
    A: Animator<S::Node>,
    C: Clock,
    R: RandomSource,
{
    /// Starts an emitter, or explains why it could not.
    ///
    /// On success the policy's initial population is spawned right away.
    pub fn try_start(policy: EmitterPolicy, mount: Option<S>, animator: A, clock: C, rng: R) -> Result<Self, EffectsError> {
        let Some(stage) = mount else {
            return Err(EffectsError::MissingMount { emitter: policy.name });
        };
        if let Err(source) = policy.validate() {
            return Err(EffectsError::InvalidPolicy { emitter: policy.name, source });
        }
        let mut emitter = Self {
            policy,
            stage: Rc::new(stage),
            animator,
            clock,
            rng,
            state: Rc::new(RefCell::new(EmitterRuntimeState::default())),
        };
        let initial = emitter.policy.spawn.initial as usize;
        let spawned = emitter.burst(initial, None);
        info!("{}: started (cap {}, {} initial)", emitter.policy.name, emitter.policy.cap, spawned);
        Ok(emitter)
    }

    /// Like [`Emitter::try_start`], but a failure is only logged: decoration
    /// must never block the page.
    pub fn start(policy: EmitterPolicy, mount: Option<S>, animator: A, clock: C, rng: R) -> Option<Self> {
        match Self::try_start(policy, mount, animator, clock, rng) {
            Ok(emitter) => Some(emitter),
            Err(err) => {
                warn!("{err}; effect disabled");
                None
            }
        }
    }

    pub fn policy(&self) -> &EmitterPolicy {
        &self.policy
    }

    pub fn live_count(&self) -> usize {
        self.state.borrow().live_count()
    }

    pub fn stats(&self) -> EmitterStats {
        let state = self.state.borrow();
        EmitterStats { live: state.live_count(), spawned: state.spawned, retired: state.retired }
    }

    pub fn live_ids(&self) -> Vec<InstanceId> {
        self.state.borrow().live.keys().copied().collect()
    }

    /// Runs `f` against a live instance.
    pub fn with_instance<T>(&self, id: InstanceId, f: impl FnOnce(&ParticleInstance<S::Node>) -> T) -> Option<T> {
        self.state.borrow().live.get(&id).map(f)
    }

    /// One throttled, capped, chance-gated spawn attempt.
    ///
    /// `origin` is the anchor for [`Entry::Around`] policies (the cursor for
    /// the mouse trail). Returns `None` when the attempt was skipped. A lost
    /// chance roll restarts the throttle window only when the schedule's
    /// `consume_on_miss` is set.
    pub fn spawn_one(&mut self, origin: Option<Point>) -> Option<InstanceId> {
        let now = self.clock.now();
        {
            let state = self.state.borrow();
            if state.live_count() >= self.policy.cap {
                trace!("{}: at cap {}, spawn skipped", self.policy.name, self.policy.cap);
                return None;
            }
            if let Some(last) = state.last_spawn {
                if now - last < self.policy.spawn.min_interval_ms {
                    return None;
                }
            }
        }
        if !self.rng.chance(self.policy.spawn.chance) {
            if self.policy.spawn.consume_on_miss {
                self.state.borrow_mut().last_spawn = Some(now);
            }
            return None;
        }
        self.spawn_at(now, origin)
    }

    /// Spawns up to `count` instances at once, ignoring throttle and chance
    /// but never exceeding the cap. Returns how many were created.
    pub fn burst(&mut self, count: usize, origin: Option<Point>) -> usize {
        let now = self.clock.now();
        let mut spawned = 0;
        while spawned < count && self.live_count() < self.policy.cap {
            if self.spawn_at(now, origin).is_none() {
                break;
            }
            spawned += 1;
        }
        spawned
    }

    fn spawn_at(&mut self, now: f64, origin: Option<Point>) -> Option<InstanceId> {
        let policy = &self.policy;
        let viewport = self.stage.viewport();

        let lifetime = policy.lifetime.sample(&mut self.rng);
        let color = policy.palette[self.rng.pick(policy.palette.len())].clone();
        let size = policy.size.sample(&mut self.rng);
        let position = policy.entry.place(origin, viewport, &mut self.rng);
        let variation = policy.motion.draw_variation(&mut self.rng, viewport);
        // Loops start at a random phase so a fixed population doesn't pulse in unison.
        let delay_ms = if policy.looping { -self.rng.range(0.0, lifetime) } else { 0.0 };

        let appearance = Appearance {
            position,
            size,
            color: color.clone(),
            glow: policy.glow,
            frame: policy.motion.sample(0.0, &variation),
        };
        let node = match self.stage.attach(&appearance) {
            Ok(node) => node,
            Err(err) => {
                warn!("{}: {err}", policy.name);
                return None;
            }
        };
        let tween = Tween {
            keyframes: policy.motion.keyframes(&variation),
            duration_ms: lifetime,
            delay_ms,
            easing: policy.easing,
            looping: policy.looping,
        };

        let id = self.state.borrow_mut().insert(ParticleInstance {
            id: 0,
            node: node.clone(),
            spawned_at: now,
            lifetime,
            death_at: now + lifetime,
            looping: policy.looping,
            color,
            size,
            position,
            variation,
        });

        let on_complete = self.completion(id);
        self.animator.run(&node, tween, on_complete);
        Some(id)
    }

    fn completion(&self, id: InstanceId) -> Box<dyn FnOnce()> {
        let state: Weak<RefCell<EmitterRuntimeState<S::Node>>> = Rc::downgrade(&self.state);
        let stage = Rc::clone(&self.stage);
        Box::new(move || {
            if let Some(state) = state.upgrade() {
                retire_in::<S>(&state, &stage, id);
            }
        })
    }

    /// Motion frame of a live instance at `elapsed_fraction` of its life.
    pub fn advance(&self, id: InstanceId, elapsed_fraction: f64) -> Option<Frame> {
        self.with_instance(id, |inst| self.policy.motion.sample(elapsed_fraction, &inst.variation))
    }

    /// Detaches `id` and frees its slot. Safe to call any number of times.
    pub fn retire(&self, id: InstanceId) -> bool {
        retire_in::<S>(&self.state, &self.stage, id)
    }

    /// Force-retires every instance past its death timestamp.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let due: Vec<InstanceId> = self
            .state
            .borrow()
            .live
            .values()
            .filter(|inst| inst.is_due(now))
            .map(|inst| inst.id)
            .collect();
        let retired = due.into_iter().filter(|&id| self.retire(id)).count();
        if retired > 0 {
            debug!("{}: sweep retired {retired} overdue instance(s)", self.policy.name);
        }
        retired
    }

    /// Retires every live instance, looping ones included.
    pub fn stop(&self) -> usize {
        let ids = self.live_ids();
        let retired = ids.into_iter().filter(|&id| self.retire(id)).count();
        if retired > 0 {
            info!("{}: stopped, {retired} instance(s) removed", self.policy.name);
        }
        retired
    }
}
