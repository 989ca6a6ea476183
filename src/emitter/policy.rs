//! Immutable emitter configuration.

use super::motion::{Easing, Motion};
use super::random::RandomSource;
use crate::error::PolicyError;

/// Inclusive-exclusive `min..max` span drawn uniformly.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn sample<R: RandomSource + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.range(self.min, self.max)
    }

    fn check(&self, field: &'static str) -> Result<(), PolicyError> {
        if self.min.is_finite() && self.max.is_finite() && self.min <= self.max {
            Ok(())
        } else {
            Err(PolicyError::InvertedRange { field, min: self.min, max: self.max })
        }
    }
}

/// Viewport position in px.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Where a new instance appears.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Entry {
    /// Uniformly anywhere in the viewport.
    Anywhere,
    /// Random column, `offset` px above the top edge.
    TopEdge { offset: f64 },
    /// At the caller's origin (viewport centre if none), jittered by `±spread/2`.
    Around { spread: f64 },
}

impl Entry {
    pub fn place<R: RandomSource + ?Sized>(&self, origin: Option<Point>, viewport: (f64, f64), rng: &mut R) -> Point {
        let (w, h) = viewport;
        match *self {
            Entry::Anywhere => Point::new(rng.range(0.0, w), rng.range(0.0, h)),
            Entry::TopEdge { offset } => Point::new(rng.range(0.0, w), -offset),
            Entry::Around { spread } => {
                let centre = origin.unwrap_or(Point::new(w / 2.0, h / 2.0));
                if spread <= 0.0 {
                    return centre;
                }
                let half = spread / 2.0;
                Point::new(centre.x + rng.range(-half, half), centre.y + rng.range(-half, half))
            }
        }
    }
}

/// When and how often instances are produced.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpawnSchedule {
    /// Minimum wall-clock gap between two successful spawns.
    pub min_interval_ms: f64,
    /// Period of the recurring spawn timer; `None` means spawns are driven
    /// externally (pointer events) or only happen at start.
    pub timer_ms: Option<f64>,
    /// Probability that a throttle-passing attempt actually spawns.
    pub chance: f64,
    /// A throttle-passing attempt that loses the chance roll still restarts
    /// the throttle window.
    pub consume_on_miss: bool,
    /// Instances created immediately at start, bypassing the throttle.
    pub initial: u32,
    /// Extra start-up instances, one every `stagger_ms`, continuing the
    /// numbering after `initial`.
    pub follow_up: u32,
    pub stagger_ms: f64,
}

impl Default for SpawnSchedule {
    fn default() -> Self {
        Self {
            min_interval_ms: 0.0,
            timer_ms: None,
            chance: 1.0,
            consume_on_miss: false,
            initial: 0,
            follow_up: 0,
            stagger_ms: 0.0,
        }
    }
}

impl SpawnSchedule {
    /// Delays after start at which the follow-up instances are due.
    ///
    /// Instance `i` of the whole start-up wave lands at `i * stagger_ms`;
    /// the first `initial` of them are spawned right away instead.
    pub fn follow_up_delays(&self) -> impl Iterator<Item = f64> {
        let (initial, stagger) = (self.initial, self.stagger_ms);
        (0..self.follow_up).map(move |k| f64::from(initial + k) * stagger)
    }
}

pub const DEFAULT_SWEEP_INTERVAL_MS: f64 = 5_000.0;

/// Everything that distinguishes one effect from another.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmitterPolicy {
    /// Label used in diagnostics.
    pub name: String,
    /// Hard ceiling on simultaneously attached instances.
    pub cap: usize,
    pub spawn: SpawnSchedule,
    /// Lifetime in ms; for looping policies this is the loop period.
    pub lifetime: Range,
    /// Edge length in px.
    pub size: Range,
    pub motion: Motion,
    pub palette: Vec<String>,
    pub entry: Entry,
    pub easing: Easing,
    /// Looping instances never die on their own; only `stop` removes them.
    pub looping: bool,
    /// Box-shadow halo in the instance colour.
    pub glow: bool,
    pub sweep_interval_ms: f64,
}

impl EmitterPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.cap == 0 {
            return Err(PolicyError::ZeroCap);
        }
        if self.palette.is_empty() {
            return Err(PolicyError::EmptyPalette);
        }
        self.lifetime.check("lifetime")?;
        if self.lifetime.min <= 0.0 {
            return Err(PolicyError::NonPositiveLifetime(self.lifetime.min));
        }
        self.size.check("size")?;
        if let Motion::Burst { distance, .. } = &self.motion {
            distance.check("motion.distance")?;
        }
        if !(0.0..=1.0).contains(&self.spawn.chance) {
            return Err(PolicyError::InvalidChance(self.spawn.chance));
        }
        if !(self.spawn.min_interval_ms >= 0.0) {
            return Err(PolicyError::InvalidTimer { field: "spawn.min_interval_ms", value: self.spawn.min_interval_ms });
        }
        if let Some(period) = self.spawn.timer_ms {
            if !(period > 0.0) {
                return Err(PolicyError::InvalidTimer { field: "spawn.timer_ms", value: period });
            }
        }
        if !(self.spawn.stagger_ms >= 0.0) || (self.spawn.follow_up > 0 && self.spawn.stagger_ms == 0.0) {
            return Err(PolicyError::InvalidTimer { field: "spawn.stagger_ms", value: self.spawn.stagger_ms });
        }
        if !(self.sweep_interval_ms > 0.0) {
            return Err(PolicyError::InvalidTimer { field: "sweep_interval_ms", value: self.sweep_interval_ms });
        }
        Ok(())
    }

    /// Builder-style cap override.
    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_lifetime(mut self, min_ms: f64, max_ms: f64) -> Self {
        self.lifetime = Range::new(min_ms, max_ms);
        self
    }

    pub fn with_spawn(mut self, spawn: SpawnSchedule) -> Self {
        self.spawn = spawn;
        self
    }
}
