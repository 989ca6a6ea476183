//! Motion functions: pure maps from elapsed-time fraction to a visual frame.
//!
//! Every instance carries a [`Variation`] holding the random draws made at
//! spawn time, so sampling is deterministic once the instance exists.

use super::policy::Range;
use super::random::RandomSource;

/// Visual state of one instance at a point in its life.
///
/// Offsets are in px relative to the entry point, rotation in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub rotate: f64,
    pub scale: f64,
    pub opacity: f64,
}

impl Default for Frame {
    fn default() -> Self {
        Self::REST
    }
}

impl Frame {
    /// Untransformed, fully opaque.
    pub const REST: Frame = Frame { x: 0.0, y: 0.0, rotate: 0.0, scale: 1.0, opacity: 1.0 };

    pub fn lerp(&self, to: &Frame, t: f64) -> Frame {
        if t >= 1.0 {
            return *to;
        }
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Frame {
            x: mix(self.x, to.x),
            y: mix(self.y, to.y),
            rotate: mix(self.rotate, to.rotate),
            scale: mix(self.scale, to.scale),
            opacity: mix(self.opacity, to.opacity),
        }
    }

    /// Value for the CSS `transform` property.
    pub fn transform_css(&self) -> String {
        format!(
            "translate3d({}px, {}px, 0) rotate({}deg) scale({})",
            css_num(self.x),
            css_num(self.y),
            css_num(self.rotate),
            css_num(self.scale)
        )
    }

    /// Value for the CSS `opacity` property.
    pub fn opacity_css(&self) -> String {
        css_num(self.opacity.clamp(0.0, 1.0))
    }

    /// `transform` and `opacity` declarations, ready to drop into a rule body.
    pub fn to_css(&self) -> String {
        format!("transform: {}; opacity: {};", self.transform_css(), self.opacity_css())
    }
}

/// Two decimals, with negative zero folded to zero.
pub(crate) fn css_num(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0 + 0.0;
    format!("{rounded:.2}")
}

/// Renders a `@keyframes` rule named `name` from `(offset, frame)` pairs.
pub fn keyframes_css(name: &str, keyframes: &[(f64, Frame)]) -> String {
    let mut css = format!("@keyframes {name} {{");
    for (offset, frame) in keyframes {
        let pct = (offset.clamp(0.0, 1.0) * 100.0).round();
        css.push_str(&format!(" {pct}% {{ {} }}", frame.to_css()));
    }
    css.push_str(" }");
    css
}

/// Timing curve handed to the animator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Easing {
    #[default]
    Linear,
    /// Cubic ease-out, fast start then settling.
    EaseOut,
    /// Cubic ease-in-out.
    EaseInOut,
}

impl Easing {
    /// Applies the curve to `t` (clamped to 0..=1).
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseOut => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }

    /// CSS `<easing-function>` equivalent.
    pub fn css(self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::EaseOut => "cubic-bezier(0.215, 0.61, 0.355, 1)",
            Easing::EaseInOut => "cubic-bezier(0.645, 0.045, 0.355, 1)",
        }
    }
}

/// Per-instance random draws consumed by [`Motion::sample`].
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Variation {
    /// End-of-life offset in px.
    pub drift: (f64, f64),
    /// Total rotation over the lifetime, degrees.
    pub spin: f64,
    /// Float loop waypoints at 25/50/75 %.
    pub waypoints: [(f64, f64); 3],
    /// Vertical distance covered by a fall.
    pub travel: f64,
    /// Resting opacity for twinkles.
    pub base_opacity: f64,
}

const FLOAT_WANDER: f64 = 25.0;
const FALL_MARGIN: f64 = 60.0;
const FALL_SWAY: f64 = 20.0;

// Scale and opacity of the four-phase float loop, closing back on the start.
const FLOAT_SCALE: [f64; 5] = [1.0, 1.2, 0.8, 1.1, 1.0];
const FLOAT_OPACITY: [f64; 5] = [0.3, 0.6, 0.4, 0.5, 0.3];
const FLOAT_OFFSETS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// How an instance moves between birth and death.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Motion {
    /// Straight fall through the viewport with a little sway and spin.
    Fall { rotations: f64 },
    /// Looping wander through three random waypoints.
    Float,
    /// Small random hop that fades and shrinks away.
    Jitter { radius: f64 },
    /// Opacity pulse in place.
    Twinkle,
    /// Radial flight at a random angle.
    Burst { distance: Range, spin: f64, shrink: bool },
}

impl Motion {
    /// Keyframe offsets the animator needs to reproduce this motion.
    pub fn offsets(&self) -> &'static [f64] {
        match self {
            Motion::Float => &FLOAT_OFFSETS,
            Motion::Twinkle => &[0.0, 0.5, 1.0],
            Motion::Fall { .. } | Motion::Jitter { .. } | Motion::Burst { .. } => &[0.0, 1.0],
        }
    }

    /// Draws the random parameters for one instance.
    pub fn draw_variation<R: RandomSource + ?Sized>(&self, rng: &mut R, viewport: (f64, f64)) -> Variation {
        let mut v = Variation { base_opacity: 1.0, ..Variation::default() };
        match self {
            Motion::Fall { rotations } => {
                v.travel = viewport.1 + FALL_MARGIN;
                v.drift = (rng.range(-FALL_SWAY, FALL_SWAY), 0.0);
                v.spin = rng.range(-rotations, *rotations) * 360.0;
            }
            Motion::Float => {
                for wp in &mut v.waypoints {
                    *wp = (rng.range(-FLOAT_WANDER, FLOAT_WANDER), rng.range(-FLOAT_WANDER, FLOAT_WANDER));
                }
            }
            Motion::Jitter { radius } => {
                let half = radius / 2.0;
                v.drift = (rng.range(-half, half), rng.range(-half, half));
            }
            Motion::Twinkle => {
                v.base_opacity = rng.range(0.2, 1.0);
            }
            Motion::Burst { distance, spin, .. } => {
                let angle = rng.range(0.0, std::f64::consts::TAU);
                let d = distance.sample(rng);
                v.drift = (angle.cos() * d, angle.sin() * d);
                v.spin = rng.range(0.0, *spin);
            }
        }
        v
    }

    /// Frame at `t` (clamped to 0..=1) of an instance's life.
    pub fn sample(&self, t: f64, v: &Variation) -> Frame {
        let t = t.clamp(0.0, 1.0);
        match self {
            Motion::Fall { .. } => Frame {
                x: v.drift.0 * t,
                y: v.travel * t,
                rotate: v.spin * t,
                scale: 1.0,
                opacity: 1.0 - 0.3 * t,
            },
            Motion::Float => {
                let points = [(0.0, 0.0), v.waypoints[0], v.waypoints[1], v.waypoints[2], (0.0, 0.0)];
                let frame_at = |i: usize| Frame {
                    x: points[i].0,
                    y: points[i].1,
                    rotate: 0.0,
                    scale: FLOAT_SCALE[i],
                    opacity: FLOAT_OPACITY[i],
                };
                let seg = ((t * 4.0).floor() as usize).min(3);
                let local = (t - FLOAT_OFFSETS[seg]) * 4.0;
                frame_at(seg).lerp(&frame_at(seg + 1), local)
            }
            Motion::Jitter { .. } => Frame {
                x: v.drift.0 * t,
                y: v.drift.1 * t,
                rotate: 0.0,
                scale: 1.0 - t,
                opacity: 1.0 - t,
            },
            Motion::Twinkle => {
                let peak = 1.0 - (2.0 * t - 1.0).abs();
                Frame { opacity: v.base_opacity + (1.0 - v.base_opacity) * peak, ..Frame::REST }
            }
            Motion::Burst { shrink, .. } => Frame {
                x: v.drift.0 * t,
                y: v.drift.1 * t,
                rotate: v.spin * t,
                scale: if *shrink { 1.0 - t } else { 1.0 },
                opacity: 1.0 - t,
            },
        }
    }

    /// Samples every offset in [`Motion::offsets`].
    pub fn keyframes(&self, v: &Variation) -> Vec<(f64, Frame)> {
        self.offsets().iter().map(|&o| (o, self.sample(o, v))).collect()
    }
}
