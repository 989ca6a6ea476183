//! Error types for emitter startup and policy validation.
//!
//! Nothing here is ever fatal to the page: callers log these and carry on
//! without the affected effect.

use thiserror::Error;

/// Why an emitter policy was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// A policy with no colours cannot draw one per instance.
    #[error("palette is empty")]
    EmptyPalette,

    /// A cap of zero would never spawn anything.
    #[error("population cap must be at least 1")]
    ZeroCap,

    /// A `min..max` range with `min > max` (or a non-finite bound).
    #[error("range `{field}` is inverted or not finite: {min}..{max}")]
    InvertedRange {
        /// Name of the offending policy field.
        field: &'static str,
        /// Lower bound as given.
        min: f64,
        /// Upper bound as given.
        max: f64,
    },

    /// Lifetimes must be strictly positive or instances would die at birth.
    #[error("lifetime must be positive, got {0} ms")]
    NonPositiveLifetime(f64),

    /// Spawn chance outside `0.0..=1.0`.
    #[error("spawn chance must be within 0..=1, got {0}")]
    InvalidChance(f64),

    /// Zero or negative period for the spawn or sweep timer.
    #[error("timer `{field}` must be positive, got {value} ms")]
    InvalidTimer {
        /// Name of the offending timer.
        field: &'static str,
        /// Period as given.
        value: f64,
    },

    /// Configuration JSON could not be parsed.
    #[cfg(feature = "serde_json")]
    #[error("invalid effects config: {0}")]
    Parse(String),
}

#[cfg(feature = "serde_json")]
impl From<serde_json::Error> for PolicyError {
    fn from(err: serde_json::Error) -> Self {
        PolicyError::Parse(err.to_string())
    }
}

/// Failures surfaced by the emitter engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EffectsError {
    /// The container the emitter draws into does not exist.
    #[error("mount point for emitter `{emitter}` not found")]
    MissingMount {
        /// Name of the emitter that could not start.
        emitter: String,
    },

    /// Policy failed validation at start.
    #[error("emitter `{emitter}` rejected its policy: {source}")]
    InvalidPolicy {
        /// Name of the emitter that could not start.
        emitter: String,
        /// Underlying validation failure.
        #[source]
        source: PolicyError,
    },

    /// The stage could not create a node for a new instance.
    #[error("could not attach instance: {0}")]
    Attach(String),
}
