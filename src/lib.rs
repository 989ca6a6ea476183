//! Sparkle FX core crate.
//!
//! Decorative particle effects for a birthday greeting page: falling confetti,
//! a floating particle field, twinkling stars, a mouse-trail of sparkles and
//! confetti bursts. All of them run on one engine, [`emitter::Emitter`],
//! configured by pure-data [`emitter::EmitterPolicy`] values from [`presets`].
//!
//! The engine is browser-agnostic and tested natively; [`web`] binds it to the
//! DOM and exports `start_effects()` / `stop_effects()` to JS.

use wasm_bindgen::prelude::*;

pub mod config;
pub mod emitter;
pub mod error;
pub mod presets;
pub mod web;

pub use config::{PageConfig, Selectors};
pub use emitter::{Emitter, EmitterPolicy, EmitterStats, InstanceId};
pub use error::{EffectsError, PolicyError};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    let level = if cfg!(debug_assertions) { log::Level::Debug } else { log::Level::Info };
    // Fails only if a logger is already installed, which is fine.
    let _ = console_log::init_with_level(level);
}
