//! The page's effects expressed as emitter policies.

use crate::emitter::policy::DEFAULT_SWEEP_INTERVAL_MS;
use crate::emitter::{Easing, EmitterPolicy, Entry, Motion, Range, SpawnSchedule};

const PINKS: [&str; 4] = ["#ffb6c1", "#ff69b4", "#ff1493", "#ffc0cb"];

fn palette(colors: &[&str]) -> Vec<String> {
    colors.iter().map(|c| (*c).to_string()).collect()
}

/// Falling confetti: a steady drizzle from above the viewport. Three pieces
/// at once, then twelve more 200 ms apart.
pub fn confetti() -> EmitterPolicy {
    EmitterPolicy {
        name: "confetti".into(),
        cap: 50,
        spawn: SpawnSchedule {
            min_interval_ms: 100.0,
            timer_ms: Some(300.0),
            initial: 3,
            follow_up: 12,
            stagger_ms: 200.0,
            ..SpawnSchedule::default()
        },
        lifetime: Range::new(3_000.0, 8_000.0),
        size: Range::new(6.0, 14.0),
        motion: Motion::Fall { rotations: 1.0 },
        palette: palette(&["#ffb6c1", "#ff69b4", "#ff1493", "#ffc0cb", "#ff91a4", "#ffd1dc"]),
        entry: Entry::TopEdge { offset: 30.0 },
        easing: Easing::Linear,
        looping: false,
        glow: true,
        sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
    }
}

/// Fixed field of 25 softly wandering dots, created once and looping forever.
pub fn floating_particles() -> EmitterPolicy {
    EmitterPolicy {
        name: "particles".into(),
        cap: 25,
        spawn: SpawnSchedule { initial: 25, ..SpawnSchedule::default() },
        lifetime: Range::new(10_000.0, 20_000.0),
        size: Range::new(4.0, 10.0),
        motion: Motion::Float,
        palette: palette(&["#ffb6c1", "#ff69b4", "#ffc0cb", "#ff1493", "#ff69b4"]),
        entry: Entry::Anywhere,
        easing: Easing::EaseInOut,
        looping: true,
        glow: true,
        sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
    }
}

/// Mouse trail: one coin flip per 100 ms window, so about five sparkles a
/// second while the mouse moves.
pub fn sparkles() -> EmitterPolicy {
    EmitterPolicy {
        name: "sparkles".into(),
        cap: 20,
        spawn: SpawnSchedule { min_interval_ms: 100.0, chance: 0.5, consume_on_miss: true, ..SpawnSchedule::default() },
        lifetime: Range::new(800.0, 1_200.0),
        size: Range::new(4.0, 8.0),
        motion: Motion::Jitter { radius: 30.0 },
        palette: palette(&PINKS),
        entry: Entry::Around { spread: 0.0 },
        easing: Easing::EaseOut,
        looping: false,
        glow: true,
        sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
    }
}

/// Twinkling background stars.
pub fn stars() -> EmitterPolicy {
    EmitterPolicy {
        name: "stars".into(),
        cap: 50,
        spawn: SpawnSchedule { initial: 50, ..SpawnSchedule::default() },
        lifetime: Range::new(2_000.0, 5_000.0),
        size: Range::new(0.5, 3.0),
        motion: Motion::Twinkle,
        palette: palette(&["#fff"]),
        entry: Entry::Anywhere,
        easing: Easing::EaseInOut,
        looping: true,
        glow: false,
        sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
    }
}

/// Confetti thrown from the click point.
pub fn click_burst() -> EmitterPolicy {
    EmitterPolicy {
        name: "click-burst".into(),
        cap: 30,
        spawn: SpawnSchedule::default(),
        lifetime: Range::new(1_000.0, 2_000.0),
        size: Range::new(4.0, 12.0),
        motion: Motion::Burst { distance: Range::new(250.0, 750.0), spin: 0.0, shrink: true },
        palette: palette(&["#ffb6c1", "#ff69b4", "#ffc0cb", "#ff1493", "#ff69b4", "#fff"]),
        entry: Entry::Around { spread: 0.0 },
        easing: Easing::EaseOut,
        looping: false,
        glow: true,
        sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
    }
}

/// Short celebratory pop around the middle of the screen.
pub fn celebration() -> EmitterPolicy {
    EmitterPolicy {
        name: "celebration".into(),
        cap: 12,
        spawn: SpawnSchedule::default(),
        lifetime: Range::new(700.0, 1_000.0),
        size: Range::new(5.0, 11.0),
        motion: Motion::Burst { distance: Range::new(120.0, 200.0), spin: 360.0, shrink: false },
        palette: palette(&PINKS),
        entry: Entry::Around { spread: 200.0 },
        easing: Easing::EaseOut,
        looping: false,
        glow: true,
        sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
    }
}
