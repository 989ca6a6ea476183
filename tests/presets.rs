// Preset invariants: the stock page effects keep the numbers they were tuned to.
// Native-friendly; no wasm/browser APIs involved.

use std::collections::HashSet;

use sparkle_fx::emitter::{Entry, Motion};
use sparkle_fx::presets;

fn all() -> Vec<sparkle_fx::EmitterPolicy> {
    vec![
        presets::confetti(),
        presets::floating_particles(),
        presets::sparkles(),
        presets::stars(),
        presets::click_burst(),
        presets::celebration(),
    ]
}

#[test]
fn preset_names_are_unique() {
    let mut seen = HashSet::new();
    for p in all() {
        assert!(seen.insert(p.name.clone()), "duplicate preset name '{}'", p.name);
    }
}

#[test]
fn palettes_are_css_hex_colours() {
    for p in all() {
        assert!(!p.palette.is_empty(), "preset '{}' has no colours", p.name);
        for c in &p.palette {
            assert!(c.starts_with('#'), "colour '{}' in '{}' is not hex", c, p.name);
            assert!(matches!(c.len(), 4 | 7), "colour '{}' in '{}' has odd length", c, p.name);
            assert!(c[1..].chars().all(|ch| ch.is_ascii_hexdigit()), "colour '{}' in '{}'", c, p.name);
        }
    }
}

#[test]
fn confetti_matches_tuning() {
    let p = presets::confetti();
    assert_eq!(p.cap, 50);
    assert_eq!(p.spawn.min_interval_ms, 100.0);
    assert_eq!(p.spawn.timer_ms, Some(300.0));
    assert_eq!((p.spawn.initial, p.spawn.follow_up, p.spawn.stagger_ms), (3, 12, 200.0));
    assert!(!p.spawn.consume_on_miss);
    assert_eq!((p.lifetime.min, p.lifetime.max), (3_000.0, 8_000.0));
    assert!(matches!(p.motion, Motion::Fall { .. }));
    assert!(!p.looping);
    assert_eq!(p.sweep_interval_ms, 5_000.0);
}

#[test]
fn floating_particles_are_a_fixed_looping_population() {
    let p = presets::floating_particles();
    assert_eq!(p.cap, 25);
    assert_eq!(p.spawn.initial as usize, p.cap);
    assert_eq!(p.spawn.timer_ms, None);
    assert!(p.looping);
    assert_eq!(p.motion.offsets().len(), 5);
}

#[test]
fn sparkles_are_gated_and_follow_the_cursor() {
    let p = presets::sparkles();
    assert_eq!(p.cap, 20);
    assert_eq!(p.spawn.chance, 0.5);
    assert!(p.spawn.consume_on_miss);
    assert_eq!(p.spawn.min_interval_ms, 100.0);
    assert_eq!((p.lifetime.min, p.lifetime.max), (800.0, 1_200.0));
    assert_eq!(p.entry, Entry::Around { spread: 0.0 });
}

#[test]
fn fixed_populations_fit_their_cap() {
    for p in all() {
        let wave = (p.spawn.initial + p.spawn.follow_up) as usize;
        assert!(wave <= p.cap, "preset '{}' starts above its cap", p.name);
        if p.looping {
            assert_eq!(p.spawn.timer_ms, None, "looping preset '{}' should not keep spawning", p.name);
        }
    }
}
