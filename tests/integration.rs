// Integration tests (native) for the emitter engine.
// These drive the engine through the headless backends so they run under
// `cargo test` on the host without a browser.

use sparkle_fx::emitter::manual::{ManualAnimator, ManualClock, MemoryNode, MemoryStage};
use sparkle_fx::emitter::{Emitter, EmitterPolicy, RandomSource, Range, ScriptedRandom, SpawnSchedule, SplitMix64};
use sparkle_fx::{EffectsError, PolicyError, presets};

type Rig = Emitter<MemoryStage, ManualAnimator<MemoryNode>, ManualClock, SplitMix64>;

struct Harness {
    emitter: Rig,
    stage: MemoryStage,
    animator: ManualAnimator<MemoryNode>,
    clock: ManualClock,
}

fn harness(policy: EmitterPolicy, seed: u64) -> Harness {
    let clock = ManualClock::new(0.0);
    let stage = MemoryStage::new((1024.0, 768.0));
    let animator = ManualAnimator::new(clock.clone());
    let emitter = Emitter::start(policy, Some(stage.clone()), animator.clone(), clock.clone(), SplitMix64::new(seed))
        .expect("emitter should start");
    Harness { emitter, stage, animator, clock }
}

/// Always spawns when allowed; fixed lifetime.
fn steady(cap: usize, interval_ms: f64, lifetime_ms: f64) -> EmitterPolicy {
    presets::sparkles()
        .with_cap(cap)
        .with_lifetime(lifetime_ms, lifetime_ms)
        .with_spawn(SpawnSchedule { min_interval_ms: interval_ms, ..SpawnSchedule::default() })
}

#[test]
fn cap_three_throttled_scenario() {
    let mut h = harness(steady(3, 100.0, 1_000.0), 1);
    let mut outcomes = Vec::new();
    for t in (0..=250).step_by(50) {
        h.clock.set(t as f64);
        outcomes.push(h.emitter.spawn_one(None).is_some());
    }
    assert_eq!(outcomes, vec![true, false, true, false, true, false]);
    assert_eq!(h.emitter.live_count(), 3);
    assert_eq!(h.stage.attached(), 3);
}

#[test]
fn cap_one_blocks_second_spawn() {
    let mut h = harness(steady(1, 0.0, 1_000.0), 2);
    assert!(h.emitter.spawn_one(None).is_some());
    h.clock.advance(500.0);
    assert_eq!(h.emitter.spawn_one(None), None);
    assert_eq!(h.emitter.live_count(), 1);
    assert_eq!(h.emitter.burst(5, None), 0);
}

#[test]
fn missing_mount_point_starts_nothing() {
    let clock = ManualClock::new(0.0);
    let animator: ManualAnimator<MemoryNode> = ManualAnimator::new(clock.clone());
    let started: Option<Rig> = Emitter::start(presets::confetti(), None, animator.clone(), clock.clone(), SplitMix64::new(3));
    assert!(started.is_none());
    assert_eq!(animator.started(), 0);

    let err = Rig::try_start(presets::confetti(), None, animator, clock, SplitMix64::new(3)).err();
    assert_eq!(err, Some(EffectsError::MissingMount { emitter: "confetti".into() }));
}

#[test]
fn invalid_policy_is_refused_without_attaching() {
    let clock = ManualClock::new(0.0);
    let stage = MemoryStage::new((800.0, 600.0));
    let mut policy = presets::confetti();
    policy.palette.clear();
    let err = Rig::try_start(policy, Some(stage.clone()), ManualAnimator::new(clock.clone()), clock, SplitMix64::new(4)).err();
    assert_eq!(
        err,
        Some(EffectsError::InvalidPolicy { emitter: "confetti".into(), source: PolicyError::EmptyPalette })
    );
    assert_eq!(stage.attaches(), 0);
}

#[test]
fn sweep_catches_lost_completion_exactly_once() {
    let mut h = harness(steady(5, 0.0, 1_000.0), 5);
    h.emitter.spawn_one(None).unwrap();
    h.emitter.spawn_one(None).unwrap();
    h.clock.set(400.0);
    h.emitter.spawn_one(None).unwrap();
    assert_eq!(h.animator.lose_all(), 3);

    h.clock.set(1_000.5);
    assert_eq!(h.emitter.sweep(), 2);
    assert_eq!(h.emitter.live_count(), 1);
    assert_eq!(h.emitter.sweep(), 0);
    assert_eq!(h.stage.detaches(), 2);

    h.clock.set(1_400.0);
    assert_eq!(h.emitter.sweep(), 1);
    assert_eq!(h.emitter.live_count(), 0);
}

#[test]
fn retire_is_idempotent() {
    let mut h = harness(steady(4, 0.0, 1_000.0), 6);
    let a = h.emitter.spawn_one(None).unwrap();
    h.emitter.spawn_one(None).unwrap();
    assert!(h.emitter.retire(a));
    let after_first = h.emitter.live_count();
    for _ in 0..3 {
        assert!(!h.emitter.retire(a));
        assert_eq!(h.emitter.live_count(), after_first);
    }
    // The animation completion arriving late is a no-op as well.
    h.clock.advance(5_000.0);
    h.animator.complete_due();
    h.emitter.sweep();
    assert_eq!(h.emitter.live_count(), 0);
    assert_eq!(h.stage.detaches(), 2);
    assert_eq!(h.stage.stray_detaches(), 0);
}

#[test]
fn live_count_never_exceeds_cap() {
    let mut policy = presets::confetti();
    policy.spawn.min_interval_ms = 10.0;
    let cap = policy.cap;
    let mut h = harness(policy, 7);
    for step in 0..2_000 {
        h.clock.advance(7.0);
        h.emitter.spawn_one(None);
        if step % 3 == 0 {
            h.emitter.burst(4, None);
        }
        h.animator.complete_due();
        assert!(h.emitter.live_count() <= cap);
        assert!(h.stage.attached() <= cap);
    }
}

#[test]
fn throttle_bounds_spawn_count() {
    let clock = ManualClock::new(0.0);
    let stage = MemoryStage::new((800.0, 600.0));
    let animator = ManualAnimator::new(clock.clone()).instant();
    let mut emitter: Rig =
        Emitter::start(steady(1_000, 100.0, 50.0), Some(stage), animator, clock.clone(), SplitMix64::new(8)).unwrap();
    let (total_ms, interval_ms) = (1_000.0, 100.0);
    let mut spawned = 0;
    let mut t = 0.0;
    while t <= total_ms {
        clock.set(t);
        if emitter.spawn_one(None).is_some() {
            spawned += 1;
        }
        t += 13.0;
    }
    assert!(spawned as f64 <= total_ms / interval_ms + 1.0, "spawned {spawned}");
    assert!(spawned >= 5);
}

#[test]
fn detachment_lands_between_death_and_sweep() {
    let mut policy = presets::sparkles().with_cap(40).with_spawn(SpawnSchedule::default());
    policy.lifetime = Range::new(300.0, 2_000.0);
    policy.sweep_interval_ms = 1_000.0;
    let sweep_every = policy.sweep_interval_ms;
    let step = 25.0;
    let mut h = harness(policy, 9);

    let mut tracked = Vec::new();
    let mut next_sweep = sweep_every;
    let mut now = 0.0;
    while now < 10_000.0 {
        if now < 4_000.0 && (now as u64) % 100 == 0 {
            if let Some(id) = h.emitter.spawn_one(None) {
                let death = h.emitter.with_instance(id, |i| i.death_at).unwrap();
                tracked.push((id, death, None::<f64>));
            }
            // Every other instance "loses" its completion.
            if tracked.len() % 2 == 0 {
                h.animator.lose_all();
            }
        }
        h.animator.complete_due();
        if now >= next_sweep {
            h.emitter.sweep();
            next_sweep += sweep_every;
        }
        for (id, _, gone) in &mut tracked {
            if gone.is_none() && h.emitter.with_instance(*id, |_| ()).is_none() {
                *gone = Some(now);
            }
        }
        now += step;
        h.clock.set(now);
    }

    assert!(!tracked.is_empty());
    for (id, death, gone) in tracked {
        let gone = gone.unwrap_or_else(|| panic!("instance {id} never detached"));
        assert!(gone >= death, "instance {id} detached at {gone} before death {death}");
        assert!(gone <= death + sweep_every + step, "instance {id} detached late at {gone} (death {death})");
    }
    assert_eq!(h.emitter.live_count(), 0);
}

#[test]
fn stop_clears_everything_and_is_repeatable() {
    let mut h = harness(presets::confetti(), 10);
    h.clock.advance(200.0);
    h.emitter.spawn_one(None).unwrap();
    assert_eq!(h.emitter.stop(), 4);
    assert_eq!(h.stage.attached(), 0);
    assert_eq!(h.emitter.stop(), 0);
    // Late completions after stop do nothing.
    h.animator.complete_all();
    assert_eq!(h.stage.stray_detaches(), 0);
    let stats = h.emitter.stats();
    assert_eq!((stats.live, stats.spawned, stats.retired), (0, 4, 4));
}

/// Scripted chance rolls; every other draw comes from a fixed filler.
struct Rolls {
    rolls: ScriptedRandom,
    fill: ScriptedRandom,
}

impl Rolls {
    fn new(rolls: Vec<f64>) -> Self {
        Self { rolls: ScriptedRandom::new(rolls), fill: ScriptedRandom::new(vec![0.5]) }
    }
}

impl RandomSource for Rolls {
    fn next_f64(&mut self) -> f64 {
        self.fill.next_f64()
    }

    fn chance(&mut self, p: f64) -> bool {
        p >= 1.0 || self.rolls.next_f64() < p
    }
}

type RollRig = Emitter<MemoryStage, ManualAnimator<MemoryNode>, ManualClock, Rolls>;

fn attempts(policy: EmitterPolicy, rolls: Vec<f64>, times: &[f64]) -> (Vec<bool>, RollRig) {
    let clock = ManualClock::new(0.0);
    let stage = MemoryStage::new((1024.0, 768.0));
    let mut emitter: RollRig =
        Emitter::start(policy, Some(stage), ManualAnimator::new(clock.clone()), clock.clone(), Rolls::new(rolls))
            .unwrap();
    let outcomes = times
        .iter()
        .map(|&t| {
            clock.set(t);
            emitter.spawn_one(None).is_some()
        })
        .collect();
    (outcomes, emitter)
}

#[test]
fn sparkle_miss_uses_up_the_throttle_window() {
    let times = [0.0, 50.0, 100.0, 200.0, 250.0, 300.0];
    let (outcomes, emitter) = attempts(presets::sparkles(), vec![0.9, 0.1], &times);
    assert_eq!(outcomes, vec![false, false, true, false, false, true]);
    assert_eq!(emitter.live_count(), 2);
    assert_eq!(emitter.stats().spawned, 2);
}

#[test]
fn miss_without_consume_retries_on_next_attempt() {
    let mut policy = presets::sparkles();
    policy.spawn.consume_on_miss = false;
    let times = [0.0, 16.0, 116.0, 132.0, 232.0, 248.0];
    let (outcomes, emitter) = attempts(policy, vec![0.9, 0.1], &times);
    assert_eq!(outcomes, vec![false, true, false, true, false, true]);
    assert_eq!(emitter.live_count(), 3);
}

#[test]
fn chance_gated_spawns_stay_under_cap() {
    let policy = presets::sparkles();
    let cap = policy.cap;
    let times: Vec<f64> = (0..200).map(|i| f64::from(i) * 100.0).collect();
    let (outcomes, emitter) = attempts(policy, vec![0.1, 0.1, 0.9], &times);
    assert_eq!(emitter.live_count(), cap);
    assert_eq!(outcomes.iter().filter(|&&ok| ok).count(), cap);
}

/// Mouse events every 16 ms for 10 s with instant completions.
fn sparkle_trail(policy: EmitterPolicy) -> u64 {
    let clock = ManualClock::new(0.0);
    let stage = MemoryStage::new((1024.0, 768.0));
    let animator = ManualAnimator::new(clock.clone()).instant();
    let mut emitter: Rig = Emitter::start(policy, Some(stage), animator, clock.clone(), SplitMix64::new(11)).unwrap();
    let mut t = 0.0;
    while t < 10_000.0 {
        clock.set(t);
        emitter.spawn_one(None);
        t += 16.0;
    }
    emitter.stats().spawned
}

#[test]
fn sparkle_trail_rate_halves_the_throttle_slots() {
    let strict = sparkle_trail(presets::sparkles());
    let mut lenient = presets::sparkles();
    lenient.spawn.consume_on_miss = false;
    let lenient = sparkle_trail(lenient);
    assert!((30..=60).contains(&strict), "strict trail spawned {strict}");
    assert!(lenient > strict + 15, "lenient {lenient} vs strict {strict}");
}

#[test]
fn confetti_birth_appearance_matches_top_edge_entry() {
    let h = harness(presets::confetti(), 12);
    let pending = h.animator.pending_nodes();
    assert_eq!(pending.len(), 3);
    for id in h.emitter.live_ids() {
        let (node, position) = h.emitter.with_instance(id, |i| (i.node, i.position)).unwrap();
        assert!(pending.contains(&node));
        let appearance = h.stage.appearance(node).unwrap();
        assert_eq!(appearance.position, position);
        assert_eq!(appearance.position.y, -30.0);
        assert!((0.0..1024.0).contains(&appearance.position.x));
        assert!((6.0..=14.0).contains(&appearance.size));
        assert!(appearance.glow);
        assert_eq!(Some(appearance.frame), h.emitter.advance(id, 0.0));
    }
}
