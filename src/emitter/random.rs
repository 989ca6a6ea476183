//! Pluggable randomness for instance variation.

/// Source of uniform draws in `[0, 1)`.
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;

    /// Uniform draw in `min..max`.
    fn range(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_f64()
    }

    /// Uniform index into a collection of `len` items (0 when empty).
    fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        ((self.next_f64() * len as f64) as usize).min(len - 1)
    }

    /// True with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        if p >= 1.0 {
            return true;
        }
        self.next_f64() < p
    }
}

/// SplitMix64: tiny, fast, good enough for decoration. Not for anything secret.
#[derive(Clone, Debug)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seeds from the platform entropy source, or from `fallback` when that is
    /// unavailable (or the `rng` feature is off).
    pub fn from_entropy_or(fallback: u64) -> Self {
        #[cfg(feature = "rng")]
        {
            let mut buf = [0u8; 8];
            match getrandom::getrandom(&mut buf) {
                Ok(()) => return Self::new(u64::from_le_bytes(buf)),
                Err(err) => log::debug!("getrandom unavailable ({err}), seeding from fallback"),
            }
        }
        Self::new(fallback)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

impl RandomSource for SplitMix64 {
    fn next_f64(&mut self) -> f64 {
        // top 53 bits -> [0, 1)
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

/// Replays a fixed list of draws, cycling when exhausted.
///
/// Values are returned as given (a scripted `1.0` lands on a range's upper
/// bound), which makes exact assertions on drawn parameters possible.
#[derive(Clone, Debug)]
pub struct ScriptedRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedRandom {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, cursor: 0 }
    }

    /// Number of draws consumed so far.
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splitmix_is_deterministic_per_seed() {
        let mut a = SplitMix64::new(42);
        let mut b = SplitMix64::new(42);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        let mut c = SplitMix64::new(43);
        assert_ne!(SplitMix64::new(42).next_u64(), c.next_u64());
    }

    #[test]
    fn splitmix_draws_stay_in_unit_interval() {
        let mut rng = SplitMix64::new(7);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn pick_never_overruns() {
        let mut rng = ScriptedRandom::new(vec![0.0, 0.5, 1.0]);
        assert_eq!(rng.pick(4), 0);
        assert_eq!(rng.pick(4), 2);
        assert_eq!(rng.pick(4), 3);
        assert_eq!(rng.pick(0), 0);
    }

    #[test]
    fn chance_respects_certainty() {
        let mut rng = ScriptedRandom::new(vec![0.99]);
        assert!(rng.chance(1.0));
        assert!(!rng.chance(0.5));
        assert!(!rng.chance(0.0));
    }

    #[test]
    fn scripted_cycles() {
        let mut rng = ScriptedRandom::new(vec![0.1, 0.2]);
        assert_eq!(rng.next_f64(), 0.1);
        assert_eq!(rng.next_f64(), 0.2);
        assert_eq!(rng.next_f64(), 0.1);
        assert_eq!(rng.draws(), 3);
    }
}
