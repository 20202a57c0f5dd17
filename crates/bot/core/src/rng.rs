//! Deterministic per-agent random number generation.
//!
//! Every agent owns one explicitly seeded PCG-XSH-RR generator; all
//! probability gates (aim error, patrol goals, build-scan rolls) draw from
//! it. Given the same match seed and agent identity, an agent's entire
//! decision stream replays bit-exactly.

/// PCG random number generator (Permuted Congruential Generator).
///
/// PCG-XSH-RR: 64-bit LCG state, 32-bit permuted output. Small, fast, and
/// statistically solid, which is all the decision engine needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentRng {
    state: u64,
}

impl AgentRng {
    /// PCG multiplier constant.
    const MULTIPLIER: u64 = 6364136223846793005;

    /// PCG increment constant.
    const INCREMENT: u64 = 1442695040888963407;

    /// Creates a generator from a match-wide seed and a per-agent identity
    /// value (typically [`ident_hash`] of the agent's name).
    pub fn seeded(match_seed: u64, ident: u64) -> Self {
        // One avalanche pass so nearby idents do not produce nearby streams.
        let mut state = match_seed ^ ident.wrapping_mul(0x9e3779b97f4a7c15);
        state ^= state >> 33;
        state = state.wrapping_mul(0xff51afd7ed558ccd);
        state ^= state >> 33;
        Self { state }
    }

    #[inline]
    fn step(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT);
        self.state
    }

    /// XSH-RR output permutation over the advanced LCG state.
    pub fn next_u32(&mut self) -> u32 {
        let state = self.step();
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Uniform draw in [0, 1).
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Uniform draw in [min, max). Returns `min` for an empty range.
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        if min >= max {
            return min;
        }
        min + self.next_f32() * (max - min)
    }

    /// Uniform draw in [0, bound). Returns 0 for bound 0.
    pub fn next_bounded(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.next_u32() % bound
    }

    /// Probability gate: true with probability `p` (clamped to [0, 1]).
    pub fn chance(&mut self, p: f32) -> bool {
        self.next_f32() < p.clamp(0.0, 1.0)
    }

    /// Normal draw via Box–Muller, clamped to [0, 1].
    ///
    /// Used for one-time personality sampling; mean/stddev come from the
    /// personality model.
    pub fn next_gaussian_clamped(&mut self, mean: f32, stddev: f32) -> f32 {
        let u1 = self.next_f32().max(1e-7);
        let u2 = self.next_f32();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
        (mean + stddev * z).clamp(0.0, 1.0)
    }
}

/// Deterministic hash of an agent identity string.
///
/// djb2-xor variant; stable across platforms so named agents keep their
/// personalities between sessions.
pub fn ident_hash(name: &str) -> u64 {
    let mut hash: u64 = 5381;
    for byte in name.bytes() {
        hash = (hash << 5).wrapping_add(hash) ^ u64::from(byte);
    }
    hash
}
