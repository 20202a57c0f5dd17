//! Per-identity personality traits.
//!
//! Traits are continuous scalars in [0, 1], sampled once when an agent is
//! created and never re-rolled. They modulate behavior thresholds (when to
//! flee, how long to hold an ambush, how eagerly a builder scans for work)
//! without changing the transition graph itself.

use crate::rng::AgentRng;

const TRAIT_MEAN: f32 = 0.5;
const TRAIT_STDDEV: f32 = 0.2;

/// Base flee trigger as a fraction of max health, before personality shift.
pub const BASE_FLEE_HEALTH: f32 = 0.2;

/// Base ambush dwell in seconds, before patience shift.
pub const BASE_AMBUSH_WAIT: f32 = 20.0;

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Personality {
    pub aggression: f32,
    pub caution: f32,
    pub teamwork: f32,
    pub patience: f32,
    pub build_focus: f32,
}

impl Personality {
    /// Samples a personality from the agent's own generator. Must be called
    /// exactly once per identity, before any other draws, so the trait
    /// vector is a pure function of the identity seed.
    pub fn generate(rng: &mut AgentRng) -> Self {
        Self {
            aggression: rng.next_gaussian_clamped(TRAIT_MEAN, TRAIT_STDDEV),
            caution: rng.next_gaussian_clamped(TRAIT_MEAN, TRAIT_STDDEV),
            teamwork: rng.next_gaussian_clamped(TRAIT_MEAN, TRAIT_STDDEV),
            patience: rng.next_gaussian_clamped(TRAIT_MEAN, TRAIT_STDDEV),
            build_focus: rng.next_gaussian_clamped(TRAIT_MEAN, TRAIT_STDDEV),
        }
    }

    /// Health fraction below which the agent breaks off and flees.
    ///
    /// `base * (1 + caution - aggression)`: cautious agents retreat earlier,
    /// aggressive ones fight longer. Clamped to [0.05, 0.60] so no
    /// personality fights to the last hit point or refuses to engage.
    pub fn flee_health_threshold(&self) -> f32 {
        (BASE_FLEE_HEALTH * (1.0 + self.caution - self.aggression)).clamp(0.05, 0.60)
    }

    /// How long this agent holds an ambush position, in seconds.
    pub fn ambush_wait(&self) -> f32 {
        BASE_AMBUSH_WAIT * (0.5 + self.patience)
    }

    /// Probability that a construction-capable agent spends a think tick
    /// scanning for build work instead of enemies.
    pub fn build_scan_chance(&self) -> f32 {
        0.10 + 0.90 * self.build_focus
    }
}

impl Default for Personality {
    /// Neutral personality: every trait at the distribution mean.
    fn default() -> Self {
        Self {
            aggression: TRAIT_MEAN,
            caution: TRAIT_MEAN,
            teamwork: TRAIT_MEAN,
            patience: TRAIT_MEAN,
            build_focus: TRAIT_MEAN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ident_hash;

    #[test]
    fn default_personality_flees_at_twenty_percent() {
        let p = Personality::default();
        assert!((p.flee_health_threshold() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn flee_threshold_monotonic_in_caution() {
        let mut lo = Personality::default();
        let mut hi = Personality::default();
        lo.caution = 0.1;
        hi.caution = 0.9;
        assert!(hi.flee_health_threshold() > lo.flee_health_threshold());
    }

    #[test]
    fn flee_threshold_inverse_monotonic_in_aggression() {
        let mut meek = Personality::default();
        let mut fierce = Personality::default();
        meek.aggression = 0.1;
        fierce.aggression = 0.9;
        assert!(fierce.flee_health_threshold() < meek.flee_health_threshold());
    }

    #[test]
    fn flee_threshold_clamped_to_band() {
        let extreme = Personality {
            aggression: 1.0,
            caution: 0.0,
            ..Personality::default()
        };
        assert!(extreme.flee_health_threshold() >= 0.05);

        let timid = Personality {
            aggression: 0.0,
            caution: 1.0,
            ..Personality::default()
        };
        assert!(timid.flee_health_threshold() <= 0.60);
    }

    #[test]
    fn generation_is_repeatable_per_identity() {
        let mut a = AgentRng::seeded(1234, ident_hash("Bot_Stinger_03"));
        let mut b = AgentRng::seeded(1234, ident_hash("Bot_Stinger_03"));
        assert_eq!(Personality::generate(&mut a), Personality::generate(&mut b));
    }

    #[test]
    fn all_generated_traits_in_unit_interval() {
        let mut rng = AgentRng::seeded(99, 1);
        let p = Personality::generate(&mut rng);
        for t in [p.aggression, p.caution, p.teamwork, p.patience, p.build_focus] {
            assert!((0.0..=1.0).contains(&t));
        }
    }
}
