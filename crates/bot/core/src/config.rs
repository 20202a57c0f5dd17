/// Bot engine configuration: compile-time capacities and runtime tunables.
///
/// Capacities are `const`s because they size fixed-layout buffers (slot
/// arrays, path buffers, memory rings) and participate in the nav file
/// format contract. Runtime tunables come from the operator surface and are
/// consumed strictly read-only; out-of-range values are clamped on
/// construction rather than rejected.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BotConfig {
    /// Seconds between a single agent's think calls. Agents do not think
    /// every engine tick; the director only wakes agents whose timer is due.
    pub think_interval: f32,
    /// Seconds between team strategy reassessments.
    pub strategy_interval: f32,
    /// Seconds until a remembered enemy sighting is forgotten.
    pub enemy_memory_decay: f32,
    /// Seconds until a teammate position report goes stale.
    pub teammate_memory_decay: f32,
    /// Seconds an agent idles before defaulting to patrol.
    pub idle_dwell: f32,
    /// Health fraction added on top of the flee trigger before an agent
    /// considers itself recovered. Strictly positive so FLEE cannot flap.
    pub flee_recovery_margin: f32,
    /// Desired total agent count maintained by population management.
    pub population_target: usize,
    /// Skill band for autofilled agents, both in [0, 1].
    pub skill_min: f32,
    pub skill_max: f32,
    /// Operator pause: suspends thinking, not bookkeeping.
    pub paused: bool,
}

impl BotConfig {
    // ===== compile-time capacities used as type parameters =====
    /// Maximum concurrent agents across both factions.
    pub const MAX_AGENTS: usize = 16;
    /// Maximum nodes in the navigation graph.
    pub const MAX_NAV_NODES: usize = 1024;
    /// Maximum outgoing edges per navigation node.
    pub const MAX_NODE_NEIGHBORS: usize = 8;
    /// Maximum path length in nodes.
    pub const MAX_PATH_NODES: usize = 256;
    /// Bounded recency memory of enemy sightings.
    pub const MAX_REMEMBERED_ENEMIES: usize = 8;
    /// Bounded recency memory of teammate positions.
    pub const MAX_REMEMBERED_TEAMMATES: usize = 8;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_THINK_INTERVAL: f32 = 0.1;
    pub const DEFAULT_STRATEGY_INTERVAL: f32 = 3.0;
    pub const DEFAULT_ENEMY_MEMORY_DECAY: f32 = 10.0;
    pub const DEFAULT_TEAMMATE_MEMORY_DECAY: f32 = 10.0;
    pub const DEFAULT_IDLE_DWELL: f32 = 2.0;
    pub const DEFAULT_FLEE_RECOVERY_MARGIN: f32 = 0.15;
    pub const DEFAULT_POPULATION_TARGET: usize = 8;

    pub fn new() -> Self {
        Self {
            think_interval: Self::DEFAULT_THINK_INTERVAL,
            strategy_interval: Self::DEFAULT_STRATEGY_INTERVAL,
            enemy_memory_decay: Self::DEFAULT_ENEMY_MEMORY_DECAY,
            teammate_memory_decay: Self::DEFAULT_TEAMMATE_MEMORY_DECAY,
            idle_dwell: Self::DEFAULT_IDLE_DWELL,
            flee_recovery_margin: Self::DEFAULT_FLEE_RECOVERY_MARGIN,
            population_target: Self::DEFAULT_POPULATION_TARGET,
            skill_min: 0.3,
            skill_max: 0.8,
            paused: false,
        }
    }

    /// Clamps every tunable into its legal band. Called by the director when
    /// a config is handed over, so malformed operator input degrades instead
    /// of propagating.
    pub fn sanitized(mut self) -> Self {
        self.think_interval = self.think_interval.clamp(0.01, 5.0);
        self.strategy_interval = self.strategy_interval.clamp(0.5, 60.0);
        self.enemy_memory_decay = self.enemy_memory_decay.max(0.0);
        self.teammate_memory_decay = self.teammate_memory_decay.max(0.0);
        self.idle_dwell = self.idle_dwell.max(0.0);
        self.flee_recovery_margin = self.flee_recovery_margin.clamp(0.01, 0.5);
        self.population_target = self.population_target.min(Self::MAX_AGENTS);
        self.skill_min = self.skill_min.clamp(0.0, 1.0);
        self.skill_max = self.skill_max.clamp(self.skill_min, 1.0);
        self
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_clamps_out_of_range_tunables() {
        let config = BotConfig {
            think_interval: -1.0,
            population_target: 10_000,
            skill_min: 0.9,
            skill_max: 0.1,
            ..BotConfig::new()
        }
        .sanitized();

        assert_eq!(config.think_interval, 0.01);
        assert_eq!(config.population_target, BotConfig::MAX_AGENTS);
        assert!(config.skill_max >= config.skill_min);
    }
}
