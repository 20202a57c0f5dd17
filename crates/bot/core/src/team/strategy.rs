//! Per-faction strategic assessment.
//!
//! Every strategy interval each faction builds a transient snapshot of
//! itself and its opponent, classifies the match phase, picks a directive,
//! and hands out roles. Roles only bias idle-state decisions; an agent in
//! combat keeps fighting whatever the directive says.

use strum::IntoEnumIterator;
use tracing::debug;

use crate::env::EntityDirectory;
use crate::state::arena::AgentArena;
use crate::state::types::{Faction, GameTime};

/// Power ratio one side must exceed before the assessor calls it an
/// advantage.
pub const POWER_RATIO: f32 = 1.25;

/// Seconds before the opening phase ends.
pub const EARLY_PHASE_END: f32 = 120.0;

/// Seconds after which the match reads as late-game.
pub const LATE_PHASE_START: f32 = 600.0;

/// Spawn-point count at or below which a faction is desperate.
pub const DESPERATE_SPAWNS: usize = 1;

/// Minimum alive agents for a desperate faction to go all-in instead of
/// turtling to rebuild.
pub const ALL_IN_MIN_ALIVE: usize = 3;

/// Transient per-faction summary. Recomputed on the strategy interval,
/// never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TeamSnapshot {
    pub alive: usize,
    /// Mean health fraction across living members, in [0, 1].
    pub avg_health: f32,
    /// Mean specialization tier (1 basic to 3 advanced).
    pub avg_tier: f32,
    pub spawn_points: usize,
    /// Composite fighting power; comparable across factions.
    pub power: f32,
}

impl TeamSnapshot {
    pub fn capture(
        faction: Faction,
        arena: &AgentArena,
        directory: &dyn EntityDirectory,
    ) -> Self {
        let mut alive = 0usize;
        let mut health_sum = 0.0f32;
        let mut tier_sum = 0.0f32;
        for agent in arena.faction_members(faction) {
            if !directory.is_alive(agent.entity) {
                continue;
            }
            alive += 1;
            health_sum += directory.health_fraction(agent.entity).clamp(0.0, 1.0);
            tier_sum += f32::from(agent.class.info().tier);
        }

        let (avg_health, avg_tier) = if alive > 0 {
            (health_sum / alive as f32, tier_sum / alive as f32)
        } else {
            (0.0, 0.0)
        };

        Self {
            alive,
            avg_health,
            avg_tier,
            spawn_points: directory.spawn_point_count(faction),
            power: alive as f32 * avg_tier * avg_health,
        }
    }
}

/// Match phase from elapsed time and spawn scarcity. Desperation trumps
/// the clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    #[default]
    Early,
    Mid,
    Late,
    Desperate,
}

pub fn classify_phase(now: GameTime, own: &TeamSnapshot) -> Phase {
    if own.spawn_points <= DESPERATE_SPAWNS {
        Phase::Desperate
    } else if now.0 < EARLY_PHASE_END {
        Phase::Early
    } else if now.0 >= LATE_PHASE_START {
        Phase::Late
    } else {
        Phase::Mid
    }
}

/// Faction-wide directive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Strategy {
    Push,
    #[default]
    Defend,
    /// Near-even power; keep pressure with split raids.
    Harass,
    /// Desperate with bodies to spend.
    AllIn,
    /// Desperate without them; turtle and rebuild spawns.
    Rebuild,
}

pub fn select_strategy(phase: Phase, own: &TeamSnapshot, enemy: &TeamSnapshot) -> Strategy {
    match phase {
        Phase::Desperate => {
            if own.alive >= ALL_IN_MIN_ALIVE {
                Strategy::AllIn
            } else {
                Strategy::Rebuild
            }
        }
        Phase::Early => Strategy::Defend,
        Phase::Mid | Phase::Late => {
            if own.power > enemy.power * POWER_RATIO {
                Strategy::Push
            } else if enemy.power > own.power * POWER_RATIO {
                Strategy::Defend
            } else {
                Strategy::Harass
            }
        }
    }
}

/// Role handed to an agent by the strategy layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    /// No assignment yet.
    #[default]
    Free,
    /// Pinned: construction-capable agents always build.
    Builder,
    /// Pinned: support specializations stay support.
    Support,
    Attacker,
    Defender,
    Scout,
}

/// Assigns roles to every member of a faction under the given strategy.
///
/// Builders and support classes are pinned regardless of directive. The
/// rest follow the strategy; harass alternates attacker/scout by slot so
/// the split is stable across reassignments.
pub fn assign_roles(arena: &mut AgentArena, faction: Faction, strategy: Strategy) {
    let mut scout_assigned = false;
    let mut unpinned_seen = 0usize;

    for agent in arena.iter_mut().filter(|a| a.faction == faction) {
        if agent.class.can_build() {
            agent.role = Role::Builder;
            continue;
        }
        if !agent.class.initiates_combat() {
            agent.role = Role::Support;
            continue;
        }

        agent.role = match strategy {
            Strategy::Push | Strategy::AllIn => Role::Attacker,
            Strategy::Defend => Role::Defender,
            Strategy::Harass => {
                if unpinned_seen % 2 == 0 {
                    Role::Attacker
                } else {
                    Role::Scout
                }
            }
            Strategy::Rebuild => {
                if scout_assigned {
                    Role::Defender
                } else {
                    scout_assigned = true;
                    Role::Scout
                }
            }
        };
        unpinned_seen += 1;
    }
}

/// Per-faction strategic state, refreshed on its own interval independent
/// of the outer tick rate.
#[derive(Clone, Copy, Debug, Default)]
struct FactionStrategy {
    snapshot: TeamSnapshot,
    phase: Phase,
    strategy: Strategy,
    frags: u32,
}

/// Win read for the upgrade engine, from the frag ratio.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum WinState {
    Winning,
    #[default]
    Even,
    Losing,
}

/// Both factions' strategic state plus the refresh timer.
#[derive(Debug, Default)]
pub struct TeamState {
    factions: [FactionStrategy; 2],
    last_refresh: Option<GameTime>,
}

impl TeamState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strategy(&self, faction: Faction) -> Strategy {
        self.factions[faction.index()].strategy
    }

    pub fn phase(&self, faction: Faction) -> Phase {
        self.factions[faction.index()].phase
    }

    pub fn snapshot(&self, faction: Faction) -> &TeamSnapshot {
        &self.factions[faction.index()].snapshot
    }

    pub fn record_kill(&mut self, by: Faction) {
        self.factions[by.index()].frags += 1;
    }

    pub fn frags(&self, faction: Faction) -> u32 {
        self.factions[faction.index()].frags
    }

    /// Frag-ratio read of how the match is going for `faction`.
    pub fn win_state(&self, faction: Faction) -> WinState {
        let own = self.frags(faction) as f32;
        let enemy = self.frags(faction.opponent()) as f32;
        if own > enemy * POWER_RATIO && own > 0.0 {
            WinState::Winning
        } else if enemy > own * POWER_RATIO && enemy > 0.0 {
            WinState::Losing
        } else {
            WinState::Even
        }
    }

    pub fn due(&self, now: GameTime, interval: f32) -> bool {
        self.last_refresh
            .is_none_or(|last| now.since(last) >= interval)
    }

    /// Recomputes snapshots, phases, strategies, and roles for both
    /// factions.
    pub fn refresh(
        &mut self,
        arena: &mut AgentArena,
        directory: &dyn EntityDirectory,
        now: GameTime,
    ) {
        let snapshots: [TeamSnapshot; 2] = [
            TeamSnapshot::capture(Faction::Human, arena, directory),
            TeamSnapshot::capture(Faction::Alien, arena, directory),
        ];

        for faction in Faction::iter() {
            let own = &snapshots[faction.index()];
            let enemy = &snapshots[faction.opponent().index()];
            let phase = classify_phase(now, own);
            let strategy = select_strategy(phase, own, enemy);

            let entry = &mut self.factions[faction.index()];
            entry.snapshot = *own;
            if strategy != entry.strategy || phase != entry.phase {
                debug!(%faction, %phase, %strategy, power = own.power, "strategy updated");
            }
            entry.phase = phase;
            entry.strategy = strategy;

            assign_roles(arena, faction, strategy);
        }
        self.last_refresh = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EntityKind;
    use crate::env::testing::FakeWorld;
    use crate::state::types::Vec3;

    fn roster(arena: &mut AgentArena, world: &mut FakeWorld, faction: Faction, count: usize) {
        for i in 0..count {
            let index = match faction {
                Faction::Human => 10 + i as u32,
                Faction::Alien => 30 + i as u32,
            };
            let entity = world.add(index, faction, EntityKind::Soldier, Vec3::ZERO);
            arena
                .connect(entity, faction, 0.5, 0, 0.1, GameTime::ZERO)
                .unwrap();
        }
    }

    #[test]
    fn spawn_scarcity_reads_as_desperate_regardless_of_clock() {
        let own = TeamSnapshot {
            spawn_points: 1,
            ..Default::default()
        };
        assert_eq!(classify_phase(GameTime::new(10.0), &own), Phase::Desperate);
    }

    #[test]
    fn desperate_strategy_depends_on_alive_count() {
        let thin = TeamSnapshot {
            alive: 2,
            ..Default::default()
        };
        let strong = TeamSnapshot {
            alive: 5,
            ..Default::default()
        };
        let enemy = TeamSnapshot::default();
        assert_eq!(
            select_strategy(Phase::Desperate, &thin, &enemy),
            Strategy::Rebuild
        );
        assert_eq!(
            select_strategy(Phase::Desperate, &strong, &enemy),
            Strategy::AllIn
        );
    }

    #[test]
    fn near_even_power_harasses() {
        let own = TeamSnapshot {
            power: 10.0,
            ..Default::default()
        };
        let enemy = TeamSnapshot {
            power: 11.0,
            ..Default::default()
        };
        assert_eq!(select_strategy(Phase::Mid, &own, &enemy), Strategy::Harass);

        let weak = TeamSnapshot {
            power: 5.0,
            ..Default::default()
        };
        assert_eq!(select_strategy(Phase::Mid, &own, &weak), Strategy::Push);
        assert_eq!(select_strategy(Phase::Mid, &weak, &own), Strategy::Defend);
    }

    #[test]
    fn builders_pinned_to_their_role_under_any_strategy() {
        let mut arena = AgentArena::new();
        let mut world = FakeWorld::new();
        roster(&mut arena, &mut world, Faction::Human, 3);

        // Promote the first to the builder class by hand.
        let id = arena.ids().next().unwrap();
        arena.get_mut(id).unwrap().class = crate::classes::ClassId::Engineer;

        assign_roles(&mut arena, Faction::Human, Strategy::AllIn);
        assert_eq!(arena.get(id).unwrap().role, Role::Builder);
    }

    #[test]
    fn harass_splits_attackers_and_scouts() {
        let mut arena = AgentArena::new();
        let mut world = FakeWorld::new();
        roster(&mut arena, &mut world, Faction::Alien, 4);

        assign_roles(&mut arena, Faction::Alien, Strategy::Harass);
        let roles: Vec<Role> = arena.iter().map(|a| a.role).collect();
        assert_eq!(
            roles,
            vec![Role::Attacker, Role::Scout, Role::Attacker, Role::Scout]
        );
    }

    #[test]
    fn win_state_follows_frag_ratio() {
        let mut team = TeamState::new();
        for _ in 0..10 {
            team.record_kill(Faction::Human);
        }
        for _ in 0..4 {
            team.record_kill(Faction::Alien);
        }
        assert_eq!(team.win_state(Faction::Human), WinState::Winning);
        assert_eq!(team.win_state(Faction::Alien), WinState::Losing);
    }

    #[test]
    fn refresh_is_rate_limited_by_interval() {
        let team = TeamState {
            last_refresh: Some(GameTime::new(10.0)),
            ..Default::default()
        };
        assert!(!team.due(GameTime::new(11.0), 3.0));
        assert!(team.due(GameTime::new(13.0), 3.0));
    }

    #[test]
    fn refresh_updates_both_factions() {
        let mut arena = AgentArena::new();
        let mut world = FakeWorld::new();
        roster(&mut arena, &mut world, Faction::Human, 2);
        roster(&mut arena, &mut world, Faction::Alien, 2);
        world.spawn_points.insert(Faction::Human, 3);
        world.spawn_points.insert(Faction::Alien, 1);

        let mut team = TeamState::new();
        team.refresh(&mut arena, &world, GameTime::new(30.0));

        assert_eq!(team.phase(Faction::Human), Phase::Early);
        assert_eq!(team.phase(Faction::Alien), Phase::Desperate);
        assert_eq!(team.strategy(Faction::Alien), Strategy::Rebuild);
    }
}
