//! Specialization upgrade engine.
//!
//! Each faction runs an ordered rule cascade over its composition, the
//! enemy's composition, the match phase, and the map profile. The first
//! satisfied rule wins; the order is part of the contract (the
//! keep-one-builder rule must fire before any counter-pick, or a team can
//! upgrade itself out of being able to build).
//!
//! Every candidate is gated the same way: affordable now, and under its
//! population cap.

use tracing::debug;

use crate::classes::ClassId;
use crate::nav::graph::MapProfile;
use crate::state::agent::AgentState;
use crate::state::arena::AgentArena;
use crate::state::types::{Faction, GameTime};
use crate::team::strategy::{Phase, Strategy, WinState};

/// Team size at which a support specialization becomes mandatory.
pub const SUPPORT_TEAM_SIZE: usize = 4;

/// Team size required before anyone buys the top-cost human walker.
pub const MECH_TEAM_SIZE: usize = 6;

/// Per-class headcount for one faction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Composition {
    counts: [u8; 16],
    total: u8,
}

impl Composition {
    pub fn capture(arena: &AgentArena, faction: Faction) -> Self {
        let mut comp = Self::default();
        for agent in arena.faction_members(faction) {
            comp.counts[agent.class as usize] = comp.counts[agent.class as usize].saturating_add(1);
            comp.total = comp.total.saturating_add(1);
        }
        comp
    }

    pub fn count(&self, class: ClassId) -> usize {
        usize::from(self.counts[class as usize])
    }

    pub fn total(&self) -> usize {
        usize::from(self.total)
    }

    /// More than half the roster is the free starter class.
    pub fn is_rushing(&self, faction: Faction) -> bool {
        let total = self.total();
        total > 0 && self.count(ClassId::starter(faction)) * 2 > total
    }

    /// Builder plus dedicated defense present past the opening phase.
    pub fn is_fortified(&self, faction: Faction, phase: Phase) -> bool {
        if matches!(phase, Phase::Early) {
            return false;
        }
        match faction {
            Faction::Human => {
                self.count(ClassId::Engineer) > 0 && self.count(ClassId::HeavyTrooper) > 0
            }
            Faction::Alien => {
                self.count(ClassId::Breeder) > 0 && self.count(ClassId::Guardian) > 0
            }
        }
    }
}

/// Everything the cascade reads besides the agent itself.
#[derive(Clone, Copy, Debug)]
pub struct UpgradeContext {
    pub own: Composition,
    pub enemy: Composition,
    pub phase: Phase,
    pub enemy_phase: Phase,
    pub strategy: Strategy,
    pub win_state: WinState,
    pub map: MapProfile,
}

/// Affordable now and under the class population cap.
fn fits(class: ClassId, resource: u32, own: &Composition) -> bool {
    let info = class.info();
    info.cost <= resource && own.count(class) < usize::from(info.population_cap)
}

fn affordable(class: ClassId, resource: u32) -> bool {
    class.info().cost <= resource
}

/// Picks the next specialization for the agent. Always returns a class of
/// the agent's own faction; the free starter is the universal fallback.
pub fn choose_class(agent: &AgentState, ctx: &UpgradeContext) -> ClassId {
    let chosen = match agent.faction {
        Faction::Alien => choose_alien(agent.resource(), ctx),
        Faction::Human => choose_human(agent.resource(), ctx),
    };
    debug_assert_eq!(chosen.faction(), agent.faction);
    chosen
}

fn choose_alien(evos: u32, ctx: &UpgradeContext) -> ClassId {
    let own = &ctx.own;
    let enemy_fortified = ctx.enemy.is_fortified(Faction::Human, ctx.enemy_phase);

    // Always keep at least one builder.
    if own.count(ClassId::Breeder) == 0 && affordable(ClassId::Breeder, evos) {
        return ClassId::Breeder;
    }

    if matches!(ctx.phase, Phase::Early) || evos <= 1 {
        if affordable(ClassId::Drone, evos) {
            return ClassId::Drone;
        }
        return ClassId::Hatchling;
    }

    // Losing badly: sacrifice units crack fortified lines.
    if ctx.win_state == WinState::Losing && fits(ClassId::Kamikaze, evos, own) {
        return ClassId::Kamikaze;
    }

    // First flier when the enemy has dug in.
    if own.count(ClassId::Wraith) == 0 && enemy_fortified && affordable(ClassId::Wraith, evos) {
        return ClassId::Wraith;
    }

    if evos <= 4 {
        if fits(ClassId::Wraith, evos, own)
            && (ctx.map == MapProfile::Open || own.count(ClassId::Wraith) == 0)
        {
            return ClassId::Wraith;
        }
        if enemy_fortified && fits(ClassId::Kamikaze, evos, own) {
            return ClassId::Kamikaze;
        }
        if fits(ClassId::Stinger, evos, own) {
            return ClassId::Stinger;
        }
        if affordable(ClassId::Drone, evos) {
            return ClassId::Drone;
        }
        return ClassId::Hatchling;
    }

    // Late game. All-in skips the expensive picks for sacrifice pressure.
    if ctx.strategy == Strategy::AllIn && fits(ClassId::Kamikaze, evos, own) {
        return ClassId::Kamikaze;
    }
    if fits(ClassId::Guardian, evos, own) {
        return ClassId::Guardian;
    }
    if fits(ClassId::Stalker, evos, own) {
        return ClassId::Stalker;
    }
    if fits(ClassId::Stinger, evos, own) {
        return ClassId::Stinger;
    }
    ClassId::Hatchling
}

fn choose_human(credits: u32, ctx: &UpgradeContext) -> ClassId {
    let own = &ctx.own;
    let team_size = own.total();

    // Always keep at least one builder.
    if own.count(ClassId::Engineer) == 0 && affordable(ClassId::Engineer, credits) {
        return ClassId::Engineer;
    }

    // One medic once the team is big enough to need one.
    if team_size >= SUPPORT_TEAM_SIZE
        && own.count(ClassId::Biotech) == 0
        && affordable(ClassId::Biotech, credits)
    {
        return ClassId::Biotech;
    }

    // Counter-picks react to specific enemy specializations.
    if ctx.enemy.count(ClassId::Stalker) > 0 {
        if fits(ClassId::Exterminator, credits, own) {
            return ClassId::Exterminator;
        }
        if fits(ClassId::HeavyTrooper, credits, own) {
            return ClassId::HeavyTrooper;
        }
    }
    if ctx.enemy.is_rushing(Faction::Alien) && fits(ClassId::ShockTrooper, credits, own) {
        return ClassId::ShockTrooper;
    }

    if matches!(ctx.phase, Phase::Early) || credits <= 1 {
        if ctx.enemy.total() > 0
            && ctx.enemy.is_rushing(Faction::Alien)
            && affordable(ClassId::ShockTrooper, credits)
        {
            return ClassId::ShockTrooper;
        }
        return ClassId::Grunt;
    }

    if credits <= 3 {
        if team_size >= SUPPORT_TEAM_SIZE
            && own.count(ClassId::Biotech) == 0
            && affordable(ClassId::Biotech, credits)
        {
            return ClassId::Biotech;
        }
        if fits(ClassId::HeavyTrooper, credits, own) {
            return ClassId::HeavyTrooper;
        }
        if fits(ClassId::Commando, credits, own) && ctx.map != MapProfile::Tight {
            return ClassId::Commando;
        }
        if fits(ClassId::ShockTrooper, credits, own) {
            return ClassId::ShockTrooper;
        }
        return ClassId::Grunt;
    }

    // Late game.
    if fits(ClassId::Mech, credits, own) && team_size >= MECH_TEAM_SIZE {
        return ClassId::Mech;
    }
    if fits(ClassId::Exterminator, credits, own) {
        return ClassId::Exterminator;
    }
    if fits(ClassId::HeavyTrooper, credits, own) {
        return ClassId::HeavyTrooper;
    }
    ClassId::Grunt
}

/// Commits a class change: pays the cost, swaps the capability profile,
/// and bumps the upgrade counter. A free pick (the starter) applies
/// without payment.
pub fn apply(agent: &mut AgentState, chosen: ClassId, now: GameTime) -> bool {
    let cost = chosen.info().cost;
    if cost > 0 && !agent.spend(cost) {
        return false;
    }
    agent.class = chosen;
    agent.combat.engagement_range = chosen.info().preferred_range;
    agent.upgrades += 1;
    debug!(agent = %agent.id, class = %chosen, %now, "specialization changed");
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comp(entries: &[(ClassId, u8)]) -> Composition {
        let mut c = Composition::default();
        for &(class, n) in entries {
            c.counts[class as usize] = n;
            c.total += n;
        }
        c
    }

    fn ctx(own: Composition, enemy: Composition) -> UpgradeContext {
        UpgradeContext {
            own,
            enemy,
            phase: Phase::Mid,
            enemy_phase: Phase::Mid,
            strategy: Strategy::Harass,
            win_state: WinState::Even,
            map: MapProfile::Mixed,
        }
    }

    #[test]
    fn builder_rule_fires_before_everything_else() {
        // A Stalker on the field would normally trigger the counter-pick,
        // but the team has no Engineer.
        let own = comp(&[(ClassId::Grunt, 3)]);
        let enemy = comp(&[(ClassId::Stalker, 1)]);
        assert_eq!(choose_human(5, &ctx(own, enemy)), ClassId::Engineer);
    }

    #[test]
    fn support_guaranteed_once_team_is_large() {
        let own = comp(&[(ClassId::Grunt, 3), (ClassId::Engineer, 1)]);
        let enemy = comp(&[]);
        assert_eq!(choose_human(5, &ctx(own, enemy)), ClassId::Biotech);
    }

    #[test]
    fn stalker_presence_draws_an_exterminator() {
        let own = comp(&[(ClassId::Engineer, 1), (ClassId::Grunt, 1)]);
        let enemy = comp(&[(ClassId::Stalker, 1)]);
        assert_eq!(choose_human(5, &ctx(own, enemy)), ClassId::Exterminator);
    }

    #[test]
    fn exterminator_cap_falls_through_to_heavy_trooper() {
        let own = comp(&[(ClassId::Engineer, 1), (ClassId::Exterminator, 2)]);
        let enemy = comp(&[(ClassId::Stalker, 1)]);
        assert_eq!(choose_human(5, &ctx(own, enemy)), ClassId::HeavyTrooper);
    }

    #[test]
    fn hatchling_rush_draws_shock_troopers() {
        let own = comp(&[(ClassId::Engineer, 1), (ClassId::Grunt, 1)]);
        let enemy = comp(&[(ClassId::Hatchling, 4), (ClassId::Breeder, 1)]);
        assert_eq!(choose_human(2, &ctx(own, enemy)), ClassId::ShockTrooper);
    }

    #[test]
    fn alien_team_without_breeder_buys_one_first() {
        let own = comp(&[(ClassId::Hatchling, 4)]);
        let enemy = comp(&[]);
        let mut c = ctx(own, enemy);
        c.phase = Phase::Mid;
        let choice = {
            let mut arena = AgentArena::new();
            let mut world = crate::env::testing::FakeWorld::new();
            let e = world.add(
                1,
                Faction::Alien,
                crate::env::EntityKind::Soldier,
                crate::state::types::Vec3::ZERO,
            );
            let id = arena.connect(e, Faction::Alien, 0.5, 0, 0.1, GameTime::ZERO).unwrap();
            let agent = arena.get_mut(id).unwrap();
            agent.evos = 3;
            choose_class(agent, &c)
        };
        assert_eq!(choice, ClassId::Breeder);
    }

    #[test]
    fn losing_aliens_reach_for_sacrifice_units() {
        let own = comp(&[(ClassId::Breeder, 1), (ClassId::Drone, 2)]);
        let enemy = comp(&[]);
        let mut c = ctx(own, enemy);
        c.win_state = WinState::Losing;
        assert_eq!(choose_alien(3, &c), ClassId::Kamikaze);
    }

    #[test]
    fn open_maps_favor_fliers_in_midgame() {
        let own = comp(&[(ClassId::Breeder, 1), (ClassId::Wraith, 1)]);
        let enemy = comp(&[]);
        let mut c = ctx(own, enemy);
        c.map = MapProfile::Open;
        assert_eq!(choose_alien(3, &c), ClassId::Wraith);

        c.map = MapProfile::Mixed;
        assert_eq!(
            choose_alien(3, &c),
            ClassId::Stinger,
            "one flier already filled the gap on a non-open map"
        );
    }

    #[test]
    fn all_in_aliens_spend_on_sacrifice_units() {
        let own = comp(&[(ClassId::Breeder, 1), (ClassId::Drone, 3)]);
        let enemy = comp(&[]);
        let mut c = ctx(own, enemy);
        c.strategy = Strategy::AllIn;
        assert_eq!(choose_alien(6, &c), ClassId::Kamikaze);
    }

    #[test]
    fn late_game_guardian_cap_falls_through_to_stalker() {
        let own = comp(&[(ClassId::Breeder, 1), (ClassId::Guardian, 2)]);
        let enemy = comp(&[]);
        assert_eq!(choose_alien(6, &ctx(own, enemy)), ClassId::Stalker);
    }

    #[test]
    fn mech_requires_a_big_team() {
        let small = comp(&[(ClassId::Engineer, 1), (ClassId::Biotech, 1), (ClassId::Grunt, 2)]);
        let enemy = comp(&[]);
        assert_ne!(choose_human(8, &ctx(small, enemy)), ClassId::Mech);

        let big = comp(&[
            (ClassId::Engineer, 1),
            (ClassId::Biotech, 1),
            (ClassId::Grunt, 4),
        ]);
        assert_eq!(choose_human(8, &ctx(big, enemy)), ClassId::Mech);
    }

    #[test]
    fn apply_pays_and_updates_the_profile() {
        let mut arena = AgentArena::new();
        let mut world = crate::env::testing::FakeWorld::new();
        let e = world.add(
            1,
            Faction::Human,
            crate::env::EntityKind::Soldier,
            crate::state::types::Vec3::ZERO,
        );
        let id = arena.connect(e, Faction::Human, 0.5, 0, 0.1, GameTime::ZERO).unwrap();
        let agent = arena.get_mut(id).unwrap();
        agent.credits = 3;

        assert!(!apply(agent, ClassId::Mech, GameTime::ZERO), "cannot afford");
        assert_eq!(agent.class, ClassId::Grunt);

        assert!(apply(agent, ClassId::HeavyTrooper, GameTime::ZERO));
        assert_eq!(agent.class, ClassId::HeavyTrooper);
        assert_eq!(agent.credits, 0);
        assert_eq!(agent.upgrades, 1);
        assert_eq!(
            agent.combat.engagement_range,
            ClassId::HeavyTrooper.info().preferred_range
        );
    }
}
