//! Target arbitration, aim, and fire gating.
//!
//! Target selection applies a strict per-faction priority order; distance
//! only breaks ties within a tier. Selected targets are cached into the
//! agent's bounded sighting memory so pursuit survives brief occlusion.

use tracing::trace;

use crate::env::{EntityDirectory, EntityKind, WorldOracle};
use crate::state::agent::{AgentState, WeaponState};
use crate::state::types::{EntityRef, GameTime, Vec3};

/// Largest positional aim offset (world units), applied at skill 0.
pub const MAX_AIM_ERROR: f32 = 150.0;

/// Minimum spacing between fire requests honored for one agent.
pub const FIRE_INTERVAL: f32 = 0.1;

/// Why a target was selected. Lower tiers outrank higher ones; distance
/// only decides within a tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum TargetPriority {
    /// The enemy's win-condition structure.
    PrimaryStructure,
    /// Enemy construction units; killing them starves the enemy base.
    Builder,
    /// Automated defenses and spawn structures.
    Defense,
    /// Everything else that shoots back.
    Soldier,
}

fn priority_of(kind: EntityKind) -> TargetPriority {
    match kind {
        EntityKind::PrimaryStructure => TargetPriority::PrimaryStructure,
        EntityKind::Builder => TargetPriority::Builder,
        EntityKind::Defense | EntityKind::SpawnPoint => TargetPriority::Defense,
        EntityKind::Soldier | EntityKind::Support => TargetPriority::Soldier,
    }
}

/// Selects the best visible enemy for this agent, if any.
///
/// Both factions run the same tier ladder against the opposing roster, so
/// the orders mirror each other. The winner is cached into the agent's
/// enemy memory; the caller decides whether to actually engage.
pub fn pick_target(
    agent: &mut AgentState,
    world: &dyn WorldOracle,
    directory: &dyn EntityDirectory,
    now: GameTime,
) -> Option<(EntityRef, TargetPriority)> {
    let eye = directory.position(agent.entity);
    let enemy = agent.faction.opponent();

    let mut best: Option<(EntityRef, TargetPriority, f32)> = None;
    for entity in directory.entities() {
        if entity == agent.entity || !directory.is_alive(entity) {
            continue;
        }
        if directory.faction(entity) != Some(enemy) {
            continue;
        }
        let position = directory.position(entity);
        if !world.visible(eye, position) {
            continue;
        }

        let priority = priority_of(directory.kind(entity));
        let dist_sq = eye.distance_squared(position);
        let better = match best {
            None => true,
            Some((_, p, d)) => priority < p || (priority == p && dist_sq < d),
        };
        if better {
            best = Some((entity, priority, dist_sq));
        }
    }

    let (target, priority, _) = best?;
    agent
        .enemy_memory
        .note(target, directory.position(target), now);
    trace!(agent = %agent.id, %target, %priority, "target selected");
    Some((target, priority))
}

/// Adopts a target into combat sub-state and refreshes visibility data.
pub fn acquire(
    agent: &mut AgentState,
    target: EntityRef,
    priority: TargetPriority,
    directory: &dyn EntityDirectory,
    now: GameTime,
) {
    let position = directory.position(target);
    let eye = directory.position(agent.entity);
    agent.combat.target = Some(target);
    agent.combat.target_priority = priority;
    agent.combat.last_known_position = position;
    agent.combat.last_seen = now;
    agent.combat.target_visible = true;
    agent.combat.target_distance = eye.distance(position);
    agent.combat.engagement_range = agent.class.info().preferred_range;
    agent.combat.weapon = WeaponState::Acquire;
}

/// Refreshes visibility, distance, and last-known position for the current
/// target. Returns false when the target reference has gone stale.
pub fn track_target(
    agent: &mut AgentState,
    world: &dyn WorldOracle,
    directory: &dyn EntityDirectory,
    now: GameTime,
) -> bool {
    let Some(target) = agent.combat.target else {
        return false;
    };
    if !directory.is_alive(target) {
        agent.combat.drop_target();
        return false;
    }

    let eye = directory.position(agent.entity);
    let position = directory.position(target);
    agent.combat.target_distance = eye.distance(position);
    agent.combat.target_visible = world.visible(eye, position);
    if agent.combat.target_visible {
        agent.combat.last_known_position = position;
        agent.combat.last_seen = now;
        agent.enemy_memory.note(target, position, now);
    }
    true
}

/// Recomputes the aim error for this think.
///
/// The error shrinks linearly with skill and is drawn once per aim update
/// from the agent's own stream, not per shot, so a burst fired within one
/// think shares the same offset.
pub fn update_aim(agent: &mut AgentState) {
    let spread = MAX_AIM_ERROR * (1.0 - agent.skill);
    agent.combat.aim_error = spread * agent.rng.next_f32();
}

/// Where to point, given the current aim error. The offset is perpendicular
/// to the line of fire so error translates into misses, not range mistakes.
pub fn aim_point(agent: &mut AgentState, eye: Vec3, target: Vec3) -> Vec3 {
    let error = agent.combat.aim_error;
    if error <= f32::EPSILON {
        return target;
    }
    let dir = (target - eye).normalized();
    // Any horizontal perpendicular will do.
    let side = Vec3::new(-dir.y, dir.x, 0.0).normalized();
    let yaw = agent.rng.range_f32(-1.0, 1.0);
    let pitch = agent.rng.range_f32(-0.5, 0.5);
    target + side * (error * yaw) + Vec3::new(0.0, 0.0, error * pitch)
}

/// Fire gate. Early requests are dropped outright, never queued.
pub fn try_fire(agent: &mut AgentState, now: GameTime) -> bool {
    if now < agent.combat.next_fire {
        return false;
    }
    agent.combat.next_fire = now + FIRE_INTERVAL;
    agent.combat.weapon = WeaponState::Firing;
    true
}

/// Records visible entities into the agent's sighting memories and purges
/// entries past the decay window. Called once per think.
pub fn observe(
    agent: &mut AgentState,
    world: &dyn WorldOracle,
    directory: &dyn EntityDirectory,
    now: GameTime,
    enemy_decay: f32,
    teammate_decay: f32,
) {
    let eye = directory.position(agent.entity);
    for entity in directory.entities() {
        if entity == agent.entity || !directory.is_alive(entity) {
            continue;
        }
        let Some(faction) = directory.faction(entity) else {
            continue;
        };
        let position = directory.position(entity);
        if !world.visible(eye, position) {
            continue;
        }
        if faction == agent.faction {
            agent.team_memory.note(entity, position, now);
        } else {
            agent.enemy_memory.note(entity, position, now);
        }
    }
    agent.enemy_memory.purge_expired(now, enemy_decay);
    agent.team_memory.purge_expired(now, teammate_decay);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::testing::FakeWorld;
    use crate::state::arena::AgentArena;
    use crate::state::types::Faction;

    fn human_agent(arena: &mut AgentArena, world: &mut FakeWorld) -> crate::state::AgentId {
        let entity = world.add(1, Faction::Human, EntityKind::Soldier, Vec3::ZERO);
        arena
            .connect(entity, Faction::Human, 0.5, 0, 0.1, GameTime::ZERO)
            .unwrap()
    }

    #[test]
    fn priority_tier_beats_distance() {
        let mut arena = AgentArena::new();
        let mut world = FakeWorld::new();
        let id = human_agent(&mut arena, &mut world);

        // A soldier right next to us and a builder far away.
        world.add(2, Faction::Alien, EntityKind::Soldier, Vec3::new(50.0, 0.0, 0.0));
        let builder = world.add(3, Faction::Alien, EntityKind::Builder, Vec3::new(900.0, 0.0, 0.0));

        let agent = arena.get_mut(id).unwrap();
        let (target, priority) = pick_target(agent, &world, &world, GameTime::ZERO).unwrap();
        assert_eq!(target, builder);
        assert_eq!(priority, TargetPriority::Builder);
    }

    #[test]
    fn nearest_wins_within_a_tier() {
        let mut arena = AgentArena::new();
        let mut world = FakeWorld::new();
        let id = human_agent(&mut arena, &mut world);

        let near = world.add(2, Faction::Alien, EntityKind::Soldier, Vec3::new(100.0, 0.0, 0.0));
        world.add(3, Faction::Alien, EntityKind::Soldier, Vec3::new(400.0, 0.0, 0.0));

        let agent = arena.get_mut(id).unwrap();
        let (target, _) = pick_target(agent, &world, &world, GameTime::ZERO).unwrap();
        assert_eq!(target, near);
    }

    #[test]
    fn occluded_and_friendly_entities_are_ignored() {
        let mut arena = AgentArena::new();
        let mut world = FakeWorld::new();
        let id = human_agent(&mut arena, &mut world);

        world.add(2, Faction::Human, EntityKind::Soldier, Vec3::new(50.0, 0.0, 0.0));
        let hidden_pos = Vec3::new(300.0, 0.0, 0.0);
        world.add(3, Faction::Alien, EntityKind::Soldier, hidden_pos);
        world.block(Vec3::ZERO, hidden_pos);

        let agent = arena.get_mut(id).unwrap();
        assert!(pick_target(agent, &world, &world, GameTime::ZERO).is_none());
    }

    #[test]
    fn selection_caches_into_enemy_memory() {
        let mut arena = AgentArena::new();
        let mut world = FakeWorld::new();
        let id = human_agent(&mut arena, &mut world);
        let pos = Vec3::new(200.0, 0.0, 0.0);
        let enemy = world.add(2, Faction::Alien, EntityKind::Soldier, pos);

        let agent = arena.get_mut(id).unwrap();
        pick_target(agent, &world, &world, GameTime::new(4.0)).unwrap();
        let sighting = agent.enemy_memory.recall(enemy).unwrap();
        assert_eq!(sighting.position, pos);
        assert_eq!(sighting.seen_at, GameTime::new(4.0));
    }

    #[test]
    fn aim_error_shrinks_with_skill() {
        let mut arena = AgentArena::new();
        let mut world = FakeWorld::new();
        let e1 = world.add(1, Faction::Human, EntityKind::Soldier, Vec3::ZERO);
        let e2 = world.add(2, Faction::Human, EntityKind::Soldier, Vec3::ZERO);
        let novice = arena.connect(e1, Faction::Human, 0.0, 0, 0.1, GameTime::ZERO).unwrap();
        let expert = arena.connect(e2, Faction::Human, 1.0, 0, 0.1, GameTime::ZERO).unwrap();

        let a = arena.get_mut(novice).unwrap();
        update_aim(a);
        let novice_error = a.combat.aim_error;

        let a = arena.get_mut(expert).unwrap();
        update_aim(a);
        assert_eq!(a.combat.aim_error, 0.0, "skill 1.0 aims true");
        assert!(novice_error <= MAX_AIM_ERROR);
    }

    #[test]
    fn fire_gate_drops_early_requests() {
        let mut arena = AgentArena::new();
        let mut world = FakeWorld::new();
        let id = human_agent(&mut arena, &mut world);
        let agent = arena.get_mut(id).unwrap();

        assert!(try_fire(agent, GameTime::new(1.0)));
        assert!(!try_fire(agent, GameTime::new(1.05)), "within the gate");
        assert!(try_fire(agent, GameTime::new(1.1)));
    }

    #[test]
    fn stale_target_is_dropped_not_dereferenced() {
        let mut arena = AgentArena::new();
        let mut world = FakeWorld::new();
        let id = human_agent(&mut arena, &mut world);
        let enemy = world.add(2, Faction::Alien, EntityKind::Soldier, Vec3::new(100.0, 0.0, 0.0));

        let agent = arena.get_mut(id).unwrap();
        let (target, priority) = pick_target(agent, &world, &world, GameTime::ZERO).unwrap();
        acquire(agent, target, priority, &world, GameTime::ZERO);

        world.kill(enemy);
        let agent = arena.get_mut(id).unwrap();
        assert!(!track_target(agent, &world, &world, GameTime::new(1.0)));
        assert_eq!(agent.combat.target, None);
    }
}
