//! The per-agent behavior state machine.
//!
//! One think call reads the world, runs interrupts, dispatches the active
//! state handler, and emits intents (where to move, where to shoot) for
//! the host to apply. The machine never blocks and never schedules; every
//! timeout is a lazy clock comparison inside the think.

use tracing::{debug, trace};

use crate::classes::ClassId;
use crate::combat;
use crate::config::BotConfig;
use crate::env::{EntityDirectory, PointContents, StructureCache, WorldOracle};
use crate::nav::graph::{NavFlags, NavGraph, NodeId};
use crate::nav::path::{self, PathQuery};
use crate::state::agent::{AgentState, AiState};
use crate::state::arena::AgentArena;
use crate::state::types::{GameTime, Vec3};
use crate::team::ops::{CrossOp, OpQueue};
use crate::team::strategy::{Role, TeamState};
use crate::upgrade::{self, Composition, UpgradeContext};

/// A surface steeper than this normal-z reads as a wall or ceiling.
pub const CLIMB_NORMAL_Z: f32 = 0.7;

/// Downward probe length for surface detection.
const GROUND_PROBE: f32 = 64.0;

/// Default arrival radius around a path node.
const ARRIVAL_DISTANCE: f32 = 32.0;

/// Close enough to the spend point to buy an upgrade.
const SPEND_RADIUS: f32 = 128.0;

/// Builders within this range of the base count as on site.
const WORK_RADIUS: f32 = 160.0;

/// Spawn points a faction keeps standing before builders go idle.
const SPAWN_POINT_FLOOR: usize = 2;

/// Everything a think may read, plus the queues it may write.
pub struct ThinkCtx<'a> {
    pub world: &'a dyn WorldOracle,
    pub directory: &'a dyn EntityDirectory,
    pub graph: &'a NavGraph,
    pub arena: &'a AgentArena,
    pub team: &'a TeamState,
    pub structures: &'a StructureCache,
    pub config: &'a BotConfig,
    pub ops: &'a mut OpQueue,
    pub now: GameTime,
}

/// Intents emitted by one think, applied by the host.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ThinkOutput {
    /// World position to steer toward this frame, if any.
    pub move_toward: Option<Vec3>,
    /// World position to shoot at this frame, if any.
    pub fire_at: Option<Vec3>,
}

/// Runs one think for the agent.
pub fn think(agent: &mut AgentState, ctx: &mut ThinkCtx<'_>) -> ThinkOutput {
    let now = ctx.now;
    combat::observe(
        agent,
        ctx.world,
        ctx.directory,
        now,
        ctx.config.enemy_memory_decay,
        ctx.config.teammate_memory_decay,
    );
    update_surface(agent, ctx.world, ctx.directory);

    run_interrupts(agent, ctx);

    let output = match agent.state {
        AiState::Idle => think_idle(agent, ctx),
        AiState::Patrol => think_patrol(agent, ctx),
        AiState::Hunt => think_hunt(agent, ctx),
        AiState::Combat => think_combat(agent, ctx),
        AiState::Flee => think_flee(agent, ctx),
        AiState::Defend => think_defend(agent, ctx),
        AiState::Escort => think_escort(agent, ctx),
        AiState::Build => think_build(agent, ctx),
        AiState::Upgrade => think_upgrade(agent, ctx),
    };

    agent.next_think = now + agent.think_interval;
    output
}

/// Transitions that apply from any state, evaluated before the handler.
fn run_interrupts(agent: &mut AgentState, ctx: &mut ThinkCtx<'_>) {
    // Fleeing agents do not re-engage; the flee handler decides when the
    // danger has passed.
    if agent.state == AiState::Combat || agent.state == AiState::Flee || agent.critical_action {
        return;
    }

    let Some((target, priority)) = combat::pick_target(agent, ctx.world, ctx.directory, ctx.now)
    else {
        return;
    };

    if !agent.class.initiates_combat() {
        // Support classes disengage on contact instead of fighting.
        enter_flee(agent, ctx);
        return;
    }

    combat::acquire(agent, target, priority, ctx.directory, ctx.now);
    ctx.ops.push(CrossOp::ShareSighting {
        spotter: agent.id,
        faction: agent.faction,
        origin: ctx.directory.position(agent.entity),
        enemy: target,
        position: ctx.directory.position(target),
    });
    agent.set_state(AiState::Combat, ctx.now);
}

// ---------------------------------------------------------------------------
// State handlers
// ---------------------------------------------------------------------------

fn think_idle(agent: &mut AgentState, ctx: &mut ThinkCtx<'_>) -> ThinkOutput {
    // Drafted escorts take priority over everything else idle does.
    if let Some(escortee) = agent.escort_target {
        if ctx.arena.get(escortee).is_some() {
            agent.set_state(AiState::Escort, ctx.now);
            return ThinkOutput::default();
        }
        agent.escort_target = None;
    }

    if agent.role == Role::Builder && agent.can_build() && build_need(agent, ctx) {
        agent.set_state(AiState::Build, ctx.now);
        request_escort(agent, ctx);
        return ThinkOutput::default();
    }

    if let Some(next) = upgrade_ready(agent, ctx) {
        trace!(agent = %agent.id, class = %next, "upgrade affordable, heading to spend point");
        if let Some(spend_point) = ctx.structures.primary(agent.faction) {
            let goal = ctx.directory.position(spend_point);
            plan_path(agent, ctx, goal);
            agent.set_state(AiState::Upgrade, ctx.now);
            return ThinkOutput::default();
        }
    }

    if agent.role == Role::Defender {
        agent.set_state(AiState::Defend, ctx.now);
        return ThinkOutput::default();
    }

    // Nothing to do: patrol once the dwell time has fully elapsed.
    if agent.state_age(ctx.now) >= ctx.config.idle_dwell {
        pick_patrol_goal(agent, ctx);
        agent.set_state(AiState::Patrol, ctx.now);
    }
    ThinkOutput::default()
}

fn think_patrol(agent: &mut AgentState, ctx: &mut ThinkCtx<'_>) -> ThinkOutput {
    if let Some(sighting) = agent.enemy_memory.most_recent() {
        agent.combat.last_known_position = sighting.position;
        agent.set_state(AiState::Hunt, ctx.now);
        return ThinkOutput::default();
    }

    if (arrived(agent, ctx.directory) || !agent.nav.path_valid) && !holding_ambush(agent, ctx) {
        pick_patrol_goal(agent, ctx);
    }
    ThinkOutput {
        move_toward: move_toward_goal(agent, ctx),
        fire_at: None,
    }
}

/// Stealth classes linger on a reached ambush-tagged node for their
/// patience-scaled dwell before moving on.
fn holding_ambush(agent: &AgentState, ctx: &ThinkCtx<'_>) -> bool {
    agent.class.is_stealth()
        && agent
            .nav
            .current_node
            .and_then(|id| ctx.graph.node(id))
            .is_some_and(|n| n.flags.contains(NavFlags::AMBUSH))
        && agent.state_age(ctx.now) < agent.personality.ambush_wait()
}

fn think_hunt(agent: &mut AgentState, ctx: &mut ThinkCtx<'_>) -> ThinkOutput {
    // Reacquisition happens in the interrupt pass; here the memory either
    // still holds or the hunt is over.
    let Some(sighting) = agent.enemy_memory.most_recent() else {
        agent.set_state(AiState::Idle, ctx.now);
        return ThinkOutput::default();
    };

    let goal = sighting.position;
    if agent.nav.goal_position != goal || !agent.nav.path_valid {
        plan_path(agent, ctx, goal);
    }
    ThinkOutput {
        move_toward: move_toward_goal(agent, ctx),
        fire_at: None,
    }
}

fn think_combat(agent: &mut AgentState, ctx: &mut ThinkCtx<'_>) -> ThinkOutput {
    if !combat::track_target(agent, ctx.world, ctx.directory, ctx.now) {
        agent.set_state(AiState::Idle, ctx.now);
        return ThinkOutput::default();
    }

    let health = ctx.directory.health_fraction(agent.entity);
    if health < agent.personality.flee_health_threshold() {
        enter_flee(agent, ctx);
        return ThinkOutput::default();
    }

    if !agent.combat.target_visible {
        agent.combat.drop_target();
        agent.set_state(AiState::Hunt, ctx.now);
        return ThinkOutput::default();
    }

    combat::update_aim(agent);
    let eye = ctx.directory.position(agent.entity);
    let target_pos = agent.combat.last_known_position;

    // Sacrifice classes detonate on contact; the host applies the blast
    // and the agent retires through the op queue.
    if agent.class == ClassId::Kamikaze
        && agent.combat.target_distance <= agent.combat.engagement_range
    {
        debug!(agent = %agent.id, "detonating on contact");
        ctx.ops.push(CrossOp::Disconnect(agent.id));
        return ThinkOutput {
            move_toward: None,
            fire_at: Some(target_pos),
        };
    }

    let fire_at = if combat::try_fire(agent, ctx.now) {
        Some(combat::aim_point(agent, eye, target_pos))
    } else {
        None
    };

    // Keep the class's preferred range: close when far, hold when near.
    let move_toward = if agent.combat.target_distance > agent.combat.engagement_range {
        if agent.nav.goal_position != target_pos || !agent.nav.path_valid {
            plan_path(agent, ctx, target_pos);
        }
        move_toward_goal(agent, ctx)
    } else {
        None
    };

    ThinkOutput { move_toward, fire_at }
}

fn think_flee(agent: &mut AgentState, ctx: &mut ThinkCtx<'_>) -> ThinkOutput {
    let health = ctx.directory.health_fraction(agent.entity);
    let recovery =
        agent.personality.flee_health_threshold() + ctx.config.flee_recovery_margin;
    if health >= recovery {
        agent.set_state(AiState::Idle, ctx.now);
        return ThinkOutput::default();
    }

    ThinkOutput {
        move_toward: move_toward_goal(agent, ctx),
        fire_at: None,
    }
}

fn think_defend(agent: &mut AgentState, ctx: &mut ThinkCtx<'_>) -> ThinkOutput {
    if agent.role != Role::Defender {
        agent.set_state(AiState::Idle, ctx.now);
        return ThinkOutput::default();
    }

    let Some(base) = ctx.structures.primary(agent.faction) else {
        agent.set_state(AiState::Idle, ctx.now);
        return ThinkOutput::default();
    };
    let post = ctx.directory.position(base);
    if agent.nav.goal_position != post || !agent.nav.path_valid {
        plan_path(agent, ctx, post);
    }
    ThinkOutput {
        move_toward: move_toward_goal(agent, ctx),
        fire_at: None,
    }
}

fn think_escort(agent: &mut AgentState, ctx: &mut ThinkCtx<'_>) -> ThinkOutput {
    // The escortee is a weak reference; it may have disconnected since the
    // draft.
    let Some(ward) = agent.escort_target.and_then(|id| ctx.arena.get(id)) else {
        agent.escort_target = None;
        agent.set_state(AiState::Idle, ctx.now);
        return ThinkOutput::default();
    };

    let goal = ctx.directory.position(ward.entity);
    if agent.nav.goal_position != goal || !agent.nav.path_valid {
        plan_path(agent, ctx, goal);
    }
    ThinkOutput {
        move_toward: move_toward_goal(agent, ctx),
        fire_at: None,
    }
}

fn think_build(agent: &mut AgentState, ctx: &mut ThinkCtx<'_>) -> ThinkOutput {
    if agent.role != Role::Builder || !agent.can_build() || !build_need(agent, ctx) {
        agent.critical_action = false;
        agent.set_state(AiState::Idle, ctx.now);
        return ThinkOutput::default();
    }

    // Work happens around the faction's base; the host resolves the actual
    // construction. A build scan occasionally re-anchors the goal.
    let Some(base) = ctx.structures.primary(agent.faction) else {
        agent.critical_action = false;
        agent.set_state(AiState::Idle, ctx.now);
        return ThinkOutput::default();
    };
    let site = ctx.directory.position(base);
    let here = ctx.directory.position(agent.entity);

    // Repairing the primary structure on site cannot be interrupted.
    agent.critical_action =
        ctx.directory.health_fraction(base) < 1.0 && here.distance(site) <= WORK_RADIUS;

    if !agent.nav.path_valid
        || agent
            .rng
            .chance(agent.personality.build_scan_chance() * 0.1)
    {
        plan_path(agent, ctx, site);
    }
    ThinkOutput {
        move_toward: move_toward_goal(agent, ctx),
        fire_at: None,
    }
}

/// Outstanding construction work for the agent's faction: spawn points
/// below the floor, or a damaged primary structure. With no primary
/// standing there is no site to anchor to, so no work is reported.
fn build_need(agent: &AgentState, ctx: &ThinkCtx<'_>) -> bool {
    let Some(base) = ctx.structures.primary(agent.faction) else {
        return false;
    };
    ctx.structures.spawn_points(agent.faction) < SPAWN_POINT_FLOOR
        || ctx.directory.health_fraction(base) < 1.0
}

fn think_upgrade(agent: &mut AgentState, ctx: &mut ThinkCtx<'_>) -> ThinkOutput {
    let Some(spend_point) = ctx.structures.primary(agent.faction) else {
        agent.set_state(AiState::Idle, ctx.now);
        return ThinkOutput::default();
    };

    let here = ctx.directory.position(agent.entity);
    let point = ctx.directory.position(spend_point);
    if here.distance(point) <= SPEND_RADIUS {
        let decision = upgrade_context(agent, ctx);
        let chosen = upgrade::choose_class(agent, &decision);
        if chosen != agent.class && upgrade::apply(agent, chosen, ctx.now) {
            debug!(agent = %agent.id, class = %chosen, "upgraded at spend point");
        }
        agent.set_state(AiState::Idle, ctx.now);
        return ThinkOutput::default();
    }

    if agent.nav.goal_position != point || !agent.nav.path_valid {
        plan_path(agent, ctx, point);
    }
    ThinkOutput {
        move_toward: move_toward_goal(agent, ctx),
        fire_at: None,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn enter_flee(agent: &mut AgentState, ctx: &mut ThinkCtx<'_>) {
    agent.combat.drop_target();
    if let Some(base) = ctx.structures.primary(agent.faction) {
        let refuge = ctx.directory.position(base);
        plan_path(agent, ctx, refuge);
    } else {
        agent.nav.invalidate();
    }
    agent.set_state(AiState::Flee, ctx.now);
}

/// The next specialization, when the agent can already pay for it.
fn upgrade_ready(agent: &AgentState, ctx: &ThinkCtx<'_>) -> Option<ClassId> {
    if agent.resource() == 0 {
        return None;
    }
    let decision = upgrade_context(agent, ctx);
    let chosen = upgrade::choose_class(agent, &decision);
    (chosen != agent.class && chosen.info().cost <= agent.resource()).then_some(chosen)
}

fn upgrade_context(agent: &AgentState, ctx: &ThinkCtx<'_>) -> UpgradeContext {
    let faction = agent.faction;
    UpgradeContext {
        own: Composition::capture(ctx.arena, faction),
        enemy: Composition::capture(ctx.arena, faction.opponent()),
        phase: ctx.team.phase(faction),
        enemy_phase: ctx.team.phase(faction.opponent()),
        strategy: ctx.team.strategy(faction),
        win_state: ctx.team.win_state(faction),
        map: ctx.graph.map_profile(),
    }
}

fn request_escort(agent: &AgentState, ctx: &mut ThinkCtx<'_>) {
    let escort = ctx
        .arena
        .faction_members(agent.faction)
        .find(|a| a.id != agent.id && a.state == AiState::Idle && a.role != Role::Builder);
    if let Some(escort) = escort {
        ctx.ops.push(CrossOp::DraftEscort {
            escortee: agent.id,
            escort: escort.id,
        });
    }
}

/// Picks a patrol destination from the agent's own stream: any node it can
/// stand on, preferring variety over optimality.
fn pick_patrol_goal(agent: &mut AgentState, ctx: &ThinkCtx<'_>) {
    let candidates: Vec<NodeId> = ctx.graph.iter().map(|n| n.id).collect();
    if candidates.is_empty() {
        agent.nav.invalidate();
        return;
    }
    let choice = candidates[agent.rng.next_bounded(candidates.len() as u32) as usize];
    if let Some(node) = ctx.graph.node(choice) {
        plan_path(agent, ctx, node.position);
    }
}

/// Plans a route toward a world position and stores it in nav sub-state.
///
/// Missing nodes or an exhausted search are not errors: the path is marked
/// invalid and steering falls back to moving directly at the goal.
pub fn plan_path(agent: &mut AgentState, ctx: &ThinkCtx<'_>, goal: Vec3) {
    agent.nav.goal_position = goal;
    agent.nav.arrival_distance = ARRIVAL_DISTANCE;

    let here = ctx.directory.position(agent.entity);
    let mask = agent.faction.mask();
    let can_climb = agent.can_wall_climb();
    let can_fly = agent.can_fly();

    let start = ctx
        .graph
        .find_nearest_reachable(here, mask, can_climb, can_fly, 0.0);
    let goal_node = ctx
        .graph
        .find_nearest_reachable(goal, mask, can_climb, can_fly, 0.0);
    let (Some(start), Some(goal_node)) = (start, goal_node) else {
        agent.nav.invalidate();
        return;
    };

    let query = PathQuery {
        start,
        goal: goal_node,
        capabilities: agent.capabilities(),
        faction: mask,
    };
    match path::find_path(ctx.graph, &query) {
        Ok(route) => {
            agent.nav.path = route;
            agent.nav.cursor = 0;
            agent.nav.path_valid = true;
            agent.nav.current_node = Some(start);
            agent.nav.goal_node = Some(goal_node);
        }
        Err(err) => {
            trace!(agent = %agent.id, %err, "no route, steering direct");
            agent.nav.invalidate();
        }
    }
}

/// Advances along the stored path, or steers straight at the goal when no
/// valid path exists.
pub fn move_toward_goal(agent: &mut AgentState, ctx: &ThinkCtx<'_>) -> Option<Vec3> {
    let here = ctx.directory.position(agent.entity);

    if !agent.nav.path_valid {
        let goal = agent.nav.goal_position;
        return (here.distance(goal) > agent.nav.arrival_distance.max(ARRIVAL_DISTANCE))
            .then_some(goal);
    }

    while agent.nav.cursor < agent.nav.path.len() {
        let node_id = agent.nav.path[agent.nav.cursor];
        let Some(node) = ctx.graph.node(node_id) else {
            // Node removed since planning; the route is dead.
            agent.nav.invalidate();
            return Some(agent.nav.goal_position);
        };
        if here.distance(node.position) <= agent.nav.arrival_distance {
            agent.nav.current_node = Some(node_id);
            agent.nav.cursor += 1;
            continue;
        }
        return Some(node.position);
    }

    // Path consumed.
    agent.nav.path_valid = false;
    None
}

fn arrived(agent: &AgentState, directory: &dyn EntityDirectory) -> bool {
    let here = directory.position(agent.entity);
    agent.nav.path_valid
        && agent.nav.cursor >= agent.nav.path.len()
        || (!agent.nav.path_valid
            && here.distance(agent.nav.goal_position) <= ARRIVAL_DISTANCE)
}

/// Refreshes the on-climbable-surface flag from a short downward probe.
/// A steep support surface means the agent is wall-walking.
fn update_surface(agent: &mut AgentState, world: &dyn WorldOracle, directory: &dyn EntityDirectory) {
    let here = directory.position(agent.entity);
    // Swimming agents are never wall-walking, whatever is below them.
    if world.contents(here) == PointContents::Water {
        agent.nav.climbing = false;
        agent.nav.surface_normal = Vec3::ZERO;
        return;
    }
    let probe = world.trace(here, here + Vec3::new(0.0, 0.0, -GROUND_PROBE));
    if probe.clear() {
        agent.nav.climbing = false;
        agent.nav.surface_normal = Vec3::ZERO;
    } else {
        agent.nav.climbing = probe.normal.z < CLIMB_NORMAL_Z;
        agent.nav.surface_normal = probe.normal;
    }
}
