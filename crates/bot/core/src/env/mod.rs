//! Host-environment seams.
//!
//! The engine never touches the simulation directly; it reads the world
//! through these traits and the host applies the movement/firing intents
//! the engine produces. Tests swap in table-driven fakes.

use crate::state::types::{EntityRef, Faction, Vec3};

/// Result of a line trace through world geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceResult {
    /// Fraction of the segment traveled before hitting geometry; 1.0 means
    /// the segment is clear.
    pub fraction: f32,
    /// Surface normal at the hit point (undefined when `fraction == 1.0`).
    pub normal: Vec3,
    /// Hit position in world space.
    pub end: Vec3,
}

impl TraceResult {
    pub fn clear(&self) -> bool {
        self.fraction >= 1.0
    }
}

/// Coarse classification of a point in the world volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PointContents {
    Empty,
    Solid,
    Water,
}

/// Geometry queries answered by the host simulation.
pub trait WorldOracle: Send + Sync {
    fn trace(&self, from: Vec3, to: Vec3) -> TraceResult;

    /// Volume classification at a point. Hosts without volume data may
    /// leave the default.
    fn contents(&self, at: Vec3) -> PointContents {
        let _ = at;
        PointContents::Empty
    }

    /// Line-of-sight test between two points.
    fn visible(&self, from: Vec3, to: Vec3) -> bool {
        self.trace(from, to).clear()
    }
}

/// Coarse classification of a live entity, used for target arbitration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    /// The faction's win-condition structure (reactor / overmind analogue).
    PrimaryStructure,
    /// Respawn structure.
    SpawnPoint,
    /// Automated defensive structure.
    Defense,
    /// A player or bot combatant.
    Soldier,
    /// A combatant of a builder specialization.
    Builder,
    /// A combatant of a support specialization.
    Support,
}

/// Entity roster queries answered by the host simulation.
///
/// Every handle carries a serial; implementations must reject handles whose
/// serial no longer matches the slot, so a stale [`EntityRef`] reads as
/// dead rather than as whatever respawned in the slot.
pub trait EntityDirectory: Send + Sync {
    /// All live entities relevant to combat and strategy.
    fn entities(&self) -> Vec<EntityRef>;

    fn is_alive(&self, entity: EntityRef) -> bool;
    fn position(&self, entity: EntityRef) -> Vec3;
    fn velocity(&self, entity: EntityRef) -> Vec3;
    fn faction(&self, entity: EntityRef) -> Option<Faction>;
    fn kind(&self, entity: EntityRef) -> EntityKind;
    /// Current health over maximum, in [0, 1].
    fn health_fraction(&self, entity: EntityRef) -> f32;

    fn spawn_point_count(&self, faction: Faction) -> usize;
    fn primary_structure(&self, faction: Faction) -> Option<EntityRef>;
}

/// Host-side entity creation for population management. The host may
/// refuse (roster full, no spawn available); the director just tries again
/// next tick.
pub trait AgentSpawner {
    fn spawn_agent(&mut self, faction: Faction) -> Option<EntityRef>;
}

/// Per-tick snapshot of each faction's standing structures.
///
/// Captured once at the top of the tick so every think that tick sees the
/// same primary structure and spawn-point count; dead primaries read as
/// absent.
#[derive(Clone, Copy, Debug, Default)]
pub struct StructureCache {
    primary: [Option<EntityRef>; 2],
    spawn_points: [usize; 2],
}

impl StructureCache {
    pub fn capture(directory: &dyn EntityDirectory) -> Self {
        let mut cache = Self::default();
        for faction in [Faction::Human, Faction::Alien] {
            cache.primary[faction.index()] = directory
                .primary_structure(faction)
                .filter(|&e| directory.is_alive(e));
            cache.spawn_points[faction.index()] = directory.spawn_point_count(faction);
        }
        cache
    }

    pub fn primary(&self, faction: Faction) -> Option<EntityRef> {
        self.primary[faction.index()]
    }

    pub fn spawn_points(&self, faction: Faction) -> usize {
        self.spawn_points[faction.index()]
    }
}
