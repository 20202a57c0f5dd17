//! Queued cross-agent operations.
//!
//! An agent's think mutates only its own slot. Anything that touches a
//! teammate — broadcasting a spotted enemy, drafting an escort, tearing an
//! agent down — is enqueued here during the think and applied by the
//! scheduler after every due agent has run, so think order never changes
//! the outcome.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::env::EntityDirectory;
use crate::state::arena::AgentArena;
use crate::state::types::{AgentId, EntityRef, Faction, GameTime, Vec3};

/// Teammates within this range of the spotter receive a shared sighting.
pub const SHARE_RANGE: f32 = 800.0;

/// A deferred mutation of some other agent's slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CrossOp {
    /// Spread a spotted enemy to nearby teammates' memories.
    ShareSighting {
        spotter: AgentId,
        faction: Faction,
        origin: Vec3,
        enemy: EntityRef,
        position: Vec3,
    },
    /// Ask an idle teammate to escort the requester.
    DraftEscort { escortee: AgentId, escort: AgentId },
    /// Tear an agent down. Safe to enqueue from that agent's own think.
    Disconnect(AgentId),
}

/// FIFO of deferred operations, drained once per tick.
#[derive(Debug, Default)]
pub struct OpQueue {
    pending: VecDeque<CrossOp>,
}

impl OpQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: CrossOp) {
        trace!(?op, "cross-agent op queued");
        self.pending.push_back(op);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Applies every queued op in arrival order. Stale agent ids are
    /// skipped silently; the op's moment has simply passed.
    pub fn drain(
        &mut self,
        arena: &mut AgentArena,
        directory: &dyn EntityDirectory,
        now: GameTime,
    ) {
        while let Some(op) = self.pending.pop_front() {
            match op {
                CrossOp::ShareSighting {
                    spotter,
                    faction,
                    origin,
                    enemy,
                    position,
                } => {
                    for agent in arena.iter_mut().filter(|a| a.faction == faction) {
                        if agent.id == spotter {
                            continue;
                        }
                        let agent_pos = directory.position(agent.entity);
                        if agent_pos.distance(origin) > SHARE_RANGE {
                            continue;
                        }
                        agent.enemy_memory.note(enemy, position, now);
                    }
                }
                CrossOp::DraftEscort { escortee, escort } => {
                    if arena.get(escortee).is_none() {
                        continue;
                    }
                    if let Some(agent) = arena.get_mut(escort) {
                        agent.escort_target = Some(escortee);
                        debug!(escort = %escort, escortee = %escortee, "escort drafted");
                    }
                }
                CrossOp::Disconnect(id) => {
                    arena.disconnect(id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EntityKind;
    use crate::env::testing::FakeWorld;

    fn connect_at(
        arena: &mut AgentArena,
        world: &mut FakeWorld,
        index: u32,
        faction: Faction,
        position: Vec3,
    ) -> AgentId {
        let entity = world.add(index, faction, EntityKind::Soldier, position);
        arena
            .connect(entity, faction, 0.5, 0, 0.1, GameTime::ZERO)
            .unwrap()
    }

    #[test]
    fn shared_sighting_reaches_only_nearby_teammates() {
        let mut arena = AgentArena::new();
        let mut world = FakeWorld::new();
        let spotter = connect_at(&mut arena, &mut world, 1, Faction::Human, Vec3::ZERO);
        let near = connect_at(
            &mut arena,
            &mut world,
            2,
            Faction::Human,
            Vec3::new(300.0, 0.0, 0.0),
        );
        let far = connect_at(
            &mut arena,
            &mut world,
            3,
            Faction::Human,
            Vec3::new(2000.0, 0.0, 0.0),
        );
        let rival = connect_at(
            &mut arena,
            &mut world,
            4,
            Faction::Alien,
            Vec3::new(100.0, 0.0, 0.0),
        );

        let enemy = EntityRef { index: 9, serial: 1 };
        let mut queue = OpQueue::new();
        queue.push(CrossOp::ShareSighting {
            spotter,
            faction: Faction::Human,
            origin: Vec3::ZERO,
            enemy,
            position: Vec3::new(50.0, 0.0, 0.0),
        });
        queue.drain(&mut arena, &world, GameTime::new(5.0));

        assert!(arena.get(near).unwrap().enemy_memory.recall(enemy).is_some());
        assert!(arena.get(far).unwrap().enemy_memory.recall(enemy).is_none());
        assert!(arena.get(rival).unwrap().enemy_memory.recall(enemy).is_none());
        assert!(
            arena.get(spotter).unwrap().enemy_memory.recall(enemy).is_none(),
            "spotter already noted it during its own think"
        );
    }

    #[test]
    fn escort_draft_skips_stale_escortee() {
        let mut arena = AgentArena::new();
        let mut world = FakeWorld::new();
        let escortee = connect_at(&mut arena, &mut world, 1, Faction::Alien, Vec3::ZERO);
        let escort = connect_at(&mut arena, &mut world, 2, Faction::Alien, Vec3::ZERO);

        arena.disconnect(escortee);
        let mut queue = OpQueue::new();
        queue.push(CrossOp::DraftEscort { escortee, escort });
        queue.drain(&mut arena, &world, GameTime::ZERO);

        assert_eq!(arena.get(escort).unwrap().escort_target, None);
    }

    #[test]
    fn queued_disconnect_applies_after_thinks() {
        let mut arena = AgentArena::new();
        let mut world = FakeWorld::new();
        let id = connect_at(&mut arena, &mut world, 1, Faction::Human, Vec3::ZERO);

        let mut queue = OpQueue::new();
        queue.push(CrossOp::Disconnect(id));
        assert!(arena.get(id).is_some(), "still alive until the drain");

        queue.drain(&mut arena, &world, GameTime::ZERO);
        assert!(arena.get(id).is_none());
        assert!(queue.is_empty());
    }
}
