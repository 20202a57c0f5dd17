//! Fixed-capacity agent storage with generational slot reuse.
//!
//! Slots are reused after disconnect; the generation counter on each slot
//! invalidates stale [`AgentId`]s so a handle to a departed agent can never
//! reach its successor.

use tracing::{debug, warn};

use super::agent::{AgentState, AiState, CombatState, NavState};
use super::memory::SightingLog;
use super::personality::Personality;
use super::types::{AgentId, EntityRef, Faction, GameTime};
use crate::classes::ClassId;
use crate::config::BotConfig;
use crate::rng::{AgentRng, ident_hash};
use crate::team::strategy::Role;

#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error("agent roster full ({max} slots)")]
    Full { max: usize },
}

struct Slot {
    generation: u32,
    agent: Option<AgentState>,
}

/// Owner of every agent in the match.
pub struct AgentArena {
    slots: Vec<Slot>,
    /// Seed shared by the whole match; combined with each agent's name hash.
    match_seed: u64,
}

impl Default for AgentArena {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentArena {
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    pub fn with_seed(match_seed: u64) -> Self {
        let mut slots = Vec::with_capacity(BotConfig::MAX_AGENTS);
        slots.resize_with(BotConfig::MAX_AGENTS, || Slot {
            generation: 0,
            agent: None,
        });
        Self { slots, match_seed }
    }

    /// Spawns a fresh agent in the first free slot.
    ///
    /// The agent starts in its faction's free class, in [`AiState::Idle`],
    /// with personality traits drawn from its own deterministic stream. The
    /// `skill_salt` perturbs the name so repeated connects in one slot do
    /// not replay the same stream. `think_interval` comes from the
    /// scheduler's config; the agent rethinks at that cadence.
    pub fn connect(
        &mut self,
        entity: EntityRef,
        faction: Faction,
        skill: f32,
        skill_salt: u32,
        think_interval: f32,
        now: GameTime,
    ) -> Result<AgentId, ArenaError> {
        let index = self
            .slots
            .iter()
            .position(|s| s.agent.is_none())
            .ok_or(ArenaError::Full {
                max: BotConfig::MAX_AGENTS,
            })?;

        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        let id = AgentId {
            index: index as u16,
            generation: slot.generation,
        };

        let class = ClassId::starter(faction);
        let name = format!("Bot_{}_{:02}", class.as_ref(), index);
        let mut rng = AgentRng::seeded(
            self.match_seed ^ u64::from(skill_salt),
            ident_hash(&name),
        );
        let personality = Personality::generate(&mut rng);
        let skill = skill.clamp(0.0, 1.0);

        let agent = AgentState {
            id,
            name,
            entity,
            faction,
            class,
            skill,
            personality,
            rng,
            state: AiState::Idle,
            prev_state: AiState::Idle,
            state_entered: now,
            critical_action: false,
            nav: NavState::default(),
            combat: CombatState::default(),
            credits: 0,
            evos: 0,
            enemy_memory: SightingLog::new(),
            team_memory: SightingLog::new(),
            next_think: now,
            think_interval,
            reaction_time: 0.5 - skill * 0.4,
            role: Role::Free,
            escort_target: None,
            frags: 0,
            upgrades: 0,
        };

        debug!(agent = %id, faction = %faction, skill, "agent connected");
        slot.agent = Some(agent);
        Ok(id)
    }

    /// Removes the agent and frees its slot. Idempotent: a stale or repeated
    /// id is ignored.
    pub fn disconnect(&mut self, id: AgentId) {
        let Some(slot) = self.slots.get_mut(usize::from(id.index)) else {
            warn!(agent = %id, "disconnect with out-of-range slot index");
            return;
        };
        if slot.generation != id.generation || slot.agent.is_none() {
            return;
        }
        slot.agent = None;
        debug!(agent = %id, "agent disconnected");
    }

    /// Resolves an id, rejecting stale generations.
    pub fn get(&self, id: AgentId) -> Option<&AgentState> {
        self.slots
            .get(usize::from(id.index))
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.agent.as_ref())
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut AgentState> {
        self.slots
            .get_mut(usize::from(id.index))
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.agent.as_mut())
    }

    /// Temporarily removes an agent so it can be mutated alongside `&self`
    /// reads of the rest of the arena. Pair with [`AgentArena::restore`].
    pub(crate) fn take(&mut self, id: AgentId) -> Option<AgentState> {
        self.slots
            .get_mut(usize::from(id.index))
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.agent.take())
    }

    pub(crate) fn restore(&mut self, agent: AgentState) {
        let index = usize::from(agent.id.index);
        debug_assert!(self.slots[index].agent.is_none());
        self.slots[index].agent = Some(agent);
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentState> {
        self.slots.iter().filter_map(|s| s.agent.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AgentState> {
        self.slots.iter_mut().filter_map(|s| s.agent.as_mut())
    }

    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.iter().map(|a| a.id)
    }

    pub fn faction_members(&self, faction: Faction) -> impl Iterator<Item = &AgentState> {
        self.iter().filter(move |a| a.faction == faction)
    }

    pub fn faction_count(&self, faction: Faction) -> usize {
        self.faction_members(faction).count()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(index: u32) -> EntityRef {
        EntityRef { index, serial: 1 }
    }

    fn connect(arena: &mut AgentArena, faction: Faction) -> AgentId {
        arena
            .connect(entity(1), faction, 0.5, 0, 0.1, GameTime::ZERO)
            .unwrap()
    }

    #[test]
    fn stale_id_cannot_reach_slot_successor() {
        let mut arena = AgentArena::new();
        let old = connect(&mut arena, Faction::Human);
        arena.disconnect(old);

        let new = connect(&mut arena, Faction::Alien);
        assert_eq!(old.index, new.index, "slot reused");
        assert!(arena.get(old).is_none(), "stale generation rejected");
        assert!(arena.get(new).is_some());
    }

    #[test]
    fn connect_fails_when_roster_full() {
        let mut arena = AgentArena::new();
        for _ in 0..BotConfig::MAX_AGENTS {
            connect(&mut arena, Faction::Human);
        }
        let err = arena
            .connect(entity(99), Faction::Human, 0.5, 0, 0.1, GameTime::ZERO)
            .unwrap_err();
        assert!(matches!(err, ArenaError::Full { .. }));
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut arena = AgentArena::new();
        let id = connect(&mut arena, Faction::Human);
        arena.disconnect(id);
        arena.disconnect(id);
        assert!(arena.is_empty());
    }

    #[test]
    fn new_agent_starts_idle_in_the_free_class() {
        let mut arena = AgentArena::new();
        let id = connect(&mut arena, Faction::Alien);
        let a = arena.get(id).unwrap();
        assert_eq!(a.state, AiState::Idle);
        assert_eq!(a.class, ClassId::Hatchling);
        assert_eq!(a.resource(), 0);
    }

    #[test]
    fn reaction_time_scales_down_with_skill() {
        let mut arena = AgentArena::new();
        let novice = arena
            .connect(entity(1), Faction::Human, 0.0, 0, 0.1, GameTime::ZERO)
            .unwrap();
        let expert = arena
            .connect(entity(2), Faction::Human, 1.0, 0, 0.1, GameTime::ZERO)
            .unwrap();
        let novice_rt = arena.get(novice).unwrap().reaction_time;
        let expert_rt = arena.get(expert).unwrap().reaction_time;
        assert!(novice_rt > expert_rt);
        assert!((expert_rt - 0.1).abs() < 1e-6);
    }

    #[test]
    fn same_seed_same_slot_same_personality() {
        let mut a = AgentArena::with_seed(42);
        let mut b = AgentArena::with_seed(42);
        let ia = connect(&mut a, Faction::Human);
        let ib = connect(&mut b, Faction::Human);
        assert_eq!(
            a.get(ia).unwrap().personality,
            b.get(ib).unwrap().personality
        );
    }
}
