//! The tick scheduler.
//!
//! One tick runs, in fixed order: population management, per-faction state
//! refresh, strategy recomputation (rate-limited to its own interval),
//! structure tracking, the thinks of every due agent, and a diagnostics
//! flush. Agents think at their own interval, decoupled from the outer
//! tick rate, so not every agent thinks every tick. Cross-agent writes
//! queued during thinks are applied after the last think of the tick.

use std::io::{Read, Write};

use tracing::{debug, info, warn};

use crate::config::BotConfig;
use crate::env::{AgentSpawner, EntityDirectory, StructureCache, WorldOracle};
use crate::fsm::{self, ThinkCtx, ThinkOutput};
use crate::nav::file::{self, NavFileError};
use crate::nav::graph::NavGraph;
use crate::rng::AgentRng;
use crate::state::arena::AgentArena;
use crate::state::types::{AgentId, Faction, GameTime};
use crate::team::ops::OpQueue;
use crate::team::strategy::TeamState;

/// Owns the whole decision engine and drives it tick by tick.
pub struct Director {
    pub config: BotConfig,
    pub arena: AgentArena,
    pub graph: NavGraph,
    pub team: TeamState,
    ops: OpQueue,
    /// Structure snapshot shared by every think of the current tick.
    structures: StructureCache,
    /// Stream for director-level draws (skill bands, spawn salts).
    rng: AgentRng,
    spawn_salt: u32,
}

impl Director {
    pub fn new(config: BotConfig, match_seed: u64) -> Self {
        Self {
            config: config.sanitized(),
            arena: AgentArena::with_seed(match_seed),
            graph: NavGraph::new(),
            team: TeamState::new(),
            ops: OpQueue::new(),
            structures: StructureCache::default(),
            rng: AgentRng::seeded(match_seed, 0x6469_7265_6374_6f72),
            spawn_salt: 0,
        }
    }

    /// Runs one simulation tick against the host. Returns the intents
    /// produced by every agent that thought this tick, in slot order, for
    /// the host to apply.
    pub fn tick<H>(&mut self, host: &mut H, now: GameTime) -> Vec<(AgentId, ThinkOutput)>
    where
        H: WorldOracle + EntityDirectory + AgentSpawner,
    {
        self.manage_population(&mut *host, now);
        self.reap_stale(&*host);

        if self.team.due(now, self.config.strategy_interval) {
            self.team.refresh(&mut self.arena, &*host, now);
        }

        self.structures = StructureCache::capture(&*host);

        // Pausing stops thinking only; population, reaping, strategy, and
        // queued ops still run.
        let due: Vec<AgentId> = if self.config.paused {
            Vec::new()
        } else {
            self.arena
                .iter()
                .filter(|a| a.next_think <= now)
                .map(|a| a.id)
                .collect()
        };

        let mut outputs = Vec::with_capacity(due.len());
        for id in due {
            // Lift the agent out so its think can read the rest of the
            // arena without aliasing its own slot.
            let Some(mut agent) = self.arena.take(id) else {
                continue;
            };
            let mut ctx = ThinkCtx {
                world: &*host,
                directory: &*host,
                graph: &self.graph,
                arena: &self.arena,
                team: &self.team,
                structures: &self.structures,
                config: &self.config,
                ops: &mut self.ops,
                now,
            };
            let output = fsm::think(&mut agent, &mut ctx);
            self.arena.restore(agent);
            outputs.push((id, output));
        }

        self.ops.drain(&mut self.arena, &*host, now);

        debug!(
            agents = self.arena.len(),
            thought = outputs.len(),
            pending_ops = self.ops.len(),
            "tick complete"
        );
        outputs
    }

    /// Tops each faction up to half the population target. The host may
    /// refuse a spawn; the director retries on a later tick.
    fn manage_population<H>(&mut self, spawner: &mut H, now: GameTime)
    where
        H: AgentSpawner,
    {
        let per_faction = self.config.population_target / 2;
        for faction in [Faction::Human, Faction::Alien] {
            while self.arena.faction_count(faction) < per_faction {
                let Some(entity) = spawner.spawn_agent(faction) else {
                    break;
                };
                let skill = self
                    .rng
                    .range_f32(self.config.skill_min, self.config.skill_max);
                self.spawn_salt = self.spawn_salt.wrapping_add(1);
                let interval = self.config.think_interval;
                match self
                    .arena
                    .connect(entity, faction, skill, self.spawn_salt, interval, now)
                {
                    Ok(id) => info!(agent = %id, %faction, skill, "agent added by autofill"),
                    Err(err) => {
                        warn!(%err, "autofill connect failed");
                        return;
                    }
                }
            }
        }
    }

    /// Disconnects agents whose host entity has gone away entirely. Death
    /// with a pending respawn keeps the slot; only a recycled or removed
    /// entity (faction no longer resolvable) reaps the agent.
    fn reap_stale(&mut self, directory: &dyn EntityDirectory) {
        let stale: Vec<AgentId> = self
            .arena
            .iter()
            .filter(|a| directory.faction(a.entity).is_none())
            .map(|a| a.id)
            .collect();
        for id in stale {
            debug!(agent = %id, "host entity gone, reaping agent");
            self.arena.disconnect(id);
        }
    }

    /// Credits a kill to an agent: personal frag count, resource income,
    /// and the faction tally the win-state read uses.
    pub fn record_frag(&mut self, killer: AgentId) {
        let Some(agent) = self.arena.get_mut(killer) else {
            return;
        };
        agent.frags += 1;
        agent.earn(1);
        let faction = agent.faction;
        self.team.record_kill(faction);
    }

    /// Replaces the navigation graph from a saved file. On any parse
    /// failure the current graph is kept untouched and the error returned.
    pub fn load_graph(&mut self, r: &mut impl Read) -> Result<(), NavFileError> {
        let fresh = file::load(r)?;
        info!(nodes = fresh.len(), "navigation graph replaced");
        self.graph = fresh;
        Ok(())
    }

    pub fn save_graph(&self, w: &mut impl Write) -> std::io::Result<()> {
        file::save(&self.graph, w)
    }
}
