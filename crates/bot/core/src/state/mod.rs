//! Agent state: core value types, personality, memories, per-agent state,
//! and the arena that owns them.

pub mod agent;
pub mod arena;
pub mod memory;
pub mod personality;
pub mod types;

pub use agent::{AgentState, AiState, CombatState, NavState, WeaponState};
pub use arena::{AgentArena, ArenaError};
pub use memory::{Sighting, SightingLog};
pub use personality::Personality;
pub use types::{AgentId, Capabilities, EntityRef, Faction, FactionMask, GameTime, Vec3};
