pub mod classes;
pub mod combat;
pub mod config;
pub mod director;
pub mod env;
pub mod fsm;
pub mod nav;
pub mod rng;
pub mod state;
pub mod team;
pub mod upgrade;

pub use classes::{ClassId, ClassInfo};
pub use combat::TargetPriority;
pub use config::BotConfig;
pub use director::Director;
pub use env::{
    AgentSpawner, EntityDirectory, EntityKind, PointContents, StructureCache, TraceResult,
    WorldOracle,
};
pub use fsm::{ThinkCtx, ThinkOutput, think};
pub use nav::{
    MapProfile, MoveKind, NavEdge, NavFileError, NavFlags, NavGraph, NavNode, NodeId, Path,
    PathError, PathQuery, find_path,
};
pub use rng::{AgentRng, ident_hash};
pub use state::{
    AgentArena, AgentId, AgentState, AiState, ArenaError, Capabilities, CombatState, EntityRef,
    Faction, FactionMask, GameTime, NavState, Personality, Sighting, SightingLog, Vec3,
    WeaponState,
};
pub use team::{
    CrossOp, OpQueue, Phase, Role, Strategy, TeamSnapshot, TeamState, WinState,
};
pub use upgrade::{Composition, UpgradeContext, choose_class};
