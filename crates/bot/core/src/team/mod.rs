//! Team strategy layer and cross-agent operation queue.

pub mod ops;
pub mod strategy;

pub use ops::{CrossOp, OpQueue, SHARE_RANGE};
pub use strategy::{
    Phase, Role, Strategy, TeamSnapshot, TeamState, WinState, assign_roles, classify_phase,
    select_strategy,
};
