//! Navigation: waypoint graph, binary persistence, and pathfinding.

pub mod file;
pub mod graph;
pub mod path;

pub use file::{NavFileError, load, save};
pub use graph::{MapProfile, MoveKind, NavEdge, NavFlags, NavGraph, NavNode, NodeId};
pub use path::{Path, PathError, PathQuery, find_path};
