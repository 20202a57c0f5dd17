//! Navigation graph persistence.
//!
//! Binary, little-endian. Header `{magic, version, node_count}`, then one
//! record per live node:
//!
//! ```text
//! id:4  position:12 (3 × f32)  flags:4  faction_access:4  neighbor_count:4
//! neighbor_count × { neighbor_id:4  cost:4 (f32)  movement_type:4 }
//! ```
//!
//! Loading parses the entire stream into a fresh graph and hands it back
//! only on success. Any malformed input — bad magic, unsupported version,
//! truncation, out-of-range counts — rejects the whole file; the caller's
//! in-memory graph is never partially overwritten.

use std::io::{self, Read, Write};

use tracing::{debug, warn};

use super::graph::{MoveKind, NavEdge, NavGraph, NavNode, NodeId};
use crate::config::BotConfig;
use crate::state::types::{FactionMask, Vec3};

/// "NAV1" interpreted as a little-endian u32.
pub const NAV_MAGIC: u32 = 0x3156_414E;
pub const NAV_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum NavFileError {
    #[error("bad magic 0x{found:08x} (expected 0x{NAV_MAGIC:08x})")]
    BadMagic { found: u32 },

    #[error("unsupported version {found} (expected {NAV_VERSION})")]
    UnsupportedVersion { found: u32 },

    #[error("node count {count} out of range (max {max})")]
    CountOutOfRange { count: u32, max: usize },

    #[error("node id {id} out of range (max {max})")]
    NodeIdOutOfRange { id: u32, max: usize },

    #[error("node {id}: neighbor count {count} out of range (max {max})")]
    NeighborCountOutOfRange { id: u32, count: u32, max: usize },

    #[error("node {id}: unknown movement type {raw}")]
    UnknownMovementType { id: u32, raw: u32 },

    #[error("file truncated")]
    Truncated,

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn read_u32(r: &mut impl Read) -> Result<u32, NavFileError> {
    let mut buf = [0u8; 4];
    match r.read_exact(&mut buf) {
        Ok(()) => Ok(u32::from_le_bytes(buf)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(NavFileError::Truncated),
        Err(e) => Err(e.into()),
    }
}

fn read_f32(r: &mut impl Read) -> Result<f32, NavFileError> {
    Ok(f32::from_bits(read_u32(r)?))
}

fn write_u32(w: &mut impl Write, value: u32) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

fn write_f32(w: &mut impl Write, value: f32) -> io::Result<()> {
    write_u32(w, value.to_bits())
}

/// Serializes every live node of the graph.
pub fn save(graph: &NavGraph, w: &mut impl Write) -> io::Result<()> {
    write_u32(w, NAV_MAGIC)?;
    write_u32(w, NAV_VERSION)?;
    write_u32(w, graph.len() as u32)?;

    for node in graph.iter() {
        write_u32(w, u32::from(node.id.0))?;
        write_f32(w, node.position.x)?;
        write_f32(w, node.position.y)?;
        write_f32(w, node.position.z)?;
        write_u32(w, node.flags.bits())?;
        write_u32(w, node.access.bits())?;
        write_u32(w, node.edges.len() as u32)?;
        for edge in &node.edges {
            write_u32(w, u32::from(edge.to.0))?;
            write_f32(w, edge.cost)?;
            write_u32(w, edge.movement as u32)?;
        }
    }

    debug!(nodes = graph.len(), "nav graph saved");
    Ok(())
}

/// Parses a complete graph from the reader.
///
/// Succeeds with a fully populated graph or fails without side effects;
/// callers replace their graph only on `Ok`.
pub fn load(r: &mut impl Read) -> Result<NavGraph, NavFileError> {
    let magic = read_u32(r)?;
    if magic != NAV_MAGIC {
        warn!(found = format_args!("0x{magic:08x}"), "nav file rejected: bad magic");
        return Err(NavFileError::BadMagic { found: magic });
    }

    let version = read_u32(r)?;
    if version != NAV_VERSION {
        warn!(version, "nav file rejected: unsupported version");
        return Err(NavFileError::UnsupportedVersion { found: version });
    }

    let count = read_u32(r)?;
    if count as usize > BotConfig::MAX_NAV_NODES {
        return Err(NavFileError::CountOutOfRange {
            count,
            max: BotConfig::MAX_NAV_NODES,
        });
    }

    let mut graph = NavGraph::new();
    for _ in 0..count {
        let id = read_u32(r)?;
        if id as usize >= BotConfig::MAX_NAV_NODES {
            return Err(NavFileError::NodeIdOutOfRange {
                id,
                max: BotConfig::MAX_NAV_NODES,
            });
        }

        let position = Vec3::new(read_f32(r)?, read_f32(r)?, read_f32(r)?);
        let flags = super::graph::NavFlags::from_bits_truncate(read_u32(r)?);
        let access = FactionMask::from_bits_truncate(read_u32(r)?);

        let neighbor_count = read_u32(r)?;
        if neighbor_count as usize > BotConfig::MAX_NODE_NEIGHBORS {
            return Err(NavFileError::NeighborCountOutOfRange {
                id,
                count: neighbor_count,
                max: BotConfig::MAX_NODE_NEIGHBORS,
            });
        }

        let mut node = NavNode {
            id: NodeId(id as u16),
            position,
            flags,
            access,
            edges: arrayvec::ArrayVec::new(),
        };
        for _ in 0..neighbor_count {
            let to = read_u32(r)?;
            if to as usize >= BotConfig::MAX_NAV_NODES {
                return Err(NavFileError::NodeIdOutOfRange {
                    id: to,
                    max: BotConfig::MAX_NAV_NODES,
                });
            }
            let cost = read_f32(r)?;
            let raw_movement = read_u32(r)?;
            let movement = MoveKind::from_u32(raw_movement)
                .ok_or(NavFileError::UnknownMovementType { id, raw: raw_movement })?;
            node.edges.push(NavEdge {
                to: NodeId(to as u16),
                cost,
                movement,
            });
        }

        graph.insert_at(NodeId(id as u16), node);
    }

    debug!(nodes = graph.len(), "nav graph loaded");
    Ok(graph)
}
