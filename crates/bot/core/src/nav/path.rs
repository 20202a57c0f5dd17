//! Capability-aware A* over the waypoint graph.
//!
//! The searcher runs on flat arrays indexed by slot: no per-query
//! allocation beyond the scratch buffers, no priority queue. Node count is
//! small and bounded, so a linear scan for the cheapest open node beats
//! heap bookkeeping. Edges gated on climb or fly movement are invisible to
//! agents without the matching capability, and nodes outside the agent's
//! faction access mask are never expanded, so a returned route is always
//! traversable by the requesting agent.

use arrayvec::ArrayVec;
use tracing::trace;

use super::graph::{MoveKind, NavGraph, NodeId};
use crate::config::BotConfig;
use crate::state::types::{Capabilities, FactionMask};

pub type Path = ArrayVec<NodeId, { BotConfig::MAX_PATH_NODES }>;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("endpoint {0} is not a live node")]
    InvalidEndpoint(NodeId),

    #[error("no traversable route from {from} to {to}")]
    NoPath { from: NodeId, to: NodeId },

    #[error("route from {from} to {to} exceeds {max} nodes")]
    TooLong {
        from: NodeId,
        to: NodeId,
        max: usize,
    },
}

/// Who is asking for the route.
#[derive(Clone, Copy, Debug)]
pub struct PathQuery {
    pub start: NodeId,
    pub goal: NodeId,
    pub capabilities: Capabilities,
    pub faction: FactionMask,
}

/// Finds the cheapest traversable route, start and goal inclusive.
///
/// The heuristic is straight-line distance. Edge costs are caller-priced
/// and may undercut geometric length; the search still terminates and
/// returns a route, it just may expand more nodes. A start equal to the
/// goal yields the single-node path.
pub fn find_path(graph: &NavGraph, query: &PathQuery) -> Result<Path, PathError> {
    graph
        .node(query.start)
        .ok_or(PathError::InvalidEndpoint(query.start))?;
    let goal_node = graph
        .node(query.goal)
        .ok_or(PathError::InvalidEndpoint(query.goal))?;

    if query.start == query.goal {
        let mut path = Path::new();
        path.push(query.start);
        return Ok(path);
    }

    let slots = graph.high_water();
    let goal_pos = goal_node.position;
    let mut g_score = vec![f32::INFINITY; slots];
    let mut parent = vec![NodeId::INVALID; slots];
    let mut open = vec![false; slots];
    let mut closed = vec![false; slots];

    g_score[query.start.index()] = 0.0;
    open[query.start.index()] = true;

    loop {
        // Cheapest open node by f = g + h; linear scan over bounded slots.
        let mut current = NodeId::INVALID;
        let mut best_f = f32::INFINITY;
        for i in 0..slots {
            if !open[i] {
                continue;
            }
            let node = match graph.node(NodeId(i as u16)) {
                Some(n) => n,
                None => continue,
            };
            let f = g_score[i] + node.position.distance(goal_pos);
            if f < best_f {
                best_f = f;
                current = NodeId(i as u16);
            }
        }

        if !current.is_valid() {
            trace!(from = %query.start, to = %query.goal, "search exhausted");
            return Err(PathError::NoPath {
                from: query.start,
                to: query.goal,
            });
        }
        if current == query.goal {
            return reconstruct(&parent, query);
        }

        open[current.index()] = false;
        closed[current.index()] = true;

        let node = graph
            .node(current)
            .expect("open set only holds live nodes");
        for edge in &node.edges {
            if !traversable(edge.movement, query.capabilities) {
                continue;
            }
            let Some(neighbor) = graph.node(edge.to) else {
                continue;
            };
            if closed[edge.to.index()] || !neighbor.access.intersects(query.faction) {
                continue;
            }

            let tentative = g_score[current.index()] + edge.cost.max(0.0);
            if tentative < g_score[edge.to.index()] {
                g_score[edge.to.index()] = tentative;
                parent[edge.to.index()] = current;
                open[edge.to.index()] = true;
            }
        }
    }
}

fn traversable(movement: MoveKind, capabilities: Capabilities) -> bool {
    match movement {
        MoveKind::Climb => capabilities.contains(Capabilities::WALL_CLIMB),
        MoveKind::Fly => capabilities.contains(Capabilities::FLY),
        MoveKind::Walk | MoveKind::Jump | MoveKind::Swim | MoveKind::Ladder => true,
    }
}

fn reconstruct(parent: &[NodeId], query: &PathQuery) -> Result<Path, PathError> {
    let mut reversed = Path::new();
    let mut cursor = query.goal;
    loop {
        if reversed.try_push(cursor).is_err() {
            return Err(PathError::TooLong {
                from: query.start,
                to: query.goal,
                max: BotConfig::MAX_PATH_NODES,
            });
        }
        if cursor == query.start {
            break;
        }
        cursor = parent[cursor.index()];
        debug_assert!(cursor.is_valid(), "goal reached without a parent chain");
    }

    let mut path = Path::new();
    for &id in reversed.iter().rev() {
        path.push(id);
    }
    Ok(path)
}
