//! Navigation graph store.
//!
//! Waypoints form a weighted graph over the map; edges carry the movement
//! capability required to traverse them, so climbing and flying routes exist
//! in the same graph as ground routes and are filtered per agent at search
//! time. Nodes live in a flat slot array: a node's id is its slot index,
//! removal tombstones the slot for reuse, and removal scrubs every inbound
//! edge so no dangling references survive.

use std::fmt;

use arrayvec::ArrayVec;
use bitflags::bitflags;
use tracing::warn;

use crate::config::BotConfig;
use crate::state::types::{FactionMask, Vec3};

/// Index of a node in the graph's slot array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u16);

impl NodeId {
    /// Sentinel for "no node" / tombstoned slot.
    pub const INVALID: Self = Self(u16::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "n{}", self.0)
        } else {
            write!(f, "n-invalid")
        }
    }
}

bitflags! {
    /// Surface and tactical tags on a navigation node.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct NavFlags: u32 {
        /// Standard walkable floor position.
        const GROUND     = 0x0001;
        /// Reached by jumping.
        const JUMP       = 0x0002;
        /// Wall or ceiling surface; only climbers can stand here.
        const CLIMB      = 0x0004;
        /// Aerial node; only fliers can occupy it.
        const FLY        = 0x0008;
        /// Underwater node.
        const WATER      = 0x0010;
        /// On a ladder.
        const LADDER     = 0x0020;
        /// Human spawn point location.
        const TELEPORTER = 0x0040;
        /// Alien spawn point location.
        const EGG        = 0x0080;
        /// Good defensive/camping position.
        const CAMP       = 0x0100;
        /// Good long-range attack position.
        const SNIPE      = 0x0200;
        /// Good ambush position.
        const AMBUSH     = 0x0400;
        /// Item/health/ammo pickup location.
        const ITEM       = 0x0800;
    }
}

/// Movement capability required to traverse an edge.
///
/// Walk/jump/swim/ladder are universal; climb and fly are gated by the
/// agent's specialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum MoveKind {
    Walk = 0,
    Jump = 1,
    Climb = 2,
    Fly = 3,
    Swim = 4,
    Ladder = 5,
}

impl MoveKind {
    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Walk),
            1 => Some(Self::Jump),
            2 => Some(Self::Climb),
            3 => Some(Self::Fly),
            4 => Some(Self::Swim),
            5 => Some(Self::Ladder),
            _ => None,
        }
    }
}

/// Outgoing link to a neighboring node.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavEdge {
    pub to: NodeId,
    pub cost: f32,
    pub movement: MoveKind,
}

/// A single waypoint.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavNode {
    pub id: NodeId,
    pub position: Vec3,
    pub flags: NavFlags,
    pub access: FactionMask,
    pub edges: ArrayVec<NavEdge, { BotConfig::MAX_NODE_NEIGHBORS }>,
}

impl NavNode {
    fn tombstone() -> Self {
        Self {
            id: NodeId::INVALID,
            position: Vec3::ZERO,
            flags: NavFlags::empty(),
            access: FactionMask::ALL,
            edges: ArrayVec::new(),
        }
    }

    fn is_live(&self) -> bool {
        self.id.is_valid()
    }
}

/// Rough map character derived from node tag distribution, consumed by the
/// upgrade engine's map-dependent picks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum MapProfile {
    /// Long sightlines; favors ranged classes.
    Open,
    /// Corridor-heavy; favors close-quarters classes.
    Tight,
    Mixed,
}

/// The waypoint graph: flat slot array plus a high-water mark.
///
/// Cleared on session change, populated once, queried every tick, mutated
/// rarely.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavGraph {
    /// Slots up to the high-water mark; tombstones stay in place so live
    /// node ids remain stable.
    slots: Vec<NavNode>,
}

impl NavGraph {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Drops every node. Used on session/level change.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|n| n.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest used slot + 1.
    pub fn high_water(&self) -> usize {
        self.slots.len()
    }

    /// Inserts a node into the first free slot.
    ///
    /// Returns `None` when the graph is full; the failure is logged and the
    /// graph is unchanged.
    pub fn add(&mut self, position: Vec3, flags: NavFlags) -> Option<NodeId> {
        let slot = match self.slots.iter().position(|n| !n.is_live()) {
            Some(i) => i,
            None if self.slots.len() < BotConfig::MAX_NAV_NODES => {
                self.slots.push(NavNode::tombstone());
                self.slots.len() - 1
            }
            None => {
                warn!(
                    capacity = BotConfig::MAX_NAV_NODES,
                    "nav graph full; node not added"
                );
                return None;
            }
        };

        let id = NodeId(slot as u16);
        self.slots[slot] = NavNode {
            id,
            position,
            flags,
            access: FactionMask::ALL,
            edges: ArrayVec::new(),
        };
        Some(id)
    }

    /// Restricts which factions may route through a node.
    pub fn set_access(&mut self, id: NodeId, access: FactionMask) {
        if let Some(node) = self.node_mut(id) {
            node.access = access;
        }
    }

    /// Tombstones a node and scrubs every inbound edge referencing it.
    pub fn remove(&mut self, id: NodeId) {
        if self.node(id).is_none() {
            return;
        }
        for node in self.slots.iter_mut().filter(|n| n.is_live()) {
            node.edges.retain(|e| e.to != id);
        }
        self.slots[id.index()] = NavNode::tombstone();
    }

    /// Creates a bidirectional edge between two live nodes.
    ///
    /// Rejects self-loops and invalid endpoints; duplicate links are kept
    /// as-is. Capacity is checked for both directions before either is
    /// recorded, so a full neighbor list on one endpoint never leaves a
    /// one-way edge behind.
    pub fn connect(&mut self, a: NodeId, b: NodeId, cost: f32, movement: MoveKind) -> bool {
        if a == b {
            return false;
        }
        if self.node(a).is_none() || self.node(b).is_none() {
            warn!(%a, %b, "connect rejected: invalid endpoint");
            return false;
        }
        if !self.can_link(a, b) || !self.can_link(b, a) {
            warn!(%a, %b, "neighbor list full; link not added");
            return false;
        }
        self.add_link(a, b, cost, movement);
        self.add_link(b, a, cost, movement);
        true
    }

    fn can_link(&self, from: NodeId, to: NodeId) -> bool {
        let node = &self.slots[from.index()];
        node.edges.iter().any(|e| e.to == to) || !node.edges.is_full()
    }

    fn add_link(&mut self, from: NodeId, to: NodeId, cost: f32, movement: MoveKind) {
        let node = &mut self.slots[from.index()];
        if node.edges.iter().any(|e| e.to == to) {
            return; // already linked
        }
        node.edges.push(NavEdge { to, cost, movement });
    }

    pub fn node(&self, id: NodeId) -> Option<&NavNode> {
        self.slots
            .get(id.index())
            .filter(|n| n.is_live())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NavNode> {
        self.slots
            .get_mut(id.index())
            .filter(|n| n.is_live())
    }

    /// Iterates live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &NavNode> {
        self.slots.iter().filter(|n| n.is_live())
    }

    /// Nearest live node carrying **all** of `required_flags`, within
    /// `max_range` (pass 0.0 for unlimited). Linear scan; the node count is
    /// bounded.
    pub fn find_nearest(
        &self,
        position: Vec3,
        required_flags: NavFlags,
        max_range: f32,
    ) -> Option<NodeId> {
        let mut best: Option<(NodeId, f32)> = None;
        let limit_sq = if max_range > 0.0 {
            max_range * max_range
        } else {
            f32::INFINITY
        };

        for node in self.iter() {
            if !node.flags.contains(required_flags) {
                continue;
            }
            let dist_sq = position.distance_squared(node.position);
            if dist_sq > limit_sq {
                continue;
            }
            if best.is_none_or(|(_, d)| dist_sq < d) {
                best = Some((node.id, dist_sq));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Like [`find_nearest`](Self::find_nearest), but additionally filtered
    /// by faction access and by whether the agent can actually occupy the
    /// node (climb-only surfaces need climbers, aerial nodes need fliers).
    pub fn find_nearest_reachable(
        &self,
        position: Vec3,
        faction_mask: FactionMask,
        can_climb: bool,
        can_fly: bool,
        max_range: f32,
    ) -> Option<NodeId> {
        let mut best: Option<(NodeId, f32)> = None;
        let limit_sq = if max_range > 0.0 {
            max_range * max_range
        } else {
            f32::INFINITY
        };

        for node in self.iter() {
            if !node.access.intersects(faction_mask) {
                continue;
            }
            let climb_only = node.flags.contains(NavFlags::CLIMB)
                && !node.flags.intersects(NavFlags::GROUND | NavFlags::LADDER);
            if climb_only && !can_climb {
                continue;
            }
            let fly_only = node.flags.contains(NavFlags::FLY)
                && !node.flags.intersects(NavFlags::GROUND | NavFlags::CLIMB);
            if fly_only && !can_fly {
                continue;
            }
            let dist_sq = position.distance_squared(node.position);
            if dist_sq > limit_sq {
                continue;
            }
            if best.is_none_or(|(_, d)| dist_sq < d) {
                best = Some((node.id, dist_sq));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Classifies the map from the node tag distribution: snipe-heavy maps
    /// read as open, climb-dominated maps as tight corridors.
    pub fn map_profile(&self) -> MapProfile {
        let mut total = 0usize;
        let mut snipe = 0usize;
        let mut climb = 0usize;
        let mut ground = 0usize;

        for node in self.iter() {
            total += 1;
            if node.flags.contains(NavFlags::SNIPE) {
                snipe += 1;
            }
            if node.flags.contains(NavFlags::CLIMB) {
                climb += 1;
            }
            if node.flags.contains(NavFlags::GROUND) {
                ground += 1;
            }
        }

        if total == 0 {
            return MapProfile::Mixed;
        }
        if snipe * 5 > total {
            return MapProfile::Open;
        }
        if ground > 0 && climb > ground * 2 {
            return MapProfile::Tight;
        }
        MapProfile::Mixed
    }

    /// Rebuild-from-records constructor used by the nav file loader. The
    /// slot for `id` must be in range; intermediate slots become tombstones.
    pub(crate) fn insert_at(&mut self, id: NodeId, mut node: NavNode) {
        debug_assert!(id.index() < BotConfig::MAX_NAV_NODES);
        if self.slots.len() <= id.index() {
            self.slots.resize(id.index() + 1, NavNode::tombstone());
        }
        node.id = id;
        self.slots[id.index()] = node;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_line(n: usize) -> (NavGraph, Vec<NodeId>) {
        let mut graph = NavGraph::new();
        let ids: Vec<NodeId> = (0..n)
            .map(|i| {
                graph
                    .add(Vec3::new(i as f32 * 100.0, 0.0, 0.0), NavFlags::GROUND)
                    .unwrap()
            })
            .collect();
        for pair in ids.windows(2) {
            assert!(graph.connect(pair[0], pair[1], 100.0, MoveKind::Walk));
        }
        (graph, ids)
    }

    #[test]
    fn add_reuses_tombstoned_slot() {
        let (mut graph, ids) = graph_with_line(3);
        graph.remove(ids[1]);
        let replacement = graph.add(Vec3::ZERO, NavFlags::GROUND).unwrap();
        assert_eq!(replacement, ids[1], "freed slot is reused");
    }

    #[test]
    fn remove_scrubs_all_inbound_edges() {
        let (mut graph, ids) = graph_with_line(4);
        graph.remove(ids[2]);

        for node in graph.iter() {
            assert!(
                node.edges.iter().all(|e| e.to != ids[2]),
                "dangling edge to removed node survives on {}",
                node.id
            );
        }
        assert!(graph.node(ids[2]).is_none());
    }

    #[test]
    fn connect_rejects_self_loops_and_dedups() {
        let (mut graph, ids) = graph_with_line(2);
        assert!(!graph.connect(ids[0], ids[0], 1.0, MoveKind::Walk));

        // Already connected by graph_with_line; duplicate is a no-op.
        assert!(graph.connect(ids[0], ids[1], 100.0, MoveKind::Walk));
        assert_eq!(graph.node(ids[0]).unwrap().edges.len(), 1);
    }

    #[test]
    fn connect_respects_edge_capacity() {
        let mut graph = NavGraph::new();
        let hub = graph.add(Vec3::ZERO, NavFlags::GROUND).unwrap();
        let spokes: Vec<NodeId> = (0..BotConfig::MAX_NODE_NEIGHBORS + 1)
            .map(|i| {
                graph
                    .add(Vec3::new(0.0, i as f32 * 50.0, 0.0), NavFlags::GROUND)
                    .unwrap()
            })
            .collect();

        for &spoke in spokes.iter().take(BotConfig::MAX_NODE_NEIGHBORS) {
            assert!(graph.connect(hub, spoke, 50.0, MoveKind::Walk));
        }
        let overflow = spokes[BotConfig::MAX_NODE_NEIGHBORS];
        assert!(!graph.connect(hub, overflow, 50.0, MoveKind::Walk));
        assert_eq!(
            graph.node(hub).unwrap().edges.len(),
            BotConfig::MAX_NODE_NEIGHBORS
        );
        // The rejected link must not leave a dangling reverse edge on the
        // endpoint that still had room.
        assert!(graph.node(overflow).unwrap().edges.is_empty());
        assert!(!graph.connect(overflow, hub, 50.0, MoveKind::Walk));
        assert!(graph.node(overflow).unwrap().edges.is_empty());
    }

    #[test]
    fn find_nearest_requires_all_flags() {
        let mut graph = NavGraph::new();
        graph.add(Vec3::new(10.0, 0.0, 0.0), NavFlags::GROUND).unwrap();
        let tagged = graph
            .add(
                Vec3::new(500.0, 0.0, 0.0),
                NavFlags::GROUND | NavFlags::CAMP,
            )
            .unwrap();

        let found = graph.find_nearest(Vec3::ZERO, NavFlags::GROUND | NavFlags::CAMP, 0.0);
        assert_eq!(found, Some(tagged));
    }

    #[test]
    fn find_nearest_respects_max_range() {
        let mut graph = NavGraph::new();
        graph.add(Vec3::new(500.0, 0.0, 0.0), NavFlags::GROUND).unwrap();
        assert_eq!(graph.find_nearest(Vec3::ZERO, NavFlags::GROUND, 100.0), None);
    }

    #[test]
    fn climb_only_nodes_hidden_from_non_climbers() {
        let mut graph = NavGraph::new();
        let wall = graph.add(Vec3::new(10.0, 0.0, 0.0), NavFlags::CLIMB).unwrap();
        let floor = graph
            .add(Vec3::new(200.0, 0.0, 0.0), NavFlags::GROUND)
            .unwrap();

        let walker =
            graph.find_nearest_reachable(Vec3::ZERO, FactionMask::HUMAN, false, false, 0.0);
        assert_eq!(walker, Some(floor));

        let climber =
            graph.find_nearest_reachable(Vec3::ZERO, FactionMask::ALIEN, true, false, 0.0);
        assert_eq!(climber, Some(wall));
    }

    #[test]
    fn map_profile_reads_snipe_heavy_as_open() {
        let mut graph = NavGraph::new();
        for _ in 0..3 {
            graph
                .add(Vec3::ZERO, NavFlags::GROUND | NavFlags::SNIPE)
                .unwrap();
        }
        for _ in 0..2 {
            graph.add(Vec3::ZERO, NavFlags::GROUND).unwrap();
        }
        assert_eq!(graph.map_profile(), MapProfile::Open);
    }
}
