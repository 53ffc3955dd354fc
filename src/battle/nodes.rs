//! Spawn and patrol node graph
//!
//! Nodes are authored with the level: way-points annotated with a rank,
//! a spawn weight, a patrol priority and up to five links. During a
//! battle a node can be allocated to at most one unit at a time.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::battle_map::{BattleMap, Footprint};
use crate::battle::terrain::PartCatalog;
use crate::battle::units::UnitRank;
use crate::core::error::{BattleError, Result};
use crate::core::types::{NodeId, Position, UnitId};

pub const NODE_LINK_COUNT: usize = 5;

/// Spawn/patrol category of a node. `Scout` doubles as the universal rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NodeRank {
    #[default]
    Scout = 0,
    Xcom = 1,
    Soldier = 2,
    Navigator = 3,
    Leader = 4,
    Engineer = 5,
    Misc1 = 6,
    Medic = 7,
    Misc2 = 8,
}

/// Node type bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct NodeType(pub u8);

impl NodeType {
    pub const NONE: NodeType = NodeType(0);
    /// Only fliers may use the node
    pub const FLYING: NodeType = NodeType(1);
    /// Only 1x1 units fit
    pub const SMALL: NodeType = NodeType(2);
    /// Excluded from patrols
    pub const DANGEROUS: NodeType = NodeType(4);

    pub fn contains(self, other: NodeType) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: NodeType) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: NodeType) {
        self.0 &= !other.0;
    }

    /// Does a unit with `footprint` fit this node type?
    pub fn accepts(self, footprint: Footprint) -> bool {
        (!self.contains(NodeType::SMALL) || footprint.size == 1)
            && (!self.contains(NodeType::FLYING) || footprint.flying)
    }
}

impl std::ops::BitOr for NodeType {
    type Output = NodeType;
    fn bitor(self, rhs: NodeType) -> NodeType {
        NodeType(self.0 | rhs.0)
    }
}

/// An authored way-point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Position,
    pub rank: NodeRank,
    pub spawn_weight: u8,
    pub patrol_priority: u8,
    #[serde(default)]
    pub links: [Option<NodeId>; NODE_LINK_COUNT],
    #[serde(default)]
    pub node_type: NodeType,
    /// Draws aliens that want to wreck objectives
    #[serde(default)]
    pub destruction_lure: bool,
}

impl Node {
    pub fn new(position: Position, rank: NodeRank) -> Self {
        Self {
            id: NodeId(0),
            position,
            rank,
            spawn_weight: 1,
            patrol_priority: 1,
            links: [None; NODE_LINK_COUNT],
            node_type: NodeType::NONE,
            destruction_lure: false,
        }
    }

    pub fn linked(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.links.iter().flatten().copied()
    }
}

/// Ordered substitute node ranks per combatant rank
///
/// Row `r` lists the node ranks a unit of rank `r` may spawn on, most
/// preferred first, ending in the universal `Scout` rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankFallbackTable {
    pub rows: [[NodeRank; 8]; 8],
}

impl Default for RankFallbackTable {
    fn default() -> Self {
        use NodeRank::*;
        Self {
            rows: [
                [Leader, Navigator, Engineer, Misc2, Medic, Soldier, Misc1, Scout], // commander
                [Leader, Navigator, Engineer, Misc2, Medic, Soldier, Misc1, Scout], // leader
                [Engineer, Leader, Navigator, Soldier, Medic, Misc2, Misc1, Scout], // engineer
                [Medic, Misc1, Soldier, Misc2, Navigator, Leader, Engineer, Scout], // medic
                [Navigator, Leader, Engineer, Soldier, Medic, Misc2, Misc1, Scout], // navigator
                [Soldier, Engineer, Navigator, Leader, Misc1, Misc2, Medic, Scout], // soldier
                [Engineer, Navigator, Soldier, Leader, Medic, Misc2, Misc1, Scout], // terrorist
                [Engineer, Navigator, Soldier, Leader, Medic, Misc2, Misc1, Scout], // terrorist
            ],
        }
    }
}

impl RankFallbackTable {
    pub fn row(&self, rank: UnitRank) -> &[NodeRank; 8] {
        &self.rows[rank.index()]
    }

    /// Every row must end in the universal rank
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (i, row) in self.rows.iter().enumerate() {
            if row[7] != NodeRank::Scout {
                return Err(format!("rank table row {} does not end in Scout", i));
            }
        }
        Ok(())
    }
}

/// Parameters of a patrol destination query
#[derive(Debug, Clone)]
pub struct PatrolRequest<'a> {
    pub unit: UnitId,
    /// Scouts scan the whole graph; others follow links from `from`
    pub scout: bool,
    pub from: Option<NodeId>,
    pub footprint: Footprint,
    /// Skip the burning/dangerous tile checks
    pub ignores_danger: bool,
    /// Node ranks forming the officer pool (empty for non-officers)
    pub officer_ranks: &'a [NodeRank],
    pub officer_pool_chance: f64,
}

/// The node graph of one battle
#[derive(Debug, Clone, Default)]
pub struct NodeGraph {
    nodes: Vec<Node>,
    holders: Vec<Option<UnitId>>,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, assigning the next id
    pub fn add(&mut self, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.id = id;
        self.nodes.push(node);
        self.holders.push(None);
        id
    }

    /// Link two nodes both ways using free link slots
    pub fn link(&mut self, a: NodeId, b: NodeId) -> bool {
        if self.get(a).is_none() || self.get(b).is_none() || a == b {
            return false;
        }
        let linked_a = Self::attach(&mut self.nodes[a.index()], b);
        let linked_b = Self::attach(&mut self.nodes[b.index()], a);
        linked_a && linked_b
    }

    fn attach(node: &mut Node, other: NodeId) -> bool {
        if node.links.contains(&Some(other)) {
            return true;
        }
        match node.links.iter_mut().find(|l| l.is_none()) {
            Some(slot) => {
                *slot = Some(other);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.holders.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn holder(&self, id: NodeId) -> Option<UnitId> {
        self.holders.get(id.index()).copied().flatten()
    }

    pub fn is_allocated(&self, id: NodeId) -> bool {
        self.holder(id).is_some()
    }

    /// Node currently held by `unit`
    pub fn held_by(&self, unit: UnitId) -> Option<NodeId> {
        self.holders
            .iter()
            .position(|h| *h == Some(unit))
            .map(|i| NodeId(i as u32))
    }

    /// Allocate `id` to `unit`, releasing whatever `unit` held before
    pub fn allocate(&mut self, id: NodeId, unit: UnitId) -> Result<()> {
        let holder = self
            .holders
            .get(id.index())
            .copied()
            .ok_or(BattleError::NodeNotFound(id))?;
        match holder {
            Some(other) if other != unit => Err(BattleError::NodeAllocated {
                node: id,
                holder: other,
            }),
            _ => {
                self.free_held_by(unit);
                self.holders[id.index()] = Some(unit);
                debug!(node = id.0, unit = unit.0, "node allocated");
                Ok(())
            }
        }
    }

    pub fn free(&mut self, id: NodeId) {
        if let Some(slot) = self.holders.get_mut(id.index()) {
            *slot = None;
        }
    }

    pub fn free_held_by(&mut self, unit: UnitId) {
        for slot in self.holders.iter_mut().filter(|h| **h == Some(unit)) {
            *slot = None;
        }
    }

    pub fn nearest_node(&self, position: Position) -> Option<NodeId> {
        self.nodes
            .iter()
            .min_by_key(|n| n.position.distance_sq(&position))
            .map(|n| n.id)
    }

    /// Random unallocated node of exactly `rank`, weighted by spawn weight
    pub fn spawn_node(
        &self,
        map: &BattleMap,
        catalog: &PartCatalog,
        rank: NodeRank,
        footprint: Footprint,
        rng: &mut impl Rng,
    ) -> Option<NodeId> {
        let candidates: Vec<(NodeId, u32)> = self
            .nodes
            .iter()
            .filter(|n| {
                n.rank == rank
                    && n.spawn_weight > 0
                    && !self.is_allocated(n.id)
                    && n.node_type.accepts(footprint)
                    && map.can_place(catalog, n.position, footprint, None)
            })
            .map(|n| (n.id, n.spawn_weight as u32))
            .collect();

        weighted_pick(&candidates, rng)
    }

    /// Spawn node for a combatant rank, walking its fallback row
    pub fn spawn_node_with_fallback(
        &self,
        map: &BattleMap,
        catalog: &PartCatalog,
        table: &RankFallbackTable,
        unit_rank: UnitRank,
        footprint: Footprint,
        rng: &mut impl Rng,
    ) -> Option<NodeId> {
        for rank in table.row(unit_rank) {
            if let Some(node) = self.spawn_node(map, catalog, *rank, footprint, rng) {
                return Some(node);
            }
            debug!(?unit_rank, ?rank, "no spawn node, trying next rank");
        }
        None
    }

    /// Pick a patrol destination, or `None` when nothing is eligible
    pub fn patrol_node(
        &self,
        map: &BattleMap,
        catalog: &PartCatalog,
        request: &PatrolRequest<'_>,
        rng: &mut impl Rng,
    ) -> Option<NodeId> {
        let found = self.patrol_pass(map, catalog, request, request.scout, rng);
        if found.is_none() && request.footprint.size > 1 && !request.scout {
            debug!(unit = request.unit.0, "large unit found no patrol node, retrying as scout");
            return self.patrol_pass(map, catalog, request, true, rng);
        }
        found
    }

    fn patrol_pass(
        &self,
        map: &BattleMap,
        catalog: &PartCatalog,
        request: &PatrolRequest<'_>,
        scout: bool,
        rng: &mut impl Rng,
    ) -> Option<NodeId> {
        let scan: Vec<NodeId> = match request.from.and_then(|id| self.get(id)) {
            Some(from) if !scout => from.linked().collect(),
            _ => self.nodes.iter().map(|n| n.id).collect(),
        };

        let eligible: Vec<&Node> = scan
            .into_iter()
            .filter_map(|id| self.get(id))
            .filter(|n| self.patrol_eligible(map, catalog, n, request, scout))
            .collect();

        let general: Vec<(NodeId, u32)> = eligible
            .iter()
            .map(|n| (n.id, (n.patrol_priority as u32).max(1)))
            .collect();
        let officer: Vec<(NodeId, u32)> = eligible
            .iter()
            .filter(|n| request.officer_ranks.contains(&n.rank))
            .map(|n| (n.id, (n.patrol_priority as u32).max(1)))
            .collect();

        if !officer.is_empty() && rng.gen_bool(request.officer_pool_chance) {
            return weighted_pick(&officer, rng);
        }
        weighted_pick(&general, rng)
    }

    fn patrol_eligible(
        &self,
        map: &BattleMap,
        catalog: &PartCatalog,
        node: &Node,
        request: &PatrolRequest<'_>,
        scout: bool,
    ) -> bool {
        if Some(node.id) == request.from || self.is_allocated(node.id) {
            return false;
        }
        if node.node_type.contains(NodeType::DANGEROUS) || !node.node_type.accepts(request.footprint) {
            return false;
        }
        if !scout && node.patrol_priority == 0 && node.rank == NodeRank::Scout {
            return false;
        }
        let Some(tile) = map.tile(node.position) else {
            return false;
        };
        if !request.ignores_danger && (tile.is_burning() || tile.dangerous) {
            return false;
        }
        map.can_place(catalog, node.position, request.footprint, Some(request.unit))
    }
}

/// Weighted random choice; zero-weight entries are never picked
pub fn weighted_pick<T: Copy>(candidates: &[(T, u32)], rng: &mut impl Rng) -> Option<T> {
    let total: u32 = candidates.iter().map(|(_, w)| *w).sum();
    if total == 0 {
        return None;
    }
    let mut roll = rng.gen_range(0..total);
    for (item, weight) in candidates {
        if roll < *weight {
            return Some(*item);
        }
        roll -= weight;
    }
    None
}
