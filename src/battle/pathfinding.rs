//! A* pathfinding on one level of the battle grid
//!
//! The AI only talks to pathfinding through `PathOracle`, so tests and
//! front ends can swap in their own cost model.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::AHashMap;

use crate::battle::battle_map::BattleMap;
use crate::battle::terrain::{BlockKind, PartCatalog};
use crate::battle::units::BattleUnit;
use crate::core::types::{Direction, Position};

/// A found route: total time-unit cost and the tiles walked (start excluded)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub cost: u32,
    pub steps: Vec<Position>,
}

impl Route {
    pub fn destination(&self) -> Option<Position> {
        self.steps.last().copied()
    }
}

/// Path cost and blocking queries consumed by the AI
pub trait PathOracle {
    /// Cheapest route for `unit` to `destination`, `None` when unreachable
    fn route(
        &self,
        map: &BattleMap,
        catalog: &PartCatalog,
        unit: &BattleUnit,
        destination: Position,
    ) -> Option<Route>;

    /// Is walking out of `from` in `direction` blocked?
    fn is_blocked(
        &self,
        map: &BattleMap,
        catalog: &PartCatalog,
        from: Position,
        direction: Direction,
    ) -> bool {
        map.is_edge_blocked(catalog, from, direction, BlockKind::Movement)
    }
}

/// Node in the A* open set
#[derive(Debug, Clone)]
struct PathNode {
    position: Position,
    f_cost: u32, // g_cost + heuristic
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.f_cost == other.f_cost
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other.f_cost.cmp(&self.f_cost)
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Default oracle: orthogonal A* over tile move costs, same level only
#[derive(Debug, Clone)]
pub struct GridPathfinder {
    /// Upper bound on expanded nodes per query
    pub max_expansions: usize,
}

impl Default for GridPathfinder {
    fn default() -> Self {
        Self {
            max_expansions: 4096,
        }
    }
}

impl GridPathfinder {
    pub fn new() -> Self {
        Self::default()
    }

    fn heuristic(a: Position, b: Position) -> u32 {
        ((a.x - b.x).abs() + (a.y - b.y).abs()) as u32 * 4
    }

    fn can_step(
        &self,
        map: &BattleMap,
        catalog: &PartCatalog,
        unit: &BattleUnit,
        from: Position,
        direction: Direction,
    ) -> bool {
        let edges_open = unit
            .footprint
            .cells(from)
            .into_iter()
            .all(|cell| !self.is_blocked(map, catalog, cell, direction));
        edges_open && map.can_place(catalog, from.step(direction), unit.footprint, Some(unit.id))
    }
}

impl PathOracle for GridPathfinder {
    fn route(
        &self,
        map: &BattleMap,
        catalog: &PartCatalog,
        unit: &BattleUnit,
        destination: Position,
    ) -> Option<Route> {
        let start = unit.position;
        if start == destination {
            return Some(Route {
                cost: 0,
                steps: Vec::new(),
            });
        }
        if start.z != destination.z
            || !map.can_place(catalog, destination, unit.footprint, Some(unit.id))
        {
            return None;
        }

        let mut open_set = BinaryHeap::new();
        let mut came_from: AHashMap<Position, Position> = AHashMap::new();
        let mut g_scores: AHashMap<Position, u32> = AHashMap::new();

        g_scores.insert(start, 0);
        open_set.push(PathNode {
            position: start,
            f_cost: Self::heuristic(start, destination),
        });

        let mut expansions = 0;
        while let Some(current) = open_set.pop() {
            if current.position == destination {
                let cost = g_scores.get(&destination).copied().unwrap_or(0);
                return Some(Route {
                    cost,
                    steps: reconstruct_path(&came_from, start, destination),
                });
            }

            expansions += 1;
            if expansions > self.max_expansions {
                break;
            }

            let current_g = g_scores.get(&current.position).copied().unwrap_or(u32::MAX);
            for direction in Direction::all() {
                if !self.can_step(map, catalog, unit, current.position, direction) {
                    continue;
                }
                let neighbor = current.position.step(direction);
                let Some(tile) = map.tile(neighbor) else {
                    continue;
                };

                let tentative_g = current_g.saturating_add(tile.move_cost(catalog));
                let neighbor_g = g_scores.get(&neighbor).copied().unwrap_or(u32::MAX);
                if tentative_g < neighbor_g {
                    came_from.insert(neighbor, current.position);
                    g_scores.insert(neighbor, tentative_g);
                    open_set.push(PathNode {
                        position: neighbor,
                        f_cost: tentative_g + Self::heuristic(neighbor, destination),
                    });
                }
            }
        }

        None
    }
}

/// Walk `came_from` back to the start (excluded)
fn reconstruct_path(
    came_from: &AHashMap<Position, Position>,
    start: Position,
    mut current: Position,
) -> Vec<Position> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}
