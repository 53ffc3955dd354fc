//! Line-of-sight queries
//!
//! The AI asks one question: can an observer see a tile? `LineOfSight`
//! answers it by stepping a line through the grid, checking walls,
//! sight-blocking objects, floors between levels and accumulated smoke.

use crate::battle::battle_map::BattleMap;
use crate::battle::terrain::{BlockKind, PartCatalog};
use crate::battle::units::BattleUnit;
use crate::core::types::{Direction, Position};

/// Visibility/targeting oracle consumed by the AI
pub trait VisibilityOracle {
    /// Is there a clear sightline between two tiles?
    fn has_line_of_sight(
        &self,
        map: &BattleMap,
        catalog: &PartCatalog,
        from: Position,
        to: Position,
    ) -> bool;

    /// Can `observer` currently see `target`?
    fn unit_sees(
        &self,
        map: &BattleMap,
        catalog: &PartCatalog,
        observer: &BattleUnit,
        target: Position,
    ) -> bool {
        !observer.is_incapacitated() && self.has_line_of_sight(map, catalog, observer.position, target)
    }
}

/// Default grid sightline oracle
#[derive(Debug, Clone)]
pub struct LineOfSight {
    pub max_view_distance: i32,
    /// Total smoke along the line that blinds it
    pub smoke_limit: u32,
}

impl Default for LineOfSight {
    fn default() -> Self {
        Self {
            max_view_distance: 20,
            smoke_limit: 12,
        }
    }
}

impl LineOfSight {
    pub fn new() -> Self {
        Self::default()
    }

    fn edge_blocked(map: &BattleMap, catalog: &PartCatalog, from: Position, direction: Direction) -> bool {
        map.is_edge_blocked(catalog, from, direction, BlockKind::Sight)
    }

    /// Can sight pass from `a` into the horizontally adjacent (or
    /// diagonal) tile `b` on the same level?
    fn horizontal_clear(map: &BattleMap, catalog: &PartCatalog, a: Position, b: Position) -> bool {
        let horizontal = match b.x - a.x {
            1 => Some(Direction::East),
            -1 => Some(Direction::West),
            _ => None,
        };
        let vertical = match b.y - a.y {
            1 => Some(Direction::South),
            -1 => Some(Direction::North),
            _ => None,
        };

        match (horizontal, vertical) {
            (Some(h), None) => !Self::edge_blocked(map, catalog, a, h),
            (None, Some(v)) => !Self::edge_blocked(map, catalog, a, v),
            (Some(h), Some(v)) => {
                let via_h = !Self::edge_blocked(map, catalog, a, h)
                    && !Self::edge_blocked(map, catalog, a.step(h), v);
                let via_v = !Self::edge_blocked(map, catalog, a, v)
                    && !Self::edge_blocked(map, catalog, a.step(v), h);
                via_h || via_v
            }
            (None, None) => true,
        }
    }

    /// Floors block sight between levels
    fn vertical_clear(map: &BattleMap, from: Position, dz: i32) -> bool {
        match dz {
            1 => map.tile(from.above()).map_or(false, |t| !t.has_floor()),
            -1 => map.tile(from).map_or(false, |t| !t.has_floor()),
            _ => true,
        }
    }
}

impl VisibilityOracle for LineOfSight {
    fn has_line_of_sight(
        &self,
        map: &BattleMap,
        catalog: &PartCatalog,
        from: Position,
        to: Position,
    ) -> bool {
        if !map.in_bounds(from) || !map.in_bounds(to) {
            return false;
        }
        if from.distance_sq(&to) > self.max_view_distance * self.max_view_distance {
            return false;
        }

        let delta = to - from;
        let steps = delta.x.abs().max(delta.y.abs()).max(delta.z.abs());
        let mut previous = from;
        let mut smoke = 0u32;

        for i in 1..=steps {
            let point = Position::new(
                from.x + (delta.x * i + steps / 2 * delta.x.signum()) / steps,
                from.y + (delta.y * i + steps / 2 * delta.y.signum()) / steps,
                from.z + (delta.z * i + steps / 2 * delta.z.signum()) / steps,
            );

            let level = Position::new(point.x, point.y, previous.z);
            if !Self::horizontal_clear(map, catalog, previous, level) {
                return false;
            }
            if !Self::vertical_clear(map, level, point.z - previous.z) {
                return false;
            }

            if point != to {
                let Some(tile) = map.tile(point) else {
                    return false;
                };
                if tile.object_blocks(catalog, BlockKind::Sight) {
                    return false;
                }
                smoke += tile.smoke as u32;
                if smoke > self.smoke_limit {
                    return false;
                }
            }
            previous = point;
        }

        true
    }
}
