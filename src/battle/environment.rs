//! Fire and smoke simulation
//!
//! Runs once per full turn, at the start of the primary side's turn.
//! Every pass works from a snapshot of the tiles that were burning or
//! smoking when it began, so fire started during the pass does not tick
//! down until the next one.

use rand::Rng;
use tracing::debug;

use crate::battle::battle_map::BattleMap;
use crate::battle::items::{ItemLocation, ItemStore};
use crate::battle::terrain::{BlockKind, PartCatalog, PartLayer, PartRef, NON_FLAMMABLE};
use crate::battle::tile::MAX_SMOKE;
use crate::battle::units::BattleUnit;
use crate::core::config::EnvironmentTuning;
use crate::core::types::{Direction, Position, UnitId};

/// What one environment pass changed
#[derive(Debug, Clone, Default)]
pub struct EnvironmentReport {
    pub extinguished: usize,
    pub ignited: Vec<Position>,
    pub destroyed: Vec<(Position, PartLayer)>,
    pub fallen_units: Vec<UnitId>,
    pub fallen_items: usize,
}

/// Try to set a tile alight
///
/// Chance in percent is `power - flammability / 10 + 15`. Tiles that are
/// already burning or have nothing flammable are left alone.
pub fn ignite(
    map: &mut BattleMap,
    catalog: &PartCatalog,
    pos: Position,
    power: i32,
    rng: &mut impl Rng,
) -> bool {
    let Some(tile) = map.tile_mut(pos) else {
        return false;
    };
    if tile.is_burning() {
        return false;
    }
    let flammability = tile.flammability(catalog);
    if flammability == NON_FLAMMABLE {
        return false;
    }

    let chance = (power - flammability as i32 / 10 + 15).clamp(0, 100);
    if rng.gen_range(0..100) >= chance {
        return false;
    }

    tile.fire = tile.fuel(catalog).max(1);
    let smoke = (15 - (flammability as i32 / 10).clamp(1, 12)) as u8;
    tile.smoke = tile.smoke.max(smoke).min(MAX_SMOKE);
    true
}

/// Add smoke to a tile, capped; returns false outside the grid
pub fn add_smoke(map: &mut BattleMap, pos: Position, amount: u8) -> bool {
    match map.tile_mut(pos) {
        Some(tile) => {
            tile.add_smoke(amount);
            true
        }
        None => false,
    }
}

/// Advance fire and smoke by one full turn
pub fn advance(
    map: &mut BattleMap,
    catalog: &PartCatalog,
    units: &mut [BattleUnit],
    items: &mut ItemStore,
    tuning: &EnvironmentTuning,
    rng: &mut impl Rng,
) -> EnvironmentReport {
    let mut report = EnvironmentReport::default();
    map.clear_dangerous();

    let burning = map.burning_tiles();
    let smoking = map.smoking_tiles();

    for index in burning {
        let Some(pos) = map.position_of(index) else {
            continue;
        };
        let remaining = match map.tile_at_mut(index) {
            Some(tile) => {
                tile.fire = tile.fire.saturating_sub(1);
                tile.fire
            }
            None => continue,
        };

        if remaining > 0 {
            for direction in Direction::all() {
                if map.is_edge_blocked(catalog, pos, direction, BlockKind::Fire) {
                    continue;
                }
                let target = pos.step(direction);
                if ignite(map, catalog, target, tuning.spread_power, rng) {
                    report.ignited.push(target);
                }
            }
        } else {
            report.extinguished += 1;
            if let Some(layer) = burn_away(map, catalog, pos) {
                debug!(%pos, ?layer, "part burnt away");
                report.destroyed.push((pos, layer));
                settle_column(map, catalog, units, items, pos, &mut report);
            }
        }
    }

    for index in smoking {
        let Some(pos) = map.position_of(index) else {
            continue;
        };
        let remaining = match map.tile_at_mut(index) {
            Some(tile) => {
                tile.smoke = tile.smoke.saturating_sub(1);
                tile.smoke
            }
            None => continue,
        };
        if remaining <= tuning.smoke_spread_threshold {
            continue;
        }

        let spread = remaining / 2;
        let above = pos.above();
        if map.tile(above).map_or(false, |t| !t.has_floor()) {
            raise_smoke(map, above, spread);
        }
        for direction in Direction::all() {
            if map.is_edge_blocked(catalog, pos, direction, BlockKind::Smoke) {
                continue;
            }
            if rng.gen_bool(tuning.smoke_spread_chance) {
                raise_smoke(map, pos.step(direction), spread);
            }
        }
    }

    report
}

fn raise_smoke(map: &mut BattleMap, pos: Position, level: u8) {
    if let Some(tile) = map.tile_mut(pos) {
        tile.smoke = tile.smoke.max(level).min(MAX_SMOKE);
    }
}

/// Destroy the topmost flammable part (object, then floor)
fn burn_away(map: &mut BattleMap, catalog: &PartCatalog, pos: Position) -> Option<PartLayer> {
    let tile = map.tile_mut(pos)?;
    for layer in [PartLayer::Object, PartLayer::Floor] {
        let Some(part) = tile.part(layer) else {
            continue;
        };
        let Some(data) = catalog.get(part) else {
            continue;
        };
        if data.is_flammable() {
            let remains = data.destroyed_into.map(|id| PartRef::new(part.set, id));
            tile.set_part(layer, remains);
            return Some(layer);
        }
    }
    None
}

/// Drop unsupported units and ground items in the column at and above `base`
pub fn settle_column(
    map: &mut BattleMap,
    catalog: &PartCatalog,
    units: &mut [BattleUnit],
    items: &mut ItemStore,
    base: Position,
    report: &mut EnvironmentReport,
) {
    for unit in units.iter_mut() {
        if unit.is_out() || unit.footprint.flying || unit.position.z < base.z {
            continue;
        }
        let cells = unit.occupied_cells();
        if !cells.iter().any(|c| c.x == base.x && c.y == base.y) {
            continue;
        }
        if cells
            .iter()
            .any(|c| map.tile(*c).map_or(false, |t| t.has_floor()))
        {
            continue;
        }

        let landing_z = cells
            .iter()
            .map(|c| map.landing_position(*c).z)
            .max()
            .unwrap_or(0);
        let landing = Position::new(unit.position.x, unit.position.y, landing_z);
        if landing == unit.position || !map.can_place(catalog, landing, unit.footprint, Some(unit.id)) {
            // Landing spot taken; stays put until a later settle
            continue;
        }

        map.set_occupant(unit.position, unit.footprint, None);
        debug!(unit = unit.id.0, from = %unit.position, to = %landing, "unit fell");
        unit.position = landing;
        map.set_occupant(landing, unit.footprint, Some(unit.id));
        report.fallen_units.push(unit.id);
    }

    for z in base.z..map.height() {
        let pos = Position::new(base.x, base.y, z);
        if map.tile(pos).map_or(true, |t| t.has_floor()) {
            continue;
        }
        let landing = map.landing_position(pos);
        if landing == pos {
            continue;
        }
        let falling: Vec<_> = items.on_ground_at(pos).map(|i| i.id).collect();
        for id in falling {
            items.move_to(id, ItemLocation::Ground(landing));
            report.fallen_items += 1;
        }
    }
}
