//! A single battlefield tile

use serde::{Deserialize, Serialize};

use crate::battle::terrain::{BlockKind, PartCatalog, PartLayer, PartRef, NON_FLAMMABLE};
use crate::core::types::{Position, UnitId};

pub const MAX_SMOKE: u8 = 15;

/// One cell of the 3D battle grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub position: Position,
    pub parts: [Option<PartRef>; 4],
    /// Remaining burn turns (0 = not burning)
    pub fire: u8,
    pub smoke: u8,
    pub animation_offset: u8,
    pub discovered: [bool; 3],
    /// Reset at the start of every full turn
    #[serde(skip)]
    pub dangerous: bool,
    /// Unit whose footprint covers this tile
    #[serde(skip)]
    pub unit: Option<UnitId>,
}

impl Tile {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            parts: [None; 4],
            fire: 0,
            smoke: 0,
            animation_offset: 0,
            discovered: [false; 3],
            dangerous: false,
            unit: None,
        }
    }

    pub fn part(&self, layer: PartLayer) -> Option<PartRef> {
        self.parts[layer.index()]
    }

    pub fn set_part(&mut self, layer: PartLayer, part: Option<PartRef>) {
        self.parts[layer.index()] = part;
    }

    pub fn has_floor(&self) -> bool {
        self.parts[PartLayer::Floor.index()].is_some()
    }

    pub fn is_burning(&self) -> bool {
        self.fire > 0
    }

    /// Nothing persistent worth writing out
    pub fn is_default(&self) -> bool {
        self.parts.iter().all(Option::is_none)
            && self.fire == 0
            && self.smoke == 0
            && self.animation_offset == 0
            && self.discovered.iter().all(|d| !d)
    }

    /// Add smoke, capped at `MAX_SMOKE`
    pub fn add_smoke(&mut self, amount: u8) {
        self.smoke = self.smoke.saturating_add(amount).min(MAX_SMOKE);
    }

    /// Lowest flammability among the floor and object (most flammable wins)
    pub fn flammability(&self, catalog: &PartCatalog) -> u8 {
        self.burnable_parts(catalog)
            .map(|(_, flammability, _)| flammability)
            .min()
            .unwrap_or(NON_FLAMMABLE)
    }

    /// Longest burn time among the floor and object
    pub fn fuel(&self, catalog: &PartCatalog) -> u8 {
        self.burnable_parts(catalog)
            .map(|(_, _, fuel)| fuel)
            .max()
            .unwrap_or(0)
    }

    fn burnable_parts<'a>(
        &'a self,
        catalog: &'a PartCatalog,
    ) -> impl Iterator<Item = (PartLayer, u8, u8)> + 'a {
        [PartLayer::Object, PartLayer::Floor]
            .into_iter()
            .filter_map(move |layer| {
                let data = self.part(layer).and_then(|p| catalog.get(p))?;
                data.is_flammable()
                    .then_some((layer, data.flammability, data.fuel))
            })
    }

    /// Does the object on this tile stop `kind`?
    pub fn object_blocks(&self, catalog: &PartCatalog, kind: BlockKind) -> bool {
        self.part_blocks(catalog, PartLayer::Object, kind)
    }

    pub fn part_blocks(&self, catalog: &PartCatalog, layer: PartLayer, kind: BlockKind) -> bool {
        self.part(layer)
            .and_then(|p| catalog.get(p))
            .map(|data| data.blocks(kind))
            .unwrap_or(false)
    }

    /// Time-unit cost of entering this tile (floor plus object)
    pub fn move_cost(&self, catalog: &PartCatalog) -> u32 {
        let floor = self
            .part(PartLayer::Floor)
            .and_then(|p| catalog.get(p))
            .map(|d| d.move_cost as u32)
            .unwrap_or(4);
        let object = self
            .part(PartLayer::Object)
            .and_then(|p| catalog.get(p))
            .map(|d| d.move_cost.saturating_sub(4) as u32)
            .unwrap_or(0);
        floor + object
    }

    /// Pack discovered flags into the low bits of a byte
    pub fn flag_bits(&self) -> u8 {
        self.discovered
            .iter()
            .enumerate()
            .fold(0, |bits, (i, d)| if *d { bits | (1 << i) } else { bits })
    }

    pub fn set_flag_bits(&mut self, bits: u8) {
        for (i, d) in self.discovered.iter_mut().enumerate() {
            *d = bits & (1 << i) != 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::terrain::standard;

    #[test]
    fn test_new_tile_is_default() {
        let tile = Tile::new(Position::new(1, 2, 0));
        assert!(tile.is_default());
        assert!(!tile.has_floor());
    }

    #[test]
    fn test_smoke_is_capped() {
        let mut tile = Tile::new(Position::default());
        tile.add_smoke(10);
        tile.add_smoke(10);
        assert_eq!(tile.smoke, MAX_SMOKE);
    }

    #[test]
    fn test_flammability_prefers_most_flammable_part() {
        let catalog = PartCatalog::standard();
        let mut tile = Tile::new(Position::default());
        assert_eq!(tile.flammability(&catalog), NON_FLAMMABLE);

        tile.set_part(PartLayer::Floor, Some(standard::GRASS));
        tile.set_part(PartLayer::Object, Some(standard::CRATE));
        assert_eq!(tile.flammability(&catalog), 30);
        assert_eq!(tile.fuel(&catalog), 3);
    }

    #[test]
    fn test_flag_bits_round_trip() {
        let mut tile = Tile::new(Position::default());
        tile.discovered = [true, false, true];
        let bits = tile.flag_bits();
        assert_eq!(bits, 0b101);

        let mut other = Tile::new(Position::default());
        other.set_flag_bits(bits);
        assert_eq!(other.discovered, tile.discovered);
    }

    #[test]
    fn test_move_cost_includes_object() {
        let catalog = PartCatalog::standard();
        let mut tile = Tile::new(Position::default());
        tile.set_part(PartLayer::Floor, Some(standard::GROUND));
        assert_eq!(tile.move_cost(&catalog), 4);
        tile.set_part(PartLayer::Object, Some(standard::BUSH));
        assert_eq!(tile.move_cost(&catalog), 6);
    }
}
