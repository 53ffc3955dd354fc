//! Battle map: a flattened 3D grid of tiles
//!
//! Tiles live in one contiguous vector indexed by
//! `z * width * length + y * width + x`. Lookups outside the grid return
//! `None`; the map never fabricates a tile.

use serde::{Deserialize, Serialize};

use crate::battle::terrain::{BlockKind, PartCatalog, PartLayer, PartRef};
use crate::battle::tile::Tile;
use crate::core::types::{Direction, Position, UnitId};

/// Footprint of a combatant: `size` x `size` tiles anchored at its position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    pub size: u8,
    pub flying: bool,
}

impl Footprint {
    pub const SMALL: Footprint = Footprint {
        size: 1,
        flying: false,
    };

    pub fn new(size: u8, flying: bool) -> Self {
        Self {
            size: size.max(1),
            flying,
        }
    }

    /// Positions covered when anchored at `anchor`
    pub fn cells(&self, anchor: Position) -> Vec<Position> {
        let size = self.size as i32;
        let mut cells = Vec::with_capacity((size * size) as usize);
        for dy in 0..size {
            for dx in 0..size {
                cells.push(anchor.offset(dx, dy, 0));
            }
        }
        cells
    }
}

impl Default for Footprint {
    fn default() -> Self {
        Self::SMALL
    }
}

/// Largest grid a battle may allocate
pub const MAX_TILES: usize = 1 << 24;

/// Tile count of a `width x length x height` grid, `None` when a side is
/// negative or the grid would exceed `MAX_TILES`
pub fn grid_tile_count(width: i32, length: i32, height: i32) -> Option<usize> {
    let side = |n: i32| usize::try_from(n).ok();
    side(width)?
        .checked_mul(side(length)?)?
        .checked_mul(side(height)?)
        .filter(|count| *count <= MAX_TILES)
}

/// The full battle map
#[derive(Debug, Clone)]
pub struct BattleMap {
    width: i32,
    length: i32,
    height: i32,
    tiles: Vec<Tile>,
}

impl BattleMap {
    /// Create an empty map (every tile void)
    pub fn new(width: i32, length: i32, height: i32) -> Self {
        let mut map = Self {
            width: 0,
            length: 0,
            height: 0,
            tiles: Vec::new(),
        };
        map.resize(width, length, height);
        map
    }

    /// Create a map whose bottom level is floored with `floor`
    pub fn flat(width: i32, length: i32, height: i32, floor: PartRef) -> Self {
        let mut map = Self::new(width, length, height);
        for y in 0..length {
            for x in 0..width {
                if let Some(tile) = map.tile_mut(Position::new(x, y, 0)) {
                    tile.set_part(PartLayer::Floor, Some(floor));
                }
            }
        }
        map
    }

    /// Destroy and recreate every tile
    ///
    /// Callers handling untrusted sizes check them with `grid_tile_count`
    /// first.
    pub fn resize(&mut self, width: i32, length: i32, height: i32) {
        self.width = width.max(0);
        self.length = length.max(0);
        self.height = height.max(0);

        let count = (self.width as usize)
            .saturating_mul(self.length as usize)
            .saturating_mul(self.height as usize);
        self.tiles = Vec::with_capacity(count);
        for i in 0..count {
            let position = self.coords_unchecked(i);
            self.tiles.push(Tile::new(position));
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn length(&self) -> i32 {
        self.length
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && pos.z >= 0
            && pos.x < self.width
            && pos.y < self.length
            && pos.z < self.height
    }

    /// Linear index of a position, `None` outside the grid
    pub fn index_of(&self, pos: Position) -> Option<usize> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some((pos.z * self.width * self.length + pos.y * self.width + pos.x) as usize)
    }

    /// Position of a linear index, `None` past the end of the grid
    pub fn position_of(&self, index: usize) -> Option<Position> {
        (index < self.tiles.len()).then(|| self.coords_unchecked(index))
    }

    fn coords_unchecked(&self, index: usize) -> Position {
        let index = index as i32;
        let level = self.width * self.length;
        let z = index / level;
        let y = (index % level) / self.width;
        let x = index % self.width;
        Position::new(x, y, z)
    }

    pub fn tile(&self, pos: Position) -> Option<&Tile> {
        self.index_of(pos).map(|i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        self.index_of(pos).map(move |i| &mut self.tiles[i])
    }

    pub fn tile_at(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    pub fn tile_at_mut(&mut self, index: usize) -> Option<&mut Tile> {
        self.tiles.get_mut(index)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Set a part on a tile; returns false outside the grid
    pub fn set_part(&mut self, pos: Position, layer: PartLayer, part: Option<PartRef>) -> bool {
        match self.tile_mut(pos) {
            Some(tile) => {
                tile.set_part(layer, part);
                true
            }
            None => false,
        }
    }

    /// Is the edge between `from` and its neighbour in `direction` blocked?
    ///
    /// West and north edges belong to the tile itself; east and south
    /// edges are the neighbour's west and north walls. Edges into void
    /// space count as blocked.
    pub fn is_edge_blocked(
        &self,
        catalog: &PartCatalog,
        from: Position,
        direction: Direction,
        kind: BlockKind,
    ) -> bool {
        let (Some(here), Some(there)) = (self.tile(from), self.tile(from.step(direction))) else {
            return true;
        };

        match direction {
            Direction::West => here.part_blocks(catalog, PartLayer::WestWall, kind),
            Direction::North => here.part_blocks(catalog, PartLayer::NorthWall, kind),
            Direction::East => there.part_blocks(catalog, PartLayer::WestWall, kind),
            Direction::South => there.part_blocks(catalog, PartLayer::NorthWall, kind),
        }
    }

    /// Can a unit with `footprint` stand anchored at `anchor`?
    ///
    /// `ignore` lets a unit test a move that overlaps its own current cells.
    pub fn can_place(
        &self,
        catalog: &PartCatalog,
        anchor: Position,
        footprint: Footprint,
        ignore: Option<UnitId>,
    ) -> bool {
        footprint.cells(anchor).into_iter().all(|cell| {
            let Some(tile) = self.tile(cell) else {
                return false;
            };
            let occupied = matches!(tile.unit, Some(other) if Some(other) != ignore);
            !occupied
                && !tile.object_blocks(catalog, BlockKind::Movement)
                && (footprint.flying || tile.has_floor())
        })
    }

    /// Write `unit` (or clear) into every in-bounds footprint cell
    pub fn set_occupant(&mut self, anchor: Position, footprint: Footprint, unit: Option<UnitId>) {
        for cell in footprint.cells(anchor) {
            if let Some(tile) = self.tile_mut(cell) {
                tile.unit = unit;
            }
        }
    }

    /// Remove every reference to `unit` from the grid
    pub fn clear_occupant(&mut self, unit: UnitId) {
        for tile in self.tiles.iter_mut().filter(|t| t.unit == Some(unit)) {
            tile.unit = None;
        }
    }

    pub fn clear_occupants(&mut self) {
        for tile in &mut self.tiles {
            tile.unit = None;
        }
    }

    pub fn clear_dangerous(&mut self) {
        for tile in &mut self.tiles {
            tile.dangerous = false;
        }
    }

    /// Flag a square area on one level as dangerous
    pub fn mark_dangerous(&mut self, center: Position, radius: i32) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if let Some(tile) = self.tile_mut(center.offset(dx, dy, 0)) {
                    tile.dangerous = true;
                }
            }
        }
    }

    /// Indices of tiles currently on fire
    pub fn burning_tiles(&self) -> Vec<usize> {
        self.indices_where(|t| t.is_burning())
    }

    /// Indices of tiles currently holding smoke
    pub fn smoking_tiles(&self) -> Vec<usize> {
        self.indices_where(|t| t.smoke > 0)
    }

    fn indices_where(&self, predicate: impl Fn(&Tile) -> bool) -> Vec<usize> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| predicate(t))
            .map(|(i, _)| i)
            .collect()
    }

    /// First position at or below `pos` that has a floor (or the bottom level)
    pub fn landing_position(&self, pos: Position) -> Position {
        let mut current = pos;
        while current.z > 0 {
            match self.tile(current) {
                Some(tile) if tile.has_floor() => break,
                _ => current = current.below(),
            }
        }
        current
    }
}
