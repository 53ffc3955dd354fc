//! Terrain part catalog
//!
//! Every tile is built from up to four layered parts. A part is a
//! reference into a catalog of part sets; the catalog entry says how the
//! part burns, what it blocks and what it turns into when destroyed.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{BattleError, Result};

/// Flammability value meaning "never burns"
pub const NON_FLAMMABLE: u8 = 255;

/// The four layers of a tile, in storage order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartLayer {
    Floor = 0,
    WestWall = 1,
    NorthWall = 2,
    Object = 3,
}

impl PartLayer {
    pub const ALL: [PartLayer; 4] = [
        PartLayer::Floor,
        PartLayer::WestWall,
        PartLayer::NorthWall,
        PartLayer::Object,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Reference to a catalog entry: part `id` within part set `set`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartRef {
    pub set: u16,
    pub id: u16,
}

impl PartRef {
    pub const fn new(set: u16, id: u16) -> Self {
        Self { set, id }
    }
}

/// What a part stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Fire,
    Smoke,
    Sight,
    Movement,
}

/// Catalog entry for one terrain part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartData {
    pub name: String,
    #[serde(default = "default_flammability")]
    pub flammability: u8,
    /// Turns the part burns once ignited
    #[serde(default)]
    pub fuel: u8,
    #[serde(default)]
    pub armor: u8,
    #[serde(default)]
    pub blocks_fire: bool,
    #[serde(default)]
    pub blocks_smoke: bool,
    #[serde(default)]
    pub blocks_sight: bool,
    #[serde(default)]
    pub blocks_movement: bool,
    /// Time-unit cost of walking onto the part
    #[serde(default = "default_move_cost")]
    pub move_cost: u8,
    /// Part id (same set) left behind once this part is destroyed
    #[serde(default)]
    pub destroyed_into: Option<u16>,
}

fn default_flammability() -> u8 {
    NON_FLAMMABLE
}

fn default_move_cost() -> u8 {
    4
}

impl PartData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            flammability: NON_FLAMMABLE,
            fuel: 0,
            armor: 0,
            blocks_fire: false,
            blocks_smoke: false,
            blocks_sight: false,
            blocks_movement: false,
            move_cost: default_move_cost(),
            destroyed_into: None,
        }
    }

    pub fn is_flammable(&self) -> bool {
        self.flammability != NON_FLAMMABLE && self.fuel > 0
    }

    pub fn blocks(&self, kind: BlockKind) -> bool {
        match kind {
            BlockKind::Fire => self.blocks_fire,
            BlockKind::Smoke => self.blocks_smoke,
            BlockKind::Sight => self.blocks_sight,
            BlockKind::Movement => self.blocks_movement,
        }
    }
}

/// A named group of parts (one terrain tileset)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartSet {
    pub name: String,
    #[serde(default)]
    pub parts: Vec<PartData>,
}

/// All part sets available to a battle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartCatalog {
    #[serde(default)]
    pub sets: Vec<PartSet>,
}

impl PartCatalog {
    pub fn new(sets: Vec<PartSet>) -> Self {
        Self { sets }
    }

    /// Parse a catalog from TOML
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let catalog: PartCatalog = toml::from_str(contents)?;
        for set in &catalog.sets {
            for part in &set.parts {
                if let Some(next) = part.destroyed_into {
                    if next as usize >= set.parts.len() {
                        return Err(BattleError::InvalidConfig(format!(
                            "part '{}' in set '{}' is destroyed into missing part {}",
                            part.name, set.name, next
                        )));
                    }
                }
            }
        }
        Ok(catalog)
    }

    /// Load a catalog from a TOML file on disk
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn get(&self, part: PartRef) -> Option<&PartData> {
        self.sets
            .get(part.set as usize)
            .and_then(|set| set.parts.get(part.id as usize))
    }

    pub fn contains(&self, part: PartRef) -> bool {
        self.get(part).is_some()
    }

    /// Built-in catalog used by the headless runner and tests
    pub fn standard() -> Self {
        let mut ground = PartData::new("ground");
        ground.move_cost = 4;

        let mut grass = PartData::new("grass");
        grass.flammability = 40;
        grass.fuel = 2;
        grass.destroyed_into = Some(standard::SCORCHED.id);

        let scorched = PartData::new("scorched earth");

        let mut wall = PartData::new("brick wall");
        wall.armor = 50;
        wall.blocks_fire = true;
        wall.blocks_smoke = true;
        wall.blocks_sight = true;
        wall.blocks_movement = true;

        let mut crate_part = PartData::new("wooden crate");
        crate_part.flammability = 30;
        crate_part.fuel = 3;
        crate_part.armor = 10;
        crate_part.blocks_movement = true;
        crate_part.blocks_sight = true;

        let mut bush = PartData::new("bush");
        bush.flammability = 20;
        bush.fuel = 2;
        bush.blocks_sight = true;
        bush.move_cost = 6;

        let mut plank_floor = PartData::new("plank floor");
        plank_floor.flammability = 60;
        plank_floor.fuel = 4;

        Self::new(vec![PartSet {
            name: "farmland".to_string(),
            parts: vec![ground, grass, scorched, wall, crate_part, bush, plank_floor],
        }])
    }
}

/// Part references into `PartCatalog::standard()`
pub mod standard {
    use super::PartRef;

    pub const GROUND: PartRef = PartRef::new(0, 0);
    pub const GRASS: PartRef = PartRef::new(0, 1);
    pub const SCORCHED: PartRef = PartRef::new(0, 2);
    pub const WALL: PartRef = PartRef::new(0, 3);
    pub const CRATE: PartRef = PartRef::new(0, 4);
    pub const BUSH: PartRef = PartRef::new(0, 5);
    pub const PLANK_FLOOR: PartRef = PartRef::new(0, 6);
}
