//! Persisted battle document
//!
//! One JSON document per battle: header, tile block (verbose list or
//! compact base64 blob), node list, unit list and the four item lists.
//! Loading rebuilds derived state (tile occupancy, node holders) and
//! rejects anything that would break the world invariants.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::battle::battle_map::{grid_tile_count, BattleMap, MAX_TILES};
use crate::battle::execution::{BattleOutcome, BattleState, Objectives};
use crate::battle::items::{BattleItem, ItemList, ItemLocation};
use crate::battle::nodes::Node;
use crate::battle::terrain::PartCatalog;
use crate::battle::tile::{Tile, MAX_SMOKE};
use crate::battle::tile_codec::{decode_tiles, encode_tiles, TileCodecHeader};
use crate::battle::turn::{Side, TurnLimit, TurnState};
use crate::battle::units::BattleUnit;
use crate::core::config::BattleConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::{BattleId, Turn, UnitId};

/// Kind of mission being fought
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MissionType {
    TerrorSite,
    UfoCrash,
    UfoLanded,
    BaseDefense,
    AlienBase,
    #[default]
    Skirmish,
}

impl MissionType {
    pub const ALL: [MissionType; 6] = [
        MissionType::TerrorSite,
        MissionType::UfoCrash,
        MissionType::UfoLanded,
        MissionType::BaseDefense,
        MissionType::AlienBase,
        MissionType::Skirmish,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MissionType::TerrorSite => "terror_site",
            MissionType::UfoCrash => "ufo_crash",
            MissionType::UfoLanded => "ufo_landed",
            MissionType::BaseDefense => "base_defense",
            MissionType::AlienBase => "alien_base",
            MissionType::Skirmish => "skirmish",
        }
    }
}

impl FromStr for MissionType {
    type Err = BattleError;

    fn from_str(s: &str) -> Result<Self> {
        MissionType::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| BattleError::UnknownMission(s.to_string()))
    }
}

impl std::fmt::Display for MissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleHeader {
    pub id: BattleId,
    pub width: i32,
    pub length: i32,
    pub height: i32,
    pub turn: Turn,
    pub side: Side,
    pub ambient_shade: u8,
    pub terrain: String,
    /// Mission tag; resolved on load, unknown tags are fatal
    pub mission: String,
    #[serde(default)]
    pub objectives: Objectives,
    #[serde(default)]
    pub outcome: BattleOutcome,
    #[serde(default)]
    pub turn_limit: Option<TurnLimit>,
}

/// Tile storage: readable list or compact blob
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum TileBlock {
    Verbose { tiles: Vec<Tile> },
    Binary { header: TileCodecHeader, data: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(flatten)]
    pub node: Node,
    #[serde(default)]
    pub allocated_to: Option<UnitId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemLists {
    #[serde(default)]
    pub active: Vec<BattleItem>,
    #[serde(default)]
    pub guaranteed_recovery: Vec<BattleItem>,
    #[serde(default)]
    pub conditional_recovery: Vec<BattleItem>,
    #[serde(default)]
    pub deleted: Vec<BattleItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleSave {
    pub header: BattleHeader,
    pub tiles: TileBlock,
    pub nodes: Vec<NodeRecord>,
    pub units: Vec<BattleUnit>,
    pub items: ItemLists,
}

fn corrupt(message: String) -> BattleError {
    BattleError::CorruptSave(message)
}

impl BattleState {
    /// Snapshot the battle; `compact` selects the binary tile block
    pub fn to_save(&self, compact: bool) -> Result<BattleSave> {
        let header = BattleHeader {
            id: self.id,
            width: self.map.width(),
            length: self.map.length(),
            height: self.map.height(),
            turn: self.turn.turn,
            side: self.turn.side,
            ambient_shade: self.ambient_shade,
            terrain: self.terrain.clone(),
            mission: self.mission.as_str().to_string(),
            objectives: self.objectives,
            outcome: self.outcome,
            turn_limit: self.turn.limit,
        };

        let tiles = if compact {
            let (header, data) = encode_tiles(&self.map)?;
            TileBlock::Binary {
                header,
                data: STANDARD.encode(data),
            }
        } else {
            TileBlock::Verbose {
                tiles: self
                    .map
                    .tiles()
                    .iter()
                    .filter(|t| !t.is_default())
                    .cloned()
                    .collect(),
            }
        };

        let nodes = self
            .nodes
            .nodes()
            .iter()
            .map(|node| NodeRecord {
                node: node.clone(),
                allocated_to: self.nodes.holder(node.id),
            })
            .collect();

        let list = |list: ItemList| self.items.in_list(list).cloned().collect::<Vec<_>>();
        let items = ItemLists {
            active: list(ItemList::Active),
            guaranteed_recovery: list(ItemList::GuaranteedRecovery),
            conditional_recovery: list(ItemList::ConditionalRecovery),
            deleted: list(ItemList::Deleted),
        };

        Ok(BattleSave {
            header,
            tiles,
            nodes,
            units: self.units.clone(),
            items,
        })
    }

    /// Rebuild a battle from a saved document
    ///
    /// Any unresolvable reference or broken invariant aborts the load.
    pub fn from_save(
        save: BattleSave,
        catalog: PartCatalog,
        config: BattleConfig,
        seed: u64,
    ) -> Result<Self> {
        let BattleSave {
            header,
            tiles,
            nodes,
            units,
            items,
        } = save;
        let mission = MissionType::from_str(&header.mission)?;

        if header.width <= 0 || header.length <= 0 || header.height <= 0 {
            return Err(corrupt(format!(
                "grid dimensions {}x{}x{} are not positive",
                header.width, header.length, header.height
            )));
        }
        if grid_tile_count(header.width, header.length, header.height).is_none() {
            return Err(corrupt(format!(
                "grid dimensions {}x{}x{} exceed {} tiles",
                header.width, header.length, header.height, MAX_TILES
            )));
        }
        let mut map = BattleMap::new(header.width, header.length, header.height);
        match tiles {
            TileBlock::Verbose { tiles } => {
                let mut seen = vec![false; map.tile_count()];
                for tile in tiles {
                    let index = map
                        .index_of(tile.position)
                        .ok_or(BattleError::TileOutOfBounds(tile.position))?;
                    if std::mem::replace(&mut seen[index], true) {
                        return Err(corrupt(format!("tile {} listed twice", tile.position)));
                    }
                    if let Some(slot) = map.tile_at_mut(index) {
                        *slot = tile;
                    }
                }
            }
            TileBlock::Binary { header, data } => {
                let bytes = STANDARD.decode(data)?;
                decode_tiles(&mut map, &header, &bytes)?;
            }
        }
        for tile in map.tiles() {
            if tile.smoke > MAX_SMOKE {
                return Err(corrupt(format!(
                    "tile {} has smoke {} above {}",
                    tile.position, tile.smoke, MAX_SMOKE
                )));
            }
            for part in tile.parts.iter().flatten() {
                if !catalog.contains(*part) {
                    return Err(BattleError::UnknownPart {
                        set: part.set,
                        id: part.id,
                    });
                }
            }
        }

        let mut battle = BattleState::new(map, catalog, config, seed);
        battle.id = header.id;
        battle.terrain = header.terrain;
        battle.mission = mission;
        battle.ambient_shade = header.ambient_shade;
        battle.objectives = header.objectives;
        battle.outcome = header.outcome;

        for (index, unit) in units.into_iter().enumerate() {
            if unit.id.index() != index {
                return Err(corrupt(format!("unit {} stored at slot {}", unit.id.0, index)));
            }
            if !unit.is_out() {
                for cell in unit.occupied_cells() {
                    let tile = battle.map.tile_mut(cell).ok_or_else(|| {
                        corrupt(format!("unit {} stands outside the grid at {}", unit.id.0, cell))
                    })?;
                    if let Some(other) = tile.unit {
                        return Err(corrupt(format!(
                            "units {} and {} both occupy {}",
                            other.0, unit.id.0, cell
                        )));
                    }
                    tile.unit = Some(unit.id);
                }
            }
            battle.units.push(unit);
        }

        let node_count = nodes.len();
        let mut holders = Vec::new();
        for (index, record) in nodes.into_iter().enumerate() {
            if record.node.id.index() != index {
                return Err(corrupt(format!(
                    "node {} stored at slot {}",
                    record.node.id.0, index
                )));
            }
            if let Some(link) = record.node.linked().find(|l| l.index() >= node_count) {
                return Err(corrupt(format!(
                    "node {} links to missing node {}",
                    index, link.0
                )));
            }
            if !battle.map.in_bounds(record.node.position) {
                return Err(BattleError::TileOutOfBounds(record.node.position));
            }
            if let Some(holder) = record.allocated_to {
                holders.push((record.node.id, holder));
            }
            battle.nodes.add(record.node);
        }
        for (node, holder) in holders {
            if battle.get_unit(holder).is_none() {
                return Err(corrupt(format!("node {} held by missing unit {}", node.0, holder.0)));
            }
            battle.nodes.allocate(node, holder)?;
        }
        for unit in &battle.units {
            if let Some(ai) = &unit.ai {
                let dangling = [ai.from_node, ai.to_node]
                    .into_iter()
                    .flatten()
                    .any(|n| battle.nodes.get(n).is_none());
                if dangling || ai.target.map_or(false, |t| battle.get_unit(t).is_none()) {
                    return Err(corrupt(format!("unit {} has a dangling AI reference", unit.id.0)));
                }
            }
        }

        let mut all_items: Vec<(BattleItem, ItemList)> = Vec::new();
        for (list, entries) in [
            (ItemList::Active, items.active),
            (ItemList::GuaranteedRecovery, items.guaranteed_recovery),
            (ItemList::ConditionalRecovery, items.conditional_recovery),
            (ItemList::Deleted, items.deleted),
        ] {
            all_items.extend(entries.into_iter().map(|item| (item, list)));
        }
        all_items.sort_by_key(|(item, _)| item.id);
        for (item, list) in all_items {
            let owner = match item.location {
                ItemLocation::Carried(unit) => Some(unit),
                ItemLocation::Ground(pos) if !battle.map.in_bounds(pos) => {
                    return Err(BattleError::TileOutOfBounds(pos));
                }
                _ => None,
            };
            if let Some(unit) = owner.into_iter().chain(item.body).find(|u| battle.get_unit(*u).is_none()) {
                return Err(corrupt(format!(
                    "item {} refers to missing unit {}",
                    item.id.0, unit.0
                )));
            }
            let id = item.id;
            if !battle.items.restore(item, list) {
                return Err(corrupt(format!("item ids are not dense at {}", id.0)));
            }
        }

        let side = header.side;
        battle.turn = TurnState {
            turn: header.turn.max(1),
            side,
            activation_order: battle
                .units
                .iter()
                .filter(|u| u.faction == side.faction() && !u.is_out())
                .map(|u| u.id)
                .collect(),
            limit: header.turn_limit,
            ..TurnState::default()
        };

        Ok(battle)
    }

    pub fn save_json(&self, compact: bool) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_save(compact)?)?)
    }

    pub fn load_json(
        json: &str,
        catalog: PartCatalog,
        config: BattleConfig,
        seed: u64,
    ) -> Result<Self> {
        let save: BattleSave = serde_json::from_str(json)?;
        Self::from_save(save, catalog, config, seed)
    }

    pub fn save_to_file(&self, path: &Path, compact: bool) -> Result<()> {
        fs::write(path, self.save_json(compact)?)?;
        info!(path = %path.display(), compact, "battle saved");
        Ok(())
    }

    pub fn load_file(
        path: &Path,
        catalog: PartCatalog,
        config: BattleConfig,
        seed: u64,
    ) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let battle = Self::load_json(&json, catalog, config, seed)?;
        info!(path = %path.display(), turn = battle.turn.turn, "battle loaded");
        Ok(battle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::items::ItemKind;
    use crate::battle::nodes::NodeRank;
    use crate::battle::terrain::{standard, PartLayer, PartRef};
    use crate::battle::units::Faction;
    use crate::core::types::Position;

    fn sample() -> BattleState {
        let map = BattleMap::flat(8, 8, 2, standard::GROUND);
        let mut battle = BattleState::new(map, PartCatalog::standard(), BattleConfig::default(), 1);
        battle.mission = MissionType::UfoCrash;
        battle.map.set_part(Position::new(3, 3, 0), PartLayer::Object, Some(standard::CRATE));
        if let Some(tile) = battle.map.tile_mut(Position::new(5, 5, 0)) {
            tile.fire = 2;
            tile.smoke = 6;
        }

        let a = battle.nodes.add(Node::new(Position::new(1, 1, 0), NodeRank::Soldier));
        let b = battle.nodes.add(Node::new(Position::new(6, 1, 0), NodeRank::Scout));
        battle.nodes.link(a, b);

        let alien = battle
            .add_unit(BattleUnit::new("sectoid", Faction::Hostile).with_ai(), Position::new(1, 1, 0))
            .expect("free tile");
        let soldier = battle
            .add_unit(BattleUnit::new("rookie", Faction::Player), Position::new(6, 6, 0))
            .expect("free tile");
        battle.nodes.allocate(b, alien).expect("free node");
        battle.items.add("plasma pistol", ItemKind::Weapon, ItemLocation::Carried(alien));
        let grenade = battle.items.add("grenade", ItemKind::Grenade, ItemLocation::Carried(soldier));
        battle.items.soft_delete(grenade);
        battle
    }

    #[test]
    fn test_mission_tags() {
        for mission in MissionType::ALL {
            assert_eq!(mission.as_str().parse::<MissionType>().ok(), Some(mission));
        }
        assert!(matches!(
            "cydonia".parse::<MissionType>(),
            Err(BattleError::UnknownMission(_))
        ));
    }

    #[test]
    fn test_round_trip_both_tile_formats() {
        let battle = sample();
        for compact in [false, true] {
            let json = battle.save_json(compact).expect("serializes");
            let loaded = BattleState::load_json(&json, PartCatalog::standard(), BattleConfig::default(), 9)
                .expect("loads");

            assert_eq!(loaded.id, battle.id);
            assert_eq!(loaded.mission, MissionType::UfoCrash);
            assert_eq!(loaded.map.tiles(), battle.map.tiles());
            assert_eq!(loaded.nodes.holder(crate::core::types::NodeId(1)), Some(UnitId(0)));
            assert_eq!(loaded.nodes.get(crate::core::types::NodeId(0)).map(|n| n.linked().count()), Some(1));
            assert_eq!(loaded.units.len(), 2);
            assert_eq!(
                loaded.map.tile(Position::new(6, 6, 0)).and_then(|t| t.unit),
                Some(UnitId(1))
            );
            assert_eq!(loaded.items.len(), 2);
            assert_eq!(loaded.items.in_list(ItemList::Deleted).count(), 1);
            assert!(loaded.items.is_armed(UnitId(0)));
        }
    }

    #[test]
    fn test_unknown_mission_is_fatal() {
        let mut save = sample().to_save(false).expect("encodes");
        save.header.mission = "cydonia".into();
        let result = BattleState::from_save(save, PartCatalog::standard(), BattleConfig::default(), 0);
        assert!(matches!(result, Err(BattleError::UnknownMission(_))));
    }

    #[test]
    fn test_occupancy_conflict_is_fatal() {
        let mut save = sample().to_save(true).expect("encodes");
        save.units[1].position = Position::new(1, 1, 0);
        let result = BattleState::from_save(save, PartCatalog::standard(), BattleConfig::default(), 0);
        assert!(matches!(result, Err(BattleError::CorruptSave(_))));
    }

    #[test]
    fn test_unknown_part_is_fatal() {
        let mut battle = sample();
        battle
            .map
            .set_part(Position::new(2, 2, 0), PartLayer::Object, Some(PartRef::new(4, 1)));
        let save = battle.to_save(false).expect("encodes");
        let result = BattleState::from_save(save, PartCatalog::standard(), BattleConfig::default(), 0);
        assert!(matches!(result, Err(BattleError::UnknownPart { set: 4, id: 1 })));
    }

    #[test]
    fn test_dangling_link_is_fatal() {
        let mut save = sample().to_save(false).expect("encodes");
        save.nodes[0].node.links[4] = Some(crate::core::types::NodeId(42));
        let result = BattleState::from_save(save, PartCatalog::standard(), BattleConfig::default(), 0);
        assert!(matches!(result, Err(BattleError::CorruptSave(_))));
    }

    #[test]
    fn test_dangling_item_owner_is_fatal() {
        let mut save = sample().to_save(false).expect("encodes");
        save.items.active[0].location = ItemLocation::Carried(UnitId(7));
        let result = BattleState::from_save(save, PartCatalog::standard(), BattleConfig::default(), 0);
        assert!(matches!(result, Err(BattleError::CorruptSave(_))));
    }

    #[test]
    fn test_truncated_blob_is_fatal() {
        let mut save = sample().to_save(true).expect("encodes");
        if let TileBlock::Binary { data, .. } = &mut save.tiles {
            let mut bytes = STANDARD.decode(data.as_str()).expect("valid base64");
            bytes.pop();
            *data = STANDARD.encode(bytes);
        }
        let result = BattleState::from_save(save, PartCatalog::standard(), BattleConfig::default(), 0);
        assert!(matches!(result, Err(BattleError::TruncatedTileData { .. })));
    }

    #[test]
    fn test_duplicate_verbose_tile_is_fatal() {
        let mut save = sample().to_save(false).expect("encodes");
        if let TileBlock::Verbose { tiles } = &mut save.tiles {
            let mut copy = tiles[0].clone();
            copy.fire = 9;
            tiles.push(copy);
        }
        let result = BattleState::from_save(save, PartCatalog::standard(), BattleConfig::default(), 0);
        assert!(matches!(result, Err(BattleError::CorruptSave(_))));
    }

    #[test]
    fn test_smoke_above_cap_is_fatal() {
        let mut save = sample().to_save(false).expect("encodes");
        if let TileBlock::Verbose { tiles } = &mut save.tiles {
            tiles[0].smoke = MAX_SMOKE + 1;
        }
        let result = BattleState::from_save(save, PartCatalog::standard(), BattleConfig::default(), 0);
        assert!(matches!(result, Err(BattleError::CorruptSave(_))));
    }
}
