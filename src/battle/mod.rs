//! Battle system - squad-level turn-based combat on a 3D tile grid
//!
//! One combatant acts at a time. Its AI reads the world through a
//! `DecisionContext`, picks an action, and `BattleState` commits it.
//! Fire and smoke advance once per full turn.

pub mod ai;
pub mod battle_map;
pub mod environment;
pub mod execution;
pub mod items;
pub mod nodes;
pub mod pathfinding;
pub mod save;
pub mod terrain;
pub mod tile;
pub mod tile_codec;
pub mod turn;
pub mod units;
pub mod visibility;

// Re-exports for convenient access
pub use ai::{ActionKind, AiAction, AiMode, AiState, StandardAi, TacticalAi};
pub use battle_map::{BattleMap, Footprint};
pub use environment::EnvironmentReport;
pub use execution::{check_battle_end, BattleEvent, BattleEventType, BattleOutcome, BattleState, Objectives};
pub use items::{BattleItem, ItemKind, ItemList, ItemLocation, ItemStore};
pub use nodes::{Node, NodeGraph, NodeRank, NodeType, RankFallbackTable};
pub use pathfinding::{GridPathfinder, PathOracle, Route};
pub use save::{BattleSave, MissionType, TileBlock};
pub use terrain::{PartCatalog, PartLayer, PartRef};
pub use tile::Tile;
pub use tile_codec::{decode_tiles, encode_tiles, TileCodecHeader};
pub use turn::{next_side, ReactionQueue, Side, TurnLimit, TurnReport, TurnState};
pub use units::{Aggression, BattleUnit, Faction, UnitRank, UnitStatus};
pub use visibility::{LineOfSight, VisibilityOracle};
