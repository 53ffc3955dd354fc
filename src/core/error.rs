use thiserror::Error;

use crate::core::types::{ItemId, NodeId, Position, UnitId};

#[derive(Error, Debug)]
pub enum BattleError {
    #[error("Tile out of bounds: {0}")]
    TileOutOfBounds(Position),

    #[error("Unit not found: {0:?}")]
    UnitNotFound(UnitId),

    #[error("Item not found: {0:?}")]
    ItemNotFound(ItemId),

    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    #[error("Node {node:?} is already allocated to {holder:?}")]
    NodeAllocated { node: NodeId, holder: UnitId },

    #[error("Cannot place unit at {0}")]
    PlacementBlocked(Position),

    #[error("Invalid tile header: {0}")]
    InvalidTileHeader(String),

    #[error("Truncated tile data: expected {expected} bytes, found {actual}")]
    TruncatedTileData { expected: usize, actual: usize },

    #[error("Tile index {0} is outside the grid")]
    TileIndexOutOfRange(u64),

    #[error("Tile {index}: {field} value {value} does not fit its field")]
    TileValueOverflow { index: usize, field: &'static str, value: u64 },

    #[error("Unknown mission type: {0}")]
    UnknownMission(String),

    #[error("Unknown terrain part: set {set}, part {id}")]
    UnknownPart { set: u16, id: u16 },

    #[error("Corrupt save: {0}")]
    CorruptSave(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Encoding error: {0}")]
    EncodingError(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, BattleError>;
