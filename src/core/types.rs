//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a battle (persisted in the save header)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleId(pub Uuid);

impl BattleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BattleId {
    fn default() -> Self {
        Self::new()
    }
}

/// Full-turn counter
pub type Turn = u32;

/// Handle to a combatant in the battle roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl UnitId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to an item in the item store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl ItemId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a node in the node graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Discrete 3D grid position (x east, y south, z up)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Neighbouring position one step in `direction` on the same level
    pub fn step(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        self.offset(dx, dy, 0)
    }

    pub fn above(&self) -> Self {
        self.offset(0, 0, 1)
    }

    pub fn below(&self) -> Self {
        self.offset(0, 0, -1)
    }

    pub fn distance_sq(&self, other: &Self) -> i32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Euclidean distance rounded to the nearest tile
    pub fn distance(&self, other: &Self) -> i32 {
        (self.distance_sq(other) as f32).sqrt().round() as i32
    }
}

impl std::ops::Add for Position {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Position {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Orthogonal direction on a single level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Direction {
    #[default]
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Grid offset (dx, dy) for this direction
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_id_equality() {
        assert_eq!(UnitId(1), UnitId(1));
        assert_ne!(UnitId(1), UnitId(2));
        assert_eq!(UnitId(7).index(), 7);
    }

    #[test]
    fn test_position_step_and_opposite() {
        let origin = Position::new(5, 5, 0);
        for direction in Direction::all() {
            let there = origin.step(direction);
            assert_eq!(there.step(direction.opposite()), origin);
        }
        assert_eq!(origin.step(Direction::North), Position::new(5, 4, 0));
    }

    #[test]
    fn test_position_distance() {
        let a = Position::new(0, 0, 0);
        let b = Position::new(3, 4, 0);
        assert_eq!(a.distance_sq(&b), 25);
        assert_eq!(a.distance(&b), 5);
        assert_eq!(a.distance(&a), 0);
    }

    #[test]
    fn test_position_arithmetic() {
        let a = Position::new(1, 2, 3);
        let b = Position::new(1, 1, 1);
        assert_eq!(a - b, Position::new(0, 1, 2));
        assert_eq!(a + b, Position::new(2, 3, 4));
    }
}
