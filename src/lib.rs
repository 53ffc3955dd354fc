//! Battlescape - turn-based tactical combat core
//!
//! Battlefield grid, node graph, fire and smoke, turn scheduler and the
//! per-unit AI that drives hostile combatants.

pub mod battle;
pub mod core;
