//! Battle configuration with documented tuning values
//!
//! Every number the AI, the environment pass and the turn scheduler
//! depend on lives here. The values are authored game balance, not
//! derived; override them through TOML rather than editing code.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::battle::nodes::RankFallbackTable;
use crate::core::error::{BattleError, Result};

/// Complete configuration for one battle
///
/// Owned by each `BattleState`, so independent battles (and tests) can run
/// with different tables side by side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BattleConfig {
    #[serde(default)]
    pub ai: AiTuning,
    #[serde(default)]
    pub escape: EscapeTuning,
    #[serde(default)]
    pub mode_odds: ModeOdds,
    #[serde(default)]
    pub environment: EnvironmentTuning,
    #[serde(default)]
    pub turn: TurnTuning,
    #[serde(default)]
    pub rank_table: RankFallbackTable,
}

/// General AI knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiTuning {
    /// Half-width of the local tile search table (5 gives an 11x11 table)
    pub search_radius: i32,
    /// Time units an attack costs
    pub attack_cost: u32,
    /// Chance that an officer patrols from the officer pool instead of
    /// the general pool
    pub officer_pool_chance: f64,
    /// Radius of the area flagged dangerous around an attacked tile
    pub danger_radius: i32,
    /// How many steps of a target's approach route an ambush tile must watch
    pub ambush_route_window: usize,
    /// Score given to a tile that watches the approach route
    pub ambush_base_score: i32,
    /// Damage an attack deals (inclusive range)
    pub attack_damage_min: i32,
    pub attack_damage_max: i32,
}

impl Default for AiTuning {
    fn default() -> Self {
        Self {
            search_radius: 5,
            attack_cost: 25,
            officer_pool_chance: 0.8,
            danger_radius: 1,
            ambush_route_window: 8,
            ambush_base_score: 100,
            attack_damage_min: 10,
            attack_damage_max: 25,
        }
    }
}

/// Escape-route scoring constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscapeTuning {
    /// Starting score for candidates from the local offset table
    pub systematic_base: i32,
    /// Starting score for the wide random "desperate" candidates
    pub desperate_base: i32,
    /// Score per tile of extra distance from the nearest threat
    pub threat_distance_weight: i32,
    /// Score per spotter fewer than at the current position
    pub exposure_penalty: i32,
    pub fire_penalty: i32,
    pub smoke_bonus: i32,
    pub dangerous_penalty: i32,
    /// Bonus for staying put when nobody can see the unit
    pub current_tile_preference: i32,
    /// A candidate scoring above this ends the search early
    pub fast_pass_threshold: i32,
    pub desperate_tries: u32,
    pub desperate_radius: i32,
}

impl Default for EscapeTuning {
    fn default() -> Self {
        Self {
            systematic_base: 100,
            desperate_base: 110,
            threat_distance_weight: 10,
            exposure_penalty: 10,
            fire_penalty: 40,
            smoke_bonus: 5,
            dangerous_penalty: 100,
            current_tile_preference: 15,
            fast_pass_threshold: 125,
            desperate_tries: 30,
            desperate_radius: 20,
        }
    }
}

/// Base odds for the per-activation mode roll
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeOdds {
    pub patrol: f32,
    pub ambush: f32,
    pub combat: f32,
    pub escape: f32,
    /// Added to escape odds for every spotter
    pub escape_per_spotter: f32,
    /// Multiplier applied to the mode the unit is already in
    pub stickiness: f32,
}

impl Default for ModeOdds {
    fn default() -> Self {
        Self {
            patrol: 30.0,
            ambush: 12.0,
            combat: 20.0,
            escape: 15.0,
            escape_per_spotter: 10.0,
            stickiness: 1.2,
        }
    }
}

/// Fire and smoke rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentTuning {
    /// Ignition power a burning tile applies to each neighbour
    pub spread_power: i32,
    /// Smoke above this level diffuses
    pub smoke_spread_threshold: u8,
    /// Chance for smoke to drift into each open neighbour
    pub smoke_spread_chance: f64,
}

impl Default for EnvironmentTuning {
    fn default() -> Self {
        Self {
            spread_power: 30,
            smoke_spread_threshold: 2,
            smoke_spread_chance: 0.5,
        }
    }
}

/// End-of-turn recovery and decay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnTuning {
    pub fire_damage_min: i32,
    pub fire_damage_max: i32,
    /// Turns a unit keeps burning after catching fire (inclusive range)
    pub burn_turns_min: u8,
    pub burn_turns_max: u8,
    pub morale_recovery: i32,
    pub stun_recovery: i32,
}

impl Default for TurnTuning {
    fn default() -> Self {
        Self {
            fire_damage_min: 5,
            fire_damage_max: 10,
            burn_turns_min: 1,
            burn_turns_max: 3,
            morale_recovery: 10,
            stun_recovery: 1,
        }
    }
}

impl BattleConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML, filling unspecified fields with defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: BattleConfig = toml::from_str(contents)?;
        config.validate().map_err(BattleError::InvalidConfig)?;
        Ok(config)
    }

    /// Load a config from a TOML file on disk
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.ai.search_radius <= 0 {
            return Err(format!(
                "search_radius ({}) must be positive",
                self.ai.search_radius
            ));
        }

        if !(0.0..=1.0).contains(&self.ai.officer_pool_chance) {
            return Err(format!(
                "officer_pool_chance ({}) must be within 0..=1",
                self.ai.officer_pool_chance
            ));
        }

        if self.ai.attack_damage_min > self.ai.attack_damage_max {
            return Err(format!(
                "attack_damage_min ({}) should be <= attack_damage_max ({})",
                self.ai.attack_damage_min, self.ai.attack_damage_max
            ));
        }

        if !(0.0..=1.0).contains(&self.environment.smoke_spread_chance) {
            return Err(format!(
                "smoke_spread_chance ({}) must be within 0..=1",
                self.environment.smoke_spread_chance
            ));
        }

        if self.turn.fire_damage_min > self.turn.fire_damage_max {
            return Err(format!(
                "fire_damage_min ({}) should be <= fire_damage_max ({})",
                self.turn.fire_damage_min, self.turn.fire_damage_max
            ));
        }

        if self.turn.burn_turns_min > self.turn.burn_turns_max {
            return Err("burn_turns_min should be <= burn_turns_max".into());
        }

        let odds = &self.mode_odds;
        if [odds.patrol, odds.ambush, odds.combat, odds.escape, odds.escape_per_spotter]
            .iter()
            .any(|o| *o < 0.0)
        {
            return Err("Mode odds must not be negative".into());
        }

        self.rank_table.validate()
    }
}
