//! Combatants and the factions that control them
//!
//! Units are stored in a roster vector and addressed by `UnitId`. They
//! are never removed during a battle: death and unconsciousness are
//! statuses, so handles stay valid for the whole battle.

use serde::{Deserialize, Serialize};

use crate::battle::ai::AiState;
use crate::battle::battle_map::Footprint;
use crate::core::types::{Position, UnitId};

/// Turn-rotating sides: Player is primary, Hostile secondary, Neutral tertiary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Faction {
    #[default]
    Player,
    Hostile,
    Neutral,
}

impl Faction {
    /// Hostiles fight everyone else; Player and Neutral are on the same side
    pub fn is_enemy_of(&self, other: Faction) -> bool {
        matches!(
            (self, other),
            (Faction::Hostile, Faction::Player)
                | (Faction::Hostile, Faction::Neutral)
                | (Faction::Player, Faction::Hostile)
                | (Faction::Neutral, Faction::Hostile)
        )
    }
}

/// Locomotion/body status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UnitStatus {
    #[default]
    Standing,
    Walking,
    Flying,
    Turning,
    Aiming,
    Collapsing,
    Dead,
    Unconscious,
    Panicking,
    Berserk,
}

/// Combatant rank, also the row of the spawn rank-fallback table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UnitRank {
    Commander = 0,
    Leader = 1,
    Engineer = 2,
    Medic = 3,
    Navigator = 4,
    #[default]
    Soldier = 5,
    Terrorist = 6,
    Terrorist2 = 7,
}

impl UnitRank {
    pub const ALL: [UnitRank; 8] = [
        UnitRank::Commander,
        UnitRank::Leader,
        UnitRank::Engineer,
        UnitRank::Medic,
        UnitRank::Navigator,
        UnitRank::Soldier,
        UnitRank::Terrorist,
        UnitRank::Terrorist2,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Officers guard; everyone else scouts
    pub fn is_officer(self) -> bool {
        matches!(
            self,
            UnitRank::Commander
                | UnitRank::Leader
                | UnitRank::Engineer
                | UnitRank::Medic
                | UnitRank::Navigator
        )
    }
}

/// Authored aggression trait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Aggression {
    Cautious,
    #[default]
    Normal,
    Aggressive,
}

/// A combatant on the battlefield
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleUnit {
    pub id: UnitId,
    pub unit_type: String,
    pub faction: Faction,
    /// Faction at battle start; differs while mind-controlled or turned
    pub original_faction: Faction,
    pub position: Position,
    pub status: UnitStatus,
    pub footprint: Footprint,
    pub rank: UnitRank,
    pub aggression: Aggression,

    pub health: i32,
    pub max_health: i32,
    pub stun: i32,
    pub morale: i32,
    pub time_units: u32,
    pub max_time_units: u32,
    /// How many full turns an exposed enemy stays known to this unit's side
    pub intelligence: u32,

    /// Turns left burning
    pub fire: u8,
    /// Full turns since this unit was last seen by the opposing AI
    /// (`None` = unknown to them)
    pub exposure: Option<u32>,
    /// Excluded from "next unit" cycling until the side's next turn
    pub dont_reselect: bool,

    pub ai: Option<AiState>,
}

impl BattleUnit {
    pub fn new(unit_type: &str, faction: Faction) -> Self {
        Self {
            id: UnitId(0),
            unit_type: unit_type.to_string(),
            faction,
            original_faction: faction,
            position: Position::default(),
            status: UnitStatus::Standing,
            footprint: Footprint::SMALL,
            rank: UnitRank::default(),
            aggression: Aggression::default(),
            health: 40,
            max_health: 40,
            stun: 0,
            morale: 100,
            time_units: 60,
            max_time_units: 60,
            intelligence: 3,
            fire: 0,
            exposure: None,
            dont_reselect: false,
            ai: None,
        }
    }

    /// Builder: attach a fresh AI state
    pub fn with_ai(mut self) -> Self {
        self.ai = Some(AiState::new(!self.rank.is_officer()));
        self
    }

    pub fn with_rank(mut self, rank: UnitRank) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_footprint(mut self, footprint: Footprint) -> Self {
        self.footprint = footprint;
        self
    }

    /// Dead or unconscious
    pub fn is_out(&self) -> bool {
        matches!(self.status, UnitStatus::Dead | UnitStatus::Unconscious)
    }

    /// Cannot take actions this activation
    pub fn is_incapacitated(&self) -> bool {
        self.is_out() || matches!(self.status, UnitStatus::Collapsing)
    }

    pub fn is_mind_controlled(&self) -> bool {
        self.faction != self.original_faction
    }

    pub fn health_ratio(&self) -> f32 {
        if self.max_health <= 0 {
            return 0.0;
        }
        (self.health.max(0) as f32 / self.max_health as f32).clamp(0.0, 1.0)
    }

    pub fn is_enemy_of(&self, other: &BattleUnit) -> bool {
        self.faction.is_enemy_of(other.faction)
    }

    pub fn occupied_cells(&self) -> Vec<Position> {
        self.footprint.cells(self.position)
    }

    pub fn change_morale(&mut self, delta: i32) {
        self.morale = (self.morale + delta).clamp(0, 100);
    }

    /// Start-of-side refresh for a unit about to act
    pub fn prepare_new_turn(&mut self, morale_recovery: i32) {
        if self.is_out() {
            return;
        }
        self.time_units = self.max_time_units;
        self.dont_reselect = false;
        self.change_morale(morale_recovery);
        if matches!(self.status, UnitStatus::Panicking | UnitStatus::Berserk) {
            self.status = UnitStatus::Standing;
        }
    }
}
