//! Side rotation, activation order and end-of-turn bookkeeping
//!
//! Primary (the player) always opens a full turn. Secondary (hostiles)
//! follows, then Tertiary (neutrals) when any are still standing. The
//! turn counter advances only when control comes back to Primary.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::battle::environment::{self, EnvironmentReport};
use crate::battle::execution::{BattleEventType, BattleOutcome, BattleState};
use crate::battle::units::{BattleUnit, Faction, UnitStatus};
use crate::core::types::{Turn, UnitId};

/// Whose turn it is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Side {
    #[default]
    Primary,
    Secondary,
    Tertiary,
}

impl Side {
    pub fn faction(self) -> Faction {
        match self {
            Side::Primary => Faction::Player,
            Side::Secondary => Faction::Hostile,
            Side::Tertiary => Faction::Neutral,
        }
    }

    pub fn of(faction: Faction) -> Side {
        match faction {
            Faction::Player => Side::Primary,
            Faction::Hostile => Side::Secondary,
            Faction::Neutral => Side::Tertiary,
        }
    }
}

/// Side that moves after `side`
pub fn next_side(side: Side, has_tertiary: bool) -> Side {
    match side {
        Side::Primary => Side::Secondary,
        Side::Secondary if has_tertiary => Side::Tertiary,
        Side::Secondary | Side::Tertiary => Side::Primary,
    }
}

/// Forced outcome once the battle runs past `turns`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnLimit {
    pub turns: Turn,
    pub outcome: BattleOutcome,
}

/// Units waiting to react to the move that just happened
#[derive(Debug, Clone, Default)]
pub struct ReactionQueue {
    queue: VecDeque<UnitId>,
}

impl ReactionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reactor once; returns false if it was already waiting
    pub fn push(&mut self, unit: UnitId) -> bool {
        if self.queue.contains(&unit) {
            return false;
        }
        self.queue.push_back(unit);
        true
    }

    /// Next reactor still able to act, in FIFO order
    pub fn pop_ready(&mut self, units: &[BattleUnit]) -> Option<UnitId> {
        while let Some(unit) = self.queue.pop_front() {
            if units
                .get(unit.index())
                .map_or(false, |u| !u.is_incapacitated())
            {
                return Some(unit);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

/// Scheduler state carried by a battle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnState {
    pub turn: Turn,
    pub side: Side,
    /// Activation order for the side on the move
    #[serde(default)]
    pub activation_order: Vec<UnitId>,
    #[serde(default)]
    pub selected: Option<UnitId>,
    #[serde(skip)]
    pub reactions: ReactionQueue,
    #[serde(default)]
    pub limit: Option<TurnLimit>,
}

impl Default for TurnState {
    fn default() -> Self {
        Self {
            turn: 1,
            side: Side::Primary,
            activation_order: Vec::new(),
            selected: None,
            reactions: ReactionQueue::new(),
            limit: None,
        }
    }
}

/// What a side change did
#[derive(Debug, Clone, Default)]
pub struct TurnReport {
    pub turn: Turn,
    pub side: Side,
    /// A new full turn began
    pub new_turn: bool,
    pub environment: Option<EnvironmentReport>,
    pub burned: Vec<UnitId>,
    pub caught_fire: Vec<UnitId>,
    pub reverted: Vec<UnitId>,
    pub revived: Vec<UnitId>,
    pub outcome: Option<BattleOutcome>,
}

impl BattleState {
    /// Reset the scheduler to turn 1 and open the primary side's turn
    pub fn begin_battle(&mut self) {
        self.turn.turn = 1;
        self.turn.side = Side::Primary;
        self.begin_side();
        self.log_event(BattleEventType::BattleStarted, "Battle has begun".into());
        info!(battle = %self.id.0, units = self.units.len(), "battle started");
    }

    /// Refresh the incoming side and build its activation order
    ///
    /// Primary keeps roster order; every other side is reshuffled so its
    /// activation sequence cannot be learned.
    pub fn begin_side(&mut self) {
        let faction = self.turn.side.faction();
        let recovery = self.config.turn.morale_recovery;
        for unit in self.units.iter_mut().filter(|u| u.faction == faction) {
            unit.prepare_new_turn(recovery);
        }

        let mut order: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| u.faction == faction && !u.is_out())
            .map(|u| u.id)
            .collect();
        if self.turn.side != Side::Primary {
            order.shuffle(&mut self.rng);
        }
        self.turn.activation_order = order;
        self.turn.selected = None;
        self.turn.reactions.clear();
    }

    /// Finish the current side's turn and hand control to the next one
    pub fn end_turn(&mut self) -> TurnReport {
        let ending = self.turn.side;
        let mut report = TurnReport::default();

        self.burn_units(ending.faction(), &mut report);

        let has_tertiary = self
            .units
            .iter()
            .any(|u| u.faction == Faction::Neutral && !u.is_out());
        let next = next_side(ending, has_tertiary);

        if next == Side::Primary {
            self.turn.turn += 1;
            report.new_turn = true;
            report.environment = Some(environment::advance(
                &mut self.map,
                &self.catalog,
                &mut self.units,
                &mut self.items,
                &self.config.environment,
                &mut self.rng,
            ));
            self.age_exposure();
            report.revived = self.recover_stun();
        }

        for unit in self.units.iter_mut().filter(|u| {
            u.original_faction == next.faction() && u.faction != u.original_faction && !u.is_out()
        }) {
            debug!(unit = unit.id.0, "mind control expired");
            unit.faction = unit.original_faction;
            report.reverted.push(unit.id);
        }

        self.turn.side = next;
        self.begin_side();

        report.turn = self.turn.turn;
        report.side = next;
        self.log_event(
            BattleEventType::TurnStarted {
                turn: self.turn.turn,
                side: next,
            },
            format!("Turn {} {:?}", self.turn.turn, next),
        );
        info!(turn = self.turn.turn, side = ?next, "side change");

        if !self.is_finished() {
            if let Some(outcome) = crate::battle::execution::check_battle_end(self) {
                self.end_battle(outcome);
            }
        }
        if self.is_finished() {
            report.outcome = Some(self.outcome);
        }
        report
    }

    /// Pick the next unit of the side on the move
    ///
    /// Cycles through the activation order starting after the current
    /// selection. `set_reselect` marks the current unit as done first;
    /// `check_reselect` skips units already marked; `check_inventory`
    /// skips units carrying nothing.
    pub fn select_next_unit(
        &mut self,
        check_reselect: bool,
        set_reselect: bool,
        check_inventory: bool,
    ) -> Option<UnitId> {
        if set_reselect {
            if let Some(unit) = self.turn.selected.and_then(|id| self.units.get_mut(id.index())) {
                unit.dont_reselect = true;
            }
        }

        let order = &self.turn.activation_order;
        if order.is_empty() {
            self.turn.selected = None;
            return None;
        }
        let start = self
            .turn
            .selected
            .and_then(|id| order.iter().position(|o| *o == id))
            .map_or(0, |i| i + 1);
        let faction = self.turn.side.faction();

        let found = (0..order.len())
            .map(|offset| order[(start + offset) % order.len()])
            .find(|id| {
                self.units.get(id.index()).map_or(false, |unit| {
                    unit.faction == faction
                        && !unit.is_incapacitated()
                        && !(check_reselect && unit.dont_reselect)
                        && !(check_inventory && self.items.carried_by(unit.id).next().is_none())
                })
            });

        self.turn.selected = found;
        found
    }

    fn burn_units(&mut self, faction: Faction, report: &mut TurnReport) {
        let tuning = self.config.turn.clone();

        let burning: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| u.faction == faction && u.fire > 0 && !u.is_out())
            .map(|u| u.id)
            .collect();
        for id in burning {
            let damage = self
                .rng
                .gen_range(tuning.fire_damage_min..=tuning.fire_damage_max);
            if let Some(unit) = self.units.get_mut(id.index()) {
                unit.fire = unit.fire.saturating_sub(1);
            }
            if let Err(e) = self.damage_unit(id, damage) {
                debug!(unit = id.0, error = %e, "fire damage skipped");
            }
            report.burned.push(id);
        }

        let standing_in_fire: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| {
                !u.is_out()
                    && u.fire == 0
                    && u.occupied_cells()
                        .iter()
                        .any(|c| self.map.tile(*c).map_or(false, |t| t.is_burning()))
            })
            .map(|u| u.id)
            .collect();
        for id in standing_in_fire {
            let turns = self
                .rng
                .gen_range(tuning.burn_turns_min..=tuning.burn_turns_max);
            if let Some(unit) = self.units.get_mut(id.index()) {
                unit.fire = turns;
                report.caught_fire.push(id);
            }
        }
    }

    /// Primary units drop out of hostile knowledge once their exposure
    /// outlasts the sharpest living hostile
    fn age_exposure(&mut self) {
        let ceiling = self
            .units
            .iter()
            .filter(|u| u.faction == Faction::Hostile && !u.is_out())
            .map(|u| u.intelligence)
            .max()
            .unwrap_or(0);
        for unit in self.units.iter_mut().filter(|u| u.faction == Faction::Player) {
            unit.exposure = match unit.exposure {
                Some(turns) if turns + 1 > ceiling => None,
                Some(turns) => Some(turns + 1),
                None => None,
            };
        }
    }

    fn recover_stun(&mut self) -> Vec<UnitId> {
        let recovery = self.config.turn.stun_recovery;
        let mut waking = Vec::new();
        for unit in self.units.iter_mut().filter(|u| u.status != UnitStatus::Dead) {
            unit.stun = (unit.stun - recovery).max(0);
            if unit.status == UnitStatus::Unconscious && unit.health > 0 && unit.stun < unit.health {
                waking.push(unit.id);
            }
        }
        waking.into_iter().filter(|id| self.revive(*id)).collect()
    }
}
