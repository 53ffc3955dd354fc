//! The battle aggregate and action commit
//!
//! `BattleState` owns every collection of a battle (grid, nodes, units,
//! items) plus the scheduler and the battle's own seeded RNG. The AI
//! decides against a read-only view; everything that changes the world
//! goes through the methods here.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::battle::ai::{ActionKind, AiAction};
use crate::battle::battle_map::BattleMap;
use crate::battle::items::{ItemKind, ItemLocation, ItemStore};
use crate::battle::nodes::NodeGraph;
use crate::battle::save::MissionType;
use crate::battle::terrain::PartCatalog;
use crate::battle::turn::{Side, TurnState};
use crate::battle::units::{BattleUnit, Faction, UnitStatus};
use crate::battle::visibility::VisibilityOracle;
use crate::core::config::BattleConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::{BattleId, Position, Turn, UnitId};

/// Battle outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BattleOutcome {
    #[default]
    Undecided,
    Victory,
    Defeat,
}

/// Log entry for battle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleEvent {
    pub turn: Turn,
    pub event_type: BattleEventType,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BattleEventType {
    BattleStarted,
    TurnStarted { turn: Turn, side: Side },
    UnitSpawned { unit: UnitId },
    UnitMoved { unit: UnitId, to: Position },
    UnitAttacked { attacker: UnitId, target: UnitId, damage: i32 },
    ReactionFire { unit: UnitId, target: UnitId },
    UnitKilled { unit: UnitId },
    UnitKnockedOut { unit: UnitId },
    UnitRevived { unit: UnitId },
    ControlTaken { unit: UnitId, faction: Faction },
    ObjectiveDestroyed,
    BattleEnded { outcome: BattleOutcome },
}

/// Mission objective counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objectives {
    pub required: u32,
    pub destroyed: u32,
}

/// Complete battle state
#[derive(Debug, Clone)]
pub struct BattleState {
    pub id: BattleId,

    // World
    pub map: BattleMap,
    pub catalog: PartCatalog,
    pub nodes: NodeGraph,
    pub units: Vec<BattleUnit>,
    pub items: ItemStore,
    pub config: BattleConfig,

    // Scheduling
    pub turn: TurnState,

    // Mission
    pub terrain: String,
    pub mission: MissionType,
    pub ambient_shade: u8,
    pub objectives: Objectives,
    pub outcome: BattleOutcome,

    // Log
    pub battle_log: Vec<BattleEvent>,

    pub rng: ChaCha8Rng,
}

impl BattleState {
    pub fn new(map: BattleMap, catalog: PartCatalog, config: BattleConfig, seed: u64) -> Self {
        Self {
            id: BattleId::new(),
            map,
            catalog,
            nodes: NodeGraph::new(),
            units: Vec::new(),
            items: ItemStore::new(),
            config,
            turn: TurnState::default(),
            terrain: "farmland".to_string(),
            mission: MissionType::default(),
            ambient_shade: 0,
            objectives: Objectives::default(),
            outcome: BattleOutcome::Undecided,
            battle_log: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Recreate the grid; node allocations and occupancy are lost with it
    pub fn resize(&mut self, width: i32, length: i32, height: i32) {
        self.map.resize(width, length, height);
        self.nodes.clear();
        for ai in self.units.iter_mut().filter_map(|u| u.ai.as_mut()) {
            ai.from_node = None;
            ai.to_node = None;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome != BattleOutcome::Undecided
    }

    pub fn log_event(&mut self, event_type: BattleEventType, description: String) {
        self.battle_log.push(BattleEvent {
            turn: self.turn.turn,
            event_type,
            description,
        });
    }

    /// End the battle with an outcome
    pub fn end_battle(&mut self, outcome: BattleOutcome) {
        self.outcome = outcome;
        self.log_event(
            BattleEventType::BattleEnded { outcome },
            format!("Battle ended: {:?}", outcome),
        );
        info!(?outcome, turn = self.turn.turn, "battle ended");
    }

    pub fn get_unit(&self, id: UnitId) -> Option<&BattleUnit> {
        self.units.get(id.index())
    }

    pub fn get_unit_mut(&mut self, id: UnitId) -> Option<&mut BattleUnit> {
        self.units.get_mut(id.index())
    }

    /// The unit the scheduler has selected, if any
    pub fn active_unit(&self) -> Option<&BattleUnit> {
        self.turn.selected.and_then(|id| self.get_unit(id))
    }

    /// Place a new unit on the grid and give it the next roster handle
    pub fn add_unit(&mut self, mut unit: BattleUnit, position: Position) -> Result<UnitId> {
        if !self.map.can_place(&self.catalog, position, unit.footprint, None) {
            return Err(BattleError::PlacementBlocked(position));
        }
        let id = UnitId(self.units.len() as u32);
        unit.id = id;
        unit.position = position;
        self.map.set_occupant(position, unit.footprint, Some(id));
        self.units.push(unit);
        Ok(id)
    }

    /// Place a unit on a spawn node picked through the rank fallback table
    ///
    /// Returns `None` when no node of any fallback rank can take it.
    pub fn spawn_unit(&mut self, unit: BattleUnit) -> Option<UnitId> {
        let node_id = self.nodes.spawn_node_with_fallback(
            &self.map,
            &self.catalog,
            &self.config.rank_table,
            unit.rank,
            unit.footprint,
            &mut self.rng,
        )?;
        let position = self.nodes.get(node_id)?.position;
        let id = self.add_unit(unit, position).ok()?;
        if let Some(ai) = self.units[id.index()].ai.as_mut() {
            ai.from_node = Some(node_id);
        }
        debug!(unit = id.0, node = node_id.0, %position, "unit spawned");
        self.log_event(
            BattleEventType::UnitSpawned { unit: id },
            format!("Unit {} spawned at {}", id.0, position),
        );
        Some(id)
    }

    /// Move a unit's footprint to `to`
    ///
    /// Arriving on the patrol node it was heading for makes that node the
    /// unit's new anchor and releases the reservation.
    pub fn move_unit(&mut self, id: UnitId, to: Position) -> Result<()> {
        let unit = self.units.get(id.index()).ok_or(BattleError::UnitNotFound(id))?;
        if !self.map.can_place(&self.catalog, to, unit.footprint, Some(id)) {
            return Err(BattleError::PlacementBlocked(to));
        }
        let (from, footprint) = (unit.position, unit.footprint);

        self.map.set_occupant(from, footprint, None);
        self.map.set_occupant(to, footprint, Some(id));

        let arrived = self.units[id.index()]
            .ai
            .as_ref()
            .and_then(|ai| ai.to_node)
            .filter(|node| self.nodes.get(*node).map(|n| n.position) == Some(to));
        let unit = &mut self.units[id.index()];
        unit.position = to;
        if let (Some(node), Some(ai)) = (arrived, unit.ai.as_mut()) {
            ai.from_node = Some(node);
            ai.to_node = None;
            self.nodes.free(node);
        }
        Ok(())
    }

    /// Apply damage; returns true when the unit died from it
    pub fn damage_unit(&mut self, id: UnitId, amount: i32) -> Result<bool> {
        let unit = self.units.get_mut(id.index()).ok_or(BattleError::UnitNotFound(id))?;
        if unit.status == UnitStatus::Dead {
            return Ok(false);
        }
        unit.health -= amount.max(0);
        if unit.health <= 0 {
            self.kill_unit(id)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Add stun; a unit whose stun reaches its health passes out
    pub fn stun_unit(&mut self, id: UnitId, amount: i32) -> Result<()> {
        let unit = self.units.get_mut(id.index()).ok_or(BattleError::UnitNotFound(id))?;
        if unit.is_out() {
            return Ok(());
        }
        unit.stun += amount.max(0);
        if unit.stun >= unit.health {
            self.knock_out(id)?;
        }
        Ok(())
    }

    pub fn kill_unit(&mut self, id: UnitId) -> Result<()> {
        self.take_down(id, UnitStatus::Dead, ItemKind::Corpse)?;
        self.log_event(BattleEventType::UnitKilled { unit: id }, format!("Unit {} killed", id.0));
        Ok(())
    }

    pub fn knock_out(&mut self, id: UnitId) -> Result<()> {
        self.take_down(id, UnitStatus::Unconscious, ItemKind::UnconsciousBody)?;
        self.log_event(
            BattleEventType::UnitKnockedOut { unit: id },
            format!("Unit {} knocked out", id.0),
        );
        Ok(())
    }

    /// Leave the grid as a body item, dropping everything carried
    fn take_down(&mut self, id: UnitId, status: UnitStatus, body: ItemKind) -> Result<()> {
        let unit = self.units.get_mut(id.index()).ok_or(BattleError::UnitNotFound(id))?;
        let position = unit.position;
        unit.status = status;
        unit.fire = 0;
        unit.health = unit.health.max(0);

        self.map.clear_occupant(id);
        self.items.drop_all(id, position);
        // A body that is knocked out and later killed keeps one item
        if let Some(old) = self.items.body_of(id) {
            self.items.soft_delete(old);
        }
        self.items.add_body(id, body, position);
        self.nodes.free_held_by(id);
        if self.turn.selected == Some(id) {
            self.turn.selected = None;
        }
        debug!(unit = id.0, ?status, %position, "unit down");
        Ok(())
    }

    /// Stand an unconscious unit back up on its body's tile
    ///
    /// Fails (returns false) when the body is carried or the tile is taken.
    pub fn revive(&mut self, id: UnitId) -> bool {
        let Some(unit) = self.units.get(id.index()) else {
            return false;
        };
        if unit.status != UnitStatus::Unconscious || unit.health <= 0 {
            return false;
        }
        let Some(body) = self.items.body_of(id) else {
            return false;
        };
        let Some(ItemLocation::Ground(position)) = self.items.get(body).map(|b| b.location) else {
            return false;
        };
        let position = self.map.landing_position(position);
        if !self.map.can_place(&self.catalog, position, unit.footprint, Some(id)) {
            return false;
        }

        self.items.soft_delete(body);
        let unit = &mut self.units[id.index()];
        unit.status = UnitStatus::Standing;
        unit.position = position;
        unit.stun = unit.stun.min(unit.health - 1).max(0);
        let footprint = unit.footprint;
        self.map.set_occupant(position, footprint, Some(id));
        self.log_event(BattleEventType::UnitRevived { unit: id }, format!("Unit {} revived", id.0));
        true
    }

    /// Hand a unit to another faction until its own side's next turn
    pub fn take_control(&mut self, id: UnitId, faction: Faction) -> Result<()> {
        let unit = self.units.get_mut(id.index()).ok_or(BattleError::UnitNotFound(id))?;
        unit.faction = faction;
        unit.dont_reselect = false;
        self.log_event(
            BattleEventType::ControlTaken { unit: id, faction },
            format!("Unit {} now controlled by {:?}", id.0, faction),
        );
        Ok(())
    }

    pub fn destroy_objective(&mut self) {
        self.objectives.destroyed += 1;
        self.log_event(BattleEventType::ObjectiveDestroyed, "Objective destroyed".into());
    }

    /// Execute a decided action
    ///
    /// Moves update occupancy, drop a stale escape plan and queue every
    /// enemy that can see the new tile for a reaction. Attacks flag the
    /// target's surroundings as dangerous. Either way the unit is marked
    /// done for this turn.
    pub fn apply_action(&mut self, action: &AiAction, sight: &dyn VisibilityOracle) -> Result<()> {
        let id = action.unit;
        if self.units.get(id.index()).is_none() {
            return Err(BattleError::UnitNotFound(id));
        }

        match &action.kind {
            ActionKind::Idle => {}
            ActionKind::Move { goal, stop, cost } => {
                self.move_unit(id, *stop)?;
                let unit = &mut self.units[id.index()];
                unit.time_units = unit.time_units.saturating_sub(*cost);
                if let Some(ai) = unit.ai.as_mut() {
                    ai.note_moved_toward(*goal);
                }
                self.log_event(
                    BattleEventType::UnitMoved { unit: id, to: *stop },
                    format!("Unit {} moved to {}", id.0, stop),
                );
                self.queue_reactions(id, sight);
            }
            ActionKind::Attack { target } => {
                self.attack(id, *target)?;
            }
        }

        if let Some(unit) = self.units.get_mut(id.index()) {
            unit.dont_reselect = true;
        }
        self.refresh_outcome();
        Ok(())
    }

    fn queue_reactions(&mut self, mover: UnitId, sight: &dyn VisibilityOracle) {
        let Some(moved) = self.units.get(mover.index()) else {
            return;
        };
        let reactors: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| !u.is_incapacitated() && u.is_enemy_of(moved))
            .filter(|u| sight.unit_sees(&self.map, &self.catalog, u, moved.position))
            .map(|u| u.id)
            .collect();
        for reactor in reactors {
            self.turn.reactions.push(reactor);
        }
    }

    /// Drain the reaction queue against `mover`
    ///
    /// Each queued unit fires once if it is armed, can still see the
    /// mover and has the time units. Returns the units that fired.
    pub fn resolve_reactions(
        &mut self,
        mover: UnitId,
        sight: &dyn VisibilityOracle,
    ) -> Result<Vec<UnitId>> {
        let attack_cost = self.config.ai.attack_cost;
        let mut fired = Vec::new();
        if self.is_finished() {
            self.turn.reactions.clear();
            return Ok(fired);
        }

        while let Some(reactor) = self.turn.reactions.pop_ready(&self.units) {
            let target = self.units.get(mover.index()).ok_or(BattleError::UnitNotFound(mover))?;
            if target.is_out() {
                self.turn.reactions.clear();
                break;
            }
            let unit = &self.units[reactor.index()];
            let ready = unit.time_units >= attack_cost
                && self.items.is_armed(reactor)
                && sight.unit_sees(&self.map, &self.catalog, unit, target.position);
            if !ready {
                continue;
            }

            self.log_event(
                BattleEventType::ReactionFire {
                    unit: reactor,
                    target: mover,
                },
                format!("Unit {} reacts to {}", reactor.0, mover.0),
            );
            self.attack(reactor, mover)?;
            fired.push(reactor);
        }

        self.refresh_outcome();
        Ok(fired)
    }

    fn attack(&mut self, attacker: UnitId, target: UnitId) -> Result<()> {
        let position = self
            .units
            .get(target.index())
            .ok_or(BattleError::UnitNotFound(target))?
            .position;
        let tuning = self.config.ai.clone();

        self.map.mark_dangerous(position, tuning.danger_radius);
        if let Some(unit) = self.units.get_mut(attacker.index()) {
            unit.time_units = unit.time_units.saturating_sub(tuning.attack_cost);
        }
        let damage = self
            .rng
            .gen_range(tuning.attack_damage_min..=tuning.attack_damage_max);
        self.log_event(
            BattleEventType::UnitAttacked {
                attacker,
                target,
                damage,
            },
            format!("Unit {} hits {} for {}", attacker.0, target.0, damage),
        );
        self.damage_unit(target, damage)?;
        Ok(())
    }

    fn refresh_outcome(&mut self) {
        if self.is_finished() {
            return;
        }
        if let Some(outcome) = check_battle_end(self) {
            self.end_battle(outcome);
        }
    }
}

/// Check if battle should end
pub fn check_battle_end(state: &BattleState) -> Option<BattleOutcome> {
    let standing = |faction: Faction| {
        let mut side = state
            .units
            .iter()
            .filter(|u| u.original_faction == faction)
            .peekable();
        side.peek().is_some() && side.all(|u| u.is_out())
    };

    if standing(Faction::Hostile) {
        return Some(BattleOutcome::Victory);
    }
    if standing(Faction::Player) {
        return Some(BattleOutcome::Defeat);
    }

    let objectives = state.objectives;
    if objectives.required > 0 && objectives.destroyed >= objectives.required {
        return Some(BattleOutcome::Victory);
    }

    if let Some(limit) = state.turn.limit {
        if state.turn.turn > limit.turns {
            return Some(limit.outcome);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::ai::AiMode;
    use crate::battle::nodes::{Node, NodeRank};
    use crate::battle::terrain::standard;
    use crate::battle::units::UnitRank;
    use crate::battle::visibility::LineOfSight;

    fn battle() -> BattleState {
        let map = BattleMap::flat(10, 10, 1, standard::GROUND);
        BattleState::new(map, PartCatalog::standard(), BattleConfig::default(), 3)
    }

    #[test]
    fn test_battle_state_creation() {
        let state = battle();
        assert_eq!(state.turn.turn, 1);
        assert_eq!(state.turn.side, Side::Primary);
        assert!(!state.is_finished());
    }

    #[test]
    fn test_add_unit_sets_occupancy() {
        let mut state = battle();
        let id = state
            .add_unit(BattleUnit::new("rookie", Faction::Player), Position::new(2, 2, 0))
            .expect("free tile");
        assert_eq!(state.map.tile(Position::new(2, 2, 0)).and_then(|t| t.unit), Some(id));

        let blocked = state.add_unit(BattleUnit::new("rookie", Faction::Player), Position::new(2, 2, 0));
        assert!(matches!(blocked, Err(BattleError::PlacementBlocked(_))));
    }

    #[test]
    fn test_spawn_uses_fallback_rank() {
        let mut state = battle();
        // Commanders fall back through the officer ranks to any node
        state.nodes.add(Node::new(Position::new(7, 7, 0), NodeRank::Scout));
        let id = state
            .spawn_unit(BattleUnit::new("sectoid", Faction::Hostile).with_rank(UnitRank::Commander).with_ai())
            .expect("scout node accepts anyone");

        let unit = &state.units[id.index()];
        assert_eq!(unit.position, Position::new(7, 7, 0));
        assert!(unit.ai.as_ref().and_then(|ai| ai.from_node).is_some());
    }

    #[test]
    fn test_spawn_without_nodes_fails() {
        let mut state = battle();
        assert!(state.spawn_unit(BattleUnit::new("sectoid", Faction::Hostile)).is_none());
        assert!(state.units.is_empty());
    }

    #[test]
    fn test_arriving_at_node_frees_it() {
        let mut state = battle();
        let node = state.nodes.add(Node::new(Position::new(3, 0, 0), NodeRank::Soldier));
        let id = state
            .add_unit(BattleUnit::new("sectoid", Faction::Hostile).with_ai(), Position::new(0, 0, 0))
            .expect("free tile");
        state.nodes.allocate(node, id).expect("free node");
        if let Some(ai) = state.units[id.index()].ai.as_mut() {
            ai.to_node = Some(node);
        }

        state.move_unit(id, Position::new(3, 0, 0)).expect("open ground");

        let ai = state.units[id.index()].ai.as_ref().expect("has ai");
        assert_eq!(ai.from_node, Some(node));
        assert_eq!(ai.to_node, None);
        assert!(!state.nodes.is_allocated(node));
        assert_eq!(state.map.tile(Position::new(0, 0, 0)).and_then(|t| t.unit), None);
    }

    #[test]
    fn test_kill_leaves_corpse_and_drops_items() {
        let mut state = battle();
        let id = state
            .add_unit(BattleUnit::new("rookie", Faction::Player), Position::new(4, 4, 0))
            .expect("free tile");
        let rifle = state.items.add("rifle", ItemKind::Weapon, ItemLocation::Carried(id));

        assert!(state.damage_unit(id, 100).expect("unit exists"));

        let unit = &state.units[id.index()];
        assert_eq!(unit.status, UnitStatus::Dead);
        assert_eq!(state.map.tile(Position::new(4, 4, 0)).and_then(|t| t.unit), None);
        assert_eq!(
            state.items.get(rifle).map(|i| i.location),
            Some(ItemLocation::Ground(Position::new(4, 4, 0)))
        );
        let body = state.items.body_of(id).expect("corpse");
        assert_eq!(state.items.get(body).map(|i| i.kind), Some(ItemKind::Corpse));
    }

    #[test]
    fn test_knock_out_and_revive() {
        let mut state = battle();
        let id = state
            .add_unit(BattleUnit::new("rookie", Faction::Player), Position::new(4, 4, 0))
            .expect("free tile");
        state.stun_unit(id, 50).expect("unit exists");
        assert_eq!(state.units[id.index()].status, UnitStatus::Unconscious);
        let body = state.items.body_of(id).expect("body item");

        assert!(state.revive(id));
        assert_eq!(state.units[id.index()].status, UnitStatus::Standing);
        assert_eq!(state.map.tile(Position::new(4, 4, 0)).and_then(|t| t.unit), Some(id));
        assert_eq!(state.items.body_of(id), None);
        assert_eq!(state.items.get(body).map(|i| i.location), Some(ItemLocation::Nowhere));
    }

    #[test]
    fn test_revive_fails_when_tile_taken() {
        let mut state = battle();
        let id = state
            .add_unit(BattleUnit::new("rookie", Faction::Player), Position::new(4, 4, 0))
            .expect("free tile");
        state.knock_out(id).expect("unit exists");
        state
            .add_unit(BattleUnit::new("rookie", Faction::Player), Position::new(4, 4, 0))
            .expect("tile freed by the fall");
        assert!(!state.revive(id));
    }

    #[test]
    fn test_move_action_queues_reactions() {
        let mut state = battle();
        let alien = state
            .add_unit(BattleUnit::new("sectoid", Faction::Hostile).with_ai(), Position::new(0, 5, 0))
            .expect("free tile");
        let soldier = state
            .add_unit(BattleUnit::new("rookie", Faction::Player), Position::new(9, 5, 0))
            .expect("free tile");
        state.items.add("rifle", ItemKind::Weapon, ItemLocation::Carried(soldier));

        let action = AiAction {
            unit: alien,
            mode: AiMode::Patrol,
            kind: ActionKind::Move {
                goal: Position::new(2, 5, 0),
                stop: Position::new(2, 5, 0),
                cost: 8,
            },
            reserve_node: None,
            reason: "test".into(),
        };
        let sight = LineOfSight::new();
        state.apply_action(&action, &sight).expect("valid move");

        let unit = &state.units[alien.index()];
        assert_eq!(unit.position, Position::new(2, 5, 0));
        assert_eq!(unit.time_units, 52);
        assert!(unit.dont_reselect);
        assert_eq!(state.turn.reactions.len(), 1);

        let fired = state.resolve_reactions(alien, &sight).expect("units exist");
        assert_eq!(fired, vec![soldier]);
        assert!(state.units[alien.index()].health < 40);
        assert!(state.turn.reactions.is_empty());
    }

    #[test]
    fn test_attack_marks_danger_and_spends_time() {
        let mut state = battle();
        let alien = state
            .add_unit(BattleUnit::new("sectoid", Faction::Hostile).with_ai(), Position::new(1, 1, 0))
            .expect("free tile");
        let soldier = state
            .add_unit(BattleUnit::new("rookie", Faction::Player), Position::new(5, 5, 0))
            .expect("free tile");

        let action = AiAction {
            unit: alien,
            mode: AiMode::Combat,
            kind: ActionKind::Attack { target: soldier },
            reserve_node: None,
            reason: "test".into(),
        };
        state.apply_action(&action, &LineOfSight::new()).expect("valid attack");

        assert!(state.map.tile(Position::new(6, 6, 0)).map_or(false, |t| t.dangerous));
        assert!(!state.map.tile(Position::new(7, 7, 0)).map_or(true, |t| t.dangerous));
        assert_eq!(state.units[alien.index()].time_units, 60 - 25);
        let health = state.units[soldier.index()].health;
        assert!((40 - 25..=40 - 10).contains(&health));
    }

    #[test]
    fn test_battle_end_conditions() {
        let mut state = battle();
        assert_eq!(check_battle_end(&state), None);

        let soldier = state
            .add_unit(BattleUnit::new("rookie", Faction::Player), Position::new(0, 0, 0))
            .expect("free tile");
        let alien = state
            .add_unit(BattleUnit::new("sectoid", Faction::Hostile), Position::new(5, 5, 0))
            .expect("free tile");
        assert_eq!(check_battle_end(&state), None);

        state.objectives.required = 1;
        state.destroy_objective();
        assert_eq!(check_battle_end(&state), Some(BattleOutcome::Victory));
        state.objectives = Objectives::default();

        state.kill_unit(soldier).expect("unit exists");
        assert_eq!(check_battle_end(&state), Some(BattleOutcome::Defeat));

        state.kill_unit(alien).expect("unit exists");
        assert_eq!(check_battle_end(&state), Some(BattleOutcome::Victory));
    }

    #[test]
    fn test_resize_clears_nodes() {
        let mut state = battle();
        state.nodes.add(Node::new(Position::new(1, 1, 0), NodeRank::Scout));
        state.resize(20, 20, 2);
        assert!(state.nodes.is_empty());
        assert_eq!(state.map.tile_count(), 800);
    }
}
