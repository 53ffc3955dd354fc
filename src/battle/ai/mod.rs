//! Per-unit tactical AI
//!
//! Architecture: assess, then choose a mode, then evaluate that mode.
//! - `DecisionContext` gives a read-only view of the battle plus the
//!   path and visibility oracles
//! - `AiMode::evaluate` is the per-mode search; it never mutates the world
//! - `BattleState::request_action` commits node reservations, exposure
//!   updates and the escape cache afterwards

mod ambush;
mod combat;
pub mod decision_context;
mod escape;
pub mod mode;
mod patrol;

pub use decision_context::{Assessment, DecisionContext};
pub use escape::{escape_offsets, find_escape};
pub use mode::choose_mode;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::execution::BattleState;
use crate::battle::pathfinding::PathOracle;
use crate::battle::visibility::VisibilityOracle;
use crate::core::error::{BattleError, Result};
use crate::core::types::{NodeId, Position, UnitId};

/// Behaviour mode of an AI unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AiMode {
    #[default]
    Patrol,
    Ambush,
    Combat,
    Escape,
}

impl AiMode {
    pub const ALL: [AiMode; 4] = [AiMode::Patrol, AiMode::Ambush, AiMode::Combat, AiMode::Escape];

    /// Mode tried next when this one finds nothing to do
    pub fn fallback(self) -> Option<AiMode> {
        match self {
            AiMode::Ambush => Some(AiMode::Combat),
            AiMode::Combat => Some(AiMode::Patrol),
            AiMode::Escape => Some(AiMode::Patrol),
            AiMode::Patrol => None,
        }
    }

    /// Search for an action in this mode; `None` means "nothing sensible"
    pub fn evaluate(
        self,
        ctx: &DecisionContext<'_>,
        assessment: &Assessment,
        escape: &EscapeCache,
        rng: &mut impl Rng,
    ) -> Option<AiAction> {
        match self {
            AiMode::Patrol => patrol::evaluate(ctx, rng),
            AiMode::Ambush => ambush::evaluate(ctx, assessment),
            AiMode::Combat => combat::evaluate(ctx, assessment),
            AiMode::Escape => escape::evaluate(ctx, escape),
        }
    }
}

/// What the unit will do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Idle,
    /// Head for `goal`, stopping at `stop` this activation
    Move { goal: Position, stop: Position, cost: u32 },
    Attack { target: UnitId },
}

/// Result of one AI activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiAction {
    pub unit: UnitId,
    pub mode: AiMode,
    pub kind: ActionKind,
    /// Patrol node to allocate to the unit on commit
    pub reserve_node: Option<NodeId>,
    pub reason: String,
}

impl AiAction {
    pub fn idle(unit: UnitId, mode: AiMode, reason: &str) -> Self {
        Self {
            unit,
            mode,
            kind: ActionKind::Idle,
            reserve_node: None,
            reason: reason.to_string(),
        }
    }

    /// Move toward `goal` as far as the unit's time units allow
    ///
    /// Falls back to idling when not even the first step is affordable.
    pub fn move_toward(
        ctx: &DecisionContext<'_>,
        mode: AiMode,
        goal: Position,
        reason: &str,
    ) -> Option<Self> {
        let unit = ctx.unit;
        let (stop, cost) = ctx.advance_toward(goal)?;
        if stop == unit.position {
            return Some(Self::idle(unit.id, mode, "out of time units"));
        }
        Some(Self {
            unit: unit.id,
            mode,
            kind: ActionKind::Move { goal, stop, cost },
            reserve_node: None,
            reason: reason.to_string(),
        })
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.kind, ActionKind::Idle)
    }
}

/// Last escape search result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscapeCache {
    /// Needs a fresh search
    #[default]
    Stale,
    Destination(Position),
    /// Search ran and found nowhere to go
    Nowhere,
}

/// AI state attached to a unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiState {
    pub mode: AiMode,
    /// Node the unit last stood on
    #[serde(default)]
    pub from_node: Option<NodeId>,
    /// Node the unit is patrolling toward
    #[serde(default)]
    pub to_node: Option<NodeId>,
    #[serde(default)]
    pub target: Option<UnitId>,
    #[serde(default)]
    pub last_known_target: Option<Position>,
    /// Scouts roam the whole node graph; others follow links
    pub scout: bool,
    #[serde(skip)]
    pub escape: EscapeCache,
}

impl AiState {
    pub fn new(scout: bool) -> Self {
        Self {
            mode: AiMode::Patrol,
            from_node: None,
            to_node: None,
            target: None,
            last_known_target: None,
            scout,
            escape: EscapeCache::Stale,
        }
    }

    /// A committed move invalidates a cached escape aimed elsewhere
    pub fn note_moved_toward(&mut self, goal: Position) {
        if self.escape != EscapeCache::Destination(goal) {
            self.escape = EscapeCache::Stale;
        }
    }
}

/// Everything one activation decided, before it is committed
#[derive(Debug, Clone)]
pub struct AiDecision {
    pub action: AiAction,
    pub escape: EscapeCache,
    pub assessment: Assessment,
}

/// Capability interface for unit brains
pub trait TacticalAi {
    fn decide<R: Rng>(&self, ctx: &DecisionContext<'_>, rng: &mut R) -> AiDecision;
}

/// The stock four-mode brain
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAi;

impl TacticalAi for StandardAi {
    fn decide<R: Rng>(&self, ctx: &DecisionContext<'_>, rng: &mut R) -> AiDecision {
        let unit = ctx.unit;
        let assessment = ctx.assess();

        let current = unit.ai.as_ref().map(|ai| ai.mode).unwrap_or_default();
        let escape = match unit.ai.as_ref().map(|ai| ai.escape) {
            Some(EscapeCache::Stale) | None => match find_escape(ctx, &assessment, rng) {
                Some(destination) => EscapeCache::Destination(destination),
                None => EscapeCache::Nowhere,
            },
            Some(cached) => cached,
        };

        let mut mode = choose_mode(ctx, &assessment, current, rng);
        debug!(unit = unit.id.0, ?mode, spotters = assessment.spotters.len(), "AI mode chosen");

        let action = loop {
            if let Some(action) = mode.evaluate(ctx, &assessment, &escape, rng) {
                break action;
            }
            match mode.fallback() {
                Some(next) => mode = next,
                None => break AiAction::idle(unit.id, mode, "nothing to do"),
            }
        };

        AiDecision {
            action,
            escape,
            assessment,
        }
    }
}

impl BattleState {
    /// Compute and commit the next action of an AI unit
    ///
    /// The search itself is side-effect free; afterwards the unit's mode,
    /// target and escape cache are stored, a chosen patrol node is
    /// allocated and every enemy the unit saw has its exposure reset.
    /// The returned action still has to be executed with `apply_action`.
    pub fn request_action(
        &mut self,
        id: UnitId,
        paths: &dyn PathOracle,
        sight: &dyn VisibilityOracle,
    ) -> Result<AiAction> {
        self.request_action_with(&StandardAi, id, paths, sight)
    }

    pub fn request_action_with(
        &mut self,
        brain: &impl TacticalAi,
        id: UnitId,
        paths: &dyn PathOracle,
        sight: &dyn VisibilityOracle,
    ) -> Result<AiAction> {
        let unit = self.units.get(id.index()).ok_or(BattleError::UnitNotFound(id))?;
        if unit.ai.is_none() || unit.is_incapacitated() {
            return Ok(AiAction::idle(id, AiMode::Patrol, "not under AI control"));
        }

        let decision = {
            let ctx = DecisionContext {
                map: &self.map,
                catalog: &self.catalog,
                nodes: &self.nodes,
                units: &self.units,
                items: &self.items,
                config: &self.config,
                paths,
                sight,
                unit,
            };
            brain.decide(&ctx, &mut self.rng)
        };

        if let Some(node) = decision.action.reserve_node {
            self.nodes.allocate(node, id)?;
        }
        for spotted in &decision.assessment.spotted {
            if let Some(enemy) = self.units.get_mut(spotted.index()) {
                enemy.exposure = Some(0);
            }
        }

        let target = match &decision.action.kind {
            ActionKind::Attack { target } => Some(*target),
            _ => decision.assessment.nearest_target,
        };
        let target_position = target.and_then(|t| self.units.get(t.index())).map(|u| u.position);

        if let Some(ai) = self.units.get_mut(id.index()).and_then(|u| u.ai.as_mut()) {
            ai.mode = decision.action.mode;
            ai.escape = decision.escape;
            if target.is_some() {
                ai.target = target;
                ai.last_known_target = target_position;
            }
            if let Some(node) = decision.action.reserve_node {
                ai.to_node = Some(node);
            }
        }

        Ok(decision.action)
    }
}
