//! Patrol: walk the node graph

use rand::Rng;

use crate::battle::ai::decision_context::DecisionContext;
use crate::battle::ai::{AiAction, AiMode};
use crate::battle::nodes::{NodeRank, PatrolRequest};
use crate::battle::units::Faction;

/// Keep heading for the reserved node, or reserve a fresh one
pub(super) fn evaluate(ctx: &DecisionContext<'_>, rng: &mut impl Rng) -> Option<AiAction> {
    let unit = ctx.unit;
    let ai = unit.ai.as_ref()?;

    if let Some(node) = ai
        .to_node
        .filter(|id| ctx.nodes.holder(*id) == Some(unit.id))
        .and_then(|id| ctx.nodes.get(id))
    {
        if node.position != unit.position {
            if let Some(action) = AiAction::move_toward(ctx, AiMode::Patrol, node.position, "continuing patrol") {
                return Some(action);
            }
        }
    }

    let officer_ranks: Vec<NodeRank> = if unit.rank.is_officer() {
        ctx.config
            .rank_table
            .row(unit.rank)
            .iter()
            .copied()
            .filter(|rank| *rank != NodeRank::Scout)
            .collect()
    } else {
        Vec::new()
    };

    let request = PatrolRequest {
        unit: unit.id,
        scout: ai.scout,
        from: ai.from_node.or_else(|| ctx.nodes.nearest_node(unit.position)),
        footprint: unit.footprint,
        // Danger flags mark the player's grenades; only hostiles heed them
        ignores_danger: unit.faction != Faction::Hostile,
        officer_ranks: &officer_ranks,
        officer_pool_chance: ctx.config.ai.officer_pool_chance,
    };

    let node_id = ctx.nodes.patrol_node(ctx.map, ctx.catalog, &request, rng)?;
    let node = ctx.nodes.get(node_id)?;
    let mut action = AiAction::move_toward(ctx, AiMode::Patrol, node.position, "new patrol node")?;
    action.reserve_node = Some(node_id);
    Some(action)
}
