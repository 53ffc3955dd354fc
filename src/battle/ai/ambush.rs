//! Ambush: wait out of sight along the target's approach

use crate::battle::ai::decision_context::{Assessment, DecisionContext};
use crate::battle::ai::{AiAction, AiMode};
use crate::battle::pathfinding::Route;
use crate::core::types::{Direction, Position};

/// Pick a hidden tile that watches the route the target would take to us
pub(super) fn evaluate(ctx: &DecisionContext<'_>, assessment: &Assessment) -> Option<AiAction> {
    let unit = ctx.unit;
    let target = ctx.get_unit(assessment.nearest_target?)?;
    let tuning = &ctx.config.ai;

    let approach = approach_route(ctx, target)?;
    let watched: Vec<Position> = approach
        .steps
        .iter()
        .take(tuning.ambush_route_window)
        .copied()
        .collect();
    if watched.is_empty() {
        return None;
    }

    let watchers: Vec<_> = assessment
        .known_enemies
        .iter()
        .filter_map(|id| ctx.get_unit(*id))
        .collect();

    let mut best: Option<(i32, Position)> = None;
    for candidate in ctx.local_area(tuning.search_radius) {
        if !ctx.can_stand(candidate) {
            continue;
        }
        if watchers.iter().any(|enemy| ctx.sees(enemy, candidate)) {
            continue;
        }
        let Some(first_seen) = watched
            .iter()
            .position(|step| ctx.sight.has_line_of_sight(ctx.map, ctx.catalog, candidate, *step))
        else {
            continue;
        };
        let Some(cost) = ctx.route_cost(candidate) else {
            continue;
        };

        let score = tuning.ambush_base_score - (cost / 4) as i32 - first_seen as i32;
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, candidate));
        }
    }

    let (_, tile) = best?;
    if tile == unit.position {
        return Some(AiAction::idle(unit.id, AiMode::Ambush, "waiting in ambush"));
    }
    AiAction::move_toward(ctx, AiMode::Ambush, tile, "moving to ambush")
}

/// Cheapest route the target could take to a tile beside the deciding unit
fn approach_route(ctx: &DecisionContext<'_>, target: &crate::battle::units::BattleUnit) -> Option<Route> {
    let unit = ctx.unit;
    Direction::all()
        .into_iter()
        .map(|direction| unit.position.step(direction))
        .filter(|beside| {
            ctx.map
                .can_place(ctx.catalog, *beside, target.footprint, Some(target.id))
        })
        .filter_map(|beside| ctx.paths.route(ctx.map, ctx.catalog, target, beside))
        .min_by_key(|route| route.cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::battle_map::BattleMap;
    use crate::battle::items::ItemStore;
    use crate::battle::nodes::NodeGraph;
    use crate::battle::pathfinding::GridPathfinder;
    use crate::battle::terrain::{standard, PartCatalog, PartLayer};
    use crate::battle::units::{BattleUnit, Faction};
    use crate::battle::visibility::{LineOfSight, VisibilityOracle};
    use crate::core::config::BattleConfig;
    use crate::core::types::UnitId;

    #[test]
    fn test_ambush_tile_is_hidden_from_target() {
        let mut map = BattleMap::flat(12, 12, 1, standard::GROUND);
        // A short wall segment to hide behind
        for y in 2..5 {
            map.set_part(Position::new(6, y, 0), PartLayer::WestWall, Some(standard::WALL));
        }
        let catalog = PartCatalog::standard();

        let mut alien = BattleUnit::new("sectoid", Faction::Hostile).with_ai();
        alien.id = UnitId(0);
        alien.position = Position::new(5, 6, 0);
        let mut soldier = BattleUnit::new("rookie", Faction::Player);
        soldier.id = UnitId(1);
        soldier.position = Position::new(9, 6, 0);
        map.set_occupant(alien.position, alien.footprint, Some(alien.id));
        map.set_occupant(soldier.position, soldier.footprint, Some(soldier.id));
        let units = vec![alien, soldier];

        let nodes = NodeGraph::new();
        let items = ItemStore::new();
        let config = BattleConfig::default();
        let paths = GridPathfinder::new();
        let sight = LineOfSight::new();
        let ctx = DecisionContext {
            map: &map,
            catalog: &catalog,
            nodes: &nodes,
            units: &units,
            items: &items,
            config: &config,
            paths: &paths,
            sight: &sight,
            unit: &units[0],
        };

        let assessment = ctx.assess();
        assert_eq!(assessment.nearest_target, Some(UnitId(1)));

        let action = evaluate(&ctx, &assessment).expect("hidden tile behind the wall");
        assert_eq!(action.mode, AiMode::Ambush);
        let crate::battle::ai::ActionKind::Move { goal, .. } = action.kind else {
            panic!("expected a move, got {:?}", action.kind);
        };
        assert!(!sight.unit_sees(&map, &catalog, &units[1], goal));
    }

    #[test]
    fn test_no_target_no_ambush() {
        let map = BattleMap::flat(6, 6, 1, standard::GROUND);
        let catalog = PartCatalog::standard();
        let mut alien = BattleUnit::new("sectoid", Faction::Hostile).with_ai();
        alien.position = Position::new(2, 2, 0);
        let units = vec![alien];
        let nodes = NodeGraph::new();
        let items = ItemStore::new();
        let config = BattleConfig::default();
        let paths = GridPathfinder::new();
        let sight = LineOfSight::new();
        let ctx = DecisionContext {
            map: &map,
            catalog: &catalog,
            nodes: &nodes,
            units: &units,
            items: &items,
            config: &config,
            paths: &paths,
            sight: &sight,
            unit: &units[0],
        };
        assert!(evaluate(&ctx, &Assessment::default()).is_none());
    }
}
