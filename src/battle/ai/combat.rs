//! Combat: shoot the nearest enemy, or get a sightline to it

use ordered_float::OrderedFloat;

use crate::battle::ai::decision_context::{Assessment, DecisionContext};
use crate::battle::ai::{ActionKind, AiAction, AiMode};
use crate::core::types::Position;

pub(super) fn evaluate(ctx: &DecisionContext<'_>, assessment: &Assessment) -> Option<AiAction> {
    let unit = ctx.unit;
    if !ctx.items.is_armed(unit.id) {
        return None;
    }

    let target_id = assessment.nearest_target.or_else(|| {
        assessment
            .known_enemies
            .iter()
            .filter_map(|id| ctx.get_unit(*id))
            .min_by_key(|enemy| {
                OrderedFloat((enemy.position.distance_sq(&unit.position) as f32).sqrt())
            })
            .map(|enemy| enemy.id)
    })?;
    let target = ctx.get_unit(target_id)?;
    let attack_cost = ctx.config.ai.attack_cost;

    if ctx.sees(unit, target.position) {
        if unit.time_units >= attack_cost {
            return Some(AiAction {
                unit: unit.id,
                mode: AiMode::Combat,
                kind: ActionKind::Attack { target: target.id },
                reserve_node: None,
                reason: "attacking nearest enemy".to_string(),
            });
        }
        return None;
    }

    // Cheapest tile with a sightline, preferring one that leaves time to fire
    let mut best: Option<(bool, u32, Position)> = None;
    for candidate in ctx.local_area(ctx.config.ai.search_radius) {
        if candidate == unit.position || !ctx.can_stand(candidate) {
            continue;
        }
        if !ctx
            .sight
            .has_line_of_sight(ctx.map, ctx.catalog, candidate, target.position)
        {
            continue;
        }
        let Some(cost) = ctx.route_cost(candidate) else {
            continue;
        };
        let can_fire = unit.time_units.saturating_sub(cost) >= attack_cost;
        let better = match best {
            None => true,
            Some((best_fire, best_cost, _)) => {
                (can_fire && !best_fire) || (can_fire == best_fire && cost < best_cost)
            }
        };
        if better {
            best = Some((can_fire, cost, candidate));
        }
    }

    let (_, _, tile) = best?;
    AiAction::move_toward(ctx, AiMode::Combat, tile, "moving for a clear shot")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::battle_map::BattleMap;
    use crate::battle::items::{ItemKind, ItemLocation, ItemStore};
    use crate::battle::nodes::NodeGraph;
    use crate::battle::pathfinding::GridPathfinder;
    use crate::battle::terrain::{standard, PartCatalog, PartLayer};
    use crate::battle::units::{BattleUnit, Faction};
    use crate::battle::visibility::{LineOfSight, VisibilityOracle};
    use crate::core::config::BattleConfig;
    use crate::core::types::UnitId;

    fn duel(map: BattleMap, alien_at: Position, soldier_at: Position, armed: bool) -> Option<AiAction> {
        let catalog = PartCatalog::standard();
        let mut map = map;
        let mut alien = BattleUnit::new("sectoid", Faction::Hostile).with_ai();
        alien.id = UnitId(0);
        alien.position = alien_at;
        let mut soldier = BattleUnit::new("rookie", Faction::Player);
        soldier.id = UnitId(1);
        soldier.position = soldier_at;
        map.set_occupant(alien_at, alien.footprint, Some(alien.id));
        map.set_occupant(soldier_at, soldier.footprint, Some(soldier.id));
        let units = vec![alien, soldier];

        let mut items = ItemStore::new();
        if armed {
            items.add("plasma pistol", ItemKind::Weapon, ItemLocation::Carried(UnitId(0)));
        }
        let nodes = NodeGraph::new();
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
        let mut assessment = ctx.assess();
        // Known through exposure even when out of sight
        if assessment.known_enemies.is_empty() {
            assessment.known_enemies.push(UnitId(1));
        }
        evaluate(&ctx, &assessment)
    }

    #[test]
    fn test_armed_unit_attacks_visible_enemy() {
        let map = BattleMap::flat(10, 10, 1, standard::GROUND);
        let action = duel(map, Position::new(1, 1, 0), Position::new(6, 1, 0), true).expect("attack");
        assert_eq!(action.kind, ActionKind::Attack { target: UnitId(1) });
    }

    #[test]
    fn test_unarmed_unit_does_not_fight() {
        let map = BattleMap::flat(10, 10, 1, standard::GROUND);
        assert!(duel(map, Position::new(1, 1, 0), Position::new(6, 1, 0), false).is_none());
    }

    #[test]
    fn test_moves_around_wall_for_a_shot() {
        let mut map = BattleMap::flat(10, 10, 1, standard::GROUND);
        for y in 0..4 {
            map.set_part(Position::new(4, y, 0), PartLayer::WestWall, Some(standard::WALL));
        }
        let action = duel(map, Position::new(2, 1, 0), Position::new(6, 1, 0), true).expect("reposition");

        let ActionKind::Move { goal, .. } = action.kind else {
            panic!("expected a move, got {:?}", action.kind);
        };
        let map_check = {
            let mut m = BattleMap::flat(10, 10, 1, standard::GROUND);
            for y in 0..4 {
                m.set_part(Position::new(4, y, 0), PartLayer::WestWall, Some(standard::WALL));
            }
            m
        };
        assert!(LineOfSight::new().has_line_of_sight(
            &map_check,
            &PartCatalog::standard(),
            goal,
            Position::new(6, 1, 0)
        ));
    }
}
