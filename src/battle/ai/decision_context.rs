//! AI's read-only view of the battle
//!
//! Respects what the unit (and, for hostiles, its side) actually knows:
//! an enemy is known when this unit sees it, or when a hostile observer's
//! side has exposed it recently.

use ordered_float::OrderedFloat;

use crate::battle::battle_map::BattleMap;
use crate::battle::items::ItemStore;
use crate::battle::nodes::NodeGraph;
use crate::battle::pathfinding::PathOracle;
use crate::battle::terrain::PartCatalog;
use crate::battle::units::{BattleUnit, Faction};
use crate::battle::visibility::VisibilityOracle;
use crate::core::config::BattleConfig;
use crate::core::types::{Position, UnitId};

/// AI's decision-making context for one unit
pub struct DecisionContext<'a> {
    pub map: &'a BattleMap,
    pub catalog: &'a PartCatalog,
    pub nodes: &'a NodeGraph,
    pub units: &'a [BattleUnit],
    pub items: &'a ItemStore,
    pub config: &'a BattleConfig,
    pub paths: &'a dyn PathOracle,
    pub sight: &'a dyn VisibilityOracle,
    /// The unit deciding
    pub unit: &'a BattleUnit,
}

/// What the deciding unit knows about its enemies this activation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assessment {
    /// Enemies seen by this unit or known to its side
    pub known_enemies: Vec<UnitId>,
    /// Enemies this unit has a sightline to right now
    pub spotted: Vec<UnitId>,
    /// Nearest spotted enemy
    pub nearest_target: Option<UnitId>,
    /// Enemies that can see this unit
    pub spotters: Vec<UnitId>,
}

impl Assessment {
    pub fn has_target(&self) -> bool {
        self.nearest_target.is_some()
    }
}

impl<'a> DecisionContext<'a> {
    pub fn get_unit(&self, id: UnitId) -> Option<&'a BattleUnit> {
        self.units.get(id.index())
    }

    /// Live enemies of the deciding unit
    pub fn enemies(&self) -> impl Iterator<Item = &'a BattleUnit> + '_ {
        let unit = self.unit;
        self.units
            .iter()
            .filter(move |u| !u.is_out() && unit.is_enemy_of(u))
    }

    pub fn sees(&self, observer: &BattleUnit, target: Position) -> bool {
        self.sight.unit_sees(self.map, self.catalog, observer, target)
    }

    /// Enemies able to see `position`
    pub fn spotters_of(&self, position: Position) -> Vec<UnitId> {
        self.enemies()
            .filter(|enemy| self.sees(enemy, position))
            .map(|enemy| enemy.id)
            .collect()
    }

    /// Count and rank the enemies around the deciding unit
    pub fn assess(&self) -> Assessment {
        let unit = self.unit;
        let mut assessment = Assessment::default();

        for enemy in self.enemies() {
            let seen = self.sees(unit, enemy.position);
            let exposed = unit.faction == Faction::Hostile && enemy.exposure.is_some();
            if seen {
                assessment.spotted.push(enemy.id);
            }
            if seen || exposed {
                assessment.known_enemies.push(enemy.id);
            }
        }

        assessment.nearest_target = assessment
            .spotted
            .iter()
            .filter_map(|id| self.get_unit(*id))
            .min_by_key(|enemy| {
                OrderedFloat((enemy.position.distance_sq(&unit.position) as f32).sqrt())
            })
            .map(|enemy| enemy.id);

        assessment.spotters = self.spotters_of(unit.position);
        assessment
    }

    /// Positions of every known enemy
    pub fn threat_positions(&self, assessment: &Assessment) -> Vec<Position> {
        assessment
            .known_enemies
            .iter()
            .filter_map(|id| self.get_unit(*id))
            .map(|enemy| enemy.position)
            .collect()
    }

    /// Could the deciding unit stand at `position`?
    pub fn can_stand(&self, position: Position) -> bool {
        self.map
            .can_place(self.catalog, position, self.unit.footprint, Some(self.unit.id))
    }

    /// Route cost for the deciding unit, `None` when unreachable
    pub fn route_cost(&self, destination: Position) -> Option<u32> {
        self.paths
            .route(self.map, self.catalog, self.unit, destination)
            .map(|route| route.cost)
    }

    /// Furthest tile along the route to `goal` the unit can afford now
    ///
    /// Returns the stopping tile and the time units spent getting there;
    /// `None` when `goal` is unreachable.
    pub fn advance_toward(&self, goal: Position) -> Option<(Position, u32)> {
        let route = self.paths.route(self.map, self.catalog, self.unit, goal)?;
        let budget = self.unit.time_units;
        let mut stop = self.unit.position;
        let mut spent = 0u32;
        for step in route.steps {
            let cost = self.map.tile(step).map_or(u32::MAX, |t| t.move_cost(self.catalog));
            if spent.saturating_add(cost) > budget {
                break;
            }
            spent += cost;
            stop = step;
        }
        Some((stop, spent))
    }

    /// Square of positions on the unit's level within `radius`
    pub fn local_area(&self, radius: i32) -> Vec<Position> {
        let origin = self.unit.position;
        let mut area = Vec::with_capacity(((2 * radius + 1) * (2 * radius + 1)) as usize);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let candidate = origin.offset(dx, dy, 0);
                if self.map.in_bounds(candidate) {
                    area.push(candidate);
                }
            }
        }
        area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::pathfinding::GridPathfinder;
    use crate::battle::terrain::{standard, PartLayer};
    use crate::battle::visibility::LineOfSight;

    struct Fixture {
        map: BattleMap,
        catalog: PartCatalog,
        nodes: NodeGraph,
        units: Vec<BattleUnit>,
        items: ItemStore,
        config: BattleConfig,
        paths: GridPathfinder,
        sight: LineOfSight,
    }

    impl Fixture {
        fn new(units: Vec<(Faction, Position)>) -> Self {
            let map = BattleMap::flat(12, 12, 1, standard::GROUND);
            let units = units
                .into_iter()
                .enumerate()
                .map(|(i, (faction, position))| {
                    let mut unit = BattleUnit::new("trooper", faction);
                    unit.id = UnitId(i as u32);
                    unit.position = position;
                    unit
                })
                .collect();
            Self {
                map,
                catalog: PartCatalog::standard(),
                nodes: NodeGraph::new(),
                units,
                items: ItemStore::new(),
                config: BattleConfig::default(),
                paths: GridPathfinder::new(),
                sight: LineOfSight::new(),
            }
        }

        fn context(&self, unit: usize) -> DecisionContext<'_> {
            DecisionContext {
                map: &self.map,
                catalog: &self.catalog,
                nodes: &self.nodes,
                units: &self.units,
                items: &self.items,
                config: &self.config,
                paths: &self.paths,
                sight: &self.sight,
                unit: &self.units[unit],
            }
        }
    }

    #[test]
    fn test_no_enemies_means_empty_assessment() {
        let fixture = Fixture::new(vec![
            (Faction::Hostile, Position::new(1, 1, 0)),
            (Faction::Hostile, Position::new(2, 2, 0)),
        ]);
        let assessment = fixture.context(0).assess();
        assert_eq!(assessment, Assessment::default());
    }

    #[test]
    fn test_nearest_visible_enemy_is_target() {
        let fixture = Fixture::new(vec![
            (Faction::Hostile, Position::new(0, 0, 0)),
            (Faction::Player, Position::new(6, 0, 0)),
            (Faction::Player, Position::new(3, 3, 0)),
        ]);
        let assessment = fixture.context(0).assess();

        assert_eq!(assessment.spotted.len(), 2);
        assert_eq!(assessment.nearest_target, Some(UnitId(2)));
        assert_eq!(assessment.spotters.len(), 2);
    }

    #[test]
    fn test_walls_hide_enemies() {
        let mut fixture = Fixture::new(vec![
            (Faction::Hostile, Position::new(0, 5, 0)),
            (Faction::Player, Position::new(8, 5, 0)),
        ]);
        for y in 0..12 {
            fixture
                .map
                .set_part(Position::new(4, y, 0), PartLayer::WestWall, Some(standard::WALL));
        }

        let assessment = fixture.context(0).assess();
        assert!(assessment.spotted.is_empty());
        assert!(assessment.spotters.is_empty());
        assert!(!assessment.has_target());

        // Exposed enemies stay known to hostiles without a sightline
        fixture.units[1].exposure = Some(1);
        let assessment = fixture.context(0).assess();
        assert_eq!(assessment.known_enemies, vec![UnitId(1)]);
        assert!(!assessment.has_target());
    }

    #[test]
    fn test_dead_enemies_are_ignored() {
        let mut fixture = Fixture::new(vec![
            (Faction::Hostile, Position::new(0, 0, 0)),
            (Faction::Player, Position::new(2, 0, 0)),
        ]);
        fixture.units[1].status = crate::battle::units::UnitStatus::Dead;
        assert_eq!(fixture.context(0).assess(), Assessment::default());
    }
}
