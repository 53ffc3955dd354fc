//! Battle system integration tests

use battlescape::battle::environment;
use battlescape::battle::terrain::standard;
use battlescape::battle::*;
use battlescape::core::types::{Position, UnitId};
use battlescape::core::BattleConfig;

fn open_field(seed: u64) -> BattleState {
    let map = BattleMap::flat(24, 24, 2, standard::GROUND);
    BattleState::new(map, PartCatalog::standard(), BattleConfig::default(), seed)
}

/// Nodes on a 4-tile lattice over the east half, linked west and north
fn lay_lattice(battle: &mut BattleState) {
    let mut ids = Vec::new();
    for (row, y) in (2..22).step_by(4).enumerate() {
        for (col, x) in (10..22).step_by(4).enumerate() {
            let rank = if (row + col) % 2 == 0 { NodeRank::Soldier } else { NodeRank::Scout };
            let id = battle.nodes.add(Node::new(Position::new(x, y, 0), rank));
            ids.push(((row, col), id));
        }
    }
    let find = |row: usize, col: usize| ids.iter().find(|(rc, _)| *rc == (row, col)).map(|(_, id)| *id);
    let mut links = Vec::new();
    for ((row, col), id) in &ids {
        if *col > 0 {
            links.extend(find(*row, col - 1).map(|w| (*id, w)));
        }
        if *row > 0 {
            links.extend(find(row - 1, *col).map(|n| (*id, n)));
        }
    }
    for (a, b) in links {
        battle.nodes.link(a, b);
    }
}

fn assert_world_consistent(battle: &BattleState) {
    // Every occupied tile points at a standing unit covering it
    for tile in battle.map.tiles() {
        if let Some(id) = tile.unit {
            let unit = battle.get_unit(id).expect("occupant exists");
            assert!(!unit.is_out(), "downed unit {:?} still on the grid", id);
            assert!(unit.occupied_cells().contains(&tile.position));
        }
    }
    // And every standing unit is on the grid
    for unit in battle.units.iter().filter(|u| !u.is_out()) {
        for cell in unit.occupied_cells() {
            assert_eq!(battle.map.tile(cell).and_then(|t| t.unit), Some(unit.id));
        }
    }
    // A unit holds at most one node
    let mut holders: Vec<UnitId> = battle
        .nodes
        .nodes()
        .iter()
        .filter_map(|n| battle.nodes.holder(n.id))
        .collect();
    let total = holders.len();
    holders.sort();
    holders.dedup();
    assert_eq!(holders.len(), total, "a unit holds two nodes");
}

#[test]
fn test_full_battle_runs_to_an_outcome() {
    let mut battle = open_field(42);
    lay_lattice(&mut battle);
    battle.turn.limit = Some(TurnLimit {
        turns: 15,
        outcome: BattleOutcome::Defeat,
    });

    for rank in [UnitRank::Soldier, UnitRank::Soldier, UnitRank::Leader, UnitRank::Navigator] {
        let id = battle
            .spawn_unit(BattleUnit::new("sectoid", Faction::Hostile).with_rank(rank).with_ai())
            .expect("lattice has room");
        battle.items.add("plasma pistol", ItemKind::Weapon, ItemLocation::Carried(id));
    }
    for y in [4, 8, 12] {
        let id = battle
            .add_unit(BattleUnit::new("rookie", Faction::Player), Position::new(1, y, 0))
            .expect("deployment zone is clear");
        battle.items.add("rifle", ItemKind::Weapon, ItemLocation::Carried(id));
    }
    assert_world_consistent(&battle);

    let paths = GridPathfinder::new();
    let sight = LineOfSight::new();
    battle.begin_battle();

    let mut last_turn = battle.turn.turn;
    while !battle.is_finished() {
        while let Some(id) = battle.select_next_unit(true, true, false) {
            let action = battle.request_action(id, &paths, &sight).expect("unit exists");
            battle.apply_action(&action, &sight).expect("action is valid");
            battle.resolve_reactions(id, &sight).expect("units exist");
            assert_world_consistent(&battle);
            if battle.is_finished() {
                break;
            }
        }
        if battle.is_finished() {
            break;
        }
        battle.end_turn();
        assert!(battle.turn.turn >= last_turn, "turn counter went backwards");
        assert!(battle.turn.turn <= last_turn + 1);
        last_turn = battle.turn.turn;
    }

    assert_ne!(battle.outcome, BattleOutcome::Undecided);
    assert!(battle.turn.turn <= 16);
    assert!(matches!(
        battle.battle_log.last().map(|e| &e.event_type),
        Some(BattleEventType::BattleEnded { .. })
    ));
}

#[test]
fn test_unspotted_unit_never_escapes() {
    for seed in 0..20 {
        let mut battle = open_field(seed);
        lay_lattice(&mut battle);
        // Enemy sealed behind a wall the alien cannot see through
        for y in 0..24 {
            battle
                .map
                .set_part(Position::new(6, y, 0), PartLayer::WestWall, Some(standard::WALL));
        }
        battle
            .add_unit(BattleUnit::new("rookie", Faction::Player), Position::new(2, 10, 0))
            .expect("free tile");
        let alien = battle
            .spawn_unit(BattleUnit::new("sectoid", Faction::Hostile).with_ai())
            .expect("lattice has room");

        let action = battle
            .request_action(alien, &GridPathfinder::new(), &LineOfSight::new())
            .expect("unit exists");
        assert_ne!(action.mode, AiMode::Escape);
        let ai = battle.units[alien.index()].ai.as_ref().expect("has ai");
        assert_ne!(ai.mode, AiMode::Escape);
    }
}

#[test]
fn test_spotted_and_outgunned_unit_can_escape() {
    let mut config = BattleConfig::default();
    config.mode_odds.patrol = 0.0;
    config.mode_odds.ambush = 0.0;
    config.mode_odds.combat = 0.0;
    let map = BattleMap::flat(24, 24, 1, standard::GROUND);
    let mut battle = BattleState::new(map, PartCatalog::standard(), config, 8);

    let alien = battle
        .add_unit(BattleUnit::new("floater", Faction::Hostile).with_ai(), Position::new(12, 12, 0))
        .expect("free tile");
    battle
        .add_unit(BattleUnit::new("rookie", Faction::Player), Position::new(15, 12, 0))
        .expect("free tile");

    let action = battle
        .request_action(alien, &GridPathfinder::new(), &LineOfSight::new())
        .expect("unit exists");
    assert_eq!(action.mode, AiMode::Escape);
    let ActionKind::Move { stop, .. } = action.kind else {
        panic!("expected an escape move, got {:?}", action.kind);
    };
    assert!(stop.distance(&Position::new(15, 12, 0)) >= 3);

    // Spotted enemies are now known to the alien's side
    assert_eq!(battle.units[1].exposure, Some(0));
}

#[test]
fn test_patrol_reservations_are_exclusive() {
    let mut config = BattleConfig::default();
    config.mode_odds.escape = 0.0;
    config.mode_odds.escape_per_spotter = 0.0;
    let map = BattleMap::flat(24, 24, 1, standard::GROUND);
    let mut battle = BattleState::new(map, PartCatalog::standard(), config, 77);
    lay_lattice(&mut battle);

    let aliens: Vec<UnitId> = (0..5)
        .map(|_| {
            battle
                .spawn_unit(BattleUnit::new("sectoid", Faction::Hostile).with_ai())
                .expect("lattice has room")
        })
        .collect();

    let paths = GridPathfinder::new();
    let sight = LineOfSight::new();
    for _ in 0..4 {
        for id in &aliens {
            let action = battle.request_action(*id, &paths, &sight).expect("unit exists");
            battle.apply_action(&action, &sight).expect("valid action");
            assert_world_consistent(&battle);
        }
        battle.end_turn();
        battle.end_turn();
    }
}

#[test]
fn test_burning_loft_drops_its_occupant() {
    let mut battle = open_field(5);
    let loft = Position::new(5, 5, 1);
    battle.map.set_part(loft, PartLayer::Floor, Some(standard::PLANK_FLOOR));
    let soldier = battle
        .add_unit(BattleUnit::new("rookie", Faction::Player), loft)
        .expect("loft is floored");
    battle
        .add_unit(BattleUnit::new("sectoid", Faction::Hostile), Position::new(20, 20, 0))
        .expect("free tile");
    if let Some(tile) = battle.map.tile_mut(loft) {
        tile.fire = 1;
    }
    battle.begin_battle();

    battle.end_turn();
    let report = battle.end_turn();

    let environment = report.environment.expect("full turn ran the environment");
    assert!(environment.destroyed.contains(&(loft, PartLayer::Floor)));
    assert!(environment.fallen_units.contains(&soldier));
    assert_eq!(battle.units[soldier.index()].position, Position::new(5, 5, 0));
    assert_eq!(battle.map.tile(Position::new(5, 5, 0)).and_then(|t| t.unit), Some(soldier));
}

#[test]
fn test_smoke_never_grows_without_a_source() {
    let mut battle = open_field(9);
    environment::add_smoke(&mut battle.map, Position::new(10, 10, 0), 10);
    battle
        .add_unit(BattleUnit::new("rookie", Faction::Player), Position::new(0, 0, 0))
        .expect("free tile");
    battle
        .add_unit(BattleUnit::new("sectoid", Faction::Hostile), Position::new(23, 23, 0))
        .expect("free tile");
    battle.begin_battle();

    let total = |b: &BattleState| b.map.tiles().iter().map(|t| t.smoke as u32).max().unwrap_or(0);
    let mut previous = total(&battle);
    // Two side changes per full turn
    for _ in 0..24 {
        battle.end_turn();
        let now = total(&battle);
        assert!(now <= previous);
        previous = now;
    }
    assert_eq!(previous, 0);
}
