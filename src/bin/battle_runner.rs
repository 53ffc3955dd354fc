//! Headless Battle Runner
//!
//! Generates a farmland map, spawns hostiles on the node graph against an
//! idle squad, runs the turn loop and prints a summary.

use std::path::PathBuf;
use std::process::ExitCode;

use battlescape::battle::environment;
use battlescape::battle::terrain::standard;
use battlescape::battle::{
    BattleMap, BattleOutcome, BattleState, BattleUnit, Faction, GridPathfinder, ItemKind,
    ItemLocation, LineOfSight, Node, NodeRank, PartCatalog, PartLayer, TurnLimit, UnitRank,
};
use battlescape::core::{BattleConfig, Result};
use battlescape::core::types::Position;
use clap::Parser;
use rand::Rng;
use serde::Serialize;
use tracing::{error, info};

/// Headless Battle Runner - hostile AI against an idle squad
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run a headless tactical battle and print a summary")]
struct Args {
    /// Map width in tiles
    #[arg(long, default_value_t = 30)]
    width: i32,

    /// Map length in tiles
    #[arg(long, default_value_t = 30)]
    length: i32,

    /// Map levels
    #[arg(long, default_value_t = 2)]
    height: i32,

    /// Full turns before the battle is called a defeat
    #[arg(long, default_value_t = 20)]
    turns: u32,

    /// Hostile units to spawn
    #[arg(long, default_value_t = 6)]
    hostiles: usize,

    /// Player soldiers to deploy
    #[arg(long, default_value_t = 4)]
    soldiers: usize,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Tuning overrides (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Terrain part catalog (TOML)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Write the final battle state here
    #[arg(long)]
    save: Option<PathBuf>,

    /// Use the binary tile block when saving
    #[arg(long)]
    compact: bool,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Print the battle log to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct BattleSummary {
    battle_id: String,
    seed: u64,
    outcome: String,
    turns: u32,
    hostiles_standing: usize,
    soldiers_standing: usize,
    attacks: usize,
    burning_tiles: usize,
    events: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "battle runner failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let seed = args.seed.unwrap_or_else(rand::random);
    let config = match &args.config {
        Some(path) => BattleConfig::load(path)?,
        None => BattleConfig::default(),
    };
    let catalog = match &args.catalog {
        Some(path) => PartCatalog::load(path)?,
        None => PartCatalog::standard(),
    };

    let map = BattleMap::flat(args.width.max(8), args.length.max(8), args.height.max(1), standard::GROUND);
    let mut battle = BattleState::new(map, catalog, config, seed);
    battle.turn.limit = Some(TurnLimit {
        turns: args.turns,
        outcome: BattleOutcome::Defeat,
    });

    dress_map(&mut battle);
    lay_nodes(&mut battle);
    deploy(&mut battle, args.hostiles, args.soldiers);

    let paths = GridPathfinder::new();
    let sight = LineOfSight::new();
    battle.begin_battle();

    while !battle.is_finished() {
        while let Some(id) = battle.select_next_unit(true, true, false) {
            // A unit keeps acting until it idles, goes down or the battle ends
            for _ in 0..3 {
                let action = battle.request_action(id, &paths, &sight)?;
                battle.apply_action(&action, &sight)?;
                battle.resolve_reactions(id, &sight)?;
                let down = battle.get_unit(id).map_or(true, |u| u.is_out());
                if action.is_idle() || down || battle.is_finished() {
                    break;
                }
            }
            if battle.is_finished() {
                break;
            }
        }
        if battle.is_finished() {
            break;
        }
        battle.end_turn();
    }

    if args.verbose {
        for event in &battle.battle_log {
            eprintln!("  [{}] {:?}: {}", event.turn, event.event_type, event.description);
        }
    }

    let standing = |faction: Faction| {
        battle
            .units
            .iter()
            .filter(|u| u.original_faction == faction && !u.is_out())
            .count()
    };
    let summary = BattleSummary {
        battle_id: battle.id.0.to_string(),
        seed,
        outcome: format!("{:?}", battle.outcome),
        turns: battle.turn.turn,
        hostiles_standing: standing(Faction::Hostile),
        soldiers_standing: standing(Faction::Player),
        attacks: battle
            .battle_log
            .iter()
            .filter(|e| {
                matches!(
                    e.event_type,
                    battlescape::battle::BattleEventType::UnitAttacked { .. }
                )
            })
            .count(),
        burning_tiles: battle.map.burning_tiles().len(),
        events: battle.battle_log.len(),
    };

    match args.format.as_str() {
        "text" => {
            println!("Battle Result");
            println!("=============");
            println!("Outcome: {}", summary.outcome);
            println!("Turns: {}", summary.turns);
            println!("Hostiles standing: {}", summary.hostiles_standing);
            println!("Soldiers standing: {}", summary.soldiers_standing);
            println!("Attacks: {}", summary.attacks);
            println!("Burning tiles: {}", summary.burning_tiles);
            println!("Seed: {}", summary.seed);
        }
        other => {
            if other != "json" {
                eprintln!("Unknown format '{}', defaulting to json", other);
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    if let Some(path) = &args.save {
        battle.save_to_file(path, args.compact)?;
    }
    Ok(())
}

/// Grass, bushes, crates and one walled farmhouse with a plank loft
fn dress_map(battle: &mut BattleState) {
    let (width, length) = (battle.map.width(), battle.map.length());
    for y in 0..length {
        for x in 0..width {
            let pos = Position::new(x, y, 0);
            let roll: f64 = battle.rng.gen();
            if roll < 0.3 {
                battle.map.set_part(pos, PartLayer::Floor, Some(standard::GRASS));
            }
            if x > 2 && roll > 0.97 {
                battle.map.set_part(pos, PartLayer::Object, Some(standard::CRATE));
            } else if x > 2 && roll > 0.94 {
                battle.map.set_part(pos, PartLayer::Object, Some(standard::BUSH));
            }
        }
    }

    let (cx, cy) = (width / 2, length / 2);
    for d in -3..=3 {
        battle.map.set_part(Position::new(cx - 3, cy + d, 0), PartLayer::WestWall, Some(standard::WALL));
        battle.map.set_part(Position::new(cx + 4, cy + d, 0), PartLayer::WestWall, Some(standard::WALL));
        battle.map.set_part(Position::new(cx + d, cy - 3, 0), PartLayer::NorthWall, Some(standard::WALL));
        battle.map.set_part(Position::new(cx + d, cy + 4, 0), PartLayer::NorthWall, Some(standard::WALL));
    }
    // Doorway on the west side
    battle.map.set_part(Position::new(cx - 3, cy, 0), PartLayer::WestWall, None);
    if battle.map.height() > 1 {
        for y in cy - 3..=cy + 3 {
            for x in cx - 3..=cx + 3 {
                battle.map.set_part(Position::new(x, y, 1), PartLayer::Floor, Some(standard::PLANK_FLOOR));
            }
        }
    }

    let spark = Position::new(
        battle.rng.gen_range(3..width),
        battle.rng.gen_range(0..length),
        0,
    );
    if environment::ignite(&mut battle.map, &battle.catalog, spark, 100, &mut battle.rng) {
        info!(%spark, "field fire started");
    }
}

/// A node every few tiles east of the deployment zone, linked to its
/// west and north neighbours
fn lay_nodes(battle: &mut BattleState) {
    const SPACING: i32 = 4;
    const RANKS: [NodeRank; 6] = [
        NodeRank::Soldier,
        NodeRank::Scout,
        NodeRank::Leader,
        NodeRank::Navigator,
        NodeRank::Engineer,
        NodeRank::Medic,
    ];

    let (width, length) = (battle.map.width(), battle.map.length());
    let mut grid = Vec::new();
    for (row, y) in (1..length).step_by(SPACING as usize).enumerate() {
        for (col, x) in (width / 3..width).step_by(SPACING as usize).enumerate() {
            let pos = Position::new(x, y, 0);
            let free = battle.map.can_place(&battle.catalog, pos, Default::default(), None);
            let id = free.then(|| {
                let mut node = Node::new(pos, RANKS[(row + col) % RANKS.len()]);
                node.patrol_priority = battle.rng.gen_range(1..=5);
                node.spawn_weight = battle.rng.gen_range(1..=3);
                battle.nodes.add(node)
            });
            grid.push(((row, col), id));
        }
    }

    let lookup = |row: usize, col: usize| {
        grid.iter()
            .find(|((r, c), _)| *r == row && *c == col)
            .and_then(|(_, id)| *id)
    };
    let mut links = Vec::new();
    for ((row, col), id) in &grid {
        let Some(id) = id else { continue };
        if *col > 0 {
            links.extend(lookup(*row, col - 1).map(|west| (*id, west)));
        }
        if *row > 0 {
            links.extend(lookup(row - 1, *col).map(|north| (*id, north)));
        }
    }
    for (a, b) in links {
        battle.nodes.link(a, b);
    }
}

fn deploy(battle: &mut BattleState, hostiles: usize, soldiers: usize) {
    const RANKS: [UnitRank; 4] = [
        UnitRank::Soldier,
        UnitRank::Soldier,
        UnitRank::Navigator,
        UnitRank::Leader,
    ];
    for i in 0..hostiles {
        let alien = BattleUnit::new("sectoid", Faction::Hostile)
            .with_rank(RANKS[i % RANKS.len()])
            .with_ai();
        match battle.spawn_unit(alien) {
            Some(id) => {
                battle
                    .items
                    .add("plasma pistol", ItemKind::Weapon, ItemLocation::Carried(id));
            }
            None => info!(index = i, "no spawn node left for hostile"),
        }
    }

    let length = battle.map.length();
    let mut placed = 0;
    for y in (1..length).step_by(2) {
        if placed == soldiers {
            break;
        }
        let soldier = BattleUnit::new("rookie", Faction::Player);
        if let Ok(id) = battle.add_unit(soldier, Position::new(1, y, 0)) {
            battle
                .items
                .add("rifle", ItemKind::Weapon, ItemLocation::Carried(id));
            placed += 1;
        }
    }
}
