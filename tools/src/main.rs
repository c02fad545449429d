//! agent-runner: headless driver for the nation agents.
//!
//! Usage:
//!   agent-runner --seed 12345 --ticks 600 --db run.db
//!   agent-runner --seed 12345 --config game.json --ipc-mode

use anyhow::Result;
use nationai_core::{
    command::Command,
    config::GameConfig,
    delegated_building_execution::DelegationSettings,
    delegation_registry::DelegationRegistry,
    engine::SimEngine,
    execution::Scheduler,
    game::GameView,
    gold::Gold,
    nation_execution::{Nation, NationExecution},
    port_execution::PortExecution,
    store::SimStore,
    testing::{GridWorld, GridWorldBuilder},
    types::{Cell, PlayerType, Tick, UnitType},
};
use std::collections::BTreeMap;
use std::env;
use std::io::{self, BufRead, Write};

const MAP_WIDTH: u32 = 80;
const MAP_HEIGHT: u32 = 60;
const SPAWN_PHASE_TICKS: Tick = 30;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Tick {
        count: u64,
    },
    Delegation {
        player_id: String,
        enabled: bool,
        gold_reserve: u64,
    },
    DelegationAll {
        enabled: bool,
        gold_reserve: u64,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct RunnerState {
    tick: Tick,
    in_spawn_phase: bool,
    commands_total: u64,
    last_tick_commands: usize,
    players: Vec<PlayerSummary>,
}

#[derive(serde::Serialize)]
struct PlayerSummary {
    id: String,
    alive: bool,
    tiles: usize,
    troops: u64,
    gold: Gold,
    delegation: Option<DelegationSettings>,
}

struct Runner {
    world: GridWorld,
    engine: SimEngine,
    registry: DelegationRegistry,
    last_tick_commands: usize,
}

impl Runner {
    fn step(&mut self) -> Result<()> {
        let commands = self.engine.tick(&self.world)?;
        for command in &commands {
            if !self.world.apply(command) {
                continue;
            }
            // A newly built port gets its own trade-ship spawner.
            if let Command::Construct {
                player,
                unit_type: UnitType::Port,
                tile,
            } = command
            {
                self.engine
                    .add_execution(Box::new(PortExecution::new(player.clone(), *tile)));
            }
        }
        self.last_tick_commands = commands.len();
        self.world.advance();
        Ok(())
    }

    fn state(&self) -> Result<RunnerState> {
        let players = self
            .world
            .players()
            .into_iter()
            .map(|p| PlayerSummary {
                id: p.id().to_string(),
                alive: p.is_alive(),
                tiles: p.num_tiles_owned(),
                troops: p.troops(),
                gold: p.gold(),
                delegation: self.registry.settings(p.id()),
            })
            .collect();
        Ok(RunnerState {
            tick: self.world.ticks(),
            in_spawn_phase: self.world.in_spawn_phase(),
            commands_total: self.engine.store().command_count(&self.engine.run_id)?,
            last_tick_commands: self.last_tick_commands,
            players,
        })
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ticks = parse_arg(&args, "--ticks", 600u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let config = match string_arg(&args, "--config") {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default_test(),
    };

    if !ipc_mode {
        println!("agent-runner");
        println!("  seed:      {seed}");
        println!("  ticks:     {ticks}");
        println!("  db:        {db}");
        println!();
    }

    let store = SimStore::open(db)?;
    store.migrate()?;
    let run_id = format!("run-{seed}-{}", unix_time());
    store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"))?;

    let game_id = format!("game-{seed}");
    let default_reserve = config.delegation_default_reserve;
    let world = demo_world(config);
    let mut engine = SimEngine::new(run_id, seed, store);

    for (i, (x, y)) in [(15, 12), (60, 12), (15, 45), (60, 45)].into_iter().enumerate() {
        let nation = Nation {
            player_id: format!("nation-{i}"),
            name: format!("Nation {i}"),
            spawn_cell: Cell::new(x, y),
        };
        engine.add_execution(Box::new(NationExecution::new(&game_id, nation)));
    }
    for unit in world.all_units() {
        if unit.unit_type == UnitType::Port {
            engine.add_execution(Box::new(PortExecution::new(unit.owner.clone(), unit.tile)));
        }
    }
    let mut registry = DelegationRegistry::new(game_id, default_reserve);
    registry.init(&world, &mut engine);

    let mut runner = Runner {
        world,
        engine,
        registry,
        last_tick_commands: 0,
    };

    if ipc_mode {
        run_ipc_loop(&mut runner)?;
    } else {
        for _ in 0..ticks {
            runner.step()?;
        }
        print_summary(&runner)?;
    }

    Ok(())
}

/// Two pre-spawned human players on an island split by a channel. Four
/// nation slots are left free for the agents to spawn into.
fn demo_world(config: GameConfig) -> GridWorld {
    GridWorldBuilder::new(MAP_WIDTH, MAP_HEIGHT)
        .config(config)
        .spawn_phase_until(SPAWN_PHASE_TICKS)
        .ocean_rect(0, 28, MAP_WIDTH - 1, 31)
        .ocean_rect(38, 0, 41, MAP_HEIGHT - 1)
        .player_with("human-0", PlayerType::Human, |p| p.gold = Gold::new(2_000_000))
        .player_with("human-1", PlayerType::Human, |p| p.gold = Gold::new(2_000_000))
        .player("nation-0", PlayerType::FakeHuman)
        .player("nation-1", PlayerType::FakeHuman)
        .player("nation-2", PlayerType::FakeHuman)
        .player("nation-3", PlayerType::FakeHuman)
        .claim_rect("human-0", 30, 20, 37, 27)
        .claim_rect("human-1", 42, 32, 49, 39)
        .unit("human-0", UnitType::Port, 33, 27)
        .unit("human-1", UnitType::Port, 45, 32)
        .build()
}

fn run_ipc_loop(runner: &mut Runner) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Unknown runner command: {}", buffer.trim());
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Tick { count } => {
                for _ in 0..count {
                    runner.step()?;
                }
            }
            IpcCommand::Delegation {
                player_id,
                enabled,
                gold_reserve,
            } => {
                let settings = DelegationSettings {
                    gold_reserve: Gold::from(gold_reserve),
                    enabled,
                };
                if !runner.registry.update_player(&player_id, settings) {
                    log::warn!("No delegated builder for {player_id}");
                }
            }
            IpcCommand::DelegationAll {
                enabled,
                gold_reserve,
            } => runner.registry.update_all(DelegationSettings {
                gold_reserve: Gold::from(gold_reserve),
                enabled,
            }),
        }
        writeln!(stdout, "{}", serde_json::to_string(&runner.state()?)?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_summary(runner: &Runner) -> Result<()> {
    let state = runner.state()?;
    println!("=== RUN SUMMARY ===");
    println!("  run_id:         {}", runner.engine.run_id);
    println!("  final tick:     {}", state.tick);
    println!("  commands:       {}", state.commands_total);

    println!();
    println!("=== COMMANDS BY TYPE ===");
    let counts: BTreeMap<String, u64> = runner
        .engine
        .store()
        .command_type_counts(&runner.engine.run_id)?
        .into_iter()
        .collect();
    for (command_type, n) in &counts {
        println!("  {command_type:<24} {n}");
    }

    println!();
    println!("=== PLAYERS ===");
    for p in &state.players {
        println!(
            "  {:<10} | alive: {:<5} | tiles: {:>4} | troops: {:>7} | gold: {}",
            p.id, p.alive, p.tiles, p.troops, p.gold
        );
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn unix_time() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
