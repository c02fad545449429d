//! Delegated builder: economy-only automation for human players.

use nationai_core::{
    command::Command,
    delegated_building_execution::{DelegatedBuildingExecution, DelegationSettings},
    error::SimError,
    execution::Execution,
    game::{GameView, PlayerView},
    gold::Gold,
    testing::{GridWorld, GridWorldBuilder, ScriptedRandom},
    types::{PlayerType, UnitType},
};
use std::cell::Cell;
use std::rc::Rc;

fn coastal(player_type: PlayerType, gold: u128) -> GridWorld {
    GridWorldBuilder::new(8, 6)
        .ocean_rect(0, 5, 7, 5)
        .player_with("h", player_type, |p| p.gold = Gold::new(gold))
        .claim_rect("h", 0, 0, 7, 4)
        .build()
}

fn enabled(reserve: u128) -> DelegationSettings {
    DelegationSettings {
        gold_reserve: Gold::new(reserve),
        enabled: true,
    }
}

/// Pinned builder: rate 30, offset 0.
fn scripted(settings: DelegationSettings) -> DelegatedBuildingExecution<ScriptedRandom> {
    DelegatedBuildingExecution::with_random(
        "h",
        ScriptedRandom::new(false),
        Rc::new(Cell::new(settings)),
    )
}

fn first_port(world: &GridWorld) -> Command {
    Command::Construct {
        player: "h".into(),
        unit_type: UnitType::Port,
        tile: world.ref_tile(0, 4),
    }
}

#[test]
fn tick_before_init_is_an_error() {
    let world = coastal(PlayerType::Human, 1_000_000);
    let mut exec = scripted(enabled(0));
    assert!(matches!(
        exec.tick(0, &world),
        Err(SimError::NotInitialized { execution: "delegated_building" })
    ));
}

#[test]
fn disabled_builder_never_acts() {
    let world = coastal(PlayerType::Human, 10_000_000);
    let mut exec = scripted(DelegationSettings::disabled(Gold::new(500_000)));
    exec.init(&world).unwrap();
    for tick in 0..120 {
        assert!(exec.tick(tick, &world).unwrap().is_empty());
    }
    assert!(exec.is_active());
}

#[test]
fn builds_only_on_its_cadence() {
    let world = coastal(PlayerType::Human, 1_000_000);
    let mut exec = scripted(enabled(500_000));
    exec.init(&world).unwrap();
    assert_eq!(exec.build_rate(), 30);
    assert_eq!(exec.build_tick(), 0);

    assert_eq!(exec.tick(0, &world).unwrap(), vec![first_port(&world)]);
    for tick in 1..30 {
        assert!(exec.tick(tick, &world).unwrap().is_empty(), "tick {tick}");
    }
    assert_eq!(exec.tick(30, &world).unwrap(), vec![first_port(&world)]);
}

#[test]
fn gold_at_reserve_is_left_alone() {
    let world = coastal(PlayerType::Human, 500_000);
    let mut exec = scripted(enabled(500_000));
    exec.init(&world).unwrap();
    assert!(exec.tick(0, &world).unwrap().is_empty());

    // Above the reserve but not by a port's worth.
    let world = coastal(PlayerType::Human, 600_000);
    assert!(exec.tick(30, &world).unwrap().is_empty());
}

#[test]
fn settings_change_applies_without_reseeding() {
    let world = coastal(PlayerType::Human, 1_000_000);
    let mut exec = scripted(DelegationSettings::disabled(Gold::new(500_000)));
    exec.init(&world).unwrap();
    let (rate, offset) = (exec.build_rate(), exec.build_tick());

    assert!(exec.tick(0, &world).unwrap().is_empty());
    exec.update_settings(enabled(500_000));
    assert_eq!(exec.tick(30, &world).unwrap(), vec![first_port(&world)]);
    assert_eq!((exec.build_rate(), exec.build_tick()), (rate, offset));

    // A raised reserve through the shared handle holds the builder back.
    exec.settings_handle().set(enabled(900_000));
    assert!(exec.tick(60, &world).unwrap().is_empty());
    assert_eq!(exec.settings(), enabled(900_000));
}

#[test]
fn only_human_players_are_served() {
    let world = coastal(PlayerType::Bot, 10_000_000);
    let mut exec = scripted(enabled(0));
    exec.init(&world).unwrap();
    assert!(exec.tick(0, &world).unwrap().is_empty());
    assert!(exec.is_active());

    let world = GridWorldBuilder::new(4, 4).build();
    assert!(exec.tick(30, &world).unwrap().is_empty());
    assert!(exec.is_active());
}

#[test]
fn dead_player_stops_the_builder() {
    let mut world = coastal(PlayerType::Human, 10_000_000);
    world.setup_mut("h").unwrap().alive = false;
    let mut exec = scripted(enabled(0));
    exec.init(&world).unwrap();
    assert!(exec.tick(0, &world).unwrap().is_empty());
    assert!(!exec.is_active());
}

#[test]
fn follows_the_delegated_build_order() {
    // One port already up: the delegated list wants two cities next.
    let world = GridWorldBuilder::new(8, 6)
        .ocean_rect(0, 5, 7, 5)
        .player_with("h", PlayerType::Human, |p| p.gold = Gold::new(1_000_000))
        .claim_rect("h", 0, 0, 7, 4)
        .unit("h", UnitType::Port, 0, 4)
        .build();
    let mut exec = scripted(enabled(0));
    exec.init(&world).unwrap();
    assert_eq!(
        exec.tick(0, &world).unwrap(),
        vec![Command::Construct {
            player: "h".into(),
            unit_type: UnitType::City,
            tile: world.ref_tile(0, 0),
        }]
    );
}

#[test]
fn long_run_emits_only_economic_commands() {
    let mut world = GridWorldBuilder::new(30, 20)
        .ocean_rect(0, 15, 29, 19)
        .player_with("h", PlayerType::Human, |p| p.gold = Gold::new(3_000_000))
        .player("rival", PlayerType::Bot)
        .claim_rect("h", 0, 0, 14, 14)
        .claim_rect("rival", 15, 0, 29, 14)
        .build();
    let mut exec = DelegatedBuildingExecution::new("game-3", "h", enabled(200_000));
    exec.init(&world).unwrap();

    let mut issued = 0;
    for tick in 0..900 {
        world.set_tick(tick);
        for cmd in exec.tick(tick, &world).unwrap() {
            assert!(cmd.is_economic(), "{cmd:?}");
            world.apply(&cmd);
            issued += 1;
        }
        world.advance();
    }
    assert!(issued > 0);
    assert!(world.player("h").unwrap().gold() >= Gold::new(200_000));
}
