//! Phase-1/Phase-2 construction tree shared by both building agents.

use nationai_core::{
    build_planner::{is_upgrade_beneficial, BuildPlanner, DELEGATED_BUILD_ORDER, NATION_BUILD_ORDER},
    command::Command,
    game::{GameView, PlayerView},
    gold::Gold,
    rng::RandomSource,
    testing::{GridWorld, GridWorldBuilder, ScriptedRandom},
    types::{PlayerType, TileRef, UnitId, UnitType},
};

/// 8x6 map, ocean along the bottom row, "p" owning the 40 land tiles.
fn coastal(gold: u128) -> GridWorldBuilder {
    GridWorldBuilder::new(8, 6)
        .ocean_rect(0, 5, 7, 5)
        .player_with("p", PlayerType::Human, |p| p.gold = Gold::new(gold))
        .claim_rect("p", 0, 0, 7, 4)
}

fn plan(world: &GridWorld, reserve: u128, chance: bool) -> Option<Command> {
    let player = world.player("p").unwrap();
    let mut rng = ScriptedRandom::new(chance);
    BuildPlanner::new(world, player, &mut rng, Gold::new(reserve))
        .next_command(NATION_BUILD_ORDER)
        .unwrap()
}

#[test]
fn never_spends_into_the_reserve() {
    // Port costs 125k: 624_999 - 125_000 is one short of the reserve.
    let world = coastal(624_999).build();
    assert_eq!(plan(&world, 500_000, true), None);

    let world = coastal(625_000).build();
    let cmd = plan(&world, 500_000, true);
    assert_eq!(
        cmd,
        Some(Command::Construct {
            player: "p".into(),
            unit_type: UnitType::Port,
            tile: world.ref_tile(0, 4),
        })
    );
}

#[test]
fn emitted_cost_always_fits_above_reserve() {
    for gold in [0u128, 100_000, 700_000, 1_200_000, 3_000_000] {
        let world = coastal(gold).build();
        let player = world.player("p").unwrap();
        let reserve = Gold::new(500_000);
        if let Some(Command::Construct { unit_type, .. }) = plan(&world, 500_000, true) {
            let cost = world.unit_cost(unit_type, player);
            assert!(player.gold().can_afford(cost, reserve), "gold={gold} {unit_type:?}");
        }
    }
}

#[test]
fn phase_one_skips_types_at_their_cap() {
    let world = coastal(10_000_000)
        .unit("p", UnitType::Port, 0, 4)
        .unit("p", UnitType::City, 1, 0)
        .build();
    match plan(&world, 0, false) {
        Some(Command::Construct { unit_type, .. }) => assert_eq!(unit_type, UnitType::MissileSilo),
        other => panic!("expected a silo, got {other:?}"),
    }
}

#[test]
fn delegated_order_wants_two_cities_before_a_silo() {
    let world = coastal(10_000_000)
        .unit("p", UnitType::Port, 0, 4)
        .unit("p", UnitType::City, 1, 0)
        .build();
    let player = world.player("p").unwrap();
    let mut rng = ScriptedRandom::new(false);
    let cmd = BuildPlanner::new(&world, player, &mut rng, Gold::ZERO)
        .next_command(DELEGATED_BUILD_ORDER)
        .unwrap();
    match cmd {
        Some(Command::Construct { unit_type, .. }) => assert_eq!(unit_type, UnitType::City),
        other => panic!("expected a city, got {other:?}"),
    }
}

#[test]
fn phase_two_can_exceed_phase_one_caps() {
    // Every Phase-1 slot filled, every station built, one warship out.
    let mut builder = coastal(10_000_000)
        .unit("p", UnitType::Warship, 3, 5)
        .unit("p", UnitType::MissileSilo, 0, 0)
        .unit("p", UnitType::MissileSilo, 1, 0)
        .unit("p", UnitType::SAMLauncher, 2, 0);
    for x in 0..3 {
        builder = builder.unit_with("p", UnitType::Port, x, 4, |u| u.has_train_station = true);
    }
    for x in 0..5 {
        builder = builder.unit_with("p", UnitType::City, x, 1, |u| u.has_train_station = true);
    }
    builder = builder.unit_with("p", UnitType::Factory, 0, 2, |u| u.has_train_station = true);
    let world = builder.build();
    assert_eq!(world.player("p").unwrap().units_owned(UnitType::City), 5);

    // With next_int pinned to its lower bound the shuffle puts "build City"
    // first, taking the player to six cities against a Phase-1 cap of five.
    match plan(&world, 0, false) {
        Some(Command::Construct { unit_type, .. }) => assert_eq!(unit_type, UnitType::City),
        other => panic!("expected a sixth city, got {other:?}"),
    }
}

#[test]
fn port_upgrades_stop_once_spawn_rate_bottoms_out() {
    let world = coastal(0).unit("p", UnitType::Port, 0, 4).build();
    let player = world.player("p").unwrap();
    let mut port = player.units(&[UnitType::Port]).remove(0);

    // One port: base rate 10, denominators 10, 7, 4, 3, 2, 1, 1, ...
    for level in 1..=5 {
        port.level = level;
        assert!(is_upgrade_beneficial(&world, player, &port), "level {level}");
    }
    for level in 6..=8 {
        port.level = level;
        assert!(!is_upgrade_beneficial(&world, player, &port), "level {level}");
    }
}

#[test]
fn other_structures_always_benefit_from_upgrades() {
    let world = coastal(0)
        .unit_with("p", UnitType::City, 1, 1, |u| u.level = 40)
        .build();
    let player = world.player("p").unwrap();
    let city = &player.units(&[UnitType::City])[0];
    assert!(is_upgrade_beneficial(&world, player, city));
}

#[test]
fn upgrade_targets_the_lowest_level_instance() {
    let world = coastal(1_000_000)
        .unit_with("p", UnitType::City, 1, 1, |u| u.level = 3)
        .unit_with("p", UnitType::City, 2, 1, |u| u.level = 2)
        .unit_with("p", UnitType::City, 3, 1, |u| u.level = 4)
        .build();
    let player = world.player("p").unwrap();
    let mut rng = ScriptedRandom::new(false);
    let cmd = BuildPlanner::new(&world, player, &mut rng, Gold::ZERO)
        .try_upgrade(UnitType::City)
        .unwrap();
    assert_eq!(
        cmd,
        Some(Command::UpgradeStructure {
            player: "p".into(),
            unit: UnitId(2),
        })
    );
}

#[test]
fn saturated_port_is_not_upgraded() {
    let world = coastal(1_000_000)
        .unit_with("p", UnitType::Port, 0, 4, |u| u.level = 6)
        .build();
    let player = world.player("p").unwrap();
    let mut rng = ScriptedRandom::new(false);
    let cmd = BuildPlanner::new(&world, player, &mut rng, Gold::ZERO)
        .try_upgrade(UnitType::Port)
        .unwrap();
    assert_eq!(cmd, None);
}

#[test]
fn defensive_structures_prefer_border_tiles() {
    // "p" holds the 5x5 top-left corner; its border is column x=4 and row y=4.
    let world = GridWorldBuilder::new(8, 8)
        .player_with("p", PlayerType::Human, |p| p.gold = Gold::new(10_000_000))
        .claim_rect("p", 0, 0, 4, 4)
        .build();
    let player = world.player("p").unwrap();
    let mut rng = ScriptedRandom::new(false);
    let mut planner = BuildPlanner::new(&world, player, &mut rng, Gold::ZERO);

    match planner.try_build(UnitType::SAMLauncher).unwrap() {
        Some(Command::Construct { tile, .. }) => assert_eq!(tile, world.ref_tile(4, 0)),
        other => panic!("expected a SAM, got {other:?}"),
    }
    match planner.try_build(UnitType::City).unwrap() {
        Some(Command::Construct { tile, .. }) => assert_eq!(tile, world.ref_tile(0, 0)),
        other => panic!("expected a city, got {other:?}"),
    }
}

#[test]
fn large_territories_are_sampled() {
    // 400 owned tiles: more than one sampling batch. A pinned source can only
    // ever draw index 0, so sampling must still terminate.
    let world = GridWorldBuilder::new(20, 20)
        .player_with("p", PlayerType::Human, |p| p.gold = Gold::new(10_000_000))
        .claim_rect("p", 0, 0, 19, 19)
        .build();
    let player = world.player("p").unwrap();
    let mut rng = ScriptedRandom::new(false);
    let tile = BuildPlanner::new(&world, player, &mut rng, Gold::ZERO)
        .structure_spawn_tile(UnitType::City)
        .unwrap();
    assert_eq!(tile, Some(world.ref_tile(0, 0)));
}

/// Draws 0, 1, 2, ... wrapped into each requested range.
struct Stepping(i64);

impl RandomSource for Stepping {
    fn next_int(&mut self, min: i64, max: i64) -> i64 {
        let span = max - min;
        if span <= 0 {
            return min;
        }
        let value = min + self.0 % span;
        self.0 += 1;
        value
    }
}

/// 10x7 map owned by "p" apart from one "q" tile at (5,5). The five top
/// rows are full of cities, so the first 50 stepped samples are all taken
/// and only the extra batch (rows 5 and 6) can find room.
fn crowded() -> GridWorld {
    let builder = GridWorldBuilder::new(10, 7)
        .player_with("p", PlayerType::Human, |p| p.gold = Gold::new(10_000_000))
        .player("q", PlayerType::Human)
        .claim_rect("p", 0, 0, 9, 6)
        .claim_rect("q", 5, 5, 5, 5);
    (0..5)
        .flat_map(|y| (0..10).map(move |x| (x, y)))
        .fold(builder, |b, (x, y)| b.unit("p", UnitType::City, x, y))
        .build()
}

fn stepped_tile(world: &GridWorld, unit_type: UnitType) -> Option<TileRef> {
    let player = world.player("p").unwrap();
    let mut rng = Stepping(0);
    BuildPlanner::new(world, player, &mut rng, Gold::ZERO)
        .structure_spawn_tile(unit_type)
        .unwrap()
}

#[test]
fn extra_batch_finds_room_the_first_batch_missed() {
    let world = crowded();
    // 19 free tiles in the extra batch; the 71st draw picks the 14th: (4,6).
    assert_eq!(stepped_tile(&world, UnitType::City), Some(world.ref_tile(4, 6)));
}

#[test]
fn extra_batch_still_prefers_the_border_for_defences() {
    let world = crowded();
    let border = [world.ref_tile(4, 5), world.ref_tile(6, 5), world.ref_tile(5, 6)];
    let tile = stepped_tile(&world, UnitType::SAMLauncher).unwrap();
    assert!(border.contains(&tile), "{tile:?} is not next to q");
    assert_eq!(tile, world.ref_tile(6, 5));
}

#[test]
fn warship_veto_falls_through_to_train_station() {
    let world = coastal(10_000_000)
        .unit("p", UnitType::Port, 0, 4)
        .unit("p", UnitType::City, 1, 0)
        .unit("p", UnitType::City, 2, 0)
        .unit("p", UnitType::MissileSilo, 3, 0)
        .build();
    let cmd = plan(&world, 0, false);
    assert_eq!(
        cmd,
        Some(Command::CreateTrainStation {
            player: "p".into(),
            unit: UnitId(1),
        })
    );
}

#[test]
fn second_warship_is_never_requested() {
    let world = coastal(10_000_000)
        .unit("p", UnitType::Port, 0, 4)
        .unit("p", UnitType::Warship, 3, 5)
        .build();
    let player = world.player("p").unwrap();
    let mut rng = ScriptedRandom::new(true);
    let cmd = BuildPlanner::new(&world, player, &mut rng, Gold::ZERO)
        .try_warship()
        .unwrap();
    assert_eq!(cmd, None);
}

#[test]
fn train_stations_skip_when_trains_are_disabled() {
    let mut world = coastal(0).unit("p", UnitType::City, 1, 1).build();
    world.config_mut().disabled_units.push(UnitType::Train);
    let player = world.player("p").unwrap();
    let mut rng = ScriptedRandom::new(false);
    let planner = BuildPlanner::new(&world, player, &mut rng, Gold::ZERO);
    assert_eq!(planner.try_train_station(), None);
}
