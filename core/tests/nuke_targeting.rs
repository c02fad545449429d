//! Threat assessment, target scoring and launch policy.

use nationai_core::{
    command::Command,
    game::GameView,
    gold::Gold,
    nuke_targeting::{
        choose_warhead, is_active_attacker, is_existential_threat, NukePlanner,
        RECENT_STRIKE_PENALTY,
    },
    testing::{GridWorld, GridWorldBuilder, ScriptedRandom},
    types::{IncomingAttack, NukeKind, PlayerType, UnitType},
};

/// "n" holds the 10 western columns, the human "e" the 30 eastern ones.
fn lopsided(gold: u128) -> GridWorldBuilder {
    GridWorldBuilder::new(40, 20)
        .player_with("n", PlayerType::FakeHuman, |p| p.gold = Gold::new(gold))
        .player("e", PlayerType::Human)
        .claim_rect("n", 0, 0, 9, 19)
        .claim_rect("e", 10, 0, 39, 19)
}

fn attack_from_e(troops: u64, average_position: Option<(f64, f64)>) -> IncomingAttack {
    IncomingAttack {
        attacker: "e".into(),
        troops,
        active: true,
        average_position,
    }
}

fn strikes(planner: &mut NukePlanner, world: &GridWorld, tick: u64) -> Vec<Command> {
    let player = world.player("n").unwrap();
    let enemy = world.player("e").unwrap();
    planner
        .plan_strikes(tick, world, player, enemy, &mut ScriptedRandom::new(false))
        .unwrap()
}

#[test]
fn triple_territory_is_an_existential_threat() {
    let world = lopsided(0).build();
    let n = world.player("n").unwrap();
    let e = world.player("e").unwrap();
    assert!(is_existential_threat(n, e));
    assert!(!is_existential_threat(e, n));
}

#[test]
fn troop_superiority_and_inbound_armies_are_threats() {
    let world = GridWorldBuilder::new(20, 10)
        .player_with("n", PlayerType::FakeHuman, |p| p.troops = 10_000)
        .player_with("e", PlayerType::Human, |p| p.troops = 25_001)
        .claim_rect("n", 0, 0, 9, 9)
        .claim_rect("e", 10, 0, 19, 9)
        .build();
    assert!(is_existential_threat(world.player("n").unwrap(), world.player("e").unwrap()));

    let world = GridWorldBuilder::new(20, 10)
        .player_with("n", PlayerType::FakeHuman, |p| {
            p.troops = 10_000;
            p.incoming_attacks.push(IncomingAttack {
                active: false,
                ..attack_from_e(2_501, None)
            });
        })
        .player("e", PlayerType::Human)
        .claim_rect("n", 0, 0, 9, 9)
        .claim_rect("e", 10, 0, 19, 9)
        .build();
    assert!(is_existential_threat(world.player("n").unwrap(), world.player("e").unwrap()));
}

#[test]
fn mirv_is_preferred_under_existential_threat() {
    let world = lopsided(0).build();
    let n = world.player("n").unwrap();

    let pick = |budget: u128, value: i64, existential: bool, sam: bool| {
        choose_warhead(&world, n, Gold::new(budget), value, existential, sam)
    };
    assert_eq!(pick(40_000_000, 0, true, false), Some(NukeKind::Mirv));
    assert_eq!(pick(10_000_000, 0, true, false), Some(NukeKind::Atom));
    assert_eq!(pick(10_000_000, 150_000, false, false), Some(NukeKind::Hydrogen));
    assert_eq!(pick(40_000_000, 150_000, false, true), Some(NukeKind::Mirv));
    assert_eq!(pick(40_000_000, 150_000, false, false), Some(NukeKind::Hydrogen));
    assert_eq!(pick(500_000, 0, true, false), None);
}

#[test]
fn existential_strike_uses_a_mirv_on_the_deepest_structure() {
    let world = lopsided(40_000_000)
        .unit("n", UnitType::MissileSilo, 2, 10)
        .unit("e", UnitType::City, 25, 10)
        .build();
    let mut planner = NukePlanner::new();

    let cmds = strikes(&mut planner, &world, 1_000);
    let target = world.ref_tile(25, 10);
    assert_eq!(
        cmds,
        vec![Command::Nuke {
            player: "n".into(),
            kind: NukeKind::Mirv,
            tile: target,
        }]
    );
    assert_eq!(planner.recent_strikes().collect::<Vec<_>>(), vec![target]);
}

#[test]
fn tile_score_weighs_structures_sams_and_silo_distance() {
    let world = GridWorldBuilder::new(60, 20)
        .player("n", PlayerType::FakeHuman)
        .player("e", PlayerType::Human)
        .claim_rect("n", 0, 0, 9, 19)
        .claim_rect("e", 10, 0, 59, 19)
        .unit("n", UnitType::MissileSilo, 5, 10)
        .unit("e", UnitType::City, 20, 10)
        .unit("e", UnitType::SAMLauncher, 30, 10)
        .build();
    let n = world.player("n").unwrap();
    let e = world.player("e").unwrap();
    let planner = NukePlanner::new();

    // City 25_000, one SAM in cover -50_000, silo 15 tiles away -450.
    let score = planner.nuke_tile_score(&world, n, e, world.ref_tile(20, 10));
    assert_eq!(score, -25_450);
}

#[test]
fn recent_strikes_push_targets_away() {
    let world = lopsided(0)
        .unit("n", UnitType::MissileSilo, 2, 10)
        .unit("e", UnitType::City, 25, 10)
        .build();
    let n = world.player("n").unwrap();
    let e = world.player("e").unwrap();
    let tile = world.ref_tile(25, 10);
    let near = world.ref_tile(30, 12);
    let far = world.ref_tile(0, 0);

    let mut planner = NukePlanner::new();
    let fresh = planner.nuke_tile_score(&world, n, e, tile);
    planner.record_strike(0, near);
    let repeated = planner.nuke_tile_score(&world, n, e, tile);
    assert!(fresh - repeated >= RECENT_STRIKE_PENALTY);

    let mut elsewhere = NukePlanner::new();
    elsewhere.record_strike(0, far);
    assert_eq!(elsewhere.nuke_tile_score(&world, n, e, tile), fresh);
}

#[test]
fn bots_and_teammates_are_never_nuked() {
    let bot_world = GridWorldBuilder::new(40, 20)
        .player_with("n", PlayerType::FakeHuman, |p| p.gold = Gold::new(40_000_000))
        .player("e", PlayerType::Bot)
        .claim_rect("n", 0, 0, 9, 19)
        .claim_rect("e", 10, 0, 39, 19)
        .unit("n", UnitType::MissileSilo, 2, 10)
        .unit("e", UnitType::City, 25, 10)
        .build();
    assert!(strikes(&mut NukePlanner::new(), &bot_world, 1_000).is_empty());

    let mut team_world = lopsided(40_000_000)
        .unit("n", UnitType::MissileSilo, 2, 10)
        .unit("e", UnitType::City, 25, 10)
        .build();
    team_world.setup_mut("n").unwrap().team = Some(1);
    team_world.setup_mut("e").unwrap().team = Some(1);
    team_world.refresh();
    assert!(strikes(&mut NukePlanner::new(), &team_world, 1_000).is_empty());
}

#[test]
fn no_silo_no_strike() {
    let world = lopsided(40_000_000).unit("e", UnitType::City, 25, 10).build();
    assert!(strikes(&mut NukePlanner::new(), &world, 1_000).is_empty());
}

#[test]
fn budget_below_an_atom_bomb_launches_nothing() {
    let world = lopsided(700_000)
        .unit("n", UnitType::MissileSilo, 2, 10)
        .unit("e", UnitType::City, 25, 10)
        .build();
    assert!(strikes(&mut NukePlanner::new(), &world, 1_000).is_empty());
}

#[test]
fn active_attackers_include_warheads_over_our_land() {
    let world = lopsided(0).nuke_in_flight("e", NukeKind::Atom, 3, 3).build();
    let n = world.player("n").unwrap();
    assert!(is_active_attacker(&world, n, "e"));

    let world = lopsided(0).nuke_in_flight("e", NukeKind::Atom, 30, 3).build();
    let n = world.player("n").unwrap();
    assert!(!is_active_attacker(&world, n, "e"));

    let mut world = lopsided(0).build();
    world
        .setup_mut("n")
        .unwrap()
        .incoming_attacks
        .push(attack_from_e(1_000, None));
    let n = world.player("n").unwrap();
    assert!(is_active_attacker(&world, n, "e"));
}

#[test]
fn mass_retaliation_empties_silos_once_per_cooldown() {
    let mut world = lopsided(40_000_000)
        .unit("n", UnitType::MissileSilo, 2, 10)
        .unit("n", UnitType::MissileSilo, 2, 5)
        .unit("e", UnitType::City, 25, 10)
        .build();
    world
        .setup_mut("n")
        .unwrap()
        .incoming_attacks
        .push(attack_from_e(100_000, None));
    let mut planner = NukePlanner::new();

    let cmds = strikes(&mut planner, &world, 1_000);
    let kinds: Vec<NukeKind> = cmds
        .iter()
        .filter_map(|c| match c {
            Command::Nuke { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect();
    // Both silos fire: a MIRV, then an atom bomb from what is left.
    assert_eq!(kinds, vec![NukeKind::Mirv, NukeKind::Atom]);
    assert_eq!(planner.last_mass_retaliation("e"), Some(1_000));

    strikes(&mut planner, &world, 1_100);
    assert_eq!(planner.last_mass_retaliation("e"), Some(1_000));

    let cmds = strikes(&mut planner, &world, 1_600);
    assert!(!cmds.is_empty());
    assert_eq!(planner.last_mass_retaliation("e"), Some(1_600));
}

#[test]
fn invading_army_is_struck_when_nothing_else_qualifies() {
    let mut world = lopsided(1_000_000)
        .unit("n", UnitType::MissileSilo, 2, 10)
        .build();
    world
        .setup_mut("n")
        .unwrap()
        .incoming_attacks
        .push(attack_from_e(1_000, Some((20.4, 5.6))));

    let cmds = strikes(&mut NukePlanner::new(), &world, 1_000);
    assert_eq!(
        cmds,
        vec![Command::Nuke {
            player: "n".into(),
            kind: NukeKind::Atom,
            tile: world.ref_tile(20, 6),
        }]
    );
}

#[test]
fn invading_army_draws_a_single_warhead_even_with_silos_to_spare() {
    let mut world = lopsided(100_000_000)
        .unit("n", UnitType::MissileSilo, 2, 10)
        .unit("n", UnitType::MissileSilo, 2, 5)
        .unit("n", UnitType::MissileSilo, 2, 15)
        .build();
    let n = world.setup_mut("n").unwrap();
    n.troops = 1_000;
    n.incoming_attacks.push(attack_from_e(5_000, Some((20.0, 5.0))));
    let mut planner = NukePlanner::new();

    let cmds = strikes(&mut planner, &world, 1_000);
    assert_eq!(
        cmds,
        vec![Command::Nuke {
            player: "n".into(),
            kind: NukeKind::Mirv,
            tile: world.ref_tile(20, 5),
        }]
    );
    // Overwhelming as the assault is, a salvo was not spent on it.
    assert_eq!(planner.last_mass_retaliation("e"), None);
}
