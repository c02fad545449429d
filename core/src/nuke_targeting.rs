//! Nuclear target selection, threat assessment and launch policy.
//!
//! `NukePlanner` belongs to a single nation agent. It remembers the tiles
//! it struck recently (to spread strikes out) and when it last emptied its
//! silos at each enemy.

use crate::{
    command::Command,
    error::SimResult,
    game::{GameView, PlayerView},
    geometry::{bounding_box, closest_two_tiles, manhattan_ball, within_euclidean},
    gold::Gold,
    rng::RandomSource,
    types::{IncomingAttack, NukeKind, PlayerId, PlayerType, TileRef, Tick, UnitType},
};
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Strikes older than this no longer repel new targets.
pub const RECENT_STRIKE_TICKS: Tick = 500;
pub const MASS_RETALIATION_COOLDOWN: Tick = 500;

pub const SCORE_RADIUS: u32 = 25;
pub const SAM_PENALTY_RADIUS: u32 = 50;
pub const SAM_PENALTY: i64 = 50_000;
pub const SILO_DISTANCE_WEIGHT: f64 = 30.0;
pub const RECENT_STRIKE_PENALTY: i64 = 1_000_000;
pub const HIGH_VALUE_TARGET: i64 = 100_000;

/// Score given to the blind strike on an invading army.
pub const FALLBACK_TARGET_VALUE: i64 = 50_000;

const RANDOM_CANDIDATES: usize = 10;
const RANDOM_CANDIDATE_TRIES: usize = 100;
const DEPTH_UNDER_THREAT: u32 = 5;
const DEPTH_NORMAL: u32 = 15;

const TARGET_STRUCTURES: [UnitType; 5] = [
    UnitType::City,
    UnitType::DefensePost,
    UnitType::MissileSilo,
    UnitType::Port,
    UnitType::SAMLauncher,
];

pub fn structure_value(unit_type: UnitType) -> i64 {
    match unit_type {
        UnitType::City        => 25_000,
        UnitType::Port        => 10_000,
        UnitType::MissileSilo => 50_000,
        UnitType::DefensePost => 5_000,
        _                     => 0,
    }
}

/// Troops the enemy is currently sending at `player`.
pub fn incoming_troops_from(player: &dyn PlayerView, enemy: &str, active_only: bool) -> u64 {
    player
        .incoming_attacks()
        .iter()
        .filter(|a| a.attacker == enemy && (a.active || !active_only))
        .map(|a| a.troops)
        .sum()
}

/// Enemy holds over twice our land, over 2.5x our troops, or has more than
/// a quarter of our troop count inbound.
pub fn is_existential_threat(player: &dyn PlayerView, enemy: &dyn PlayerView) -> bool {
    let own_tiles = player.num_tiles_owned().max(1) as u128;
    if enemy.num_tiles_owned() as u128 > 2 * own_tiles {
        return true;
    }
    let own_troops = player.troops().max(1) as u128;
    if enemy.troops() as u128 * 2 > 5 * own_troops {
        return true;
    }
    let incoming = incoming_troops_from(player, enemy.id(), false) as u128;
    incoming * 4 > player.troops() as u128
}

/// Enemy has an active attack running against us, or a warhead in the air
/// over our land.
pub fn is_active_attacker(game: &dyn GameView, player: &dyn PlayerView, enemy: &str) -> bool {
    if player
        .incoming_attacks()
        .iter()
        .any(|a| a.attacker == enemy && a.active)
    {
        return true;
    }
    game.nukes_in_flight().iter().any(|n| {
        n.owner == enemy && game.owner(n.target).is_some_and(|o| o.id() == player.id())
    })
}

/// Strongest affordable warhead for the situation, or `None` when even an
/// atom bomb is out of budget.
pub fn choose_warhead(
    game: &dyn GameView,
    player: &dyn PlayerView,
    budget: Gold,
    target_value: i64,
    existential: bool,
    enemy_has_sam: bool,
) -> Option<NukeKind> {
    let affordable = |kind: NukeKind| budget >= game.unit_cost(kind.unit_type(), player);
    let high_value = target_value > HIGH_VALUE_TARGET;

    if affordable(NukeKind::Mirv) && (existential || (high_value && enemy_has_sam)) {
        Some(NukeKind::Mirv)
    } else if affordable(NukeKind::Hydrogen) && high_value {
        Some(NukeKind::Hydrogen)
    } else if affordable(NukeKind::Atom) {
        Some(NukeKind::Atom)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NukeTarget {
    pub tile: TileRef,
    pub value: i64,
}

#[derive(Debug, Default)]
pub struct NukePlanner {
    recent: VecDeque<(Tick, TileRef)>,
    last_mass_retaliation: BTreeMap<PlayerId, Tick>,
}

impl NukePlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_strike(&mut self, tick: Tick, tile: TileRef) {
        self.recent.push_back((tick, tile));
    }

    pub fn recent_strikes(&self) -> impl Iterator<Item = TileRef> + '_ {
        self.recent.iter().map(|&(_, tile)| tile)
    }

    pub fn last_mass_retaliation(&self, enemy: &str) -> Option<Tick> {
        self.last_mass_retaliation.get(enemy).copied()
    }

    pub fn prune(&mut self, now: Tick) {
        while let Some(&(tick, _)) = self.recent.front() {
            if tick + RECENT_STRIKE_TICKS >= now {
                break;
            }
            self.recent.pop_front();
        }
    }

    /// Value of striking `tile`: enemy structures in blast range, minus SAM
    /// cover, distance from our nearest silo and recent strikes nearby.
    pub fn nuke_tile_score(
        &self,
        game: &dyn GameView,
        player: &dyn PlayerView,
        enemy: &dyn PlayerView,
        tile: TileRef,
    ) -> i64 {
        let structures = enemy.units(&TARGET_STRUCTURES);
        let mut value: i64 = structures
            .iter()
            .filter(|u| within_euclidean(game, tile, u.tile, SCORE_RADIUS))
            .map(|u| structure_value(u.unit_type))
            .sum();

        let sams = structures
            .iter()
            .filter(|u| {
                u.unit_type == UnitType::SAMLauncher
                    && within_euclidean(game, tile, u.tile, SAM_PENALTY_RADIUS)
            })
            .count() as i64;
        value -= SAM_PENALTY * sams;

        let silos: Vec<TileRef> = player
            .units(&[UnitType::MissileSilo])
            .iter()
            .map(|u| u.tile)
            .collect();
        if let Some((silo, _)) = closest_two_tiles(game, &silos, &[tile]) {
            let distance = (game.euclidean_dist_squared(tile, silo) as f64).sqrt();
            value -= (distance * SILO_DISTANCE_WEIGHT) as i64;
        }

        let repeats = self
            .recent_strikes()
            .filter(|&t| within_euclidean(game, tile, t, SCORE_RADIUS))
            .count() as i64;
        value - RECENT_STRIKE_PENALTY * repeats
    }

    /// Best candidate deep enough inside enemy land. Candidates scoring zero
    /// or less are never chosen; the first of equal scores wins.
    pub fn best_target<R: RandomSource>(
        &self,
        game: &dyn GameView,
        player: &dyn PlayerView,
        enemy: &dyn PlayerView,
        existential: bool,
        rng: &mut R,
    ) -> Option<NukeTarget> {
        let mut candidates = Vec::new();
        for _ in 0..RANDOM_CANDIDATES {
            if let Some(tile) = random_territory_tile(game, enemy, rng) {
                candidates.push(tile);
            }
        }
        candidates.extend(enemy.units(&TARGET_STRUCTURES).iter().map(|u| u.tile));

        let depth = if existential { DEPTH_UNDER_THREAT } else { DEPTH_NORMAL };
        let mut seen = HashSet::new();
        let mut best: Option<NukeTarget> = None;
        for tile in candidates {
            if !seen.insert(tile) {
                continue;
            }
            let inside = manhattan_ball(game, tile, depth)
                .into_iter()
                .all(|t| game.owner(t).is_some_and(|o| o.id() == enemy.id()));
            if !inside {
                continue;
            }
            let value = self.nuke_tile_score(game, player, enemy, tile);
            if value > best.map_or(0, |b| b.value) {
                best = Some(NukeTarget { tile, value });
            }
        }
        best
    }

    /// Strikes against `enemy` this tick, if any.
    pub fn plan_strikes<R: RandomSource>(
        &mut self,
        tick: Tick,
        game: &dyn GameView,
        player: &dyn PlayerView,
        enemy: &dyn PlayerView,
        rng: &mut R,
    ) -> SimResult<Vec<Command>> {
        let silos = player.units(&[UnitType::MissileSilo]);
        if silos.is_empty()
            || enemy.player_type() == PlayerType::Bot
            || player.is_on_same_team(enemy.id())
        {
            return Ok(Vec::new());
        }

        let active_attacker = is_active_attacker(game, player, enemy.id());
        let existential = is_existential_threat(player, enemy);
        self.prune(tick);

        // A fallback target is an army in the field: one warhead, never a salvo.
        let (target, fallback) = match self.best_target(game, player, enemy, existential, rng) {
            Some(target) => (target, false),
            None if existential => match self.fallback_target(game, player, enemy.id()) {
                Some(target) => (target, true),
                None => return Ok(Vec::new()),
            },
            None => return Ok(Vec::new()),
        };

        let ready = silos.iter().filter(|s| !s.in_cooldown).count();
        let launches = if fallback {
            1
        } else if active_attacker {
            let incoming = incoming_troops_from(player, enemy.id(), true) as u128;
            let riposte_due = self
                .last_mass_retaliation(enemy.id())
                .map_or(true, |last| tick.saturating_sub(last) > MASS_RETALIATION_COOLDOWN);
            if incoming > 2 * player.troops() as u128 && riposte_due {
                self.last_mass_retaliation.insert(enemy.id().to_string(), tick);
                log::debug!("tick={tick} {}: mass retaliation against {}", player.id(), enemy.id());
                usize::MAX
            } else {
                ready
            }
        } else {
            1
        };

        let enemy_has_sam = !enemy.units(&[UnitType::SAMLauncher]).is_empty();
        let cheapest = game.unit_cost(UnitType::AtomBomb, player);
        let mut budget = player.gold();
        let mut out = Vec::new();
        for _ in 0..launches.min(ready) {
            if budget < cheapest {
                break;
            }
            let Some(kind) =
                choose_warhead(game, player, budget, target.value, existential, enemy_has_sam)
            else {
                break;
            };
            budget = budget.saturating_sub(game.unit_cost(kind.unit_type(), player));
            self.record_strike(tick, target.tile);
            log::debug!(
                "tick={tick} {}: {kind:?} strike on {} (value {})",
                player.id(),
                target.tile,
                target.value
            );
            out.push(Command::Nuke {
                player: player.id().to_string(),
                kind,
                tile: target.tile,
            });
        }
        Ok(out)
    }

    /// Centre of the largest active attack the enemy is running against us.
    fn fallback_target(
        &self,
        game: &dyn GameView,
        player: &dyn PlayerView,
        enemy: &str,
    ) -> Option<NukeTarget> {
        let largest = player
            .incoming_attacks()
            .into_iter()
            .filter(|a| a.attacker == enemy && a.active)
            .fold(None, |best: Option<IncomingAttack>, a| match best {
                Some(b) if b.troops >= a.troops => Some(b),
                _ => Some(a),
            })?;
        let (x, y) = largest.average_position?;
        let (x, y) = (x.round() as i32, y.round() as i32);
        if !game.is_valid_coord(x, y) {
            return None;
        }
        Some(NukeTarget {
            tile: game.ref_tile(x, y),
            value: FALLBACK_TARGET_VALUE,
        })
    }
}

/// Random tile owned by `enemy`, drawn from the box around its border.
fn random_territory_tile<R: RandomSource>(
    game: &dyn GameView,
    enemy: &dyn PlayerView,
    rng: &mut R,
) -> Option<TileRef> {
    let bb = bounding_box(game, enemy.border_tiles())?;
    for _ in 0..RANDOM_CANDIDATE_TRIES {
        let x = rng.next_int(bb.min_x as i64, bb.max_x as i64) as i32;
        let y = rng.next_int(bb.min_y as i64, bb.max_y as i64) as i32;
        if !game.is_valid_coord(x, y) {
            continue;
        }
        let tile = game.ref_tile(x, y);
        if game.owner(tile).is_some_and(|o| o.id() == enemy.id()) {
            return Some(tile);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_offensive_structures_have_value() {
        assert_eq!(structure_value(UnitType::MissileSilo), 50_000);
        assert_eq!(structure_value(UnitType::SAMLauncher), 0);
        assert_eq!(structure_value(UnitType::Warship), 0);
    }

    #[test]
    fn prune_keeps_strikes_within_window() {
        let mut planner = NukePlanner::new();
        planner.record_strike(100, TileRef(1));
        planner.record_strike(400, TileRef(2));
        planner.prune(600);
        assert_eq!(planner.recent_strikes().collect::<Vec<_>>(), vec![TileRef(1), TileRef(2)]);
        planner.prune(601);
        assert_eq!(planner.recent_strikes().collect::<Vec<_>>(), vec![TileRef(2)]);
    }
}
