//! Full autonomous nation agent.
//!
//! One `NationExecution` plays one computer-controlled nation for the
//! whole game: it picks a spawn, expands, builds, makes and breaks
//! alliances, and goes to war. Every decision is returned as a `Command`.

use crate::{
    behavior::BotBehavior,
    build_planner::{BuildPlanner, NATION_BUILD_ORDER},
    command::Command,
    error::{SimError, SimResult},
    execution::{on_cadence, Execution},
    game::{GameView, PlayerView},
    geometry::closest_two_tiles,
    gold::Gold,
    nuke_targeting::NukePlanner,
    rng::{PseudoRandom, RandomSource},
    types::{
        Cell, Difficulty, PlayerId, PlayerType, Relation, TerrainType, TileRef, Tick, UnitType,
    },
};
use std::collections::{BTreeMap, BTreeSet};

pub const TROOP_CLAMP_THRESHOLD: u64 = 100_000;
pub const CLAMPED_TROOP_RATIO: f64 = 0.7;
pub const EMBARGO_RELATION_MALUS: i32 = -20;
pub const EMOJI_COOLDOWN_TICKS: Tick = 300;

const SPAWN_SEARCH_RADIUS: i64 = 25;
const SPAWN_SEARCH_ATTEMPTS: usize = 50;
const BOAT_SEARCH_RADIUS: i64 = 150;
const BOAT_SEARCH_ATTEMPTS: usize = 500;

const HECKLE_EMOJI: [&str; 2] = ["🤡", "😡"];

/// Reserve that grows with the economy: 1M per five building levels,
/// capped at 50M.
pub fn dynamic_gold_reserve(player: &dyn PlayerView) -> Gold {
    let levels: u128 = player
        .units(&UnitType::BUILDINGS)
        .iter()
        .map(|u| u.level as u128)
        .sum();
    let reserve = Gold::new(levels / 5 * 1_000_000);
    reserve.min(Gold::new(50_000_000))
}

/// Static description of a computer-controlled nation.
#[derive(Debug, Clone, PartialEq)]
pub struct Nation {
    pub player_id: PlayerId,
    pub name: String,
    /// Preferred spawn location; the agent spawns near it.
    pub spawn_cell: Cell,
}

pub struct NationExecution<R: RandomSource = PseudoRandom> {
    nation: Nation,
    random: R,

    attack_rate: u64,
    attack_tick: u64,

    behavior: BotBehavior,
    nukes: NukePlanner,
    initialized: bool,
    first_move: bool,
    active: bool,

    last_emoji_sent: BTreeMap<PlayerId, Tick>,
    embargo_malus_applied: BTreeSet<PlayerId>,
}

impl NationExecution<PseudoRandom> {
    pub fn new(game_id: &str, nation: Nation) -> Self {
        let random = PseudoRandom::for_player(&nation.player_id, game_id, 0);
        Self::with_random(nation, random)
    }
}

impl<R: RandomSource> NationExecution<R> {
    /// Draws the cadence and the war tunables from `random`, in that order.
    pub fn with_random(nation: Nation, mut random: R) -> Self {
        let attack_rate = random.next_int(10, 20) as u64;
        let attack_tick = random.next_int(0, attack_rate as i64) as u64;
        let trigger_ratio = random.next_int(60, 90) as f64 / 100.0;
        let reserve_ratio = random.next_int(30, 60) as f64 / 100.0;
        Self {
            behavior: BotBehavior::new(nation.player_id.clone(), trigger_ratio, reserve_ratio),
            nation,
            random,
            attack_rate,
            attack_tick,
            nukes: NukePlanner::new(),
            initialized: false,
            first_move: true,
            active: true,
            last_emoji_sent: BTreeMap::new(),
            embargo_malus_applied: BTreeSet::new(),
        }
    }

    pub fn nation(&self) -> &Nation {
        &self.nation
    }

    pub fn attack_rate(&self) -> u64 {
        self.attack_rate
    }

    pub fn attack_tick(&self) -> u64 {
        self.attack_tick
    }

    pub fn behavior(&self) -> &BotBehavior {
        &self.behavior
    }

    pub fn nukes(&self) -> &NukePlanner {
        &self.nukes
    }

    /// Players whose embargo against us is currently reflected in our
    /// relations.
    pub fn embargo_malus_applied(&self) -> &BTreeSet<PlayerId> {
        &self.embargo_malus_applied
    }

    fn random_land(&mut self, game: &dyn GameView) -> Option<TileRef> {
        let cell = self.nation.spawn_cell;
        for _ in 0..SPAWN_SEARCH_ATTEMPTS {
            let x = self
                .random
                .next_int(cell.x as i64 - SPAWN_SEARCH_RADIUS, cell.x as i64 + SPAWN_SEARCH_RADIUS);
            let y = self
                .random
                .next_int(cell.y as i64 - SPAWN_SEARCH_RADIUS, cell.y as i64 + SPAWN_SEARCH_RADIUS);
            if !game.is_valid_coord(x as i32, y as i32) {
                continue;
            }
            let tile = game.ref_tile(x as i32, y as i32);
            if !game.is_land(tile) || game.has_owner(tile) {
                continue;
            }
            if game.terrain(tile) == TerrainType::Mountain && self.random.chance(2) {
                continue;
            }
            return Some(tile);
        }
        None
    }

    fn update_relations_from_embargoes(
        &mut self,
        game: &dyn GameView,
        player: &dyn PlayerView,
        out: &mut Vec<Command>,
    ) {
        for other in game.players() {
            if other.id() == player.id() || !other.is_alive() {
                continue;
            }
            let embargoed = other.has_embargo_against(player.id());
            let applied = self.embargo_malus_applied.contains(other.id());
            let delta = if embargoed && !applied {
                self.embargo_malus_applied.insert(other.id().to_string());
                EMBARGO_RELATION_MALUS
            } else if !embargoed && applied {
                self.embargo_malus_applied.remove(other.id());
                -EMBARGO_RELATION_MALUS
            } else {
                continue;
            };
            out.push(Command::UpdateRelation {
                player: player.id().to_string(),
                other: other.id().to_string(),
                delta,
            });
        }
    }

    /// Embargo anyone we are hostile to; lift it once relations recover.
    fn handle_embargoes_to_hostile_nations(
        &self,
        game: &dyn GameView,
        player: &dyn PlayerView,
        out: &mut Vec<Command>,
    ) {
        for other in game.players() {
            if other.id() == player.id() || !other.is_alive() {
                continue;
            }
            let relation = player.relation(other.id());
            let embargoed = player.has_embargo_against(other.id());
            let target = other.id().to_string();
            if relation <= Relation::Hostile && !embargoed {
                out.push(Command::StartEmbargo {
                    player: player.id().to_string(),
                    target,
                });
            } else if relation >= Relation::Neutral && embargoed {
                out.push(Command::StopEmbargo {
                    player: player.id().to_string(),
                    target,
                });
            }
        }
    }

    fn handle_enemies(
        &mut self,
        tick: Tick,
        game: &dyn GameView,
        player: &dyn PlayerView,
        out: &mut Vec<Command>,
    ) -> SimResult<()> {
        self.behavior.forget_old_enemies(tick);
        self.behavior.assist_allies(tick, game, player, out);
        let Some(enemy_id) = self.behavior.select_enemy(tick, game, player) else {
            return Ok(());
        };
        let Some(enemy) = game.player(&enemy_id) else {
            return Ok(());
        };

        self.maybe_send_emoji(tick, player, enemy, out)?;
        let strikes = self
            .nukes
            .plan_strikes(tick, game, player, enemy, &mut self.random)?;
        out.extend(strikes);

        if player.shares_border_with(&enemy_id) {
            self.behavior.send_attack(player, Some(&enemy_id), out);
        } else {
            maybe_send_boat_attack(game, player, enemy, out);
        }
        Ok(())
    }

    fn maybe_send_emoji(
        &mut self,
        tick: Tick,
        player: &dyn PlayerView,
        enemy: &dyn PlayerView,
        out: &mut Vec<Command>,
    ) -> SimResult<()> {
        if enemy.player_type() != PlayerType::Human {
            return Ok(());
        }
        if let Some(&last) = self.last_emoji_sent.get(enemy.id()) {
            if tick.saturating_sub(last) <= EMOJI_COOLDOWN_TICKS {
                return Ok(());
            }
        }
        self.last_emoji_sent.insert(enemy.id().to_string(), tick);
        let emoji = self.random.rand_element(&HECKLE_EMOJI)?;
        out.push(Command::Emoji {
            player: player.id().to_string(),
            recipient: enemy.id().to_string(),
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    fn handle_units(
        &mut self,
        game: &dyn GameView,
        player: &dyn PlayerView,
        out: &mut Vec<Command>,
    ) -> SimResult<()> {
        let reserve = dynamic_gold_reserve(player);
        let mut planner = BuildPlanner::new(game, player, &mut self.random, reserve);
        if let Some(cmd) = planner.next_command(NATION_BUILD_ORDER)? {
            out.push(cmd);
        }
        Ok(())
    }

    /// General expansion pass: grab free land, probe by sea, or pick a
    /// bordering nation to fight.
    fn maybe_attack(
        &mut self,
        game: &dyn GameView,
        player: &dyn PlayerView,
        out: &mut Vec<Command>,
    ) -> SimResult<()> {
        let foreign_border: Vec<TileRef> = player
            .border_tiles()
            .iter()
            .flat_map(|&t| game.neighbors(t))
            .filter(|&t| game.is_land(t) && game.owner(t).map_or(true, |o| o.id() != player.id()))
            .collect();

        if foreign_border.is_empty() {
            if self.random.chance(10) {
                self.send_boat_randomly(game, player, out)?;
            }
            return Ok(());
        }
        if self.random.chance(20) {
            return self.send_boat_randomly(game, player, out);
        }

        let owners: Vec<Option<&dyn PlayerView>> =
            foreign_border.iter().map(|&t| game.owner(t)).collect();
        if owners.iter().any(Option::is_none) {
            self.behavior.send_attack(player, None, out);
            return Ok(());
        }

        let mut seen = BTreeSet::new();
        let mut enemies: Vec<&dyn PlayerView> = owners
            .into_iter()
            .flatten()
            .filter(|p| seen.insert(p.id().to_string()))
            .collect();
        enemies.sort_by_key(|p| p.troops());

        if self.random.chance(20) {
            let to_ally = *self.random.rand_element(&enemies)?;
            if player.can_send_alliance_request(to_ally.id()) {
                out.push(Command::AllianceRequest {
                    player: player.id().to_string(),
                    recipient: to_ally.id().to_string(),
                });
                return Ok(());
            }
        }

        let to_attack = if self.random.chance(2) {
            enemies[0]
        } else {
            *self.random.rand_element(&enemies)?
        };
        if self.should_attack(game, player, to_attack) {
            self.behavior.send_attack(player, Some(to_attack.id()), out);
        }
        Ok(())
    }

    /// Teammates are never attacked. Friends get even odds, and reluctant
    /// targets (see `should_discourage_attack`) far less.
    pub fn should_attack(
        &mut self,
        game: &dyn GameView,
        player: &dyn PlayerView,
        other: &dyn PlayerView,
    ) -> bool {
        if player.is_on_same_team(other.id()) {
            return false;
        }
        let discouraged = should_discourage_attack(game, other);
        if player.is_friendly(other.id()) {
            self.random.chance(if discouraged { 200 } else { 2 })
        } else if discouraged {
            self.random.chance(4)
        } else {
            true
        }
    }

    fn send_boat_randomly(
        &mut self,
        game: &dyn GameView,
        player: &dyn PlayerView,
        out: &mut Vec<Command>,
    ) -> SimResult<()> {
        let shore: Vec<TileRef> = player
            .border_tiles()
            .iter()
            .copied()
            .filter(|&t| game.is_ocean_shore(t))
            .collect();
        if shore.is_empty() {
            return Ok(());
        }
        let src = *self.random.rand_element(&shore)?;
        let Some(dst) = self.random_ocean_shore_tile(game, player, src) else {
            return Ok(());
        };
        out.push(Command::TransportShip {
            player: player.id().to_string(),
            target: game.owner_id(dst),
            dst,
            troops: player.troops() / 5,
        });
        Ok(())
    }

    /// Shore tile near `tile` that is free or held by someone unfriendly.
    fn random_ocean_shore_tile(
        &mut self,
        game: &dyn GameView,
        player: &dyn PlayerView,
        tile: TileRef,
    ) -> Option<TileRef> {
        let (x, y) = (game.x(tile) as i64, game.y(tile) as i64);
        for _ in 0..BOAT_SEARCH_ATTEMPTS {
            let rx = self.random.next_int(x - BOAT_SEARCH_RADIUS, x + BOAT_SEARCH_RADIUS);
            let ry = self.random.next_int(y - BOAT_SEARCH_RADIUS, y + BOAT_SEARCH_RADIUS);
            if !game.is_valid_coord(rx as i32, ry as i32) {
                continue;
            }
            let candidate = game.ref_tile(rx as i32, ry as i32);
            if !game.is_ocean_shore(candidate) {
                continue;
            }
            match game.owner(candidate) {
                None => return Some(candidate),
                Some(owner) if !owner.is_friendly(player.id()) => return Some(candidate),
                Some(_) => {}
            }
        }
        None
    }
}

/// Non-traitor humans on the easier difficulties are attacked reluctantly.
fn should_discourage_attack(game: &dyn GameView, other: &dyn PlayerView) -> bool {
    !other.is_traitor()
        && matches!(game.config().difficulty, Difficulty::Easy | Difficulty::Medium)
        && other.player_type() == PlayerType::Human
}

fn maybe_send_boat_attack(
    game: &dyn GameView,
    player: &dyn PlayerView,
    enemy: &dyn PlayerView,
    out: &mut Vec<Command>,
) {
    if player.is_on_same_team(enemy.id()) {
        return;
    }
    let shore = |p: &dyn PlayerView| -> Vec<TileRef> {
        p.border_tiles()
            .iter()
            .copied()
            .filter(|&t| game.is_ocean_shore(t))
            .collect()
    };
    let Some((_, dst)) = closest_two_tiles(game, &shore(player), &shore(enemy)) else {
        return;
    };
    out.push(Command::TransportShip {
        player: player.id().to_string(),
        target: Some(enemy.id().to_string()),
        dst,
        troops: player.troops() / 5,
    });
}

impl<R: RandomSource> Execution for NationExecution<R> {
    fn name(&self) -> &'static str {
        "nation"
    }

    fn init(&mut self, _game: &dyn GameView) -> SimResult<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, tick: Tick, game: &dyn GameView) -> SimResult<Vec<Command>> {
        if !self.initialized {
            return Err(SimError::NotInitialized { execution: self.name() });
        }
        if !on_cadence(tick, self.attack_rate, self.attack_tick) {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        if game.in_spawn_phase() {
            match self.random_land(game) {
                Some(tile) => out.push(Command::Spawn {
                    player: self.nation.player_id.clone(),
                    tile,
                }),
                None => log::warn!("tick={tick} nation: cannot spawn {}", self.nation.name),
            }
            return Ok(out);
        }

        let Some(player) = game.player(&self.nation.player_id) else {
            return Ok(out);
        };
        if !player.is_alive() {
            log::debug!("tick={tick} nation: {} is dead, stopping", self.nation.name);
            self.active = false;
            return Ok(out);
        }

        if self.first_move {
            self.first_move = false;
            self.behavior.send_attack(player, None, &mut out);
            return Ok(out);
        }

        if player.troops() > TROOP_CLAMP_THRESHOLD
            && player.target_troop_ratio() > CLAMPED_TROOP_RATIO
        {
            out.push(Command::SetTargetTroopRatio {
                player: player.id().to_string(),
                ratio: CLAMPED_TROOP_RATIO,
            });
        }

        self.update_relations_from_embargoes(game, player, &mut out);
        self.behavior.handle_alliance_requests(game, player, &mut out);
        self.handle_enemies(tick, game, player, &mut out)?;
        self.handle_units(game, player, &mut out)?;
        self.handle_embargoes_to_hostile_nations(game, player, &mut out);
        self.maybe_attack(game, player, &mut out)?;

        log::debug!("tick={tick} nation: {} issued {} commands", self.nation.name, out.len());
        Ok(out)
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn active_during_spawn_phase(&self) -> bool {
        true
    }
}
