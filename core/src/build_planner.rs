//! Build/upgrade decision tree shared by the nation agent and the
//! delegated builder.
//!
//! Phase 1 walks a prioritized list of capped steps and stops at the first
//! one that produces a command. Phase 2 shuffles a fixed set of uncapped
//! build/upgrade actions and takes the first that succeeds. Callers differ
//! only in the step list and the gold reserve they pass in.
//!
//! Phase-2 builds have no cap: once every Phase-1 slot is filled, a type
//! can grow past its Phase-1 cap.

use crate::{
    command::Command,
    error::SimResult,
    game::{GameView, PlayerView},
    gold::Gold,
    port_execution::adjusted_spawn_rate,
    rng::RandomSource,
    types::{TileRef, Unit, UnitType},
};
use std::collections::HashSet;

/// Owned tiles inspected per placement attempt on large territories.
pub const MAX_TILE_SAMPLES: usize = 50;
/// Second batch drawn when the first sample yields no buildable tile.
pub const EXTRA_TILE_SAMPLES: usize = 20;
const SAMPLE_DRAWS_PER_TILE: usize = 10;
pub const WARSHIP_SEARCH_RADIUS: i64 = 250;
pub const WARSHIP_SEARCH_ATTEMPTS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    /// Build one more of `unit_type` unless `cap` are already owned or
    /// under construction.
    Structure { unit_type: UnitType, cap: usize },
    /// First warship only, next to a random owned port.
    Warship,
    /// Station on the first City/Port/Factory that lacks one.
    TrainStation,
}

const fn cap(unit_type: UnitType, cap: usize) -> BuildStep {
    BuildStep::Structure { unit_type, cap }
}

pub const NATION_BUILD_ORDER: &[BuildStep] = &[
    cap(UnitType::Port, 1),
    cap(UnitType::City, 1),
    cap(UnitType::MissileSilo, 1),
    cap(UnitType::City, 2),
    BuildStep::Warship,
    BuildStep::TrainStation,
    cap(UnitType::MissileSilo, 2),
    cap(UnitType::Port, 2),
    cap(UnitType::City, 3),
    cap(UnitType::SAMLauncher, 1),
    cap(UnitType::Port, 3),
    cap(UnitType::City, 4),
    BuildStep::Warship,
    cap(UnitType::Factory, 1),
    cap(UnitType::City, 5),
];

pub const DELEGATED_BUILD_ORDER: &[BuildStep] = &[
    cap(UnitType::Port, 1),
    cap(UnitType::City, 2),
    BuildStep::Warship,
    BuildStep::TrainStation,
    cap(UnitType::MissileSilo, 1),
    cap(UnitType::MissileSilo, 2),
    cap(UnitType::Port, 2),
    cap(UnitType::City, 3),
    cap(UnitType::SAMLauncher, 1),
    cap(UnitType::Port, 3),
    cap(UnitType::City, 4),
    BuildStep::Warship,
    cap(UnitType::Factory, 1),
    cap(UnitType::City, 5),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionAction {
    Build(UnitType),
    Upgrade(UnitType),
}

pub const EXPANSION_TYPES: [UnitType; 5] = [
    UnitType::Port,
    UnitType::City,
    UnitType::MissileSilo,
    UnitType::SAMLauncher,
    UnitType::Factory,
];

/// The ten Phase-2 actions in their canonical (pre-shuffle) order.
pub fn expansion_actions() -> Vec<ExpansionAction> {
    EXPANSION_TYPES
        .iter()
        .map(|&t| ExpansionAction::Build(t))
        .chain(EXPANSION_TYPES.iter().map(|&t| ExpansionAction::Upgrade(t)))
        .collect()
}

/// One planning pass for one player on one tick.
pub struct BuildPlanner<'a, R: RandomSource> {
    game: &'a dyn GameView,
    player: &'a dyn PlayerView,
    rng: &'a mut R,
    reserve: Gold,
}

impl<'a, R: RandomSource> BuildPlanner<'a, R> {
    pub fn new(
        game: &'a dyn GameView,
        player: &'a dyn PlayerView,
        rng: &'a mut R,
        reserve: Gold,
    ) -> Self {
        Self {
            game,
            player,
            rng,
            reserve,
        }
    }

    /// Runs Phase 1 over `order`, then Phase 2. At most one command.
    pub fn next_command(&mut self, order: &[BuildStep]) -> SimResult<Option<Command>> {
        for &step in order {
            if let Some(cmd) = self.try_step(step)? {
                return Ok(Some(cmd));
            }
        }
        self.expand()
    }

    /// Phase 2 on its own: shuffled build/upgrade attempts until one lands.
    pub fn expand(&mut self) -> SimResult<Option<Command>> {
        let mut actions = expansion_actions();
        self.rng.shuffle(&mut actions);
        for action in actions {
            let cmd = match action {
                ExpansionAction::Build(unit_type) => self.try_build(unit_type)?,
                ExpansionAction::Upgrade(unit_type) => self.try_upgrade(unit_type)?,
            };
            if cmd.is_some() {
                return Ok(cmd);
            }
        }
        Ok(None)
    }

    pub fn try_step(&mut self, step: BuildStep) -> SimResult<Option<Command>> {
        match step {
            BuildStep::Structure { unit_type, cap } => {
                if self.player.units_owned(unit_type) >= cap {
                    return Ok(None);
                }
                self.try_build(unit_type)
            }
            BuildStep::Warship => self.try_warship(),
            BuildStep::TrainStation => Ok(self.try_train_station()),
        }
    }

    fn affordable(&self, unit_type: UnitType) -> bool {
        let cost = self.game.unit_cost(unit_type, self.player);
        self.player.gold().can_afford(cost, self.reserve)
    }

    pub fn try_build(&mut self, unit_type: UnitType) -> SimResult<Option<Command>> {
        if !self.affordable(unit_type) {
            return Ok(None);
        }
        let Some(tile) = self.structure_spawn_tile(unit_type)? else {
            return Ok(None);
        };
        let Some(spawn) = self.player.can_build(unit_type, tile) else {
            return Ok(None);
        };
        log::debug!(
            "tick={} {}: build {unit_type:?} at {spawn}",
            self.game.ticks(),
            self.player.id()
        );
        Ok(Some(Command::Construct {
            player: self.player.id().to_string(),
            unit_type,
            tile: spawn,
        }))
    }

    /// Upgrades the lowest-level instance whose upgrade is beneficial.
    pub fn try_upgrade(&mut self, unit_type: UnitType) -> SimResult<Option<Command>> {
        if !self.game.is_upgradable(unit_type) {
            return Ok(None);
        }
        let units = self.player.units(&[unit_type]);
        if units.is_empty() || !self.affordable(unit_type) {
            return Ok(None);
        }
        let mut best: Option<&Unit> = None;
        for unit in &units {
            if !is_upgrade_beneficial(self.game, self.player, unit) {
                continue;
            }
            if best.map_or(true, |b| unit.level < b.level) {
                best = Some(unit);
            }
        }
        Ok(best.map(|unit| {
            log::debug!(
                "tick={} {}: upgrade {unit_type:?} {:?} from level {}",
                self.game.ticks(),
                self.player.id(),
                unit.id,
                unit.level
            );
            Command::UpgradeStructure {
                player: self.player.id().to_string(),
                unit: unit.id,
            }
        }))
    }

    pub fn try_warship(&mut self) -> SimResult<Option<Command>> {
        let ports = self.player.units(&[UnitType::Port]);
        if ports.is_empty()
            || self.player.units_owned(UnitType::Warship) > 0
            || !self.affordable(UnitType::Warship)
        {
            return Ok(None);
        }
        // Coin flip drawn only once the build is otherwise possible.
        if !self.rng.chance(2) {
            return Ok(None);
        }
        let port = self.rng.rand_element(&ports)?;
        let Some(tile) = self.warship_spawn_tile(port.tile) else {
            return Ok(None);
        };
        let Some(spawn) = self.player.can_build(UnitType::Warship, tile) else {
            return Ok(None);
        };
        Ok(Some(Command::Construct {
            player: self.player.id().to_string(),
            unit_type: UnitType::Warship,
            tile: spawn,
        }))
    }

    pub fn try_train_station(&self) -> Option<Command> {
        if self.game.config().is_unit_disabled(UnitType::Train) {
            return None;
        }
        self.player
            .units(&[])
            .into_iter()
            .find(|u| u.unit_type.accepts_train_station() && !u.has_train_station)
            .map(|u| Command::CreateTrainStation {
                player: self.player.id().to_string(),
                unit: u.id,
            })
    }

    /// Picks an owned tile where `unit_type` can be built, sampling large
    /// territories instead of scanning them.
    pub fn structure_spawn_tile(&mut self, unit_type: UnitType) -> SimResult<Option<TileRef>> {
        let territory = self.player.tiles();
        if territory.is_empty() {
            return Ok(None);
        }
        let sampled = territory.len() > MAX_TILE_SAMPLES;
        let to_check = if sampled {
            self.sample_tiles(territory, MAX_TILE_SAMPLES)
        } else {
            territory.to_vec()
        };
        let mut candidates = self.buildable(unit_type, &to_check);
        if candidates.is_empty() && sampled {
            let extra = self.sample_tiles(territory, EXTRA_TILE_SAMPLES);
            candidates = self.buildable(unit_type, &extra);
        }
        if candidates.is_empty() {
            return Ok(None);
        }

        if unit_type.is_defensive() {
            let border: HashSet<TileRef> = self.player.border_tiles().iter().copied().collect();
            let on_border: Vec<TileRef> = candidates
                .iter()
                .copied()
                .filter(|t| border.contains(t))
                .collect();
            if !on_border.is_empty() {
                return self.rng.rand_element(&on_border).map(|t| Some(*t));
            }
        }

        self.rng.rand_element(&candidates).map(|t| Some(*t))
    }

    fn buildable(&self, unit_type: UnitType, tiles: &[TileRef]) -> Vec<TileRef> {
        tiles
            .iter()
            .copied()
            .filter(|&t| self.player.can_build(unit_type, t).is_some())
            .collect()
    }

    /// Up to `count` distinct tiles, drawn by rejection sampling on indices.
    /// Gives up after `SAMPLE_DRAWS_PER_TILE * count` draws.
    fn sample_tiles(&mut self, tiles: &[TileRef], count: usize) -> Vec<TileRef> {
        let target = count.min(tiles.len());
        let mut used = HashSet::new();
        let mut result = Vec::with_capacity(target);
        for _ in 0..target * SAMPLE_DRAWS_PER_TILE {
            if result.len() == target {
                break;
            }
            let index = self.rng.next_int(0, tiles.len() as i64) as usize;
            if used.insert(index) {
                result.push(tiles[index]);
            }
        }
        result
    }

    fn warship_spawn_tile(&mut self, port_tile: TileRef) -> Option<TileRef> {
        let (px, py) = (self.game.x(port_tile) as i64, self.game.y(port_tile) as i64);
        for _ in 0..WARSHIP_SEARCH_ATTEMPTS {
            let x = self.rng.next_int(px - WARSHIP_SEARCH_RADIUS, px + WARSHIP_SEARCH_RADIUS);
            let y = self.rng.next_int(py - WARSHIP_SEARCH_RADIUS, py + WARSHIP_SEARCH_RADIUS);
            if !self.game.is_valid_coord(x as i32, y as i32) {
                continue;
            }
            let tile = self.game.ref_tile(x as i32, y as i32);
            if self.game.is_ocean(tile) {
                return Some(tile);
            }
        }
        None
    }
}

/// Ports are worth upgrading only while the next level still lowers the
/// trade-ship spawn denominator; every other type always benefits.
pub fn is_upgrade_beneficial(game: &dyn GameView, player: &dyn PlayerView, unit: &Unit) -> bool {
    match unit.unit_type {
        UnitType::Port => {
            let total_ports = player.units(&[UnitType::Port]).len();
            let base = game.config().trade_ship_spawn_rate(total_ports);
            adjusted_spawn_rate(base, unit.level + 1) < adjusted_spawn_rate(base, unit.level)
        }
        _ => true,
    }
}
