//! Auto-builder acting on behalf of a human player.
//!
//! Runs the same build/upgrade tree as the nation agent, without any of
//! the military or diplomatic behaviour. The player switches it on and
//! chooses how much gold it must leave untouched.

use crate::{
    build_planner::{BuildPlanner, DELEGATED_BUILD_ORDER},
    command::Command,
    error::{SimError, SimResult},
    execution::{on_cadence, Execution},
    game::GameView,
    gold::Gold,
    rng::{PseudoRandom, RandomSource},
    types::{PlayerId, PlayerType, Tick},
};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;

/// Separates the delegated builder's random stream from the player's
/// other agents.
pub const DELEGATION_SEED_SALT: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationSettings {
    pub gold_reserve: Gold,
    pub enabled: bool,
}

impl DelegationSettings {
    pub fn disabled(gold_reserve: Gold) -> Self {
        Self {
            gold_reserve,
            enabled: false,
        }
    }
}

/// Settings cell shared between the running agent and whoever adjusts it.
/// Single-threaded by construction: the simulation never crosses threads.
pub type SharedSettings = Rc<Cell<DelegationSettings>>;

pub struct DelegatedBuildingExecution<R: RandomSource = PseudoRandom> {
    player_id: PlayerId,
    random: R,
    build_rate: u64,
    build_tick: u64,
    settings: SharedSettings,
    initialized: bool,
    active: bool,
}

impl DelegatedBuildingExecution<PseudoRandom> {
    pub fn new(game_id: &str, player_id: impl Into<PlayerId>, settings: DelegationSettings) -> Self {
        let player_id = player_id.into();
        let random = PseudoRandom::for_player(&player_id, game_id, DELEGATION_SEED_SALT);
        Self::with_random(player_id, random, Rc::new(Cell::new(settings)))
    }
}

impl<R: RandomSource> DelegatedBuildingExecution<R> {
    pub fn with_random(player_id: impl Into<PlayerId>, mut random: R, settings: SharedSettings) -> Self {
        let build_rate = random.next_int(30, 60) as u64;
        let build_tick = random.next_int(0, build_rate as i64) as u64;
        Self {
            player_id: player_id.into(),
            random,
            build_rate,
            build_tick,
            settings,
            initialized: false,
            active: true,
        }
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn build_rate(&self) -> u64 {
        self.build_rate
    }

    pub fn build_tick(&self) -> u64 {
        self.build_tick
    }

    pub fn settings(&self) -> DelegationSettings {
        self.settings.get()
    }

    /// Handle for changing settings after the agent has been scheduled.
    pub fn settings_handle(&self) -> SharedSettings {
        Rc::clone(&self.settings)
    }

    /// Takes effect on the next eligible tick. Cadence is unaffected.
    pub fn update_settings(&self, settings: DelegationSettings) {
        self.settings.set(settings);
    }
}

impl<R: RandomSource> Execution for DelegatedBuildingExecution<R> {
    fn name(&self) -> &'static str {
        "delegated_building"
    }

    fn init(&mut self, _game: &dyn GameView) -> SimResult<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, tick: Tick, game: &dyn GameView) -> SimResult<Vec<Command>> {
        if !self.initialized {
            return Err(SimError::NotInitialized { execution: self.name() });
        }
        let settings = self.settings.get();
        if !settings.enabled || !on_cadence(tick, self.build_rate, self.build_tick) {
            return Ok(Vec::new());
        }

        // Unknown or non-human players are left alone and looked up again
        // next time.
        let Some(player) = game.player(&self.player_id) else {
            return Ok(Vec::new());
        };
        if player.player_type() != PlayerType::Human {
            return Ok(Vec::new());
        }
        if !player.is_alive() {
            self.active = false;
            return Ok(Vec::new());
        }
        if player.gold() <= settings.gold_reserve {
            return Ok(Vec::new());
        }

        let mut planner =
            BuildPlanner::new(game, player, &mut self.random, settings.gold_reserve);
        let cmd = planner.next_command(DELEGATED_BUILD_ORDER)?;
        if let Some(cmd) = &cmd {
            log::debug!("tick={tick} delegated_building: {} -> {}", self.player_id, cmd.name());
        }
        Ok(cmd.into_iter().collect())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn active_during_spawn_phase(&self) -> bool {
        false
    }
}
