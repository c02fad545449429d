//! Periodic trade-ship spawner bound to one port.

use crate::{
    command::Command,
    error::{SimError, SimResult},
    execution::Execution,
    game::GameView,
    rng::{PseudoRandom, RandomSource},
    types::{PlayerId, TileRef, Tick, UnitId, UnitType},
};

/// The spawn roll only happens on one tick in ten.
pub const CHECK_INTERVAL: u64 = 10;

/// Each port level multiplies trade-ship odds by this factor.
pub const LEVEL_MULTIPLIER: f64 = 1.5;

/// Denominator of the per-check spawn chance for a port at `level`.
/// Never drops below 1.
pub fn adjusted_spawn_rate(base_rate: u32, level: u32) -> u32 {
    let multiplier = LEVEL_MULTIPLIER.powi(level as i32 - 1);
    ((base_rate as f64 / multiplier).round() as u32).max(1)
}

pub struct PortExecution {
    player_id: PlayerId,
    tile: TileRef,
    port: Option<UnitId>,
    construction_requested: bool,
    random: Option<PseudoRandom>,
    check_offset: Option<u64>,
    active: bool,
}

impl PortExecution {
    pub fn new(player_id: impl Into<PlayerId>, tile: TileRef) -> Self {
        Self {
            player_id: player_id.into(),
            tile,
            port: None,
            construction_requested: false,
            random: None,
            check_offset: None,
            active: true,
        }
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn port(&self) -> Option<UnitId> {
        self.port
    }

    /// Finds the port on our tile, or requests it the first time round.
    /// Returns `None` while there is nothing to tick yet.
    fn resolve_port(&mut self, game: &dyn GameView, out: &mut Vec<Command>) -> Option<UnitId> {
        if let Some(id) = self.port {
            return Some(id);
        }
        if let Some(unit) = game.unit_at(UnitType::Port, self.tile) {
            self.port = Some(unit.id);
            return self.port;
        }
        if self.construction_requested {
            return None;
        }
        let spawn = game
            .player(&self.player_id)
            .and_then(|p| p.can_build(UnitType::Port, self.tile));
        match spawn {
            Some(spawn) => {
                out.push(Command::Construct {
                    player: self.player_id.clone(),
                    unit_type: UnitType::Port,
                    tile: spawn,
                });
                self.tile = spawn;
                self.construction_requested = true;
            }
            None => {
                log::warn!("player {} cannot build port at {}", self.player_id, self.tile);
                self.active = false;
            }
        }
        None
    }
}

impl Execution for PortExecution {
    fn name(&self) -> &'static str {
        "port"
    }

    fn init(&mut self, game: &dyn GameView) -> SimResult<()> {
        self.random = Some(PseudoRandom::new(game.ticks()));
        self.check_offset = Some(game.ticks() % CHECK_INTERVAL);
        Ok(())
    }

    fn tick(&mut self, tick: Tick, game: &dyn GameView) -> SimResult<Vec<Command>> {
        let Some(offset) = self.check_offset else {
            return Err(SimError::NotInitialized { execution: self.name() });
        };
        let mut out = Vec::new();
        let Some(port_id) = self.resolve_port(game, &mut out) else {
            return Ok(out);
        };

        let Some(port) = game.unit(port_id) else {
            log::debug!("tick={tick} port: {port_id:?} gone, stopping");
            self.active = false;
            return Ok(out);
        };
        if port.owner != self.player_id {
            self.player_id = port.owner.clone();
        }

        if (tick + offset) % CHECK_INTERVAL != 0 {
            return Ok(out);
        }

        let base = game
            .config()
            .trade_ship_spawn_rate(game.unit_count(UnitType::Port));
        let rate = adjusted_spawn_rate(base, port.level);
        let Some(random) = self.random.as_mut() else {
            return Err(SimError::NotInitialized { execution: "port" });
        };
        if !random.chance(rate) {
            return Ok(out);
        }

        let partners = game.trading_ports(port_id);
        if partners.is_empty() {
            return Ok(out);
        }
        let dst = *random.rand_element(&partners)?;
        log::debug!("tick={tick} port: {} trade ship {port_id:?} -> {dst:?}", self.player_id);
        out.push(Command::TradeShip {
            player: self.player_id.clone(),
            src_port: port_id,
            dst_port: dst,
        });
        Ok(out)
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn active_during_spawn_phase(&self) -> bool {
        false
    }
}
