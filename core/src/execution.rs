//! Execution trait and scheduling seam.
//!
//! RULE: Every agent behaviour implements Execution.
//! The driver calls `init` once, then `tick` once per simulation step
//! until `is_active` turns false. Executions never mutate the world;
//! they return commands for the driver to validate and apply.

use crate::{command::Command, error::SimResult, game::GameView, types::Tick};

/// The contract every scheduled behaviour must fulfill.
pub trait Execution {
    /// Unique stable name for logging and the command log.
    fn name(&self) -> &'static str;

    /// Binds the execution to the live world. Called exactly once, before
    /// the first `tick`.
    fn init(&mut self, game: &dyn GameView) -> SimResult<()>;

    /// Called once per simulation step.
    ///
    /// Returns the commands this execution wants applied. An empty vec is
    /// the normal "nothing to do" outcome. Errors are reserved for
    /// programming errors in the driver (e.g. ticking before `init`).
    fn tick(&mut self, tick: Tick, game: &dyn GameView) -> SimResult<Vec<Command>>;

    /// Once false, stays false. The driver stops scheduling the execution.
    fn is_active(&self) -> bool;

    /// Whether the driver should tick this execution during the pre-game
    /// spawn phase.
    fn active_during_spawn_phase(&self) -> bool;
}

/// Anything that accepts new executions for scheduling.
pub trait Scheduler {
    fn add_execution(&mut self, execution: Box<dyn Execution>);
}

/// True when `tick` falls on an execution's own cadence slot.
pub fn on_cadence(tick: Tick, rate: u64, offset: u64) -> bool {
    tick % rate == offset
}
