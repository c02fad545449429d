//! Reference driver for agent executions.
//!
//! The engine does not own the world. Each call to `tick` receives a
//! read-only view of the current game state, runs every scheduled
//! execution once, and hands back the commands they emitted for the
//! caller to apply.
//!
//! RULES:
//!   - Executions added during a tick are initialised at the start of
//!     the next one, then ticked in that same tick.
//!   - During the spawn phase only spawn-phase executions are ticked.
//!   - Inactive executions are dropped at the end of the tick.
//!   - Every emitted command is recorded in the command log.

use crate::{
    command::Command,
    error::SimResult,
    execution::{Execution, Scheduler},
    game::GameView,
    store::{CommandLogEntry, SimStore},
    types::Tick,
};

pub struct SimEngine {
    pub run_id: String,
    seed: u64,
    executions: Vec<Box<dyn Execution>>,
    pending: Vec<Box<dyn Execution>>,
    store: SimStore,
}

impl SimEngine {
    pub fn new(run_id: String, seed: u64, store: SimStore) -> Self {
        Self {
            run_id,
            seed,
            executions: Vec::new(),
            pending: Vec::new(),
            store,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Scheduled executions, not counting those waiting for `init`.
    pub fn active_count(&self) -> usize {
        self.executions.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Advance every execution by one simulation step.
    pub fn tick(&mut self, game: &dyn GameView) -> SimResult<Vec<Command>> {
        let tick = game.ticks();
        for mut execution in self.pending.drain(..) {
            execution.init(game)?;
            self.executions.push(execution);
        }

        let spawn_phase = game.in_spawn_phase();
        let mut emitted = Vec::new();
        for execution in &mut self.executions {
            if !execution.is_active() || (spawn_phase && !execution.active_during_spawn_phase()) {
                continue;
            }
            let commands = execution.tick(tick, game)?;
            for command in &commands {
                let entry = CommandLogEntry {
                    id:           None,
                    run_id:       self.run_id.clone(),
                    tick,
                    execution:    execution.name().to_string(),
                    command_type: command.name().to_string(),
                    payload:      serde_json::to_string(command)?,
                };
                self.store.append_command(&entry)?;
            }
            emitted.extend(commands);
        }

        let before = self.executions.len();
        self.executions.retain(|e| e.is_active());
        if self.executions.len() < before {
            log::debug!("tick={tick} engine: dropped {} inactive executions", before - self.executions.len());
        }
        Ok(emitted)
    }

    /// Query commands for a specific tick from the store.
    /// Used by the determinism test and replay tooling.
    pub fn store_commands_for_tick(&self, tick: Tick) -> SimResult<Vec<CommandLogEntry>> {
        self.store.commands_for_tick(&self.run_id, tick)
    }

    pub fn store(&self) -> &SimStore {
        &self.store
    }
}

impl Scheduler for SimEngine {
    fn add_execution(&mut self, execution: Box<dyn Execution>) {
        self.pending.push(execution);
    }
}
