//! SQLite persistence layer for the command log.
//!
//! RULE: Only store.rs talks to the database.
//! Executions never see the store; the engine records what they emit.

use crate::{error::SimResult, types::Tick};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

/// One persisted command, as emitted by one execution on one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandLogEntry {
    pub id: Option<i64>,
    pub run_id: String,
    pub tick: Tick,
    pub execution: String,
    pub command_type: String,
    /// JSON-serialised `Command`.
    pub payload: String,
}

pub struct SimStore {
    conn: Connection,
}

impl SimStore {
    /// Open (or create) the command-log database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    pub fn migrate(&self) -> SimResult<()> {
        self.conn
            .execute_batch(include_str!("../migrations/001_command_log.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, seed as i64, version, 0i64],
        )?;
        Ok(())
    }

    // ── Command log ────────────────────────────────────────────

    pub fn append_command(&self, entry: &CommandLogEntry) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO command_log (run_id, tick, execution, command_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.run_id,
                entry.tick as i64,
                entry.execution,
                entry.command_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn commands_for_tick(&self, run_id: &str, tick: Tick) -> SimResult<Vec<CommandLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, tick, execution, command_type, payload
             FROM command_log WHERE run_id = ?1 AND tick = ?2
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id, tick as i64], |row| {
                Ok(CommandLogEntry {
                    id:           Some(row.get(0)?),
                    run_id:       row.get(1)?,
                    tick:         row.get::<_, i64>(2)? as u64,
                    execution:    row.get(3)?,
                    command_type: row.get(4)?,
                    payload:      row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn command_count(&self, run_id: &str) -> SimResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM command_log WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Per-type totals for a run, most frequent first.
    pub fn command_type_counts(&self, run_id: &str) -> SimResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT command_type, COUNT(*) AS n FROM command_log
             WHERE run_id = ?1 GROUP BY command_type
             ORDER BY n DESC, command_type ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
