//! Shared primitive types used across the entire decision core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A simulation tick. All timing is expressed in ticks, never wall-clock time.
pub type Tick = u64;

/// Stable player identifier as handed out by the game.
pub type PlayerId = String;

/// The canonical game identifier, hashed into every agent seed.
pub type GameId = String;

/// Row-major index of a tile on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileRef(pub u32);

impl fmt::Display for TileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Map coordinates. Signed so that offsets can leave the map before
/// being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    City,
    Port,
    Factory,
    MissileSilo,
    #[serde(rename = "sam_launcher")]
    SAMLauncher,
    DefensePost,
    Warship,
    Train,
    AtomBomb,
    HydrogenBomb,
    #[serde(rename = "mirv")]
    MIRV,
}

impl UnitType {
    /// Structures whose levels count towards a nation's dynamic gold reserve.
    pub const BUILDINGS: [UnitType; 6] = [
        UnitType::City,
        UnitType::Port,
        UnitType::Factory,
        UnitType::MissileSilo,
        UnitType::SAMLauncher,
        UnitType::DefensePost,
    ];

    /// Structures that can host a train station.
    pub fn accepts_train_station(&self) -> bool {
        matches!(self, UnitType::City | UnitType::Port | UnitType::Factory)
    }

    pub fn is_defensive(&self) -> bool {
        matches!(self, UnitType::SAMLauncher | UnitType::DefensePost)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainType {
    Plains,
    Highland,
    Mountain,
    Lake,
    Ocean,
}

impl TerrainType {
    pub fn is_land(&self) -> bool {
        !matches!(self, TerrainType::Lake | TerrainType::Ocean)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerType {
    Human,
    Bot,
    FakeHuman,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Impossible,
}

/// Coarse diplomatic standing of one player towards another.
/// Ordered from worst to best so `<=`/`>=` read naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Hostile = 0,
    Distrustful = 1,
    Neutral = 2,
    Friendly = 3,
}

/// A point-in-time view of one unit, as reported by the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub unit_type: UnitType,
    pub owner: PlayerId,
    pub tile: TileRef,
    pub level: u32,
    pub has_train_station: bool,
    pub in_cooldown: bool,
    pub under_construction: bool,
}

/// A troop attack currently targeting a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingAttack {
    pub attacker: PlayerId,
    pub troops: u64,
    pub active: bool,
    /// Centroid of the attack front, if the attack has conquered anything yet.
    pub average_position: Option<(f64, f64)>,
}

/// A nuclear strike that has been launched but not yet detonated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NukeInFlight {
    pub owner: PlayerId,
    pub kind: NukeKind,
    pub target: TileRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NukeKind {
    Atom,
    Hydrogen,
    Mirv,
}

impl NukeKind {
    pub fn unit_type(&self) -> UnitType {
        match self {
            NukeKind::Atom => UnitType::AtomBomb,
            NukeKind::Hydrogen => UnitType::HydrogenBomb,
            NukeKind::Mirv => UnitType::MIRV,
        }
    }
}
