use crate::types::{NukeKind, PlayerId, TileRef, UnitId, UnitType};
use serde::{Deserialize, Serialize};

/// Every request an agent can hand back to the driver.
///
/// Commands are inert: the driver validates and applies them. The decision
/// core never mutates world state in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    // ── Spawn phase ───────────────────────────────
    Spawn {
        player: PlayerId,
        tile: TileRef,
    },

    // ── Economy ───────────────────────────────────
    Construct {
        player: PlayerId,
        unit_type: UnitType,
        tile: TileRef,
    },
    UpgradeStructure {
        player: PlayerId,
        unit: UnitId,
    },
    CreateTrainStation {
        player: PlayerId,
        unit: UnitId,
    },
    TradeShip {
        player: PlayerId,
        src_port: UnitId,
        dst_port: UnitId,
    },

    // ── Military ──────────────────────────────────
    /// `target: None` attacks terra nullius.
    Attack {
        player: PlayerId,
        target: Option<PlayerId>,
        troops: u64,
    },
    TransportShip {
        player: PlayerId,
        target: Option<PlayerId>,
        dst: TileRef,
        troops: u64,
    },
    Nuke {
        player: PlayerId,
        kind: NukeKind,
        tile: TileRef,
    },
    SetTargetTroopRatio {
        player: PlayerId,
        ratio: f64,
    },

    // ── Diplomacy ─────────────────────────────────
    Emoji {
        player: PlayerId,
        recipient: PlayerId,
        emoji: String,
    },
    AllianceRequest {
        player: PlayerId,
        recipient: PlayerId,
    },
    AllianceReply {
        player: PlayerId,
        requestor: PlayerId,
        accept: bool,
    },
    StartEmbargo {
        player: PlayerId,
        target: PlayerId,
    },
    StopEmbargo {
        player: PlayerId,
        target: PlayerId,
    },
    UpdateRelation {
        player: PlayerId,
        other: PlayerId,
        delta: i32,
    },
}

impl Command {
    /// Stable name used for the `command_type` column of the command log.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Spawn { .. }               => "spawn",
            Command::Construct { .. }           => "construct",
            Command::UpgradeStructure { .. }    => "upgrade_structure",
            Command::CreateTrainStation { .. }  => "create_train_station",
            Command::TradeShip { .. }           => "trade_ship",
            Command::Attack { .. }              => "attack",
            Command::TransportShip { .. }       => "transport_ship",
            Command::Nuke { .. }                => "nuke",
            Command::SetTargetTroopRatio { .. } => "set_target_troop_ratio",
            Command::Emoji { .. }               => "emoji",
            Command::AllianceRequest { .. }     => "alliance_request",
            Command::AllianceReply { .. }       => "alliance_reply",
            Command::StartEmbargo { .. }        => "start_embargo",
            Command::StopEmbargo { .. }         => "stop_embargo",
            Command::UpdateRelation { .. }      => "update_relation",
        }
    }

    /// True for construction and upgrade requests, the actions that spend
    /// gold against a reserve.
    pub fn is_economic(&self) -> bool {
        matches!(
            self,
            Command::Construct { .. }
                | Command::UpgradeStructure { .. }
                | Command::CreateTrainStation { .. }
        )
    }
}
