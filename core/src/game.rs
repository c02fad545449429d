//! Query surfaces the decision core consumes.
//!
//! RULE: the core only ever reads through these traits. Every change to
//! the world is requested by returning a `Command` from an execution.

use crate::{
    config::GameConfig,
    gold::Gold,
    types::{
        Cell, IncomingAttack, NukeInFlight, PlayerId, PlayerType, Relation, TerrainType, TileRef,
        Tick, Unit, UnitId, UnitType,
    },
};

/// The world: map, players, global unit registry and configuration.
pub trait GameView {
    fn ticks(&self) -> Tick;
    fn in_spawn_phase(&self) -> bool;
    fn config(&self) -> &GameConfig;

    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn terrain(&self, tile: TileRef) -> TerrainType;

    /// Every player known to the game, alive or dead, in a stable order.
    fn players(&self) -> Vec<&dyn PlayerView>;
    fn player(&self, id: &str) -> Option<&dyn PlayerView>;
    /// `None` means the tile is terra nullius.
    fn owner(&self, tile: TileRef) -> Option<&dyn PlayerView>;

    fn unit_cost(&self, unit_type: UnitType, player: &dyn PlayerView) -> Gold;
    fn is_upgradable(&self, unit_type: UnitType) -> bool;
    /// Global count of completed units of a type, across all players.
    fn unit_count(&self, unit_type: UnitType) -> usize;
    /// Looks up a completed unit by id, regardless of owner.
    fn unit(&self, id: UnitId) -> Option<Unit>;
    /// Completed unit of a type standing on a tile.
    fn unit_at(&self, unit_type: UnitType, tile: TileRef) -> Option<Unit>;
    /// Ports the owner of `port` may send trade ships to.
    fn trading_ports(&self, port: UnitId) -> Vec<UnitId>;
    fn nukes_in_flight(&self) -> Vec<NukeInFlight>;

    // ── Derived map queries ───────────────────────────────────

    fn is_valid_coord(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height()
    }

    /// Caller must have checked `is_valid_coord`.
    fn ref_tile(&self, x: i32, y: i32) -> TileRef {
        TileRef(y as u32 * self.width() + x as u32)
    }

    fn x(&self, tile: TileRef) -> i32 {
        (tile.0 % self.width()) as i32
    }

    fn y(&self, tile: TileRef) -> i32 {
        (tile.0 / self.width()) as i32
    }

    fn cell(&self, tile: TileRef) -> Cell {
        Cell::new(self.x(tile), self.y(tile))
    }

    fn is_land(&self, tile: TileRef) -> bool {
        self.terrain(tile).is_land()
    }

    fn is_ocean(&self, tile: TileRef) -> bool {
        self.terrain(tile) == TerrainType::Ocean
    }

    fn has_owner(&self, tile: TileRef) -> bool {
        self.owner(tile).is_some()
    }

    fn owner_id(&self, tile: TileRef) -> Option<PlayerId> {
        self.owner(tile).map(|p| p.id().to_string())
    }

    /// Orthogonal neighbours that lie on the map.
    fn neighbors(&self, tile: TileRef) -> Vec<TileRef> {
        let (x, y) = (self.x(tile), self.y(tile));
        [(x, y - 1), (x + 1, y), (x, y + 1), (x - 1, y)]
            .into_iter()
            .filter(|&(nx, ny)| self.is_valid_coord(nx, ny))
            .map(|(nx, ny)| self.ref_tile(nx, ny))
            .collect()
    }

    /// A land tile touching the ocean.
    fn is_ocean_shore(&self, tile: TileRef) -> bool {
        self.is_land(tile) && self.neighbors(tile).into_iter().any(|n| self.is_ocean(n))
    }

    fn manhattan_dist(&self, a: TileRef, b: TileRef) -> u32 {
        self.x(a).abs_diff(self.x(b)) + self.y(a).abs_diff(self.y(b))
    }

    fn euclidean_dist_squared(&self, a: TileRef, b: TileRef) -> u64 {
        let dx = (self.x(a) - self.x(b)) as i64;
        let dy = (self.y(a) - self.y(b)) as i64;
        (dx * dx + dy * dy) as u64
    }
}

/// One player as seen by an agent.
pub trait PlayerView {
    fn id(&self) -> &str;
    fn player_type(&self) -> PlayerType;
    fn is_alive(&self) -> bool;
    fn is_traitor(&self) -> bool;

    fn gold(&self) -> Gold;
    fn troops(&self) -> u64;
    fn max_troops(&self) -> u64;
    fn target_troop_ratio(&self) -> f64;

    /// Owned tiles in a stable order.
    fn tiles(&self) -> &[TileRef];
    fn border_tiles(&self) -> &[TileRef];
    fn num_tiles_owned(&self) -> usize {
        self.tiles().len()
    }

    /// Completed units of the given types; an empty filter returns all.
    fn units(&self, types: &[UnitType]) -> Vec<Unit>;
    /// Completed units plus those still under construction.
    fn units_owned(&self, unit_type: UnitType) -> usize;
    /// Tile where a unit of this type would be placed, or `None` if it
    /// cannot be built at `tile`.
    fn can_build(&self, unit_type: UnitType, tile: TileRef) -> Option<TileRef>;

    fn relation(&self, other: &str) -> Relation;
    fn is_on_same_team(&self, other: &str) -> bool;
    /// Allied or on the same team.
    fn is_friendly(&self, other: &str) -> bool;
    fn allies(&self) -> Vec<PlayerId>;
    /// Players this player has publicly marked as targets.
    fn targets(&self) -> Vec<PlayerId>;
    fn has_embargo_against(&self, other: &str) -> bool;
    fn can_send_alliance_request(&self, other: &str) -> bool;
    fn incoming_alliance_requests(&self) -> Vec<PlayerId>;

    /// Players owning land adjacent to this player's border.
    fn neighbor_ids(&self) -> Vec<PlayerId>;
    fn shares_border_with(&self, other: &str) -> bool {
        self.neighbor_ids().iter().any(|n| n == other)
    }

    fn incoming_attacks(&self) -> Vec<IncomingAttack>;
}
