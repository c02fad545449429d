//! In-memory world and scripted randomness.
//!
//! `GridWorld` is a small rectangular map implementing `GameView` and
//! `PlayerView`. Tests build one with `GridWorldBuilder`; the demo runner
//! also drives one across ticks through `apply` and `advance`.

use crate::{
    command::Command,
    config::GameConfig,
    game::{GameView, PlayerView},
    gold::Gold,
    rng::RandomSource,
    types::{
        IncomingAttack, NukeInFlight, NukeKind, PlayerId, PlayerType, Relation, TerrainType,
        TileRef, Tick, Unit, UnitId, UnitType,
    },
};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::rc::Rc;

// ── Scripted randomness ───────────────────────────────────────

/// Random source with a fixed `chance` outcome. `next_int` always returns
/// the lower bound, so `rand_element` picks the first item.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    chance_result: bool,
    draws: usize,
}

impl ScriptedRandom {
    pub fn new(chance_result: bool) -> Self {
        Self {
            chance_result,
            draws: 0,
        }
    }

    /// Number of `next_int` and `chance` calls made so far.
    pub fn draws(&self) -> usize {
        self.draws
    }
}

impl RandomSource for ScriptedRandom {
    fn next_int(&mut self, min: i64, _max: i64) -> i64 {
        self.draws += 1;
        min
    }

    fn chance(&mut self, odds: u32) -> bool {
        self.draws += 1;
        odds <= 1 || self.chance_result
    }
}

// ── Relations ─────────────────────────────────────────────────

const RELATION_MIN: i32 = -100;
const RELATION_MAX: i32 = 100;

fn relation_from_score(score: i32) -> Relation {
    match score {
        s if s <= -50 => Relation::Hostile,
        s if s < 0 => Relation::Distrustful,
        s if s < 50 => Relation::Neutral,
        _ => Relation::Friendly,
    }
}

fn score_for(relation: Relation) -> i32 {
    match relation {
        Relation::Hostile     => -100,
        Relation::Distrustful => -25,
        Relation::Neutral     => 0,
        Relation::Friendly    => 75,
    }
}

// ── Map ───────────────────────────────────────────────────────

#[derive(Debug)]
struct Terrain {
    width: u32,
    height: u32,
    tiles: Vec<TerrainType>,
}

impl Terrain {
    fn get(&self, tile: TileRef) -> TerrainType {
        self.tiles
            .get(tile.0 as usize)
            .copied()
            .unwrap_or(TerrainType::Ocean)
    }

    fn neighbors(&self, tile: TileRef) -> impl Iterator<Item = TileRef> + '_ {
        let (w, h) = (self.width as i64, self.height as i64);
        let (x, y) = (tile.0 as i64 % w, tile.0 as i64 / w);
        [(x, y - 1), (x + 1, y), (x, y + 1), (x - 1, y)]
            .into_iter()
            .filter(move |&(nx, ny)| nx >= 0 && ny >= 0 && nx < w && ny < h)
            .map(move |(nx, ny)| TileRef((ny * w + nx) as u32))
    }

    fn is_shore(&self, tile: TileRef) -> bool {
        self.get(tile).is_land() && self.neighbors(tile).any(|n| self.get(n) == TerrainType::Ocean)
    }
}

// ── Players ───────────────────────────────────────────────────

/// Directly settable player state. Everything derived from the map is
/// recomputed by `GridWorld::refresh`.
#[derive(Debug, Clone)]
pub struct PlayerSetup {
    pub id: PlayerId,
    pub player_type: PlayerType,
    pub alive: bool,
    pub traitor: bool,
    pub gold: Gold,
    pub troops: u64,
    pub max_troops: u64,
    pub target_troop_ratio: f64,
    pub team: Option<u32>,
    /// Relation scores in `[-100, 100]`; missing entries are neutral.
    pub relations: BTreeMap<PlayerId, i32>,
    pub allies: Vec<PlayerId>,
    pub targets: Vec<PlayerId>,
    pub embargoes: BTreeSet<PlayerId>,
    pub alliance_requests: Vec<PlayerId>,
    pub can_send_alliance_requests: bool,
    pub incoming_attacks: Vec<IncomingAttack>,
    /// Unit types this player is never allowed to place.
    pub forbidden: BTreeSet<UnitType>,
}

impl PlayerSetup {
    pub fn new(id: &str, player_type: PlayerType) -> Self {
        Self {
            id: id.to_string(),
            player_type,
            alive: true,
            traitor: false,
            gold: Gold::ZERO,
            troops: 10_000,
            max_troops: 50_000,
            target_troop_ratio: 0.95,
            team: None,
            relations: BTreeMap::new(),
            allies: Vec::new(),
            targets: Vec::new(),
            embargoes: BTreeSet::new(),
            alliance_requests: Vec::new(),
            can_send_alliance_requests: true,
            incoming_attacks: Vec::new(),
            forbidden: BTreeSet::new(),
        }
    }

    pub fn set_relation(&mut self, other: &str, relation: Relation) {
        self.relations.insert(other.to_string(), score_for(relation));
    }
}

pub struct GridPlayer {
    setup: PlayerSetup,
    map: Rc<Terrain>,
    disabled: BTreeSet<UnitType>,
    tiles: Vec<TileRef>,
    border: Vec<TileRef>,
    free: HashSet<TileRef>,
    units: Vec<Unit>,
    teammates: BTreeSet<PlayerId>,
    neighbors: Vec<PlayerId>,
}

impl GridPlayer {
    pub fn setup(&self) -> &PlayerSetup {
        &self.setup
    }
}

impl PlayerView for GridPlayer {
    fn id(&self) -> &str {
        &self.setup.id
    }

    fn player_type(&self) -> PlayerType {
        self.setup.player_type
    }

    fn is_alive(&self) -> bool {
        self.setup.alive
    }

    fn is_traitor(&self) -> bool {
        self.setup.traitor
    }

    fn gold(&self) -> Gold {
        self.setup.gold
    }

    fn troops(&self) -> u64 {
        self.setup.troops
    }

    fn max_troops(&self) -> u64 {
        self.setup.max_troops
    }

    fn target_troop_ratio(&self) -> f64 {
        self.setup.target_troop_ratio
    }

    fn tiles(&self) -> &[TileRef] {
        &self.tiles
    }

    fn border_tiles(&self) -> &[TileRef] {
        &self.border
    }

    fn units(&self, types: &[UnitType]) -> Vec<Unit> {
        self.units
            .iter()
            .filter(|u| !u.under_construction)
            .filter(|u| types.is_empty() || types.contains(&u.unit_type))
            .cloned()
            .collect()
    }

    fn units_owned(&self, unit_type: UnitType) -> usize {
        self.units.iter().filter(|u| u.unit_type == unit_type).count()
    }

    fn can_build(&self, unit_type: UnitType, tile: TileRef) -> Option<TileRef> {
        if self.disabled.contains(&unit_type) || self.setup.forbidden.contains(&unit_type) {
            return None;
        }
        match unit_type {
            UnitType::Warship => (self.map.get(tile) == TerrainType::Ocean).then_some(tile),
            UnitType::Port => {
                (self.free.contains(&tile) && self.map.is_shore(tile)).then_some(tile)
            }
            UnitType::City
            | UnitType::Factory
            | UnitType::MissileSilo
            | UnitType::SAMLauncher
            | UnitType::DefensePost => self.free.contains(&tile).then_some(tile),
            _ => None,
        }
    }

    fn relation(&self, other: &str) -> Relation {
        relation_from_score(self.setup.relations.get(other).copied().unwrap_or(0))
    }

    fn is_on_same_team(&self, other: &str) -> bool {
        self.teammates.contains(other)
    }

    fn is_friendly(&self, other: &str) -> bool {
        self.teammates.contains(other) || self.setup.allies.iter().any(|a| a == other)
    }

    fn allies(&self) -> Vec<PlayerId> {
        self.setup.allies.clone()
    }

    fn targets(&self) -> Vec<PlayerId> {
        self.setup.targets.clone()
    }

    fn has_embargo_against(&self, other: &str) -> bool {
        self.setup.embargoes.contains(other)
    }

    fn can_send_alliance_request(&self, other: &str) -> bool {
        self.setup.can_send_alliance_requests
            && other != self.setup.id
            && !self.setup.allies.iter().any(|a| a == other)
    }

    fn incoming_alliance_requests(&self) -> Vec<PlayerId> {
        self.setup.alliance_requests.clone()
    }

    fn neighbor_ids(&self) -> Vec<PlayerId> {
        self.neighbors.clone()
    }

    fn incoming_attacks(&self) -> Vec<IncomingAttack> {
        self.setup.incoming_attacks.clone()
    }
}

// ── World ─────────────────────────────────────────────────────

pub fn default_unit_costs() -> BTreeMap<UnitType, Gold> {
    BTreeMap::from([
        (UnitType::City,         Gold::new(125_000)),
        (UnitType::Port,         Gold::new(125_000)),
        (UnitType::Factory,      Gold::new(125_000)),
        (UnitType::MissileSilo,  Gold::new(1_000_000)),
        (UnitType::SAMLauncher,  Gold::new(1_500_000)),
        (UnitType::DefensePost,  Gold::new(50_000)),
        (UnitType::Warship,      Gold::new(250_000)),
        (UnitType::Train,        Gold::ZERO),
        (UnitType::AtomBomb,     Gold::new(750_000)),
        (UnitType::HydrogenBomb, Gold::new(5_000_000)),
        (UnitType::MIRV,         Gold::new(35_000_000)),
    ])
}

/// Tiles claimed around a spawn point.
const SPAWN_RADIUS: u32 = 2;
/// Unowned tiles taken by one attack on terra nullius.
const FREE_LAND_PER_ATTACK: usize = 8;
/// Enemy tiles taken by one successful attack.
const ENEMY_LAND_PER_ATTACK: usize = 4;
/// Gold paid to each side of a delivered trade ship.
const TRADE_SHIP_INCOME: u128 = 5_000;

pub struct GridWorld {
    tick: Tick,
    spawn_phase_until: Tick,
    config: GameConfig,
    map: Rc<Terrain>,
    owners: Vec<Option<usize>>,
    players: Vec<GridPlayer>,
    units: Vec<Unit>,
    next_unit_id: u32,
    unit_costs: BTreeMap<UnitType, Gold>,
    upgradable: BTreeSet<UnitType>,
    nukes: Vec<NukeInFlight>,
}

impl GridWorld {
    fn index_of(&self, id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.setup.id == id)
    }

    pub fn set_tick(&mut self, tick: Tick) {
        self.tick = tick;
    }

    /// The spawn phase lasts while `ticks() < until`.
    pub fn set_spawn_phase_until(&mut self, until: Tick) {
        self.spawn_phase_until = until;
    }

    pub fn config_mut(&mut self) -> &mut GameConfig {
        &mut self.config
    }

    /// Mutable access to a player's settable state. Call `refresh` after
    /// changing `team`.
    pub fn setup_mut(&mut self, id: &str) -> Option<&mut PlayerSetup> {
        let index = self.index_of(id)?;
        Some(&mut self.players[index].setup)
    }

    pub fn grid_player(&self, id: &str) -> Option<&GridPlayer> {
        self.players.iter().find(|p| p.setup.id == id)
    }

    pub fn all_units(&self) -> &[Unit] {
        &self.units
    }

    pub fn set_owner(&mut self, tile: TileRef, owner: Option<&str>) {
        let index = owner.and_then(|id| self.index_of(id));
        if let Some(slot) = self.owners.get_mut(tile.0 as usize) {
            *slot = index;
        }
    }

    pub fn add_unit(&mut self, owner: &str, unit_type: UnitType, tile: TileRef) -> UnitId {
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        self.units.push(Unit {
            id,
            unit_type,
            owner: owner.to_string(),
            tile,
            level: 1,
            has_train_station: false,
            in_cooldown: false,
            under_construction: false,
        });
        id
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    pub fn remove_unit(&mut self, id: UnitId) {
        self.units.retain(|u| u.id != id);
    }

    /// Recomputes every player's territory, border, units and neighbours.
    pub fn refresh(&mut self) {
        let occupied: HashSet<TileRef> = self
            .units
            .iter()
            .filter(|u| u.unit_type != UnitType::Warship)
            .map(|u| u.tile)
            .collect();
        let teams: Vec<(PlayerId, Option<u32>)> = self
            .players
            .iter()
            .map(|p| (p.setup.id.clone(), p.setup.team))
            .collect();
        let disabled: BTreeSet<UnitType> = self.config.disabled_units.iter().copied().collect();

        for (index, player) in self.players.iter_mut().enumerate() {
            let tiles: Vec<TileRef> = self
                .owners
                .iter()
                .enumerate()
                .filter(|(_, o)| **o == Some(index))
                .map(|(i, _)| TileRef(i as u32))
                .collect();
            let border: Vec<TileRef> = tiles
                .iter()
                .copied()
                .filter(|&t| {
                    self.map
                        .neighbors(t)
                        .any(|n| self.owners[n.0 as usize] != Some(index))
                })
                .collect();

            let mut neighbors = Vec::new();
            for &t in &border {
                for n in self.map.neighbors(t) {
                    if let Some(other) = self.owners[n.0 as usize] {
                        let other_id = &teams[other].0;
                        if other != index && !neighbors.contains(other_id) {
                            neighbors.push(other_id.clone());
                        }
                    }
                }
            }

            let own_team = player.setup.team;
            player.teammates = teams
                .iter()
                .filter(|(id, team)| *id != player.setup.id && own_team.is_some() && *team == own_team)
                .map(|(id, _)| id.clone())
                .collect();
            player.free = tiles
                .iter()
                .copied()
                .filter(|t| self.map.get(*t).is_land() && !occupied.contains(t))
                .collect();
            player.units = self
                .units
                .iter()
                .filter(|u| u.owner == player.setup.id)
                .cloned()
                .collect();
            player.map = Rc::clone(&self.map);
            player.disabled = disabled.clone();
            player.tiles = tiles;
            player.border = border;
            player.neighbors = neighbors;
        }
    }

    /// Next tick: income, troop growth, end of the spawn phase.
    pub fn advance(&mut self) {
        self.tick += 1;
        for player in &mut self.players {
            if !player.setup.alive || player.tiles.is_empty() {
                continue;
            }
            let setup = &mut player.setup;
            let size = player.tiles.len() as u64;
            setup.max_troops = 10_000 + 1_000 * size;
            setup.gold = setup.gold + Gold::new(500 + 50 * size as u128);
            let growth = setup.max_troops / 50 + 1;
            setup.troops = (setup.troops + growth).min(setup.max_troops);
        }
    }

    /// Applies a command the way a lenient game server would. Commands the
    /// grid has no model for are ignored. Returns whether anything changed.
    pub fn apply(&mut self, command: &Command) -> bool {
        let changed = match command {
            Command::Spawn { player, tile } => self.apply_spawn(player, *tile),
            Command::Construct { player, unit_type, tile } => {
                self.apply_construct(player, *unit_type, *tile)
            }
            Command::UpgradeStructure { player, unit } => self.apply_upgrade(player, *unit),
            Command::CreateTrainStation { player, unit } => {
                match self.units.iter_mut().find(|u| u.id == *unit && &u.owner == player) {
                    Some(u) if !u.has_train_station => {
                        u.has_train_station = true;
                        true
                    }
                    _ => false,
                }
            }
            Command::TradeShip { src_port, dst_port, .. } => {
                self.apply_trade_ship(*src_port, *dst_port)
            }
            Command::Attack { player, target, troops } => {
                self.apply_attack(player, target.as_deref(), *troops)
            }
            Command::Nuke { player, kind, .. } => self.apply_nuke(player, *kind),
            Command::SetTargetTroopRatio { player, ratio } => {
                self.with_setup(player, |s| s.target_troop_ratio = *ratio)
            }
            Command::AllianceRequest { player, recipient } => self.with_setup(recipient, |s| {
                if !s.alliance_requests.contains(player) {
                    s.alliance_requests.push(player.clone());
                }
            }),
            Command::AllianceReply { player, requestor, accept } => {
                let replied = self.with_setup(player, |s| {
                    s.alliance_requests.retain(|r| r != requestor);
                    if *accept {
                        s.allies.push(requestor.clone());
                    }
                });
                if *accept {
                    self.with_setup(requestor, |s| s.allies.push(player.clone()));
                }
                replied
            }
            Command::StartEmbargo { player, target } => {
                self.with_setup(player, |s| {
                    s.embargoes.insert(target.clone());
                })
            }
            Command::StopEmbargo { player, target } => {
                self.with_setup(player, |s| {
                    s.embargoes.remove(target);
                })
            }
            Command::UpdateRelation { player, other, delta } => self.with_setup(player, |s| {
                let score = s.relations.entry(other.clone()).or_insert(0);
                *score = (*score + delta).clamp(RELATION_MIN, RELATION_MAX);
            }),
            Command::TransportShip { .. } | Command::Emoji { .. } => false,
        };
        if changed {
            self.refresh();
        }
        changed
    }

    fn with_setup(&mut self, id: &str, f: impl FnOnce(&mut PlayerSetup)) -> bool {
        match self.setup_mut(id) {
            Some(setup) => {
                f(setup);
                true
            }
            None => false,
        }
    }

    fn apply_spawn(&mut self, player: &str, tile: TileRef) -> bool {
        let Some(index) = self.index_of(player) else {
            return false;
        };
        if !self.players[index].tiles.is_empty() {
            return false;
        }
        let mut claimed = false;
        for t in crate::geometry::manhattan_ball(&*self, tile, SPAWN_RADIUS) {
            if self.map.get(t).is_land() && self.owners[t.0 as usize].is_none() {
                self.owners[t.0 as usize] = Some(index);
                claimed = true;
            }
        }
        claimed
    }

    fn apply_construct(&mut self, player: &str, unit_type: UnitType, tile: TileRef) -> bool {
        let Some(index) = self.index_of(player) else {
            return false;
        };
        let cost = self.unit_costs.get(&unit_type).copied().unwrap_or(Gold::ZERO);
        let owner = &self.players[index];
        if owner.setup.gold < cost || owner.can_build(unit_type, tile).is_none() {
            return false;
        }
        self.players[index].setup.gold = owner.setup.gold.saturating_sub(cost);
        self.add_unit(player, unit_type, tile);
        true
    }

    fn apply_upgrade(&mut self, player: &str, unit: UnitId) -> bool {
        let Some(index) = self.index_of(player) else {
            return false;
        };
        let Some(target) = self.units.iter().position(|u| u.id == unit && u.owner == player)
        else {
            return false;
        };
        let unit_type = self.units[target].unit_type;
        let cost = self.unit_costs.get(&unit_type).copied().unwrap_or(Gold::ZERO);
        let setup = &mut self.players[index].setup;
        if !self.upgradable.contains(&unit_type) || setup.gold < cost {
            return false;
        }
        setup.gold = setup.gold.saturating_sub(cost);
        self.units[target].level += 1;
        true
    }

    fn apply_trade_ship(&mut self, src: UnitId, dst: UnitId) -> bool {
        let owners: Vec<PlayerId> = [src, dst]
            .iter()
            .filter_map(|id| self.units.iter().find(|u| u.id == *id))
            .map(|u| u.owner.clone())
            .collect();
        if owners.len() != 2 {
            return false;
        }
        for owner in owners {
            self.with_setup(&owner, |s| s.gold = s.gold + Gold::new(TRADE_SHIP_INCOME));
        }
        true
    }

    fn apply_attack(&mut self, player: &str, target: Option<&str>, troops: u64) -> bool {
        let Some(index) = self.index_of(player) else {
            return false;
        };
        let sent = troops.min(self.players[index].setup.troops);
        if sent == 0 {
            return false;
        }
        let target_index = match target {
            Some(id) => match self.index_of(id) {
                Some(t) if t != index => Some(t),
                _ => return false,
            },
            None => None,
        };
        if let Some(t) = target_index {
            if sent <= self.players[t].setup.troops / 4 {
                self.players[index].setup.troops -= sent / 2;
                return true;
            }
        }

        let limit = if target_index.is_some() {
            ENEMY_LAND_PER_ATTACK
        } else {
            FREE_LAND_PER_ATTACK
        };
        let mut taken = Vec::new();
        for &b in &self.players[index].border {
            for n in self.map.neighbors(b) {
                if taken.len() >= limit {
                    break;
                }
                if self.map.get(n).is_land()
                    && self.owners[n.0 as usize] == target_index
                    && !taken.contains(&n)
                {
                    taken.push(n);
                }
            }
        }
        for t in &taken {
            self.owners[t.0 as usize] = Some(index);
        }
        self.players[index].setup.troops -= sent / 4;
        if let Some(t) = target_index {
            let defender = &mut self.players[t].setup;
            defender.troops = defender.troops.saturating_sub(sent / 2);
            if !self.owners.contains(&Some(t)) {
                defender.alive = false;
            }
        }
        true
    }

    fn apply_nuke(&mut self, player: &str, kind: NukeKind) -> bool {
        let cost = self.unit_costs.get(&kind.unit_type()).copied().unwrap_or(Gold::ZERO);
        self.with_setup(player, |s| s.gold = s.gold.saturating_sub(cost))
    }
}

impl GameView for GridWorld {
    fn ticks(&self) -> Tick {
        self.tick
    }

    fn in_spawn_phase(&self) -> bool {
        self.tick < self.spawn_phase_until
    }

    fn config(&self) -> &GameConfig {
        &self.config
    }

    fn width(&self) -> u32 {
        self.map.width
    }

    fn height(&self) -> u32 {
        self.map.height
    }

    fn terrain(&self, tile: TileRef) -> TerrainType {
        self.map.get(tile)
    }

    fn players(&self) -> Vec<&dyn PlayerView> {
        self.players.iter().map(|p| p as &dyn PlayerView).collect()
    }

    fn player(&self, id: &str) -> Option<&dyn PlayerView> {
        self.players
            .iter()
            .find(|p| p.setup.id == id)
            .map(|p| p as &dyn PlayerView)
    }

    fn owner(&self, tile: TileRef) -> Option<&dyn PlayerView> {
        let index = (*self.owners.get(tile.0 as usize)?)?;
        Some(&self.players[index] as &dyn PlayerView)
    }

    fn unit_cost(&self, unit_type: UnitType, _player: &dyn PlayerView) -> Gold {
        self.unit_costs.get(&unit_type).copied().unwrap_or(Gold::ZERO)
    }

    fn is_upgradable(&self, unit_type: UnitType) -> bool {
        self.upgradable.contains(&unit_type)
    }

    fn unit_count(&self, unit_type: UnitType) -> usize {
        self.units
            .iter()
            .filter(|u| u.unit_type == unit_type && !u.under_construction)
            .count()
    }

    fn unit(&self, id: UnitId) -> Option<Unit> {
        self.units
            .iter()
            .find(|u| u.id == id && !u.under_construction)
            .cloned()
    }

    fn unit_at(&self, unit_type: UnitType, tile: TileRef) -> Option<Unit> {
        self.units
            .iter()
            .find(|u| u.unit_type == unit_type && u.tile == tile && !u.under_construction)
            .cloned()
    }

    /// Completed ports of other players, unless either side embargoes the
    /// other.
    fn trading_ports(&self, port: UnitId) -> Vec<UnitId> {
        let Some(src) = self.unit(port) else {
            return Vec::new();
        };
        let Some(owner) = self.player(&src.owner) else {
            return Vec::new();
        };
        self.units
            .iter()
            .filter(|u| u.unit_type == UnitType::Port && !u.under_construction)
            .filter(|u| u.owner != src.owner)
            .filter(|u| {
                !owner.has_embargo_against(&u.owner)
                    && self
                        .player(&u.owner)
                        .is_some_and(|o| !o.has_embargo_against(&src.owner))
            })
            .map(|u| u.id)
            .collect()
    }

    fn nukes_in_flight(&self) -> Vec<NukeInFlight> {
        self.nukes.clone()
    }
}

// ── Builder ───────────────────────────────────────────────────

pub struct GridWorldBuilder {
    width: u32,
    height: u32,
    tick: Tick,
    spawn_phase_until: Tick,
    config: GameConfig,
    terrain: Vec<TerrainType>,
    owners: Vec<Option<PlayerId>>,
    players: Vec<PlayerSetup>,
    units: Vec<Unit>,
    unit_costs: BTreeMap<UnitType, Gold>,
    upgradable: BTreeSet<UnitType>,
    nukes: Vec<NukeInFlight>,
}

impl GridWorldBuilder {
    /// All plains, no players, tick 0, spawn phase already over.
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width * height) as usize;
        Self {
            width,
            height,
            tick: 0,
            spawn_phase_until: 0,
            config: GameConfig::default_test(),
            terrain: vec![TerrainType::Plains; size],
            owners: vec![None; size],
            players: Vec::new(),
            units: Vec::new(),
            unit_costs: default_unit_costs(),
            upgradable: BTreeSet::from([
                UnitType::City,
                UnitType::Port,
                UnitType::Factory,
                UnitType::MissileSilo,
                UnitType::SAMLauncher,
            ]),
            nukes: Vec::new(),
        }
    }

    fn tile(&self, x: u32, y: u32) -> TileRef {
        TileRef(y * self.width + x)
    }

    fn rect(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> Vec<TileRef> {
        let mut tiles = Vec::new();
        for y in y0..=y1.min(self.height - 1) {
            for x in x0..=x1.min(self.width - 1) {
                tiles.push(self.tile(x, y));
            }
        }
        tiles
    }

    pub fn tick(mut self, tick: Tick) -> Self {
        self.tick = tick;
        self
    }

    pub fn spawn_phase_until(mut self, until: Tick) -> Self {
        self.spawn_phase_until = until;
        self
    }

    pub fn config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    /// Inclusive rectangle of terrain.
    pub fn terrain_rect(mut self, x0: u32, y0: u32, x1: u32, y1: u32, terrain: TerrainType) -> Self {
        for t in self.rect(x0, y0, x1, y1) {
            self.terrain[t.0 as usize] = terrain;
        }
        self
    }

    pub fn ocean_rect(self, x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        self.terrain_rect(x0, y0, x1, y1, TerrainType::Ocean)
    }

    pub fn player(self, id: &str, player_type: PlayerType) -> Self {
        self.player_with(id, player_type, |_| {})
    }

    pub fn player_with(
        mut self,
        id: &str,
        player_type: PlayerType,
        f: impl FnOnce(&mut PlayerSetup),
    ) -> Self {
        let mut setup = PlayerSetup::new(id, player_type);
        f(&mut setup);
        self.players.push(setup);
        self
    }

    /// Gives every land tile of the inclusive rectangle to `owner`.
    pub fn claim_rect(mut self, owner: &str, x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        for t in self.rect(x0, y0, x1, y1) {
            if self.terrain[t.0 as usize].is_land() {
                self.owners[t.0 as usize] = Some(owner.to_string());
            }
        }
        self
    }

    pub fn unit(self, owner: &str, unit_type: UnitType, x: u32, y: u32) -> Self {
        self.unit_with(owner, unit_type, x, y, |_| {})
    }

    /// Unit ids are assigned in insertion order, starting at 1.
    pub fn unit_with(
        mut self,
        owner: &str,
        unit_type: UnitType,
        x: u32,
        y: u32,
        f: impl FnOnce(&mut Unit),
    ) -> Self {
        let mut unit = Unit {
            id: UnitId(self.units.len() as u32 + 1),
            unit_type,
            owner: owner.to_string(),
            tile: self.tile(x, y),
            level: 1,
            has_train_station: false,
            in_cooldown: false,
            under_construction: false,
        };
        f(&mut unit);
        self.units.push(unit);
        self
    }

    pub fn unit_cost(mut self, unit_type: UnitType, cost: Gold) -> Self {
        self.unit_costs.insert(unit_type, cost);
        self
    }

    pub fn nuke_in_flight(mut self, owner: &str, kind: NukeKind, x: u32, y: u32) -> Self {
        let target = self.tile(x, y);
        self.nukes.push(NukeInFlight {
            owner: owner.to_string(),
            kind,
            target,
        });
        self
    }

    pub fn build(self) -> GridWorld {
        let map = Rc::new(Terrain {
            width: self.width,
            height: self.height,
            tiles: self.terrain,
        });
        let index: BTreeMap<&str, usize> = self
            .players
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.as_str(), i))
            .collect();
        let owners = self
            .owners
            .iter()
            .map(|o| o.as_deref().and_then(|id| index.get(id).copied()))
            .collect();
        let next_unit_id = self.units.len() as u32 + 1;
        let players = self
            .players
            .into_iter()
            .map(|setup| GridPlayer {
                setup,
                map: Rc::clone(&map),
                disabled: BTreeSet::new(),
                tiles: Vec::new(),
                border: Vec::new(),
                free: HashSet::new(),
                units: Vec::new(),
                teammates: BTreeSet::new(),
                neighbors: Vec::new(),
            })
            .collect();

        let mut world = GridWorld {
            tick: self.tick,
            spawn_phase_until: self.spawn_phase_until,
            config: self.config,
            map,
            owners,
            players,
            units: self.units,
            next_unit_id,
            unit_costs: self.unit_costs,
            upgradable: self.upgradable,
            nukes: self.nukes,
        };
        world.refresh();
        world
    }
}
