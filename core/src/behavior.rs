//! Shared decision primitives used by autonomous nations.
//!
//! `BotBehavior` remembers a single enemy focus and turns it into attack
//! commands. It never owns randomness and never reads another agent's
//! internal state.

use crate::{
    command::Command,
    game::{GameView, PlayerView},
    types::{PlayerId, PlayerType, Relation, Tick},
};

/// An enemy focus older than this is forgotten.
pub const ENEMY_MEMORY_TICKS: Tick = 100;

/// Relation spent towards an ally whose war we join.
const ASSIST_RELATION_COST: i32 = -20;

const ASSIST_EMOJI: &str = "👍";

pub struct BotBehavior {
    player_id: PlayerId,
    trigger_ratio: f64,
    reserve_ratio: f64,
    enemy: Option<PlayerId>,
    enemy_updated: Tick,
}

impl BotBehavior {
    pub fn new(player_id: PlayerId, trigger_ratio: f64, reserve_ratio: f64) -> Self {
        Self {
            player_id,
            trigger_ratio,
            reserve_ratio,
            enemy: None,
            enemy_updated: 0,
        }
    }

    pub fn enemy(&self) -> Option<&str> {
        self.enemy.as_deref()
    }

    fn set_enemy(&mut self, enemy: PlayerId, tick: Tick) {
        self.enemy = Some(enemy);
        self.enemy_updated = tick;
    }

    /// Answers every pending alliance request: accept non-traitors we are
    /// at least neutral towards.
    pub fn handle_alliance_requests(
        &self,
        game: &dyn GameView,
        player: &dyn PlayerView,
        out: &mut Vec<Command>,
    ) {
        for requestor in player.incoming_alliance_requests() {
            let accept = match game.player(&requestor) {
                Some(other) => {
                    !other.is_traitor() && player.relation(&requestor) >= Relation::Neutral
                }
                None => false,
            };
            out.push(Command::AllianceReply {
                player: self.player_id.clone(),
                requestor,
                accept,
            });
        }
    }

    pub fn forget_old_enemies(&mut self, tick: Tick) {
        if self.enemy.is_some() && tick.saturating_sub(self.enemy_updated) > ENEMY_MEMORY_TICKS {
            self.enemy = None;
        }
    }

    /// Joins the first war declared by a friendly ally against someone we
    /// are not friendly with.
    pub fn assist_allies(
        &mut self,
        tick: Tick,
        game: &dyn GameView,
        player: &dyn PlayerView,
        out: &mut Vec<Command>,
    ) {
        for ally_id in player.allies() {
            if player.relation(&ally_id) < Relation::Friendly {
                continue;
            }
            let Some(ally) = game.player(&ally_id) else {
                continue;
            };
            for target in ally.targets() {
                if target == self.player_id || player.is_friendly(&target) {
                    continue;
                }
                if self.enemy.as_deref() == Some(target.as_str()) {
                    return;
                }
                out.push(Command::UpdateRelation {
                    player: self.player_id.clone(),
                    other: ally_id.clone(),
                    delta: ASSIST_RELATION_COST,
                });
                out.push(Command::Emoji {
                    player: self.player_id.clone(),
                    recipient: ally_id.clone(),
                    emoji: ASSIST_EMOJI.to_string(),
                });
                log::debug!("tick={tick} {}: assisting {ally_id} against {target}", self.player_id);
                self.set_enemy(target, tick);
                return;
            }
        }
    }

    /// Current enemy focus, picking a new one if none is remembered.
    pub fn select_enemy(
        &mut self,
        tick: Tick,
        game: &dyn GameView,
        player: &dyn PlayerView,
    ) -> Option<PlayerId> {
        if self.enemy.is_none() {
            if !self.has_sufficient_troops(player) {
                return None;
            }
            if let Some(next) = self
                .weakest_neighboring_bot(game, player)
                .or_else(|| largest_incoming_attacker(player))
                .or_else(|| most_hated_player(game, player))
            {
                self.set_enemy(next, tick);
            }
        }

        let enemy = self.enemy.clone()?;
        let valid = game.player(&enemy).is_some_and(|e| e.is_alive())
            && !player.is_on_same_team(&enemy)
            && !player.is_friendly(&enemy);
        if !valid {
            self.enemy = None;
            return None;
        }
        Some(enemy)
    }

    fn has_sufficient_troops(&self, player: &dyn PlayerView) -> bool {
        player.troops() as f64 >= player.max_troops() as f64 * self.trigger_ratio
    }

    fn weakest_neighboring_bot(
        &self,
        game: &dyn GameView,
        player: &dyn PlayerView,
    ) -> Option<PlayerId> {
        let density = |p: &dyn PlayerView| p.troops() as f64 / p.num_tiles_owned().max(1) as f64;
        let mut best: Option<(&dyn PlayerView, f64)> = None;
        for id in player.neighbor_ids() {
            let Some(other) = game.player(&id) else {
                continue;
            };
            if other.player_type() != PlayerType::Bot || !other.is_alive() {
                continue;
            }
            let d = density(other);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((other, d));
            }
        }
        best.map(|(p, _)| p.id().to_string())
    }

    /// Attacks with everything above the home reserve. `None` targets
    /// terra nullius.
    pub fn send_attack(
        &self,
        player: &dyn PlayerView,
        target: Option<&str>,
        out: &mut Vec<Command>,
    ) {
        if let Some(target) = target {
            if player.is_on_same_team(target) {
                return;
            }
        }
        let keep = (player.max_troops() as f64 * self.reserve_ratio) as u64;
        let troops = player.troops().saturating_sub(keep);
        if troops < 1 {
            return;
        }
        out.push(Command::Attack {
            player: self.player_id.clone(),
            target: target.map(str::to_string),
            troops,
        });
    }
}

fn largest_incoming_attacker(player: &dyn PlayerView) -> Option<PlayerId> {
    let mut best: Option<(PlayerId, u64)> = None;
    for attack in player.incoming_attacks() {
        if best.as_ref().map_or(true, |(_, t)| attack.troops > *t) {
            best = Some((attack.attacker, attack.troops));
        }
    }
    best.map(|(id, _)| id)
}

fn most_hated_player(game: &dyn GameView, player: &dyn PlayerView) -> Option<PlayerId> {
    game.players()
        .into_iter()
        .filter(|p| p.id() != player.id() && p.is_alive())
        .find(|p| player.relation(p.id()) == Relation::Hostile)
        .map(|p| p.id().to_string())
}
