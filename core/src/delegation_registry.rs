//! Per-game registry of delegated builders, one per human player.

use crate::{
    delegated_building_execution::{DelegatedBuildingExecution, DelegationSettings, SharedSettings},
    execution::Scheduler,
    game::GameView,
    gold::Gold,
    types::{GameId, PlayerId, PlayerType},
};
use std::collections::BTreeMap;

pub struct DelegationRegistry {
    game_id: GameId,
    default_reserve: Gold,
    handles: BTreeMap<PlayerId, SharedSettings>,
    initialized: bool,
}

impl DelegationRegistry {
    pub fn new(game_id: impl Into<GameId>, default_reserve: Gold) -> Self {
        Self {
            game_id: game_id.into(),
            default_reserve,
            handles: BTreeMap::new(),
            initialized: false,
        }
    }

    /// Schedules one disabled builder per human player. The player set is
    /// fixed from here on; later calls do nothing.
    pub fn init(&mut self, game: &dyn GameView, scheduler: &mut dyn Scheduler) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        for player in game.players() {
            if player.player_type() != PlayerType::Human {
                continue;
            }
            let execution = DelegatedBuildingExecution::new(
                &self.game_id,
                player.id(),
                DelegationSettings::disabled(self.default_reserve),
            );
            self.handles
                .insert(player.id().to_string(), execution.settings_handle());
            scheduler.add_execution(Box::new(execution));
        }
        log::info!(
            "tick={} delegation: registered {} human players",
            game.ticks(),
            self.handles.len()
        );
    }

    /// Returns false for an unknown player.
    pub fn update_player(&self, player_id: &str, settings: DelegationSettings) -> bool {
        match self.handles.get(player_id) {
            Some(handle) => {
                handle.set(settings);
                log::info!(
                    "delegation: {player_id} enabled={} reserve={}",
                    settings.enabled,
                    settings.gold_reserve
                );
                true
            }
            None => false,
        }
    }

    pub fn update_all(&self, settings: DelegationSettings) {
        for handle in self.handles.values() {
            handle.set(settings);
        }
        log::info!(
            "delegation: all players enabled={} reserve={}",
            settings.enabled,
            settings.gold_reserve
        );
    }

    pub fn settings(&self, player_id: &str) -> Option<DelegationSettings> {
        self.handles.get(player_id).map(|h| h.get())
    }

    pub fn player_ids(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
