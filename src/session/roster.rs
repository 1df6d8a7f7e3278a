use super::GameSession;
use crate::error::{GameError, GameResult};
use crate::types::*;

impl GameSession {
    /// Append a player. Names are trimmed; duplicates are allowed.
    pub async fn add_player(&self, name: &str) -> GameResult<Player> {
        let mut state = self.state.write().await;
        if state.phase != GamePhase::Setup {
            return Err(state.fail(GameError::RosterLocked));
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(state.fail(GameError::InvalidPlayerName));
        }

        let player = Player {
            name: name.to_string(),
        };
        state.roster.push(player.clone());
        state.last_error = None;

        tracing::info!("Added player {} ({} total)", player.name, state.roster.len());
        Ok(player)
    }

    /// Remove the player at `index` (roster order)
    pub async fn remove_player(&self, index: usize) -> GameResult<Player> {
        let mut state = self.state.write().await;
        if state.phase != GamePhase::Setup {
            return Err(state.fail(GameError::RosterLocked));
        }
        if index >= state.roster.len() {
            return Err(state.fail(GameError::PlayerNotFound(index)));
        }

        let removed = state.roster.remove(index);
        let state = &mut *state;
        state.rotation.retain_roster(&state.roster);
        state.last_error = None;

        tracing::info!("Removed player {}", removed.name);
        Ok(removed)
    }

    pub async fn roster(&self) -> Vec<Player> {
        self.state.read().await.roster.clone()
    }
}
