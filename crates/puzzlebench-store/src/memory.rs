//! In-memory [`GameStore`] backed by a `Mutex<HashMap>`.
//!
//! Satisfies the full trait contract without touching disk; used by tests
//! and by `--memory` CLI runs where persistence is not wanted.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StoreError;
use crate::records::{
    AgentStanding, GameId, GameOutcome, GameRecord, MoveAttempt, RatingSnapshot,
};
use crate::traits::{GameStore, StoreResult};

#[derive(Debug, Default)]
struct State {
    games: HashMap<String, GameRecord>,
    /// Game ids in creation order.
    game_order: Vec<String>,
    snapshots: HashMap<String, RatingSnapshot>,
    /// Game ids in snapshot-recording (completion) order.
    snapshot_order: Vec<String>,
}

/// In-memory game store.
#[derive(Debug, Default)]
pub struct MemoryGameStore {
    state: Mutex<State>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameStore for MemoryGameStore {
    async fn create_game(&self, puzzle_id: &str, agent_name: &str) -> StoreResult<GameId> {
        let game = GameRecord::new(puzzle_id, agent_name);
        let id = game.id.clone();
        let mut state = self.state.lock().unwrap();
        state.game_order.push(id.0.clone());
        state.games.insert(id.0.clone(), game);
        Ok(id)
    }

    async fn record_move_attempt(
        &self,
        game_id: &GameId,
        attempt: MoveAttempt,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        let game = state
            .games
            .get_mut(&game_id.0)
            .ok_or_else(|| StoreError::GameNotFound(game_id.0.clone()))?;
        game.moves.push(attempt);
        Ok(())
    }

    async fn finalize_game(&self, game_id: &GameId, failed: bool) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        let game = state
            .games
            .get_mut(&game_id.0)
            .ok_or_else(|| StoreError::GameNotFound(game_id.0.clone()))?;
        if game.outcome.is_some() {
            return Err(StoreError::AlreadyFinalized(game_id.0.clone()));
        }
        game.outcome = Some(if failed {
            GameOutcome::Failed
        } else {
            GameOutcome::Succeeded
        });
        Ok(())
    }

    async fn record_rating_snapshot(
        &self,
        game_id: &GameId,
        rating: f64,
        deviation: f64,
        volatility: f64,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.games.contains_key(&game_id.0) {
            return Err(StoreError::GameNotFound(game_id.0.clone()));
        }
        if state.snapshots.contains_key(&game_id.0) {
            return Err(StoreError::DuplicateSnapshot(game_id.0.clone()));
        }
        state.snapshot_order.push(game_id.0.clone());
        state.snapshots.insert(
            game_id.0.clone(),
            RatingSnapshot {
                game_id: game_id.clone(),
                rating,
                deviation,
                volatility,
                recorded_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn game(&self, game_id: &GameId) -> StoreResult<Option<GameRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.games.get(&game_id.0).cloned())
    }

    async fn agent_games(&self, agent_name: &str) -> StoreResult<Vec<GameRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .game_order
            .iter()
            .filter_map(|id| state.games.get(id))
            .filter(|g| g.agent_name == agent_name)
            .cloned()
            .collect())
    }

    async fn incomplete_games(&self, agent_name: &str) -> StoreResult<Vec<GameRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .game_order
            .iter()
            .filter_map(|id| state.games.get(id))
            .filter(|g| g.agent_name == agent_name && !g.is_terminal())
            .cloned()
            .collect())
    }

    async fn last_snapshot(&self, agent_name: &str) -> StoreResult<Option<RatingSnapshot>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .snapshot_order
            .iter()
            .rev()
            .filter_map(|id| state.snapshots.get(id))
            .find(|s| {
                state
                    .games
                    .get(&s.game_id.0)
                    .map(|g| g.agent_name == agent_name)
                    .unwrap_or(false)
            })
            .cloned())
    }

    async fn leaderboard(&self) -> StoreResult<Vec<AgentStanding>> {
        let state = self.state.lock().unwrap();
        let mut standings: HashMap<String, AgentStanding> = HashMap::new();

        for id in &state.game_order {
            let Some(game) = state.games.get(id) else {
                continue;
            };
            let Some(outcome) = game.outcome else {
                continue;
            };
            let entry = standings
                .entry(game.agent_name.clone())
                .or_insert_with(|| AgentStanding {
                    name: game.agent_name.clone(),
                    rating: 0.0,
                    deviation: 0.0,
                    win_rate: 0.0,
                    games_played: 0,
                });
            entry.games_played += 1;
            if outcome == GameOutcome::Succeeded {
                entry.win_rate += 1.0;
            }
        }

        // Rating comes from the latest snapshot; agents without one are
        // excluded from the board.
        let mut board = Vec::new();
        for (name, mut standing) in standings {
            let latest = state
                .snapshot_order
                .iter()
                .rev()
                .filter_map(|id| state.snapshots.get(id))
                .find(|s| {
                    state
                        .games
                        .get(&s.game_id.0)
                        .map(|g| g.agent_name == name)
                        .unwrap_or(false)
                });
            if let Some(snapshot) = latest {
                standing.win_rate /= standing.games_played as f64;
                standing.rating = snapshot.rating;
                standing.deviation = snapshot.deviation;
                board.push(standing);
            }
        }
        board.sort_by(|a, b| b.rating.total_cmp(&a.rating));
        Ok(board)
    }
}
