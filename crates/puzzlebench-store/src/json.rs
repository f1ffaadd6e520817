//! JSON-file-backed [`GameStore`].
//!
//! The whole store is one JSON document held in memory and rewritten on every
//! mutation with an atomic temp-file rename. Good for benchmark runs of a few
//! thousand games; not a database.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreError;
use crate::records::{
    AgentStanding, GameId, GameOutcome, GameRecord, MoveAttempt, RatingSnapshot,
};
use crate::traits::{GameStore, StoreResult};

/// On-disk document layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    games: Vec<GameRecord>,
    /// Snapshots in recording (completion) order.
    snapshots: Vec<RatingSnapshot>,
}

impl Document {
    fn game_mut(&mut self, game_id: &GameId) -> StoreResult<&mut GameRecord> {
        self.games
            .iter_mut()
            .find(|g| g.id == *game_id)
            .ok_or_else(|| StoreError::GameNotFound(game_id.0.clone()))
    }

    fn game(&self, game_id: &GameId) -> Option<&GameRecord> {
        self.games.iter().find(|g| g.id == *game_id)
    }

    fn agent_of_snapshot(&self, snapshot: &RatingSnapshot) -> Option<&str> {
        self.game(&snapshot.game_id).map(|g| g.agent_name.as_str())
    }
}

/// Game store persisted as a single JSON file.
pub struct JsonGameStore {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl JsonGameStore {
    /// Open (or create) the store at `path`. A missing file starts empty; a
    /// present file is loaded and validated.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let doc = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            Document::default()
        };
        debug!(path = %path.display(), games = doc.games.len(), "opened json game store");
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    /// Atomic write: serialize to a temp file in the target directory, then
    /// rename over the store path.
    fn flush(&self, doc: &Document) -> StoreResult<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(serde_json::to_string_pretty(doc)?.as_bytes())?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::Io(e.error.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl GameStore for JsonGameStore {
    async fn create_game(&self, puzzle_id: &str, agent_name: &str) -> StoreResult<GameId> {
        let mut doc = self.doc.lock().unwrap();
        let game = GameRecord::new(puzzle_id, agent_name);
        let id = game.id.clone();
        doc.games.push(game);
        self.flush(&doc)?;
        Ok(id)
    }

    async fn record_move_attempt(
        &self,
        game_id: &GameId,
        attempt: MoveAttempt,
    ) -> StoreResult<()> {
        let mut doc = self.doc.lock().unwrap();
        doc.game_mut(game_id)?.moves.push(attempt);
        self.flush(&doc)?;
        Ok(())
    }

    async fn finalize_game(&self, game_id: &GameId, failed: bool) -> StoreResult<()> {
        let mut doc = self.doc.lock().unwrap();
        let game = doc.game_mut(game_id)?;
        if game.outcome.is_some() {
            return Err(StoreError::AlreadyFinalized(game_id.0.clone()));
        }
        game.outcome = Some(if failed {
            GameOutcome::Failed
        } else {
            GameOutcome::Succeeded
        });
        self.flush(&doc)?;
        Ok(())
    }

    async fn record_rating_snapshot(
        &self,
        game_id: &GameId,
        rating: f64,
        deviation: f64,
        volatility: f64,
    ) -> StoreResult<()> {
        let mut doc = self.doc.lock().unwrap();
        if doc.game(game_id).is_none() {
            return Err(StoreError::GameNotFound(game_id.0.clone()));
        }
        if doc.snapshots.iter().any(|s| s.game_id == *game_id) {
            return Err(StoreError::DuplicateSnapshot(game_id.0.clone()));
        }
        doc.snapshots.push(RatingSnapshot {
            game_id: game_id.clone(),
            rating,
            deviation,
            volatility,
            recorded_at: Utc::now(),
        });
        self.flush(&doc)?;
        Ok(())
    }

    async fn game(&self, game_id: &GameId) -> StoreResult<Option<GameRecord>> {
        let doc = self.doc.lock().unwrap();
        Ok(doc.game(game_id).cloned())
    }

    async fn agent_games(&self, agent_name: &str) -> StoreResult<Vec<GameRecord>> {
        let doc = self.doc.lock().unwrap();
        Ok(doc
            .games
            .iter()
            .filter(|g| g.agent_name == agent_name)
            .cloned()
            .collect())
    }

    async fn incomplete_games(&self, agent_name: &str) -> StoreResult<Vec<GameRecord>> {
        let doc = self.doc.lock().unwrap();
        Ok(doc
            .games
            .iter()
            .filter(|g| g.agent_name == agent_name && !g.is_terminal())
            .cloned()
            .collect())
    }

    async fn last_snapshot(&self, agent_name: &str) -> StoreResult<Option<RatingSnapshot>> {
        let doc = self.doc.lock().unwrap();
        Ok(doc
            .snapshots
            .iter()
            .rev()
            .find(|s| doc.agent_of_snapshot(s) == Some(agent_name))
            .cloned())
    }

    async fn leaderboard(&self) -> StoreResult<Vec<AgentStanding>> {
        let doc = self.doc.lock().unwrap();
        let mut standings: HashMap<String, AgentStanding> = HashMap::new();

        for game in &doc.games {
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

        let mut board = Vec::new();
        for (name, mut standing) in standings {
            let latest = doc
                .snapshots
                .iter()
                .rev()
                .find(|s| doc.agent_of_snapshot(s) == Some(name.as_str()));
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
