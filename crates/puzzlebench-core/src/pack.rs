//! Puzzle packs and the transition-table oracle.
//!
//! A pack is a self-contained JSON document: the puzzles plus, for every
//! position reachable while solving them, the legal move list and a move →
//! successor-position table. Packs are produced offline by whatever chess
//! library sources the puzzles; at evaluation time the engine needs no chess
//! knowledge beyond the table.
//!
//! Moves may appear in the table under more than one notation (SAN and UCI
//! aliases mapping to the same successor), so agents can answer in SAN while
//! solutions are stored in UCI.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Puzzle;
use crate::oracle::{OracleError, PositionOracle};

/// Pack loading and validation failures.
#[derive(Debug, Error)]
pub enum PackError {
    #[error("failed to read pack: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse pack: {0}")]
    Json(#[from] serde_json::Error),

    /// A solution passes through a position the table does not cover.
    #[error("puzzle {puzzle}: position not covered by pack: {fen}")]
    UncoveredPosition { puzzle: String, fen: String },

    /// A solution half-move is not applicable in its position.
    #[error("puzzle {puzzle}: solution move {mv} not applicable in {fen}")]
    UnplayableMove {
        puzzle: String,
        fen: String,
        mv: String,
    },
}

/// Oracle knowledge for a single position.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PositionEntry {
    /// Legal moves in this position (SAN).
    pub legal: Vec<String>,

    /// Move (any accepted notation) → successor FEN.
    pub next: BTreeMap<String, String>,
}

/// A puzzle corpus with full oracle coverage of its solution paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzlePack {
    pub puzzles: Vec<Puzzle>,
    pub positions: BTreeMap<String, PositionEntry>,
}

impl PuzzlePack {
    /// Parse a pack from JSON and validate solution coverage.
    pub fn from_json(raw: &str) -> Result<Self, PackError> {
        let pack: PuzzlePack = serde_json::from_str(raw)?;
        pack.validate()?;
        Ok(pack)
    }

    /// Load a pack from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PackError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Check that every puzzle's solution path is fully covered by the
    /// position table.
    pub fn validate(&self) -> Result<(), PackError> {
        for puzzle in &self.puzzles {
            let mut fen = puzzle.fen.as_str();
            for mv in puzzle.solution() {
                let entry = self.positions.get(fen).ok_or_else(|| {
                    PackError::UncoveredPosition {
                        puzzle: puzzle.id.clone(),
                        fen: fen.to_string(),
                    }
                })?;
                fen = entry
                    .next
                    .get(mv)
                    .ok_or_else(|| PackError::UnplayableMove {
                        puzzle: puzzle.id.clone(),
                        fen: fen.to_string(),
                        mv: mv.to_string(),
                    })?;
            }
        }
        Ok(())
    }

    /// Build a [`TableOracle`] over this pack's position table.
    pub fn oracle(&self) -> TableOracle {
        TableOracle {
            positions: self.positions.clone(),
        }
    }
}

/// [`PositionOracle`] backed by a pack's transition table.
#[derive(Debug, Clone, Default)]
pub struct TableOracle {
    positions: BTreeMap<String, PositionEntry>,
}

impl TableOracle {
    pub fn new(positions: BTreeMap<String, PositionEntry>) -> Self {
        Self { positions }
    }

    fn entry(&self, fen: &str) -> Result<&PositionEntry, OracleError> {
        self.positions
            .get(fen)
            .ok_or_else(|| OracleError::UnknownPosition(fen.to_string()))
    }
}

impl PositionOracle for TableOracle {
    fn legal_moves(&self, fen: &str) -> Result<Vec<String>, OracleError> {
        Ok(self.entry(fen)?.legal.clone())
    }

    fn is_legal(&self, fen: &str, mv: &str) -> Result<bool, OracleError> {
        let entry = self.entry(fen)?;
        Ok(entry.legal.iter().any(|m| m == mv) || entry.next.contains_key(mv))
    }

    fn apply(&self, fen: &str, mv: &str) -> Result<String, OracleError> {
        let entry = self.entry(fen)?;
        entry
            .next
            .get(mv)
            .cloned()
            .ok_or_else(|| OracleError::InvalidMove {
                fen: fen.to_string(),
                mv: mv.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4";
    const AFTER_NXE5: &str =
        "r1bqkb1r/pppp1ppp/2n2n2/4N3/2B1P3/8/PPPP1PPP/RNBQK2R b KQkq - 0 4";
    const AFTER_RECAPTURE: &str =
        "r1bqkb1r/pppp1ppp/8/4n3/2B1P3/8/PPPP1PPP/RNBQK2R w KQkq - 0 5";

    fn sample_pack() -> PuzzlePack {
        let mut positions = BTreeMap::new();
        positions.insert(
            START.to_string(),
            PositionEntry {
                legal: vec!["Nxe5".to_string()],
                next: BTreeMap::from([
                    ("f3e5".to_string(), AFTER_NXE5.to_string()),
                    ("Nxe5".to_string(), AFTER_NXE5.to_string()),
                ]),
            },
        );
        positions.insert(
            AFTER_NXE5.to_string(),
            PositionEntry {
                legal: vec!["Nxe5".to_string(), "Qe7".to_string()],
                next: BTreeMap::from([
                    ("c6e5".to_string(), AFTER_RECAPTURE.to_string()),
                    ("Nxe5".to_string(), AFTER_RECAPTURE.to_string()),
                ]),
            },
        );
        PuzzlePack {
            puzzles: vec![Puzzle {
                id: "fork-1".to_string(),
                fen: START.to_string(),
                moves: "f3e5 c6e5".to_string(),
                rating: 1200,
                rating_deviation: 100,
                themes: String::new(),
                puzzle_type: "tactic".to_string(),
                popularity: 0,
                nb_plays: 0,
                game_url: String::new(),
                opening_tags: String::new(),
            }],
            positions,
        }
    }

    #[test]
    fn test_pack_validates_covered_solution() {
        assert!(sample_pack().validate().is_ok());
    }

    #[test]
    fn test_pack_rejects_uncovered_position() {
        let mut pack = sample_pack();
        pack.positions.remove(AFTER_NXE5);
        assert!(matches!(
            pack.validate(),
            Err(PackError::UncoveredPosition { .. })
        ));
    }

    #[test]
    fn test_pack_rejects_unplayable_solution_move() {
        let mut pack = sample_pack();
        pack.puzzles[0].moves = "f3e5 h7h5".to_string();
        assert!(matches!(
            pack.validate(),
            Err(PackError::UnplayableMove { .. })
        ));
    }

    #[test]
    fn test_oracle_accepts_san_and_uci_aliases() {
        let oracle = sample_pack().oracle();
        assert!(oracle.is_legal(AFTER_NXE5, "Nxe5").unwrap());
        assert!(oracle.is_legal(AFTER_NXE5, "c6e5").unwrap());
        assert_eq!(
            oracle.apply(AFTER_NXE5, "Nxe5").unwrap(),
            oracle.apply(AFTER_NXE5, "c6e5").unwrap()
        );
    }

    #[test]
    fn test_oracle_rejects_moves_outside_table() {
        let oracle = sample_pack().oracle();
        assert!(!oracle.is_legal(START, "Qh5").unwrap());
        assert!(matches!(
            oracle.apply(START, "Qh5"),
            Err(OracleError::InvalidMove { .. })
        ));
        assert!(matches!(
            oracle.legal_moves("8/8/8/8/8/8/8/8 w - - 0 1"),
            Err(OracleError::UnknownPosition(_))
        ));
    }

    #[test]
    fn test_pack_json_roundtrip() {
        let pack = sample_pack();
        let raw = serde_json::to_string(&pack).unwrap();
        let parsed = PuzzlePack::from_json(&raw).unwrap();
        assert_eq!(parsed.puzzles, pack.puzzles);
    }
}
