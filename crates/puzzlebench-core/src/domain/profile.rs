//! Agent identity and capability flags.

use serde::{Deserialize, Serialize};

use crate::rating::RatingTriple;

/// Side to move, derived from the FEN side-to-move field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

/// Identity and capability flags of an agent under evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentProfile {
    /// Agent/model name; keys games and snapshots in the store.
    pub name: String,

    /// Whether the agent produces chain-of-thought style reasoning.
    pub is_reasoning: bool,

    /// Whether the agent is a (possibly seeded) random policy.
    pub is_random: bool,

    /// Rating triple the agent starts the batch with.
    pub initial_rating: RatingTriple,
}

impl AgentProfile {
    /// Profile with default capability flags and the standard unrated
    /// Glicko-2 starting triple (1500 / 350 / 0.06).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_reasoning: false,
            is_random: false,
            initial_rating: RatingTriple::default(),
        }
    }

    /// Mark the agent as reasoning-capable.
    pub fn with_reasoning(mut self) -> Self {
        self.is_reasoning = true;
        self
    }

    /// Mark the agent as a random policy.
    pub fn with_random(mut self) -> Self {
        self.is_random = true;
        self
    }

    /// Override the starting rating triple (e.g. resuming a rated agent).
    pub fn with_initial_rating(mut self, rating: RatingTriple) -> Self {
        self.initial_rating = rating;
        self
    }
}
