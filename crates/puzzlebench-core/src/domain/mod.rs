//! Domain types for puzzle evaluation.

pub mod error;
pub mod profile;
pub mod puzzle;

pub use error::{EvalError, Result};
pub use profile::{AgentProfile, Color};
pub use puzzle::Puzzle;
