//! Error types for clue-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A clue carries no value, or a combination of units that is not a
    /// registered compound unit.
    #[error("Invalid clue: {0}")]
    InvalidClue(String),

    /// An operation ran on data missing a unit it requires.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid datetime: {0}")]
    InvalidDatetime(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The clues rule out every moment.
    #[error("Contradictory clues: {0}")]
    Contradiction(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
