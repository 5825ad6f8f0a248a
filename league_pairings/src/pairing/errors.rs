//! Pairing error types.

use thiserror::Error;

use super::models::{DivisionId, GameNumber, Rank, Round, Stage};

/// A schedule or request that violates a pairing invariant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Too few teams: {team_count} (need at least {minimum})")]
    TooFewTeams { team_count: usize, minimum: usize },

    #[error("Too many teams: {team_count} (at most {maximum})")]
    TooManyTeams { team_count: usize, maximum: usize },

    #[error(
        "{team_count} teams do not fit a {}-team bracket starting at stage {}; choose a larger start stage",
        .stage.bracket_size(),
        .stage.key()
    )]
    BracketTooSmall { team_count: usize, stage: Stage },

    #[error("Number of rounds to add must be at least 1, got {0}")]
    InvalidRoundCount(u32),

    #[error("Cannot add {requested} rounds in one block (at most {maximum} for this pool size)")]
    TooManyRounds { requested: u32, maximum: u32 },

    #[error("Round or game numbers would overflow")]
    NumberingOverflow,

    #[error("Cannot split {team_count} teams into {pools} pools of at least two teams")]
    InvalidPoolCount { pools: u8, team_count: usize },

    #[error("Unknown start key: {0:?} (expected one of Z, Y, X, Q, S, F)")]
    UnknownStartKey(String),

    #[error("Unknown slot type: {0:?}")]
    UnknownSlotType(String),

    #[error("Unknown reference outcome: {0:?}")]
    UnknownOutcome(String),

    #[error("Game number must be positive")]
    InvalidGameNumber,

    #[error("Game {game_number}: round must be positive")]
    InvalidRound { game_number: GameNumber },

    #[error("Duplicate game number: {0}")]
    DuplicateGameNumber(GameNumber),

    #[error("Game {game_number}: team {rank} cannot play itself")]
    SelfPairing { game_number: GameNumber, rank: Rank },

    #[error("Game {game_number}: rank {rank} is outside 1..={team_count}")]
    RankOutOfRange {
        game_number: GameNumber,
        rank: Rank,
        team_count: usize,
    },

    #[error(
        "Game {game_number} (round {round}) references game {referenced} in round {referenced_round}; references must point to an earlier round"
    )]
    ForwardReference {
        game_number: GameNumber,
        round: Round,
        referenced: GameNumber,
        referenced_round: Round,
    },

    #[error("Game {game_number} references non-existent game {referenced}")]
    OrphanedReference {
        game_number: GameNumber,
        referenced: GameNumber,
    },

    #[error(
        "Game {game_number}: team {side} slot must be either a team or a game reference, not both"
    )]
    AmbiguousSlot { game_number: GameNumber, side: u8 },
}

/// Pairing errors
#[derive(Debug, Error)]
pub enum PairingError {
    /// Request or resulting schedule violates an invariant
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Another writer allocated game numbers for the division first
    #[error(
        "Concurrent modification of division {division_id}: expected last game number {expected}, found {actual}"
    )]
    Conflict {
        division_id: DivisionId,
        expected: GameNumber,
        actual: GameNumber,
    },

    /// Pairing is still referenced by other pairings
    #[error("Game {game_number} is referenced by game(s) {referenced_by:?}")]
    ReferencedBy {
        game_number: GameNumber,
        referenced_by: Vec<GameNumber>,
    },

    #[error("Game {game_number} not found in division {division_id}")]
    GameNotFound {
        division_id: DivisionId,
        game_number: GameNumber,
    },

    #[error("Division not found: {0}")]
    DivisionNotFound(DivisionId),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl PairingError {
    /// Only conflicts are safe to retry by re-running the same call
    pub fn is_retryable(&self) -> bool {
        matches!(self, PairingError::Conflict { .. })
    }

    /// Short machine-readable category
    pub fn kind(&self) -> &'static str {
        match self {
            PairingError::Validation(_) => "validation",
            PairingError::Conflict { .. } => "conflict",
            PairingError::ReferencedBy { .. } => "referential_integrity",
            PairingError::GameNotFound { .. } | PairingError::DivisionNotFound(_) => "not_found",
            PairingError::Database(_) => "internal",
        }
    }

    /// Get a client-safe error message that doesn't leak database details
    pub fn client_message(&self) -> String {
        match self {
            PairingError::Database(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for pairing operations
pub type PairingResult<T> = Result<T, PairingError>;
