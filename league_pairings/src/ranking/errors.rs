//! Ranking error types.

use thiserror::Error;

use super::models::TeamId;
use crate::pairing::models::{DivisionId, Rank};

/// Ranking errors
#[derive(Debug, Error)]
pub enum RankingError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Team is not part of the division
    #[error("Team {team_id} not found in division {division_id}")]
    TeamNotFound {
        division_id: DivisionId,
        team_id: TeamId,
    },

    /// Division not found
    #[error("Division not found: {0}")]
    DivisionNotFound(DivisionId),

    /// Requested rank is outside the dense range
    #[error("Invalid rank {rank}: must be between 1 and {team_count}")]
    InvalidRank { rank: Rank, team_count: usize },

    /// Team already admitted to the division
    #[error("Team {0} is already in the division")]
    DuplicateTeam(TeamId),

    /// Team names must not be blank
    #[error("Team name must not be empty")]
    EmptyName,
}

impl RankingError {
    /// Short machine-readable category
    pub fn kind(&self) -> &'static str {
        match self {
            RankingError::Database(_) => "internal",
            RankingError::TeamNotFound { .. } | RankingError::DivisionNotFound(_) => "not_found",
            RankingError::DuplicateTeam(_) => "conflict",
            RankingError::InvalidRank { .. } | RankingError::EmptyName => "validation",
        }
    }

    /// Get a client-safe error message that doesn't leak database details
    pub fn client_message(&self) -> String {
        match self {
            RankingError::Database(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for ranking operations
pub type RankingResult<T> = Result<T, RankingError>;
