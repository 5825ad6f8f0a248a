//! # League Pairings
//!
//! Pairing generation engine for league divisions of ranked teams.
//!
//! A division's schedule is a set of numbered games ("pairings"). Each side
//! of a game is either a concrete team (by division rank), a reference to
//! the winner or loser of an earlier game, or an open slot to be filled in
//! by hand.
//!
//! ## Core Modules
//!
//! - [`pairing`]: Round-robin and bracket generators, validation, the
//!   who-plays-who matrix and the [`PairingManager`]
//! - [`ranking`]: Dense team rankings and the [`RankingManager`]
//! - [`db`]: PostgreSQL and in-memory repositories, per-division locks
//!
//! ## Example
//!
//! ```
//! use league_pairings::pairing::{compute_matrix, generate_round_robin_block};
//!
//! // Full cycle for 4 teams: 3 rounds, everyone meets everyone once
//! let pairings = generate_round_robin_block(4, 3, 0, 1).unwrap();
//! let matrix = compute_matrix(&pairings, 4);
//! assert!(matrix.iter().enumerate().all(|(i, row)| row[i] == 0));
//! assert_eq!(matrix[0].iter().sum::<u32>(), 3);
//! ```

/// Storage layer: repositories, connection pool and division locks.
pub mod db;

/// Schedule models, generators, validation and analysis.
pub mod pairing;
pub use pairing::{
    Pairing, PairingError, PairingManager, PairingRecord, PairingResult, SlotType, Stage,
    ValidationError,
};

/// Division rosters and rank management.
pub mod ranking;
pub use ranking::{DivisionTeam, RankingError, RankingManager, RankingResult};
