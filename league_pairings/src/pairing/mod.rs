//! Pairing generation for league divisions.
//!
//! This module provides:
//! - Round-robin blocks (circle method) with optional `RRDk` sub-pools
//! - Single-elimination brackets with standard seeding, byes and an optional
//!   consolation game
//! - Schedule validation shared by generators and manual edits
//! - The who-plays-who matchup matrix
//!
//! ## Example
//!
//! ```
//! use league_pairings::pairing::{Stage, generate_elimination_bracket, validate_schedule};
//!
//! // 8-team bracket starting at the quarterfinals: 4 + 2 + 1 games
//! let bracket = generate_elimination_bracket(8, Stage::Quarterfinal, 0, 1).unwrap();
//! assert_eq!(bracket.len(), 7);
//! assert!(validate_schedule(&bracket, Some(8)).is_ok());
//! ```

pub mod elimination;
pub mod errors;
pub mod manager;
pub mod matrix;
pub mod models;
pub mod round_robin;
pub mod validation;

pub use elimination::{BracketOptions, generate_bracket, generate_elimination_bracket};
pub use errors::{PairingError, PairingResult, ValidationError};
pub use manager::PairingManager;
pub use matrix::{WhoPlaysWho, compute_matrix};
pub use models::{
    DivisionId, GameNumber, Pairing, PairingRecord, PairingSide, Rank, RefOutcome, Round, Slot,
    SlotType, Stage,
};
pub use round_robin::{generate_pooled_block, generate_round_robin_block};
pub use validation::validate_schedule;
