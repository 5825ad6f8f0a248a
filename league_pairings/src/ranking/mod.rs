//! Division team rankings.
//!
//! Ranks are dense (`1..=N`) and unique within a division. They seed both
//! pairing generators but are only read at generation time.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{RankingError, RankingResult};
pub use manager::RankingManager;
pub use models::{DivisionTeam, EditTeamRequest, TeamId};
