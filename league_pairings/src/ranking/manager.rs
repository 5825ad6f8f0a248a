//! Ranking manager: the ordered roster that seeds the pairing generators.
//!
//! Rank changes never touch existing pairings. A schedule seeded from an
//! older ranking stays as generated until it is removed and regenerated.

use std::sync::Arc;

use super::{
    errors::{RankingError, RankingResult},
    models::{DivisionTeam, EditTeamRequest, TeamId, is_dense, move_to_rank, resequence},
};
use crate::db::{DivisionLocks, DivisionTeamRepository};
use crate::pairing::models::{DivisionId, Rank};

/// Division team ranking manager
#[derive(Clone)]
pub struct RankingManager {
    teams: Arc<dyn DivisionTeamRepository>,
    locks: DivisionLocks,
}

impl RankingManager {
    /// Create a new ranking manager
    ///
    /// # Arguments
    ///
    /// * `teams` - Division/roster repository
    /// * `locks` - Per-division writer locks, shared with the pairing manager
    pub fn new(teams: Arc<dyn DivisionTeamRepository>, locks: DivisionLocks) -> Self {
        Self { teams, locks }
    }

    /// Create an empty division
    pub async fn create_division(&self, name: &str) -> RankingResult<DivisionId> {
        if name.trim().is_empty() {
            return Err(RankingError::EmptyName);
        }
        let division_id = self.teams.create_division(name.trim()).await?;
        log::info!("Created division {} '{}'", division_id, name.trim());
        Ok(division_id)
    }

    /// Roster ordered by rank (GetDivisionTeams)
    pub async fn list_teams(&self, division_id: DivisionId) -> RankingResult<Vec<DivisionTeam>> {
        self.ensure_division(division_id).await?;
        let mut teams = self.teams.list_teams(division_id).await?;
        if !is_dense(&teams) {
            log::warn!("Division {} has non-dense ranks, resequencing view", division_id);
            resequence(&mut teams);
        }
        Ok(teams)
    }

    /// Admit a team at the bottom of the ranking (rank N + 1)
    ///
    /// # Errors
    ///
    /// * `RankingError::DuplicateTeam` - Team already on the roster
    /// * `RankingError::EmptyName` - Blank team name
    pub async fn add_team(
        &self,
        division_id: DivisionId,
        team_id: TeamId,
        team_name: &str,
    ) -> RankingResult<Vec<DivisionTeam>> {
        let team_name = non_empty(team_name)?;
        let _guard = self.locks.acquire(division_id).await;
        let mut teams = self.load(division_id).await?;

        if teams.iter().any(|t| t.team_id == team_id) {
            return Err(RankingError::DuplicateTeam(team_id));
        }

        teams.push(DivisionTeam::new(
            team_id,
            teams.len() as Rank + 1,
            team_name,
        ));
        self.teams.replace_roster(division_id, &teams).await?;
        log::info!("Added team {} to division {}", team_id, division_id);
        Ok(teams)
    }

    /// Remove a team; ranks below it move up by one
    pub async fn remove_team(
        &self,
        division_id: DivisionId,
        team_id: TeamId,
    ) -> RankingResult<Vec<DivisionTeam>> {
        let _guard = self.locks.acquire(division_id).await;
        let mut teams = self.load(division_id).await?;

        let before = teams.len();
        teams.retain(|t| t.team_id != team_id);
        if teams.len() == before {
            return Err(RankingError::TeamNotFound {
                division_id,
                team_id,
            });
        }

        resequence(&mut teams);
        self.teams.replace_roster(division_id, &teams).await?;
        log::info!("Removed team {} from division {}", team_id, division_id);
        Ok(teams)
    }

    /// Move a team to `new_rank`, shifting the teams in between (Reorder)
    ///
    /// # Errors
    ///
    /// * `RankingError::InvalidRank` - `new_rank` outside `1..=N`
    /// * `RankingError::TeamNotFound` - Team not on the roster
    pub async fn reorder(
        &self,
        division_id: DivisionId,
        team_id: TeamId,
        new_rank: Rank,
    ) -> RankingResult<Vec<DivisionTeam>> {
        let _guard = self.locks.acquire(division_id).await;
        let mut teams = self.load(division_id).await?;

        move_to_rank(&mut teams, division_id, team_id, new_rank)?;
        self.teams.replace_roster(division_id, &teams).await?;
        Ok(teams)
    }

    /// Change a team's display name (Rename)
    pub async fn rename(
        &self,
        division_id: DivisionId,
        team_id: TeamId,
        team_name: &str,
    ) -> RankingResult<DivisionTeam> {
        let team_name = non_empty(team_name)?;
        let _guard = self.locks.acquire(division_id).await;
        let mut teams = self.load(division_id).await?;

        let team = teams
            .iter_mut()
            .find(|t| t.team_id == team_id)
            .ok_or(RankingError::TeamNotFound {
                division_id,
                team_id,
            })?;
        team.team_name = team_name.to_string();
        let renamed = team.clone();

        self.teams.replace_roster(division_id, &teams).await?;
        Ok(renamed)
    }

    /// Apply a rank and/or name change in one write (EditDivisionTeam)
    pub async fn edit_team(
        &self,
        division_id: DivisionId,
        team_id: TeamId,
        request: EditTeamRequest,
    ) -> RankingResult<Vec<DivisionTeam>> {
        let team_name = request.team_name.as_deref().map(non_empty).transpose()?;
        let _guard = self.locks.acquire(division_id).await;
        let mut teams = self.load(division_id).await?;

        let team = teams
            .iter_mut()
            .find(|t| t.team_id == team_id)
            .ok_or(RankingError::TeamNotFound {
                division_id,
                team_id,
            })?;
        if let Some(name) = team_name {
            team.team_name = name.to_string();
        }
        if let Some(rank) = request.rank {
            move_to_rank(&mut teams, division_id, team_id, rank)?;
        }

        self.teams.replace_roster(division_id, &teams).await?;
        Ok(teams)
    }

    async fn ensure_division(&self, division_id: DivisionId) -> RankingResult<()> {
        if self.teams.division_exists(division_id).await? {
            Ok(())
        } else {
            Err(RankingError::DivisionNotFound(division_id))
        }
    }

    /// Current roster, densely ranked
    async fn load(&self, division_id: DivisionId) -> RankingResult<Vec<DivisionTeam>> {
        self.ensure_division(division_id).await?;
        let mut teams = self.teams.list_teams(division_id).await?;
        resequence(&mut teams);
        Ok(teams)
    }
}

fn non_empty(name: &str) -> RankingResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(RankingError::EmptyName)
    } else {
        Ok(trimmed)
    }
}
