//! Pairing manager: generator calls, manual edits and the matchup matrix for
//! one division at a time.

use std::sync::Arc;

use super::{
    elimination::{BracketOptions, generate_bracket},
    errors::{PairingError, PairingResult, ValidationError},
    matrix::WhoPlaysWho,
    models::{
        DivisionId, GameNumber, Pairing, PairingSide, Round, SlotType, Stage, schedule_bounds,
    },
    round_robin::generate_pooled_block,
    validation::{check_ranks, referencing_games, validate_schedule},
};
use crate::db::{DivisionLocks, DivisionTeamRepository, PairingRepository};

/// Default upper bound on the team count accepted by generator calls
pub const DEFAULT_MAX_TEAMS: usize = 64;

/// Pairing manager
///
/// Every mutating call holds the division's lock for its whole
/// read-generate-validate-append sequence, and appends with the last game
/// number it read so that writers in other processes are detected as a
/// `PairingError::Conflict`. New game numbers continue after the highest
/// number ever allocated, so a deleted game's number is never reused until
/// `remove_all`.
#[derive(Clone)]
pub struct PairingManager {
    /// Pairing storage
    pairings: Arc<dyn PairingRepository>,

    /// Division lookup and rosters
    teams: Arc<dyn DivisionTeamRepository>,

    /// Per-division writer locks, shared with the ranking manager
    locks: DivisionLocks,

    /// Largest team count accepted by generators and the matrix
    max_teams: usize,
}

impl PairingManager {
    /// Create a new pairing manager
    ///
    /// # Arguments
    ///
    /// * `pairings` - Pairing repository
    /// * `teams` - Division/roster repository
    /// * `locks` - Per-division writer locks
    pub fn new(
        pairings: Arc<dyn PairingRepository>,
        teams: Arc<dyn DivisionTeamRepository>,
        locks: DivisionLocks,
    ) -> Self {
        Self {
            pairings,
            teams,
            locks,
            max_teams: DEFAULT_MAX_TEAMS,
        }
    }

    /// Override the team count limit
    pub fn with_max_teams(mut self, max_teams: usize) -> Self {
        self.max_teams = max_teams;
        self
    }

    pub fn max_teams(&self) -> usize {
        self.max_teams
    }

    /// Current schedule of a division, ordered by game number
    pub async fn list_pairings(&self, division_id: DivisionId) -> PairingResult<Vec<Pairing>> {
        self.ensure_division(division_id).await?;
        self.pairings.list_pairings(division_id).await
    }

    /// Number of teams on the division's roster
    pub async fn roster_size(&self, division_id: DivisionId) -> PairingResult<usize> {
        self.ensure_division(division_id).await?;
        Ok(self.teams.list_teams(division_id).await?.len())
    }

    /// Append `no_rounds` round-robin rounds (AddBlock).
    ///
    /// With `pools > 1` the ranks are split into sub-pools tagged `RRDk`.
    ///
    /// # Returns
    ///
    /// * `PairingResult<Vec<Pairing>>` - The newly created pairings
    ///
    /// # Errors
    ///
    /// * `PairingError::Validation` - Bad team count, round count or pool count
    /// * `PairingError::Conflict` - Another writer appended first
    /// * `PairingError::DivisionNotFound` - Unknown division
    pub async fn add_block(
        &self,
        division_id: DivisionId,
        no_rounds: u32,
        team_count: usize,
        pools: u8,
    ) -> PairingResult<Vec<Pairing>> {
        self.check_team_count(team_count)?;
        let _guard = self.locks.acquire(division_id).await;
        self.ensure_division(division_id).await?;

        let existing = self.pairings.list_pairings(division_id).await?;
        let (max_round, last_game) = self.allocation_bounds(division_id, &existing).await?;
        let next_game = successor(last_game)?;
        let generated = generate_pooled_block(team_count, pools, no_rounds, max_round, next_game)?;

        self.commit(division_id, existing, last_game, generated).await
    }

    /// Append a single-elimination bracket from `start_key` down to the Final
    /// (AddElimination)
    ///
    /// # Errors
    ///
    /// * `PairingError::Validation` - Unknown start key, or more teams than
    ///   the start stage holds
    /// * `PairingError::Conflict` - Another writer appended first
    /// * `PairingError::DivisionNotFound` - Unknown division
    pub async fn add_elimination(
        &self,
        division_id: DivisionId,
        start_key: &str,
        team_count: usize,
        options: BracketOptions,
    ) -> PairingResult<Vec<Pairing>> {
        let start = Stage::from_key(start_key)?;
        self.check_team_count(team_count)?;
        let _guard = self.locks.acquire(division_id).await;
        self.ensure_division(division_id).await?;

        let existing = self.pairings.list_pairings(division_id).await?;
        let (max_round, last_game) = self.allocation_bounds(division_id, &existing).await?;
        let next_game = successor(last_game)?;
        let generated = generate_bracket(team_count, start, max_round, next_game, options)?;

        self.commit(division_id, existing, last_game, generated).await
    }

    /// Append one blank pairing in a new round for manual editing (AddSingle)
    pub async fn add_single(
        &self,
        division_id: DivisionId,
        team_count: usize,
    ) -> PairingResult<Pairing> {
        self.check_team_count(team_count)?;
        let _guard = self.locks.acquire(division_id).await;
        self.ensure_division(division_id).await?;

        let existing = self.pairings.list_pairings(division_id).await?;
        let (max_round, last_game) = self.allocation_bounds(division_id, &existing).await?;
        let game_number = successor(last_game)?;
        let pairing = Pairing::new(
            game_number,
            successor(max_round)?,
            PairingSide::open(SlotType::RoundRobin),
            PairingSide::open(SlotType::RoundRobin),
        );

        let mut created = self
            .commit(division_id, existing, last_game, vec![pairing])
            .await?;
        created.pop().ok_or(PairingError::GameNotFound {
            division_id,
            game_number,
        })
    }

    /// Delete the division's whole schedule (RemoveAll).
    ///
    /// The only operation that lets game numbers restart from 1.
    ///
    /// # Returns
    ///
    /// * `PairingResult<u64>` - Number of pairings removed
    pub async fn remove_all(&self, division_id: DivisionId) -> PairingResult<u64> {
        let _guard = self.locks.acquire(division_id).await;
        self.ensure_division(division_id).await?;

        let removed = self.pairings.delete_all(division_id).await?;
        log::info!("Removed {} pairings from division {}", removed, division_id);
        Ok(removed)
    }

    /// Replace pairing `game_number` with `pairing` (EditPairing).
    ///
    /// The whole schedule is revalidated with the edit applied before
    /// anything is written. `pairing.game_number` may differ from
    /// `game_number` to renumber the game.
    ///
    /// # Errors
    ///
    /// * `PairingError::GameNotFound` - No pairing with `game_number`
    /// * `PairingError::Validation` - The edited schedule violates an invariant
    pub async fn edit_pairing(
        &self,
        division_id: DivisionId,
        game_number: GameNumber,
        pairing: Pairing,
    ) -> PairingResult<Pairing> {
        let _guard = self.locks.acquire(division_id).await;
        self.ensure_division(division_id).await?;

        let mut schedule = self.pairings.list_pairings(division_id).await?;
        let position = schedule
            .iter()
            .position(|p| p.game_number == game_number)
            .ok_or(PairingError::GameNotFound {
                division_id,
                game_number,
            })?;

        let roster_size = self.teams.list_teams(division_id).await?.len();
        if roster_size > 0 {
            check_ranks(&pairing, roster_size)?;
        }

        schedule[position] = pairing.clone();
        validate_schedule(&schedule, None)?;

        self.pairings
            .update_pairing(division_id, game_number, &pairing)
            .await?;
        log::info!("Edited game {} in division {}", game_number, division_id);
        Ok(pairing)
    }

    /// Delete one pairing (DeletePairing)
    ///
    /// # Errors
    ///
    /// * `PairingError::ReferencedBy` - Other pairings still reference it
    /// * `PairingError::GameNotFound` - No pairing with `game_number`
    pub async fn delete_pairing(
        &self,
        division_id: DivisionId,
        game_number: GameNumber,
    ) -> PairingResult<()> {
        let _guard = self.locks.acquire(division_id).await;
        self.ensure_division(division_id).await?;

        let schedule = self.pairings.list_pairings(division_id).await?;
        if !schedule.iter().any(|p| p.game_number == game_number) {
            return Err(PairingError::GameNotFound {
                division_id,
                game_number,
            });
        }

        let referenced_by = referencing_games(&schedule, game_number);
        if !referenced_by.is_empty() {
            log::warn!(
                "Refusing to delete game {} in division {}: referenced by {:?}",
                game_number,
                division_id,
                referenced_by
            );
            return Err(PairingError::ReferencedBy {
                game_number,
                referenced_by,
            });
        }

        self.pairings.delete_pairing(division_id, game_number).await?;
        log::info!("Deleted game {} in division {}", game_number, division_id);
        Ok(())
    }

    /// Matchup counts for ranks `1..=team_count` (GetWhoPlaysWho)
    pub async fn who_plays_who(
        &self,
        division_id: DivisionId,
        team_count: usize,
    ) -> PairingResult<WhoPlaysWho> {
        if team_count > self.max_teams {
            return Err(ValidationError::TooManyTeams {
                team_count,
                maximum: self.max_teams,
            }
            .into());
        }
        self.ensure_division(division_id).await?;

        let schedule = self.pairings.list_pairings(division_id).await?;
        Ok(WhoPlaysWho::from_pairings(&schedule, team_count))
    }

    fn check_team_count(&self, team_count: usize) -> Result<(), ValidationError> {
        if team_count > self.max_teams {
            return Err(ValidationError::TooManyTeams {
                team_count,
                maximum: self.max_teams,
            });
        }
        Ok(())
    }

    async fn ensure_division(&self, division_id: DivisionId) -> PairingResult<()> {
        if self.teams.division_exists(division_id).await? {
            Ok(())
        } else {
            Err(PairingError::DivisionNotFound(division_id))
        }
    }

    /// Highest round of `existing` and the last game number allocated in the
    /// division. Deleted games keep their numbers allocated.
    async fn allocation_bounds(
        &self,
        division_id: DivisionId,
        existing: &[Pairing],
    ) -> PairingResult<(Round, GameNumber)> {
        let (max_round, max_game) = schedule_bounds(existing);
        let last_game = self.pairings.last_game_number(division_id).await?;
        Ok((max_round, last_game.max(max_game)))
    }

    /// Validate `existing + generated` and append `generated` as one batch
    async fn commit(
        &self,
        division_id: DivisionId,
        mut existing: Vec<Pairing>,
        expected_last_game: GameNumber,
        generated: Vec<Pairing>,
    ) -> PairingResult<Vec<Pairing>> {
        existing.extend(generated.iter().cloned());
        validate_schedule(&existing, None)?;

        if let Err(err) = self
            .pairings
            .append_pairings(division_id, expected_last_game, &generated)
            .await
        {
            if err.is_retryable() {
                log::warn!("Append to division {} rejected: {}", division_id, err);
            }
            return Err(err);
        }

        log::info!(
            "Added {} pairings to division {} after game {}",
            generated.len(),
            division_id,
            expected_last_game
        );
        Ok(generated)
    }
}

fn successor(number: u32) -> Result<u32, ValidationError> {
    number.checked_add(1).ok_or(ValidationError::NumberingOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryDivisionTeamRepository, MemoryPairingRepository};
    use crate::pairing::models::Slot;
    use crate::ranking::models::DivisionTeam;

    async fn manager_with_division(teams: Vec<DivisionTeam>) -> PairingManager {
        let rosters = MemoryDivisionTeamRepository::new()
            .with_division(1, "U10 Silver", teams)
            .await;
        PairingManager::new(
            Arc::new(MemoryPairingRepository::new()),
            Arc::new(rosters),
            DivisionLocks::new(),
        )
    }

    #[tokio::test]
    async fn test_add_single_appends_open_pairing() {
        let manager = manager_with_division(Vec::new()).await;
        manager.add_block(1, 2, 4, 1).await.unwrap();

        let single = manager.add_single(1, 4).await.unwrap();
        assert_eq!(single.game_number, 5);
        assert_eq!(single.round, 3);
        assert_eq!(single.team1.slot, Slot::Open);
        assert_eq!(single.team2.slot_type, SlotType::RoundRobin);
    }

    #[tokio::test]
    async fn test_deleted_game_number_is_not_reused() {
        let manager = manager_with_division(Vec::new()).await;
        let block = manager.add_block(1, 1, 4, 1).await.unwrap();
        assert_eq!(block.last().map(|p| p.game_number), Some(2));

        manager.delete_pairing(1, 2).await.unwrap();
        let single = manager.add_single(1, 4).await.unwrap();
        assert_eq!(single.game_number, 3);

        let next_block = manager.add_block(1, 1, 4, 1).await.unwrap();
        let numbers: Vec<GameNumber> = next_block.iter().map(|p| p.game_number).collect();
        assert_eq!(numbers, vec![4, 5]);
    }

    #[tokio::test]
    async fn test_remove_all_restarts_numbering() {
        let manager = manager_with_division(Vec::new()).await;
        manager.add_block(1, 2, 4, 1).await.unwrap();
        manager.delete_pairing(1, 4).await.unwrap();
        assert_eq!(manager.remove_all(1).await.unwrap(), 3);

        let single = manager.add_single(1, 4).await.unwrap();
        assert_eq!((single.game_number, single.round), (1, 1));
    }

    #[tokio::test]
    async fn test_oversized_block_is_rejected() {
        let manager = manager_with_division(Vec::new()).await;
        manager.add_block(1, 1, 4, 1).await.unwrap();

        assert!(matches!(
            manager.add_block(1, u32::MAX, 4, 1).await,
            Err(PairingError::Validation(ValidationError::TooManyRounds {
                requested: u32::MAX,
                ..
            }))
        ));
        assert_eq!(manager.list_pairings(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_division() {
        let manager = manager_with_division(Vec::new()).await;
        assert!(matches!(
            manager.add_block(42, 1, 4, 1).await,
            Err(PairingError::DivisionNotFound(42))
        ));
        assert!(matches!(
            manager.list_pairings(42).await,
            Err(PairingError::DivisionNotFound(42))
        ));
    }

    #[tokio::test]
    async fn test_team_count_limit() {
        let manager = manager_with_division(Vec::new()).await.with_max_teams(8);
        assert!(matches!(
            manager.add_elimination(1, "X", 9, BracketOptions::default()).await,
            Err(PairingError::Validation(ValidationError::TooManyTeams {
                team_count: 9,
                maximum: 8
            }))
        ));
        assert!(manager.who_plays_who(1, 100).await.is_err());
    }

    #[tokio::test]
    async fn test_edit_checks_ranks_against_roster() {
        let roster = vec![
            DivisionTeam::new(1, 1, "A"),
            DivisionTeam::new(2, 2, "B"),
            DivisionTeam::new(3, 3, "C"),
        ];
        let manager = manager_with_division(roster).await;
        let single = manager.add_single(1, 3).await.unwrap();

        let mut edited = single.clone();
        edited.team1 = PairingSide::team(SlotType::RoundRobin, 1);
        edited.team2 = PairingSide::team(SlotType::RoundRobin, 4);
        assert!(matches!(
            manager.edit_pairing(1, single.game_number, edited.clone()).await,
            Err(PairingError::Validation(ValidationError::RankOutOfRange { rank: 4, .. }))
        ));

        edited.team2 = PairingSide::team(SlotType::RoundRobin, 3);
        let saved = manager
            .edit_pairing(1, single.game_number, edited.clone())
            .await
            .unwrap();
        assert_eq!(saved.concrete_teams(), Some((1, 3)));
    }

    #[tokio::test]
    async fn test_edit_missing_game() {
        let manager = manager_with_division(Vec::new()).await;
        let pairing = Pairing::new(
            9,
            1,
            PairingSide::open(SlotType::RoundRobin),
            PairingSide::open(SlotType::RoundRobin),
        );
        assert!(matches!(
            manager.edit_pairing(1, 9, pairing).await,
            Err(PairingError::GameNotFound { game_number: 9, .. })
        ));
    }
}
