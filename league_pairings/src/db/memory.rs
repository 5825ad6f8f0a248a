//! In-memory repositories for tests and database-less deployments.

use async_trait::async_trait;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
};
use tokio::sync::RwLock;

use super::repository::{DivisionTeamRepository, PairingRepository};
use crate::pairing::{
    errors::{PairingError, PairingResult},
    models::{DivisionId, GameNumber, Pairing},
    validation::{referencing_games, validate_schedule},
};
use crate::ranking::models::DivisionTeam;

#[derive(Debug, Clone, Default)]
struct DivisionSchedule {
    pairings: BTreeMap<GameNumber, Pairing>,
    /// Highest game number handed out since the last `delete_all`
    high_water: GameNumber,
}

impl DivisionSchedule {
    fn last_game_number(&self) -> GameNumber {
        let max_game = self.pairings.keys().next_back().copied().unwrap_or(0);
        self.high_water.max(max_game)
    }
}

/// `PairingRepository` over a map of division schedules keyed by game number
#[derive(Clone, Default)]
pub struct MemoryPairingRepository {
    schedules: Arc<RwLock<HashMap<DivisionId, DivisionSchedule>>>,
}

impl MemoryPairingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PairingRepository for MemoryPairingRepository {
    async fn list_pairings(&self, division_id: DivisionId) -> PairingResult<Vec<Pairing>> {
        let schedules = self.schedules.read().await;
        Ok(schedules
            .get(&division_id)
            .map(|schedule| schedule.pairings.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn last_game_number(&self, division_id: DivisionId) -> PairingResult<GameNumber> {
        let schedules = self.schedules.read().await;
        Ok(schedules
            .get(&division_id)
            .map(DivisionSchedule::last_game_number)
            .unwrap_or(0))
    }

    async fn append_pairings(
        &self,
        division_id: DivisionId,
        expected_last_game: GameNumber,
        pairings: &[Pairing],
    ) -> PairingResult<()> {
        let mut schedules = self.schedules.write().await;
        let schedule = schedules.entry(division_id).or_default();

        let actual = schedule.last_game_number();
        let collides = pairings
            .iter()
            .any(|p| schedule.pairings.contains_key(&p.game_number));
        if actual != expected_last_game || collides {
            return Err(PairingError::Conflict {
                division_id,
                expected: expected_last_game,
                actual,
            });
        }

        for pairing in pairings {
            schedule.pairings.insert(pairing.game_number, pairing.clone());
            schedule.high_water = schedule.high_water.max(pairing.game_number);
        }
        Ok(())
    }

    async fn update_pairing(
        &self,
        division_id: DivisionId,
        game_number: GameNumber,
        pairing: &Pairing,
    ) -> PairingResult<()> {
        let mut schedules = self.schedules.write().await;
        let schedule = schedules
            .get_mut(&division_id)
            .filter(|schedule| schedule.pairings.contains_key(&game_number))
            .ok_or(PairingError::GameNotFound {
                division_id,
                game_number,
            })?;

        let edited: Vec<Pairing> = schedule
            .pairings
            .values()
            .map(|p| {
                if p.game_number == game_number {
                    pairing.clone()
                } else {
                    p.clone()
                }
            })
            .collect();
        validate_schedule(&edited, None)?;

        schedule.pairings.remove(&game_number);
        schedule.pairings.insert(pairing.game_number, pairing.clone());
        schedule.high_water = schedule.high_water.max(pairing.game_number);
        Ok(())
    }

    async fn delete_pairing(
        &self,
        division_id: DivisionId,
        game_number: GameNumber,
    ) -> PairingResult<()> {
        let mut schedules = self.schedules.write().await;
        let not_found = PairingError::GameNotFound {
            division_id,
            game_number,
        };
        let schedule = schedules.get_mut(&division_id).ok_or(not_found)?;

        let pairings: Vec<Pairing> = schedule.pairings.values().cloned().collect();
        let referenced_by = referencing_games(&pairings, game_number);
        if !referenced_by.is_empty() {
            return Err(PairingError::ReferencedBy {
                game_number,
                referenced_by,
            });
        }

        schedule
            .pairings
            .remove(&game_number)
            .map(|_| ())
            .ok_or(PairingError::GameNotFound {
                division_id,
                game_number,
            })
    }

    async fn delete_all(&self, division_id: DivisionId) -> PairingResult<u64> {
        let mut schedules = self.schedules.write().await;
        Ok(schedules
            .remove(&division_id)
            .map(|schedule| schedule.pairings.len() as u64)
            .unwrap_or(0))
    }
}

#[derive(Debug, Clone)]
struct DivisionEntry {
    #[allow(dead_code)]
    name: String,
    teams: Vec<DivisionTeam>,
}

/// `DivisionTeamRepository` over a map of divisions and rosters
#[derive(Clone)]
pub struct MemoryDivisionTeamRepository {
    divisions: Arc<RwLock<HashMap<DivisionId, DivisionEntry>>>,
    next_id: Arc<AtomicI64>,
}

impl Default for MemoryDivisionTeamRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDivisionTeamRepository {
    pub fn new() -> Self {
        Self {
            divisions: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Seed a division with a roster
    pub async fn with_division(
        self,
        division_id: DivisionId,
        name: &str,
        teams: Vec<DivisionTeam>,
    ) -> Self {
        self.divisions.write().await.insert(
            division_id,
            DivisionEntry {
                name: name.to_string(),
                teams,
            },
        );
        self.next_id.fetch_max(division_id + 1, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl DivisionTeamRepository for MemoryDivisionTeamRepository {
    async fn create_division(&self, name: &str) -> Result<DivisionId, sqlx::Error> {
        let division_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.divisions.write().await.insert(
            division_id,
            DivisionEntry {
                name: name.to_string(),
                teams: Vec::new(),
            },
        );
        Ok(division_id)
    }

    async fn division_exists(&self, division_id: DivisionId) -> Result<bool, sqlx::Error> {
        Ok(self.divisions.read().await.contains_key(&division_id))
    }

    async fn list_teams(&self, division_id: DivisionId) -> Result<Vec<DivisionTeam>, sqlx::Error> {
        let divisions = self.divisions.read().await;
        let mut teams = divisions
            .get(&division_id)
            .map(|entry| entry.teams.clone())
            .unwrap_or_default();
        teams.sort_by_key(|t| t.rank);
        Ok(teams)
    }

    async fn replace_roster(
        &self,
        division_id: DivisionId,
        teams: &[DivisionTeam],
    ) -> Result<(), sqlx::Error> {
        let mut divisions = self.divisions.write().await;
        let entry = divisions
            .get_mut(&division_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        entry.teams = teams.to_vec();
        Ok(())
    }
}
