//! Repository traits for pairing schedules and division rosters, with their
//! PostgreSQL implementations.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool, Postgres, Row, Transaction, postgres::PgRow};
use std::str::FromStr;

use crate::pairing::{
    errors::{PairingError, PairingResult, ValidationError},
    models::{DivisionId, GameNumber, Pairing, PairingRecord},
    validation::validate_schedule,
};
use crate::ranking::models::DivisionTeam;

/// Storage for a division's pairing schedule
#[async_trait]
pub trait PairingRepository: Send + Sync {
    /// All pairings of a division, ordered by game number
    async fn list_pairings(&self, division_id: DivisionId) -> PairingResult<Vec<Pairing>>;

    /// Highest game number allocated in the division since its last
    /// `delete_all`, including games deleted since. Zero for an empty
    /// division.
    async fn last_game_number(&self, division_id: DivisionId) -> PairingResult<GameNumber>;

    /// Append a batch atomically.
    ///
    /// Fails with `PairingError::Conflict` when the division's last allocated
    /// game number differs from `expected_last_game`; nothing is written then.
    async fn append_pairings(
        &self,
        division_id: DivisionId,
        expected_last_game: GameNumber,
        pairings: &[Pairing],
    ) -> PairingResult<()>;

    /// Replace pairing `game_number`; `pairing` may carry a new game number.
    ///
    /// The stored schedule is revalidated with the edit applied while writers
    /// are locked out, so an edit checked against a stale read is rejected.
    async fn update_pairing(
        &self,
        division_id: DivisionId,
        game_number: GameNumber,
        pairing: &Pairing,
    ) -> PairingResult<()>;

    /// Delete one pairing; rejected while other pairings reference it
    async fn delete_pairing(
        &self,
        division_id: DivisionId,
        game_number: GameNumber,
    ) -> PairingResult<()>;

    /// Delete every pairing of a division, returning how many were removed.
    /// Game numbering restarts from 1 afterwards.
    async fn delete_all(&self, division_id: DivisionId) -> PairingResult<u64>;
}

/// Storage for divisions and their ranked rosters
#[async_trait]
pub trait DivisionTeamRepository: Send + Sync {
    /// Create a division and return its ID
    async fn create_division(&self, name: &str) -> Result<DivisionId, sqlx::Error>;

    async fn division_exists(&self, division_id: DivisionId) -> Result<bool, sqlx::Error>;

    /// Roster ordered by rank
    async fn list_teams(&self, division_id: DivisionId) -> Result<Vec<DivisionTeam>, sqlx::Error>;

    /// Atomically replace the roster: teams not listed are removed, listed
    /// teams are inserted or updated
    async fn replace_roster(
        &self,
        division_id: DivisionId,
        teams: &[DivisionTeam],
    ) -> Result<(), sqlx::Error>;
}

/// PostgreSQL implementation of `PairingRepository`
pub struct PgPairingRepository {
    pool: PgPool,
}

impl PgPairingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Serialize writers for one division until the transaction ends
    async fn lock_division(
        tx: &mut Transaction<'_, Postgres>,
        division_id: DivisionId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(division_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn fetch_schedule<'e, E: PgExecutor<'e>>(
        executor: E,
        division_id: DivisionId,
    ) -> PairingResult<Vec<Pairing>> {
        let rows = sqlx::query(
            r#"
            SELECT game_number, round,
                   team1_slot, team1_type, team1_game_ref, team1_ref_outcome, team1_annotation,
                   team2_slot, team2_type, team2_game_ref, team2_ref_outcome, team2_annotation
            FROM pairings
            WHERE division_id = $1
            ORDER BY game_number
            "#,
        )
        .bind(division_id)
        .fetch_all(executor)
        .await?;

        let pairings = rows
            .iter()
            .map(pairing_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pairings)
    }

    async fn fetch_last_game_number<'e, E: PgExecutor<'e>>(
        executor: E,
        division_id: DivisionId,
    ) -> PairingResult<GameNumber> {
        let row = sqlx::query(
            r#"
            SELECT GREATEST(
                d.last_game_number,
                COALESCE((SELECT MAX(p.game_number) FROM pairings p WHERE p.division_id = d.id), 0)
            ) AS last_game
            FROM divisions d
            WHERE d.id = $1
            "#,
        )
        .bind(division_id)
        .fetch_optional(executor)
        .await?
        .ok_or(PairingError::DivisionNotFound(division_id))?;

        Ok(column_u32(&row, "last_game")?)
    }

    /// Never lowers the mark; only `delete_all` resets it
    async fn raise_last_game_number(
        tx: &mut Transaction<'_, Postgres>,
        division_id: DivisionId,
        game_number: GameNumber,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE divisions SET last_game_number = GREATEST(last_game_number, $2) WHERE id = $1",
        )
        .bind(division_id)
        .bind(i64::from(game_number))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn referencing_games(
        tx: &mut Transaction<'_, Postgres>,
        division_id: DivisionId,
        game_number: GameNumber,
    ) -> Result<Vec<GameNumber>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT game_number FROM pairings
            WHERE division_id = $1 AND game_number <> $2
              AND (team1_game_ref = $2 OR team2_game_ref = $2)
            ORDER BY game_number
            "#,
        )
        .bind(division_id)
        .bind(i64::from(game_number))
        .fetch_all(&mut **tx)
        .await?;

        rows.iter().map(|row| column_u32(row, "game_number")).collect()
    }

    async fn insert_pairing(
        tx: &mut Transaction<'_, Postgres>,
        division_id: DivisionId,
        pairing: &Pairing,
    ) -> Result<(), sqlx::Error> {
        let record = PairingRecord::from(pairing.clone());
        sqlx::query(
            r#"
            INSERT INTO pairings (
                division_id, game_number, round,
                team1_slot, team1_type, team1_game_ref, team1_ref_outcome, team1_annotation,
                team2_slot, team2_type, team2_game_ref, team2_ref_outcome, team2_annotation
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(division_id)
        .bind(i64::from(record.game_number))
        .bind(i64::from(record.round))
        .bind(record.team1_slot.map(i64::from))
        .bind(record.team1_type.to_string())
        .bind(record.team1_game_ref.map(i64::from))
        .bind(record.team1_ref_outcome.map(|o| o.to_string()))
        .bind(record.team1_annotation.as_deref())
        .bind(record.team2_slot.map(i64::from))
        .bind(record.team2_type.to_string())
        .bind(record.team2_game_ref.map(i64::from))
        .bind(record.team2_ref_outcome.map(|o| o.to_string()))
        .bind(record.team2_annotation.as_deref())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl PairingRepository for PgPairingRepository {
    async fn list_pairings(&self, division_id: DivisionId) -> PairingResult<Vec<Pairing>> {
        Self::fetch_schedule(&self.pool, division_id).await
    }

    async fn last_game_number(&self, division_id: DivisionId) -> PairingResult<GameNumber> {
        Self::fetch_last_game_number(&self.pool, division_id).await
    }

    async fn append_pairings(
        &self,
        division_id: DivisionId,
        expected_last_game: GameNumber,
        pairings: &[Pairing],
    ) -> PairingResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::lock_division(&mut tx, division_id).await?;

        let actual = Self::fetch_last_game_number(&mut *tx, division_id).await?;
        if actual != expected_last_game {
            return Err(PairingError::Conflict {
                division_id,
                expected: expected_last_game,
                actual,
            });
        }

        for pairing in pairings {
            if let Err(err) = Self::insert_pairing(&mut tx, division_id, pairing).await {
                return Err(match err {
                    sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                        PairingError::Conflict {
                            division_id,
                            expected: expected_last_game,
                            actual,
                        }
                    }
                    other => PairingError::Database(other),
                });
            }
        }

        if let Some(last) = pairings.iter().map(|p| p.game_number).max() {
            Self::raise_last_game_number(&mut tx, division_id, last).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_pairing(
        &self,
        division_id: DivisionId,
        game_number: GameNumber,
        pairing: &Pairing,
    ) -> PairingResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::lock_division(&mut tx, division_id).await?;

        let mut schedule = Self::fetch_schedule(&mut *tx, division_id).await?;
        let position = schedule
            .iter()
            .position(|p| p.game_number == game_number)
            .ok_or(PairingError::GameNotFound {
                division_id,
                game_number,
            })?;
        schedule[position] = pairing.clone();
        validate_schedule(&schedule, None)?;

        let record = PairingRecord::from(pairing.clone());
        sqlx::query(
            r#"
            UPDATE pairings SET
                game_number = $14,
                round = $3,
                team1_slot = $4, team1_type = $5, team1_game_ref = $6,
                team1_ref_outcome = $7, team1_annotation = $8,
                team2_slot = $9, team2_type = $10, team2_game_ref = $11,
                team2_ref_outcome = $12, team2_annotation = $13,
                updated_at = NOW()
            WHERE division_id = $1 AND game_number = $2
            "#,
        )
        .bind(division_id)
        .bind(i64::from(game_number))
        .bind(i64::from(record.round))
        .bind(record.team1_slot.map(i64::from))
        .bind(record.team1_type.to_string())
        .bind(record.team1_game_ref.map(i64::from))
        .bind(record.team1_ref_outcome.map(|o| o.to_string()))
        .bind(record.team1_annotation.as_deref())
        .bind(record.team2_slot.map(i64::from))
        .bind(record.team2_type.to_string())
        .bind(record.team2_game_ref.map(i64::from))
        .bind(record.team2_ref_outcome.map(|o| o.to_string()))
        .bind(record.team2_annotation.as_deref())
        .bind(i64::from(record.game_number))
        .execute(&mut *tx)
        .await?;

        Self::raise_last_game_number(&mut tx, division_id, pairing.game_number).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_pairing(
        &self,
        division_id: DivisionId,
        game_number: GameNumber,
    ) -> PairingResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::lock_division(&mut tx, division_id).await?;

        let referenced_by = Self::referencing_games(&mut tx, division_id, game_number).await?;
        if !referenced_by.is_empty() {
            return Err(PairingError::ReferencedBy {
                game_number,
                referenced_by,
            });
        }

        let result = sqlx::query("DELETE FROM pairings WHERE division_id = $1 AND game_number = $2")
            .bind(division_id)
            .bind(i64::from(game_number))
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PairingError::GameNotFound {
                division_id,
                game_number,
            });
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_all(&self, division_id: DivisionId) -> PairingResult<u64> {
        let mut tx = self.pool.begin().await?;
        Self::lock_division(&mut tx, division_id).await?;

        let result = sqlx::query("DELETE FROM pairings WHERE division_id = $1")
            .bind(division_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE divisions SET last_game_number = 0 WHERE id = $1")
            .bind(division_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}

/// PostgreSQL implementation of `DivisionTeamRepository`
pub struct PgDivisionTeamRepository {
    pool: PgPool,
}

impl PgDivisionTeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DivisionTeamRepository for PgDivisionTeamRepository {
    async fn create_division(&self, name: &str) -> Result<DivisionId, sqlx::Error> {
        let row = sqlx::query("INSERT INTO divisions (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("id"))
    }

    async fn division_exists(&self, division_id: DivisionId) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM divisions WHERE id = $1) AS found")
            .bind(division_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("found"))
    }

    async fn list_teams(&self, division_id: DivisionId) -> Result<Vec<DivisionTeam>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT team_id, rank, team_name
            FROM division_teams
            WHERE division_id = $1
            ORDER BY rank
            "#,
        )
        .bind(division_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<DivisionTeam, sqlx::Error> {
                Ok(DivisionTeam {
                    team_id: row.try_get("team_id")?,
                    rank: column_u32(row, "rank")?,
                    team_name: row.try_get("team_name")?,
                })
            })
            .collect()
    }

    async fn replace_roster(
        &self,
        division_id: DivisionId,
        teams: &[DivisionTeam],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let keep: Vec<i64> = teams.iter().map(|t| t.team_id).collect();

        sqlx::query("DELETE FROM division_teams WHERE division_id = $1 AND team_id <> ALL($2)")
            .bind(division_id)
            .bind(&keep)
            .execute(&mut *tx)
            .await?;

        for team in teams {
            sqlx::query(
                r#"
                INSERT INTO division_teams (division_id, team_id, rank, team_name)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (division_id, team_id)
                DO UPDATE SET rank = EXCLUDED.rank, team_name = EXCLUDED.team_name
                "#,
            )
            .bind(division_id)
            .bind(team.team_id)
            .bind(i64::from(team.rank))
            .bind(&team.team_name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn column_u32(row: &PgRow, column: &str) -> Result<u32, sqlx::Error> {
    let value: i64 = row.try_get(column)?;
    u32::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn optional_u32(row: &PgRow, column: &str) -> Result<Option<u32>, sqlx::Error> {
    row.try_get::<Option<i64>, _>(column)?
        .map(|value| {
            u32::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
                index: column.to_string(),
                source: Box::new(e),
            })
        })
        .transpose()
}

fn parse_column<T>(row: &PgRow, column: &str) -> Result<Option<T>, sqlx::Error>
where
    T: FromStr<Err = ValidationError>,
{
    row.try_get::<Option<String>, _>(column)?
        .map(|value| {
            value.parse().map_err(|e: ValidationError| sqlx::Error::ColumnDecode {
                index: column.to_string(),
                source: Box::new(e),
            })
        })
        .transpose()
}

fn required_column<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = ValidationError>,
{
    parse_column(row, column)?.ok_or_else(|| sqlx::Error::ColumnNotFound(column.to_string()))
}

fn pairing_from_row(row: &PgRow) -> Result<Pairing, sqlx::Error> {
    let record = PairingRecord {
        game_number: column_u32(row, "game_number")?,
        round: column_u32(row, "round")?,
        team1_slot: optional_u32(row, "team1_slot")?,
        team1_type: required_column(row, "team1_type")?,
        team1_game_ref: optional_u32(row, "team1_game_ref")?,
        team1_ref_outcome: parse_column(row, "team1_ref_outcome")?,
        team1_annotation: row.try_get("team1_annotation")?,
        team2_slot: optional_u32(row, "team2_slot")?,
        team2_type: required_column(row, "team2_type")?,
        team2_game_ref: optional_u32(row, "team2_game_ref")?,
        team2_ref_outcome: parse_column(row, "team2_ref_outcome")?,
        team2_annotation: row.try_get("team2_annotation")?,
    };

    Pairing::try_from(record).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}
