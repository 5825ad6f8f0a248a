//! Division roster models and dense-rank helpers.

use serde::{Deserialize, Serialize};

use super::errors::RankingError;
use crate::pairing::models::{DivisionId, Rank};

/// Team ID type, stable across rank changes
pub type TeamId = i64;

/// A team's position within a division's ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DivisionTeam {
    pub team_id: TeamId,
    pub rank: Rank,
    pub team_name: String,
}

impl DivisionTeam {
    pub fn new(team_id: TeamId, rank: Rank, team_name: impl Into<String>) -> Self {
        Self {
            team_id,
            rank,
            team_name: team_name.into(),
        }
    }
}

/// Partial update for one roster entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTeamRequest {
    #[serde(default)]
    pub rank: Option<Rank>,
    #[serde(default)]
    pub team_name: Option<String>,
}

/// Sort by current rank and renumber `1..=N`.
///
/// Ties keep their relative order, so a roster with a gap or a duplicate
/// rank comes back dense.
pub fn resequence(teams: &mut [DivisionTeam]) {
    teams.sort_by_key(|team| team.rank);
    for (index, team) in teams.iter_mut().enumerate() {
        team.rank = index as Rank + 1;
    }
}

/// Whether ranks are exactly `1..=N` with no gaps or duplicates
pub fn is_dense(teams: &[DivisionTeam]) -> bool {
    let mut ranks: Vec<Rank> = teams.iter().map(|t| t.rank).collect();
    ranks.sort_unstable();
    ranks.iter().enumerate().all(|(i, &rank)| rank as usize == i + 1)
}

/// Move one team to `new_rank`, shifting every team in between by one.
///
/// # Errors
///
/// * `RankingError::InvalidRank` - `new_rank` outside `1..=N`
/// * `RankingError::TeamNotFound` - `team_id` is not on the roster
pub fn move_to_rank(
    teams: &mut Vec<DivisionTeam>,
    division_id: DivisionId,
    team_id: TeamId,
    new_rank: Rank,
) -> Result<(), RankingError> {
    let team_count = teams.len();
    if new_rank == 0 || new_rank as usize > team_count {
        return Err(RankingError::InvalidRank {
            rank: new_rank,
            team_count,
        });
    }

    resequence(teams);
    let from = teams
        .iter()
        .position(|t| t.team_id == team_id)
        .ok_or(RankingError::TeamNotFound {
            division_id,
            team_id,
        })?;

    let team = teams.remove(from);
    teams.insert(new_rank as usize - 1, team);
    for (index, team) in teams.iter_mut().enumerate() {
        team.rank = index as Rank + 1;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<DivisionTeam> {
        vec![
            DivisionTeam::new(10, 1, "Hawks"),
            DivisionTeam::new(20, 2, "Owls"),
            DivisionTeam::new(30, 3, "Falcons"),
            DivisionTeam::new(40, 4, "Eagles"),
        ]
    }

    fn ids(teams: &[DivisionTeam]) -> Vec<TeamId> {
        teams.iter().map(|t| t.team_id).collect()
    }

    #[test]
    fn test_move_down_shifts_intervening_teams_up() {
        let mut teams = roster();
        move_to_rank(&mut teams, 1, 10, 3).unwrap();
        assert_eq!(ids(&teams), vec![20, 30, 10, 40]);
        assert!(is_dense(&teams));
    }

    #[test]
    fn test_move_up_shifts_intervening_teams_down() {
        let mut teams = roster();
        move_to_rank(&mut teams, 1, 40, 1).unwrap();
        assert_eq!(ids(&teams), vec![40, 10, 20, 30]);
        assert_eq!(teams[0].rank, 1);
        assert_eq!(teams[3].rank, 4);
    }

    #[test]
    fn test_move_rejects_bad_rank_and_unknown_team() {
        let mut teams = roster();
        assert!(matches!(
            move_to_rank(&mut teams, 1, 10, 5),
            Err(RankingError::InvalidRank { rank: 5, team_count: 4 })
        ));
        assert!(matches!(
            move_to_rank(&mut teams, 1, 10, 0),
            Err(RankingError::InvalidRank { .. })
        ));
        assert!(matches!(
            move_to_rank(&mut teams, 1, 99, 1),
            Err(RankingError::TeamNotFound { team_id: 99, .. })
        ));
        assert_eq!(teams, roster());
    }

    #[test]
    fn test_resequence_closes_gaps() {
        let mut teams = vec![
            DivisionTeam::new(1, 7, "C"),
            DivisionTeam::new(2, 2, "A"),
            DivisionTeam::new(3, 4, "B"),
        ];
        assert!(!is_dense(&teams));
        resequence(&mut teams);
        assert_eq!(ids(&teams), vec![2, 3, 1]);
        assert!(is_dense(&teams));
    }
}
