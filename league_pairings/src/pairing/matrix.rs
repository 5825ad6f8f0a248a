//! Who-plays-who analysis over a division schedule.

use serde::{Deserialize, Serialize};

use super::models::{Pairing, Rank};

/// Symmetric meeting counts between ranks.
///
/// `matrix[i][j]` is the number of concrete games between rank `i + 1` and
/// rank `j + 1`. Placeholder and open slots are not counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoPlaysWho {
    pub team_count: usize,
    pub matrix: Vec<Vec<u32>>,
}

impl WhoPlaysWho {
    pub fn from_pairings(pairings: &[Pairing], team_count: usize) -> Self {
        Self {
            team_count,
            matrix: compute_matrix(pairings, team_count),
        }
    }

    /// Number of meetings between two ranks (0 for out-of-range ranks)
    pub fn meetings(&self, a: Rank, b: Rank) -> u32 {
        let (Some(i), Some(j)) = (index_of(a, self.team_count), index_of(b, self.team_count)) else {
            return 0;
        };
        self.matrix[i][j]
    }

    /// Total concrete games played by a rank
    pub fn games_for(&self, rank: Rank) -> u32 {
        index_of(rank, self.team_count)
            .map(|i| self.matrix[i].iter().sum())
            .unwrap_or(0)
    }

    /// Pairs of distinct ranks that meet more than once
    pub fn repeat_meetings(&self) -> Vec<(Rank, Rank, u32)> {
        let mut repeats = Vec::new();
        for i in 0..self.team_count {
            for j in (i + 1)..self.team_count {
                if self.matrix[i][j] > 1 {
                    repeats.push((i as Rank + 1, j as Rank + 1, self.matrix[i][j]));
                }
            }
        }
        repeats
    }
}

fn index_of(rank: Rank, team_count: usize) -> Option<usize> {
    (rank >= 1 && rank as usize <= team_count).then(|| rank as usize - 1)
}

/// Count concrete meetings for ranks `1..=team_count`.
///
/// Pairings naming a rank outside the range are skipped.
pub fn compute_matrix(pairings: &[Pairing], team_count: usize) -> Vec<Vec<u32>> {
    let mut matrix = vec![vec![0u32; team_count]; team_count];

    for pairing in pairings {
        let Some((a, b)) = pairing.concrete_teams() else {
            continue;
        };
        match (index_of(a, team_count), index_of(b, team_count)) {
            (Some(i), Some(j)) => {
                matrix[i][j] += 1;
                if i != j {
                    matrix[j][i] += 1;
                }
            }
            _ => log::debug!(
                "Skipping game {} in matrix: ranks {}/{} outside 1..={}",
                pairing.game_number,
                a,
                b,
                team_count
            ),
        }
    }

    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::{
        models::{PairingSide, SlotType},
        round_robin::generate_round_robin_block,
    };

    #[test]
    fn test_full_cycle_matrix_is_all_ones() {
        let pairings = generate_round_robin_block(6, 5, 0, 1).unwrap();
        let matrix = compute_matrix(&pairings, 6);

        for (i, row) in matrix.iter().enumerate() {
            for (j, &count) in row.iter().enumerate() {
                assert_eq!(count, u32::from(i != j), "cell {i},{j}");
            }
        }
    }

    #[test]
    fn test_matrix_is_symmetric_and_ignores_placeholders() {
        let pairings = vec![
            Pairing::new(
                1,
                1,
                PairingSide::team(SlotType::Semifinal, 1),
                PairingSide::team(SlotType::Semifinal, 4),
            ),
            Pairing::new(
                2,
                2,
                PairingSide::team(SlotType::Final, 1),
                PairingSide::winner_of(SlotType::Final, 1),
            ),
            Pairing::new(
                3,
                3,
                PairingSide::team(SlotType::RoundRobin, 4),
                PairingSide::team(SlotType::RoundRobin, 1),
            ),
        ];

        let who = WhoPlaysWho::from_pairings(&pairings, 4);
        assert_eq!(who.meetings(1, 4), 2);
        assert_eq!(who.meetings(4, 1), 2);
        assert_eq!(who.games_for(1), 2);
        assert_eq!(who.games_for(2), 0);
        assert_eq!(who.repeat_meetings(), vec![(1, 4, 2)]);
    }

    #[test]
    fn test_out_of_range_ranks_are_skipped() {
        let pairings = vec![Pairing::new(
            1,
            1,
            PairingSide::team(SlotType::RoundRobin, 2),
            PairingSide::team(SlotType::RoundRobin, 7),
        )];
        let matrix = compute_matrix(&pairings, 3);
        assert!(matrix.iter().flatten().all(|&c| c == 0));
        assert_eq!(compute_matrix(&pairings, 0), Vec::<Vec<u32>>::new());
    }
}
