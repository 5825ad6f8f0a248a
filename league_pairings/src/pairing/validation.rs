//! Schedule invariant checks shared by the generators and the pairing editor.

use std::collections::HashMap;

use super::{
    errors::ValidationError,
    models::{GameNumber, Pairing, PairingSide, Round, Slot},
};

/// Validate a complete division schedule.
///
/// Checks, in order: positive game numbers and rounds, unique game numbers,
/// then per pairing: rank range (when `team_count` is known), self-pairing,
/// orphaned references and references that do not point to an earlier round.
///
/// # Errors
///
/// Returns the first violated invariant.
pub fn validate_schedule(
    pairings: &[Pairing],
    team_count: Option<usize>,
) -> Result<(), ValidationError> {
    let mut rounds: HashMap<GameNumber, Round> = HashMap::with_capacity(pairings.len());

    for pairing in pairings {
        if pairing.game_number == 0 {
            return Err(ValidationError::InvalidGameNumber);
        }
        if pairing.round == 0 {
            return Err(ValidationError::InvalidRound {
                game_number: pairing.game_number,
            });
        }
        if rounds.insert(pairing.game_number, pairing.round).is_some() {
            return Err(ValidationError::DuplicateGameNumber(pairing.game_number));
        }
    }

    for pairing in pairings {
        check_pairing(pairing, &rounds, team_count)?;
    }

    Ok(())
}

fn check_pairing(
    pairing: &Pairing,
    rounds: &HashMap<GameNumber, Round>,
    team_count: Option<usize>,
) -> Result<(), ValidationError> {
    for side in [&pairing.team1, &pairing.team2] {
        check_side(pairing, side, rounds, team_count)?;
    }

    match pairing.concrete_teams() {
        Some((a, b)) if a == b => Err(ValidationError::SelfPairing {
            game_number: pairing.game_number,
            rank: a,
        }),
        _ => Ok(()),
    }
}

fn check_side(
    pairing: &Pairing,
    side: &PairingSide,
    rounds: &HashMap<GameNumber, Round>,
    team_count: Option<usize>,
) -> Result<(), ValidationError> {
    match side.slot {
        Slot::Team { rank } => {
            let upper = team_count.unwrap_or(usize::MAX);
            if rank == 0 || rank as usize > upper {
                return Err(ValidationError::RankOutOfRange {
                    game_number: pairing.game_number,
                    rank,
                    team_count: team_count.unwrap_or(0),
                });
            }
        }
        Slot::GameRef { game, .. } => {
            let referenced_round =
                rounds
                    .get(&game)
                    .copied()
                    .ok_or(ValidationError::OrphanedReference {
                        game_number: pairing.game_number,
                        referenced: game,
                    })?;

            if referenced_round >= pairing.round {
                return Err(ValidationError::ForwardReference {
                    game_number: pairing.game_number,
                    round: pairing.round,
                    referenced: game,
                    referenced_round,
                });
            }
        }
        Slot::Open => {}
    }

    Ok(())
}

/// Check that every concrete slot of one pairing names a rank in `1..=team_count`
pub fn check_ranks(pairing: &Pairing, team_count: usize) -> Result<(), ValidationError> {
    for rank in [pairing.team1.rank(), pairing.team2.rank()].into_iter().flatten() {
        if rank == 0 || rank as usize > team_count {
            return Err(ValidationError::RankOutOfRange {
                game_number: pairing.game_number,
                rank,
                team_count,
            });
        }
    }
    Ok(())
}

/// Game numbers of pairings that reference `game_number`
pub fn referencing_games(pairings: &[Pairing], game_number: GameNumber) -> Vec<GameNumber> {
    pairings
        .iter()
        .filter(|p| p.game_number != game_number && p.references_game(game_number))
        .map(|p| p.game_number)
        .collect()
}
