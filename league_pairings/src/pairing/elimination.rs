//! Single-elimination bracket generation.
//!
//! Ranks are placed with standard seeding (1 v N, 2 v N-1, ...) so top seeds
//! meet as late as possible. Missing seeds are byes: the opponent advances
//! straight into the next stage's concrete slot. Every later game refers to
//! its two feeder games by game number with a `Winner` outcome.

use super::{
    errors::ValidationError,
    models::{GameNumber, Pairing, PairingSide, Rank, Round, SlotType, Stage, nth_game_number},
};

/// Extra games added alongside the bracket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BracketOptions {
    /// Add a consolation game between the semifinal losers
    pub consolation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entrant {
    Team(Rank),
    Winner(GameNumber),
    Empty,
}

#[derive(Debug, Clone, Copy)]
struct Position {
    entrant: Entrant,
    /// Best seed that can reach this position; orders games within a round
    best_seed: Rank,
}

/// Bracket positions for a bracket of `size` (a power of two), top to bottom.
///
/// ```
/// use league_pairings::pairing::elimination::standard_seeding;
///
/// assert_eq!(standard_seeding(8), vec![1, 8, 4, 5, 2, 7, 3, 6]);
/// ```
pub fn standard_seeding(size: usize) -> Vec<Rank> {
    let mut order: Vec<Rank> = vec![1];
    while order.len() < size {
        let next_len = order.len() as Rank * 2;
        order = order
            .iter()
            .flat_map(|&seed| [seed, next_len + 1 - seed])
            .collect();
    }
    order
}

/// Generate a bracket from `start` down through the Final.
///
/// See [`generate_bracket`] for details.
pub fn generate_elimination_bracket(
    team_count: usize,
    start: Stage,
    existing_max_round: Round,
    next_game_number: GameNumber,
) -> Result<Vec<Pairing>, ValidationError> {
    generate_bracket(
        team_count,
        start,
        existing_max_round,
        next_game_number,
        BracketOptions::default(),
    )
}

/// Generate a single-elimination bracket for ranks `1..=team_count`.
///
/// One round is used per stage that has at least one playable game, starting
/// at `existing_max_round + 1`. Stages in which every match is a bye consume
/// no round. Game numbers run from `next_game_number`, ordered within each
/// round by the best seed that can reach the game.
///
/// # Errors
///
/// * `ValidationError::TooFewTeams` - fewer than two teams
/// * `ValidationError::BracketTooSmall` - more teams than the start stage holds
/// * `ValidationError::NumberingOverflow` - round or game numbers past
///   `u32::MAX`
pub fn generate_bracket(
    team_count: usize,
    start: Stage,
    existing_max_round: Round,
    next_game_number: GameNumber,
    options: BracketOptions,
) -> Result<Vec<Pairing>, ValidationError> {
    if team_count < 2 {
        return Err(ValidationError::TooFewTeams {
            team_count,
            minimum: 2,
        });
    }
    if team_count > start.bracket_size() {
        return Err(ValidationError::BracketTooSmall {
            team_count,
            stage: start,
        });
    }

    let mut positions: Vec<Position> = standard_seeding(start.bracket_size())
        .into_iter()
        .map(|seed| Position {
            entrant: if seed as usize <= team_count {
                Entrant::Team(seed)
            } else {
                Entrant::Empty
            },
            best_seed: seed,
        })
        .collect();

    let mut pairings = Vec::new();
    let mut round = existing_max_round;
    let mut semifinal_games = Vec::new();
    let mut stage = Some(start);

    while let Some(current) = stage {
        let slot_type = current.slot_type();
        let mut advanced = Vec::with_capacity(positions.len() / 2);
        let mut playable = Vec::new();

        for (index, pair) in positions.chunks_exact(2).enumerate() {
            let (a, b) = (pair[0], pair[1]);
            let best_seed = a.best_seed.min(b.best_seed);
            let entrant = match (a.entrant, b.entrant) {
                (Entrant::Empty, other) | (other, Entrant::Empty) => other,
                _ => {
                    playable.push((index, a, b));
                    Entrant::Empty
                }
            };
            advanced.push(Position {
                entrant,
                best_seed,
            });
        }

        if !playable.is_empty() {
            round = round
                .checked_add(1)
                .ok_or(ValidationError::NumberingOverflow)?;
            playable.sort_by_key(|(_, a, b)| a.best_seed.min(b.best_seed));

            for (index, a, b) in playable {
                let (top, bottom) = if a.best_seed <= b.best_seed {
                    (a, b)
                } else {
                    (b, a)
                };
                let game_number = nth_game_number(next_game_number, pairings.len())?;
                pairings.push(Pairing::new(
                    game_number,
                    round,
                    side_for(slot_type, top.entrant),
                    side_for(slot_type, bottom.entrant),
                ));
                advanced[index].entrant = Entrant::Winner(game_number);
                if current == Stage::Semifinal {
                    semifinal_games.push(game_number);
                }
            }
        }

        positions = advanced;
        stage = current.next();
    }

    if options.consolation {
        if let [first, second] = semifinal_games[..] {
            pairings.push(Pairing::new(
                nth_game_number(next_game_number, pairings.len())?,
                round,
                PairingSide::loser_of(SlotType::Consolation, first),
                PairingSide::loser_of(SlotType::Consolation, second),
            ));
        } else {
            log::debug!(
                "Skipping consolation game: {} playable semifinal(s)",
                semifinal_games.len()
            );
        }
    }

    Ok(pairings)
}

fn side_for(slot_type: SlotType, entrant: Entrant) -> PairingSide {
    match entrant {
        Entrant::Team(rank) => PairingSide::team(slot_type, rank),
        Entrant::Winner(game) => PairingSide::winner_of(slot_type, game),
        Entrant::Empty => PairingSide::open(slot_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::{models::Slot, validation::validate_schedule};

    fn in_round(pairings: &[Pairing], round: Round) -> Vec<&Pairing> {
        pairings.iter().filter(|p| p.round == round).collect()
    }

    #[test]
    fn test_standard_seeding_sizes() {
        assert_eq!(standard_seeding(2), vec![1, 2]);
        assert_eq!(standard_seeding(4), vec![1, 4, 2, 3]);
        let sixteen = standard_seeding(16);
        assert_eq!(sixteen.len(), 16);
        assert_eq!(&sixteen[..4], &[1, 16, 8, 9]);
    }

    #[test]
    fn test_full_quarterfinal_bracket() {
        let pairings = generate_elimination_bracket(8, Stage::Quarterfinal, 0, 1).unwrap();
        assert_eq!(pairings.len(), 7);

        let quarters = in_round(&pairings, 1);
        assert_eq!(quarters.len(), 4);
        let firsts: Vec<(Rank, Rank)> = quarters
            .iter()
            .map(|p| p.concrete_teams().unwrap())
            .collect();
        assert_eq!(firsts, vec![(1, 8), (2, 7), (3, 6), (4, 5)]);
        assert!(quarters.iter().all(|p| p.team1.slot_type == SlotType::Quarterfinal));

        let semis = in_round(&pairings, 2);
        assert_eq!(semis.len(), 2);
        // 1v8 winner meets 4v5 winner; 2v7 winner meets 3v6 winner
        assert_eq!(semis[0].team1.game_ref(), Some(1));
        assert_eq!(semis[0].team2.game_ref(), Some(4));
        assert_eq!(semis[1].team1.game_ref(), Some(2));
        assert_eq!(semis[1].team2.game_ref(), Some(3));

        let finals = in_round(&pairings, 3);
        assert_eq!(finals.len(), 1);
        assert_eq!(finals[0].team1.slot_type, SlotType::Final);
        assert_eq!(
            finals[0].team1.slot,
            Slot::GameRef {
                game: 5,
                outcome: crate::pairing::models::RefOutcome::Winner
            }
        );
        assert_eq!(finals[0].team2.game_ref(), Some(6));

        validate_schedule(&pairings, Some(8)).unwrap();
    }

    #[test]
    fn test_five_teams_in_quarterfinal_bracket() {
        let pairings = generate_elimination_bracket(5, Stage::Quarterfinal, 0, 1).unwrap();

        let quarters = in_round(&pairings, 1);
        assert_eq!(quarters.len(), 1);
        assert_eq!(quarters[0].concrete_teams(), Some((4, 5)));

        let semis = in_round(&pairings, 2);
        assert_eq!(semis.len(), 2);
        assert_eq!(semis[0].team1.rank(), Some(1));
        assert_eq!(semis[0].team2.game_ref(), Some(quarters[0].game_number));
        assert_eq!(semis[1].concrete_teams(), Some((2, 3)));

        // Teams 1, 2 and 3 reach the semifinal without a first-round game.
        let advanced: Vec<Rank> = semis
            .iter()
            .flat_map(|p| [p.team1.rank(), p.team2.rank()])
            .flatten()
            .collect();
        assert_eq!(advanced, vec![1, 2, 3]);

        assert_eq!(pairings.len(), 4);
        validate_schedule(&pairings, Some(5)).unwrap();
    }

    #[test]
    fn test_rounds_continue_after_existing_schedule() {
        let pairings = generate_elimination_bracket(4, Stage::Semifinal, 6, 20).unwrap();
        let rounds: Vec<Round> = pairings.iter().map(|p| p.round).collect();
        assert_eq!(rounds, vec![7, 7, 8]);
        let numbers: Vec<GameNumber> = pairings.iter().map(|p| p.game_number).collect();
        assert_eq!(numbers, vec![20, 21, 22]);
    }

    #[test]
    fn test_empty_stages_are_compacted() {
        let pairings = generate_elimination_bracket(3, Stage::RoundOf64, 0, 1).unwrap();
        assert_eq!(pairings.len(), 2);
        assert_eq!(pairings[0].round, 1);
        assert_eq!(pairings[0].team1.slot_type, SlotType::Semifinal);
        assert_eq!(pairings[0].concrete_teams(), Some((2, 3)));
        assert_eq!(pairings[1].round, 2);
        assert_eq!(pairings[1].team1.rank(), Some(1));
        assert_eq!(pairings[1].team2.game_ref(), Some(1));
    }

    #[test]
    fn test_final_only() {
        let pairings = generate_elimination_bracket(2, Stage::Final, 0, 1).unwrap();
        assert_eq!(pairings.len(), 1);
        assert_eq!(pairings[0].concrete_teams(), Some((1, 2)));
        assert_eq!(pairings[0].team1.slot_type, SlotType::Final);
    }

    #[test]
    fn test_consolation_references_semifinal_losers() {
        let options = BracketOptions { consolation: true };
        let pairings = generate_bracket(4, Stage::Semifinal, 0, 1, options).unwrap();
        assert_eq!(pairings.len(), 4);

        let consolation = pairings.last().unwrap();
        assert_eq!(consolation.round, 2);
        assert_eq!(consolation.team1.slot_type, SlotType::Consolation);
        assert_eq!(consolation.team1.slot, Slot::GameRef {
            game: 1,
            outcome: crate::pairing::models::RefOutcome::Loser
        });
        assert_eq!(consolation.team2.game_ref(), Some(2));
        validate_schedule(&pairings, Some(4)).unwrap();
    }

    #[test]
    fn test_consolation_skipped_without_two_semifinals() {
        let options = BracketOptions { consolation: true };
        let pairings = generate_bracket(3, Stage::Semifinal, 0, 1, options).unwrap();
        assert_eq!(pairings.len(), 2);
        assert!(pairings.iter().all(|p| p.team1.slot_type != SlotType::Consolation));
    }

    #[test]
    fn test_rejects_bracket_too_small() {
        assert_eq!(
            generate_elimination_bracket(9, Stage::Quarterfinal, 0, 1),
            Err(ValidationError::BracketTooSmall {
                team_count: 9,
                stage: Stage::Quarterfinal
            })
        );
        assert!(matches!(
            generate_elimination_bracket(1, Stage::Final, 0, 1),
            Err(ValidationError::TooFewTeams { .. })
        ));
    }

    #[test]
    fn test_team_count_minus_one_games() {
        for team_count in 2..=64 {
            let start = Stage::smallest_for(team_count).unwrap();
            let pairings = generate_elimination_bracket(team_count, start, 0, 1).unwrap();
            assert_eq!(pairings.len(), team_count - 1, "team count {team_count}");
            validate_schedule(&pairings, Some(team_count)).unwrap();
        }
    }

    #[test]
    fn test_numbering_overflow_is_an_error() {
        assert_eq!(
            generate_elimination_bracket(4, Stage::Semifinal, u32::MAX - 1, 1),
            Err(ValidationError::NumberingOverflow)
        );
        assert_eq!(
            generate_elimination_bracket(4, Stage::Semifinal, 0, u32::MAX - 1),
            Err(ValidationError::NumberingOverflow)
        );

        let final_only =
            generate_elimination_bracket(2, Stage::Final, u32::MAX - 1, u32::MAX).unwrap();
        assert_eq!(final_only[0].game_number, u32::MAX);
        assert_eq!(final_only[0].round, u32::MAX);
    }
}
