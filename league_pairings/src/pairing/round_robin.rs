//! Round-robin block generation using the circle method.
//!
//! Team 1 of a pool stays fixed while every other seat rotates one position
//! per round. Odd pools get a phantom seat; whoever faces it sits out (bye).
//! The rotation index of a round is derived from its absolute round number,
//! so blocks appended by separate calls continue the cycle instead of
//! restarting it.

use std::iter;

use super::{
    errors::ValidationError,
    models::{
        GameNumber, MAX_SUB_POOLS, Pairing, PairingSide, Rank, Round, SlotType, nth_game_number,
    },
};

/// Minimum number of teams in a round-robin pool
pub const MIN_POOL_SIZE: usize = 2;

/// Full rotation cycles a single block may add
pub const MAX_CYCLES_PER_BLOCK: u32 = 16;

/// Teams paired in one round of a pool, plus the team sitting out (odd pools)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundLineup {
    pub games: Vec<(Rank, Rank)>,
    pub bye: Option<Rank>,
}

/// Generate `rounds_to_add` rounds for ranks `1..=team_count`, tagged `T`.
///
/// Rounds are numbered from `existing_max_round + 1`; game numbers are
/// assigned sequentially from `next_game_number`.
///
/// # Errors
///
/// * `ValidationError::TooFewTeams` - fewer than two teams
/// * `ValidationError::InvalidRoundCount` - `rounds_to_add` is zero
/// * `ValidationError::TooManyRounds` - more than `MAX_CYCLES_PER_BLOCK`
///   rotation cycles requested
/// * `ValidationError::NumberingOverflow` - round or game numbers past
///   `u32::MAX`
pub fn generate_round_robin_block(
    team_count: usize,
    rounds_to_add: u32,
    existing_max_round: Round,
    next_game_number: GameNumber,
) -> Result<Vec<Pairing>, ValidationError> {
    generate_pooled_block(
        team_count,
        1,
        rounds_to_add,
        existing_max_round,
        next_game_number,
    )
}

/// Generate a round-robin block for a division split into `pools` parallel
/// sub-divisions.
///
/// With a single pool every pairing is tagged `T`; otherwise pool `k` is
/// tagged `RRDk`. All pools share the same round numbers. Within a round,
/// games are numbered pool by pool.
pub fn generate_pooled_block(
    team_count: usize,
    pools: u8,
    rounds_to_add: u32,
    existing_max_round: Round,
    next_game_number: GameNumber,
) -> Result<Vec<Pairing>, ValidationError> {
    if team_count < MIN_POOL_SIZE {
        return Err(ValidationError::TooFewTeams {
            team_count,
            minimum: MIN_POOL_SIZE,
        });
    }
    if rounds_to_add == 0 {
        return Err(ValidationError::InvalidRoundCount(rounds_to_add));
    }

    let pool_ranks = split_into_pools(team_count, pools)?;
    let largest_pool = pool_ranks.iter().map(Vec::len).max().unwrap_or(team_count);
    let maximum = max_block_rounds(largest_pool);
    if rounds_to_add > maximum {
        return Err(ValidationError::TooManyRounds {
            requested: rounds_to_add,
            maximum,
        });
    }

    let first_round = existing_max_round
        .checked_add(1)
        .ok_or(ValidationError::NumberingOverflow)?;
    let last_round = existing_max_round
        .checked_add(rounds_to_add)
        .ok_or(ValidationError::NumberingOverflow)?;

    let mut pairings = Vec::new();

    for round in first_round..=last_round {
        for (index, ranks) in pool_ranks.iter().enumerate() {
            let slot_type = if pool_ranks.len() == 1 {
                SlotType::RoundRobin
            } else {
                SlotType::SubPool(index as u8 + 1)
            };

            for (home, away) in round_lineup(ranks, round).games {
                pairings.push(Pairing::new(
                    nth_game_number(next_game_number, pairings.len())?,
                    round,
                    PairingSide::team(slot_type, home),
                    PairingSide::team(slot_type, away),
                ));
            }
        }
    }

    Ok(pairings)
}

/// Split ranks `1..=team_count` into `pools` pools by serpentine seeding.
///
/// Ranks are dealt 1→A, 2→B, ..., k→K, then k+1→K, k+2→(K-1), ... so pool
/// strength stays balanced.
///
/// # Errors
///
/// * `ValidationError::InvalidPoolCount` - pools outside `1..=8`, or fewer
///   than two teams per pool
pub fn split_into_pools(team_count: usize, pools: u8) -> Result<Vec<Vec<Rank>>, ValidationError> {
    if pools == 0 || pools > MAX_SUB_POOLS || team_count < pools as usize * MIN_POOL_SIZE {
        return Err(ValidationError::InvalidPoolCount { pools, team_count });
    }

    let k = pools as usize;
    let mut split = vec![Vec::with_capacity(team_count / k + 1); k];
    for (i, rank) in (1..=team_count as Rank).enumerate() {
        let lap = i / k;
        let pos = i % k;
        let pool = if lap % 2 == 0 { pos } else { k - 1 - pos };
        split[pool].push(rank);
    }

    Ok(split)
}

/// Pairings of one round for the given pool ranks.
///
/// `round` is the absolute round number; the rotation index is
/// `(round - 1) mod (seats - 1)`, where seats is the pool size rounded up to
/// even.
pub fn round_lineup(ranks: &[Rank], round: Round) -> RoundLineup {
    let mut seats: Vec<Option<Rank>> = ranks.iter().copied().map(Some).collect();
    if seats.len() % 2 == 1 {
        seats.push(None);
    }

    let seat_count = seats.len();
    if seat_count < MIN_POOL_SIZE {
        return RoundLineup {
            games: Vec::new(),
            bye: ranks.first().copied(),
        };
    }

    let rotation = (round.saturating_sub(1) as usize) % (seat_count - 1);
    let mut ring = seats[1..].to_vec();
    ring.rotate_right(rotation);
    let lineup: Vec<Option<Rank>> = iter::once(seats[0]).chain(ring).collect();

    let mut games = Vec::with_capacity(seat_count / 2);
    let mut bye = None;
    for i in 0..seat_count / 2 {
        match (lineup[i], lineup[seat_count - 1 - i]) {
            (Some(a), Some(b)) => {
                // Alternate the fixed team between team 1 and team 2.
                if i == 0 && rotation % 2 == 1 {
                    games.push((b, a));
                } else {
                    games.push((a, b));
                }
            }
            (Some(team), None) | (None, Some(team)) => bye = Some(team),
            (None, None) => {}
        }
    }

    RoundLineup { games, bye }
}

/// Team sitting out `round` in a pool, if the pool is odd-sized
pub fn bye_team(ranks: &[Rank], round: Round) -> Option<Rank> {
    round_lineup(ranks, round).bye
}

/// Number of rounds after which the rotation repeats for a pool size
pub fn cycle_length(pool_size: usize) -> usize {
    let seats = pool_size + pool_size % 2;
    seats.saturating_sub(1).max(1)
}

/// Largest `rounds_to_add` accepted for a pool of `pool_size` teams
pub fn max_block_rounds(pool_size: usize) -> u32 {
    u32::try_from(cycle_length(pool_size))
        .unwrap_or(u32::MAX)
        .saturating_mul(MAX_CYCLES_PER_BLOCK)
}
