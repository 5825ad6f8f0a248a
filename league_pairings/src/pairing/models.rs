//! Pairing data models: games, team slots, stage tags and the flat wire record.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::errors::ValidationError;

/// Division ID type
pub type DivisionId = i64;

/// Game number, unique within a division
pub type GameNumber = u32;

/// Play round number (1-indexed)
pub type Round = u32;

/// Team rank within a division (1-indexed, dense)
pub type Rank = u32;

/// Highest round-robin sub-pool index (`RRD1`..`RRD8`)
pub const MAX_SUB_POOLS: u8 = 8;

/// Tag describing which part of the schedule a team slot belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SlotType {
    /// Concrete round-robin slot (`T`)
    RoundRobin,
    /// Round of 64 (`Z`)
    RoundOf64,
    /// Round of 32 (`Y`)
    RoundOf32,
    /// Round of 16 (`X`)
    RoundOf16,
    /// Quarterfinal (`Q`)
    Quarterfinal,
    /// Semifinal (`S`)
    Semifinal,
    /// Final (`F`)
    Final,
    /// Consolation (`C`)
    Consolation,
    /// Round-robin sub-division `RRD1`..`RRD8`
    SubPool(u8),
}

impl SlotType {
    /// Whether this slot belongs to a round-robin schedule (`T` or `RRDk`)
    pub fn is_round_robin(self) -> bool {
        matches!(self, SlotType::RoundRobin | SlotType::SubPool(_))
    }

    /// Elimination stage for this tag, if any
    pub fn stage(self) -> Option<Stage> {
        match self {
            SlotType::RoundOf64 => Some(Stage::RoundOf64),
            SlotType::RoundOf32 => Some(Stage::RoundOf32),
            SlotType::RoundOf16 => Some(Stage::RoundOf16),
            SlotType::Quarterfinal => Some(Stage::Quarterfinal),
            SlotType::Semifinal => Some(Stage::Semifinal),
            SlotType::Final => Some(Stage::Final),
            _ => None,
        }
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotType::RoundRobin => write!(f, "T"),
            SlotType::RoundOf64 => write!(f, "Z"),
            SlotType::RoundOf32 => write!(f, "Y"),
            SlotType::RoundOf16 => write!(f, "X"),
            SlotType::Quarterfinal => write!(f, "Q"),
            SlotType::Semifinal => write!(f, "S"),
            SlotType::Final => write!(f, "F"),
            SlotType::Consolation => write!(f, "C"),
            SlotType::SubPool(k) => write!(f, "RRD{k}"),
        }
    }
}

impl FromStr for SlotType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_uppercase();
        let slot_type = match tag.as_str() {
            "T" => SlotType::RoundRobin,
            "Z" => SlotType::RoundOf64,
            "Y" => SlotType::RoundOf32,
            "X" => SlotType::RoundOf16,
            "Q" => SlotType::Quarterfinal,
            "S" => SlotType::Semifinal,
            "F" => SlotType::Final,
            "C" => SlotType::Consolation,
            other => match other.strip_prefix("RRD").and_then(|k| k.parse::<u8>().ok()) {
                Some(k) if (1..=MAX_SUB_POOLS).contains(&k) => SlotType::SubPool(k),
                _ => return Err(ValidationError::UnknownSlotType(s.to_string())),
            },
        };
        Ok(slot_type)
    }
}

impl TryFrom<String> for SlotType {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlotType> for String {
    fn from(value: SlotType) -> Self {
        value.to_string()
    }
}

/// Single-elimination stage, named by bracket size
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Stage {
    RoundOf64,
    RoundOf32,
    RoundOf16,
    Quarterfinal,
    Semifinal,
    Final,
}

impl Stage {
    /// All stages from the largest bracket down to the Final
    pub const ALL: [Stage; 6] = [
        Stage::RoundOf64,
        Stage::RoundOf32,
        Stage::RoundOf16,
        Stage::Quarterfinal,
        Stage::Semifinal,
        Stage::Final,
    ];

    /// Number of bracket positions at this stage
    pub const fn bracket_size(self) -> usize {
        match self {
            Stage::RoundOf64 => 64,
            Stage::RoundOf32 => 32,
            Stage::RoundOf16 => 16,
            Stage::Quarterfinal => 8,
            Stage::Semifinal => 4,
            Stage::Final => 2,
        }
    }

    /// Single-letter start key (`Z`, `Y`, `X`, `Q`, `S`, `F`)
    pub const fn key(self) -> char {
        match self {
            Stage::RoundOf64 => 'Z',
            Stage::RoundOf32 => 'Y',
            Stage::RoundOf16 => 'X',
            Stage::Quarterfinal => 'Q',
            Stage::Semifinal => 'S',
            Stage::Final => 'F',
        }
    }

    /// Parse a start key
    pub fn from_key(key: &str) -> Result<Self, ValidationError> {
        match key.trim().to_ascii_uppercase().as_str() {
            "Z" => Ok(Stage::RoundOf64),
            "Y" => Ok(Stage::RoundOf32),
            "X" => Ok(Stage::RoundOf16),
            "Q" => Ok(Stage::Quarterfinal),
            "S" => Ok(Stage::Semifinal),
            "F" => Ok(Stage::Final),
            _ => Err(ValidationError::UnknownStartKey(key.to_string())),
        }
    }

    /// The stage played after this one
    pub const fn next(self) -> Option<Stage> {
        match self {
            Stage::RoundOf64 => Some(Stage::RoundOf32),
            Stage::RoundOf32 => Some(Stage::RoundOf16),
            Stage::RoundOf16 => Some(Stage::Quarterfinal),
            Stage::Quarterfinal => Some(Stage::Semifinal),
            Stage::Semifinal => Some(Stage::Final),
            Stage::Final => None,
        }
    }

    /// Slot tag used for games of this stage
    pub const fn slot_type(self) -> SlotType {
        match self {
            Stage::RoundOf64 => SlotType::RoundOf64,
            Stage::RoundOf32 => SlotType::RoundOf32,
            Stage::RoundOf16 => SlotType::RoundOf16,
            Stage::Quarterfinal => SlotType::Quarterfinal,
            Stage::Semifinal => SlotType::Semifinal,
            Stage::Final => SlotType::Final,
        }
    }

    /// Smallest supported stage whose bracket fits `team_count` teams
    pub fn smallest_for(team_count: usize) -> Option<Stage> {
        Stage::ALL
            .iter()
            .rev()
            .copied()
            .find(|stage| stage.bracket_size() >= team_count)
    }
}

impl TryFrom<String> for Stage {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Stage::from_key(&value)
    }
}

impl From<Stage> for String {
    fn from(value: Stage) -> Self {
        value.key().to_string()
    }
}

/// Which outcome of a referenced game fills a placeholder slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefOutcome {
    Winner,
    Loser,
}

impl fmt::Display for RefOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefOutcome::Winner => write!(f, "Winner"),
            RefOutcome::Loser => write!(f, "Loser"),
        }
    }
}

impl FromStr for RefOutcome {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Winner" | "winner" | "W" => Ok(RefOutcome::Winner),
            "Loser" | "loser" | "L" => Ok(RefOutcome::Loser),
            _ => Err(ValidationError::UnknownOutcome(s.to_string())),
        }
    }
}

/// Content of one team slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Slot {
    /// Concrete team, by division rank
    Team { rank: Rank },
    /// Placeholder filled by the outcome of an earlier game
    GameRef {
        game: GameNumber,
        outcome: RefOutcome,
    },
    /// Manual placeholder with no team and no reference yet
    Open,
}

/// One side of a pairing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingSide {
    pub slot_type: SlotType,
    pub slot: Slot,
    /// Display label, independent of the resolvable reference
    pub annotation: Option<String>,
}

impl PairingSide {
    pub fn team(slot_type: SlotType, rank: Rank) -> Self {
        Self {
            slot_type,
            slot: Slot::Team { rank },
            annotation: None,
        }
    }

    pub fn winner_of(slot_type: SlotType, game: GameNumber) -> Self {
        Self {
            slot_type,
            slot: Slot::GameRef {
                game,
                outcome: RefOutcome::Winner,
            },
            annotation: None,
        }
    }

    pub fn loser_of(slot_type: SlotType, game: GameNumber) -> Self {
        Self {
            slot_type,
            slot: Slot::GameRef {
                game,
                outcome: RefOutcome::Loser,
            },
            annotation: None,
        }
    }

    pub fn open(slot_type: SlotType) -> Self {
        Self {
            slot_type,
            slot: Slot::Open,
            annotation: None,
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    /// Concrete team rank, if this side is resolved
    pub fn rank(&self) -> Option<Rank> {
        match self.slot {
            Slot::Team { rank } => Some(rank),
            _ => None,
        }
    }

    /// Referenced game number, if this side is a placeholder
    pub fn game_ref(&self) -> Option<GameNumber> {
        match self.slot {
            Slot::GameRef { game, .. } => Some(game),
            _ => None,
        }
    }
}

/// One scheduled or placeholder game within a division
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PairingRecord", into = "PairingRecord")]
pub struct Pairing {
    pub game_number: GameNumber,
    pub round: Round,
    pub team1: PairingSide,
    pub team2: PairingSide,
}

impl Pairing {
    pub fn new(
        game_number: GameNumber,
        round: Round,
        team1: PairingSide,
        team2: PairingSide,
    ) -> Self {
        Self {
            game_number,
            round,
            team1,
            team2,
        }
    }

    /// Both ranks when both slots are concrete
    pub fn concrete_teams(&self) -> Option<(Rank, Rank)> {
        Some((self.team1.rank()?, self.team2.rank()?))
    }

    /// Game numbers this pairing refers to
    pub fn references(&self) -> impl Iterator<Item = GameNumber> + '_ {
        [&self.team1, &self.team2]
            .into_iter()
            .filter_map(PairingSide::game_ref)
    }

    pub fn references_game(&self, game_number: GameNumber) -> bool {
        self.references().any(|game| game == game_number)
    }

    pub fn is_round_robin(&self) -> bool {
        self.team1.slot_type.is_round_robin() && self.team2.slot_type.is_round_robin()
    }
}

/// Highest round and game number currently in a schedule (0 when empty)
pub fn schedule_bounds(pairings: &[Pairing]) -> (Round, GameNumber) {
    pairings.iter().fold((0, 0), |(round, game), p| {
        (round.max(p.round), game.max(p.game_number))
    })
}

/// Game number `offset` places after `first`
pub fn nth_game_number(first: GameNumber, offset: usize) -> Result<GameNumber, ValidationError> {
    u32::try_from(offset)
        .ok()
        .and_then(|offset| first.checked_add(offset))
        .ok_or(ValidationError::NumberingOverflow)
}

/// Flat pairing record as exchanged with callers and stored in the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingRecord {
    pub game_number: GameNumber,
    pub round: Round,
    #[serde(default)]
    pub team1_slot: Option<Rank>,
    pub team1_type: SlotType,
    #[serde(default)]
    pub team1_game_ref: Option<GameNumber>,
    #[serde(default)]
    pub team1_ref_outcome: Option<RefOutcome>,
    #[serde(default)]
    pub team1_annotation: Option<String>,
    #[serde(default)]
    pub team2_slot: Option<Rank>,
    pub team2_type: SlotType,
    #[serde(default)]
    pub team2_game_ref: Option<GameNumber>,
    #[serde(default)]
    pub team2_ref_outcome: Option<RefOutcome>,
    #[serde(default)]
    pub team2_annotation: Option<String>,
}

fn side_from_parts(
    game_number: GameNumber,
    side: u8,
    slot_type: SlotType,
    rank: Option<Rank>,
    game_ref: Option<GameNumber>,
    outcome: Option<RefOutcome>,
    annotation: Option<String>,
) -> Result<PairingSide, ValidationError> {
    let slot = match (rank, game_ref, outcome) {
        (Some(rank), None, None) => Slot::Team { rank },
        (None, Some(game), outcome) => Slot::GameRef {
            game,
            outcome: outcome.unwrap_or(RefOutcome::Winner),
        },
        (None, None, None) => Slot::Open,
        _ => return Err(ValidationError::AmbiguousSlot { game_number, side }),
    };

    Ok(PairingSide {
        slot_type,
        slot,
        annotation: annotation.filter(|a| !a.trim().is_empty()),
    })
}

fn side_to_parts(
    side: PairingSide,
) -> (
    Option<Rank>,
    SlotType,
    Option<GameNumber>,
    Option<RefOutcome>,
    Option<String>,
) {
    let (rank, game_ref, outcome) = match side.slot {
        Slot::Team { rank } => (Some(rank), None, None),
        Slot::GameRef { game, outcome } => (None, Some(game), Some(outcome)),
        Slot::Open => (None, None, None),
    };
    (rank, side.slot_type, game_ref, outcome, side.annotation)
}

impl TryFrom<PairingRecord> for Pairing {
    type Error = ValidationError;

    fn try_from(record: PairingRecord) -> Result<Self, Self::Error> {
        let team1 = side_from_parts(
            record.game_number,
            1,
            record.team1_type,
            record.team1_slot,
            record.team1_game_ref,
            record.team1_ref_outcome,
            record.team1_annotation,
        )?;
        let team2 = side_from_parts(
            record.game_number,
            2,
            record.team2_type,
            record.team2_slot,
            record.team2_game_ref,
            record.team2_ref_outcome,
            record.team2_annotation,
        )?;

        Ok(Pairing::new(record.game_number, record.round, team1, team2))
    }
}

impl From<Pairing> for PairingRecord {
    fn from(pairing: Pairing) -> Self {
        let (team1_slot, team1_type, team1_game_ref, team1_ref_outcome, team1_annotation) =
            side_to_parts(pairing.team1);
        let (team2_slot, team2_type, team2_game_ref, team2_ref_outcome, team2_annotation) =
            side_to_parts(pairing.team2);

        Self {
            game_number: pairing.game_number,
            round: pairing.round,
            team1_slot,
            team1_type,
            team1_game_ref,
            team1_ref_outcome,
            team1_annotation,
            team2_slot,
            team2_type,
            team2_game_ref,
            team2_ref_outcome,
            team2_annotation,
        }
    }
}
