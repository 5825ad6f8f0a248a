//! Pairing API handlers.
//!
//! Generators append to the division's schedule and return only the newly
//! created pairings. `teamCount` defaults to the current roster size when
//! omitted.
//!
//! # Examples
//!
//! Add three round-robin rounds:
//! ```bash
//! curl -X POST http://localhost:6970/api/v1/divisions/1/pairings/block \
//!   -H "Content-Type: application/json" \
//!   -d '{"noRounds": 3, "teamCount": 6}'
//! ```
//!
//! Add a bracket from the quarterfinals with a third-place game:
//! ```bash
//! curl -X POST http://localhost:6970/api/v1/divisions/1/pairings/elimination \
//!   -H "Content-Type: application/json" \
//!   -d '{"startKey": "Q", "teamCount": 8, "consolation": true}'
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use league_pairings::pairing::{
    BracketOptions, DivisionId, GameNumber, Pairing, PairingError, PairingRecord, WhoPlaysWho,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::{ApiError, AppState, pairing_error, request_id::RequestId};
use crate::{logging, metrics};

fn default_pools() -> u8 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBlockRequest {
    /// Rounds to append; at most 16 rotation cycles of the largest pool
    pub no_rounds: u32,
    #[serde(default)]
    pub team_count: Option<usize>,
    /// Number of `RRDk` sub-pools; 1 plays the whole division together
    #[serde(default = "default_pools")]
    pub pools: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEliminationRequest {
    pub start_key: String,
    #[serde(default)]
    pub team_count: Option<usize>,
    #[serde(default)]
    pub consolation: bool,
}

/// Body of AddSingle and query of GetWhoPlaysWho
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamCountRequest {
    #[serde(default)]
    pub team_count: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveAllResponse {
    pub removed: u64,
}

type Created<T> = (StatusCode, Json<T>);

async fn resolve_team_count(
    state: &AppState,
    division_id: DivisionId,
    requested: Option<usize>,
) -> Result<usize, PairingError> {
    match requested {
        Some(team_count) => Ok(team_count),
        None => state.pairing_manager.roster_size(division_id).await,
    }
}

fn record_generated(
    operation: &'static str,
    division_id: DivisionId,
    count: usize,
    started: Instant,
) {
    metrics::pairings_generated(operation, count);
    logging::log_generated(
        operation,
        division_id,
        count,
        started.elapsed().as_millis() as u64,
    );
}

/// List the division's schedule ordered by game number.
///
/// # Errors
///
/// - `404 Not Found`: Division doesn't exist
pub async fn list_pairings(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(division_id): Path<DivisionId>,
) -> Result<Json<Vec<Pairing>>, ApiError> {
    state
        .pairing_manager
        .list_pairings(division_id)
        .await
        .map(Json)
        .map_err(|e| pairing_error(&request_id, "list_pairings", division_id, e))
}

/// Append round-robin rounds (AddBlock).
///
/// # Request Body
///
/// ```json
/// { "noRounds": 3, "teamCount": 6, "pools": 1 }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Fewer than 2 teams, zero rounds or an impossible pool split
/// - `409 Conflict`: Another writer appended first; retry
pub async fn add_block(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(division_id): Path<DivisionId>,
    Json(payload): Json<AddBlockRequest>,
) -> Result<Created<Vec<Pairing>>, ApiError> {
    let started = Instant::now();
    let result = async {
        let team_count = resolve_team_count(&state, division_id, payload.team_count).await?;
        state
            .pairing_manager
            .add_block(division_id, payload.no_rounds, team_count, payload.pools)
            .await
    }
    .await;

    let created = result.map_err(|e| pairing_error(&request_id, "add_block", division_id, e))?;
    record_generated("add_block", division_id, created.len(), started);
    Ok((StatusCode::CREATED, Json(created)))
}

/// Append a single-elimination bracket (AddElimination).
///
/// # Request Body
///
/// ```json
/// { "startKey": "Q", "teamCount": 8, "consolation": false }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Unknown start key or too many teams for the start stage
/// - `409 Conflict`: Another writer appended first; retry
pub async fn add_elimination(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(division_id): Path<DivisionId>,
    Json(payload): Json<AddEliminationRequest>,
) -> Result<Created<Vec<Pairing>>, ApiError> {
    let started = Instant::now();
    let options = BracketOptions {
        consolation: payload.consolation,
    };
    let result = async {
        let team_count = resolve_team_count(&state, division_id, payload.team_count).await?;
        state
            .pairing_manager
            .add_elimination(division_id, &payload.start_key, team_count, options)
            .await
    }
    .await;

    let created =
        result.map_err(|e| pairing_error(&request_id, "add_elimination", division_id, e))?;
    record_generated("add_elimination", division_id, created.len(), started);
    Ok((StatusCode::CREATED, Json(created)))
}

/// Append one blank pairing in a new round (AddSingle).
pub async fn add_single(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(division_id): Path<DivisionId>,
    Json(payload): Json<TeamCountRequest>,
) -> Result<Created<Pairing>, ApiError> {
    let started = Instant::now();
    let result = async {
        let team_count = resolve_team_count(&state, division_id, payload.team_count).await?;
        state
            .pairing_manager
            .add_single(division_id, team_count)
            .await
    }
    .await;

    let created = result.map_err(|e| pairing_error(&request_id, "add_single", division_id, e))?;
    record_generated("add_single", division_id, 1, started);
    Ok((StatusCode::CREATED, Json(created)))
}

/// Delete the division's whole schedule (RemoveAll).
pub async fn remove_all(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(division_id): Path<DivisionId>,
) -> Result<Json<RemoveAllResponse>, ApiError> {
    let removed = state
        .pairing_manager
        .remove_all(division_id)
        .await
        .map_err(|e| pairing_error(&request_id, "remove_all", division_id, e))?;

    tracing::info!(
        request_id = request_id.as_str(),
        division_id = division_id,
        removed = removed,
        "Schedule cleared"
    );
    Ok(Json(RemoveAllResponse { removed }))
}

/// Replace one pairing (EditPairing).
///
/// The body carries the full pairing. Its `gameNumber` may differ from the
/// path to renumber the game.
///
/// # Errors
///
/// - `400 Bad Request`: Self-pairing, forward or orphaned reference,
///   duplicate game number, rank outside the roster, or a slot that is both
///   a team and a game reference
/// - `404 Not Found`: No pairing with the path game number
pub async fn edit_pairing(
    State(state): State<AppState>,
    request_id: RequestId,
    Path((division_id, game_number)): Path<(DivisionId, GameNumber)>,
    Json(record): Json<PairingRecord>,
) -> Result<Json<Pairing>, ApiError> {
    let result = async {
        let pairing = Pairing::try_from(record)?;
        state
            .pairing_manager
            .edit_pairing(division_id, game_number, pairing)
            .await
    }
    .await;

    result
        .map(Json)
        .map_err(|e| pairing_error(&request_id, "edit_pairing", division_id, e))
}

/// Delete one pairing (DeletePairing).
///
/// # Errors
///
/// - `404 Not Found`: No pairing with that game number
/// - `409 Conflict` (`referential_integrity`): Later games still reference it
pub async fn delete_pairing(
    State(state): State<AppState>,
    request_id: RequestId,
    Path((division_id, game_number)): Path<(DivisionId, GameNumber)>,
) -> Result<StatusCode, ApiError> {
    state
        .pairing_manager
        .delete_pairing(division_id, game_number)
        .await
        .map_err(|e| pairing_error(&request_id, "delete_pairing", division_id, e))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Matchup counts between ranks (GetWhoPlaysWho).
///
/// ```bash
/// curl "http://localhost:6970/api/v1/divisions/1/who-plays-who?teamCount=8"
/// ```
pub async fn who_plays_who(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(division_id): Path<DivisionId>,
    Query(query): Query<TeamCountRequest>,
) -> Result<Json<WhoPlaysWho>, ApiError> {
    let result = async {
        let team_count = resolve_team_count(&state, division_id, query.team_count).await?;
        state
            .pairing_manager
            .who_plays_who(division_id, team_count)
            .await
    }
    .await;

    result
        .map(Json)
        .map_err(|e| pairing_error(&request_id, "who_plays_who", division_id, e))
}
