//! Division and roster API handlers.
//!
//! Ranks are dense `1..=N`. Every roster change returns the full roster so
//! callers see how the other teams shifted.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use league_pairings::{
    DivisionTeam,
    pairing::DivisionId,
    ranking::{EditTeamRequest, TeamId},
};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState, ranking_error, request_id::RequestId};

#[derive(Debug, Deserialize)]
pub struct CreateDivisionRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DivisionResponse {
    pub division_id: DivisionId,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTeamRequest {
    pub team_id: TeamId,
    pub team_name: String,
}

/// Create an empty division.
///
/// # Request Body
///
/// ```json
/// { "name": "U14 Blue" }
/// ```
pub async fn create_division(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(payload): Json<CreateDivisionRequest>,
) -> Result<(StatusCode, Json<DivisionResponse>), ApiError> {
    let division_id = state
        .ranking_manager
        .create_division(&payload.name)
        .await
        .map_err(|e| ranking_error(&request_id, "create_division", 0, e))?;

    Ok((
        StatusCode::CREATED,
        Json(DivisionResponse {
            division_id,
            name: payload.name.trim().to_string(),
        }),
    ))
}

/// Roster ordered by rank (GetDivisionTeams).
pub async fn list_teams(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(division_id): Path<DivisionId>,
) -> Result<Json<Vec<DivisionTeam>>, ApiError> {
    state
        .ranking_manager
        .list_teams(division_id)
        .await
        .map(Json)
        .map_err(|e| ranking_error(&request_id, "list_teams", division_id, e))
}

/// Admit a team at the bottom of the ranking.
///
/// # Errors
///
/// - `400 Bad Request`: Blank team name
/// - `409 Conflict`: Team already on the roster
pub async fn add_team(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(division_id): Path<DivisionId>,
    Json(payload): Json<AddTeamRequest>,
) -> Result<(StatusCode, Json<Vec<DivisionTeam>>), ApiError> {
    let teams = state
        .ranking_manager
        .add_team(division_id, payload.team_id, &payload.team_name)
        .await
        .map_err(|e| ranking_error(&request_id, "add_team", division_id, e))?;

    Ok((StatusCode::CREATED, Json(teams)))
}

/// Change a team's rank and/or name (EditDivisionTeam).
///
/// # Request Body
///
/// ```json
/// { "rank": 1, "teamName": "Hawks" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Rank outside `1..=N` or blank name
/// - `404 Not Found`: Team or division doesn't exist
pub async fn edit_team(
    State(state): State<AppState>,
    request_id: RequestId,
    Path((division_id, team_id)): Path<(DivisionId, TeamId)>,
    Json(payload): Json<EditTeamRequest>,
) -> Result<Json<Vec<DivisionTeam>>, ApiError> {
    state
        .ranking_manager
        .edit_team(division_id, team_id, payload)
        .await
        .map(Json)
        .map_err(|e| ranking_error(&request_id, "edit_team", division_id, e))
}

/// Remove a team; lower-ranked teams move up.
pub async fn remove_team(
    State(state): State<AppState>,
    request_id: RequestId,
    Path((division_id, team_id)): Path<(DivisionId, TeamId)>,
) -> Result<Json<Vec<DivisionTeam>>, ApiError> {
    state
        .ranking_manager
        .remove_team(division_id, team_id)
        .await
        .map(Json)
        .map_err(|e| ranking_error(&request_id, "remove_team", division_id, e))
}
