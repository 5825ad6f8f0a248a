//! HTTP API for the pairing server.
//!
//! # Modules
//!
//! - [`divisions`]: Division creation and roster/ranking management
//! - [`pairings`]: Schedule generation, editing and the who-plays-who matrix
//! - [`request_id`]: Request correlation middleware
//!
//! # Endpoints Overview
//!
//! ```text
//! GET    /health
//! POST   /api/v1/divisions                                      - Create division
//! GET    /api/v1/divisions/{division_id}/teams                  - GetDivisionTeams
//! POST   /api/v1/divisions/{division_id}/teams                  - Add team at the bottom
//! PUT    /api/v1/divisions/{division_id}/teams/{team_id}        - EditDivisionTeam
//! DELETE /api/v1/divisions/{division_id}/teams/{team_id}        - Remove team
//! GET    /api/v1/divisions/{division_id}/pairings               - List pairings
//! DELETE /api/v1/divisions/{division_id}/pairings               - RemoveAll
//! POST   /api/v1/divisions/{division_id}/pairings/block         - AddBlock
//! POST   /api/v1/divisions/{division_id}/pairings/elimination   - AddElimination
//! POST   /api/v1/divisions/{division_id}/pairings/single        - AddSingle
//! PUT    /api/v1/divisions/{division_id}/pairings/{game_number} - EditPairing
//! DELETE /api/v1/divisions/{division_id}/pairings/{game_number} - DeletePairing
//! GET    /api/v1/divisions/{division_id}/who-plays-who          - GetWhoPlaysWho
//! ```
//!
//! # Errors
//!
//! Failures return `{"error": "...", "kind": "..."}` with `kind` one of
//! `validation` (400), `not_found` (404), `conflict` or
//! `referential_integrity` (409) and `internal` (500). A `conflict` is
//! safe to retry after re-reading the schedule.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use lp_server::api::{create_router, AppState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = create_router(AppState::in_memory(64));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:6970").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod divisions;
pub mod pairings;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use league_pairings::{
    PairingError, PairingManager, RankingError, RankingManager,
    db::{
        Database, DivisionLocks, MemoryDivisionTeamRepository, MemoryPairingRepository,
        PgDivisionTeamRepository, PgPairingRepository,
    },
    pairing::DivisionId,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::{logging, metrics};
use request_id::RequestId;

/// Application state shared across all HTTP handlers.
///
/// Both managers share one set of division locks so roster writes and
/// schedule writes for a division never interleave.
#[derive(Clone)]
pub struct AppState {
    pub pairing_manager: Arc<PairingManager>,
    pub ranking_manager: Arc<RankingManager>,
    /// `None` when running on the in-memory store
    pub database: Option<Database>,
}

impl AppState {
    /// State backed by PostgreSQL repositories
    pub fn with_database(database: Database, max_teams: usize) -> Self {
        let pool = database.pool().clone();
        let teams = Arc::new(PgDivisionTeamRepository::new(pool.clone()));
        let pairings = Arc::new(PgPairingRepository::new(pool));
        let locks = DivisionLocks::new();

        Self {
            pairing_manager: Arc::new(
                PairingManager::new(pairings, teams.clone(), locks.clone())
                    .with_max_teams(max_teams),
            ),
            ranking_manager: Arc::new(RankingManager::new(teams, locks)),
            database: Some(database),
        }
    }

    /// State backed by process-local repositories; nothing survives a restart
    pub fn in_memory(max_teams: usize) -> Self {
        let teams = Arc::new(MemoryDivisionTeamRepository::new());
        let pairings = Arc::new(MemoryPairingRepository::new());
        let locks = DivisionLocks::new();

        Self {
            pairing_manager: Arc::new(
                PairingManager::new(pairings, teams.clone(), locks.clone())
                    .with_max_teams(max_teams),
            ),
            ranking_manager: Arc::new(RankingManager::new(teams, locks)),
            database: None,
        }
    }
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// Handler error: status plus JSON body
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// HTTP status for an error category
pub fn status_for_kind(kind: &str) -> StatusCode {
    match kind {
        "validation" => StatusCode::BAD_REQUEST,
        "not_found" => StatusCode::NOT_FOUND,
        "conflict" | "referential_integrity" => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(
    request_id: &RequestId,
    operation: &'static str,
    division_id: DivisionId,
    kind: &'static str,
    message: String,
) -> ApiError {
    logging::log_rejected_operation(request_id.as_str(), operation, division_id, kind, &message);
    metrics::operation_rejected(operation, kind);

    (
        status_for_kind(kind),
        Json(ErrorResponse {
            error: message,
            kind: kind.to_string(),
        }),
    )
}

/// Map a pairing failure to its HTTP response, logging and counting it
pub fn pairing_error(
    request_id: &RequestId,
    operation: &'static str,
    division_id: DivisionId,
    err: PairingError,
) -> ApiError {
    if let PairingError::Database(db_err) = &err {
        tracing::error!(request_id = request_id.as_str(), "Database error: {}", db_err);
    }
    if err.is_retryable() {
        metrics::pairing_conflicts_total();
    }
    reject(request_id, operation, division_id, err.kind(), err.client_message())
}

/// Map a ranking failure to its HTTP response, logging and counting it
pub fn ranking_error(
    request_id: &RequestId,
    operation: &'static str,
    division_id: DivisionId,
    err: RankingError,
) -> ApiError {
    if let RankingError::Database(db_err) = &err {
        tracing::error!(request_id = request_id.as_str(), "Database error: {}", db_err);
    }
    reject(request_id, operation, division_id, err.kind(), err.client_message())
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/divisions", post(divisions::create_division))
        .route(
            "/divisions/{division_id}/teams",
            get(divisions::list_teams).post(divisions::add_team),
        )
        .route(
            "/divisions/{division_id}/teams/{team_id}",
            put(divisions::edit_team).delete(divisions::remove_team),
        )
        .route(
            "/divisions/{division_id}/pairings",
            get(pairings::list_pairings).delete(pairings::remove_all),
        )
        .route(
            "/divisions/{division_id}/pairings/block",
            post(pairings::add_block),
        )
        .route(
            "/divisions/{division_id}/pairings/elimination",
            post(pairings::add_elimination),
        )
        .route(
            "/divisions/{division_id}/pairings/single",
            post(pairings::add_single),
        )
        .route(
            "/divisions/{division_id}/pairings/{game_number}",
            put(pairings::edit_pairing).delete(pairings::delete_pairing),
        )
        .route(
            "/divisions/{division_id}/who-plays-who",
            get(pairings::who_plays_who),
        )
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the store is reachable, `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:6970/health
/// # {"status":"healthy","storage":"postgres","database":true,...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (storage, db_healthy) = match &state.database {
        Some(database) => ("postgres", database.health_check().await.is_ok()),
        None => ("memory", true),
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage,
        "database": db_healthy,
        "maxTeams": state.pairing_manager.max_teams(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
