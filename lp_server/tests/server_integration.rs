//! Integration tests for the HTTP API over the in-memory store.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use lp_server::api::{AppState, create_router, request_id::REQUEST_ID_HEADER};
use serde_json::{Value, json};
use tower::ServiceExt; // For `oneshot` method

fn test_app() -> axum::Router {
    create_router(AppState::in_memory(64))
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Create a division and admit `teams` teams (ids 100, 200, ...)
async fn division_with_teams(app: &axum::Router, teams: usize) -> i64 {
    let (status, body) =
        send(app, "POST", "/api/v1/divisions", Some(json!({"name": "U12 Red"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let division_id = body["divisionId"].as_i64().unwrap();

    for i in 1..=teams {
        let (status, _) = send(
            app,
            "POST",
            &format!("/api/v1/divisions/{division_id}/teams"),
            Some(json!({"teamId": i * 100, "teamName": format!("Team {i}")})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    division_id
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = test_app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["maxTeams"], 64);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(REQUEST_ID_HEADER, "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()[REQUEST_ID_HEADER], "abc-123");
}

// ============================================================================
// Roster Tests
// ============================================================================

#[tokio::test]
async fn test_roster_lifecycle() {
    let app = test_app();
    let division = division_with_teams(&app, 3).await;

    let (status, teams) =
        send(&app, "GET", &format!("/api/v1/divisions/{division}/teams"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(teams.as_array().unwrap().len(), 3);
    assert_eq!(teams[2]["teamId"], 300);
    assert_eq!(teams[2]["rank"], 3);

    // Move the last team to the top
    let (status, teams) = send(
        &app,
        "PUT",
        &format!("/api/v1/divisions/{division}/teams/300"),
        Some(json!({"rank": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let order: Vec<i64> = teams
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["teamId"].as_i64().unwrap())
        .collect();
    assert_eq!(order, vec![300, 100, 200]);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/divisions/{division}/teams/300"),
        Some(json!({"rank": 4})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, teams) =
        send(&app, "DELETE", &format!("/api/v1/divisions/{division}/teams/100"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(teams[1]["teamId"], 200);
    assert_eq!(teams[1]["rank"], 2);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/divisions/{division}/teams"),
        Some(json!({"teamId": 200, "teamName": "Again"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn test_unknown_division_is_not_found() {
    let app = test_app();

    let (status, body) = send(&app, "GET", "/api/v1/divisions/4242/teams", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/divisions/4242/pairings/block",
        Some(json!({"noRounds": 1, "teamCount": 4})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Pairing Tests
// ============================================================================

#[tokio::test]
async fn test_add_block_defaults_to_roster_size() {
    let app = test_app();
    let division = division_with_teams(&app, 4).await;

    let (status, created) = send(
        &app,
        "POST",
        &format!("/api/v1/divisions/{division}/pairings/block"),
        Some(json!({"noRounds": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created = created.as_array().unwrap();
    assert_eq!(created.len(), 6);
    assert_eq!(created[0]["gameNumber"], 1);
    assert_eq!(created[0]["round"], 1);
    assert_eq!(created[0]["team1Type"], "T");
    assert_eq!(created[5]["round"], 3);

    let (status, body) =
        send(&app, "GET", &format!("/api/v1/divisions/{division}/who-plays-who"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["teamCount"], 4);
    for (i, row) in body["matrix"].as_array().unwrap().iter().enumerate() {
        for (j, meetings) in row.as_array().unwrap().iter().enumerate() {
            let expected = if i == j { 0 } else { 1 };
            assert_eq!(meetings, expected, "matrix[{i}][{j}]");
        }
    }

    // A second block continues the game numbering and rounds
    let (status, created) = send(
        &app,
        "POST",
        &format!("/api/v1/divisions/{division}/pairings/block"),
        Some(json!({"noRounds": 1, "teamCount": 4})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created[0]["gameNumber"], 7);
    assert_eq!(created[0]["round"], 4);
}

#[tokio::test]
async fn test_add_block_rejects_bad_team_counts() {
    let app = test_app();
    let division = division_with_teams(&app, 0).await;

    // Empty roster and no explicit count
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/divisions/{division}/pairings/block"),
        Some(json!({"noRounds": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/divisions/{division}/pairings/block"),
        Some(json!({"noRounds": 2, "teamCount": 65})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/divisions/{division}/pairings/elimination"),
        Some(json!({"startKey": "K", "teamCount": 8})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("start key"));

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/divisions/{division}/pairings/elimination"),
        Some(json!({"startKey": "S", "teamCount": 6})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_elimination_bracket_and_delete_order() {
    let app = test_app();
    let division = division_with_teams(&app, 8).await;

    let (status, created) = send(
        &app,
        "POST",
        &format!("/api/v1/divisions/{division}/pairings/elimination"),
        Some(json!({"startKey": "Q"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created = created.as_array().unwrap();
    assert_eq!(created.len(), 7);
    assert_eq!(created[0]["team1Slot"], 1);
    assert_eq!(created[0]["team2Slot"], 8);
    let final_game = &created[6];
    assert_eq!(final_game["team1Type"], "F");
    assert_eq!(final_game["team1GameRef"], 5);
    assert_eq!(final_game["team2GameRef"], 6);
    assert_eq!(final_game["round"], 3);

    // Game 1 feeds the first semifinal
    let (status, body) =
        send(&app, "DELETE", &format!("/api/v1/divisions/{division}/pairings/1"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "referential_integrity");

    for game in [7, 5, 1] {
        let (status, _) = send(
            &app,
            "DELETE",
            &format!("/api/v1/divisions/{division}/pairings/{game}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT, "deleting game {game}");
    }

    let (status, _) =
        send(&app, "DELETE", &format!("/api/v1/divisions/{division}/pairings/99"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, pairings) =
        send(&app, "GET", &format!("/api/v1/divisions/{division}/pairings"), None).await;
    let remaining: Vec<i64> = pairings
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["gameNumber"].as_i64().unwrap())
        .collect();
    assert_eq!(remaining, vec![2, 3, 4, 6]);
}

#[tokio::test]
async fn test_edit_pairing() {
    let app = test_app();
    let division = division_with_teams(&app, 8).await;
    send(
        &app,
        "POST",
        &format!("/api/v1/divisions/{division}/pairings/elimination"),
        Some(json!({"startKey": "Q", "teamCount": 8})),
    )
    .await;

    // Swap the opponent in game 4
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/divisions/{division}/pairings/4"),
        Some(json!({
            "gameNumber": 4, "round": 1,
            "team1Slot": 4, "team1Type": "Q",
            "team2Slot": 6, "team2Type": "Q", "team2Annotation": "swapped"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["team2Slot"], 6);
    assert_eq!(body["team2Annotation"], "swapped");

    // Same-round reference
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/divisions/{division}/pairings/1"),
        Some(json!({
            "gameNumber": 1, "round": 1,
            "team1Type": "Q", "team1GameRef": 2, "team1RefOutcome": "Winner",
            "team2Slot": 8, "team2Type": "Q"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    // Slot that is both a team and a reference
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/v1/divisions/{division}/pairings/5"),
        Some(json!({
            "gameNumber": 5, "round": 2,
            "team1Slot": 1, "team1Type": "S", "team1GameRef": 1,
            "team2Type": "S", "team2GameRef": 4
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Self-pairing
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/v1/divisions/{division}/pairings/2"),
        Some(json!({
            "gameNumber": 2, "round": 1,
            "team1Slot": 2, "team1Type": "Q",
            "team2Slot": 2, "team2Type": "Q"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/v1/divisions/{division}/pairings/42"),
        Some(json!({
            "gameNumber": 42, "round": 1,
            "team1Slot": 1, "team1Type": "T",
            "team2Slot": 2, "team2Type": "T"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_single_and_remove_all() {
    let app = test_app();
    let division = division_with_teams(&app, 4).await;

    send(
        &app,
        "POST",
        &format!("/api/v1/divisions/{division}/pairings/block"),
        Some(json!({"noRounds": 1})),
    )
    .await;

    let (status, single) = send(
        &app,
        "POST",
        &format!("/api/v1/divisions/{division}/pairings/single"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(single["gameNumber"], 3);
    assert_eq!(single["round"], 2);
    assert_eq!(single["team1Type"], "T");
    assert!(single["team1Slot"].is_null());
    assert!(single["team2GameRef"].is_null());

    let (status, body) =
        send(&app, "DELETE", &format!("/api/v1/divisions/{division}/pairings"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 3);

    let (_, pairings) =
        send(&app, "GET", &format!("/api/v1/divisions/{division}/pairings"), None).await;
    assert!(pairings.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_pooled_block_tags() {
    let app = test_app();
    let division = division_with_teams(&app, 8).await;

    let (status, created) = send(
        &app,
        "POST",
        &format!("/api/v1/divisions/{division}/pairings/block"),
        Some(json!({"noRounds": 3, "pools": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created = created.as_array().unwrap();
    // Two pools of four: 2 games per pool per round
    assert_eq!(created.len(), 12);
    assert!(created.iter().any(|p| p["team1Type"] == "RRD1"));
    assert!(created.iter().any(|p| p["team1Type"] == "RRD2"));
    assert!(created.iter().all(|p| p["round"].as_i64().unwrap() <= 3));
}

#[tokio::test]
async fn test_add_block_rejects_unbounded_round_count() {
    let app = test_app();
    let division = division_with_teams(&app, 4).await;
    let uri = format!("/api/v1/divisions/{division}/pairings/block");

    let (status, _) = send(&app, "POST", &uri, Some(json!({"noRounds": 1}))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", &uri, Some(json!({"noRounds": 4294967295u32}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (_, pairings) =
        send(&app, "GET", &format!("/api/v1/divisions/{division}/pairings"), None).await;
    assert_eq!(pairings.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_deleted_game_number_is_not_reissued() {
    let app = test_app();
    let division = division_with_teams(&app, 4).await;

    send(
        &app,
        "POST",
        &format!("/api/v1/divisions/{division}/pairings/block"),
        Some(json!({"noRounds": 1})),
    )
    .await;
    let (status, _) =
        send(&app, "DELETE", &format!("/api/v1/divisions/{division}/pairings/2"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, single) = send(
        &app,
        "POST",
        &format!("/api/v1/divisions/{division}/pairings/single"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(single["gameNumber"], 3);
}
