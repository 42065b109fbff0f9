mod common;

use std::collections::BTreeMap;

use api::error::OrchestrationError;
use api::gql::domains::games::ledger::RallyStats;
use api::gql::domains::games::service::{self, CreateGameParams, UpdateStatusParams};
use common::*;
use infra::repos::{game_players, matches, GameMode, GameStatus, PaddleSide, AI_PLAYER_ID};
use uuid::Uuid;

fn scores(entries: &[(Uuid, i32)]) -> RallyStats {
    RallyStats {
        hits: BTreeMap::new(),
        scores: entries.iter().copied().collect(),
    }
}

fn update(game_id: Uuid, match_id: Option<Uuid>, status: GameStatus, requester_id: Uuid) -> UpdateStatusParams {
    UpdateStatusParams {
        game_id,
        match_id,
        status,
        stats: RallyStats::default(),
        requester_id,
    }
}

/// Create a two-seat multiplayer game with both players joined.
async fn two_player_game(app: &TestApp) -> (Uuid, Uuid, Uuid) {
    let (alice, _) = create_test_user(&app.state, "alice").await;
    let (bob, _) = create_test_user(&app.state, "bob").await;

    let game = service::create_game(&app.state.db, CreateGameParams::new(alice, GameMode::Multiplayer))
        .await
        .expect("create game")
        .value;
    service::join_game(&app.state.db, game.id, bob, None)
        .await
        .expect("join game");

    (game.id, alice, bob)
}

#[tokio::test]
async fn test_create_game_enrols_creator() {
    let Some(app) = setup_test_db().await else { return };
    let (creator, _) = create_test_user(&app.state, "creator").await;

    let game = service::create_game(&app.state.db, CreateGameParams::new(creator, GameMode::Multiplayer))
        .await
        .expect("create game")
        .value;

    assert_eq!(game.status, GameStatus::Pending);
    assert!(game.winner_id.is_none());

    let members = game_players::list_by_game(&app.state.db, game.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].player_id, creator);
    assert_eq!(members[0].slot, 0);

    let settings = service::game_options(&app.state.db, game.id).await.unwrap();
    assert_eq!(settings.capacity, 2);
    assert_eq!(settings.max_score, service::DEFAULT_MAX_SCORE);
}

#[tokio::test]
async fn test_join_full_game_is_rejected_without_writes() {
    let Some(app) = setup_test_db().await else { return };
    let (game_id, _, _) = two_player_game(&app).await;
    let (late, _) = create_test_user(&app.state, "late").await;

    let err = service::join_game(&app.state.db, game_id, late, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::Full), "got {err:?}");

    let members = game_players::list_by_game(&app.state.db, game_id).await.unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|m| m.player_id != late));
}

#[tokio::test]
async fn test_join_twice_and_join_started_game() {
    let Some(app) = setup_test_db().await else { return };
    let (alice, _) = create_test_user(&app.state, "alice").await;
    let (bob, _) = create_test_user(&app.state, "bob").await;

    let mut params = CreateGameParams::new(alice, GameMode::Multiplayer);
    params.capacity = Some(4);
    let game = service::create_game(&app.state.db, params).await.unwrap().value;

    service::join_game(&app.state.db, game.id, bob, None).await.unwrap();
    let err = service::join_game(&app.state.db, game.id, bob, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::AlreadyJoined));

    service::start_game(&app.state.db, game.id, alice, Vec::new())
        .await
        .unwrap();
    let (carol, _) = create_test_user(&app.state, "carol").await;
    let err = service::join_game(&app.state.db, game.id, carol, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::NotJoinable));
}

#[tokio::test]
async fn test_start_assigns_paddles_and_opens_first_match() {
    let Some(app) = setup_test_db().await else { return };
    let (game_id, alice, bob) = two_player_game(&app).await;

    let err = service::start_game(&app.state.db, game_id, bob, Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::Unauthorized(_)));

    let outcome = service::start_game(&app.state.db, game_id, alice, Vec::new())
        .await
        .expect("start game");
    let started = outcome.value;

    assert_eq!(started.game.status, GameStatus::Active);
    assert_eq!(started.first_match.number, 1);
    let alice_row = started.players.iter().find(|p| p.player_id == alice).unwrap();
    let bob_row = started.players.iter().find(|p| p.player_id == bob).unwrap();
    assert_eq!(alice_row.paddle_side, Some(PaddleSide::Left));
    assert_eq!(bob_row.paddle_side, Some(PaddleSide::Right));

    let scores = matches::list_scores_for_match(&app.state.db, started.first_match.id)
        .await
        .unwrap();
    assert_eq!(scores.len(), 2);
    assert!(scores.iter().all(|s| s.score == 0 && s.hits == 0));

    // Bob is told his game is ready; the requester is not.
    assert_eq!(outcome.effects.len(), 1);

    let err = service::start_game(&app.state.db, game_id, alice, Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::NotPending));
}

#[tokio::test]
async fn test_training_game_gets_an_ai_opponent() {
    let Some(app) = setup_test_db().await else { return };
    let (solo, _) = create_test_user(&app.state, "solo").await;

    let game = service::create_game(&app.state.db, CreateGameParams::new(solo, GameMode::Training))
        .await
        .unwrap()
        .value;
    let started = service::start_game(&app.state.db, game.id, solo, Vec::new())
        .await
        .expect("start training game")
        .value;

    let ai = started
        .players
        .iter()
        .find(|p| p.player_id == AI_PLAYER_ID)
        .expect("ai opponent seated");
    assert_eq!(ai.paddle_side, Some(PaddleSide::Right));

    let scores = matches::list_scores_for_match(&app.state.db, started.first_match.id)
        .await
        .unwrap();
    assert_eq!(scores.len(), 2);
}

#[tokio::test]
async fn test_reaching_max_score_completes_the_match() {
    let Some(app) = setup_test_db().await else { return };
    let (game_id, alice, bob) = two_player_game(&app).await;
    let started = service::start_game(&app.state.db, game_id, alice, Vec::new())
        .await
        .unwrap()
        .value;
    let match_id = started.first_match.id;

    let mut params = update(game_id, Some(match_id), GameStatus::Active, alice);
    params.stats = scores(&[(alice, 9), (bob, 4)]);
    let first = service::update_game_status(&app.state.db, params).await.unwrap().value;
    let current = first.current_match.unwrap();
    assert!(!current.completed);
    assert_eq!(current.winner_id, Some(alice));
    assert_eq!(first.game.winner_id, Some(alice));

    let mut params = update(game_id, Some(match_id), GameStatus::Active, bob);
    params.stats = scores(&[(alice, 1)]);
    let second = service::update_game_status(&app.state.db, params).await.unwrap().value;
    let current = second.current_match.unwrap();
    assert!(current.completed);
    assert!(current.ended_at.is_some());
    assert_eq!(current.winner_id, Some(alice));

    let summary = service::game_summary(&app.state.db, game_id).await.unwrap();
    assert_eq!(summary.ledger.side(PaddleSide::Left).unwrap().set_wins, 1);
    assert_eq!(summary.ledger.side(PaddleSide::Right).unwrap().set_wins, 0);
    assert_eq!(summary.ledger.player(alice).unwrap().score, 10);

    // A completed match takes no further points.
    let mut params = update(game_id, Some(match_id), GameStatus::Active, bob);
    params.stats = scores(&[(bob, 1)]);
    let err = service::update_game_status(&app.state.db, params).await.unwrap_err();
    assert!(matches!(err, OrchestrationError::InvalidState(_)));
}

#[tokio::test]
async fn test_ties_keep_the_previous_match_winner() {
    let Some(app) = setup_test_db().await else { return };
    let (game_id, alice, bob) = two_player_game(&app).await;
    let match_id = service::start_game(&app.state.db, game_id, alice, Vec::new())
        .await
        .unwrap()
        .value
        .first_match
        .id;

    let mut params = update(game_id, Some(match_id), GameStatus::Active, alice);
    params.stats = scores(&[(bob, 2)]);
    service::update_game_status(&app.state.db, params).await.unwrap();

    let mut params = update(game_id, Some(match_id), GameStatus::Active, alice);
    params.stats = scores(&[(alice, 2)]);
    let tied = service::update_game_status(&app.state.db, params).await.unwrap().value;

    assert_eq!(tied.current_match.unwrap().winner_id, Some(bob));
    assert_eq!(tied.game.winner_id, Some(bob));
}

#[tokio::test]
async fn test_round_trip_create_join_start_finish() {
    let Some(app) = setup_test_db().await else { return };
    let (game_id, alice, bob) = two_player_game(&app).await;
    let match_id = service::start_game(&app.state.db, game_id, alice, Vec::new())
        .await
        .unwrap()
        .value
        .first_match
        .id;

    let mut params = update(game_id, Some(match_id), GameStatus::Active, bob);
    params.stats = scores(&[(alice, 3), (bob, 5)]);
    service::update_game_status(&app.state.db, params).await.unwrap();

    let finished = service::update_game_status(
        &app.state.db,
        update(game_id, None, GameStatus::Finished, alice),
    )
    .await
    .unwrap();

    // Not a tournament game, so no bracket event.
    assert!(finished.effects.is_empty());
    let update = finished.value;
    assert_eq!(update.game.status, GameStatus::Finished);
    assert_eq!(update.game.winner_id, Some(bob));
    assert!(update.game.ended_at.is_some());

    let all = matches::list_by_game(&app.state.db, game_id).await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].completed);
    assert_eq!(all[0].winner_id, Some(bob));
}

#[tokio::test]
async fn test_finishing_a_scoreless_game_leaves_no_winner() {
    let Some(app) = setup_test_db().await else { return };
    let (game_id, alice, _) = two_player_game(&app).await;
    service::start_game(&app.state.db, game_id, alice, Vec::new())
        .await
        .unwrap();

    let finished = service::update_game_status(
        &app.state.db,
        update(game_id, None, GameStatus::Finished, alice),
    )
    .await
    .unwrap()
    .value;

    assert_eq!(finished.game.status, GameStatus::Finished);
    assert!(finished.game.winner_id.is_none());
}

#[tokio::test]
async fn test_update_without_match_opens_the_next_one() {
    let Some(app) = setup_test_db().await else { return };
    let (game_id, alice, bob) = two_player_game(&app).await;
    let first = service::start_game(&app.state.db, game_id, alice, Vec::new())
        .await
        .unwrap()
        .value
        .first_match;

    let mut params = update(game_id, None, GameStatus::Active, alice);
    params.stats = scores(&[(bob, 1)]);
    let next = service::update_game_status(&app.state.db, params)
        .await
        .unwrap()
        .value
        .current_match
        .unwrap();

    assert_eq!(next.number, 2);
    assert_ne!(next.id, first.id);

    let all = matches::list_by_game(&app.state.db, game_id).await.unwrap();
    assert_eq!(all.len(), 2);
    let previous = all.iter().find(|m| m.id == first.id).unwrap();
    assert!(previous.completed);
    assert_eq!(Some(next.started_at), previous.ended_at);
}

#[tokio::test]
async fn test_pause_resume_and_illegal_transitions() {
    let Some(app) = setup_test_db().await else { return };
    let (game_id, alice, bob) = two_player_game(&app).await;

    let err = service::update_game_status(
        &app.state.db,
        update(game_id, None, GameStatus::Paused, alice),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, OrchestrationError::InvalidTransition { .. }));

    service::start_game(&app.state.db, game_id, alice, Vec::new())
        .await
        .unwrap();

    let paused = service::update_game_status(
        &app.state.db,
        update(game_id, None, GameStatus::Paused, bob),
    )
    .await
    .unwrap()
    .value;
    assert_eq!(paused.game.status, GameStatus::Paused);
    assert!(paused.current_match.is_none());

    let resumed = service::update_game_status(
        &app.state.db,
        update(game_id, None, GameStatus::Active, alice),
    )
    .await
    .unwrap()
    .value;
    assert_eq!(resumed.game.status, GameStatus::Active);
    assert_eq!(matches::list_by_game(&app.state.db, game_id).await.unwrap().len(), 1);

    service::update_game_status(
        &app.state.db,
        update(game_id, None, GameStatus::Aborted, alice),
    )
    .await
    .unwrap();
    let err = service::update_game_status(
        &app.state.db,
        update(game_id, None, GameStatus::Active, alice),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, OrchestrationError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_creator_cannot_leave() {
    let Some(app) = setup_test_db().await else { return };
    let (game_id, alice, bob) = two_player_game(&app).await;

    let err = service::leave_game(&app.state.db, game_id, alice)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::CreatorCannotLeave));

    let members = game_players::list_by_game(&app.state.db, game_id).await.unwrap();
    assert_eq!(members.len(), 2);

    let game = service::leave_game(&app.state.db, game_id, bob).await.unwrap().value;
    assert_eq!(game.status, GameStatus::Pending);
    let members = game_players::list_by_game(&app.state.db, game_id).await.unwrap();
    assert_eq!(members.len(), 1);
}

#[tokio::test]
async fn test_leaving_a_running_game_aborts_it() {
    let Some(app) = setup_test_db().await else { return };
    let (game_id, alice, bob) = two_player_game(&app).await;
    service::start_game(&app.state.db, game_id, alice, Vec::new())
        .await
        .unwrap();

    let game = service::leave_game(&app.state.db, game_id, bob).await.unwrap().value;
    assert_eq!(game.status, GameStatus::Aborted);
}

#[tokio::test]
async fn test_leaving_a_paused_game_aborts_it() {
    let Some(app) = setup_test_db().await else { return };
    let (game_id, alice, bob) = two_player_game(&app).await;
    service::start_game(&app.state.db, game_id, alice, Vec::new())
        .await
        .unwrap();
    service::update_game_status(
        &app.state.db,
        update(game_id, None, GameStatus::Paused, alice),
    )
    .await
    .unwrap();

    let game = service::leave_game(&app.state.db, game_id, bob).await.unwrap().value;
    assert_eq!(game.status, GameStatus::Aborted);
    let members = game_players::list_by_game(&app.state.db, game_id).await.unwrap();
    assert_eq!(members.len(), 1);
}

#[tokio::test]
async fn test_delete_is_creator_only() {
    let Some(app) = setup_test_db().await else { return };
    let (game_id, alice, bob) = two_player_game(&app).await;

    let err = service::delete_game(&app.state.db, game_id, bob)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::Unauthorized(_)));

    service::delete_game(&app.state.db, game_id, alice).await.unwrap();
    let err = service::get_game(&app.state.db, game_id).await.unwrap_err();
    assert!(matches!(err, OrchestrationError::GameNotFound));
}

#[tokio::test]
async fn test_private_game_requires_accepted_invite() {
    let Some(app) = setup_test_db().await else { return };
    let (host, _) = create_test_user(&app.state, "host").await;
    let (guest, _) = create_test_user(&app.state, "guest").await;

    let mut params = CreateGameParams::new(host, GameMode::Multiplayer);
    params.visibility = infra::repos::Visibility::Private;
    let game = service::create_game(&app.state.db, params).await.unwrap().value;

    let err = service::join_game(&app.state.db, game.id, guest, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::NotInvited));

    let invite = service::invite_to_game(&app.state.db, game.id, host, guest)
        .await
        .unwrap();
    assert_eq!(invite.effects.len(), 1);

    let (answered, player) = service::respond_to_game_invite(&app.state.db, invite.value.id, guest, true)
        .await
        .unwrap()
        .value;
    assert_eq!(answered.status, infra::repos::InviteStatus::Accepted);
    assert_eq!(player.map(|p| p.player_id), Some(guest));
}
