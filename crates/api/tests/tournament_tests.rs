mod common;

use std::collections::BTreeMap;

use api::error::OrchestrationError;
use api::gql::domains::games::ledger::RallyStats;
use api::gql::domains::games::service::{self as games, UpdateStatusParams};
use api::gql::domains::tournaments::service::{self as tournaments, CreateTournamentParams};
use api::services::Effect;
use common::*;
use infra::models::TournamentGameRow;
use infra::repos::{
    game_players, tournament_games, BracketStatus, GameMode, GameStatus, TournamentStatus,
};
use uuid::Uuid;

/// Create a tournament owned by the first user and enrol the rest.
async fn enrolled_tournament(app: &TestApp, players: &[Uuid], capacity: i32) -> Uuid {
    let mut params = CreateTournamentParams::new(players[0], "Spring Cup");
    params.capacity = Some(capacity);
    let created = tournaments::create_tournament(&app.state.db, params)
        .await
        .expect("create tournament");
    settle_effects(&app.state, created.effects).await;

    for player in &players[1..] {
        let joined = tournaments::join_tournament(&app.state.db, created.value.id, *player, None)
            .await
            .expect("join tournament");
        settle_effects(&app.state, joined.effects).await;
    }

    created.value.id
}

/// Play a bracket game to the end with its first seat winning. Returns the winner and the
/// effects the finish produced.
async fn play_out(app: &TestApp, game_id: Uuid) -> (Uuid, Vec<Effect>) {
    let members = game_players::list_by_game(&app.state.db, game_id).await.unwrap();
    let first = members.iter().find(|m| m.slot == 0).unwrap().player_id;

    let started = games::start_game(&app.state.db, game_id, first, Vec::new())
        .await
        .expect("start bracket game")
        .value;

    let mut scores = BTreeMap::new();
    scores.insert(first, 10);
    games::update_game_status(
        &app.state.db,
        UpdateStatusParams {
            game_id,
            match_id: Some(started.first_match.id),
            status: GameStatus::Active,
            stats: RallyStats {
                hits: BTreeMap::new(),
                scores,
            },
            requester_id: first,
        },
    )
    .await
    .expect("score");

    let finished = games::update_game_status(
        &app.state.db,
        UpdateStatusParams {
            game_id,
            match_id: None,
            status: GameStatus::Finished,
            stats: RallyStats::default(),
            requester_id: first,
        },
    )
    .await
    .expect("finish bracket game");

    assert_eq!(finished.value.game.winner_id, Some(first));
    (first, finished.effects)
}

async fn round(app: &TestApp, tournament_id: Uuid, round: i32) -> Vec<TournamentGameRow> {
    tournament_games::list_round(&app.state.db, tournament_id, round)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_tournament_provisions_chat_room() {
    let Some(app) = setup_test_db().await else { return };
    let players = create_test_users(&app.state, "chat", 2).await;

    let tournament_id = enrolled_tournament(&app, &players, 4).await;
    let tournament = tournaments::get_tournament(&app.state.db, tournament_id)
        .await
        .unwrap();

    assert_eq!(tournament.status, TournamentStatus::Pending);
    let room_id = tournament.chat_room_id.expect("chat room attached");
    assert_eq!(app.chat.room_name(room_id).as_deref(), Some("Spring Cup"));

    let mut expected = players.clone();
    expected.sort();
    assert_eq!(app.chat.members(room_id), expected);
}

#[tokio::test]
async fn test_join_rules() {
    let Some(app) = setup_test_db().await else { return };
    let players = create_test_users(&app.state, "rules", 5).await;
    let tournament_id = enrolled_tournament(&app, &players[..4], 4).await;

    let err = tournaments::join_tournament(&app.state.db, tournament_id, players[4], None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::Full), "got {err:?}");

    let summary = tournaments::summary(&app.state.db, tournament_id).await.unwrap();
    assert_eq!(summary.players.len(), 4);
    let slots: Vec<i32> = summary.players.iter().map(|(p, _)| p.slot).collect();
    assert_eq!(slots, vec![0, 1, 2, 3]);
    assert!(summary.players.iter().all(|(_, alias)| alias.is_some()));
    assert!(summary.current_round.is_none());
}

#[tokio::test]
async fn test_aliases_are_unique_per_tournament() {
    let Some(app) = setup_test_db().await else { return };
    let players = create_test_users(&app.state, "alias", 2).await;

    let mut params = CreateTournamentParams::new(players[0], "Alias Open");
    params.alias = Some("ace".to_string());
    let tournament = tournaments::create_tournament(&app.state.db, params)
        .await
        .unwrap()
        .value;

    let err = tournaments::join_tournament(
        &app.state.db,
        tournament.id,
        players[1],
        Some("ace".to_string()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, OrchestrationError::InvalidInput(_)));

    // The failed join left nothing behind.
    let summary = tournaments::summary(&app.state.db, tournament.id).await.unwrap();
    assert_eq!(summary.players.len(), 1);
}

#[tokio::test]
async fn test_start_rejects_invalid_bracket_size() {
    let Some(app) = setup_test_db().await else { return };
    let players = create_test_users(&app.state, "short", 3).await;
    let tournament_id = enrolled_tournament(&app, &players, 4).await;

    let err = tournaments::start_tournament(&app.state.db, tournament_id, players[1])
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::Unauthorized(_)));

    let err = tournaments::start_tournament(&app.state.db, tournament_id, players[0])
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::InvalidBracketSize(3)));

    assert!(round(&app, tournament_id, 1).await.is_empty());
    let tournament = tournaments::get_tournament(&app.state.db, tournament_id)
        .await
        .unwrap();
    assert_eq!(tournament.status, TournamentStatus::Pending);
}

#[tokio::test]
async fn test_seed_creates_one_game_per_pair() {
    let Some(app) = setup_test_db().await else { return };
    let players = create_test_users(&app.state, "seed", 8).await;
    let tournament_id = enrolled_tournament(&app, &players, 8).await;

    let started = tournaments::start_tournament(&app.state.db, tournament_id, players[0])
        .await
        .expect("start tournament");

    assert_eq!(started.value.tournament.status, TournamentStatus::Active);
    let slots: Vec<i32> = started.value.games.iter().map(|g| g.slot).collect();
    assert_eq!(slots, vec![0, 1, 2, 3]);

    let mut seen = Vec::new();
    for slot in &started.value.games {
        assert_eq!(slot.round, 1);
        assert_eq!(slot.status, BracketStatus::Pending);

        let game = games::get_game(&app.state.db, slot.game_id).await.unwrap();
        assert_eq!(game.status, GameStatus::Pending);
        let settings = games::game_options(&app.state.db, slot.game_id).await.unwrap();
        assert_eq!(settings.mode, GameMode::Tournament);
        assert_eq!(settings.capacity, 2);

        let members = game_players::list_by_game(&app.state.db, slot.game_id)
            .await
            .unwrap();
        assert_eq!(members.len(), 2);
        seen.extend(members.into_iter().map(|m| m.player_id));
    }
    seen.sort();
    let mut expected = players.clone();
    expected.sort();
    assert_eq!(seen, expected);

    let turn_ready = started
        .effects
        .iter()
        .filter(|e| matches!(e, Effect::TurnReady { .. }))
        .count();
    assert_eq!(turn_ready, 8);

    // Seeding again hands back the existing round untouched.
    let again = tournaments::seed(&app.state.db, tournament_id).await.unwrap();
    assert_eq!(again.value.len(), 4);
    assert!(again.effects.is_empty());
    assert_eq!(round(&app, tournament_id, 1).await.len(), 4);
}

#[tokio::test]
async fn test_four_player_tournament_runs_to_a_champion() {
    let Some(app) = setup_test_db().await else { return };
    let players = create_test_users(&app.state, "cup", 4).await;
    let tournament_id = enrolled_tournament(&app, &players, 4).await;

    let started = tournaments::start_tournament(&app.state.db, tournament_id, players[0])
        .await
        .unwrap();
    settle_effects(&app.state, started.effects).await;
    let first_round = started.value.games;
    assert_eq!(first_round.len(), 2);

    // One finished game leaves the round open.
    let (winner_a, effects) = play_out(&app, first_round[0].game_id).await;
    assert!(effects.contains(&Effect::GameFinished {
        game_id: first_round[0].game_id
    }));
    settle_effects(&app.state, effects).await;
    assert!(round(&app, tournament_id, 2).await.is_empty());

    let (winner_b, effects) = play_out(&app, first_round[1].game_id).await;
    settle_effects(&app.state, effects).await;

    let second_round = round(&app, tournament_id, 2).await;
    assert_eq!(second_round.len(), 1);
    assert_eq!(second_round[0].slot, 0);
    let finalists: Vec<Uuid> = game_players::list_by_game(&app.state.db, second_round[0].game_id)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.player_id)
        .collect();
    let (expected_first, expected_second) = if first_round[0].slot == 0 {
        (winner_a, winner_b)
    } else {
        (winner_b, winner_a)
    };
    assert_eq!(finalists, vec![expected_first, expected_second]);

    let resolved = round(&app, tournament_id, 1).await;
    assert!(resolved.iter().all(|s| s.status == BracketStatus::Finished));

    let (champion, effects) = play_out(&app, second_round[0].game_id).await;
    settle_effects(&app.state, effects).await;

    let tournament = tournaments::get_tournament(&app.state.db, tournament_id)
        .await
        .unwrap();
    assert_eq!(tournament.status, TournamentStatus::Finished);
    assert_eq!(tournament.winner_id, Some(champion));
    assert!(tournament.ended_at.is_some());

    let rounds = tournaments::brackets(&app.state.db, tournament_id).await.unwrap();
    assert_eq!(rounds.len(), 2);
    assert_eq!(rounds[0].slots.len(), 2);
    assert_eq!(rounds[1].slots[0].row.winner_id, Some(champion));
    assert!(rounds[1].slots[0].entrants.iter().all(|e| e.alias.is_some()));
}

#[tokio::test]
async fn test_next_round_is_idempotent() {
    let Some(app) = setup_test_db().await else { return };
    let players = create_test_users(&app.state, "idem", 4).await;
    let tournament_id = enrolled_tournament(&app, &players, 4).await;

    let first_round = tournaments::start_tournament(&app.state.db, tournament_id, players[0])
        .await
        .unwrap()
        .value
        .games;

    let err = tournaments::next_round(&app.state.db, tournament_id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::InvalidState(_)));

    for slot in &first_round {
        let (_, effects) = play_out(&app, slot.game_id).await;
        settle_effects(&app.state, effects).await;
    }
    assert_eq!(round(&app, tournament_id, 2).await.len(), 1);

    let again = tournaments::next_round(&app.state.db, tournament_id, 1)
        .await
        .unwrap();
    assert!(again.effects.is_empty());
    assert_eq!(round(&app, tournament_id, 2).await.len(), 1);

    // Replaying the finish event changes nothing either.
    let replay = tournaments::on_game_finished(&app.state.db, first_round[0].game_id)
        .await
        .unwrap();
    assert!(replay.is_empty());
    assert_eq!(round(&app, tournament_id, 2).await.len(), 1);
}

#[tokio::test]
async fn test_games_outside_a_bracket_are_ignored() {
    let Some(app) = setup_test_db().await else { return };
    let (user, _) = create_test_user(&app.state, "casual").await;
    let game = games::create_game(
        &app.state.db,
        games::CreateGameParams::new(user, GameMode::Multiplayer),
    )
    .await
    .unwrap()
    .value;

    let effects = tournaments::on_game_finished(&app.state.db, game.id)
        .await
        .unwrap();
    assert!(effects.is_empty());
}

#[tokio::test]
async fn test_private_tournament_invites() {
    let Some(app) = setup_test_db().await else { return };
    let players = create_test_users(&app.state, "vip", 3).await;

    let mut params = CreateTournamentParams::new(players[0], "Invitational");
    params.visibility = infra::repos::Visibility::Private;
    let tournament = tournaments::create_tournament(&app.state.db, params)
        .await
        .unwrap()
        .value;

    let err = tournaments::join_tournament(&app.state.db, tournament.id, players[1], None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::NotInvited));

    let err = tournaments::invite_to_tournament(&app.state.db, tournament.id, players[2], players[1])
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::Unauthorized(_)));

    let invite = tournaments::invite_to_tournament(&app.state.db, tournament.id, players[0], players[1])
        .await
        .unwrap();
    assert!(matches!(invite.effects[..], [Effect::TournamentInvite { .. }]));

    let answered = tournaments::respond_to_tournament_invite(
        &app.state.db,
        invite.value.id,
        players[1],
        true,
        Some("guest".to_string()),
    )
    .await
    .unwrap();
    let (_, player) = answered.value;
    assert_eq!(player.map(|p| p.slot), Some(1));
    assert_eq!(answered.effects.len(), 2);
}

#[tokio::test]
async fn test_bracket_seats_cannot_change_hands() {
    let Some(app) = setup_test_db().await else { return };
    let players = create_test_users(&app.state, "seat", 4).await;
    let (outsider, _) = create_test_user(&app.state, "outsider").await;
    let tournament_id = enrolled_tournament(&app, &players, 4).await;

    let first_round = tournaments::start_tournament(&app.state.db, tournament_id, players[0])
        .await
        .unwrap()
        .value
        .games;
    let game_id = first_round[0].game_id;
    let seated = game_players::list_by_game(&app.state.db, game_id).await.unwrap();
    let second = seated.iter().find(|m| m.slot == 1).unwrap().player_id;

    let err = games::leave_game(&app.state.db, game_id, second)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::InvalidState(_)), "got {err:?}");

    let err = games::join_game(&app.state.db, game_id, outsider, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::InvalidState(_)), "got {err:?}");

    let after: Vec<Uuid> = game_players::list_by_game(&app.state.db, game_id)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.player_id)
        .collect();
    let before: Vec<Uuid> = seated.into_iter().map(|m| m.player_id).collect();
    assert_eq!(after, before);
    assert!(!after.contains(&outsider));
}

#[tokio::test]
async fn test_bracket_games_cannot_be_aborted() {
    let Some(app) = setup_test_db().await else { return };
    let players = create_test_users(&app.state, "abort", 4).await;
    let tournament_id = enrolled_tournament(&app, &players, 4).await;

    let slot = tournaments::start_tournament(&app.state.db, tournament_id, players[0])
        .await
        .unwrap()
        .value
        .games
        .remove(0);
    let first = game_players::list_by_game(&app.state.db, slot.game_id)
        .await
        .unwrap()
        .into_iter()
        .find(|m| m.slot == 0)
        .unwrap()
        .player_id;

    let abort = || UpdateStatusParams {
        game_id: slot.game_id,
        match_id: None,
        status: GameStatus::Aborted,
        stats: RallyStats::default(),
        requester_id: first,
    };

    let err = games::update_game_status(&app.state.db, abort())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::InvalidState(_)), "got {err:?}");

    games::start_game(&app.state.db, slot.game_id, first, Vec::new())
        .await
        .unwrap();
    let err = games::update_game_status(&app.state.db, abort())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::InvalidState(_)), "got {err:?}");

    let game = games::get_game(&app.state.db, slot.game_id).await.unwrap();
    assert_eq!(game.status, GameStatus::Active);
    let round_one = round(&app, tournament_id, 1).await;
    assert!(round_one.iter().all(|s| s.status == BracketStatus::Pending));
}

#[tokio::test]
async fn test_players_enrolled_before_the_room_exists_are_added() {
    let Some(app) = setup_test_db().await else { return };
    let players = create_test_users(&app.state, "early", 3).await;

    let created = tournaments::create_tournament(
        &app.state.db,
        CreateTournamentParams::new(players[0], "Early Birds"),
    )
    .await
    .unwrap();

    // Joins land before the room is provisioned, so their own chat effects find no room.
    for player in &players[1..] {
        let joined = tournaments::join_tournament(&app.state.db, created.value.id, *player, None)
            .await
            .unwrap();
        settle_effects(&app.state, joined.effects).await;
    }
    settle_effects(&app.state, created.effects).await;

    let tournament = tournaments::get_tournament(&app.state.db, created.value.id)
        .await
        .unwrap();
    let room_id = tournament.chat_room_id.expect("chat room attached");

    let mut expected = players.clone();
    expected.sort();
    assert_eq!(app.chat.members(room_id), expected);
}

#[tokio::test]
async fn test_concurrent_finishes_advance_the_round_once() {
    let Some(app) = setup_test_db().await else { return };
    let players = create_test_users(&app.state, "race", 4).await;
    let tournament_id = enrolled_tournament(&app, &players, 4).await;

    let first_round = tournaments::start_tournament(&app.state.db, tournament_id, players[0])
        .await
        .unwrap()
        .value
        .games;

    // Finish both games but hold back their GameFinished events.
    for slot in &first_round {
        play_out(&app, slot.game_id).await;
    }

    let (left, right) = tokio::join!(
        tournaments::on_game_finished(&app.state.db, first_round[0].game_id),
        tournaments::on_game_finished(&app.state.db, first_round[1].game_id),
    );
    let effects: Vec<Effect> = left.unwrap().into_iter().chain(right.unwrap()).collect();

    assert_eq!(round(&app, tournament_id, 2).await.len(), 1);
    let advanced = effects
        .iter()
        .filter(|e| matches!(e, Effect::TournamentUpdate { round: Some(2), .. }))
        .count();
    assert_eq!(advanced, 1);
    let round_one = round(&app, tournament_id, 1).await;
    assert!(round_one.iter().all(|s| s.status == BracketStatus::Finished));
}
