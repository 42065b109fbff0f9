use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use infra::db::settle;
use infra::models::{
    GameInviteRow, GamePlayerRow, GameRow, GameSettingsRow, MatchRow, MatchScoreRow,
};
use infra::pagination::LimitOffset;
use infra::repos::{
    game_players, games, invites, matches, tournament_games, users, CreateGameSettings,
    GameMode, GameStatus, InviteStatus, PaddleLocation, UpdateGameSettings, Visibility,
    AI_PLAYER_ID,
};

use super::ledger::{self, LedgerSummary, RallyStats};
use crate::error::{expect_one, OrchestrationError, OrchestrationResult};
use crate::services::{Effect, Outcome};

pub const DEFAULT_MAX_SCORE: i32 = 10;
pub const DEFAULT_BALL_SPEED: i32 = 5;

/// Parameters for creating a game (parsed by the resolver).
#[derive(Debug, Clone)]
pub struct CreateGameParams {
    pub creator_id: Uuid,
    pub mode: GameMode,
    pub capacity: Option<i32>,
    pub visibility: Visibility,
    pub num_games: Option<i32>,
    pub num_matches: Option<i32>,
    pub max_score: Option<i32>,
    pub ball_speed: Option<i32>,
    pub time_limit_seconds: Option<i32>,
}

impl CreateGameParams {
    pub fn new(creator_id: Uuid, mode: GameMode) -> Self {
        Self {
            creator_id,
            mode,
            capacity: None,
            visibility: Visibility::Public,
            num_games: None,
            num_matches: None,
            max_score: None,
            ball_speed: None,
            time_limit_seconds: None,
        }
    }

    fn settings(&self) -> OrchestrationResult<CreateGameSettings> {
        let allowed = self.mode.allowed_capacities();
        let capacity = self.capacity.unwrap_or(allowed[0]);
        if !allowed.contains(&capacity) {
            return Err(OrchestrationError::InvalidInput(format!(
                "capacity {capacity} is not allowed for this mode"
            )));
        }

        let settings = CreateGameSettings {
            mode: self.mode,
            capacity,
            visibility: self.visibility,
            num_games: self.num_games.unwrap_or(1),
            num_matches: self.num_matches.unwrap_or(1),
            max_score: self.max_score.unwrap_or(DEFAULT_MAX_SCORE),
            ball_speed: self.ball_speed.unwrap_or(DEFAULT_BALL_SPEED),
            time_limit_seconds: self.time_limit_seconds,
        };
        validate_tuning(
            Some(settings.num_games),
            Some(settings.num_matches),
            Some(settings.max_score),
            settings.time_limit_seconds,
        )?;
        Ok(settings)
    }
}

pub(crate) fn validate_tuning(
    num_games: Option<i32>,
    num_matches: Option<i32>,
    max_score: Option<i32>,
    time_limit_seconds: Option<i32>,
) -> OrchestrationResult<()> {
    for (name, value) in [
        ("numGames", num_games),
        ("numMatches", num_matches),
        ("maxScore", max_score),
        ("timeLimitSeconds", time_limit_seconds),
    ] {
        if let Some(value) = value {
            if value <= 0 {
                return Err(OrchestrationError::InvalidInput(format!(
                    "{name} must be positive"
                )));
            }
        }
    }
    Ok(())
}

/// Insert a game, its settings and the creator's membership on an open transaction.
///
/// Each insert must land exactly one row; the caller rolls back on error.
pub(crate) async fn insert_game(
    conn: &mut PgConnection,
    creator_id: Uuid,
    settings: &CreateGameSettings,
) -> OrchestrationResult<GameRow> {
    let game = games::insert(&mut *conn, creator_id)
        .await?
        .ok_or(OrchestrationError::CreationFailed("game"))?;

    if games::insert_settings(&mut *conn, game.id, settings).await? != 1 {
        return Err(OrchestrationError::CreationFailed("game settings"));
    }

    game_players::insert(&mut *conn, game.id, creator_id, 0)
        .await?
        .ok_or(OrchestrationError::CreationFailed("game player"))?;

    Ok(game)
}

pub async fn create_game(
    pool: &PgPool,
    params: CreateGameParams,
) -> OrchestrationResult<Outcome<GameRow>> {
    let settings = params.settings()?;
    if !users::exists(pool, params.creator_id).await? {
        return Err(OrchestrationError::UserNotFound);
    }

    let mut tx = pool.begin().await?;
    let result = insert_game(&mut tx, params.creator_id, &settings).await;
    let game = settle(tx, result).await?;

    info!(game_id = %game.id, creator_id = %game.creator_id, mode = ?settings.mode, "Game created");
    Ok(Outcome::new(game))
}

pub async fn get_game(pool: &PgPool, game_id: Uuid) -> OrchestrationResult<GameRow> {
    games::get_by_id(pool, game_id)
        .await?
        .ok_or(OrchestrationError::GameNotFound)
}

pub async fn list_open_games(
    pool: &PgPool,
    mode: Option<GameMode>,
    page: LimitOffset,
) -> OrchestrationResult<Vec<GameRow>> {
    Ok(games::list_open(pool, mode, page).await?)
}

async fn join_in(
    conn: &mut PgConnection,
    game_id: Uuid,
    user_id: Uuid,
    slot: Option<i32>,
) -> OrchestrationResult<GamePlayerRow> {
    let game = games::get_for_update(&mut *conn, game_id)
        .await?
        .ok_or(OrchestrationError::GameNotFound)?;
    if game.status != GameStatus::Pending {
        return Err(OrchestrationError::NotJoinable);
    }
    if tournament_games::get_by_game(&mut *conn, game_id).await?.is_some() {
        return Err(OrchestrationError::InvalidState(
            "tournament game seats are assigned by the bracket".to_string(),
        ));
    }

    let settings = games::get_settings(&mut *conn, game_id)
        .await?
        .ok_or(OrchestrationError::SettingsMissing)?;

    if settings.visibility == Visibility::Private
        && !invites::has_accepted_game_invite(&mut *conn, game_id, user_id).await?
    {
        return Err(OrchestrationError::NotInvited);
    }

    let members = game_players::count_by_game(&mut *conn, game_id).await?;
    if members >= i64::from(settings.capacity) {
        return Err(OrchestrationError::Full);
    }

    if game_players::get(&mut *conn, game_id, user_id).await?.is_some() {
        return Err(OrchestrationError::AlreadyJoined);
    }

    let slot = slot.unwrap_or(members as i32);
    game_players::insert(&mut *conn, game_id, user_id, slot)
        .await?
        .ok_or(OrchestrationError::AlreadyJoined)
}

/// Add a player to a pending game.
///
/// Fails without writing anything when the game is not pending, is private and the user
/// holds no accepted invite, is full, or already counts the user as a member.
pub async fn join_game(
    pool: &PgPool,
    game_id: Uuid,
    user_id: Uuid,
    slot: Option<i32>,
) -> OrchestrationResult<Outcome<GamePlayerRow>> {
    if !users::exists(pool, user_id).await? {
        return Err(OrchestrationError::UserNotFound);
    }

    let mut tx = pool.begin().await?;
    let result = join_in(&mut tx, game_id, user_id, slot).await;
    let player = settle(tx, result).await?;

    info!(game_id = %game_id, user_id = %user_id, slot = player.slot, "Player joined game");
    Ok(Outcome::new(player))
}

/// Result of a successful start.
#[derive(Debug)]
pub struct StartedGame {
    pub game: GameRow,
    pub players: Vec<GamePlayerRow>,
    pub first_match: MatchRow,
    pub tournament_id: Option<Uuid>,
}

fn roster(requested: &[Uuid], members: &[GamePlayerRow]) -> Vec<Uuid> {
    let mut roster: Vec<Uuid> = Vec::new();
    let source: Vec<Uuid> = if requested.is_empty() {
        members
            .iter()
            .filter(|m| m.player_id != AI_PLAYER_ID)
            .map(|m| m.player_id)
            .collect()
    } else {
        requested.to_vec()
    };
    for player_id in source {
        if !roster.contains(&player_id) {
            roster.push(player_id);
        }
    }
    roster
}

async fn start_in(
    conn: &mut PgConnection,
    game_id: Uuid,
    requester_id: Uuid,
    requested: &[Uuid],
) -> OrchestrationResult<StartedGame> {
    let game = games::get_for_update(&mut *conn, game_id)
        .await?
        .ok_or(OrchestrationError::GameNotFound)?;
    let settings = games::get_settings(&mut *conn, game_id)
        .await?
        .ok_or(OrchestrationError::SettingsMissing)?;
    let members = game_players::list_by_game(&mut *conn, game_id).await?;
    let roster = roster(requested, &members);

    let (tournament_id, tournament_creator) = if settings.mode == GameMode::Tournament {
        let slot = tournament_games::get_by_game(&mut *conn, game_id).await?;
        let creator = tournament_games::tournament_creator_for_game(&mut *conn, game_id).await?;
        (slot.map(|s| s.tournament_id), creator)
    } else {
        (None, None)
    };

    let authorized = requester_id == game.creator_id
        || (settings.mode == GameMode::Tournament
            && (tournament_creator == Some(requester_id) || roster.contains(&requester_id)));
    if !authorized {
        return Err(OrchestrationError::Unauthorized(
            "only the creator can start this game".to_string(),
        ));
    }

    if game.status != GameStatus::Pending {
        return Err(OrchestrationError::NotPending);
    }

    for player_id in &roster {
        if !members.iter().any(|m| m.player_id == *player_id) {
            return Err(OrchestrationError::InvalidInput(format!(
                "player {player_id} has not joined this game"
            )));
        }
    }
    if roster.len() > PaddleLocation::ORDER.len() || roster.len() as i32 > settings.capacity {
        return Err(OrchestrationError::InvalidInput(
            "too many players for this game".to_string(),
        ));
    }
    if settings.mode.has_ai_opponent() {
        if roster.len() != 1 {
            return Err(OrchestrationError::InvalidState(
                "this mode is played by one player against the AI".to_string(),
            ));
        }
    } else if roster.len() < 2 {
        return Err(OrchestrationError::InvalidState(
            "at least two players are needed to start".to_string(),
        ));
    }

    let started = games::mark_started(&mut *conn, game_id)
        .await?
        .ok_or_else(|| OrchestrationError::game_transition(game.status, GameStatus::Active))?;

    for (player_id, location) in roster.iter().zip(PaddleLocation::ORDER) {
        expect_one(
            game_players::assign_paddle(&mut *conn, game_id, *player_id, location).await?,
            "paddle assignment",
        )?;
    }

    if settings.mode.has_ai_opponent() {
        let ai_location = PaddleLocation::ORDER[0].side().opposite().home_location();
        game_players::insert_positioned(
            &mut *conn,
            game_id,
            AI_PLAYER_ID,
            members.len() as i32,
            Some(ai_location),
        )
        .await?
        .ok_or(OrchestrationError::CreationFailed("ai opponent"))?;
    }

    let first_match = matches::insert(&mut *conn, game_id, 1, None)
        .await?
        .ok_or(OrchestrationError::CreationFailed("match"))?;

    let players = game_players::list_by_game(&mut *conn, game_id).await?;
    seed_scores(&mut *conn, first_match.id, &players).await?;

    Ok(StartedGame {
        game: started,
        players,
        first_match,
        tournament_id,
    })
}

/// One score row per seated player.
async fn seed_scores(
    conn: &mut PgConnection,
    match_id: Uuid,
    players: &[GamePlayerRow],
) -> OrchestrationResult<()> {
    for player in players.iter().filter(|p| p.paddle_location.is_some()) {
        expect_one(
            matches::insert_score(&mut *conn, match_id, player.player_id).await?,
            "match score",
        )?;
    }
    Ok(())
}

/// Move a pending game to active: seat the players, add the AI opponent where the mode
/// calls for one, and open the first match.
///
/// An empty `players` list seats every current member in join order.
pub async fn start_game(
    pool: &PgPool,
    game_id: Uuid,
    requester_id: Uuid,
    players: Vec<Uuid>,
) -> OrchestrationResult<Outcome<StartedGame>> {
    let mut tx = pool.begin().await?;
    let result = start_in(&mut tx, game_id, requester_id, &players).await;
    let started = settle(tx, result).await?;

    info!(
        game_id = %game_id,
        players = started.players.len(),
        "Game started"
    );

    let effects = started
        .players
        .iter()
        .filter(|p| p.player_id != requester_id && p.player_id != AI_PLAYER_ID)
        .map(|p| Effect::TurnReady {
            user_id: p.player_id,
            game_id,
            tournament_id: started.tournament_id,
        })
        .collect();

    Ok(Outcome::with_effects(started, effects))
}

/// Parameters for a status update (parsed by the resolver).
#[derive(Debug, Clone)]
pub struct UpdateStatusParams {
    pub game_id: Uuid,
    pub match_id: Option<Uuid>,
    pub status: GameStatus,
    pub stats: RallyStats,
    pub requester_id: Uuid,
}

/// State after a status update.
#[derive(Debug)]
pub struct StatusUpdate {
    pub game: GameRow,
    pub current_match: Option<MatchRow>,
    pub scores: Vec<MatchScoreRow>,
}

async fn reload_game(conn: &mut PgConnection, game_id: Uuid) -> OrchestrationResult<GameRow> {
    games::get_by_id(&mut *conn, game_id)
        .await?
        .ok_or(OrchestrationError::GameNotFound)
}

/// Close the latest match if it is still open and open the next one after it.
async fn open_next_match(conn: &mut PgConnection, game_id: Uuid) -> OrchestrationResult<MatchRow> {
    let (number, started_at) = match matches::latest_for_game(&mut *conn, game_id).await? {
        Some(previous) => {
            let previous = if previous.completed {
                previous
            } else {
                matches::complete(&mut *conn, previous.id, None)
                    .await?
                    .ok_or(OrchestrationError::ConstraintViolation("match completion"))?
            };
            (previous.number + 1, previous.ended_at)
        }
        None => (1, None),
    };

    let next = matches::insert(&mut *conn, game_id, number, started_at)
        .await?
        .ok_or(OrchestrationError::CreationFailed("match"))?;

    let players = game_players::list_by_game(&mut *conn, game_id).await?;
    seed_scores(&mut *conn, next.id, &players).await?;

    debug!(game_id = %game_id, number, "Match opened");
    Ok(next)
}

/// Apply the deltas of one update to the targeted match and refresh the derived winners.
async fn account_match(
    conn: &mut PgConnection,
    game: &GameRow,
    settings: &GameSettingsRow,
    match_id: Option<Uuid>,
    stats: &RallyStats,
    finishing: bool,
) -> OrchestrationResult<(Option<MatchRow>, Vec<MatchScoreRow>)> {
    let target = match match_id {
        Some(id) => Some(
            matches::get_for_game(&mut *conn, game.id, id)
                .await?
                .ok_or(OrchestrationError::MatchNotFound)?,
        ),
        // Finishing closes the trailing match rather than opening an empty one.
        None if finishing => matches::latest_for_game(&mut *conn, game.id)
            .await?
            .filter(|m| !m.completed),
        None => Some(open_next_match(&mut *conn, game.id).await?),
    };

    let Some(current) = target else {
        if !stats.is_empty() {
            return Err(OrchestrationError::InvalidState(
                "there is no open match to score".to_string(),
            ));
        }
        return Ok((None, Vec::new()));
    };

    if current.completed {
        if !stats.is_empty() {
            return Err(OrchestrationError::InvalidState(format!(
                "match {} is already completed",
                current.number
            )));
        }
        let scores = matches::list_scores_for_match(&mut *conn, current.id).await?;
        return Ok((Some(current), scores));
    }

    expect_one(matches::stamp_ended(&mut *conn, current.id).await?, "match")?;

    for (player_id, hits, score) in stats.deltas() {
        matches::apply_delta(&mut *conn, current.id, player_id, hits, score)
            .await?
            .ok_or_else(|| {
                OrchestrationError::InvalidInput(format!(
                    "player {player_id} has no score in this match"
                ))
            })?;
    }

    let scores = matches::list_scores_for_match(&mut *conn, current.id).await?;

    let current = if let Some(set_winner) = ledger::set_point_winner(&scores, settings.max_score)
    {
        info!(game_id = %game.id, number = current.number, winner_id = %set_winner, "Set won");
        matches::complete(&mut *conn, current.id, Some(set_winner))
            .await?
            .ok_or(OrchestrationError::ConstraintViolation("match completion"))?
    } else if finishing {
        let winner = ledger::match_winner(&scores, current.winner_id);
        matches::complete(&mut *conn, current.id, winner)
            .await?
            .ok_or(OrchestrationError::ConstraintViolation("match completion"))?
    } else {
        let winner = ledger::match_winner(&scores, current.winner_id);
        match winner {
            Some(winner) if Some(winner) != current.winner_id => {
                expect_one(
                    matches::set_winner(&mut *conn, current.id, winner).await?,
                    "match winner",
                )?;
                MatchRow {
                    winner_id: Some(winner),
                    ..current
                }
            }
            _ => current,
        }
    };

    if !finishing {
        let all_scores = matches::list_scores_for_game(&mut *conn, game.id).await?;
        let provisional =
            ledger::leader_or_previous(ledger::cumulative_scores(&all_scores), game.winner_id);
        if let Some(leader) = provisional.filter(|leader| Some(*leader) != game.winner_id) {
            expect_one(games::set_winner(&mut *conn, game.id, leader).await?, "game winner")?;
        }
    }

    Ok((Some(current), scores))
}

async fn update_status_in(
    conn: &mut PgConnection,
    params: &UpdateStatusParams,
) -> OrchestrationResult<(StatusUpdate, GameMode)> {
    let game = games::get_for_update(&mut *conn, params.game_id)
        .await?
        .ok_or(OrchestrationError::GameNotFound)?;

    if game_players::get(&mut *conn, game.id, params.requester_id)
        .await?
        .is_none()
    {
        return Err(OrchestrationError::Unauthorized(
            "only players of this game can update it".to_string(),
        ));
    }

    let (from, to) = (game.status, params.status);
    if from == GameStatus::Pending && to == GameStatus::Active {
        return Err(OrchestrationError::InvalidState(
            "a pending game is activated with startGame".to_string(),
        ));
    }
    if !from.can_transition_to(to) {
        return Err(OrchestrationError::game_transition(from, to));
    }
    // An aborted bracket game would leave its slot unresolved.
    if to == GameStatus::Aborted
        && tournament_games::get_by_game(&mut *conn, game.id).await?.is_some()
    {
        return Err(OrchestrationError::InvalidState(
            "a tournament game cannot be aborted".to_string(),
        ));
    }

    let settings = games::get_settings(&mut *conn, game.id)
        .await?
        .ok_or(OrchestrationError::SettingsMissing)?;

    let status_only = match to {
        GameStatus::Pending | GameStatus::Paused | GameStatus::Aborted => true,
        GameStatus::Active => from == GameStatus::Paused,
        GameStatus::Finished => false,
    };

    if status_only {
        expect_one(games::update_status(&mut *conn, game.id, to).await?, "game status")?;
        let update = StatusUpdate {
            game: reload_game(&mut *conn, game.id).await?,
            current_match: None,
            scores: Vec::new(),
        };
        return Ok((update, settings.mode));
    }

    let finishing = to == GameStatus::Finished;
    let (current_match, scores) = account_match(
        &mut *conn,
        &game,
        &settings,
        params.match_id,
        &params.stats,
        finishing,
    )
    .await?;

    if finishing {
        let all_scores = matches::list_scores_for_game(&mut *conn, game.id).await?;
        let winner = ledger::strict_leader(ledger::cumulative_scores(&all_scores));
        if winner.is_none() && settings.mode == GameMode::Tournament {
            return Err(OrchestrationError::InvalidState(
                "a tournament game cannot finish without a winner".to_string(),
            ));
        }
        expect_one(games::mark_finished(&mut *conn, game.id, winner).await?, "game finish")?;
    }

    let update = StatusUpdate {
        game: reload_game(&mut *conn, game.id).await?,
        current_match,
        scores,
    };
    Ok((update, settings.mode))
}

/// Per-rally and boundary updates of a running game.
///
/// Pause, resume and abort only flip the status. Score updates and finishing go through
/// match accounting; finishing a tournament game publishes `GameFinished` once committed.
pub async fn update_game_status(
    pool: &PgPool,
    params: UpdateStatusParams,
) -> OrchestrationResult<Outcome<StatusUpdate>> {
    params
        .stats
        .validate()
        .map_err(OrchestrationError::InvalidInput)?;

    let mut tx = pool.begin().await?;
    let result = update_status_in(&mut tx, &params).await;
    let (update, mode) = settle(tx, result).await?;

    let mut effects = Vec::new();
    match update.game.status {
        GameStatus::Finished => {
            info!(
                game_id = %update.game.id,
                winner_id = ?update.game.winner_id,
                "Game finished"
            );
            if mode == GameMode::Tournament {
                effects.push(Effect::GameFinished {
                    game_id: update.game.id,
                });
            }
        }
        GameStatus::Active if params.status == GameStatus::Active => {
            debug!(
                game_id = %update.game.id,
                match_id = ?update.current_match.as_ref().map(|m| m.id),
                "Score updated"
            );
        }
        status => info!(game_id = %update.game.id, status = status.as_str(), "Game status changed"),
    }

    Ok(Outcome::with_effects(update, effects))
}

async fn leave_in(
    conn: &mut PgConnection,
    game_id: Uuid,
    user_id: Uuid,
) -> OrchestrationResult<GameRow> {
    let game = games::get_for_update(&mut *conn, game_id)
        .await?
        .ok_or(OrchestrationError::GameNotFound)?;

    if game.creator_id == user_id {
        return Err(OrchestrationError::CreatorCannotLeave);
    }
    if game.status.is_terminal() {
        return Err(OrchestrationError::InvalidState(
            "the game is already over".to_string(),
        ));
    }

    if tournament_games::get_by_game(&mut *conn, game_id).await?.is_some() {
        return Err(OrchestrationError::InvalidState(
            "a tournament game cannot be left".to_string(),
        ));
    }

    let running = matches!(game.status, GameStatus::Active | GameStatus::Paused);
    if running && !game.status.can_transition_to(GameStatus::Aborted) {
        return Err(OrchestrationError::game_transition(game.status, GameStatus::Aborted));
    }

    if game_players::remove(&mut *conn, game_id, user_id).await? == 0 {
        return Err(OrchestrationError::InvalidInput(
            "you are not a player of this game".to_string(),
        ));
    }

    // A running game cannot go on with a missing paddle.
    if running {
        expect_one(
            games::update_status(&mut *conn, game_id, GameStatus::Aborted).await?,
            "game status",
        )?;
    }

    reload_game(&mut *conn, game_id).await
}

pub async fn leave_game(
    pool: &PgPool,
    game_id: Uuid,
    user_id: Uuid,
) -> OrchestrationResult<Outcome<GameRow>> {
    let mut tx = pool.begin().await?;
    let result = leave_in(&mut tx, game_id, user_id).await;
    let game = settle(tx, result).await?;

    info!(game_id = %game_id, user_id = %user_id, status = game.status.as_str(), "Player left game");
    Ok(Outcome::new(game))
}

async fn delete_in(conn: &mut PgConnection, game_id: Uuid, requester_id: Uuid) -> OrchestrationResult<()> {
    let game = games::get_for_update(&mut *conn, game_id)
        .await?
        .ok_or(OrchestrationError::GameNotFound)?;

    if game.creator_id != requester_id {
        return Err(OrchestrationError::Unauthorized(
            "only the creator can delete this game".to_string(),
        ));
    }
    if matches!(game.status, GameStatus::Active | GameStatus::Paused) {
        return Err(OrchestrationError::InvalidState(
            "a running game cannot be deleted".to_string(),
        ));
    }
    if tournament_games::get_by_game(&mut *conn, game_id).await?.is_some() {
        return Err(OrchestrationError::InvalidState(
            "tournament games cannot be deleted".to_string(),
        ));
    }

    expect_one(games::delete(&mut *conn, game_id).await?, "game delete")
}

pub async fn delete_game(
    pool: &PgPool,
    game_id: Uuid,
    requester_id: Uuid,
) -> OrchestrationResult<Outcome<Uuid>> {
    let mut tx = pool.begin().await?;
    let result = delete_in(&mut tx, game_id, requester_id).await;
    settle(tx, result).await?;

    info!(game_id = %game_id, "Game deleted");
    Ok(Outcome::new(game_id))
}

async fn update_settings_in(
    conn: &mut PgConnection,
    game_id: Uuid,
    requester_id: Uuid,
    patch: UpdateGameSettings,
) -> OrchestrationResult<GameSettingsRow> {
    let game = games::get_for_update(&mut *conn, game_id)
        .await?
        .ok_or(OrchestrationError::GameNotFound)?;

    if game.creator_id != requester_id {
        return Err(OrchestrationError::Unauthorized(
            "only the creator can change the settings".to_string(),
        ));
    }
    if game.status != GameStatus::Pending {
        return Err(OrchestrationError::NotPending);
    }

    games::update_settings(&mut *conn, game_id, patch)
        .await?
        .ok_or(OrchestrationError::SettingsMissing)
}

/// Owner-only change of a pending game's tuning.
pub async fn update_game_settings(
    pool: &PgPool,
    game_id: Uuid,
    requester_id: Uuid,
    patch: UpdateGameSettings,
) -> OrchestrationResult<Outcome<GameSettingsRow>> {
    validate_tuning(
        patch.num_games,
        patch.num_matches,
        patch.max_score,
        patch.time_limit_seconds,
    )?;

    let mut tx = pool.begin().await?;
    let result = update_settings_in(&mut tx, game_id, requester_id, patch).await;
    let settings = settle(tx, result).await?;

    info!(game_id = %game_id, "Game settings updated");
    Ok(Outcome::new(settings))
}

async fn invite_in(
    conn: &mut PgConnection,
    game_id: Uuid,
    inviter_id: Uuid,
    invitee_id: Uuid,
) -> OrchestrationResult<GameInviteRow> {
    let game = games::get_for_update(&mut *conn, game_id)
        .await?
        .ok_or(OrchestrationError::GameNotFound)?;

    if game.creator_id != inviter_id {
        return Err(OrchestrationError::Unauthorized(
            "only the creator can invite players".to_string(),
        ));
    }
    if game.status != GameStatus::Pending {
        return Err(OrchestrationError::NotJoinable);
    }

    let settings = games::get_settings(&mut *conn, game_id)
        .await?
        .ok_or(OrchestrationError::SettingsMissing)?;
    if settings.visibility != Visibility::Private {
        return Err(OrchestrationError::InvalidState(
            "public games need no invite".to_string(),
        ));
    }

    if invitee_id == inviter_id {
        return Err(OrchestrationError::InvalidInput(
            "you cannot invite yourself".to_string(),
        ));
    }
    if !users::exists(&mut *conn, invitee_id).await? {
        return Err(OrchestrationError::UserNotFound);
    }
    if game_players::get(&mut *conn, game_id, invitee_id).await?.is_some() {
        return Err(OrchestrationError::AlreadyJoined);
    }

    Ok(invites::upsert_game_invite(&mut *conn, game_id, inviter_id, invitee_id).await?)
}

pub async fn invite_to_game(
    pool: &PgPool,
    game_id: Uuid,
    inviter_id: Uuid,
    invitee_id: Uuid,
) -> OrchestrationResult<Outcome<GameInviteRow>> {
    let mut tx = pool.begin().await?;
    let result = invite_in(&mut tx, game_id, inviter_id, invitee_id).await;
    let invite = settle(tx, result).await?;

    let effect = Effect::GameInvite {
        invite_id: invite.id,
        game_id,
        inviter_id,
        invitee_id,
    };
    Ok(Outcome::with_effects(invite, vec![effect]))
}

async fn respond_in(
    conn: &mut PgConnection,
    invite_id: Uuid,
    user_id: Uuid,
    accept: bool,
) -> OrchestrationResult<(GameInviteRow, Option<GamePlayerRow>)> {
    let invite = invites::get_game_invite(&mut *conn, invite_id)
        .await?
        .ok_or(OrchestrationError::InviteNotFound)?;

    if invite.invitee_id != user_id {
        return Err(OrchestrationError::Unauthorized(
            "this invite is addressed to someone else".to_string(),
        ));
    }

    let status = if accept {
        InviteStatus::Accepted
    } else {
        InviteStatus::Declined
    };
    let invite = invites::respond_game_invite(&mut *conn, invite_id, status)
        .await?
        .ok_or_else(|| OrchestrationError::InvalidState("invite was already answered".to_string()))?;

    let player = if accept {
        Some(join_in(&mut *conn, invite.game_id, user_id, None).await?)
    } else {
        None
    };

    Ok((invite, player))
}

/// Answer a game invite. Accepting joins the game in the same transaction.
pub async fn respond_to_game_invite(
    pool: &PgPool,
    invite_id: Uuid,
    user_id: Uuid,
    accept: bool,
) -> OrchestrationResult<Outcome<(GameInviteRow, Option<GamePlayerRow>)>> {
    let mut tx = pool.begin().await?;
    let result = respond_in(&mut tx, invite_id, user_id, accept).await;
    let answered = settle(tx, result).await?;

    info!(invite_id = %invite_id, user_id = %user_id, accepted = accept, "Game invite answered");
    Ok(Outcome::new(answered))
}

pub struct GameSummary {
    pub game: GameRow,
    pub settings: GameSettingsRow,
    pub players: Vec<GamePlayerRow>,
    pub ledger: LedgerSummary,
}

/// Read-only view of a game's score history.
pub async fn game_summary(pool: &PgPool, game_id: Uuid) -> OrchestrationResult<GameSummary> {
    let game = get_game(pool, game_id).await?;

    let (settings, players, match_rows, scores) = tokio::try_join!(
        games::get_settings(pool, game_id),
        game_players::list_by_game(pool, game_id),
        matches::list_by_game(pool, game_id),
        matches::list_scores_for_game(pool, game_id),
    )?;
    let settings = settings.ok_or(OrchestrationError::SettingsMissing)?;

    let ledger = ledger::summarize(&players, &match_rows, &scores);
    Ok(GameSummary {
        game,
        settings,
        players,
        ledger,
    })
}

pub async fn game_options(pool: &PgPool, game_id: Uuid) -> OrchestrationResult<GameSettingsRow> {
    get_game(pool, game_id).await?;
    games::get_settings(pool, game_id)
        .await?
        .ok_or(OrchestrationError::SettingsMissing)
}
