use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use infra::db::settle;
use infra::models::{
    TournamentGameRow, TournamentInviteRow, TournamentPlayerRow, TournamentRow,
    TournamentSettingsRow,
};
use infra::pagination::LimitOffset;
use infra::repos::{
    game_players, games, invites, tournament_games, tournament_players, tournaments, users,
    CreateBracketSlot, CreateGameSettings, CreateTournamentSettings, GameMode, GameStatus,
    InviteStatus, TournamentStatus, Visibility,
};

use super::bracket::{self, RoundPlan};
use crate::error::{OrchestrationError, OrchestrationResult};
use crate::gql::domains::games::service::{
    insert_game, validate_tuning, DEFAULT_BALL_SPEED, DEFAULT_MAX_SCORE,
};
use crate::services::{Effect, Outcome};

pub const DEFAULT_CAPACITY: i32 = 4;
const MAX_ALIAS_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct CreateTournamentParams {
    pub creator_id: Uuid,
    pub name: String,
    pub capacity: Option<i32>,
    pub visibility: Visibility,
    pub num_games: Option<i32>,
    pub num_matches: Option<i32>,
    pub max_score: Option<i32>,
    pub ball_speed: Option<i32>,
    pub time_limit_seconds: Option<i32>,
    pub alias: Option<String>,
}

impl CreateTournamentParams {
    pub fn new(creator_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            creator_id,
            name: name.into(),
            capacity: None,
            visibility: Visibility::Public,
            num_games: None,
            num_matches: None,
            max_score: None,
            ball_speed: None,
            time_limit_seconds: None,
            alias: None,
        }
    }

    fn settings(&self) -> OrchestrationResult<CreateTournamentSettings> {
        let capacity = self.capacity.unwrap_or(DEFAULT_CAPACITY);
        bracket::validate_bracket_size(usize::try_from(capacity).unwrap_or(0))?;

        let settings = CreateTournamentSettings {
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

fn clean_alias(alias: Option<&str>) -> OrchestrationResult<Option<String>> {
    let Some(alias) = alias.map(str::trim) else {
        return Ok(None);
    };
    if alias.is_empty() || alias.chars().count() > MAX_ALIAS_LEN {
        return Err(OrchestrationError::InvalidInput(format!(
            "alias must be 1 to {MAX_ALIAS_LEN} characters"
        )));
    }
    Ok(Some(alias.to_string()))
}

/// Record the player's alias, falling back to their username.
async fn record_alias(
    conn: &mut PgConnection,
    tournament_id: Uuid,
    player_id: Uuid,
    alias: Option<String>,
) -> OrchestrationResult<()> {
    let alias = match alias {
        Some(alias) => alias,
        None => users::username_of(&mut *conn, player_id)
            .await?
            .ok_or(OrchestrationError::UserNotFound)?,
    };

    tournament_players::insert_alias(&mut *conn, tournament_id, player_id, &alias)
        .await?
        .ok_or_else(|| OrchestrationError::InvalidInput(format!("alias '{alias}' is taken")))?;
    Ok(())
}

async fn create_in(
    conn: &mut PgConnection,
    params: &CreateTournamentParams,
    settings: &CreateTournamentSettings,
    alias: Option<String>,
) -> OrchestrationResult<TournamentRow> {
    let tournament = tournaments::insert(&mut *conn, params.creator_id, params.name.trim())
        .await?
        .ok_or(OrchestrationError::CreationFailed("tournament"))?;

    if tournaments::insert_settings(&mut *conn, tournament.id, settings).await? != 1 {
        return Err(OrchestrationError::CreationFailed("tournament settings"));
    }

    tournament_players::insert(&mut *conn, tournament.id, params.creator_id, 0)
        .await?
        .ok_or(OrchestrationError::CreationFailed("tournament player"))?;

    record_alias(&mut *conn, tournament.id, params.creator_id, alias).await?;
    Ok(tournament)
}

/// Create a pending tournament with the creator enrolled in slot 0.
///
/// The chat room is provisioned after commit; a chat failure leaves the tournament without
/// a room rather than undoing it.
pub async fn create_tournament(
    pool: &PgPool,
    params: CreateTournamentParams,
) -> OrchestrationResult<Outcome<TournamentRow>> {
    if params.name.trim().is_empty() {
        return Err(OrchestrationError::InvalidInput(
            "tournament name is required".to_string(),
        ));
    }
    let settings = params.settings()?;
    let alias = clean_alias(params.alias.as_deref())?;
    if !users::exists(pool, params.creator_id).await? {
        return Err(OrchestrationError::UserNotFound);
    }

    let mut tx = pool.begin().await?;
    let result = create_in(&mut tx, &params, &settings, alias).await;
    let tournament = settle(tx, result).await?;

    info!(
        tournament_id = %tournament.id,
        creator_id = %tournament.creator_id,
        capacity = settings.capacity,
        "Tournament created"
    );

    let effect = Effect::ProvisionChatRoom {
        tournament_id: tournament.id,
        name: tournament.name.clone(),
        visibility: settings.visibility,
        creator_id: tournament.creator_id,
    };
    Ok(Outcome::with_effects(tournament, vec![effect]))
}

pub async fn get_tournament(pool: &PgPool, tournament_id: Uuid) -> OrchestrationResult<TournamentRow> {
    tournaments::get_by_id(pool, tournament_id)
        .await?
        .ok_or(OrchestrationError::TournamentNotFound)
}

pub async fn list_tournaments(
    pool: &PgPool,
    status: Option<TournamentStatus>,
    page: LimitOffset,
) -> OrchestrationResult<Vec<TournamentRow>> {
    Ok(tournaments::list(pool, status, page).await?)
}

async fn join_in(
    conn: &mut PgConnection,
    tournament_id: Uuid,
    user_id: Uuid,
    alias: Option<String>,
) -> OrchestrationResult<TournamentPlayerRow> {
    let tournament = tournaments::get_for_update(&mut *conn, tournament_id)
        .await?
        .ok_or(OrchestrationError::TournamentNotFound)?;
    if tournament.status != TournamentStatus::Pending {
        return Err(OrchestrationError::NotJoinable);
    }

    let settings = tournaments::get_settings(&mut *conn, tournament_id)
        .await?
        .ok_or(OrchestrationError::SettingsMissing)?;

    if settings.visibility == Visibility::Private
        && !invites::has_accepted_tournament_invite(&mut *conn, tournament_id, user_id).await?
    {
        return Err(OrchestrationError::NotInvited);
    }

    let enrolled = tournament_players::count_by_tournament(&mut *conn, tournament_id).await?;
    if enrolled >= i64::from(settings.capacity) {
        return Err(OrchestrationError::Full);
    }

    let player = tournament_players::insert(&mut *conn, tournament_id, user_id, enrolled as i32)
        .await?
        .ok_or(OrchestrationError::AlreadyJoined)?;

    record_alias(&mut *conn, tournament_id, user_id, alias).await?;
    Ok(player)
}

fn joined_effects(player: &TournamentPlayerRow) -> Vec<Effect> {
    vec![
        Effect::JoinTournamentChat {
            tournament_id: player.tournament_id,
            user_id: player.player_id,
        },
        Effect::TournamentUpdate {
            tournament_id: player.tournament_id,
            status: TournamentStatus::Pending,
            round: None,
            winner_id: None,
        },
    ]
}

/// Enrol a player in a pending tournament. Slots follow enrolment order.
pub async fn join_tournament(
    pool: &PgPool,
    tournament_id: Uuid,
    user_id: Uuid,
    alias: Option<String>,
) -> OrchestrationResult<Outcome<TournamentPlayerRow>> {
    let alias = clean_alias(alias.as_deref())?;
    if !users::exists(pool, user_id).await? {
        return Err(OrchestrationError::UserNotFound);
    }

    let mut tx = pool.begin().await?;
    let result = join_in(&mut tx, tournament_id, user_id, alias).await;
    let player = settle(tx, result).await?;

    info!(tournament_id = %tournament_id, user_id = %user_id, slot = player.slot, "Player joined tournament");
    let effects = joined_effects(&player);
    Ok(Outcome::with_effects(player, effects))
}

async fn invite_in(
    conn: &mut PgConnection,
    tournament_id: Uuid,
    inviter_id: Uuid,
    invitee_id: Uuid,
) -> OrchestrationResult<TournamentInviteRow> {
    let tournament = tournaments::get_for_update(&mut *conn, tournament_id)
        .await?
        .ok_or(OrchestrationError::TournamentNotFound)?;
    if tournament.status != TournamentStatus::Pending {
        return Err(OrchestrationError::NotJoinable);
    }

    if tournament_players::get(&mut *conn, tournament_id, inviter_id)
        .await?
        .is_none()
    {
        return Err(OrchestrationError::Unauthorized(
            "only enrolled players can invite".to_string(),
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
    if tournament_players::get(&mut *conn, tournament_id, invitee_id)
        .await?
        .is_some()
    {
        return Err(OrchestrationError::AlreadyJoined);
    }

    Ok(invites::upsert_tournament_invite(&mut *conn, tournament_id, inviter_id, invitee_id).await?)
}

pub async fn invite_to_tournament(
    pool: &PgPool,
    tournament_id: Uuid,
    inviter_id: Uuid,
    invitee_id: Uuid,
) -> OrchestrationResult<Outcome<TournamentInviteRow>> {
    let mut tx = pool.begin().await?;
    let result = invite_in(&mut tx, tournament_id, inviter_id, invitee_id).await;
    let invite = settle(tx, result).await?;

    info!(tournament_id = %tournament_id, invitee_id = %invitee_id, "Tournament invite sent");
    let effect = Effect::TournamentInvite {
        invite_id: invite.id,
        tournament_id,
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
    alias: Option<String>,
) -> OrchestrationResult<(TournamentInviteRow, Option<TournamentPlayerRow>)> {
    let invite = invites::get_tournament_invite(&mut *conn, invite_id)
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
    let invite = invites::respond_tournament_invite(&mut *conn, invite_id, status)
        .await?
        .ok_or_else(|| OrchestrationError::InvalidState("invite was already answered".to_string()))?;

    let player = if accept {
        Some(join_in(&mut *conn, invite.tournament_id, user_id, alias).await?)
    } else {
        None
    };
    Ok((invite, player))
}

/// Answer a tournament invite. Accepting enrols the player in the same transaction.
pub async fn respond_to_tournament_invite(
    pool: &PgPool,
    invite_id: Uuid,
    user_id: Uuid,
    accept: bool,
    alias: Option<String>,
) -> OrchestrationResult<Outcome<(TournamentInviteRow, Option<TournamentPlayerRow>)>> {
    let alias = clean_alias(alias.as_deref())?;

    let mut tx = pool.begin().await?;
    let result = respond_in(&mut tx, invite_id, user_id, accept, alias).await;
    let answered = settle(tx, result).await?;

    info!(invite_id = %invite_id, user_id = %user_id, accepted = accept, "Tournament invite answered");
    let effects = answered.1.as_ref().map(joined_effects).unwrap_or_default();
    Ok(Outcome::with_effects(answered, effects))
}

/// Create one two-player tournament game for a bracket slot, copying the tournament's tuning.
///
/// `first` becomes the game's creator in slot 0, `second` takes slot 1.
async fn create_bracket_game(
    conn: &mut PgConnection,
    settings: &TournamentSettingsRow,
    round: i32,
    slot: i32,
    first: Uuid,
    second: Uuid,
) -> OrchestrationResult<TournamentGameRow> {
    let game_settings = CreateGameSettings {
        mode: GameMode::Tournament,
        capacity: 2,
        visibility: settings.visibility,
        num_games: settings.num_games,
        num_matches: settings.num_matches,
        max_score: settings.max_score,
        ball_speed: settings.ball_speed,
        time_limit_seconds: settings.time_limit_seconds,
    };
    let game = insert_game(&mut *conn, first, &game_settings).await?;

    game_players::insert(&mut *conn, game.id, second, 1)
        .await?
        .ok_or(OrchestrationError::CreationFailed("game player"))?;

    tournament_games::insert(
        &mut *conn,
        CreateBracketSlot {
            tournament_id: settings.tournament_id,
            game_id: game.id,
            round,
            slot,
        },
    )
    .await?
    .ok_or(OrchestrationError::ConstraintViolation("bracket slot"))
}

fn turn_ready(tournament_id: Uuid, game_id: Uuid, players: [Uuid; 2]) -> impl Iterator<Item = Effect> {
    players.into_iter().map(move |user_id| Effect::TurnReady {
        user_id,
        game_id,
        tournament_id: Some(tournament_id),
    })
}

async fn seed_in(
    conn: &mut PgConnection,
    tournament_id: Uuid,
) -> OrchestrationResult<(Vec<TournamentGameRow>, Vec<Effect>)> {
    let tournament = tournaments::get_for_update(&mut *conn, tournament_id)
        .await?
        .ok_or(OrchestrationError::TournamentNotFound)?;

    if tournament_games::count_in_round(&mut *conn, tournament_id, 1).await? > 0 {
        debug!(tournament_id = %tournament_id, "Round 1 already seeded");
        let existing = tournament_games::list_round(&mut *conn, tournament_id, 1).await?;
        return Ok((existing, Vec::new()));
    }
    if tournament.status != TournamentStatus::Pending {
        return Err(OrchestrationError::NotPending);
    }

    let settings = tournaments::get_settings(&mut *conn, tournament_id)
        .await?
        .ok_or(OrchestrationError::SettingsMissing)?;
    let entrants: Vec<Uuid> = tournament_players::list_by_tournament(&mut *conn, tournament_id)
        .await?
        .into_iter()
        .map(|p| p.player_id)
        .collect();
    bracket::validate_bracket_size(entrants.len())?;

    let pairs = {
        let mut rng = rand::rng();
        bracket::pair_players(&entrants, &mut rng)
    };

    let mut slots = Vec::with_capacity(pairs.len());
    let mut effects = Vec::with_capacity(entrants.len());
    for (slot, (first, second)) in pairs.into_iter().enumerate() {
        let second = second.ok_or_else(|| {
            OrchestrationError::InvalidState(format!("player {first} has no opponent"))
        })?;
        let row =
            create_bracket_game(&mut *conn, &settings, 1, slot as i32, first, second).await?;
        effects.extend(turn_ready(tournament_id, row.game_id, [first, second]));
        slots.push(row);
    }

    Ok((slots, effects))
}

/// Pair the enrolled players into round 1, one game per pair.
///
/// Runs in a single transaction. When round 1 already exists the stored slots are returned
/// unchanged, so a retried start never seeds twice.
pub async fn seed(
    pool: &PgPool,
    tournament_id: Uuid,
) -> OrchestrationResult<Outcome<Vec<TournamentGameRow>>> {
    let mut tx = pool.begin().await?;
    let result = seed_in(&mut tx, tournament_id).await;
    let (slots, effects) = settle(tx, result).await?;

    if !effects.is_empty() {
        info!(tournament_id = %tournament_id, games = slots.len(), "Tournament seeded");
    }
    Ok(Outcome::with_effects(slots, effects))
}

#[derive(Debug)]
pub struct StartedTournament {
    pub tournament: TournamentRow,
    pub games: Vec<TournamentGameRow>,
}

async fn activate_in(conn: &mut PgConnection, tournament_id: Uuid) -> OrchestrationResult<TournamentRow> {
    let tournament = tournaments::get_for_update(&mut *conn, tournament_id)
        .await?
        .ok_or(OrchestrationError::TournamentNotFound)?;
    if !tournament.status.can_transition_to(TournamentStatus::Active) {
        return Err(OrchestrationError::tournament_transition(
            tournament.status,
            TournamentStatus::Active,
        ));
    }
    tournaments::activate(&mut *conn, tournament_id)
        .await?
        .ok_or(OrchestrationError::NotPending)
}

/// Seed round 1 and activate the tournament. Creator only.
///
/// The two steps commit separately; the seed is skipped when it already happened, so the
/// whole call can simply be retried after a failed activation.
pub async fn start_tournament(
    pool: &PgPool,
    tournament_id: Uuid,
    requester_id: Uuid,
) -> OrchestrationResult<Outcome<StartedTournament>> {
    let tournament = get_tournament(pool, tournament_id).await?;
    if tournament.creator_id != requester_id {
        return Err(OrchestrationError::Unauthorized(
            "only the creator can start this tournament".to_string(),
        ));
    }
    if tournament.status != TournamentStatus::Pending {
        return Err(OrchestrationError::NotPending);
    }

    let seeded = seed(pool, tournament_id).await?;

    let mut tx = pool.begin().await?;
    let result = activate_in(&mut tx, tournament_id).await;
    let tournament = match settle(tx, result).await {
        Ok(tournament) => tournament,
        Err(e) => {
            warn!(tournament_id = %tournament_id, "Seeded tournament could not be activated: {}", e);
            return Err(e);
        }
    };

    info!(tournament_id = %tournament_id, games = seeded.value.len(), "Tournament started");

    let mut effects = seeded.effects;
    effects.push(Effect::TournamentUpdate {
        tournament_id,
        status: TournamentStatus::Active,
        round: Some(1),
        winner_id: None,
    });
    Ok(Outcome::with_effects(
        StartedTournament {
            tournament,
            games: seeded.value,
        },
        effects,
    ))
}

/// Advance past `round`, which must be fully resolved. Expects the tournament row locked.
async fn next_round_in(
    conn: &mut PgConnection,
    tournament: &TournamentRow,
    round: i32,
) -> OrchestrationResult<Vec<Effect>> {
    let tournament_id = tournament.id;

    if tournament_games::count_in_round(&mut *conn, tournament_id, round + 1).await? > 0 {
        debug!(tournament_id = %tournament_id, round, "Round already advanced");
        return Ok(Vec::new());
    }
    if tournament_games::count_pending_in_round(&mut *conn, tournament_id, round).await? > 0 {
        return Err(OrchestrationError::InvalidState(format!(
            "round {round} still has unresolved games"
        )));
    }

    let results: Vec<(i32, Option<Uuid>)> =
        tournament_games::list_round(&mut *conn, tournament_id, round)
            .await?
            .into_iter()
            .map(|row| (row.slot, row.winner_id))
            .collect();

    match bracket::plan_next_round(&results)? {
        RoundPlan::Champion(winner_id) => {
            if tournament.status == TournamentStatus::Finished {
                return Ok(Vec::new());
            }
            if !tournament.status.can_transition_to(TournamentStatus::Finished) {
                return Err(OrchestrationError::tournament_transition(
                    tournament.status,
                    TournamentStatus::Finished,
                ));
            }
            if tournaments::finish(&mut *conn, tournament_id, winner_id).await? == 0 {
                return Ok(Vec::new());
            }

            info!(tournament_id = %tournament_id, winner_id = %winner_id, "Tournament champion decided");
            Ok(vec![Effect::TournamentUpdate {
                tournament_id,
                status: TournamentStatus::Finished,
                round: Some(round),
                winner_id: Some(winner_id),
            }])
        }
        RoundPlan::Games(planned) => {
            let settings = tournaments::get_settings(&mut *conn, tournament_id)
                .await?
                .ok_or(OrchestrationError::SettingsMissing)?;

            let next = round + 1;
            let mut effects = Vec::with_capacity(planned.len() * 2 + 1);
            for game in &planned {
                let row = create_bracket_game(
                    &mut *conn,
                    &settings,
                    next,
                    game.slot,
                    game.first,
                    game.second,
                )
                .await?;
                effects.extend(turn_ready(tournament_id, row.game_id, [game.first, game.second]));
            }

            info!(tournament_id = %tournament_id, round = next, games = planned.len(), "Round advanced");
            effects.push(Effect::TournamentUpdate {
                tournament_id,
                status: tournament.status,
                round: Some(next),
                winner_id: None,
            });
            Ok(effects)
        }
    }
}

async fn next_round_locked(
    conn: &mut PgConnection,
    tournament_id: Uuid,
    round: i32,
) -> OrchestrationResult<(TournamentRow, Vec<Effect>)> {
    let tournament = tournaments::get_for_update(&mut *conn, tournament_id)
        .await?
        .ok_or(OrchestrationError::TournamentNotFound)?;
    let effects = next_round_in(&mut *conn, &tournament, round).await?;
    let tournament = tournaments::get_by_id(&mut *conn, tournament_id)
        .await?
        .ok_or(OrchestrationError::TournamentNotFound)?;
    Ok((tournament, effects))
}

/// Promote the winners of a completed round. Calling it again once the round has advanced
/// is a no-op.
pub async fn next_round(
    pool: &PgPool,
    tournament_id: Uuid,
    round: i32,
) -> OrchestrationResult<Outcome<TournamentRow>> {
    let mut tx = pool.begin().await?;
    let result = next_round_locked(&mut tx, tournament_id, round).await;
    let (tournament, effects) = settle(tx, result).await?;

    Ok(Outcome::with_effects(tournament, effects))
}

async fn game_finished_in(
    conn: &mut PgConnection,
    slot: &TournamentGameRow,
) -> OrchestrationResult<Vec<Effect>> {
    let tournament = tournaments::get_for_update(&mut *conn, slot.tournament_id)
        .await?
        .ok_or(OrchestrationError::TournamentNotFound)?;
    if tournament.status != TournamentStatus::Active {
        debug!(
            tournament_id = %tournament.id,
            status = tournament.status.as_str(),
            "Tournament is not running, bracket left as is"
        );
        return Ok(Vec::new());
    }

    let game = games::get_by_id(&mut *conn, slot.game_id)
        .await?
        .ok_or(OrchestrationError::GameNotFound)?;
    if game.status != GameStatus::Finished {
        return Err(OrchestrationError::InvalidState(format!(
            "game {} is {}, not finished",
            game.id,
            game.status.as_str()
        )));
    }
    let winner_id = game.winner_id.ok_or_else(|| {
        OrchestrationError::InvalidState(format!("game {} finished without a winner", game.id))
    })?;

    if tournament_games::mark_finished(&mut *conn, slot.id, Some(winner_id))
        .await?
        .is_none()
    {
        debug!(game_id = %game.id, "Bracket slot already resolved");
        return Ok(Vec::new());
    }

    let pending =
        tournament_games::count_pending_in_round(&mut *conn, tournament.id, slot.round).await?;
    if pending > 0 {
        debug!(tournament_id = %tournament.id, round = slot.round, pending, "Round still running");
        return Ok(Vec::new());
    }

    next_round_in(&mut *conn, &tournament, slot.round).await
}

/// Consumer of the `GameFinished` event: resolve the game's bracket slot and advance the
/// round once every slot in it is resolved. Games outside any bracket are ignored.
pub async fn on_game_finished(pool: &PgPool, game_id: Uuid) -> OrchestrationResult<Vec<Effect>> {
    let Some(slot) = tournament_games::get_by_game(pool, game_id).await? else {
        return Ok(Vec::new());
    };

    let mut tx = pool.begin().await?;
    let result = game_finished_in(&mut tx, &slot).await;
    settle(tx, result).await
}

#[derive(Debug, Clone)]
pub struct Entrant {
    pub player_id: Uuid,
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BracketSlot {
    pub row: TournamentGameRow,
    pub entrants: Vec<Entrant>,
}

#[derive(Debug, Clone)]
pub struct BracketRound {
    pub round: i32,
    pub slots: Vec<BracketSlot>,
}

async fn alias_map(pool: &PgPool, tournament_id: Uuid) -> sqlx::Result<HashMap<Uuid, String>> {
    Ok(tournament_players::list_aliases(pool, tournament_id)
        .await?
        .into_iter()
        .map(|a| (a.player_id, a.alias))
        .collect())
}

/// Rows come ordered by round then slot.
fn group_rounds(slots: Vec<BracketSlot>) -> Vec<BracketRound> {
    let mut rounds: Vec<BracketRound> = Vec::new();
    for slot in slots {
        match rounds.last_mut() {
            Some(last) if last.round == slot.row.round => last.slots.push(slot),
            _ => rounds.push(BracketRound {
                round: slot.row.round,
                slots: vec![slot],
            }),
        }
    }
    rounds
}

pub async fn brackets(pool: &PgPool, tournament_id: Uuid) -> OrchestrationResult<Vec<BracketRound>> {
    get_tournament(pool, tournament_id).await?;

    let (rows, aliases) = tokio::try_join!(
        tournament_games::list_by_tournament(pool, tournament_id),
        alias_map(pool, tournament_id),
    )?;

    let mut slots = Vec::with_capacity(rows.len());
    for row in rows {
        let entrants = game_players::list_by_game(pool, row.game_id)
            .await?
            .into_iter()
            .map(|p| Entrant {
                player_id: p.player_id,
                alias: aliases.get(&p.player_id).cloned(),
            })
            .collect();
        slots.push(BracketSlot { row, entrants });
    }

    Ok(group_rounds(slots))
}

pub struct TournamentSummary {
    pub tournament: TournamentRow,
    pub settings: TournamentSettingsRow,
    pub players: Vec<(TournamentPlayerRow, Option<String>)>,
    pub current_round: Option<i32>,
}

pub async fn summary(pool: &PgPool, tournament_id: Uuid) -> OrchestrationResult<TournamentSummary> {
    let tournament = get_tournament(pool, tournament_id).await?;

    let (settings, players, slots, aliases) = tokio::try_join!(
        tournaments::get_settings(pool, tournament_id),
        tournament_players::list_by_tournament(pool, tournament_id),
        tournament_games::list_by_tournament(pool, tournament_id),
        alias_map(pool, tournament_id),
    )?;
    let settings = settings.ok_or(OrchestrationError::SettingsMissing)?;

    let players = players
        .into_iter()
        .map(|p| {
            let alias = aliases.get(&p.player_id).cloned();
            (p, alias)
        })
        .collect();

    Ok(TournamentSummary {
        tournament,
        settings,
        players,
        current_round: slots.iter().map(|s| s.round).max(),
    })
}

pub async fn tournament_settings(
    pool: &PgPool,
    tournament_id: Uuid,
) -> OrchestrationResult<TournamentSettingsRow> {
    get_tournament(pool, tournament_id).await?;
    tournaments::get_settings(pool, tournament_id)
        .await?
        .ok_or(OrchestrationError::SettingsMissing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use infra::repos::BracketStatus;

    fn slot_row(round: i32, slot: i32) -> BracketSlot {
        BracketSlot {
            row: TournamentGameRow {
                id: Uuid::new_v4(),
                tournament_id: Uuid::nil(),
                game_id: Uuid::new_v4(),
                round,
                slot,
                status: BracketStatus::Pending,
                winner_id: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            entrants: Vec::new(),
        }
    }

    #[test]
    fn capacity_must_be_a_bracket_size() {
        let creator = Uuid::new_v4();
        let settings = CreateTournamentParams::new(creator, "Cup").settings().unwrap();
        assert_eq!(settings.capacity, DEFAULT_CAPACITY);
        assert_eq!(settings.max_score, DEFAULT_MAX_SCORE);

        for bad in [-4, 0, 6, 32] {
            let mut params = CreateTournamentParams::new(creator, "Cup");
            params.capacity = Some(bad);
            assert!(matches!(
                params.settings(),
                Err(OrchestrationError::InvalidBracketSize(_))
            ));
        }
    }

    #[test]
    fn aliases_are_trimmed_and_bounded() {
        assert_eq!(clean_alias(None).unwrap(), None);
        assert_eq!(clean_alias(Some("  ace ")).unwrap().as_deref(), Some("ace"));
        assert!(clean_alias(Some("   ")).is_err());
        assert!(clean_alias(Some(&"x".repeat(MAX_ALIAS_LEN + 1))).is_err());
    }

    #[test]
    fn slots_are_grouped_by_round() {
        let rounds = group_rounds(vec![slot_row(1, 0), slot_row(1, 1), slot_row(2, 0)]);
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0].round, 1);
        assert_eq!(rounds[0].slots.len(), 2);
        assert_eq!(rounds[1].slots[0].row.slot, 0);
    }
}
