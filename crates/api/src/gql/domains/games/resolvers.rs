use async_graphql::{Context, Object, Result, ID};

use infra::repos::UpdateGameSettings;

use super::service::{self, CreateGameParams, UpdateStatusParams};
use super::types::{
    CreateGameInput, Game, GameInviteResponse, GameInvite, GameMode, GamePlayer, GameSettings,
    GameStatusUpdate, GameSummary, StartGameInput, StartGameResponse, UpdateGameSettingsInput,
    UpdateGameStatusInput,
};
use crate::auth::permissions::require_user_id;
use crate::gql::common::helpers::{parse_id, parse_ids};
use crate::gql::common::types::PaginationInput;
use crate::gql::error::OrchestrationResultExt;
use crate::services::spawn_dispatch;
use crate::state::AppState;

#[derive(Default)]
pub struct GameQuery;

#[Object]
impl GameQuery {
    async fn game(&self, ctx: &Context<'_>, id: ID) -> Result<Game> {
        let state = ctx.data::<AppState>()?;
        let game_id = parse_id(&id, "game")?;

        let game = service::get_game(&state.db, game_id).await.into_gql()?;
        Ok(game.into())
    }

    /// Public games waiting for players, newest first.
    async fn open_games(
        &self,
        ctx: &Context<'_>,
        mode: Option<GameMode>,
        pagination: Option<PaginationInput>,
    ) -> Result<Vec<Game>> {
        let state = ctx.data::<AppState>()?;
        let page = pagination.unwrap_or_default().to_limit_offset();

        let games = service::list_open_games(&state.db, mode.map(Into::into), page)
            .await
            .into_gql()?;
        Ok(games.into_iter().map(Game::from).collect())
    }

    async fn game_summary(&self, ctx: &Context<'_>, game_id: ID) -> Result<GameSummary> {
        let state = ctx.data::<AppState>()?;
        let game_id = parse_id(&game_id, "game")?;

        let summary = service::game_summary(&state.db, game_id).await.into_gql()?;
        Ok(summary.into())
    }

    async fn game_options(&self, ctx: &Context<'_>, game_id: ID) -> Result<GameSettings> {
        let state = ctx.data::<AppState>()?;
        let game_id = parse_id(&game_id, "game")?;

        let settings = service::game_options(&state.db, game_id).await.into_gql()?;
        Ok(settings.into())
    }
}

#[derive(Default)]
pub struct GameMutation;

#[Object]
impl GameMutation {
    async fn create_game(&self, ctx: &Context<'_>, input: CreateGameInput) -> Result<Game> {
        let user_id = require_user_id(ctx)?;
        let state = ctx.data::<AppState>()?;

        let mut params = CreateGameParams::new(user_id, input.mode.into());
        params.capacity = input.capacity;
        if let Some(visibility) = input.visibility {
            params.visibility = visibility.into();
        }
        params.num_games = input.num_games;
        params.num_matches = input.num_matches;
        params.max_score = input.max_score;
        params.ball_speed = input.ball_speed;
        params.time_limit_seconds = input.time_limit_seconds;

        let outcome = service::create_game(&state.db, params).await.into_gql()?;
        spawn_dispatch(state.clone(), outcome.effects);
        Ok(outcome.value.into())
    }

    async fn join_game(
        &self,
        ctx: &Context<'_>,
        game_id: ID,
        slot: Option<i32>,
    ) -> Result<GamePlayer> {
        let user_id = require_user_id(ctx)?;
        let state = ctx.data::<AppState>()?;
        let game_id = parse_id(&game_id, "game")?;

        let outcome = service::join_game(&state.db, game_id, user_id, slot)
            .await
            .into_gql()?;
        spawn_dispatch(state.clone(), outcome.effects);
        Ok(outcome.value.into())
    }

    async fn start_game(&self, ctx: &Context<'_>, input: StartGameInput) -> Result<StartGameResponse> {
        let user_id = require_user_id(ctx)?;
        let state = ctx.data::<AppState>()?;
        let game_id = parse_id(&input.game_id, "game")?;
        let players = parse_ids(input.player_ids.as_deref().unwrap_or_default(), "player")?;

        let outcome = service::start_game(&state.db, game_id, user_id, players)
            .await
            .into_gql()?;
        spawn_dispatch(state.clone(), outcome.effects);

        let started = outcome.value;
        Ok(StartGameResponse {
            game: started.game.into(),
            players: started.players.into_iter().map(Into::into).collect(),
            current_match: started.first_match.into(),
        })
    }

    /// Report a rally, or pause, resume, abort or finish the game.
    async fn update_game_status(
        &self,
        ctx: &Context<'_>,
        input: UpdateGameStatusInput,
    ) -> Result<GameStatusUpdate> {
        let user_id = require_user_id(ctx)?;
        let state = ctx.data::<AppState>()?;

        let params = UpdateStatusParams {
            game_id: parse_id(&input.game_id, "game")?,
            match_id: input
                .match_id
                .as_ref()
                .map(|id| parse_id(id, "match"))
                .transpose()?,
            status: input.status.into(),
            stats: input.rally_stats()?,
            requester_id: user_id,
        };

        let outcome = service::update_game_status(&state.db, params)
            .await
            .into_gql()?;
        spawn_dispatch(state.clone(), outcome.effects);

        let update = outcome.value;
        Ok(GameStatusUpdate {
            game: update.game.into(),
            current_match: update.current_match.map(Into::into),
            scores: update.scores.into_iter().map(Into::into).collect(),
        })
    }

    async fn leave_game(&self, ctx: &Context<'_>, game_id: ID) -> Result<Game> {
        let user_id = require_user_id(ctx)?;
        let state = ctx.data::<AppState>()?;
        let game_id = parse_id(&game_id, "game")?;

        let outcome = service::leave_game(&state.db, game_id, user_id)
            .await
            .into_gql()?;
        Ok(outcome.value.into())
    }

    async fn delete_game(&self, ctx: &Context<'_>, game_id: ID) -> Result<bool> {
        let user_id = require_user_id(ctx)?;
        let state = ctx.data::<AppState>()?;
        let game_id = parse_id(&game_id, "game")?;

        service::delete_game(&state.db, game_id, user_id)
            .await
            .into_gql()?;
        Ok(true)
    }

    async fn update_game_settings(
        &self,
        ctx: &Context<'_>,
        input: UpdateGameSettingsInput,
    ) -> Result<GameSettings> {
        let user_id = require_user_id(ctx)?;
        let state = ctx.data::<AppState>()?;
        let game_id = parse_id(&input.game_id, "game")?;

        let patch = UpdateGameSettings {
            visibility: input.visibility.map(Into::into),
            num_games: input.num_games,
            num_matches: input.num_matches,
            max_score: input.max_score,
            ball_speed: input.ball_speed,
            time_limit_seconds: input.time_limit_seconds,
        };

        let outcome = service::update_game_settings(&state.db, game_id, user_id, patch)
            .await
            .into_gql()?;
        Ok(outcome.value.into())
    }

    async fn invite_to_game(
        &self,
        ctx: &Context<'_>,
        game_id: ID,
        user_id: ID,
    ) -> Result<GameInvite> {
        let inviter_id = require_user_id(ctx)?;
        let state = ctx.data::<AppState>()?;
        let game_id = parse_id(&game_id, "game")?;
        let invitee_id = parse_id(&user_id, "user")?;

        let outcome = service::invite_to_game(&state.db, game_id, inviter_id, invitee_id)
            .await
            .into_gql()?;
        spawn_dispatch(state.clone(), outcome.effects);
        Ok(outcome.value.into())
    }

    async fn respond_to_game_invite(
        &self,
        ctx: &Context<'_>,
        invite_id: ID,
        accept: bool,
    ) -> Result<GameInviteResponse> {
        let user_id = require_user_id(ctx)?;
        let state = ctx.data::<AppState>()?;
        let invite_id = parse_id(&invite_id, "invite")?;

        let outcome = service::respond_to_game_invite(&state.db, invite_id, user_id, accept)
            .await
            .into_gql()?;
        spawn_dispatch(state.clone(), outcome.effects);

        let (invite, player) = outcome.value;
        Ok(GameInviteResponse {
            invite: invite.into(),
            player: player.map(Into::into),
        })
    }
}
