use async_graphql::{Context, Object, Result, ID};

use super::service::{self, CreateTournamentParams};
use super::types::{
    BracketRound, CreateTournamentInput, StartTournamentResponse, Tournament, TournamentInvite,
    TournamentInviteResponse, TournamentPlayer, TournamentSettings, TournamentStatus,
    TournamentSummary,
};
use crate::auth::permissions::require_user_id;
use crate::gql::common::helpers::parse_id;
use crate::gql::common::types::PaginationInput;
use crate::gql::error::OrchestrationResultExt;
use crate::services::spawn_dispatch;
use crate::state::AppState;

#[derive(Default)]
pub struct TournamentQuery;

#[Object]
impl TournamentQuery {
    async fn tournament(&self, ctx: &Context<'_>, id: ID) -> Result<Tournament> {
        let state = ctx.data::<AppState>()?;
        let tournament_id = parse_id(&id, "tournament")?;

        let tournament = service::get_tournament(&state.db, tournament_id)
            .await
            .into_gql()?;
        Ok(tournament.into())
    }

    async fn tournaments(
        &self,
        ctx: &Context<'_>,
        status: Option<TournamentStatus>,
        pagination: Option<PaginationInput>,
    ) -> Result<Vec<Tournament>> {
        let state = ctx.data::<AppState>()?;
        let page = pagination.unwrap_or_default().to_limit_offset();

        let tournaments = service::list_tournaments(&state.db, status.map(Into::into), page)
            .await
            .into_gql()?;
        Ok(tournaments.into_iter().map(Tournament::from).collect())
    }

    /// Every generated round, oldest first.
    async fn tournament_brackets(
        &self,
        ctx: &Context<'_>,
        tournament_id: ID,
    ) -> Result<Vec<BracketRound>> {
        let state = ctx.data::<AppState>()?;
        let tournament_id = parse_id(&tournament_id, "tournament")?;

        let rounds = service::brackets(&state.db, tournament_id).await.into_gql()?;
        Ok(rounds.into_iter().map(BracketRound::from).collect())
    }

    async fn tournament_summary(
        &self,
        ctx: &Context<'_>,
        tournament_id: ID,
    ) -> Result<TournamentSummary> {
        let state = ctx.data::<AppState>()?;
        let tournament_id = parse_id(&tournament_id, "tournament")?;

        let summary = service::summary(&state.db, tournament_id).await.into_gql()?;
        Ok(summary.into())
    }

    async fn tournament_settings(
        &self,
        ctx: &Context<'_>,
        tournament_id: ID,
    ) -> Result<TournamentSettings> {
        let state = ctx.data::<AppState>()?;
        let tournament_id = parse_id(&tournament_id, "tournament")?;

        let settings = service::tournament_settings(&state.db, tournament_id)
            .await
            .into_gql()?;
        Ok(settings.into())
    }
}

#[derive(Default)]
pub struct TournamentMutation;

#[Object]
impl TournamentMutation {
    async fn create_tournament(
        &self,
        ctx: &Context<'_>,
        input: CreateTournamentInput,
    ) -> Result<Tournament> {
        let user_id = require_user_id(ctx)?;
        let state = ctx.data::<AppState>()?;

        let mut params = CreateTournamentParams::new(user_id, input.name);
        params.capacity = input.capacity;
        if let Some(visibility) = input.visibility {
            params.visibility = visibility.into();
        }
        params.num_games = input.num_games;
        params.num_matches = input.num_matches;
        params.max_score = input.max_score;
        params.ball_speed = input.ball_speed;
        params.time_limit_seconds = input.time_limit_seconds;
        params.alias = input.alias;

        let outcome = service::create_tournament(&state.db, params)
            .await
            .into_gql()?;
        spawn_dispatch(state.clone(), outcome.effects);
        Ok(outcome.value.into())
    }

    async fn join_tournament(
        &self,
        ctx: &Context<'_>,
        tournament_id: ID,
        alias: Option<String>,
    ) -> Result<TournamentPlayer> {
        let user_id = require_user_id(ctx)?;
        let state = ctx.data::<AppState>()?;
        let tournament_id = parse_id(&tournament_id, "tournament")?;

        let outcome = service::join_tournament(&state.db, tournament_id, user_id, alias)
            .await
            .into_gql()?;
        spawn_dispatch(state.clone(), outcome.effects);
        Ok(outcome.value.into())
    }

    async fn invite_to_tournament(
        &self,
        ctx: &Context<'_>,
        tournament_id: ID,
        user_id: ID,
    ) -> Result<TournamentInvite> {
        let inviter_id = require_user_id(ctx)?;
        let state = ctx.data::<AppState>()?;
        let tournament_id = parse_id(&tournament_id, "tournament")?;
        let invitee_id = parse_id(&user_id, "user")?;

        let outcome =
            service::invite_to_tournament(&state.db, tournament_id, inviter_id, invitee_id)
                .await
                .into_gql()?;
        spawn_dispatch(state.clone(), outcome.effects);
        Ok(outcome.value.into())
    }

    async fn respond_to_tournament_invite(
        &self,
        ctx: &Context<'_>,
        invite_id: ID,
        accept: bool,
        alias: Option<String>,
    ) -> Result<TournamentInviteResponse> {
        let user_id = require_user_id(ctx)?;
        let state = ctx.data::<AppState>()?;
        let invite_id = parse_id(&invite_id, "invite")?;

        let outcome =
            service::respond_to_tournament_invite(&state.db, invite_id, user_id, accept, alias)
                .await
                .into_gql()?;
        spawn_dispatch(state.clone(), outcome.effects);

        let (invite, player) = outcome.value;
        Ok(TournamentInviteResponse {
            invite: invite.into(),
            player: player.map(Into::into),
        })
    }

    /// Seed round 1 and open the tournament.
    async fn start_tournament(
        &self,
        ctx: &Context<'_>,
        tournament_id: ID,
    ) -> Result<StartTournamentResponse> {
        let user_id = require_user_id(ctx)?;
        let state = ctx.data::<AppState>()?;
        let tournament_id = parse_id(&tournament_id, "tournament")?;

        let outcome = service::start_tournament(&state.db, tournament_id, user_id)
            .await
            .into_gql()?;
        spawn_dispatch(state.clone(), outcome.effects);

        let started = outcome.value;
        Ok(StartTournamentResponse {
            tournament: started.tournament.into(),
            games: started.games.into_iter().map(Into::into).collect(),
        })
    }
}
