use async_graphql::{Context, Result, Subscription, ID};
use futures_util::Stream;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use crate::auth::permissions::require_user_id;
use crate::gql::common::helpers::parse_id;
use crate::services::Notification;
use crate::state::AppState;

pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// Turn-ready and invite notifications for the authenticated user.
    async fn my_notifications(
        &self,
        ctx: &Context<'_>,
    ) -> Result<impl Stream<Item = Result<Notification, BroadcastStreamRecvError>>> {
        let user_id = require_user_id(ctx)?;
        let state = ctx.data::<AppState>()?;

        Ok(BroadcastStream::new(state.notifications.subscribe_user(user_id)))
    }

    /// Status and round changes of one tournament.
    async fn tournament_updates(
        &self,
        ctx: &Context<'_>,
        tournament_id: ID,
    ) -> Result<impl Stream<Item = Result<Notification, BroadcastStreamRecvError>>> {
        let tournament_id = parse_id(&tournament_id, "tournament")?;
        let state = ctx.data::<AppState>()?;

        Ok(BroadcastStream::new(
            state.notifications.subscribe_tournament(tournament_id),
        ))
    }

    /// Every tournament update on the platform.
    async fn public_updates(
        &self,
        ctx: &Context<'_>,
    ) -> Result<impl Stream<Item = Result<Notification, BroadcastStreamRecvError>>> {
        let state = ctx.data::<AppState>()?;
        Ok(BroadcastStream::new(state.notifications.subscribe_all()))
    }
}
