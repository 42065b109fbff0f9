use crate::models::{GameInviteRow, TournamentInviteRow};
use sqlx::{PgExecutor, Result as SqlxResult};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "invite_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
}

/// Create an invite, or reset an earlier one for the same invitee back to pending.
pub async fn upsert_game_invite<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
    inviter_id: Uuid,
    invitee_id: Uuid,
) -> SqlxResult<GameInviteRow> {
    sqlx::query_as::<_, GameInviteRow>(
        r#"
        INSERT INTO game_invites (game_id, inviter_id, invitee_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (game_id, invitee_id) DO UPDATE
        SET inviter_id = EXCLUDED.inviter_id,
            status = 'pending',
            created_at = NOW(),
            responded_at = NULL
        RETURNING id, game_id, inviter_id, invitee_id, status, created_at, responded_at
        "#,
    )
    .bind(game_id)
    .bind(inviter_id)
    .bind(invitee_id)
    .fetch_one(executor)
    .await
}

pub async fn get_game_invite<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> SqlxResult<Option<GameInviteRow>> {
    sqlx::query_as::<_, GameInviteRow>(
        r#"
        SELECT id, game_id, inviter_id, invitee_id, status, created_at, responded_at
        FROM game_invites
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Answer a pending invite. `None` when it was already answered.
pub async fn respond_game_invite<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    status: InviteStatus,
) -> SqlxResult<Option<GameInviteRow>> {
    sqlx::query_as::<_, GameInviteRow>(
        r#"
        UPDATE game_invites
        SET status = $2, responded_at = NOW()
        WHERE id = $1 AND status = 'pending'
        RETURNING id, game_id, inviter_id, invitee_id, status, created_at, responded_at
        "#,
    )
    .bind(id)
    .bind(status)
    .fetch_optional(executor)
    .await
}

pub async fn has_accepted_game_invite<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
    invitee_id: Uuid,
) -> SqlxResult<bool> {
    let result: (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM game_invites
            WHERE game_id = $1 AND invitee_id = $2 AND status = 'accepted'
        )
        "#,
    )
    .bind(game_id)
    .bind(invitee_id)
    .fetch_one(executor)
    .await?;

    Ok(result.0)
}

pub async fn upsert_tournament_invite<'e>(
    executor: impl PgExecutor<'e>,
    tournament_id: Uuid,
    inviter_id: Uuid,
    invitee_id: Uuid,
) -> SqlxResult<TournamentInviteRow> {
    sqlx::query_as::<_, TournamentInviteRow>(
        r#"
        INSERT INTO tournament_invites (tournament_id, inviter_id, invitee_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (tournament_id, invitee_id) DO UPDATE
        SET inviter_id = EXCLUDED.inviter_id,
            status = 'pending',
            created_at = NOW(),
            responded_at = NULL
        RETURNING id, tournament_id, inviter_id, invitee_id, status, created_at, responded_at
        "#,
    )
    .bind(tournament_id)
    .bind(inviter_id)
    .bind(invitee_id)
    .fetch_one(executor)
    .await
}

pub async fn get_tournament_invite<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> SqlxResult<Option<TournamentInviteRow>> {
    sqlx::query_as::<_, TournamentInviteRow>(
        r#"
        SELECT id, tournament_id, inviter_id, invitee_id, status, created_at, responded_at
        FROM tournament_invites
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn respond_tournament_invite<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    status: InviteStatus,
) -> SqlxResult<Option<TournamentInviteRow>> {
    sqlx::query_as::<_, TournamentInviteRow>(
        r#"
        UPDATE tournament_invites
        SET status = $2, responded_at = NOW()
        WHERE id = $1 AND status = 'pending'
        RETURNING id, tournament_id, inviter_id, invitee_id, status, created_at, responded_at
        "#,
    )
    .bind(id)
    .bind(status)
    .fetch_optional(executor)
    .await
}

pub async fn has_accepted_tournament_invite<'e>(
    executor: impl PgExecutor<'e>,
    tournament_id: Uuid,
    invitee_id: Uuid,
) -> SqlxResult<bool> {
    let result: (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM tournament_invites
            WHERE tournament_id = $1 AND invitee_id = $2 AND status = 'accepted'
        )
        "#,
    )
    .bind(tournament_id)
    .bind(invitee_id)
    .fetch_one(executor)
    .await?;

    Ok(result.0)
}
