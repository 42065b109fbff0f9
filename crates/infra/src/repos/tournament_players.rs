use crate::models::{TournamentAliasRow, TournamentPlayerRow};
use sqlx::{PgExecutor, Result as SqlxResult};
use uuid::Uuid;

/// Enrol a player. `None` when already enrolled.
pub async fn insert<'e>(
    executor: impl PgExecutor<'e>,
    tournament_id: Uuid,
    player_id: Uuid,
    slot: i32,
) -> SqlxResult<Option<TournamentPlayerRow>> {
    sqlx::query_as::<_, TournamentPlayerRow>(
        r#"
        INSERT INTO tournament_players (tournament_id, player_id, slot)
        VALUES ($1, $2, $3)
        ON CONFLICT (tournament_id, player_id) DO NOTHING
        RETURNING id, tournament_id, player_id, slot, joined_at
        "#,
    )
    .bind(tournament_id)
    .bind(player_id)
    .bind(slot)
    .fetch_optional(executor)
    .await
}

pub async fn get<'e>(
    executor: impl PgExecutor<'e>,
    tournament_id: Uuid,
    player_id: Uuid,
) -> SqlxResult<Option<TournamentPlayerRow>> {
    sqlx::query_as::<_, TournamentPlayerRow>(
        r#"
        SELECT id, tournament_id, player_id, slot, joined_at
        FROM tournament_players
        WHERE tournament_id = $1 AND player_id = $2
        "#,
    )
    .bind(tournament_id)
    .bind(player_id)
    .fetch_optional(executor)
    .await
}

pub async fn list_by_tournament<'e>(
    executor: impl PgExecutor<'e>,
    tournament_id: Uuid,
) -> SqlxResult<Vec<TournamentPlayerRow>> {
    sqlx::query_as::<_, TournamentPlayerRow>(
        r#"
        SELECT id, tournament_id, player_id, slot, joined_at
        FROM tournament_players
        WHERE tournament_id = $1
        ORDER BY slot ASC
        "#,
    )
    .bind(tournament_id)
    .fetch_all(executor)
    .await
}

pub async fn count_by_tournament<'e>(
    executor: impl PgExecutor<'e>,
    tournament_id: Uuid,
) -> SqlxResult<i64> {
    let result: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM tournament_players WHERE tournament_id = $1")
            .bind(tournament_id)
            .fetch_one(executor)
            .await?;

    Ok(result.0)
}

/// Record a display alias. `None` when the alias is taken in this tournament or the
/// player already has one.
pub async fn insert_alias<'e>(
    executor: impl PgExecutor<'e>,
    tournament_id: Uuid,
    player_id: Uuid,
    alias: &str,
) -> SqlxResult<Option<TournamentAliasRow>> {
    sqlx::query_as::<_, TournamentAliasRow>(
        r#"
        INSERT INTO tournament_aliases (tournament_id, player_id, alias)
        VALUES ($1, $2, $3)
        ON CONFLICT DO NOTHING
        RETURNING id, tournament_id, player_id, alias
        "#,
    )
    .bind(tournament_id)
    .bind(player_id)
    .bind(alias)
    .fetch_optional(executor)
    .await
}

pub async fn list_aliases<'e>(
    executor: impl PgExecutor<'e>,
    tournament_id: Uuid,
) -> SqlxResult<Vec<TournamentAliasRow>> {
    sqlx::query_as::<_, TournamentAliasRow>(
        r#"
        SELECT id, tournament_id, player_id, alias
        FROM tournament_aliases
        WHERE tournament_id = $1
        "#,
    )
    .bind(tournament_id)
    .fetch_all(executor)
    .await
}
