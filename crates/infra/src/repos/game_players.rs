use crate::models::GamePlayerRow;
use crate::repos::games::{PaddleLocation, PaddleSide};
use sqlx::{PgExecutor, Result as SqlxResult};
use uuid::Uuid;

/// Insert a membership row. `None` when the player is already in the game.
pub async fn insert<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
    player_id: Uuid,
    slot: i32,
) -> SqlxResult<Option<GamePlayerRow>> {
    insert_positioned(executor, game_id, player_id, slot, None).await
}

pub async fn insert_positioned<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
    player_id: Uuid,
    slot: i32,
    location: Option<PaddleLocation>,
) -> SqlxResult<Option<GamePlayerRow>> {
    sqlx::query_as::<_, GamePlayerRow>(
        r#"
        INSERT INTO game_players (game_id, player_id, slot, paddle_location, paddle_side)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (game_id, player_id) DO NOTHING
        RETURNING id, game_id, player_id, slot, paddle_location, paddle_side, joined_at
        "#,
    )
    .bind(game_id)
    .bind(player_id)
    .bind(slot)
    .bind(location)
    .bind(location.map(PaddleLocation::side))
    .fetch_optional(executor)
    .await
}

pub async fn get<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
    player_id: Uuid,
) -> SqlxResult<Option<GamePlayerRow>> {
    sqlx::query_as::<_, GamePlayerRow>(
        r#"
        SELECT id, game_id, player_id, slot, paddle_location, paddle_side, joined_at
        FROM game_players
        WHERE game_id = $1 AND player_id = $2
        "#,
    )
    .bind(game_id)
    .bind(player_id)
    .fetch_optional(executor)
    .await
}

pub async fn list_by_game<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
) -> SqlxResult<Vec<GamePlayerRow>> {
    sqlx::query_as::<_, GamePlayerRow>(
        r#"
        SELECT id, game_id, player_id, slot, paddle_location, paddle_side, joined_at
        FROM game_players
        WHERE game_id = $1
        ORDER BY slot ASC, joined_at ASC
        "#,
    )
    .bind(game_id)
    .fetch_all(executor)
    .await
}

pub async fn count_by_game<'e>(executor: impl PgExecutor<'e>, game_id: Uuid) -> SqlxResult<i64> {
    let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM game_players WHERE game_id = $1")
        .bind(game_id)
        .fetch_one(executor)
        .await?;

    Ok(result.0)
}

pub async fn assign_paddle<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
    player_id: Uuid,
    location: PaddleLocation,
) -> SqlxResult<u64> {
    let side: PaddleSide = location.side();
    let result = sqlx::query(
        r#"
        UPDATE game_players
        SET paddle_location = $3, paddle_side = $4
        WHERE game_id = $1 AND player_id = $2
        "#,
    )
    .bind(game_id)
    .bind(player_id)
    .bind(location)
    .bind(side)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn remove<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
    player_id: Uuid,
) -> SqlxResult<u64> {
    let result = sqlx::query("DELETE FROM game_players WHERE game_id = $1 AND player_id = $2")
        .bind(game_id)
        .bind(player_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
