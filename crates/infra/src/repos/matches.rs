use crate::models::{MatchRow, MatchScoreRow};
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, Result as SqlxResult};
use uuid::Uuid;

const MATCH_COLUMNS: &str = "id, game_id, number, started_at, ended_at, winner_id, completed";

/// Open the next match of a game. `started_at` defaults to now.
pub async fn insert<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
    number: i32,
    started_at: Option<DateTime<Utc>>,
) -> SqlxResult<Option<MatchRow>> {
    sqlx::query_as::<_, MatchRow>(&format!(
        r#"
        INSERT INTO matches (game_id, number, started_at)
        VALUES ($1, $2, COALESCE($3, NOW()))
        RETURNING {MATCH_COLUMNS}
        "#
    ))
    .bind(game_id)
    .bind(number)
    .bind(started_at)
    .fetch_optional(executor)
    .await
}

pub async fn get_for_game<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
    match_id: Uuid,
) -> SqlxResult<Option<MatchRow>> {
    sqlx::query_as::<_, MatchRow>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1 AND game_id = $2"
    ))
    .bind(match_id)
    .bind(game_id)
    .fetch_optional(executor)
    .await
}

pub async fn latest_for_game<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
) -> SqlxResult<Option<MatchRow>> {
    sqlx::query_as::<_, MatchRow>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE game_id = $1 ORDER BY number DESC LIMIT 1"
    ))
    .bind(game_id)
    .fetch_optional(executor)
    .await
}

pub async fn list_by_game<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
) -> SqlxResult<Vec<MatchRow>> {
    sqlx::query_as::<_, MatchRow>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE game_id = $1 ORDER BY number ASC"
    ))
    .bind(game_id)
    .fetch_all(executor)
    .await
}

/// Record activity on a match without closing it.
pub async fn stamp_ended<'e>(executor: impl PgExecutor<'e>, match_id: Uuid) -> SqlxResult<u64> {
    let result = sqlx::query("UPDATE matches SET ended_at = NOW() WHERE id = $1")
        .bind(match_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn set_winner<'e>(
    executor: impl PgExecutor<'e>,
    match_id: Uuid,
    winner_id: Uuid,
) -> SqlxResult<u64> {
    let result = sqlx::query("UPDATE matches SET winner_id = $2 WHERE id = $1")
        .bind(match_id)
        .bind(winner_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Close a match. A `None` winner keeps whatever winner was recorded before.
pub async fn complete<'e>(
    executor: impl PgExecutor<'e>,
    match_id: Uuid,
    winner_id: Option<Uuid>,
) -> SqlxResult<Option<MatchRow>> {
    sqlx::query_as::<_, MatchRow>(&format!(
        r#"
        UPDATE matches
        SET completed = true,
            ended_at = NOW(),
            winner_id = COALESCE($2, winner_id)
        WHERE id = $1
        RETURNING {MATCH_COLUMNS}
        "#
    ))
    .bind(match_id)
    .bind(winner_id)
    .fetch_optional(executor)
    .await
}

pub async fn insert_score<'e>(
    executor: impl PgExecutor<'e>,
    match_id: Uuid,
    player_id: Uuid,
) -> SqlxResult<u64> {
    let result = sqlx::query("INSERT INTO match_scores (match_id, player_id) VALUES ($1, $2)")
        .bind(match_id)
        .bind(player_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Add `hits` and `score` onto a player's running totals. `None` when the player has no
/// score row in this match.
pub async fn apply_delta<'e>(
    executor: impl PgExecutor<'e>,
    match_id: Uuid,
    player_id: Uuid,
    hits: i32,
    score: i32,
) -> SqlxResult<Option<MatchScoreRow>> {
    sqlx::query_as::<_, MatchScoreRow>(
        r#"
        UPDATE match_scores
        SET hits = hits + $3,
            score = score + $4,
            updated_at = NOW()
        WHERE match_id = $1 AND player_id = $2
        RETURNING id, match_id, player_id, score, hits, updated_at
        "#,
    )
    .bind(match_id)
    .bind(player_id)
    .bind(hits)
    .bind(score)
    .fetch_optional(executor)
    .await
}

pub async fn list_scores_for_match<'e>(
    executor: impl PgExecutor<'e>,
    match_id: Uuid,
) -> SqlxResult<Vec<MatchScoreRow>> {
    sqlx::query_as::<_, MatchScoreRow>(
        r#"
        SELECT id, match_id, player_id, score, hits, updated_at
        FROM match_scores
        WHERE match_id = $1
        ORDER BY player_id
        "#,
    )
    .bind(match_id)
    .fetch_all(executor)
    .await
}

pub async fn list_scores_for_game<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
) -> SqlxResult<Vec<MatchScoreRow>> {
    sqlx::query_as::<_, MatchScoreRow>(
        r#"
        SELECT ms.id, ms.match_id, ms.player_id, ms.score, ms.hits, ms.updated_at
        FROM match_scores ms
        JOIN matches m ON m.id = ms.match_id
        WHERE m.game_id = $1
        ORDER BY m.number ASC, ms.player_id
        "#,
    )
    .bind(game_id)
    .fetch_all(executor)
    .await
}
