use crate::models::TournamentGameRow;
use sqlx::{PgExecutor, Result as SqlxResult};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "bracket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BracketStatus {
    Pending,
    Finished,
}

#[derive(Debug, Clone)]
pub struct CreateBracketSlot {
    pub tournament_id: Uuid,
    pub game_id: Uuid,
    pub round: i32,
    pub slot: i32,
}

const SLOT_COLUMNS: &str =
    "id, tournament_id, game_id, round, slot, status, winner_id, created_at, updated_at";

/// Insert a bracket slot. `None` when `(tournament, round, slot)` is already taken.
pub async fn insert<'e>(
    executor: impl PgExecutor<'e>,
    data: CreateBracketSlot,
) -> SqlxResult<Option<TournamentGameRow>> {
    sqlx::query_as::<_, TournamentGameRow>(&format!(
        r#"
        INSERT INTO tournament_games (tournament_id, game_id, round, slot)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (tournament_id, round, slot) DO NOTHING
        RETURNING {SLOT_COLUMNS}
        "#
    ))
    .bind(data.tournament_id)
    .bind(data.game_id)
    .bind(data.round)
    .bind(data.slot)
    .fetch_optional(executor)
    .await
}

pub async fn get_by_game<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
) -> SqlxResult<Option<TournamentGameRow>> {
    sqlx::query_as::<_, TournamentGameRow>(&format!(
        "SELECT {SLOT_COLUMNS} FROM tournament_games WHERE game_id = $1"
    ))
    .bind(game_id)
    .fetch_optional(executor)
    .await
}

/// Resolve a pending slot. `None` when the slot was already resolved.
pub async fn mark_finished<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    winner_id: Option<Uuid>,
) -> SqlxResult<Option<TournamentGameRow>> {
    sqlx::query_as::<_, TournamentGameRow>(&format!(
        r#"
        UPDATE tournament_games
        SET status = 'finished', winner_id = $2, updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        RETURNING {SLOT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(winner_id)
    .fetch_optional(executor)
    .await
}

pub async fn count_pending_in_round<'e>(
    executor: impl PgExecutor<'e>,
    tournament_id: Uuid,
    round: i32,
) -> SqlxResult<i64> {
    let result: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM tournament_games
        WHERE tournament_id = $1 AND round = $2 AND status = 'pending'
        "#,
    )
    .bind(tournament_id)
    .bind(round)
    .fetch_one(executor)
    .await?;

    Ok(result.0)
}

pub async fn count_in_round<'e>(
    executor: impl PgExecutor<'e>,
    tournament_id: Uuid,
    round: i32,
) -> SqlxResult<i64> {
    let result: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM tournament_games WHERE tournament_id = $1 AND round = $2",
    )
    .bind(tournament_id)
    .bind(round)
    .fetch_one(executor)
    .await?;

    Ok(result.0)
}

pub async fn list_round<'e>(
    executor: impl PgExecutor<'e>,
    tournament_id: Uuid,
    round: i32,
) -> SqlxResult<Vec<TournamentGameRow>> {
    sqlx::query_as::<_, TournamentGameRow>(&format!(
        r#"
        SELECT {SLOT_COLUMNS}
        FROM tournament_games
        WHERE tournament_id = $1 AND round = $2
        ORDER BY slot ASC
        "#
    ))
    .bind(tournament_id)
    .bind(round)
    .fetch_all(executor)
    .await
}

pub async fn list_by_tournament<'e>(
    executor: impl PgExecutor<'e>,
    tournament_id: Uuid,
) -> SqlxResult<Vec<TournamentGameRow>> {
    sqlx::query_as::<_, TournamentGameRow>(&format!(
        r#"
        SELECT {SLOT_COLUMNS}
        FROM tournament_games
        WHERE tournament_id = $1
        ORDER BY round ASC, slot ASC
        "#
    ))
    .bind(tournament_id)
    .fetch_all(executor)
    .await
}

/// Creator of the tournament a game was generated for, if any.
pub async fn tournament_creator_for_game<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
) -> SqlxResult<Option<Uuid>> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT t.creator_id
        FROM tournament_games tg
        JOIN tournaments t ON t.id = tg.tournament_id
        WHERE tg.game_id = $1
        "#,
    )
    .bind(game_id)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(|(creator_id,)| creator_id))
}
