use crate::{
    models::{GameRow, GameSettingsRow},
    pagination::LimitOffset,
};
use sqlx::{PgExecutor, Result as SqlxResult};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "game_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Pending,
    Active,
    Paused,
    Aborted,
    Finished,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Pending => "pending",
            GameStatus::Active => "active",
            GameStatus::Paused => "paused",
            GameStatus::Aborted => "aborted",
            GameStatus::Finished => "finished",
        }
    }

    /// Transition table for the game lifecycle.
    ///
    /// `Active -> Active` is the per-rally score update.
    pub fn can_transition_to(self, next: GameStatus) -> bool {
        use GameStatus::*;
        matches!(
            (self, next),
            (Pending, Active)
                | (Pending, Aborted)
                | (Active, Active)
                | (Active, Paused)
                | (Active, Finished)
                | (Active, Aborted)
                | (Paused, Active)
                | (Paused, Aborted)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, GameStatus::Finished | GameStatus::Aborted)
    }
}

impl FromStr for GameStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(GameStatus::Pending),
            "active" => Ok(GameStatus::Active),
            "paused" => Ok(GameStatus::Paused),
            "aborted" => Ok(GameStatus::Aborted),
            "finished" => Ok(GameStatus::Finished),
            _ => Err(format!("Unknown game status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "game_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Training,
    SinglePlayer,
    Multiplayer,
    Tournament,
}

impl GameMode {
    /// Modes played against the synthesized AI opponent.
    pub fn has_ai_opponent(self) -> bool {
        matches!(self, GameMode::Training | GameMode::SinglePlayer)
    }

    /// Human seats a game of this mode may be created with.
    pub fn allowed_capacities(self) -> &'static [i32] {
        match self {
            GameMode::Training | GameMode::SinglePlayer => &[1],
            GameMode::Multiplayer => &[2, 4],
            GameMode::Tournament => &[2],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "visibility", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "paddle_location", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaddleLocation {
    Left,
    Right,
    Top,
    Bottom,
}

impl PaddleLocation {
    /// Seating order used when a game starts.
    pub const ORDER: [PaddleLocation; 4] = [
        PaddleLocation::Left,
        PaddleLocation::Right,
        PaddleLocation::Top,
        PaddleLocation::Bottom,
    ];

    pub fn side(self) -> PaddleSide {
        match self {
            PaddleLocation::Left | PaddleLocation::Top => PaddleSide::Left,
            PaddleLocation::Right | PaddleLocation::Bottom => PaddleSide::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "paddle_side", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaddleSide {
    Left,
    Right,
}

impl PaddleSide {
    pub fn opposite(self) -> PaddleSide {
        match self {
            PaddleSide::Left => PaddleSide::Right,
            PaddleSide::Right => PaddleSide::Left,
        }
    }

    /// Location an extra paddle takes when it joins this side.
    pub fn home_location(self) -> PaddleLocation {
        match self {
            PaddleSide::Left => PaddleLocation::Left,
            PaddleSide::Right => PaddleLocation::Right,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateGameSettings {
    pub mode: GameMode,
    pub capacity: i32,
    pub visibility: Visibility,
    pub num_games: i32,
    pub num_matches: i32,
    pub max_score: i32,
    pub ball_speed: i32,
    pub time_limit_seconds: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateGameSettings {
    pub visibility: Option<Visibility>,
    pub num_games: Option<i32>,
    pub num_matches: Option<i32>,
    pub max_score: Option<i32>,
    pub ball_speed: Option<i32>,
    pub time_limit_seconds: Option<i32>,
}

const GAME_COLUMNS: &str =
    "id, creator_id, status, winner_id, created_at, started_at, ended_at, updated_at";

pub async fn insert<'e>(
    executor: impl PgExecutor<'e>,
    creator_id: Uuid,
) -> SqlxResult<Option<GameRow>> {
    sqlx::query_as::<_, GameRow>(&format!(
        "INSERT INTO games (creator_id) VALUES ($1) RETURNING {GAME_COLUMNS}"
    ))
    .bind(creator_id)
    .fetch_optional(executor)
    .await
}

pub async fn get_by_id<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> SqlxResult<Option<GameRow>> {
    sqlx::query_as::<_, GameRow>(&format!("SELECT {GAME_COLUMNS} FROM games WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Same as [`get_by_id`] but holds a row lock until the surrounding transaction ends.
pub async fn get_for_update<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> SqlxResult<Option<GameRow>> {
    sqlx::query_as::<_, GameRow>(&format!(
        "SELECT {GAME_COLUMNS} FROM games WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Public games still waiting for players, newest first.
pub async fn list_open<'e>(
    executor: impl PgExecutor<'e>,
    mode: Option<GameMode>,
    page: LimitOffset,
) -> SqlxResult<Vec<GameRow>> {
    sqlx::query_as::<_, GameRow>(
        r#"
        SELECT g.id, g.creator_id, g.status, g.winner_id, g.created_at,
               g.started_at, g.ended_at, g.updated_at
        FROM games g
        JOIN game_settings s ON s.game_id = g.id
        WHERE g.status = 'pending'
          AND s.visibility = 'public'
          AND s.mode <> 'tournament'
          AND ($1::game_mode IS NULL OR s.mode = $1)
        ORDER BY g.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(mode)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(executor)
    .await
}

pub async fn update_status<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    status: GameStatus,
) -> SqlxResult<u64> {
    let result = sqlx::query("UPDATE games SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn mark_started<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> SqlxResult<Option<GameRow>> {
    sqlx::query_as::<_, GameRow>(&format!(
        r#"
        UPDATE games
        SET status = 'active', started_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        RETURNING {GAME_COLUMNS}
        "#
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn mark_finished<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    winner_id: Option<Uuid>,
) -> SqlxResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE games
        SET status = 'finished', winner_id = $2, ended_at = NOW(), updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(winner_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn set_winner<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    winner_id: Uuid,
) -> SqlxResult<u64> {
    let result =
        sqlx::query("UPDATE games SET winner_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(winner_id)
            .execute(executor)
            .await?;
    Ok(result.rows_affected())
}

pub async fn delete<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> SqlxResult<u64> {
    let result = sqlx::query("DELETE FROM games WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn insert_settings<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
    data: &CreateGameSettings,
) -> SqlxResult<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO game_settings (game_id, mode, capacity, visibility, num_games,
                                   num_matches, max_score, ball_speed, time_limit_seconds)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(game_id)
    .bind(data.mode)
    .bind(data.capacity)
    .bind(data.visibility)
    .bind(data.num_games)
    .bind(data.num_matches)
    .bind(data.max_score)
    .bind(data.ball_speed)
    .bind(data.time_limit_seconds)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn get_settings<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
) -> SqlxResult<Option<GameSettingsRow>> {
    sqlx::query_as::<_, GameSettingsRow>(
        r#"
        SELECT game_id, mode, capacity, visibility, num_games, num_matches,
               max_score, ball_speed, time_limit_seconds, updated_at
        FROM game_settings
        WHERE game_id = $1
        "#,
    )
    .bind(game_id)
    .fetch_optional(executor)
    .await
}

pub async fn update_settings<'e>(
    executor: impl PgExecutor<'e>,
    game_id: Uuid,
    data: UpdateGameSettings,
) -> SqlxResult<Option<GameSettingsRow>> {
    sqlx::query_as::<_, GameSettingsRow>(
        r#"
        UPDATE game_settings
        SET visibility = COALESCE($2, visibility),
            num_games = COALESCE($3, num_games),
            num_matches = COALESCE($4, num_matches),
            max_score = COALESCE($5, max_score),
            ball_speed = COALESCE($6, ball_speed),
            time_limit_seconds = COALESCE($7, time_limit_seconds),
            updated_at = NOW()
        WHERE game_id = $1
        RETURNING game_id, mode, capacity, visibility, num_games, num_matches,
                  max_score, ball_speed, time_limit_seconds, updated_at
        "#,
    )
    .bind(game_id)
    .bind(data.visibility)
    .bind(data.num_games)
    .bind(data.num_matches)
    .bind(data.max_score)
    .bind(data.ball_speed)
    .bind(data.time_limit_seconds)
    .fetch_optional(executor)
    .await
}
